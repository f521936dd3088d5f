use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::api::errors::ExperimentError;

/// The variation a user was given in one campaign, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignBucket {
    pub variation_name: String,
}

/// Sticky assignments of one user, keyed by campaign key.
///
/// The field names match the record other SDKs write, so one store can be
/// shared between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub campaign_bucket_map: HashMap<String, CampaignBucket>,
}

impl UserProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            campaign_bucket_map: HashMap::new(),
        }
    }

    pub fn variation_name_for(&self, campaign_key: &str) -> Option<&str> {
        self.campaign_bucket_map
            .get(campaign_key)
            .map(|bucket| bucket.variation_name.as_str())
    }

    /// Adds or replaces the entry for one campaign, keeping the others.
    pub fn with_assignment(mut self, campaign_key: &str, variation_name: &str) -> Self {
        self.campaign_bucket_map.insert(
            campaign_key.to_string(),
            CampaignBucket {
                variation_name: variation_name.to_string(),
            },
        );
        self
    }
}

/// Persistence for sticky assignments.
///
/// Implementations report failures as errors; the decision service recovers
/// from all of them.
#[async_trait]
pub trait UserProfileStore: Send + Sync {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, ExperimentError>;
    async fn save(&self, profile: UserProfile) -> Result<(), ExperimentError>;
}

/// Process-local store. Profiles live as long as the store.
#[derive(Debug, Default)]
pub struct InMemoryUserProfileStore {
    profiles: DashMap<String, UserProfile>,
}

impl InMemoryUserProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl UserProfileStore for InMemoryUserProfileStore {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, ExperimentError> {
        Ok(self.profiles.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, profile: UserProfile) -> Result<(), ExperimentError> {
        self.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }
}
