use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, error, info, instrument};

use crate::api::errors::ExperimentError;
use crate::api::types::{DecisionSource, VariationDecision};
use crate::bucketing::bucketing_service::{bucket_user_to_variation, is_user_part_of_campaign};
use crate::campaigns::compiled::{Campaign, Variation};
use crate::decision::user_profile::{UserProfile, UserProfileStore};
use crate::metrics::consts::{
    DECISIONS_COUNTER, USER_PROFILE_STORE_ERRORS_COUNTER, USER_PROFILE_STORE_WRITES_COUNTER,
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(100);

/// Result of reading the sticky store for one user.
enum ProfileLookup {
    Found(UserProfile),
    Missing,
    Failed,
}

/// Decides which variation of a campaign a user sees.
///
/// A stored assignment wins when it still names a variation of the campaign;
/// otherwise the user is bucketed and the new assignment is written back. The
/// store is optional and every store failure degrades to plain bucketing.
/// Campaign status is not checked here.
#[derive(Clone)]
pub struct DecisionService {
    store: Option<Arc<dyn UserProfileStore>>,
    store_timeout: Duration,
}

impl DecisionService {
    pub fn new(store: Option<Arc<dyn UserProfileStore>>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    pub fn without_store() -> Self {
        Self::new(None, DEFAULT_STORE_TIMEOUT)
    }

    #[instrument(skip_all, fields(user_id = %user_id, campaign_key = %campaign.key))]
    pub async fn decide(&self, user_id: &str, campaign: &Campaign) -> Option<VariationDecision> {
        let (decision, source) = self.decide_with_source(user_id, campaign).await;
        counter!(DECISIONS_COUNTER, "source" => source.to_string()).increment(1);
        decision
    }

    /// Same as [`decide`](Self::decide), also reporting where the answer came from.
    pub async fn decide_with_source(
        &self,
        user_id: &str,
        campaign: &Campaign,
    ) -> (Option<VariationDecision>, DecisionSource) {
        if user_id.is_empty() {
            debug!(campaign_key = %campaign.key, "empty user id, store not consulted");
            return (None, DecisionSource::NotEligible);
        }

        let lookup = self.lookup_profile(user_id).await;

        if let ProfileLookup::Found(profile) = &lookup {
            if let Some(variation) = stored_variation(profile, campaign) {
                info!(
                    user_id = %user_id,
                    campaign_key = %campaign.key,
                    variation_name = %variation.name,
                    "found stored variation"
                );
                return (Some(decision_for(variation)), DecisionSource::Sticky);
            }
        }

        let Some(variation) = self.get_variation_allotted(user_id, campaign) else {
            return (None, DecisionSource::NotEligible);
        };

        info!(
            user_id = %user_id,
            campaign_key = %campaign.key,
            variation_name = %variation.name,
            "user bucketed into variation"
        );

        match lookup {
            ProfileLookup::Found(profile) => {
                self.save_assignment(profile, &campaign.key, &variation.name)
                    .await
            }
            ProfileLookup::Missing => {
                self.save_assignment(UserProfile::new(user_id), &campaign.key, &variation.name)
                    .await
            }
            // Writing a fresh record after a failed read would drop the
            // user's other assignments.
            ProfileLookup::Failed => {
                debug!(user_id = %user_id, "skipping write-back after failed lookup")
            }
        }

        (Some(decision_for(variation)), DecisionSource::Bucketed)
    }

    /// Audience check followed by variation selection, ignoring the store.
    pub fn get_variation_allotted<'a>(
        &self,
        user_id: &str,
        campaign: &'a Campaign,
    ) -> Option<&'a Variation> {
        if !is_user_part_of_campaign(user_id, campaign) {
            debug!(
                user_id = %user_id,
                campaign_key = %campaign.key,
                "user not part of campaign traffic"
            );
            return None;
        }
        bucket_user_to_variation(user_id, campaign)
    }

    async fn lookup_profile(&self, user_id: &str) -> ProfileLookup {
        let Some(store) = &self.store else {
            return ProfileLookup::Missing;
        };

        let result = match tokio::time::timeout(self.store_timeout, store.lookup(user_id)).await {
            Ok(result) => result,
            Err(_) => Err(ExperimentError::Timeout),
        };

        match result {
            Ok(Some(profile)) => ProfileLookup::Found(profile),
            Ok(None) => {
                debug!(user_id = %user_id, "no stored profile");
                ProfileLookup::Missing
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "user profile lookup failed");
                counter!(
                    USER_PROFILE_STORE_ERRORS_COUNTER,
                    "operation" => "lookup",
                    "reason" => e.error_code()
                )
                .increment(1);
                ProfileLookup::Failed
            }
        }
    }

    async fn save_assignment(&self, profile: UserProfile, campaign_key: &str, variation_name: &str) {
        let Some(store) = &self.store else {
            return;
        };

        let profile = profile.with_assignment(campaign_key, variation_name);
        let user_id = profile.user_id.clone();

        let result = match tokio::time::timeout(self.store_timeout, store.save(profile)).await {
            Ok(result) => result,
            Err(_) => Err(ExperimentError::Timeout),
        };

        match result {
            Ok(()) => {
                debug!(user_id = %user_id, campaign_key = %campaign_key, "saved user profile");
                counter!(USER_PROFILE_STORE_WRITES_COUNTER).increment(1);
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "user profile save failed");
                counter!(
                    USER_PROFILE_STORE_ERRORS_COUNTER,
                    "operation" => "save",
                    "reason" => e.error_code()
                )
                .increment(1);
            }
        }
    }
}

/// The stored variation for this campaign, if it still exists by name.
fn stored_variation<'a>(profile: &UserProfile, campaign: &'a Campaign) -> Option<&'a Variation> {
    let name = profile.variation_name_for(&campaign.key)?;
    let variation = campaign.variation_by_name(name);
    if variation.is_none() {
        debug!(
            campaign_key = %campaign.key,
            variation_name = %name,
            "stored variation no longer exists, bucketing again"
        );
    }
    variation
}

fn decision_for(variation: &Variation) -> VariationDecision {
    VariationDecision {
        variation_id: variation.id,
        variation_name: variation.name.clone(),
    }
}
