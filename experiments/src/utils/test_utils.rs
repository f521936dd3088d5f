use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;

use crate::api::errors::ExperimentError;
use crate::campaigns::campaign_models::{CampaignDefinition, CampaignStatus, VariationDefinition};
use crate::campaigns::compiled::Campaign;
use crate::decision::redis_store::RedisClient;
use crate::decision::user_profile::{UserProfile, UserProfileStore};
use crate::events::event_dispatcher::EventDispatcher;
use crate::events::impression::Impression;

/// Settings document used across tests.
///
/// - `homepage-cta`: running, 50% traffic, Control/Variation-1 at 50/50, a
///   revenue goal `purchase` (215) and a custom goal `signup` (216)
/// - `zero-weight`: running, 100% traffic, `Disabled` at weight 0
/// - `paused-campaign`: not running
/// - `full-traffic`: running, 100% traffic, 50/50
pub fn settings_json() -> String {
    json!({
        "accountId": 60781,
        "version": 1,
        "campaigns": [
            {
                "id": 230,
                "key": "homepage-cta",
                "status": "RUNNING",
                "percentTraffic": 50,
                "variations": [
                    {"id": 1, "name": "Control", "weight": 50},
                    {"id": 2, "name": "Variation-1", "weight": 50}
                ],
                "goals": [
                    {"id": 215, "identifier": "purchase", "type": "REVENUE_TRACKING"},
                    {"id": 216, "identifier": "signup", "type": "CUSTOM_GOAL"}
                ]
            },
            {
                "id": 231,
                "key": "zero-weight",
                "status": "RUNNING",
                "percentTraffic": 100,
                "variations": [
                    {"id": 1, "name": "Disabled", "weight": 0},
                    {"id": 2, "name": "Enabled", "weight": 100}
                ]
            },
            {
                "id": 232,
                "key": "paused-campaign",
                "status": "PAUSED",
                "percentTraffic": 100,
                "variations": [{"id": 1, "name": "Control", "weight": 100}]
            },
            {
                "id": 233,
                "key": "full-traffic",
                "status": "RUNNING",
                "percentTraffic": 100,
                "variations": [
                    {"id": 1, "name": "Control", "weight": 50},
                    {"id": 2, "name": "Variation-1", "weight": 50}
                ]
            }
        ]
    })
    .to_string()
}

/// Running campaign with variations ids `1..` in the given order.
pub fn campaign(key: &str, traffic: u32, variations: &[(&str, Option<f64>)]) -> Campaign {
    let definition = CampaignDefinition {
        id: 1,
        key: key.to_string(),
        status: CampaignStatus::Running,
        percent_traffic: traffic,
        variations: variations
            .iter()
            .enumerate()
            .map(|(index, (name, weight))| VariationDefinition {
                id: index as i64 + 1,
                name: name.to_string(),
                weight: *weight,
            })
            .collect(),
        goals: Vec::new(),
    };
    Campaign::compile(&definition)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStoreBehavior {
    Ok,
    Unavailable,
    Delay(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Lookup(String),
    Save(UserProfile),
}

/// Sticky store with scripted failures. Calls are recorded in order.
#[derive(Clone)]
pub struct MockUserProfileStore {
    profiles: Arc<DashMap<String, UserProfile>>,
    lookup_behavior: MockStoreBehavior,
    save_behavior: MockStoreBehavior,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl Default for MockUserProfileStore {
    fn default() -> Self {
        Self {
            profiles: Arc::new(DashMap::new()),
            lookup_behavior: MockStoreBehavior::Ok,
            save_behavior: MockStoreBehavior::Ok,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockUserProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<StoreCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.profiles.insert(profile.user_id.clone(), profile);
        self
    }

    pub fn lookup_behavior(mut self, behavior: MockStoreBehavior) -> Self {
        self.lookup_behavior = behavior;
        self
    }

    pub fn save_behavior(mut self, behavior: MockStoreBehavior) -> Self {
        self.save_behavior = behavior;
        self
    }

    pub fn get_calls(&self) -> Vec<StoreCall> {
        self.lock_calls().clone()
    }

    async fn apply(behavior: MockStoreBehavior) -> Result<(), ExperimentError> {
        match behavior {
            MockStoreBehavior::Ok => Ok(()),
            MockStoreBehavior::Unavailable => Err(ExperimentError::StoreUnavailable(
                "mock store unavailable".to_string(),
            )),
            MockStoreBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UserProfileStore for MockUserProfileStore {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, ExperimentError> {
        self.lock_calls()
            .push(StoreCall::Lookup(user_id.to_string()));
        Self::apply(self.lookup_behavior).await?;
        Ok(self.profiles.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, profile: UserProfile) -> Result<(), ExperimentError> {
        self.lock_calls().push(StoreCall::Save(profile.clone()));
        Self::apply(self.save_behavior).await?;
        self.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisCall {
    Get(String),
    Set(String, String),
}

/// In-memory stand-in for Redis with scripted failures. Calls are recorded in order.
#[derive(Clone)]
pub struct MockRedisClient {
    values: Arc<DashMap<String, String>>,
    get_behavior: MockStoreBehavior,
    set_behavior: MockStoreBehavior,
    calls: Arc<Mutex<Vec<RedisCall>>>,
}

impl Default for MockRedisClient {
    fn default() -> Self {
        Self {
            values: Arc::new(DashMap::new()),
            get_behavior: MockStoreBehavior::Ok,
            set_behavior: MockStoreBehavior::Ok,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get_behavior(mut self, behavior: MockStoreBehavior) -> Self {
        self.get_behavior = behavior;
        self
    }

    pub fn set_behavior(mut self, behavior: MockStoreBehavior) -> Self {
        self.set_behavior = behavior;
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    pub fn get_calls(&self) -> Vec<RedisCall> {
        self.lock_calls().clone()
    }
}

#[async_trait]
impl RedisClient for MockRedisClient {
    async fn get(&self, key: String) -> Result<Option<String>, ExperimentError> {
        self.lock_calls().push(RedisCall::Get(key.clone()));
        MockUserProfileStore::apply(self.get_behavior).await?;
        Ok(self.value(&key))
    }

    async fn set(&self, key: String, value: String) -> Result<(), ExperimentError> {
        self.lock_calls()
            .push(RedisCall::Set(key.clone(), value.clone()));
        MockUserProfileStore::apply(self.set_behavior).await?;
        self.values.insert(key, value);
        Ok(())
    }
}

/// Dispatcher that records every impression it is handed.
#[derive(Clone, Default)]
pub struct MockEventDispatcher {
    impressions: Arc<Mutex<Vec<Impression>>>,
    fail: bool,
}

impl MockEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records impressions but reports every dispatch as failed.
    pub fn failing() -> Self {
        Self {
            impressions: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn get_impressions(&self) -> Vec<Impression> {
        match self.impressions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl EventDispatcher for MockEventDispatcher {
    async fn dispatch(&self, impression: &Impression) -> Result<(), ExperimentError> {
        match self.impressions.lock() {
            Ok(mut guard) => guard.push(impression.clone()),
            Err(poisoned) => poisoned.into_inner().push(impression.clone()),
        }
        if self.fail {
            return Err(ExperimentError::DispatchError(
                "mock dispatcher failure".to_string(),
            ));
        }
        Ok(())
    }
}
