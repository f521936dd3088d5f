use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::instrument;

use crate::api::errors::ExperimentError;
use crate::decision::user_profile::{UserProfile, UserProfileStore};

pub const USER_PROFILE_KEY_PREFIX: &str = "experiments:user_profile:";

/// The Redis commands the sticky store needs.
#[async_trait]
pub trait RedisClient: Send + Sync {
    async fn get(&self, key: String) -> Result<Option<String>, ExperimentError>;
    async fn set(&self, key: String, value: String) -> Result<(), ExperimentError>;
}

/// Live connection, multiplexed across concurrent callers.
#[derive(Clone)]
pub struct RedisConnection {
    connection: MultiplexedConnection,
}

impl RedisConnection {
    pub async fn new(addr: &str) -> Result<Self, ExperimentError> {
        let client = redis::Client::open(addr)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl RedisClient for RedisConnection {
    async fn get(&self, key: String) -> Result<Option<String>, ExperimentError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw)
    }

    async fn set(&self, key: String, value: String) -> Result<(), ExperimentError> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}

/// Sticky store backed by Redis, one JSON document per user.
#[derive(Clone)]
pub struct RedisUserProfileStore {
    client: Arc<dyn RedisClient>,
}

impl RedisUserProfileStore {
    pub async fn new(addr: &str) -> Result<Self, ExperimentError> {
        let connection = RedisConnection::new(addr).await?;
        Ok(Self::with_client(Arc::new(connection)))
    }

    pub fn with_client(client: Arc<dyn RedisClient>) -> Self {
        Self { client }
    }
}

pub fn user_profile_key(user_id: &str) -> String {
    format!("{USER_PROFILE_KEY_PREFIX}{user_id}")
}

/// A missing or empty value means no profile. A value that does not parse is
/// reported as an unavailable store so the caller falls back to bucketing.
pub fn decode_profile(raw: Option<String>) -> Result<Option<UserProfile>, ExperimentError> {
    match raw {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => serde_json::from_str(&value)
            .map(Some)
            .map_err(|e| ExperimentError::StoreUnavailable(format!("malformed profile: {e}"))),
    }
}

#[async_trait]
impl UserProfileStore for RedisUserProfileStore {
    #[instrument(skip_all)]
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, ExperimentError> {
        let raw = self.client.get(user_profile_key(user_id)).await?;
        decode_profile(raw)
    }

    #[instrument(skip_all)]
    async fn save(&self, profile: UserProfile) -> Result<(), ExperimentError> {
        let payload = serde_json::to_string(&profile)
            .map_err(|e| ExperimentError::StoreUnavailable(e.to_string()))?;
        self.client
            .set(user_profile_key(&profile.user_id), payload)
            .await
    }
}
