use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::api::errors::ExperimentError;
use crate::api::types::VariationDecision;
use crate::campaigns::campaign_models::GoalType;
use crate::campaigns::compiled::{Campaign, Settings};
use crate::campaigns::settings_fetcher::SettingsFetcher;
use crate::config::Config;
use crate::decision::decision_service::{DecisionService, DEFAULT_STORE_TIMEOUT};
use crate::decision::redis_store::RedisUserProfileStore;
use crate::decision::user_profile::UserProfileStore;
use crate::events::event_dispatcher::{EventDispatcher, HttpEventDispatcher};
use crate::events::impression::Impression;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub events_base_url: String,
    pub store_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            events_base_url: "https://dev.visualwebsiteoptimizer.com".to_string(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Application-facing entry point.
///
/// Holds the current settings document, the decision service and the
/// impression dispatcher. Settings are replaced as a whole by
/// [`refresh_settings`](Self::refresh_settings); in-flight calls keep using the
/// document they started with.
pub struct ExperimentClient {
    settings: RwLock<Arc<Settings>>,
    decision_service: DecisionService,
    dispatcher: Arc<dyn EventDispatcher>,
    options: ClientOptions,
}

impl ExperimentClient {
    pub fn new(
        settings: Settings,
        store: Option<Arc<dyn UserProfileStore>>,
        dispatcher: Arc<dyn EventDispatcher>,
        options: ClientOptions,
    ) -> Self {
        Self {
            settings: RwLock::new(Arc::new(settings)),
            decision_service: DecisionService::new(store, options.store_timeout),
            dispatcher,
            options,
        }
    }

    /// Builds a client from configuration: settings from `SETTINGS_FILE` or
    /// the settings endpoint, Redis sticky store when `REDIS_URL` is set.
    pub async fn from_config(config: &Config) -> Result<Self, ExperimentError> {
        let settings = match config.settings_file_path() {
            Some(path) => {
                let payload = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    ExperimentError::InvalidArgument(format!(
                        "cannot read settings file {}: {e}",
                        path.display()
                    ))
                })?;
                Settings::from_json(&payload)?
            }
            None => {
                SettingsFetcher::new(&config.settings_base_url, config.request_timeout())?
                    .fetch(&config.account_id, &config.sdk_key)
                    .await?
            }
        };

        let store: Option<Arc<dyn UserProfileStore>> = match config.redis_url() {
            Some(url) => Some(Arc::new(RedisUserProfileStore::new(url).await?)),
            None => None,
        };

        let dispatcher = HttpEventDispatcher::new(config.request_timeout(), *config.development_mode)?;

        Ok(Self::new(
            settings,
            store,
            Arc::new(dispatcher),
            ClientOptions {
                events_base_url: config.events_base_url.clone(),
                store_timeout: config.store_timeout(),
            },
        ))
    }

    pub async fn settings(&self) -> Arc<Settings> {
        self.settings.read().await.clone()
    }

    /// Decision for a running campaign, without an impression. `None` covers
    /// every reason a user gets no variation.
    #[instrument(skip_all, fields(campaign_key = %campaign_key, user_id = %user_id))]
    pub async fn decide(&self, campaign_key: &str, user_id: &str) -> Option<VariationDecision> {
        if campaign_key.is_empty() || user_id.is_empty() {
            error!("decide called with an empty campaign key or user id");
            return None;
        }
        let settings = self.settings().await;
        let campaign = running_campaign(&settings, campaign_key).ok()?;
        self.decision_service.decide(user_id, campaign).await
    }

    /// Name of the variation the user is in, without an impression.
    #[instrument(skip_all, fields(campaign_key = %campaign_key, user_id = %user_id))]
    pub async fn get_variation(
        &self,
        campaign_key: &str,
        user_id: &str,
    ) -> Result<Option<String>, ExperimentError> {
        require_non_empty("campaign_key", campaign_key)?;
        require_non_empty("user_id", user_id)?;

        let settings = self.settings().await;
        let campaign = running_campaign(&settings, campaign_key)?;
        let decision = self.decision_service.decide(user_id, campaign).await;
        Ok(decision.map(|d| d.variation_name))
    }

    /// Like [`get_variation`](Self::get_variation), and records a track-user
    /// impression when the user gets a variation.
    #[instrument(skip_all, fields(campaign_key = %campaign_key, user_id = %user_id))]
    pub async fn activate(
        &self,
        campaign_key: &str,
        user_id: &str,
    ) -> Result<Option<String>, ExperimentError> {
        require_non_empty("campaign_key", campaign_key)?;
        require_non_empty("user_id", user_id)?;

        let settings = self.settings().await;
        let campaign = running_campaign(&settings, campaign_key)?;
        let Some(decision) = self.decision_service.decide(user_id, campaign).await else {
            debug!("user did not get a variation, no impression");
            return Ok(None);
        };

        let impression = Impression::track_user(
            &self.options.events_base_url,
            settings.account_id(),
            campaign,
            &decision,
            user_id,
        );
        self.dispatch(&impression).await;

        info!(variation_name = %decision.variation_name, "user activated");
        Ok(Some(decision.variation_name))
    }

    /// Records a goal conversion for the user's variation.
    ///
    /// `Ok(false)` when the user is not part of the campaign. Revenue is
    /// required for revenue goals and ignored for custom goals.
    #[instrument(skip_all, fields(campaign_key = %campaign_key, user_id = %user_id, goal_identifier = %goal_identifier))]
    pub async fn track(
        &self,
        campaign_key: &str,
        user_id: &str,
        goal_identifier: &str,
        revenue: Option<f64>,
    ) -> Result<bool, ExperimentError> {
        require_non_empty("campaign_key", campaign_key)?;
        require_non_empty("user_id", user_id)?;
        require_non_empty("goal_identifier", goal_identifier)?;
        if let Some(value) = revenue {
            if !value.is_finite() {
                return Err(ExperimentError::InvalidArgument(format!(
                    "revenue must be a finite number, got {value}"
                )));
            }
        }

        let settings = self.settings().await;
        let campaign = running_campaign(&settings, campaign_key)?;

        let goal = campaign.goal_by_identifier(goal_identifier).ok_or_else(|| {
            ExperimentError::GoalNotFound {
                campaign_key: campaign_key.to_string(),
                goal_identifier: goal_identifier.to_string(),
            }
        })?;
        if goal.goal_type == GoalType::Revenue && revenue.is_none() {
            return Err(ExperimentError::RevenueRequired {
                campaign_key: campaign_key.to_string(),
                goal_identifier: goal_identifier.to_string(),
            });
        }

        let Some(decision) = self.decision_service.decide(user_id, campaign).await else {
            debug!("user is not part of the campaign, goal not tracked");
            return Ok(false);
        };

        let impression = Impression::track_goal(
            &self.options.events_base_url,
            settings.account_id(),
            campaign,
            &decision,
            user_id,
            goal,
            revenue,
        );
        self.dispatch(&impression).await;

        info!(variation_name = %decision.variation_name, "goal tracked");
        Ok(true)
    }

    /// Fetches the account's settings again and swaps them in. The current
    /// document is kept when the fetch or load fails.
    #[instrument(skip_all)]
    pub async fn refresh_settings(
        &self,
        fetcher: &SettingsFetcher,
        sdk_key: &str,
    ) -> Result<(), ExperimentError> {
        let account_id = self.settings().await.account_id().to_string();
        let fresh = fetcher.fetch(&account_id, sdk_key).await.map_err(|e| {
            error!(error = %e, "settings refresh failed, keeping current settings");
            e
        })?;
        self.replace_settings(fresh).await;
        Ok(())
    }

    pub async fn replace_settings(&self, settings: Settings) {
        let version = settings.version().to_string();
        *self.settings.write().await = Arc::new(settings);
        info!(version = %version, "settings replaced");
    }

    async fn dispatch(&self, impression: &Impression) {
        if let Err(e) = self.dispatcher.dispatch(impression).await {
            error!(
                kind = impression.kind.as_str(),
                error = %e,
                "failed to dispatch impression"
            );
        }
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<(), ExperimentError> {
    if value.is_empty() {
        return Err(ExperimentError::InvalidArgument(format!(
            "{name} must not be empty"
        )));
    }
    Ok(())
}

fn running_campaign<'a>(settings: &'a Settings, key: &str) -> Result<&'a Campaign, ExperimentError> {
    match settings.campaign(key) {
        Some(campaign) if campaign.is_running() => Ok(campaign),
        _ => {
            error!(campaign_key = %key, "campaign not found or not running");
            Err(ExperimentError::CampaignNotRunning(key.to_string()))
        }
    }
}
