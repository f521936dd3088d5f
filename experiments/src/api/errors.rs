use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Campaign {0} is not running")]
    CampaignNotRunning(String),
    #[error("Goal {goal_identifier} not found for campaign {campaign_key}")]
    GoalNotFound {
        campaign_key: String,
        goal_identifier: String,
    },
    #[error("Revenue value is required for revenue goal {goal_identifier} of campaign {campaign_key}")]
    RevenueRequired {
        campaign_key: String,
        goal_identifier: String,
    },
    #[error("failed to parse settings: {0}")]
    SettingsParsingError(#[from] serde_json::Error),
    #[error("settings are not valid: {0}")]
    InvalidSettings(String),
    #[error("failed to fetch settings: {0}")]
    SettingsFetchError(String),
    #[error("failed to dispatch impression: {0}")]
    DispatchError(String),
    #[error("user profile store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Timed out while waiting on the user profile store")]
    Timeout,
}

impl ExperimentError {
    /// Returns a short error code for logs and metric labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExperimentError::InvalidArgument(_) => "invalid_argument",
            ExperimentError::CampaignNotRunning(_) => "campaign_not_running",
            ExperimentError::GoalNotFound { .. } => "goal_not_found",
            ExperimentError::RevenueRequired { .. } => "revenue_required",
            ExperimentError::SettingsParsingError(_) => "settings_parsing_error",
            ExperimentError::InvalidSettings(_) => "invalid_settings",
            ExperimentError::SettingsFetchError(_) => "settings_fetch_error",
            ExperimentError::DispatchError(_) => "dispatch_error",
            ExperimentError::StoreUnavailable(_) => "store_unavailable",
            ExperimentError::Timeout => "store_timeout",
        }
    }

    /// Store failures are always recovered inside the decision engine.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            ExperimentError::StoreUnavailable(_) | ExperimentError::Timeout
        )
    }
}

impl From<redis::RedisError> for ExperimentError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            ExperimentError::Timeout
        } else {
            ExperimentError::StoreUnavailable(err.to_string())
        }
    }
}
