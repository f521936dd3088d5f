use std::collections::HashSet;

use crate::api::errors::ExperimentError;
use crate::bucketing::range_allocator::MAX_TRAFFIC_PERCENT;
use crate::campaigns::campaign_models::{CampaignDefinition, SettingsFile};

/// Structural checks a parsed settings document must pass before it is compiled.
///
/// Weight totals are deliberately not checked: under- and over-allocated
/// campaigns are legal and handled by the range allocator.
pub fn validate_settings(settings: &SettingsFile) -> Result<(), ExperimentError> {
    let mut seen_keys = HashSet::new();
    for campaign in &settings.campaigns {
        if campaign.key.is_empty() {
            return Err(ExperimentError::InvalidSettings(format!(
                "campaign {} has an empty key",
                campaign.id
            )));
        }
        if !seen_keys.insert(campaign.key.as_str()) {
            return Err(ExperimentError::InvalidSettings(format!(
                "campaign key {} appears more than once",
                campaign.key
            )));
        }
        validate_campaign(campaign)?;
    }
    Ok(())
}

fn validate_campaign(campaign: &CampaignDefinition) -> Result<(), ExperimentError> {
    if campaign.percent_traffic > MAX_TRAFFIC_PERCENT {
        return Err(ExperimentError::InvalidSettings(format!(
            "campaign {} has traffic allocation {} outside 0..=100",
            campaign.key, campaign.percent_traffic
        )));
    }

    if campaign.variations.is_empty() {
        return Err(ExperimentError::InvalidSettings(format!(
            "campaign {} has no variations",
            campaign.key
        )));
    }

    let mut names = HashSet::new();
    for variation in &campaign.variations {
        if let Some(weight) = variation.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ExperimentError::InvalidSettings(format!(
                    "variation {} of campaign {} has invalid weight {}",
                    variation.name, campaign.key, weight
                )));
            }
        }
        if !names.insert(variation.name.as_str()) {
            return Err(ExperimentError::InvalidSettings(format!(
                "variation name {} appears more than once in campaign {}",
                variation.name, campaign.key
            )));
        }
    }

    let mut goal_identifiers = HashSet::new();
    for goal in &campaign.goals {
        if !goal_identifiers.insert(goal.identifier.as_str()) {
            return Err(ExperimentError::InvalidSettings(format!(
                "goal {} appears more than once in campaign {}",
                goal.identifier, campaign.key
            )));
        }
    }

    Ok(())
}
