use std::collections::HashMap;

use metrics::counter;
use tracing::{debug, instrument};

use crate::api::errors::ExperimentError;
use crate::bucketing::range_allocator::{allocate, BucketRange, MAX_TRAFFIC_VALUE};
use crate::campaigns::campaign_models::{
    CampaignDefinition, CampaignStatus, GoalType, SettingsFile,
};
use crate::campaigns::settings_validation::validate_settings;
use crate::metrics::consts::SETTINGS_LOADED_COUNTER;

#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    pub id: i64,
    pub name: String,
    pub weight: Option<f64>,
    pub range: BucketRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    pub id: i64,
    pub identifier: String,
    pub goal_type: GoalType,
}

/// A campaign with its variation bucket ranges computed.
///
/// Built once from a [`CampaignDefinition`] when settings are loaded and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: i64,
    pub key: String,
    pub status: CampaignStatus,
    pub traffic_allocation: u32,
    pub variations: Vec<Variation>,
    pub goals: Vec<Goal>,
}

impl Campaign {
    pub fn compile(definition: &CampaignDefinition) -> Campaign {
        let weights: Vec<Option<f64>> = definition.variations.iter().map(|v| v.weight).collect();
        let ranges = allocate(&weights, MAX_TRAFFIC_VALUE);

        let variations = definition
            .variations
            .iter()
            .zip(ranges)
            .map(|(variation, range)| {
                debug!(
                    campaign_key = %definition.key,
                    variation_name = %variation.name,
                    weight = ?variation.weight,
                    start = range.start,
                    end = range.end,
                    "allocated variation range"
                );
                Variation {
                    id: variation.id,
                    name: variation.name.clone(),
                    weight: variation.weight,
                    range,
                }
            })
            .collect();

        let goals = definition
            .goals
            .iter()
            .map(|goal| Goal {
                id: goal.id,
                identifier: goal.identifier.clone(),
                goal_type: goal.goal_type,
            })
            .collect();

        Campaign {
            id: definition.id,
            key: definition.key.clone(),
            status: definition.status.clone(),
            traffic_allocation: definition.percent_traffic,
            variations,
            goals,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == CampaignStatus::Running
    }

    pub fn variation_by_name(&self, name: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.name == name)
    }

    pub fn goal_by_identifier(&self, identifier: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.identifier == identifier)
    }
}

/// The loaded settings document. Immutable; a changed document is loaded again
/// as a whole and swapped in.
#[derive(Debug, Clone)]
pub struct Settings {
    account_id: i64,
    version: String,
    campaigns: Vec<Campaign>,
    campaign_index: HashMap<String, usize>,
}

impl Settings {
    /// Validates a parsed document and compiles every campaign.
    #[instrument(skip_all, fields(account_id = document.account_id, version = %document.version))]
    pub fn load(document: SettingsFile) -> Result<Settings, ExperimentError> {
        validate_settings(&document)?;

        let campaigns: Vec<Campaign> = document.campaigns.iter().map(Campaign::compile).collect();
        let campaign_index = campaigns
            .iter()
            .enumerate()
            .map(|(index, campaign)| (campaign.key.clone(), index))
            .collect();

        debug!(campaigns = campaigns.len(), "settings file processed");
        counter!(SETTINGS_LOADED_COUNTER).increment(1);

        Ok(Settings {
            account_id: document.account_id,
            version: document.version,
            campaigns,
            campaign_index,
        })
    }

    pub fn from_json(payload: &str) -> Result<Settings, ExperimentError> {
        Settings::load(SettingsFile::from_json(payload)?)
    }

    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn campaign(&self, key: &str) -> Option<&Campaign> {
        self.campaign_index
            .get(key)
            .and_then(|index| self.campaigns.get(*index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::settings_json;

    #[test]
    fn test_load_compiles_ranges() {
        let settings = Settings::from_json(&settings_json()).unwrap();

        assert_eq!(settings.account_id(), 60781);
        assert_eq!(settings.version(), "1");

        let campaign = settings.campaign("homepage-cta").unwrap();
        assert!(campaign.is_running());
        assert_eq!(campaign.traffic_allocation, 50);
        assert_eq!(
            campaign.variation_by_name("Control").unwrap().range,
            BucketRange {
                start: 1,
                end: 5000
            }
        );
        assert_eq!(
            campaign.variation_by_name("Variation-1").unwrap().range,
            BucketRange {
                start: 5001,
                end: 10000
            }
        );
    }

    #[test]
    fn test_zero_weight_variation_is_unreachable() {
        let settings = Settings::from_json(&settings_json()).unwrap();
        let campaign = settings.campaign("zero-weight").unwrap();

        assert!(campaign
            .variation_by_name("Disabled")
            .unwrap()
            .range
            .is_unreachable());
        assert_eq!(
            campaign.variation_by_name("Enabled").unwrap().range,
            BucketRange {
                start: 1,
                end: 10000
            }
        );
    }

    #[test]
    fn test_lookup_by_key_goal_and_variation() {
        let settings = Settings::from_json(&settings_json()).unwrap();

        assert!(settings.campaign("missing").is_none());
        assert!(!settings.campaign("paused-campaign").unwrap().is_running());

        let campaign = settings.campaign("homepage-cta").unwrap();
        assert_eq!(
            campaign.goal_by_identifier("purchase").unwrap().goal_type,
            GoalType::Revenue
        );
        assert!(campaign.goal_by_identifier("missing").is_none());
        assert!(campaign.variation_by_name("missing").is_none());
    }

    #[test]
    fn test_invalid_settings_are_not_loaded() {
        let payload = r#"{
            "accountId": 1,
            "version": 1,
            "campaigns": [
                {"id": 1, "key": "dup", "status": "RUNNING", "percentTraffic": 10,
                 "variations": [{"id": 1, "name": "a", "weight": 100}]},
                {"id": 2, "key": "dup", "status": "RUNNING", "percentTraffic": 10,
                 "variations": [{"id": 1, "name": "a", "weight": 100}]}
            ]
        }"#;
        match Settings::from_json(payload) {
            Err(ExperimentError::InvalidSettings(_)) => (),
            other => panic!("Expected InvalidSettings, got {:?}", other),
        }

        match Settings::from_json("not json") {
            Err(ExperimentError::SettingsParsingError(_)) => (),
            other => panic!("Expected SettingsParsingError, got {:?}", other),
        }
    }
}
