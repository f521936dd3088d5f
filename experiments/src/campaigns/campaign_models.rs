use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum CampaignStatus {
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(other)]
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum GoalType {
    #[serde(rename = "REVENUE_TRACKING")]
    Revenue,
    #[serde(rename = "CUSTOM_GOAL")]
    Custom,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariationDefinition {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoalDefinition {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    pub identifier: String,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CampaignDefinition {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    pub key: String,
    pub status: CampaignStatus,
    #[serde(rename = "percentTraffic")]
    pub percent_traffic: u32,
    pub variations: Vec<VariationDefinition>,
    #[serde(default)]
    pub goals: Vec<GoalDefinition>,
}

/// The settings document exactly as the settings endpoint serves it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsFile {
    #[serde(rename = "accountId", deserialize_with = "deserialize_id")]
    pub account_id: i64,
    #[serde(deserialize_with = "deserialize_version")]
    pub version: String,
    #[serde(deserialize_with = "deserialize_campaigns")]
    pub campaigns: Vec<CampaignDefinition>,
}

impl SettingsFile {
    pub fn from_json(payload: &str) -> Result<SettingsFile, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

// Ids, weights and versions may be sent as numbers or as numeric strings.

fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("id {n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("id {s:?} is not an integer"))),
        other => Err(de::Error::custom(format!(
            "expected a number or a string id, got {other}"
        ))),
    }
}

fn deserialize_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("{s:?} is not a number"))),
        other => Err(de::Error::custom(format!(
            "expected a number or a numeric string, got {other}"
        ))),
    }
}

fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        other => Err(de::Error::custom(format!(
            "expected a number or a string version, got {other}"
        ))),
    }
}

/// `campaigns` is either a list, or an empty object when the account has none.
fn deserialize_campaigns<'de, D>(deserializer: D) -> Result<Vec<CampaignDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => {
            serde_json::from_value(Value::Array(items)).map_err(de::Error::custom)
        }
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        other => Err(de::Error::custom(format!(
            "expected a list of campaigns, got {other}"
        ))),
    }
}
