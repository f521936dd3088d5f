use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::api::types::VariationDecision;
use crate::campaigns::campaign_models::GoalType;
use crate::campaigns::compiled::{Campaign, Goal};
use crate::campaigns::settings_fetcher::PLATFORM;
use crate::events::uuid_utils::generate_visitor_uuid;
use crate::utils::http::{SDK_NAME, SDK_VERSION};

pub const TRACK_USER_PATH: &str = "/server-side/track-user";
pub const TRACK_GOAL_PATH: &str = "/server-side/track-goal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpressionKind {
    TrackUser,
    TrackGoal,
}

impl ImpressionKind {
    pub fn path(&self) -> &'static str {
        match self {
            ImpressionKind::TrackUser => TRACK_USER_PATH,
            ImpressionKind::TrackGoal => TRACK_GOAL_PATH,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpressionKind::TrackUser => "track_user",
            ImpressionKind::TrackGoal => "track_goal",
        }
    }
}

/// An analytics event. Everything but `url` and `kind` goes on the querystring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Impression {
    #[serde(skip)]
    pub kind: ImpressionKind,
    #[serde(skip)]
    pub url: String,
    pub account_id: i64,
    pub experiment_id: i64,
    pub ap: &'static str,
    #[serde(rename = "uId")]
    pub user_id: String,
    pub combination: i64,
    pub random: f64,
    #[serde(rename = "sId")]
    pub session_id: i64,
    pub u: String,
    pub sdk: &'static str,
    #[serde(rename = "sdk-v")]
    pub sdk_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<i64>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
}

impl Impression {
    fn base(
        kind: ImpressionKind,
        events_base_url: &str,
        account_id: i64,
        campaign: &Campaign,
        decision: &VariationDecision,
        user_id: &str,
    ) -> Impression {
        Impression {
            kind,
            url: format!("{}{}", events_base_url.trim_end_matches('/'), kind.path()),
            account_id,
            experiment_id: campaign.id,
            ap: PLATFORM,
            user_id: user_id.to_string(),
            combination: decision.variation_id,
            random: rand::random::<f64>(),
            session_id: Utc::now().timestamp(),
            u: generate_visitor_uuid(user_id, &account_id.to_string()),
            sdk: SDK_NAME,
            sdk_version: SDK_VERSION,
            ed: None,
            goal_id: None,
            revenue: None,
        }
    }

    /// Impression recorded when a user is activated into a campaign.
    pub fn track_user(
        events_base_url: &str,
        account_id: i64,
        campaign: &Campaign,
        decision: &VariationDecision,
        user_id: &str,
    ) -> Impression {
        let mut impression = Self::base(
            ImpressionKind::TrackUser,
            events_base_url,
            account_id,
            campaign,
            decision,
            user_id,
        );
        impression.ed = Some(serde_json::json!({ "p": PLATFORM }).to_string());
        debug!(user_id = %user_id, campaign_key = %campaign.key, "built track-user impression");
        impression
    }

    /// Impression recorded on a goal conversion. Revenue is only sent for
    /// revenue goals.
    pub fn track_goal(
        events_base_url: &str,
        account_id: i64,
        campaign: &Campaign,
        decision: &VariationDecision,
        user_id: &str,
        goal: &Goal,
        revenue: Option<f64>,
    ) -> Impression {
        let mut impression = Self::base(
            ImpressionKind::TrackGoal,
            events_base_url,
            account_id,
            campaign,
            decision,
            user_id,
        );
        impression.goal_id = Some(goal.id);
        if goal.goal_type == GoalType::Revenue {
            impression.revenue = revenue;
        }
        debug!(
            user_id = %user_id,
            campaign_key = %campaign.key,
            goal_identifier = %goal.identifier,
            "built track-goal impression"
        );
        impression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::campaign;
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    fn decision() -> VariationDecision {
        VariationDecision {
            variation_id: 2,
            variation_name: "Variation-1".to_string(),
        }
    }

    fn goal(goal_type: GoalType) -> Goal {
        Goal {
            id: 215,
            identifier: "purchase".to_string(),
            goal_type,
        }
    }

    #[test]
    fn test_track_user_impression() {
        let campaign = campaign("homepage-cta", 50, &[("Control", Some(100.0))]);
        let impression = Impression::track_user(
            "https://events.example.com/",
            60781,
            &campaign,
            &decision(),
            "Ashley",
        );

        assert_eq!(impression.kind, ImpressionKind::TrackUser);
        assert_eq!(impression.url, "https://events.example.com/server-side/track-user");
        assert!((0.0..1.0).contains(&impression.random));
        assert!(impression.session_id > 0);

        assert_json_include!(
            actual: serde_json::to_value(&impression).unwrap(),
            expected: json!({
                "account_id": 60781,
                "experiment_id": campaign.id,
                "ap": "server",
                "uId": "Ashley",
                "combination": 2,
                "u": "C13C4BA1CB0C53CDB32B51AF403B3352",
                "sdk": SDK_NAME,
                "sdk-v": SDK_VERSION,
                "ed": "{\"p\":\"server\"}"
            })
        );

        let value = serde_json::to_value(&impression).unwrap();
        assert!(value.get("goal_id").is_none());
        assert!(value.get("r").is_none());
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_track_goal_impression_with_revenue() {
        let campaign = campaign("homepage-cta", 50, &[("Control", Some(100.0))]);
        let impression = Impression::track_goal(
            "https://events.example.com",
            60781,
            &campaign,
            &decision(),
            "Ashley",
            &goal(GoalType::Revenue),
            Some(12.5),
        );

        assert_eq!(impression.url, "https://events.example.com/server-side/track-goal");
        assert_json_include!(
            actual: serde_json::to_value(&impression).unwrap(),
            expected: json!({"goal_id": 215, "r": 12.5, "combination": 2})
        );
        assert!(impression.ed.is_none());
    }

    #[test]
    fn test_custom_goal_drops_revenue() {
        let campaign = campaign("homepage-cta", 50, &[("Control", Some(100.0))]);
        let impression = Impression::track_goal(
            "https://events.example.com",
            60781,
            &campaign,
            &decision(),
            "Ashley",
            &goal(GoalType::Custom),
            Some(12.5),
        );

        assert_eq!(impression.goal_id, Some(215));
        assert_eq!(impression.revenue, None);
    }
}
