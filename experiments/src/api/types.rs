use serde::{Deserialize, Serialize};

/// The variation a user was assigned to within one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VariationDecision {
    pub variation_id: i64,
    pub variation_name: String,
}

/// Where a decision came from. Used for log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Sticky,
    Bucketed,
    NotEligible,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DecisionSource::Sticky => "sticky",
                DecisionSource::Bucketed => "bucketed",
                DecisionSource::NotEligible => "none",
            }
        )
    }
}
