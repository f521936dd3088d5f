use tracing::debug;

use crate::bucketing::hash_partitioner::{bucket_for, bucket_for_with_multiplier};
use crate::bucketing::range_allocator::{MAX_TRAFFIC_PERCENT, MAX_TRAFFIC_VALUE};
use crate::campaigns::compiled::{Campaign, Variation};

/// Whether the user falls inside the campaign's traffic allocation.
///
/// Fails closed: an empty user id is never part of any campaign.
pub fn is_user_part_of_campaign(user_id: &str, campaign: &Campaign) -> bool {
    if user_id.is_empty() {
        debug!(campaign_key = %campaign.key, "empty user id, not part of campaign");
        return false;
    }

    let value = bucket_for(user_id, MAX_TRAFFIC_PERCENT);
    let included = value != 0 && value <= campaign.traffic_allocation;

    debug!(
        user_id = %user_id,
        campaign_key = %campaign.key,
        bucket = value,
        traffic_allocation = campaign.traffic_allocation,
        included,
        "evaluated campaign traffic"
    );
    included
}

/// Stretch applied to the variation bucket so that the users admitted by a
/// partial traffic allocation still cover the whole variation space.
///
/// Two integer divisions, in this order. `None` when the campaign admits no
/// traffic at all.
pub fn traffic_multiplier(traffic_allocation: u32) -> Option<u32> {
    if traffic_allocation == 0 {
        return None;
    }
    Some((MAX_TRAFFIC_VALUE / traffic_allocation) / MAX_TRAFFIC_PERCENT)
}

pub fn bucket_user_to_variation<'a>(user_id: &str, campaign: &'a Campaign) -> Option<&'a Variation> {
    if user_id.is_empty() {
        return None;
    }
    let multiplier = traffic_multiplier(campaign.traffic_allocation)?;
    let bucket = bucket_for_with_multiplier(user_id, MAX_TRAFFIC_VALUE, multiplier);

    let variation = variation_for_bucket(campaign, bucket);
    match variation {
        Some(variation) => debug!(
            user_id = %user_id,
            campaign_key = %campaign.key,
            bucket,
            variation_name = %variation.name,
            "bucket matched variation"
        ),
        None => debug!(
            user_id = %user_id,
            campaign_key = %campaign.key,
            bucket,
            "bucket matched no variation"
        ),
    }
    variation
}

/// First variation whose range covers the bucket. Ranges never overlap.
pub fn variation_for_bucket(campaign: &Campaign, bucket: u32) -> Option<&Variation> {
    campaign.variations.iter().find(|v| v.range.contains(bucket))
}
