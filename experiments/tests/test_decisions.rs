use std::sync::Arc;

use rstest::rstest;

use experiments::bucketing::bucketing_service::{bucket_user_to_variation, is_user_part_of_campaign};
use experiments::bucketing::hash_partitioner::{bucket_for, bucket_for_with_multiplier, hash_value};
use experiments::bucketing::range_allocator::MAX_TRAFFIC_VALUE;
use experiments::campaigns::compiled::Settings;
use experiments::decision::decision_service::{DecisionService, DEFAULT_STORE_TIMEOUT};
use experiments::decision::user_profile::{InMemoryUserProfileStore, UserProfileStore};
use experiments::utils::test_utils::{campaign, settings_json};

// Values every SDK must agree on: hash, percent bucket, variation bucket at
// multipliers 1, 2, 3 and 10.
#[rstest]
#[case("Dominic", 3222948109, 76, [7505, 15010, 22515, 75050])]
#[case("Emma", 1887162339, 44, [4394, 8789, 13184, 43948])]
#[case("Faizan", 1811472472, 43, [4218, 8437, 12655, 42186])]
#[case("Gimi", 1931096744, 45, [4497, 8994, 13491, 44971])]
#[case("Harry", 1078116974, 26, [2511, 5022, 7533, 25111])]
#[case("Ian", 2024899030, 48, [4715, 9431, 14146, 47155])]
#[case("Mona", 1115911145, 26, [2599, 5198, 7797, 25991])]
#[case("Nina", 2976878677, 70, [6932, 13864, 20796, 69320])]
#[case("Olivia", 1375380229, 33, [3203, 6406, 9609, 32033])]
#[case("Pete", 2772854445, 65, [6457, 12914, 19371, 64570])]
#[case("Queen", 2310168113, 54, [5379, 10759, 16139, 53797])]
#[case("Robert", 1150261924, 27, [2679, 5358, 8037, 26791])]
#[case("Tierra", 3015628327, 71, [7022, 14044, 21066, 70223])]
#[case("Una", 663501022, 16, [1545, 3091, 4637, 15458])]
#[case("Varun", 2025462540, 48, [4716, 9433, 14150, 47168])]
#[case("Xin", 1864705226, 44, [4342, 8685, 13027, 43426])]
#[case("You", 2284924846, 54, [5321, 10642, 15963, 53210])]
#[case("Zeba", 1601720116, 38, [3730, 7460, 11190, 37302])]
#[case("user-1", 2766583812, 65, [6442, 12884, 19327, 64424])]
#[case("user-2", 3527725579, 83, [8214, 16429, 24643, 82146])]
fn it_matches_the_shared_bucketing_fixture(
    #[case] user_id: &str,
    #[case] hash: u32,
    #[case] percent_bucket: u32,
    #[case] variation_buckets: [u32; 4],
) {
    assert_eq!(hash_value(user_id), hash);
    assert_eq!(bucket_for(user_id, 100), percent_bucket);
    for (multiplier, expected) in [1, 2, 3, 10].into_iter().zip(variation_buckets) {
        assert_eq!(
            bucket_for_with_multiplier(user_id, MAX_TRAFFIC_VALUE, multiplier),
            expected,
            "multiplier {multiplier}"
        );
    }
}

#[test]
fn it_keeps_variation_proportions_at_low_traffic() {
    let campaign = campaign(
        "low-traffic",
        20,
        &[("Control", Some(50.0)), ("Variation-1", Some(50.0))],
    );

    let mut included = 0;
    let mut control = 0;
    for i in 0..20_000 {
        let user_id = format!("visitor-{i}");
        if !is_user_part_of_campaign(&user_id, &campaign) {
            continue;
        }
        included += 1;
        if let Some(variation) = bucket_user_to_variation(&user_id, &campaign) {
            if variation.name == "Control" {
                control += 1;
            }
        }
    }

    let share = f64::from(control) / f64::from(included);
    assert!((3_000..=5_000).contains(&included), "included {included}");
    assert!((0.45..=0.55).contains(&share), "control share {share}");
}

#[test]
fn it_leaves_under_allocated_traffic_unassigned() {
    let campaign = campaign(
        "partial",
        100,
        &[("Control", Some(20.0)), ("Variation-1", Some(20.0))],
    );

    let assigned = (0..10_000)
        .filter(|i| bucket_user_to_variation(&format!("visitor-{i}"), &campaign).is_some())
        .count();
    assert!((3_600..=4_400).contains(&assigned), "assigned {assigned}");
}

#[tokio::test]
async fn it_keeps_sticky_assignments_across_weight_changes() {
    let store: Arc<dyn UserProfileStore> = Arc::new(InMemoryUserProfileStore::new());
    let service = DecisionService::new(Some(store.clone()), DEFAULT_STORE_TIMEOUT);

    let before = campaign(
        "rebalanced",
        100,
        &[("Control", Some(50.0)), ("Variation-1", Some(50.0))],
    );
    let users: Vec<String> = (0..200).map(|i| format!("user-{i}")).collect();
    let mut first_decisions = Vec::new();
    for user_id in &users {
        first_decisions.push(service.decide(user_id, &before).await);
    }

    // Same variation names, very different weights.
    let after = campaign(
        "rebalanced",
        100,
        &[("Control", Some(5.0)), ("Variation-1", Some(95.0))],
    );
    for (user_id, first) in users.iter().zip(first_decisions) {
        assert_eq!(service.decide(user_id, &after).await, first);
    }

    // Without the store the new weights apply.
    let stateless = DecisionService::without_store();
    let mut changed = 0;
    for user_id in &users {
        if stateless.decide(user_id, &after).await != service.decide(user_id, &after).await {
            changed += 1;
        }
    }
    assert!(changed > 0);
}

#[tokio::test]
async fn it_decides_from_loaded_settings() {
    let settings = Settings::from_json(&settings_json()).unwrap();
    let service = DecisionService::without_store();

    let zero_weight = settings.campaign("zero-weight").unwrap();
    for i in 0..500 {
        let decision = service
            .decide(&format!("visitor-{i}"), zero_weight)
            .await
            .unwrap();
        assert_eq!(decision.variation_name, "Enabled");
    }

    let homepage = settings.campaign("homepage-cta").unwrap();
    let decision = service.decide("Ashley", homepage).await.unwrap();
    assert_eq!((decision.variation_id, decision.variation_name.as_str()), (2, "Variation-1"));
}
