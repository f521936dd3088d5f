// Decision counters
pub const DECISIONS_COUNTER: &str = "experiments_decisions_total";
pub const USER_PROFILE_STORE_ERRORS_COUNTER: &str = "experiments_user_profile_store_errors_total";
pub const USER_PROFILE_STORE_WRITES_COUNTER: &str = "experiments_user_profile_store_writes_total";

// Impression delivery
pub const IMPRESSIONS_DISPATCHED_COUNTER: &str = "experiments_impressions_dispatched_total";

// Settings lifecycle
pub const SETTINGS_LOADED_COUNTER: &str = "experiments_settings_loaded_total";
pub const SETTINGS_FETCH_ERRORS_COUNTER: &str = "experiments_settings_fetch_errors_total";
