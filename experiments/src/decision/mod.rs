pub mod decision_service;
pub mod redis_store;
pub mod user_profile;
