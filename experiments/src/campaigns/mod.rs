pub mod campaign_models;
pub mod compiled;
pub mod settings_fetcher;
pub mod settings_validation;
