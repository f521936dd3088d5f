pub mod api;
pub mod bucketing;
pub mod campaigns;
pub mod client;
pub mod config;
pub mod decision;
pub mod events;
pub mod metrics;

// Compiled into the library so the integration tests under tests/ can use
// the mocks and fixtures too.
pub mod utils;
