pub mod event_dispatcher;
pub mod impression;
pub mod uuid_utils;
