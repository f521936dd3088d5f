pub mod http;
pub mod test_utils;
