use std::time::Duration;

use reqwest::{header, Client};

pub const SDK_NAME: &str = "experiments-rust";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client shared by the settings fetcher and the impression dispatcher.
pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(format!("{SDK_NAME}/{SDK_VERSION}"))
        .timeout(request_timeout)
        .build()
}
