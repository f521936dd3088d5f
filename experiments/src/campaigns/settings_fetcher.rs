use std::time::Duration;

use metrics::counter;
use reqwest::Client;
use tracing::{debug, error, instrument};

use crate::api::errors::ExperimentError;
use crate::campaigns::compiled::Settings;
use crate::metrics::consts::SETTINGS_FETCH_ERRORS_COUNTER;
use crate::utils::http::build_http_client;

pub const SETTINGS_PATH: &str = "/server-side/settings";
pub const API_VERSION: u32 = 2;
pub const PLATFORM: &str = "server";

/// Retrieves the settings document for an account. One attempt per call.
#[derive(Clone)]
pub struct SettingsFetcher {
    client: Client,
    base_url: String,
}

impl SettingsFetcher {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ExperimentError> {
        let client = build_http_client(request_timeout)
            .map_err(|e| ExperimentError::SettingsFetchError(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches the raw document body.
    #[instrument(skip_all, fields(account_id = %account_id))]
    pub async fn fetch_raw(&self, account_id: &str, sdk_key: &str) -> Result<String, ExperimentError> {
        if account_id.is_empty() {
            return Err(ExperimentError::InvalidArgument(
                "account_id must not be empty".to_string(),
            ));
        }
        if sdk_key.is_empty() {
            return Err(ExperimentError::InvalidArgument(
                "sdk_key must not be empty".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, SETTINGS_PATH);
        let random = rand::random::<f64>().to_string();
        let api_version = API_VERSION.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("a", account_id),
                ("i", sdk_key),
                ("r", random.as_str()),
                ("platform", PLATFORM),
                ("api-version", api_version.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("settings request failed: {}", e);
                counter!(SETTINGS_FETCH_ERRORS_COUNTER, "reason" => "transport").increment(1);
                ExperimentError::SettingsFetchError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "settings endpoint returned an error");
            counter!(SETTINGS_FETCH_ERRORS_COUNTER, "reason" => "status").increment(1);
            return Err(ExperimentError::SettingsFetchError(format!(
                "settings endpoint responded with {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            counter!(SETTINGS_FETCH_ERRORS_COUNTER, "reason" => "body").increment(1);
            ExperimentError::SettingsFetchError(e.to_string())
        })?;
        debug!(bytes = body.len(), "fetched settings");
        Ok(body)
    }

    /// Fetches and loads the document.
    pub async fn fetch(&self, account_id: &str, sdk_key: &str) -> Result<Settings, ExperimentError> {
        let body = self.fetch_raw(account_id, sdk_key).await?;
        Settings::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::settings_json;
    use httpmock::prelude::*;

    fn fetcher(server: &MockServer) -> SettingsFetcher {
        SettingsFetcher::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_account_and_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/server-side/settings")
                .query_param("a", "60781")
                .query_param("i", "sdk-key")
                .query_param("platform", "server")
                .query_param("api-version", "2")
                .query_param_exists("r");
            then.status(200)
                .header("content-type", "application/json")
                .body(settings_json());
        });

        let settings = fetcher(&server).fetch("60781", "sdk-key").await.unwrap();

        mock.assert();
        assert_eq!(settings.account_id(), 60781);
        assert!(settings.campaign("homepage-cta").is_some());
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_arguments_without_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/server-side/settings");
            then.status(200).body(settings_json());
        });

        let fetcher = fetcher(&server);
        match fetcher.fetch("", "sdk-key").await {
            Err(ExperimentError::InvalidArgument(_)) => (),
            other => panic!("Expected InvalidArgument, got {:?}", other.map(|_| ())),
        }
        match fetcher.fetch("60781", "").await {
            Err(ExperimentError::InvalidArgument(_)) => (),
            other => panic!("Expected InvalidArgument, got {:?}", other.map(|_| ())),
        }
        assert_eq!(mock.hits(), 0);
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/server-side/settings");
            then.status(403).body("forbidden");
        });

        match fetcher(&server).fetch("60781", "bad-key").await {
            Err(ExperimentError::SettingsFetchError(message)) => {
                assert!(message.contains("403"), "unexpected message: {message}")
            }
            other => panic!("Expected SettingsFetchError, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_fetch_surfaces_parse_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/server-side/settings");
            then.status(200).body("{\"accountId\": 1");
        });

        match fetcher(&server).fetch("60781", "sdk-key").await {
            Err(ExperimentError::SettingsParsingError(_)) => (),
            other => panic!("Expected SettingsParsingError, got {:?}", other.map(|_| ())),
        }
    }
}
