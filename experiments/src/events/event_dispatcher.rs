use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::api::errors::ExperimentError;
use crate::events::impression::Impression;
use crate::metrics::consts::IMPRESSIONS_DISPATCHED_COUNTER;
use crate::utils::http::build_http_client;

/// Delivers impressions. One attempt per impression.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, impression: &Impression) -> Result<(), ExperimentError>;
}

pub struct HttpEventDispatcher {
    client: Client,
    development_mode: bool,
}

impl HttpEventDispatcher {
    pub fn new(request_timeout: Duration, development_mode: bool) -> Result<Self, ExperimentError> {
        let client = build_http_client(request_timeout)
            .map_err(|e| ExperimentError::DispatchError(e.to_string()))?;
        Ok(Self::with_client(client, development_mode))
    }

    pub fn with_client(client: Client, development_mode: bool) -> Self {
        Self {
            client,
            development_mode,
        }
    }
}

#[async_trait]
impl EventDispatcher for HttpEventDispatcher {
    #[instrument(skip_all, fields(kind = impression.kind.as_str(), experiment_id = impression.experiment_id))]
    async fn dispatch(&self, impression: &Impression) -> Result<(), ExperimentError> {
        if self.development_mode {
            debug!("development mode, impression not sent");
            counter!(IMPRESSIONS_DISPATCHED_COUNTER, "outcome" => "skipped").increment(1);
            return Ok(());
        }

        let response = self
            .client
            .get(&impression.url)
            .query(impression)
            .send()
            .await
            .map_err(|e| {
                counter!(IMPRESSIONS_DISPATCHED_COUNTER, "outcome" => "error").increment(1);
                ExperimentError::DispatchError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            counter!(IMPRESSIONS_DISPATCHED_COUNTER, "outcome" => "error").increment(1);
            return Err(ExperimentError::DispatchError(format!(
                "impression endpoint responded with {status}"
            )));
        }

        counter!(IMPRESSIONS_DISPATCHED_COUNTER, "outcome" => "sent").increment(1);
        debug!(status = status.as_u16(), "impression sent");
        Ok(())
    }
}
