use anyhow::{bail, Context};
use envconfig::Envconfig;
use serde_json::json;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use experiments::client::ExperimentClient;
use experiments::config::Config;

const USAGE: &str = "usage: experiments <campaign_key> <user_id>...";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init_from_env().context("Invalid configuration")?;

    // Pretty output with span events under DEBUG, JSON otherwise. Level comes from RUST_LOG.
    let log_layer = {
        let base_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        if *config.debug {
            base_layer
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_ansi(true)
                .with_filter(EnvFilter::from_default_env())
                .boxed()
        } else {
            base_layer
                .json()
                .with_filter(EnvFilter::from_default_env())
                .boxed()
        }
    };
    tracing_subscriber::registry().with(log_layer).init();

    let mut args = std::env::args().skip(1);
    let Some(campaign_key) = args.next() else {
        bail!(USAGE);
    };
    let user_ids: Vec<String> = args.collect();
    if user_ids.is_empty() {
        bail!(USAGE);
    }

    let client = ExperimentClient::from_config(&config)
        .await
        .context("failed to initialize client")?;

    for user_id in user_ids {
        let decision = client.decide(&campaign_key, &user_id).await;
        let line = json!({
            "campaign_key": campaign_key,
            "user_id": user_id,
            "variation_id": decision.as_ref().map(|d| d.variation_id),
            "variation_name": decision.as_ref().map(|d| d.variation_name.as_str()),
        });
        println!("{line}");
    }

    Ok(())
}
