//! stormpath-sign - sign a Stormpath REST request from the command line.
//!
//! Prints the SAuthc1 headers for the request. With `--execute` the request
//! is also sent and the response body written to stdout.
//!
//! # Usage
//!
//! ```text
//! stormpath-sign [-x|--execute] <METHOD> <URL> [JSON_BODY]
//! stormpath-sign --execute GET https://api.stormpath.com/v1/tenants/current
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STORMPATH_API_KEY_ID` | *(unset)* | API key id |
//! | `STORMPATH_API_KEY_SECRET` | *(unset)* | API key secret |
//! | `STORMPATH_API_KEY_FILE` | *(unset)* | Extra `apiKey.properties` file to search |
//! | `STORMPATH_CONNECTION_TIMEOUT` | `30` | Connect timeout in seconds |
//! | `STORMPATH_LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `STORMPATH_LOG_LEVEL`) |
//!
//! Without an id and secret in the environment, credentials are looked up in
//! `~/.stormpath/apiKey.properties`, then `./apiKey.properties`.

use anyhow::{Context, Result};
use clap::Parser;
use http::Method;
use stormpath_auth::sign_request;
use stormpath_client::{ApiRequest, Payload, StormpathClient};
use stormpath_core::StormpathConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `log_level` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Command line arguments.
#[derive(Parser, Debug, PartialEq)]
#[command(
    name = "stormpath-sign",
    version,
    about = "Sign a Stormpath REST request and print its SAuthc1 headers"
)]
struct Invocation {
    /// HTTP method, case-insensitive
    #[arg(value_parser = parse_method)]
    method: Method,

    /// Absolute request URL
    url: String,

    /// JSON request body
    #[arg(value_parser = parse_json)]
    body: Option<serde_json::Value>,

    /// Also send the request and print the response body
    #[arg(short = 'x', long)]
    execute: bool,
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("invalid HTTP method: {raw}"))
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("request body is not valid JSON: {e}"))
}

impl Invocation {
    fn request(&self) -> ApiRequest {
        let mut request = ApiRequest::new(self.method.clone(), self.url.clone());
        if let Some(body) = &self.body {
            request.payload = Payload::Json(body.clone());
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = Invocation::parse();
    let config = StormpathConfig::from_env();

    init_tracing(&config.log_level)?;

    let client = StormpathClient::from_config(&config).context("failed to build Stormpath client")?;
    info!(
        key_id = client.credentials().id(),
        method = %invocation.method,
        url = %invocation.url,
        version = VERSION,
        "signing request",
    );

    let mut signed = invocation
        .request()
        .into_http()
        .with_context(|| format!("invalid request URL: {}", invocation.url))?;
    sign_request(&mut signed, client.credentials()).context("failed to sign request")?;
    for name in ["host", "x-stormpath-date", "authorization"] {
        if let Some(value) = signed.headers().get(name) {
            println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
        }
    }

    if invocation.execute {
        let body = client
            .execute(invocation.request())
            .await
            .with_context(|| format!("{} {} failed", invocation.method, invocation.url))?;
        println!();
        println!("{}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
