//! Diagnostic logging setup and optional command outcome events.

use std::env;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

pub(crate) const TELEMETRY_ENDPOINT_ENV: &str = "TEAMCTL_TELEMETRY_ENDPOINT";
const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(2);

/// Shape of diagnostic log lines on stderr.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber. Logs go to stderr so stdout carries only command output.
///
/// `RUST_LOG` wins over `level` when set. A second call is a no-op.
pub(crate) fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };
    if let Err(err) = installed {
        debug!(error = %err, "tracing subscriber already installed");
    }
}

/// How an invocation ended, as seen by the operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Outcome {
    Success,
    /// The command ran to the end but some items failed.
    Partial,
    Error,
}

/// Summary of one invocation against one server.
#[derive(Debug, Serialize)]
pub(crate) struct CommandReport<'a> {
    pub(crate) command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) server: Option<&'a str>,
    pub(crate) outcome: Outcome,
    pub(crate) exit_code: i32,
    pub(crate) failed_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<&'a str>,
}

/// Posts one report per invocation when `TEAMCTL_TELEMETRY_ENDPOINT` is set.
pub(crate) struct TelemetryEmitter {
    client: Client,
    endpoint: Url,
}

impl TelemetryEmitter {
    pub(crate) fn from_env() -> Option<Self> {
        let raw = env::var(TELEMETRY_ENDPOINT_ENV).ok()?;
        let endpoint = match raw.parse::<Url>() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                debug!(endpoint = %raw, error = %err, "ignoring malformed telemetry endpoint");
                return None;
            }
        };
        let client = Client::builder().timeout(TELEMETRY_TIMEOUT).build().ok()?;
        Some(Self { client, endpoint })
    }

    /// Best effort: a failed post is logged and otherwise ignored.
    pub(crate) async fn emit(&self, trace_id: &str, report: &CommandReport<'_>) {
        let event = TelemetryEvent {
            trace_id,
            report,
            timestamp_ms: timestamp_now_ms(),
        };

        let sent = self
            .client
            .post(self.endpoint.clone())
            .json(&event)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        if let Err(err) = sent {
            debug!(command = report.command, error = %err, "telemetry report dropped");
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    trace_id: &'a str,
    #[serde(flatten)]
    report: &'a CommandReport<'a>,
    timestamp_ms: u64,
}

fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn partial_report() -> CommandReport<'static> {
        CommandReport {
            command: "bot_enable",
            server: Some("chat.example.com"),
            outcome: Outcome::Partial,
            exit_code: 1,
            failed_items: 2,
            message: None,
        }
    }

    #[tokio::test]
    async fn emitter_posts_report_with_server_and_failure_count() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/telemetry")
                .header("content-type", "application/json")
                .json_body_includes(
                    r#"{"command": "bot_enable", "server": "chat.example.com", "outcome": "partial", "exit_code": 1, "failed_items": 2, "trace_id": "trace-1"}"#,
                );
            then.status(204);
        });

        let emitter = TelemetryEmitter {
            client: Client::new(),
            endpoint: format!("{}/telemetry", server.base_url()).parse()?,
        };
        emitter.emit("trace-1", &partial_report()).await;

        mock.assert();
        Ok(())
    }

    #[test]
    fn report_omits_absent_server_and_message() -> anyhow::Result<()> {
        let report = CommandReport {
            command: "team_list",
            server: None,
            outcome: Outcome::Success,
            exit_code: 0,
            failed_items: 0,
            message: None,
        };
        let value = serde_json::to_value(&report)?;
        assert_eq!(
            value,
            serde_json::json!({
                "command": "team_list",
                "outcome": "success",
                "exit_code": 0,
                "failed_items": 0
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_ignored() -> anyhow::Result<()> {
        let emitter = TelemetryEmitter {
            client: Client::builder()
                .timeout(Duration::from_millis(200))
                .build()?,
            endpoint: "http://127.0.0.1:9/telemetry".parse()?,
        };
        emitter.emit("trace", &partial_report()).await;
        Ok(())
    }

    #[test]
    fn timestamp_is_positive() {
        assert!(timestamp_now_ms() > 0);
    }

    #[test]
    fn repeated_logging_init_does_not_panic() {
        init_logging("debug", LogFormat::Pretty);
        init_logging("warn", LogFormat::Json);
    }
}
