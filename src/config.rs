// file: src/config.rs
// description: connection configuration, callback slots and cli-driven application settings

use crate::{
    cli::Args,
    error::SignalError,
    formatter::OutputFormat,
    types::{SignalKind, SignalMessage},
};
use anyhow::Result;
use std::{fmt, sync::Arc, time::Duration};
use url::Url;

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// 1.5x the server's 30s heartbeat cadence.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(45);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type MessageCallback = Arc<dyn Fn(&SignalMessage) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&SignalError) + Send + Sync>;
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Optional callback slots. Callbacks run on the client's supervisor task and
/// must not block.
#[derive(Clone, Default)]
pub struct SignalHandlers {
    pub on_message: Option<MessageCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_connected: Option<LifecycleCallback>,
    pub on_disconnected: Option<LifecycleCallback>,
}

impl fmt::Debug for SignalHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHandlers")
            .field("on_message", &self.on_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_connected", &self.on_connected.is_some())
            .field("on_disconnected", &self.on_disconnected.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Stream URL, already carrying auth and filter query parameters.
    pub endpoint: Url,
    pub handlers: SignalHandlers,
    pub reconnect_interval: Duration,
    /// Extra random delay in `[0, reconnect_jitter]` added to each reconnect.
    pub reconnect_jitter: Duration,
    pub max_reconnect_attempts: u32,
    /// Silence longer than this declares the connection dead.
    pub stale_after: Duration,
    /// An open that has not produced a stream by now counts as a failed attempt.
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            handlers: SignalHandlers::default(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reconnect_jitter: Duration::ZERO,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            stale_after: DEFAULT_STALE_AFTER,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn parse(endpoint: &str) -> Result<Self, SignalError> {
        Ok(Self::new(Url::parse(endpoint)?))
    }

    pub fn on_message(mut self, f: impl Fn(&SignalMessage) + Send + Sync + 'static) -> Self {
        self.handlers.on_message = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&SignalError) + Send + Sync + 'static) -> Self {
        self.handlers.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_connected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.handlers.on_connected = Some(Arc::new(f));
        self
    }

    pub fn on_disconnected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.handlers.on_disconnected = Some(Arc::new(f));
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn stale_after(mut self, timeout: Duration) -> Self {
        self.stale_after = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        if self.reconnect_interval.is_zero() {
            return Err(SignalError::InvalidConfig(
                "reconnect interval must be > 0".into(),
            ));
        }
        if self.stale_after.is_zero() {
            return Err(SignalError::InvalidConfig(
                "stale timeout must be > 0".into(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(SignalError::InvalidConfig(
                "connect timeout must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Delay before the next reconnect attempt.
    pub fn next_reconnect_delay(&self) -> Duration {
        if self.reconnect_jitter.is_zero() {
            return self.reconnect_interval;
        }
        let jitter_ms = self.reconnect_jitter.as_millis() as u64;
        self.reconnect_interval + Duration::from_millis(fastrand::u64(0..=jitter_ms))
    }
}

/// Append the auth token and optional comma-separated symbol filter to a base
/// stream URL.
pub fn build_endpoint(base: &str, token: Option<&str>, symbols: &[String]) -> Result<Url, SignalError> {
    let mut url = Url::parse(base)?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(token) = token {
            query.append_pair("token", token);
        }
        let symbols: Vec<String> = symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !symbols.is_empty() {
            query.append_pair("symbols", &symbols.join(","));
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub stream: StreamConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub endpoint: Url,
    pub reconnect_interval: Duration,
    pub reconnect_jitter: Duration,
    pub max_reconnects: u32,
    pub stale_after: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
    pub quiet: bool,
    /// Empty means every kind is shown.
    pub kinds: Vec<SignalKind>,
    pub max_messages: Option<u64>,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let endpoint = build_endpoint(&args.url, args.token.as_deref(), &args.symbols)?;

        let kinds = args
            .kinds
            .iter()
            .map(|tag| {
                SignalKind::from_tag(tag)
                    .ok_or_else(|| anyhow::anyhow!("unknown message kind '{tag}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            stream: StreamConfig {
                endpoint,
                reconnect_interval: Duration::from_millis(args.reconnect_interval_ms),
                reconnect_jitter: Duration::from_millis(args.reconnect_jitter_ms),
                max_reconnects: args.max_reconnects,
                stale_after: Duration::from_secs(args.stale_after_secs),
                connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            output: OutputConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
                quiet: args.quiet,
                kinds,
                max_messages: (args.max_messages > 0).then_some(args.max_messages),
            },
        })
    }

    /// Connection settings without callbacks; the caller attaches its own.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.stream.endpoint.clone())
            .reconnect_interval(self.stream.reconnect_interval)
            .reconnect_jitter(self.stream.reconnect_jitter)
            .max_reconnect_attempts(self.stream.max_reconnects)
            .stale_after(self.stream.stale_after)
            .connect_timeout(self.stream.connect_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_stream_contract() {
        let config = ConnectionConfig::parse("https://signals.example/stream").unwrap();
        assert_eq!(config.reconnect_interval, Duration::from_millis(3000));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.stale_after, Duration::from_secs(45));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.handlers.on_message.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_durations_are_rejected() {
        let config = ConnectionConfig::parse("https://signals.example/stream")
            .unwrap()
            .reconnect_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(SignalError::InvalidConfig(_))));

        let config = ConnectionConfig::parse("https://signals.example/stream")
            .unwrap()
            .stale_after(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = ConnectionConfig::parse("https://signals.example/stream")
            .unwrap()
            .connect_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = ConnectionConfig::parse("https://signals.example/stream")
            .unwrap()
            .reconnect_interval(Duration::from_millis(100))
            .reconnect_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            let delay = config.next_reconnect_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn endpoint_carries_token_and_symbols() {
        let url = build_endpoint(
            "https://proj.supabase.co/functions/v1/stock-sse",
            Some("jwt.token"),
            &["aapl".into(), " msft ".into(), "".into()],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://proj.supabase.co/functions/v1/stock-sse?token=jwt.token&symbols=AAPL%2CMSFT"
        );
        let symbols = url
            .query_pairs()
            .find(|(k, _)| k == "symbols")
            .map(|(_, v)| v.into_owned());
        assert_eq!(symbols.as_deref(), Some("AAPL,MSFT"));
    }

    #[test]
    fn endpoint_without_parameters_has_no_query() {
        let url = build_endpoint("https://signals.example/stream", None, &[]).unwrap();
        assert_eq!(url.as_str(), "https://signals.example/stream");
    }

    #[test]
    fn config_from_args() {
        let args = Args::parse_from([
            "signal-stream",
            "--url",
            "wss://signals.example/stream",
            "--symbols",
            "AAPL,TSLA",
            "--kinds",
            "price_update,heartbeat",
            "--max-reconnects",
            "2",
            "--reconnect-interval-ms",
            "100",
            "--max-messages",
            "5",
            "--connect-timeout-secs",
            "3",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.stream.max_reconnects, 2);
        assert_eq!(config.stream.reconnect_interval, Duration::from_millis(100));
        assert_eq!(
            config.output.kinds,
            vec![SignalKind::PriceUpdate, SignalKind::Heartbeat]
        );
        assert_eq!(config.output.max_messages, Some(5));

        let connection = config.connection();
        assert_eq!(connection.max_reconnect_attempts, 2);
        assert_eq!(connection.endpoint.scheme(), "wss");
        assert_eq!(connection.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn unknown_kind_filter_is_an_error() {
        let args = Args::parse_from(["signal-stream", "--kinds", "gossip"]);
        assert!(Config::from_args(&args).is_err());
    }
}
