use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "signal-stream",
    about = "self-healing event-stream client for stock price and entity update signals",
    version
)]
pub struct Args {
    /// Stream endpoint URL (http/https for SSE, ws/wss for WebSocket)
    #[arg(short, long, default_value = "http://127.0.0.1:54321/functions/v1/stock-sse")]
    pub url: String,

    /// Access token appended as the `token` query parameter
    #[arg(short, long)]
    pub token: Option<String>,

    /// Comma-separated stock symbols to filter price updates (e.g. AAPL,MSFT)
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Fixed delay between reconnection attempts in milliseconds
    #[arg(long, default_value = "3000")]
    pub reconnect_interval_ms: u64,

    /// Random extra delay added to each reconnection, in milliseconds
    #[arg(long, default_value = "0")]
    pub reconnect_jitter_ms: u64,

    /// Maximum consecutive reconnection attempts before giving up
    #[arg(long, default_value = "10")]
    pub max_reconnects: u32,

    /// Seconds of silence after which the connection is considered dead
    #[arg(long, default_value = "45")]
    pub stale_after_secs: u64,

    /// Abandon a connection attempt that has not opened within this many seconds
    #[arg(long, default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Output format: table, json, minimal
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Only show these message kinds (comma-separated, e.g. price_update,entity_update)
    #[arg(long, value_delimiter = ',')]
    pub kinds: Vec<String>,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - messages only, no connection banners
    #[arg(long)]
    pub quiet: bool,

    /// Stop after this many displayed messages (0 for unlimited)
    #[arg(long, default_value = "0")]
    pub max_messages: u64,
}
