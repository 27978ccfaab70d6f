use crate::types::{SignalBody, SignalKind, SignalMessage};

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    // Colors
    pub const RED: &'static str = "\x1b[31m";
    pub const WHITE: &'static str = "\x1b[37m";
    pub const GRAY: &'static str = "\x1b[90m";

    // Bright colors
    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Table,
        }
    }
}

const TABLE_RULE: &str = "────────────────────────────────────────────────────────────────────────────";

pub struct SignalFormatter {
    format: OutputFormat,
    colored: bool,
    quiet: bool,
    message_count: u64,
}

impl SignalFormatter {
    pub fn new(format: OutputFormat, colored: bool, quiet: bool) -> Self {
        Self {
            format,
            colored,
            quiet,
            message_count: 0,
        }
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn print_header(&self) {
        if self.quiet || self.format != OutputFormat::Table {
            return;
        }
        let (gray, reset) = self.paint(Colors::GRAY);
        println!("{gray}{TABLE_RULE}{reset}");
        println!(
            "{gray}│{reset} {:<6} {gray}│{reset} {:<13} {gray}│{reset} {:<8} {gray}│{reset} {:<38}",
            "COUNT", "KIND", "TIME", "DETAIL"
        );
        println!("{gray}{TABLE_RULE}{reset}");
    }

    pub fn print_message(&mut self, message: &SignalMessage) {
        self.message_count += 1;
        println!("{}", self.format_message(message));
    }

    pub fn format_message(&self, message: &SignalMessage) -> String {
        match self.format {
            OutputFormat::Table => self.format_table_row(message),
            OutputFormat::Json => self.format_json_row(message),
            OutputFormat::Minimal => self.format_minimal_row(message),
        }
    }

    fn paint(&self, color: &'static str) -> (&'static str, &'static str) {
        if self.colored {
            (color, Colors::RESET)
        } else {
            ("", "")
        }
    }

    fn kind_color(kind: SignalKind) -> &'static str {
        match kind {
            SignalKind::Connected => Colors::BRIGHT_GREEN,
            SignalKind::EntityUpdate => Colors::BRIGHT_BLUE,
            SignalKind::PriceUpdate => Colors::BRIGHT_YELLOW,
            SignalKind::Heartbeat => Colors::GRAY,
            SignalKind::Error => Colors::BRIGHT_RED,
        }
    }

    fn detail(message: &SignalMessage) -> String {
        match &message.body {
            SignalBody::Connected { user_id } => format!("user {user_id}"),
            SignalBody::EntityUpdate {
                domain,
                action,
                record,
            } => {
                let record = record.to_string();
                let record: String = record.chars().take(60).collect();
                match action {
                    Some(action) => format!("{domain}/{action} {record}"),
                    None => format!("{domain} {record}"),
                }
            }
            SignalBody::PriceUpdate { symbol, price } => format!("{symbol} {price:.2}"),
            SignalBody::Heartbeat => "-".to_string(),
            SignalBody::Error { message } => message.clone(),
        }
    }

    fn format_table_row(&self, message: &SignalMessage) -> String {
        let kind = message.kind();
        let (gray, reset) = self.paint(Colors::GRAY);
        let (kind_color, _) = self.paint(Self::kind_color(kind));
        format!(
            "{gray}│{reset} {:<6} {gray}│{reset} {kind_color}{:<13}{reset} {gray}│{reset} {:<8} {gray}│{reset} {}",
            self.message_count,
            kind.as_str(),
            message.datetime_local().format("%H:%M:%S"),
            Self::detail(message),
        )
    }

    fn format_json_row(&self, message: &SignalMessage) -> String {
        let mut value = serde_json::to_value(message).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("count".into(), self.message_count.into());
            obj.insert(
                "local_time".into(),
                message
                    .datetime_local()
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .into(),
            );
        }
        serde_json::to_string(&value).unwrap_or_default()
    }

    fn format_minimal_row(&self, message: &SignalMessage) -> String {
        let kind = message.kind();
        let (color, reset) = self.paint(Self::kind_color(kind));
        format!(
            "{} {color}{}{reset} {}",
            message.datetime_local().format("%H:%M:%S"),
            kind.as_str(),
            Self::detail(message)
        )
    }

    pub fn format_status(&self, status: &str, message: &str) -> String {
        let (color, symbol) = match status {
            "CONNECTING" => (Colors::BRIGHT_YELLOW, "*"),
            "CONNECTED" => (Colors::BRIGHT_GREEN, "+"),
            "RECONNECTING" => (Colors::BRIGHT_YELLOW, ">"),
            "DISCONNECTED" => (Colors::BRIGHT_RED, "X"),
            "STOPPING" => (Colors::BRIGHT_MAGENTA, "!"),
            "ERROR" => (Colors::BRIGHT_RED, "!"),
            _ => (Colors::WHITE, "-"),
        };
        let (bold, reset) = self.paint(Colors::BOLD);
        let (color, _) = self.paint(color);
        format!("{bold}{color}[{status}]{reset} {symbol} {message}")
    }

    pub fn print_status(&self, status: &str, message: &str) {
        if self.quiet && status != "ERROR" {
            return;
        }
        println!("{}", self.format_status(status, message));
    }

    pub fn print_summary(&self, duration_secs: u64) {
        if self.quiet {
            return;
        }

        let rate = if duration_secs > 0 {
            self.message_count as f64 / duration_secs as f64
        } else {
            0.0
        };

        let (color, reset) = self.paint(Colors::BRIGHT_CYAN);
        println!();
        println!(
            "{color}Summary: {} messages in {}s ({:.2} messages/sec){reset}",
            self.message_count, duration_secs, rate
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(symbol: &str, price: f64) -> SignalMessage {
        SignalMessage {
            body: SignalBody::PriceUpdate {
                symbol: symbol.into(),
                price,
            },
            timestamp: "2026-10-17T09:30:00Z".parse().unwrap(),
            message_id: "m-1".into(),
        }
    }

    #[test]
    fn output_format_parsing_defaults_to_table() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("minimal"), OutputFormat::Minimal);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Table);
    }

    #[test]
    fn plain_rows_have_no_escape_codes() {
        let formatter = SignalFormatter::new(OutputFormat::Table, false, false);
        let row = formatter.format_message(&price("AAPL", 189.4213));
        assert!(!row.contains('\x1b'));
        assert!(row.contains("price_update"));
        assert!(row.contains("AAPL 189.42"));

        let minimal = SignalFormatter::new(OutputFormat::Minimal, false, false);
        assert!(minimal.format_message(&price("MSFT", 1.0)).ends_with("price_update MSFT 1.00"));
    }

    #[test]
    fn json_rows_keep_wire_fields() {
        let mut formatter = SignalFormatter::new(OutputFormat::Json, true, false);
        formatter.message_count = 3;
        let row = formatter.format_message(&price("TSLA", 250.5));
        let value: serde_json::Value = serde_json::from_str(&row).unwrap();
        assert_eq!(value["type"], "price_update");
        assert_eq!(value["symbol"], "TSLA");
        assert_eq!(value["count"], 3);
        assert_eq!(value["message_id"], "m-1");
    }

    #[test]
    fn entity_detail_is_truncated() {
        let message = SignalMessage {
            body: SignalBody::EntityUpdate {
                domain: "files".into(),
                action: Some("insert".into()),
                record: serde_json::json!({ "name": "x".repeat(200) }),
            },
            timestamp: "2026-10-17T09:30:00Z".parse().unwrap(),
            message_id: "m-2".into(),
        };
        let detail = SignalFormatter::detail(&message);
        assert!(detail.starts_with("files/insert "));
        assert_eq!(detail.chars().count(), "files/insert ".len() + 60);
    }

    #[test]
    fn colored_status_wraps_label() {
        let formatter = SignalFormatter::new(OutputFormat::Table, true, false);
        let line = formatter.format_status("CONNECTED", "ID: abc");
        assert!(line.starts_with(Colors::BOLD));
        assert!(line.contains("[CONNECTED]"));
        assert!(line.ends_with("+ ID: abc"));
    }
}
