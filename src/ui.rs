/// file: src/ui.rs
/// description: ui presentation layer that handles events from the client
use crate::{
    events::{ClientEvent, EventReceiver},
    formatter::{Colors, OutputFormat, SignalFormatter},
    types::SignalKind,
};
use tracing::{debug, info};

/// Why the ui loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    /// Event channel closed.
    ChannelClosed,
    /// `--max-messages` reached.
    MessageLimit,
    /// Client gave up reconnecting.
    Disconnected,
}

pub struct UIController {
    event_receiver: EventReceiver,
    formatter: SignalFormatter,
    quiet_mode: bool,
    colored: bool,
    header_printed: bool,
    kinds: Vec<SignalKind>,
    max_messages: Option<u64>,
}

pub struct UIOptions {
    pub colored: bool,
    pub quiet: bool,
    pub kinds: Vec<SignalKind>,
    pub max_messages: Option<u64>,
}

impl UIController {
    pub fn new(event_receiver: EventReceiver, format: OutputFormat, options: UIOptions) -> Self {
        Self {
            event_receiver,
            formatter: SignalFormatter::new(format, options.colored, options.quiet),
            quiet_mode: options.quiet,
            colored: options.colored,
            header_printed: false,
            kinds: options.kinds,
            max_messages: options.max_messages,
        }
    }

    pub fn formatter(&self) -> &SignalFormatter {
        &self.formatter
    }

    pub async fn run(&mut self) -> UiExit {
        self.print_startup_banner();
        while let Some(event) = self.event_receiver.recv().await {
            if let Some(exit) = self.handle_event(event) {
                return exit;
            }
        }
        UiExit::ChannelClosed
    }

    fn wants(&self, kind: SignalKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    fn handle_event(&mut self, event: ClientEvent) -> Option<UiExit> {
        match event {
            ClientEvent::Connecting { url } => {
                self.formatter.print_status("CONNECTING", &url);
            }
            ClientEvent::Connected => {
                self.formatter.print_status("CONNECTED", "stream open");
                if !self.header_printed {
                    self.formatter.print_header();
                    self.header_printed = true;
                }
            }
            ClientEvent::MessageReceived(message) => {
                if !self.wants(message.kind()) {
                    debug!(kind = %message.kind(), "filtered out");
                    return None;
                }
                if !self.header_printed {
                    self.formatter.print_header();
                    self.header_printed = true;
                }
                self.formatter.print_message(&message);

                if let Some(max_messages) = self.max_messages
                    && self.formatter.message_count() >= max_messages
                {
                    self.formatter.print_status(
                        "STOPPING",
                        &format!("Reached configured max messages ({max_messages})"),
                    );
                    return Some(UiExit::MessageLimit);
                }
            }
            ClientEvent::Error(error) => {
                self.print_error("SIGNAL ERROR", &error);
            }
            ClientEvent::Disconnected => {
                info!("client reported terminal disconnect");
                self.formatter
                    .print_status("DISCONNECTED", "reconnection attempts exhausted");
                return Some(UiExit::Disconnected);
            }
        }

        None
    }

    fn print_startup_banner(&self) {
        if self.quiet_mode {
            return;
        }

        let (bold, reset) = if self.colored {
            (Colors::BOLD, Colors::RESET)
        } else {
            ("", "")
        };
        let cyan = if self.colored { Colors::BRIGHT_CYAN } else { "" };
        let dim = if self.colored { Colors::DIM } else { "" };

        println!();
        println!("{bold}{cyan}SIGNAL STREAM{reset} {dim}v{}{reset}", env!("CARGO_PKG_VERSION"));
        println!(
            "{dim}kinds: {}{reset}",
            if self.kinds.is_empty() {
                "all".to_string()
            } else {
                self.kinds
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            }
        );
        println!();
    }

    fn print_error(&self, error_type: &str, message: &str) {
        let (bold, red, bright_red, reset) = if self.colored {
            (Colors::BOLD, Colors::RED, Colors::BRIGHT_RED, Colors::RESET)
        } else {
            ("", "", "", "")
        };
        println!("{bold}{bright_red}[{error_type}]{reset} ! {red}{message}{reset}");
    }
}
