use anyhow::Result;
use clap::Parser;
use signal_stream::{
    SignalError,
    binding::SignalBinding,
    cli::Args,
    client::SignalStreamClient,
    config::Config,
    events::{ClientEvent, create_event_channel, forward_events},
    monitoring::setup_metrics,
    tracing_setup::setup_tracing,
    ui::{UIController, UIOptions, UiExit},
};
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup tracing/logging
    setup_tracing(&args.log_level, args.json_logs)?;

    info!(
        "Starting signal stream client v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_args(&args)?;

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let (event_sender, event_receiver) = create_event_channel();
    let client = SignalStreamClient::new(forward_events(
        config.connection(),
        event_sender.clone(),
    ))?;

    // never echo the token
    let mut shown = config.stream.endpoint.clone();
    shown.set_query(None);
    let _ = event_sender.try_send(ClientEvent::Connecting {
        url: shown.to_string(),
    });

    let mut ui = UIController::new(
        event_receiver,
        config.output.format.clone(),
        UIOptions {
            colored: config.output.colored,
            quiet: config.output.quiet,
            kinds: config.output.kinds.clone(),
            max_messages: config.output.max_messages,
        },
    );

    let started = Instant::now();
    let binding = SignalBinding::mount(client);
    info!("Client started. Press Ctrl+C to shutdown...");

    let exit = tokio::select! {
        exit = ui.run() => exit,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
            UiExit::ChannelClosed
        }
    };

    binding.unmount();
    ui.formatter().print_summary(started.elapsed().as_secs());

    if exit == UiExit::Disconnected {
        let err = SignalError::MaxReconnectsExceeded {
            max: config.stream.max_reconnects,
        };
        error!("Signal stream stopped: {}", err);
        return Err(err.into());
    }

    info!("Client stopped successfully");
    Ok(())
}
