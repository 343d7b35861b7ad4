// hostbridge - native capability bridge
// Serves the calendar, speech and voice channels over stdin/stdout

use anyhow::Context;
use log::{error, info};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use hostbridge::bridge::transport;
use hostbridge::config::{validate_config, BridgeConfig};
use hostbridge::utils::logging::{init_logging, log_error_with_context};
use hostbridge::{
    build_bridge, CalendarAdapter, CpalRecorder, Database, EventSink, NoSpeechEngine, RodioPlayer,
    SpeechAdapter, SqliteCalendarStore, VoiceAdapter,
};

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run().await {
        log_error_with_context(&e, "hostbridge");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting hostbridge v{}", env!("CARGO_PKG_VERSION"));

    let config = BridgeConfig::from_env().context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let db = Database::open(&config.db_path).await?;
    let store = if config.calendar_read_only {
        SqliteCalendarStore::read_only(db)
    } else {
        SqliteCalendarStore::new(db)
    };
    info!("Calendar store writable: {}", store.is_writable());

    let (events, event_rx) = EventSink::channel();
    // No speech engine ships for this host yet; the channel reports unsupported.
    let speech = SpeechAdapter::new(Arc::new(NoSpeechEngine), events)
        .with_defaults(config.speech_defaults);
    let voice = VoiceAdapter::new(
        Arc::new(CpalRecorder::new()),
        Arc::new(RodioPlayer::new(config.speech_defaults.volume)),
        config.recordings_dir.clone(),
    );
    let bridge = Arc::new(build_bridge(CalendarAdapter::new(Arc::new(store)), speech, voice));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    transport::serve(
        bridge,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        event_rx,
        shutdown,
    )
    .await?;

    info!("hostbridge stopped");
    Ok(())
}
