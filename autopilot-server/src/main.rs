use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

use autopilot_server::{
    config::PluginConfig,
    service::AutopilotService,
    signalk::SharedStore,
    transport::{Outputs, ProviderStatus, SentenceEvent},
    web::Web,
    Cli, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    info!("autopilot-server {} starting", VERSION);

    let config = PluginConfig::load(args.config.as_deref()).into_diagnostic()?;
    let store = SharedStore::new();
    let provider_status = ProviderStatus::default();
    let events = Outputs::event_channel();
    let outputs =
        Outputs::new(&config, events.clone(), provider_status.clone()).into_diagnostic()?;
    let (service, handle) =
        AutopilotService::new(&config, store.clone(), outputs, provider_status);
    let web = Web::new(handle, store);
    let port = args.port;
    let print_events = args.output.then(|| events.subscribe());

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("Autopilot", move |subsys| service.run(subsys)));
        s.start(SubsystemBuilder::new("Webserver", move |subsys| {
            web.run(subsys, port)
        }));
        if let Some(rx) = print_events {
            s.start(SubsystemBuilder::new("Output", move |subsys| print_sentences(subsys, rx)));
        }
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .into_diagnostic()
}

/// Copy sentences from the event channel to stdout
async fn print_sentences(
    subsys: SubsystemHandle,
    mut rx: tokio::sync::broadcast::Receiver<SentenceEvent>,
) -> Result<(), RecvError> {
    loop {
        tokio::select! {
            _ = subsys.on_shutdown_requested() => return Ok(()),
            event = rx.recv() => match event {
                Ok(event) => println!("{}", event.sentence),
                Err(RecvError::Lagged(n)) => log::warn!("Output lagged, skipped {} sentences", n),
                Err(e) => return Err(e),
            }
        }
    }
}
