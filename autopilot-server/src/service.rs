//! Autopilot service task.
//!
//! A single task owns the [`Autopilot`], its timer and the outputs. HTTP
//! handlers talk to it through an [`AutopilotHandle`]; timer ticks arrive
//! on their own channel. Because one task handles both, a command and a
//! broadcast can never interleave.
//!
//! ```text
//!  HTTP ──Request──▶ ┌──────────────────┐ ──sentences──▶ Outputs (event, UDP)
//!                    │ AutopilotService │
//!  TokioTimer ─Tick─▶└──────────────────┘ ──publish────▶ SharedStore
//! ```

use log::{debug, info, warn};
use serde::Serialize;
use std::future::Future;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_graceful_shutdown::SubsystemHandle;

use autopilot_core::{
    dispatch, Autopilot, AutopilotError, BroadcastTimer, Command, EngagementState,
    HeadingReference, TickOutcome,
};

use crate::config::PluginConfig;
use crate::signalk::SharedStore;
use crate::timer::{Tick, TokioTimer};
use crate::transport::{Outputs, ProviderStatus};

const REQUEST_CHANNEL_CAPACITY: usize = 16;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Autopilot service is not running")]
    Stopped,
}

/// Snapshot of the autopilot for the status API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotStatus {
    pub state: EngagementState,
    pub targets: Vec<TargetStatus>,
    pub broadcasting: bool,
    pub talker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStatus {
    pub reference: HeadingReference,
    pub degrees: f64,
}

enum Request {
    Command(Command, oneshot::Sender<Result<(), AutopilotError>>),
    Status(oneshot::Sender<AutopilotStatus>),
}

/// Cloneable handle for sending requests to the service
#[derive(Clone)]
pub struct AutopilotHandle {
    tx: mpsc::Sender<Request>,
}

impl AutopilotHandle {
    /// Dispatch a command and wait for its result.
    pub async fn command(
        &self,
        command: Command,
    ) -> Result<Result<(), AutopilotError>, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Command(command, reply_tx))
            .await
            .map_err(|_| ServiceError::Stopped)?;
        reply_rx.await.map_err(|_| ServiceError::Stopped)
    }

    pub async fn status(&self) -> Result<AutopilotStatus, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Status(reply_tx))
            .await
            .map_err(|_| ServiceError::Stopped)?;
        reply_rx.await.map_err(|_| ServiceError::Stopped)
    }
}

pub struct AutopilotService {
    autopilot: Autopilot<SharedStore, TokioTimer>,
    outputs: Outputs,
    provider_status: ProviderStatus,
    rx: mpsc::Receiver<Request>,
    tick_rx: mpsc::Receiver<Tick>,
}

impl AutopilotService {
    pub fn new(
        config: &PluginConfig,
        store: SharedStore,
        outputs: Outputs,
        provider_status: ProviderStatus,
    ) -> (Self, AutopilotHandle) {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let timer = TokioTimer::new(tick_tx);
        let service = AutopilotService {
            autopilot: Autopilot::with_talker(store, timer, &config.talker_id),
            outputs,
            provider_status,
            rx,
            tick_rx,
        };
        (service, AutopilotHandle { tx })
    }

    /// Run as a tokio-graceful-shutdown subsystem.
    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), ServiceError> {
        self.serve(subsys.on_shutdown_requested()).await;
        Ok(())
    }

    /// Handle requests and ticks until `shutdown` completes or all handles are dropped.
    pub async fn serve(mut self, shutdown: impl Future<Output = ()>) {
        info!("Autopilot service started, talker {}", self.autopilot.talker());
        tokio::pin!(shutdown);

        loop {
            tokio::select! { biased;
                _ = &mut shutdown => {
                    info!("Autopilot service: Shutdown requested");
                    break;
                }
                request = self.rx.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                Some(Tick) = self.tick_rx.recv() => self.tick(),
            }
        }

        self.autopilot.shutdown();
        info!("Autopilot service stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Command(command, reply) => {
                debug!("command: {:?}", command);
                let before = self.autopilot.state();
                let result = dispatch(&mut self.autopilot, command);
                match &result {
                    Ok(()) => debug!("state: {}", self.autopilot.state()),
                    Err(e) => warn!("Command rejected: {}", e),
                }
                if self.autopilot.state() != before {
                    self.drain_ticks();
                }
                let _ = reply.send(result);
            }
            Request::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Drop ticks queued by a timer that has since been disarmed or re-armed.
    fn drain_ticks(&mut self) {
        let mut stale = 0;
        while self.tick_rx.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("Dropped {} stale broadcast tick(s)", stale);
        }
    }

    fn tick(&mut self) {
        match self.autopilot.on_tick(&mut self.outputs) {
            TickOutcome::Skipped => debug!("No target heading, broadcast skipped"),
            TickOutcome::Sent { sentences, errors } => {
                if !errors.is_empty() {
                    warn!("{} of {} sentences not delivered", errors.len(), sentences);
                }
            }
        }
    }

    fn status(&self) -> AutopilotStatus {
        AutopilotStatus {
            state: self.autopilot.state(),
            targets: self
                .autopilot
                .targets()
                .targets()
                .map(|t| TargetStatus {
                    reference: t.reference,
                    degrees: t.degrees(),
                })
                .collect(),
            broadcasting: self.autopilot.timer().is_armed(),
            talker_id: self.autopilot.talker().to_string(),
            provider_error: self.provider_status.error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SentenceEvent;
    use autopilot_core::angle::degs_to_rads;
    use autopilot_core::store::paths;
    use autopilot_core::DataStore;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        handle: AutopilotHandle,
        store: SharedStore,
        events: broadcast::Receiver<SentenceEvent>,
        shutdown: CancellationToken,
    }

    fn start() -> Fixture {
        start_with(PluginConfig::default())
    }

    fn start_with(config: PluginConfig) -> Fixture {
        let store = SharedStore::new();
        let events = Outputs::event_channel();
        let rx = events.subscribe();
        let status = ProviderStatus::default();
        let outputs = Outputs::new(&config, events, status.clone()).unwrap();
        let (service, handle) = AutopilotService::new(&config, store.clone(), outputs, status);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(service.serve(async move { token.cancelled().await }));

        Fixture {
            handle,
            store,
            events: rx,
            shutdown,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_engage_broadcasts_every_second() {
        let mut f = start();
        f.store
            .publish(paths::HEADING_TRUE, json!(degs_to_rads(10.0)));
        f.store
            .publish(paths::HEADING_MAGNETIC, json!(degs_to_rads(15.0)));

        let result = f.handle.command(Command::SetState("auto".into())).await.unwrap();
        assert_eq!(result, Ok(()));

        let status = f.handle.status().await.unwrap();
        assert_eq!(status.state, EngagementState::Auto);
        assert!(status.broadcasting);
        assert_eq!(status.targets.len(), 2);

        let apb = f.events.recv().await.unwrap();
        assert_eq!(apb.name, "nmea0183out");
        assert_eq!(
            apb.sentence,
            "$MAAPB,A,A,0.0000,L,N,V,V,10.0,T,999,10.0,T,10.0,T,A*5C"
        );
        for _ in 0..5 {
            f.events.recv().await.unwrap();
        }
        // Next cycle
        assert!(f.events.recv().await.unwrap().sentence.starts_with("$MAAPB"));

        f.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disengage_stops_broadcast() {
        let mut f = start();
        f.store.publish(paths::HEADING_TRUE, json!(1.0));

        f.handle.command(Command::SetState("auto".into())).await.unwrap().unwrap();
        f.handle.command(Command::SetState("standby".into())).await.unwrap().unwrap();

        let status = f.handle.status().await.unwrap();
        assert_eq!(status.state, EngagementState::Standby);
        assert!(!status.broadcasting);
        assert!(status.targets.is_empty());

        assert!(tokio::time::timeout(Duration::from_secs(5), f.events.recv())
            .await
            .is_err());
        f.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_udp_failure_keeps_autopilot_engaged() {
        // Port 0 is not a valid destination, so every UDP send fails
        let mut f = start_with(PluginConfig {
            udp_output_enabled: true,
            udp_port: 0,
            ..PluginConfig::default()
        });
        f.store.publish(paths::HEADING_TRUE, json!(1.0));
        f.handle.command(Command::SetState("auto".into())).await.unwrap().unwrap();

        // The event output still gets the full set
        for _ in 0..6 {
            f.events.recv().await.unwrap();
        }

        let status = f.handle.status().await.unwrap();
        assert_eq!(status.state, EngagementState::Auto);
        assert!(status.broadcasting);
        assert_eq!(status.targets.len(), 1);
        assert!(status.provider_error.is_some());

        // And it keeps broadcasting
        assert!(f.events.recv().await.unwrap().sentence.starts_with("$MAAPB"));
        f.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reengage_drops_stale_tick() {
        let config = PluginConfig::default();
        let mut store = SharedStore::new();
        let status = ProviderStatus::default();
        let outputs = Outputs::new(&config, Outputs::event_channel(), status.clone()).unwrap();
        let (mut service, _handle) =
            AutopilotService::new(&config, store.clone(), outputs, status);
        store.publish(paths::HEADING_TRUE, json!(1.0));

        let command = |service: &mut AutopilotService, state: &str| {
            let (reply_tx, _reply_rx) = oneshot::channel();
            service.handle(Request::Command(Command::SetState(state.into()), reply_tx));
        };

        command(&mut service, "auto");
        // Let the timer queue a tick that the service has not consumed yet
        tokio::time::sleep(Duration::from_millis(1500)).await;

        command(&mut service, "standby");
        command(&mut service, "auto");
        assert!(service.autopilot.is_engaged());
        assert!(service.tick_rx.try_recv().is_err());

        // The re-armed timer ticks a full period later
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(service.tick_rx.try_recv(), Ok(Tick));
    }

    #[tokio::test]
    async fn test_command_errors_are_returned() {
        let f = start();
        assert_eq!(
            f.handle.command(Command::SetState("auto".into())).await.unwrap(),
            Err(AutopilotError::UnknownCurrentHeading)
        );
        assert_eq!(
            f.handle.command(Command::AdvanceWaypoint).await.unwrap(),
            Err(AutopilotError::UnsupportedCommand)
        );
        f.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_stopped_service() {
        let f = start();
        f.shutdown.cancel();
        assert!(matches!(f.handle.status().await, Err(ServiceError::Stopped)));
    }
}
