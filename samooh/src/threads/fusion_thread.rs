//! Fusion Thread - single owner of all fusion state.
//!
//! This thread:
//! - Owns the [`FusionEngine`] (grid + registry) for its whole lifetime
//! - Waits with `crossbeam_channel::select!` on reports, registrations,
//!   commands, camera reports, the display ticker and the shutdown signal
//! - Handles exactly one event to completion before waiting again
//! - Hands the engine back to the joiner on shutdown
//!
//! CRITICAL: This thread NEVER blocks on the display or the UI. Snapshots are
//! skipped while the display is behind and registration requests go through an
//! unbounded channel. A drive command waits at most one display period for the
//! transport before it is dropped.

use crossbeam_channel::{
    Receiver, SendTimeoutError, Sender, TrySendError, bounded, never, select, tick,
};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::channels::FusionEndpoints;
use crate::config::SamoohConfig;
use crate::engine::{FusionEngine, ReportOutcome};
use crate::messages::{
    CameraReport, Command, DisplaySnapshot, DriveCommand, RegistrationInit, RegistrationRequest,
    SensorReport,
};

/// Configuration for the fusion thread.
#[derive(Debug, Clone)]
pub struct FusionThreadConfig {
    /// Interval between display snapshots.
    pub display_period: Duration,
    /// Save the map here on shutdown (None to skip).
    pub save_path: Option<PathBuf>,
}

impl FusionThreadConfig {
    pub fn from_config(config: &SamoohConfig) -> Self {
        Self {
            display_period: config.display_period(),
            save_path: config
                .output
                .save_on_exit
                .then(|| PathBuf::from(&config.output.map_path)),
        }
    }
}

/// Requests a graceful shutdown of the fusion thread. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// Ask the fusion thread to flush and exit. Idempotent.
    pub fn shutdown(&self) {
        // Full means a shutdown is already queued; disconnected means it already exited
        let _ = self.tx.try_send(());
    }
}

/// Counters kept by the event loop.
#[derive(Debug, Clone, Copy, Default)]
struct LoopStats {
    snapshots_sent: u64,
    ticks_skipped: u64,
    drive_commands_dropped: u64,
    errors: u64,
}

/// Fusion Thread handle.
pub struct FusionThread {
    handle: JoinHandle<FusionEngine>,
    shutdown: ShutdownHandle,
}

impl FusionThread {
    /// Spawn the fusion thread, moving the engine into it.
    pub fn spawn(
        engine: FusionEngine,
        endpoints: FusionEndpoints,
        config: FusionThreadConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("fusion".into())
            .spawn(move || run_fusion_loop(engine, endpoints, shutdown_rx, config))
            .expect("Failed to spawn fusion thread");

        Self {
            handle,
            shutdown: ShutdownHandle { tx: shutdown_tx },
        }
    }

    /// Handle that can stop the thread from elsewhere (e.g. a signal handler).
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Request shutdown.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Wait for the thread to finish and take back the engine.
    pub fn join(self) -> thread::Result<FusionEngine> {
        self.handle.join()
    }
}

/// One thing the loop has to handle.
enum Event {
    Report(SensorReport),
    Registration(RegistrationInit),
    Command(Command),
    Camera(CameraReport),
    Closed(Inbound),
    Tick,
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum Inbound {
    Reports,
    Registrations,
    Commands,
    Camera,
}

/// Event loop state: the engine plus the outbound channel ends.
struct FusionContext {
    engine: FusionEngine,
    registration_requests: Sender<RegistrationRequest>,
    drive_commands: Sender<DriveCommand>,
    snapshots: Sender<DisplaySnapshot>,
    /// How long a drive command may wait for the transport.
    command_timeout: Duration,
    stats: LoopStats,
}

fn run_fusion_loop(
    engine: FusionEngine,
    endpoints: FusionEndpoints,
    shutdown_rx: Receiver<()>,
    config: FusionThreadConfig,
) -> FusionEngine {
    log::info!(
        "Fusion thread starting (display every {} ms)",
        config.display_period.as_millis()
    );

    let FusionEndpoints {
        mut reports,
        mut registrations,
        mut commands,
        mut camera,
        registration_requests,
        drive_commands,
        snapshots,
    } = endpoints;

    let mut ctx = FusionContext {
        engine,
        registration_requests,
        drive_commands,
        snapshots,
        command_timeout: config.display_period,
        stats: LoopStats::default(),
    };

    let ticker = tick(config.display_period);

    loop {
        let event = select! {
            recv(reports) -> msg => msg.map_or(Event::Closed(Inbound::Reports), Event::Report),
            recv(registrations) -> msg => {
                msg.map_or(Event::Closed(Inbound::Registrations), Event::Registration)
            }
            recv(commands) -> msg => msg.map_or(Event::Closed(Inbound::Commands), Event::Command),
            recv(camera) -> msg => msg.map_or(Event::Closed(Inbound::Camera), Event::Camera),
            recv(ticker) -> _ => Event::Tick,
            // A dropped handle counts as a shutdown request
            recv(shutdown_rx) -> _ => Event::Shutdown,
        };

        match event {
            Event::Report(report) => ctx.process_report(&report),
            Event::Registration(init) => ctx.process_registration(&init),
            Event::Command(command) => ctx.process_command(&command),
            Event::Camera(report) => ctx.process_camera(&report),
            Event::Tick => ctx.publish_snapshot(),
            Event::Closed(which) => {
                // Park the closed channel so select! does not spin on it
                log::debug!("{:?} channel closed", which);
                match which {
                    Inbound::Reports => reports = never(),
                    Inbound::Registrations => registrations = never(),
                    Inbound::Commands => commands = never(),
                    Inbound::Camera => camera = never(),
                }
            }
            Event::Shutdown => break,
        }
    }

    log::info!("Fusion thread shutting down...");

    // Handle what is already queued; registrations first so their reports land
    for init in registrations.try_iter().take(registrations.len()) {
        ctx.process_registration(&init);
    }
    for report in reports.try_iter().take(reports.len()) {
        ctx.process_report(&report);
    }
    for command in commands.try_iter().take(commands.len()) {
        ctx.process_command(&command);
    }
    for report in camera.try_iter().take(camera.len()) {
        ctx.process_camera(&report);
    }

    ctx.finish(config.display_period, config.save_path.as_deref());

    let stats = ctx.engine.stats();
    log::info!(
        "Fusion thread shutdown complete: {} reports integrated, {} dropped, {} robots, \
         {} snapshots sent, {} ticks skipped, {} drive commands dropped, {} errors",
        stats.reports_integrated,
        stats.reports_dropped,
        ctx.engine.registry().len(),
        ctx.stats.snapshots_sent,
        ctx.stats.ticks_skipped,
        ctx.stats.drive_commands_dropped,
        ctx.stats.errors
    );

    ctx.engine
}

impl FusionContext {
    fn process_report(&mut self, report: &SensorReport) {
        if let ReportOutcome::RegistrationRequested(id) = self.engine.handle_report(report)
            && self
                .registration_requests
                .send(RegistrationRequest { id })
                .is_err()
        {
            log::warn!("Registration request for robot {} lost: no UI attached", id);
        }
    }

    fn process_registration(&mut self, init: &RegistrationInit) {
        if let Err(e) = self.engine.handle_registration(init) {
            self.stats.errors += 1;
            log::warn!("Registration of robot {} rejected: {}", init.id, e);
        }
    }

    fn process_command(&mut self, command: &Command) {
        let drive = match self.engine.handle_command(command) {
            Ok(drive) => drive,
            Err(e) => {
                self.stats.errors += 1;
                log::warn!("Dropping command {:?}: {}", command, e);
                return;
            }
        };

        match self.drive_commands.send_timeout(drive, self.command_timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(drive)) => {
                self.stats.drive_commands_dropped += 1;
                log::warn!(
                    "Transport stalled for {} ms, dropping drive command for robot {}",
                    self.command_timeout.as_millis(),
                    drive.id
                );
            }
            Err(SendTimeoutError::Disconnected(drive)) => {
                self.stats.drive_commands_dropped += 1;
                log::warn!("No transport, dropping drive command for robot {}", drive.id);
            }
        }
    }

    fn process_camera(&mut self, report: &CameraReport) {
        if let Err(e) = self.engine.handle_camera(report) {
            self.stats.errors += 1;
            log::warn!("Ignoring camera report: {}", e);
        }
    }

    /// Send map deltas and poses to the display unless it is still busy with
    /// the previous snapshot.
    fn publish_snapshot(&mut self) {
        if self.snapshots.is_full() {
            self.stats.ticks_skipped += 1;
            log::trace!("Display behind, keeping deltas for the next tick");
            return;
        }

        let snapshot = self.engine.snapshot();
        match self.snapshots.try_send(snapshot) {
            Ok(()) => self.stats.snapshots_sent += 1,
            Err(TrySendError::Full(_)) => {
                // Only this thread sends, so the slot cannot fill up between
                // the check and the send
                self.stats.ticks_skipped += 1;
            }
            Err(TrySendError::Disconnected(_)) => {
                log::trace!("No display attached, discarding snapshot");
            }
        }
    }

    /// Final snapshot, log flush and map save.
    fn finish(&mut self, wait: Duration, save_path: Option<&std::path::Path>) {
        let snapshot = self.engine.snapshot();
        if self.snapshots.send_timeout(snapshot, wait).is_ok() {
            self.stats.snapshots_sent += 1;
        } else {
            log::debug!("Final snapshot not delivered");
        }

        if let Err(e) = self.engine.flush_log() {
            log::warn!("Failed to flush position log: {}", e);
        }

        if let Some(path) = save_path
            && let Err(e) = self.engine.save_map(path)
        {
            log::error!("Failed to save map to {}: {}", path.display(), e);
        }
    }
}
