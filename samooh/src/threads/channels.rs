//! Channel bundle connecting the fusion thread to its collaborators.
//!
//! ```text
//!  transport ──SensorReport──────┐                 ┌──RegistrationRequest──► UI
//!  UI ────────RegistrationInit───┤                 │
//!  UI ────────Command────────────┼──► fusion ──────┼──DriveCommand─────────► transport
//!  camera ────CameraReport───────┘    thread       └──DisplaySnapshot──────► display
//! ```
//!
//! Inbound channels are bounded so a stalled engine pushes back on producers.
//! Registration requests are unbounded so the engine never waits on the UI.
//! The snapshot channel holds a single snapshot; the engine skips a tick rather
//! than block when the display has not consumed the previous one.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::messages::{
    CameraReport, Command, DisplaySnapshot, DriveCommand, RegistrationInit, RegistrationRequest,
    SensorReport,
};

/// Producer ends of the inbound channels. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FusionInputs {
    pub reports: Sender<SensorReport>,
    pub registrations: Sender<RegistrationInit>,
    pub commands: Sender<Command>,
    pub camera: Sender<CameraReport>,
}

/// Consumer ends of the outbound channels.
#[derive(Debug, Clone)]
pub struct FusionOutputs {
    pub registration_requests: Receiver<RegistrationRequest>,
    pub drive_commands: Receiver<DriveCommand>,
    pub snapshots: Receiver<DisplaySnapshot>,
}

/// The fusion thread's side of every channel.
#[derive(Debug)]
pub struct FusionEndpoints {
    pub reports: Receiver<SensorReport>,
    pub registrations: Receiver<RegistrationInit>,
    pub commands: Receiver<Command>,
    pub camera: Receiver<CameraReport>,
    pub registration_requests: Sender<RegistrationRequest>,
    pub drive_commands: Sender<DriveCommand>,
    pub snapshots: Sender<DisplaySnapshot>,
}

/// Create all fusion channels. `capacity` is the slot count of each inbound
/// channel and of the drive-command channel.
pub fn create_fusion_channels(capacity: usize) -> (FusionInputs, FusionOutputs, FusionEndpoints) {
    let (reports_tx, reports_rx) = bounded(capacity);
    let (registrations_tx, registrations_rx) = bounded(capacity);
    let (commands_tx, commands_rx) = bounded(capacity);
    let (camera_tx, camera_rx) = bounded(capacity);
    let (requests_tx, requests_rx) = unbounded();
    let (drive_tx, drive_rx) = bounded(capacity);
    let (snapshots_tx, snapshots_rx) = bounded(1);

    (
        FusionInputs {
            reports: reports_tx,
            registrations: registrations_tx,
            commands: commands_tx,
            camera: camera_tx,
        },
        FusionOutputs {
            registration_requests: requests_rx,
            drive_commands: drive_rx,
            snapshots: snapshots_rx,
        },
        FusionEndpoints {
            reports: reports_rx,
            registrations: registrations_rx,
            commands: commands_rx,
            camera: camera_rx,
            registration_requests: requests_tx,
            drive_commands: drive_tx,
            snapshots: snapshots_tx,
        },
    )
}
