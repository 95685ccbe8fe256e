//! Samooh - telemetry fusion core for a small fleet of mapping robots
//!
//! Robots report odometry and IR offsets relative to where they started. The
//! core places every robot in one shared occupancy grid, translates operator
//! commands into each robot's own frame, and publishes map changes to a
//! display.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      bin/                           │  ← Simulator
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Concurrency
//! │         (fusion thread, channel bundle)             │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │       (report fusion, command translation)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────────────────┐ ┌────────────────────────┐
//! │     grid/ + registry     │ │          io/           │  ← State, files
//! │ (occupancy, robot poses) │ │ (position log, map)    │
//! └──────────────────────────┘ └────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │            (types, math, rasterization)             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Conventions
//!
//! - Map coordinates are integer centimeters, heading 0 faces +X and 90 faces
//!   +Y.
//! - Robot reports are millimeters and degrees relative to the robot's start
//!   pose.
//! - Grid row `center_y` holds map y = 0; the row index shrinks as map y grows.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;
pub mod error;

// ============================================================================
// Layer 2: Shared state (depends on core)
// ============================================================================
pub mod grid;
pub mod messages;
pub mod registry;

// ============================================================================
// Layer 3: Configuration and files (depends on core, grid, registry)
// ============================================================================
pub mod config;
pub mod io;

// ============================================================================
// Layer 4: Fusion engine (depends on all of the above)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: Threading and simulation
// ============================================================================
pub mod sim;
pub mod threads;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{CellState, GridCell, MapPoint, RobotId, RobotPose};
pub use error::{FusionError, Result};

// State
pub use grid::{CellCounts, MapDelta, OccupancyGrid, RayResult};
pub use registry::RobotRegistry;

// Messages
pub use messages::{
    CameraReport, Command, DisplaySnapshot, DriveCommand, RegistrationInit, RegistrationRequest,
    SensorReport,
};

// Configuration and files
pub use config::SamoohConfig;
pub use io::{PositionLog, load_map, save_map};

// Engine
pub use engine::{FusionEngine, FusionStats, ReportOutcome, translate_command};

// Threads
pub use threads::{
    FusionEndpoints, FusionInputs, FusionOutputs, FusionThread, FusionThreadConfig,
    ShutdownHandle, create_fusion_channels,
};

// Simulation
pub use sim::{SimConfig, SimulatedRobot};
