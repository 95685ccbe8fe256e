//! Threading for the fusion core.
//!
//! A single `FusionThread` owns all mutable fusion state. Everything else talks
//! to it through the channels created by [`create_fusion_channels`].

mod channels;
mod fusion_thread;

pub use channels::{FusionEndpoints, FusionInputs, FusionOutputs, create_fusion_channels};
pub use fusion_thread::{FusionThread, FusionThreadConfig, ShutdownHandle};
