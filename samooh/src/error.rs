//! Error types for Samooh

use thiserror::Error;

use crate::core::types::RobotId;

/// Samooh error type
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Unknown robot: {0}")]
    UnknownRobot(RobotId),

    #[error("No robots registered")]
    NoRobotsRegistered,

    #[error("Robot {0} is already registered")]
    DuplicateRegistration(RobotId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Map file error: {0}")]
    MapFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for FusionError {
    fn from(e: toml::de::Error) -> Self {
        FusionError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FusionError>;
