//! File output: position log and map snapshots.

pub mod map_file;
pub mod position_log;

pub use map_file::{load_map, read_map, save_map, write_map};
pub use position_log::{POSITION_LOG_HEADER, PositionLog};
