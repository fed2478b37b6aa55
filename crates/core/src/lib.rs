pub mod config;
pub mod model;

pub use config::{AppConfig, ConfigIntervals};
pub use model::{icon_for, PlaybackStatus, Snapshot, StateRecord, MPRIS_PREFIX};
