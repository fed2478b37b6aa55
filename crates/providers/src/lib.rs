use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod aggregate;
pub mod directory;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod mpris;

pub use aggregate::{aggregate, build_snapshot};
pub use directory::{discover, rank};
pub use mpris::SessionBus;

pub const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// A property value decoded off the bus.
///
/// Every shape the aggregator cares about gets its own variant; anything else
/// lands in `Other` and reads as absent through the accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    I64(i64),
    U64(u64),
    Bool(bool),
    StrList(Vec<String>),
    Dict(BTreeMap<String, PropValue>),
    Other,
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Microsecond quantities arrive as either `x` or `t` depending on the player.
    pub fn as_usec(&self) -> Option<i64> {
        match self {
            PropValue::I64(v) => Some(*v),
            PropValue::U64(v) => Some(i64::try_from(*v).unwrap_or(i64::MAX)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// First entry of a string list. Owned, so the source value can be dropped.
    pub fn first_str(&self) -> Option<String> {
        match self {
            PropValue::StrList(items) => items.first().cloned(),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        match self {
            PropValue::Dict(map) => map.get(key),
            _ => None,
        }
    }
}

/// Methods of the player interface this tool invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCall {
    PlayPause,
    Seek { offset_usec: i64 },
}

impl PlayerCall {
    pub fn method(&self) -> &'static str {
        match self {
            PlayerCall::PlayPause => "PlayPause",
            PlayerCall::Seek { .. } => "Seek",
        }
    }
}

/// Access to the session bus, narrowed to what discovery and control need.
#[async_trait]
pub trait MediaBus: Send + Sync {
    async fn list_names(&self) -> Result<Vec<String>>;
    async fn open_player(&self, bus_name: &str) -> Result<Box<dyn PlayerHandle>>;
}

/// A handle on one player's `org.mpris.MediaPlayer2.Player` object.
#[async_trait]
pub trait PlayerHandle: Send + Sync {
    fn bus_name(&self) -> &str;
    /// `None` when the property is missing or could not be decoded.
    async fn property(&self, name: &str) -> Option<PropValue>;
    async fn call(&self, call: PlayerCall) -> Result<()>;
}
