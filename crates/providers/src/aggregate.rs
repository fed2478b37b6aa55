use crate::{discover, MediaBus, PropValue};
use player_bridge_core::{PlaybackStatus, Snapshot, StateRecord};
use tracing::debug;

const KEY_LENGTH: &str = "mpris:length";
const KEY_TITLE: &str = "xesam:title";
const KEY_ARTIST: &str = "xesam:artist";

/// Reads one player's state. Never fails: every field falls back to its
/// default independently of the others.
pub async fn aggregate(bus: &dyn MediaBus, player_id: &str) -> StateRecord {
    let mut record = StateRecord::empty(player_id);

    let handle = match bus.open_player(player_id).await {
        Ok(handle) => handle,
        Err(err) => {
            debug!(player = player_id, error = %err, "player vanished before aggregation");
            return record;
        }
    };

    record.status = handle
        .property("PlaybackStatus")
        .await
        .as_ref()
        .and_then(PropValue::as_str)
        .map(PlaybackStatus::from_wire)
        .unwrap_or_default();

    record.position_usec = handle
        .property("Position")
        .await
        .as_ref()
        .and_then(PropValue::as_usec)
        .unwrap_or(0)
        .max(0);

    if let Some(metadata) = handle.property("Metadata").await {
        record.length_usec = metadata
            .get(KEY_LENGTH)
            .and_then(PropValue::as_usec)
            .unwrap_or(0)
            .max(0);
        record.title = metadata
            .get(KEY_TITLE)
            .and_then(PropValue::as_str)
            .map(str::to_string)
            .unwrap_or_default();
        record.artist = metadata
            .get(KEY_ARTIST)
            .and_then(PropValue::first_str)
            .unwrap_or_default();
    }

    record
}

/// Discovers players once and aggregates each, preserving ranking order.
pub async fn build_snapshot(bus: &dyn MediaBus) -> Snapshot {
    let mut records = Vec::new();
    for player_id in discover(bus).await {
        records.push(aggregate(bus, &player_id).await);
    }
    Snapshot(records)
}
