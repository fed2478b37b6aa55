use crate::{MediaBus, PropValue};
use player_bridge_core::{PlaybackStatus, MPRIS_PREFIX};
use tracing::{debug, warn};

/// Orders players for display and default targeting: every playing player in
/// discovery order, then every paused one. Anything else is left out.
pub fn rank<I>(players: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, PlaybackStatus)>,
{
    let mut playing = Vec::new();
    let mut paused = Vec::new();
    for (name, status) in players {
        match status {
            PlaybackStatus::Playing => playing.push(name),
            PlaybackStatus::Paused => paused.push(name),
            PlaybackStatus::Stopped | PlaybackStatus::Unknown => {}
        }
    }
    playing.extend(paused);
    playing
}

/// Lists active MPRIS players in ranking order.
///
/// A player that cannot be opened or has no readable status is skipped. A
/// failing `ListNames` yields an empty list rather than an error.
pub async fn discover(bus: &dyn MediaBus) -> Vec<String> {
    let names = match bus.list_names().await {
        Ok(names) => names,
        Err(err) => {
            warn!(error = %err, "listing bus names failed");
            return Vec::new();
        }
    };

    let mut classified = Vec::new();
    for name in names.into_iter().filter(|n| n.starts_with(MPRIS_PREFIX)) {
        let handle = match bus.open_player(&name).await {
            Ok(handle) => handle,
            Err(err) => {
                debug!(player = %name, error = %err, "skipping player");
                continue;
            }
        };
        let Some(status) = handle
            .property("PlaybackStatus")
            .await
            .as_ref()
            .and_then(PropValue::as_str)
            .map(PlaybackStatus::from_wire)
        else {
            debug!(player = %name, "no readable PlaybackStatus");
            continue;
        };
        classified.push((name, status));
    }

    let ranked = rank(classified);
    debug!(count = ranked.len(), "discovered active players");
    ranked
}
