use player_bridge_providers::{discover, MediaBus, PlayerCall, PlayerHandle, PropValue};
use tracing::{debug, info};

mod error;

pub use error::DispatchError;

/// Offset that moves playback from `current_usec` to `target_usec`.
pub fn absolute_offset(current_usec: i64, target_usec: i64) -> i64 {
    target_usec.saturating_sub(current_usec)
}

/// Absolute position for `percentage` of a track, truncated to whole microseconds.
pub fn percent_target(length_usec: i64, percentage: f64) -> Result<i64, DispatchError> {
    check_percentage(percentage)?;
    Ok(((percentage / 100.0) * length_usec as f64) as i64)
}

/// Rejects percentages outside `0..=100`, NaN included.
pub fn check_percentage(percentage: f64) -> Result<(), DispatchError> {
    if (0.0..=100.0).contains(&percentage) {
        Ok(())
    } else {
        Err(DispatchError::InvalidPercentage(percentage))
    }
}

/// Executes one transport command against a player.
///
/// Commands without an explicit player fall back to the first player in
/// ranking order. Every read is fresh; nothing is reused between commands.
pub struct Dispatcher<'a> {
    bus: &'a dyn MediaBus,
}

impl<'a> Dispatcher<'a> {
    pub fn new(bus: &'a dyn MediaBus) -> Self {
        Self { bus }
    }

    pub async fn resolve_target(&self, explicit: Option<&str>) -> Result<String, DispatchError> {
        if let Some(player) = explicit {
            return Ok(player.to_string());
        }
        let player = discover(self.bus)
            .await
            .into_iter()
            .next()
            .ok_or(DispatchError::NoTarget)?;
        debug!(player = %player, "defaulting to top-ranked player");
        Ok(player)
    }

    pub async fn play_pause(&self, explicit: Option<&str>) -> Result<(), DispatchError> {
        let handle = self.open(explicit).await?;
        handle
            .call(PlayerCall::PlayPause)
            .await
            .map_err(DispatchError::Call)?;
        info!(player = handle.bus_name(), "toggled playback");
        Ok(())
    }

    pub async fn seek_to(&self, explicit: Option<&str>, target_usec: i64) -> Result<(), DispatchError> {
        let handle = self.open(explicit).await?;
        require_seek(handle.as_ref()).await?;
        let current = current_position(handle.as_ref()).await?;

        self.seek(handle.as_ref(), absolute_offset(current, target_usec)).await
    }

    pub async fn seek_to_percent(
        &self,
        explicit: Option<&str>,
        percentage: f64,
    ) -> Result<(), DispatchError> {
        check_percentage(percentage)?;

        let handle = self.open(explicit).await?;
        require_seek(handle.as_ref()).await?;

        let length = handle
            .property("Metadata")
            .await
            .as_ref()
            .and_then(|m| m.get("mpris:length"))
            .and_then(PropValue::as_usec)
            .filter(|len| *len > 0)
            .ok_or_else(|| DispatchError::LengthUnavailable(handle.bus_name().to_string()))?;
        let current = current_position(handle.as_ref()).await?;
        let target = percent_target(length, percentage)?;

        self.seek(handle.as_ref(), absolute_offset(current, target)).await
    }

    async fn open(&self, explicit: Option<&str>) -> Result<Box<dyn PlayerHandle>, DispatchError> {
        let player = self.resolve_target(explicit).await?;
        self.bus
            .open_player(&player)
            .await
            .map_err(|source| DispatchError::Unreachable { player, source })
    }

    async fn seek(&self, handle: &dyn PlayerHandle, offset_usec: i64) -> Result<(), DispatchError> {
        handle
            .call(PlayerCall::Seek { offset_usec })
            .await
            .map_err(DispatchError::Call)?;
        info!(player = handle.bus_name(), offset_usec, "seeked");
        Ok(())
    }
}

async fn require_seek(handle: &dyn PlayerHandle) -> Result<(), DispatchError> {
    let can_seek = handle
        .property("CanSeek")
        .await
        .as_ref()
        .and_then(PropValue::as_bool)
        .unwrap_or(false);
    if can_seek {
        Ok(())
    } else {
        Err(DispatchError::SeekUnsupported(handle.bus_name().to_string()))
    }
}

async fn current_position(handle: &dyn PlayerHandle) -> Result<i64, DispatchError> {
    handle
        .property("Position")
        .await
        .as_ref()
        .and_then(PropValue::as_usec)
        .ok_or_else(|| DispatchError::PositionUnavailable(handle.bus_name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::{absolute_offset, percent_target, DispatchError, Dispatcher};
    use player_bridge_providers::fake::{FakeBus, FakePlayer};
    use player_bridge_providers::{PlayerCall, PropValue};

    const VLC: &str = "org.mpris.MediaPlayer2.vlc";
    const MPV: &str = "org.mpris.MediaPlayer2.mpv";

    fn seekable(name: &str) -> FakePlayer {
        FakePlayer::new(name)
            .status("Playing")
            .can_seek(true)
            .position(PropValue::I64(10_000_000))
            .length(PropValue::I64(200_000_000))
    }

    #[test]
    fn offset_math() {
        assert_eq!(absolute_offset(5_000_000, 8_000_000), 3_000_000);
        assert_eq!(absolute_offset(8_000_000, 5_000_000), -3_000_000);
    }

    #[test]
    fn percent_math_truncates() {
        assert_eq!(percent_target(200_000_000, 50.0).unwrap(), 100_000_000);
        assert_eq!(percent_target(3, 50.0).unwrap(), 1);
        assert_eq!(percent_target(200_000_000, 100.0).unwrap(), 200_000_000);
        assert!(percent_target(200_000_000, 100.5).is_err());
        assert!(percent_target(200_000_000, f64::NAN).is_err());
    }

    #[tokio::test]
    async fn absolute_seek_sends_relative_offset() {
        let bus = FakeBus::new().with_player(seekable(VLC).position(PropValue::I64(5_000_000)));
        Dispatcher::new(&bus)
            .seek_to(Some(VLC), 8_000_000)
            .await
            .unwrap();
        assert_eq!(
            bus.calls(),
            vec![(VLC.to_string(), PlayerCall::Seek { offset_usec: 3_000_000 })]
        );
    }

    #[tokio::test]
    async fn percent_seek_sends_relative_offset() {
        let bus = FakeBus::new().with_player(seekable(VLC));
        Dispatcher::new(&bus)
            .seek_to_percent(Some(VLC), 50.0)
            .await
            .unwrap();
        assert_eq!(
            bus.calls(),
            vec![(VLC.to_string(), PlayerCall::Seek { offset_usec: 90_000_000 })]
        );
    }

    #[tokio::test]
    async fn unsigned_length_is_accepted() {
        let bus = FakeBus::new().with_player(seekable(VLC).length(PropValue::U64(200_000_000)));
        Dispatcher::new(&bus)
            .seek_to_percent(Some(VLC), 25.0)
            .await
            .unwrap();
        assert_eq!(
            bus.calls(),
            vec![(VLC.to_string(), PlayerCall::Seek { offset_usec: 40_000_000 })]
        );
    }

    #[tokio::test]
    async fn out_of_range_percent_touches_nothing() {
        let bus = FakeBus::new().with_player(seekable(VLC));
        let dispatcher = Dispatcher::new(&bus);
        for pct in [-1.0, 101.0] {
            let err = dispatcher.seek_to_percent(None, pct).await.unwrap_err();
            assert!(matches!(err, DispatchError::InvalidPercentage(_)));
        }
        assert_eq!(bus.round_trips(), 0);
    }

    #[tokio::test]
    async fn seek_requires_capability() {
        let bus = FakeBus::new()
            .with_player(seekable(VLC).can_seek(false))
            .with_player(seekable(MPV).property("CanSeek", PropValue::Other));
        let dispatcher = Dispatcher::new(&bus);

        for player in [VLC, MPV] {
            let err = dispatcher.seek_to(Some(player), 1).await.unwrap_err();
            assert!(matches!(err, DispatchError::SeekUnsupported(_)));
            let err = dispatcher.seek_to_percent(Some(player), 10.0).await.unwrap_err();
            assert!(matches!(err, DispatchError::SeekUnsupported(_)));
        }

        let no_capability = FakeBus::new().with_player(
            FakePlayer::new(VLC)
                .status("Playing")
                .position(PropValue::I64(0))
                .length(PropValue::I64(1_000)),
        );
        assert!(Dispatcher::new(&no_capability).seek_to(Some(VLC), 1).await.is_err());

        assert!(bus.calls().is_empty());
        assert!(no_capability.calls().is_empty());
    }

    #[tokio::test]
    async fn percent_seek_needs_a_length() {
        let zero = FakeBus::new().with_player(seekable(VLC).length(PropValue::I64(0)));
        let err = Dispatcher::new(&zero)
            .seek_to_percent(Some(VLC), 50.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::LengthUnavailable(_)));

        let absent = FakeBus::new().with_player(
            FakePlayer::new(VLC)
                .status("Playing")
                .can_seek(true)
                .position(PropValue::I64(0)),
        );
        let err = Dispatcher::new(&absent)
            .seek_to_percent(Some(VLC), 50.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::LengthUnavailable(_)));
        assert!(zero.calls().is_empty());
        assert!(absent.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_position_fails_seek() {
        let bus = FakeBus::new().with_player(
            FakePlayer::new(VLC)
                .status("Playing")
                .can_seek(true)
                .length(PropValue::I64(1_000_000)),
        );
        let err = Dispatcher::new(&bus).seek_to(Some(VLC), 10).await.unwrap_err();
        assert!(matches!(err, DispatchError::PositionUnavailable(_)));
    }

    #[tokio::test]
    async fn play_pause_defaults_to_top_ranked() {
        let bus = FakeBus::new()
            .with_player(FakePlayer::new(MPV).status("Paused"))
            .with_player(FakePlayer::new(VLC).status("Playing"));
        Dispatcher::new(&bus).play_pause(None).await.unwrap();
        assert_eq!(bus.calls(), vec![(VLC.to_string(), PlayerCall::PlayPause)]);
    }

    #[tokio::test]
    async fn play_pause_honours_explicit_player() {
        let bus = FakeBus::new()
            .with_player(FakePlayer::new(MPV).status("Paused"))
            .with_player(FakePlayer::new(VLC).status("Playing"));
        Dispatcher::new(&bus).play_pause(Some(MPV)).await.unwrap();
        assert_eq!(bus.calls(), vec![(MPV.to_string(), PlayerCall::PlayPause)]);
    }

    #[tokio::test]
    async fn no_target_when_nothing_is_active() {
        let bus = FakeBus::new().with_player(FakePlayer::new(VLC).status("Stopped"));
        let dispatcher = Dispatcher::new(&bus);
        assert!(matches!(
            dispatcher.play_pause(None).await.unwrap_err(),
            DispatchError::NoTarget
        ));
        assert!(matches!(
            dispatcher.seek_to(None, 0).await.unwrap_err(),
            DispatchError::NoTarget
        ));
        assert!(bus.calls().is_empty());
    }

    #[tokio::test]
    async fn call_errors_surface() {
        let bus = FakeBus::new().with_player(seekable(VLC).failing_calls());
        let dispatcher = Dispatcher::new(&bus);
        assert!(matches!(
            dispatcher.play_pause(Some(VLC)).await.unwrap_err(),
            DispatchError::Call(_)
        ));
        assert!(matches!(
            dispatcher.seek_to(Some(VLC), 0).await.unwrap_err(),
            DispatchError::Call(_)
        ));
    }

    #[tokio::test]
    async fn unknown_explicit_player_is_unreachable() {
        let bus = FakeBus::new();
        let err = Dispatcher::new(&bus)
            .play_pause(Some("org.mpris.MediaPlayer2.ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unreachable { .. }));
    }
}
