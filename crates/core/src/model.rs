use serde::{Deserialize, Serialize};

/// Well-known bus-name prefix shared by every MPRIS player.
pub const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PlaybackStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            "Stopped" => PlaybackStatus::Stopped,
            _ => PlaybackStatus::Unknown,
        }
    }
}

/// Suffix of a player's bus name after [`MPRIS_PREFIX`], empty for foreign names.
pub fn icon_for(player_id: &str) -> &str {
    player_id.strip_prefix(MPRIS_PREFIX).unwrap_or("")
}

/// One player's state at the time of a single poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateRecord {
    pub player_id: String,
    pub status: PlaybackStatus,
    #[serde(rename = "position")]
    pub position_usec: i64,
    #[serde(rename = "length")]
    pub length_usec: i64,
    pub title: String,
    pub artist: String,
    pub icon: String,
}

impl StateRecord {
    /// A record carrying only what the identity itself tells us.
    pub fn empty(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            icon: icon_for(player_id).to_string(),
            ..Self::default()
        }
    }
}

/// Ordered player states, playing players first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Snapshot(pub Vec<StateRecord>);

impl Snapshot {
    pub fn records(&self) -> &[StateRecord] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON array, one line, keys in declaration order.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

impl FromIterator<StateRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = StateRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{icon_for, PlaybackStatus, Snapshot, StateRecord};

    fn record(id: &str, status: PlaybackStatus) -> StateRecord {
        StateRecord {
            player_id: id.to_string(),
            status,
            position_usec: 5_000_000,
            length_usec: 200_000_000,
            title: "Get Lucky".to_string(),
            artist: "Daft Punk".to_string(),
            icon: icon_for(id).to_string(),
        }
    }

    #[test]
    fn empty_snapshot_encodes_as_empty_array() {
        assert_eq!(Snapshot::default().to_wire().unwrap(), "[]");
    }

    #[test]
    fn wire_form_keeps_key_order() {
        let snap = Snapshot(vec![record(
            "org.mpris.MediaPlayer2.spotify",
            PlaybackStatus::Playing,
        )]);
        assert_eq!(
            snap.to_wire().unwrap(),
            r#"[{"player_id":"org.mpris.MediaPlayer2.spotify","status":"Playing","position":5000000,"length":200000000,"title":"Get Lucky","artist":"Daft Punk","icon":"spotify"}]"#
        );
    }

    #[test]
    fn identical_records_encode_identically() {
        let a = Snapshot(vec![
            record("org.mpris.MediaPlayer2.vlc", PlaybackStatus::Playing),
            record("org.mpris.MediaPlayer2.mpv", PlaybackStatus::Paused),
        ]);
        let b = a.clone();
        assert_eq!(a.to_wire().unwrap(), b.to_wire().unwrap());
    }

    #[test]
    fn quotes_in_titles_stay_valid_json() {
        let mut r = record("org.mpris.MediaPlayer2.vlc", PlaybackStatus::Paused);
        r.title = "say \"hi\"".to_string();
        let wire = Snapshot(vec![r.clone()]).to_wire().unwrap();
        let back: Snapshot = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.records()[0].title, r.title);
    }

    #[test]
    fn icon_is_suffix_after_prefix() {
        assert_eq!(icon_for("org.mpris.MediaPlayer2.firefox.instance_1_42"), "firefox.instance_1_42");
        assert_eq!(icon_for("org.freedesktop.Notifications"), "");
        assert_eq!(StateRecord::empty("org.mpris.MediaPlayer2.mpv").icon, "mpv");
    }

    #[test]
    fn unrecognised_status_is_unknown() {
        assert_eq!(PlaybackStatus::from_wire("Playing"), PlaybackStatus::Playing);
        assert_eq!(PlaybackStatus::from_wire("playing"), PlaybackStatus::Unknown);
        assert_eq!(PlaybackStatus::from_wire(""), PlaybackStatus::Unknown);
    }
}
