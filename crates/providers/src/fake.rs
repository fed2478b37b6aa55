//! In-memory bus with scripted players, for tests.

use crate::{MediaBus, PlayerCall, PlayerHandle, PropValue};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct FakePlayer {
    name: String,
    unreachable: bool,
    failing_calls: bool,
    properties: HashMap<String, PropValue>,
    metadata: Option<BTreeMap<String, PropValue>>,
}

impl FakePlayer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn status(self, status: &str) -> Self {
        self.property("PlaybackStatus", PropValue::Str(status.to_string()))
    }

    pub fn position(self, value: PropValue) -> Self {
        self.property("Position", value)
    }

    pub fn can_seek(self, can_seek: bool) -> Self {
        self.property("CanSeek", PropValue::Bool(can_seek))
    }

    pub fn property(mut self, name: &str, value: PropValue) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn length(self, value: PropValue) -> Self {
        self.metadata_entry("mpris:length", value)
    }

    pub fn title(self, title: &str) -> Self {
        self.metadata_entry("xesam:title", PropValue::Str(title.to_string()))
    }

    pub fn artists(self, artists: &[&str]) -> Self {
        let list = artists.iter().map(|a| a.to_string()).collect();
        self.metadata_entry("xesam:artist", PropValue::StrList(list))
    }

    pub fn metadata_entry(mut self, key: &str, value: PropValue) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
        self
    }

    /// Opening a handle on this player fails.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every method call on this player fails.
    pub fn failing_calls(mut self) -> Self {
        self.failing_calls = true;
        self
    }
}

/// Shared call log, kept alive by every handle the bus hands out.
#[derive(Debug, Default)]
struct Activity {
    list_names: AtomicUsize,
    opens: AtomicUsize,
    calls: Mutex<Vec<(String, PlayerCall)>>,
}

#[derive(Debug, Default)]
pub struct FakeBus {
    foreign: Vec<String>,
    players: Vec<FakePlayer>,
    list_fails: bool,
    activity: Arc<Activity>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, player: FakePlayer) -> Self {
        self.players.push(player);
        self
    }

    /// A registered name that does not belong to a media player.
    pub fn with_foreign_name(mut self, name: &str) -> Self {
        self.foreign.push(name.to_string());
        self
    }

    pub fn failing_list_names(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Every method call issued so far, in order.
    pub fn calls(&self) -> Vec<(String, PlayerCall)> {
        self.activity
            .calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Total bus round-trips of any kind: listings, handle opens and calls.
    pub fn round_trips(&self) -> usize {
        self.activity.list_names.load(Ordering::SeqCst)
            + self.activity.opens.load(Ordering::SeqCst)
            + self.calls().len()
    }
}

#[async_trait]
impl MediaBus for FakeBus {
    async fn list_names(&self) -> Result<Vec<String>> {
        self.activity.list_names.fetch_add(1, Ordering::SeqCst);
        if self.list_fails {
            bail!("ListNames refused");
        }
        Ok(self
            .foreign
            .iter()
            .cloned()
            .chain(self.players.iter().map(|p| p.name.clone()))
            .collect())
    }

    async fn open_player(&self, bus_name: &str) -> Result<Box<dyn PlayerHandle>> {
        self.activity.opens.fetch_add(1, Ordering::SeqCst);
        let player = self
            .players
            .iter()
            .find(|p| p.name == bus_name)
            .ok_or_else(|| anyhow!("no such name: {bus_name}"))?;
        if player.unreachable {
            bail!("{bus_name} does not answer");
        }
        Ok(Box::new(FakeHandle {
            player: player.clone(),
            activity: Arc::clone(&self.activity),
        }))
    }
}

struct FakeHandle {
    player: FakePlayer,
    activity: Arc<Activity>,
}

#[async_trait]
impl PlayerHandle for FakeHandle {
    fn bus_name(&self) -> &str {
        &self.player.name
    }

    async fn property(&self, name: &str) -> Option<PropValue> {
        if name == "Metadata" {
            return self.player.metadata.clone().map(PropValue::Dict);
        }
        self.player.properties.get(name).cloned()
    }

    async fn call(&self, call: PlayerCall) -> Result<()> {
        if let Ok(mut calls) = self.activity.calls.lock() {
            calls.push((self.player.name.clone(), call));
        }
        if self.player.failing_calls {
            bail!("{} rejected {}", self.player.name, call.method());
        }
        Ok(())
    }
}
