use crate::{MediaBus, PlayerCall, PlayerHandle, PropValue, MPRIS_PATH, PLAYER_INTERFACE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};
use zbus::zvariant::{OwnedValue, Value};
use zbus::{Connection, Proxy};

/// The user's session bus, reached through zbus.
#[derive(Clone)]
pub struct SessionBus {
    conn: Connection,
}

impl SessionBus {
    pub async fn connect() -> Result<Self> {
        let conn = Connection::session()
            .await
            .context("failed to connect DBus session")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl MediaBus for SessionBus {
    async fn list_names(&self) -> Result<Vec<String>> {
        let proxy = Proxy::new(
            &self.conn,
            "org.freedesktop.DBus",
            "/org/freedesktop/DBus",
            "org.freedesktop.DBus",
        )
        .await?;

        let names: Vec<String> = proxy.call("ListNames", &()).await?;
        Ok(names)
    }

    async fn open_player(&self, bus_name: &str) -> Result<Box<dyn PlayerHandle>> {
        let proxy = Proxy::new_owned(
            self.conn.clone(),
            bus_name.to_string(),
            MPRIS_PATH,
            PLAYER_INTERFACE,
        )
        .await
        .with_context(|| format!("failed to open player proxy for {bus_name}"))?;

        Ok(Box::new(SessionPlayer {
            bus_name: bus_name.to_string(),
            proxy,
        }))
    }
}

struct SessionPlayer {
    bus_name: String,
    proxy: Proxy<'static>,
}

#[async_trait]
impl PlayerHandle for SessionPlayer {
    fn bus_name(&self) -> &str {
        &self.bus_name
    }

    async fn property(&self, name: &str) -> Option<PropValue> {
        match self.proxy.get_property::<OwnedValue>(name).await {
            Ok(value) => Some(decode(&value)),
            Err(err) => {
                trace!(player = %self.bus_name, property = name, error = %err, "property unavailable");
                None
            }
        }
    }

    async fn call(&self, call: PlayerCall) -> Result<()> {
        debug!(player = %self.bus_name, method = call.method(), "calling player method");
        let reply = match call {
            PlayerCall::PlayPause => self.proxy.call::<_, _, ()>(call.method(), &()).await,
            PlayerCall::Seek { offset_usec } => {
                self.proxy
                    .call::<_, _, ()>(call.method(), &(offset_usec,))
                    .await
            }
        };
        reply.with_context(|| format!("{} on {} failed", call.method(), self.bus_name))
    }
}

fn decode(value: &Value<'_>) -> PropValue {
    match value {
        Value::Str(s) => PropValue::Str(s.to_string()),
        Value::ObjectPath(p) => PropValue::Str(p.to_string()),
        Value::I64(v) => PropValue::I64(*v),
        Value::I32(v) => PropValue::I64(i64::from(*v)),
        Value::U64(v) => PropValue::U64(*v),
        Value::U32(v) => PropValue::U64(u64::from(*v)),
        Value::Bool(b) => PropValue::Bool(*b),
        Value::Value(inner) => decode(inner),
        Value::Array(arr) => arr
            .iter()
            .map(|item| match item {
                Value::Str(s) => Some(s.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(PropValue::StrList)
            .unwrap_or(PropValue::Other),
        Value::Dict(_) => decode_dict(value).unwrap_or(PropValue::Other),
        _ => PropValue::Other,
    }
}

fn decode_dict(value: &Value<'_>) -> Option<PropValue> {
    let owned = value.try_clone().ok()?;
    let map = HashMap::<String, OwnedValue>::try_from(owned).ok()?;
    let decoded: BTreeMap<String, PropValue> = map
        .iter()
        .map(|(key, v)| (key.clone(), decode(v)))
        .collect();
    Some(PropValue::Dict(decoded))
}
