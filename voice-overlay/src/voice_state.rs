use std::{collections::HashMap, hash::Hash, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketClient {
    pub player_id: u32,
}

/// Snapshot pushed by the voice transport. Keys of the player maps are
/// player ids, keys of the peer maps are voice socket ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceState {
    #[serde(deserialize_with = "tolerant_map")]
    pub other_talking: HashMap<u32, bool>,
    #[serde(deserialize_with = "tolerant_map")]
    pub other_dead: HashMap<u32, bool>,
    #[serde(deserialize_with = "tolerant_map")]
    pub player_socket_ids: HashMap<u32, String>,
    #[serde(deserialize_with = "tolerant_map")]
    pub socket_clients: HashMap<String, SocketClient>,
    #[serde(deserialize_with = "tolerant_map")]
    pub audio_connected: HashMap<String, bool>,
}

/// Decodes a JSON object entry by entry. Entries whose key or value does not
/// decode are dropped, so one bad entry reads as "no signal" for that key
/// only. A `null` map is empty; anything that is not an object is rejected.
fn tolerant_map<'de, D, K, V>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: FromStr + Eq + Hash,
    V: DeserializeOwned,
{
    let Some(raw) = Option::<HashMap<String, Value>>::deserialize(deserializer)? else {
        return Ok(HashMap::new());
    };
    let mut map = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let Ok(parsed_key) = key.parse::<K>() else {
            debug!(key = %key, "skipped voice entry with malformed key");
            continue;
        };
        match serde_json::from_value::<V>(value) {
            Ok(value) => {
                map.insert(parsed_key, value);
            }
            Err(err) => debug!(?err, key = %key, "skipped malformed voice entry"),
        }
    }
    Ok(map)
}

impl VoiceState {
    pub fn is_talking(&self, player_id: u32) -> bool {
        self.other_talking.get(&player_id).copied().unwrap_or(false)
    }

    /// Voice-side death flag, independent of the game roster's own.
    pub fn is_dead(&self, player_id: u32) -> bool {
        self.other_dead.get(&player_id).copied().unwrap_or(false)
    }

    pub fn peer_for(&self, player_id: u32) -> Option<&str> {
        self.player_socket_ids.get(&player_id).map(String::as_str)
    }

    pub fn has_socket_client(&self, player_id: u32) -> bool {
        self.socket_clients
            .values()
            .any(|client| client.player_id == player_id)
    }

    pub fn is_audio_connected(&self, peer: Option<&str>) -> bool {
        peer.and_then(|peer| self.audio_connected.get(peer))
            .copied()
            .unwrap_or(false)
    }

    pub fn talking_count(&self) -> usize {
        self.other_talking.values().filter(|talking| **talking).count()
    }
}
