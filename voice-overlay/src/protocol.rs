use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{game_state::AmongUsState, voice_state::VoiceState};

pub const GAME_STATE_CHANNEL: &str = "notify_game_state_changed";
pub const VOICE_STATE_CHANNEL: &str = "notify_voice_state_changed";

/// Wire framing of a push: the channel name plus the full snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub channel: String,
    #[serde(default)]
    pub state: Value,
}

/// One push from the state producer. Each carries a full snapshot.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    GameState(AmongUsState),
    VoiceState(VoiceState),
}

impl IncomingMessage {
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::GameState(_) => GAME_STATE_CHANNEL,
            Self::VoiceState(_) => VOICE_STATE_CHANNEL,
        }
    }
}

pub fn parse_incoming_message(text: &str) -> Result<IncomingMessage> {
    let envelope = serde_json::from_str::<PushEnvelope>(text)
        .context("payload is not a channel/state envelope")?;
    let channel = envelope.channel.trim().to_ascii_lowercase();
    // A producer that has nothing yet may push `null`; that is an empty snapshot.
    let state = match envelope.state {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    match channel.as_str() {
        GAME_STATE_CHANNEL => serde_json::from_value(state)
            .map(IncomingMessage::GameState)
            .context("invalid game state snapshot"),
        VOICE_STATE_CHANNEL => serde_json::from_value(state)
            .map(IncomingMessage::VoiceState)
            .context("invalid voice state snapshot"),
        _ => Err(anyhow!("unknown push channel: {}", envelope.channel)),
    }
}
