use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::actor::{HeroClass, PeerId, WeaponKind};

const LOOPBACK_HISTORY: usize = 64;

/// Events received from (or simulated for) remote participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum PeerEvent {
    Join {
        peer: PeerId,
        name: String,
        #[serde(default)]
        class: HeroClass,
        x: f32,
        y: f32,
    },
    Move {
        peer: PeerId,
        x: f32,
        y: f32,
        angle: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
    Shoot {
        peer: PeerId,
        x: f32,
        y: f32,
        angle: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon: Option<WeaponKind>,
    },
    Eliminated {
        peer: PeerId,
    },
    Leave {
        peer: PeerId,
    },
}

impl PeerEvent {
    pub(crate) fn peer(&self) -> PeerId {
        match self {
            PeerEvent::Join { peer, .. }
            | PeerEvent::Move { peer, .. }
            | PeerEvent::Shoot { peer, .. }
            | PeerEvent::Eliminated { peer }
            | PeerEvent::Leave { peer } => *peer,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            PeerEvent::Join { .. } => "join",
            PeerEvent::Move { .. } => "move",
            PeerEvent::Shoot { .. } => "shoot",
            PeerEvent::Eliminated { .. } => "eliminated",
            PeerEvent::Leave { .. } => "leave",
        }
    }
}

/// Local actions announced to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ActionEvent {
    Move {
        room: String,
        x: f32,
        y: f32,
        angle: f32,
        seq: u64,
    },
    Shoot {
        room: String,
        x: f32,
        y: f32,
        angle: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon: Option<WeaponKind>,
    },
}

#[derive(Debug, Error)]
pub(crate) enum WireError {
    #[error("failed to encode action event: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed peer event at `{path}`: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn encode_action(event: &ActionEvent) -> Result<String, WireError> {
    serde_json::to_string(event).map_err(WireError::Encode)
}

pub(crate) fn decode_peer_event(raw: &str) -> Result<PeerEvent, WireError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, PeerEvent>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        WireError::Decode {
            path,
            source: error.into_inner(),
        }
    })
}

/// Frame pipe to the room. Outgoing frames are fire-and-forget; incoming frames
/// are polled once per tick.
pub(crate) trait PeerTransport {
    fn send(&mut self, frame: String);
    fn try_recv(&mut self) -> Option<String>;
    fn frames_sent(&self) -> u64;
    fn last_sent(&self) -> Option<&str> {
        None
    }
}

/// In-process transport: keeps the most recent outgoing frames and replays a
/// queue of incoming ones.
#[derive(Debug, Default)]
pub(crate) struct LoopbackTransport {
    sent: u64,
    recent: VecDeque<String>,
    incoming: VecDeque<String>,
}

impl LoopbackTransport {
    #[cfg(test)]
    pub(crate) fn with_incoming(frames: impl IntoIterator<Item = String>) -> Self {
        Self {
            incoming: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }
}

impl PeerTransport for LoopbackTransport {
    fn send(&mut self, frame: String) {
        self.sent = self.sent.saturating_add(1);
        if self.recent.len() == LOOPBACK_HISTORY {
            self.recent.pop_front();
        }
        self.recent.push_back(frame);
    }

    fn try_recv(&mut self) -> Option<String> {
        self.incoming.pop_front()
    }

    fn frames_sent(&self) -> u64 {
        self.sent
    }

    fn last_sent(&self) -> Option<&str> {
        self.recent.back().map(String::as_str)
    }
}
