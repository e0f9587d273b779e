use std::fmt::{self, Write as _};

use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

const MAGNET_PREFIX: &str = "#magnet:?";
const ROOM_URN_PREFIX: &str = "urn:arena:";
const SECTOR_HASH_LEN: usize = 16;
const SHARD_RANGE: u32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionTag {
    UsNorth,
    EuWest,
    AsiaEast,
    Global,
}

impl RegionTag {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RegionTag::UsNorth => "US-NORTH",
            RegionTag::EuWest => "EU-WEST",
            RegionTag::AsiaEast => "ASIA-EAST",
            RegionTag::Global => "GLOBAL-1",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        [
            RegionTag::UsNorth,
            RegionTag::EuWest,
            RegionTag::AsiaEast,
            RegionTag::Global,
        ]
        .into_iter()
        .find(|tag| tag.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    /// Best-effort guess from an IANA zone name such as `Europe/Berlin`.
    pub(crate) fn from_time_zone(zone: &str) -> Self {
        if zone.contains("New_York") || zone.contains("Los_Angeles") {
            RegionTag::UsNorth
        } else if zone.contains("London") || zone.contains("Berlin") {
            RegionTag::EuWest
        } else if zone.contains("Tokyo") || zone.contains("Seoul") {
            RegionTag::AsiaEast
        } else {
            RegionTag::Global
        }
    }

    pub(crate) fn detect() -> Self {
        std::env::var("TZ")
            .map(|zone| Self::from_time_zone(&zone))
            .unwrap_or(RegionTag::Global)
    }
}

impl fmt::Display for RegionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoomIdentity {
    pub(crate) room_id: String,
    pub(crate) region: Option<RegionTag>,
    /// False when the link was absent or unusable and a shard id was generated.
    pub(crate) linked: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RoomLinkError {
    #[error("link has no `#magnet:?` fragment")]
    MissingFragment,
    #[error("magnet fragment has no `xt=urn:arena:` topic")]
    MissingTopic,
    #[error("magnet topic carries an empty room id")]
    EmptyId,
}

/// Parses the magnet fragment of a shareable link. Anything before the `#` is
/// ignored so full URLs and bare fragments both work.
pub(crate) fn parse_magnet(link: &str) -> Result<RoomIdentity, RoomLinkError> {
    let start = link.find(MAGNET_PREFIX).ok_or(RoomLinkError::MissingFragment)?;
    let query = &link[start + MAGNET_PREFIX.len()..];

    let mut topic = None;
    let mut region = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("xt", value)) => topic = Some(value),
            Some(("rg", value)) => region = RegionTag::parse(value),
            _ => {}
        }
    }

    let topic = topic
        .filter(|value| value.starts_with(ROOM_URN_PREFIX))
        .ok_or(RoomLinkError::MissingTopic)?;
    let room_id = topic.split(':').nth(2).unwrap_or_default().trim();
    if room_id.is_empty() {
        return Err(RoomLinkError::EmptyId);
    }

    Ok(RoomIdentity {
        room_id: room_id.to_string(),
        region,
        linked: true,
    })
}

pub(crate) fn fallback_shard<R: Rng + ?Sized>(rng: &mut R) -> RoomIdentity {
    RoomIdentity {
        room_id: format!("shard_{}", rng.gen_range(0..SHARD_RANGE)),
        region: None,
        linked: false,
    }
}

/// Resolves the room to join. A missing or malformed link never fails startup;
/// a fresh shard is hosted instead.
pub(crate) fn resolve_room<R: Rng + ?Sized>(link: Option<&str>, rng: &mut R) -> RoomIdentity {
    let Some(link) = link else {
        let identity = fallback_shard(rng);
        info!(room_id = identity.room_id.as_str(), "room_shard_hosted");
        return identity;
    };

    match parse_magnet(link) {
        Ok(identity) => {
            info!(
                room_id = identity.room_id.as_str(),
                region = identity.region.map(RegionTag::as_str).unwrap_or("none"),
                "room_link_resolved"
            );
            identity
        }
        Err(error) => {
            let identity = fallback_shard(rng);
            warn!(
                error = %error,
                room_id = identity.room_id.as_str(),
                "room_link_invalid"
            );
            identity
        }
    }
}

/// Uppercase first 16 hex characters of SHA-256 over `seed` followed by the
/// decimal timestamp.
pub(crate) fn sector_hash(seed: &str, timestamp_ms: u128) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(timestamp_ms.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(SECTOR_HASH_LEN);
    for byte in digest.iter().take(SECTOR_HASH_LEN / 2) {
        let _ = write!(&mut hex, "{byte:02X}");
    }
    hex
}

pub(crate) fn magnet_link(origin: &str, hash: &str, region: RegionTag) -> String {
    let origin = origin.split('#').next().unwrap_or_default();
    format!("{origin}{MAGNET_PREFIX}xt={ROOM_URN_PREFIX}{hash}&rg={region}")
}
