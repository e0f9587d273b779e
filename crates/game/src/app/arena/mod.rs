//! Arena core: actors, collision, combat, zone, peers and the depth compositor,
//! driven by one [`Session`] per deployment.

mod actor;
mod collision;
mod combat;
mod compositor;
mod effects;
mod events;
mod map;
mod peers;
mod registry;
mod scheduler;
mod session;
mod wire;
mod zone;

pub(crate) use actor::HeroClass;
pub(crate) use session::{resolve_seed, LocalActorSpec, Session, SessionOutcome};
pub(crate) use wire::{LoopbackTransport, PeerTransport};
