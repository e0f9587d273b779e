use super::actor::{ActorId, LootKind, PeerId};
use super::zone::ZonePhase;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ArenaEvent {
    ShotFired {
        shooter: ActorId,
        projectiles: u32,
    },
    ActorDamaged {
        actor: ActorId,
        absorbed: f32,
        health_lost: f32,
    },
    ActorEliminated {
        actor: ActorId,
        by: Option<ActorId>,
    },
    ItemPickedUp {
        actor: ActorId,
        item: ActorId,
        loot: LootKind,
    },
    ZonePhaseChanged {
        phase: ZonePhase,
    },
    PeerJoined {
        peer: PeerId,
        actor: ActorId,
    },
    PeerLeft {
        peer: PeerId,
    },
    StalePeerEventDropped {
        peer: PeerId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArenaEventKind {
    ShotFired,
    ActorDamaged,
    ActorEliminated,
    ItemPickedUp,
    ZonePhaseChanged,
    PeerJoined,
    PeerLeft,
    StalePeerEventDropped,
}

impl ArenaEvent {
    pub(crate) fn kind(&self) -> ArenaEventKind {
        match self {
            ArenaEvent::ShotFired { .. } => ArenaEventKind::ShotFired,
            ArenaEvent::ActorDamaged { .. } => ArenaEventKind::ActorDamaged,
            ArenaEvent::ActorEliminated { .. } => ArenaEventKind::ActorEliminated,
            ArenaEvent::ItemPickedUp { .. } => ArenaEventKind::ItemPickedUp,
            ArenaEvent::ZonePhaseChanged { .. } => ArenaEventKind::ZonePhaseChanged,
            ArenaEvent::PeerJoined { .. } => ArenaEventKind::PeerJoined,
            ArenaEvent::PeerLeft { .. } => ArenaEventKind::PeerLeft,
            ArenaEvent::StalePeerEventDropped { .. } => ArenaEventKind::StalePeerEventDropped,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ArenaEventCounts {
    pub(crate) total: u32,
    pub(crate) shots_fired: u32,
    pub(crate) actors_damaged: u32,
    pub(crate) actors_eliminated: u32,
    pub(crate) items_picked_up: u32,
    pub(crate) zone_phase_changes: u32,
    pub(crate) peers_joined: u32,
    pub(crate) peers_left: u32,
    pub(crate) stale_peer_events: u32,
}

impl ArenaEventCounts {
    fn record(&mut self, kind: ArenaEventKind) {
        self.total = self.total.saturating_add(1);
        let slot = match kind {
            ArenaEventKind::ShotFired => &mut self.shots_fired,
            ArenaEventKind::ActorDamaged => &mut self.actors_damaged,
            ArenaEventKind::ActorEliminated => &mut self.actors_eliminated,
            ArenaEventKind::ItemPickedUp => &mut self.items_picked_up,
            ArenaEventKind::ZonePhaseChanged => &mut self.zone_phase_changes,
            ArenaEventKind::PeerJoined => &mut self.peers_joined,
            ArenaEventKind::PeerLeft => &mut self.peers_left,
            ArenaEventKind::StalePeerEventDropped => &mut self.stale_peer_events,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Per-tick event log. Systems append as they run; the tick ends with a rollover
/// that keeps only the counts for diagnostics.
#[derive(Debug, Default)]
pub(crate) struct ArenaEventBus {
    current_tick_events: Vec<ArenaEvent>,
    last_tick_counts: ArenaEventCounts,
}

impl ArenaEventBus {
    pub(crate) fn emit(&mut self, event: ArenaEvent) {
        self.current_tick_events.push(event);
    }

    pub(crate) fn iter_emitted_so_far(&self) -> impl Iterator<Item = &ArenaEvent> {
        self.current_tick_events.iter()
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        let mut counts = ArenaEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        self.current_tick_events.clear();
    }

    pub(crate) fn last_tick_counts(&self) -> ArenaEventCounts {
        self.last_tick_counts
    }
}
