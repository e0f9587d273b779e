use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use arena_engine::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::actor::{
    Actor, ActorId, ActorKind, Control, HeroClass, LifeState, PeerId, PlayerState,
    ProjectileState, Weapon, WeaponKind,
};
use super::collision::{clamp_to_world, resolve_axis_move, Rect};
use super::combat::ShotSpec;
use super::events::{ArenaEvent, ArenaEventBus};
use super::map::pick_spawn_point;
use super::registry::ActorRegistry;
use super::scheduler::{DueTask, TaskScheduler, TaskTarget};
use super::wire::{
    decode_peer_event, encode_action, ActionEvent, PeerEvent, PeerTransport, WireError,
};
use super::zone::Zone;
use crate::app::config::{CombatConfig, PeerConfig, PlayerConfig, WorldConfig};

const MAX_FRAMES_PER_TICK: usize = 256;

pub(crate) const BOT_NAMES: [&str; 8] = [
    "Ghost", "Viper", "Reaper", "Spectre", "Nomad", "Ranger", "Zero", "Echo",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BotBrain {
    pub(crate) heading: f32,
    pub(crate) think_timer: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Reconciliation {
    pub(crate) target: Vec2,
    pub(crate) target_angle: f32,
    pub(crate) last_seq: Option<u64>,
}

/// Each remote actor is driven by exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PeerDriver {
    Scripted(BotBrain),
    Reconciled(Reconciliation),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PeerRecord {
    pub(crate) actor: ActorId,
    pub(crate) driver: PeerDriver,
}

pub(crate) struct SyncContext<'a> {
    pub(crate) registry: &'a mut ActorRegistry,
    pub(crate) events: &'a mut ArenaEventBus,
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) obstacles: &'a [Rect],
    pub(crate) zone: &'a Zone,
    pub(crate) world: &'a WorldConfig,
    pub(crate) player: &'a PlayerConfig,
    pub(crate) combat: &'a CombatConfig,
}

/// Keeps remote actors in step with the room. Incoming events are held back
/// by a simulated latency before they apply; bots are scripted locally and
/// never receive movement events.
pub(crate) struct PeerSynchronizer {
    config: PeerConfig,
    room_id: Option<String>,
    peers: BTreeMap<PeerId, PeerRecord>,
    inbox: TaskScheduler<PeerEvent>,
    due: Vec<DueTask<PeerEvent>>,
    next_peer: u64,
    transport: Box<dyn PeerTransport>,
    send_timer: f32,
    move_seq: u64,
    fire_requests: Vec<ActorId>,
    mirrored_shots: Vec<ActorId>,
}

impl PeerSynchronizer {
    pub(crate) fn new(config: PeerConfig, transport: Box<dyn PeerTransport>) -> Self {
        Self {
            config,
            room_id: None,
            peers: BTreeMap::new(),
            inbox: TaskScheduler::default(),
            due: Vec::new(),
            next_peer: 1,
            transport,
            send_timer: 0.0,
            move_seq: 0,
            fire_requests: Vec::new(),
            mirrored_shots: Vec::new(),
        }
    }

    pub(crate) fn connect(&mut self, room_id: &str, context: &mut SyncContext<'_>) -> usize {
        self.room_id = Some(room_id.to_string());
        let spawned = self.spawn_bots(self.config.initial_bots, context);
        info!(room_id, bots = spawned, "peer_sync_connected");
        spawned
    }

    /// Forgets every peer and pending delivery. Returns the number of dropped
    /// deliveries.
    pub(crate) fn disconnect(&mut self) -> usize {
        let dropped = self.inbox.cancel_all();
        let peers = self.peers.len();
        self.peers.clear();
        self.fire_requests.clear();
        self.mirrored_shots.clear();
        if let Some(room_id) = self.room_id.take() {
            info!(
                room_id = room_id.as_str(),
                peers,
                dropped_deliveries = dropped,
                frames_sent = self.transport.frames_sent(),
                last_frame = self.transport.last_sent().unwrap_or("none"),
                "peer_sync_disconnected"
            );
        }
        dropped
    }

    pub(crate) fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub(crate) fn peer_count(&self) -> usize {
        self.peers.len()
    }

    #[cfg(test)]
    pub(crate) fn record(&self, peer: PeerId) -> Option<&PeerRecord> {
        self.peers.get(&peer)
    }

    #[cfg(test)]
    pub(crate) fn pending_deliveries(&self) -> usize {
        self.inbox.pending()
    }

    fn allocate_peer_id(&mut self) -> PeerId {
        loop {
            let candidate = PeerId(self.next_peer);
            self.next_peer = self.next_peer.saturating_add(1);
            if !self.peers.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub(crate) fn spawn_bots(&mut self, count: usize, context: &mut SyncContext<'_>) -> usize {
        for _ in 0..count {
            let peer = self.allocate_peer_id();
            let name = BOT_NAMES[context.rng.gen_range(0..BOT_NAMES.len())];
            let class =
                HeroClass::BOT_CLASSES[context.rng.gen_range(0..HeroClass::BOT_CLASSES.len())];
            let position =
                pick_spawn_point(context.rng, context.obstacles, context.world.size, 0.0);

            let mut bot = PlayerState::new(name, class, Control::Bot(peer), context.player);
            bot.slots[0] = Some(Weapon::bot_rifle());
            let actor = context.registry.spawn(position, ActorKind::Player(bot));

            self.peers.insert(
                peer,
                PeerRecord {
                    actor,
                    driver: PeerDriver::Scripted(BotBrain {
                        heading: 0.0,
                        think_timer: 0.0,
                    }),
                },
            );
            debug!(peer = peer.0, name, class = class.label(), "bot_spawned");
        }
        count
    }

    /// Adds one bot while the arena is below its player cap.
    pub(crate) fn spawn_wave(&mut self, context: &mut SyncContext<'_>) -> usize {
        if context.registry.alive_player_count() >= self.config.max_players {
            return 0;
        }
        self.spawn_bots(1, context)
    }

    /// Queues `event` for delivery after a randomized latency. Deliveries are
    /// never filtered by peer: a join and a move arriving together must both
    /// apply, and events for departed peers are counted as stale on apply.
    pub(crate) fn receive(&mut self, event: PeerEvent, now: f64, rng: &mut ChaCha8Rng) {
        let latency = self.config.latency_base + self.config.latency_jitter * rng.gen::<f32>();
        self.inbox
            .schedule_at(now + f64::from(latency), TaskTarget::None, event);
    }

    pub(crate) fn receive_raw(
        &mut self,
        raw: &str,
        now: f64,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), WireError> {
        let event = decode_peer_event(raw)?;
        self.receive(event, now, rng);
        Ok(())
    }

    /// Queues frames waiting on the transport, applies deliveries that are due,
    /// then moves every live remote actor.
    pub(crate) fn advance(&mut self, dt: f32, now: f64, context: &mut SyncContext<'_>) {
        for _ in 0..MAX_FRAMES_PER_TICK {
            let Some(frame) = self.transport.try_recv() else {
                break;
            };
            if let Err(error) = self.receive_raw(&frame, now, context.rng) {
                warn!(error = %error, "peer_frame_rejected");
            }
        }

        let mut due = std::mem::take(&mut self.due);
        due.clear();
        self.inbox.drain_due(now, |_| true, &mut due);
        for task in due.drain(..) {
            self.apply_event(task.payload, context);
        }
        self.due = due;

        let local_target = context
            .registry
            .local_player()
            .filter(|(_, player)| player.is_alive())
            .map(|(actor, _)| actor.position);

        for record in self.peers.values_mut() {
            let Some(actor) = context.registry.find_mut(record.actor) else {
                continue;
            };
            if !actor.is_live_player() {
                continue;
            }
            match &mut record.driver {
                PeerDriver::Scripted(brain) => {
                    let wants_fire = drive_bot(
                        actor,
                        brain,
                        dt,
                        local_target,
                        &self.config,
                        context.rng,
                        context.obstacles,
                        context.zone,
                        context.world.size,
                    );
                    if wants_fire {
                        self.fire_requests.push(record.actor);
                    }
                }
                PeerDriver::Reconciled(reconciliation) => {
                    let factor = (self.config.interpolation_rate * dt).clamp(0.0, 1.0);
                    actor.position = approach(actor.position, reconciliation.target, factor);
                    if let Some(player) = actor.player_mut() {
                        player.facing =
                            approach_angle(player.facing, reconciliation.target_angle, factor);
                    }
                }
            }
        }
    }

    pub(crate) fn apply_event(&mut self, event: PeerEvent, context: &mut SyncContext<'_>) {
        let peer = event.peer();
        let kind = event.label();
        match event {
            PeerEvent::Join {
                name, class, x, y, ..
            } => {
                let position = Vec2::new(x, y);
                if !position.is_finite() {
                    warn!(peer = peer.0, "peer_join_rejected; non-finite position");
                    return;
                }
                let position = clamp_to_world(position, context.world.size);
                if let Some(record) = self.peers.get_mut(&peer) {
                    if let PeerDriver::Reconciled(reconciliation) = &mut record.driver {
                        reconciliation.target = position;
                    }
                    debug!(peer = peer.0, "duplicate_peer_join");
                    return;
                }

                let player = PlayerState::new(name, class, Control::Remote(peer), context.player);
                let actor = context.registry.spawn(position, ActorKind::Player(player));
                self.peers.insert(
                    peer,
                    PeerRecord {
                        actor,
                        driver: PeerDriver::Reconciled(Reconciliation {
                            target: position,
                            target_angle: 0.0,
                            last_seq: None,
                        }),
                    },
                );
                context.events.emit(ArenaEvent::PeerJoined { peer, actor });
                info!(peer = peer.0, class = class.label(), "peer_joined");
            }
            PeerEvent::Move {
                x, y, angle, seq, ..
            } => {
                let target = Vec2::new(x, y);
                if !target.is_finite() || !angle.is_finite() {
                    warn!(peer = peer.0, "peer_move_rejected; non-finite values");
                    return;
                }
                let Some(record) = self.peers.get_mut(&peer) else {
                    drop_stale(context.events, peer, kind);
                    return;
                };
                let PeerDriver::Reconciled(reconciliation) = &mut record.driver else {
                    debug!(peer = peer.0, "scripted_peer_ignores_move");
                    return;
                };
                if let (Some(seq), Some(last)) = (seq, reconciliation.last_seq) {
                    if seq <= last {
                        drop_stale(context.events, peer, kind);
                        return;
                    }
                }
                reconciliation.target = clamp_to_world(target, context.world.size);
                reconciliation.target_angle = angle;
                if seq.is_some() {
                    reconciliation.last_seq = seq;
                }
            }
            PeerEvent::Shoot { x, y, angle, .. } => {
                let origin = Vec2::new(x, y);
                if !origin.is_finite() || !angle.is_finite() {
                    warn!(peer = peer.0, "peer_shot_rejected; non-finite values");
                    return;
                }
                let Some(actor) = self.live_actor(peer, context.registry) else {
                    drop_stale(context.events, peer, kind);
                    return;
                };
                if let Some(player) = context.registry.player_mut(actor) {
                    player.facing = angle;
                    player.muzzle_flash = true;
                }
                context.registry.spawn_with_velocity(
                    origin,
                    Vec2::from_angle(angle) * context.combat.muzzle_speed,
                    ActorKind::Projectile(ProjectileState {
                        owner: actor,
                        damage: 0.0,
                        life: context.combat.projectile_life,
                        lethal: false,
                    }),
                );
                self.mirrored_shots.push(actor);
            }
            PeerEvent::Eliminated { .. } => {
                let Some(actor) = self.live_actor(peer, context.registry) else {
                    drop_stale(context.events, peer, kind);
                    return;
                };
                if let Some(player) = context.registry.player_mut(actor) {
                    player.life = LifeState::Dead;
                    context
                        .events
                        .emit(ArenaEvent::ActorEliminated { actor, by: None });
                }
            }
            PeerEvent::Leave { .. } => {
                let Some(record) = self.peers.remove(&peer) else {
                    drop_stale(context.events, peer, kind);
                    return;
                };
                context.registry.mark_removed(record.actor);
                context.events.emit(ArenaEvent::PeerLeft { peer });
                info!(peer = peer.0, "peer_left");
            }
        }
    }

    fn live_actor(&self, peer: PeerId, registry: &ActorRegistry) -> Option<ActorId> {
        let record = self.peers.get(&peer)?;
        registry
            .find(record.actor)
            .filter(|actor| actor.is_live_player())
            .map(|actor| actor.id)
    }

    pub(crate) fn take_fire_requests(&mut self, out: &mut Vec<ActorId>) {
        out.append(&mut self.fire_requests);
    }

    pub(crate) fn take_mirrored_shots(&mut self, out: &mut Vec<ActorId>) {
        out.append(&mut self.mirrored_shots);
    }

    /// Announces the local actor's movement (throttled) and any shots fired
    /// this tick.
    pub(crate) fn publish_local(
        &mut self,
        dt: f32,
        local: &Actor,
        shots: &[ShotSpec],
        weapon: Option<WeaponKind>,
    ) {
        let Some(room) = self.room_id.clone() else {
            return;
        };
        let facing = local.player().map_or(0.0, |player| player.facing);

        self.send_timer += dt;
        if self.send_timer >= self.config.send_interval {
            self.send_timer = 0.0;
            self.move_seq = self.move_seq.saturating_add(1);
            self.send_action(&ActionEvent::Move {
                room: room.clone(),
                x: local.position.x,
                y: local.position.y,
                angle: facing,
                seq: self.move_seq,
            });
        }
        for shot in shots {
            self.send_action(&ActionEvent::Shoot {
                room: room.clone(),
                x: shot.origin.x,
                y: shot.origin.y,
                angle: shot.angle,
                weapon,
            });
        }
    }

    fn send_action(&mut self, event: &ActionEvent) {
        match encode_action(event) {
            Ok(frame) => self.transport.send(frame),
            Err(error) => warn!(error = %error, "action_encode_failed"),
        }
    }

    pub(crate) fn frames_sent(&self) -> u64 {
        self.transport.frames_sent()
    }
}

fn drop_stale(events: &mut ArenaEventBus, peer: PeerId, kind: &'static str) {
    debug!(peer = peer.0, kind, "stale_peer_event_dropped");
    events.emit(ArenaEvent::StalePeerEventDropped { peer });
}

/// Wander-or-regroup bot: every think interval it either heads for the zone
/// centre (when far out) or picks a random heading. Returns whether it wants
/// to pull the trigger this tick.
#[allow(clippy::too_many_arguments)]
fn drive_bot(
    actor: &mut Actor,
    brain: &mut BotBrain,
    dt: f32,
    local_target: Option<Vec2>,
    config: &PeerConfig,
    rng: &mut ChaCha8Rng,
    obstacles: &[Rect],
    zone: &Zone,
    world_size: f32,
) -> bool {
    if brain.think_timer <= 0.0 {
        let to_zone = zone.center() - actor.position;
        brain.heading = if to_zone.length() > zone.radius() * config.bot_zone_fraction {
            to_zone.angle()
        } else {
            rng.gen::<f32>() * TAU
        };
        brain.think_timer = config.bot_think_interval;
    }
    brain.think_timer -= dt;

    let step = Vec2::from_angle(brain.heading) * (config.bot_speed * dt);
    let moved = resolve_axis_move(obstacles, actor.position, step);
    actor.position = clamp_to_world(moved, world_size);
    let position = actor.position;

    let Some(player) = actor.player_mut() else {
        return false;
    };
    player.facing = brain.heading;

    let Some(target) = local_target else {
        return false;
    };
    let offset = target - position;
    if offset.length() >= config.bot_engage_range {
        return false;
    }
    player.facing = offset.angle();
    rng.gen::<f32>() < config.bot_fire_chance
}

/// Exponential approach: closes `factor` of the remaining gap.
pub(crate) fn approach(current: Vec2, target: Vec2, factor: f32) -> Vec2 {
    current + (target - current) * factor.clamp(0.0, 1.0)
}

/// Same as `approach` but along the shorter arc.
pub(crate) fn approach_angle(current: f32, target: f32, factor: f32) -> f32 {
    let mut delta = (target - current) % TAU;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }
    current + delta * factor.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::app::arena::wire::LoopbackTransport;
    use crate::app::config::{ArenaConfig, ZoneConfig};

    struct Fixture {
        registry: ActorRegistry,
        events: ArenaEventBus,
        rng: ChaCha8Rng,
        zone: Zone,
        config: ArenaConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let config = ArenaConfig::default();
            Self {
                registry: ActorRegistry::default(),
                events: ArenaEventBus::default(),
                rng: ChaCha8Rng::seed_from_u64(21),
                zone: Zone::new(&config.zone),
                config,
            }
        }

        fn context(&mut self) -> SyncContext<'_> {
            SyncContext {
                registry: &mut self.registry,
                events: &mut self.events,
                rng: &mut self.rng,
                obstacles: &[],
                zone: &self.zone,
                world: &self.config.world,
                player: &self.config.player,
                combat: &self.config.combat,
            }
        }
    }

    fn synchronizer() -> PeerSynchronizer {
        let config = PeerConfig {
            initial_bots: 0,
            latency_base: 0.05,
            latency_jitter: 0.1,
            ..PeerConfig::default()
        };
        PeerSynchronizer::new(config, Box::new(LoopbackTransport::default()))
    }

    fn join(peer: u64, x: f32, y: f32) -> PeerEvent {
        PeerEvent::Join {
            peer: PeerId(peer),
            name: "Remote".to_string(),
            class: HeroClass::Scout,
            x,
            y,
        }
    }

    fn actor_position(fixture: &Fixture, sync: &PeerSynchronizer, peer: u64) -> Vec2 {
        let record = sync.record(PeerId(peer)).expect("peer record");
        fixture.registry.find(record.actor).expect("peer actor").position
    }

    #[test]
    fn interpolation_closes_a_tenth_of_the_gap_per_tick() {
        let mut position = Vec2::ZERO;
        let target = Vec2::new(100.0, 0.0);
        position = approach(position, target, 0.1);
        assert!((position.x - 10.0).abs() < 1e-4);
        position = approach(position, target, 0.1);
        assert!((position.x - 19.0).abs() < 1e-4);
        for _ in 0..200 {
            position = approach(position, target, 0.1);
        }
        assert!((position.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn angle_approach_takes_short_arc() {
        let angle = approach_angle(3.0, -3.0, 1.0);
        assert!((angle - (3.0 + (TAU - 6.0))).abs() < 1e-4);
    }

    #[test]
    fn events_apply_only_after_latency() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.connect("ROOM", &mut fixture.context());

        sync.receive(join(40, 100.0, 100.0), 0.0, &mut fixture.rng);
        sync.advance(0.01, 0.01, &mut fixture.context());
        assert_eq!(sync.peer_count(), 0);

        sync.advance(0.2, 0.2, &mut fixture.context());
        assert_eq!(sync.peer_count(), 1);
        assert_eq!(actor_position(&fixture, &sync, 40), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn reconciled_peer_converges_on_latest_move() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.apply_event(join(7, 0.0, 0.0), &mut fixture.context());
        sync.apply_event(
            PeerEvent::Move {
                peer: PeerId(7),
                x: 100.0,
                y: 0.0,
                angle: 1.0,
                seq: Some(1),
            },
            &mut fixture.context(),
        );

        sync.advance(0.01, 0.0, &mut fixture.context());
        assert!((actor_position(&fixture, &sync, 7).x - 10.0).abs() < 1e-3);
        for _ in 0..300 {
            sync.advance(0.01, 0.0, &mut fixture.context());
        }
        assert!((actor_position(&fixture, &sync, 7).x - 100.0).abs() < 1e-2);
    }

    #[test]
    fn dead_reckoning_closes_distance_every_tick_without_overshoot() {
        for rate in [10.0, 5.0] {
            let mut fixture = Fixture::new();
            let mut sync = PeerSynchronizer::new(
                PeerConfig {
                    initial_bots: 0,
                    interpolation_rate: rate,
                    ..PeerConfig::default()
                },
                Box::new(LoopbackTransport::default()),
            );
            sync.apply_event(join(7, 0.0, 0.0), &mut fixture.context());
            sync.apply_event(
                PeerEvent::Move {
                    peer: PeerId(7),
                    x: 100.0,
                    y: 0.0,
                    angle: 0.0,
                    seq: None,
                },
                &mut fixture.context(),
            );

            let target = Vec2::new(100.0, 0.0);
            let mut previous = 100.0_f32;
            for _ in 0..50 {
                sync.advance(0.1, 0.0, &mut fixture.context());
                let position = actor_position(&fixture, &sync, 7);
                let distance = (target - position).length();
                // f32 resolution near the target is about 1e-5.
                assert!(distance < previous || distance < 1e-4);
                assert!(position.x <= 100.0);
                previous = distance;
            }
            assert!(previous < 1e-3);
        }
    }

    #[test]
    fn join_and_move_delivered_together_both_apply() {
        let mut fixture = Fixture::new();
        let mut sync = PeerSynchronizer::new(
            PeerConfig {
                initial_bots: 0,
                latency_jitter: 0.0,
                ..PeerConfig::default()
            },
            Box::new(LoopbackTransport::default()),
        );
        sync.receive(join(9, 0.0, 0.0), 0.0, &mut fixture.rng);
        sync.receive(
            PeerEvent::Move {
                peer: PeerId(9),
                x: 250.0,
                y: 40.0,
                angle: 0.0,
                seq: Some(1),
            },
            0.0,
            &mut fixture.rng,
        );

        sync.advance(0.0, 1.0, &mut fixture.context());
        fixture.events.finish_tick_rollover();
        assert_eq!(fixture.events.last_tick_counts().peers_joined, 1);
        assert_eq!(fixture.events.last_tick_counts().stale_peer_events, 0);
        match sync.record(PeerId(9)).expect("joined peer").driver {
            PeerDriver::Reconciled(reconciliation) => {
                assert_eq!(reconciliation.target, Vec2::new(250.0, 40.0));
            }
            PeerDriver::Scripted(_) => panic!("remote peer must be reconciled"),
        }
    }

    #[test]
    fn older_sequence_numbers_are_dropped() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.apply_event(join(7, 0.0, 0.0), &mut fixture.context());
        let moved = |seq, x| PeerEvent::Move {
            peer: PeerId(7),
            x,
            y: 0.0,
            angle: 0.0,
            seq: Some(seq),
        };
        sync.apply_event(moved(5, 300.0), &mut fixture.context());
        sync.apply_event(moved(4, 50.0), &mut fixture.context());

        match sync.record(PeerId(7)).expect("record").driver {
            PeerDriver::Reconciled(reconciliation) => {
                assert_eq!(reconciliation.target, Vec2::new(300.0, 0.0));
                assert_eq!(reconciliation.last_seq, Some(5));
            }
            other => panic!("unexpected driver: {other:?}"),
        }
        assert!(fixture
            .events
            .iter_emitted_so_far()
            .any(|event| matches!(event, ArenaEvent::StalePeerEventDropped { .. })));
    }

    #[test]
    fn events_for_unknown_or_departed_peers_are_dropped() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.apply_event(join(3, 10.0, 10.0), &mut fixture.context());
        let actor = sync.record(PeerId(3)).expect("record").actor;
        sync.apply_event(PeerEvent::Leave { peer: PeerId(3) }, &mut fixture.context());

        assert!(!fixture.registry.is_live(actor));
        sync.apply_event(
            PeerEvent::Move {
                peer: PeerId(3),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
                seq: None,
            },
            &mut fixture.context(),
        );
        sync.apply_event(PeerEvent::Eliminated { peer: PeerId(99) }, &mut fixture.context());

        let stale = fixture
            .events
            .iter_emitted_so_far()
            .filter(|event| matches!(event, ArenaEvent::StalePeerEventDropped { .. }))
            .count();
        assert_eq!(stale, 2);
        assert_eq!(sync.peer_count(), 0);
    }

    #[test]
    fn remote_shot_spawns_harmless_projectile() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.apply_event(join(2, 500.0, 500.0), &mut fixture.context());
        sync.apply_event(
            PeerEvent::Shoot {
                peer: PeerId(2),
                x: 500.0,
                y: 500.0,
                angle: 0.0,
                weapon: None,
            },
            &mut fixture.context(),
        );

        let projectile = fixture
            .registry
            .actors()
            .iter()
            .find_map(|actor| match actor.kind {
                ActorKind::Projectile(projectile) => Some((actor.velocity, projectile)),
                _ => None,
            })
            .expect("mirrored projectile");
        assert!(!projectile.1.lethal);
        assert_eq!(projectile.0, Vec2::new(2000.0, 0.0));

        let mut mirrored = Vec::new();
        sync.take_mirrored_shots(&mut mirrored);
        assert_eq!(mirrored.len(), 1);
    }

    #[test]
    fn elimination_event_marks_peer_dead_once() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.apply_event(join(2, 0.0, 0.0), &mut fixture.context());
        sync.apply_event(PeerEvent::Eliminated { peer: PeerId(2) }, &mut fixture.context());
        sync.apply_event(PeerEvent::Eliminated { peer: PeerId(2) }, &mut fixture.context());

        let eliminated = fixture
            .events
            .iter_emitted_so_far()
            .filter(|event| matches!(event, ArenaEvent::ActorEliminated { .. }))
            .count();
        assert_eq!(eliminated, 1);
    }

    #[test]
    fn scripted_bots_ignore_move_events_and_wander() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.spawn_bots(1, &mut fixture.context());
        let peer = PeerId(1);
        let start = actor_position(&fixture, &sync, 1);

        sync.apply_event(
            PeerEvent::Move {
                peer,
                x: 0.0,
                y: 0.0,
                angle: 0.0,
                seq: Some(1),
            },
            &mut fixture.context(),
        );
        assert!(matches!(
            sync.record(peer).expect("bot").driver,
            PeerDriver::Scripted(_)
        ));

        sync.advance(0.1, 0.0, &mut fixture.context());
        assert_ne!(actor_position(&fixture, &sync, 1), start);
    }

    #[test]
    fn bot_far_outside_zone_heads_for_centre() {
        let mut fixture = Fixture::new();
        fixture.zone = Zone::new(&ZoneConfig {
            radius: 500.0,
            ..ZoneConfig::default()
        });
        let mut sync = synchronizer();
        sync.spawn_bots(1, &mut fixture.context());
        let actor = sync.record(PeerId(1)).expect("bot").actor;
        fixture.registry.find_mut(actor).expect("bot").position = Vec2::new(100.0, 2000.0);

        sync.advance(0.1, 0.0, &mut fixture.context());
        let position = fixture.registry.find(actor).expect("bot").position;
        assert!((position.x - 118.0).abs() < 1e-2);
        assert!((position.y - 2000.0).abs() < 1e-2);
    }

    #[test]
    fn bot_in_range_aims_at_local_player() {
        let mut fixture = Fixture::new();
        let mut sync = PeerSynchronizer::new(
            PeerConfig {
                bot_fire_chance: 1.0,
                ..PeerConfig::default()
            },
            Box::new(LoopbackTransport::default()),
        );
        let local = PlayerState::new(
            "Survivor",
            HeroClass::Assault,
            Control::Local,
            &fixture.config.player,
        );
        fixture
            .registry
            .spawn_local_player(Vec2::new(2000.0, 2300.0), local);
        sync.spawn_bots(1, &mut fixture.context());
        let bot = sync.record(PeerId(1)).expect("bot").actor;
        fixture.registry.find_mut(bot).expect("bot").position = Vec2::new(2000.0, 2000.0);

        sync.advance(0.0, 0.0, &mut fixture.context());
        let mut requests = Vec::new();
        sync.take_fire_requests(&mut requests);
        assert_eq!(requests, vec![bot]);

        let facing = fixture
            .registry
            .find(bot)
            .and_then(|actor| actor.player())
            .expect("bot")
            .facing;
        assert!((facing - PI / 2.0).abs() < 1e-3);
    }

    #[test]
    fn wave_respects_player_cap() {
        let mut fixture = Fixture::new();
        let mut sync = PeerSynchronizer::new(
            PeerConfig {
                initial_bots: 3,
                max_players: 3,
                ..PeerConfig::default()
            },
            Box::new(LoopbackTransport::default()),
        );
        assert_eq!(sync.connect("ROOM", &mut fixture.context()), 3);
        assert_eq!(sync.spawn_wave(&mut fixture.context()), 0);

        let first = sync.record(PeerId(1)).expect("bot").actor;
        if let Some(player) = fixture.registry.player_mut(first) {
            player.life = LifeState::Dead;
        }
        assert_eq!(sync.spawn_wave(&mut fixture.context()), 1);
        assert_eq!(sync.peer_count(), 4);
    }

    #[test]
    fn disconnect_drops_pending_deliveries() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.connect("ROOM", &mut fixture.context());
        sync.receive(join(5, 0.0, 0.0), 0.0, &mut fixture.rng);
        sync.receive(PeerEvent::Leave { peer: PeerId(5) }, 0.0, &mut fixture.rng);
        assert_eq!(sync.pending_deliveries(), 2);

        assert_eq!(sync.disconnect(), 2);
        assert_eq!(sync.room_id(), None);
        sync.advance(0.1, 10.0, &mut fixture.context());
        assert_eq!(sync.peer_count(), 0);
    }

    #[test]
    fn raw_frames_are_decoded_before_queueing() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.receive_raw(
            r#"{"type":"join","peer":8,"name":"Echo","class":"tank","x":5,"y":6}"#,
            0.0,
            &mut fixture.rng,
        )
        .expect("valid frame");
        assert!(sync.receive_raw("{not json", 0.0, &mut fixture.rng).is_err());
        assert_eq!(sync.pending_deliveries(), 1);
    }

    #[test]
    fn transport_frames_are_polled_during_advance() {
        let mut fixture = Fixture::new();
        let transport = LoopbackTransport::with_incoming([
            r#"{"type":"join","peer":12,"name":"Zero","class":"scout","x":40,"y":50}"#.to_string(),
            "garbage".to_string(),
        ]);
        let mut sync = PeerSynchronizer::new(
            PeerConfig {
                initial_bots: 0,
                ..PeerConfig::default()
            },
            Box::new(transport),
        );
        sync.connect("ROOM", &mut fixture.context());

        sync.advance(0.016, 0.0, &mut fixture.context());
        assert_eq!(sync.pending_deliveries(), 1);
        assert_eq!(sync.peer_count(), 0);

        sync.advance(0.016, 1.0, &mut fixture.context());
        assert_eq!(sync.pending_deliveries(), 0);
        assert_eq!(sync.peer_count(), 1);
    }

    #[test]
    fn local_actions_are_throttled_and_sequenced() {
        let mut fixture = Fixture::new();
        let mut sync = synchronizer();
        sync.connect("ROOM", &mut fixture.context());
        let local = PlayerState::new(
            "Survivor",
            HeroClass::Assault,
            Control::Local,
            &fixture.config.player,
        );
        let id = fixture.registry.spawn_local_player(Vec2::new(1.0, 2.0), local);
        let actor = fixture.registry.find(id).expect("local").clone();

        sync.publish_local(0.02, &actor, &[], None);
        assert_eq!(sync.frames_sent(), 0);
        sync.publish_local(0.04, &actor, &[], None);
        assert_eq!(sync.frames_sent(), 1);

        let shot = ShotSpec {
            origin: Vec2::new(1.0, 2.0),
            angle: 0.5,
            speed: 2000.0,
            damage: 20.0,
        };
        sync.publish_local(0.0, &actor, &[shot, shot], Some(WeaponKind::M416));
        assert_eq!(sync.frames_sent(), 3);
    }
}
