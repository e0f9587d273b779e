use std::collections::{HashMap, VecDeque};
use std::mem;
use std::time::{SystemTime, UNIX_EPOCH};

use arena_engine::{
    screen_to_world, Camera2D, DrawSurface, InputAction, InputSnapshot, Vec2, Viewport,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::actor::{ActorId, ActorKind, Control, HeroClass, PlayerState, ProjectileState};
use super::collision::Rect;
use super::combat::{self, ProjectileImpact, ShotSpec};
use super::compositor::{DepthCompositor, FrameView};
use super::effects::{spawn_effect, Effect};
use super::events::{ArenaEvent, ArenaEventBus};
use super::map::{generate_map, pick_spawn_point};
use super::peers::{approach, PeerSynchronizer, SyncContext};
use super::registry::{ActorRegistry, UpdateContext};
use super::scheduler::{DueTask, TaskId, TaskScheduler, TaskTarget};
use super::wire::PeerTransport;
use super::zone::{Zone, ZonePhase};
use crate::app::config::{ArenaConfig, SessionConfig};

const CAMERA_FOLLOW_RATE: f32 = 6.0;
const SHAKE_DECAY_RATE: f32 = 6.3;
const SHAKE_EPSILON: f32 = 0.05;
const MUZZLE_OFFSET: f32 = 35.0;
const KILL_FEED_LEN: usize = 4;
const DEFAULT_PLAYER_NAME: &str = "Survivor";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocalActorSpec {
    pub(crate) name: String,
    pub(crate) class: HeroClass,
    pub(crate) spawn: Option<Vec2>,
}

impl LocalActorSpec {
    pub(crate) fn from_config(session: &SessionConfig) -> Self {
        Self {
            name: session.player_name.clone(),
            class: session.hero_class,
            spawn: None,
        }
    }
}

/// What the local player asked for this tick, derived from the input snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LocalIntent {
    pub(crate) move_dir: Vec2,
    pub(crate) aim_angle: Option<f32>,
    pub(crate) fire: bool,
    pub(crate) interact: bool,
    pub(crate) switch_slot: Option<usize>,
    pub(crate) reload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionTask {
    SpawnBotWave,
    ClearMuzzleFlash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickPhase {
    LocalInput,
    PeerSync,
    UpdateActors,
    Combat,
    Zone,
    Compaction,
}

pub(crate) const TICK_PHASE_ORDER: [TickPhase; 6] = [
    TickPhase::LocalInput,
    TickPhase::PeerSync,
    TickPhase::UpdateActors,
    TickPhase::Combat,
    TickPhase::Zone,
    TickPhase::Compaction,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionOutcome {
    Active,
    Eliminated,
}

pub(crate) fn resolve_seed(config: &SessionConfig) -> u64 {
    config.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default()
    })
}

/// Shared simulation state handed to systems as disjoint borrows.
struct ArenaWorld {
    config: ArenaConfig,
    registry: ActorRegistry,
    obstacles: Vec<Rect>,
    zone: Zone,
    rng: ChaCha8Rng,
    events: ArenaEventBus,
}

impl ArenaWorld {
    fn sync_context(&mut self) -> SyncContext<'_> {
        SyncContext {
            registry: &mut self.registry,
            events: &mut self.events,
            rng: &mut self.rng,
            obstacles: &self.obstacles,
            zone: &self.zone,
            world: &self.config.world,
            player: &self.config.player,
            combat: &self.config.combat,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CameraRig {
    focus: Vec2,
    shake: f32,
    shake_offset: Vec2,
}

impl CameraRig {
    fn camera(&self) -> Camera2D {
        Camera2D {
            position: self.focus + self.shake_offset,
            ..Camera2D::default()
        }
    }
}

/// One deployment into a room: owns every actor, the zone, the peer link and
/// all deferred work. Ending the session cancels everything it scheduled.
pub(crate) struct Session {
    world: ArenaWorld,
    peers: PeerSynchronizer,
    scheduler: TaskScheduler<SessionTask>,
    flash_tasks: HashMap<ActorId, TaskId>,
    camera: CameraRig,
    cosmetic_rng: ChaCha8Rng,
    compositor: DepthCompositor,
    intent: LocalIntent,
    room_id: String,
    seed: u64,
    clock: f64,
    outcome: SessionOutcome,
    ended: bool,
    kill_feed: VecDeque<String>,
    last_tick_order: Vec<TickPhase>,
    shot_scratch: Vec<ShotSpec>,
    local_shots: Vec<ShotSpec>,
    actor_scratch: Vec<ActorId>,
    impact_scratch: Vec<ProjectileImpact>,
    due_scratch: Vec<DueTask<SessionTask>>,
}

impl Session {
    pub(crate) fn start(
        config: ArenaConfig,
        spec: LocalActorSpec,
        room_id: &str,
        transport: Box<dyn PeerTransport>,
    ) -> Self {
        let config = config.sanitized();
        let seed = resolve_seed(&config.session);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cosmetic_rng = ChaCha8Rng::seed_from_u64(seed.rotate_left(17) ^ 0x5eed);

        let mut registry = ActorRegistry::default();
        generate_map(&mut registry, &mut rng, &config.world);
        let mut obstacles = Vec::new();
        registry.collect_obstacles(&mut obstacles);

        let spawn = spec
            .spawn
            .filter(|position| position.is_finite())
            .unwrap_or_else(|| {
                pick_spawn_point(
                    &mut rng,
                    &obstacles,
                    config.world.size,
                    config.player.spawn_margin,
                )
            });
        let name = match spec.name.trim() {
            "" => DEFAULT_PLAYER_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        let local = PlayerState::new(name.as_str(), spec.class, Control::Local, &config.player)
            .with_loadout(config.player.reserve_magazines);
        registry.spawn_local_player(spawn, local);

        let zone = Zone::new(&config.zone);
        let peers = PeerSynchronizer::new(config.peers.clone(), transport);
        let spawn_interval = f64::from(config.peers.spawn_interval);

        let mut session = Self {
            world: ArenaWorld {
                config,
                registry,
                obstacles,
                zone,
                rng,
                events: ArenaEventBus::default(),
            },
            peers,
            scheduler: TaskScheduler::default(),
            flash_tasks: HashMap::new(),
            camera: CameraRig {
                focus: spawn,
                shake: 0.0,
                shake_offset: Vec2::ZERO,
            },
            cosmetic_rng,
            compositor: DepthCompositor::default(),
            intent: LocalIntent::default(),
            room_id: room_id.to_string(),
            seed,
            clock: 0.0,
            outcome: SessionOutcome::Active,
            ended: false,
            kill_feed: VecDeque::new(),
            last_tick_order: Vec::with_capacity(TICK_PHASE_ORDER.len()),
            shot_scratch: Vec::new(),
            local_shots: Vec::new(),
            actor_scratch: Vec::new(),
            impact_scratch: Vec::new(),
            due_scratch: Vec::new(),
        };

        session
            .peers
            .connect(room_id, &mut session.world.sync_context());
        session.scheduler.schedule_every(
            spawn_interval,
            spawn_interval,
            TaskTarget::None,
            SessionTask::SpawnBotWave,
        );

        info!(
            room_id,
            seed,
            name = name.as_str(),
            class = spec.class.label(),
            actors = session.world.registry.len(),
            "session_started"
        );
        session
    }

    pub(crate) fn update(&mut self, dt: f32, input: &InputSnapshot, viewport: Viewport) {
        if self.ended {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += f64::from(dt);

        self.last_tick_order.clear();
        for phase in TICK_PHASE_ORDER {
            self.last_tick_order.push(phase);
            match phase {
                TickPhase::LocalInput => self.apply_local_input(input, viewport),
                TickPhase::PeerSync => self.sync_peers(dt),
                TickPhase::UpdateActors => self.update_actors(dt),
                TickPhase::Combat => self.resolve_combat(dt),
                TickPhase::Zone => self.apply_zone(dt),
                TickPhase::Compaction => self.compact(),
            }
        }
        self.world.events.finish_tick_rollover();
        self.update_camera(dt);
    }

    pub(crate) fn render(&mut self, surface: &mut dyn DrawSurface) {
        let view = FrameView {
            registry: &self.world.registry,
            zone: &self.world.zone,
            world: &self.world.config.world,
            camera: self.camera.camera(),
            time: self.clock,
        };
        self.compositor.render(&view, surface);
    }

    /// Cancels every pending task and disconnects from the room. Returns how
    /// many scheduled tasks were dropped.
    pub(crate) fn end(&mut self) -> usize {
        if self.ended {
            return 0;
        }
        self.ended = true;
        let cancelled = self.scheduler.cancel_all();
        self.flash_tasks.clear();
        let peers = self.peers.peer_count();
        let dropped_deliveries = self.peers.disconnect();
        info!(
            room_id = self.room_id.as_str(),
            peers,
            cancelled_tasks = cancelled,
            dropped_deliveries,
            elapsed_seconds = self.clock,
            "session_ended"
        );
        cancelled
    }

    fn apply_local_input(&mut self, input: &InputSnapshot, viewport: Viewport) {
        self.intent = LocalIntent::default();
        let Some((actor, player)) = self.world.registry.local_player() else {
            return;
        };
        if !player.is_alive() {
            return;
        }
        let local_id = actor.id;
        let position = actor.position;

        let axis = |negative, positive| {
            f32::from(u8::from(input.is_down(positive))) - f32::from(u8::from(input.is_down(negative)))
        };
        let aim_angle = input.cursor_position_px().and_then(|cursor| {
            let target = screen_to_world(cursor, &self.camera.camera(), viewport);
            let offset = target - position;
            (offset.length_squared() > f32::EPSILON).then(|| offset.angle())
        });
        let switch_slot = if input.was_pressed(InputAction::SlotOne) {
            Some(0)
        } else if input.was_pressed(InputAction::SlotTwo) {
            Some(1)
        } else {
            None
        };

        self.intent = LocalIntent {
            move_dir: Vec2::new(
                axis(InputAction::MoveLeft, InputAction::MoveRight),
                axis(InputAction::MoveUp, InputAction::MoveDown),
            ),
            aim_angle,
            fire: input.is_down(InputAction::Fire) || input.was_pressed(InputAction::Fire),
            interact: input.was_pressed(InputAction::Interact),
            switch_slot,
            reload: input.was_pressed(InputAction::Reload),
        };

        let reload_time = self.world.config.combat.reload_time;
        let Some(player) = self.world.registry.player_mut(local_id) else {
            return;
        };
        if let Some(slot) = switch_slot {
            if combat::switch_slot(player, slot) {
                debug!(slot, "weapon_slot_switched");
            }
        }
        if self.intent.reload && combat::try_reload(player, reload_time) {
            debug!(slot = player.active_slot, "weapon_reloaded");
        }
    }

    fn sync_peers(&mut self, dt: f32) {
        self.run_due_tasks();
        self.peers
            .advance(dt, self.clock, &mut self.world.sync_context());
    }

    fn run_due_tasks(&mut self) {
        let mut due = mem::take(&mut self.due_scratch);
        due.clear();
        let registry = &self.world.registry;
        self.scheduler.drain_due(
            self.clock,
            |target| match target {
                TaskTarget::None => true,
                TaskTarget::Actor(actor) => registry.is_live(actor),
            },
            &mut due,
        );

        for task in due.drain(..) {
            match (task.payload, task.target) {
                (SessionTask::SpawnBotWave, _) => {
                    let spawned = self.peers.spawn_wave(&mut self.world.sync_context());
                    if spawned > 0 {
                        debug!(
                            alive = self.world.registry.alive_player_count(),
                            "bot_wave_spawned"
                        );
                    }
                }
                (SessionTask::ClearMuzzleFlash, TaskTarget::Actor(actor)) => {
                    self.flash_tasks.remove(&actor);
                    if let Some(player) = self.world.registry.player_mut(actor) {
                        player.muzzle_flash = false;
                    }
                }
                (SessionTask::ClearMuzzleFlash, _) => {}
            }
        }
        self.due_scratch = due;
    }

    fn update_actors(&mut self, dt: f32) {
        let context = UpdateContext {
            intent: &self.intent,
            obstacles: &self.world.obstacles,
            world_size: self.world.config.world.size,
            friction_rate: self.world.config.player.friction_rate,
        };
        self.world.registry.update_all(dt, &context);
    }

    fn resolve_combat(&mut self, dt: f32) {
        let local = self.world.registry.local_player_id();

        if let (true, Some(actor)) = (self.intent.interact, local) {
            if let Some(loot) = combat::try_interact(
                &mut self.world.registry,
                actor,
                &self.world.config.player,
                &mut self.world.events,
            ) {
                info!(loot = loot.label(), "loot_picked_up");
            }
        }

        self.local_shots.clear();
        if let (true, Some(actor)) = (self.intent.fire, local) {
            self.fire_from(actor, true);
        }

        let mut shooters = mem::take(&mut self.actor_scratch);
        shooters.clear();
        self.peers.take_fire_requests(&mut shooters);
        for &shooter in &shooters {
            self.fire_from(shooter, false);
        }

        shooters.clear();
        self.peers.take_mirrored_shots(&mut shooters);
        for &shooter in &shooters {
            self.schedule_flash_clear(shooter);
            if let Some(origin) = self.muzzle_position(shooter) {
                spawn_effect(
                    &mut self.world.registry,
                    &mut self.world.rng,
                    Effect::MuzzleSparks,
                    origin,
                );
            }
        }
        self.actor_scratch = shooters;

        let mut impacts = mem::take(&mut self.impact_scratch);
        impacts.clear();
        combat::resolve_projectile_hits(
            &mut self.world.registry,
            &self.world.obstacles,
            self.world.config.player.body_radius,
            &mut self.world.events,
            &mut impacts,
        );
        for impact in &impacts {
            spawn_effect(
                &mut self.world.registry,
                &mut self.world.rng,
                Effect::Impact,
                impact.position(),
            );
        }
        self.impact_scratch = impacts;

        if let Some(actor) = local.and_then(|id| self.world.registry.find(id)) {
            let weapon = actor
                .player()
                .and_then(|player| player.active_weapon())
                .map(|weapon| weapon.kind);
            self.peers
                .publish_local(dt, actor, &self.local_shots, weapon);
        }
    }

    fn muzzle_position(&self, shooter: ActorId) -> Option<Vec2> {
        let actor = self.world.registry.find(shooter)?;
        let facing = actor.player()?.facing;
        Some(actor.position + Vec2::from_angle(facing) * MUZZLE_OFFSET)
    }

    fn fire_from(&mut self, shooter: ActorId, is_local: bool) {
        let Some(actor) = self.world.registry.find_mut(shooter) else {
            return;
        };
        let origin = actor.position;
        let Some(player) = actor.player_mut() else {
            return;
        };

        let magazine_fed = player.active_weapon().is_some();
        let mut shots = mem::take(&mut self.shot_scratch);
        shots.clear();
        let fired = combat::try_fire(
            player,
            origin,
            &self.world.config.combat,
            &mut self.world.rng,
            &mut shots,
        );
        if fired > 0 {
            let life = self.world.config.combat.projectile_life;
            for shot in &shots {
                self.world.registry.spawn_with_velocity(
                    shot.origin,
                    Vec2::from_angle(shot.angle) * shot.speed,
                    ActorKind::Projectile(ProjectileState {
                        owner: shooter,
                        damage: shot.damage,
                        life,
                        lethal: true,
                    }),
                );
            }
            self.world.events.emit(ArenaEvent::ShotFired {
                shooter,
                projectiles: fired,
            });
            if let Some(muzzle) = self.muzzle_position(shooter) {
                spawn_effect(
                    &mut self.world.registry,
                    &mut self.world.rng,
                    Effect::MuzzleSparks,
                    muzzle,
                );
            }
            self.schedule_flash_clear(shooter);
            if is_local {
                if magazine_fed {
                    self.camera.shake =
                        self.camera.shake.max(self.world.config.combat.shake_per_shot);
                }
                self.local_shots.extend(shots.iter().copied());
            }
        }
        self.shot_scratch = shots;
    }

    /// Re-arms the flash timer so rapid fire keeps the flash lit until the
    /// last shot's timer runs out.
    fn schedule_flash_clear(&mut self, actor: ActorId) {
        if let Some(previous) = self.flash_tasks.remove(&actor) {
            self.scheduler.cancel(previous);
        }
        let due = self.clock + f64::from(self.world.config.combat.muzzle_flash_seconds);
        let task = self.scheduler.schedule_at(
            due,
            TaskTarget::Actor(actor),
            SessionTask::ClearMuzzleFlash,
        );
        self.flash_tasks.insert(actor, task);
    }

    fn apply_zone(&mut self, dt: f32) {
        if let Some(phase) = self.world.zone.tick(dt) {
            self.world.events.emit(ArenaEvent::ZonePhaseChanged { phase });
            info!(
                phase = phase.label(),
                radius = self.world.zone.radius(),
                "zone_phase_changed"
            );
        }

        let Some(local) = self.world.registry.local_player_id() else {
            return;
        };
        let Some(position) = self.world.registry.find(local).map(|actor| actor.position) else {
            return;
        };
        let damage = self.world.zone.damage_for(position, dt);
        if damage <= 0.0 {
            return;
        }
        if let Some(player) = self.world.registry.player_mut(local) {
            let outcome = combat::apply_damage(player, damage);
            combat::emit_damage_events(&mut self.world.events, local, outcome, None);
        }
    }

    fn compact(&mut self) {
        self.resolve_eliminations();
        let removed = self.world.registry.compact();
        if removed > 0 {
            debug!(removed, remaining = self.world.registry.len(), "actors_compacted");
            self.prune_flash_tasks();
        }
    }

    /// Drops flash timers of actors that left the registry without being
    /// eliminated, such as departed peers.
    fn prune_flash_tasks(&mut self) {
        let registry = &self.world.registry;
        let scheduler = &mut self.scheduler;
        self.flash_tasks.retain(|&actor, &mut task| {
            let live = registry.is_live(actor);
            if !live {
                scheduler.cancel(task);
            }
            live
        });
    }

    fn resolve_eliminations(&mut self) {
        let eliminated: Vec<(ActorId, Option<ActorId>)> = self
            .world
            .events
            .iter_emitted_so_far()
            .filter_map(|event| match *event {
                ArenaEvent::ActorEliminated { actor, by } => Some((actor, by)),
                _ => None,
            })
            .collect();

        for (actor, by) in eliminated {
            let Some(found) = self.world.registry.find(actor) else {
                continue;
            };
            let position = found.position;
            let Some(player) = found.player() else {
                continue;
            };
            let name = player.name.clone();
            let is_local = player.is_local();
            let peer = player.peer_id().map(|peer| peer.0);

            if let Some(task) = self.flash_tasks.remove(&actor) {
                self.scheduler.cancel(task);
            }
            if let Some(player) = self.world.registry.player_mut(actor) {
                player.muzzle_flash = false;
            }
            spawn_effect(
                &mut self.world.registry,
                &mut self.world.rng,
                Effect::DeathBurst,
                position,
            );

            let by_name = by
                .and_then(|id| self.world.registry.find(id))
                .and_then(|attacker| attacker.player())
                .map(|attacker| attacker.name.clone());
            if is_local {
                self.outcome = SessionOutcome::Eliminated;
                info!(
                    by = by_name.as_deref().unwrap_or("zone"),
                    survived_seconds = self.clock,
                    "local_player_eliminated"
                );
            } else {
                info!(
                    name = name.as_str(),
                    peer,
                    by = by_name.as_deref().unwrap_or("unknown"),
                    "actor_eliminated"
                );
                if self.kill_feed.len() == KILL_FEED_LEN {
                    self.kill_feed.pop_back();
                }
                self.kill_feed.push_front(format!("{name} ELIMINATED"));
            }
        }
    }

    fn update_camera(&mut self, dt: f32) {
        if let Some((actor, _)) = self.world.registry.local_player() {
            let factor = CAMERA_FOLLOW_RATE * dt;
            self.camera.focus = approach(self.camera.focus, actor.position, factor);
        }
        self.camera.shake *= (-SHAKE_DECAY_RATE * dt).exp();
        if self.camera.shake < SHAKE_EPSILON {
            self.camera.shake = 0.0;
        }
        let shake = self.camera.shake;
        self.camera.shake_offset = Vec2::new(
            (self.cosmetic_rng.gen::<f32>() - 0.5) * shake,
            (self.cosmetic_rng.gen::<f32>() - 0.5) * shake,
        );
    }

    /// Compact one-line HUD for the window title.
    pub(crate) fn status_line(&self) -> String {
        let sector: String = self.room_id.chars().take(8).collect();
        let alive = self.world.registry.alive_player_count();
        let zone = match self.world.zone.phase() {
            ZonePhase::Countdown => {
                let remaining = self.world.zone.countdown().ceil() as u32;
                format!("ZONE {}:{:02}", remaining / 60, remaining % 60)
            }
            ZonePhase::Shrinking => "ZONE SHRINKING".to_string(),
            ZonePhase::Contracted => "ZONE CLOSED".to_string(),
        };

        let vitals = match self.world.registry.local_player() {
            Some((_, player)) if player.is_alive() => {
                let weapon = match player.active_weapon() {
                    Some(weapon) => {
                        format!("{} {}/{}", weapon.kind.label(), weapon.ammo, weapon.reserve)
                    }
                    None => "PISTOL".to_string(),
                };
                format!(
                    "HP {:.0} SH {:.0} | {weapon}",
                    player.health.max(0.0),
                    player.shield
                )
            }
            _ => "ELIMINATED".to_string(),
        };

        let mut line = format!("SECTOR {sector} | {vitals} | ALIVE {alive} | {zone}");
        if let Some(latest) = self.kill_feed.front() {
            line.push_str(" | ");
            line.push_str(latest);
        }
        line
    }

    pub(crate) fn registry(&self) -> &ActorRegistry {
        &self.world.registry
    }

    pub(crate) fn zone(&self) -> &Zone {
        &self.world.zone
    }

    pub(crate) fn local_player_id(&self) -> Option<ActorId> {
        self.world.registry.local_player_id()
    }

    pub(crate) fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    pub(crate) fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn room_id(&self) -> &str {
        &self.room_id
    }

    pub(crate) fn last_tick_order(&self) -> &[TickPhase] {
        &self.last_tick_order
    }

    #[cfg(test)]
    pub(crate) fn last_tick_event_counts(&self) -> super::events::ArenaEventCounts {
        self.world.events.last_tick_counts()
    }

    #[cfg(test)]
    pub(crate) fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    pub(crate) fn peers(&self) -> &PeerSynchronizer {
        &self.peers
    }
}
