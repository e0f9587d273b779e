use std::collections::HashMap;

use arena_engine::Vec2;

use super::actor::{
    Actor, ActorId, ActorKind, ActorTag, ParticleState, PlayerState, ProjectileState,
};
use super::collision::{clamp_to_world, resolve_axis_move, Rect};
use super::session::LocalIntent;

const PARTICLE_GRAVITY: f32 = 600.0;
const PARTICLE_LANDING_DAMPING: f32 = 0.4;
const PARTICLE_GROUND_FRICTION: f32 = 4.0;
const GLIDE_STOP_SPEED: f32 = 1.0;

#[derive(Debug, Default)]
struct ActorIdAllocator {
    next: u64,
}

impl ActorIdAllocator {
    fn allocate(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Inputs shared by every per-kind update routine for one tick.
pub(crate) struct UpdateContext<'a> {
    pub(crate) intent: &'a LocalIntent,
    pub(crate) obstacles: &'a [Rect],
    pub(crate) world_size: f32,
    pub(crate) friction_rate: f32,
}

/// Flat, insertion-ordered actor list. Removal is deferred: actors are flagged
/// during the tick and dropped together by `compact`, so iteration within a tick
/// never observes a shifting list.
#[derive(Debug, Default)]
pub(crate) struct ActorRegistry {
    actors: Vec<Actor>,
    index_by_id: HashMap<ActorId, usize>,
    allocator: ActorIdAllocator,
    local_player: Option<ActorId>,
}

impl ActorRegistry {
    pub(crate) fn spawn(&mut self, position: Vec2, kind: ActorKind) -> ActorId {
        self.spawn_with_velocity(position, Vec2::ZERO, kind)
    }

    pub(crate) fn spawn_with_velocity(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        kind: ActorKind,
    ) -> ActorId {
        let id = self.allocator.allocate();
        self.index_by_id.insert(id, self.actors.len());
        self.actors.push(Actor {
            id,
            position,
            elevation: 0.0,
            velocity,
            removed: false,
            kind,
        });
        id
    }

    pub(crate) fn spawn_local_player(&mut self, position: Vec2, player: PlayerState) -> ActorId {
        let id = self.spawn(position, ActorKind::Player(player));
        self.local_player = Some(id);
        id
    }

    pub(crate) fn spawn_particle(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        elevation: f32,
        particle: ParticleState,
    ) -> ActorId {
        let id = self.spawn_with_velocity(position, velocity, ActorKind::Particle(particle));
        if let Some(actor) = self.find_mut(id) {
            actor.elevation = elevation.max(0.0);
        }
        id
    }

    pub(crate) fn local_player_id(&self) -> Option<ActorId> {
        self.local_player
    }

    pub(crate) fn local_player(&self) -> Option<(&Actor, &PlayerState)> {
        let actor = self.find(self.local_player?)?;
        actor.player().map(|player| (actor, player))
    }

    /// Removed actors stay addressable until the next `compact`.
    pub(crate) fn find(&self, id: ActorId) -> Option<&Actor> {
        let index = *self.index_by_id.get(&id)?;
        self.actors.get(index)
    }

    pub(crate) fn find_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        let index = *self.index_by_id.get(&id)?;
        self.actors.get_mut(index)
    }

    pub(crate) fn player_mut(&mut self, id: ActorId) -> Option<&mut PlayerState> {
        self.find_mut(id)
            .filter(|actor| !actor.removed)
            .and_then(Actor::player_mut)
    }

    pub(crate) fn is_live(&self, id: ActorId) -> bool {
        self.find(id).is_some_and(|actor| !actor.removed)
    }

    pub(crate) fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub(crate) fn len(&self) -> usize {
        self.actors.len()
    }

    /// Returns `false` when the id is unknown or already flagged.
    pub(crate) fn mark_removed(&mut self, id: ActorId) -> bool {
        match self.find_mut(id) {
            Some(actor) if !actor.removed => {
                actor.removed = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn alive_player_count(&self) -> usize {
        self.actors
            .iter()
            .filter(|actor| actor.is_live_player())
            .count()
    }

    pub(crate) fn collect_obstacles(&self, out: &mut Vec<Rect>) {
        out.clear();
        out.extend(self.actors.iter().filter_map(|actor| match &actor.kind {
            ActorKind::Static(object) if !actor.removed => Some(object.footprint(actor.position)),
            _ => None,
        }));
    }

    /// Nearest live world item strictly closer than `radius`.
    pub(crate) fn nearest_item_within(&self, point: Vec2, radius: f32) -> Option<ActorId> {
        let mut nearest: Option<(ActorId, f32)> = None;
        for actor in &self.actors {
            if actor.removed || !matches!(actor.kind, ActorKind::Item(_)) {
                continue;
            }
            let distance = actor.position.distance(point);
            if distance >= radius {
                continue;
            }
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((actor.id, distance));
            }
        }
        nearest.map(|(id, _)| id)
    }

    /// Drops flagged actors, preserving insertion order of the survivors.
    pub(crate) fn compact(&mut self) -> usize {
        let before = self.actors.len();
        self.actors.retain(|actor| !actor.removed);
        let removed = before - self.actors.len();
        if removed > 0 {
            self.index_by_id.clear();
            for (index, actor) in self.actors.iter().enumerate() {
                self.index_by_id.insert(actor.id, index);
            }
            if let Some(local) = self.local_player {
                if !self.index_by_id.contains_key(&local) {
                    self.local_player = None;
                }
            }
        }
        removed
    }

    /// Runs each actor's per-kind update. Remote players are moved by the peer
    /// synchronizer before this runs, so here they only tick weapon timers.
    pub(crate) fn update_all(&mut self, dt: f32, context: &UpdateContext<'_>) {
        for actor in &mut self.actors {
            if actor.removed {
                continue;
            }
            match actor.tag() {
                ActorTag::LocalPlayer => update_local_player(actor, dt, context),
                ActorTag::RemotePlayer => update_remote_player(actor, dt),
                ActorTag::Projectile => update_projectile(actor, dt),
                ActorTag::Particle => update_particle(actor, dt),
                ActorTag::StaticObject | ActorTag::WorldItem => {}
            }
        }
    }
}

fn update_local_player(actor: &mut Actor, dt: f32, context: &UpdateContext<'_>) {
    let ActorKind::Player(player) = &mut actor.kind else {
        return;
    };
    if !player.is_alive() {
        actor.velocity = Vec2::ZERO;
        return;
    }

    player.tick_cooldowns(dt);
    if let Some(angle) = context.intent.aim_angle {
        player.facing = angle;
    }

    let direction = context.intent.move_dir.normalize_or_zero();
    if direction != Vec2::ZERO {
        actor.velocity = direction * player.move_speed;
    } else {
        actor.velocity = actor.velocity * (-context.friction_rate * dt).exp();
        if actor.velocity.length() < GLIDE_STOP_SPEED {
            actor.velocity = Vec2::ZERO;
        }
    }

    let moved = resolve_axis_move(context.obstacles, actor.position, actor.velocity * dt);
    actor.position = clamp_to_world(moved, context.world_size);
}

fn update_remote_player(actor: &mut Actor, dt: f32) {
    if let ActorKind::Player(player) = &mut actor.kind {
        if player.is_alive() {
            player.tick_cooldowns(dt);
        }
    }
}

fn update_projectile(actor: &mut Actor, dt: f32) {
    let ActorKind::Projectile(ProjectileState { life, .. }) = &mut actor.kind else {
        return;
    };
    actor.position += actor.velocity * dt;
    *life -= dt;
    if *life <= 0.0 {
        actor.removed = true;
    }
}

fn update_particle(actor: &mut Actor, dt: f32) {
    let ActorKind::Particle(particle) = &mut actor.kind else {
        return;
    };

    actor.position += actor.velocity * dt;
    actor.elevation += particle.vertical_velocity * dt;
    particle.vertical_velocity -= PARTICLE_GRAVITY * dt;

    if actor.elevation <= 0.0 {
        actor.elevation = 0.0;
        if particle.vertical_velocity < 0.0 {
            particle.vertical_velocity = 0.0;
            actor.velocity = actor.velocity * PARTICLE_LANDING_DAMPING;
        }
        actor.velocity = actor.velocity * (-PARTICLE_GROUND_FRICTION * dt).exp();
    }

    particle.life -= dt;
    if particle.life <= 0.0 {
        actor.removed = true;
    }
}
