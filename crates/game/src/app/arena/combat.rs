use arena_engine::Vec2;
use rand::Rng;

use super::actor::{
    ActorId, ActorKind, LifeState, LootKind, PlayerState, ProjectileState, Weapon, SLOT_COUNT,
};
use super::collision::{point_blocked, Rect};
use super::events::{ArenaEvent, ArenaEventBus};
use super::registry::ActorRegistry;
use crate::app::config::{CombatConfig, PlayerConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ShotSpec {
    pub(crate) origin: Vec2,
    pub(crate) angle: f32,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct DamageOutcome {
    pub(crate) absorbed: f32,
    pub(crate) health_lost: f32,
    pub(crate) died: bool,
}

/// Attempts to fire the active slot, appending one shot per projectile to
/// `shots`. Returns how many were produced; zero means the trigger was a no-op
/// (dead shooter, cooling down or an empty magazine).
pub(crate) fn try_fire<R: Rng + ?Sized>(
    player: &mut PlayerState,
    origin: Vec2,
    config: &CombatConfig,
    rng: &mut R,
    shots: &mut Vec<ShotSpec>,
) -> u32 {
    if !player.is_alive() {
        return 0;
    }
    let slot = player.active_slot.min(SLOT_COUNT - 1);
    if player.cooldowns[slot] > 0.0 {
        return 0;
    }

    let (damage, speed, pellets) = match &mut player.slots[slot] {
        None => {
            player.cooldowns[slot] = config.sidearm_interval;
            (config.sidearm_damage, config.sidearm_speed, 1)
        }
        Some(weapon) => {
            if weapon.ammo == 0 {
                return 0;
            }
            weapon.ammo -= 1;
            player.cooldowns[slot] = weapon.fire_interval;
            let pellets = if config.shotgun_fan_out {
                weapon.pellets.max(1)
            } else {
                1
            };
            (weapon.damage, config.muzzle_speed, pellets)
        }
    };

    for pellet in 0..pellets {
        let fan_offset = if pellets > 1 {
            config.pellet_arc * (pellet as f32 / (pellets - 1) as f32 - 0.5)
        } else {
            0.0
        };
        let jitter = (rng.gen::<f32>() - 0.5) * config.spread;
        shots.push(ShotSpec {
            origin,
            angle: player.facing + fan_offset + jitter,
            speed,
            damage,
        });
    }
    player.muzzle_flash = true;
    pellets
}

/// Shield absorbs first, the remainder comes off health. Damage to an actor that
/// is already dead is ignored, so death fires exactly once.
pub(crate) fn apply_damage(player: &mut PlayerState, amount: f32) -> DamageOutcome {
    if !player.is_alive() {
        return DamageOutcome::default();
    }
    let amount = if amount.is_finite() {
        amount.max(0.0)
    } else {
        0.0
    };

    let absorbed = amount.min(player.shield);
    player.shield = (player.shield - absorbed).max(0.0);
    let health_lost = amount - absorbed;
    player.health -= health_lost;

    let died = player.health <= 0.0;
    if died {
        player.life = LifeState::Dead;
    }
    DamageOutcome {
        absorbed,
        health_lost,
        died,
    }
}

/// Moves reserve rounds into the active magazine and blocks the slot for
/// `reload_time`. Returns `false` when there is nothing to reload.
pub(crate) fn try_reload(player: &mut PlayerState, reload_time: f32) -> bool {
    if !player.is_alive() {
        return false;
    }
    let slot = player.active_slot.min(SLOT_COUNT - 1);
    if player.cooldowns[slot] > 0.0 {
        return false;
    }
    let Some(weapon) = player.slots[slot].as_mut() else {
        return false;
    };
    let missing = weapon.magazine.saturating_sub(weapon.ammo);
    let moved = missing.min(weapon.reserve);
    if moved == 0 {
        return false;
    }
    weapon.ammo += moved;
    weapon.reserve -= moved;
    player.cooldowns[slot] = reload_time;
    true
}

pub(crate) fn switch_slot(player: &mut PlayerState, slot: usize) -> bool {
    if slot >= SLOT_COUNT || slot == player.active_slot || !player.is_alive() {
        return false;
    }
    player.active_slot = slot;
    true
}

/// Applies a pickup to `player`. Every loot kind is consumed on use; a weapon
/// replaces whatever the active slot held.
pub(crate) fn apply_pickup(player: &mut PlayerState, loot: LootKind, config: &PlayerConfig) {
    match loot {
        LootKind::Medkit => {
            player.health = (player.health + config.medkit_heal).min(player.max_health);
        }
        LootKind::Shield => {
            player.shield = (player.shield + config.shield_boost).min(config.shield_cap);
        }
        LootKind::Weapon(kind) => {
            let slot = player.active_slot.min(SLOT_COUNT - 1);
            player.slots[slot] = Some(Weapon::issue(kind, config.reserve_magazines));
        }
    }
}

/// Picks up the nearest item strictly within the interaction radius.
pub(crate) fn try_interact(
    registry: &mut ActorRegistry,
    actor: ActorId,
    config: &PlayerConfig,
    events: &mut ArenaEventBus,
) -> Option<LootKind> {
    let position = {
        let found = registry.find(actor)?;
        if !found.is_live_player() {
            return None;
        }
        found.position
    };

    let item = registry.nearest_item_within(position, config.interaction_radius)?;
    let loot = match &registry.find(item)?.kind {
        ActorKind::Item(world_item) => world_item.loot,
        _ => return None,
    };

    apply_pickup(registry.player_mut(actor)?, loot, config);
    registry.mark_removed(item);
    events.emit(ArenaEvent::ItemPickedUp { actor, item, loot });
    Some(loot)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ProjectileImpact {
    Obstacle(Vec2),
    Body { position: Vec2, target: ActorId },
}

impl ProjectileImpact {
    pub(crate) fn position(self) -> Vec2 {
        match self {
            ProjectileImpact::Obstacle(position) | ProjectileImpact::Body { position, .. } => {
                position
            }
        }
    }
}

struct PendingHit {
    projectile: ActorId,
    owner: ActorId,
    damage: f32,
    lethal: bool,
    target: Option<ActorId>,
    position: Vec2,
}

/// Stops projectiles that entered an obstacle or a player body and applies
/// damage from lethal ones. Non-lethal (mirrored) shots only stop at obstacles.
pub(crate) fn resolve_projectile_hits(
    registry: &mut ActorRegistry,
    obstacles: &[Rect],
    body_radius: f32,
    events: &mut ArenaEventBus,
    impacts: &mut Vec<ProjectileImpact>,
) {
    let mut pending = Vec::new();
    for actor in registry.actors() {
        let ActorKind::Projectile(ProjectileState {
            owner,
            damage,
            lethal,
            ..
        }) = actor.kind
        else {
            continue;
        };
        if actor.removed {
            continue;
        }

        if point_blocked(obstacles, actor.position) {
            pending.push(PendingHit {
                projectile: actor.id,
                owner,
                damage,
                lethal,
                target: None,
                position: actor.position,
            });
            continue;
        }
        if !lethal {
            continue;
        }

        let target = registry.actors().iter().find(|candidate| {
            candidate.id != owner
                && candidate.is_live_player()
                && candidate.position.distance(actor.position) < body_radius
        });
        if let Some(target) = target {
            pending.push(PendingHit {
                projectile: actor.id,
                owner,
                damage,
                lethal,
                target: Some(target.id),
                position: actor.position,
            });
        }
    }

    for hit in pending {
        registry.mark_removed(hit.projectile);
        let Some(target) = hit.target else {
            impacts.push(ProjectileImpact::Obstacle(hit.position));
            continue;
        };
        impacts.push(ProjectileImpact::Body {
            position: hit.position,
            target,
        });

        let Some(player) = registry.player_mut(target) else {
            continue;
        };
        if !hit.lethal || !player.takes_local_damage() {
            continue;
        }
        let outcome = apply_damage(player, hit.damage);
        emit_damage_events(events, target, outcome, Some(hit.owner));
    }
}

pub(crate) fn emit_damage_events(
    events: &mut ArenaEventBus,
    actor: ActorId,
    outcome: DamageOutcome,
    by: Option<ActorId>,
) {
    if outcome.absorbed > 0.0 || outcome.health_lost > 0.0 {
        events.emit(ArenaEvent::ActorDamaged {
            actor,
            absorbed: outcome.absorbed,
            health_lost: outcome.health_lost,
        });
    }
    if outcome.died {
        events.emit(ArenaEvent::ActorEliminated { actor, by });
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::app::arena::actor::{Control, HeroClass, WeaponKind, WorldItem};

    fn player(class: HeroClass) -> PlayerState {
        PlayerState::new("Survivor", class, Control::Local, &PlayerConfig::default())
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn shield_absorbs_before_health() {
        let mut target = player(HeroClass::Assault);
        target.shield = 20.0;
        let outcome = apply_damage(&mut target, 35.0);
        assert_eq!(target.shield, 0.0);
        assert_eq!(target.health, 85.0);
        assert_eq!(outcome.absorbed, 20.0);
        assert_eq!(outcome.health_lost, 15.0);
        assert!(!outcome.died);
    }

    #[test]
    fn damage_smaller_than_shield_leaves_health_untouched() {
        let mut target = player(HeroClass::Assault);
        target.shield = 50.0;
        apply_damage(&mut target, 30.0);
        assert_eq!(target.shield, 20.0);
        assert_eq!(target.health, 100.0);
    }

    #[test]
    fn death_is_reported_once() {
        let mut target = player(HeroClass::Assault);
        target.health = 10.0;
        assert!(apply_damage(&mut target, 10.0).died);
        assert_eq!(target.life, LifeState::Dead);

        let again = apply_damage(&mut target, 50.0);
        assert!(!again.died);
        assert_eq!(target.life, LifeState::Dead);
        assert_eq!(target.health, 0.0);
    }

    #[test]
    fn negative_or_nan_damage_is_ignored() {
        let mut target = player(HeroClass::Assault);
        apply_damage(&mut target, -30.0);
        apply_damage(&mut target, f32::NAN);
        assert_eq!(target.health, 100.0);
    }

    #[test]
    fn empty_slot_fires_sidearm_and_respects_cooldown() {
        let config = CombatConfig::default();
        let mut shooter = player(HeroClass::Scout);
        let mut shots = Vec::new();
        let mut rng = rng();

        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 1);
        assert_eq!(shots[0].damage, 15.0);
        assert_eq!(shots[0].speed, 1500.0);
        assert!(shooter.muzzle_flash);
        assert_eq!(shooter.cooldowns[0], 0.4);

        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 0);
        shooter.tick_cooldowns(0.4);
        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 1);
    }

    #[test]
    fn spread_stays_within_configured_band() {
        let config = CombatConfig::default();
        let mut shooter = player(HeroClass::Scout);
        shooter.facing = 1.0;
        let mut shots = Vec::new();
        let mut rng = rng();
        for _ in 0..50 {
            shooter.cooldowns = [0.0; SLOT_COUNT];
            try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots);
        }
        assert!(shots
            .iter()
            .all(|shot| (shot.angle - 1.0).abs() <= config.spread * 0.5 + 1e-6));
    }

    #[test]
    fn weapon_consumes_ammo_and_stops_when_empty() {
        let config = CombatConfig::default();
        let mut shooter = player(HeroClass::Scout);
        let mut weapon = Weapon::issue(WeaponKind::Sniper, 0);
        weapon.ammo = 1;
        shooter.slots[0] = Some(weapon);
        let mut shots = Vec::new();
        let mut rng = rng();

        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 1);
        assert_eq!(shots[0].damage, 90.0);
        assert_eq!(shots[0].speed, 2000.0);
        assert_eq!(shooter.cooldowns[0], 1.5);

        shooter.cooldowns[0] = 0.0;
        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 0);
    }

    #[test]
    fn shotgun_fans_out_only_when_enabled() {
        let mut config = CombatConfig::default();
        let mut shooter = player(HeroClass::Tank).with_loadout(3);
        shooter.active_slot = 1;
        let mut shots = Vec::new();
        let mut rng = rng();

        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 1);

        config.shotgun_fan_out = true;
        shooter.cooldowns = [0.0; SLOT_COUNT];
        shots.clear();
        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng, &mut shots), 5);
        let ammo = shooter.active_weapon().expect("shotgun").ammo;
        assert_eq!(ammo, 6);
    }

    #[test]
    fn dead_player_cannot_fire() {
        let config = CombatConfig::default();
        let mut shooter = player(HeroClass::Scout);
        shooter.life = LifeState::Dead;
        let mut shots = Vec::new();
        assert_eq!(try_fire(&mut shooter, Vec2::ZERO, &config, &mut rng(), &mut shots), 0);
        assert!(shots.is_empty());
    }

    #[test]
    fn reload_moves_reserve_into_magazine() {
        let mut shooter = player(HeroClass::Assault).with_loadout(1);
        shooter.active_slot = 1;
        if let Some(weapon) = shooter.slots[1].as_mut() {
            weapon.ammo = 10;
        }
        assert!(try_reload(&mut shooter, 1.2));
        let weapon = shooter.active_weapon().expect("m416");
        assert_eq!(weapon.ammo, 40);
        assert_eq!(weapon.reserve, 10);
        assert_eq!(shooter.cooldowns[1], 1.2);
        assert!(!try_reload(&mut shooter, 1.2));
    }

    #[test]
    fn switch_slot_rejects_out_of_range_and_same_slot() {
        let mut shooter = player(HeroClass::Assault);
        assert!(!switch_slot(&mut shooter, 0));
        assert!(!switch_slot(&mut shooter, 2));
        assert!(switch_slot(&mut shooter, 1));
        assert_eq!(shooter.active_slot, 1);
    }

    #[test]
    fn pickups_are_capped() {
        let config = PlayerConfig::default();
        let mut target = player(HeroClass::Assault);
        target.health = 80.0;
        apply_pickup(&mut target, LootKind::Medkit, &config);
        assert_eq!(target.health, 100.0);

        target.shield = 70.0;
        apply_pickup(&mut target, LootKind::Shield, &config);
        assert_eq!(target.shield, 100.0);

        apply_pickup(&mut target, LootKind::Weapon(WeaponKind::Ak47), &config);
        assert_eq!(target.slots[0].expect("ak47").kind, WeaponKind::Ak47);
    }

    #[test]
    fn interact_picks_nearest_item_once() {
        let config = PlayerConfig::default();
        let mut registry = ActorRegistry::default();
        let mut events = ArenaEventBus::default();
        let actor = registry.spawn_local_player(Vec2::new(100.0, 100.0), player(HeroClass::Scout));
        registry.spawn(
            Vec2::new(150.0, 100.0),
            ActorKind::Item(WorldItem {
                loot: LootKind::Shield,
            }),
        );
        let near = registry.spawn(
            Vec2::new(120.0, 100.0),
            ActorKind::Item(WorldItem {
                loot: LootKind::Weapon(WeaponKind::M416),
            }),
        );

        let loot = try_interact(&mut registry, actor, &config, &mut events);
        assert_eq!(loot, Some(LootKind::Weapon(WeaponKind::M416)));
        assert!(!registry.is_live(near));
        assert_eq!(events.iter_emitted_so_far().count(), 1);

        let second = try_interact(&mut registry, actor, &config, &mut events);
        assert_eq!(second, Some(LootKind::Shield));
        assert_eq!(try_interact(&mut registry, actor, &config, &mut events), None);
    }

    #[test]
    fn interact_ignores_items_at_exact_radius() {
        let config = PlayerConfig::default();
        let mut registry = ActorRegistry::default();
        let mut events = ArenaEventBus::default();
        let actor = registry.spawn_local_player(Vec2::ZERO, player(HeroClass::Scout));
        registry.spawn(
            Vec2::new(80.0, 0.0),
            ActorKind::Item(WorldItem {
                loot: LootKind::Medkit,
            }),
        );
        assert_eq!(try_interact(&mut registry, actor, &config, &mut events), None);
    }

    fn spawn_projectile(
        registry: &mut ActorRegistry,
        position: Vec2,
        owner: ActorId,
        lethal: bool,
    ) -> ActorId {
        registry.spawn(
            position,
            ActorKind::Projectile(ProjectileState {
                owner,
                damage: 40.0,
                life: 1.0,
                lethal,
            }),
        )
    }

    #[test]
    fn lethal_projectile_damages_bot_and_is_consumed() {
        let config = PlayerConfig::default();
        let mut registry = ActorRegistry::default();
        let mut events = ArenaEventBus::default();
        let shooter = registry.spawn_local_player(Vec2::ZERO, player(HeroClass::Scout));
        let bot = registry.spawn(
            Vec2::new(500.0, 500.0),
            ActorKind::Player(PlayerState::new(
                "Viper",
                HeroClass::Assault,
                Control::Bot(crate::app::arena::actor::PeerId(1)),
                &config,
            )),
        );
        let projectile = spawn_projectile(&mut registry, Vec2::new(505.0, 500.0), shooter, true);
        let mut impacts = Vec::new();

        resolve_projectile_hits(&mut registry, &[], 15.0, &mut events, &mut impacts);

        assert!(!registry.is_live(projectile));
        assert_eq!(
            impacts,
            vec![ProjectileImpact::Body {
                position: Vec2::new(505.0, 500.0),
                target: bot,
            }]
        );
        let health = registry
            .find(bot)
            .and_then(|actor| actor.player())
            .expect("bot")
            .health;
        assert_eq!(health, 60.0);
    }

    #[test]
    fn projectile_never_hits_its_owner_and_stops_at_obstacles() {
        let mut registry = ActorRegistry::default();
        let mut events = ArenaEventBus::default();
        let shooter = registry.spawn_local_player(Vec2::ZERO, player(HeroClass::Scout));
        let own = spawn_projectile(&mut registry, Vec2::new(2.0, 0.0), shooter, true);
        let blocked = spawn_projectile(&mut registry, Vec2::new(300.0, 300.0), shooter, false);
        let wall = Rect::new(Vec2::new(250.0, 250.0), Vec2::new(350.0, 350.0));
        let mut impacts = Vec::new();

        resolve_projectile_hits(&mut registry, &[wall], 15.0, &mut events, &mut impacts);

        assert!(registry.is_live(own));
        assert!(!registry.is_live(blocked));
        assert_eq!(impacts, vec![ProjectileImpact::Obstacle(Vec2::new(300.0, 300.0))]);
        assert_eq!(events.iter_emitted_so_far().count(), 0);
    }

    #[test]
    fn mirrored_projectile_passes_through_players() {
        let mut registry = ActorRegistry::default();
        let mut events = ArenaEventBus::default();
        registry.spawn_local_player(Vec2::ZERO, player(HeroClass::Scout));
        let projectile = spawn_projectile(&mut registry, Vec2::new(1.0, 0.0), ActorId(999), false);
        let mut impacts = Vec::new();

        resolve_projectile_hits(&mut registry, &[], 15.0, &mut events, &mut impacts);

        assert!(registry.is_live(projectile));
        assert!(impacts.is_empty());
    }

    #[test]
    fn killing_blow_emits_elimination_with_attacker() {
        let mut registry = ActorRegistry::default();
        let mut events = ArenaEventBus::default();
        let mut victim_state = player(HeroClass::Scout);
        victim_state.health = 30.0;
        let victim = registry.spawn_local_player(Vec2::ZERO, victim_state);
        spawn_projectile(&mut registry, Vec2::new(3.0, 0.0), ActorId(77), true);
        spawn_projectile(&mut registry, Vec2::new(4.0, 0.0), ActorId(77), true);
        let mut impacts = Vec::new();

        resolve_projectile_hits(&mut registry, &[], 15.0, &mut events, &mut impacts);

        let eliminations: Vec<_> = events
            .iter_emitted_so_far()
            .filter(|event| matches!(event, ArenaEvent::ActorEliminated { .. }))
            .collect();
        assert_eq!(
            eliminations,
            vec![&ArenaEvent::ActorEliminated {
                actor: victim,
                by: Some(ActorId(77)),
            }]
        );
        assert_eq!(impacts.len(), 2);
    }
}
