use arena_engine::{Rgba, Vec2};
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::app::config::PlayerConfig;

pub(crate) const SLOT_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ActorId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct PeerId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum HeroClass {
    #[default]
    Assault,
    Scout,
    Tank,
    Sniper,
}

impl HeroClass {
    pub(crate) const BOT_CLASSES: [HeroClass; 3] =
        [HeroClass::Assault, HeroClass::Sniper, HeroClass::Tank];

    pub(crate) fn max_health(self, config: &PlayerConfig) -> f32 {
        match self {
            HeroClass::Tank => config.tank_max_health,
            _ => config.base_max_health,
        }
    }

    pub(crate) fn move_speed(self, config: &PlayerConfig) -> f32 {
        match self {
            HeroClass::Scout => config.scout_speed,
            _ => config.base_speed,
        }
    }

    /// Weapon issued into the second slot on deploy.
    pub(crate) fn loadout(self) -> Option<WeaponKind> {
        match self {
            HeroClass::Assault => Some(WeaponKind::M416),
            HeroClass::Sniper => Some(WeaponKind::Sniper),
            HeroClass::Tank => Some(WeaponKind::Shotgun),
            HeroClass::Scout => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            HeroClass::Assault => "assault",
            HeroClass::Scout => "scout",
            HeroClass::Tank => "tank",
            HeroClass::Sniper => "sniper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WeaponKind {
    Ak47,
    M416,
    Sniper,
    Shotgun,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WeaponStats {
    pub(crate) damage: f32,
    pub(crate) fire_interval: f32,
    pub(crate) magazine: u32,
    pub(crate) pellets: u32,
}

impl WeaponKind {
    pub(crate) const fn stats(self) -> WeaponStats {
        match self {
            WeaponKind::Ak47 => WeaponStats {
                damage: 25.0,
                fire_interval: 0.1,
                magazine: 30,
                pellets: 1,
            },
            WeaponKind::M416 => WeaponStats {
                damage: 20.0,
                fire_interval: 0.08,
                magazine: 40,
                pellets: 1,
            },
            WeaponKind::Sniper => WeaponStats {
                damage: 90.0,
                fire_interval: 1.5,
                magazine: 5,
                pellets: 1,
            },
            WeaponKind::Shotgun => WeaponStats {
                damage: 15.0,
                fire_interval: 0.8,
                magazine: 8,
                pellets: 5,
            },
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            WeaponKind::Ak47 => "AK47",
            WeaponKind::M416 => "M416",
            WeaponKind::Sniper => "SNIPER",
            WeaponKind::Shotgun => "SHOTGUN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Weapon {
    pub(crate) kind: WeaponKind,
    pub(crate) damage: f32,
    pub(crate) fire_interval: f32,
    pub(crate) pellets: u32,
    pub(crate) ammo: u32,
    pub(crate) magazine: u32,
    pub(crate) reserve: u32,
}

impl Weapon {
    pub(crate) fn issue(kind: WeaponKind, reserve_magazines: u32) -> Self {
        let stats = kind.stats();
        Self {
            kind,
            damage: stats.damage,
            fire_interval: stats.fire_interval,
            pellets: stats.pellets,
            ammo: stats.magazine,
            magazine: stats.magazine,
            reserve: stats.magazine.saturating_mul(reserve_magazines),
        }
    }

    /// Bots carry a weaker rifle that never runs dry in practice.
    pub(crate) fn bot_rifle() -> Self {
        Self {
            kind: WeaponKind::Ak47,
            damage: 10.0,
            fire_interval: 0.1,
            pellets: 1,
            ammo: 999,
            magazine: 999,
            reserve: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LootKind {
    Weapon(WeaponKind),
    Medkit,
    Shield,
}

impl LootKind {
    pub(crate) const POOL: [LootKind; 6] = [
        LootKind::Weapon(WeaponKind::Ak47),
        LootKind::Weapon(WeaponKind::M416),
        LootKind::Weapon(WeaponKind::Shotgun),
        LootKind::Weapon(WeaponKind::Sniper),
        LootKind::Medkit,
        LootKind::Shield,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            LootKind::Weapon(kind) => kind.label(),
            LootKind::Medkit => "MEDKIT",
            LootKind::Shield => "SHIELD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Local,
    /// Scripted stand-in for a remote participant.
    Bot(PeerId),
    /// Remote participant reconciled from peer events.
    Remote(PeerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlayerState {
    pub(crate) name: String,
    pub(crate) class: HeroClass,
    pub(crate) control: Control,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) shield: f32,
    pub(crate) facing: f32,
    pub(crate) move_speed: f32,
    pub(crate) slots: [Option<Weapon>; SLOT_COUNT],
    /// Per-slot refire and reload timers, in seconds.
    pub(crate) cooldowns: [f32; SLOT_COUNT],
    pub(crate) active_slot: usize,
    pub(crate) life: LifeState,
    pub(crate) muzzle_flash: bool,
}

impl PlayerState {
    pub(crate) fn new(
        name: impl Into<String>,
        class: HeroClass,
        control: Control,
        config: &PlayerConfig,
    ) -> Self {
        let max_health = class.max_health(config);
        Self {
            name: name.into(),
            class,
            control,
            health: max_health,
            max_health,
            shield: 0.0,
            facing: 0.0,
            move_speed: class.move_speed(config),
            slots: [None; SLOT_COUNT],
            cooldowns: [0.0; SLOT_COUNT],
            active_slot: 0,
            life: LifeState::Alive,
            muzzle_flash: false,
        }
    }

    pub(crate) fn with_loadout(mut self, reserve_magazines: u32) -> Self {
        if let Some(kind) = self.class.loadout() {
            self.slots[1] = Some(Weapon::issue(kind, reserve_magazines));
        }
        self
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub(crate) fn is_local(&self) -> bool {
        self.control == Control::Local
    }

    pub(crate) fn peer_id(&self) -> Option<PeerId> {
        match self.control {
            Control::Local => None,
            Control::Bot(peer) | Control::Remote(peer) => Some(peer),
        }
    }

    /// Only the local player and scripted bots take damage locally; remote
    /// participants report their own eliminations.
    pub(crate) fn takes_local_damage(&self) -> bool {
        !matches!(self.control, Control::Remote(_))
    }

    pub(crate) fn active_weapon(&self) -> Option<&Weapon> {
        self.slots.get(self.active_slot).and_then(Option::as_ref)
    }

    pub(crate) fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    pub(crate) fn tick_cooldowns(&mut self, dt: f32) {
        for cooldown in &mut self.cooldowns {
            *cooldown = (*cooldown - dt).max(0.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ProjectileState {
    pub(crate) owner: ActorId,
    pub(crate) damage: f32,
    pub(crate) life: f32,
    /// Shots mirrored from remote peers are visual only.
    pub(crate) lethal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ParticleState {
    pub(crate) life: f32,
    pub(crate) max_life: f32,
    pub(crate) color: Rgba,
    pub(crate) vertical_velocity: f32,
    pub(crate) radius: f32,
}

impl ParticleState {
    pub(crate) fn remaining_fraction(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObstacleKind {
    Tree,
    Building,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StaticObject {
    pub(crate) kind: ObstacleKind,
    pub(crate) half_extents: Vec2,
    pub(crate) visual_height: f32,
}

impl StaticObject {
    pub(crate) fn footprint(&self, center: Vec2) -> Rect {
        Rect::new(center - self.half_extents, center + self.half_extents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorldItem {
    pub(crate) loot: LootKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ActorKind {
    Player(PlayerState),
    Projectile(ProjectileState),
    Particle(ParticleState),
    Static(StaticObject),
    Item(WorldItem),
}

/// Variant tag used to dispatch per-kind update and draw routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ActorTag {
    LocalPlayer,
    RemotePlayer,
    Projectile,
    Particle,
    StaticObject,
    WorldItem,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Actor {
    pub(crate) id: ActorId,
    pub(crate) position: Vec2,
    /// Height above the ground plane; only particles leave it.
    pub(crate) elevation: f32,
    pub(crate) velocity: Vec2,
    pub(crate) removed: bool,
    pub(crate) kind: ActorKind,
}

impl Actor {
    pub(crate) fn tag(&self) -> ActorTag {
        match &self.kind {
            ActorKind::Player(player) if player.is_local() => ActorTag::LocalPlayer,
            ActorKind::Player(_) => ActorTag::RemotePlayer,
            ActorKind::Projectile(_) => ActorTag::Projectile,
            ActorKind::Particle(_) => ActorTag::Particle,
            ActorKind::Static(_) => ActorTag::StaticObject,
            ActorKind::Item(_) => ActorTag::WorldItem,
        }
    }

    pub(crate) fn player(&self) -> Option<&PlayerState> {
        match &self.kind {
            ActorKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            ActorKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn is_live_player(&self) -> bool {
        !self.removed && self.player().is_some_and(PlayerState::is_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_table_matches_roster() {
        let config = PlayerConfig::default();
        assert_eq!(HeroClass::Tank.max_health(&config), 150.0);
        assert_eq!(HeroClass::Scout.max_health(&config), 100.0);
        assert_eq!(HeroClass::Scout.move_speed(&config), 350.0);
        assert_eq!(HeroClass::Sniper.move_speed(&config), 280.0);
        assert_eq!(HeroClass::Scout.loadout(), None);
        assert_eq!(HeroClass::Tank.loadout(), Some(WeaponKind::Shotgun));
    }

    #[test]
    fn new_player_starts_full_health_without_shield() {
        let player = PlayerState::new(
            "Survivor",
            HeroClass::Tank,
            Control::Local,
            &PlayerConfig::default(),
        );
        assert_eq!(player.health, 150.0);
        assert_eq!(player.max_health, 150.0);
        assert_eq!(player.shield, 0.0);
        assert!(player.is_alive());
        assert!(player.active_weapon().is_none());
    }

    #[test]
    fn loadout_fills_second_slot_with_reserve() {
        let player = PlayerState::new(
            "Survivor",
            HeroClass::Assault,
            Control::Local,
            &PlayerConfig::default(),
        )
        .with_loadout(3);
        let weapon = player.slots[1].expect("assault loadout");
        assert_eq!(weapon.kind, WeaponKind::M416);
        assert_eq!(weapon.ammo, 40);
        assert_eq!(weapon.reserve, 120);
        assert!(player.slots[0].is_none());
    }

    #[test]
    fn tag_distinguishes_local_and_remote_players() {
        let config = PlayerConfig::default();
        let make = |control| Actor {
            id: ActorId(1),
            position: Vec2::ZERO,
            elevation: 0.0,
            velocity: Vec2::ZERO,
            removed: false,
            kind: ActorKind::Player(PlayerState::new("x", HeroClass::Scout, control, &config)),
        };
        assert_eq!(make(Control::Local).tag(), ActorTag::LocalPlayer);
        assert_eq!(make(Control::Bot(PeerId(3))).tag(), ActorTag::RemotePlayer);
        assert_eq!(make(Control::Remote(PeerId(3))).tag(), ActorTag::RemotePlayer);
    }

    #[test]
    fn remote_players_do_not_take_local_damage() {
        let config = PlayerConfig::default();
        let remote = PlayerState::new("r", HeroClass::Scout, Control::Remote(PeerId(9)), &config);
        let bot = PlayerState::new("b", HeroClass::Scout, Control::Bot(PeerId(9)), &config);
        assert!(!remote.takes_local_damage());
        assert!(bot.takes_local_damage());
        assert_eq!(remote.peer_id(), Some(PeerId(9)));
    }
}
