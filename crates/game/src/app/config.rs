use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::arena::HeroClass;

pub(crate) const CONFIG_ENV_VAR: &str = "ARENA_CONFIG";
pub(crate) const SEED_ENV_VAR: &str = "ARENA_SEED";
pub(crate) const ROOM_LINK_ENV_VAR: &str = "ARENA_ROOM_LINK";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path} at `{field_path}`: {source}")]
    Parse {
        path: PathBuf,
        field_path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ArenaConfig {
    pub(crate) world: WorldConfig,
    pub(crate) player: PlayerConfig,
    pub(crate) combat: CombatConfig,
    pub(crate) zone: ZoneConfig,
    pub(crate) peers: PeerConfig,
    pub(crate) session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub(crate) size: f32,
    pub(crate) grid_cell: f32,
    pub(crate) cull_margin: f32,
    pub(crate) tree_count: usize,
    pub(crate) tree_footprint: f32,
    pub(crate) tree_height: f32,
    pub(crate) town_centers: Vec<[f32; 2]>,
    pub(crate) buildings_per_town: usize,
    pub(crate) building_size: f32,
    pub(crate) building_height: f32,
    pub(crate) building_spread: f32,
    pub(crate) loot_chance: f32,
    pub(crate) loot_offset: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 4000.0,
            grid_cell: 100.0,
            cull_margin: 200.0,
            tree_count: 300,
            tree_footprint: 40.0,
            tree_height: 120.0,
            town_centers: vec![[1000.0, 1000.0], [3000.0, 3000.0], [2000.0, 2000.0]],
            buildings_per_town: 6,
            building_size: 150.0,
            building_height: 90.0,
            building_spread: 300.0,
            loot_chance: 0.7,
            loot_offset: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerConfig {
    pub(crate) base_max_health: f32,
    pub(crate) tank_max_health: f32,
    pub(crate) base_speed: f32,
    pub(crate) scout_speed: f32,
    /// Exponential velocity decay per second once movement keys are released.
    pub(crate) friction_rate: f32,
    pub(crate) shield_cap: f32,
    pub(crate) body_radius: f32,
    pub(crate) interaction_radius: f32,
    pub(crate) medkit_heal: f32,
    pub(crate) shield_boost: f32,
    pub(crate) spawn_margin: f32,
    pub(crate) reserve_magazines: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_max_health: 100.0,
            tank_max_health: 150.0,
            base_speed: 280.0,
            scout_speed: 350.0,
            friction_rate: 10.0,
            shield_cap: 100.0,
            body_radius: 15.0,
            interaction_radius: 80.0,
            medkit_heal: 50.0,
            shield_boost: 50.0,
            spawn_margin: 500.0,
            reserve_magazines: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CombatConfig {
    pub(crate) sidearm_damage: f32,
    pub(crate) sidearm_interval: f32,
    pub(crate) sidearm_speed: f32,
    pub(crate) muzzle_speed: f32,
    /// Full width of the uniform angular jitter, in radians.
    pub(crate) spread: f32,
    pub(crate) projectile_life: f32,
    pub(crate) reload_time: f32,
    pub(crate) shotgun_fan_out: bool,
    pub(crate) pellet_arc: f32,
    pub(crate) muzzle_flash_seconds: f32,
    pub(crate) shake_per_shot: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            sidearm_damage: 15.0,
            sidearm_interval: 0.4,
            sidearm_speed: 1500.0,
            muzzle_speed: 2000.0,
            spread: 0.1,
            projectile_life: 1.5,
            reload_time: 1.2,
            shotgun_fan_out: false,
            pellet_arc: 0.3,
            muzzle_flash_seconds: 0.1,
            shake_per_shot: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ZoneConfig {
    pub(crate) center: [f32; 2],
    pub(crate) radius: f32,
    pub(crate) target_radius: f32,
    pub(crate) countdown: f32,
    pub(crate) shrink_rate: f32,
    pub(crate) damage_per_second: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            center: [2000.0, 2000.0],
            radius: 4000.0,
            target_radius: 500.0,
            countdown: 300.0,
            shrink_rate: 15.0,
            damage_per_second: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PeerConfig {
    pub(crate) initial_bots: usize,
    pub(crate) spawn_interval: f32,
    pub(crate) max_players: usize,
    pub(crate) bot_speed: f32,
    pub(crate) bot_think_interval: f32,
    pub(crate) bot_engage_range: f32,
    pub(crate) bot_fire_chance: f32,
    /// Bots farther than this fraction of the zone radius head for the centre.
    pub(crate) bot_zone_fraction: f32,
    pub(crate) interpolation_rate: f32,
    pub(crate) latency_base: f32,
    pub(crate) latency_jitter: f32,
    pub(crate) send_interval: f32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            initial_bots: 15,
            spawn_interval: 5.0,
            max_players: 20,
            bot_speed: 180.0,
            bot_think_interval: 2.0,
            bot_engage_range: 600.0,
            bot_fire_chance: 0.02,
            bot_zone_fraction: 0.8,
            interpolation_rate: 10.0,
            latency_base: 0.05,
            latency_jitter: 0.1,
            send_interval: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionConfig {
    pub(crate) seed: Option<u64>,
    pub(crate) max_frame_delta: f32,
    pub(crate) player_name: String,
    pub(crate) hero_class: HeroClass,
    pub(crate) room_link: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_frame_delta: 0.1,
            player_name: "Survivor".to_string(),
            hero_class: HeroClass::Assault,
            room_link: None,
        }
    }
}

fn finite_at_least(value: f32, min: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(min)
    } else {
        fallback
    }
}

impl ArenaConfig {
    /// Clamps values that would break simulation invariants (negative rates, a target
    /// radius above the starting radius, degenerate world sizes).
    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.world.size = finite_at_least(self.world.size, 100.0, defaults.world.size);
        self.world.grid_cell = finite_at_least(self.world.grid_cell, 10.0, defaults.world.grid_cell);
        self.world.cull_margin = finite_at_least(self.world.cull_margin, 0.0, 0.0);
        self.world.loot_chance = finite_at_least(self.world.loot_chance, 0.0, 0.0).min(1.0);
        self.world.building_size = finite_at_least(self.world.building_size, 1.0, 1.0);
        self.world.tree_footprint = finite_at_least(self.world.tree_footprint, 1.0, 1.0);

        self.player.friction_rate = finite_at_least(self.player.friction_rate, 0.0, 0.0);
        self.player.body_radius = finite_at_least(self.player.body_radius, 1.0, 1.0);
        self.player.interaction_radius = finite_at_least(self.player.interaction_radius, 0.0, 0.0);
        self.player.spawn_margin = finite_at_least(self.player.spawn_margin, 0.0, 0.0)
            .min(self.world.size * 0.5);

        self.combat.spread = finite_at_least(self.combat.spread, 0.0, 0.0);
        self.combat.projectile_life = finite_at_least(self.combat.projectile_life, 0.0, 0.0);
        self.combat.sidearm_interval = finite_at_least(self.combat.sidearm_interval, 0.0, 0.0);
        self.combat.reload_time = finite_at_least(self.combat.reload_time, 0.0, 0.0);

        self.zone.radius = finite_at_least(self.zone.radius, 0.0, defaults.zone.radius);
        self.zone.target_radius =
            finite_at_least(self.zone.target_radius, 0.0, 0.0).min(self.zone.radius);
        self.zone.countdown = finite_at_least(self.zone.countdown, 0.0, 0.0);
        self.zone.shrink_rate = finite_at_least(self.zone.shrink_rate, 0.0, 0.0);
        self.zone.damage_per_second = finite_at_least(self.zone.damage_per_second, 0.0, 0.0);

        self.peers.bot_fire_chance = finite_at_least(self.peers.bot_fire_chance, 0.0, 0.0).min(1.0);
        self.peers.interpolation_rate = finite_at_least(self.peers.interpolation_rate, 0.0, 0.0);
        self.peers.latency_base = finite_at_least(self.peers.latency_base, 0.0, 0.0);
        self.peers.latency_jitter = finite_at_least(self.peers.latency_jitter, 0.0, 0.0);
        self.peers.spawn_interval = finite_at_least(self.peers.spawn_interval, 0.1, 0.1);
        self.peers.bot_think_interval = finite_at_least(self.peers.bot_think_interval, 0.01, 0.01);

        self.session.max_frame_delta = finite_at_least(
            self.session.max_frame_delta,
            0.001,
            defaults.session.max_frame_delta,
        );
        self
    }
}

pub(crate) fn load_config_file(path: &Path) -> Result<ArenaConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize::<_, ArenaConfig>(&mut deserializer).map_err(|error| {
        let field_path = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field_path,
            source: error.into_inner(),
        }
    })
}

/// Reads `ARENA_CONFIG` (if set) and applies env overrides. Never fails: every
/// problem is logged and replaced by defaults.
pub(crate) fn load_config_from_env() -> ArenaConfig {
    let config = match env::var(CONFIG_ENV_VAR) {
        Ok(path) => match load_config_file(Path::new(&path)) {
            Ok(config) => {
                info!(path = path.as_str(), "config_loaded");
                config
            }
            Err(error) => {
                warn!(error = %error, "config_load_failed; using defaults");
                ArenaConfig::default()
            }
        },
        Err(env::VarError::NotPresent) => ArenaConfig::default(),
        Err(error) => {
            warn!(
                env_var = CONFIG_ENV_VAR,
                error = %error,
                "unable to read config env var; using defaults"
            );
            ArenaConfig::default()
        }
    };

    apply_env_overrides(
        config,
        env::var(SEED_ENV_VAR).ok().as_deref(),
        env::var(ROOM_LINK_ENV_VAR).ok().as_deref(),
    )
    .sanitized()
}

fn apply_env_overrides(
    mut config: ArenaConfig,
    seed: Option<&str>,
    room_link: Option<&str>,
) -> ArenaConfig {
    if let Some(raw) = seed {
        match raw.trim().parse::<u64>() {
            Ok(seed) => config.session.seed = Some(seed),
            Err(_) => warn!(
                env_var = SEED_ENV_VAR,
                value = raw,
                "invalid seed env var value; falling back to config"
            ),
        }
    }
    if let Some(link) = room_link.map(str::trim).filter(|link| !link.is_empty()) {
        config.session.room_link = Some(link.to_string());
    }
    config
}
