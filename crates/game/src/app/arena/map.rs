use arena_engine::Vec2;
use rand::Rng;
use tracing::info;

use super::actor::{ActorKind, LootKind, ObstacleKind, StaticObject, WorldItem};
use super::collision::{point_blocked, Rect};
use super::registry::ActorRegistry;
use crate::app::config::WorldConfig;

const SPAWN_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MapSummary {
    pub(crate) trees: usize,
    pub(crate) buildings: usize,
    pub(crate) loot: usize,
}

/// Scatters trees over the whole map and clusters buildings around each town
/// centre, dropping loot beside some of them.
pub(crate) fn generate_map<R: Rng + ?Sized>(
    registry: &mut ActorRegistry,
    rng: &mut R,
    world: &WorldConfig,
) -> MapSummary {
    let mut summary = MapSummary::default();

    let tree = StaticObject {
        kind: ObstacleKind::Tree,
        half_extents: Vec2::new(world.tree_footprint * 0.5, world.tree_footprint * 0.5),
        visual_height: world.tree_height,
    };
    for _ in 0..world.tree_count {
        let position = Vec2::new(rng.gen::<f32>() * world.size, rng.gen::<f32>() * world.size);
        registry.spawn(position, ActorKind::Static(tree));
        summary.trees += 1;
    }

    let half = world.building_size * 0.5;
    let building = StaticObject {
        kind: ObstacleKind::Building,
        half_extents: Vec2::new(half, half),
        visual_height: world.building_height,
    };
    for [town_x, town_y] in &world.town_centers {
        for _ in 0..world.buildings_per_town {
            let position = Vec2::new(
                town_x + (rng.gen::<f32>() - 0.5) * world.building_spread * 2.0,
                town_y + (rng.gen::<f32>() - 0.5) * world.building_spread * 2.0,
            );
            registry.spawn(position, ActorKind::Static(building));
            summary.buildings += 1;

            if rng.gen::<f32>() < world.loot_chance {
                let loot = LootKind::POOL[rng.gen_range(0..LootKind::POOL.len())];
                registry.spawn(
                    position + Vec2::new(world.loot_offset, world.loot_offset),
                    ActorKind::Item(WorldItem { loot }),
                );
                summary.loot += 1;
            }
        }
    }

    info!(
        trees = summary.trees,
        buildings = summary.buildings,
        loot = summary.loot,
        "map_generated"
    );
    summary
}

/// Random point in `[margin, size - margin]` on both axes that is not inside an
/// obstacle. Falls back to the last candidate when every attempt is blocked.
pub(crate) fn pick_spawn_point<R: Rng + ?Sized>(
    rng: &mut R,
    obstacles: &[Rect],
    world_size: f32,
    margin: f32,
) -> Vec2 {
    let margin = margin.clamp(0.0, world_size * 0.5);
    let span = world_size - margin * 2.0;
    let mut candidate = Vec2::new(world_size * 0.5, world_size * 0.5);
    for _ in 0..SPAWN_ATTEMPTS {
        candidate = Vec2::new(
            margin + rng.gen::<f32>() * span,
            margin + rng.gen::<f32>() * span,
        );
        if !point_blocked(obstacles, candidate) {
            break;
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn default_map_matches_configured_counts() {
        let mut registry = ActorRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let world = WorldConfig::default();
        let summary = generate_map(&mut registry, &mut rng, &world);

        assert_eq!(summary.trees, 300);
        assert_eq!(summary.buildings, 18);
        assert!(summary.loot <= 18);
        assert_eq!(registry.len(), 300 + 18 + summary.loot);
    }

    #[test]
    fn same_seed_produces_identical_layout() {
        let layout = |seed| {
            let mut registry = ActorRegistry::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            generate_map(&mut registry, &mut rng, &WorldConfig::default());
            registry
                .actors()
                .iter()
                .map(|actor| actor.position)
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(11), layout(11));
    }

    #[test]
    fn buildings_stay_near_their_town() {
        let mut registry = ActorRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let world = WorldConfig {
            tree_count: 0,
            town_centers: vec![[1000.0, 1000.0]],
            loot_chance: 0.0,
            ..WorldConfig::default()
        };
        generate_map(&mut registry, &mut rng, &world);

        assert_eq!(registry.len(), 6);
        for actor in registry.actors() {
            assert!((actor.position.x - 1000.0).abs() <= world.building_spread);
            assert!((actor.position.y - 1000.0).abs() <= world.building_spread);
        }
    }

    #[test]
    fn loot_sits_at_fixed_offset_from_building_center() {
        let mut registry = ActorRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let world = WorldConfig {
            tree_count: 0,
            town_centers: vec![[800.0, 800.0]],
            buildings_per_town: 1,
            loot_chance: 1.0,
            ..WorldConfig::default()
        };
        let summary = generate_map(&mut registry, &mut rng, &world);
        assert_eq!((summary.buildings, summary.loot), (1, 1));

        let building = registry
            .actors()
            .iter()
            .find(|actor| matches!(actor.kind, ActorKind::Static(_)))
            .expect("building");
        let loot = registry
            .actors()
            .iter()
            .find(|actor| matches!(actor.kind, ActorKind::Item(_)))
            .expect("loot");
        let offset = loot.position - building.position;
        assert!((offset.x - 50.0).abs() < 1e-3);
        assert!((offset.y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn spawn_point_avoids_obstacles_and_respects_margin() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let obstacle = Rect::new(Vec2::new(500.0, 500.0), Vec2::new(2000.0, 2000.0));
        for _ in 0..20 {
            let point = pick_spawn_point(&mut rng, &[obstacle], 4000.0, 500.0);
            assert!(point.x >= 500.0 && point.x <= 3500.0);
            assert!(point.y >= 500.0 && point.y <= 3500.0);
            assert!(!obstacle.contains(point));
        }
    }
}
