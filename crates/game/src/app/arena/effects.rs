use std::f32::consts::TAU;

use arena_engine::{Rgba, Vec2};
use rand::Rng;

use super::actor::ParticleState;
use super::registry::ActorRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    MuzzleSparks,
    Impact,
    DeathBurst,
}

struct BurstProfile {
    count: u32,
    color: Rgba,
    min_speed: f32,
    max_speed: f32,
    max_lift: f32,
    min_life: f32,
    max_life: f32,
    radius: f32,
}

impl Effect {
    fn profile(self) -> BurstProfile {
        match self {
            Effect::MuzzleSparks => BurstProfile {
                count: 3,
                color: Rgba::rgb(255, 200, 80),
                min_speed: 60.0,
                max_speed: 180.0,
                max_lift: 60.0,
                min_life: 0.1,
                max_life: 0.25,
                radius: 2.0,
            },
            Effect::Impact => BurstProfile {
                count: 5,
                color: Rgba::rgb(255, 170, 0),
                min_speed: 40.0,
                max_speed: 160.0,
                max_lift: 120.0,
                min_life: 0.2,
                max_life: 0.5,
                radius: 2.5,
            },
            Effect::DeathBurst => BurstProfile {
                count: 20,
                color: Rgba::rgb(255, 42, 109),
                min_speed: 80.0,
                max_speed: 260.0,
                max_lift: 220.0,
                min_life: 0.5,
                max_life: 1.2,
                radius: 3.5,
            },
        }
    }
}

/// Scatters short-lived particles around `origin`. They are simulated like any
/// other actor but drawn in their own additive pass.
pub(crate) fn spawn_effect<R: Rng + ?Sized>(
    registry: &mut ActorRegistry,
    rng: &mut R,
    effect: Effect,
    origin: Vec2,
) -> u32 {
    let profile = effect.profile();
    for _ in 0..profile.count {
        let heading = rng.gen::<f32>() * TAU;
        let speed = lerp(profile.min_speed, profile.max_speed, rng.gen::<f32>());
        let lift = profile.max_lift * rng.gen::<f32>();
        let life = lerp(profile.min_life, profile.max_life, rng.gen::<f32>());
        registry.spawn_particle(
            origin,
            Vec2::from_angle(heading) * speed,
            1.0,
            ParticleState {
                life,
                max_life: life,
                color: profile.color,
                vertical_velocity: lift,
                radius: profile.radius,
            },
        );
    }
    profile.count
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::app::arena::actor::ActorKind;

    #[test]
    fn death_burst_spawns_twenty_live_particles() {
        let mut registry = ActorRegistry::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let spawned = spawn_effect(&mut registry, &mut rng, Effect::DeathBurst, Vec2::new(5.0, 5.0));

        assert_eq!(spawned, 20);
        assert_eq!(registry.len(), 20);
        assert!(registry.actors().iter().all(|actor| {
            matches!(actor.kind, ActorKind::Particle(particle)
                if particle.life > 0.0 && particle.life <= 1.2)
        }));
    }

    #[test]
    fn same_seed_gives_same_burst() {
        let burst = |seed| {
            let mut registry = ActorRegistry::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            spawn_effect(&mut registry, &mut rng, Effect::Impact, Vec2::ZERO);
            registry
                .actors()
                .iter()
                .map(|actor| actor.velocity)
                .collect::<Vec<_>>()
        };
        assert_eq!(burst(9), burst(9));
        assert_ne!(burst(9), burst(10));
    }
}
