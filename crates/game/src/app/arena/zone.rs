use arena_engine::Vec2;

use crate::app::config::ZoneConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ZonePhase {
    Countdown,
    Shrinking,
    Contracted,
}

impl ZonePhase {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ZonePhase::Countdown => "countdown",
            ZonePhase::Shrinking => "shrinking",
            ZonePhase::Contracted => "contracted",
        }
    }
}

/// Shrinking safe circle. The radius never grows and never drops below the
/// target.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Zone {
    center: Vec2,
    radius: f32,
    target_radius: f32,
    countdown: f32,
    shrink_rate: f32,
    damage_per_second: f32,
}

impl Zone {
    pub(crate) fn new(config: &ZoneConfig) -> Self {
        let radius = config.radius.max(0.0);
        Self {
            center: Vec2::new(config.center[0], config.center[1]),
            radius,
            target_radius: config.target_radius.clamp(0.0, radius),
            countdown: config.countdown.max(0.0),
            shrink_rate: config.shrink_rate.max(0.0),
            damage_per_second: config.damage_per_second.max(0.0),
        }
    }

    pub(crate) fn center(&self) -> Vec2 {
        self.center
    }

    pub(crate) fn radius(&self) -> f32 {
        self.radius
    }

    pub(crate) fn target_radius(&self) -> f32 {
        self.target_radius
    }

    pub(crate) fn countdown(&self) -> f32 {
        self.countdown
    }

    pub(crate) fn phase(&self) -> ZonePhase {
        if self.countdown > 0.0 {
            ZonePhase::Countdown
        } else if self.radius > self.target_radius {
            ZonePhase::Shrinking
        } else {
            ZonePhase::Contracted
        }
    }

    /// Advances the countdown and shrink. Returns the new phase when it changed.
    pub(crate) fn tick(&mut self, dt: f32) -> Option<ZonePhase> {
        let before = self.phase();
        let dt = dt.max(0.0);

        self.countdown = (self.countdown - dt).max(0.0);
        if self.countdown <= 0.0 && self.radius > self.target_radius {
            self.radius = (self.radius - self.shrink_rate * dt).max(self.target_radius);
        }

        let after = self.phase();
        (after != before).then_some(after)
    }

    pub(crate) fn is_outside(&self, point: Vec2) -> bool {
        point.distance(self.center) > self.radius
    }

    /// Damage owed for standing at `point` over `dt` seconds. Applies in every
    /// phase, including after the circle has fully contracted.
    pub(crate) fn damage_for(&self, point: Vec2, dt: f32) -> f32 {
        if self.is_outside(point) {
            self.damage_per_second * dt.max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(radius: f32, target_radius: f32, countdown: f32) -> ZoneConfig {
        ZoneConfig {
            center: [2000.0, 2000.0],
            radius,
            target_radius,
            countdown,
            shrink_rate: 15.0,
            damage_per_second: 10.0,
        }
    }

    #[test]
    fn countdown_then_shrink_then_contracted() {
        let mut zone = Zone::new(&config(530.0, 500.0, 1.0));
        assert_eq!(zone.phase(), ZonePhase::Countdown);

        assert_eq!(zone.tick(0.5), None);
        assert_eq!(zone.radius(), 530.0);
        assert_eq!(zone.tick(0.5), Some(ZonePhase::Shrinking));
        // The tick that ends the countdown already shrinks.
        assert_eq!(zone.radius(), 530.0 - 7.5);

        assert_eq!(zone.tick(1.0), None);
        assert_eq!(zone.radius(), 530.0 - 22.5);
        assert_eq!(zone.tick(1.0), Some(ZonePhase::Contracted));
        assert_eq!(zone.radius(), 500.0);
    }

    #[test]
    fn radius_is_monotonic_and_floored_at_target() {
        let mut zone = Zone::new(&config(600.0, 500.0, 0.0));
        let mut previous = zone.radius();
        for _ in 0..1000 {
            zone.tick(0.1);
            assert!(zone.radius() <= previous);
            assert!(zone.radius() >= zone.target_radius());
            previous = zone.radius();
        }
        assert_eq!(zone.phase(), ZonePhase::Contracted);
    }

    #[test]
    fn target_above_radius_is_clamped_at_construction() {
        let zone = Zone::new(&config(300.0, 900.0, 0.0));
        assert_eq!(zone.target_radius(), 300.0);
        assert_eq!(zone.phase(), ZonePhase::Contracted);
    }

    #[test]
    fn damage_accumulates_outside_contracted_circle() {
        let zone = Zone::new(&config(500.0, 500.0, 0.0));
        let outside = Vec2::new(2600.0, 2000.0);
        let total: f32 = (0..20).map(|_| zone.damage_for(outside, 0.1)).sum();
        assert!((total - 20.0).abs() < 1e-3);
        assert_eq!(zone.damage_for(Vec2::new(2400.0, 2000.0), 0.1), 0.0);
    }

    #[test]
    fn boundary_point_is_inside() {
        let zone = Zone::new(&config(500.0, 100.0, 10.0));
        assert!(!zone.is_outside(Vec2::new(2500.0, 2000.0)));
        assert!(zone.is_outside(Vec2::new(2500.1, 2000.0)));
    }
}
