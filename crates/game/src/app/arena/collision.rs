use arena_engine::Vec2;

/// Axis-aligned footprint on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub(crate) min: Vec2,
    pub(crate) max: Vec2,
}

impl Rect {
    pub(crate) fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Strict interior test; a point resting on an edge is not blocked.
    pub(crate) fn contains(&self, point: Vec2) -> bool {
        point.x > self.min.x && point.x < self.max.x && point.y > self.min.y && point.y < self.max.y
    }
}

pub(crate) fn point_blocked(obstacles: &[Rect], point: Vec2) -> bool {
    obstacles.iter().any(|rect| rect.contains(point))
}

/// Moves `position` by `delta` one axis at a time: x is tried first, then y
/// from the possibly-updated x. A blocked axis keeps its old coordinate, which
/// lets actors slide along walls.
pub(crate) fn resolve_axis_move(obstacles: &[Rect], position: Vec2, delta: Vec2) -> Vec2 {
    let mut resolved = position;

    let candidate_x = Vec2::new(position.x + delta.x, position.y);
    if !point_blocked(obstacles, candidate_x) {
        resolved.x = candidate_x.x;
    }

    let candidate_y = Vec2::new(resolved.x, position.y + delta.y);
    if !point_blocked(obstacles, candidate_y) {
        resolved.y = candidate_y.y;
    }

    resolved
}

pub(crate) fn clamp_to_world(position: Vec2, world_size: f32) -> Vec2 {
    Vec2::new(
        position.x.clamp(0.0, world_size),
        position.y.clamp(0.0, world_size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Rect {
        Rect::new(Vec2::new(100.0, 0.0), Vec2::new(200.0, 1000.0))
    }

    #[test]
    fn blocked_x_axis_still_allows_y_motion() {
        let resolved = resolve_axis_move(&[wall()], Vec2::new(90.0, 50.0), Vec2::new(20.0, 30.0));
        assert_eq!(resolved, Vec2::new(90.0, 80.0));
    }

    #[test]
    fn blocked_y_axis_still_allows_x_motion() {
        let floor = Rect::new(Vec2::new(0.0, 100.0), Vec2::new(1000.0, 200.0));
        let resolved = resolve_axis_move(&[floor], Vec2::new(50.0, 90.0), Vec2::new(25.0, 20.0));
        assert_eq!(resolved, Vec2::new(75.0, 90.0));
    }

    #[test]
    fn y_check_uses_updated_x() {
        // Moving right clears the block's column, so the y step is checked
        // from the new x and succeeds.
        let block = Rect::new(Vec2::new(0.0, 100.0), Vec2::new(60.0, 200.0));
        let resolved = resolve_axis_move(&[block], Vec2::new(50.0, 90.0), Vec2::new(20.0, 20.0));
        assert_eq!(resolved, Vec2::new(70.0, 110.0));
    }

    #[test]
    fn edge_contact_is_not_blocked() {
        assert!(!wall().contains(Vec2::new(100.0, 10.0)));
        assert!(wall().contains(Vec2::new(100.5, 10.0)));
    }

    #[test]
    fn clamp_keeps_positions_inside_world() {
        assert_eq!(
            clamp_to_world(Vec2::new(-5.0, 4100.0), 4000.0),
            Vec2::new(0.0, 4000.0)
        );
    }

    #[test]
    fn free_move_applies_full_delta() {
        let resolved = resolve_axis_move(&[], Vec2::new(1.0, 2.0), Vec2::new(3.0, -4.0));
        assert_eq!(resolved, Vec2::new(4.0, -2.0));
    }
}
