use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned world-space rectangle covered by the camera, padded on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl WorldBounds {
    pub fn intersects_rect(&self, min: Vec2, max: Vec2) -> bool {
        max.x >= self.min_x && min.x <= self.max_x && max.y >= self.min_y && min.y <= self.max_y
    }

    pub fn intersects_point_radius(&self, center: Vec2, radius: f32) -> bool {
        let radius = radius.max(0.0);
        self.intersects_rect(
            Vec2::new(center.x - radius, center.y - radius),
            Vec2::new(center.x + radius, center.y + radius),
        )
    }
}

/// World space is y-down, so screen and world axes agree in direction.
pub fn world_to_screen(world: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2 {
        x: (world.x - camera.position.x) * zoom + viewport.width as f32 * 0.5,
        y: (world.y - camera.position.y) * zoom + viewport.height as f32 * 0.5,
    }
}

pub fn screen_to_world(screen: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2 {
        x: (screen.x - viewport.width as f32 * 0.5) / zoom + camera.position.x,
        y: (screen.y - viewport.height as f32 * 0.5) / zoom + camera.position.y,
    }
}

pub fn view_bounds_world(camera: &Camera2D, viewport: Viewport, padding_world: f32) -> WorldBounds {
    let zoom = camera.effective_zoom();
    let half_w = viewport.width as f32 / (2.0 * zoom);
    let half_h = viewport.height as f32 / (2.0 * zoom);
    let padding = padding_world.max(0.0);

    WorldBounds {
        min_x: camera.position.x - half_w - padding,
        max_x: camera.position.x + half_w + padding,
        min_y: camera.position.y - half_h - padding,
        max_y: camera.position.y + half_h + padding,
    }
}
