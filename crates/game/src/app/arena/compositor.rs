use arena_engine::{
    view_bounds_world, world_to_screen, BlendMode, Camera2D, DrawSurface, Rgba, ScreenRect,
    TextAlign, Vec2, Viewport, WorldBounds,
};

use super::actor::{Actor, ActorKind, ObstacleKind, PlayerState, StaticObject, WorldItem};
use super::registry::ActorRegistry;
use super::zone::Zone;
use crate::app::config::WorldConfig;

const BACKGROUND: Rgba = Rgba::rgb(0x1a, 0x1e, 0x16);
const GRID_LINE: Rgba = Rgba::rgb(0x25, 0x2b, 0x20);
const GRID_LINE_WIDTH: f32 = 2.0;
const MIN_GRID_SPACING_PX: f32 = 4.0;

const SHADOW: Rgba = Rgba::rgba(0, 0, 0, 102);
const SHADOW_RADII: Vec2 = Vec2::new(20.0, 10.0);

const BODY_RADIUS: f32 = 15.0;
const LOCAL_BODY: Rgba = Rgba::rgb(0, 243, 255);
const REMOTE_BODY: Rgba = Rgba::rgb(255, 42, 109);
const GUN: Rgba = Rgba::rgb(0x33, 0x33, 0x33);
const HELMET: Rgba = Rgba::rgba(255, 255, 255, 51);
const MUZZLE_FLASH: Rgba = Rgba::rgb(255, 230, 120);
const DEAD_MARKER: Rgba = Rgba::rgba(120, 120, 120, 200);
const NAMEPLATE_OFFSET: f32 = 30.0;
const HEALTH_BAR_OFFSET: f32 = 25.0;
const HEALTH_BAR_SIZE: Vec2 = Vec2::new(30.0, 3.0);
const HEALTH_BACK: Rgba = Rgba::rgb(255, 0, 0);
const HEALTH_FILL: Rgba = Rgba::rgb(0, 255, 0);

const LOOT_LABEL: Rgba = Rgba::rgb(0xfc, 0xee, 0x0a);
const LOOT_GLOW: Rgba = Rgba::rgba(252, 238, 10, 77);
const LOOT_BOB_SPEED: f64 = 6.0;
const LOOT_BOB_HEIGHT: f32 = 5.0;

const TRUNK: Rgba = Rgba::rgb(0x3e, 0x27, 0x23);
const LEAVES_DARK: Rgba = Rgba::rgb(0x2e, 0x7d, 0x32);
const LEAVES_LIGHT: Rgba = Rgba::rgb(0x38, 0x8e, 0x3c);
const CANOPY_RADIUS: f32 = 40.0;

const ROOF: Rgba = Rgba::rgb(0x26, 0x32, 0x38);
const ROOF_EDGE: Rgba = Rgba::rgb(0x37, 0x47, 0x4f);
const WALL: Rgba = Rgba::rgb(0x1b, 0x23, 0x27);

const TRACER: Rgba = Rgba::rgb(0xff, 0xaa, 0x00);
const TRACER_SECONDS: f32 = 0.04;

const ZONE_EDGE: Rgba = Rgba::rgba(0, 243, 255, 128);
const ZONE_EDGE_WIDTH: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrawKind {
    Static,
    Item,
    Player,
    Projectile,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DrawItem {
    pub(crate) kind: DrawKind,
    pub(crate) depth: f32,
    /// Position in the registry's actor slice for this frame.
    pub(crate) index: usize,
}

/// Read-only snapshot of everything a frame draws.
pub(crate) struct FrameView<'a> {
    pub(crate) registry: &'a ActorRegistry,
    pub(crate) zone: &'a Zone,
    pub(crate) world: &'a WorldConfig,
    pub(crate) camera: Camera2D,
    pub(crate) time: f64,
}

/// Stable ascending sort: equal depths keep registry order.
pub(crate) fn sort_draw_items(items: &mut [DrawItem]) {
    items.sort_by(|a, b| a.depth.total_cmp(&b.depth));
}

fn depth_of(actor: &Actor) -> Option<(DrawKind, f32)> {
    match &actor.kind {
        ActorKind::Static(object) => Some((
            DrawKind::Static,
            actor.position.y + object.half_extents.y,
        )),
        ActorKind::Item(_) => Some((DrawKind::Item, actor.position.y)),
        ActorKind::Player(_) => Some((DrawKind::Player, actor.position.y)),
        ActorKind::Projectile(_) => Some((DrawKind::Projectile, actor.position.y)),
        ActorKind::Particle(_) => None,
    }
}

fn is_visible(actor: &Actor, bounds: &WorldBounds) -> bool {
    match &actor.kind {
        ActorKind::Static(object) => {
            let footprint = object.footprint(actor.position);
            let overhang = CANOPY_RADIUS;
            bounds.intersects_rect(
                Vec2::new(
                    footprint.min.x - overhang,
                    footprint.min.y - object.visual_height,
                ),
                Vec2::new(footprint.max.x + overhang, footprint.max.y),
            )
        }
        ActorKind::Player(_) => bounds.intersects_point_radius(actor.position, NAMEPLATE_OFFSET),
        ActorKind::Item(_) => bounds.intersects_point_radius(actor.position, 20.0),
        ActorKind::Projectile(_) | ActorKind::Particle(_) => {
            bounds.intersects_point_radius(actor.position, 10.0)
        }
    }
}

/// Rebuilds a depth-sorted draw list every frame from the registry. The
/// buffers are reused between frames; their contents are not.
#[derive(Debug, Default)]
pub(crate) struct DepthCompositor {
    draw_list: Vec<DrawItem>,
    particles: Vec<usize>,
}

impl DepthCompositor {
    pub(crate) fn build_draw_list(&mut self, view: &FrameView<'_>, viewport: Viewport) -> &[DrawItem] {
        self.draw_list.clear();
        self.particles.clear();
        let bounds = view_bounds_world(&view.camera, viewport, view.world.cull_margin);

        for (index, actor) in view.registry.actors().iter().enumerate() {
            if actor.removed || !is_visible(actor, &bounds) {
                continue;
            }
            match depth_of(actor) {
                Some((kind, depth)) => self.draw_list.push(DrawItem { kind, depth, index }),
                None => self.particles.push(index),
            }
        }
        sort_draw_items(&mut self.draw_list);
        &self.draw_list
    }

    pub(crate) fn render(&mut self, view: &FrameView<'_>, surface: &mut dyn DrawSurface) {
        let (width, height) = surface.size();
        if width == 0 || height == 0 {
            return;
        }
        let viewport = Viewport { width, height };
        self.build_draw_list(view, viewport);

        let pen = Pen {
            camera: view.camera,
            viewport,
            zoom: view.camera.effective_zoom(),
        };
        let actors = view.registry.actors();

        surface.set_alpha(1.0);
        surface.set_blend_mode(BlendMode::Normal);
        draw_ground(surface, &pen, view.world.grid_cell);

        for item in &self.draw_list {
            let actor = &actors[item.index];
            if item.kind == DrawKind::Player && actor.is_live_player() {
                surface.fill_ellipse(
                    pen.point(actor.position),
                    pen.radii(SHADOW_RADII),
                    SHADOW,
                );
            }
        }

        for item in &self.draw_list {
            let actor = &actors[item.index];
            match &actor.kind {
                ActorKind::Static(object) => draw_static(surface, &pen, actor.position, object),
                ActorKind::Item(loot) => draw_item(surface, &pen, actor.position, loot, view.time),
                ActorKind::Player(player) => draw_player(surface, &pen, actor.position, player),
                ActorKind::Projectile(_) => draw_tracer(surface, &pen, actor),
                ActorKind::Particle(_) => {}
            }
        }

        surface.set_blend_mode(BlendMode::Additive);
        for &index in &self.particles {
            let actor = &actors[index];
            if let ActorKind::Particle(particle) = &actor.kind {
                let lifted = actor.position - Vec2::new(0.0, actor.elevation);
                surface.fill_ellipse(
                    pen.point(lifted),
                    pen.radii(Vec2::new(particle.radius, particle.radius)),
                    particle.color.faded(particle.remaining_fraction()),
                );
            }
        }
        surface.set_blend_mode(BlendMode::Normal);

        let radius = view.zone.radius();
        surface.stroke_ellipse(
            pen.point(view.zone.center()),
            pen.radii(Vec2::new(radius, radius)),
            ZONE_EDGE,
            ZONE_EDGE_WIDTH,
        );
    }
}

struct Pen {
    camera: Camera2D,
    viewport: Viewport,
    zoom: f32,
}

impl Pen {
    fn point(&self, world: Vec2) -> Vec2 {
        world_to_screen(world, &self.camera, self.viewport)
    }

    fn radii(&self, radii: Vec2) -> Vec2 {
        radii * self.zoom
    }

    fn rect(&self, min: Vec2, size: Vec2) -> ScreenRect {
        let top_left = self.point(min);
        ScreenRect::new(
            top_left.x,
            top_left.y,
            size.x * self.zoom,
            size.y * self.zoom,
        )
    }
}

fn draw_ground(surface: &mut dyn DrawSurface, pen: &Pen, cell: f32) {
    surface.clear(BACKGROUND);
    if cell * pen.zoom < MIN_GRID_SPACING_PX {
        return;
    }

    let bounds = view_bounds_world(&pen.camera, pen.viewport, 0.0);
    let width = pen.viewport.width as f32;
    let height = pen.viewport.height as f32;

    let mut x = (bounds.min_x / cell).floor() * cell;
    while x <= bounds.max_x {
        let screen_x = pen.point(Vec2::new(x, 0.0)).x;
        surface.fill_rect(
            ScreenRect::new(screen_x - GRID_LINE_WIDTH * 0.5, 0.0, GRID_LINE_WIDTH, height),
            GRID_LINE,
        );
        x += cell;
    }
    let mut y = (bounds.min_y / cell).floor() * cell;
    while y <= bounds.max_y {
        let screen_y = pen.point(Vec2::new(0.0, y)).y;
        surface.fill_rect(
            ScreenRect::new(0.0, screen_y - GRID_LINE_WIDTH * 0.5, width, GRID_LINE_WIDTH),
            GRID_LINE,
        );
        y += cell;
    }
}

fn draw_static(surface: &mut dyn DrawSurface, pen: &Pen, position: Vec2, object: &StaticObject) {
    let footprint = object.footprint(position);
    match object.kind {
        ObstacleKind::Tree => {
            let base = Vec2::new(position.x, footprint.max.y);
            let height = object.visual_height;
            surface.fill_rect(
                pen.rect(
                    Vec2::new(base.x - 8.0, base.y - height / 3.0),
                    Vec2::new(16.0, height / 3.0),
                ),
                TRUNK,
            );
            surface.fill_ellipse(
                pen.point(Vec2::new(base.x, base.y - height * 2.0 / 3.0)),
                pen.radii(Vec2::new(CANOPY_RADIUS, CANOPY_RADIUS)),
                LEAVES_DARK,
            );
            surface.fill_ellipse(
                pen.point(Vec2::new(base.x - 10.0, base.y - height * 0.75)),
                pen.radii(Vec2::new(30.0, 30.0)),
                LEAVES_LIGHT,
            );
        }
        ObstacleKind::Building => {
            let size = footprint.max - footprint.min;
            let lift = object.visual_height;
            surface.fill_rect(
                pen.rect(
                    Vec2::new(footprint.min.x, footprint.max.y - lift),
                    Vec2::new(size.x, lift),
                ),
                WALL,
            );
            let roof = pen.rect(footprint.min - Vec2::new(0.0, lift), size);
            surface.fill_rect(roof, ROOF);
            surface.stroke_rect(roof, ROOF_EDGE, 5.0 * pen.zoom);
        }
    }
}

fn draw_item(surface: &mut dyn DrawSurface, pen: &Pen, position: Vec2, item: &WorldItem, time: f64) {
    let center = pen.point(position);
    surface.fill_ellipse(center, pen.radii(Vec2::new(10.0, 10.0)), LOOT_GLOW);
    let bob = ((time * LOOT_BOB_SPEED).sin() as f32) * LOOT_BOB_HEIGHT;
    surface.text(
        pen.point(position + Vec2::new(0.0, -10.0 + bob)),
        item.loot.label(),
        TextAlign::Center,
        LOOT_LABEL,
    );
}

fn rotate(offset: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(
        offset.x * cos - offset.y * sin,
        offset.x * sin + offset.y * cos,
    )
}

fn draw_player(surface: &mut dyn DrawSurface, pen: &Pen, position: Vec2, player: &PlayerState) {
    let center = pen.point(position);
    if !player.is_alive() {
        let arm = 10.0 * pen.zoom;
        let width = 3.0 * pen.zoom;
        surface.stroke_polyline(
            &[center + Vec2::new(-arm, -arm), center + Vec2::new(arm, arm)],
            DEAD_MARKER,
            width,
        );
        surface.stroke_polyline(
            &[center + Vec2::new(arm, -arm), center + Vec2::new(-arm, arm)],
            DEAD_MARKER,
            width,
        );
        return;
    }

    let body = if player.is_local() {
        LOCAL_BODY
    } else {
        REMOTE_BODY
    };
    surface.fill_ellipse(center, pen.radii(Vec2::new(BODY_RADIUS, BODY_RADIUS)), body);

    let barrel = [
        Vec2::new(10.0, -5.0),
        Vec2::new(35.0, -5.0),
        Vec2::new(35.0, 5.0),
        Vec2::new(10.0, 5.0),
    ]
    .map(|corner| center + rotate(corner, player.facing) * pen.zoom);
    surface.fill_polygon(&barrel, GUN);

    let forward = Vec2::from_angle(player.facing) * pen.zoom;
    surface.fill_ellipse(center + forward * 3.0, pen.radii(Vec2::new(8.0, 8.0)), HELMET);
    if player.muzzle_flash {
        surface.fill_ellipse(
            center + forward * 40.0,
            pen.radii(Vec2::new(6.0, 6.0)),
            MUZZLE_FLASH,
        );
    }

    if !player.is_local() {
        surface.text(
            pen.point(position - Vec2::new(0.0, NAMEPLATE_OFFSET)),
            &player.name,
            TextAlign::Center,
            Rgba::WHITE,
        );
        let bar_origin = position - Vec2::new(HEALTH_BAR_SIZE.x * 0.5, HEALTH_BAR_OFFSET);
        surface.fill_rect(pen.rect(bar_origin, HEALTH_BAR_SIZE), HEALTH_BACK);
        surface.fill_rect(
            pen.rect(
                bar_origin,
                Vec2::new(HEALTH_BAR_SIZE.x * player.health_fraction(), HEALTH_BAR_SIZE.y),
            ),
            HEALTH_FILL,
        );
    }
}

fn draw_tracer(surface: &mut dyn DrawSurface, pen: &Pen, actor: &Actor) {
    let tail = actor.position - actor.velocity * TRACER_SECONDS;
    surface.stroke_polyline(
        &[pen.point(actor.position), pen.point(tail)],
        TRACER,
        2.0 * pen.zoom,
    );
}
