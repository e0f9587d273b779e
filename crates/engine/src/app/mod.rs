mod clock;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use clock::{FrameClock, DEFAULT_MAX_FRAME_DELTA_SECONDS};
pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    screen_to_world, view_bounds_world, world_to_screen, BlendMode, DrawSurface, PixelSurface,
    Renderer, Rgba, ScreenRect, TextAlign, Viewport, WorldBounds,
};
pub use scene::{Camera2D, Scene, SceneCommand, Vec2};
