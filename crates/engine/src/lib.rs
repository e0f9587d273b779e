//! Platform layer for the arena client: window, frame clock, input and a
//! write-only drawing surface backed by a software rasterizer.

pub mod app;

pub use app::{
    run_app, run_app_with_metrics, screen_to_world, view_bounds_world, world_to_screen, AppError,
    BlendMode, Camera2D, DrawSurface, FrameClock, InputAction, InputSnapshot, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, PixelSurface, Renderer, Rgba, Scene, SceneCommand,
    ScreenRect, TextAlign, Vec2, Viewport, WorldBounds, DEFAULT_MAX_FRAME_DELTA_SECONDS,
};
