mod glyphs;
mod raster;
mod renderer;
mod surface;
mod transform;

pub use raster::PixelSurface;
pub use renderer::Renderer;
pub use surface::{BlendMode, DrawSurface, Rgba, ScreenRect, TextAlign};
pub use transform::{screen_to_world, view_bounds_world, world_to_screen, Viewport, WorldBounds};
