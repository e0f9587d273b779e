use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::{DrawSurface, PixelSurface, Viewport};

/// Owns the pixel buffer for one window and hands scenes a [`DrawSurface`] per frame.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width.max(1), height.max(1), surface)
    }

    /// Runs `draw` against the frame buffer, then presents it.
    ///
    /// A minimised window (zero-sized viewport) skips both drawing and presenting.
    pub(crate) fn render_frame<R>(
        &mut self,
        draw: impl FnOnce(&mut dyn DrawSurface) -> R,
    ) -> Result<Option<R>, Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(None);
        }
        let output = {
            let frame = self.pixels.frame_mut();
            let mut surface = PixelSurface::new(frame, self.viewport.width, self.viewport.height);
            draw(&mut surface)
        };
        self.pixels.render()?;
        Ok(Some(output))
    }
}
