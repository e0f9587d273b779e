use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same colour with its alpha scaled by `factor` (clamped to `0..=1`).
    pub fn faded(self, factor: f32) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            a: (self.a as f32 * factor).round() as u8,
            ..self
        }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center.x - width * 0.5, center.y - height * 0.5, width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

/// Write-only drawing capability. Callers never read pixels back.
///
/// `set_alpha` and `set_blend_mode` are sticky until changed again.
pub trait DrawSurface {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, color: Rgba);
    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba);
    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba, line_width: f32);
    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, color: Rgba);
    fn stroke_ellipse(&mut self, center: Vec2, radii: Vec2, color: Rgba, line_width: f32);
    fn stroke_polyline(&mut self, points: &[Vec2], color: Rgba, line_width: f32);
    fn fill_polygon(&mut self, points: &[Vec2], color: Rgba);
    fn text(&mut self, anchor: Vec2, text: &str, align: TextAlign, color: Rgba);
    fn set_alpha(&mut self, alpha: f32);
    fn set_blend_mode(&mut self, mode: BlendMode);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faded_scales_alpha_and_clamps() {
        let color = Rgba::rgba(10, 20, 30, 200);
        assert_eq!(color.faded(0.5).a, 100);
        assert_eq!(color.faded(3.0).a, 200);
        assert_eq!(color.faded(f32::NAN).a, 0);
        assert_eq!(color.faded(0.5).r, 10);
    }

    #[test]
    fn centered_rect_spans_both_sides_of_center() {
        let rect = ScreenRect::centered(Vec2::new(10.0, 10.0), 4.0, 2.0);
        assert_eq!(rect, ScreenRect::new(8.0, 9.0, 4.0, 2.0));
    }
}
