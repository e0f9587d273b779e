use std::ops::Range;

use crate::app::Vec2;

use super::glyphs::{glyph_for, text_width_px, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, TEXT_SCALE};
use super::surface::{BlendMode, DrawSurface, Rgba, ScreenRect, TextAlign};

/// Software rasterizer over a tightly packed RGBA8 frame.
///
/// Coverage is point-sampled at pixel centres; everything is clipped to the frame.
pub struct PixelSurface<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    alpha: f32,
    blend_mode: BlendMode,
    crossings: Vec<f32>,
}

impl<'a> PixelSurface<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
            crossings: Vec::new(),
        }
    }

    fn row_range(&self, top: f32, bottom: f32) -> Range<i32> {
        let start = ((top - 0.5).ceil() as i32).max(0);
        let end = ((bottom - 0.5).ceil() as i32).min(self.height as i32);
        start..end.max(start)
    }

    fn fill_span(&mut self, y: i32, x_start: f32, x_end: f32, color: Rgba) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let first = ((x_start - 0.5).ceil() as i32).max(0);
        let end = ((x_end - 0.5).ceil() as i32).min(self.width as i32);
        for x in first..end {
            self.blend_pixel(x, y, color);
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 {
            return;
        }
        let x = x as usize;
        let y = y as usize;
        let Some(pixel_offset) = y
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x))
        else {
            return;
        };
        let Some(byte_offset) = pixel_offset.checked_mul(4) else {
            return;
        };
        let Some(end) = byte_offset.checked_add(4) else {
            return;
        };
        if end > self.frame.len() {
            return;
        }

        let coverage = (color.a as f32 / 255.0) * self.alpha;
        if coverage <= 0.0 {
            return;
        }
        let source = [color.r, color.g, color.b];
        let destination = &mut self.frame[byte_offset..end];
        for channel in 0..3 {
            let dst = destination[channel] as f32;
            let src = source[channel] as f32;
            let blended = match self.blend_mode {
                BlendMode::Normal => src * coverage + dst * (1.0 - coverage),
                BlendMode::Additive => dst + src * coverage,
            };
            destination[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        destination[3] = 255;
    }
}

fn ellipse_half_width(center_y: f32, radii: Vec2, row_center_y: f32) -> Option<f32> {
    if radii.x <= 0.0 || radii.y <= 0.0 {
        return None;
    }
    let dy = (row_center_y - center_y) / radii.y;
    if dy.abs() > 1.0 {
        return None;
    }
    Some(radii.x * (1.0 - dy * dy).sqrt())
}

impl DrawSurface for PixelSurface<'_> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        let color = color.to_array();
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        for y in self.row_range(rect.y, rect.y + rect.height) {
            self.fill_span(y, rect.x, rect.x + rect.width, color);
        }
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba, line_width: f32) {
        if line_width <= 0.0 {
            return;
        }
        let half = line_width * 0.5;
        let left = rect.x - half;
        let top = rect.y - half;
        let outer_width = rect.width + line_width;
        let inner_height = (rect.height - line_width).max(0.0);
        self.fill_rect(ScreenRect::new(left, top, outer_width, line_width), color);
        self.fill_rect(
            ScreenRect::new(left, rect.y + rect.height - half, outer_width, line_width),
            color,
        );
        self.fill_rect(
            ScreenRect::new(left, rect.y + half, line_width, inner_height),
            color,
        );
        self.fill_rect(
            ScreenRect::new(rect.x + rect.width - half, rect.y + half, line_width, inner_height),
            color,
        );
    }

    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, color: Rgba) {
        for y in self.row_range(center.y - radii.y, center.y + radii.y) {
            if let Some(half) = ellipse_half_width(center.y, radii, y as f32 + 0.5) {
                self.fill_span(y, center.x - half, center.x + half, color);
            }
        }
    }

    fn stroke_ellipse(&mut self, center: Vec2, radii: Vec2, color: Rgba, line_width: f32) {
        if line_width <= 0.0 {
            return;
        }
        let half_line = line_width * 0.5;
        let outer = Vec2::new(radii.x + half_line, radii.y + half_line);
        let inner = Vec2::new(radii.x - half_line, radii.y - half_line);
        // Only rows on screen are visited, so very large rings stay cheap.
        for y in self.row_range(center.y - outer.y, center.y + outer.y) {
            let row_center_y = y as f32 + 0.5;
            let Some(outer_half) = ellipse_half_width(center.y, outer, row_center_y) else {
                continue;
            };
            match ellipse_half_width(center.y, inner, row_center_y) {
                Some(inner_half) => {
                    self.fill_span(y, center.x - outer_half, center.x - inner_half, color);
                    self.fill_span(y, center.x + inner_half, center.x + outer_half, color);
                }
                None => self.fill_span(y, center.x - outer_half, center.x + outer_half, color),
            }
        }
    }

    fn stroke_polyline(&mut self, points: &[Vec2], color: Rgba, line_width: f32) {
        let half = line_width.max(1.0) * 0.5;
        for segment in points.windows(2) {
            let (start, end) = (segment[0], segment[1]);
            let direction = (end - start).normalize_or_zero();
            if direction == Vec2::ZERO {
                self.fill_rect(ScreenRect::centered(start, half * 2.0, half * 2.0), color);
                continue;
            }
            let normal = Vec2::new(-direction.y, direction.x) * half;
            self.fill_polygon(
                &[start + normal, end + normal, end - normal, start - normal],
                color,
            );
        }
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        let (min_y, max_y) = points
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), point| {
                (lo.min(point.y), hi.max(point.y))
            });
        if !min_y.is_finite() || !max_y.is_finite() {
            return;
        }

        let mut crossings = std::mem::take(&mut self.crossings);
        for y in self.row_range(min_y, max_y) {
            let row_center_y = y as f32 + 0.5;
            crossings.clear();
            for (index, a) in points.iter().enumerate() {
                let b = points[(index + 1) % points.len()];
                let spans_row = (a.y <= row_center_y && b.y > row_center_y)
                    || (b.y <= row_center_y && a.y > row_center_y);
                if spans_row {
                    let t = (row_center_y - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
            crossings.sort_by(|left, right| left.total_cmp(right));
            for pair in crossings.chunks_exact(2) {
                self.fill_span(y, pair[0], pair[1], color);
            }
        }
        self.crossings = crossings;
    }

    fn text(&mut self, anchor: Vec2, text: &str, align: TextAlign, color: Rgba) {
        let width = text_width_px(text) as f32;
        let left = match align {
            TextAlign::Left => anchor.x,
            TextAlign::Center => anchor.x - width * 0.5,
            TextAlign::Right => anchor.x - width,
        }
        .round();
        let top = (anchor.y - (GLYPH_HEIGHT * TEXT_SCALE) as f32 * 0.5).round();
        let scale = TEXT_SCALE as f32;

        for (index, ch) in text.chars().enumerate() {
            let glyph = glyph_for(ch);
            let glyph_x = left + (index as i32 * GLYPH_ADVANCE) as f32;
            for (row_index, bits) in glyph.rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    let mask = 1u8 << (GLYPH_WIDTH - 1 - col);
                    if bits & mask == 0 {
                        continue;
                    }
                    self.fill_rect(
                        ScreenRect::new(
                            glyph_x + col as f32 * scale,
                            top + row_index as f32 * scale,
                            scale,
                            scale,
                        ),
                        color,
                    );
                }
            }
        }
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }
}
