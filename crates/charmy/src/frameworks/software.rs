use charmy_core::canvas::{Canvas, Color, Paint};
use charmy_core::framework::DrawingFramework;
use charmy_core::geometry::Rect;
use charmy_core::Result;

use super::SOFTWARE;

/// CPU rasterizer painting straight into the window canvas.
#[derive(Debug, Default)]
pub struct SoftwareDrawing;

impl DrawingFramework for SoftwareDrawing {
    fn name(&self) -> &str {
        SOFTWARE
    }

    fn draw_rect(&self, canvas: &mut Canvas, rect: Rect, radius: f32, paint: &Paint) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }

        let radius = radius.clamp(0.0, rect.width.min(rect.height) / 2.0);
        let border = paint.border.filter(|_| paint.border_width > 0.0);
        let inner = Rect::from_ltrb(
            rect.left() + paint.border_width,
            rect.top() + paint.border_width,
            rect.right() - paint.border_width,
            rect.bottom() - paint.border_width,
        );
        let inner_radius = (radius - paint.border_width).max(0.0);

        // Only pixels whose centre can fall inside the rect.
        let x0 = rect.left().max(0.0).floor() as u32;
        let y0 = rect.top().max(0.0).floor() as u32;
        let x1 = (rect.right().ceil().max(0.0) as u32).min(canvas.width());
        let y1 = (rect.bottom().ceil().max(0.0) as u32).min(canvas.height());

        for y in y0..y1 {
            for x in x0..x1 {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                if !inside_rounded(&rect, radius, px, py) {
                    continue;
                }

                let color = match border {
                    Some(border) if inner.is_empty() || !inside_rounded(&inner, inner_radius, px, py) => {
                        Some(border)
                    }
                    _ => paint.background,
                };

                if let Some(color) = color {
                    let under = canvas.pixel(x, y).unwrap_or(Color::TRANSPARENT);
                    canvas.put_pixel(x, y, blend(under, color));
                }
            }
        }
        Ok(())
    }
}

fn inside_rounded(rect: &Rect, radius: f32, x: f32, y: f32) -> bool {
    if !rect.contains(x, y) {
        return false;
    }
    if radius <= 0.0 {
        return true;
    }

    // Distance past the straight edges, non-zero only in the corner squares.
    let dx = (rect.left() + radius - x).max(x - (rect.right() - radius)).max(0.0);
    let dy = (rect.top() + radius - y).max(y - (rect.bottom() - radius)).max(0.0);
    dx * dx + dy * dy <= radius * radius
}

/// Source-over compositing of `top` onto `under`.
fn blend(under: Color, top: Color) -> Color {
    match top.a {
        255 => top,
        0 => under,
        alpha => {
            let a = alpha as u32;
            let mix = |t: u8, u: u8| ((t as u32 * a + u as u32 * (255 - a)) / 255) as u8;
            Color::rgba(
                mix(top.r, under.r),
                mix(top.g, under.g),
                mix(top.b, under.b),
                (a + under.a as u32 * (255 - a) / 255) as u8,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_fill() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        SoftwareDrawing
            .draw_rect(&mut canvas, Rect::new(1.0, 1.0, 2.0, 2.0), 0.0, &Paint::fill(Color::WHITE))
            .unwrap();

        assert_eq!(canvas.pixel(1, 1), Some(Color::WHITE));
        assert_eq!(canvas.pixel(2, 2), Some(Color::WHITE));
        assert_eq!(canvas.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(canvas.pixel(3, 3), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_rounded_corners_stay_clear() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        SoftwareDrawing
            .draw_rect(&mut canvas, Rect::new(0.0, 0.0, 20.0, 20.0), 8.0, &Paint::default())
            .unwrap();

        assert_eq!(canvas.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(canvas.pixel(10, 10), Some(Color::BLUE));
        assert_eq!(canvas.pixel(10, 0), Some(Color::BLUE));
    }

    #[test]
    fn test_border_surrounds_fill() {
        let mut canvas = Canvas::new(6, 6).unwrap();
        let paint = Paint::fill(Color::WHITE).with_border(Color::BLACK, 1.0);
        SoftwareDrawing
            .draw_rect(&mut canvas, Rect::new(0.0, 0.0, 6.0, 6.0), 0.0, &paint)
            .unwrap();

        assert_eq!(canvas.pixel(0, 3), Some(Color::BLACK));
        assert_eq!(canvas.pixel(5, 5), Some(Color::BLACK));
        assert_eq!(canvas.pixel(3, 3), Some(Color::WHITE));
    }

    #[test]
    fn test_drawing_is_clipped_to_canvas() {
        let mut canvas = Canvas::new(2, 2).unwrap();
        SoftwareDrawing
            .draw_rect(&mut canvas, Rect::new(-5.0, -5.0, 50.0, 50.0), 0.0, &Paint::default())
            .unwrap();

        assert!(canvas.pixels().iter().all(|c| *c == Color::BLUE));
    }

    #[test]
    fn test_translucent_fill_blends() {
        let mut canvas = Canvas::new(1, 1).unwrap();
        canvas.clear(Color::WHITE);
        SoftwareDrawing
            .draw_rect(
                &mut canvas,
                Rect::new(0.0, 0.0, 1.0, 1.0),
                0.0,
                &Paint::fill(Color::rgba(0, 0, 0, 0)),
            )
            .unwrap();

        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
    }
}
