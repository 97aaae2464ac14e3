//! Small raster previews of a scene, stored alongside saved documents.
//!
//! Objects are drawn as flat footprints on white: filled rectangles, discs,
//! stroked polylines, bars for text lines and a grey placeholder for images.
//! Rotation is not applied; each object is drawn at its bounding box.

use crate::shapes::{ObjectKind, Rgba, SceneObject, point_to_segment_dist};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Affine, Point, Rect};
use thiserror::Error;

pub const DEFAULT_THUMBNAIL_SCALE: f64 = 0.2;
pub const DEFAULT_THUMBNAIL_MAX_SIDE: u32 = 480;

/// World-space margin around the scene bounds.
const MARGIN: f64 = 20.0;
const IMAGE_PLACEHOLDER: Rgba = Rgba::rgb(0xd1, 0xd5, 0xdb);

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// An encoded preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

/// Rasterize `objects` at `scale`, shrinking further so neither side exceeds
/// `max_side` pixels.
pub fn render_thumbnail(objects: &[SceneObject], scale: f64, max_side: u32) -> Result<Thumbnail, ThumbnailError> {
    let mut scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        DEFAULT_THUMBNAIL_SCALE
    };
    let max_side = max_side.max(1) as f64;

    let world = objects
        .iter()
        .map(|o| o.bounds())
        .reduce(|a, b| a.union(b))
        .map(|r| r.inflate(MARGIN, MARGIN))
        .unwrap_or(Rect::ZERO);

    let longest = world.width().max(world.height()) * scale;
    if longest > max_side {
        scale *= max_side / longest;
    }
    let width = ((world.width() * scale).round() as u32).max(1);
    let height = ((world.height() * scale).round() as u32).max(1);

    let mut raster = Raster::new(width, height);
    let to_pixels = Affine::scale(scale) * Affine::translate(-world.origin().to_vec2());
    for object in objects {
        raster.draw_object(object, to_pixels, scale);
    }

    let png_data = raster.encode()?;
    Ok(Thumbnail {
        width,
        height,
        data_url: format!("data:image/png;base64,{}", STANDARD.encode(&png_data)),
    })
}

/// RGBA8 pixel buffer.
struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0xff; width as usize * height as usize * 4],
        }
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba) {
        if color.a == 0 || x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let alpha = color.a as f64 / 255.0;
        for (offset, channel) in [color.r, color.g, color.b].into_iter().enumerate() {
            let dst = self.pixels[i + offset] as f64;
            self.pixels[i + offset] = (channel as f64 * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        self.pixels[i + 3] = 0xff;
    }

    /// Visit pixel centers inside `area`, clipped to the raster.
    fn for_each_pixel(&mut self, area: Rect, color: Rgba, inside: impl Fn(Point) -> bool) {
        let x0 = area.x0.floor().max(0.0) as u32;
        let y0 = area.y0.floor().max(0.0) as u32;
        let x1 = (area.x1.ceil().max(0.0) as u32).min(self.width);
        let y1 = (area.y1.ceil().max(0.0) as u32).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                if inside(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        // Keep tiny objects visible as at least one pixel.
        let rect = if rect.width() < 1.0 || rect.height() < 1.0 {
            let c = rect.center();
            Rect::new(c.x - 0.5, c.y - 0.5, c.x + 0.5, c.y + 0.5).union(rect)
        } else {
            rect
        };
        self.for_each_pixel(rect, color, |p| rect.contains(p));
    }

    fn fill_disc(&mut self, center: Point, radius: f64, color: Rgba) {
        let radius = radius.max(0.5);
        let area = Rect::from_center_size(center, (radius * 2.0, radius * 2.0));
        self.for_each_pixel(area, color, |p| p.distance(center) <= radius);
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Rgba) {
        let half = (width / 2.0).max(0.5);
        if let [only] = points {
            self.fill_disc(*only, half, color);
            return;
        }
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let area = Rect::from_points(a, b).inflate(half, half);
            self.for_each_pixel(area, color, |p| point_to_segment_dist(p, a, b) <= half);
        }
    }

    fn draw_object(&mut self, object: &SceneObject, to_pixels: Affine, scale: f64) {
        let bounds = to_pixels.transform_rect_bbox(object.bounds());
        let style = &object.style;
        match &object.kind {
            ObjectKind::Rectangle => {
                if let Some(fill) = style.fill {
                    self.fill_rect(bounds, fill);
                }
                if let Some(stroke) = style.stroke {
                    let corners = [
                        Point::new(bounds.x0, bounds.y0),
                        Point::new(bounds.x1, bounds.y0),
                        Point::new(bounds.x1, bounds.y1),
                        Point::new(bounds.x0, bounds.y1),
                        Point::new(bounds.x0, bounds.y0),
                    ];
                    self.stroke_polyline(&corners, style.stroke_width * scale, stroke);
                }
            }
            ObjectKind::Circle { .. } => {
                let radius = bounds.width().min(bounds.height()) / 2.0;
                if let Some(fill) = style.fill {
                    self.fill_disc(bounds.center(), radius, fill);
                }
            }
            ObjectKind::Image(_) => self.fill_rect(bounds, IMAGE_PLACEHOLDER),
            ObjectKind::FreehandPath(path) => {
                // Eraser strokes reveal the white background.
                let color = if path.is_eraser() {
                    Rgba::white()
                } else {
                    style.stroke.unwrap_or(Rgba::black())
                };
                let points: Vec<Point> = path.points.iter().map(|p| to_pixels * *p).collect();
                self.stroke_polyline(&points, style.stroke_width * scale, color);
            }
            ObjectKind::TextBox(meta) => {
                let color = style.fill.unwrap_or(Rgba::black());
                let line_height = meta.font_size * 1.2 * scale;
                let bar = meta.font_size * 0.6 * scale;
                for (i, line) in meta.text.lines().enumerate() {
                    let chars = line.chars().count() as f64;
                    if chars == 0.0 {
                        continue;
                    }
                    let top = bounds.y0 + i as f64 * line_height + (line_height - bar) / 2.0;
                    let width = (chars * meta.font_size * 0.55 * scale).min(bounds.width());
                    self.fill_rect(Rect::new(bounds.x0, top, bounds.x0 + width, top + bar), color);
                }
            }
            ObjectKind::StickyNote(note) => {
                for child in note.children() {
                    self.draw_object(child, to_pixels, scale);
                }
            }
            ObjectKind::Group { children } => {
                for child in children {
                    self.draw_object(child, to_pixels, scale);
                }
            }
        }
    }

    fn encode(&self) -> Result<Vec<u8>, ThumbnailError> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(png_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{FreehandPath, StickyColor, StickyNote};

    fn decode(thumbnail: &Thumbnail) -> (png::OutputInfo, Vec<u8>) {
        let b64 = thumbnail.data_url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(b64).unwrap();
        let decoder = png::Decoder::new(&bytes[..]);
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info, buf)
    }

    fn pixel(info: &png::OutputInfo, buf: &[u8], x: u32, y: u32) -> [u8; 4] {
        let i = (y * info.width + x) as usize * 4;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn test_empty_scene() {
        let thumbnail = render_thumbnail(&[], DEFAULT_THUMBNAIL_SCALE, DEFAULT_THUMBNAIL_MAX_SIDE).unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (1, 1));
        assert!(thumbnail.data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_rectangle_footprint() {
        let red = Rgba::rgb(0xff, 0, 0);
        let objects = vec![SceneObject::rectangle(Rect::new(0.0, 0.0, 100.0, 100.0), red)];
        let thumbnail = render_thumbnail(&objects, 0.2, 1000).unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (28, 28));

        let (info, buf) = decode(&thumbnail);
        assert_eq!(pixel(&info, &buf, 14, 14), [0xff, 0, 0, 0xff]);
        assert_eq!(pixel(&info, &buf, 0, 0), [0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_max_side_limits_size() {
        let objects = vec![SceneObject::rectangle(
            Rect::new(0.0, 0.0, 10_000.0, 2_000.0),
            Rgba::black(),
        )];
        let thumbnail = render_thumbnail(&objects, 1.0, 100).unwrap();
        assert_eq!(thumbnail.width, 100);
        assert!(thumbnail.height < 100);
    }

    #[test]
    fn test_mixed_scene_renders() {
        let objects = vec![
            SceneObject::circle(Point::new(0.0, 0.0), 50.0, Rgba::rgb(0, 0x80, 0)),
            SceneObject::freehand(
                FreehandPath::new(vec![Point::new(0.0, 0.0), Point::new(200.0, 200.0)]),
                Rgba::black(),
                4.0,
            ),
            SceneObject::sticky_note(StickyNote::new(Point::new(300.0, 0.0), StickyColor::Blue, "hi")),
            SceneObject::image(Point::new(0.0, 300.0), 50.0, 50.0, "https://example.com/a.png"),
        ];
        let thumbnail = render_thumbnail(&objects, 0.5, 1000).unwrap();
        let (info, buf) = decode(&thumbnail);
        assert_eq!(info.width, thumbnail.width);
        // Sticky background near its top-left corner.
        let bg = StickyColor::Blue.fill();
        let x = ((300.0 + 20.0 + 2.0) * 0.5) as u32;
        let y = ((0.0 + 20.0 + 2.0) * 0.5) as u32;
        assert_eq!(pixel(&info, &buf, x, y)[..3], [bg.r, bg.g, bg.b]);
    }
}
