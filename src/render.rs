use crate::config::OutputConfig;
use crate::error::{PipelineError, Result};
use crate::processing::compute_ratios;
use crate::table::left_join;
use crate::types::{RegionGeometry, RegionMap, RegionMapEntry, RegionRatio, RegionResult};
use ab_glyph::{FontVec, PxScale};
use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point, Rect};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect as PixelRect;
use std::f64::consts::PI;
use std::fs;
use tracing::{debug, info, warn};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const NO_DATA: Rgba<u8> = Rgba([211, 211, 211, 255]);

// Red-yellow-green diverging scale, low to high.
const RD_YL_GN: [&str; 11] = [
    "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf",
    "#d9ef8b", "#a6d96a", "#66bd63", "#1a9850", "#006837",
];

const MARGIN: u32 = 40;
const TITLE_H: u32 = 50;
const LEGEND_W: u32 = 150;
const BAR_W: u32 = 24;
const LEGEND_TICKS: usize = 5;

/// Drawing settings for the choropleth.
pub struct MapStyle {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub legend_label: String,
    pub font: Option<FontVec>,
}

impl MapStyle {
    pub fn from_config(output: &OutputConfig) -> Result<Self> {
        let font = match &output.font {
            Some(path) => {
                let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
                let font = FontVec::try_from_vec(bytes)
                    .map_err(|_| PipelineError::Font { path: path.clone() })?;
                Some(font)
            }
            None => {
                debug!("No font configured, title and legend text are skipped");
                None
            }
        };

        Ok(Self {
            width: output.width,
            height: output.height,
            title: output.title.clone(),
            legend_label: output.legend_label.clone(),
            font,
        })
    }
}

/// Attaches each region's ratio to its geometry. Geometries with no result
/// keep a NaN ratio and no name.
pub fn merge_ratios_into_geometries(
    geometries: &[RegionGeometry],
    ratios: &[RegionRatio],
) -> RegionMap {
    let entries = left_join(
        geometries,
        ratios,
        |g| g.code.as_str(),
        |r| r.code.as_str(),
        |geometry, ratio| RegionMapEntry {
            code: geometry.code.clone(),
            name: ratio.map(|r| r.name.clone()),
            ratio: ratio.map_or(f64::NAN, |r| r.ratio),
            geometry: geometry.geometry.clone(),
        },
    );

    let missing = entries.iter().filter(|e| !e.has_data()).count();
    if missing > 0 {
        warn!(missing, "Regions rendered without data");
    }
    RegionMap { entries }
}

/// Computes the choice-A ratio per region, puts it on the region geometries
/// and draws the choropleth.
pub fn plot_referendum_map(
    results: &[RegionResult],
    geometries: &[RegionGeometry],
    style: &MapStyle,
) -> (RegionMap, RgbaImage) {
    let ratios = compute_ratios(results);
    let map = merge_ratios_into_geometries(geometries, &ratios);
    let image = draw_choropleth(&map, style);
    (map, image)
}

pub fn draw_choropleth(map: &RegionMap, style: &MapStyle) -> RgbaImage {
    let mut img = ImageBuffer::from_pixel(style.width, style.height, WHITE);
    let scale = ColorScale::new(map.ratio_range());

    let plot_area = PixelRect::at(MARGIN as i32, (MARGIN + TITLE_H) as i32).of_size(
        style.width.saturating_sub(2 * MARGIN + LEGEND_W).max(1),
        style.height.saturating_sub(2 * MARGIN + TITLE_H).max(1),
    );

    if let Some(viewport) = Viewport::fit(map, plot_area) {
        for entry in &map.entries {
            let color = if entry.has_data() { scale.color(entry.ratio) } else { NO_DATA };
            fill_region(&mut img, &viewport, &entry.geometry, color);
        }
        for entry in &map.entries {
            outline_region(&mut img, &viewport, &entry.geometry);
        }
    } else {
        warn!("No geometry to draw");
    }

    draw_legend(&mut img, &scale, style, plot_area);
    if let Some(font) = &style.font {
        let title_scale = PxScale::from(24.0);
        let (w, _) = text_size(title_scale, font, &style.title);
        let x = (style.width as i32 - w as i32) / 2;
        draw_text_mut(&mut img, BLACK, x.max(0), MARGIN as i32, title_scale, font, &style.title);
    }

    info!(width = style.width, height = style.height, regions = map.len(), "Rendered choropleth");
    img
}

/// Maps ratios onto the diverging scale between the smallest and largest
/// defined value.
struct ColorScale {
    min: f64,
    max: f64,
    stops: Vec<Rgba<u8>>,
}

impl ColorScale {
    fn new(range: Option<(f64, f64)>) -> Self {
        let (min, max) = range.unwrap_or((0.0, 1.0));
        Self {
            min,
            max,
            stops: RD_YL_GN.iter().map(|h| hex_to_rgba(h)).collect(),
        }
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.max > self.min {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    fn color(&self, value: f64) -> Rgba<u8> {
        self.color_at(self.normalize(value))
    }

    fn color_at(&self, t: f64) -> Rgba<u8> {
        let pos = t.clamp(0.0, 1.0) * (self.stops.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(self.stops.len() - 1);
        let frac = pos - lo as f64;
        let (a, b) = (self.stops[lo], self.stops[hi]);

        let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
        Rgba([mix(0), mix(1), mix(2), 255])
    }
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Rgba([r, g, b, 255])
}

// Web Mercator, normalised to [0, 1] on both axes.
fn project(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0;
    (x, y)
}

fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Fits the projected extent of the map into a pixel rectangle, keeping the
/// aspect ratio.
struct Viewport {
    min_x: f64,
    min_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    fn fit(map: &RegionMap, area: PixelRect) -> Option<Self> {
        let bounds = map
            .entries
            .iter()
            .filter_map(|e| e.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })?;

        // Mercator flips latitude: north (max y) maps to the smallest projected y.
        let (x0, y0) = project(bounds.min().x, bounds.max().y);
        let (x1, y1) = project(bounds.max().x, bounds.min().y);
        let span_x = (x1 - x0).max(f64::EPSILON);
        let span_y = (y1 - y0).max(f64::EPSILON);

        let scale = (area.width() as f64 / span_x).min(area.height() as f64 / span_y);
        Some(Self {
            min_x: x0,
            min_y: y0,
            scale,
            offset_x: area.left() as f64 + (area.width() as f64 - span_x * scale) / 2.0,
            offset_y: area.top() as f64 + (area.height() as f64 - span_y * scale) / 2.0,
        })
    }

    fn to_pixel(&self, lon: f64, lat: f64) -> (f32, f32) {
        let (x, y) = project(lon, lat);
        (
            (self.offset_x + (x - self.min_x) * self.scale) as f32,
            (self.offset_y + (y - self.min_y) * self.scale) as f32,
        )
    }

    fn to_lon_lat(&self, px: f64, py: f64) -> (f64, f64) {
        let x = self.min_x + (px - self.offset_x) / self.scale;
        let y = self.min_y + (py - self.offset_y) / self.scale;
        unproject(x, y)
    }
}

// Scanline over the region's pixel bounding box, testing each pixel centre.
fn fill_region(img: &mut RgbaImage, viewport: &Viewport, geometry: &MultiPolygon<f64>, color: Rgba<u8>) {
    let Some(bbox) = geometry.bounding_rect() else {
        return;
    };
    let (left, top) = viewport.to_pixel(bbox.min().x, bbox.max().y);
    let (right, bottom) = viewport.to_pixel(bbox.max().x, bbox.min().y);

    let x_start = left.floor().max(0.0) as u32;
    let y_start = top.floor().max(0.0) as u32;
    let x_end = (right.ceil().max(0.0) as u32).min(img.width());
    let y_end = (bottom.ceil().max(0.0) as u32).min(img.height());

    for py in y_start..y_end {
        for px in x_start..x_end {
            let (lon, lat) = viewport.to_lon_lat(px as f64 + 0.5, py as f64 + 0.5);
            if geometry.contains(&Point::new(lon, lat)) {
                img.put_pixel(px, py, color);
            }
        }
    }
}

fn outline_region(img: &mut RgbaImage, viewport: &Viewport, geometry: &MultiPolygon<f64>) {
    for polygon in geometry {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            for line in ring.lines() {
                let start = viewport.to_pixel(line.start.x, line.start.y);
                let end = viewport.to_pixel(line.end.x, line.end.y);
                draw_line_segment_mut(img, start, end, BLACK);
            }
        }
    }
}

fn draw_legend(img: &mut RgbaImage, scale: &ColorScale, style: &MapStyle, plot_area: PixelRect) {
    let bar_x = plot_area.right() + 30;
    let bar_top = plot_area.top() + plot_area.height() as i32 / 6;
    let bar_h = (plot_area.height() * 2 / 3).max(1);

    for dy in 0..bar_h {
        let t = 1.0 - dy as f64 / (bar_h.max(2) - 1) as f64;
        let color = scale.color_at(t);
        draw_filled_rect_mut(img, PixelRect::at(bar_x, bar_top + dy as i32).of_size(BAR_W, 1), color);
    }
    draw_hollow_rect_mut(img, PixelRect::at(bar_x, bar_top).of_size(BAR_W, bar_h), BLACK);

    let no_data_top = bar_top + bar_h as i32 + 20;
    draw_filled_rect_mut(img, PixelRect::at(bar_x, no_data_top).of_size(BAR_W, BAR_W), NO_DATA);
    draw_hollow_rect_mut(img, PixelRect::at(bar_x, no_data_top).of_size(BAR_W, BAR_W), BLACK);

    let tick_x = (bar_x + BAR_W as i32) as f32;
    let label_scale = PxScale::from(14.0);
    for i in 0..LEGEND_TICKS {
        let t = i as f64 / (LEGEND_TICKS - 1) as f64;
        let y = bar_top as f32 + (1.0 - t as f32) * (bar_h - 1) as f32;
        draw_line_segment_mut(img, (tick_x, y), (tick_x + 5.0, y), BLACK);

        if let Some(font) = &style.font {
            let value = scale.min + (scale.max - scale.min) * t;
            let label = format!("{:.2}", value);
            draw_text_mut(img, BLACK, tick_x as i32 + 8, y as i32 - 7, label_scale, font, &label);
        }
    }

    if let Some(font) = &style.font {
        draw_text_mut(img, BLACK, bar_x + BAR_W as i32 + 8, no_data_top + 4, label_scale, font, "No data");

        // Label sits under the bar, wrapped to the legend column.
        let mut y = no_data_top + BAR_W as i32 + 20;
        for line in wrap(&style.legend_label, font, label_scale, LEGEND_W + MARGIN - 30) {
            draw_text_mut(img, BLACK, bar_x, y, label_scale, font, &line);
            y += 18;
        }
    }
}

fn wrap(text: &str, font: &FontVec, scale: PxScale, max_width: u32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if !current.is_empty() && text_size(scale, font, &candidate).0 > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
