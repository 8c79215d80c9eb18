pub mod font;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use log::info;
use std::path::Path;

use crate::{
    classify::SeverityClass,
    components::{raster::Grid, DataType},
    config::RenderConfig,
    errors::Result,
    stats::RasterSummary,
};

use font::{draw_text, text_height, text_width};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const PREVIEW_NO_DATA: Rgb<u8> = Rgb([190, 190, 190]);
const PREVIEW_LOW: Rgb<u8> = Rgb([26, 150, 65]);
const PREVIEW_MID: Rgb<u8> = Rgb([255, 255, 191]);
const PREVIEW_HIGH: Rgb<u8> = Rgb([215, 25, 28]);

/// Class raster in the severity palette, with title, legend and footer.
pub fn severity_map(classes: &Grid<u8>, burnt_area_ha: f64, config: &RenderConfig) -> RgbImage {
    let title = format!("Fire severity classification (burnt area: {burnt_area_ha:.2} ha)");
    let footer = format!("cell size {} m", classes.cell_width());
    let legend = SeverityClass::ALL
        .map(|class| (Rgb(class.color()), class.label().to_string()))
        .to_vec();
    let color = |code: u8| {
        SeverityClass::from_code(code).map_or(BACKGROUND, |class| Rgb(class.color()))
    };
    Layout::new(classes.shape(), &title, &legend, &footer, config).draw(classes, color)
}

/// Relativized burn ratio on a diverging ramp stretched to its 5th and 95th
/// percentiles, shown to the operator before a threshold is picked.
pub fn rbr_preview(rbr: &Grid<f32>, summary: &RasterSummary, config: &RenderConfig) -> RgbImage {
    let [p5, .., p95] = summary.percentiles;
    let stretch = [p5.abs(), p95.abs()]
        .into_iter()
        .filter(|bound| bound.is_finite())
        .fold(f32::EPSILON, f32::max);
    let title = "Relativized burn ratio".to_string();
    let footer = format!("p5 {p5:.3}  p50 {:.3}  p95 {p95:.3}", summary.percentiles[2]);
    let legend = vec![
        (PREVIEW_HIGH, format!(">= {stretch:.3}")),
        (PREVIEW_MID, "0".to_string()),
        (PREVIEW_LOW, format!("<= -{stretch:.3}")),
        (PREVIEW_NO_DATA, "no data".to_string()),
    ];
    let color = |value: f32| ramp(value, stretch);
    Layout::new(rbr.shape(), &title, &legend, &footer, config).draw(rbr, color)
}

fn ramp(value: f32, stretch: f32) -> Rgb<u8> {
    if value.is_nan() {
        return PREVIEW_NO_DATA;
    }
    let t = (value / stretch).clamp(-1., 1.);
    let (from, to, t) = if t < 0. {
        (PREVIEW_MID, PREVIEW_LOW, -t)
    } else {
        (PREVIEW_MID, PREVIEW_HIGH, t)
    };
    let channel = |index: usize| {
        let (a, b) = (from.0[index] as f32, to.0[index] as f32);
        (a + (b - a) * t).round() as u8
    };
    Rgb([channel(0), channel(1), channel(2)])
}

pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Pixel positions of a map figure.
///
/// ```text
/// title
/// map     legend
/// footer
/// ```
#[derive(Debug, Clone, PartialEq)]
struct Layout<'a> {
    title: &'a str,
    legend: &'a [(Rgb<u8>, String)],
    footer: &'a str,
    font_scale: u32,
    /// Pixels per raster cell.
    cell_scale: u32,
    margin: u32,
    map_origin: (u32, u32),
    map_size: (u32, u32),
    legend_origin: (u32, u32),
    footer_y: u32,
    size: (u32, u32),
}

impl<'a> Layout<'a> {
    fn new(
        shape: (usize, usize),
        title: &'a str,
        legend: &'a [(Rgb<u8>, String)],
        footer: &'a str,
        config: &RenderConfig,
    ) -> Self {
        let (rows, cols) = (shape.0 as u32, shape.1 as u32);
        let font_scale = config.font_scale.max(1);
        let cell_scale = (config.max_map_size / rows.max(cols).max(1)).max(1);
        let margin = 8 * font_scale;
        let line = text_height(font_scale);
        let line_gap = 4 * font_scale;

        let map_size = (cols * cell_scale, rows * cell_scale);
        let map_origin = (margin, margin + line + margin);
        let legend_width = line
            + 2 * line_gap
            + legend
                .iter()
                .map(|(_, label)| text_width(label, font_scale))
                .max()
                .unwrap_or(0);
        let legend_height = (legend.len() as u32 * (line + line_gap)).saturating_sub(line_gap);
        let legend_origin = (map_origin.0 + map_size.0 + margin, map_origin.1);
        let footer_y = map_origin.1 + map_size.1.max(legend_height) + margin;

        let width = [
            legend_origin.0 + legend_width + margin,
            text_width(title, font_scale) + 2 * margin,
            text_width(footer, font_scale) + 2 * margin,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        let height = footer_y + line + margin;

        Self {
            title,
            legend,
            footer,
            font_scale,
            cell_scale,
            margin,
            map_origin,
            map_size,
            legend_origin,
            footer_y,
            size: (width, height),
        }
    }

    fn draw<T: DataType>(&self, grid: &Grid<T>, color: impl Fn(T) -> Rgb<u8>) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.size.0, self.size.1, BACKGROUND);
        let scale = self.font_scale;
        draw_text(&mut image, self.margin, self.margin, self.title, scale, INK);

        let (x0, y0) = self.map_origin;
        for y in 0..self.map_size.1 {
            for x in 0..self.map_size.0 {
                let (row, col) = ((y / self.cell_scale) as usize, (x / self.cell_scale) as usize);
                if let Some(value) = grid.get(row, col) {
                    image.put_pixel(x0 + x, y0 + y, color(value));
                }
            }
        }
        draw_hollow_rect_mut(
            &mut image,
            Rect::at(x0 as i32 - 1, y0 as i32 - 1).of_size(self.map_size.0 + 2, self.map_size.1 + 2),
            INK,
        );

        let line = text_height(scale);
        let line_gap = 4 * scale;
        for (index, (swatch, label)) in self.legend.iter().enumerate() {
            let x = self.legend_origin.0;
            let y = self.legend_origin.1 + index as u32 * (line + line_gap);
            for dy in 0..line {
                for dx in 0..line {
                    image.put_pixel(x + dx, y + dy, *swatch);
                }
            }
            draw_hollow_rect_mut(&mut image, Rect::at(x as i32, y as i32).of_size(line, line), INK);
            draw_text(&mut image, x + line + 2 * line_gap, y, label, scale, INK);
        }

        draw_text(&mut image, self.margin, self.footer_y, self.footer, scale, INK);
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::transforms::GeoTransform;
    use ndarray::{array, Array2};
    use rstest::{fixture, rstest};

    #[fixture]
    fn classes() -> Grid<u8> {
        Grid::new(
            array![[1, 2, 3], [4, 5, 6]],
            GeoTransform::new(0., 20., 10., -10.),
        )
    }

    fn config() -> RenderConfig {
        RenderConfig {
            max_map_size: 30,
            font_scale: 1,
        }
    }

    #[rstest]
    fn map_cells_use_palette(classes: Grid<u8>) {
        let image = severity_map(&classes, 0.04, &config());
        // 10 px cells, map below an 8 px margin, a 7 px title and another margin
        let (x0, y0) = (8, 23);
        for (row, col, class) in [
            (0, 0, SeverityClass::NoData),
            (0, 2, SeverityClass::Low),
            (1, 0, SeverityClass::ModerateLow),
            (1, 2, SeverityClass::High),
        ] {
            let pixel = image.get_pixel(x0 + col * 10 + 5, y0 + row * 10 + 5);
            assert_eq!(pixel.0, class.color());
        }
    }

    #[rstest]
    fn title_and_legend_fit(classes: Grid<u8>) {
        let config = config();
        let image = severity_map(&classes, 12.345, &config);
        let title = "Fire severity classification (burnt area: 12.35 ha)";
        assert!(image.width() >= text_width(title, 1) + 16);
        assert!(image.width() >= text_width("Moderate high severity", 1));
        // some ink in the title row
        assert!((0..image.width()).any(|x| *image.get_pixel(x, 8 + 3) == INK));
    }

    #[rstest]
    fn rendering_is_deterministic(classes: Grid<u8>) {
        let first = severity_map(&classes, 0.04, &config());
        let second = severity_map(&classes, 0.04, &config());
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[rstest]
    fn large_rasters_are_not_upscaled() {
        let classes = Grid::new(Array2::from_elem((40, 50), 2u8), GeoTransform::new(0., 0., 10., -10.));
        let image = severity_map(&classes, 0., &config());
        assert!(image.width() >= 50 && image.height() >= 40);
    }

    #[rstest]
    #[case(f32::NAN, PREVIEW_NO_DATA)]
    #[case(0., PREVIEW_MID)]
    #[case(0.5, PREVIEW_HIGH)]
    #[case(3., PREVIEW_HIGH)]
    #[case(-0.5, PREVIEW_LOW)]
    fn preview_ramp(#[case] value: f32, #[case] expected: Rgb<u8>) {
        assert_eq!(ramp(value, 0.5), expected);
    }

    #[rstest]
    fn preview_renders_all_no_data() {
        let rbr = Grid::new(Array2::from_elem((3, 3), f32::NAN), GeoTransform::new(0., 0., 10., -10.));
        let summary = RasterSummary::from_grid(&rbr);
        let image = rbr_preview(&rbr, &summary, &config());
        assert!(image.width() > 0);
    }
}
