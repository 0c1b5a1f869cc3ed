use crate::error::PlotError;
use crate::plot::colormap::to_hex;
use crate::plot::confusion::escape;
use image::{imageops, Rgb, RgbImage};
use rayon::prelude::*;
use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Label names used when the caller does not supply any
pub const DEFAULT_LABELS: [&str; 2] = ["Other", "Renault"];

/// Largest thumbnail edge in pixels
const TILE: u32 = 256;
const FRAME: u32 = 6;
const PADDING: u32 = 12;
const COLUMNS: u32 = 2;
/// Height of one title line in the vector rendering
const LINE_HEIGHT: u32 = 18;

const CORRECT_FRAME: Rgb<u8> = Rgb([46, 160, 67]);
const WRONG_FRAME: Rgb<u8> = Rgb([207, 34, 46]);

/// One scored image: where it is, the model score, and the true class index
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryRecord {
    pub image: PathBuf,
    pub pred: f64,
    pub label: usize,
}

impl GalleryRecord {
    /// Read a JSON array of records
    pub fn from_file(path: &Path) -> Result<Vec<Self>, PlotError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[derive(Debug, Clone)]
pub struct GalleryTile {
    pub image: PathBuf,
    pub score: f64,
    pub predicted: usize,
    pub truth: usize,
    pub correct: bool,
    pub title: String,
}

/// Thumbnails laid out two per row, each framed green when correct and red when wrong
#[derive(Debug, Clone)]
pub struct GalleryPlot {
    pub tiles: Vec<GalleryTile>,
    pub canvas: RgbImage,
}

impl GalleryPlot {
    /// Vector rendering: every tile links its source image under a three-line title
    pub fn to_svg(&self) -> String {
        let title_height = 3 * LINE_HEIGHT + PADDING;
        let cell_w = TILE + 2 * FRAME + 2 * PADDING;
        let cell_h = cell_w + title_height;
        let rows = (self.tiles.len() as u32).div_ceil(COLUMNS).max(1);
        let (width, height) = (COLUMNS * cell_w, rows * cell_h);

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" font-family="sans-serif" font-size="14">"#,
            width, height
        );
        let _ = writeln!(
            svg,
            r#"<rect width="{}" height="{}" fill="white"/>"#,
            width, height
        );

        for (i, tile) in self.tiles.iter().enumerate() {
            let x0 = (i as u32 % COLUMNS) * cell_w + PADDING;
            let y0 = (i as u32 / COLUMNS) * cell_h + PADDING;
            let center = x0 + FRAME + TILE / 2;

            for (k, line) in tile.title.lines().enumerate() {
                let _ = writeln!(
                    svg,
                    r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
                    center,
                    y0 + (k as u32 + 1) * LINE_HEIGHT,
                    escape(line)
                );
            }

            let frame = if tile.correct {
                CORRECT_FRAME
            } else {
                WRONG_FRAME
            };
            let top = y0 + 3 * LINE_HEIGHT;
            let _ = writeln!(
                svg,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                x0,
                top,
                TILE + 2 * FRAME,
                TILE + 2 * FRAME,
                to_hex(frame)
            );
            let _ = writeln!(
                svg,
                r#"<image href="{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid meet"/>"#,
                escape(&tile.image.to_string_lossy()),
                x0 + FRAME,
                top + FRAME,
                TILE,
                TILE
            );
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Save as SVG (with titles) for a `.svg` path, otherwise save the raster canvas
    pub fn save(&self, path: &Path) -> Result<(), PlotError> {
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));

        if is_svg {
            fs::write(path, self.to_svg())?;
        } else {
            self.canvas.save(path)?;
        }
        Ok(())
    }
}

/// Binary class index: 1 when `score` is strictly above `threshold`
pub fn predict_label(score: f64, threshold: f64) -> usize {
    usize::from(score > threshold)
}

/// Score rounded to two decimals, always showing at least one decimal digit
pub fn format_score(score: f64) -> String {
    let rounded = (score * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

fn tile_title(correct: bool, label: &str, score: f64, image: &Path) -> String {
    format!(
        "{}\n{} (proba={})\n{}",
        if correct { "Correct" } else { "Wrong" },
        label,
        format_score(score),
        image.display()
    )
}

/// Score every record against `threshold` and draw the thumbnails.
///
/// `labels` names the two classes; unreadable images fail the whole call.
pub fn render_gallery(
    records: &[GalleryRecord],
    threshold: f64,
    labels: &[String],
) -> Result<GalleryPlot, PlotError> {
    if labels.len() < 2 {
        return Err(PlotError::LabelMismatch {
            expected: 2,
            got: labels.len(),
        });
    }

    let tiles: Vec<GalleryTile> = records
        .iter()
        .map(|record| {
            let predicted = predict_label(record.pred, threshold);
            let correct = predicted == record.label;
            GalleryTile {
                image: record.image.clone(),
                score: record.pred,
                predicted,
                truth: record.label,
                correct,
                title: tile_title(correct, &labels[predicted], record.pred, &record.image),
            }
        })
        .collect();

    let thumbnails = records
        .par_iter()
        .map(|record| {
            image::open(&record.image)
                .map(|img| img.thumbnail(TILE, TILE).into_rgb8())
                .map_err(PlotError::from)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let canvas = layout(&tiles, &thumbnails);
    Ok(GalleryPlot { tiles, canvas })
}

fn layout(tiles: &[GalleryTile], thumbnails: &[RgbImage]) -> RgbImage {
    let cell = TILE + 2 * FRAME + 2 * PADDING;
    let rows = (tiles.len() as u32).div_ceil(COLUMNS).max(1);
    let mut canvas = RgbImage::from_pixel(COLUMNS * cell, rows * cell, Rgb([255, 255, 255]));

    for (i, (tile, thumb)) in tiles.iter().zip(thumbnails).enumerate() {
        let col = i as u32 % COLUMNS;
        let row = i as u32 / COLUMNS;
        let x0 = col * cell + PADDING;
        let y0 = row * cell + PADDING;

        let frame = if tile.correct {
            CORRECT_FRAME
        } else {
            WRONG_FRAME
        };
        let (w, h) = thumb.dimensions();
        for y in y0..y0 + h + 2 * FRAME {
            for x in x0..x0 + w + 2 * FRAME {
                canvas.put_pixel(x, y, frame);
            }
        }
        imageops::replace(
            &mut canvas,
            thumb,
            (x0 + FRAME) as i64,
            (y0 + FRAME) as i64,
        );
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_labels() -> Vec<String> {
        DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
    }

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(w, h, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(predict_label(0.51, 0.5), 1);
        assert_eq!(predict_label(0.5, 0.5), 0);
        assert_eq!(predict_label(0.1, 0.5), 0);
    }

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(0.8712), "0.87");
        assert_eq!(format_score(0.5), "0.5");
        assert_eq!(format_score(1.0), "1.0");
        assert_eq!(format_score(0.996), "1.0");
    }

    #[test]
    fn score_above_threshold_predicts_second_label() {
        let tmp = TempDir::new().unwrap();
        let car = write_image(tmp.path(), "car.png", 40, 20);
        let records = vec![
            GalleryRecord {
                image: car.clone(),
                pred: 0.9,
                label: 1,
            },
            GalleryRecord {
                image: car.clone(),
                pred: 0.9,
                label: 0,
            },
            GalleryRecord {
                image: car.clone(),
                pred: 0.2,
                label: 0,
            },
        ];

        let plot = render_gallery(&records, 0.5, &default_labels()).unwrap();

        assert_eq!(plot.tiles[0].predicted, 1);
        assert!(plot.tiles[0].correct);
        assert_eq!(
            plot.tiles[0].title,
            format!("Correct\nRenault (proba=0.9)\n{}", car.display())
        );
        assert!(!plot.tiles[1].correct);
        assert!(plot.tiles[1].title.starts_with("Wrong\nRenault"));
        assert_eq!(plot.tiles[2].predicted, 0);
        assert!(plot.tiles[2].title.starts_with("Correct\nOther (proba=0.2)"));
    }

    #[test]
    fn canvas_is_two_columns_with_colored_frames() {
        let tmp = TempDir::new().unwrap();
        let img = write_image(tmp.path(), "a.png", 16, 16);
        let records: Vec<GalleryRecord> = (0..3)
            .map(|i| GalleryRecord {
                image: img.clone(),
                pred: if i == 1 { 0.9 } else { 0.1 },
                label: 0,
            })
            .collect();

        let plot = render_gallery(&records, 0.5, &default_labels()).unwrap();

        let cell = TILE + 2 * FRAME + 2 * PADDING;
        assert_eq!(plot.canvas.dimensions(), (2 * cell, 2 * cell));
        assert_eq!(*plot.canvas.get_pixel(PADDING, PADDING), CORRECT_FRAME);
        assert_eq!(*plot.canvas.get_pixel(cell + PADDING, PADDING), WRONG_FRAME);
        assert_eq!(
            *plot.canvas.get_pixel(PADDING + FRAME, PADDING + FRAME),
            Rgb([10, 20, 30])
        );
    }

    #[test]
    fn svg_output_carries_titles_and_image_links() {
        let tmp = TempDir::new().unwrap();
        let img = write_image(tmp.path(), "clio.png", 16, 16);
        let records = vec![
            GalleryRecord {
                image: img.clone(),
                pred: 0.87,
                label: 1,
            },
            GalleryRecord {
                image: img.clone(),
                pred: 0.3,
                label: 1,
            },
        ];

        let plot = render_gallery(&records, 0.5, &default_labels()).unwrap();
        let out = tmp.path().join("gallery.svg");
        plot.save(&out).unwrap();
        let svg = fs::read_to_string(&out).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">Correct</text>"));
        assert!(svg.contains(">Renault (proba=0.87)</text>"));
        assert!(svg.contains(">Wrong</text>"));
        assert!(svg.contains(">Other (proba=0.3)</text>"));
        let path_text = escape(&img.display().to_string());
        assert!(svg.contains(&format!(">{}</text>", path_text)));
        assert_eq!(svg.matches("<image href=").count(), 2);
        assert!(svg.contains(&to_hex(WRONG_FRAME)));
    }

    #[test]
    fn non_svg_output_is_the_raster_canvas() {
        let tmp = TempDir::new().unwrap();
        let img = write_image(tmp.path(), "a.png", 16, 16);
        let records = vec![GalleryRecord {
            image: img,
            pred: 0.9,
            label: 1,
        }];

        let plot = render_gallery(&records, 0.5, &default_labels()).unwrap();
        let out = tmp.path().join("gallery.png");
        plot.save(&out).unwrap();

        let decoded = image::open(&out).unwrap();
        assert_eq!(decoded.width(), plot.canvas.width());
    }

    #[test]
    fn missing_image_is_an_error() {
        let records = vec![GalleryRecord {
            image: PathBuf::from("/definitely/not/here.jpg"),
            pred: 0.7,
            label: 1,
        }];
        assert!(render_gallery(&records, 0.5, &default_labels()).is_err());
    }

    #[test]
    fn needs_two_labels() {
        let err = render_gallery(&[], 0.5, &["Only".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            PlotError::LabelMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn records_file_parses() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");
        fs::write(
            &path,
            r#"[{"image": "cars/1.jpg", "pred": 0.42, "label": 0}]"#,
        )
        .unwrap();

        let records = GalleryRecord::from_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image, PathBuf::from("cars/1.jpg"));
        assert_eq!(records[0].label, 0);
    }
}
