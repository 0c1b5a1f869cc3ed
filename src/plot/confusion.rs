use crate::error::PlotError;
use crate::plot::colormap::{blues, normalize, to_hex};
use image::{Rgb, RgbImage};
use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Cell edge in pixels for the rasterized heatmap
const CELL: u32 = 64;
const COLORBAR_GAP: u32 = 16;
const COLORBAR_WIDTH: u32 = 20;

/// Confusion matrix file contents: `{"matrix": [[..]], "classes": [..]}`
#[derive(Debug, Clone, Deserialize)]
pub struct ConfusionInput {
    pub matrix: Vec<Vec<u64>>,
    pub classes: Vec<String>,
}

impl ConfusionInput {
    pub fn from_file(path: &Path) -> Result<Self, PlotError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColor {
    Black,
    White,
}

impl TextColor {
    fn as_svg(self) -> &'static str {
        match self {
            TextColor::Black => "black",
            TextColor::White => "white",
        }
    }
}

/// Text drawn over one heatmap cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellAnnotation {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub color: TextColor,
}

/// A rendered confusion matrix: displayed values plus everything drawn on top
#[derive(Debug, Clone)]
pub struct ConfusionPlot {
    pub title: String,
    pub classes: Vec<String>,
    pub normalized: bool,
    /// Values as displayed, row-normalized when `normalized` is set
    pub values: Vec<Vec<f64>>,
    pub annotations: Vec<CellAnnotation>,
    pub x_label: String,
    pub y_label: String,
}

/// Build a confusion matrix figure.
///
/// With `normalize`, every row is divided by its sum; an all-zero row stays at
/// zero. Cell text switches to white once the value exceeds half the maximum.
pub fn render_confusion_matrix(
    matrix: &[Vec<u64>],
    class_labels: &[String],
    normalize: bool,
) -> Result<ConfusionPlot, PlotError> {
    let n = matrix.len();
    if n == 0 {
        return Err(PlotError::Shape("matrix is empty".to_string()));
    }
    if let Some((i, row)) = matrix.iter().enumerate().find(|(_, row)| row.len() != n) {
        return Err(PlotError::Shape(format!(
            "row {} has {} columns, expected {}",
            i,
            row.len(),
            n
        )));
    }
    if class_labels.len() != n {
        return Err(PlotError::LabelMismatch {
            expected: n,
            got: class_labels.len(),
        });
    }

    let values: Vec<Vec<f64>> = if normalize {
        matrix.iter().map(|row| normalize_row(row)).collect()
    } else {
        matrix
            .iter()
            .map(|row| row.iter().map(|&v| v as f64).collect())
            .collect()
    };

    if normalize {
        tracing::info!("Normalized confusion matrix");
    } else {
        tracing::info!("Confusion matrix, without normalization");
    }
    for row in &values {
        tracing::info!("{:?}", row);
    }

    let max = values.iter().flatten().cloned().fold(f64::MIN, f64::max);
    let thresh = max / 2.0;

    let mut annotations = Vec::with_capacity(n * n);
    for (i, row) in values.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            let text = if normalize {
                format!("{:.2}", value)
            } else {
                matrix[i][j].to_string()
            };
            let color = if value > thresh {
                TextColor::White
            } else {
                TextColor::Black
            };
            annotations.push(CellAnnotation {
                row: i,
                col: j,
                text,
                color,
            });
        }
    }

    Ok(ConfusionPlot {
        title: "Confusion matrix".to_string(),
        classes: class_labels.to_vec(),
        normalized: normalize,
        values,
        annotations,
        x_label: "Predicted label".to_string(),
        y_label: "True label".to_string(),
    })
}

fn normalize_row(row: &[u64]) -> Vec<f64> {
    let sum: u64 = row.iter().sum();
    if sum == 0 {
        return vec![0.0; row.len()];
    }
    row.iter().map(|&v| v as f64 / sum as f64).collect()
}

impl ConfusionPlot {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn range(&self) -> (f64, f64) {
        let flat = self.values.iter().flatten().cloned();
        let min = flat.clone().fold(f64::MAX, f64::min);
        let max = flat.fold(f64::MIN, f64::max);
        (min, max)
    }

    fn cell_color(&self, value: f64) -> Rgb<u8> {
        let (min, max) = self.range();
        blues(normalize(value, min, max))
    }

    /// Rasterize the heatmap with its colorbar to the right
    pub fn to_image(&self) -> RgbImage {
        let n = self.values.len() as u32;
        let side = n * CELL;
        let width = side + COLORBAR_GAP + COLORBAR_WIDTH;
        let mut img = RgbImage::from_pixel(width, side, Rgb([255, 255, 255]));

        for (i, row) in self.values.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                let color = self.cell_color(value);
                let (x0, y0) = (j as u32 * CELL, i as u32 * CELL);
                for y in y0..y0 + CELL {
                    for x in x0..x0 + CELL {
                        img.put_pixel(x, y, color);
                    }
                }
            }
        }

        // colorbar, maximum at the top
        let bar_x = side + COLORBAR_GAP;
        for y in 0..side {
            let t = 1.0 - y as f64 / (side.max(2) - 1) as f64;
            let color = blues(t);
            for x in bar_x..bar_x + COLORBAR_WIDTH {
                img.put_pixel(x, y, color);
            }
        }

        img
    }

    /// Vector rendering with title, tick labels, axis labels and cell text
    pub fn to_svg(&self) -> String {
        let n = self.values.len() as u32;
        let side = n * CELL;
        let (left, top) = (120u32, 40u32);
        let bottom = 110u32;
        let bar_x = left + side + COLORBAR_GAP;
        let width = bar_x + COLORBAR_WIDTH + 60;
        let height = top + side + bottom;
        let (min, max) = self.range();

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" font-family="sans-serif" font-size="12">"#,
            width, height
        );
        let _ = writeln!(
            svg,
            r#"<rect width="{}" height="{}" fill="white"/>"#,
            width, height
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            left + side / 2,
            top - 14,
            escape(&self.title)
        );

        for (i, row) in self.values.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                let _ = writeln!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                    left + j as u32 * CELL,
                    top + i as u32 * CELL,
                    CELL,
                    CELL,
                    to_hex(self.cell_color(value))
                );
            }
        }

        for ann in &self.annotations {
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" fill="{}">{}</text>"#,
                left + ann.col as u32 * CELL + CELL / 2,
                top + ann.row as u32 * CELL + CELL / 2,
                ann.color.as_svg(),
                escape(&ann.text)
            );
        }

        for (k, class) in self.classes.iter().enumerate() {
            let center = k as u32 * CELL + CELL / 2;
            // y ticks
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
                left - 6,
                top + center,
                escape(class)
            );
            // x ticks, rotated 45 degrees
            let (x, y) = (left + center, top + side + 10);
            let _ = writeln!(
                svg,
                r#"<text x="{x}" y="{y}" text-anchor="end" transform="rotate(-45 {x} {y})">{}</text>"#,
                escape(class)
            );
        }

        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            left + side / 2,
            height - 12,
            escape(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text x="16" y="{y}" text-anchor="middle" transform="rotate(-90 16 {y})">{}</text>"#,
            escape(&self.y_label),
            y = top + side / 2
        );

        const BAR_STEPS: u32 = 32;
        let step_h = side as f64 / BAR_STEPS as f64;
        for s in 0..BAR_STEPS {
            let t = 1.0 - (s as f64 + 0.5) / BAR_STEPS as f64;
            let _ = writeln!(
                svg,
                r#"<rect x="{}" y="{:.2}" width="{}" height="{:.2}" fill="{}"/>"#,
                bar_x,
                top as f64 + s as f64 * step_h,
                COLORBAR_WIDTH,
                step_h + 0.5,
                to_hex(blues(t))
            );
        }
        let fmt_bound = |v: f64| {
            if self.normalized {
                format!("{:.2}", v)
            } else {
                format!("{}", v.round() as i64)
            }
        };
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" dominant-baseline="middle">{}</text>"#,
            bar_x + COLORBAR_WIDTH + 4,
            top,
            fmt_bound(max)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" dominant-baseline="middle">{}</text>"#,
            bar_x + COLORBAR_WIDTH + 4,
            top + side,
            fmt_bound(min)
        );

        svg.push_str("</svg>\n");
        svg
    }

    /// Save as SVG for a `.svg` path, otherwise as a raster in the format implied by the extension
    pub fn save(&self, path: &Path) -> Result<(), PlotError> {
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));

        if is_svg {
            fs::write(path, self.to_svg())?;
        } else {
            self.to_image().save(path)?;
        }
        Ok(())
    }
}

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
