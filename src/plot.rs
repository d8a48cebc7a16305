use crate::audit::Dependencies;
use plotters::prelude::*;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const POSITIVE: RGBColor = RGBColor(0x2c, 0x7b, 0xb6);
const NEGATIVE: RGBColor = RGBColor(0xd7, 0x19, 0x1c);
const TEXT_BAR_WIDTH: usize = 40;

/// Where a dependency chart is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    /// SVG file written to `path`.
    Svg { path: PathBuf, size: (u32, u32) },

    /// Character bars written to standard error.
    Text,
}

impl Backend {
    pub fn svg(path: impl Into<PathBuf>) -> Self {
        Self::Svg {
            path: path.into(),
            size: (960, 640),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotOptions {
    reverse_values: bool,
    title: String,
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders bars by descending value instead of ascending.
    pub fn reverse_values(mut self, enabled: bool) -> Self {
        self.reverse_values = enabled;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn render(&self, dependencies: &Dependencies, backend: &Backend) -> Result<(), PlotError> {
        match backend {
            Backend::Svg { path, size } => self.render_svg(dependencies, path, *size),
            Backend::Text => self.render_text(dependencies, &mut std::io::stderr().lock()),
        }
    }

    /// Draws a horizontal bar chart; the first sorted entry sits at the bottom.
    pub fn render_svg(
        &self,
        dependencies: &Dependencies,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), PlotError> {
        log::info!(
            "rendering {} dependencies to {}",
            dependencies.len(),
            path.display()
        );
        let entries = dependencies.sorted(self.reverse_values);
        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        if entries.is_empty() {
            root.titled(&self.title, ("sans-serif", 24))
                .map_err(render_error)?;
            return root.present().map_err(render_error);
        }

        let largest = entries.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
        let bound = if largest > 0.0 { largest * 1.1 } else { 1.0 };
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 24))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(200)
            .build_cartesian_2d(-bound..bound, (0..entries.len()).into_segmented())
            .map_err(render_error)?;

        let label = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => entries
                .get(*i)
                .map_or_else(String::new, |e| e.0.to_owned()),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(entries.len())
            .y_label_formatter(&label)
            .x_desc("dependence")
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(entries.iter().enumerate().map(|(i, &(_, v))| {
                let color = if v < 0.0 { NEGATIVE } else { POSITIVE };
                let mut bar = Rectangle::new(
                    [(0.0, SegmentValue::Exact(i)), (v, SegmentValue::Exact(i + 1))],
                    color.filled(),
                );
                bar.set_margin(4, 4, 0, 0);
                bar
            }))
            .map_err(render_error)?;

        root.present().map_err(render_error)
    }

    pub fn render_text<W: Write>(
        &self,
        dependencies: &Dependencies,
        writer: &mut W,
    ) -> Result<(), PlotError> {
        let entries = dependencies.sorted(self.reverse_values);
        writeln!(writer, "{}", self.title)?;

        let name_width = entries.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0);
        let largest = entries.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
        for (name, v) in entries {
            let len = if largest > 0.0 {
                (v.abs() / largest * TEXT_BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let mark = if v < 0.0 { "-" } else { "+" };
            writeln!(
                writer,
                "{:>width$} | {:<bar$} {:+.4}",
                name,
                mark.repeat(len),
                v,
                width = name_width,
                bar = TEXT_BAR_WIDTH
            )?;
        }
        Ok(())
    }
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            reverse_values: false,
            title: "FairML".to_owned(),
        }
    }
}

fn render_error(e: impl Display) -> PlotError {
    PlotError::Render(e.to_string())
}

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("failed to render chart: {0}")]
    Render(String),

    #[error("failed to write chart: {0}")]
    Io(#[from] std::io::Error),
}
