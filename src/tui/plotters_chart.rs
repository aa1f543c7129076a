//! Plotters-powered match chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer using
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// High-contrast palette, cycled per chosen reference.
const PALETTE: [RGBColor; 6] = [
    RGBColor(0, 255, 255),
    RGBColor(255, 0, 255),
    RGBColor(255, 255, 0),
    RGBColor(0, 255, 0),
    RGBColor(255, 128, 0),
    RGBColor(128, 160, 255),
];

pub fn palette(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct MatchChart<'a> {
    /// One line per chosen reference.
    pub curves: &'a [Vec<(f64, f64)>],
    /// Assigned test points, grouped like `curves`.
    pub assigned: &'a [Vec<(f64, f64)>],
    /// Test points that no reference accepted.
    pub unassigned: &'a [(f64, f64)],
    /// Index into `curves` drawn last and in white.
    pub highlight: Option<usize>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
}

impl<'a> Widget for MatchChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format!("{v:.1}"))
                .y_label_formatter(&|v| format!("{v:.1}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for (i, curve) in self.curves.iter().enumerate() {
                if Some(i) == self.highlight {
                    continue;
                }
                chart.draw_series(LineSeries::new(curve.iter().copied(), &palette(i)))?;
            }
            if let Some(curve) = self.highlight.and_then(|i| self.curves.get(i)) {
                chart.draw_series(LineSeries::new(curve.iter().copied(), &WHITE))?;
            }

            // `Pixel` rather than `Circle`: the backend maps circle radii to
            // canvas units and draws them far too large.
            for (i, points) in self.assigned.iter().enumerate() {
                chart.draw_series(points.iter().map(|&(x, y)| Pixel::new((x, y), palette(i))))?;
            }
            chart.draw_series(
                self.unassigned
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), RGBColor(255, 0, 0))),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
