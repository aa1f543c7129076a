//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - chosen reference curves: `.` line
//! - assigned test points: `1`..`9` (index of the chosen reference, `+` past nine)
//! - unassigned test points: `x`

use crate::data::SeriesTable;
use crate::fit::selection::FitSelection;
use crate::report::{ResultSet, lowest_scores};

/// Render the chosen reference curves with the classified test points on top.
pub fn render_results_plot(
    selection: &FitSelection,
    references: &SeriesTable,
    results: &ResultSet,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let chosen = selection.chosen_reference_ids();
    let curves: Vec<Vec<(f64, f64)>> = chosen
        .iter()
        .filter_map(|id| references.series(id).ok())
        .map(|s| s.samples().iter().map(|p| (p.x, p.y)).collect())
        .collect();

    let points: Vec<(f64, f64)> = results.records().iter().map(|r| (r.x, r.y)).collect();

    let (x_min, x_max) = bounds(curves.iter().flatten().chain(&points).map(|p| p.0));
    let (y_min, y_max) = bounds(curves.iter().flatten().chain(&points).map(|p| p.1));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curves first so points overlay them.
    for curve in &curves {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for r in results.records() {
        let col = map_x(r.x, x_min, x_max, width);
        let row = map_y(r.y, y_min, y_max, height);
        grid[row][col] = match &r.reference_id {
            Some(id) => chosen.iter().position(|c| *c == id.as_str()).map(marker).unwrap_or('+'),
            None => 'x',
        };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out.push_str("Legend:");
    for (i, id) in chosen.iter().enumerate() {
        out.push_str(&format!(" {}={id}", marker(i)));
    }
    out.push_str(" x=unassigned\n");
    out
}

/// Horizontal bars of `log10(1 + SSD)` for the lowest `top_n` scores per training series.
pub fn render_ssd_bars(selection: &FitSelection, top_n: usize, width: usize) -> String {
    let bar_width = width.saturating_sub(36).max(10);
    let mut out = String::new();

    for ts in &selection.scores {
        let chosen = selection
            .fit_for(&ts.training_id)
            .map(|f| f.reference_id.as_str())
            .unwrap_or("");
        let entries = lowest_scores(&ts.scores, top_n);
        let max = entries
            .iter()
            .map(|e| e.ssd.ln_1p())
            .fold(0.0_f64, f64::max);

        out.push_str(&format!("{} log10(1+SSD):\n", ts.training_id));
        for e in entries {
            let len = if max > 0.0 {
                (e.ssd.ln_1p() / max * bar_width as f64).round() as usize
            } else {
                0
            };
            let (mark, fill) = if e.reference_id == chosen { ('*', '#') } else { (' ', '=') };
            let bar: String = std::iter::repeat_n(fill, len).collect();
            out.push_str(&format!(
                "{mark} {:<14} |{:<bar_width$}| {:.3}\n",
                e.reference_id,
                bar,
                e.ssd.ln_1p() / std::f64::consts::LN_10,
            ));
        }
    }

    out
}

fn marker(index: usize) -> char {
    match index {
        0..=8 => char::from(b'1' + index as u8),
        _ => '+',
    }
}

/// Data range, widened by one unit each side when every value is equal.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        (0.0, 1.0)
    } else if max > min {
        (min, max)
    } else {
        (min - 1.0, max + 1.0)
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, '.'),
            None => grid[row][col] = '.',
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|r| r.get_mut(x0 as usize)) {
            if *cell == ' ' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
