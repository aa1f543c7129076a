//! Ratatui-based dashboard.
//!
//! Runs the matching pipeline once, then shows the chosen references with the
//! classified test points, plus the SSD ranking of the selected training series.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::{RunOutput, run_match};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::report::lowest_scores;

mod plotters_chart;

use plotters_chart::MatchChart;

/// SSD bars shown for the selected training series.
const BAR_COUNT: usize = 10;

/// Start the dashboard.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    // Load before touching the terminal so input errors print normally.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Logging is off while the dashboard owns the terminal, so ingest and
/// selection warnings are reported here instead.
fn load_status(prefix: &str, run: &RunOutput) -> String {
    let skipped = run.ingest.row_errors.len();
    let excluded = run.outcome.selection.excluded.len();
    match (skipped, excluded) {
        (0, 0) => format!("{prefix}."),
        (s, 0) => format!("{prefix} ({s} test rows skipped)."),
        (0, e) => format!("{prefix} ({e} pairs excluded)."),
        (s, e) => format!("{prefix} ({s} test rows skipped, {e} pairs excluded)."),
    }
}

struct App {
    config: RunConfig,
    run: RunOutput,
    selected: usize,
    show_unassigned: bool,
    status: String,
}

impl App {
    fn new(config: RunConfig) -> Result<Self, AppError> {
        let run = run_match(&config)?;
        Ok(Self::with_output(config, run))
    }

    fn with_output(config: RunConfig, run: RunOutput) -> Self {
        let status = load_status("Ready", &run);
        Self {
            config,
            run,
            selected: 0,
            show_unassigned: true,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply a key press. Returns `true` when the dashboard should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let n = self.run.outcome.selection.fits.len().max(1);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left => {
                self.selected = (self.selected + n - 1) % n;
                self.status = format!("training: {}", self.selected_training_id());
            }
            KeyCode::Right => {
                self.selected = (self.selected + 1) % n;
                self.status = format!("training: {}", self.selected_training_id());
            }
            KeyCode::Char('u') => {
                self.show_unassigned = !self.show_unassigned;
                self.status = format!(
                    "unassigned points {}",
                    if self.show_unassigned { "shown" } else { "hidden" }
                );
            }
            KeyCode::Char('r') => match run_match(&self.config) {
                Ok(run) => {
                    self.status = load_status("Reloaded inputs", &run);
                    self.run = run;
                    self.selected = self.selected.min(self.run.outcome.selection.fits.len().saturating_sub(1));
                }
                Err(err) => {
                    self.status = format!("Reload failed: {err}");
                }
            },
            _ => {}
        }
        false
    }

    fn selected_training_id(&self) -> &str {
        self.run
            .outcome
            .selection
            .fits
            .get(self.selected)
            .map(|f| f.training_id.as_str())
            .unwrap_or("-")
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let outcome = &self.run.outcome;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("ideal", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " | train: {} | ideal: {} | test: {}",
                self.config.train_path.display(),
                self.config.ideal_path.display(),
                self.config.test_path.display()
            )),
        ]));

        let fit_line = match outcome.selection.fits.get(self.selected) {
            Some(fit) => {
                let threshold = outcome
                    .thresholds
                    .get(&fit.reference_id)
                    .map(|t| format!("{:.4}", t.threshold))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{} -> {} | SSD={:.4} | threshold={threshold} | assigned {}/{} ({} to this reference)",
                    fit.training_id,
                    fit.reference_id,
                    fit.ssd,
                    outcome.results.assigned_count(),
                    outcome.results.len(),
                    outcome.results.assigned_to(&fit.reference_id).count(),
                )
            }
            None => "no fits".to_string(),
        };
        lines.push(Line::from(Span::styled(fit_line, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_ssd_bars(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Matches").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let data = chart_data(&self.run, self.selected, self.show_unassigned);

        let (chart_rect, insets) = chart_layout(inner);
        let widget = MatchChart {
            curves: &data.curves,
            assigned: &data.assigned,
            unassigned: &data.unassigned,
            highlight: data.highlight,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "x",
            y_label: "y",
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, data.x_bounds, data.y_bounds);
        }
    }

    fn draw_ssd_bars(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!("log10(1+SSD): {}", self.selected_training_id());
        let bars: Vec<Bar> = ssd_bar_data(&self.run, self.selected, BAR_COUNT)
            .into_iter()
            .map(|b| {
                let style = if b.chosen {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Bar::default()
                    .label(Line::from(b.label))
                    .value(b.value)
                    .text_value(b.text)
                    .style(style)
            })
            .collect();

        let chart = BarChart::default()
            .block(Block::default().title(title).borders(Borders::ALL))
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ training series  u toggle unassigned  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Series and bounds for the match chart.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    curves: Vec<Vec<(f64, f64)>>,
    assigned: Vec<Vec<(f64, f64)>>,
    unassigned: Vec<(f64, f64)>,
    highlight: Option<usize>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_data(run: &RunOutput, selected: usize, show_unassigned: bool) -> ChartData {
    let selection = &run.outcome.selection;
    let chosen = selection.chosen_reference_ids();

    let curves: Vec<Vec<(f64, f64)>> = chosen
        .iter()
        .map(|id| {
            run.ingest
                .ideal
                .series(id)
                .map(|s| s.samples().iter().map(|p| (p.x, p.y)).collect())
                .unwrap_or_default()
        })
        .collect();

    let assigned: Vec<Vec<(f64, f64)>> = chosen
        .iter()
        .map(|id| {
            run.outcome
                .results
                .assigned_to(id)
                .map(|r| (r.x, r.y))
                .collect()
        })
        .collect();

    let unassigned: Vec<(f64, f64)> = if show_unassigned {
        run.outcome
            .results
            .records()
            .iter()
            .filter(|r| !r.is_assigned())
            .map(|r| (r.x, r.y))
            .collect()
    } else {
        Vec::new()
    };

    let highlight = selection
        .fits
        .get(selected)
        .and_then(|f| chosen.iter().position(|c| *c == f.reference_id.as_str()));

    let all = || {
        curves
            .iter()
            .flatten()
            .chain(assigned.iter().flatten())
            .chain(&unassigned)
    };
    let x_bounds = padded_bounds(all().map(|p| p.0), 0.0);
    let y_bounds = padded_bounds(all().map(|p| p.1), 0.05);

    ChartData {
        curves,
        assigned,
        unassigned,
        highlight,
        x_bounds,
        y_bounds,
    }
}

fn padded_bounds(values: impl Iterator<Item = f64>, frac: f64) -> [f64; 2] {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() || max <= min {
        return [0.0, 1.0];
    }
    let pad = (max - min) * frac;
    [min - pad, max + pad]
}

/// One bar of the SSD panel.
#[derive(Debug, Clone, PartialEq)]
struct SsdBar {
    label: String,
    /// `log10(1 + SSD)` in thousandths; `BarChart` only takes integers.
    value: u64,
    text: String,
    chosen: bool,
}

fn ssd_bar_data(run: &RunOutput, selected: usize, n: usize) -> Vec<SsdBar> {
    let selection = &run.outcome.selection;
    let Some(fit) = selection.fits.get(selected) else {
        return Vec::new();
    };
    let Some(ts) = selection.scores.iter().find(|s| s.training_id == fit.training_id) else {
        return Vec::new();
    };

    lowest_scores(&ts.scores, n)
        .into_iter()
        .map(|e| {
            let log = e.ssd.ln_1p() / std::f64::consts::LN_10;
            SsdBar {
                label: e.reference_id.clone(),
                value: (log * 1000.0).round() as u64,
                text: format!("{log:.2}"),
                chosen: e.reference_id == fit.reference_id,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.1}");
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        let rect = Rect {
            x: start,
            y,
            width: label.len() as u16,
            height: 1,
        };
        frame.render_widget(Paragraph::new(label).style(style), rect);
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        let rect = Rect {
            x: start,
            y,
            width: label.len() as u16,
            height: 1,
        };
        frame.render_widget(Paragraph::new(label).style(style), rect);
    }

    let x_label = Paragraph::new("x")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::match_tables;
    use crate::data::{SeriesTable, TestPoints};
    use crate::domain::{DomainPolicy, Sample};
    use crate::fit::selection::SelectOptions;
    use crate::io::ingest::{IngestedData, RowError};
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn config() -> RunConfig {
        RunConfig {
            train_path: PathBuf::from("train.csv"),
            ideal_path: PathBuf::from("ideal.csv"),
            test_path: PathBuf::from("test.csv"),
            expected_train: 0,
            domain_policy: DomainPolicy::Abort,
            require_distinct: true,
            accepted_only: false,
            top_ssd: 5,
            print_rows: 20,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_summary: None,
        }
    }

    fn output() -> RunOutput {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let train = SeriesTable::from_columns(
            "train",
            &xs,
            vec![
                ("y1".to_string(), vec![0.1, 1.0, 2.1, 3.0]),
                ("y2".to_string(), vec![5.0, 5.1, 4.9, 5.0]),
            ],
        )
        .unwrap();
        let ideal = SeriesTable::from_columns(
            "ideal",
            &xs,
            vec![
                ("y1".to_string(), vec![5.0, 5.0, 5.0, 5.0]),
                ("y2".to_string(), vec![0.0, 1.0, 2.0, 3.0]),
                ("y3".to_string(), vec![0.0, 2.0, 4.0, 6.0]),
            ],
        )
        .unwrap();
        let test = TestPoints::new(vec![
            Sample::new(1.0, 1.05),
            Sample::new(2.0, 5.0),
            Sample::new(3.0, 40.0),
        ]);
        let outcome = match_tables(&train, &ideal, &test, &SelectOptions::default()).unwrap();
        RunOutput {
            ingest: IngestedData {
                train,
                ideal,
                test,
                row_errors: Vec::new(),
                test_rows_read: 3,
            },
            outcome,
        }
    }

    #[test]
    fn chart_groups_points_by_reference() {
        let data = chart_data(&output(), 1, true);
        assert_eq!(data.curves.len(), 2);
        assert_eq!(data.assigned[0], vec![(1.0, 1.05)]);
        assert_eq!(data.assigned[1], vec![(2.0, 5.0)]);
        assert_eq!(data.unassigned, vec![(3.0, 40.0)]);
        assert_eq!(data.highlight, Some(1));
        assert_eq!(data.x_bounds, [0.0, 3.0]);
        assert!(data.y_bounds[1] > 40.0);

        let hidden = chart_data(&output(), 0, false);
        assert!(hidden.unassigned.is_empty());
    }

    #[test]
    fn ssd_bars_start_with_the_chosen_reference() {
        let bars = ssd_bar_data(&output(), 0, 2);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, "ideal.y2");
        assert!(bars[0].chosen);
        assert!(!bars[1].chosen);
        assert!(bars[0].value < bars[1].value);
    }

    #[test]
    fn keys_cycle_and_toggle() {
        let mut app = App::with_output(config(), output());
        assert!(!app.handle_key(KeyCode::Right));
        assert_eq!(app.selected, 1);
        assert!(!app.handle_key(KeyCode::Right));
        assert_eq!(app.selected, 0);
        assert!(!app.handle_key(KeyCode::Left));
        assert_eq!(app.selected, 1);
        assert!(!app.handle_key(KeyCode::Char('u')));
        assert!(!app.show_unassigned);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn draws_into_a_test_backend() {
        let mut app = App::with_output(config(), output());
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("train.y1 -> ideal.y2"));
    }

    #[test]
    fn status_reports_skipped_rows() {
        let mut run = output();
        assert_eq!(load_status("Ready", &run), "Ready.");
        run.ingest.row_errors.push(RowError {
            line: 4,
            message: "bad float".to_string(),
        });
        let app = App::with_output(config(), run);
        assert_eq!(app.status, "Ready (1 test rows skipped).");
    }
}
