use std::io;

use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use crate::error::{AppError, Result};
use crate::report::series::ReportSeries;
use crate::types::Level;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Show the cumulative correct-submission chart and block until `q`/`Esc`.
pub fn render(title: &str, series: &ReportSeries) -> Result<()> {
    enable_raw_mode().map_err(render_err)?;

    let shown = show(title, series);

    // Restore terminal regardless of result
    let steps: [RestoreStep; 2] = [
        Box::new(disable_raw_mode),
        Box::new(|| execute!(io::stdout(), LeaveAlternateScreen, Show)),
    ];
    let restored = run_all(steps);

    shown.and(restored).map_err(render_err)
}

type RestoreStep = Box<dyn FnOnce() -> io::Result<()>>;

/// Runs every step, even after a failure, and returns the first error.
fn run_all(steps: impl IntoIterator<Item = RestoreStep>) -> io::Result<()> {
    let mut first_err = None;
    for step in steps {
        if let Err(e) = step() {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn show(title: &str, series: &ReportSeries) -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    run_loop(&mut terminal, title, series)
}

fn render_err(e: io::Error) -> AppError {
    AppError::Render(e.to_string())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    title: &str,
    series: &ReportSeries,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, title, series))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press
                && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc)
            {
                return Ok(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

pub fn draw(f: &mut Frame, title: &str, series: &ReportSeries) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // chart
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    draw_chart(f, title, series, chunks[0]);
    f.render_widget(
        Paragraph::new(" q/Esc: quit").style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );
}

fn draw_chart(f: &mut Frame, title: &str, series: &ReportSeries, area: Rect) {
    let level_one = series.points(Level::One);
    let level_two = series.points(Level::Two);

    let datasets = vec![
        Dataset::default()
            .name("Level one")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&level_one),
        Dataset::default()
            .name("Level two")
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Green))
            .data(&level_two),
    ];

    let x_max = series.len().saturating_sub(1).max(1) as f64;
    let y_max = series.total(Level::One).max(series.total(Level::Two)).max(1) as f64;

    let x_labels = vec![
        Span::raw("0"),
        Span::raw(format!("{}", (x_max / 2.0).round())),
        Span::raw(format!("{x_max}")),
    ];
    let y_labels = vec![
        Span::raw("0"),
        Span::raw(format!("{}", (y_max / 2.0).round())),
        Span::raw(format!("{y_max}")),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().title(format!(" {title} ")).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("Match")
                .style(Style::default().fg(Color::Gray))
                .labels(x_labels)
                .bounds([0.0, x_max]),
        )
        .y_axis(
            Axis::default()
                .title("Solved")
                .style(Style::default().fg(Color::Gray))
                .labels(y_labels)
                .bounds([0.0, y_max]),
        );

    f.render_widget(chart, area);
}
