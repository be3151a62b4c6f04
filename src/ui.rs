use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use std::time::Duration;
use typefall::{
    classic::ClassicEngine,
    matching::MatchClass,
    scores::GameMode,
    survival::SurvivalEngine,
};

use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Columns available to falling words in a terminal `cols` wide
pub fn play_width_for(cols: u16) -> f64 {
    f64::from(cols.saturating_sub(HORIZONTAL_MARGIN * 2 + 2).max(10))
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen() {
            Screen::Menu => render_menu(self, area, buf),
            Screen::LoadError => render_load_error(self, area, buf),
            Screen::Playing(GameMode::Classic) => {
                if let Some(engine) = self.session.classic() {
                    render_classic(engine, area, buf);
                }
            }
            Screen::Playing(GameMode::Survival) => {
                if let Some(engine) = self.session.survival() {
                    render_survival(engine, self.now, area, buf);
                }
            }
            Screen::Results(mode) => render_results(self, mode, area, buf),
        }
    }
}

fn centered_rows(area: Rect, rows: &[u16]) -> Vec<Rect> {
    let used: u16 = rows.iter().sum();
    let pad = area.height.saturating_sub(used) / 2;

    let mut constraints = vec![Constraint::Length(pad)];
    constraints.extend(rows.iter().map(|r| Constraint::Length(*r)));
    constraints.push(Constraint::Min(0));

    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(constraints)
        .split(area)
        .iter()
        .skip(1)
        .take(rows.len())
        .copied()
        .collect()
}

fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = centered_rows(area, &[2, 2, 9, 1]);

    Paragraph::new(Span::styled("typefall", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        "(1) classic   (2) survival   (esc)ape",
        italic(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    let classic_lines: Vec<String> = app
        .classic_board
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {} wpm - {}% acc", i + 1, s.wpm, s.accuracy))
        .collect();
    let survival_lines: Vec<String> = app
        .survival_board
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. score {} - level {}", i + 1, s.score, s.level))
        .collect();

    render_board("Classic", &classic_lines, columns[0], buf);
    render_board("Survival", &survival_lines, columns[1], buf);
}

fn render_board(title: &str, lines: &[String], area: Rect, buf: &mut Buffer) {
    let body: Vec<Line> = if lines.is_empty() {
        vec![Line::from(Span::styled("No scores yet", italic()))]
    } else {
        lines.iter().map(|l| Line::from(l.as_str())).collect()
    };

    Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_load_error(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = centered_rows(area, &[2, 3, 1]);

    Paragraph::new(Span::styled(
        "Could not load words",
        bold().fg(Color::Red),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    Paragraph::new(app.session.last_error().unwrap_or_default().to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    Paragraph::new(Span::styled("(r)etry / (m)enu / (esc)ape", italic()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

fn render_classic(engine: &ClassicEngine, area: Rect, buf: &mut Buffer) {
    let chunks = centered_rows(area, &[1, 2, 2, 2, 1]);

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(engine.time_fraction().clamp(0.0, 1.0))
        .label(format!("{}s", engine.session().time_left_secs))
        .render(chunks[0], buf);

    let word_line = match engine.revealed() {
        Some(word) => Line::from(Span::styled(word.to_string(), bold().fg(Color::Yellow))),
        None => {
            let split = engine.highlight();
            Line::from(vec![
                Span::styled(split.matched_prefix, bold().fg(Color::Green)),
                Span::styled(split.remainder, dim_bold()),
            ])
        }
    };
    Paragraph::new(word_line)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let input_style = match engine.feedback() {
        Some(MatchClass::Exact) => bold().fg(Color::Green),
        Some(MatchClass::Close) => bold().fg(Color::Yellow),
        Some(MatchClass::Wrong) => bold().fg(Color::Red),
        None => bold(),
    };
    Paragraph::new(Line::from(vec![
        Span::styled("> ", dim_bold()),
        Span::styled(engine.input().to_string(), input_style),
        Span::styled("_", dim_bold()),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} perfect   {} close",
            engine.wpm(),
            engine.accuracy(),
            engine.session().perfect_words,
            engine.session().imperfect_words
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    Paragraph::new(Span::styled("(enter) submit / (esc) menu", italic()))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}

fn render_survival(engine: &SurvivalEngine, now: Duration, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN / 2)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    let health_color = if engine.health_fraction() > 0.3 {
        Color::Green
    } else {
        Color::Red
    };
    Gauge::default()
        .gauge_style(Style::default().fg(health_color))
        .ratio(engine.health_fraction())
        .label(format!("health {}", engine.stats().health.max(0)))
        .render(chunks[0], buf);

    let stats = engine.stats();
    Paragraph::new(Span::styled(
        format!(
            "score {}   level {}   destroyed {}",
            stats.score, stats.level, stats.words_destroyed
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let field = Block::default().borders(Borders::ALL);
    let inner = field.inner(chunks[2]);
    field.render(chunks[2], buf);

    let play_width = engine.config().play_width;
    for word in engine.view(now) {
        if inner.width == 0 || inner.height == 0 {
            break;
        }
        let col = ((word.x / play_width) * f64::from(inner.width)) as u16;
        let row = (word.fall_fraction * f64::from(inner.height - 1)).round() as u16;
        let x = inner.x + col.min(inner.width - 1);
        let y = inner.y + row.min(inner.height - 1);

        let line = Line::from(vec![
            Span::styled(word.highlight.matched_prefix, bold().fg(Color::Green)),
            Span::styled(word.highlight.remainder, bold()),
        ]);
        buf.set_line(x, y, &line, inner.right().saturating_sub(x));
    }

    Paragraph::new(Line::from(vec![
        Span::styled("> ", dim_bold()),
        Span::styled(engine.input().to_string(), bold()),
        Span::styled("_", dim_bold()),
    ]))
    .render(chunks[3], buf);
}

fn render_results(app: &App, mode: GameMode, area: Rect, buf: &mut Buffer) {
    let chunks = centered_rows(area, &[2, 1, 1, 2, 1]);

    Paragraph::new(Span::styled("Game over", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let (headline, detail) = match mode {
        GameMode::Classic => app
            .session
            .classic()
            .and_then(ClassicEngine::result)
            .map(|s| {
                (
                    format!("{} wpm   {}% acc", s.wpm, s.accuracy),
                    format!(
                        "{} words   perfect: {} | almost: {}",
                        s.words_typed, s.perfect_words, s.imperfect_words
                    ),
                )
            }),
        GameMode::Survival => app
            .session
            .survival()
            .and_then(SurvivalEngine::result)
            .map(|s| {
                (
                    format!("score {}   level {}", s.score, s.level),
                    format!("{} words destroyed", s.words_destroyed),
                )
            }),
    }
    .unwrap_or_default();

    Paragraph::new(Span::styled(headline, bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    Paragraph::new(Span::styled(detail, Style::default().fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    Paragraph::new(Span::styled("(r)etry / (m)enu / (esc)ape", italic()))
        .render(chunks[4], buf);
}
