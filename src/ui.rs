pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, ListState,
        Paragraph, StatefulWidget, Widget, Wrap,
    },
};

use crate::{
    app::{App, AppState, Panel},
    clock::Clock,
    progress::{trend_line, DEFAULT_PROGRESS_LIMIT},
    store::Store,
    timer::TimerPhase,
    util::format_time,
};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const LABEL_STYLE: Style = Style::new().fg(Color::Gray);

impl<C: Clock, S: Store> Widget for &App<C, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let show_panels = self.panels.any_visible();

        let constraints = if show_panels {
            vec![
                Constraint::Percentage(35), // timer
                Constraint::Min(8),         // panels
                Constraint::Length(1),      // legend
            ]
        } else {
            vec![Constraint::Min(3), Constraint::Length(0), Constraint::Length(1)]
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(constraints)
            .split(area);

        render_timer(self, chunks[0], buf, bold_style);

        if show_panels {
            render_panels(self, chunks[1], buf, bold_style);
        }

        let legend_text = match &self.status {
            Some(status) => format!("{status}   (esc) quit"),
            None => String::from(
                "(space) hold to start, press to stop / (j/k) select / (d)elete / (s)tats (1-4) panels / (c)lear / (esc)ape",
            ),
        };
        Paragraph::new(Span::styled(legend_text, italic_style)).render(chunks[2], buf);

        if self.state == AppState::ConfirmClear {
            render_confirm_clear(self, area, buf, bold_style);
        }
    }
}

fn render_timer<C: Clock, S: Store>(app: &App<C, S>, area: Rect, buf: &mut Buffer, bold_style: Style) {
    let sw = &app.stopwatch;
    let color = match sw.phase() {
        TimerPhase::Idle => Color::White,
        // red until the hold is long enough to start, then green
        TimerPhase::Arming => match sw.held_for() {
            Some(held) if held >= sw.settings().min_hold => Color::Green,
            _ => Color::Red,
        },
        TimerPhase::Running => Color::Yellow,
        TimerPhase::Settled => Color::Cyan,
    };

    let top_padding = area.height.saturating_sub(2) / 2;
    let mut lines: Vec<Line> = (0..top_padding).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(
        sw.display(),
        bold_style.fg(color),
    )));
    if sw.phase() == TimerPhase::Settled {
        let best = app.session.snapshot().best;
        if best.is_some_and(|b| (b - sw.elapsed_ms()).abs() < f64::EPSILON) {
            lines.push(Line::from(Span::styled(
                "new best single",
                Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
            )));
        }
    }

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn panel_block(panel: Panel) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(panel.to_string())
}

/// Lay out whichever panels are switched on, left to right.
fn render_panels<C: Clock, S: Store>(app: &App<C, S>, area: Rect, buf: &mut Buffer, bold_style: Style) {
    let panels = app.panels;
    let show_overview = panels.is_visible(Panel::Overview);
    let show_averages = panels.is_visible(Panel::Averages);

    let mut constraints = Vec::new();
    if show_overview || show_averages {
        constraints.push(Constraint::Length(34));
    }
    if panels.is_visible(Panel::Times) {
        constraints.push(Constraint::Length(22));
    }
    if panels.is_visible(Panel::Chart) {
        constraints.push(Constraint::Min(20));
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    let mut slots = columns.iter().copied();

    if show_overview || show_averages {
        if let Some(column) = slots.next() {
            match (show_overview, show_averages) {
                (true, true) => {
                    let left = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([Constraint::Length(7), Constraint::Min(3)])
                        .split(column);
                    render_overview(app, left[0], buf, bold_style);
                    render_averages(app, left[1], buf, bold_style);
                }
                (true, false) => render_overview(app, column, buf, bold_style),
                _ => render_averages(app, column, buf, bold_style),
            }
        }
    }
    if panels.is_visible(Panel::Times) {
        if let Some(column) = slots.next() {
            render_times(app, column, buf, bold_style);
        }
    }
    if panels.is_visible(Panel::Chart) {
        if let Some(column) = slots.next() {
            render_progress_chart(app, column, buf, bold_style);
        }
    }
}

fn render_overview<C: Clock, S: Store>(app: &App<C, S>, area: Rect, buf: &mut Buffer, bold_style: Style) {
    let snapshot = app.session.snapshot();
    let rows = [
        ("Best", format_time(snapshot.best)),
        ("Worst", format_time(snapshot.worst)),
        ("Median", format_time(snapshot.median)),
        ("Mean", format_time(snapshot.mean)),
        ("Solves", snapshot.total_solves.to_string()),
    ];
    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label:<8}"), LABEL_STYLE),
                Span::styled(value, bold_style),
            ])
        })
        .collect();
    Paragraph::new(lines)
        .block(panel_block(Panel::Overview))
        .render(area, buf);
}

fn render_averages<C: Clock, S: Store>(app: &App<C, S>, area: Rect, buf: &mut Buffer, bold_style: Style) {
    let mut lines = vec![Line::from(Span::styled(
        format!("{:<7}{:>10}{:>10}", "", "current", "best"),
        LABEL_STYLE,
    ))];
    lines.extend(app.session.snapshot().windows.iter().map(|w| {
        Line::from(vec![
            Span::styled(format!("{:<7}", w.size.to_string()), LABEL_STYLE),
            Span::styled(format!("{:>10}", format_time(w.current)), bold_style),
            Span::styled(
                format!("{:>10}", format_time(w.best)),
                Style::default().fg(Color::Green),
            ),
        ])
    }));
    Paragraph::new(lines)
        .block(panel_block(Panel::Averages))
        .render(area, buf);
}

/// Newest first, with the delete cursor highlighted.
fn render_times<C: Clock, S: Store>(app: &App<C, S>, area: Rect, buf: &mut Buffer, bold_style: Style) {
    let solves = app.session.solves();
    if solves.is_empty() {
        Paragraph::new(Span::styled(
            "no times yet",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))
        .block(panel_block(Panel::Times))
        .wrap(Wrap { trim: true })
        .render(area, buf);
        return;
    }

    let items: Vec<ListItem> = solves
        .iter()
        .enumerate()
        .map(|(i, solve)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{:<5}", solves.len() - i), LABEL_STYLE),
                Span::styled(format_time(Some(solve.elapsed_ms)), bold_style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(Panel::Times))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.selected()));
    StatefulWidget::render(list, area, buf, &mut state);
}

fn render_progress_chart<C: Clock, S: Store>(
    app: &App<C, S>,
    area: Rect,
    buf: &mut Buffer,
    bold_style: Style,
) {
    let block = panel_block(Panel::Chart);
    let points = app.session.progress(DEFAULT_PROGRESS_LIMIT);

    if points.len() < 2 {
        Paragraph::new(Span::styled(
            "complete some solves to see your progress",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
        return;
    }

    let (x_bounds, y_bounds) = charting::compute_chart_params(&points);
    let line: Vec<(f64, f64)> = points.iter().map(|&p| p.into()).collect();
    let bests: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| p.personal_best)
        .map(|&p| p.into())
        .collect();
    let fit = trend_line(&points);
    let trend: Vec<(f64, f64)> = fit
        .map(|t| charting::trend_segment(&points, &t))
        .unwrap_or_default();
    let trend_color = match fit {
        Some(t) if t.is_improving() => Color::Green,
        _ => Color::Rgb(255, 136, 0),
    };

    let datasets = vec![
        Dataset::default()
            .name("time")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Blue))
            .graph_type(GraphType::Line)
            .data(&line),
        Dataset::default()
            .name("pb")
            .marker(Marker::Dot)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Scatter)
            .data(&bests),
        Dataset::default()
            .name("trend")
            .marker(Marker::Braille)
            .style(Style::default().fg(trend_color))
            .graph_type(GraphType::Line)
            .data(&trend),
    ];

    Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("solve")
                .bounds(x_bounds)
                .labels(vec![
                    Span::styled(charting::format_label(x_bounds[0]), bold_style),
                    Span::styled(charting::format_label(x_bounds[1]), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .labels(vec![
                    Span::styled(format_time(Some(y_bounds[0])), bold_style),
                    Span::styled(format_time(Some(y_bounds[1])), bold_style),
                ]),
        )
        .render(area, buf);
}

fn render_confirm_clear<C: Clock, S: Store>(
    app: &App<C, S>,
    area: Rect,
    buf: &mut Buffer,
    bold_style: Style,
) {
    let popup = centered_rect(area, 46, 5);
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Clear all {} solves and bests?", app.session.solves().len()),
            bold_style,
        )),
        Line::from("This cannot be undone. (y/n)"),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Confirm")
            .border_style(Style::default().fg(Color::Red)),
    )
    .alignment(Alignment::Center)
    .render(popup, buf);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
