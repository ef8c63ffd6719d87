use crate::output::{format_age, format_average, format_total, truncate_name};
use crate::scoring::MAX_SCORE;
use crate::tui::app::{App, InputMode, JudgeScreen, RatingForm, Route, DEFAULT_SCORE};
use crate::tui::theme::ThemeColors;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};

const APP_TITLE: &str = "Challenge Hub";

pub fn draw(frame: &mut Frame, app: &mut App, colors: &ThemeColors) {
    let area = frame.area();

    // Handle very small terminal sizes gracefully
    if area.height < 6 || area.width < 30 {
        let msg = Paragraph::new("Terminal too small").alignment(Alignment::Center);
        frame.render_widget(msg, area);
        return;
    }

    // Layout: Title(1) + Tabs(1) + Body(fill) + Status(1)
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .split(area);

    render_title(frame, chunks[0], app, colors);
    render_tabs(frame, chunks[1], app, colors);
    match app.route {
        Route::Ranking => render_ranking(frame, chunks[2], app, colors),
        Route::Judge => render_judge(frame, chunks[2], app, colors),
        Route::Reports => render_reports(frame, chunks[2], app, colors),
    }
    render_status_bar(frame, chunks[3], app, colors);

    if app.input_mode == InputMode::Help {
        render_help_popup(frame, colors);
    }

    // Loading overlay goes on top of everything
    if app.is_loading || app.is_saving {
        render_loading_overlay(frame, app, colors);
    }
}

fn render_title(frame: &mut Frame, area: Rect, app: &App, colors: &ThemeColors) {
    let mut spans = vec![Span::styled(APP_TITLE, Style::default().fg(colors.title_color).bold())];

    let who = match &app.identity {
        Some(identity) => format!("{} @ {}", identity, app.backend_label),
        None => format!("viewer @ {}", app.backend_label),
    };
    let padding_len = (area.width as usize).saturating_sub(APP_TITLE.len() + who.chars().count());
    spans.push(Span::raw(" ".repeat(padding_len)));
    spans.push(Span::styled(who, Style::default().fg(colors.muted)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App, colors: &ThemeColors) {
    let titles: Vec<String> = Route::ALL
        .iter()
        .enumerate()
        .map(|(i, route)| format!("{} {}", i + 1, route.title()))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.route.index())
        .style(colors.tab_inactive_style)
        .highlight_style(colors.tab_active_style)
        .divider(" | ");

    frame.render_widget(tabs, area);
}

fn render_ranking(frame: &mut Frame, area: Rect, app: &mut App, colors: &ThemeColors) {
    if app.ranking.is_empty() {
        let msg = if app.snapshot.is_none() {
            "Waiting for data..."
        } else {
            "No projects to rank yet"
        };
        frame.render_widget(Paragraph::new(msg).alignment(Alignment::Center), area);
        return;
    }

    let criteria = app.criteria().to_vec();
    let best_total = app.ranking.iter().map(|r| r.total).fold(0.0_f64, f64::max);

    let rows: Vec<Row> = app
        .ranking
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let position_style = match colors.podium(row.position) {
                Some(color) => Style::default().fg(color).bold(),
                None => Style::default().fg(colors.index_color),
            };

            let mut cells = vec![
                Cell::from(format!("{}.", row.position)).style(position_style),
                Cell::from(row.project.name.clone()),
            ];
            for criterion in &criteria {
                let avg = row.average_for(&criterion.id);
                let style = if avg == 0.0 {
                    Style::default().fg(colors.muted)
                } else {
                    Style::default().fg(colors.score_color(avg, MAX_SCORE))
                };
                cells.push(Cell::from(format!("{:>5}", format_average(avg))).style(style));
            }

            let mut total_spans = vec![Span::styled(
                format!("{:>6} ", format_total(row.total)),
                Style::default().fg(colors.score_color(row.total, best_total)).bold(),
            )];
            total_spans.extend(score_bar(row.total, best_total, 8, colors).spans);
            cells.push(Cell::from(Line::from(total_spans)));

            let row_style = if idx % 2 == 1 {
                Style::default().bg(colors.row_alt_bg)
            } else {
                Style::default()
            };
            Row::new(cells).style(row_style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(4), Constraint::Fill(1)];
    widths.extend(criteria.iter().map(|c| Constraint::Length(c.name.chars().count().clamp(5, 14) as u16)));
    widths.push(Constraint::Length(16));

    let mut header = vec!["#".to_string(), "Project".to_string()];
    header.extend(criteria.iter().map(|c| truncate_name(&c.name, 14)));
    header.push("Total".to_string());

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(colors.header_style).bottom_margin(1))
        .row_highlight_style(colors.row_selected);

    frame.render_stateful_widget(table, area, &mut app.ranking_state);
}

fn render_judge(frame: &mut Frame, area: Rect, app: &mut App, colors: &ThemeColors) {
    if let JudgeScreen::Form(form) = &app.judge_screen {
        let comment_active = app.input_mode == InputMode::CommentInput;
        render_rating_form(frame, area, form, comment_active, colors);
        return;
    }

    let chunks = Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).split(area);

    let name = app.identity.as_ref().map(|i| i.display_name().to_string()).unwrap_or_default();
    let summary = match app.judge_totals() {
        Some((done, total)) => format!("{} projects evaluated", format_fraction(done, total)),
        None => String::new(),
    };
    let header = Line::from(vec![
        Span::styled(name, Style::default().bold()),
        Span::raw("  "),
        Span::styled(summary, Style::default().fg(colors.muted)),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    if app.projects().is_empty() {
        frame.render_widget(
            Paragraph::new("No projects to evaluate").alignment(Alignment::Center),
            chunks[1],
        );
        return;
    }

    let rows: Vec<Row> = app
        .projects()
        .iter()
        .enumerate()
        .map(|(idx, project)| {
            let progress = app.progress_for(&project.id);
            let (mark, mark_color, detail) = match progress {
                Some(p) => {
                    let comment = if p.has_comment { "Commented" } else { "No comment" };
                    let mut spans = score_bar(p.ratio() * MAX_SCORE, MAX_SCORE, 6, colors).spans;
                    spans.push(Span::styled(
                        format!(" {} criteria • {}", format_fraction(p.rated, p.total), comment),
                        Style::default().fg(colors.muted),
                    ));
                    if p.is_complete() {
                        ("✓", colors.complete, Line::from(spans))
                    } else {
                        ("…", colors.incomplete, Line::from(spans))
                    }
                }
                None => (" ", colors.muted, Line::default()),
            };

            let row_style = if idx % 2 == 1 {
                Style::default().bg(colors.row_alt_bg)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(mark).style(Style::default().fg(mark_color).bold()),
                Cell::from(project.name.clone()),
                Cell::from(detail),
            ])
            .style(row_style)
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(2), Constraint::Fill(1), Constraint::Length(40)],
    )
    .header(
        Row::new(vec!["", "Project", "Progress"])
            .style(colors.header_style)
            .bottom_margin(1),
    )
    .row_highlight_style(colors.row_selected);

    frame.render_stateful_widget(table, chunks[1], &mut app.judge_state);
}

fn render_rating_form(
    frame: &mut Frame,
    area: Rect,
    form: &RatingForm,
    comment_active: bool,
    colors: &ThemeColors,
) {
    let criteria_height = form.criteria.len() as u16 + 2;
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(criteria_height),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .split(area);

    let title = Line::from(vec![
        Span::styled("Evaluating ", Style::default().fg(colors.muted)),
        Span::styled(form.project.name.clone(), Style::default().fg(colors.title_color).bold()),
    ]);
    frame.render_widget(Paragraph::new(title), chunks[0]);

    let lines: Vec<Line> = if form.criteria.is_empty() {
        vec![Line::from(Span::styled("No criteria defined", Style::default().fg(colors.muted)))]
    } else {
        form.criteria
            .iter()
            .enumerate()
            .map(|(i, criterion)| {
                let marker = if i == form.selected { "▶ " } else { "  " };
                let mut spans = vec![
                    Span::styled(marker, Style::default().fg(colors.input_active)),
                    Span::raw(format!("{:<20} ", truncate_name(&criterion.name, 20))),
                ];
                match form.score(&criterion.id) {
                    Some(score) => {
                        spans.extend(score_bar(score, MAX_SCORE, 20, colors).spans);
                        spans.push(Span::styled(
                            format!(" {:>4.1}", score),
                            Style::default().fg(colors.score_color(score, MAX_SCORE)).bold(),
                        ));
                    }
                    None => {
                        spans.extend(score_bar(DEFAULT_SCORE, MAX_SCORE, 20, colors).spans);
                        spans.push(Span::styled(
                            format!(" {:>4.1} not set", DEFAULT_SCORE),
                            Style::default().fg(colors.muted),
                        ));
                    }
                }
                Line::from(spans)
            })
            .collect()
    };
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" Scores (1-10) ")),
        chunks[1],
    );

    let border_color = if comment_active { colors.input_active } else { colors.muted };
    let comment_text = if comment_active {
        format!("{}|", form.comment)
    } else if form.comment.is_empty() {
        "Press c to write a comment".to_string()
    } else {
        form.comment.clone()
    };
    let comment = Paragraph::new(comment_text)
        .wrap(Wrap { trim: false })
        .block(
            Block::bordered()
                .title(" Comment ")
                .border_style(Style::default().fg(border_color)),
        );
    frame.render_widget(comment, chunks[2]);

    let footer = if form.can_submit() {
        Span::styled("Ready to save: press s", Style::default().fg(colors.complete))
    } else {
        Span::styled(
            "Score every criterion and write a comment to save",
            Style::default().fg(colors.muted),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(footer)), chunks[3]);
}

fn render_reports(frame: &mut Frame, area: Rect, app: &mut App, colors: &ThemeColors) {
    if app.reports.is_empty() {
        frame.render_widget(Paragraph::new("No projects found").alignment(Alignment::Center), area);
        return;
    }

    let chunks = Layout::horizontal([Constraint::Percentage(35), Constraint::Fill(1)]).split(area);

    let rows: Vec<Row> = app
        .reports
        .iter()
        .map(|report| {
            Row::new(vec![
                Cell::from(report.project.name.clone()),
                Cell::from(format!("{:>5}", format_total(report.average)))
                    .style(Style::default().fg(colors.score_color(report.average, MAX_SCORE))),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Fill(1), Constraint::Length(6)])
        .header(Row::new(vec!["Project", "Score"]).style(colors.header_style))
        .row_highlight_style(colors.row_selected)
        .block(Block::bordered());
    frame.render_stateful_widget(table, chunks[0], &mut app.report_state);

    let Some(report) = app.selected_report() else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(report.project.name.to_uppercase(), Style::default().bold())),
        Line::from(""),
        Line::from(Span::styled("Score breakdown", colors.header_style)),
    ];
    for (criterion, avg) in &report.criterion_averages {
        let mut spans = vec![Span::raw(format!("  {:<20} ", truncate_name(&criterion.name, 20)))];
        spans.extend(score_bar(*avg, MAX_SCORE, 10, colors).spans);
        spans.push(Span::raw(format!(" {}", format_total(*avg))));
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Overall score  "),
        Span::styled(
            format!("{} of {}", format_total(report.average), format_total(MAX_SCORE)),
            Style::default().fg(colors.score_color(report.average, MAX_SCORE)).bold(),
        ),
        Span::styled(
            format!("  ({} ratings)", report.rating_count),
            Style::default().fg(colors.muted),
        ),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Judges' comments", colors.header_style)));
    if report.comments.is_empty() {
        lines.push(Line::from(Span::styled("  No comments.", Style::default().fg(colors.muted))));
    }
    for comment in &report.comments {
        let judge = comment.judge.as_deref().unwrap_or("Unknown judge");
        lines.push(Line::from(vec![
            Span::styled(format!("  {}: ", judge), Style::default().fg(colors.title_color)),
            Span::raw(comment.text.clone()),
        ]));
    }

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(Block::bordered()),
        chunks[1],
    );
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, colors: &ThemeColors) {
    let text = if let Some((ref msg, _)) = app.flash_message {
        let msg_color = if msg.starts_with("Error")
            || msg.starts_with("Refresh failed")
            || msg.starts_with("Cannot")
            || msg.starts_with("Log in")
        {
            colors.flash_error
        } else if msg.starts_with("Evaluation saved") {
            colors.flash_success
        } else {
            colors.flash_info
        };
        Line::from(Span::styled(msg.clone(), Style::default().fg(msg_color)))
    } else {
        let mut spans = vec![
            Span::styled(format!("{} projects", app.projects().len()), Style::default().fg(colors.muted)),
            Span::raw(" "),
            Span::styled(refreshed_label(app), Style::default().fg(colors.muted)),
        ];
        if app.stale {
            spans.push(Span::raw(" "));
            spans.push(Span::styled("[stale]", Style::default().fg(colors.stale_color).bold()));
        }
        spans.push(Span::raw("  "));

        let in_form = app.route == Route::Judge && matches!(app.judge_screen, JudgeScreen::Form(_));
        let hints: &[(&str, &str)] = if app.input_mode == InputMode::CommentInput {
            &[("Enter", ":done "), ("Bksp", ":delete")]
        } else if in_form {
            &[
                ("j/k", ":criterion "),
                ("h/l", ":score "),
                ("Space", ":set "),
                ("c", ":comment "),
                ("s", ":save "),
                ("Esc", ":back"),
            ]
        } else if app.route == Route::Judge {
            &[("j/k", ":nav "), ("Enter", ":evaluate "), ("Tab", ":next tab "), ("?", ":help "), ("q", ":quit")]
        } else {
            &[("j/k", ":nav "), ("r", ":refresh "), ("Tab", ":next tab "), ("?", ":help "), ("q", ":quit")]
        };

        for (i, (key, label)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(colors.status_key_color)));
            spans.push(Span::raw(*label));
        }
        Line::from(spans)
    };

    frame.render_widget(
        Paragraph::new(text).style(Style::default().bg(colors.status_bar_bg)),
        area,
    );
}

fn refreshed_label(app: &App) -> String {
    let elapsed = chrono::Duration::from_std(app.last_refresh.elapsed()).unwrap_or(chrono::Duration::zero());
    match format_age(elapsed).as_str() {
        "now" => "refreshed just now".to_string(),
        age => format!("refreshed {} ago", age),
    }
}

fn format_fraction(done: usize, total: usize) -> String {
    format!("{}/{}", done, total)
}

fn score_bar(score: f64, max_score: f64, width: usize, colors: &ThemeColors) -> Line<'static> {
    let ratio = if max_score > 0.0 {
        (score / max_score).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    let bar_color = colors.score_color(score, max_score);

    let mut spans = Vec::new();
    if filled > 0 {
        spans.push(Span::styled("█".repeat(filled), Style::default().fg(bar_color)));
    }
    if empty > 0 {
        spans.push(Span::styled("░".repeat(empty), Style::default().fg(colors.bar_empty)));
    }

    Line::from(spans)
}

/// Create a centered rectangle with fixed width and height
fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect {
        x,
        y,
        width,
        height,
    }
}

fn render_help_popup(frame: &mut Frame, colors: &ThemeColors) {
    let popup_area = centered_rect_fixed(52, 19, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered()
        .title(Span::styled(" Keyboard Shortcuts ", colors.popup_title))
        .border_style(Style::default().fg(colors.popup_border));
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let key_style = Style::default().fg(colors.status_key_color).bold();
    let entries = [
        ("j / Down      ", "Move down"),
        ("k / Up        ", "Move up"),
        ("Tab           ", "Next tab"),
        ("1 / 2 / 3     ", "Ranking / Judge / Reports"),
        ("Enter         ", "Evaluate selected project"),
        ("h / l         ", "Lower / raise score by 0.5"),
        ("Space         ", "Keep the shown score"),
        ("c             ", "Write comment"),
        ("s             ", "Save evaluation"),
        ("Esc           ", "Back to project list"),
        ("r             ", "Refresh now"),
        ("?             ", "Show/hide this help"),
        ("q / Ctrl-c    ", "Quit"),
    ];

    let mut help_lines: Vec<Line> = entries
        .iter()
        .map(|(key, desc)| Line::from(vec![Span::styled(*key, key_style), Span::raw(*desc)]))
        .collect();
    help_lines.push(Line::from(""));
    help_lines.push(Line::from(Span::styled(
        "Press any key to close",
        Style::default().fg(colors.muted),
    )));

    frame.render_widget(Paragraph::new(help_lines), inner);
}

fn render_loading_overlay(frame: &mut Frame, app: &App, colors: &ThemeColors) {
    let popup_area = centered_rect_fixed(30, 3, frame.area());
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().border_style(Style::default().fg(colors.popup_border));
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    // Braille spinner animation
    let spinner_chars = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let spinner = spinner_chars[app.spinner_frame % spinner_chars.len()];

    let text = if app.is_saving {
        format!("{} Saving...", spinner)
    } else if app.snapshot.is_none() {
        format!("{} Loading...", spinner)
    } else {
        format!("{} Refreshing...", spinner)
    };

    let loading_text = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(colors.title_color));
    frame.render_widget(loading_text, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Criterion, Project, Snapshot};
    use crate::tui::app::Action;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Duration;

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let colors = ThemeColors::dark();
        terminal.draw(|frame| draw(frame, app, &colors)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_ranking_renders_projects_and_criteria() {
        let mut app = App::new_loading(None, Route::Ranking, Duration::from_secs(30), "store.json".to_string());
        app.dispatch(Action::Loaded(Snapshot {
            projects: vec![Project { id: "p1".to_string(), name: "AI for Recycling".to_string() }],
            criteria: vec![Criterion { id: "c1".to_string(), name: "Creativity".to_string() }],
            judges: Vec::new(),
            ratings: Vec::new(),
            comments: Vec::new(),
            fetched_at: Utc::now(),
        }));

        let screen = render(&mut app);
        assert!(screen.contains("Challenge Hub"));
        assert!(screen.contains("AI for Recycling"));
        assert!(screen.contains("Creativity"));
        assert!(screen.contains("0.00"));
    }

    #[test]
    fn test_tiny_terminal() {
        let mut app = App::new_loading(None, Route::Ranking, Duration::from_secs(30), "x".to_string());
        let backend = TestBackend::new(20, 4);
        let mut terminal = Terminal::new(backend).unwrap();
        let colors = ThemeColors::dark();
        terminal.draw(|frame| draw(frame, &mut app, &colors)).unwrap();
        let screen: String = terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("Terminal too small"));
    }
}
