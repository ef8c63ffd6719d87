use std::io::IsTerminal;
use chrono::{DateTime, Duration, Utc};
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::model::{Criterion, Snapshot};
use crate::scoring::{ProjectReport, RankingRow, MAX_SCORE};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a per-criterion average with one decimal.
/// A criterion nobody rated (average 0) shows as "-".
pub fn format_average(avg: f64) -> String {
    if avg == 0.0 {
        "-".to_string()
    } else {
        format!("{:.1}", avg)
    }
}

/// Format a ranking total with two decimals
pub fn format_total(total: f64) -> String {
    format!("{:.2}", total)
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
pub fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - len))
    }
}

/// Format the ranking as a table with columns: Position, Project, one column
/// per criterion, Total.
/// Position column: 3 chars (fits "99."), right-aligned
/// Criterion columns are as wide as their (truncated) header, at least 5
pub fn format_ranking_table(rows: &[RankingRow], criteria: &[Criterion], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No projects to rank yet.".to_string();
    }

    let separator = "  ";
    let criterion_headers: Vec<String> = criteria.iter().map(|c| truncate_name(&c.name, 12)).collect();
    let criterion_widths: Vec<usize> = criterion_headers
        .iter()
        .map(|h| h.chars().count().max(5))
        .collect();
    let total_width = 6;

    // Leave the rest of the line for the project name
    let fixed_width = 3
        + separator.len()
        + criterion_widths.iter().map(|w| w + separator.len()).sum::<usize>()
        + total_width
        + separator.len();
    let longest_name = rows
        .iter()
        .map(|r| r.project.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Project".len());
    let name_width = match get_terminal_width() {
        Some(width) if width > fixed_width + 10 => longest_name.min(width - fixed_width),
        Some(_) => longest_name.min(20),
        None => longest_name,
    };

    let mut header = format!("{:>3}{}{}", "#", separator, pad_right("Project", name_width));
    for (h, w) in criterion_headers.iter().zip(&criterion_widths) {
        header.push_str(separator);
        header.push_str(&format!("{:>width$}", h, width = w));
    }
    header.push_str(separator);
    header.push_str(&format!("{:>width$}", "Total", width = total_width));

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(if use_colors {
        header.dimmed().to_string()
    } else {
        header
    });

    for row in rows {
        let position = format!("{:>2}.", row.position);
        let name = pad_right(&truncate_name(&row.project.name, name_width), name_width);

        let mut averages = String::new();
        for (criterion, w) in criteria.iter().zip(&criterion_widths) {
            averages.push_str(separator);
            averages.push_str(&format!(
                "{:>width$}",
                format_average(row.average_for(&criterion.id)),
                width = w
            ));
        }
        let total = format!("{:>width$}", format_total(row.total), width = total_width);

        let line = if use_colors {
            let position = match row.position {
                1 => position.yellow().bold().to_string(),
                2 | 3 => position.bold().to_string(),
                _ => position.dimmed().to_string(),
            };
            format!("{}{}{}{}{}{}", position, separator, name, averages, separator, total.bold())
        } else {
            format!("{}{}{}{}{}{}", position, separator, name, averages, separator, total)
        };
        lines.push(line);
    }

    lines.join("\n")
}

/// Format the ranking as tab-separated values for scripting
/// Columns: position, project, one average per criterion (in criteria order), total
/// (no headers, no colors)
pub fn format_ranking_tsv(rows: &[RankingRow], criteria: &[Criterion]) -> String {
    rows.iter()
        .map(|row| {
            let mut fields = vec![row.position.to_string(), row.project.name.clone()];
            fields.extend(criteria.iter().map(|c| format!("{:.2}", row.average_for(&c.id))));
            fields.push(format_total(row.total));
            fields.join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format one printable project report
pub fn format_report(report: &ProjectReport, use_colors: bool) -> String {
    let mut out = Vec::new();

    let title = report.project.name.to_uppercase();
    let rule = "=".repeat(title.chars().count().max(20));
    if use_colors {
        out.push(title.bold().to_string());
    } else {
        out.push(title);
    }
    out.push(rule);

    out.push("Score breakdown".to_string());
    if report.criterion_averages.is_empty() {
        out.push("  No criteria defined.".to_string());
    }
    let name_width = report
        .criterion_averages
        .iter()
        .map(|(c, _)| c.name.chars().count())
        .max()
        .unwrap_or(0);
    for (criterion, avg) in &report.criterion_averages {
        out.push(format!(
            "  {}  {:>4}",
            pad_right(&criterion.name, name_width),
            format_average(*avg)
        ));
    }

    out.push(String::new());
    let overall = format!("{:.2}", report.average);
    out.push(format!(
        "Overall score  {} of {:.2}  ({} ratings)",
        if use_colors {
            overall.bold().to_string()
        } else {
            overall
        },
        MAX_SCORE,
        report.rating_count
    ));

    out.push(String::new());
    out.push("Judges' comments".to_string());
    if report.comments.is_empty() {
        out.push("  No comments.".to_string());
    }
    for comment in &report.comments {
        let judge = comment.judge.as_deref().unwrap_or("Unknown judge");
        let judge = if use_colors {
            judge.cyan().to_string()
        } else {
            judge.to_string()
        };
        out.push(format!("  {}: \"{}\"", judge, comment.text.trim()));
    }

    out.join("\n")
}

/// Format all reports, separated by blank lines, with a generation date footer
pub fn format_reports(reports: &[ProjectReport], generated_at: DateTime<Utc>, use_colors: bool) -> String {
    if reports.is_empty() {
        return "No projects found.".to_string();
    }

    let mut out: Vec<String> = reports.iter().map(|r| format_report(r, use_colors)).collect();
    out.push(format!("Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC")));
    out.join("\n\n")
}

/// Format judges, projects and criteria for `admin list`
pub fn format_catalog(snapshot: &Snapshot, use_colors: bool) -> String {
    fn section<'a>(
        title: &str,
        items: impl Iterator<Item = (&'a str, &'a str)>,
        use_colors: bool,
    ) -> String {
        let mut lines = vec![if use_colors {
            title.bold().to_string()
        } else {
            title.to_string()
        }];
        let items: Vec<(&str, &str)> = items.collect();
        if items.is_empty() {
            lines.push("  (none)".to_string());
        }
        let id_width = items.iter().map(|(id, _)| id.chars().count()).max().unwrap_or(0);
        for (id, name) in items {
            let id = pad_right(id, id_width);
            if use_colors {
                lines.push(format!("  {}  {}", id.dimmed(), name));
            } else {
                lines.push(format!("  {}  {}", id, name));
            }
        }
        lines.join("\n")
    }

    [
        section(
            "Judges",
            snapshot.judges.iter().map(|j| (j.id.as_str(), j.name.as_str())),
            use_colors,
        ),
        section(
            "Projects",
            snapshot.projects.iter().map(|p| (p.id.as_str(), p.name.as_str())),
            use_colors,
        ),
        section(
            "Criteria",
            snapshot.criteria.iter().map(|c| (c.id.as_str(), c.name.as_str())),
            use_colors,
        ),
    ]
    .join("\n\n")
}

/// Format a duration into a human-readable age string
/// "2h" for hours, "3d" for days, "1w" for weeks
pub fn format_age(duration: Duration) -> String {
    let hours = duration.num_hours();
    let days = duration.num_days();
    let weeks = days / 7;

    if weeks >= 1 {
        format!("{}w", weeks)
    } else if days >= 1 {
        format!("{}d", days)
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        let minutes = duration.num_minutes();
        if minutes >= 1 {
            format!("{}m", minutes)
        } else {
            "now".to_string()
        }
    }
}
