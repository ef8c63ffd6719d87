//! Color palettes for the TUI

use ratatui::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// Pick a palette from the terminal background, falling back to dark
pub fn resolve_theme() -> Theme {
    match terminal_light::luma() {
        Ok(luma) if luma > 0.6 => Theme::Light,
        Ok(_) => Theme::Dark,
        Err(e) => {
            tracing::debug!("could not detect terminal background: {}", e);
            Theme::Dark
        }
    }
}

/// Complete color palette for the TUI
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Score colors, green is best
    pub score_high: Color,
    pub score_mid: Color,
    pub score_low: Color,
    pub bar_empty: Color,

    // Podium
    pub gold: Color,
    pub silver: Color,
    pub bronze: Color,

    // Table
    pub row_alt_bg: Color,
    pub index_color: Color,
    pub header_style: Style,
    pub row_selected: Style,

    pub muted: Color,
    pub title_color: Color,
    pub stale_color: Color,

    // Tabs
    pub tab_active_style: Style,
    pub tab_inactive_style: Style,

    // Status bar
    pub status_bar_bg: Color,
    pub status_key_color: Color,
    pub flash_success: Color,
    pub flash_error: Color,
    pub flash_info: Color,

    // Judge progress
    pub complete: Color,
    pub incomplete: Color,

    // Popups and input
    pub popup_border: Color,
    pub popup_title: Style,
    pub input_active: Color,
}

impl ThemeColors {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            score_high: Color::Green,
            score_mid: Color::Yellow,
            score_low: Color::Red,
            bar_empty: Color::DarkGray,
            gold: Color::Rgb(255, 215, 0),
            silver: Color::Rgb(192, 192, 192),
            bronze: Color::Rgb(205, 127, 50),
            row_alt_bg: Color::Indexed(235),
            index_color: Color::DarkGray,
            header_style: Style::new().bold(),
            row_selected: Style::new().reversed(),
            muted: Color::Gray,
            title_color: Color::Cyan,
            stale_color: Color::Yellow,
            tab_active_style: Style::new().fg(Color::Cyan).bold().reversed(),
            tab_inactive_style: Style::new().fg(Color::DarkGray),
            status_bar_bg: Color::Indexed(236),
            status_key_color: Color::Cyan,
            flash_success: Color::Green,
            flash_error: Color::Red,
            flash_info: Color::White,
            complete: Color::Green,
            incomplete: Color::Yellow,
            popup_border: Color::Cyan,
            popup_title: Style::new().fg(Color::Cyan).bold(),
            input_active: Color::Cyan,
        }
    }

    pub fn light() -> Self {
        Self {
            score_high: Color::Rgb(0, 128, 0),
            score_mid: Color::Rgb(180, 120, 0),
            score_low: Color::Rgb(190, 0, 0),
            bar_empty: Color::Indexed(250),
            gold: Color::Rgb(184, 134, 11),
            silver: Color::Rgb(112, 112, 112),
            bronze: Color::Rgb(139, 69, 19),
            row_alt_bg: Color::Indexed(254),
            index_color: Color::Indexed(244),
            header_style: Style::new().bold(),
            row_selected: Style::new().reversed(),
            muted: Color::Indexed(240),
            title_color: Color::Blue,
            stale_color: Color::Rgb(180, 120, 0),
            tab_active_style: Style::new().fg(Color::Blue).bold().reversed(),
            tab_inactive_style: Style::new().fg(Color::Indexed(244)),
            status_bar_bg: Color::Indexed(253),
            status_key_color: Color::Blue,
            flash_success: Color::Rgb(0, 128, 0),
            flash_error: Color::Rgb(190, 0, 0),
            flash_info: Color::Black,
            complete: Color::Rgb(0, 128, 0),
            incomplete: Color::Rgb(180, 120, 0),
            popup_border: Color::Blue,
            popup_title: Style::new().fg(Color::Blue).bold(),
            input_active: Color::Blue,
        }
    }

    /// Color for a score on the 1-10 scale, or for a total against the best total
    pub fn score_color(&self, score: f64, max_score: f64) -> Color {
        let percentage = if max_score > 0.0 {
            (score / max_score) * 100.0
        } else {
            0.0
        };

        if percentage >= 70.0 {
            self.score_high
        } else if percentage >= 40.0 {
            self.score_mid
        } else {
            self.score_low
        }
    }

    /// Medal color for the top three positions
    pub fn podium(&self, position: usize) -> Option<Color> {
        match position {
            1 => Some(self.gold),
            2 => Some(self.silver),
            3 => Some(self.bronze),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_color_thresholds() {
        let colors = ThemeColors::dark();
        assert_eq!(colors.score_color(9.0, 10.0), colors.score_high);
        assert_eq!(colors.score_color(5.0, 10.0), colors.score_mid);
        assert_eq!(colors.score_color(2.0, 10.0), colors.score_low);
        assert_eq!(colors.score_color(5.0, 0.0), colors.score_low);
    }

    #[test]
    fn test_podium() {
        let colors = ThemeColors::light();
        assert_eq!(colors.podium(1), Some(colors.gold));
        assert_eq!(colors.podium(3), Some(colors.bronze));
        assert_eq!(colors.podium(4), None);
    }
}
