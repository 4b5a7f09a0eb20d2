//! Geometry and colors for the progress screen.
//!
//! Everything here is a pure function of data already fetched from the
//! server. Degenerate input (bad dates, empty project span) produces no bar
//! rather than an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tui::style::Color;

use crate::models::{CategoryProgress, CategoryStatus};

pub const PROJECT_BAR_COLOR: Color = Color::Rgb(255, 215, 0);
pub const COMPLETED_COLOR: Color = Color::Rgb(0x82, 0xb8, 0x6a);
pub const RISKY_COLOR: Color = Color::Rgb(255, 165, 0);
pub const UPCOMING_COLOR: Color = Color::Rgb(0xd1, 0xce, 0xd3);
pub const FALLBACK_COLOR: Color = PROJECT_BAR_COLOR;

/// Parses the date shapes the backend emits: plain dates, RFC 3339
/// timestamps and naive timestamps with or without fractional seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Width of the whole-project bar, in percent of the track.
pub fn project_fill_percent(progress: f64) -> f64 {
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 100.0)
}

/// Number of terminal cells a percentage covers on a track of `track` cells.
pub fn filled_cells(percent: f64, track: u16) -> u16 {
    let cells = (percent.clamp(0.0, 100.0) / 100.0 * f64::from(track)).round();
    (cells as u16).min(track)
}

pub fn status_color(status: &CategoryStatus) -> Color {
    match status {
        CategoryStatus::Completed => COMPLETED_COLOR,
        CategoryStatus::Risky => RISKY_COLOR,
        CategoryStatus::Upcoming => UPCOMING_COLOR,
        CategoryStatus::Unrecognized(_) => FALLBACK_COLOR,
    }
}

/// Placement of a category's sub-bar inside the project track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryBar {
    pub offset_percent: f64,
    pub width_percent: f64,
}

impl CategoryBar {
    /// Start cell and length of the bar on a track of `track` cells.
    pub fn cells(&self, track: u16) -> (u16, u16) {
        let start = filled_cells(self.offset_percent, track);
        let end = filled_cells(self.offset_percent + self.width_percent, track);
        (start, end.saturating_sub(start))
    }
}

/// Maps a category interval onto the project interval.
///
/// Returns `None` when either category date fails to parse or the project
/// span is not positive. Offset and width are both kept inside the track.
pub fn category_bar(
    category_start: &str,
    category_end: &str,
    project_start: NaiveDateTime,
    project_end: NaiveDateTime,
) -> Option<CategoryBar> {
    let start = parse_timestamp(category_start)?;
    let end = parse_timestamp(category_end)?;

    let total = (project_end - project_start).num_seconds() as f64;
    if total <= 0.0 {
        return None;
    }

    let offset = ((start - project_start).num_seconds() as f64 / total * 100.0).clamp(0.0, 100.0);
    let width = ((end - start).num_seconds() as f64 / total * 100.0)
        .clamp(0.0, 100.0)
        .min(100.0 - offset);

    Some(CategoryBar {
        offset_percent: offset,
        width_percent: width,
    })
}

/// Orders categories by `cc_id`, comparing the identifiers as strings.
pub fn sort_categories(categories: &mut [CategoryProgress]) {
    categories.sort_by(|a, b| a.cc_id.cmp(&b.cc_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn category(id: &str) -> CategoryProgress {
        CategoryProgress {
            cc_id: id.to_string(),
            cc_name: format!("Category {id}"),
            start_date: "2024-01-02".to_string(),
            end_date: "2024-01-03".to_string(),
            category_status: CategoryStatus::Upcoming,
        }
    }

    #[test]
    fn project_fill_is_clamped() {
        assert_eq!(project_fill_percent(-10.0), 0.0);
        assert_eq!(project_fill_percent(150.0), 100.0);
        assert_eq!(project_fill_percent(42.5), 42.5);
        assert_eq!(project_fill_percent(f64::NAN), 0.0);
    }

    #[test]
    fn filled_cells_scales_to_track() {
        assert_eq!(filled_cells(67.2, 100), 67);
        assert_eq!(filled_cells(50.0, 40), 20);
        assert_eq!(filled_cells(0.0, 40), 0);
        assert_eq!(filled_cells(250.0, 40), 40);
    }

    #[test]
    fn category_in_middle_third_of_project() {
        let bar = category_bar("2024-01-11", "2024-01-21", day(1), day(31)).unwrap();
        assert!((bar.offset_percent - 33.333).abs() < 0.01);
        assert!((bar.width_percent - 33.333).abs() < 0.01);
    }

    #[test]
    fn non_positive_project_span_renders_nothing() {
        assert_eq!(category_bar("2024-01-11", "2024-01-21", day(31), day(1)), None);
        assert_eq!(category_bar("2024-01-11", "2024-01-21", day(5), day(5)), None);
        assert_eq!(category_bar("garbage", "", day(5), day(5)), None);
    }

    #[test]
    fn invalid_category_dates_render_nothing() {
        assert_eq!(category_bar("not a date", "2024-01-21", day(1), day(31)), None);
        assert_eq!(category_bar("2024-01-11", "", day(1), day(31)), None);
    }

    #[test]
    fn out_of_range_categories_are_clamped() {
        let before = category_bar("2023-12-01", "2024-01-16", day(1), day(31)).unwrap();
        assert_eq!(before.offset_percent, 0.0);
        assert!(before.width_percent <= 100.0);

        let after = category_bar("2024-02-10", "2024-03-10", day(1), day(31)).unwrap();
        assert_eq!(after.offset_percent, 100.0);
        assert_eq!(after.width_percent, 0.0);

        let overrun = category_bar("2024-01-21", "2024-03-01", day(1), day(31)).unwrap();
        assert!((overrun.offset_percent + overrun.width_percent - 100.0).abs() < 1e-9);

        let reversed = category_bar("2024-01-21", "2024-01-11", day(1), day(31)).unwrap();
        assert_eq!(reversed.width_percent, 0.0);
    }

    #[test]
    fn bar_cells_cover_the_span() {
        let bar = CategoryBar {
            offset_percent: 25.0,
            width_percent: 50.0,
        };
        assert_eq!(bar.cells(40), (10, 20));
    }

    #[test]
    fn timestamps_in_several_shapes() {
        assert_eq!(parse_timestamp("2024-01-11"), Some(day(11)));
        assert_eq!(parse_timestamp("2024-01-11T00:00:00Z"), Some(day(11)));
        assert_eq!(parse_timestamp("2024-01-11T00:00:00"), Some(day(11)));
        assert_eq!(parse_timestamp("2024-01-11T00:00:00.000"), Some(day(11)));
        assert_eq!(parse_timestamp("2024-01-11 00:00:00"), Some(day(11)));
        assert_eq!(parse_timestamp("  "), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }

    #[test]
    fn completed_is_green() {
        assert_eq!(status_color(&CategoryStatus::Completed), COMPLETED_COLOR);
    }

    #[test]
    fn risky_is_orange() {
        assert_eq!(status_color(&CategoryStatus::Risky), RISKY_COLOR);
    }

    #[test]
    fn upcoming_is_gray() {
        assert_eq!(status_color(&CategoryStatus::Upcoming), UPCOMING_COLOR);
    }

    #[test]
    fn unknown_status_falls_back_to_gold() {
        let status = CategoryStatus::from("paused");
        assert_eq!(status_color(&status), FALLBACK_COLOR);
        assert_eq!(FALLBACK_COLOR, Color::Rgb(255, 215, 0));
    }

    #[test]
    fn categories_sort_lexically_by_id() {
        let mut list = vec![category("c10"), category("c2"), category("a7"), category("c1")];
        sort_categories(&mut list);
        let ids: Vec<&str> = list.iter().map(|c| c.cc_id.as_str()).collect();
        assert_eq!(ids, vec!["a7", "c1", "c10", "c2"]);
    }
}
