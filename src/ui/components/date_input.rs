use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn width(self) -> usize {
        match self {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            DatePart::Year => "[YYYY]",
            DatePart::Month => "[MM]",
            DatePart::Day => "[DD]",
        }
    }
}

/// Digit-by-digit editor for a single date, one part at a time.
#[derive(Clone, Debug)]
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    typed: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            typed: String::new(),
        }
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
        self.date_part = DatePart::Year;
        self.typed.clear();
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
        self.typed.clear();
    }

    fn move_part(&mut self, forward: bool) {
        self.date_part = match (self.date_part, forward) {
            (DatePart::Year, true) | (DatePart::Day, false) => DatePart::Month,
            (DatePart::Month, true) | (DatePart::Year, false) => DatePart::Day,
            (DatePart::Day, true) | (DatePart::Month, false) => DatePart::Year,
        };
        self.typed.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.typed.push(c);
                if self.typed.len() == self.date_part.width() {
                    if let Some(date) = self.apply_typed() {
                        self.date = date;
                    }
                    self.typed.clear();
                }
            }
            KeyCode::Backspace => {
                self.typed.pop();
            }
            KeyCode::Right => self.move_part(true),
            KeyCode::Left => self.move_part(false),
            _ => {}
        }
    }

    // Rejects values that would produce an impossible date, leaving the old one.
    fn apply_typed(&self) -> Option<NaiveDate> {
        let value: u32 = self.typed.parse().ok()?;
        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
        match self.date_part {
            DatePart::Year if (1900..=2100).contains(&value) => {
                NaiveDate::from_ymd_opt(value as i32, month, day.min(days_in_month(value as i32, month)))
            }
            DatePart::Month if (1..=12).contains(&value) => {
                NaiveDate::from_ymd_opt(year, value, day.min(days_in_month(year, value)))
            }
            DatePart::Day => NaiveDate::from_ymd_opt(year, month, value),
            _ => None,
        }
    }

    pub fn get_display_string(&self) -> String {
        let (year, month, day) = (
            format!("{:04}", self.date.year()),
            format!("{:02}", self.date.month()),
            format!("{:02}", self.date.day()),
        );
        if !self.editing {
            return format!("{year}-{month}-{day}");
        }

        let cursor = if self.typed.is_empty() {
            self.date_part.placeholder().to_string()
        } else {
            format!("[{}]", self.typed)
        };
        match self.date_part {
            DatePart::Year => format!("{year}{cursor}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{cursor}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{cursor}"),
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
