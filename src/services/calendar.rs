use chrono::{Datelike, Duration, NaiveDate};

use crate::models::Callback;
use crate::services::messaging::{InlineButton, InlineKeyboard};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// Month `delta` months away from `year`/`month`.
/// Years outside `i32` saturate.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(delta);
    let year = index
        .div_euclid(12)
        .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    (year, index.rem_euclid(12) as u32 + 1)
}

/// Inline month calendar. Days before `today` are shown crossed out and do
/// nothing; today is pinned. A month that cannot be represented falls back
/// to the current one.
pub fn month_keyboard(year: i32, month: u32, today: NaiveDate) -> InlineKeyboard {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| today - Duration::days(today.day0() as i64));
    let (year, month) = (first.year(), first.month());

    let mut keyboard = InlineKeyboard::new()
        .row(vec![
            InlineButton::new("◀️", &Callback::CalendarPrev { year, month }),
            InlineButton::new(
                format!("{} {}", MONTH_NAMES[month as usize - 1], year),
                &Callback::Ignore,
            ),
            InlineButton::new("▶️", &Callback::CalendarNext { year, month }),
        ])
        .row(
            WEEKDAYS
                .iter()
                .map(|day| InlineButton::new(*day, &Callback::Ignore))
                .collect(),
        );

    let blank = || InlineButton::new(" ", &Callback::Ignore);
    let mut week: Vec<InlineButton> = (0..first.weekday().num_days_from_monday())
        .map(|_| blank())
        .collect();

    for day in first.iter_days().take_while(|d| d.month() == month) {
        week.push(day_button(day, today));
        if week.len() == 7 {
            keyboard.push_row(std::mem::take(&mut week));
        }
    }
    if !week.is_empty() {
        week.resize_with(7, blank);
        keyboard.push_row(week);
    }

    keyboard.row(vec![InlineButton::new("❌ Cancel", &Callback::CalendarCancel)])
}

fn day_button(day: NaiveDate, today: NaiveDate) -> InlineButton {
    if day < today {
        InlineButton::new("❌", &Callback::Ignore)
    } else if day == today {
        InlineButton::new(format!("📍{}", day.day()), &Callback::CalendarDay(day))
    } else {
        InlineButton::new(day.day().to_string(), &Callback::CalendarDay(day))
    }
}
