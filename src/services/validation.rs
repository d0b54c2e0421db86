//! Guest input checks for the booking dialog.
//!
//! Every function is pure: "today" is passed in, never read from the clock.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

use crate::models::booking::{noon, DISPLAY_DATE_FORMAT, TIME_FORMAT};

/// How far ahead a table can be booked.
pub const BOOKING_HORIZON_DAYS: i64 = 90;
pub const MAX_GUESTS: u8 = 12;
const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("❌ Invalid date format. Use DD.MM.YYYY")]
    MalformedDate,

    #[error("❌ You cannot book a table for a date in the past")]
    PastDate,

    #[error("❌ Bookings are only open 3 months ahead")]
    BeyondHorizon,

    #[error("❌ Invalid time format. Use HH:MM")]
    MalformedTime,

    #[error("❌ We are open {hours}. Please choose a time in that window")]
    OutsideHours { hours: String },

    #[error("❌ Enter a number from 1 to 12")]
    GuestsNotANumber,

    #[error("❌ There must be at least 1 guest")]
    TooFewGuests,

    #[error("❌ The maximum party size is 12")]
    TooManyGuests,

    #[error("❌ The name must be at least 2 characters long")]
    NameTooShort,

    #[error("❌ The name is too long")]
    NameTooLong,

    #[error("❌ The name may contain only letters, spaces and hyphens")]
    NameInvalidCharacters,

    #[error("❌ Invalid phone number. Example: +7 (912) 345-67-89")]
    InvalidPhone,
}

/// Opening hours for one calendar date. The evening opens on `date` and
/// closes in the early hours of the following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub opens: NaiveTime,
    pub last_entry: NaiveTime,
}

impl BusinessHours {
    pub fn for_date(date: NaiveDate) -> Self {
        let late_night = matches!(date.weekday(), Weekday::Fri | Weekday::Sat);
        Self {
            opens: hm(16, 0),
            last_entry: if late_night { hm(2, 30) } else { hm(2, 0) },
        }
    }

    /// Times before noon count as past midnight.
    pub fn admits(&self, time: NaiveTime) -> bool {
        if time < noon() {
            time <= self.last_entry
        } else {
            time >= self.opens
        }
    }

    pub fn label(&self) -> String {
        format!(
            "from {} to {}",
            self.opens.format(TIME_FORMAT),
            self.last_entry.format(TIME_FORMAT)
        )
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), DISPLAY_DATE_FORMAT)
        .map_err(|_| ValidationError::MalformedDate)
}

/// Accepts dates from `today` through `today + 90 days`.
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if date < today {
        return Err(ValidationError::PastDate);
    }
    if date > today + Duration::days(BOOKING_HORIZON_DAYS) {
        return Err(ValidationError::BeyondHorizon);
    }
    Ok(date)
}

pub fn parse_time(input: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT).map_err(|_| ValidationError::MalformedTime)
}

/// Checks a time against the opening hours of the already chosen date.
pub fn validate_time(time: NaiveTime, date: NaiveDate) -> Result<NaiveTime, ValidationError> {
    let hours = BusinessHours::for_date(date);
    if hours.admits(time) {
        Ok(time)
    } else {
        Err(ValidationError::OutsideHours {
            hours: hours.label(),
        })
    }
}

pub fn validate_guests(input: &str) -> Result<u8, ValidationError> {
    let count: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::GuestsNotANumber)?;
    if count < 1 {
        return Err(ValidationError::TooFewGuests);
    }
    if count > MAX_GUESTS as i64 {
        return Err(ValidationError::TooManyGuests);
    }
    Ok(count as u8)
}

/// Latin or Cyrillic letters, spaces and hyphens; returns the trimmed name.
pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    let length = name.chars().count();
    if length < NAME_MIN_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    if length > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    if !name.chars().all(is_name_char) {
        return Err(ValidationError::NameInvalidCharacters);
    }
    Ok(name.to_string())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic()
        || ('а'..='я').contains(&c)
        || ('А'..='Я').contains(&c)
        || c == 'ё'
        || c == 'Ё'
        || c == '-'
        || c.is_whitespace()
}

/// Normalizes a Russian phone number to `+7 (XXX) XXX-XX-XX`.
///
/// Non-digits are dropped first. Eleven digits must start with 7 or 8
/// (a trunk 8 becomes 7); ten digits are taken as the number without the
/// country code.
pub fn normalize_phone(input: &str) -> Result<String, ValidationError> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('7') || digits.starts_with('8') => &digits[1..],
        _ => return Err(ValidationError::InvalidPhone),
    };

    Ok(format!(
        "+7 ({}) {}-{}-{}",
        &national[0..3],
        &national[3..6],
        &national[6..8],
        &national[8..10]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DISPLAY_DATE_FORMAT).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    // 13.06.2025 is a Friday, 14.06.2025 a Saturday, 17.06.2025 a Tuesday.
    const FRIDAY: &str = "13.06.2025";
    const SATURDAY: &str = "14.06.2025";
    const TUESDAY: &str = "17.06.2025";

    #[test]
    fn test_date_window() {
        let today = date("10.06.2025");
        assert_eq!(validate_date(date("09.06.2025"), today), Err(ValidationError::PastDate));
        assert!(validate_date(today, today).is_ok());
        assert!(validate_date(date("08.09.2025"), today).is_ok());
        assert_eq!(
            validate_date(date("09.09.2025"), today),
            Err(ValidationError::BeyondHorizon)
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("tomorrow"), Err(ValidationError::MalformedDate));
        assert_eq!(parse_date("31.02.2025"), Err(ValidationError::MalformedDate));
        assert_eq!(parse_date(" 13.06.2025 ").unwrap(), date(FRIDAY));
    }

    #[test]
    fn test_weekend_hours() {
        for day in [FRIDAY, SATURDAY] {
            let day = date(day);
            assert!(validate_time(time("23:30"), day).is_ok());
            assert!(validate_time(time("01:30"), day).is_ok());
            assert!(validate_time(time("02:30"), day).is_ok());
            assert!(validate_time(time("03:00"), day).is_err());
            assert!(validate_time(time("15:59"), day).is_err());
        }
    }

    #[test]
    fn test_weekday_hours() {
        let day = date(TUESDAY);
        assert!(validate_time(time("16:00"), day).is_ok());
        assert!(validate_time(time("02:00"), day).is_ok());
        assert!(validate_time(time("02:01"), day).is_err());
        assert!(validate_time(time("02:30"), day).is_err());
        assert!(validate_time(time("12:00"), day).is_err());
    }

    #[test]
    fn test_outside_hours_names_the_window() {
        let err = validate_time(time("10:00"), date(TUESDAY)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutsideHours {
                hours: "from 16:00 to 02:00".to_string()
            }
        );
        assert!(err.to_string().contains("from 16:00 to 02:00"));

        let err = validate_time(time("04:00"), date(FRIDAY)).unwrap_err();
        assert!(err.to_string().contains("to 02:30"));
    }

    #[test]
    fn test_malformed_time() {
        assert_eq!(parse_time("8pm"), Err(ValidationError::MalformedTime));
        assert_eq!(parse_time("25:00"), Err(ValidationError::MalformedTime));
    }

    #[test]
    fn test_guest_count() {
        assert_eq!(validate_guests("1"), Ok(1));
        assert_eq!(validate_guests(" 12 "), Ok(12));
        assert_eq!(validate_guests("0"), Err(ValidationError::TooFewGuests));
        assert_eq!(validate_guests("13"), Err(ValidationError::TooManyGuests));
        assert_eq!(validate_guests("four"), Err(ValidationError::GuestsNotANumber));
        assert_eq!(validate_guests("2.5"), Err(ValidationError::GuestsNotANumber));
    }

    #[test]
    fn test_names() {
        assert_eq!(validate_name("  Anna  "), Ok("Anna".to_string()));
        assert!(validate_name("Анна-Мария Иванова").is_ok());
        assert!(validate_name("Пётр").is_ok());
        assert_eq!(validate_name("A"), Err(ValidationError::NameTooShort));
        assert_eq!(
            validate_name(&"a".repeat(51)),
            Err(ValidationError::NameTooLong)
        );
        assert_eq!(
            validate_name("R2-D2"),
            Err(ValidationError::NameInvalidCharacters)
        );
    }

    #[test]
    fn test_phone_forms_normalize_identically() {
        let expected = "+7 (912) 345-67-89";
        assert_eq!(normalize_phone("89123456789").unwrap(), expected);
        assert_eq!(normalize_phone("+7 (912) 345-67-89").unwrap(), expected);
        assert_eq!(normalize_phone("8-912-345-67-89").unwrap(), expected);
        assert_eq!(normalize_phone("9123456789").unwrap(), expected);
    }

    #[test]
    fn test_phone_rejections() {
        assert_eq!(normalize_phone("912345678"), Err(ValidationError::InvalidPhone));
        assert_eq!(normalize_phone("19123456789"), Err(ValidationError::InvalidPhone));
        assert_eq!(normalize_phone("+44 20 7946 0958 12"), Err(ValidationError::InvalidPhone));
        assert_eq!(normalize_phone(""), Err(ValidationError::InvalidPhone));
    }
}
