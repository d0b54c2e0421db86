//! Inline-button payloads.
//!
//! Every payload is parsed once, at the transport boundary, into a
//! [`Callback`]; buttons are built from the same type via
//! [`Callback::payload`], so the grammar lives in one place.

use chrono::NaiveDate;

use crate::models::booking::DISPLAY_DATE_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// Decorative buttons (headers, blanks, past days).
    Ignore,
    CalendarPrev { year: i32, month: u32 },
    CalendarNext { year: i32, month: u32 },
    CalendarDay(NaiveDate),
    CalendarCancel,
    AdminApprove(i64),
    AdminReject(i64),
    AdminReply(i64),
    ConfirmVisit(i64),
    CancelVisit(i64),
    ReviewRating(u8),
    PublishReview(i64),
    RejectReview(i64),
    ReplyReview(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("unknown callback payload: {0}")]
    Unknown(String),

    #[error("malformed callback payload: {0}")]
    Malformed(String),
}

impl Callback {
    pub fn parse(data: &str) -> Result<Self, CallbackError> {
        let malformed = || CallbackError::Malformed(data.to_string());

        if data == "ignore" {
            return Ok(Callback::Ignore);
        }
        if data == "calendar_cancel" {
            return Ok(Callback::CalendarCancel);
        }
        if let Some(rest) = data.strip_prefix("calendar_prev_") {
            let (year, month) = parse_year_month(rest).ok_or_else(malformed)?;
            return Ok(Callback::CalendarPrev { year, month });
        }
        if let Some(rest) = data.strip_prefix("calendar_next_") {
            let (year, month) = parse_year_month(rest).ok_or_else(malformed)?;
            return Ok(Callback::CalendarNext { year, month });
        }
        if let Some(rest) = data.strip_prefix("calendar_day_") {
            let date = NaiveDate::parse_from_str(rest, DISPLAY_DATE_FORMAT).map_err(|_| malformed())?;
            return Ok(Callback::CalendarDay(date));
        }
        // Longer prefix first: `admin_reply_review_` also starts with `admin_reply_`.
        if let Some(rest) = data.strip_prefix("admin_reply_review_") {
            return parse_id(rest).map(Callback::ReplyReview).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("admin_approve_") {
            return parse_id(rest).map(Callback::AdminApprove).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("admin_reject_") {
            return parse_id(rest).map(Callback::AdminReject).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("admin_reply_") {
            return parse_id(rest).map(Callback::AdminReply).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("confirm_visit_") {
            return parse_id(rest).map(Callback::ConfirmVisit).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("cancel_visit_") {
            return parse_id(rest).map(Callback::CancelVisit).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("review_direct_") {
            return rest
                .parse::<u8>()
                .ok()
                .filter(|r| (1..=5).contains(r))
                .map(Callback::ReviewRating)
                .ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("publish_review_") {
            return parse_id(rest).map(Callback::PublishReview).ok_or_else(malformed);
        }
        if let Some(rest) = data.strip_prefix("reject_review_") {
            return parse_id(rest).map(Callback::RejectReview).ok_or_else(malformed);
        }

        Err(CallbackError::Unknown(data.to_string()))
    }

    pub fn payload(&self) -> String {
        match self {
            Callback::Ignore => "ignore".to_string(),
            Callback::CalendarPrev { year, month } => format!("calendar_prev_{year}_{month}"),
            Callback::CalendarNext { year, month } => format!("calendar_next_{year}_{month}"),
            Callback::CalendarDay(date) => {
                format!("calendar_day_{}", date.format(DISPLAY_DATE_FORMAT))
            }
            Callback::CalendarCancel => "calendar_cancel".to_string(),
            Callback::AdminApprove(id) => format!("admin_approve_{id}"),
            Callback::AdminReject(id) => format!("admin_reject_{id}"),
            Callback::AdminReply(id) => format!("admin_reply_{id}"),
            Callback::ConfirmVisit(id) => format!("confirm_visit_{id}"),
            Callback::CancelVisit(id) => format!("cancel_visit_{id}"),
            Callback::ReviewRating(rating) => format!("review_direct_{rating}"),
            Callback::PublishReview(id) => format!("publish_review_{id}"),
            Callback::RejectReview(id) => format!("reject_review_{id}"),
            Callback::ReplyReview(id) => format!("admin_reply_review_{id}"),
        }
    }

    /// Buttons only the administrator may press.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Callback::AdminApprove(_)
                | Callback::AdminReject(_)
                | Callback::AdminReply(_)
                | Callback::PublishReview(_)
                | Callback::RejectReview(_)
                | Callback::ReplyReview(_)
        )
    }
}

fn parse_id(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().filter(|id| *id > 0)
}

const CALENDAR_YEARS: std::ops::RangeInclusive<i32> = 2000..=2100;

fn parse_year_month(s: &str) -> Option<(i32, u32)> {
    let (year, month) = s.split_once('_')?;
    let year = year
        .parse::<i32>()
        .ok()
        .filter(|y| CALENDAR_YEARS.contains(y))?;
    let month = month.parse::<u32>().ok().filter(|m| (1..=12).contains(m))?;
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_actions() {
        assert_eq!(Callback::parse("admin_approve_12"), Ok(Callback::AdminApprove(12)));
        assert_eq!(Callback::parse("admin_reject_3"), Ok(Callback::AdminReject(3)));
        assert_eq!(Callback::parse("admin_reply_7"), Ok(Callback::AdminReply(7)));
    }

    #[test]
    fn test_review_reply_is_not_a_booking_reply() {
        assert_eq!(
            Callback::parse("admin_reply_review_5"),
            Ok(Callback::ReplyReview(5))
        );
    }

    #[test]
    fn test_parse_calendar_payloads() {
        assert_eq!(
            Callback::parse("calendar_prev_2025_1"),
            Ok(Callback::CalendarPrev { year: 2025, month: 1 })
        );
        assert_eq!(
            Callback::parse("calendar_day_14.06.2025"),
            Ok(Callback::CalendarDay(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()))
        );
        assert_eq!(Callback::parse("calendar_cancel"), Ok(Callback::CalendarCancel));
    }

    #[test]
    fn test_rejects_calendar_years_out_of_range() {
        assert!(matches!(
            Callback::parse("calendar_next_2147483647_12"),
            Err(CallbackError::Malformed(_))
        ));
        assert!(matches!(
            Callback::parse("calendar_prev_-2147483648_1"),
            Err(CallbackError::Malformed(_))
        ));
        assert!(matches!(
            Callback::parse("calendar_next_1999_12"),
            Err(CallbackError::Malformed(_))
        ));
        assert_eq!(
            Callback::parse("calendar_next_2100_12"),
            Ok(Callback::CalendarNext { year: 2100, month: 12 })
        );
    }

    #[test]
    fn test_day_payload_matches_parser() {
        let day = Callback::CalendarDay(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert_eq!(day.payload(), "calendar_day_09.03.2025");
        assert_eq!(Callback::parse(&day.payload()), Ok(day));
    }

    #[test]
    fn test_rejects_out_of_range_rating() {
        assert!(matches!(
            Callback::parse("review_direct_6"),
            Err(CallbackError::Malformed(_))
        ));
        assert!(matches!(
            Callback::parse("review_direct_0"),
            Err(CallbackError::Malformed(_))
        ));
        assert_eq!(Callback::parse("review_direct_5"), Ok(Callback::ReviewRating(5)));
    }

    #[test]
    fn test_rejects_bad_ids_and_unknown_prefixes() {
        assert!(matches!(
            Callback::parse("admin_approve_abc"),
            Err(CallbackError::Malformed(_))
        ));
        assert!(matches!(
            Callback::parse("admin_approve_0"),
            Err(CallbackError::Malformed(_))
        ));
        assert!(matches!(
            Callback::parse("calendar_next_2025_13"),
            Err(CallbackError::Malformed(_))
        ));
        assert!(matches!(
            Callback::parse("something_else"),
            Err(CallbackError::Unknown(_))
        ));
    }

    #[test]
    fn test_admin_only_callbacks() {
        assert!(Callback::AdminApprove(1).requires_admin());
        assert!(Callback::ReplyReview(1).requires_admin());
        assert!(!Callback::ConfirmVisit(1).requires_admin());
        assert!(!Callback::ReviewRating(4).requires_admin());
    }
}
