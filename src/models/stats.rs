use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// The single running-totals row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_bookings: i64,
    pub approved_bookings: i64,
    pub rejected_bookings: i64,
    pub total_reviews: i64,
    pub average_rating: f64,
}

impl AggregateStats {
    pub fn approval_rate(&self) -> f64 {
        if self.total_bookings == 0 {
            return 0.0;
        }
        self.approved_bookings as f64 / self.total_bookings as f64 * 100.0
    }

    /// Running mean after one more rating.
    pub fn average_with(&self, rating: u8) -> f64 {
        let count = self.total_reviews as f64;
        (self.average_rating * count + rating as f64) / (count + 1.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminReply {
    pub id: i64,
    pub booking_id: i64,
    pub admin_id: i64,
    pub text: String,
    /// Written by SQLite, in UTC rather than venue time.
    pub created_at: NaiveDateTime,
}

/// Everything the statistics screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub totals: AggregateStats,
    pub pending: i64,
    pub active: i64,
    pub upcoming_days: Vec<(NaiveDate, i64)>,
    pub popular_times: Vec<(String, i64)>,
}
