use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: i64,
    pub guest_id: i64,
    pub name: String,
    pub rating: u8,
    pub text: String,
    pub status: ReviewStatus,
    /// Written by SQLite, in UTC rather than venue time.
    pub created_at: NaiveDateTime,
}

impl Review {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn stars(&self) -> String {
        stars(self.rating)
    }
}

pub fn stars(rating: u8) -> String {
    let filled = rating.min(5) as usize;
    format!("{}{}", "⭐".repeat(filled), "☆".repeat(5 - filled))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub guest_id: i64,
    pub name: String,
    pub rating: u8,
    pub text: String,
}

/// A chosen rating waiting for the guest's text (or an explicit skip).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Published,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Published => "published",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "published" => Some(ReviewStatus::Published),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Pending, ReviewStatus::Published)
                | (ReviewStatus::Pending, ReviewStatus::Rejected)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_render_rating() {
        assert_eq!(stars(3), "⭐⭐⭐☆☆");
        assert_eq!(stars(5), "⭐⭐⭐⭐⭐");
    }

    #[test]
    fn test_moderated_review_is_final() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Published));
        assert!(!ReviewStatus::Published.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Rejected.can_transition_to(ReviewStatus::Published));
    }
}
