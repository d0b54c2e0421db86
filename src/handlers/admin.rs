use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AdminReply, AggregateStats, Booking, BookingStatus, Review, ReviewStatus};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if expected_token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    totals: AggregateStats,
    approval_rate: f64,
    pending: i64,
    active: i64,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let today = state.config.local_now().date();
    let report = {
        let conn = state.db();
        queries::get_stats_report(&conn, today)?
    };

    Ok(Json(StatsResponse {
        approval_rate: report.totals.approval_rate(),
        totals: report.totals,
        pending: report.pending,
        active: report.active,
    }))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref() {
        None => BookingStatus::Pending,
        Some(raw) => BookingStatus::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown booking status: {raw}")))?,
    };

    let bookings = {
        let conn = state.db();
        queries::get_recent_bookings_by_status(&conn, status, clamp_limit(query.limit))?
    };
    Ok(Json(bookings))
}

// GET /api/admin/bookings/:id
#[derive(Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    booking: Booking,
    replies: Vec<AdminReply>,
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BookingDetail>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = state.db();
    let booking = queries::get_booking(&conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    let replies = queries::get_admin_replies(&conn, id)?;

    Ok(Json(BookingDetail { booking, replies }))
}

// GET /api/admin/reviews
pub async fn get_reviews(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Review>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref() {
        None => ReviewStatus::Pending,
        Some(raw) => ReviewStatus::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown review status: {raw}")))?,
    };

    let reviews = {
        let conn = state.db();
        queries::get_reviews_by_status(&conn, status, clamp_limit(query.limit))?
    };
    Ok(Json(reviews))
}
