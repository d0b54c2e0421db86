use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::booking::{DATE_FORMAT, TIMESTAMP_FORMAT, TIME_FORMAT};
use crate::models::{
    AdminReply, AggregateStats, Booking, BookingStatus, NewBooking, NewReview, ReminderKind,
    Review, ReviewStatus, StatsReport,
};

/// Outcome of a guarded status update.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange<T> {
    /// The row moved to the new status; carries the updated row.
    Applied(T),
    /// The row exists but its current status does not allow the move.
    Refused(T),
    NotFound,
}

const BOOKING_COLUMNS: &str = "id, guest_id, name, phone, date, time, guests, comment, status, \
     admin_reply, reminder_24h_sent, reminder_1h_sent, review_requested, created_at";

const REVIEW_COLUMNS: &str = "id, guest_id, name, rating, text, status, created_at";

// ── Bookings ──

/// Inserts a pending booking and counts it in the running totals.
pub fn create_booking(conn: &Connection, booking: &NewBooking) -> anyhow::Result<Booking> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO bookings (guest_id, name, phone, date, time, guests, comment, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            booking.guest_id,
            booking.name,
            booking.phone,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time.format(TIME_FORMAT).to_string(),
            booking.guests,
            booking.comment,
            BookingStatus::Pending.as_str(),
        ],
    )?;
    let id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE admin_stats SET total_bookings = total_bookings + 1 WHERE id = 1",
        [],
    )?;

    let created = get_booking(&tx, id)?.context("inserted booking vanished")?;
    tx.commit()?;
    Ok(created)
}

pub fn get_booking(conn: &Connection, id: i64) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All bookings in a status, in visit order.
pub fn get_bookings_by_status(
    conn: &Connection,
    status: BookingStatus,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY date, time"),
        params![status.as_str()],
    )
}

/// Most recently created bookings in a status.
pub fn get_recent_bookings_by_status(
    conn: &Connection,
    status: BookingStatus,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        ),
        params![status.as_str(), limit],
    )
}

/// Approved bookings from `today` on, soonest first.
pub fn get_upcoming_bookings(
    conn: &Connection,
    today: NaiveDate,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = 'approved' AND date >= ?1
             ORDER BY date, time LIMIT ?2"
        ),
        params![today.format(DATE_FORMAT).to_string(), limit],
    )
}

/// Moves a booking to `next` when its current status allows it. Approvals
/// and rejections are counted in the running totals in the same transaction.
pub fn transition_booking(
    conn: &Connection,
    id: i64,
    next: BookingStatus,
) -> anyhow::Result<StatusChange<Booking>> {
    let tx = conn.unchecked_transaction()?;

    let Some(current) = get_booking(&tx, id)? else {
        return Ok(StatusChange::NotFound);
    };
    if !current.status.can_transition_to(next) {
        return Ok(StatusChange::Refused(current));
    }

    tx.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2",
        params![next.as_str(), id],
    )?;

    let counter = match next {
        BookingStatus::Approved => Some("approved_bookings"),
        BookingStatus::Rejected => Some("rejected_bookings"),
        BookingStatus::Pending | BookingStatus::CancelledByGuest => None,
    };
    if let Some(column) = counter {
        tx.execute(
            &format!("UPDATE admin_stats SET {column} = {column} + 1 WHERE id = 1"),
            [],
        )?;
    }

    let updated = get_booking(&tx, id)?.context("booking vanished during update")?;
    tx.commit()?;
    Ok(StatusChange::Applied(updated))
}

/// Stores the admin's latest reply on the booking and appends it to the
/// reply log. Returns `None` when the booking does not exist.
pub fn set_admin_reply(
    conn: &Connection,
    booking_id: i64,
    admin_id: i64,
    text: &str,
) -> anyhow::Result<Option<Booking>> {
    let tx = conn.unchecked_transaction()?;

    let updated = tx.execute(
        "UPDATE bookings SET admin_reply = ?1 WHERE id = ?2",
        params![text, booking_id],
    )?;
    if updated == 0 {
        return Ok(None);
    }

    tx.execute(
        "INSERT INTO admin_replies (booking_id, admin_id, text) VALUES (?1, ?2, ?3)",
        params![booking_id, admin_id, text],
    )?;

    let booking = get_booking(&tx, booking_id)?;
    tx.commit()?;
    Ok(booking)
}

pub fn get_admin_replies(conn: &Connection, booking_id: i64) -> anyhow::Result<Vec<AdminReply>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, admin_id, text, created_at FROM admin_replies
         WHERE booking_id = ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_reply_row(row)))?;

    let mut replies = vec![];
    for row in rows {
        replies.push(row??);
    }
    Ok(replies)
}

fn parse_reply_row(row: &rusqlite::Row) -> anyhow::Result<AdminReply> {
    let created_at_str: String = row.get(4)?;

    Ok(AdminReply {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        admin_id: row.get(2)?,
        text: row.get(3)?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

// ── Reminders ──

/// Approved bookings for `tomorrow` that have not had the day-before reminder.
pub fn due_day_reminders(conn: &Connection, tomorrow: NaiveDate) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'approved' AND date = ?1 AND reminder_24h_sent = 0
             ORDER BY time"
        ),
        params![tomorrow.format(DATE_FORMAT).to_string()],
    )
}

/// Approved bookings dated within `[from, to]` still waiting for the
/// hour-before reminder. The caller narrows these down by visit time.
pub fn due_hour_reminders(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'approved' AND date BETWEEN ?1 AND ?2 AND reminder_1h_sent = 0
             ORDER BY date, time"
        ),
        params![
            from.format(DATE_FORMAT).to_string(),
            to.format(DATE_FORMAT).to_string()
        ],
    )
}

/// Sets the reminder flag for every `(kind, booking id)` pair in one
/// transaction. Rows already flagged are left alone; returns how many flipped.
pub fn mark_reminders_sent(conn: &Connection, sent: &[(ReminderKind, i64)]) -> anyhow::Result<usize> {
    if sent.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    let mut flipped = 0;
    for (kind, id) in sent {
        let column = kind.column();
        flipped += tx.execute(
            &format!("UPDATE bookings SET {column} = 1 WHERE id = ?1 AND {column} = 0"),
            params![id],
        )?;
    }
    tx.commit()?;
    Ok(flipped)
}

fn query_bookings(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(4)?;
    let time_str: String = row.get(5)?;
    let status_str: String = row.get(8)?;
    let created_at_str: String = row.get(13)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .with_context(|| format!("invalid booking date: {date_str}"))?;
    let time = NaiveTime::parse_from_str(&time_str, TIME_FORMAT)
        .with_context(|| format!("invalid booking time: {time_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        guest_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        date,
        time,
        guests: row.get(6)?,
        comment: row.get(7)?,
        status,
        admin_reply: row.get(9)?,
        reminder_24h_sent: row.get(10)?,
        reminder_1h_sent: row.get(11)?,
        review_requested: row.get(12)?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid timestamp: {s}"))
}

// ── Reviews ──

/// Inserts a pending review and folds its rating into the running average.
pub fn create_review(conn: &Connection, review: &NewReview) -> anyhow::Result<Review> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO reviews (guest_id, name, rating, text, status) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            review.guest_id,
            review.name,
            review.rating,
            review.text,
            ReviewStatus::Pending.as_str(),
        ],
    )?;
    let id = tx.last_insert_rowid();

    let stats = get_stats(&tx)?;
    tx.execute(
        "UPDATE admin_stats SET total_reviews = total_reviews + 1, average_rating = ?1 WHERE id = 1",
        params![stats.average_with(review.rating)],
    )?;

    let created = get_review(&tx, id)?.context("inserted review vanished")?;
    tx.commit()?;
    Ok(created)
}

pub fn get_review(conn: &Connection, id: i64) -> anyhow::Result<Option<Review>> {
    conn.query_row(
        &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
        params![id],
        |row| Ok(parse_review_row(row)),
    )
    .optional()?
    .transpose()
}

pub fn get_reviews_by_status(
    conn: &Connection,
    status: ReviewStatus,
    limit: i64,
) -> anyhow::Result<Vec<Review>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE status = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![status.as_str(), limit], |row| {
        Ok(parse_review_row(row))
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok(reviews)
}

pub fn transition_review(
    conn: &Connection,
    id: i64,
    next: ReviewStatus,
) -> anyhow::Result<StatusChange<Review>> {
    let tx = conn.unchecked_transaction()?;

    let Some(current) = get_review(&tx, id)? else {
        return Ok(StatusChange::NotFound);
    };
    if !current.status.can_transition_to(next) {
        return Ok(StatusChange::Refused(current));
    }

    tx.execute(
        "UPDATE reviews SET status = ?1 WHERE id = ?2",
        params![next.as_str(), id],
    )?;
    let updated = get_review(&tx, id)?.context("review vanished during update")?;
    tx.commit()?;
    Ok(StatusChange::Applied(updated))
}

fn parse_review_row(row: &rusqlite::Row) -> anyhow::Result<Review> {
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;

    Ok(Review {
        id: row.get(0)?,
        guest_id: row.get(1)?,
        name: row.get(2)?,
        rating: row.get(3)?,
        text: row.get(4)?,
        status: ReviewStatus::parse(&status_str)
            .with_context(|| format!("unknown review status: {status_str}"))?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

// ── Stats ──

pub fn get_stats(conn: &Connection) -> anyhow::Result<AggregateStats> {
    let stats = conn.query_row(
        "SELECT total_bookings, approved_bookings, rejected_bookings, total_reviews, average_rating
         FROM admin_stats WHERE id = 1",
        [],
        |row| {
            Ok(AggregateStats {
                total_bookings: row.get(0)?,
                approved_bookings: row.get(1)?,
                rejected_bookings: row.get(2)?,
                total_reviews: row.get(3)?,
                average_rating: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}

pub fn get_stats_report(conn: &Connection, today: NaiveDate) -> anyhow::Result<StatsReport> {
    let today_str = today.format(DATE_FORMAT).to_string();

    let pending: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE status = 'pending'",
        [],
        |row| row.get(0),
    )?;

    let active: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE status = 'approved' AND date >= ?1",
        params![today_str],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT date, COUNT(*) FROM bookings WHERE status = 'approved' AND date >= ?1
         GROUP BY date ORDER BY date LIMIT 7",
    )?;
    let rows = stmt.query_map(params![today_str], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut upcoming_days = vec![];
    for row in rows {
        let (date, count) = row?;
        let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .with_context(|| format!("invalid booking date: {date}"))?;
        upcoming_days.push((date, count));
    }

    let mut stmt = conn.prepare(
        "SELECT time, COUNT(*) AS n FROM bookings WHERE status = 'approved'
         GROUP BY time ORDER BY n DESC, time LIMIT 5",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut popular_times = vec![];
    for row in rows {
        popular_times.push(row?);
    }

    Ok(StatsReport {
        totals: get_stats(conn)?,
        pending,
        active,
        upcoming_days,
        popular_times,
    })
}
