//! Message bodies. Everything here renders Telegram Markdown; any text that
//! came from a guest or the administrator goes through [`escape_markdown`].

use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::VenueInfo;
use crate::models::booking::{DISPLAY_DATE_FORMAT, TIME_FORMAT};
use crate::models::session::TOTAL_STEPS;
use crate::models::{Booking, BookingStep, Review, StatsReport};
use crate::services::validation::BusinessHours;

/// Escapes the characters legacy Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn hours_overview() -> &'static str {
    "• Sun-Thu: 16:00 - 02:00\n• Fri-Sat: 16:00 - 02:30"
}

pub fn welcome_guest(venue: &VenueInfo) -> String {
    format!(
        "🍸 *Welcome to {name}!*\n\n\
         {description}\n\n\
         🎮 *Entertainment:*\n{entertainment}\n\n\
         🕒 *Opening hours:*\n{hours}\n\n\
         *Choose an action below:* 👇",
        name = venue.name,
        description = venue.description,
        entertainment = venue.entertainment,
        hours = hours_overview(),
    )
}

pub fn welcome_admin(venue: &VenueInfo) -> String {
    format!(
        "👑 *Welcome to the admin panel!*\n\n\
         🏢 *Venue:* {}\n📍 *Address:* {}\n\n\
         *Use the menu below:* 👇",
        venue.name, venue.address
    )
}

pub fn contacts(venue: &VenueInfo) -> String {
    format!(
        "📞 *{name} contacts:*\n\n\
         📍 *Address:* {address}\n\
         📞 *Phone:* {phone}\n\n\
         🕒 *Opening hours:*\n{hours}\n\n\
         🎮 *Entertainment:*\n{entertainment}\n\n\
         *See you soon!* 😊",
        name = venue.name,
        address = venue.address,
        phone = venue.phone,
        hours = hours_overview(),
        entertainment = venue.entertainment,
    )
}

fn step_header(step: &BookingStep) -> String {
    format!("*Step {} of {}:*", step.number(), TOTAL_STEPS)
}

/// Prompt for the field `step` is waiting for.
pub fn step_prompt(step: &BookingStep) -> String {
    let header = step_header(step);
    match step {
        BookingStep::AwaitingDate => format!(
            "🍸 *Let's book a table!*\n\n📅 {header} choose the date of your visit\n\
             • Use the arrows to switch months\n• 📍 marks today\n• ❌ dates are unavailable\n\
             • Or type a date as DD.MM.YYYY"
        ),
        BookingStep::AwaitingTime { date } => format!(
            "✅ *Date:* {}\n🕒 *Opening hours:* {}\n\n🕐 {header} choose a time:",
            date.format(DISPLAY_DATE_FORMAT),
            BusinessHours::for_date(*date).label(),
        ),
        BookingStep::AwaitingGuests { time, .. } => format!(
            "✅ *Time:* {}\n\n👥 {header} how many guests (1 to 12)?",
            time.format(TIME_FORMAT)
        ),
        BookingStep::AwaitingName { guests, .. } => {
            format!("✅ *Guests:* {guests}\n\n👤 {header} enter your name:")
        }
        BookingStep::AwaitingPhone { name, .. } => format!(
            "✅ *Name:* {}\n\n📞 {header} enter your phone number:\n\
             • Any format\n• Example: 89123456789 or +7 (912) 345-67-89",
            escape_markdown(name)
        ),
        BookingStep::AwaitingComment { phone, .. } => format!(
            "✅ *Phone:* {phone}\n\n💬 {header} add a comment (optional):\n\
             • For example: 'Window table', 'Birthday', 'With a console'\n\
             • Or skip this step"
        ),
    }
}

fn detail_lines(booking: &Booking) -> String {
    let mut lines = format!(
        "👤 *Name:* {}\n📞 *Phone:* {}\n📅 *Date:* {}\n⏰ *Time:* {}\n👥 *Guests:* {}",
        escape_markdown(&booking.name),
        booking.phone,
        booking.display_date(),
        booking.display_time(),
        booking.guests,
    );
    if let Some(comment) = &booking.comment {
        let _ = write!(lines, "\n💬 *Comment:* {}", escape_markdown(comment));
    }
    lines
}

/// Receipt sent to the guest once the request is stored.
pub fn booking_receipt(booking: &Booking, venue: &VenueInfo) -> String {
    format!(
        "✅ *Booking request #{id} sent!*\n\n📋 *Details:*\n{details}\n\n\
         🏢 *Venue:* {name}\n📍 *Address:* {address}\n\n\
         *Please wait for the administrator to confirm.* 📞",
        id = booking.id,
        details = detail_lines(booking),
        name = venue.name,
        address = venue.address,
    )
}

/// Booking card for the administrator: new requests and the panel lists.
pub fn admin_booking_card(booking: &Booking, title: &str) -> String {
    let mut card = format!(
        "{title} #{id}\n\n{details}\n🆔 *Guest ID:* {guest}\n📌 *Status:* {status}",
        id = booking.id,
        details = detail_lines(booking),
        guest = booking.guest_id,
        status = booking.status.label(),
    );
    if let Some(reply) = &booking.admin_reply {
        let _ = write!(card, "\n👑 *Your reply:* {}", escape_markdown(reply));
    }
    card
}

pub fn approval_notice(booking: &Booking, venue: &VenueInfo) -> String {
    format!(
        "✅ *Your booking is confirmed!*\n\n📋 *Details:*\n{details}\n\n\
         🏢 *Venue:* {name}\n📍 *Address:* {address}\n📞 *Phone:* {phone}\n{entertainment}\n\n\
         *We look forward to seeing you!* 🍸",
        details = detail_lines(booking),
        name = venue.name,
        address = venue.address,
        phone = venue.phone,
        entertainment = venue.entertainment,
    )
}

pub fn rejection_notice(booking: &Booking, venue: &VenueInfo) -> String {
    format!(
        "❌ *Unfortunately, your booking was declined.*\n\n\
         📅 *Date:* {}\n⏰ *Time:* {}\n\n\
         *Please choose another time or call us:*\n📞 {}",
        booking.display_date(),
        booking.display_time(),
        venue.phone
    )
}

pub fn reply_prompt_for_booking(booking: &Booking) -> String {
    format!(
        "💬 *Reply to guest*\n\n👤 *Guest:* {}\n💭 *Comment:* {}\n\n*Type your reply:*",
        escape_markdown(&booking.name),
        booking
            .comment
            .as_deref()
            .map(escape_markdown)
            .unwrap_or_else(|| "no comment".to_string()),
    )
}

pub fn booking_reply_relay(text: &str, venue: &VenueInfo) -> String {
    format!(
        "👑 *Message from the administrator:*\n\n💬 {}\n\n*Questions about your booking:*\n📞 {}",
        escape_markdown(text),
        venue.phone
    )
}

pub fn day_reminder(booking: &Booking, venue: &VenueInfo) -> String {
    let mut text = format!(
        "🔔 *Booking reminder*\n\nDear {name}!\n\
         Tomorrow, *{date} at {time}*, you have a table at *{venue}* for *{guests}*.",
        name = escape_markdown(&booking.name),
        date = booking.display_date(),
        time = booking.display_time(),
        venue = venue.name,
        guests = booking.guests,
    );
    if let Some(comment) = &booking.comment {
        let _ = write!(text, "\n\n💬 *Your comment:* {}", escape_markdown(comment));
    }
    let _ = write!(
        text,
        "\n\n📍 *Address:* {}\n📞 *Phone:* {}\n\n*Please confirm your visit:* 👇",
        venue.address, venue.phone
    );
    text
}

pub fn hour_reminder(booking: &Booking, venue: &VenueInfo) -> String {
    format!(
        "⏰ *See you soon!*\n\nDear {name}!\n\
         In one hour, at *{time}*, we expect you at *{venue}*.\n\n\
         👥 *Guests:* {guests}\n📍 *Address:* {address}\n📞 *Phone:* {phone}",
        name = escape_markdown(&booking.name),
        time = booking.display_time(),
        venue = venue.name,
        guests = booking.guests,
        address = venue.address,
        phone = venue.phone,
    )
}

pub fn visit_confirmed(booking: &Booking) -> String {
    format!(
        "✅ *Guest confirmed the visit*\n\n👤 *Guest:* {}\n📅 *Date:* {}\n⏰ *Time:* {}\n\n*Booking #{}*",
        escape_markdown(&booking.name),
        booking.display_date(),
        booking.display_time(),
        booking.id
    )
}

pub fn visit_cancelled(booking: &Booking) -> String {
    format!(
        "❌ *Guest cancelled the visit*\n\n👤 *Guest:* {}\n📅 *Date:* {}\n⏰ *Time:* {}\n\n*Booking #{}*",
        escape_markdown(&booking.name),
        booking.display_date(),
        booking.display_time(),
        booking.id
    )
}

pub fn rating_prompt(venue: &VenueInfo) -> String {
    format!(
        "⭐ *Rate {}*\n\nHow was your visit?\n\n\
         5 ⭐ Excellent\n4 ⭐ Good\n3 ⭐ Okay\n2 ⭐ Poor\n1 ⭐ Very poor\n\n*Pick a rating:* 👇",
        venue.name
    )
}

pub fn review_text_prompt(rating: u8) -> String {
    format!(
        "⭐ *Thank you for the {rating}/5 rating!*\n\n*Please write your review:*\n\
         • What did you like?\n• What could be better?\n\n\
         Or send /skip to leave the rating without text"
    )
}

pub fn review_card(review: &Review, title: &str) -> String {
    let body = if review.has_text() {
        format!("💬 *Text:* {}", escape_markdown(&review.text))
    } else {
        "💬 *Text:* none".to_string()
    };
    format!(
        "{title} #{id}\n\n👤 *Guest:* {name}\n⭐ *Rating:* {rating}/5 {stars}\n{body}",
        id = review.id,
        name = escape_markdown(&review.name),
        rating = review.rating,
        stars = review.stars(),
    )
}

pub fn reply_prompt_for_review(review: &Review) -> String {
    let text = if review.has_text() {
        escape_markdown(&review.text)
    } else {
        "no text".to_string()
    };
    format!(
        "💬 *Reply to review*\n\n👤 *Guest:* {}\n⭐ *Review:* {}\n\n*Type your reply:*",
        escape_markdown(&review.name),
        text
    )
}

pub fn review_reply_relay(text: &str) -> String {
    format!(
        "👑 *The administrator answered your review:*\n\n💬 {}\n\n*Thank you for your feedback!* ❤️",
        escape_markdown(text)
    )
}

fn day_label(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn stats_report(report: &StatsReport) -> String {
    let totals = &report.totals;
    let mut text = format!(
        "📈 *Statistics*\n\n📊 *Bookings:*\n\
         • Total requests: {}\n• Awaiting decision: {}\n• Upcoming: {}\n\
         • Approved: {}\n• Rejected: {}\n• Approval rate: {:.1}%\n\n\
         ⭐ *Reviews:*\n• Total: {}\n• Average rating: {:.1}/5\n\n\
         📅 *Next booked days:*\n",
        totals.total_bookings,
        report.pending,
        report.active,
        totals.approved_bookings,
        totals.rejected_bookings,
        totals.approval_rate(),
        totals.total_reviews,
        totals.average_rating,
    );

    if report.upcoming_days.is_empty() {
        text.push_str("• none\n");
    }
    for (date, count) in &report.upcoming_days {
        let _ = writeln!(text, "• {}: {count} bookings", day_label(*date));
    }

    text.push_str("\n⏰ *Popular times:*\n");
    if report.popular_times.is_empty() {
        text.push_str("• none\n");
    }
    for (time, count) in &report.popular_times {
        let _ = writeln!(text, "• {time}: {count} bookings");
    }
    text
}
