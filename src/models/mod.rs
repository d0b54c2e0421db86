pub mod booking;
pub mod callback;
pub mod command;
pub mod inbound;
pub mod review;
pub mod session;
pub mod stats;

pub use booking::{Booking, BookingStatus, NewBooking, ReminderKind};
pub use callback::{Callback, CallbackError};
pub use command::Command;
pub use inbound::{Inbound, Sender};
pub use review::{NewReview, Review, ReviewDraft, ReviewStatus};
pub use session::{Advance, BookingSession, BookingStep};
pub use stats::{AdminReply, AggregateStats, StatsReport};
