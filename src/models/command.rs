/// Menu buttons and slash commands a chat participant can send as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Book,
    Contacts,
    LeaveReview,
    SkipReview,
    CancelBooking,
    SkipComment,
    BackToCalendar,
    MainMenu,
    AdminPanel,
    PendingBookings,
    UpcomingBookings,
    RejectedBookings,
    PendingReviews,
    Statistics,
}

const ALL: [Command; 15] = [
    Command::Start,
    Command::Book,
    Command::Contacts,
    Command::LeaveReview,
    Command::SkipReview,
    Command::CancelBooking,
    Command::SkipComment,
    Command::BackToCalendar,
    Command::MainMenu,
    Command::AdminPanel,
    Command::PendingBookings,
    Command::UpcomingBookings,
    Command::RejectedBookings,
    Command::PendingReviews,
    Command::Statistics,
];

impl Command {
    /// Text of the keyboard button that sends this command.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Book => "📅 Book a table",
            Command::Contacts => "📞 Contacts",
            Command::LeaveReview => "⭐ Leave a review",
            Command::SkipReview => "/skip",
            Command::CancelBooking => "❌ Cancel booking",
            Command::SkipComment => "➡️ Skip comment",
            Command::BackToCalendar => "🔙 Back to calendar",
            Command::MainMenu => "🔙 Main menu",
            Command::AdminPanel => "👑 Admin panel",
            Command::PendingBookings => "⏳ Pending bookings",
            Command::UpcomingBookings => "✅ Upcoming bookings",
            Command::RejectedBookings => "❌ Rejected bookings",
            Command::PendingReviews => "💬 Reviews awaiting moderation",
            Command::Statistics => "📈 Statistics",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Command::Book => &["/book", "book"],
            Command::Contacts => &["/contacts"],
            Command::LeaveReview => &["/review"],
            Command::CancelBooking => &["/cancel", "cancel"],
            Command::AdminPanel => &["/admin"],
            Command::Statistics => &["/stats"],
            _ => &[],
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        // Telegram appends the bot name to commands in groups: /start@bot
        let bare = match text.split_once('@') {
            Some((command, _)) if text.starts_with('/') => command,
            _ => text,
        };
        let lowered = bare.to_lowercase();

        ALL.into_iter().find(|command| {
            command.label() == text
                || command.label() == lowered
                || command.aliases().contains(&lowered.as_str())
        })
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::AdminPanel
                | Command::PendingBookings
                | Command::UpcomingBookings
                | Command::RejectedBookings
                | Command::PendingReviews
                | Command::Statistics
        )
    }
}
