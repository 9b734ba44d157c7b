use std::time::Duration;
use tokio::time::Instant;

pub const TYPING_IDLE: Duration = Duration::from_millis(2000);

/// Local "typing..." flag. Every keystroke pushes the deadline out; the flag
/// drops once `idle` passes without one. Nothing is sent to the partner.
#[derive(Debug, Clone)]
pub struct TypingIndicator {
    idle: Duration,
    deadline: Option<Instant>,
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::new(TYPING_IDLE)
    }
}

impl TypingIndicator {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            deadline: None,
        }
    }

    pub fn keystroke(&mut self) {
        self.deadline = Some(Instant::now() + self.idle);
    }

    pub fn is_typing(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() < d)
    }

    /// Time until the flag drops, for scheduling a UI refresh.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }
}
