mod clock;

pub use clock::{Clock, ClockSignal};

/// Format seconds as `MM:SS` (minutes are not wrapped at 60).
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
