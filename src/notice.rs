//! Transient notice banner.
//!
//! A single slot: showing a notice replaces whatever is on screen and restarts
//! the timer. Time is passed in explicitly (egui's input clock, in seconds) so
//! the state machine can be driven from tests.

use crate::constants::{NOTICE_FADE_SECS, NOTICE_VISIBLE_SECS};

/// Severity of a notice; selects its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral information
    Info,
    /// A completed action
    Success,
    /// A failed action
    Error,
}

/// Visibility phase of the notice at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoticePhase {
    /// Fully shown
    Visible,
    /// Transitioning out; carries the remaining opacity in `0.0..=1.0`
    Hiding(f32),
    /// Not shown
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
struct ShownNotice {
    message: String,
    severity: Severity,
    shown_at: f64,
}

/// Timed show/hide banner for success, error and info messages.
#[derive(Debug, Default)]
pub struct Notice {
    current: Option<ShownNotice>,
}

impl Notice {
    /// Shows `message` immediately, replacing any notice on screen.
    pub fn show(&mut self, message: impl Into<String>, severity: Severity, now: f64) {
        let message = message.into();
        match severity {
            Severity::Error => log::error!("Showing message: {message} ({severity:?})"),
            _ => log::info!("Showing message: {message} ({severity:?})"),
        }
        self.current = Some(ShownNotice {
            message,
            severity,
            shown_at: now,
        });
    }

    /// Phase of the notice at time `now`.
    pub fn phase(&self, now: f64) -> NoticePhase {
        let Some(notice) = &self.current else {
            return NoticePhase::Hidden;
        };
        let elapsed = now - notice.shown_at;
        if elapsed < NOTICE_VISIBLE_SECS {
            NoticePhase::Visible
        } else if elapsed < NOTICE_VISIBLE_SECS + NOTICE_FADE_SECS {
            let progress = (elapsed - NOTICE_VISIBLE_SECS) / NOTICE_FADE_SECS;
            NoticePhase::Hiding((1.0 - progress) as f32)
        } else {
            NoticePhase::Hidden
        }
    }

    /// Drops the notice once it is fully hidden. Returns whether it is still shown.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.phase(now) == NoticePhase::Hidden {
            self.current = None;
            false
        } else {
            true
        }
    }

    /// Seconds until the notice changes phase, used to schedule a repaint.
    pub fn next_change_in(&self, now: f64) -> Option<f64> {
        let notice = self.current.as_ref()?;
        let elapsed = now - notice.shown_at;
        match self.phase(now) {
            NoticePhase::Visible => Some(NOTICE_VISIBLE_SECS - elapsed),
            // Repaint every frame while fading
            NoticePhase::Hiding(_) => Some(0.0),
            NoticePhase::Hidden => None,
        }
    }

    /// Message currently on screen, if any.
    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|n| n.message.as_str())
    }

    /// Severity of the notice currently on screen, if any.
    pub fn severity(&self) -> Option<Severity> {
        self.current.as_ref().map(|n| n.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_hides_after_visible_window_and_transition() {
        let mut notice = Notice::default();
        notice.show("Saved", Severity::Success, 10.0);
        assert_eq!(notice.phase(10.0), NoticePhase::Visible);
        assert_eq!(notice.phase(12.9), NoticePhase::Visible);
        assert!(matches!(notice.phase(13.15), NoticePhase::Hiding(a) if a > 0.0 && a < 1.0));
        assert_eq!(notice.phase(13.3), NoticePhase::Hidden);
        assert!(!notice.tick(13.3));
        assert_eq!(notice.message(), None);
    }

    #[test]
    fn last_call_wins_and_restarts_timer() {
        let mut notice = Notice::default();
        notice.show("first", Severity::Info, 0.0);
        notice.show("second", Severity::Error, 2.5);
        assert_eq!(notice.message(), Some("second"));
        assert_eq!(notice.severity(), Some(Severity::Error));
        // Would have been hidden under the first timer
        assert_eq!(notice.phase(4.0), NoticePhase::Visible);
        assert!(notice.tick(5.0));
    }

    #[test]
    fn next_change_tracks_the_visible_window() {
        let mut notice = Notice::default();
        assert_eq!(notice.next_change_in(0.0), None);
        notice.show("x", Severity::Info, 1.0);
        let wait = notice.next_change_in(2.0).unwrap();
        assert!((wait - 2.0).abs() < 1e-9);
    }
}
