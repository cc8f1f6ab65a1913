//! What a finished turn means for mood and long-term memory.
//!
//! Pure functions only; the loop applies their results under the store
//! turn lock.

use crate::loop_runner::ExecutedTool;
use ember_core::tool::truncate_chars;
use ember_persona::markers::{CREATIVE_MARKERS, PRAISE_MARKERS, contains_any};
use ember_persona::profile::MessageSignals;
use ember_persona::MoodEvent;

/// Turns in one session after which `long_session` fires.
pub const LONG_SESSION_TURNS: u32 = 30;

/// Messages longer than this are archived even when no tool ran.
pub const ARCHIVE_MESSAGE_CHARS: usize = 100;

const ARCHIVE_EXCERPT_CHARS: usize = 200;

/// Task outcome event: failure when failures outnumber successes,
/// otherwise success if anything succeeded.
pub fn outcome_event(executed: &[ExecutedTool]) -> Option<MoodEvent> {
    let succeeded = executed.iter().filter(|t| t.success).count();
    let failed = executed.len() - succeeded;
    if failed > succeeded {
        Some(MoodEvent::TaskFailure)
    } else if succeeded > 0 {
        Some(MoodEvent::TaskSuccess)
    } else {
        None
    }
}

/// Every mood event one turn fires, in detection order.
pub fn turn_events(
    message: &str,
    executed: &[ExecutedTool],
    signals: MessageSignals,
    session_turns: u32,
) -> Vec<MoodEvent> {
    let mut events: Vec<MoodEvent> = outcome_event(executed).into_iter().collect();
    if contains_any(message, PRAISE_MARKERS) {
        events.push(MoodEvent::UserPraise);
    }
    if contains_any(message, CREATIVE_MARKERS) {
        events.push(MoodEvent::CreativeTask);
    }
    if signals.frustrated {
        events.push(MoodEvent::UserFrustration);
    }
    if session_turns >= LONG_SESSION_TURNS {
        events.push(MoodEvent::LongSession);
    }
    events
}

pub fn should_archive(message: &str, executed: &[ExecutedTool]) -> bool {
    !executed.is_empty() || message.chars().count() > ARCHIVE_MESSAGE_CHARS
}

pub fn archive_text(message: &str, executed: &[ExecutedTool]) -> String {
    let succeeded = executed.iter().filter(|t| t.success).count();
    format!(
        "User asked: \"{}\" - Result: {succeeded} tools succeeded",
        truncate_chars(message, ARCHIVE_EXCERPT_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ran(tool: &str, success: bool) -> ExecutedTool {
        ExecutedTool {
            tool: tool.into(),
            args: json!({}),
            result: if success { "ok".into() } else { "Error: boom".into() },
            success,
        }
    }

    #[test]
    fn outcome_by_majority() {
        assert_eq!(outcome_event(&[]), None);
        assert_eq!(outcome_event(&[ran("a", true)]), Some(MoodEvent::TaskSuccess));
        assert_eq!(
            outcome_event(&[ran("a", true), ran("b", false)]),
            Some(MoodEvent::TaskSuccess)
        );
        assert_eq!(
            outcome_event(&[ran("a", true), ran("b", false), ran("c", false)]),
            Some(MoodEvent::TaskFailure)
        );
        assert_eq!(outcome_event(&[ran("a", false)]), Some(MoodEvent::TaskFailure));
    }

    #[test]
    fn markers_and_signals_add_events() {
        let events = turn_events(
            "thanks, now build me a parser",
            &[ran("write_file", true)],
            MessageSignals::default(),
            0,
        );
        assert_eq!(
            events,
            vec![MoodEvent::TaskSuccess, MoodEvent::UserPraise, MoodEvent::CreativeTask]
        );

        let events = turn_events(
            "ugh",
            &[],
            MessageSignals { frustrated: true, excited: false },
            LONG_SESSION_TURNS,
        );
        assert_eq!(events, vec![MoodEvent::UserFrustration, MoodEvent::LongSession]);
    }

    #[test]
    fn archive_condition() {
        assert!(!should_archive("hi", &[]));
        assert!(should_archive("hi", &[ran("bash", false)]));
        assert!(should_archive(&"x".repeat(101), &[]));
        assert!(!should_archive(&"x".repeat(100), &[]));
    }

    #[test]
    fn archive_text_counts_successes() {
        let text = archive_text("make notes", &[ran("a", true), ran("b", false)]);
        assert_eq!(text, "User asked: \"make notes\" - Result: 1 tools succeeded");

        let long = "y".repeat(300);
        let text = archive_text(&long, &[]);
        assert!(text.contains(&"y".repeat(200)));
        assert!(!text.contains(&"y".repeat(201)));
    }
}
