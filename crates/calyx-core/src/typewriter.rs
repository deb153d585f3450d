//! Character-by-character reveal with a blinking cursor.
//!
//! A small state machine driven by elapsed time. The owner feeds `tick` with the time since the
//! previous tick and reacts to the returned events (disable input on `Started`, re-enable and
//! refocus on `Finished`). Dropping the value is the unmount boundary; nothing keeps running.

use std::time::Duration;

pub const CHAR_INTERVAL: Duration = Duration::from_millis(25);
pub const BLINK_INTERVAL: Duration = Duration::from_millis(250);
pub const CURSOR_GLYPH: &str = "█";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypewriterState {
    Idle,
    Typing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingEvent {
    Started,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Typewriter {
    content: String,
    total_chars: usize,
    revealed: usize,
    state: TypewriterState,
    char_interval: Duration,
    blink_interval: Duration,
    typing_elapsed: Duration,
    blink_elapsed: Duration,
    cursor_on: bool,
}

impl Typewriter {
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_intervals(content, CHAR_INTERVAL, BLINK_INTERVAL)
    }

    pub fn with_intervals(
        content: impl Into<String>,
        char_interval: Duration,
        blink_interval: Duration,
    ) -> Self {
        let content = content.into();
        let total_chars = content.chars().count();
        Self {
            content,
            total_chars,
            revealed: 0,
            state: TypewriterState::Idle,
            char_interval: char_interval.max(Duration::from_millis(1)),
            blink_interval: blink_interval.max(Duration::from_millis(1)),
            typing_elapsed: Duration::ZERO,
            blink_elapsed: Duration::ZERO,
            cursor_on: true,
        }
    }

    /// Begin typing. Only the first call on an idle typewriter does anything, so re-renders of
    /// the same block never restart the animation. Empty content finishes silently.
    pub fn start(&mut self) -> Option<TypingEvent> {
        if self.state != TypewriterState::Idle {
            return None;
        }
        if self.total_chars == 0 {
            self.state = TypewriterState::Done;
            return None;
        }
        self.state = TypewriterState::Typing;
        Some(TypingEvent::Started)
    }

    /// Advance both timers. Returns `Finished` exactly once, on the tick that reveals the last
    /// character.
    pub fn tick(&mut self, dt: Duration) -> Option<TypingEvent> {
        if self.state != TypewriterState::Typing {
            return None;
        }

        self.blink_elapsed += dt;
        while self.blink_elapsed >= self.blink_interval {
            self.blink_elapsed -= self.blink_interval;
            self.cursor_on = !self.cursor_on;
        }

        self.typing_elapsed += dt;
        while self.typing_elapsed >= self.char_interval && self.revealed < self.total_chars {
            self.typing_elapsed -= self.char_interval;
            self.revealed += 1;
        }

        if self.revealed >= self.total_chars {
            self.state = TypewriterState::Done;
            self.cursor_on = true;
            return Some(TypingEvent::Finished);
        }
        None
    }

    pub fn state(&self) -> TypewriterState {
        self.state
    }

    pub fn is_typing(&self) -> bool {
        self.state == TypewriterState::Typing
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The revealed prefix, cut on a char boundary.
    pub fn visible_text(&self) -> &str {
        match self.state {
            TypewriterState::Idle => "",
            TypewriterState::Done => &self.content,
            TypewriterState::Typing => {
                let end = self
                    .content
                    .char_indices()
                    .nth(self.revealed)
                    .map(|(i, _)| i)
                    .unwrap_or(self.content.len());
                &self.content[..end]
            }
        }
    }

    /// Blinks while typing, stays on once finished.
    pub fn cursor_visible(&self) -> bool {
        match self.state {
            TypewriterState::Typing => self.cursor_on,
            TypewriterState::Idle | TypewriterState::Done => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_reveals_one_char_per_interval() {
        let mut tw = Typewriter::new("abc");
        assert_eq!(tw.visible_text(), "");
        assert_eq!(tw.start(), Some(TypingEvent::Started));

        assert_eq!(tw.tick(ms(10)), None);
        assert_eq!(tw.visible_text(), "");
        assert_eq!(tw.tick(ms(15)), None);
        assert_eq!(tw.visible_text(), "a");
        assert_eq!(tw.tick(ms(25)), None);
        assert_eq!(tw.visible_text(), "ab");
        assert_eq!(tw.tick(ms(25)), Some(TypingEvent::Finished));
        assert_eq!(tw.visible_text(), "abc");
        assert_eq!(tw.state(), TypewriterState::Done);
    }

    #[test]
    fn test_large_tick_catches_up() {
        let mut tw = Typewriter::new("hola mundo");
        tw.start();
        assert_eq!(tw.tick(ms(1000)), Some(TypingEvent::Finished));
        assert_eq!(tw.visible_text(), "hola mundo");
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut tw = Typewriter::new("abcd");
        assert_eq!(tw.start(), Some(TypingEvent::Started));
        tw.tick(ms(50));
        assert_eq!(tw.visible_text(), "ab");
        assert_eq!(tw.start(), None);
        assert_eq!(tw.visible_text(), "ab");
    }

    #[test]
    fn test_finished_emitted_once() {
        let mut tw = Typewriter::new("x");
        tw.start();
        assert_eq!(tw.tick(ms(25)), Some(TypingEvent::Finished));
        assert_eq!(tw.tick(ms(25)), None);
        assert_eq!(tw.start(), None);
    }

    #[test]
    fn test_empty_content_emits_nothing() {
        let mut tw = Typewriter::new("");
        assert_eq!(tw.start(), None);
        assert_eq!(tw.state(), TypewriterState::Done);
        assert_eq!(tw.tick(ms(100)), None);
    }

    #[test]
    fn test_cursor_blinks_independently() {
        let mut tw = Typewriter::new("x".repeat(100));
        tw.start();
        assert!(tw.cursor_visible());
        tw.tick(ms(249));
        assert!(tw.cursor_visible());
        tw.tick(ms(1));
        assert!(!tw.cursor_visible());
        tw.tick(ms(250));
        assert!(tw.cursor_visible());
        // Typing kept its own pace meanwhile: 500ms / 25ms
        assert_eq!(tw.visible_text().len(), 20);
    }

    #[test]
    fn test_cursor_stays_on_when_done() {
        let mut tw = Typewriter::new("ab");
        tw.start();
        tw.tick(ms(250));
        assert_eq!(tw.state(), TypewriterState::Done);
        assert!(tw.cursor_visible());
    }

    #[test]
    fn test_multibyte_content() {
        let mut tw = Typewriter::new("ñandú");
        tw.start();
        tw.tick(ms(50));
        assert_eq!(tw.visible_text(), "ña");
        tw.tick(ms(50));
        assert_eq!(tw.visible_text(), "ñand");
    }
}
