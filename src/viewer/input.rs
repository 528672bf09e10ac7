//! Input processing layer: key mapping and numeric prefix accumulator.
//!
//! Pure logic, no I/O. All functions are deterministic and testable.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const MAX_COUNT: u32 = 999_999;

/// Accumulated numeric prefix for vim/less-style commands.
///
/// Users type digits then a command character: `12g` jumps to grid row 12,
/// `10j` scrolls 10 rows down, `5n` moves focus five items forward.
pub(super) struct InputAccumulator {
    count: Option<u32>,
}

impl InputAccumulator {
    pub(super) fn new() -> Self {
        Self { count: None }
    }

    /// Feed a digit character ('0'..='9'). Returns false if overflow would occur.
    fn push_digit(&mut self, d: u32) -> bool {
        let current = self.count.unwrap_or(0);
        let new = current.saturating_mul(10).saturating_add(d);
        if new > MAX_COUNT {
            return false;
        }
        self.count = Some(new);
        true
    }

    /// Take the accumulated count, resetting to None.
    fn take(&mut self) -> Option<u32> {
        self.count.take()
    }

    pub(super) fn peek(&self) -> Option<u32> {
        self.count
    }

    pub(super) fn reset(&mut self) {
        self.count = None;
    }

    pub(super) fn is_active(&self) -> bool {
        self.count.is_some()
    }
}

/// Actions produced by key input processing.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Action {
    Quit,
    ScrollDown(u32),
    ScrollUp(u32),
    HalfPageDown(u32),
    HalfPageUp(u32),
    JumpToTop,
    JumpToBottom,
    /// 1-based grid row.
    JumpToRow(u32),
    /// Open the viewer cursor on the first item of the top visible row.
    Focus,
    FocusNext(u32),
    FocusPrev(u32),
    /// Open the focused item's full image.
    Open,
    CancelInput,
    /// A digit was accumulated; caller should redraw status bar.
    Digit,
}

/// Map a key event to an `Action`, consuming/updating the accumulator as needed.
///
/// Returns `None` for unknown keys (caller should reset accumulator).
pub(super) fn map_key_event(key: KeyEvent, acc: &mut InputAccumulator) -> Option<Action> {
    let KeyEvent { code, modifiers, .. } = key;

    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Action::Quit),

        (KeyCode::Esc, _) => {
            acc.reset();
            Some(Action::CancelInput)
        }

        (KeyCode::Char(c @ '0'..='9'), KeyModifiers::NONE) => {
            let d = c as u32 - '0' as u32;
            acc.push_digit(d);
            Some(Action::Digit)
        }

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => {
            Some(Action::ScrollDown(acc.take().unwrap_or(1)))
        }
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
            Some(Action::ScrollUp(acc.take().unwrap_or(1)))
        }
        (KeyCode::Char('d'), _) | (KeyCode::PageDown, _) => {
            Some(Action::HalfPageDown(acc.take().unwrap_or(1)))
        }
        (KeyCode::Char('u'), _) | (KeyCode::PageUp, _) => {
            Some(Action::HalfPageUp(acc.take().unwrap_or(1)))
        }
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => match acc.take() {
            None => Some(Action::JumpToTop),
            Some(n) => Some(Action::JumpToRow(n)),
        },
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => match acc.take() {
            None => Some(Action::JumpToBottom),
            Some(n) => Some(Action::JumpToRow(n)),
        },

        (KeyCode::Enter, _) => {
            acc.reset();
            Some(Action::Focus)
        }
        (KeyCode::Char('n'), _) | (KeyCode::Right, _) => {
            Some(Action::FocusNext(acc.take().unwrap_or(1)))
        }
        (KeyCode::Char('p'), _) | (KeyCode::Left, _) => {
            Some(Action::FocusPrev(acc.take().unwrap_or(1)))
        }
        (KeyCode::Char('o'), _) => {
            acc.reset();
            Some(Action::Open)
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn simple_key(code: KeyCode) -> KeyEvent {
        key(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_5j_scroll_down() {
        let mut acc = InputAccumulator::new();
        let a = map_key_event(simple_key(KeyCode::Char('5')), &mut acc);
        assert_eq!(a, Some(Action::Digit));
        let a = map_key_event(simple_key(KeyCode::Char('j')), &mut acc);
        assert_eq!(a, Some(Action::ScrollDown(5)));
        assert!(!acc.is_active());
    }

    #[test]
    fn test_g_without_prefix_jumps_top() {
        let mut acc = InputAccumulator::new();
        let a = map_key_event(simple_key(KeyCode::Char('g')), &mut acc);
        assert_eq!(a, Some(Action::JumpToTop));
    }

    #[test]
    fn test_12g_jumps_to_row() {
        let mut acc = InputAccumulator::new();
        map_key_event(simple_key(KeyCode::Char('1')), &mut acc);
        map_key_event(simple_key(KeyCode::Char('2')), &mut acc);
        let a = map_key_event(simple_key(KeyCode::Char('g')), &mut acc);
        assert_eq!(a, Some(Action::JumpToRow(12)));
    }

    #[test]
    fn test_big_g_bottom() {
        let mut acc = InputAccumulator::new();
        let a = map_key_event(key(KeyCode::Char('G'), KeyModifiers::SHIFT), &mut acc);
        assert_eq!(a, Some(Action::JumpToBottom));
    }

    #[test]
    fn test_q_quits() {
        let mut acc = InputAccumulator::new();
        let a = map_key_event(simple_key(KeyCode::Char('q')), &mut acc);
        assert_eq!(a, Some(Action::Quit));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut acc = InputAccumulator::new();
        let a = map_key_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut acc);
        assert_eq!(a, Some(Action::Quit));
    }

    #[test]
    fn test_esc_cancels_input() {
        let mut acc = InputAccumulator::new();
        map_key_event(simple_key(KeyCode::Char('5')), &mut acc);
        assert!(acc.is_active());
        let a = map_key_event(simple_key(KeyCode::Esc), &mut acc);
        assert_eq!(a, Some(Action::CancelInput));
        assert!(!acc.is_active());
    }

    #[test]
    fn test_unknown_key_returns_none() {
        let mut acc = InputAccumulator::new();
        let a = map_key_event(simple_key(KeyCode::Char('x')), &mut acc);
        assert!(a.is_none());
    }

    #[test]
    fn test_focus_keys() {
        let mut acc = InputAccumulator::new();
        assert_eq!(map_key_event(simple_key(KeyCode::Enter), &mut acc), Some(Action::Focus));
        map_key_event(simple_key(KeyCode::Char('3')), &mut acc);
        assert_eq!(
            map_key_event(simple_key(KeyCode::Char('n')), &mut acc),
            Some(Action::FocusNext(3))
        );
        assert_eq!(
            map_key_event(simple_key(KeyCode::Char('p')), &mut acc),
            Some(Action::FocusPrev(1))
        );
    }

    #[test]
    fn test_open_discards_count() {
        let mut acc = InputAccumulator::new();
        map_key_event(simple_key(KeyCode::Char('7')), &mut acc);
        assert_eq!(map_key_event(simple_key(KeyCode::Char('o')), &mut acc), Some(Action::Open));
        assert!(!acc.is_active());
    }

    #[test]
    fn test_digit_overflow_ignored() {
        let mut acc = InputAccumulator::new();
        for _ in 0..8 {
            map_key_event(simple_key(KeyCode::Char('9')), &mut acc);
        }
        assert_eq!(acc.peek(), Some(999_999));
    }
}
