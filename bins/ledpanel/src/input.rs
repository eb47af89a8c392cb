//! Key bindings of the settings form.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use ledpanel_core::Channel;

/// Steps a Shift+arrow moves a number by.
pub const COARSE_STEPS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    /// Move the focused control by this many steps
    Adjust(i64),
    /// Toggle a switch or step a select/number forward
    Activate,
    PickChannel(Channel),
    NextSection,
    PreviousSection,
    /// Jump to a section by its zero-based index
    SelectSection(usize),
}

pub fn map_key(key: KeyEvent) -> Option<Action> {
    let coarse = key.modifiers.contains(KeyModifiers::SHIFT);
    let steps = if coarse { COARSE_STEPS } else { 1 };

    let action = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Adjust(-steps),
        KeyCode::Right | KeyCode::Char('l') => Action::Adjust(steps),
        KeyCode::Char(' ') | KeyCode::Enter => Action::Activate,
        KeyCode::Char('r') => Action::PickChannel(Channel::Red),
        KeyCode::Char('g') => Action::PickChannel(Channel::Green),
        KeyCode::Char('b') => Action::PickChannel(Channel::Blue),
        KeyCode::Tab => Action::NextSection,
        KeyCode::BackTab => Action::PreviousSection,
        KeyCode::Char(c @ '1'..='9') => Action::SelectSection(c as usize - '1' as usize),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows() {
        assert_eq!(map_key(key(KeyCode::Up)), Some(Action::Up));
        assert_eq!(map_key(key(KeyCode::Left)), Some(Action::Adjust(-1)));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Right, KeyModifiers::SHIFT)),
            Some(Action::Adjust(COARSE_STEPS))
        );
    }

    #[test]
    fn test_channel_keys() {
        assert_eq!(map_key(key(KeyCode::Char('g'))), Some(Action::PickChannel(Channel::Green)));
    }

    #[test]
    fn test_digit_keys_select_sections() {
        assert_eq!(map_key(key(KeyCode::Char('1'))), Some(Action::SelectSection(0)));
        assert_eq!(map_key(key(KeyCode::Char('9'))), Some(Action::SelectSection(8)));
        assert_eq!(map_key(key(KeyCode::Char('0'))), None);
    }

    #[test]
    fn test_quit_and_unbound() {
        assert_eq!(map_key(key(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(map_key(key(KeyCode::Char('x'))), None);
        assert_eq!(map_key(key(KeyCode::BackTab)), Some(Action::PreviousSection));
    }
}
