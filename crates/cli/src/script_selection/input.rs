//! Translation of crossterm events into state machine input.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use nrs_core::app_state::Key;

use super::types::InputEvent;

/// Decodes a key press. Releases and keys the picker has no use for give
/// `None`.
pub fn decode_key(key_event: KeyEvent) -> Option<Key> {
    if key_event.kind == KeyEventKind::Release {
        return None;
    }

    let key = match key_event.code {
        KeyCode::Char(c) if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
            Key::Ctrl(c.to_ascii_lowercase())
        }
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab => Key::Tab,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => return None,
    };
    Some(key)
}

pub fn decode_event(event: Event) -> Option<InputEvent> {
    match event {
        Event::Key(key_event) => decode_key(key_event).map(InputEvent::Key),
        Event::Resize(width, height) => Some(InputEvent::Resize(width, height)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_decode_plain_chars() {
        assert_eq!(
            decode_key(press(KeyCode::Char('j'), KeyModifiers::NONE)),
            Some(Key::Char('j'))
        );
        assert_eq!(
            decode_key(press(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            Some(Key::Char('G'))
        );
    }

    #[test]
    fn test_decode_control_chars() {
        assert_eq!(
            decode_key(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Key::Ctrl('c'))
        );
        assert_eq!(
            decode_key(press(
                KeyCode::Char('C'),
                KeyModifiers::CONTROL | KeyModifiers::SHIFT
            )),
            Some(Key::Ctrl('c'))
        );
    }

    #[test]
    fn test_decode_special_keys() {
        assert_eq!(
            decode_key(press(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Key::Enter)
        );
        assert_eq!(
            decode_key(press(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(Key::Backspace)
        );
        assert_eq!(decode_key(press(KeyCode::F(5), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_release_is_ignored() {
        let release = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(decode_key(release), None);
    }

    #[test]
    fn test_decode_resize() {
        assert_eq!(
            decode_event(Event::Resize(100, 40)),
            Some(InputEvent::Resize(100, 40))
        );
        assert_eq!(decode_event(Event::FocusGained), None);
    }
}
