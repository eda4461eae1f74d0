//! Key identifiers, the input synthesis port and the modifier key tracker.
//!
//! The engine talks to the operating system through the [`Keyboard`] trait,
//! which covers the handful of events a substitution needs: press/release of
//! named keys, arbitrary Unicode characters and backspace runs.
//! [`SystemKeyboard`] implements it with `SendInput` on Windows; other
//! platforms fail with an unsupported-platform error at call time.

use crate::error::Result;

#[cfg(not(windows))]
use crate::error::TswError;

/// The keys the engine synthesizes, tracked per left/right variant for the
/// modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    ShiftLeft,
    ShiftRight,
    MetaLeft,
    MetaRight,
    Return,
    Backspace,
    LeftArrow,
    V,
}

/// The eight tracked modifier keys, in capture order.
pub const MODIFIER_KEYS: [Key; 8] = [
    Key::ControlLeft,
    Key::ControlRight,
    Key::AltLeft,
    Key::AltRight,
    Key::ShiftLeft,
    Key::ShiftRight,
    Key::MetaLeft,
    Key::MetaRight,
];

impl Key {
    pub fn is_modifier(self) -> bool {
        MODIFIER_KEYS.contains(&self)
    }
}

/// Port for synthesizing input events and querying physical key state.
pub trait Keyboard {
    /// Whether the key is physically held down right now.
    fn is_pressed(&self, key: Key) -> bool;

    /// Synthesize a key press event.
    fn key_down(&mut self, key: Key) -> Result<()>;

    /// Synthesize a key release event.
    fn key_up(&mut self, key: Key) -> Result<()>;

    /// Synthesize a full press-and-release of a key.
    fn tap(&mut self, key: Key) -> Result<()> {
        self.key_down(key)?;
        self.key_up(key)
    }

    /// Synthesize a press-and-release delivering an arbitrary Unicode
    /// character, independent of the current keyboard layout.
    fn tap_unicode(&mut self, ch: char) -> Result<()>;

    /// Synthesize `count` backspace events.
    fn backspaces(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            self.tap(Key::Backspace)?;
        }
        Ok(())
    }
}

/// The modifier keys that were physically held at capture time.
///
/// Injected keystrokes must not be combined with whatever modifiers the user
/// is really holding (a held Shift would capitalize typed characters, a held
/// Ctrl would turn them into shortcuts), so every injected burst is bracketed
/// by a capture-and-release up front and a restore afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModifierSnapshot {
    held: Vec<Key>,
}

impl ModifierSnapshot {
    /// Record every physically held modifier key and synthesize a release
    /// event for each. After this call none of the eight tracked modifiers
    /// are reported as held, whatever their state was before.
    pub fn capture_and_release(keyboard: &mut dyn Keyboard) -> Result<Self> {
        let mut held = Vec::new();
        for key in MODIFIER_KEYS {
            if keyboard.is_pressed(key) {
                held.push(key);
                keyboard.key_up(key)?;
            }
        }
        Ok(Self { held })
    }

    /// Re-press every recorded key, in capture order.
    pub fn restore(&self, keyboard: &mut dyn Keyboard) -> Result<()> {
        for &key in &self.held {
            keyboard.key_down(key)?;
        }
        Ok(())
    }

    pub fn keys(&self) -> &[Key] {
        &self.held
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Run `work` with all modifier keys released, restoring them afterwards.
///
/// The restore runs on every exit path of `work`. If both the work and the
/// restore fail, the work's error is the one propagated.
pub fn with_modifiers_released<T>(
    keyboard: &mut dyn Keyboard,
    work: impl FnOnce(&mut dyn Keyboard) -> Result<T>,
) -> Result<T> {
    let snapshot = ModifierSnapshot::capture_and_release(keyboard)?;
    let result = work(keyboard);
    let restored = snapshot.restore(keyboard);
    match result {
        Ok(value) => restored.map(|_| value),
        Err(err) => Err(err),
    }
}

/// Keyboard implementation backed by the operating system's input queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeyboard;

impl SystemKeyboard {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
mod platform {
    use super::Key;
    use crate::error::{Result, TswError};
    use std::mem;
    use winapi::um::winuser::{
        GetKeyState, SendInput, INPUT, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP,
        KEYEVENTF_UNICODE, VK_BACK, VK_LCONTROL, VK_LEFT, VK_LMENU, VK_LSHIFT, VK_LWIN,
        VK_RCONTROL, VK_RETURN, VK_RMENU, VK_RSHIFT, VK_RWIN,
    };

    impl Key {
        fn virtual_key(self) -> u16 {
            let vk = match self {
                Key::ControlLeft => VK_LCONTROL,
                Key::ControlRight => VK_RCONTROL,
                Key::AltLeft => VK_LMENU,
                Key::AltRight => VK_RMENU,
                Key::ShiftLeft => VK_LSHIFT,
                Key::ShiftRight => VK_RSHIFT,
                Key::MetaLeft => VK_LWIN,
                Key::MetaRight => VK_RWIN,
                Key::Return => VK_RETURN,
                Key::Backspace => VK_BACK,
                Key::LeftArrow => VK_LEFT,
                Key::V => b'V' as i32,
            };
            vk as u16
        }
    }

    pub(super) fn is_pressed(key: Key) -> bool {
        // the high-order bit of GetKeyState is set while the key is down
        unsafe { GetKeyState(key.virtual_key() as i32) < 0 }
    }

    fn send_keyboard_input(vk: u16, scan: u16, flags: u32, event: &str) -> Result<()> {
        let mut input: INPUT = unsafe { mem::zeroed() };
        input.type_ = INPUT_KEYBOARD;
        unsafe {
            *input.u.ki_mut() = KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            };
            if SendInput(1, &mut input, mem::size_of::<INPUT>() as i32) != 1 {
                return Err(TswError::synthesis(
                    event,
                    std::io::Error::last_os_error().to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(super) fn key_event(key: Key, release: bool) -> Result<()> {
        let flags = if release { KEYEVENTF_KEYUP } else { 0 };
        let event = format!(
            "key {:?} {}",
            key,
            if release { "release" } else { "press" }
        );
        send_keyboard_input(key.virtual_key(), 0, flags, &event)
    }

    pub(super) fn unicode_tap(ch: char) -> Result<()> {
        // KEYEVENTF_UNICODE events carry a UTF-16 code unit in wScan;
        // characters outside the BMP are delivered as their surrogate pair
        let mut units = [0u16; 2];
        for &unit in ch.encode_utf16(&mut units).iter() {
            let event = format!("unicode character {:?}", ch);
            send_keyboard_input(0, unit, KEYEVENTF_UNICODE, &event)?;
            send_keyboard_input(0, unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP, &event)?;
        }
        Ok(())
    }
}

#[cfg(windows)]
impl Keyboard for SystemKeyboard {
    fn is_pressed(&self, key: Key) -> bool {
        platform::is_pressed(key)
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        platform::key_event(key, false)
    }

    fn key_up(&mut self, key: Key) -> Result<()> {
        platform::key_event(key, true)
    }

    fn tap_unicode(&mut self, ch: char) -> Result<()> {
        platform::unicode_tap(ch)
    }
}

#[cfg(not(windows))]
impl Keyboard for SystemKeyboard {
    fn is_pressed(&self, _key: Key) -> bool {
        false
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        Err(TswError::unsupported_platform(format!(
            "cannot synthesize {:?} press outside Windows",
            key
        )))
    }

    fn key_up(&mut self, key: Key) -> Result<()> {
        Err(TswError::unsupported_platform(format!(
            "cannot synthesize {:?} release outside Windows",
            key
        )))
    }

    fn tap_unicode(&mut self, _ch: char) -> Result<()> {
        Err(TswError::unsupported_platform(
            "cannot synthesize Unicode input outside Windows",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Down(Key),
        Up(Key),
        Unicode(char),
    }

    #[derive(Default)]
    struct FakeKeyboard {
        pressed: HashSet<Key>,
        events: Vec<Event>,
    }

    impl Keyboard for FakeKeyboard {
        fn is_pressed(&self, key: Key) -> bool {
            self.pressed.contains(&key)
        }

        fn key_down(&mut self, key: Key) -> Result<()> {
            self.pressed.insert(key);
            self.events.push(Event::Down(key));
            Ok(())
        }

        fn key_up(&mut self, key: Key) -> Result<()> {
            self.pressed.remove(&key);
            self.events.push(Event::Up(key));
            Ok(())
        }

        fn tap_unicode(&mut self, ch: char) -> Result<()> {
            self.events.push(Event::Unicode(ch));
            Ok(())
        }
    }

    #[test]
    fn test_modifier_keys_are_modifiers() {
        for key in MODIFIER_KEYS {
            assert!(key.is_modifier());
        }
        assert!(!Key::Return.is_modifier());
        assert!(!Key::V.is_modifier());
    }

    #[test]
    fn test_capture_releases_held_modifiers_in_order() {
        let mut keyboard = FakeKeyboard::default();
        keyboard.pressed.insert(Key::ShiftRight);
        keyboard.pressed.insert(Key::ControlLeft);

        let snapshot = ModifierSnapshot::capture_and_release(&mut keyboard).unwrap();

        // capture order follows MODIFIER_KEYS, not press order
        assert_eq!(snapshot.keys(), &[Key::ControlLeft, Key::ShiftRight]);
        assert_eq!(
            keyboard.events,
            vec![Event::Up(Key::ControlLeft), Event::Up(Key::ShiftRight)]
        );
        assert!(!keyboard.is_pressed(Key::ControlLeft));
        assert!(!keyboard.is_pressed(Key::ShiftRight));
    }

    #[test]
    fn test_capture_with_no_held_modifiers_is_empty() {
        let mut keyboard = FakeKeyboard::default();
        let snapshot = ModifierSnapshot::capture_and_release(&mut keyboard).unwrap();
        assert!(snapshot.is_empty());
        assert!(keyboard.events.is_empty());
    }

    #[test]
    fn test_capture_restore_round_trip() {
        let mut keyboard = FakeKeyboard::default();
        keyboard.pressed.insert(Key::AltLeft);
        keyboard.pressed.insert(Key::MetaRight);
        let before = keyboard.pressed.clone();

        let snapshot = ModifierSnapshot::capture_and_release(&mut keyboard).unwrap();
        snapshot.restore(&mut keyboard).unwrap();

        assert_eq!(keyboard.pressed, before);
    }

    #[test]
    fn test_with_modifiers_released_restores_after_work() {
        let mut keyboard = FakeKeyboard::default();
        keyboard.pressed.insert(Key::ControlLeft);

        with_modifiers_released(&mut keyboard, |kb| {
            assert!(!kb.is_pressed(Key::ControlLeft));
            kb.tap(Key::LeftArrow)
        })
        .unwrap();

        assert!(keyboard.is_pressed(Key::ControlLeft));
        assert_eq!(
            keyboard.events,
            vec![
                Event::Up(Key::ControlLeft),
                Event::Down(Key::LeftArrow),
                Event::Up(Key::LeftArrow),
                Event::Down(Key::ControlLeft),
            ]
        );
    }

    #[test]
    fn test_with_modifiers_released_work_error_wins() {
        let mut keyboard = FakeKeyboard::default();
        keyboard.pressed.insert(Key::ShiftLeft);

        let result = with_modifiers_released(&mut keyboard, |kb| {
            kb.tap_unicode('x')?;
            Err::<(), _>(crate::error::TswError::synthesis("unicode", "forced"))
        });

        assert!(matches!(
            result,
            Err(crate::error::TswError::Synthesis { .. })
        ));
        // the restore still ran
        assert!(keyboard.is_pressed(Key::ShiftLeft));
    }

    #[test]
    fn test_backspaces_default_impl() {
        let mut keyboard = FakeKeyboard::default();
        keyboard.backspaces(3).unwrap();
        assert_eq!(keyboard.events.len(), 6);
        assert_eq!(keyboard.events[0], Event::Down(Key::Backspace));
        assert_eq!(keyboard.events[5], Event::Up(Key::Backspace));

        keyboard.events.clear();
        keyboard.backspaces(0).unwrap();
        assert!(keyboard.events.is_empty());
    }
}
