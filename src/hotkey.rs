//! Global trigger hotkey for firing substitutions manually.
//!
//! The hotkey mode of the `tsw` driver registers one system-wide hotkey and
//! performs the configured substitution every time it is pressed. Presses
//! are forwarded to the driver through a watch channel carrying a running
//! press counter.

use crate::error::{Result, TswError};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    press_tx: watch::Sender<u64>,
    press_rx: watch::Receiver<u64>,
}

impl HotkeyManager {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|err| TswError::hotkey(format!("failed to create hotkey manager: {err}")))?;
        let (press_tx, press_rx) = watch::channel(0u64);

        Ok(Self {
            manager,
            press_tx,
            press_rx,
        })
    }

    /// Register the trigger hotkey, e.g. `"ctrl+alt+t"`.
    pub fn register_trigger(&mut self, hotkey_str: &str) -> Result<()> {
        let hotkey = parse_hotkey(hotkey_str)?;
        self.manager
            .register(hotkey)
            .map_err(|err| TswError::hotkey(format!("failed to register '{hotkey_str}': {err}")))?;
        info!(hotkey = hotkey_str, "trigger hotkey registered");
        Ok(())
    }

    /// Receiver observing the press counter. Await `changed()` to be woken
    /// on the next press.
    pub fn press_receiver(&self) -> watch::Receiver<u64> {
        self.press_rx.clone()
    }

    /// Spawn the blocking event pump forwarding presses to the channel.
    pub fn start_listener(self: Arc<Self>) {
        let receiver = GlobalHotKeyEvent::receiver();
        let manager = self.clone();

        tokio::task::spawn_blocking(move || loop {
            if let Ok(event) = receiver.try_recv() {
                if event.state == HotKeyState::Pressed {
                    manager.press_tx.send_modify(|count| *count += 1);
                }
            }

            // Small sleep to prevent busy waiting
            std::thread::sleep(std::time::Duration::from_millis(10));
        });
    }
}

fn parse_hotkey(hotkey_str: &str) -> Result<global_hotkey::hotkey::HotKey> {
    use global_hotkey::hotkey::{HotKey, Modifiers};

    let binding = hotkey_str.to_lowercase();
    let parts: Vec<&str> = binding.split('+').map(|s| s.trim()).collect();

    let mut modifiers = Modifiers::empty();
    let mut key_code = None;

    for part in &parts {
        match *part {
            "" => return Err(TswError::hotkey(format!("malformed hotkey: {hotkey_str}"))),
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "meta" | "cmd" | "super" => modifiers |= Modifiers::SUPER,
            key => {
                if key_code.is_some() {
                    return Err(TswError::hotkey(format!(
                        "multiple keys specified in hotkey: {hotkey_str}"
                    )));
                }
                key_code = Some(parse_key_code(key)?);
            }
        }
    }

    let code = key_code
        .ok_or_else(|| TswError::hotkey(format!("no key specified in hotkey: {hotkey_str}")))?;

    Ok(HotKey::new(Some(modifiers), code))
}

/// Map a lowercase key name to its key code: single letters and digits,
/// function keys, and the named keys `Code` itself knows (`space`,
/// `escape`, arrows as `up`/`down`/`left`/`right`).
fn parse_key_code(key: &str) -> Result<global_hotkey::hotkey::Code> {
    use global_hotkey::hotkey::Code;

    let normalized = if key.len() == 1 && key.chars().all(|c| c.is_ascii_lowercase()) {
        format!("Key{}", key.to_uppercase())
    } else if key.len() == 1 && key.chars().all(|c| c.is_ascii_digit()) {
        format!("Digit{key}")
    } else if key
        .strip_prefix('f')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    {
        key.to_uppercase()
    } else {
        let named = match key {
            "enter" | "return" => "Enter",
            "esc" => "Escape",
            "up" => "ArrowUp",
            "down" => "ArrowDown",
            "left" => "ArrowLeft",
            "right" => "ArrowRight",
            other => {
                // "space" -> "Space", "tab" -> "Tab", "pageup" stays invalid
                return capitalized(other)
                    .parse::<Code>()
                    .map_err(|_| TswError::hotkey(format!("unsupported key: {key}")));
            }
        };
        named.to_string()
    };

    normalized
        .parse::<Code>()
        .map_err(|_| TswError::hotkey(format!("unsupported key: {key}")))
}

fn capitalized(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hotkey_with_modifiers() {
        assert!(parse_hotkey("ctrl+alt+t").is_ok());
        assert!(parse_hotkey("CTRL+SHIFT+Space").is_ok());
        assert!(parse_hotkey("meta+f5").is_ok());
        assert!(parse_hotkey("ctrl+9").is_ok());
    }

    #[test]
    fn test_parse_hotkey_rejects_malformed() {
        assert!(parse_hotkey("").is_err());
        assert!(parse_hotkey("ctrl+").is_err());
        assert!(parse_hotkey("ctrl+alt").is_err()); // no key, only modifiers
        assert!(parse_hotkey("t+y").is_err()); // two keys
        assert!(parse_hotkey("ctrl+definitely_not_a_key").is_err());
    }
}
