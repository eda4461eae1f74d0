//! The substitution orchestrator.
//!
//! One call to [`SubstitutionEngine::perform_substitution`] runs the whole
//! output stage: suspend the keyboard hook, erase the typed trigger text,
//! deliver the replacement through the clipboard or by typing it, repark the
//! caret, restore the hook. The engine assumes a single logical caller:
//! overlapping calls are not queued or rejected, and a second paste-based
//! substitution inside the clipboard restore window would back up the
//! previous substitution's content. Callers serialize requests.

use crate::clipboard::{ClipboardBridge, SystemClipboard};
use crate::config::Config;
use crate::error::Result;
use crate::foreground::{ForegroundApp, ProcessNameList, SensitivityPolicy, SystemForeground};
use crate::grapheme::printable_character_count;
use crate::hook::{HookControl, HookSuspension};
use crate::keyboard::{with_modifiers_released, Key, Keyboard, SystemKeyboard};
use crate::snippet::Replacement;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One substitution: erase the typed trigger and deliver the replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRequest {
    /// Number of already-typed characters to erase before injecting the
    /// replacement. Negative values erase nothing.
    pub chars_to_erase: i32,

    /// Replacement content.
    pub replacement: Replacement,

    /// Requested caret position inside the replacement, counted in printable
    /// characters from its start. `None` leaves the caret where the
    /// injection put it.
    pub cursor_offset: Option<usize>,
}

/// Timing knobs the engine consumes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    /// Pause between keystrokes when typing character by character.
    pub key_delay: Duration,
    /// Delay before the clipboard backup is restored after a paste.
    pub clipboard_restore_delay: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            key_delay: Duration::ZERO,
            clipboard_restore_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&Config> for EngineTiming {
    fn from(config: &Config) -> Self {
        Self {
            key_delay: config.key_delay,
            clipboard_restore_delay: config.clipboard_restore_delay,
        }
    }
}

/// The substitution state machine and the capabilities it drives.
pub struct SubstitutionEngine {
    keyboard: Box<dyn Keyboard>,
    clipboard: Box<dyn ClipboardBridge>,
    foreground: Box<dyn ForegroundApp>,
    policy: Box<dyn SensitivityPolicy>,
    hook: Arc<dyn HookControl>,
    timing: EngineTiming,
}

impl SubstitutionEngine {
    pub fn new(
        keyboard: Box<dyn Keyboard>,
        clipboard: Box<dyn ClipboardBridge>,
        foreground: Box<dyn ForegroundApp>,
        policy: Box<dyn SensitivityPolicy>,
        hook: Arc<dyn HookControl>,
        timing: EngineTiming,
    ) -> Self {
        Self {
            keyboard,
            clipboard,
            foreground,
            policy,
            hook,
            timing,
        }
    }

    /// Engine wired to the operating system, with the sensitivity list and
    /// timing taken from configuration.
    pub fn with_system_ports(config: &Config, hook: Arc<dyn HookControl>) -> Self {
        Self::new(
            Box::new(SystemKeyboard::new()),
            Box::new(SystemClipboard::new()),
            Box::new(SystemForeground::new()),
            Box::new(ProcessNameList::new(config.sensitive_processes.clone())),
            hook,
            EngineTiming::from(config),
        )
    }

    /// Erase the typed trigger and inject the replacement into the
    /// application owning the focused window.
    ///
    /// The keyboard hook's enabled state after this call always equals its
    /// state before the call, whether or not an error is returned. Errors in
    /// input synthesis or clipboard access propagate to the caller; an
    /// unresolvable foreground executable does not, it degrades to "not
    /// sensitive".
    pub fn perform_substitution(&mut self, request: &SubstitutionRequest) -> Result<()> {
        // the hook must not see the keystrokes synthesized below, or the
        // substitution would feed its own trigger detection
        let _suspension = HookSuspension::engage(Arc::clone(&self.hook));
        self.run(request)
    }

    fn run(&mut self, request: &SubstitutionRequest) -> Result<()> {
        let erase_count = request.chars_to_erase.max(0) as u32;
        debug!(
            erase_count,
            rich = request.replacement.is_html(),
            cursor_offset = ?request.cursor_offset,
            "performing substitution"
        );
        self.keyboard.backspaces(erase_count)?;

        let executable = self
            .foreground
            .active_executable_name()
            .unwrap_or_default();
        if self.policy.is_sensitive(&executable) {
            info!(
                executable = executable.as_str(),
                "sensitive application, typing replacement"
            );
            self.type_replacement(&request.replacement)?;
        } else {
            self.paste_replacement(&request.replacement)?;
        }

        if let Some(offset) = request.cursor_offset {
            self.reposition_cursor(&request.replacement, offset)?;
        }
        Ok(())
    }

    /// Deliver the replacement through the clipboard and a Ctrl+V chord.
    fn paste_replacement(&mut self, replacement: &Replacement) -> Result<()> {
        self.clipboard.backup()?;
        match replacement {
            Replacement::Plain(text) => self.clipboard.set_text(text)?,
            Replacement::Html(markup) => self.clipboard.set_html(markup)?,
        }

        // user-held modifiers would combine with the chord
        with_modifiers_released(self.keyboard.as_mut(), |keyboard| {
            keyboard.key_down(Key::ControlLeft)?;
            keyboard.tap(Key::V)?;
            keyboard.key_up(Key::ControlLeft)
        })?;

        // restoring immediately races the target's asynchronous paste
        // handling, which would then read the restored content
        self.clipboard
            .restore_after(self.timing.clipboard_restore_delay);
        Ok(())
    }

    /// Type the replacement character by character, degraded to plain text.
    fn type_replacement(&mut self, replacement: &Replacement) -> Result<()> {
        let text = replacement.typed_text();
        for ch in text.chars() {
            with_modifiers_released(self.keyboard.as_mut(), |keyboard| {
                if ch == '\n' {
                    // Unicode key events do not deliver line feeds reliably
                    keyboard.tap(Key::Return)
                } else {
                    keyboard.tap_unicode(ch)
                }
            })?;
            self.wait_between_keystrokes();
        }
        Ok(())
    }

    /// Walk the caret left to the requested offset, counted in printable
    /// characters of the rendered replacement.
    fn reposition_cursor(&mut self, replacement: &Replacement, offset: usize) -> Result<()> {
        let rendered = replacement.rendered_text();
        let presses = printable_character_count(&rendered).saturating_sub(offset);
        debug!(presses, "repositioning cursor");

        // one capture/restore pair brackets the whole arrow run
        with_modifiers_released(self.keyboard.as_mut(), |keyboard| {
            for _ in 0..presses {
                keyboard.tap(Key::LeftArrow)?;
            }
            Ok(())
        })
    }

    fn wait_between_keystrokes(&self) {
        if !self.timing.key_delay.is_zero() {
            std::thread::sleep(self.timing.key_delay);
        }
    }
}
