//! Clipboard backup, overwrite and deferred restore.
//!
//! Paste-based substitution owns the system clipboard for a short window: it
//! backs up the current content, writes the replacement, synthesizes the
//! paste chord and schedules a restore. The restore is deliberately delayed
//! rather than immediate, because target applications handle the paste
//! asynchronously and restoring too early hands them the old clipboard
//! content instead of the replacement.

use crate::error::{Result, TswError};
use std::time::Duration;
use tracing::{debug, warn};

/// Port for the clipboard operations a substitution needs.
pub trait ClipboardBridge {
    /// Capture the current clipboard content so a later [`restore_after`]
    /// can bring it back.
    ///
    /// [`restore_after`]: Self::restore_after
    fn backup(&mut self) -> Result<()>;

    /// Restore the most recent backup after `delay` has elapsed. Returns
    /// immediately; the restore itself happens on a deferred task.
    fn restore_after(&mut self, delay: Duration);

    /// Replace the clipboard content with plain text.
    fn set_text(&mut self, text: &str) -> Result<()>;

    /// Replace the clipboard content with HTML markup.
    fn set_html(&mut self, html: &str) -> Result<()>;
}

/// Clipboard bridge backed by the system clipboard via `arboard`.
///
/// Only plain-text content survives a backup/restore cycle: formats arboard
/// cannot read back (images, application-private formats) are cleared on
/// restore instead of recreated. [`ClipboardBridge::restore_after`] spawns
/// its deferred task on the ambient Tokio runtime, so it must be called from
/// within one.
#[derive(Debug, Default)]
pub struct SystemClipboard {
    backup: Option<String>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn open() -> Result<arboard::Clipboard> {
        arboard::Clipboard::new().map_err(|err| TswError::clipboard(err.to_string()))
    }
}

impl ClipboardBridge for SystemClipboard {
    fn backup(&mut self) -> Result<()> {
        let mut clipboard = Self::open()?;
        self.backup = clipboard.get_text().ok();
        debug!(
            preserved_text = self.backup.is_some(),
            "clipboard backed up"
        );
        Ok(())
    }

    fn restore_after(&mut self, delay: Duration) {
        let backup = self.backup.take();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = arboard::Clipboard::new().and_then(|mut clipboard| match &backup {
                Some(text) => clipboard.set_text(text),
                None => clipboard.clear(),
            });
            match result {
                Ok(()) => debug!("clipboard restored"),
                Err(err) => warn!("failed to restore clipboard: {err}"),
            }
        });
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        Self::open()?
            .set_text(text)
            .map_err(|err| TswError::clipboard(err.to_string()))
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        Self::open()?
            .set_html(html, None::<&str>)
            .map_err(|err| TswError::clipboard(err.to_string()))
    }
}
