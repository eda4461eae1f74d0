//! # textswap
//!
//! The output stage of a text expander: given a trigger of N already-typed
//! characters, erase them in the active application, inject the replacement
//! content and repark the caret, without disturbing the user's held modifier
//! keys, without re-triggering the detection hook that noticed the trigger,
//! and without pushing clipboard content at applications that refuse it.
//!
//! ## Features
//!
//! - Clipboard-based paste delivery for plain and HTML replacements, with
//!   clipboard backup and deferred restore
//! - Character-by-character typing fallback for sensitive applications
//!   (credential managers and similar), with rich content degraded to plain
//!   text
//! - Modifier key capture/restore bracketing every synthesized burst
//! - Unicode-aware caret repositioning that accounts for compound emoji
//! - Scoped suspension of the reentrant keyboard hook, restored on every
//!   exit path
//!
//! ## Example
//!
//! ```no_run
//! use textswap::{Config, HookState, Replacement, SubstitutionEngine, SubstitutionRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> textswap::Result<()> {
//! let config = Config::default();
//! let mut engine = SubstitutionEngine::with_system_ports(&config, HookState::new());
//!
//! // the user typed ";sig", replace it
//! engine.perform_substitution(&SubstitutionRequest {
//!     chars_to_erase: 4,
//!     replacement: Replacement::plain("Kind regards,\nAda"),
//!     cursor_offset: None,
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! The engine drives the OS through capability ports ([`keyboard::Keyboard`],
//! [`clipboard::ClipboardBridge`], [`foreground::ForegroundApp`],
//! [`hook::HookControl`]), so everything above the OS boundary is testable
//! without synthesizing real input.

pub mod clipboard;
pub mod config;
pub mod engine;
pub mod error;
pub mod foreground;
pub mod grapheme;
pub mod hook;
pub mod hotkey;
pub mod keyboard;
pub mod snippet;

pub use config::Config;
pub use engine::{EngineTiming, SubstitutionEngine, SubstitutionRequest};
pub use error::{Result, TswError};
pub use hook::HookState;
pub use hotkey::HotkeyManager;
pub use snippet::Replacement;
