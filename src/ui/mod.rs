pub mod components;
pub mod login;
pub mod projects;
pub mod project_wizard;
pub mod categories;
pub mod progress;
pub mod blueprint;
pub mod category;
pub mod materials;
pub mod orders;
pub mod milestones;
pub mod defects;
pub mod contacts;
pub mod settings;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

/// How long the UI loop waits for a key before redrawing.
pub const TICK: Duration = Duration::from_millis(100);

/// Waits up to one tick for a key press so pending fetches keep landing.
pub fn next_key() -> Result<Option<KeyEvent>> {
    if event::poll(TICK)? {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Release {
                return Ok(Some(key));
            }
        }
    }
    Ok(None)
}
