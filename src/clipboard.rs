// File: src/clipboard.rs
use anyhow::{Context, Result};

/// Puts `text` on the system clipboard.
pub fn copy(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
    clipboard
        .set_text(text.to_string())
        .context("could not write to clipboard")?;
    tracing::debug!(len = text.len(), "copied to clipboard");
    Ok(())
}
