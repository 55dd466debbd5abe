//! Board sessions: where components come from and where new positions go.
//!
//! A session is read once when opened and written once by `apply`. Writes go
//! to a sibling temporary file that is renamed over the original, so a failed
//! run never leaves a half-written board.

mod json;
mod kicad;
mod sexpr;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;

use crate::placer::{Component, Placement};

pub use json::JsonBoard;
pub use kicad::KicadBoard;

/// The host's live board, as seen by one placement run.
pub trait BoardSession {
    /// File the session was read from and will be written to.
    fn path(&self) -> &Path;

    /// Components on the board, in file order.
    fn components(&self) -> &[Component];

    /// Write the new positions back in a single step.
    fn apply(&mut self, placement: &Placement) -> Result<()>;
}

/// Open a board session, picking the format from the file extension.
pub fn open(path: &Path) -> Result<Box<dyn BoardSession>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Box::new(JsonBoard::open(path)?)),
        Some("kicad_pcb") => Ok(Box::new(KicadBoard::open(path)?)),
        _ => bail!(
            "Unsupported board file: {} (expected .json or .kicad_pcb)",
            path.display()
        ),
    }
}

/// Replace the selection with exactly the listed references.
///
/// Returns the references that matched no component.
pub fn select(components: &mut [Component], references: &[String]) -> Vec<String> {
    for component in components.iter_mut() {
        component.selected = references.contains(&component.reference);
    }

    references
        .iter()
        .filter(|r| !components.iter().any(|c| &c.reference == *r))
        .cloned()
        .collect()
}

/// Give a blank or repeated reference a unique `REF#n` name and lock it.
///
/// `index` is the component's position in the file. Returns true if the
/// component was renamed.
pub(crate) fn disambiguate(component: &mut Component, index: usize, seen: &mut HashSet<String>) -> bool {
    let named = component.reference.clone();
    if !named.is_empty() && seen.insert(named.clone()) {
        return false;
    }

    // Still occupies space, but can't be addressed by reference.
    component.reference = format!("{}#{}", named, index + 1);
    component.locked = true;
    seen.insert(component.reference.clone());
    warn!(
        reference = named.as_str(),
        renamed = component.reference.as_str();
        "Missing or duplicate reference, keeping component in place"
    );
    true
}

/// Write `content` to `path` via a temporary sibling and a rename.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = temp_path(path);

    fs::write(&tmp, content)
        .with_context(|| format!("Failed to write temporary file: {}", tmp.display()))?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to replace board file: {}", path.display()));
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".hierplace.tmp");
    path.with_file_name(name)
}
