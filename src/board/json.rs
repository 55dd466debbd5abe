//! JSON board snapshots.
//!
//! The host exports the board as:
//!
//! ```json
//! {
//!   "components": [
//!     { "reference": "U1", "x": 10.0, "y": 5.0, "width": 5.0, "height": 4.0,
//!       "rotation": 90, "path": "/Top/Mem/U1", "locked": false, "selected": true }
//!   ]
//! }
//! ```
//!
//! `rotation` (degrees) turns the centered `width x height` box; `offset`
//! shifts the resulting box relative to the component position. Fields this
//! tool does not know about are kept as-is on write-back.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{disambiguate, write_atomic, BoardSession};
use crate::placer::{Component, Placement, Point, Rect, Size};

/// A component entry in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JsonComponent {
    reference: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    rotation: f64,
    #[serde(default)]
    offset: Option<Point>,
    #[serde(default)]
    path: String,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    selected: bool,
}

impl From<JsonComponent> for Component {
    fn from(c: JsonComponent) -> Self {
        let extent = Rect::centered(Size::new(c.width, c.height))
            .rotated(c.rotation)
            .translate(c.offset.unwrap_or_default());

        Component::new(c.reference, Point::new(c.x, c.y), extent)
            .with_path(c.path)
            .locked(c.locked)
            .selected(c.selected)
    }
}

/// A JSON snapshot opened for placement.
pub struct JsonBoard {
    path: PathBuf,
    document: Value,
    components: Vec<Component>,
}

impl JsonBoard {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read board file: {}", path.display()))?;
        Self::parse(path.to_path_buf(), &content)
            .with_context(|| format!("Failed to parse board file: {}", path.display()))
    }

    pub fn parse(path: PathBuf, content: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(content).context("Invalid JSON")?;

        let entries = document
            .get("components")
            .and_then(Value::as_array)
            .context("Missing \"components\" array")?;

        let mut seen = HashSet::new();
        let components = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| -> Result<Component> {
                let mut component = serde_json::from_value::<JsonComponent>(entry.clone())
                    .map(Component::from)
                    .with_context(|| format!("Invalid component entry #{}", i + 1))?;
                disambiguate(&mut component, i, &mut seen);
                Ok(component)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(components = components.len(); "Read JSON board");

        Ok(Self {
            path,
            document,
            components,
        })
    }

    /// Snapshot text with the placement applied.
    pub fn render(&self, placement: &Placement) -> Result<String> {
        let positions = placement.positions();
        let mut document = self.document.clone();

        // Entries line up with `components`, whose references are unique.
        if let Some(entries) = document.get_mut("components").and_then(Value::as_array_mut) {
            for (entry, component) in entries.iter_mut().zip(&self.components) {
                if let Some(to) = positions.get(component.reference.as_str()).copied() {
                    entry["x"] = json!(to.x);
                    entry["y"] = json!(to.y);
                }
            }
        }

        let mut text = serde_json::to_string_pretty(&document).context("Failed to serialize board")?;
        text.push('\n');
        Ok(text)
    }
}

impl BoardSession for JsonBoard {
    fn path(&self) -> &Path {
        &self.path
    }

    fn components(&self) -> &[Component] {
        &self.components
    }

    fn apply(&mut self, placement: &Placement) -> Result<()> {
        let text = self.render(placement)?;
        write_atomic(&self.path, &text)?;
        *self = Self::parse(self.path.clone(), &text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placer::Move;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
  "board": "demo",
  "components": [
    { "reference": "U1", "x": 10, "y": 5, "width": 4, "height": 2, "rotation": 90,
      "path": "/Top/Mem/U1", "footprint": "SOIC-8" },
    { "reference": "C1", "x": 0, "y": 0, "width": 1, "height": 0.5,
      "offset": { "x": 0.5, "y": 0 }, "locked": true, "selected": true }
  ]
}"#;

    #[test]
    fn test_parse_snapshot() {
        let board = JsonBoard::parse(PathBuf::from("b.json"), SNAPSHOT).unwrap();
        let components = board.components();

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].reference, "U1");
        assert_eq!(components[0].size(), Size::new(2.0, 4.0));
        assert_eq!(components[0].path, "/Top/Mem/U1");
        assert!(!components[0].locked);

        assert!(components[1].locked);
        assert!(components[1].selected);
        assert_eq!(components[1].extent.min, Point::new(0.0, -0.25));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let err = JsonBoard::parse(
            PathBuf::from("b.json"),
            r#"{ "components": [ { "reference": "R1", "x": 1 } ] }"#,
        )
        .err()
        .unwrap();
        assert!(format!("{:#}", err).contains("entry #1"));

        assert!(JsonBoard::parse(PathBuf::from("b.json"), r#"{ "parts": [] }"#).is_err());
    }

    #[test]
    fn test_duplicate_reference_never_moves() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("board.json");
        fs::write(
            &path,
            r#"{ "components": [
                { "reference": "R1", "x": 0, "y": 0, "width": 1, "height": 1, "selected": true },
                { "reference": "R2", "x": 5, "y": 0, "width": 1, "height": 1, "selected": true },
                { "reference": "R1", "x": 90, "y": 90, "width": 1, "height": 1 }
            ] }"#,
        )
        .unwrap();

        let mut board = JsonBoard::open(&path).unwrap();
        assert_eq!(board.components()[2].reference, "R1#3");
        assert!(board.components()[2].locked);

        let placement = Placement {
            moves: vec![Move {
                reference: "R1".to_string(),
                group: "/".to_string(),
                from: Point::new(0.0, 0.0),
                to: Point::new(3.85, 3.85),
            }],
        };
        board.apply(&placement).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["components"][0]["x"], 3.85);
        assert_eq!(written["components"][2]["x"], 90);
        assert_eq!(written["components"][2]["y"], 90);
        assert_eq!(written["components"][2]["reference"], "R1");
    }

    #[test]
    fn test_apply_keeps_unknown_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("board.json");
        fs::write(&path, SNAPSHOT).unwrap();

        let mut board = JsonBoard::open(&path).unwrap();
        let placement = Placement {
            moves: vec![Move {
                reference: "U1".to_string(),
                group: "/Top/Mem".to_string(),
                from: Point::new(10.0, 5.0),
                to: Point::new(42.0, 7.5),
            }],
        };
        board.apply(&placement).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["board"], "demo");
        assert_eq!(written["components"][0]["x"], 42.0);
        assert_eq!(written["components"][0]["y"], 7.5);
        assert_eq!(written["components"][0]["footprint"], "SOIC-8");
        assert_eq!(written["components"][1]["x"], 0);

        assert_eq!(board.components()[0].position, Point::new(42.0, 7.5));
    }
}
