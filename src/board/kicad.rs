//! KiCad `.kicad_pcb` board sessions.
//!
//! Footprints are read from the top-level `(footprint ...)` blocks (or
//! `(module ...)` in older files). Write-back patches only the x/y numbers of
//! each moved footprint's own `(at x y [rot])`, leaving the rest of the file
//! byte-for-byte intact.

use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, warn};

use super::sexpr::{self, Sexp};
use super::{disambiguate, write_atomic, BoardSession};
use crate::placer::{Component, Placement, Point, Rect, Size};

/// Layers whose outlines describe the space a footprint needs.
const COURTYARD_LAYERS: [&str; 2] = ["F.CrtYd", "B.CrtYd"];

/// A `.kicad_pcb` file opened for placement.
pub struct KicadBoard {
    path: PathBuf,
    content: String,
    components: Vec<Component>,
    anchors: Vec<AnchorSpans>,
}

/// Where a footprint's x and y live in the file text.
struct AnchorSpans {
    reference: String,
    x: Range<usize>,
    y: Range<usize>,
}

impl KicadBoard {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read board file: {}", path.display()))?;
        Self::parse(path.to_path_buf(), content)
            .with_context(|| format!("Failed to parse board file: {}", path.display()))
    }

    /// Parse board text; `path` is where `apply` will write.
    pub fn parse(path: PathBuf, content: String) -> Result<Self> {
        let root = sexpr::parse(&content)?;
        if root.head() != Some("kicad_pcb") {
            bail!("Not a KiCad board: top-level expression is not (kicad_pcb ...)");
        }

        let mut components = Vec::new();
        let mut anchors = Vec::new();
        let mut seen = HashSet::new();

        let footprints = root
            .items()
            .iter()
            .filter(|item| matches!(item.head(), Some("footprint") | Some("module")));

        for (index, fp) in footprints.enumerate() {
            let Some((mut component, spans)) = read_footprint(fp) else {
                warn!(index; "Footprint without a usable (at x y), skipping");
                continue;
            };

            disambiguate(&mut component, index, &mut seen);

            anchors.push(AnchorSpans {
                reference: component.reference.clone(),
                ..spans
            });
            components.push(component);
        }

        debug!(footprints = components.len(); "Read KiCad board");

        Ok(Self {
            path,
            content,
            components,
            anchors,
        })
    }

    /// Board text with the placement applied.
    pub fn render(&self, placement: &Placement) -> String {
        let positions = placement.positions();

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        for anchor in &self.anchors {
            if let Some(to) = positions.get(anchor.reference.as_str()) {
                edits.push((anchor.x.clone(), sexpr::format_number(to.x)));
                edits.push((anchor.y.clone(), sexpr::format_number(to.y)));
            }
        }

        // Back to front so earlier spans stay valid.
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut text = self.content.clone();
        for (span, value) in edits {
            text.replace_range(span, &value);
        }
        text
    }
}

impl BoardSession for KicadBoard {
    fn path(&self) -> &Path {
        &self.path
    }

    fn components(&self) -> &[Component] {
        &self.components
    }

    fn apply(&mut self, placement: &Placement) -> Result<()> {
        let text = self.render(placement);
        write_atomic(&self.path, &text)?;
        *self = Self::parse(self.path.clone(), text)?;
        Ok(())
    }
}

fn read_footprint(fp: &Sexp) -> Option<(Component, AnchorSpans)> {
    let at = fp.child("at")?;
    let x = at.number(1)?;
    let y = at.number(2)?;
    let rotation = at.number(3).unwrap_or(0.0);

    let reference = fp
        .children("property")
        .find(|p| p.atom(1) == Some("Reference"))
        .and_then(|p| p.atom(2))
        .or_else(|| {
            fp.children("fp_text")
                .find(|t| t.atom(1) == Some("reference"))
                .and_then(|t| t.atom(2))
        })
        .unwrap_or_default()
        .to_string();

    let path = fp
        .child("path")
        .and_then(|p| p.atom(1))
        .unwrap_or_default()
        .to_string();

    let locked = fp.has_atom("locked")
        || fp.child("locked").and_then(|l| l.atom(1)) == Some("yes");

    let local = courtyard_bounds(fp)
        .or_else(|| pad_bounds(fp, rotation))
        .or_else(|| graphic_bounds(fp, None))
        .unwrap_or_default();

    let component = Component::new(reference.clone(), Point::new(x, y), local.rotated(rotation))
        .with_path(path)
        .locked(locked);

    let spans = AnchorSpans {
        reference,
        x: at.items()[1].span(),
        y: at.items()[2].span(),
    };

    Some((component, spans))
}

fn courtyard_bounds(fp: &Sexp) -> Option<Rect> {
    COURTYARD_LAYERS
        .into_iter()
        .filter_map(|layer| graphic_bounds(fp, Some(layer)))
        .reduce(|a, b| a.union(&b))
}

/// Bounds of the footprint's graphic items, optionally limited to one layer.
fn graphic_bounds(fp: &Sexp, layer: Option<&str>) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    let mut add = |r: Rect| bounds = Some(bounds.map_or(r, |b| b.union(&r)));

    for item in fp.items() {
        let Some(kind) = item.head() else { continue };
        if !matches!(kind, "fp_line" | "fp_rect" | "fp_circle" | "fp_arc" | "fp_poly") {
            continue;
        }
        if let Some(layer) = layer {
            if item.child("layer").and_then(|l| l.atom(1)) != Some(layer) {
                continue;
            }
        }

        let point = |head: &str| {
            let p = item.child(head)?;
            Some(Point::new(p.number(1)?, p.number(2)?))
        };

        match kind {
            "fp_circle" => {
                if let (Some(c), Some(e)) = (point("center"), point("end")) {
                    let r = ((e.x - c.x).powi(2) + (e.y - c.y).powi(2)).sqrt();
                    add(Rect::new(Point::new(c.x - r, c.y - r), Point::new(c.x + r, c.y + r)));
                }
            }
            "fp_poly" => {
                if let Some(pts) = item.child("pts") {
                    for xy in pts.children("xy") {
                        if let (Some(x), Some(y)) = (xy.number(1), xy.number(2)) {
                            add(Rect::new(Point::new(x, y), Point::new(x, y)));
                        }
                    }
                }
            }
            _ => {
                for head in ["start", "mid", "end"] {
                    if let Some(p) = point(head) {
                        add(Rect::new(p, p));
                    }
                }
            }
        }
    }

    bounds.filter(|b| b.size().is_valid())
}

/// Bounds of all pads in footprint-local coordinates.
fn pad_bounds(fp: &Sexp, fp_rotation: f64) -> Option<Rect> {
    fp.children("pad")
        .filter_map(|pad| {
            let at = pad.child("at")?;
            let size = pad.child("size")?;
            let center = Point::new(at.number(1)?, at.number(2)?);
            // Pad angles in the file include the footprint's own rotation.
            let local_rotation = at.number(3).unwrap_or(0.0) - fp_rotation;
            let size = Size::new(size.number(1)?, size.number(2)?);
            Some(Rect::centered(size).rotated(local_rotation).translate(center))
        })
        .reduce(|a, b| a.union(&b))
}
