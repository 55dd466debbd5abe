//! Top-down placement.
//!
//! The sized tree is laid out starting from a single anchor for the root
//! group. Each group hands its children the offsets chosen while it was
//! sized; leaves turn their slot into a new component position.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::component::{Component, Point, Rect, Size};
use super::geometry::{SizedKind, SizedNode, Spacing};
use super::tree::natural_cmp;

/// A component's move from its current to its new position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Move {
    pub reference: String,
    /// Display name of the group the component was placed in.
    pub group: String,
    pub from: Point,
    pub to: Point,
}

/// New positions for the components a run moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Placement {
    pub moves: Vec<Move>,
}

impl Placement {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// New position of `reference`, if it was moved.
    pub fn get(&self, reference: &str) -> Option<Point> {
        self.moves
            .iter()
            .find(|m| m.reference == reference)
            .map(|m| m.to)
    }

    /// New positions keyed by reference.
    pub fn positions(&self) -> BTreeMap<&str, Point> {
        self.moves
            .iter()
            .map(|m| (m.reference.as_str(), m.to))
            .collect()
    }

    /// Write the new positions into `components`, returning how many changed.
    pub fn apply(&self, components: &mut [Component]) -> usize {
        let positions = self.positions();
        let mut applied = 0;
        for component in components.iter_mut() {
            if let Some(to) = positions.get(component.reference.as_str()) {
                component.position = *to;
                applied += 1;
            }
        }
        applied
    }

    fn sort(&mut self) {
        self.moves.sort_by(|a, b| natural_cmp(&a.reference, &b.reference));
    }
}

/// Lay out the sized tree with its top-left corner at `anchor`.
///
/// Locked components keep their position; their slot is left empty.
pub fn place(
    root: &SizedNode,
    anchor: Point,
    components: &[Component],
    spacing: Spacing,
) -> Placement {
    let mut placement = Placement::default();
    place_node(root, anchor, "/", components, spacing, &mut placement);
    placement.sort();
    placement
}

fn place_node(
    node: &SizedNode,
    origin: Point,
    group: &str,
    components: &[Component],
    spacing: Spacing,
    placement: &mut Placement,
) {
    match &node.kind {
        SizedKind::Group { path, slots, .. } => {
            let name = path.to_string();
            for slot in slots {
                place_node(
                    &slot.node,
                    origin + slot.offset,
                    &name,
                    components,
                    spacing,
                    placement,
                );
            }
        }
        SizedKind::Leaf { index, reference } => {
            let component = &components[*index];
            if component.locked {
                debug!(reference = reference.as_str(); "Locked, keeping position");
                return;
            }

            let corner = origin + Point::new(spacing.component, spacing.component);
            placement.moves.push(Move {
                reference: reference.clone(),
                group: group.to_string(),
                from: component.position,
                to: component.position_for_corner(corner),
            });
        }
    }
}

/// Default anchor: the top-left corner of the given footprints.
pub fn default_anchor<'a>(footprints: impl IntoIterator<Item = &'a Component>) -> Point {
    footprints
        .into_iter()
        .map(Component::footprint)
        .filter(|r| r.min.is_finite() && r.max.is_finite())
        .reduce(|a, b| a.union(&b))
        .map(|r| r.min)
        .unwrap_or_default()
}

/// Move `requested` as little as possible so an `area`-sized region placed
/// there does not intersect any obstacle.
///
/// Candidates are the requested point and points flush against each
/// obstacle's edges. A point right of every obstacle always qualifies.
pub fn resolve_anchor(requested: Point, area: Size, obstacles: &[Rect]) -> Point {
    let fits = |p: &Point| {
        let region = Rect::from_origin(*p, area);
        !obstacles.iter().any(|o| region.intersects(o))
    };

    if fits(&requested) {
        return requested;
    }

    let clear_right = obstacles
        .iter()
        .map(|o| o.max.x)
        .fold(requested.x, f64::max);
    let fallback = Point::new(clear_right, requested.y);

    let mut candidates = vec![fallback];
    for o in obstacles {
        candidates.extend([
            Point::new(o.max.x, requested.y),
            Point::new(requested.x, o.max.y),
            Point::new(o.min.x - area.width, requested.y),
            Point::new(requested.x, o.min.y - area.height),
            Point::new(o.max.x, o.min.y),
            Point::new(o.min.x, o.max.y),
        ]);
    }

    let anchor = candidates
        .into_iter()
        .filter(|p| p.is_finite() && fits(p))
        .min_by(|a, b| {
            a.manhattan(requested)
                .total_cmp(&b.manhattan(requested))
                .then(a.y.total_cmp(&b.y))
                .then(a.x.total_cmp(&b.x))
        })
        .unwrap_or(fallback);

    debug!(
        requested_x = requested.x,
        requested_y = requested.y,
        x = anchor.x,
        y = anchor.y;
        "Moved anchor clear of fixed components"
    );
    anchor
}
