//! Hierarchical placement.
//!
//! A run goes through these stages, each in its own module:
//! 1. [`scope`] decides which components may move
//! 2. [`path`] and [`tree`] group the in-scope components by hierarchy
//! 3. [`geometry`] sizes every group bottom-up using [`pack`]
//! 4. [`place`] assigns positions top-down from a single anchor
//!
//! The whole run is computed before anything is returned, so callers either
//! get a complete [`Placement`] or an error and nothing to write.

pub mod component;
mod error;
pub mod geometry;
pub mod pack;
pub mod path;
pub mod place;
pub mod scope;
pub mod tree;

use std::collections::HashSet;

use log::{info, warn};

pub use component::{Component, Point, Rect, Size};
pub use error::PlaceError;
pub use geometry::{SizedNode, Spacing};
pub use path::{HierPath, DEFAULT_SEPARATOR};
pub use place::{Move, Placement};
pub use scope::{Scope, ScopeMode};
pub use tree::HierTree;

/// Settings for one placement run.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub mode: ScopeMode,
    pub spacing: Spacing,
    /// Separator between hierarchy path segments.
    pub separator: char,
    /// Top-left corner for the placed cluster. Defaults to the top-left of
    /// the in-scope components' current footprints.
    pub anchor: Option<Point>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: ScopeMode::Auto,
            spacing: Spacing::default(),
            separator: DEFAULT_SEPARATOR,
            anchor: None,
        }
    }
}

/// The sized hierarchy for a set of components, before placement.
#[derive(Debug, Clone)]
pub struct Plan {
    pub scope: Scope,
    pub tree: HierTree,
    pub sized: SizedNode,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub scope: Scope,
    /// References placed at the top level because their path was malformed.
    pub fallbacks: Vec<String>,
    /// Region the placed cluster occupies, if anything was placed.
    pub area: Option<Rect>,
    pub placement: Placement,
}

/// Build and size the hierarchy tree without placing anything.
pub fn plan(components: &[Component], options: &Options) -> Result<Plan, PlaceError> {
    check_references(components)?;
    let scope = Scope::resolve(components, options.mode);
    build_plan(components, scope, options)
}

fn build_plan(components: &[Component], scope: Scope, options: &Options) -> Result<Plan, PlaceError> {
    let tree = HierTree::build(components, &scope.members, options.separator)?;
    let sized = geometry::estimate(&tree, components, options.spacing)?;

    Ok(Plan { scope, tree, sized })
}

/// Compute new positions for the in-scope, unlocked components.
///
/// An empty or fully locked scope is not an error: the result simply has no
/// moves.
pub fn run(components: &[Component], options: &Options) -> Result<Outcome, PlaceError> {
    check_references(components)?;
    let scope = Scope::resolve(components, options.mode);
    if scope.is_noop() {
        info!(mode:? = scope.mode; "Nothing to place");
        return Ok(Outcome {
            scope,
            fallbacks: Vec::new(),
            area: None,
            placement: Placement::default(),
        });
    }

    let Plan { scope, tree, sized } = build_plan(components, scope, options)?;

    let obstacles = obstacles(components, &scope, options.spacing);
    let requested = options
        .anchor
        .unwrap_or_else(|| place::default_anchor(scope.members.iter().map(|&i| &components[i])));
    let anchor = place::resolve_anchor(requested, sized.size, &obstacles);

    let placement = place::place(&sized, anchor, components, options.spacing);
    info!(
        moved = placement.len(),
        fixed = scope.fixed.len(),
        fallbacks = tree.fallbacks.len();
        "Placed components"
    );

    Ok(Outcome {
        scope,
        fallbacks: tree.fallbacks,
        area: Some(Rect::from_origin(anchor, sized.size)),
        placement,
    })
}

/// Moves are keyed by reference, so references must be unique board-wide,
/// not just within the scope.
fn check_references(components: &[Component]) -> Result<(), PlaceError> {
    let mut seen = HashSet::new();
    for component in components {
        if !seen.insert(component.reference.as_str()) {
            return Err(PlaceError::DuplicateReference(component.reference.clone()));
        }
    }
    Ok(())
}

/// Footprints of the components that stay where they are, with clearance.
fn obstacles(components: &[Component], scope: &Scope, spacing: Spacing) -> Vec<Rect> {
    scope
        .fixed
        .iter()
        .map(|&i| &components[i])
        .filter_map(|c| {
            let usable = c.size().is_valid() && c.position.is_finite();
            if !usable {
                warn!(
                    reference = c.reference.as_str();
                    "Fixed component has no usable geometry, placed parts may overlap it"
                );
                return None;
            }
            Some(c.footprint().inflate(spacing.component))
        })
        .collect()
}
