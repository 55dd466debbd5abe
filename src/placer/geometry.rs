//! Bottom-up size estimation.
//!
//! Every leaf is sized from its footprint plus the component margin. Every
//! group is sized by packing its children, and the resulting layout is kept
//! on the group so the placer lays children out exactly as they were sized.

use std::fmt;

use log::debug;

use super::component::{Component, Point, Size};
use super::error::PlaceError;
use super::pack::pack;
use super::path::HierPath;
use super::tree::{Group, HierNode, HierTree, Leaf};

/// Clearances added around components and groups, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    /// Margin on every side of each footprint.
    pub component: f64,
    /// Padding on every side of each group.
    pub group: f64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            component: 0.35,
            group: 1.75,
        }
    }
}

/// A tree node annotated with the size it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedNode {
    pub size: Size,
    pub kind: SizedKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SizedKind {
    Group {
        name: String,
        path: HierPath,
        /// Children with their offset from the group's top-left corner.
        slots: Vec<Slot>,
    },
    Leaf {
        index: usize,
        reference: String,
    },
}

/// A child positioned inside its parent group.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub offset: Point,
    pub node: SizedNode,
}

/// Size every node of `tree`, failing on unusable component geometry.
pub fn estimate(
    tree: &HierTree,
    components: &[Component],
    spacing: Spacing,
) -> Result<SizedNode, PlaceError> {
    let root = estimate_group(&tree.root, components, spacing)?;
    debug!(
        width = root.size.width,
        height = root.size.height;
        "Estimated placement area"
    );
    Ok(root)
}

fn estimate_node(
    node: &HierNode,
    components: &[Component],
    spacing: Spacing,
) -> Result<SizedNode, PlaceError> {
    match node {
        HierNode::Group(group) => estimate_group(group, components, spacing),
        HierNode::Leaf(leaf) => estimate_leaf(leaf, components, spacing),
    }
}

fn estimate_group(
    group: &Group,
    components: &[Component],
    spacing: Spacing,
) -> Result<SizedNode, PlaceError> {
    let children = group
        .children
        .iter()
        .map(|child| estimate_node(child, components, spacing))
        .collect::<Result<Vec<_>, _>>()?;

    let sizes: Vec<Size> = children.iter().map(|c| c.size).collect();
    let packing = pack(&sizes);
    let padding = Point::new(spacing.group, spacing.group);

    let slots = children
        .into_iter()
        .zip(packing.offsets)
        .map(|(node, offset)| Slot {
            offset: offset + padding,
            node,
        })
        .collect();

    Ok(SizedNode {
        size: packing.size.inflate(spacing.group),
        kind: SizedKind::Group {
            name: group.name.clone(),
            path: group.path.clone(),
            slots,
        },
    })
}

fn estimate_leaf(
    leaf: &Leaf,
    components: &[Component],
    spacing: Spacing,
) -> Result<SizedNode, PlaceError> {
    let component = &components[leaf.index];

    let size = component.size();
    if !size.is_valid() {
        return Err(PlaceError::InvalidGeometry {
            reference: component.reference.clone(),
            width: size.width,
            height: size.height,
        });
    }
    if !component.position.is_finite() || !component.extent.min.is_finite() {
        return Err(PlaceError::InvalidPosition {
            reference: component.reference.clone(),
        });
    }

    Ok(SizedNode {
        size: size.inflate(spacing.component),
        kind: SizedKind::Leaf {
            index: leaf.index,
            reference: leaf.reference.clone(),
        },
    })
}

impl SizedNode {
    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        match &self.kind {
            SizedKind::Group { name, slots, .. } => {
                writeln!(
                    f,
                    "{:indent$}{} ({:.2} x {:.2} mm)",
                    "",
                    name,
                    self.size.width,
                    self.size.height,
                    indent = indent
                )?;
                for slot in slots {
                    slot.node.write_outline(f, depth + 1)?;
                }
                Ok(())
            }
            SizedKind::Leaf { reference, .. } => writeln!(
                f,
                "{:indent$}{} ({:.2} x {:.2} mm)",
                "",
                reference,
                self.size.width,
                self.size.height,
                indent = indent
            ),
        }
    }
}

impl fmt::Display for SizedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}
