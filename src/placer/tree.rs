//! Hierarchy tree construction.
//!
//! Components are inserted one at a time by walking (and creating) groups
//! along their parsed path. Groups reached through the same path prefix are
//! the same node, which is what clusters siblings together.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::{debug, warn};

use super::component::Component;
use super::error::PlaceError;
use super::path::HierPath;

/// A node of the hierarchy tree.
#[derive(Debug, Clone, PartialEq)]
pub enum HierNode {
    Group(Group),
    Leaf(Leaf),
}

/// A hierarchical group of components and subgroups.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Display name. Collapsed pass-through levels are joined with `/`.
    pub name: String,
    /// Full path from the root to this group.
    pub path: HierPath,
    /// Subgroups by name, then leaves in natural reference order.
    pub children: Vec<HierNode>,
}

/// A single component.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Index into the component slice the tree was built from.
    pub index: usize,
    pub reference: String,
}

impl Group {
    /// Number of leaves below this group.
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                HierNode::Group(g) => g.leaf_count(),
                HierNode::Leaf(_) => 1,
            })
            .sum()
    }

    /// Number of groups below this group, not counting itself.
    pub fn group_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                HierNode::Group(g) => 1 + g.group_count(),
                HierNode::Leaf(_) => 0,
            })
            .sum()
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.name, indent = depth * 2)?;
        for child in &self.children {
            match child {
                HierNode::Group(g) => g.write_outline(f, depth + 1)?,
                HierNode::Leaf(l) => {
                    writeln!(f, "{:indent$}{}", "", l.reference, indent = (depth + 1) * 2)?
                }
            }
        }
        Ok(())
    }
}

/// The hierarchy tree for one placement run.
#[derive(Debug, Clone, PartialEq)]
pub struct HierTree {
    /// Synthetic root group; its path is empty.
    pub root: Group,
    /// References whose path was malformed and were attached to the root.
    pub fallbacks: Vec<String>,
}

impl HierTree {
    /// Build the tree over the components selected by `scope` (indices into
    /// `components`).
    pub fn build(
        components: &[Component],
        scope: &[usize],
        separator: char,
    ) -> Result<Self, PlaceError> {
        let mut seen = HashSet::new();
        let mut root = GroupBuilder::default();
        let mut fallbacks = Vec::new();

        for &index in scope {
            let component = &components[index];
            if !seen.insert(component.reference.as_str()) {
                return Err(PlaceError::DuplicateReference(component.reference.clone()));
            }

            let (path, fallback) = HierPath::parse_or_root(&component.path, separator);
            if fallback {
                warn!(
                    reference = component.reference.as_str(),
                    path = component.path.as_str();
                    "Malformed hierarchy path, placing component at the top level"
                );
                fallbacks.push(component.reference.clone());
            }

            root.insert(
                path.segments(),
                Leaf {
                    index,
                    reference: component.reference.clone(),
                },
            );
        }

        fallbacks.sort_by(|a, b| natural_cmp(a, b));

        let root = root.finish(String::from("/"), HierPath::root());
        debug!(
            leaves = root.leaf_count(),
            groups = root.group_count();
            "Built hierarchy tree"
        );

        Ok(Self { root, fallbacks })
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

impl fmt::Display for HierTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_outline(f, 0)
    }
}

/// Mutable group used while inserting; turned into a [`Group`] once complete.
#[derive(Default)]
struct GroupBuilder {
    groups: BTreeMap<String, GroupBuilder>,
    leaves: Vec<Leaf>,
}

impl GroupBuilder {
    fn insert(&mut self, segments: &[String], leaf: Leaf) {
        match segments.split_first() {
            None => self.leaves.push(leaf),
            Some((head, rest)) => self
                .groups
                .entry(head.clone())
                .or_default()
                .insert(rest, leaf),
        }
    }

    fn finish(self, name: String, path: HierPath) -> Group {
        let mut children = Vec::with_capacity(self.groups.len() + self.leaves.len());

        for (child_name, builder) in self.groups {
            children.push(HierNode::Group(builder.finish_child(child_name, &path)));
        }

        let mut leaves = self.leaves;
        leaves.sort_by(|a, b| natural_cmp(&a.reference, &b.reference));
        children.extend(leaves.into_iter().map(HierNode::Leaf));

        Group {
            name,
            path,
            children,
        }
    }

    /// Finish a non-root group, folding levels that only hold one subgroup.
    fn finish_child(mut self, mut name: String, parent: &HierPath) -> Group {
        let mut path = parent.child(&name);

        while self.leaves.is_empty() && self.groups.len() == 1 {
            let Some((child_name, child)) = self.groups.pop_first() else {
                break;
            };
            name = format!("{}/{}", name, child_name);
            path = path.child(&child_name);
            self = child;
        }

        self.finish(name, path)
    }
}

/// Natural ordering for reference designators: `R2` sorts before `R10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a_prefix, a_num) = split_alphanum(a);
    let (b_prefix, b_num) = split_alphanum(b);

    a_prefix
        .cmp(b_prefix)
        .then(a_num.cmp(&b_num))
        .then_with(|| a.cmp(b))
}

/// Split into the leading non-digit prefix and the number that follows it.
fn split_alphanum(s: &str) -> (&str, u64) {
    let idx = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let digits: String = s[idx..].chars().take_while(char::is_ascii_digit).collect();
    (&s[..idx], digits.parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placer::component::{Point, Rect, Size};

    fn part(reference: &str, path: &str) -> Component {
        Component::new(reference, Point::default(), Rect::centered(Size::new(1.0, 1.0)))
            .with_path(path)
    }

    fn all(components: &[Component]) -> Vec<usize> {
        (0..components.len()).collect()
    }

    fn sample() -> Vec<Component> {
        vec![
            part("U1", "/Top/Mem/U1"),
            part("C10", "/Top/Mem/C10"),
            part("C2", "/Top/Mem/C2"),
            part("U2", "/Top/Power/U2"),
            part("C5", "/Top/Power/C5"),
            part("J1", "/J1"),
        ]
    }

    #[test]
    fn test_groups_share_prefix() {
        let components = sample();
        let tree = HierTree::build(&components, &all(&components), '/').unwrap();

        assert_eq!(tree.root.leaf_count(), 6);
        // root -> Top -> {Mem, Power}
        assert_eq!(tree.root.group_count(), 3);

        let expected = "\
/
  Top
    Mem
      C2
      C10
      U1
    Power
      C5
      U2
  J1
";
        assert_eq!(tree.to_string(), expected);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let components = sample();
        let forward = HierTree::build(&components, &all(&components), '/').unwrap();

        let mut reversed = components.clone();
        reversed.reverse();
        let backward = HierTree::build(&reversed, &all(&reversed), '/').unwrap();

        let mut rotated = components.clone();
        rotated.rotate_left(2);
        let shifted = HierTree::build(&rotated, &all(&rotated), '/').unwrap();

        assert_eq!(forward.to_string(), backward.to_string());
        assert_eq!(forward.to_string(), shifted.to_string());
    }

    #[test]
    fn test_pass_through_levels_collapse() {
        let components = vec![
            part("R1", "/Board/Sheet/Filter/R1"),
            part("R2", "/Board/Sheet/Filter/R2"),
            part("R3", "/Board/Sheet/Amp/R3"),
        ];
        let tree = HierTree::build(&components, &all(&components), '/').unwrap();

        let HierNode::Group(g) = &tree.root.children[0] else {
            panic!("expected a group");
        };
        assert_eq!(g.name, "Board/Sheet");
        assert_eq!(g.path.to_string(), "/Board/Sheet");
        assert_eq!(g.children.len(), 2);
    }

    #[test]
    fn test_malformed_path_falls_back_to_root() {
        let components = vec![part("R1", ""), part("R2", "/A//R2"), part("R3", "/A/R3")];
        let tree = HierTree::build(&components, &all(&components), '/').unwrap();

        assert_eq!(tree.fallbacks, vec!["R1".to_string(), "R2".to_string()]);
        assert_eq!(tree.root.children.len(), 3);
    }

    #[test]
    fn test_duplicate_reference_is_an_error() {
        let components = vec![part("R1", "/A/R1"), part("R1", "/B/R1")];
        let err = HierTree::build(&components, &all(&components), '/').unwrap_err();
        assert_eq!(err, PlaceError::DuplicateReference("R1".to_string()));
    }

    #[test]
    fn test_scope_limits_leaves() {
        let components = sample();
        let tree = HierTree::build(&components, &[0, 3], '/').unwrap();
        assert_eq!(tree.root.leaf_count(), 2);
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("R2", "R10"), Ordering::Less);
        assert_eq!(natural_cmp("C1", "R1"), Ordering::Less);
        assert_eq!(natural_cmp("R1", "R1A"), Ordering::Less);
        assert_eq!(natural_cmp("U3", "U3"), Ordering::Equal);
    }
}
