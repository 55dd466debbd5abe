//! Selection and lock filtering.

use log::debug;
use serde::Serialize;

use super::component::Component;

/// Which components a run may move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Selected components if anything is selected, else the whole board.
    #[default]
    Auto,
    /// Every component on the board, ignoring selection.
    Board,
    /// Only selected components. An empty selection moves nothing.
    Selection,
}

/// The working set of one run, as indices into the component list.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// `Board` or `Selection`; `Auto` is resolved away.
    pub mode: ScopeMode,
    /// Components that go into the hierarchy tree, locked ones included.
    pub members: Vec<usize>,
    /// Unlocked members; the only components whose position may change.
    pub movable: Vec<usize>,
    /// Components that stay put: locked members and everything out of scope.
    pub fixed: Vec<usize>,
}

impl Scope {
    pub fn resolve(components: &[Component], mode: ScopeMode) -> Self {
        let mode = match mode {
            ScopeMode::Auto if components.iter().any(|c| c.selected) => ScopeMode::Selection,
            ScopeMode::Auto => ScopeMode::Board,
            other => other,
        };

        let mut members = Vec::new();
        let mut movable = Vec::new();
        let mut fixed = Vec::new();

        for (index, component) in components.iter().enumerate() {
            let in_scope = match mode {
                ScopeMode::Selection => component.selected,
                _ => true,
            };

            if in_scope {
                members.push(index);
            }
            if in_scope && !component.locked {
                movable.push(index);
            } else {
                fixed.push(index);
            }
        }

        debug!(
            mode:? = mode,
            members = members.len(),
            movable = movable.len(),
            fixed = fixed.len();
            "Resolved placement scope"
        );

        Self {
            mode,
            members,
            movable,
            fixed,
        }
    }

    /// True when the run cannot move anything.
    pub fn is_noop(&self) -> bool {
        self.movable.is_empty()
    }
}
