//! Hierarchy path parsing.
//!
//! A component's path looks like `/Top/Mem/U3` (KiCad sheet paths) or
//! `Top.Mem.U3` (dotted instance paths). The last segment names the component
//! itself; everything before it is the chain of groups that contain it.

use std::fmt;

/// Default separator between path segments.
pub const DEFAULT_SEPARATOR: char = '/';

/// Group names from the root down to a component's immediate parent.
///
/// An empty path means the component sits directly in the root group.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HierPath(Vec<String>);

impl HierPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a raw path, returning `None` when it is malformed.
    ///
    /// Leading and trailing separators are ignored. A path is malformed when
    /// it is blank, has an empty interior segment, or contains control
    /// characters.
    pub fn parse(raw: &str, separator: char) -> Option<Self> {
        let trimmed = raw.trim().trim_matches(separator);
        if trimmed.is_empty() {
            return None;
        }

        let mut segments = Vec::new();
        for segment in trimmed.split(separator) {
            let segment = segment.trim();
            if segment.is_empty() || segment.chars().any(char::is_control) {
                return None;
            }
            segments.push(segment.to_string());
        }

        // Drop the component's own identifier.
        segments.pop();
        Some(Self(segments))
    }

    /// Parse a raw path, falling back to the root group when it is malformed.
    pub fn parse_or_root(raw: &str, separator: char) -> (Self, bool) {
        match Self::parse(raw, separator) {
            Some(path) => (path, false),
            None => (Self::root(), true),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// This path extended by one group name.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }
}

impl fmt::Display for HierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
