//! Child addressing for the XML tree
//!
//! A path is a slice of [`Index`] values, one per tree level. Each step
//! addresses a child either from the start or from the end of the child
//! list, so "append" and "last child" need no sign tricks.

/// One step of a tree path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// Zero-based position from the start
    At(usize),
    /// One-based position from the end.
    ///
    /// When reading, `FromEnd(1)` is the last child. When inserting,
    /// `FromEnd(1)` is the position after the last child (append).
    FromEnd(usize),
}

impl Index {
    /// The last child when reading, the end of the list when inserting
    pub const LAST: Index = Index::FromEnd(1);

    /// Resolve to a concrete position for reading from a list of `len` items
    pub fn resolve_access(self, len: usize) -> Option<usize> {
        match self {
            Index::At(i) if i < len => Some(i),
            Index::FromEnd(n) if n >= 1 && n <= len => Some(len - n),
            _ => None,
        }
    }

    /// Resolve to an insertion position in a list of `len` items
    pub fn resolve_insert(self, len: usize) -> Option<usize> {
        match self {
            Index::At(i) if i <= len => Some(i),
            Index::FromEnd(n) if n >= 1 && n <= len + 1 => Some(len + 1 - n),
            _ => None,
        }
    }
}

impl From<usize> for Index {
    fn from(i: usize) -> Self {
        Index::At(i)
    }
}

/// Render a path for error messages
pub(crate) fn describe(path: &[Index]) -> String {
    let steps: Vec<String> = path
        .iter()
        .map(|step| match step {
            Index::At(i) => i.to_string(),
            Index::FromEnd(n) => format!("-{}", n),
        })
        .collect();
    format!("[{}]", steps.join(", "))
}
