use std::fmt;

use approx::relative_eq;

use crate::tree::NodeIdx::{self, Internal as Int, Leaf};

/// One node of the arena. `blen` is the length of the branch leading to the parent.
#[derive(Clone)]
pub struct Node {
    pub idx: NodeIdx,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    pub blen: f64,
    pub id: String,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id.as_str() {
            "" => write!(f, "{}", self.idx),
            id => write!(f, "{} ({})", self.idx, id),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blen {} parent {:?} children {:?}",
            self, self.blen, self.parent, self.children
        )
    }
}

/// Same position, links and label, branch lengths equal up to float tolerance.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
            && self.parent == other.parent
            && self.children == other.children
            && self.id == other.id
            && relative_eq!(self.blen, other.blen)
    }
}

impl Node {
    pub(crate) fn new_leaf(idx: usize, parent: Option<NodeIdx>, blen: f64, id: String) -> Self {
        Self {
            idx: Leaf(idx),
            parent,
            children: Vec::new(),
            blen,
            id,
        }
    }

    pub(crate) fn new_internal(
        idx: usize,
        parent: Option<NodeIdx>,
        children: Vec<NodeIdx>,
        blen: f64,
        id: String,
    ) -> Self {
        Self {
            idx: Int(idx),
            parent,
            children,
            blen,
            id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.idx, Leaf(_))
    }
}
