use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display};

use anyhow::bail;
use log::{debug, info};

use crate::Result;

mod tree_node;
pub mod tree_parser;

pub use tree_node::Node;
use NodeIdx::{Internal as Int, Leaf};

#[derive(Debug, PartialEq, Clone, Copy, PartialOrd, Eq, Ord, Hash)]
pub enum NodeIdx {
    Internal(usize),
    Leaf(usize),
}

impl From<NodeIdx> for usize {
    fn from(node_idx: NodeIdx) -> usize {
        match node_idx {
            Int(idx) => idx,
            Leaf(idx) => idx,
        }
    }
}

impl From<&NodeIdx> for usize {
    fn from(node_idx: &NodeIdx) -> usize {
        usize::from(*node_idx)
    }
}

impl Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int(idx) => write!(f, "internal node {}", idx),
            Leaf(idx) => write!(f, "leaf node {}", idx),
        }
    }
}

pub struct TreeError {
    pub(crate) message: String,
}

impl fmt::Debug for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TreeError {}

/// Controls how [`Tree::to_newick_with`] writes a tree.
///
/// The root never gets a branch length; every other node always does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewickFormat {
    /// Write the labels of internal nodes (and of the root).
    pub internal_labels: bool,
    /// Number of decimals for branch lengths, `None` for the shortest exact representation.
    pub precision: Option<usize>,
}

impl Default for NewickFormat {
    fn default() -> Self {
        Self {
            internal_labels: true,
            precision: None,
        }
    }
}

impl NewickFormat {
    /// Leaf names and all branch lengths, no internal labels.
    pub fn lengths_only() -> Self {
        Self {
            internal_labels: false,
            precision: None,
        }
    }

    pub fn with_precision(self, precision: usize) -> Self {
        Self {
            precision: Some(precision),
            ..self
        }
    }
}

/// A rooted tree stored as an arena of nodes.
///
/// `NodeIdx` values index into `nodes`, parents are plain indices so there are no
/// ownership cycles. The traversal orders are computed once the tree is built and
/// recomputed whenever the topology changes.
#[derive(Debug, Clone)]
pub struct Tree {
    pub root: NodeIdx,
    pub(crate) nodes: Vec<Node>,
    pub preorder: Vec<NodeIdx>,
    pub postorder: Vec<NodeIdx>,
}

impl Tree {
    pub(crate) fn from_nodes(root: NodeIdx, nodes: Vec<Node>) -> Self {
        let mut tree = Self {
            root,
            nodes,
            preorder: Vec::new(),
            postorder: Vec::new(),
        };
        tree.compute_preorder();
        tree.compute_postorder();
        tree
    }

    pub(crate) fn compute_preorder(&mut self) {
        self.preorder = self.preorder_subroot(&self.root);
    }

    pub(crate) fn compute_postorder(&mut self) {
        let mut order = Vec::<NodeIdx>::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node_idx) = stack.pop() {
            order.push(node_idx);
            stack.extend(self.children(&node_idx).iter().copied());
        }
        order.reverse();
        self.postorder = order;
    }

    pub fn preorder_subroot(&self, subroot_idx: &NodeIdx) -> Vec<NodeIdx> {
        let mut order = Vec::<NodeIdx>::with_capacity(self.nodes.len());
        let mut stack = vec![*subroot_idx];
        while let Some(node_idx) = stack.pop() {
            order.push(node_idx);
            stack.extend(self.children(&node_idx).iter().rev().copied());
        }
        order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node(&self, node_idx: &NodeIdx) -> &Node {
        &self.nodes[usize::from(node_idx)]
    }

    pub fn children(&self, node_idx: &NodeIdx) -> &[NodeIdx] {
        &self.node(node_idx).children
    }

    pub fn parent(&self, node_idx: &NodeIdx) -> Option<&NodeIdx> {
        self.node(node_idx).parent.as_ref()
    }

    pub fn is_root(&self, node_idx: &NodeIdx) -> bool {
        *node_idx == self.root
    }

    /// Leaves in pre-order, which is also the order they appear in the newick string.
    pub fn leaves(&self) -> Vec<&Node> {
        self.preorder
            .iter()
            .map(|idx| self.node(idx))
            .filter(|node| node.is_leaf())
            .collect()
    }

    pub fn internals(&self) -> Vec<&Node> {
        self.preorder
            .iter()
            .map(|idx| self.node(idx))
            .filter(|node| !node.is_leaf())
            .collect()
    }

    pub fn leaf_ids(&self) -> Vec<String> {
        self.leaves().iter().map(|node| node.id.clone()).collect()
    }

    pub fn try_idx(&self, id: &str) -> Result<NodeIdx> {
        match self.nodes.iter().find(|node| node.id == id) {
            Some(node) => Ok(node.idx),
            None => bail!(TreeError {
                message: format!("No node with id {} found in the tree", id),
            }),
        }
    }

    pub fn idx(&self, id: &str) -> NodeIdx {
        self.try_idx(id).unwrap()
    }

    pub fn by_id(&self, id: &str) -> &Node {
        self.node(&self.idx(id))
    }

    pub fn blen(&self, node_idx: &NodeIdx) -> f64 {
        self.node(node_idx).blen
    }

    pub fn set_blen(&mut self, node_idx: &NodeIdx, blen: f64) {
        self.nodes[usize::from(node_idx)].blen = blen;
    }

    /// All nodes except the root in pre-order, each one standing for the branch to its parent.
    pub fn branches(&self) -> impl Iterator<Item = &NodeIdx> + '_ {
        self.preorder.iter().filter(|idx| !self.is_root(idx))
    }

    /// Lengths of all branches in pre-order, the root is skipped.
    pub fn branch_lengths(&self) -> Vec<f64> {
        self.branches().map(|idx| self.blen(idx)).collect()
    }

    pub fn mean_branch_length(&self) -> Result<f64> {
        let lengths = self.branch_lengths();
        if lengths.is_empty() {
            bail!(TreeError {
                message: String::from("Tree has no branches"),
            });
        }
        Ok(lengths.iter().sum::<f64>() / lengths.len() as f64)
    }

    /// Maps every leaf id to `prefix` followed by the position of the leaf in pre-order.
    pub fn leaf_renaming(&self, prefix: &str) -> HashMap<String, String> {
        self.leaves()
            .iter()
            .enumerate()
            .map(|(i, leaf)| (leaf.id.clone(), format!("{}{}", prefix, i)))
            .collect()
    }

    /// Renames every leaf according to `names`, fails if a leaf has no new name.
    /// Nothing is renamed unless all leaves are covered.
    pub fn rename_leaves(&mut self, names: &HashMap<String, String>) -> Result<()> {
        let leaves: Vec<NodeIdx> = self.leaves().iter().map(|node| node.idx).collect();
        if let Some(missing) = leaves
            .iter()
            .find(|idx| !names.contains_key(&self.node(idx).id))
        {
            bail!(TreeError {
                message: format!("No new name for leaf {}", self.node(missing).id),
            });
        }
        for idx in leaves {
            let new_id = names[&self.node(&idx).id].clone();
            self.nodes[usize::from(idx)].id = new_id;
        }
        Ok(())
    }

    /// Removes the root bifurcation so the root becomes a multifurcation.
    ///
    /// The first internal child of the root is dissolved and its children are attached
    /// directly to the root. The dissolved branch length is moved onto the other root child,
    /// so distances between leaves do not change: `((A:1,B:1):1,C:2);` becomes
    /// `(A:1,B:1,C:3);`. Trees whose root already has three or more children are left as is.
    pub fn unroot(&mut self) -> Result<()> {
        let root_children = self.children(&self.root).to_vec();
        if root_children.len() > 2 {
            info!("Tree is already unrooted, nothing to do.");
            return Ok(());
        }
        if root_children.len() < 2 {
            bail!(TreeError {
                message: String::from("Cannot unroot a tree with a root of degree one"),
            });
        }
        let (dissolved, kept) = match (root_children[0], root_children[1]) {
            (Int(_), other) => (root_children[0], other),
            (other, Int(_)) => (root_children[1], other),
            _ => bail!(TreeError {
                message: String::from("Cannot unroot a tree with only two leaves"),
            }),
        };
        debug!("Dissolving {} and extending {}.", dissolved, kept);

        let moved_blen = self.blen(&dissolved);
        let grandchildren = self.children(&dissolved).to_vec();
        let mut new_children = Vec::with_capacity(grandchildren.len() + 1);
        for child in root_children {
            if child == dissolved {
                new_children.extend(grandchildren.iter().copied());
            } else {
                new_children.push(child);
            }
        }
        for child in &grandchildren {
            self.nodes[usize::from(child)].parent = Some(self.root);
        }
        self.nodes[usize::from(kept)].blen += moved_blen;
        let root = self.root;
        self.nodes[usize::from(root)].children = new_children;

        *self = self.reindexed();
        Ok(())
    }

    /// Rebuilds the arena from the nodes reachable from the root, numbered in pre-order.
    fn reindexed(&self) -> Tree {
        let order = self.preorder_subroot(&self.root);
        let mut new_idx = vec![None; self.nodes.len()];
        for (i, idx) in order.iter().enumerate() {
            new_idx[usize::from(idx)] = Some(match idx {
                Int(_) => Int(i),
                Leaf(_) => Leaf(i),
            });
        }
        let remap = |idx: &NodeIdx| new_idx[usize::from(idx)].unwrap_or(*idx);
        let nodes = order
            .iter()
            .map(|idx| {
                let node = self.node(idx);
                Node {
                    idx: remap(idx),
                    parent: node.parent.as_ref().map(remap),
                    children: node.children.iter().map(remap).collect(),
                    blen: node.blen,
                    id: node.id.clone(),
                }
            })
            .collect();
        Tree::from_nodes(remap(&self.root), nodes)
    }

    /// Writes the tree with internal labels and shortest exact branch lengths.
    ///
    /// # Example
    /// ```
    /// use rate_shift::tree::tree_parser::from_newick;
    /// let tree = from_newick("((A:1.0,B:5.5)C:2.0,D:1.5)E:0.0;").unwrap().pop().unwrap();
    /// assert_eq!(tree.to_newick(), "((A:1,B:5.5)C:2,D:1.5)E;");
    /// ```
    pub fn to_newick(&self) -> String {
        self.to_newick_with(&NewickFormat::default())
    }

    pub fn to_newick_with(&self, format: &NewickFormat) -> String {
        let mut newick = String::new();
        self.write_subtree(&self.root, format, &mut newick);
        newick.push(';');
        newick
    }

    fn write_subtree(&self, node_idx: &NodeIdx, format: &NewickFormat, out: &mut String) {
        let node = self.node(node_idx);
        if !node.is_leaf() {
            out.push('(');
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                self.write_subtree(child, format, out);
            }
            out.push(')');
        }
        if node.is_leaf() || format.internal_labels {
            out.push_str(&quoted_label(&node.id));
        }
        if !self.is_root(node_idx) {
            out.push(':');
            match format.precision {
                Some(precision) => out.push_str(&format!("{:.*}", precision, node.blen)),
                None => out.push_str(&node.blen.to_string()),
            }
        }
    }
}

fn quoted_label(label: &str) -> String {
    const SPECIAL: &[char] = &[
        ' ', '\t', '\r', '\n', '(', ')', '[', ']', '\'', ':', ';', ',',
    ];
    if label.contains(SPECIAL) {
        format!("'{}'", label.replace('\'', ""))
    } else {
        label.to_string()
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_newick())
    }
}
