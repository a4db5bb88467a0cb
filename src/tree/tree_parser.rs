use std::error::Error;
use std::fmt;

use anyhow::bail;
use log::info;
use pest::{error::Error as PestError, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::tree::{
    Node,
    NodeIdx::{self, Internal as Int, Leaf},
    Tree,
};
use crate::Result;

#[derive(Parser)]
#[grammar = "./tree/newick.pest"]
pub struct NewickParser;

#[derive(Debug)]
pub struct ParsingError(pub(crate) Box<PestError<Rule>>);

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Malformed newick string")?;
        write!(f, "{}", self.0)
    }
}

impl Error for ParsingError {}

/// Parses all `;`-terminated trees in the string.
///
/// Multifurcations are kept as they are, so an unrooted tree written with a trifurcation
/// at the top stays trifurcating. Nodes are numbered in pre-order.
///
/// # Example
/// ```
/// use rate_shift::tree::tree_parser::from_newick;
/// let trees = from_newick("((A:1.0,B:1.0)E:2.0,C:3.0);").unwrap();
/// assert_eq!(trees.len(), 1);
/// assert_eq!(trees[0].leaves().len(), 3);
/// ```
pub fn from_newick(newick: &str) -> Result<Vec<Tree>> {
    info!("Parsing newick trees.");
    let newick_rule = match NewickParser::parse(Rule::newick, newick) {
        Ok(mut pairs) => pairs.next(),
        Err(error) => bail!(ParsingError(Box::new(error))),
    };
    let mut trees = Vec::new();
    for tree_rule in newick_rule.into_iter().flat_map(|rule| rule.into_inner()) {
        match tree_rule.as_rule() {
            Rule::tree => {
                if let Some(rule) = tree_rule.into_inner().next() {
                    trees.push(Tree::from_subtree_rule(rule));
                }
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }
    info!("Finished parsing {} newick trees successfully.", trees.len());
    Ok(trees)
}

impl Tree {
    fn from_subtree_rule(rule: Pair<Rule>) -> Self {
        let mut nodes = Vec::new();
        let root = Tree::parse_subtree_rule(&mut nodes, None, rule);
        Tree::from_nodes(root, nodes)
    }

    fn parse_subtree_rule(
        nodes: &mut Vec<Node>,
        parent: Option<NodeIdx>,
        rule: Pair<Rule>,
    ) -> NodeIdx {
        let node_idx = nodes.len();
        match rule.as_rule() {
            Rule::leaf => {
                let mut id = String::from("");
                let mut blen = 0.0;
                for inner in rule.into_inner() {
                    match inner.as_rule() {
                        Rule::label => id = Tree::parse_label_rule(inner),
                        Rule::branch_length => blen = Tree::parse_branch_length_rule(inner),
                        _ => unreachable!(),
                    }
                }
                nodes.push(Node::new_leaf(node_idx, parent, blen, id));
                Leaf(node_idx)
            }
            Rule::internal => {
                nodes.push(Node::new_internal(
                    node_idx,
                    parent,
                    Vec::new(),
                    0.0,
                    String::new(),
                ));
                let mut children = Vec::new();
                for inner in rule.into_inner() {
                    match inner.as_rule() {
                        Rule::internal | Rule::leaf => children.push(Tree::parse_subtree_rule(
                            nodes,
                            Some(Int(node_idx)),
                            inner,
                        )),
                        Rule::label => nodes[node_idx].id = Tree::parse_label_rule(inner),
                        Rule::branch_length => {
                            nodes[node_idx].blen = Tree::parse_branch_length_rule(inner)
                        }
                        _ => unreachable!(),
                    }
                }
                nodes[node_idx].children = children;
                Int(node_idx)
            }
            _ => unreachable!(),
        }
    }

    fn parse_branch_length_rule(rule: Pair<Rule>) -> f64 {
        rule.into_inner()
            .next()
            .and_then(|float| float.as_str().trim().parse::<f64>().ok())
            .unwrap_or_default()
    }

    fn parse_label_rule(rule: Pair<Rule>) -> String {
        let label = rule.as_str();
        label
            .strip_prefix('\'')
            .and_then(|l| l.strip_suffix('\''))
            .unwrap_or(label)
            .to_string()
    }
}
