//! The syntax tree of a derivation, kept as an arena of nodes. Nodes are
//! pushed children first, so the arena order is a post-order walk and the
//! root is the last node.

use std::fmt;

use crate::category::Category;
use crate::rules::Rule;
use crate::sentence::ConstituentType;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
  /// Holds the index of the leaf's lexeme.
  Leaf(usize),
  Unary(NodeId),
  Binary(NodeId, NodeId),
}

#[derive(Debug, Clone)]
pub struct STreeNode {
  pub kind: NodeKind,
  pub category: Category,
  /// `None` for leaves.
  pub rule: Option<Rule>,
  /// Which child carries the lexical head.
  pub head_child: usize,
  /// Lexeme index of the lexical head.
  pub head: usize,
  pub depth: usize,
  pub parent: Option<NodeId>,
  /// Lexemes `begin..end` under the node.
  pub lex_range: (usize, usize),
  pub ndtype: ConstituentType,
  /// Set on unary type changes that joined a conjunction.
  pub conjoin: bool,
}

impl STreeNode {
  pub fn leaf(lexeme: usize, category: Category, depth: usize) -> Self {
    Self {
      kind: NodeKind::Leaf(lexeme),
      category,
      rule: None,
      head_child: 0,
      head: lexeme,
      depth,
      parent: None,
      lex_range: (lexeme, lexeme + 1),
      ndtype: ConstituentType::NODE,
      conjoin: false,
    }
  }

  pub fn is_leaf(&self) -> bool {
    matches!(self.kind, NodeKind::Leaf(_))
  }

  pub fn lexeme(&self) -> Option<usize> {
    match self.kind {
      NodeKind::Leaf(lx) => Some(lx),
      _ => None,
    }
  }

  pub fn children(&self) -> Vec<NodeId> {
    match self.kind {
      NodeKind::Leaf(_) => Vec::new(),
      NodeKind::Unary(c) => vec![c],
      NodeKind::Binary(l, r) => vec![l, r],
    }
  }

  pub fn arity(&self) -> usize {
    match self.kind {
      NodeKind::Leaf(_) => 0,
      NodeKind::Unary(_) => 1,
      NodeKind::Binary(_, _) => 2,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct STree {
  nodes: Vec<STreeNode>,
}

impl STree {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Adds a node whose children are already in the arena.
  pub fn push(&mut self, node: STreeNode) -> NodeId {
    let id = self.nodes.len();
    for c in node.children() {
      self.nodes[c].parent = Some(id);
    }
    self.nodes.push(node);
    id
  }

  pub fn get(&self, id: NodeId) -> &STreeNode {
    &self.nodes[id]
  }

  pub fn get_mut(&mut self, id: NodeId) -> &mut STreeNode {
    &mut self.nodes[id]
  }

  pub fn root(&self) -> Option<NodeId> {
    self.nodes.len().checked_sub(1)
  }

  /// Nodes in post-order.
  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &STreeNode)> {
    self.nodes.iter().enumerate()
  }

  pub fn leaf_of(&self, lexeme: usize) -> Option<NodeId> {
    self.nodes.iter().position(|n| n.lexeme() == Some(lexeme))
  }

  /// The lowest node covering lexemes `begin..end`.
  pub fn covering(&self, begin: usize, end: usize) -> Option<NodeId> {
    self
      .nodes
      .iter()
      .enumerate()
      .filter(|(_, n)| n.lex_range.0 <= begin && end <= n.lex_range.1)
      .min_by_key(|(_, n)| n.lex_range.1 - n.lex_range.0)
      .map(|(i, _)| i)
  }

  /// Drops the leaves of removed lexemes and renumbers what is left.
  /// `idxmap` maps old lexeme indexes to new ones. A binary node that loses
  /// a child keeps the other as a unary child, a unary node that loses its
  /// child goes too.
  pub fn remove_lexemes(&mut self, idxmap: &[Option<usize>]) {
    let remap = |i: usize| idxmap.get(i).copied().flatten();
    let mut newid: Vec<Option<NodeId>> = Vec::with_capacity(self.nodes.len());
    let mut nodes: Vec<STreeNode> = Vec::with_capacity(self.nodes.len());
    for node in self.nodes.drain(..) {
      let kind = match node.kind {
        NodeKind::Leaf(lx) => remap(lx).map(NodeKind::Leaf),
        NodeKind::Unary(c) => newid[c].map(NodeKind::Unary),
        NodeKind::Binary(l, r) => match (newid[l], newid[r]) {
          (Some(l), Some(r)) => Some(NodeKind::Binary(l, r)),
          (Some(c), None) | (None, Some(c)) => Some(NodeKind::Unary(c)),
          (None, None) => None,
        },
      };
      let Some(kind) = kind else {
        newid.push(None);
        continue;
      };
      let (lo, hi) = (node.lex_range.0..node.lex_range.1)
        .filter_map(remap)
        .fold((usize::MAX, 0), |(lo, hi), i| (lo.min(i), hi.max(i + 1)));
      let head_child = if matches!(kind, NodeKind::Binary(_, _)) { node.head_child } else { 0 };
      newid.push(Some(nodes.len()));
      nodes.push(STreeNode {
        kind,
        head: remap(node.head).unwrap_or(lo),
        head_child,
        lex_range: (lo, hi),
        parent: None,
        ..node
      });
    }
    self.nodes.clear();
    for node in nodes {
      self.push(node);
    }
  }

  fn fmt_node(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = &self.nodes[id];
    match n.kind {
      NodeKind::Leaf(_) => write!(f, "{}..{}: {}", n.lex_range.0, n.lex_range.1, n.category),
      _ => {
        write!(f, "({}..{}: {}", n.lex_range.0, n.lex_range.1, n.category)?;
        if let Some(rule) = n.rule {
          write!(f, " {}", rule)?;
        }
        for c in n.children() {
          // TODO: indent through a writer adapter instead of a String per child
          let s = Subtree(self, c).to_string();
          for line in s.lines() {
            write!(f, "\n  {}", line)?;
          }
        }
        write!(f, ")")
      }
    }
  }
}

struct Subtree<'a>(&'a STree, NodeId);

impl fmt::Display for Subtree<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt_node(self.1, f)
  }
}

impl fmt::Display for STree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.root() {
      Some(root) => self.fmt_node(root, f),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cat(s: &str) -> Category {
    Category::parse(s).unwrap()
  }

  // (S[dcl] (NP John) (S[dcl]\NP runs))
  fn small_tree() -> STree {
    let mut t = STree::new();
    let a = t.push(STreeNode::leaf(0, cat("NP"), 1));
    let b = t.push(STreeNode::leaf(1, cat(r"S[dcl]\NP"), 1));
    t.push(STreeNode {
      kind: NodeKind::Binary(a, b),
      category: cat("S[dcl]"),
      rule: Some(Rule::BA),
      head_child: 1,
      head: 1,
      depth: 0,
      parent: None,
      lex_range: (0, 2),
      ndtype: ConstituentType::NODE,
      conjoin: false,
    });
    t
  }

  #[test]
  fn test_push_sets_parents() {
    let t = small_tree();
    assert_eq!(t.root(), Some(2));
    assert_eq!(t.get(0).parent, Some(2));
    assert_eq!(t.get(1).parent, Some(2));
    assert_eq!(t.get(2).children(), vec![0, 1]);
    assert_eq!(t.leaf_of(1), Some(1));
    assert_eq!(t.covering(0, 2), Some(2));
    assert_eq!(t.covering(1, 2), Some(1));
  }

  #[test]
  fn test_display() {
    let t = small_tree();
    assert_eq!(t.to_string(), "(0..2: S[dcl] BA\n  0..1: NP\n  1..2: S[dcl]\\NP)");
  }

  #[test]
  fn test_remove_lexemes() {
    let mut t = small_tree();
    t.remove_lexemes(&[None, Some(0)]);
    assert_eq!(t.len(), 2);
    let root = t.get(1);
    assert_eq!(root.kind, NodeKind::Unary(0));
    assert_eq!(root.lex_range, (0, 1));
    assert_eq!(root.head, 0);
    assert_eq!(t.get(0).lexeme(), Some(0));
    assert_eq!(t.get(0).parent, Some(1));
  }
}
