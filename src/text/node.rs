//! Tree nodes backing [`super::LineIndex`].
//!
//! Nodes are immutable once built and shared between index versions through
//! `Arc`. A leaf holds exactly one line; all leaves sit at the same depth.

use std::sync::Arc;

use super::lines::char_len;

#[derive(Debug)]
pub(crate) enum Node {
    Leaf {
        text: Box<str>,
        chars: usize,
    },
    Branch {
        children: Vec<Arc<Node>>,
        chars: usize,
        lines: usize,
    },
}

impl Node {
    pub(crate) fn leaf(text: impl Into<Box<str>>) -> Arc<Node> {
        let text = text.into();
        let chars = char_len(&text);
        Arc::new(Node::Leaf { text, chars })
    }

    pub(crate) fn branch(children: Vec<Arc<Node>>) -> Arc<Node> {
        let (chars, lines) = children
            .iter()
            .fold((0, 0), |(c, l), child| (c + child.chars(), l + child.lines()));
        Arc::new(Node::Branch {
            children,
            chars,
            lines,
        })
    }

    pub(crate) fn empty() -> Arc<Node> {
        Self::branch(Vec::new())
    }

    pub(crate) fn chars(&self) -> usize {
        match self {
            Node::Leaf { chars, .. } | Node::Branch { chars, .. } => *chars,
        }
    }

    pub(crate) fn lines(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Branch { lines, .. } => *lines,
        }
    }

    pub(crate) fn children(&self) -> &[Arc<Node>] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Branch { children, .. } => children,
        }
    }

    pub(crate) fn text(&self) -> Option<&str> {
        match self {
            Node::Leaf { text, .. } => Some(text),
            Node::Branch { .. } => None,
        }
    }
}

/// Group `nodes` into parents holding at most `capacity` children each.
pub(crate) fn group(nodes: Vec<Arc<Node>>, capacity: usize) -> Vec<Arc<Node>> {
    let mut parents = Vec::with_capacity(nodes.len().div_ceil(capacity));
    let mut nodes = nodes.into_iter().peekable();
    while nodes.peek().is_some() {
        let chunk: Vec<_> = nodes.by_ref().take(capacity).collect();
        parents.push(Node::branch(chunk));
    }
    parents
}

/// Build a root above `nodes`, adding levels until it fits in one node.
pub(crate) fn root_from(mut nodes: Vec<Arc<Node>>, capacity: usize) -> Arc<Node> {
    while nodes.len() > capacity {
        nodes = group(nodes, capacity);
    }
    let mut root = Node::branch(nodes);
    // A root with a single branch child is just an extra level.
    while let Some(child) = single_branch_child(&root) {
        root = child;
    }
    root
}

fn single_branch_child(node: &Node) -> Option<Arc<Node>> {
    match node.children() {
        [only] if matches!(**only, Node::Branch { .. }) => Some(Arc::clone(only)),
        _ => None,
    }
}
