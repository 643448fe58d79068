//! Root-owned generic tree
//!
//! Nodes never point back at their parents. Parent, sibling and path
//! queries search from the root instead, so the structure stays a plain
//! owned value with no reference cycles.
//!
//! Node lookups use identity, not value equality: two routes with the same
//! params are still different nodes. [`NodeIdentity`] supplies that notion;
//! it is implemented for `Arc<T>` via `Arc::ptr_eq`.

use std::sync::Arc;

/// Identity comparison used by tree queries
pub trait NodeIdentity {
    fn is_same_node(&self, other: &Self) -> bool;
}

impl<T: ?Sized> NodeIdentity for Arc<T> {
    fn is_same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// A value with its ordered children
#[derive(Debug, Clone)]
pub struct TreeNode<T> {
    pub value: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    pub fn new(value: T, children: Vec<TreeNode<T>>) -> Self {
        Self { value, children }
    }

    pub fn leaf(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    /// Pre-order traversal, parents before children
    pub fn walk(&self) -> Vec<&TreeNode<T>> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    /// Same shape, values mapped
    pub fn map<U>(&self, f: &impl Fn(&T) -> U) -> TreeNode<U> {
        TreeNode::new(
            f(&self.value),
            self.children.iter().map(|c| c.map(f)).collect(),
        )
    }
}

/// Tree owned through its root node
#[derive(Debug, Clone)]
pub struct Tree<T> {
    pub root: TreeNode<T>,
}

impl<T: NodeIdentity> Tree<T> {
    pub fn new(root: TreeNode<T>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &T {
        &self.root.value
    }

    /// Node holding `value`, if it belongs to this tree
    pub fn find_node(&self, value: &T) -> Option<&TreeNode<T>> {
        find_node(value, &self.root)
    }

    /// Values from the root down to `value`, inclusive; empty if absent
    pub fn path_from_root(&self, value: &T) -> Vec<&T> {
        let mut collected = Vec::new();
        if find_path(value, &self.root, &mut collected) {
            collected.into_iter().map(|n| &n.value).collect()
        } else {
            Vec::new()
        }
    }

    pub fn parent(&self, value: &T) -> Option<&T> {
        let path = self.path_from_root(value);
        if path.len() > 1 {
            Some(path[path.len() - 2])
        } else {
            None
        }
    }

    pub fn children(&self, value: &T) -> Vec<&T> {
        self.find_node(value)
            .map(|n| n.children.iter().map(|c| &c.value).collect())
            .unwrap_or_default()
    }

    pub fn first_child(&self, value: &T) -> Option<&T> {
        self.find_node(value)
            .and_then(|n| n.children.first())
            .map(|c| &c.value)
    }

    /// Other children of `value`'s parent
    pub fn siblings(&self, value: &T) -> Vec<&T> {
        let mut collected = Vec::new();
        if !find_path(value, &self.root, &mut collected) || collected.len() < 2 {
            return Vec::new();
        }
        collected[collected.len() - 2]
            .children
            .iter()
            .map(|c| &c.value)
            .filter(|v| !v.is_same_node(value))
            .collect()
    }
}

fn find_node<'a, T: NodeIdentity>(expected: &T, node: &'a TreeNode<T>) -> Option<&'a TreeNode<T>> {
    if expected.is_same_node(&node.value) {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_node(expected, c))
}

fn find_path<'a, T: NodeIdentity>(
    expected: &T,
    node: &'a TreeNode<T>,
    collected: &mut Vec<&'a TreeNode<T>>,
) -> bool {
    collected.push(node);
    if expected.is_same_node(&node.value) {
        return true;
    }
    for child in &node.children {
        if find_path(expected, child, collected) {
            return true;
        }
    }
    collected.pop();
    false
}
