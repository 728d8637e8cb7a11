#![forbid(unsafe_code)]

use crate::record::FlatRecord;
use serde::Serialize;

pub const ROOT_NAME: &str = "Root";

/// Derived, disposable node: a record plus the nodes it owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub record: FlatRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(record: FlatRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::leaf(FlatRecord::named(ROOT_NAME))
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.walk().len()
    }

    /// Pre-order walk of the descendants with their depth (top-level children are depth 0).
    pub fn walk(&self) -> Vec<(usize, &TreeNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &TreeNode)> =
            self.children.iter().rev().map(|child| (0, child)).collect();
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        }
        out
    }

    pub fn find(&self, name: &str) -> Option<&TreeNode> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node)
            .find(|node| node.name() == name)
    }

    /// Children names, in order. Handy for assertions and compact rendering.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(TreeNode::name).collect()
    }
}

// Long parent chains would otherwise drop recursively.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
