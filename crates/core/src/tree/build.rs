#![forbid(unsafe_code)]

use super::node::TreeNode;
use crate::record::FlatRecord;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{error, warn};

/// Recoverable anomalies found while deriving the tree. None of them remove a record
/// from the flat list; they only describe where a node ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeDiagnostic {
    /// `parent` names no record; the node was attached under Root.
    DanglingParent { name: String, parent: String },
    /// `name` closed a parent cycle; its parent link was ignored and it was attached under Root.
    CycleBroken { name: String, parent: String },
    /// A later record reuses a name; parent lookups resolve to the first one.
    DuplicateName { name: String, position: usize },
    /// Resolution gave up on this record; it is missing from the tree view only.
    Unresolved { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeBuild {
    pub root: TreeNode,
    pub diagnostics: Vec<TreeDiagnostic>,
    /// Flat-list position of each record's resolved parent; `None` means Root.
    resolved_parents: Vec<Option<usize>>,
}

impl TreeBuild {
    /// Resolved parent of the record at `position`: `Some(None)` for top-level records.
    pub fn resolved_parent(&self, position: usize) -> Option<Option<usize>> {
        self.resolved_parents.get(position).copied()
    }

    /// Positions rendered in the same sibling group as `position`, in flat-list order.
    pub fn sibling_positions(&self, position: usize) -> Vec<usize> {
        let Some(parent) = self.resolved_parent(position) else {
            return Vec::new();
        };
        self.resolved_parents
            .iter()
            .enumerate()
            .filter(|(_, candidate)| **candidate == parent)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Two-pass derivation of the rooted tree from the flat list.
///
/// Children keep their relative flat-list order. Records whose parent cannot be found
/// are attached under Root, and parent cycles are cut at their earliest member, so
/// every record appears exactly once.
pub fn build_tree(records: &[FlatRecord]) -> TreeBuild {
    let n = records.len();
    let mut diagnostics = Vec::new();

    let mut first_by_name: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (position, record) in records.iter().enumerate() {
        match first_by_name.entry(record.name.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(position);
            }
            Entry::Occupied(_) => {
                warn!(name = %record.name, position, "duplicate record name in list");
                diagnostics.push(TreeDiagnostic::DuplicateName {
                    name: record.name.clone(),
                    position,
                });
            }
        }
    }

    let mut parent_of: Vec<Option<usize>> = vec![None; n];
    for (position, record) in records.iter().enumerate() {
        let Some(parent) = record.parent_name() else {
            continue;
        };
        match first_by_name.get(parent) {
            Some(&parent_position) => parent_of[position] = Some(parent_position),
            None => {
                warn!(name = %record.name, parent, "parent not found, attaching to root");
                diagnostics.push(TreeDiagnostic::DanglingParent {
                    name: record.name.clone(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    let reachable = break_cycles(records, &mut parent_of, &mut diagnostics);
    let root = assemble(records, &parent_of, &reachable);

    TreeBuild {
        root,
        diagnostics,
        resolved_parents: parent_of,
    }
}

fn children_lists(parent_of: &[Option<usize>]) -> (Vec<usize>, Vec<Vec<usize>>) {
    let mut top = Vec::new();
    let mut children = vec![Vec::new(); parent_of.len()];
    for (position, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(position),
            None => top.push(position),
        }
    }
    (top, children)
}

fn mark_from(start: usize, children: &[Vec<usize>], reachable: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(position) = stack.pop() {
        if reachable[position] {
            continue;
        }
        reachable[position] = true;
        stack.extend(children[position].iter().copied().filter(|c| !reachable[*c]));
    }
}

/// Cuts every parent cycle at its earliest member so all records hang off Root.
/// Returns the final reachability of each position.
fn break_cycles(
    records: &[FlatRecord],
    parent_of: &mut [Option<usize>],
    diagnostics: &mut Vec<TreeDiagnostic>,
) -> Vec<bool> {
    let n = records.len();
    let (top, children) = children_lists(parent_of);
    let mut reachable = vec![false; n];
    for position in top {
        mark_from(position, &children, &mut reachable);
    }

    // Chain walks only ever visit unreachable records, each of which becomes reachable
    // once its cycle is cut, so `n` steps per walk is a hard ceiling.
    let mut walk_stamp = vec![usize::MAX; n];
    for start in 0..n {
        if reachable[start] {
            continue;
        }

        let mut current = start;
        let mut steps = 0usize;
        let cycle_entry = loop {
            if walk_stamp[current] == start {
                break Some(current);
            }
            walk_stamp[current] = start;
            steps += 1;
            match parent_of[current] {
                Some(parent) if !reachable[parent] && steps <= n => current = parent,
                _ => break None,
            }
        };

        let Some(entry) = cycle_entry else {
            error!(
                name = %records[start].name,
                steps,
                "gave up resolving parent chain; record hidden from tree"
            );
            diagnostics.push(TreeDiagnostic::Unresolved {
                name: records[start].name.clone(),
            });
            continue;
        };

        let mut cut = entry;
        let mut member = entry;
        while let Some(parent) = parent_of[member] {
            if parent == entry {
                break;
            }
            cut = cut.min(parent);
            member = parent;
        }

        let parent_name = parent_of[cut]
            .map(|p| records[p].name.clone())
            .unwrap_or_default();
        warn!(name = %records[cut].name, parent = %parent_name, "parent cycle cut, attaching to root");
        diagnostics.push(TreeDiagnostic::CycleBroken {
            name: records[cut].name.clone(),
            parent: parent_name,
        });
        parent_of[cut] = None;
        mark_from(cut, &children, &mut reachable);
    }

    reachable
}

fn assemble(records: &[FlatRecord], parent_of: &[Option<usize>], reachable: &[bool]) -> TreeNode {
    let (top, children) = children_lists(parent_of);

    // Breadth-first order puts every parent before its children; filling slots in
    // reverse means a node's children are complete before it is moved into place.
    let mut order = Vec::with_capacity(records.len());
    let mut queue: std::collections::VecDeque<usize> =
        top.iter().copied().filter(|p| reachable[*p]).collect();
    while let Some(position) = queue.pop_front() {
        order.push(position);
        queue.extend(children[position].iter().copied().filter(|c| reachable[*c]));
    }

    let mut slots: Vec<Option<TreeNode>> = vec![None; records.len()];
    for &position in order.iter().rev() {
        let kids = children[position]
            .iter()
            .filter_map(|child| slots[*child].take())
            .collect();
        slots[position] = Some(TreeNode {
            record: records[position].clone(),
            children: kids,
        });
    }

    let mut root = TreeNode::root();
    root.children = top.iter().filter_map(|p| slots[*p].take()).collect();
    root
}
