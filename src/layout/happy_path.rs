use std::collections::{HashMap, HashSet};

use super::tree::{EdgeRole, LayoutTree, NodeIdx};
use super::types::NodeKind;

/// The longest success-only path from the root.
#[derive(Debug, Clone, Default)]
pub(super) struct HappyPath {
    pub(super) path: Vec<NodeIdx>,
    members: HashSet<NodeIdx>,
    /// Spine member to the spine member after it.
    following: HashMap<NodeIdx, NodeIdx>,
}

impl HappyPath {
    pub(super) fn contains(&self, idx: NodeIdx) -> bool {
        self.members.contains(&idx)
    }

    /// Successors in traversal order shared by every pass after this one:
    /// the spine continuation, children, branch heads with spine heads first,
    /// then the failure child. A depth-first walk in this order visits the
    /// whole spine before anything hanging off it.
    pub(super) fn ordered_successors(
        &self,
        tree: &LayoutTree,
        idx: NodeIdx,
    ) -> Vec<(EdgeRole, NodeIdx)> {
        let following = self.following.get(&idx).copied();
        let mut successors = tree.successors(idx);
        successors.sort_by_key(|&(role, target)| match role {
            EdgeRole::Child(_) | EdgeRole::Branch(_) if Some(target) == following => 0,
            EdgeRole::Child(_) => 1,
            EdgeRole::Branch(_) if self.contains(target) => 2,
            EdgeRole::Branch(_) => 3,
            EdgeRole::Failure => 4,
        });
        successors
    }
}

pub(super) fn find_happy_path(tree: &LayoutTree) -> HappyPath {
    let best_next = longest_successors(tree);
    let mut path = vec![tree.root];
    let mut members: HashSet<NodeIdx> = path.iter().copied().collect();
    let mut current = tree.root;
    while let Some(&next) = best_next.get(&current) {
        if !members.insert(next) {
            break;
        }
        path.push(next);
        current = next;
    }
    let following = path.windows(2).map(|pair| (pair[0], pair[1])).collect();
    HappyPath {
        path,
        members,
        following,
    }
}

/// For every node reachable over success edges, the successor that starts its
/// longest onward path. Edges closing a cycle are ignored, so the result
/// describes a DAG and following it always terminates.
fn longest_successors(tree: &LayoutTree) -> HashMap<NodeIdx, NodeIdx> {
    let mut length: HashMap<NodeIdx, usize> = HashMap::new();
    let mut best_next = HashMap::new();
    let mut on_stack = HashSet::from([tree.root]);
    let mut stack = vec![(tree.root, success_targets(tree, tree.root), 0usize)];

    while let Some((idx, successors, cursor)) = stack.last_mut() {
        if let Some(&next) = successors.get(*cursor) {
            *cursor += 1;
            if !length.contains_key(&next) && on_stack.insert(next) {
                let onward = success_targets(tree, next);
                stack.push((next, onward, 0));
            }
            continue;
        }

        let idx = *idx;
        let mut best: Option<(NodeIdx, usize)> = None;
        for &next in successors.iter() {
            let Some(&len) = length.get(&next) else {
                continue;
            };
            // Strict comparison keeps the earliest declared candidate on ties.
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((next, len));
            }
        }
        length.insert(idx, 1 + best.map_or(0, |(_, len)| len));
        if let Some((next, _)) = best {
            best_next.insert(idx, next);
        }
        on_stack.remove(&idx);
        stack.pop();
    }
    best_next
}

fn success_targets(tree: &LayoutTree, idx: NodeIdx) -> Vec<NodeIdx> {
    if tree.node(idx).kind == NodeKind::End {
        return Vec::new();
    }
    tree.success_successors(idx).collect()
}
