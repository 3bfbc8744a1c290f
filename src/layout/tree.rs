use std::collections::{HashMap, HashSet};

use crate::ir::{Action, Transition, Workflow};

use super::types::{EndReason, NodeKind, NodePayload};

pub(super) type NodeIdx = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(super) struct Geometry {
    pub(super) x: f32,
    pub(super) y: f32,
    pub(super) width: f32,
    pub(super) height: f32,
    pub(super) subtree_width: f32,
    pub(super) subtree_height: f32,
}

/// How a node hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum EdgeRole {
    Child(usize),
    Branch(usize),
    Failure,
}

impl EdgeRole {
    pub(super) fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }
}

#[derive(Debug, Clone)]
pub(super) struct TreeNode {
    pub(super) id: String,
    pub(super) kind: NodeKind,
    pub(super) label: String,
    pub(super) payload: NodePayload,
    pub(super) children: Vec<NodeIdx>,
    /// Branch heads, only populated on CONDITION nodes.
    pub(super) branches: Vec<NodeIdx>,
    pub(super) failure_child: Option<NodeIdx>,
    pub(super) geometry: Geometry,
}

impl TreeNode {
    fn new(id: String, kind: NodeKind, label: String, payload: NodePayload) -> Self {
        Self {
            id,
            kind,
            label,
            payload,
            children: Vec::new(),
            branches: Vec::new(),
            failure_child: None,
            geometry: Geometry::default(),
        }
    }
}

/// Arena of layout nodes. Links between nodes are indices, so a node reached
/// from several parents is stored once.
#[derive(Debug, Clone, Default)]
pub(super) struct LayoutTree {
    pub(super) nodes: Vec<TreeNode>,
    pub(super) root: NodeIdx,
    /// Steps unreachable from START, laid out as extra roots.
    pub(super) orphans: Vec<NodeIdx>,
    pub(super) index: HashMap<String, NodeIdx>,
    pub(super) labels: HashMap<(NodeIdx, EdgeRole), String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Success,
    Failure,
}

impl LayoutTree {
    pub(super) fn roots(&self) -> Vec<NodeIdx> {
        let mut roots = Vec::with_capacity(self.orphans.len() + 1);
        roots.push(self.root);
        roots.extend(self.orphans.iter().copied());
        roots
    }

    pub(super) fn node(&self, idx: NodeIdx) -> &TreeNode {
        &self.nodes[idx]
    }

    /// Children, then branch heads, then the failure child.
    pub(super) fn successors(&self, idx: NodeIdx) -> Vec<(EdgeRole, NodeIdx)> {
        let node = &self.nodes[idx];
        let mut out = Vec::with_capacity(node.children.len() + node.branches.len() + 1);
        out.extend(
            node.children
                .iter()
                .enumerate()
                .map(|(i, &child)| (EdgeRole::Child(i), child)),
        );
        out.extend(
            node.branches
                .iter()
                .enumerate()
                .map(|(i, &head)| (EdgeRole::Branch(i), head)),
        );
        if let Some(failure) = node.failure_child {
            out.push((EdgeRole::Failure, failure));
        }
        out
    }

    pub(super) fn success_successors(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        let node = &self.nodes[idx];
        node.children.iter().chain(node.branches.iter()).copied()
    }

    pub(super) fn edge_label(&self, idx: NodeIdx, role: EdgeRole) -> Option<&str> {
        self.labels.get(&(idx, role)).map(String::as_str)
    }

    fn push(&mut self, node: TreeNode) -> NodeIdx {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn push_end(&mut self, reason: EndReason) -> NodeIdx {
        let id = match &reason {
            EndReason::Missing { step_id } => format!("$missing:{step_id}:{}", self.nodes.len()),
            EndReason::Reference { .. } => format!("$ref:{}", self.nodes.len()),
            _ => format!("$end:{}", self.nodes.len()),
        };
        let label = match &reason {
            EndReason::Missing { step_id } => format!("Missing step: {step_id}"),
            EndReason::Reference { target } => target.clone(),
            _ => "End".to_string(),
        };
        self.push(TreeNode::new(id, NodeKind::End, label, NodePayload::End(reason)))
    }

    fn reachable_from(&self, start: NodeIdx, seen: &mut HashSet<NodeIdx>) {
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            for (_, next) in self.successors(idx) {
                if !seen.contains(&next) {
                    stack.push(next);
                }
            }
        }
    }
}

pub(super) fn build_tree(workflow: &Workflow) -> LayoutTree {
    let mut tree = LayoutTree::default();

    // Pass 1: one STEP node per declared step. The first declaration owns the id.
    let mut step_nodes = Vec::with_capacity(workflow.steps.len());
    for (index, step) in workflow.steps.iter().enumerate() {
        let id = if tree.index.contains_key(&step.step_id) {
            format!("{}$dup:{index}", step.step_id)
        } else {
            step.step_id.clone()
        };
        let idx = tree.push(TreeNode::new(
            id,
            NodeKind::Step,
            step.step_id.clone(),
            NodePayload::Step {
                index,
                step_id: step.step_id.clone(),
                operation: step.operation.clone(),
                description: step.description.clone(),
            },
        ));
        tree.index.entry(step.step_id.clone()).or_insert(idx);
        step_nodes.push(idx);
    }

    let root = tree.push(TreeNode::new(
        "$start".to_string(),
        NodeKind::Start,
        "Start".to_string(),
        NodePayload::None,
    ));
    tree.root = root;
    let first = match step_nodes.first() {
        Some(&first) => first,
        None => tree.push_end(EndReason::EmptyWorkflow),
    };
    tree.nodes[root].children.push(first);

    // Pass 2: wire transitions.
    for (i, step) in workflow.steps.iter().enumerate() {
        let src = step_nodes[i];
        if step.on_success.is_empty() {
            let next = match step_nodes.get(i + 1) {
                Some(&next) => next,
                None => tree.push_end(EndReason::FallThrough),
            };
            tree.nodes[src].children.push(next);
        } else {
            attach_side(&mut tree, src, &step.step_id, &step.on_success, Side::Success);
        }
        if !step.on_failure.is_empty() {
            attach_side(&mut tree, src, &step.step_id, &step.on_failure, Side::Failure);
        }
    }

    let mut seen = HashSet::new();
    tree.reachable_from(root, &mut seen);
    for &idx in &step_nodes {
        if !seen.contains(&idx) {
            tree.orphans.push(idx);
            tree.reachable_from(idx, &mut seen);
        }
    }

    tree
}

fn resolution_group(action: &Action) -> u8 {
    match action.transition {
        Transition::Goto { .. } | Transition::Retry { .. } => 0,
        Transition::End => 1,
        Transition::Reference { .. } => 2,
    }
}

fn attach_side(tree: &mut LayoutTree, src: NodeIdx, own_id: &str, actions: &[Action], side: Side) {
    let mut ordered: Vec<&Action> = actions.iter().collect();
    ordered.sort_by_key(|action| resolution_group(action));

    let targets: Vec<(NodeIdx, Option<String>)> = ordered
        .into_iter()
        .map(|action| (resolve_action(tree, src, own_id, action, side), action.name.clone()))
        .collect();

    let role = match side {
        Side::Success => EdgeRole::Child(0),
        Side::Failure => EdgeRole::Failure,
    };

    if let [(target, name)] = targets.as_slice() {
        attach(tree, src, *target, side);
        if let Some(name) = name {
            tree.labels.insert((src, role), name.clone());
        }
        return;
    }

    let suffix = match side {
        Side::Success => "on-success",
        Side::Failure => "on-failure",
    };
    let condition = tree.push(TreeNode::new(
        format!("{}${suffix}", tree.nodes[src].id),
        NodeKind::Condition,
        String::new(),
        NodePayload::None,
    ));
    attach(tree, src, condition, side);
    for (i, (target, name)) in targets.into_iter().enumerate() {
        tree.nodes[condition].branches.push(target);
        if let Some(name) = name {
            tree.labels.insert((condition, EdgeRole::Branch(i)), name);
        }
    }
}

fn attach(tree: &mut LayoutTree, src: NodeIdx, target: NodeIdx, side: Side) {
    match side {
        Side::Success => tree.nodes[src].children.push(target),
        Side::Failure => tree.nodes[src].failure_child = Some(target),
    }
}

fn resolve_action(
    tree: &mut LayoutTree,
    src: NodeIdx,
    own_id: &str,
    action: &Action,
    side: Side,
) -> NodeIdx {
    match &action.transition {
        Transition::Goto { step_id } => resolve_goto(tree, step_id),
        Transition::End => tree.push_end(EndReason::Explicit),
        Transition::Reference { target } => tree.push_end(EndReason::Reference {
            target: target.clone(),
        }),
        Transition::Retry { step_id, .. } if side == Side::Success => {
            resolve_goto(tree, step_id.as_deref().unwrap_or(own_id))
        }
        Transition::Retry {
            step_id,
            retry_after,
            retry_limit,
        } => {
            let target = step_id.as_deref().unwrap_or(own_id).to_string();
            let label = match retry_limit {
                Some(limit) => format!("Retry x{limit}"),
                None => "Retry".to_string(),
            };
            let id = format!("{}$retry:{}", tree.nodes[src].id, tree.nodes.len());
            tree.push(TreeNode::new(
                id,
                NodeKind::Retry,
                label,
                NodePayload::Retry {
                    target_step_id: target,
                    retry_after: *retry_after,
                    retry_limit: *retry_limit,
                    target_center: None,
                },
            ))
        }
    }
}

fn resolve_goto(tree: &mut LayoutTree, step_id: &str) -> NodeIdx {
    match tree.index.get(step_id) {
        Some(&idx) => idx,
        None => tree.push_end(EndReason::Missing {
            step_id: step_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Step;

    fn kind_of(tree: &LayoutTree, idx: NodeIdx) -> NodeKind {
        tree.node(idx).kind
    }

    #[test]
    fn linear_fall_through_ends_with_synthetic_end() {
        let wf = Workflow::new("wf", vec![Step::new("A"), Step::new("B")]);
        let tree = build_tree(&wf);
        assert_eq!(tree.nodes.len(), 4);
        let a = tree.index["A"];
        let b = tree.index["B"];
        assert_eq!(tree.node(tree.root).children, vec![a]);
        assert_eq!(tree.node(a).children, vec![b]);
        let end = tree.node(b).children[0];
        assert_eq!(kind_of(&tree, end), NodeKind::End);
        assert_eq!(tree.node(end).payload, NodePayload::End(EndReason::FallThrough));
        assert!(tree.node(a).failure_child.is_none());
        assert!(tree.orphans.is_empty());
    }

    #[test]
    fn multiple_targets_create_condition_with_ordered_branches() {
        let wf = Workflow::new(
            "wf",
            vec![
                Step::new("A").on_success(vec![
                    Action::end().named("done"),
                    Action::goto("B").named("next"),
                ]),
                Step::new("B").on_success(vec![Action::goto("A")]),
            ],
        );
        let tree = build_tree(&wf);
        let a = tree.index["A"];
        let b = tree.index["B"];
        let cond = tree.node(a).children[0];
        assert_eq!(kind_of(&tree, cond), NodeKind::Condition);
        let heads = &tree.node(cond).branches;
        assert_eq!(heads.len(), 2);
        assert_eq!(heads[0], b);
        assert_eq!(kind_of(&tree, heads[1]), NodeKind::End);
        assert_eq!(tree.edge_label(cond, EdgeRole::Branch(0)), Some("next"));
        assert_eq!(tree.edge_label(cond, EdgeRole::Branch(1)), Some("done"));
        // B's single goto attaches directly, without a condition.
        assert_eq!(tree.node(b).children, vec![a]);
        let steps = tree.nodes.iter().filter(|n| n.kind == NodeKind::Step).count();
        assert_eq!(steps, 2);
    }

    #[test]
    fn failure_retry_without_target_retries_self() {
        let wf = Workflow::new(
            "wf",
            vec![Step::new("A").on_failure(vec![Action::retry(None)])],
        );
        let tree = build_tree(&wf);
        let a = tree.index["A"];
        let retry = tree.node(a).failure_child.expect("failure child");
        assert_eq!(kind_of(&tree, retry), NodeKind::Retry);
        match &tree.node(retry).payload {
            NodePayload::Retry { target_step_id, .. } => assert_eq!(target_step_id, "A"),
            other => panic!("unexpected payload {other:?}"),
        }
        let ends: Vec<_> = tree
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::End)
            .collect();
        assert_eq!(ends.len(), 1, "only the success fall-through END");
    }

    #[test]
    fn success_retry_acts_as_goto() {
        let wf = Workflow::new(
            "wf",
            vec![Step::new("A").on_success(vec![Action::retry(None)])],
        );
        let tree = build_tree(&wf);
        let a = tree.index["A"];
        assert_eq!(tree.node(a).children, vec![a]);
    }

    #[test]
    fn unknown_targets_become_placeholder_ends() {
        let wf = Workflow::new(
            "wf",
            vec![Step::new("A").on_success(vec![
                Action::reference("other-workflow"),
                Action::goto("ghost"),
            ])],
        );
        let tree = build_tree(&wf);
        let a = tree.index["A"];
        let cond = tree.node(a).children[0];
        let heads = &tree.node(cond).branches;
        assert_eq!(
            tree.node(heads[0]).payload,
            NodePayload::End(EndReason::Missing {
                step_id: "ghost".to_string()
            })
        );
        assert_eq!(tree.node(heads[0]).label, "Missing step: ghost");
        assert_eq!(tree.node(heads[1]).label, "other-workflow");
    }

    #[test]
    fn empty_workflow_links_start_to_end() {
        let tree = build_tree(&Workflow::new("wf", Vec::new()));
        assert_eq!(tree.nodes.len(), 2);
        let end = tree.node(tree.root).children[0];
        assert_eq!(tree.node(end).payload, NodePayload::End(EndReason::EmptyWorkflow));
    }

    #[test]
    fn unreachable_steps_become_extra_roots() {
        let wf = Workflow::new(
            "wf",
            vec![
                Step::new("A").on_success(vec![Action::end()]),
                Step::new("B"),
                Step::new("C"),
            ],
        );
        let tree = build_tree(&wf);
        // C is reached from B by fall-through, so only B is a root.
        assert_eq!(tree.orphans, vec![tree.index["B"]]);
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn duplicate_step_ids_get_distinct_nodes() {
        let wf = Workflow::new("wf", vec![Step::new("A"), Step::new("A")]);
        let tree = build_tree(&wf);
        let ids: Vec<&str> = tree
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Step)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "A$dup:1"]);
        assert_eq!(tree.index["A"], 0);
    }
}
