use arazzo_layout::config::LayoutConfig;
use arazzo_layout::layout::{EdgeClass, NodeKind, NodePayload};
use arazzo_layout::layout_dump::LayoutDump;
use arazzo_layout::{Action, Direction, Step, Workflow, compute_layout};
use proptest::prelude::*;

const EPS: f32 = 0.01;

/// (kind, target) pairs; target `n` points at a step that does not exist.
type ActionSeed = (u8, usize);

fn action(seed: ActionSeed, steps: usize) -> Action {
    let (kind, target) = seed;
    match kind % 4 {
        0 if target < steps => Action::goto(&format!("s{target}")),
        0 => Action::goto("ghost"),
        1 => Action::end(),
        2 => Action::retry(None),
        _ => Action::reference("other-flow"),
    }
}

fn workflow_strategy() -> impl Strategy<Value = Workflow> {
    (1usize..10).prop_flat_map(|steps| {
        let actions = prop::collection::vec((0u8..4, 0..=steps), 0..3);
        let failures = prop::collection::vec((0u8..4, 0..=steps), 0..2);
        prop::collection::vec((actions, failures), steps).prop_map(move |seeds| {
            let steps_out = seeds
                .into_iter()
                .enumerate()
                .map(|(i, (success, failure))| {
                    Step::new(&format!("s{i}"))
                        .on_success(success.into_iter().map(|seed| action(seed, steps)).collect())
                        .on_failure(failure.into_iter().map(|seed| action(seed, steps)).collect())
                })
                .collect();
            Workflow::new("generated", steps_out)
        })
    })
}

fn far_threshold(config: &LayoutConfig) -> f32 {
    config.portal.far_jump_ranks * (config.sizes.step_height + config.rank_spacing)
}

proptest! {
    #[test]
    fn every_step_is_laid_out_once(workflow in workflow_strategy()) {
        let layout = compute_layout(&workflow, Direction::TopDown, &LayoutConfig::default());
        for step in &workflow.steps {
            let count = layout
                .nodes_of_kind(NodeKind::Step)
                .filter(|n| matches!(&n.payload, NodePayload::Step { step_id, .. } if *step_id == step.step_id))
                .count();
            prop_assert_eq!(count, 1);
        }
        prop_assert_eq!(layout.nodes_of_kind(NodeKind::Start).count(), 1);
    }

    #[test]
    fn edges_attach_to_existing_nodes(workflow in workflow_strategy()) {
        let layout = compute_layout(&workflow, Direction::LeftRight, &LayoutConfig::default());
        for edge in &layout.edges {
            prop_assert!(layout.node(&edge.from).is_some());
            prop_assert!(layout.node(&edge.to).is_some());
            for (x, y) in edge.points() {
                prop_assert!(x.is_finite() && y.is_finite());
            }
        }
        for node in &layout.nodes {
            prop_assert!(node.x >= 0.0 && node.y >= 0.0);
            prop_assert!(node.x + node.width <= layout.width + EPS);
            prop_assert!(node.y + node.height <= layout.height + EPS);
        }
    }

    #[test]
    fn portals_replace_exactly_the_jumps_that_need_them(workflow in workflow_strategy()) {
        let config = LayoutConfig::default();
        let threshold = far_threshold(&config);
        let layout = compute_layout(&workflow, Direction::TopDown, &config);

        for edge in &layout.edges {
            let source = layout.node(&edge.from).unwrap();
            let target = layout.node(&edge.to).unwrap();
            let (jump_to, is_portal) = match &target.payload {
                NodePayload::Portal(portal) => (layout.node(&portal.target_id).unwrap(), true),
                _ => (target, false),
            };
            let delta = jump_to.y - source.y;
            let needs_portal = if source.on_failure_path {
                delta < -EPS || delta > threshold + EPS
            } else {
                delta < -EPS && jump_to.on_spine
            };
            let may_be_portal = if source.on_failure_path {
                delta < EPS || delta > threshold - EPS
            } else {
                delta < EPS && jump_to.on_spine
            };
            if is_portal {
                prop_assert!(may_be_portal, "{} -> {} should be direct", edge.from, jump_to.id);
            } else {
                prop_assert!(!needs_portal, "{} -> {} should be a portal", edge.from, jump_to.id);
            }
            if source.on_failure_path {
                prop_assert_eq!(edge.class, EdgeClass::Failure);
            }
        }
    }

    #[test]
    fn node_rectangles_never_intersect(workflow in workflow_strategy()) {
        for direction in [Direction::TopDown, Direction::LeftRight] {
            let layout = compute_layout(&workflow, direction, &LayoutConfig::default());
            for (i, a) in layout.nodes.iter().enumerate() {
                for b in &layout.nodes[i + 1..] {
                    let apart = a.x + a.width <= b.x + EPS
                        || b.x + b.width <= a.x + EPS
                        || a.y + a.height <= b.y + EPS
                        || b.y + b.height <= a.y + EPS;
                    prop_assert!(apart, "{} overlaps {}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn merge_points_wait_for_every_forward_predecessor(workflow in workflow_strategy()) {
        let config = LayoutConfig::default();
        let layout = compute_layout(&workflow, Direction::TopDown, &config);
        for id in &layout.merge_points {
            let merge = layout.node(id).unwrap();
            for edge in layout.edges.iter().filter(|e| &e.to == id && e.class == EdgeClass::Success) {
                let pred = layout.node(&edge.from).unwrap();
                if pred.y >= merge.y {
                    continue;
                }
                prop_assert!(
                    merge.y >= pred.y + pred.height + config.rank_spacing - EPS,
                    "{} placed too close after {}",
                    id,
                    pred.id
                );
            }
        }
    }

    #[test]
    fn layout_is_deterministic(workflow in workflow_strategy()) {
        let config = LayoutConfig::default();
        let first = LayoutDump::from_layout(&compute_layout(&workflow, Direction::TopDown, &config));
        let second = LayoutDump::from_layout(&compute_layout(&workflow, Direction::TopDown, &config));
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }
}
