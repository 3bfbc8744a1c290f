use std::path::Path;

use arazzo_layout::config::Config;
use arazzo_layout::layout::{EdgeClass, EdgeStyle, EndReason, NodeKind, NodePayload};
use arazzo_layout::layout_dump::LayoutDump;
use arazzo_layout::{Direction, Layout, ParseError, compute_layout, parse_workflow, render_svg};

fn fixture(rel: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel);
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("fixture missing: {rel}"))
}

fn layout_fixture(rel: &str, workflow: Option<&str>, direction: Direction) -> Layout {
    let input = fixture(rel);
    let workflow = parse_workflow(&input, workflow).expect("parse failed");
    compute_layout(&workflow, direction, &Config::default().layout)
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
}

#[test]
fn render_all_fixtures() {
    let config = Config::default();
    // Keep this list explicit so new fixtures must be added intentionally.
    let candidates = [
        "checkout.yaml",
        "polling_loop.json",
        "missing_target.json5",
        "empty.json",
    ];

    for rel in candidates {
        for direction in [Direction::TopDown, Direction::LeftRight] {
            let layout = layout_fixture(rel, None, direction);
            assert!(layout.width > 0.0 && layout.height > 0.0, "{rel}: empty canvas");
            let svg = render_svg(&layout, &config.theme, &config.layout);
            assert_valid_svg(&svg, rel);
        }
    }
}

#[test]
fn every_edge_connects_existing_nodes() {
    for rel in ["checkout.yaml", "polling_loop.json", "missing_target.json5"] {
        let layout = layout_fixture(rel, None, Direction::TopDown);
        for edge in &layout.edges {
            assert!(layout.node(&edge.from).is_some(), "{rel}: dangling source {}", edge.from);
            assert!(layout.node(&edge.to).is_some(), "{rel}: dangling target {}", edge.to);
        }
    }
}

#[test]
fn checkout_resolves_components_and_retries() {
    let layout = layout_fixture("checkout.yaml", Some("checkout"), Direction::TopDown);

    assert_eq!(layout.nodes_of_kind(NodeKind::Step).count(), 6);
    assert_eq!(layout.spine.first().map(String::as_str), Some("$start"));
    assert!(layout.spine.iter().any(|id| id == "find-items"));

    let retry = layout
        .nodes_of_kind(NodeKind::Retry)
        .next()
        .expect("retry node expected");
    assert_eq!(retry.label, "Retry x3");
    let NodePayload::Retry {
        target_step_id,
        retry_after,
        retry_limit,
        target_center,
    } = &retry.payload
    else {
        panic!("retry payload expected");
    };
    assert_eq!(target_step_id, "pay");
    assert_eq!(*retry_after, Some(2.0));
    assert_eq!(*retry_limit, Some(3));
    assert_eq!(*target_center, Some(layout.node("pay").unwrap().center()));

    let pay = layout.node("pay").unwrap();
    let NodePayload::Step { operation, .. } = &pay.payload else {
        panic!("step payload expected");
    };
    assert!(operation.as_deref().unwrap().contains("~1pay"));

    let labels: Vec<&str> = layout
        .edges_from("apply-coupon$on-success")
        .filter_map(|edge| edge.label.as_deref())
        .collect();
    assert!(labels.contains(&"coupon-ok"));
    assert!(labels.contains(&"coupon-rejected"));

    let notify = layout.node("notify-customer").unwrap();
    let NodePayload::Step { operation, .. } = &notify.payload else {
        panic!("step payload expected");
    };
    assert_eq!(operation.as_deref(), Some("workflow:notifications"));
}

#[test]
fn checkout_loop_back_becomes_portal() {
    let layout = layout_fixture("checkout.yaml", None, Direction::TopDown);
    let portal = layout
        .nodes_of_kind(NodeKind::Portal)
        .find(|node| matches!(&node.payload, NodePayload::Portal(t) if t.target_id == "find-items"))
        .expect("portal back to find-items expected");
    assert_eq!(portal.label, "Go to find-items");
    assert!(
        !layout
            .edges
            .iter()
            .any(|e| e.from == "notify-customer" && e.to == "find-items")
    );
    let into_portal = layout
        .edges
        .iter()
        .find(|e| e.to == portal.id)
        .expect("edge into portal");
    assert_eq!(into_portal.style, EdgeStyle::Dotted);
}

#[test]
fn declined_payment_jumps_directly_to_notify() {
    // A short forward jump out of the failure branch stays a direct edge.
    let layout = layout_fixture("checkout.yaml", None, Direction::TopDown);
    let jump = layout
        .edges
        .iter()
        .find(|e| e.to == "notify-customer" && e.label.as_deref() == Some("declined"))
        .expect("declined edge");
    assert_eq!(jump.class, EdgeClass::Failure);
    assert_eq!(jump.style, EdgeStyle::Dashed);
    assert!(!layout.node("pay").unwrap().on_failure_path);
    assert!(layout.node(&jump.from).unwrap().on_failure_path);
}

#[test]
fn failure_edges_are_never_solid() {
    let layout = layout_fixture("checkout.yaml", None, Direction::TopDown);
    let failures: Vec<_> = layout
        .edges
        .iter()
        .filter(|e| e.class == EdgeClass::Failure)
        .collect();
    assert!(!failures.is_empty());
    assert!(failures.iter().all(|e| e.style != EdgeStyle::Solid));
}

#[test]
fn selects_workflow_by_id() {
    let layout = layout_fixture("checkout.yaml", Some("refund"), Direction::TopDown);
    assert!(layout.node("lookup").is_some());
    assert!(layout.node("pay").is_none());

    let input = fixture("checkout.yaml");
    assert!(matches!(
        parse_workflow(&input, Some("exchange")),
        Err(ParseError::UnknownWorkflow(id)) if id == "exchange"
    ));
}

#[test]
fn polling_loop_keeps_download_on_spine() {
    let layout = layout_fixture("polling_loop.json", None, Direction::TopDown);
    assert!(layout.node("download").unwrap().on_spine);
    assert!(!layout.node("wait").unwrap().on_spine);

    let check = layout.node("check-status").unwrap();
    let download = layout.node("download").unwrap();
    assert_eq!(check.center().0, download.center().0);

    let portal = layout
        .nodes_of_kind(NodeKind::Portal)
        .next()
        .expect("loop must be broken by a portal");
    let NodePayload::Portal(target) = &portal.payload else {
        panic!("portal payload expected");
    };
    assert_eq!(target.target_id, "check-status");
    assert_eq!(target.target_center, check.center());
    assert_eq!(target.class, EdgeClass::Success);

    let pending = layout
        .edges
        .iter()
        .find(|e| e.label.as_deref() == Some("pending"))
        .expect("pending branch label");
    assert_eq!(pending.to, "wait");
}

#[test]
fn horizontal_polling_loop_flows_right() {
    let layout = layout_fixture("polling_loop.json", None, Direction::LeftRight);
    let request = layout.node("request-report").unwrap();
    let check = layout.node("check-status").unwrap();
    assert!(check.x > request.x);
    assert_eq!(check.center().1, request.center().1);
}

#[test]
fn missing_targets_and_references_become_end_nodes() {
    let layout = layout_fixture("missing_target.json5", None, Direction::TopDown);

    let missing = layout
        .nodes_of_kind(NodeKind::End)
        .find(|n| matches!(&n.payload, NodePayload::End(EndReason::Missing { step_id }) if step_id == "pack-box"))
        .expect("missing step placeholder");
    assert_eq!(missing.label, "Missing step: pack-box");

    let reference = layout
        .nodes_of_kind(NodeKind::End)
        .find(|n| matches!(&n.payload, NodePayload::End(EndReason::Reference { .. })))
        .expect("workflow reference end");
    assert_eq!(reference.label, "escalate");

    // `pack` is unreachable from the start but is still laid out.
    let pick = layout.node("pick").unwrap();
    let pack = layout.node("pack").unwrap();
    assert!(pack.x >= pick.x + pick.width);
}

#[test]
fn empty_workflow_is_start_and_end() {
    let layout = layout_fixture("empty.json", None, Direction::TopDown);
    assert_eq!(layout.nodes.len(), 2);
    assert_eq!(layout.edges.len(), 1);
    let end = layout.nodes_of_kind(NodeKind::End).next().unwrap();
    assert_eq!(end.payload, NodePayload::End(EndReason::EmptyWorkflow));
}

#[test]
fn layout_dump_uses_camel_case_fields() {
    let layout = layout_fixture("checkout.yaml", None, Direction::TopDown);
    let json = LayoutDump::from_layout(&layout).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["direction"], "TD");
    let nodes = value["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), layout.nodes.len());
    assert!(nodes.iter().all(|n| n.get("onSpine").is_some()));
    assert!(nodes.iter().all(|n| n.get("onFailurePath").is_some()));
    let edges = value["edges"].as_array().unwrap();
    assert!(edges.iter().all(|e| e.get("sourceHandle").is_some() && e.get("waypoints").is_some()));
}

#[test]
fn rejects_unparseable_documents() {
    assert!(matches!(
        parse_workflow("{ \"workflows\": [", None),
        Err(ParseError::Syntax(_))
    ));
    assert!(matches!(
        parse_workflow("{ \"info\": {} }", None),
        Err(ParseError::NoWorkflows)
    ));
}
