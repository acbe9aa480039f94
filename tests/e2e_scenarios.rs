//! End-to-end scenarios: reuse distance between fixed nodes, DEL/NEW link
//! replacement, inconsistent NEW nodes and an exhausted label space.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use renum::model::{pid_for, value_to_code};
use renum::topology::records::*;
use renum::{
    Assignment, Bucket, IssueKind, LinkStatus, MemorySource, Outcome, Record, RenumConfig,
    Renumberer, ResultKind,
};

// ============================================================================
// Helper: network builder that derives pids and centroids
// ============================================================================

#[derive(Default)]
struct Net {
    nodes: Vec<Record>,
    links: Vec<Record>,
    known: HashMap<String, (u64, f64, f64)>,
}

impl Net {
    fn node(mut self, code: &str, status: &str, id: u64, nr: u32, x: f64, y: f64) -> Self {
        self.known.insert(code.to_string(), (id, x, y));
        self.nodes.push(
            Record::new()
                .with(NODE_X, x.to_string())
                .with(NODE_Y, y.to_string())
                .with(NODE_ID, id.to_string())
                .with(NODE_NR, nr.to_string())
                .with(NODE_NETWORK, "1")
                .with(NODE_CODE, code)
                .with(NODE_STATUS, status),
        );
        self
    }

    fn link(mut self, a: &str, b: &str, status: &str) -> Self {
        let (ia, xa, ya) = self.known[a];
        let (ib, xb, yb) = self.known[b];
        let pid = if status == "NEW" { String::new() } else { pid_for(ia, ib) };
        self.links.push(
            Record::new()
                .with(LINK_X, ((xa + xb) / 2.0).to_string())
                .with(LINK_Y, ((ya + yb) / 2.0).to_string())
                .with(LINK_NETWORK, "1")
                .with(LINK_PID, pid)
                .with(LINK_STATUS, status)
                .with(LINK_START, a)
                .with(LINK_END, b),
        );
        self
    }

    async fn run(self, config: RenumConfig) -> Outcome {
        let mut renum = Renumberer::new(config).unwrap();
        let mut nodes = MemorySource::new("knoop", self.nodes);
        let mut links = MemorySource::new("link", self.links);
        renum.load(&mut nodes, &mut links).await.unwrap();
        renum.run()
    }
}

fn reuse(km: f64) -> RenumConfig {
    RenumConfig { min_reuse_km: Some(km), ..Default::default() }
}

// ============================================================================
// 1. Two fixed nodes holding the same number
// ============================================================================

#[tokio::test]
async fn test_same_number_far_enough_apart() {
    let outcome = Net::default()
        .node("AA", "FIX", 1, 7, 0.0, 0.0)
        .node("AB", "FIX", 2, 7, 2000.0, 0.0)
        .run(reuse(1.5))
        .await;

    assert_eq!(outcome.number("AA"), Some(7));
    assert_eq!(outcome.number("AB"), Some(7));
    assert_eq!(outcome.diagnostics.count(IssueKind::ReuseDistance), 0);
    let usage = outcome.allocation.usage.usage(7).unwrap();
    assert_eq!(usage.holders.len(), 2);
    assert!((usage.min_distance_km.unwrap() - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_same_number_too_close_is_a_soft_violation() {
    let outcome = Net::default()
        .node("AA", "FIX", 1, 7, 0.0, 0.0)
        .node("AB", "FIX", 2, 7, 500.0, 0.0)
        .run(reuse(1.5))
        .await;

    assert_eq!(outcome.number("AA"), Some(7));
    assert_eq!(outcome.number("AB"), Some(7));
    assert_eq!(outcome.diagnostics.count(IssueKind::ReuseDistance), 1);
}

#[tokio::test]
async fn test_same_number_too_close_is_separated_when_searchable() {
    let outcome = Net::default()
        .node("AA", "FIX", 1, 7, 0.0, 0.0)
        .node("AB", "FIX", 2, 7, 500.0, 0.0)
        .node("ZA", "NEW", 0, 0, 250.0, 1000.0)
        .link("AA", "ZA", "NEW")
        .link("AB", "ZA", "NEW")
        .run(reuse(1.5))
        .await;

    assert_eq!(outcome.classification.bucket(Bucket::TryKeep).len(), 2);
    assert_eq!(outcome.number("AA"), Some(7));
    assert_ne!(outcome.number("AB"), Some(7));
    assert_eq!(outcome.result("AB"), Some(ResultKind::Renumbered));
    assert_eq!(outcome.diagnostics.count(IssueKind::ReuseDistance), 0);
}

// ============================================================================
// 2. DEL/NEW replacement on the same pair
// ============================================================================

#[tokio::test]
async fn test_new_link_replacing_del_link_reconciles() {
    let outcome = Net::default()
        .node("AA", "FIX", 1, 10, 0.0, 0.0)
        .node("AB", "FIX", 2, 20, 1000.0, 0.0)
        .link("AA", "AB", "DEL")
        .link("AB", "AA", "NEW")
        .run(reuse(0.5))
        .await;

    assert!(outcome.diagnostics.links.is_empty(), "{:?}", outcome.diagnostics.links);
    assert_eq!(outcome.topology.link_count(), 1);
    let link = outcome.topology.links().next().unwrap();
    assert_eq!(link.status, LinkStatus::New);
    assert!(link.pid.is_empty());
    assert!(link.linked);
    assert!(outcome.topology.nodes().all(|n| n.must_change));
}

// ============================================================================
// 3. NEW node carrying a legacy id
// ============================================================================

#[tokio::test]
async fn test_new_node_with_legacy_id_is_isolated() {
    let outcome = Net::default()
        .node("AA", "FIX", 1, 10, 0.0, 0.0)
        .node("AB", "FIX", 2, 20, 1000.0, 0.0)
        .node("ZA", "NEW", 77, 0, 500.0, 1000.0)
        .link("AA", "AB", "IN")
        .link("AA", "ZA", "NEW")
        .run(reuse(0.5))
        .await;

    let za = outcome.node("ZA").unwrap();
    assert!(za.quarantined);
    assert_eq!(za.degree(), 0);
    assert_eq!(outcome.node("AA").unwrap().degree(), 1);

    let issue = outcome.diagnostics.nodes.iter().find(|i| i.code == "ZA").unwrap();
    assert_eq!(issue.message, "node in status NEW should have id and old nr == 0");
    assert_eq!(issue.id, "77");
    assert!(outcome
        .diagnostics
        .links
        .iter()
        .any(|i| i.code == "AA-ZA" && i.message.contains("not connected")));

    // Still reported and numbered.
    assert_eq!(outcome.topology.node_count(), 3);
    assert_eq!(outcome.result("ZA"), Some(ResultKind::Created));
}

// ============================================================================
// 4. Exhausted label space
// ============================================================================

/// Hub AA (TRY-KEEP, legacy 5) surrounded by 99 KEEP neighbours holding
/// every number, plus one NEW node touching the hub.
fn saturated_hub() -> Net {
    let mut net = Net::default().node("AA", "FIX", 1000, 5, 0.0, 0.0);
    for v in 1..=99u16 {
        let angle = f64::from(v) * std::f64::consts::TAU / 99.0;
        let code = value_to_code(v).unwrap();
        let (x, y) = (angle.cos() * 1000.0, angle.sin() * 1000.0);
        net = net.node(&code, "FIX", u64::from(v), u32::from(v), x, y);
        net = net.link("AA", &code, "IN");
    }
    net.node("ZA", "NEW", 0, 0, 0.0, -1500.0).link("AA", "ZA", "NEW")
}

#[tokio::test]
async fn test_exhausted_try_keep_node_fails_loudly() {
    let outcome = saturated_hub().run(reuse(0.1)).await;

    let hub = outcome.node("AA").unwrap();
    assert_eq!(outcome.classification.bucket_of(hub.id), Some(Bucket::TryKeep));
    assert!(hub.legacy_rejected);
    assert_eq!(hub.assignment, Assignment::Failed);
    assert_eq!(outcome.result("AA"), Some(ResultKind::Failed));
    assert_eq!(outcome.allocation.failed, [hub.id]);
    assert_eq!(outcome.diagnostics.count(IssueKind::AllocationFailed), 1);

    // The NEW node beside the failed hub is still numbered.
    assert!(outcome.number("ZA").is_some());
}

#[tokio::test]
async fn test_failed_node_is_written_without_number() {
    let outcome = saturated_hub().run(reuse(0.1)).await;
    let mut out = Vec::new();
    renum::report::write_results(&mut out, &outcome).unwrap();
    let text = String::from_utf8(out).unwrap();
    let hub = text.lines().find(|l| l.starts_with("AA;")).unwrap();
    assert_eq!(hub, "AA;1000;FIX;try-keep;5;;failed");

    let summary = outcome.summary();
    assert_eq!(summary.results.get(&ResultKind::Failed), Some(&1));
    assert_eq!(summary.phases[2].failed, 1);
}
