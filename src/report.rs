//! Result and error reports.
//!
//! Everything is written as `;`-delimited text plus one JSON summary:
//!
//! ```text
//! <out>/err-knoop.csv   one row per node issue
//! <out>/err-link.csv    one row per link issue
//! <out>/err-all.csv     one row per global issue
//! <out>/results.csv     old/new number and result per node
//! <out>/adjacency.csv   99×99 matrix of links per number pair
//! <out>/usage.csv       holders and minimum reuse distance per number
//! <out>/summary.json    counts, dimensions and timestamp
//! ```
//!
//! A failed allocation has an empty `newnr` and result `failed`; it is
//! never written as 0.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alloc::{PhaseStats, Trail, UsageRegistry};
use crate::classify::{Bucket, Classification, Dimensions};
use crate::model::*;
use crate::topology::{GlobalIssue, IssueKind, LinkIssue, NodeIssue};
use crate::{Outcome, Result};

/// Delimiter of every report file.
pub const REPORT_DELIMITER: char = ';';

/// What happened to one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Ended with its legacy number.
    Kept,
    /// Had a legacy number and got a different one.
    Renumbered,
    /// Got a number without having a legacy one.
    Created,
    /// Pinned without a number, or never visited.
    Unnumbered,
    /// No candidate found.
    Failed,
    /// DEL node, inert.
    Retired,
}

impl ResultKind {
    pub fn of(node: &Node) -> Self {
        if node.status == NodeStatus::Del {
            return ResultKind::Retired;
        }
        match node.assignment {
            Assignment::Failed => ResultKind::Failed,
            Assignment::Unnumbered | Assignment::Pending => ResultKind::Unnumbered,
            Assignment::Assigned(nr) => match node.legacy_number() {
                Some(old) if old == nr => ResultKind::Kept,
                Some(_) => ResultKind::Renumbered,
                None => ResultKind::Created,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Kept => "kept",
            ResultKind::Renumbered => "renumbered",
            ResultKind::Created => "created",
            ResultKind::Unnumbered => "unnumbered",
            ResultKind::Failed => "failed",
            ResultKind::Retired => "retired",
        }
    }
}

/// Quote a cell when it holds the delimiter or a quote.
fn cell(raw: &str) -> String {
    if raw.contains(REPORT_DELIMITER) || raw.contains('"') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn row(writer: &mut dyn Write, cells: &[&str]) -> Result<()> {
    let line: Vec<String> = cells.iter().map(|c| cell(c)).collect();
    writeln!(writer, "{}", line.join(&REPORT_DELIMITER.to_string()))?;
    Ok(())
}

// ============================================================================
// Error reports
// ============================================================================

pub fn write_node_issues(writer: &mut dyn Write, issues: &[NodeIssue]) -> Result<()> {
    row(writer, &["line", "code", "id", "oldnr", "status", "msg"])?;
    for i in issues {
        let line = i.line.to_string();
        row(writer, &[&line, &i.code, &i.id, &i.old_nr, &i.status, &i.message])?;
    }
    Ok(())
}

pub fn write_link_issues(writer: &mut dyn Write, issues: &[LinkIssue]) -> Result<()> {
    row(writer, &["line", "code", "pid", "start", "end", "status", "msg"])?;
    for i in issues {
        let line = i.line.to_string();
        row(writer, &[&line, &i.code, &i.pid, &i.start, &i.end, &i.status, &i.message])?;
    }
    Ok(())
}

pub fn write_global_issues(writer: &mut dyn Write, issues: &[GlobalIssue]) -> Result<()> {
    row(writer, &["kind", "msg"])?;
    for i in issues {
        row(writer, &[i.kind.as_str(), &i.message])?;
    }
    Ok(())
}

// ============================================================================
// Allocation reports
// ============================================================================

/// One row per node in first-sighting order.
pub fn write_results(writer: &mut dyn Write, outcome: &Outcome) -> Result<()> {
    row(writer, &["code", "id", "status", "bucket", "oldnr", "newnr", "result"])?;
    for node in outcome.topology.nodes() {
        let id = node.legacy_id.to_string();
        let old_nr = node.old_nr.to_string();
        let new_nr = node.new_number().map(|nr| nr.to_string()).unwrap_or_default();
        let bucket = outcome
            .classification
            .bucket_of(node.id)
            .map(Bucket::as_str)
            .unwrap_or_default();
        row(
            writer,
            &[
                &node.code.to_string(),
                &id,
                node.status.as_str(),
                bucket,
                &old_nr,
                &new_nr,
                ResultKind::of(node).as_str(),
            ],
        )?;
    }
    Ok(())
}

/// Links realising each number pair: the claimed one plus any conflicts.
pub fn trail_counts(usage: &UsageRegistry) -> BTreeMap<Trail, usize> {
    let mut counts: BTreeMap<Trail, usize> = usage.trails().into_keys().map(|t| (t, 1)).collect();
    for conflict in usage.conflicts() {
        *counts.entry(conflict.trail).or_default() += 1;
    }
    counts
}

/// Symmetric 99×99 matrix; cell (a, b) counts links between numbers a and b.
pub fn write_adjacency(writer: &mut dyn Write, usage: &UsageRegistry) -> Result<()> {
    let counts = trail_counts(usage);
    let header: Vec<String> = std::iter::once("nr".to_string())
        .chain((1..=MAX_NUMBER).map(|nr| nr.to_string()))
        .collect();
    writeln!(writer, "{}", header.join(";"))?;
    for a in 1..=MAX_NUMBER {
        let mut line = a.to_string();
        for b in 1..=MAX_NUMBER {
            let n = counts.get(&Trail::new(a, b)).copied().unwrap_or(0);
            line.push(REPORT_DELIMITER);
            if n > 0 {
                line.push_str(&n.to_string());
            }
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Holder count and minimum reuse distance for every number 1..=99.
pub fn write_usage(writer: &mut dyn Write, usage: &UsageRegistry) -> Result<()> {
    row(writer, &["nr", "count", "min_dist_km"])?;
    for nr in 1..=MAX_NUMBER {
        let count = usage.count(nr).to_string();
        let min = usage
            .usage(nr)
            .and_then(|u| u.min_distance_km)
            .map(|d| format!("{d:.2}"))
            .unwrap_or_default();
        row(writer, &[&nr.to_string(), &count, &min])?;
    }
    Ok(())
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub nodes: usize,
    pub links: usize,
    pub global: BTreeMap<IssueKind, usize>,
}

/// Machine-readable overview of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub cutoff: String,
    pub spare_numbers: Vec<u8>,
    pub nodes: usize,
    pub links: usize,
    pub buckets: BTreeMap<Bucket, usize>,
    pub results: BTreeMap<ResultKind, usize>,
    pub dimensions: Dimensions,
    pub safe_distance_km: f64,
    pub phases: Vec<PhaseStats>,
    pub issues: IssueCounts,
}

impl RunSummary {
    pub fn collect(outcome: &Outcome) -> Self {
        let Outcome { config, topology, diagnostics, classification, allocation } = outcome;

        let mut results: BTreeMap<ResultKind, usize> = BTreeMap::new();
        for node in topology.nodes() {
            *results.entry(ResultKind::of(node)).or_default() += 1;
        }
        let mut global: BTreeMap<IssueKind, usize> = BTreeMap::new();
        for issue in &diagnostics.global {
            *global.entry(issue.kind).or_default() += 1;
        }

        Self {
            generated_at: Utc::now(),
            cutoff: config.cutoff.clone(),
            spare_numbers: config.spares().into_iter().collect(),
            nodes: topology.node_count(),
            links: topology.link_count(),
            buckets: bucket_sizes(classification),
            results,
            dimensions: classification.dimensions,
            safe_distance_km: allocation.safe_distance_km,
            phases: allocation.phases.clone(),
            issues: IssueCounts {
                nodes: diagnostics.nodes.len(),
                links: diagnostics.links.len(),
                global,
            },
        }
    }
}

fn bucket_sizes(classification: &Classification) -> BTreeMap<Bucket, usize> {
    Bucket::ORDER
        .into_iter()
        .map(|b| (b, classification.bucket(b).len()))
        .collect()
}

// ============================================================================
// Output directory
// ============================================================================

fn create(dir: &Path, name: &str) -> Result<(PathBuf, BufWriter<File>)> {
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((path, BufWriter::new(file)))
}

/// Write every report into `dir`, creating it if needed.
pub fn write_all(outcome: &Outcome, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let writers: [(&str, &dyn Fn(&mut dyn Write) -> Result<()>); 6] = [
        ("err-knoop.csv", &|w| write_node_issues(w, &outcome.diagnostics.nodes)),
        ("err-link.csv", &|w| write_link_issues(w, &outcome.diagnostics.links)),
        ("err-all.csv", &|w| write_global_issues(w, &outcome.diagnostics.global)),
        ("results.csv", &|w| write_results(w, outcome)),
        ("adjacency.csv", &|w| write_adjacency(w, &outcome.allocation.usage)),
        ("usage.csv", &|w| write_usage(w, &outcome.allocation.usage)),
    ];
    for (name, write) in writers {
        let (path, mut file) = create(dir, name)?;
        write(&mut file)?;
        file.flush()?;
        written.push(path);
    }

    let (path, mut file) = create(dir, "summary.json")?;
    serde_json::to_writer_pretty(&mut file, &RunSummary::collect(outcome))?;
    file.flush()?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "reports written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(status: NodeStatus, old_nr: u32, assignment: Assignment) -> Node {
        let mut n = Node::new(NodeId(0), "AA".parse().unwrap(), status, Position::default())
            .with_legacy(1, old_nr);
        n.assignment = assignment;
        n
    }

    #[test]
    fn test_result_kind_of_node() {
        let cases = [
            (NodeStatus::Fix, 12, Assignment::Assigned(12), ResultKind::Kept),
            (NodeStatus::In, 12, Assignment::Assigned(13), ResultKind::Renumbered),
            (NodeStatus::New, 0, Assignment::Assigned(4), ResultKind::Created),
            (NodeStatus::ExtNew, 0, Assignment::Unnumbered, ResultKind::Unnumbered),
            (NodeStatus::In, 12, Assignment::Failed, ResultKind::Failed),
            (NodeStatus::Del, 12, Assignment::Pending, ResultKind::Retired),
        ];
        for (status, old_nr, assignment, expected) in cases {
            assert_eq!(ResultKind::of(&node(status, old_nr, assignment)), expected, "{status}");
        }
    }

    #[test]
    fn test_cells_are_quoted_when_needed() {
        assert_eq!(cell("plain"), "plain");
        assert_eq!(cell("a;b"), "\"a;b\"");
        assert_eq!(cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_global_issue_rows() {
        let issues = vec![GlobalIssue { kind: IssueKind::CodeGap, message: "gap".into() }];
        let mut out = Vec::new();
        write_global_issues(&mut out, &issues).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "kind;msg\ncode_gap;gap\n");
    }

    #[test]
    fn test_usage_and_adjacency_tables() {
        let mut usage = UsageRegistry::new();
        usage.add_holder(3, NodeId(0), Position::new(0.0, 0.0));
        usage.add_holder(3, NodeId(1), Position::new(0.0, 2500.0));
        usage.claim_trail(3, 7, LinkId(0)).unwrap();
        assert!(usage.claim_trail(7, 3, LinkId(1)).is_err());

        let mut out = Vec::new();
        write_usage(&mut out, &usage).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[3], "3;2;2.50");
        assert_eq!(lines[4], "4;0;");

        let mut out = Vec::new();
        write_adjacency(&mut out, &usage).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row3: Vec<&str> = text.lines().nth(3).unwrap().split(';').collect();
        assert_eq!(row3.len(), 100);
        assert_eq!(row3[7], "2");
        assert_eq!(row3[6], "");
    }
}
