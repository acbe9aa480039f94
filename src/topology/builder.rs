//! Topology builder and validator.
//!
//! Consumes node rows, then link rows, and keeps every row-level problem
//! as a [`Diagnostics`] entry instead of failing. Only a malformed
//! configuration is fatal, and that is caught in [`TopologyBuilder::new`].

use tracing::{debug, info};

use super::diagnostics::{Diagnostics, IssueKind};
use super::records::{LinkRecord, NodeRecord, NODE_CODE};
use super::Topology;
use crate::config::RenumConfig;
use crate::ingest::{ParseContext, Record, RecordSource};
use crate::model::*;
use crate::Result;

/// Incremental builder of a [`Topology`].
pub struct TopologyBuilder {
    cutoff: Code,
    min_link_km: f64,
    max_link_km: f64,
    topology: Topology,
    diagnostics: Diagnostics,
}

impl TopologyBuilder {
    /// Fails on a malformed cutoff code or bad length bounds.
    pub fn new(config: &RenumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cutoff: config.cutoff_code()?,
            min_link_km: config.min_link_km,
            max_link_km: config.max_link_km,
            topology: Topology::default(),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Drain a node source. Returns the number of rows read.
    pub async fn load_nodes<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<usize> {
        let mut ctx = ParseContext::new(source.name());
        let mut rows = 0;
        while let Some(record) = source.next_record().await? {
            ctx.advance();
            if record.is_blank() {
                continue;
            }
            self.add_node(&ctx, &record);
            rows += 1;
        }
        info!(source = %ctx.source, rows, nodes = self.topology.node_count(), "nodes loaded");
        Ok(rows)
    }

    /// Drain a link source. Call only after every node source is loaded.
    pub async fn load_links<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<usize> {
        let mut ctx = ParseContext::new(source.name());
        let mut rows = 0;
        while let Some(record) = source.next_record().await? {
            ctx.advance();
            if record.is_blank() {
                continue;
            }
            self.add_link(&ctx, &record);
            rows += 1;
        }
        info!(source = %ctx.source, rows, links = self.topology.link_count(), "links loaded");
        Ok(rows)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Validate and merge one node row.
    pub fn add_node(&mut self, ctx: &ParseContext, record: &Record) {
        if is_empty_code(record.text(NODE_CODE)) {
            self.diagnostics.raw_node(ctx, record, "no code for node");
            return;
        }
        let rec = match NodeRecord::decode(record) {
            Ok(rec) => rec,
            Err(e) => {
                self.diagnostics.raw_node(ctx, record, e.to_string());
                return;
            }
        };

        if let Some(id) = self.topology.node_id(rec.code) {
            self.merge_node(ctx, id, rec);
            return;
        }

        let mut node = Node::new(NodeId(0), rec.code, rec.status, rec.position)
            .with_legacy(rec.legacy_id, rec.old_nr)
            .with_network(rec.network);
        node.lat_lon = rec.lat_lon;
        node.line = ctx.line;

        let id = self.topology.push_node(node);
        *self.topology.node_histogram.entry(rec.status).or_default() += 1;
        self.topology.envelope.extend(rec.position);
        self.check_node(ctx, id);
    }

    /// A repeated code must agree on id, number and status.
    fn merge_node(&mut self, ctx: &ParseContext, id: NodeId, rec: NodeRecord) {
        let existing = self.topology.node(id);
        if existing.legacy_id != rec.legacy_id
            || existing.old_nr != rec.old_nr
            || existing.status != rec.status
        {
            let message = format!(
                "matching node for code does not match id ({}) old nr ({}) or status [{}]",
                existing.legacy_id, existing.old_nr, existing.status
            );
            let mut seen = existing.clone();
            seen.legacy_id = rec.legacy_id;
            seen.old_nr = rec.old_nr;
            seen.status = rec.status;
            self.diagnostics.node(ctx.line, &seen, message);
            return;
        }
        let node = self.topology.node_mut(id);
        if !node.networks.contains(&rec.network) {
            node.networks.push(rec.network);
        }
        debug!(code = %node.code, networks = node.networks.len(), "node merged across networks");
    }

    fn check_node(&mut self, ctx: &ParseContext, id: NodeId) {
        let cutoff = self.cutoff;
        let node = self.topology.node(id).clone();
        let code = node.code;

        self.topology.max_code = self.topology.max_code.max(Some(code));

        if node.status.has_new_code() {
            self.topology.min_new_code = Some(match self.topology.min_new_code {
                Some(min) => min.min(code),
                None => code,
            });
            if code < cutoff {
                self.diagnostics.node(
                    ctx.line,
                    &node,
                    format!(
                        "node in status {} should have code beyond '{cutoff}'({})",
                        node.status,
                        cutoff.value()
                    ),
                );
            }
        } else {
            self.topology.max_existing_code = self.topology.max_existing_code.max(Some(code));
            if code > cutoff {
                self.diagnostics.node(
                    ctx.line,
                    &node,
                    format!(
                        "node in status {} should have code before '{cutoff}'({})",
                        node.status,
                        cutoff.value()
                    ),
                );
            }
        }

        match node.status {
            NodeStatus::New => {
                if node.legacy_id != 0 || node.old_nr != 0 {
                    let message = "node in status NEW should have id and old nr == 0";
                    self.diagnostics.node(ctx.line, &node, message);
                    self.topology.node_mut(id).quarantined = true;
                }
            }
            NodeStatus::FixNew => {
                if node.legacy_number().is_none() {
                    let message = "node in status FIXNEW needs a pinned number in 1..=99";
                    self.diagnostics.node(ctx.line, &node, message);
                }
            }
            status if status.requires_legacy() => {
                if node.legacy_id == 0 || node.old_nr == 0 {
                    self.diagnostics.node(
                        ctx.line,
                        &node,
                        format!("node in status {status} should not have id or old nr == 0"),
                    );
                } else if node.legacy_number().is_none() {
                    self.diagnostics.node(ctx.line, &node, "legacy number outside 1..=99");
                }
            }
            _ => {}
        }

        if node.status.is_reference_candidate() {
            let further_south = match self.topology.reference {
                None => true,
                Some(r) => node.position.y < self.topology.node(r).position.y,
            };
            if further_south {
                self.topology.reference = Some(id);
            }
        }
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Validate, reconcile or merge one link row, then connect its endpoints.
    pub fn add_link(&mut self, ctx: &ParseContext, record: &Record) {
        let rec = match LinkRecord::decode(record) {
            Ok(rec) => rec,
            Err(e) => {
                self.diagnostics.raw_link(ctx, record, e.to_string());
                return;
            }
        };

        if !rec.has_endpoints() {
            if rec.status != LinkStatus::Niv {
                self.diagnostics.raw_link(
                    ctx,
                    record,
                    format!("no start or end code for link '{}' --> '{}'", rec.start, rec.end),
                );
            }
            return;
        }

        let (Ok(a), Ok(b)) = (rec.start.parse::<Code>(), rec.end.parse::<Code>()) else {
            self.diagnostics.raw_link(
                ctx,
                record,
                format!("malformed code in link '{}' --> '{}'", rec.start, rec.end),
            );
            return;
        };
        let Some(key) = LinkKey::new(a, b) else {
            let message = format!("invalid link: start code == end code '{a}'");
            self.diagnostics.raw_link(ctx, record, message);
            return;
        };
        let Some(start) = self.topology.node_id(key.low) else {
            let message = format!("start code '{}' doesn't point to a known node", key.low);
            self.diagnostics.raw_link(ctx, record, message);
            return;
        };
        let Some(end) = self.topology.node_id(key.high) else {
            let message = format!("end code '{}' doesn't point to a known node", key.high);
            self.diagnostics.raw_link(ctx, record, message);
            return;
        };
        if rec.status == LinkStatus::Niv {
            self.diagnostics.raw_link(ctx, record, "skip link in status NIV");
            return;
        }

        let candidate = Link {
            id: LinkId(0),
            key,
            pid: rec.pid,
            status: rec.status,
            start,
            end,
            centroid: rec.centroid,
            networks: std::iter::once(rec.network).collect(),
            linked: false,
            line: ctx.line,
        };

        match self.topology.link_id(key) {
            Some(existing) => self.merge_link(ctx, existing, candidate),
            None => self.insert_link(ctx, candidate),
        }
    }

    fn insert_link(&mut self, ctx: &ParseContext, link: Link) {
        self.check_link(ctx, &link);

        let status = link.status;
        let (start, end) = (link.start, link.end);
        let id = self.topology.push_link(link);
        *self.topology.link_histogram.entry(status).or_default() += 1;

        if status.forces_change() {
            self.mark_must_change(start, end);
        }
        if status != LinkStatus::Del {
            self.connect(ctx, id);
        }
    }

    /// A repeated key either reconciles a DEL/NEW replacement or must agree.
    fn merge_link(&mut self, ctx: &ParseContext, id: LinkId, seen: Link) {
        let existing = self.topology.link(id).clone();
        let replacement = matches!(
            (existing.status, seen.status),
            (LinkStatus::Del, LinkStatus::New) | (LinkStatus::New, LinkStatus::Del)
        );

        if replacement {
            if seen.status == LinkStatus::New && !seen.pid.is_empty() {
                self.diagnostics.link(ctx, &seen, "new links should not have a pid");
            }
            let link = self.topology.link_mut(id);
            link.status = LinkStatus::New;
            link.pid.clear();
            if seen.status == LinkStatus::New {
                link.centroid = seen.centroid;
            }
            for net in seen.networks {
                if !link.networks.contains(&net) {
                    link.networks.push(net);
                }
            }
            debug!(key = %existing.key, "DEL/NEW pair reconciled into one NEW link");
            // A NEW row seen first was checked on insert.
            if existing.status == LinkStatus::Del {
                let reconciled = self.topology.link(id).clone();
                self.check_link(ctx, &reconciled);
            }
            self.mark_must_change(existing.start, existing.end);
            if !self.topology.link(id).linked {
                self.connect(ctx, id);
            }
            return;
        }

        if existing.pid != seen.pid || existing.status != seen.status {
            self.diagnostics.link(
                ctx,
                &seen,
                format!(
                    "matching link for code does not match pid ({}) or status [{}]",
                    existing.pid, existing.status
                ),
            );
            return;
        }

        let link = self.topology.link_mut(id);
        for net in seen.networks {
            if !link.networks.contains(&net) {
                link.networks.push(net);
            }
        }
    }

    fn check_link(&mut self, ctx: &ParseContext, link: &Link) {
        let start = self.topology.node(link.start).clone();
        let end = self.topology.node(link.end).clone();

        if link.status.checks_pid() {
            let expected = pid_for(start.legacy_id, end.legacy_id);
            if link.pid != expected {
                self.diagnostics.link(
                    ctx,
                    link,
                    format!(
                        "pid {{{}}} doesn't match the start-end ids {{{expected}}} \
                         for link from '{}'{{{}}} to '{}'{{{}}}",
                        link.pid,
                        start.code,
                        start.legacy_id,
                        end.code,
                        end.legacy_id
                    ),
                );
            }
        }

        if link.status == LinkStatus::New {
            if !link.pid.is_empty() {
                self.diagnostics.link(ctx, link, "new links should not have a pid");
            }
        } else if start.status == NodeStatus::New || end.status == NodeStatus::New {
            self.diagnostics.link(ctx, link, "link should be NEW if one of its endpoints is NEW");
        }

        if (start.status == NodeStatus::Del || end.status == NodeStatus::Del)
            && link.status != LinkStatus::Del
        {
            let message = "links touching a node in status DEL should be DEL too";
            self.diagnostics.link(ctx, link, message);
        }

        if link.status == LinkStatus::Del {
            return;
        }

        if !link.centroid.is_between(&start.position, &end.position) {
            self.diagnostics.link(ctx, link, "link centroid not between start and end");
        }

        let length = start.position.distance_km(&end.position);
        if !(self.min_link_km..self.max_link_km).contains(&length) {
            self.diagnostics.link(
                ctx,
                link,
                format!(
                    "link length {length:.3} km outside [{}, {}) km",
                    self.min_link_km, self.max_link_km
                ),
            );
        }
    }

    fn mark_must_change(&mut self, start: NodeId, end: NodeId) {
        self.topology.node_mut(start).must_change = true;
        self.topology.node_mut(end).must_change = true;
    }

    /// Add the link to both adjacency maps unless that would duplicate a pair.
    fn connect(&mut self, ctx: &ParseContext, id: LinkId) {
        let link = self.topology.link(id).clone();
        let start = self.topology.node(link.start);
        let end = self.topology.node(link.end);

        for node in [start, end] {
            if node.quarantined {
                let message =
                    format!("endpoint '{}' failed validation; link not connected", node.code);
                self.diagnostics.link(ctx, &link, message);
                return;
            }
        }
        if start.adjacency.contains_key(&end.code) {
            let message =
                format!("start at '{}' already has link to target '{}'", start.code, end.code);
            self.diagnostics.link(ctx, &link, message);
            return;
        }
        if end.adjacency.contains_key(&start.code) {
            let message =
                format!("end at '{}' already has link from target '{}'", end.code, start.code);
            self.diagnostics.link(ctx, &link, message);
            return;
        }

        let (start_code, end_code) = (start.code, end.code);
        self.topology.node_mut(link.start).adjacency.insert(
            end_code,
            Adjacent { link: id, node: link.end, direction: Direction::Outgoing },
        );
        self.topology.node_mut(link.end).adjacency.insert(
            start_code,
            Adjacent { link: id, node: link.start, direction: Direction::Incoming },
        );
        self.topology.link_mut(id).linked = true;
    }

    // ========================================================================
    // Post-load checks
    // ========================================================================

    /// Run the whole-network checks and hand over the result.
    pub fn finish(mut self) -> (Topology, Diagnostics) {
        self.check_cutoff_order();
        self.check_code_gaps();

        let topo = &self.topology;
        info!(
            nodes = topo.node_count(),
            links = topo.link_count(),
            node_issues = self.diagnostics.nodes.len(),
            link_issues = self.diagnostics.links.len(),
            "topology built"
        );
        info!("count node by status: {:?}", topo.node_histogram);
        info!("count link by status: {:?}", topo.link_histogram);

        (self.topology, self.diagnostics)
    }

    /// Every new code must sort after every existing code.
    fn check_cutoff_order(&mut self) {
        if let (Some(max_existing), Some(min_new)) =
            (self.topology.max_existing_code, self.topology.min_new_code)
        {
            if max_existing > min_new {
                self.diagnostics.global(
                    IssueKind::CutoffOrder,
                    format!(
                        "all new codes should come after existing codes: \
                         biggest existing code '{max_existing}'({}) > \
                         smallest new code '{min_new}'({})",
                        max_existing.value(),
                        min_new.value()
                    ),
                );
            }
        }
    }

    /// Report each run of unused codes below the highest code.
    fn check_code_gaps(&mut self) {
        let Some(max) = self.topology.max_code else {
            return;
        };
        let mut gap_start: Option<u16> = None;
        for value in 0..=max.value() {
            let used = Code::from_value(value).is_some_and(|c| self.topology.contains_code(c));
            match (used, gap_start) {
                (false, None) => gap_start = Some(value),
                (true, Some(first)) => {
                    self.report_gap(first, value - 1);
                    gap_start = None;
                }
                _ => {}
            }
        }
    }

    fn report_gap(&mut self, first: u16, last: u16) {
        let (Some(a), Some(b)) = (Code::from_value(first), Code::from_value(last)) else {
            return;
        };
        self.diagnostics.global(
            IssueKind::CodeGap,
            format!("gap in codes from '{a}'({first}) to '{b}'({last}) inclusive"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::records::*;

    fn builder() -> TopologyBuilder {
        TopologyBuilder::new(&RenumConfig { cutoff: "AZ".into(), ..Default::default() }).unwrap()
    }

    fn node_row(code: &str, status: &str, id: u64, nr: u32, x: f64, y: f64) -> Record {
        Record::new()
            .with(NODE_X, x.to_string())
            .with(NODE_Y, y.to_string())
            .with(NODE_ID, id.to_string())
            .with(NODE_NR, nr.to_string())
            .with(NODE_NETWORK, "1")
            .with(NODE_CODE, code)
            .with(NODE_STATUS, status)
    }

    fn link_row(a: &str, b: &str, status: &str, pid: &str, x: f64, y: f64) -> Record {
        Record::new()
            .with(LINK_X, x.to_string())
            .with(LINK_Y, y.to_string())
            .with(LINK_NETWORK, "1")
            .with(LINK_PID, pid)
            .with(LINK_STATUS, status)
            .with(LINK_START, a)
            .with(LINK_END, b)
    }

    fn ctx(line: usize) -> ParseContext {
        ParseContext { source: "test".into(), line }
    }

    #[test]
    fn test_bad_cutoff_is_fatal() {
        let config = RenumConfig { cutoff: "A".into(), ..Default::default() };
        assert!(TopologyBuilder::new(&config).is_err());
    }

    #[test]
    fn test_repeat_code_merges_networks() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 10, 5, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AA", "FIX", 10, 5, 0.0, 0.0).with(NODE_NETWORK, "2"));
        let node = b.topology().node_by_code("AA".parse().unwrap()).unwrap();
        assert_eq!(node.networks.as_slice(), ["1", "2"]);
        assert!(b.diagnostics().is_clean());
    }

    #[test]
    fn test_repeat_code_mismatch_refused() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 10, 5, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AA", "IN", 10, 5, 0.0, 0.0).with(NODE_NETWORK, "2"));
        let node = b.topology().node_by_code("AA".parse().unwrap()).unwrap();
        assert_eq!(node.networks.len(), 1);
        assert_eq!(b.diagnostics().nodes.len(), 1);
        assert_eq!(b.diagnostics().nodes[0].line, 3);
    }

    #[test]
    fn test_rejected_and_empty_rows() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AB", "TODO", 1, 1, 0.0, 0.0));
        assert_eq!(b.topology().node_count(), 0);
        let messages: Vec<_> = b.diagnostics().nodes.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, ["no code for node", "status 'TODO' is not accepted"]);
    }

    #[test]
    fn test_cutoff_side_checks() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("BA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AC", "NEW", 0, 0, 0.0, 0.0));
        assert_eq!(b.diagnostics().nodes.len(), 2);
        let (_, diag) = b.finish();
        assert_eq!(diag.count(IssueKind::CutoffOrder), 1);
    }

    #[test]
    fn test_new_node_with_legacy_is_quarantined() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("BA", "NEW", 77, 0, 100.0, 100.0));
        b.add_link(&ctx(2), &link_row("AA", "BA", "NEW", "", 50.0, 50.0));

        let topo = b.topology();
        let new = topo.node_by_code("BA".parse().unwrap()).unwrap();
        assert!(new.quarantined);
        assert!(new.adjacency.is_empty());
        assert_eq!(topo.link_count(), 1);
        assert!(!topo.links().next().unwrap().linked);
        assert_eq!(b.diagnostics().nodes.len(), 1);
        assert_eq!(b.diagnostics().links.len(), 1);
    }

    #[test]
    fn test_reference_is_southernmost_existing() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 500.0));
        b.add_node(&ctx(3), &node_row("AB", "IN", 2, 2, 0.0, 100.0));
        b.add_node(&ctx(4), &node_row("BA", "NEW", 0, 0, 0.0, 0.0));
        let topo = b.topology();
        assert_eq!(topo.node(topo.reference.unwrap()).code.to_string(), "AB");
    }

    #[test]
    fn test_code_gaps_reported() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AE", "FIX", 2, 2, 0.0, 0.0));
        let (_, diag) = b.finish();
        assert_eq!(diag.count(IssueKind::CodeGap), 1);
        assert_eq!(diag.global[0].message, "gap in codes from 'AB'(1) to 'AD'(3) inclusive");
    }

    #[test]
    fn test_link_validation() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AB", "FIX", 2, 2, 1000.0, 0.0));
        b.add_link(&ctx(2), &link_row("AA", "AA", "IN", "1-1", 0.0, 0.0));
        b.add_link(&ctx(3), &link_row("AA", "ZZ", "IN", "1-9", 0.0, 0.0));
        b.add_link(&ctx(4), &link_row("AB", "AA", "IN", "2-1", 5000.0, 0.0));
        b.add_link(&ctx(5), &link_row("", "AA", "NIV", "", 0.0, 0.0));

        let messages: Vec<_> = b.diagnostics().links.iter().map(|i| i.message.clone()).collect();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].starts_with("invalid link"));
        assert!(messages[1].contains("doesn't point to a known node"));
        assert!(messages[2].starts_with("pid {2-1}"));
        assert_eq!(messages[3], "link centroid not between start and end");

        let link = b.topology().links().next().unwrap();
        assert_eq!(link.key.to_string(), "AA-AB");
        assert!(link.linked);
    }

    #[test]
    fn test_pid_follows_text_order_of_ids() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 99, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AB", "FIX", 100, 2, 1000.0, 0.0));
        b.add_link(&ctx(2), &link_row("AA", "AB", "IN", "100-99", 500.0, 0.0));
        assert!(b.diagnostics().links.is_empty(), "{:?}", b.diagnostics().links);
    }

    #[test]
    fn test_del_new_pair_reconciles() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AB", "FIX", 2, 2, 1000.0, 0.0));
        b.add_link(&ctx(2), &link_row("AA", "AB", "DEL", "1-2", 500.0, 0.0));
        b.add_link(&ctx(3), &link_row("AB", "AA", "NEW", "", 500.0, 0.0));

        assert!(b.diagnostics().links.is_empty());
        let topo = b.topology();
        assert_eq!(topo.link_count(), 1);
        let link = topo.links().next().unwrap();
        assert_eq!(link.status, LinkStatus::New);
        assert!(link.linked);
        assert!(topo.nodes().all(|n| n.must_change && n.degree() == 1));
    }

    #[test]
    fn test_reconciled_link_is_validated_as_new() {
        let config = RenumConfig { cutoff: "AZ".into(), max_link_km: 2.0, ..Default::default() };
        let del = link_row("AA", "AB", "DEL", "1-2", 50_000.0, 0.0);
        let new = link_row("AB", "AA", "NEW", "", 999_999.0, 999_999.0);

        for rows in [[del.clone(), new.clone()], [new, del]] {
            let mut b = TopologyBuilder::new(&config).unwrap();
            b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
            b.add_node(&ctx(3), &node_row("AB", "DEL", 2, 2, 100_000.0, 0.0));
            for (i, row) in rows.iter().enumerate() {
                b.add_link(&ctx(i + 2), row);
            }

            let link = b.topology().links().next().unwrap();
            assert_eq!(link.status, LinkStatus::New);
            let messages: Vec<_> =
                b.diagnostics().links.iter().map(|i| i.message.as_str()).collect();
            assert_eq!(messages.len(), 3, "{messages:?}");
            assert_eq!(messages[0], "links touching a node in status DEL should be DEL too");
            assert_eq!(messages[1], "link centroid not between start and end");
            assert!(messages[2].starts_with("link length 100.000 km outside"));
        }
    }

    #[tokio::test]
    async fn test_blank_rows_skipped_but_counted() {
        let mut b = builder();
        let rows = vec![
            node_row("AA", "FIX", 1, 1, 0.0, 0.0),
            Record::new().with(NODE_X, ""),
            node_row("AB", "TODO", 2, 2, 0.0, 0.0),
        ];
        let mut source = crate::ingest::MemorySource::new("knoop", rows);
        let read = b.load_nodes(&mut source).await.unwrap();

        assert_eq!(read, 2);
        assert_eq!(b.topology().node_count(), 1);
        let issues = &b.diagnostics().nodes;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 4);
        assert_eq!(issues[0].message, "status 'TODO' is not accepted");
    }

    #[test]
    fn test_repeat_link_mismatch_reported() {
        let mut b = builder();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AB", "FIX", 2, 2, 1000.0, 0.0));
        b.add_link(&ctx(2), &link_row("AA", "AB", "IN", "1-2", 500.0, 0.0));
        b.add_link(&ctx(3), &link_row("AA", "AB", "IN", "1-3", 500.0, 0.0));
        b.add_link(&ctx(4), &link_row("AA", "AB", "IN", "1-2", 500.0, 0.0).with(LINK_NETWORK, "9"));

        assert_eq!(b.diagnostics().links.len(), 1);
        let link = b.topology().links().next().unwrap();
        assert_eq!(link.networks.as_slice(), ["1", "9"]);
    }

    #[test]
    fn test_link_length_bounds() {
        let config = RenumConfig {
            cutoff: "AZ".into(),
            min_link_km: 0.1,
            max_link_km: 2.0,
            ..Default::default()
        };
        let mut b = TopologyBuilder::new(&config).unwrap();
        b.add_node(&ctx(2), &node_row("AA", "FIX", 1, 1, 0.0, 0.0));
        b.add_node(&ctx(3), &node_row("AB", "FIX", 2, 2, 5000.0, 0.0));
        b.add_node(&ctx(4), &node_row("AC", "FIX", 3, 3, 5000.0, 50.0));
        b.add_link(&ctx(2), &link_row("AA", "AB", "IN", "1-2", 2500.0, 0.0));
        b.add_link(&ctx(3), &link_row("AB", "AC", "IN", "2-3", 5000.0, 25.0));
        b.add_link(&ctx(4), &link_row("AA", "AC", "DEL", "1-3", 2500.0, 25.0));
        let lines: Vec<_> = b.diagnostics().links.iter().map(|i| i.line).collect();
        assert_eq!(lines, [2, 3]);
    }
}
