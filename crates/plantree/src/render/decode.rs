// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::plan::graph::{QueryPlan, ResolvedChildLink};
use crate::plan::model::{ChildLink, PlanNode, PlanNodeKind};
use crate::render::linearize::{FIELD_SEPARATOR, PAYLOAD_TERMINATOR};
use crate::stats::{self, ExecutionStats};
use plantree_common::{PlanError, Result};
use std::collections::BTreeMap;

/// One rendered row: a visible plan node with its branch art and operands.
#[derive(Clone, Debug, PartialEq)]
pub struct RowWithPredicates<'a> {
    pub id: u32,

    /// Branch art, one line per line of `node_text`.
    pub tree_part: String,

    /// Possibly wrapped display text of the node.
    pub node_text: String,

    /// `"<link type>: <description>"` for every predicate child.
    pub predicates: Vec<String>,

    /// Scalar children grouped by their raw link type, in link order.
    pub child_links: BTreeMap<String, Vec<ResolvedChildLink<'a>>>,

    pub execution_stats: ExecutionStats,
}

impl RowWithPredicates<'_> {
    /// Branch art and node text interleaved line by line.
    pub fn text(&self) -> String {
        let tree_lines: Vec<&str> = self.tree_part.split('\n').collect();
        let mut out = String::new();
        for (i, line) in self.node_text.split('\n').enumerate() {
            if let Some(tree_line) = tree_lines.get(i) {
                out.push_str(tree_line);
            }
            out.push_str(line);
            out.push('\n');
        }
        out.pop();
        out
    }

    /// The node index, marked with `*` if the node has predicates.
    pub fn format_id(&self) -> String {
        if self.predicates.is_empty() {
            self.id.to_string()
        } else {
            format!("*{}", self.id)
        }
    }
}

/// Splits printed tree output back into rows, in print order.
pub(crate) fn decode_rows<'a>(
    plan: &'a QueryPlan,
    rendered: &str,
    disallow_unknown_stats: bool,
) -> Result<Vec<RowWithPredicates<'a>>> {
    let record_separator = format!("{}\n", PAYLOAD_TERMINATOR);
    rendered
        .split(record_separator.as_str())
        .filter(|fragment| !fragment.trim().is_empty())
        .map(|fragment| decode_row(plan, fragment, disallow_unknown_stats))
        .collect()
}

fn decode_row<'a>(
    plan: &'a QueryPlan,
    fragment: &str,
    disallow_unknown_stats: bool,
) -> Result<RowWithPredicates<'a>> {
    let decode_error = |reason: String| PlanError::Decode {
        reason,
        fragment: fragment.to_string(),
    };

    let fields: Vec<&str> = fragment.split(FIELD_SEPARATOR).collect();
    let [branch, text_json, link_json] = fields[..] else {
        return Err(decode_error(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    };

    let node_text: String = serde_json::from_str(text_json)
        .map_err(|e| decode_error(format!("node text is not a JSON string: {}", e)))?;
    let link: Option<ChildLink> = serde_json::from_str(link_json)
        .map_err(|e| decode_error(format!("child link is not valid JSON: {}", e)))?;

    let index = link.map_or(0, |l| l.child_index);
    let node = plan
        .plan_nodes()
        .get(index as usize)
        .ok_or_else(|| decode_error(format!("no plan node with index {}", index)))?;

    Ok(RowWithPredicates {
        id: node.index,
        tree_part: branch.strip_prefix('\n').unwrap_or(branch).to_string(),
        node_text,
        predicates: predicates(plan, node),
        child_links: scalar_child_links(plan, node),
        execution_stats: stats::extract(node, disallow_unknown_stats)?,
    })
}

fn predicates(plan: &QueryPlan, node: &PlanNode) -> Vec<String> {
    node.child_links
        .iter()
        .filter(|link| plan.is_predicate(link))
        .map(|link| {
            format!(
                "{}: {}",
                link.link_type,
                plan.get_node_by_child_link(link).description()
            )
        })
        .collect()
}

fn scalar_child_links<'a>(
    plan: &'a QueryPlan,
    node: &'a PlanNode,
) -> BTreeMap<String, Vec<ResolvedChildLink<'a>>> {
    let mut grouped: BTreeMap<String, Vec<ResolvedChildLink<'a>>> = BTreeMap::new();
    for link in &node.child_links {
        let resolved = plan.resolve_child_link(link);
        if resolved.child.kind == PlanNodeKind::Scalar {
            grouped
                .entry(link.link_type.clone())
                .or_default()
                .push(resolved);
        }
    }
    grouped
}
