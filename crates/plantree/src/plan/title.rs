// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Single-line operator titles, e.g. `Index Scan on Songs <Row> (Full scan, scan_method: Row)`.

use crate::plan::model::{MetadataValue, PlanNode};
use plantree_common::config::{
    ExecutionMethodFormat, KnownFlagFormat, TargetMetadataFormat, TitleFormat,
};
use std::fmt;
use std::sync::Arc;

/// Boolean flags rendered as bare labels under [`KnownFlagFormat::Label`].
const KNOWN_BOOLEAN_FLAG_KEYS: &[&str] = &["Full scan", "split_ranges_aligned"];

/// Keys naming the object an operator works on, in lookup priority order.
const TARGET_METADATA_KEYS: &[&str] = &["scan_target", "distribution_table", "table"];

/// Produces the inline stat labels appended to a node title, like `Rows=33`.
pub type InlineStatsFn = Arc<dyn Fn(&PlanNode) -> Vec<String> + Send + Sync>;

/// Title formatting plus the optional inline stats callback.
#[derive(Clone, Default)]
pub struct TitleOptions {
    pub format: TitleFormat,
    pub inline_stats: Option<InlineStatsFn>,
}

impl fmt::Debug for TitleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TitleOptions")
            .field("format", &self.format)
            .field("inline_stats", &self.inline_stats.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Renders the title of `node`.
///
/// The title is the operator clause (`call_type iterator_type scan_type display_name
/// [on target]`), the execution method in angle brackets, and a parenthesized list
/// of labels, remaining metadata fields and inline stats. Labels and fields are
/// sorted so the output does not depend on metadata order.
pub fn node_title(node: &PlanNode, opts: &TitleOptions) -> String {
    let format = &opts.format;
    let sep = if format.compact { "" } else { " " };

    let scan_type = node
        .metadata_str("scan_type")
        .map(|s| s.strip_suffix("Scan").unwrap_or(s))
        .unwrap_or("");

    let target = TARGET_METADATA_KEYS
        .iter()
        .filter_map(|key| node.metadata_str(key))
        .find(|v| !v.is_empty())
        .unwrap_or("");

    let target_part = if format.target_metadata == TargetMetadataFormat::On && !target.is_empty() {
        format!("on {}", target)
    } else {
        String::new()
    };

    let operator = join_if_not_empty(
        " ",
        &[
            node.metadata_str("call_type").unwrap_or(""),
            node.metadata_str("iterator_type").unwrap_or(""),
            scan_type,
            node.display_name.as_str(),
            target_part.as_str(),
        ],
    );

    let execution_method = node.metadata_str("execution_method").unwrap_or("");
    let execution_method_part =
        if format.execution_method == ExecutionMethodFormat::Angle && !execution_method.is_empty() {
            format!("<{}>", execution_method)
        } else {
            String::new()
        };

    let (mut labels, mut fields) = if format.hide_metadata {
        (Vec::new(), Vec::new())
    } else {
        labels_and_fields(node, format, scan_type, sep)
    };
    labels.sort();
    fields.sort();

    let inline_stats = opts
        .inline_stats
        .as_ref()
        .map(|f| f(node))
        .unwrap_or_default();

    let details = labels
        .into_iter()
        .chain(fields)
        .chain(inline_stats)
        .collect::<Vec<_>>()
        .join(&format!(",{}", sep));

    join_if_not_empty(
        sep,
        &[
            operator.as_str(),
            execution_method_part.as_str(),
            enclose_if_not_empty("(", &details, ")").as_str(),
        ],
    )
}

/// Splits the metadata not consumed by the operator clause into labels and `key: value` fields.
fn labels_and_fields(
    node: &PlanNode,
    format: &TitleFormat,
    scan_type: &str,
    sep: &str,
) -> (Vec<String>, Vec<String>) {
    let target_raw = format.target_metadata == TargetMetadataFormat::Raw;
    let mut labels = Vec::new();
    let mut fields = Vec::new();

    for (key, value) in &node.metadata {
        if matches!(value, MetadataValue::Absent) {
            continue;
        }
        match key.as_str() {
            // Rendered in the operator clause.
            "call_type" | "iterator_type" | "scan_type" => continue,
            "subquery_cluster_node" => continue,
            "scan_target" => {
                if target_raw {
                    fields.push(format!("{}: {}", scan_type, value));
                }
                continue;
            }
            "distribution_table" | "table" if !target_raw => continue,
            "execution_method" if format.execution_method != ExecutionMethodFormat::Raw => {
                continue;
            }
            _ => {}
        }

        if format.known_flag != KnownFlagFormat::Raw && KNOWN_BOOLEAN_FLAG_KEYS.contains(&key.as_str())
        {
            if value.is_true() {
                labels.push(key.clone());
            }
            continue;
        }
        fields.push(format!("{}:{}{}", key, sep, value));
    }
    (labels, fields)
}

fn enclose_if_not_empty(open: &str, input: &str, close: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    format!("{}{}{}", open, input, close)
}

fn join_if_not_empty(sep: &str, input: &[&str]) -> String {
    input
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}
