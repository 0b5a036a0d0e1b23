// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Typed view over the untyped execution statistics attached to profiled plan nodes.
//!
//! Every statistic arrives as a string (`{"total": "33", "unit": "rows"}`), so the
//! typed aggregate keeps them as strings and leaves interpretation to the caller.

use crate::plan::model::PlanNode;
use plantree_common::{PlanError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One bucket of a statistic's histogram.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramBucket {
    pub count: String,
    pub lower_bound: String,
    pub percentage: String,
    pub upper_bound: String,
}

/// A single aggregated statistic such as `rows` or `latency`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionStatsValue {
    pub total: String,
    pub unit: String,
    pub mean: String,
    pub std_deviation: String,
    pub histogram: Vec<HistogramBucket>,
}

impl ExecutionStatsValue {
    /// Resolves one field name as used in column templates.
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "Total" => Some(self.total.clone()),
            "Unit" => Some(self.unit.clone()),
            "Mean" => Some(self.mean.clone()),
            "StdDeviation" => Some(self.std_deviation.clone()),
            _ => None,
        }
    }
}

/// `"<total> <unit>"`, `total` alone without a unit, or nothing without a total.
impl fmt::Display for ExecutionStatsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.total.is_empty(), self.unit.is_empty()) {
            (true, _) => Ok(()),
            (false, true) => f.write_str(&self.total),
            (false, false) => write!(f, "{} {}", self.total, self.unit),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSummary {
    pub num_executions: String,
    pub checkpoint_time: String,
    pub execution_start_timestamp: String,
    pub execution_end_timestamp: String,
    pub num_checkpoints: String,
}

impl ExecutionSummary {
    fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "NumExecutions" => &self.num_executions,
            "CheckpointTime" => &self.checkpoint_time,
            "ExecutionStartTimestamp" => &self.execution_start_timestamp,
            "ExecutionEndTimestamp" => &self.execution_end_timestamp,
            "NumCheckpoints" => &self.num_checkpoints,
            _ => return None,
        };
        Some(value.clone())
    }
}

/// Runtime statistics of one plan node. Every field defaults to empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionStats {
    pub rows: ExecutionStatsValue,
    pub latency: ExecutionStatsValue,
    pub cpu_time: ExecutionStatsValue,
    pub remote_calls: ExecutionStatsValue,
    pub scanned_rows: ExecutionStatsValue,
    pub filtered_rows: ExecutionStatsValue,
    pub execution_summary: ExecutionSummary,
}

impl ExecutionStats {
    /// Resolves a dotted field path such as `Rows.Total`, `Latency` or
    /// `ExecutionSummary.NumExecutions`.
    ///
    /// A statistic without a field renders through its `Display` impl.
    /// Returns `None` for unknown paths.
    pub fn lookup(&self, path: &str) -> Option<String> {
        let mut parts = path.split('.');
        let head = parts.next()?;
        let field = parts.next();
        if parts.next().is_some() {
            return None;
        }

        if head == "ExecutionSummary" {
            return field.and_then(|name| self.execution_summary.field(name));
        }

        let value = self.value(head)?;
        match field {
            None => Some(value.to_string()),
            Some(name) => value.field(name),
        }
    }

    fn value(&self, name: &str) -> Option<&ExecutionStatsValue> {
        match name {
            "Rows" => Some(&self.rows),
            "Latency" => Some(&self.latency),
            "CpuTime" => Some(&self.cpu_time),
            "RemoteCalls" => Some(&self.remote_calls),
            "ScannedRows" => Some(&self.scanned_rows),
            "FilteredRows" => Some(&self.filtered_rows),
            _ => None,
        }
    }
}

/// Decodes the statistics payload of `node`.
///
/// A node without a payload yields the default aggregate, and `null` values
/// leave their field at its default. Fields the typed aggregate does not declare
/// are dropped, unless `disallow_unknown` is set, in which case the first one
/// found fails the extraction with its dotted path.
pub fn extract(node: &PlanNode, disallow_unknown: bool) -> Result<ExecutionStats> {
    let Some(payload) = node.execution_stats.as_ref().filter(|p| !p.is_null()) else {
        return Ok(ExecutionStats::default());
    };

    let stats: ExecutionStats =
        serde_json::from_value(without_nulls(payload)).map_err(|e| PlanError::StatsDecode {
            node_index: node.index,
            message: e.to_string(),
        })?;

    if disallow_unknown {
        let encoded = serde_json::to_value(&stats).map_err(|e| PlanError::StatsDecode {
            node_index: node.index,
            message: e.to_string(),
        })?;
        if let Some(path) = first_unknown_key(payload, &encoded, "") {
            return Err(PlanError::StatsDecode {
                node_index: node.index,
                message: format!("unknown field `{}`", path),
            });
        }
    }

    Ok(stats)
}

/// Copy of `value` with `null` object entries removed and `null` array items
/// replaced by empty objects.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => Value::Object(serde_json::Map::new()),
                    other => without_nulls(other),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Walks `input` and returns the path of the first key missing from `known`.
fn first_unknown_key(input: &Value, known: &Value, path: &str) -> Option<String> {
    match (input, known) {
        (Value::Object(input), Value::Object(known)) => input.iter().find_map(|(key, value)| {
            let child_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            match known.get(key) {
                Some(known_value) => first_unknown_key(value, known_value, &child_path),
                None => Some(child_path),
            }
        }),
        (Value::Array(input), Value::Array(known)) => input
            .iter()
            .zip(known)
            .enumerate()
            .find_map(|(i, (value, known_value))| {
                first_unknown_key(value, known_value, &format!("{}[{}]", path, i))
            }),
        _ => None,
    }
}
