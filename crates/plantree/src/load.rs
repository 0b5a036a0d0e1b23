// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Loading plan nodes from YAML or JSON documents.
//!
//! Three document shapes are accepted, tried from the outside in:
//! a result set (`stats.queryPlan.planNodes`), result set stats
//! (`queryPlan.planNodes`, with optional `queryStats`) and a bare query plan
//! (`planNodes`). JSON is valid YAML, so both go through the YAML parser.

use crate::plan::model::PlanNode;
use plantree_common::{PlanError, Result};
use serde_json::Value;
use tracing::debug;

/// Plan nodes and query-level statistics found in an input document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedPlan {
    pub plan_nodes: Vec<PlanNode>,

    /// Query-wide statistics such as `elapsed_time`, kept untyped.
    pub query_stats: Option<Value>,
}

pub fn extract_query_plan(input: &[u8]) -> Result<ExtractedPlan> {
    let text = std::str::from_utf8(input)
        .map_err(|e| input_error(format!("input is not UTF-8: {}", e)))?;
    let document: Value = serde_yaml::from_str(text)
        .map_err(|e| input_error(format!("failed to parse document: {}", e)))?;

    let result_set_stats = field(&document, "stats", "stats").unwrap_or(&document);
    let (query_plan, query_stats) = match field(result_set_stats, "queryPlan", "query_plan") {
        Some(query_plan) => (
            query_plan,
            field(result_set_stats, "queryStats", "query_stats").cloned(),
        ),
        None => (result_set_stats, None),
    };

    let plan_nodes = field(query_plan, "planNodes", "plan_nodes")
        .ok_or_else(|| input_error("no planNodes found in document".to_string()))?;
    let plan_nodes: Vec<PlanNode> = serde_json::from_value(plan_nodes.clone())
        .map_err(|e| input_error(format!("invalid plan nodes: {}", e)))?;

    debug!(nodes = plan_nodes.len(), "loaded query plan");
    Ok(ExtractedPlan {
        plan_nodes,
        query_stats,
    })
}

fn field<'v>(value: &'v Value, camel: &str, snake: &str) -> Option<&'v Value> {
    value
        .get(camel)
        .or_else(|| value.get(snake))
        .filter(|v| !v.is_null())
}

fn input_error(message: String) -> PlanError {
    PlanError::Input { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::model::PlanNodeKind;

    #[test]
    fn test_extract_result_set() {
        let yaml = r#"
stats:
  queryPlan:
    planNodes:
    - displayName: Serialize Result
      kind: RELATIONAL
      childLinks:
      - childIndex: 1
    - displayName: Unit Relation
      index: 1
      kind: RELATIONAL
  queryStats:
    elapsed_time: 1.2 msecs
"#;
        let extracted = extract_query_plan(yaml.as_bytes()).unwrap();
        assert_eq!(extracted.plan_nodes.len(), 2);
        assert_eq!(extracted.plan_nodes[0].index, 0);
        assert_eq!(extracted.plan_nodes[1].kind, PlanNodeKind::Relational);
        assert_eq!(
            extracted.query_stats.unwrap()["elapsed_time"],
            "1.2 msecs"
        );
    }

    #[test]
    fn test_extract_result_set_stats_snake_case() {
        let yaml = r#"
query_plan:
  plan_nodes:
  - display_name: Scan
    kind: RELATIONAL
"#;
        let extracted = extract_query_plan(yaml.as_bytes()).unwrap();
        assert_eq!(extracted.plan_nodes[0].display_name, "Scan");
        assert!(extracted.query_stats.is_none());
    }

    #[test]
    fn test_extract_bare_plan_json() {
        let json = r#"{"planNodes": [{"displayName": "Scan", "kind": "RELATIONAL", "unknownField": 1}]}"#;
        let extracted = extract_query_plan(json.as_bytes()).unwrap();
        assert_eq!(extracted.plan_nodes[0].display_name, "Scan");
    }

    #[test]
    fn test_extract_numeric_kinds() {
        let json = br#"{"planNodes":[{"index":0,"kind":1,"displayName":"Scan","childLinks":[{"childIndex":1}]},{"index":1,"kind":2,"displayName":"Function"}]}"#;
        let extracted = extract_query_plan(json).unwrap();
        assert_eq!(extracted.plan_nodes[0].kind, PlanNodeKind::Relational);
        assert_eq!(extracted.plan_nodes[1].kind, PlanNodeKind::Scalar);
    }

    #[test]
    fn test_extract_null_fields() {
        let json = br#"{"planNodes":[{"index":0,"kind":"RELATIONAL","displayName":"Scan","metadata":null,"childLinks":null,"shortRepresentation":null}]}"#;
        let extracted = extract_query_plan(json).unwrap();
        let node = &extracted.plan_nodes[0];
        assert!(node.metadata.is_empty());
        assert!(node.child_links.is_empty());
        assert!(node.short_representation.is_none());

        let yaml = r#"
planNodes:
- displayName: Serialize Result
  kind: 1
  metadata: ~
  childLinks:
  - childIndex: 1
    type: ~
- index: 1
  displayName: Unit Relation
  kind: RELATIONAL
  childLinks: ~
"#;
        let extracted = extract_query_plan(yaml.as_bytes()).unwrap();
        assert_eq!(extracted.plan_nodes[0].child_links[0].link_type, "");
        assert!(extracted.plan_nodes[1].child_links.is_empty());
    }

    #[test]
    fn test_extract_rejects_unrecognized_documents() {
        let err = extract_query_plan(b"rows: []").unwrap_err();
        assert!(err.to_string().contains("no planNodes"));

        let err = extract_query_plan(b"planNodes: [unterminated").unwrap_err();
        assert!(matches!(err, PlanError::Input { .. }));

        let err = extract_query_plan(b"planNodes: [{kind: SIDEWAYS}]").unwrap_err();
        assert!(err.to_string().contains("invalid plan nodes"));
    }
}
