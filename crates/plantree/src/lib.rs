// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Renders query execution plans as indented operator trees.
//!
//! ```text
//! Distributed Union on AlbumsByAlbumTitle <Row>
//! +- Distributed Cross Apply <Row>
//!    +- [Input] Create Batch <Row>
//! ```
//!
//! A plan is a flat list of nodes linked by index. [`QueryPlan`] navigates it,
//! [`process_plan`] turns it into one [`RowWithPredicates`] per visible node.

pub mod load;
pub mod plan;
pub mod render;
pub mod stats;

pub use load::{ExtractedPlan, extract_query_plan};
pub use plan::{
    ChildLink, InlineStatsFn, MetadataValue, PlanNode, PlanNodeKind, QueryPlan, ResolvedChildLink,
    TitleOptions, node_title,
};
pub use render::{RenderOptions, RowWithPredicates, process_plan};
pub use stats::{ExecutionStats, ExecutionStatsValue};

pub use plantree_common::{PlanError, RenderConfig, Result};
