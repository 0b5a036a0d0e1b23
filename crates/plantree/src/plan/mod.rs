// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

pub mod graph;
pub mod model;
pub mod title;

pub use graph::{QueryPlan, ResolvedChildLink};
pub use model::{ChildLink, Metadata, MetadataValue, PlanNode, PlanNodeKind, ShortRepresentation};
pub use title::{InlineStatsFn, TitleOptions, node_title};
