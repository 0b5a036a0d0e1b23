// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Plan rendering pipeline: linearize, print the tree, decode the rows.

pub mod decode;
pub mod linearize;
pub mod treeprint;
pub mod wrap;

pub use decode::RowWithPredicates;

use crate::plan::graph::QueryPlan;
use crate::plan::title::{InlineStatsFn, TitleOptions};
use linearize::Linearizer;
use plantree_common::{RenderConfig, Result};
use std::fmt;
use tracing::debug;

/// Configuration of one render call.
#[derive(Clone, Default)]
pub struct RenderOptions {
    pub config: RenderConfig,

    /// Appends labels such as `Rows=33` to every node title.
    pub inline_stats: Option<InlineStatsFn>,
}

impl RenderOptions {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            inline_stats: None,
        }
    }

    #[must_use]
    pub fn with_inline_stats(mut self, inline_stats: InlineStatsFn) -> Self {
        self.inline_stats = Some(inline_stats);
        self
    }

    fn title_options(&self) -> TitleOptions {
        TitleOptions {
            format: self.config.title,
            inline_stats: self.inline_stats.clone(),
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("config", &self.config)
            .field("inline_stats", &self.inline_stats.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Renders `plan` into one row per visible node, in depth-first order.
///
/// Fails as a whole: either every row is produced or an error is returned.
pub fn process_plan<'a>(
    plan: &'a QueryPlan,
    opts: &RenderOptions,
) -> Result<Vec<RowWithPredicates<'a>>> {
    opts.config.tree.validate()?;

    let tree = Linearizer::new(plan, &opts.config, opts.title_options()).build_tree()?;
    let rendered = tree.render(&opts.config.tree);
    let rows = decode::decode_rows(plan, &rendered, opts.config.disallow_unknown_stats)?;

    debug!(
        nodes = plan.plan_nodes().len(),
        rows = rows.len(),
        compact = opts.config.title.compact,
        wrap_width = opts.config.wrap_width,
        "rendered query plan"
    );
    Ok(rows)
}
