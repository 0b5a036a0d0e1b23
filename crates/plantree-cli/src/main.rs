// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use colored::*;
use plantree::{QueryPlan, RenderOptions, extract_query_plan, process_plan};
use plantree_common::{
    ExecutionMethodFormat, KnownFlagFormat, RenderConfig, TargetMetadataFormat, TitleFormat,
};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;
use table::{PrintMode, TableRenderDef, print_result};

pub mod table;
pub mod template;

/// Bytes of the offending input quoted in parse errors.
const INPUT_SNIPPET_LEN: usize = 140;

/// Whether the table gets the execution stats columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ExplainMode {
    Plan,
    Profile,
    /// Stats columns only if the plan carries stats.
    #[default]
    Auto,
}

impl ExplainMode {
    fn with_stats(self, plan: &QueryPlan) -> bool {
        match self {
            Self::Plan => false,
            Self::Profile => true,
            Self::Auto => plan.has_stats(),
        }
    }
}

impl FromStr for ExplainMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAN" => Ok(Self::Plan),
            "PROFILE" => Ok(Self::Profile),
            "AUTO" => Ok(Self::Auto),
            _ => bail!(
                "invalid input: {}. Must be one of AUTO, PLAN, PROFILE (case-insensitive)",
                s
            ),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rendertree")]
#[command(about = "Render a query execution plan read from stdin as an ASCII tree table", long_about = None)]
struct Cli {
    /// PROFILE, PLAN or AUTO (case-insensitive)
    #[arg(long, default_value = "AUTO", value_parser = ExplainMode::from_str)]
    mode: ExplainMode,

    /// Section printed after the table: predicates, typed or full
    #[arg(long = "print", default_value = "predicates", value_parser = PrintMode::from_str)]
    print_mode: PrintMode,

    /// Fail on execution stats fields the stats model does not declare
    #[arg(long)]
    disallow_unknown_stats: bool,

    /// Format of execution method metadata: angle or raw
    #[arg(long, default_value = "angle", value_parser = ExecutionMethodFormat::from_str)]
    execution_method: ExecutionMethodFormat,

    /// Format of target metadata: on or raw
    #[arg(long, default_value = "on", value_parser = TargetMetadataFormat::from_str)]
    target_metadata: TargetMetadataFormat,

    /// Format of known flags: label or raw [default: label]
    #[arg(long, value_parser = KnownFlagFormat::from_str, conflicts_with = "full_scan")]
    known_flag: Option<KnownFlagFormat>,

    /// Deprecated alias for --known-flag
    #[arg(long, value_parser = KnownFlagFormat::from_str)]
    full_scan: Option<KnownFlagFormat>,

    /// Enable compact format
    #[arg(long)]
    compact: bool,

    /// Render stats columns as labels inside the operator titles
    #[arg(long)]
    inline_stats: bool,

    /// Number of columns at which the operator text is wrapped; 0 disables wrapping
    #[arg(long, default_value_t = 0)]
    wrap_width: usize,

    /// Custom columns as <name>:<template>[:<alignment>[:<inline_type>]], comma-separated
    #[arg(long, value_delimiter = ',')]
    custom: Vec<String>,

    /// YAML file listing custom columns
    #[arg(long)]
    custom_file: Option<PathBuf>,
}

impl Cli {
    fn known_flag(&self) -> KnownFlagFormat {
        match self.full_scan {
            Some(known_flag) => {
                eprintln!(
                    "{}",
                    "--full-scan is deprecated. you must migrate to --known-flag.".yellow()
                );
                known_flag
            }
            None => self.known_flag.unwrap_or(KnownFlagFormat::Label),
        }
    }

    fn render_config(&self) -> RenderConfig {
        let config = RenderConfig {
            title: TitleFormat {
                execution_method: self.execution_method,
                target_metadata: self.target_metadata,
                known_flag: self.known_flag(),
                ..TitleFormat::default()
            },
            wrap_width: self.wrap_width,
            disallow_unknown_stats: self.disallow_unknown_stats,
            ..RenderConfig::default()
        };
        if self.compact {
            config.compact()
        } else {
            config
        }
    }

    fn table_render_def(&self, plan: &QueryPlan) -> Result<TableRenderDef> {
        if !self.custom.is_empty() {
            return TableRenderDef::from_custom_list(&self.custom);
        }
        if let Some(path) = &self.custom_file {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read custom file {}", path.display()))?;
            return TableRenderDef::from_custom_file(&yaml);
        }
        TableRenderDef::default_columns(self.mode.with_stats(plan))
    }
}

/// Renders the plan document in `input` as configured by `cli`.
fn run(cli: &Cli, input: &[u8]) -> Result<String> {
    let extracted = extract_query_plan(input).map_err(|e| {
        anyhow!(
            "invalid input at plan extraction:\nerror: {}\ninput: {}",
            e,
            input_snippet(input)
        )
    })?;

    let plan = QueryPlan::new(extracted.plan_nodes)?;
    let render_def = cli.table_render_def(&plan)?;
    let opts = RenderOptions::new(cli.render_config()).with_inline_stats(
        render_def.inline_stats_fn(cli.disallow_unknown_stats, cli.inline_stats),
    );
    let rows = process_plan(&plan, &opts)?;
    Ok(print_result(
        &render_def.without_inlined(cli.inline_stats),
        &rows,
        cli.print_mode,
    ))
}

/// The trimmed input cut to [`INPUT_SNIPPET_LEN`] bytes, marked when cut.
fn input_snippet(input: &[u8]) -> String {
    let text = String::from_utf8_lossy(input);
    let trimmed = text.trim();
    let mut end = trimmed.len().min(INPUT_SNIPPET_LEN);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    let collapsed = if input.len() > INPUT_SNIPPET_LEN {
        "(collapsed)"
    } else {
        ""
    };
    format!("{}{}", &trimmed[..end], collapsed)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .context("failed to read plan from stdin")?;

    let output = run(&cli, &input)?;
    std::io::stdout()
        .write_all(output.as_bytes())
        .context("failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISTRIBUTED_CROSS_APPLY: &str =
        include_str!("../tests/testdata/distributed_cross_apply.yaml");
    const DISTRIBUTED_CROSS_APPLY_PROFILE: &str =
        include_str!("../tests/testdata/distributed_cross_apply_profile.yaml");
    const DELETE: &str = include_str!("../tests/testdata/delete.yaml");

    const PLAN: &str = r#"+-----+-------------------------------------------------------------------------------------------+
| ID  | Operator                                                                                  |
+-----+-------------------------------------------------------------------------------------------+
|   0 | Distributed Union on AlbumsByAlbumTitle <Row>                                             |
|  *1 | +- Distributed Cross Apply <Row>                                                          |
|   2 |    +- [Input] Create Batch <Row>                                                          |
|   3 |    |  +- Local Distributed Union <Row>                                                    |
|   4 |    |     +- Compute Struct <Row>                                                          |
|   5 |    |        +- Index Scan on AlbumsByAlbumTitle <Row> (Full scan, scan_method: Automatic) |
|  11 |    +- [Map] Serialize Result <Row>                                                        |
|  12 |       +- Cross Apply <Row>                                                                |
|  13 |          +- [Input] Batch Scan on $v2 <Row> (scan_method: Row)                            |
|  16 |          +- [Map] Local Distributed Union <Row>                                           |
| *17 |             +- Filter Scan <Row> (seekable_key_size: 0)                                   |
|  18 |                +- Index Scan on SongsBySongGenre <Row> (Full scan, scan_method: Row)      |
+-----+-------------------------------------------------------------------------------------------+
Predicates(identified by ID):
  1: Split Range: ($AlbumId = $AlbumId_1)
 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)
"#;

    const COMPACT_PLAN: &str = r#"+-----+-----------------------------------------------------------------------------+
| ID  | Operator                                                                    |
+-----+-----------------------------------------------------------------------------+
|   0 | Distributed Union on AlbumsByAlbumTitle<Row>                                |
|  *1 | +Distributed Cross Apply<Row>                                               |
|   2 |  +[Input]Create Batch<Row>                                                  |
|   3 |  |+Local Distributed Union<Row>                                             |
|   4 |  | +Compute Struct<Row>                                                     |
|   5 |  |  +Index Scan on AlbumsByAlbumTitle<Row>(Full scan,scan_method:Automatic) |
|  11 |  +[Map]Serialize Result<Row>                                                |
|  12 |   +Cross Apply<Row>                                                         |
|  13 |    +[Input]Batch Scan on $v2<Row>(scan_method:Row)                          |
|  16 |    +[Map]Local Distributed Union<Row>                                       |
| *17 |     +Filter Scan<Row>(seekable_key_size:0)                                  |
|  18 |      +Index Scan on SongsBySongGenre<Row>(Full scan,scan_method:Row)        |
+-----+-----------------------------------------------------------------------------+
Predicates(identified by ID):
  1: Split Range: ($AlbumId = $AlbumId_1)
 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)
"#;

    const WRAPPED_COMPACT_PLAN: &str = r#"+-----+------------------------------------------+
| ID  | Operator                                 |
+-----+------------------------------------------+
|   0 | Distributed Union on AlbumsByAlbumTitle< |
|     | Row>                                     |
|  *1 | +Distributed Cross Apply<Row>            |
|   2 |  +[Input]Create Batch<Row>               |
|   3 |  |+Local Distributed Union<Row>          |
|   4 |  | +Compute Struct<Row>                  |
|   5 |  |  +Index Scan on AlbumsByAlbumTitle<Ro |
|     |  |   w>(Full scan,scan_method:Automatic) |
|  11 |  +[Map]Serialize Result<Row>             |
|  12 |   +Cross Apply<Row>                      |
|  13 |    +[Input]Batch Scan on $v2<Row>(scan_m |
|     |    |ethod:Row)                           |
|  16 |    +[Map]Local Distributed Union<Row>    |
| *17 |     +Filter Scan<Row>(seekable_key_size: |
|     |      0)                                  |
|  18 |      +Index Scan on SongsBySongGenre<Row |
|     |       >(Full scan,scan_method:Row)       |
+-----+------------------------------------------+
Predicates(identified by ID):
  1: Split Range: ($AlbumId = $AlbumId_1)
 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)
"#;

    const WRAPPED_PLAN: &str = r#"+-----+---------------------------------------------------+
| ID  | Operator                                          |
+-----+---------------------------------------------------+
|   0 | Distributed Union on AlbumsByAlbumTitle <Row>     |
|  *1 | +- Distributed Cross Apply <Row>                  |
|   2 |    +- [Input] Create Batch <Row>                  |
|   3 |    |  +- Local Distributed Union <Row>            |
|   4 |    |     +- Compute Struct <Row>                  |
|   5 |    |        +- Index Scan on AlbumsByAlbumTitle < |
|     |    |           Row> (Full scan, scan_method: Auto |
|     |    |           matic)                             |
|  11 |    +- [Map] Serialize Result <Row>                |
|  12 |       +- Cross Apply <Row>                        |
|  13 |          +- [Input] Batch Scan on $v2 <Row> (scan |
|     |          |  _method: Row)                         |
|  16 |          +- [Map] Local Distributed Union <Row>   |
| *17 |             +- Filter Scan <Row> (seekable_key_si |
|     |                ze: 0)                             |
|  18 |                +- Index Scan on SongsBySongGenre  |
|     |                   <Row> (Full scan, scan_method:  |
|     |                   Row)                            |
+-----+---------------------------------------------------+
Predicates(identified by ID):
  1: Split Range: ($AlbumId = $AlbumId_1)
 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)
"#;

    const PROFILE: &str = r#"+-----+-------------------------------------------------------------------------------------------+------+-------+---------+
| ID  | Operator                                                                                  | Rows | Exec. | Latency |
+-----+-------------------------------------------------------------------------------------------+------+-------+---------+
|   0 | Distributed Union on AlbumsByAlbumTitle <Row>                                             |   33 |     1 | 1.92 ms |
|  *1 | +- Distributed Cross Apply <Row>                                                          |   33 |     1 |  1.9 ms |
|   2 |    +- [Input] Create Batch <Row>                                                          |      |       |         |
|   3 |    |  +- Local Distributed Union <Row>                                                    |    7 |     1 | 0.95 ms |
|   4 |    |     +- Compute Struct <Row>                                                          |    7 |     1 | 0.94 ms |
|   5 |    |        +- Index Scan on AlbumsByAlbumTitle <Row> (Full scan, scan_method: Automatic) |    7 |     1 | 0.93 ms |
|  11 |    +- [Map] Serialize Result <Row>                                                        |   33 |     1 | 0.88 ms |
|  12 |       +- Cross Apply <Row>                                                                |   33 |     1 | 0.87 ms |
|  13 |          +- [Input] Batch Scan on $v2 <Row> (scan_method: Row)                            |    7 |     1 | 0.01 ms |
|  16 |          +- [Map] Local Distributed Union <Row>                                           |   33 |     7 | 0.85 ms |
| *17 |             +- Filter Scan <Row> (seekable_key_size: 0)                                   |      |       |         |
|  18 |                +- Index Scan on SongsBySongGenre <Row> (Full scan, scan_method: Row)      |   33 |     7 | 0.84 ms |
+-----+-------------------------------------------------------------------------------------------+------+-------+---------+
Predicates(identified by ID):
  1: Split Range: ($AlbumId = $AlbumId_1)
 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)
"#;

    const PROFILE_CUSTOM: &str = r#"+-----+-------------------------------------------------------------------------------------------+------+---------+----------+
| ID  | Operator                                                                                  | Rows | Scanned | Filtered |
+-----+-------------------------------------------------------------------------------------------+------+---------+----------+
|   0 | Distributed Union on AlbumsByAlbumTitle <Row>                                             |   33 |         |          |
|  *1 | +- Distributed Cross Apply <Row>                                                          |   33 |         |          |
|   2 |    +- [Input] Create Batch <Row>                                                          |      |         |          |
|   3 |    |  +- Local Distributed Union <Row>                                                    |    7 |         |          |
|   4 |    |     +- Compute Struct <Row>                                                          |    7 |         |          |
|   5 |    |        +- Index Scan on AlbumsByAlbumTitle <Row> (Full scan, scan_method: Automatic) |    7 |       7 |        0 |
|  11 |    +- [Map] Serialize Result <Row>                                                        |   33 |         |          |
|  12 |       +- Cross Apply <Row>                                                                |   33 |         |          |
|  13 |          +- [Input] Batch Scan on $v2 <Row> (scan_method: Row)                            |    7 |         |          |
|  16 |          +- [Map] Local Distributed Union <Row>                                           |   33 |         |          |
| *17 |             +- Filter Scan <Row> (seekable_key_size: 0)                                   |      |         |          |
|  18 |                +- Index Scan on SongsBySongGenre <Row> (Full scan, scan_method: Row)      |   33 |      63 |       30 |
+-----+-------------------------------------------------------------------------------------------+------+---------+----------+
Predicates(identified by ID):
  1: Split Range: ($AlbumId = $AlbumId_1)
 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)
"#;

    const DELETE_PLAN: &str = r#"+----+----------------------------------------------------------------------------------+
| ID | Operator                                                                         |
+----+----------------------------------------------------------------------------------+
|  0 | Apply Mutations on MutationTest <Row> (operation_type: DELETE)                   |
|  1 | +- Distributed Union on MutationTest <Row>                                       |
|  2 |    +- Local Distributed Union <Row>                                              |
|  3 |       +- Serialize Result <Row>                                                  |
|  4 |          +- Table Scan on MutationTest <Row> (Full scan, scan_method: Automatic) |
+----+----------------------------------------------------------------------------------+
"#;

    const DELETE_PLAN_RAW: &str = r#"+----+--------------------------------------------------------------------------------------------------------------+
| ID | Operator                                                                                                     |
+----+--------------------------------------------------------------------------------------------------------------+
|  0 | Apply Mutations (execution_method: Row, operation_type: DELETE, table: MutationTest)                         |
|  1 | +- Distributed Union (distribution_table: MutationTest, execution_method: Row, split_ranges_aligned: false)  |
|  2 |    +- Local Distributed Union (execution_method: Row)                                                        |
|  3 |       +- Serialize Result (execution_method: Row)                                                            |
|  4 |          +- Table Scan (Full scan: true, Table: MutationTest, execution_method: Row, scan_method: Automatic) |
+----+--------------------------------------------------------------------------------------------------------------+
"#;

    const CUSTOM_COLUMNS: &str = r#"- name: ID
  template: '{{.FormatID}}'
  alignment: RIGHT
- name: Operator
  template: '{{.Text}}'
  alignment: LEFT
- name: Rows
  template: '{{.ExecutionStats.Rows.Total}}'
  alignment: RIGHT
- name: Scanned
  template: '{{.ExecutionStats.ScannedRows.Total}}'
  alignment: RIGHT
- name: Filtered
  template: '{{.ExecutionStats.FilteredRows.Total}}'
  alignment: RIGHT
"#;

    fn render(args: &[&str], input: &str) -> String {
        let cli = Cli::try_parse_from(std::iter::once("rendertree").chain(args.iter().copied()))
            .unwrap();
        run(&cli, input.as_bytes()).unwrap()
    }

    #[test]
    fn test_plan() {
        assert_eq!(render(&[], DISTRIBUTED_CROSS_APPLY), PLAN);
        assert_eq!(render(&["--mode", "plan"], DISTRIBUTED_CROSS_APPLY_PROFILE), PLAN);
    }

    #[test]
    fn test_compact_plan() {
        assert_eq!(render(&["--compact"], DISTRIBUTED_CROSS_APPLY), COMPACT_PLAN);
    }

    #[test]
    fn test_wrapped_plan() {
        assert_eq!(
            render(&["--compact", "--wrap-width", "40"], DISTRIBUTED_CROSS_APPLY),
            WRAPPED_COMPACT_PLAN
        );
        assert_eq!(
            render(&["--wrap-width", "50"], DISTRIBUTED_CROSS_APPLY),
            WRAPPED_PLAN
        );
    }

    #[test]
    fn test_profile() {
        assert_eq!(render(&[], DISTRIBUTED_CROSS_APPLY_PROFILE), PROFILE);
        assert_eq!(
            render(&["--mode", "PROFILE"], DISTRIBUTED_CROSS_APPLY_PROFILE),
            PROFILE
        );
    }

    #[test]
    fn test_profile_with_custom_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CUSTOM_COLUMNS.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        assert_eq!(
            render(&["--custom-file", path], DISTRIBUTED_CROSS_APPLY_PROFILE),
            PROFILE_CUSTOM
        );
    }

    #[test]
    fn test_profile_with_custom_list() {
        let custom = [
            "ID:{{.FormatID}}:RIGHT",
            "Operator:{{.Text}}",
            "Rows:{{.ExecutionStats.Rows.Total}}:RIGHT",
            "Scanned:{{.ExecutionStats.ScannedRows.Total}}:RIGHT",
            "Filtered:{{.ExecutionStats.FilteredRows.Total}}:RIGHT",
        ]
        .join(",");
        assert_eq!(
            render(&["--custom", &custom], DISTRIBUTED_CROSS_APPLY_PROFILE),
            PROFILE_CUSTOM
        );
    }

    #[test]
    fn test_delete_plan() {
        assert_eq!(render(&[], DELETE), DELETE_PLAN);
        assert_eq!(
            render(
                &[
                    "--execution-method",
                    "raw",
                    "--target-metadata",
                    "raw",
                    "--known-flag",
                    "raw",
                ],
                DELETE
            ),
            DELETE_PLAN_RAW
        );

        let deprecated = [
            "--full-scan",
            "raw",
            "--execution-method",
            "raw",
            "--target-metadata",
            "raw",
        ];
        assert_eq!(render(&deprecated, DELETE), DELETE_PLAN_RAW);
    }

    #[test]
    fn test_full_scan_conflicts_with_known_flag() {
        let parsed =
            Cli::try_parse_from(["rendertree", "--known-flag", "raw", "--full-scan", "label"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rejects_unknown_options() {
        assert!(Cli::try_parse_from(["rendertree", "--mode", "EXPLAIN"]).is_err());
        assert!(Cli::try_parse_from(["rendertree", "--print", "everything"]).is_err());
        assert!(Cli::try_parse_from(["rendertree", "--execution-method", "square"]).is_err());
    }

    #[test]
    fn test_inline_stats() {
        let out = render(
            &["--inline-stats", "--mode", "PROFILE"],
            DISTRIBUTED_CROSS_APPLY_PROFILE,
        );
        assert!(out.contains(
            "| Distributed Union on AlbumsByAlbumTitle <Row> (Rows=33, Exec.=1, Latency=1.92 ms)"
        ));
        assert!(out.contains("|   2 |    +- [Input] Create Batch <Row>   "));
        let header = out.lines().nth(1).unwrap();
        assert!(header.starts_with("| ID  | Operator"));
        assert!(!header.contains("Rows"));
    }

    #[test]
    fn test_print_typed_and_full() {
        let typed = render(&["--print", "typed"], DISTRIBUTED_CROSS_APPLY);
        assert!(typed.ends_with(
            "Node Parameters(identified by ID):\n  1: Split Range: ($AlbumId = $AlbumId_1)\n 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)\n"
        ));

        let full = render(&["--print", "full"], DISTRIBUTED_CROSS_APPLY);
        let section = full
            .split_once("Node Parameters(identified by ID):\n")
            .map(|(_, section)| section)
            .unwrap();
        assert_eq!(
            section.lines().collect::<Vec<_>>(),
            vec![
                "  1: Split Range: ($AlbumId = $AlbumId_1)",
                "  4: $v1=$v1",
                "  5: $AlbumId=AlbumId",
                " 11: $AlbumId",
                " 13: $batched_AlbumId=AlbumId",
                " 17: Residual Condition: ($AlbumId = $batched_AlbumId_1)",
                " 18: $AlbumId_1=AlbumId",
            ]
        );
    }

    #[test]
    fn test_invalid_input_quotes_a_snippet() {
        let cli = Cli::try_parse_from(["rendertree"]).unwrap();
        let input = format!("not a plan {}", "x".repeat(200));
        let err = run(&cli, input.as_bytes()).unwrap_err().to_string();
        assert!(err.starts_with("invalid input at plan extraction:"));
        assert!(err.ends_with("(collapsed)"));

        assert_eq!(input_snippet(b"  short  "), "short");
        let multibyte = format!("x{}", "é".repeat(100));
        let snippet = input_snippet(multibyte.as_bytes());
        assert_eq!(snippet.strip_suffix("(collapsed)").unwrap().len(), 139);
    }
}
