//! Output formatting for run summaries.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::planner::CleanupPlan;
use crate::runner::RunSummary;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Area row for table display.
#[derive(Tabled)]
struct AreaRow {
    #[tabled(rename = "Cleanup")]
    cleanup: usize,
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "Marked")]
    marked: usize,
    #[tabled(rename = "Spared")]
    spared: usize,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a run summary for display.
    #[must_use]
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&SummaryJson::from(summary)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_summary_text(summary),
        }
    }

    fn format_summary_text(summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str(&summary.explanation);

        let rows: Vec<AreaRow> = summary
            .plans
            .iter()
            .enumerate()
            .flat_map(|(i, plan)| Self::area_rows(i + 1, plan))
            .collect();
        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let marked = summary.marked_count().to_string();
        let spared = summary.spared_count().to_string().green();
        if summary.dry_run {
            let _ = writeln!(
                output,
                "\n{} Run {}: {} would be deleted, {} spared",
                "Dry run.".yellow(),
                summary.run,
                marked.yellow(),
                spared
            );
        } else {
            let failed = summary.execution.failed;
            let failed = if failed == 0 {
                failed.to_string().normal()
            } else {
                failed.to_string().red()
            };
            let _ = writeln!(
                output,
                "\nRun {}: {} deleted, {} failed, {} spared",
                summary.run,
                summary.execution.deleted.to_string().red(),
                failed,
                spared
            );
        }

        output
    }

    fn area_rows(cleanup: usize, plan: &CleanupPlan) -> Vec<AreaRow> {
        plan.areas
            .iter()
            .map(|area| AreaRow {
                cleanup,
                area: area.item_type.to_string(),
                marked: area.marked.len(),
                spared: area.spared.len(),
            })
            .collect()
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct SummaryJson<'a> {
    run: u64,
    dry_run: bool,
    marked: usize,
    spared: usize,
    deleted: usize,
    failed: usize,
    plans: &'a [CleanupPlan],
}

impl<'a> From<&'a RunSummary> for SummaryJson<'a> {
    fn from(summary: &'a RunSummary) -> Self {
        Self {
            run: summary.run,
            dry_run: summary.dry_run,
            marked: summary.marked_count(),
            spared: summary.spared_count(),
            deleted: summary.execution.deleted,
            failed: summary.execution.failed,
            plans: &summary.plans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::models::{Item, ItemType, KeyPair};
    use crate::planner::{AreaPlan, ExecutionResult, ItemAndReasons};

    fn summary(dry_run: bool) -> RunSummary {
        let item = Item::from(KeyPair {
            identifier: String::from("old"),
            name: String::from("old"),
            fingerprint: String::new(),
        });
        RunSummary {
            run: 3,
            dry_run,
            plans: vec![CleanupPlan {
                areas: vec![AreaPlan {
                    item_type: ItemType::KeyPair,
                    delete_setups: Vec::new(),
                    marked: vec![ItemAndReasons {
                        item,
                        detections: vec![Detection::allow("No instances are using the key pair")],
                    }],
                    spared: Vec::new(),
                }],
            }],
            explanation: String::from("In cleanup configuration number 1:\n"),
            execution: ExecutionResult {
                attempted: 1,
                deleted: 1,
                failed: 0,
            },
        }
    }

    #[test]
    fn test_text_summary() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_summary(&summary(false));

        assert!(text.starts_with("In cleanup configuration number 1:"));
        assert!(text.contains("KeyPair"));
        assert!(text.contains("Run 3: 1 deleted, 0 failed, 0 spared"));
    }

    #[test]
    fn test_text_dry_run_summary() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_summary(&summary(true));
        assert!(text.contains("Run 3: 1 would be deleted, 0 spared"));
    }

    #[test]
    fn test_json_summary() {
        let json = OutputFormatter::new(OutputFormat::Json).format_summary(&summary(false));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["run"], 3);
        assert_eq!(value["deleted"], 1);
        assert_eq!(value["plans"][0]["areas"][0]["item_type"], "key_pair");
        assert_eq!(
            value["plans"][0]["areas"][0]["marked"][0]["item"]["type"],
            "key_pair"
        );
        assert!(value["plans"][0]["areas"][0].get("delete_setups").is_none());
    }
}
