//! Human readable explanation of cleanup plans.

use std::fmt::Write;

use super::plan::CleanupPlan;
use super::report::ItemAndReasons;

/// Explains what each plan deletes (or would delete in a dry run) and why,
/// and what it spares and why.
///
/// The output depends only on the plans and the flag.
#[must_use]
pub fn explain(plans: &[CleanupPlan], dry_run: bool) -> String {
    let (deleting, not_deleting) = if dry_run {
        ("Would delete", "Would not delete")
    } else {
        ("Deleting", "Not deleting")
    };

    let mut out = String::new();
    for (i, plan) in plans.iter().enumerate() {
        let _ = writeln!(out, "In cleanup configuration number {}:", i + 1);

        for area in &plan.areas {
            for entry in &area.marked {
                let _ = writeln!(
                    out,
                    "{deleting} item {} as not prevented: {:?}",
                    entry.item.describe(true),
                    entry.allow_reasons()
                );
            }
            for entry in &area.spared {
                let _ = writeln!(
                    out,
                    "{not_deleting} item {} as prevented: {:?}{}",
                    entry.item.describe(true),
                    entry.prevent_reasons(),
                    also_allowed(entry)
                );
            }
        }

        out.push('\n');
    }
    out
}

fn also_allowed(entry: &ItemAndReasons) -> String {
    let allowed = entry.allow_reasons();
    if allowed.is_empty() {
        String::new()
    } else {
        format!(" (not preventing: {allowed:?})")
    }
}
