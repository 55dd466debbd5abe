//! Tree command - show the sized hierarchy without moving anything.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use super::working_set;
use crate::board;
use crate::placer::{self, Options};

/// Execute the tree command.
pub fn execute(board_path: &Path, options: &Options, select: Option<&[String]>) -> Result<()> {
    let session = board::open(board_path)?;
    let components = working_set(session.components(), select);

    let plan = placer::plan(&components, options)
        .with_context(|| format!("Failed to group components on {}", board_path.display()))?;

    if plan.tree.is_empty() {
        println!("{} No components in scope", "✗".red());
        return Ok(());
    }

    for reference in &plan.tree.fallbacks {
        eprintln!(
            "{} {} has no usable hierarchy path, shown at the top level",
            "!".yellow(),
            reference.cyan()
        );
    }

    print!("{}", plan.sized);
    println!(
        "{} {} component(s), {} movable, {} group(s)",
        "→".cyan(),
        plan.scope.members.len(),
        plan.scope.movable.len(),
        plan.tree.root.group_count()
    );

    Ok(())
}
