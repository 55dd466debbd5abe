//! Place command - arrange components by schematic hierarchy.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use log::info;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, style::Style, Alignment, Modify},
    Table, Tabled,
};

use super::{format_point, working_set, OutputFormat};
use crate::board;
use crate::placer::{self, Move, Options, Outcome, Rect, ScopeMode};

/// Table row for a moved component.
#[derive(Tabled)]
struct MoveRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

/// Machine-readable record of a run.
#[derive(Debug, Serialize)]
struct Report<'a> {
    board: String,
    generated_at: DateTime<Utc>,
    scope: ScopeMode,
    dry_run: bool,
    applied: bool,
    fixed: usize,
    fallbacks: &'a [String],
    area: Option<Rect>,
    moves: &'a [Move],
}

impl<'a> Report<'a> {
    fn new(board: &Path, outcome: &'a Outcome, dry_run: bool, applied: bool) -> Self {
        Self {
            board: board.display().to_string(),
            generated_at: Utc::now(),
            scope: outcome.scope.mode,
            dry_run,
            applied,
            fixed: outcome.scope.fixed.len(),
            fallbacks: &outcome.fallbacks,
            area: outcome.area,
            moves: &outcome.placement.moves,
        }
    }
}

/// Execute the place command.
pub fn execute(
    board_path: &Path,
    options: &Options,
    select: Option<&[String]>,
    dry_run: bool,
    format: OutputFormat,
    report: Option<&Path>,
) -> Result<()> {
    let mut session = board::open(board_path)?;
    let components = working_set(session.components(), select);

    let outcome = placer::run(&components, options)
        .with_context(|| format!("Failed to place components on {}", board_path.display()))?;

    let applied = !dry_run && !outcome.placement.is_empty();
    if applied {
        session.apply(&outcome.placement)?;
        info!(path:% = board_path.display(), moved = outcome.placement.len(); "Board updated");
    }

    let record = Report::new(session.path(), &outcome, dry_run, applied);
    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    match format {
        OutputFormat::Human => print_human(&outcome, board_path, dry_run, applied),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
    }

    if let Some(path) = report {
        if format == OutputFormat::Human {
            println!("{} Report written to {}", "→".cyan(), path.display());
        }
    }

    Ok(())
}

fn print_human(outcome: &Outcome, board_path: &Path, dry_run: bool, applied: bool) {
    let scope = match outcome.scope.mode {
        ScopeMode::Selection => "selection",
        _ => "board",
    };

    for reference in &outcome.fallbacks {
        eprintln!(
            "{} {} has no usable hierarchy path, placed at the top level",
            "!".yellow(),
            reference.cyan()
        );
    }

    if outcome.placement.is_empty() {
        println!(
            "{} Nothing to place ({} has no unlocked components)",
            "✓".green(),
            scope
        );
        return;
    }

    let rows: Vec<MoveRow> = outcome
        .placement
        .moves
        .iter()
        .map(|m| MoveRow {
            reference: m.reference.clone(),
            group: m.group.clone(),
            from: format_point(m.from.x, m.from.y),
            to: format_point(m.to.x, m.to.y),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..=3)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    let groups: BTreeSet<&str> = outcome
        .placement
        .moves
        .iter()
        .map(|m| m.group.as_str())
        .collect();

    println!(
        "{} Placed {} component(s) in {} group(s) from the {}",
        "✓".green(),
        outcome.placement.len(),
        groups.len(),
        scope
    );

    if let Some(area) = outcome.area {
        println!(
            "  Area: {:.2} x {:.2} mm at {}",
            area.width(),
            area.height(),
            format_point(area.min.x, area.min.y)
        );
    }

    if applied {
        println!("{} Wrote {}", "→".cyan(), board_path.display());
    } else if dry_run {
        println!("{} Dry run, board not modified", "!".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    const BOARD: &str = r#"{
  "components": [
    { "reference": "U1", "x": 50, "y": 50, "width": 5, "height": 4, "path": "/Mem/U1" },
    { "reference": "C1", "x": 0, "y": 0, "width": 1, "height": 0.5, "path": "/Mem/C1" },
    { "reference": "U2", "x": 20, "y": 80, "width": 3, "height": 3, "path": "/Power/U2" },
    { "reference": "J1", "x": 5, "y": 5, "width": 6, "height": 3, "path": "J1", "locked": true }
  ]
}"#;

    fn board(temp_dir: &TempDir) -> std::path::PathBuf {
        let path = temp_dir.path().join("board.json");
        fs::write(&path, BOARD).unwrap();
        path
    }

    #[test]
    fn test_dry_run_leaves_board_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = board(&temp_dir);
        let report = temp_dir.path().join("report.json");

        execute(
            &path,
            &Options::default(),
            None,
            true,
            OutputFormat::Json,
            Some(report.as_path()),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), BOARD);

        let written: Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(written["dry_run"], true);
        assert_eq!(written["applied"], false);
        assert_eq!(written["scope"], "board");
        assert_eq!(written["moves"].as_array().unwrap().len(), 3);
        assert!(written["generated_at"].is_string());
    }

    #[test]
    fn test_apply_writes_new_positions() {
        let temp_dir = TempDir::new().unwrap();
        let path = board(&temp_dir);

        execute(&path, &Options::default(), None, false, OutputFormat::Human, None).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_ne!(text, BOARD);

        let written: Value = serde_json::from_str(&text).unwrap();
        let entries = written["components"].as_array().unwrap();
        assert_eq!(entries.len(), 4);

        let j1 = entries.iter().find(|e| e["reference"] == "J1").unwrap();
        assert_eq!(j1["x"], 5);
        assert_eq!(j1["y"], 5);
    }

    #[test]
    fn test_select_limits_moves() {
        let temp_dir = TempDir::new().unwrap();
        let path = board(&temp_dir);
        let report = temp_dir.path().join("report.json");
        let select = vec!["U2".to_string(), "R99".to_string()];

        execute(
            &path,
            &Options::default(),
            Some(select.as_slice()),
            false,
            OutputFormat::Human,
            Some(report.as_path()),
        )
        .unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(written["scope"], "selection");
        let moves = written["moves"].as_array().unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0]["reference"], "U2");
    }

    #[test]
    fn test_unselected_duplicate_stays_put() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("board.json");
        fs::write(
            &path,
            r#"{ "components": [
                { "reference": "R1", "x": 0, "y": 0, "width": 1, "height": 1, "path": "/A/R1", "selected": true },
                { "reference": "R2", "x": 5, "y": 0, "width": 1, "height": 1, "path": "/A/R2", "selected": true },
                { "reference": "R1", "x": 90, "y": 90, "width": 1, "height": 1, "path": "/B/R1" }
            ] }"#,
        )
        .unwrap();

        execute(&path, &Options::default(), None, false, OutputFormat::Human, None).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entries = written["components"].as_array().unwrap();
        assert_eq!(entries[2]["x"], 90);
        assert_eq!(entries[2]["y"], 90);
        assert_ne!(entries[0]["x"], entries[2]["x"]);
    }

    #[test]
    fn test_empty_selection_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = board(&temp_dir);
        let options = Options {
            mode: ScopeMode::Selection,
            ..Options::default()
        };

        execute(&path, &options, None, false, OutputFormat::Human, None).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), BOARD);
    }
}
