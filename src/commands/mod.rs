pub mod place;
pub mod tree;

use colored::Colorize;

use crate::board;
use crate::placer::Component;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Copy the board's components, replacing the selection when `--select` was given.
fn working_set(components: &[Component], select: Option<&[String]>) -> Vec<Component> {
    let mut components = components.to_vec();

    if let Some(references) = select {
        for unknown in board::select(&mut components, references) {
            eprintln!(
                "{} No component with reference {} on this board",
                "!".yellow(),
                unknown.cyan()
            );
        }
    }

    components
}

fn format_point(x: f64, y: f64) -> String {
    format!("({:.3}, {:.3})", x, y)
}
