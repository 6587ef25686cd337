//! Output formatting for the kubestack CLI
//!
//! Human output is colored and goes to stdout; diagnostics go to stderr.
//! In JSON mode every message is one JSON object per line so the output
//! can be piped into other tools.

use colored::Colorize;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use kubestack::engine::{DeploymentReport, ResourceOutcome, ResourceStatus};
use kubestack::synth::{Note, NoteLevel};

/// Colored label for a resource status
pub fn status_label(status: &ResourceStatus, use_color: bool) -> String {
    let plain = match status {
        ResourceStatus::Created => "created",
        ResourceStatus::Updated => "updated",
        ResourceStatus::Unchanged => "unchanged",
        ResourceStatus::Failed { .. } => "failed",
    };
    if !use_color {
        return plain.to_string();
    }
    match status {
        ResourceStatus::Created => plain.green().to_string(),
        ResourceStatus::Updated => plain.yellow().to_string(),
        ResourceStatus::Unchanged => plain.bright_black().to_string(),
        ResourceStatus::Failed { .. } => plain.red().bold().to_string(),
    }
}

/// Output formatter for the human and JSON modes
pub struct OutputFormatter {
    use_color: bool,
    json_mode: bool,
    verbosity: u8,
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        if !use_color {
            colored::control::set_override(false);
        }

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            self.emit_stderr("error", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            self.emit_stderr("warning", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.json_mode {
            self.emit_stderr("hint", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            eprintln!("HINT: {}", message);
        }
    }

    /// Print an info message on stderr (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.json_mode {
            self.emit_stderr("info", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "INFO:".blue(), message);
        } else {
            eprintln!("INFO: {}", message);
        }
    }

    /// Print a debug message (requires higher verbosity)
    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 {
            return;
        }

        if self.json_mode {
            self.emit_stderr("debug", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "DEBUG:".magenta(), message);
        } else {
            eprintln!("DEBUG: {}", message);
        }
    }

    /// Print a synthesis note at its level, on stderr so templates stay clean
    pub fn note(&self, note: &Note) {
        match note.level {
            NoteLevel::Warning => self.warning(&note.message),
            NoteLevel::Info => {
                if self.json_mode {
                    self.emit_stderr("note", &note.message);
                } else if self.use_color {
                    eprintln!("{} {}", "NOTE:".cyan(), note.message);
                } else {
                    eprintln!("NOTE: {}", note.message);
                }
            }
        }
    }

    /// Print text as-is, regardless of verbosity
    pub fn plain(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a JSON document on stdout
    pub fn json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    /// Print one resource outcome
    pub fn outcome(&self, outcome: &ResourceOutcome) {
        let label = status_label(&outcome.status, self.use_color);
        let id = if self.use_color {
            outcome.id.bright_white().bold().to_string()
        } else {
            outcome.id.clone()
        };

        print!("{:<12} {} ({})", label, id, outcome.resource_type);
        if let ResourceStatus::Failed { reason } = &outcome.status {
            print!(" => {}", reason);
        }
        println!();

        if let Some(diff) = &outcome.diff {
            if self.verbosity >= 1 || matches!(outcome.status, ResourceStatus::Updated) {
                self.diff(diff);
            }
        }
    }

    /// Print a line diff, coloring added and removed lines
    pub fn diff(&self, diff: &str) {
        for line in diff.lines() {
            let rendered = if !self.use_color {
                line.to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else {
                line.to_string()
            };
            println!("    {}", rendered);
        }
    }

    /// Print a deployment or plan report
    pub fn report(&self, report: &DeploymentReport, verb: &str) {
        if self.json_mode {
            self.json(&serde_json::to_value(report).unwrap_or_default());
            return;
        }

        for outcome in &report.outcomes {
            self.outcome(outcome);
        }
        for removed in &report.removed {
            let label = if self.use_color {
                "removed".red().to_string()
            } else {
                "removed".to_string()
            };
            println!("{:<12} {}", label, removed);
        }

        let summary = format!(
            "{}: {} created, {} updated, {} unchanged, {} failed, {} removed",
            verb,
            report.count("created"),
            report.count("updated"),
            report.count("unchanged"),
            report.count("failed"),
            report.removed.len()
        );
        if self.use_color {
            println!("\n{}", summary.bright_white().bold());
        } else {
            println!("\n{}", summary);
        }
    }

    /// Print a list of items
    pub fn list(&self, title: &str, items: &[String]) {
        if self.json_mode {
            let list = serde_json::json!({
                "type": "list",
                "title": title,
                "items": items
            });
            self.json(&list);
            return;
        }

        if self.use_color {
            println!("\n{}:", title.bright_white().bold());
        } else {
            println!("\n{}:", title);
        }

        for item in items {
            if self.use_color {
                println!("  {} {}", "-".bright_black(), item);
            } else {
                println!("  - {}", item);
            }
        }
    }

    /// Print the elapsed time since the formatter was created
    pub fn elapsed(&self, label: &str) {
        if self.json_mode {
            return;
        }
        let duration = format_duration(self.start_time.elapsed());
        if self.use_color {
            println!("{} {}", label.bright_black(), duration.bright_white());
        } else {
            println!("{} {}", label, duration);
        }
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }

    fn emit_stderr(&self, kind: &str, message: &str) {
        let line = serde_json::json!({
            "type": kind,
            "message": message
        });
        eprintln!("{}", serde_json::to_string(&line).unwrap_or_default());
    }
}

/// Format a duration in human-readable form
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
