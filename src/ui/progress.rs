//! Progress indicators with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::info;

/// Progress bar for container image builds.
///
/// Understands podman (`STEP N/M: ...`), legacy docker (`Step N/M : ...`) and
/// BuildKit (`#7 [3/9] RUN ...`) step lines. In CI every output line is
/// logged instead.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
    label: String,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "  {spinner:.cyan} Building {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}",
            ) {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            None
        };
        info!("Building {}...", label);
        Self {
            bar,
            label: label.to_string(),
        }
    }

    /// Process one build output line
    pub fn on_line(&self, line: &str) {
        let Some(ref bar) = self.bar else {
            info!(target: "toolsmith::build", "[{}] {}", self.label, line);
            return;
        };

        if let Some((n, total, instruction)) = parse_step_line(line) {
            bar.set_length(total);
            bar.set_position(n);
            bar.set_message(truncate(instruction, 60));
            return;
        }

        let trimmed = line.trim();
        if !trimmed.is_empty() && !is_build_noise(trimmed) {
            bar.set_message(truncate(trimmed, 60));
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Byte progress for downloads and uploads.
///
/// The bar is hidden in CI so callers can always wrap readers and writers.
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    pub fn new(ctx: &UiContext, verb: &str, name: &str, total: u64) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "  {prefix} {msg}  {bar:20.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}",
            ) {
                bar.set_style(style.progress_chars("━╸─"));
            }
            bar.set_prefix(verb.to_string());
            bar.set_message(name.to_string());
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Engine bookkeeping lines that aren't useful to display.
fn is_build_noise(line: &str) -> bool {
    line.starts_with("--->")
        || line.starts_with("-->")
        || line.starts_with("Removing intermediate")
        || line.starts_with("COMMIT")
        || line.ends_with(" DONE")
        || line.ends_with(" CACHED")
}

/// Parse a build step line into `(n, total, instruction)`
pub(crate) fn parse_step_line(line: &str) -> Option<(u64, u64, &str)> {
    if let Some(rest) = line.strip_prefix("STEP ") {
        return parse_fraction(rest, ':');
    }
    if let Some(rest) = line.strip_prefix("Step ") {
        return parse_fraction(rest, ':');
    }
    // BuildKit: `#<id> [<stage> <n>/<m>] <instruction>`; the stage name is optional
    let rest = line.strip_prefix('#')?;
    let (_, rest) = rest.split_once(' ')?;
    let rest = rest.strip_prefix('[')?;
    let (inside, instruction) = rest.split_once(']')?;
    let fraction = inside.rsplit(' ').next()?;
    let (n, total) = fraction.split_once('/')?;
    Some((n.parse().ok()?, total.parse().ok()?, instruction.trim()))
}

/// `N/M<sep> instruction`, tolerating whitespace before the separator
fn parse_fraction(rest: &str, sep: char) -> Option<(u64, u64, &str)> {
    let (fraction, instruction) = rest.split_once(sep)?;
    let (n, total) = fraction.trim().split_once('/')?;
    Some((n.parse().ok()?, total.parse().ok()?, instruction.trim()))
}
