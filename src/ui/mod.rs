//! Terminal output: progress bars on a TTY, plain lines in CI
//!
//! Diagnostics go through `tracing`; this module only renders progress
//! and the final per-command summary.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, outro_success, section, step_info, step_ok, step_ok_detail, step_warn};
pub use progress::{BuildProgress, TransferProgress};
