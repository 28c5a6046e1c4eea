//! Container engine orchestration
//!
//! Builds run through the engine's command line (docker or podman). Build
//! output is streamed line by line and classified so that the first
//! engine-level error aborts the build immediately.

mod cli_runtime;
mod factory;
mod runtime;

pub use cli_runtime::CliRuntime;
pub use factory::{create_runtime, Engine};
pub use runtime::{ContainerRuntime, ImageBuildRequest};

#[cfg(test)]
pub(crate) use runtime::fakes;

use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Podman prints its own failures with these prefixes. A bare `Error:` may
/// come from a tool running inside a step.
const PODMAN_FAILURE_PREFIXES: &[&str] = &[
    "Error: building at STEP",
    "Error: error building at STEP",
    "Error: creating build container",
];

/// Classified line of build output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildLine {
    Log(String),
    Error(String),
}

/// Classify one line of engine output.
///
/// Error lines are the engine's own failure reports, not compiler
/// diagnostics from inside a `RUN` step.
pub fn classify_line(line: &str) -> BuildLine {
    if is_error_line(line) {
        BuildLine::Error(line.to_string())
    } else {
        BuildLine::Log(line.to_string())
    }
}

fn is_error_line(line: &str) -> bool {
    let body = strip_buildkit_marker(line.trim_start());
    body.starts_with("ERROR:")
        || PODMAN_FAILURE_PREFIXES.iter().any(|p| body.starts_with(p))
        || (body.starts_with("The command '") && body.contains("returned a non-zero code"))
}

/// Strip a BuildKit `#<n> ` step marker, if present
fn strip_buildkit_marker(line: &str) -> &str {
    let Some(rest) = line.strip_prefix('#') else {
        return line;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    rest[digits..].strip_prefix(' ').unwrap_or(line)
}

/// Extract the useful tail of build output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `BUILD_ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > BUILD_ERROR_TAIL_LINES {
        lines[total - BUILD_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// How a streamed build ended
#[derive(Debug)]
pub(crate) enum StreamEnd {
    /// Both pipes closed without an error line; the last lines are kept
    Drained(Vec<String>),
    /// An error line was seen and the child was killed
    Aborted(String),
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Stops at the first error line and kills the child. This is a standalone
/// async function (not behind `async_trait`) to avoid lifetime issues with the
/// `dyn Fn` callback.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(&str) + Send + Sync),
) -> StreamEnd {
    let mut tail: VecDeque<String> = VecDeque::with_capacity(BUILD_ERROR_TAIL_LINES);

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return StreamEnd::Drained(Vec::new());
    };
    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stderr_done || !stdout_done {
        let line = tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => match line {
                Ok(Some(line)) => line,
                _ => { stderr_done = true; continue; }
            },
            line = stdout_reader.next_line(), if !stdout_done => match line {
                Ok(Some(line)) => line,
                _ => { stdout_done = true; continue; }
            },
        };

        on_output(&line);
        if let BuildLine::Error(message) = classify_line(&line) {
            let _ = child.start_kill();
            return StreamEnd::Aborted(message);
        }

        if tail.len() == BUILD_ERROR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    StreamEnd::Drained(tail.into_iter().collect())
}
