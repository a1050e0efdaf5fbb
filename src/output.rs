//! CLI output formatting.
//!
//! Each formatter returns `Vec<String>` and does no I/O; `print_*` wrappers
//! write to stdout. Diagnostics go through `tracing` to stderr, so stdout
//! carries only what a user of the device would see on screen.
//!
//! # Workflow display
//!
//! ```text
//! Location: 9.9252, 78.1198
//! Captured 20250314-091502.jpg (3412 KB)
//! Reduced 4000x3000 → 1000x750 (compressed_20250314-091502.jpg)
//! Analyzing...
//! Authorized: false
//! Reason: Billboard is outside any permitted zone
//! ```
//!
//! State transitions print nothing; they are logged at `debug`. A reduction
//! that fell back to the original prints nothing either: the fallback is
//! invisible to the user and only logged.

use crate::config::ClientConfig;
use crate::imaging::{Reduction, calculate_sampled_dimensions};
use crate::location::LocationFix;
use crate::session::SessionError;
use crate::workflow::WorkflowEvent;
use std::path::Path;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn kilobytes(bytes: u64) -> u64 {
    bytes / 1024
}

// ============================================================================
// Workflow events
// ============================================================================

/// Format one workflow event as display lines. Many events display nothing.
pub fn format_workflow_event(event: &WorkflowEvent) -> Vec<String> {
    match event {
        WorkflowEvent::StateChanged(_) => vec![],
        WorkflowEvent::Location(LocationFix::Position(p)) => vec![format!("Location: {p}")],
        WorkflowEvent::Location(LocationFix::Unavailable) => {
            vec!["Could not get location.".to_string()]
        }
        WorkflowEvent::Captured(image) => vec![format!(
            "Captured {} ({} KB)",
            file_name(&image.path),
            kilobytes(image.size_bytes)
        )],
        WorkflowEvent::CaptureFailed(_) => vec![],
        WorkflowEvent::Reduced(reduction @ Reduction::Reduced { .. }) => {
            format_reduction(reduction)
        }
        WorkflowEvent::Reduced(Reduction::Unreduced { .. }) => vec![],
        WorkflowEvent::Analyzing => vec!["Analyzing...".to_string()],
        WorkflowEvent::Finished(outcome) => outcome.to_string().lines().map(String::from).collect(),
        WorkflowEvent::Busy => vec!["Capture already in progress.".to_string()],
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Format a reduction result.
///
/// Used by the workflow display for successful reductions and by the
/// `reduce` command, which also shows why a fallback happened.
pub fn format_reduction(reduction: &Reduction) -> Vec<String> {
    match reduction {
        Reduction::Reduced {
            path,
            original,
            factor,
        } => {
            let (w, h) = calculate_sampled_dimensions((original.width, original.height), *factor);
            vec![format!(
                "Reduced {}x{} → {}x{} ({})",
                original.width,
                original.height,
                w,
                h,
                file_name(path)
            )]
        }
        Reduction::Unreduced { path, reason } => vec![
            format!("Unchanged {}", file_name(path)),
            format!("    {reason}"),
        ],
    }
}

pub fn print_reduction(reduction: &Reduction) {
    for line in format_reduction(reduction) {
        println!("{}", line);
    }
}

// ============================================================================
// Preflight / check
// ============================================================================

/// Format a failed session start. Permission failures list each missing
/// capability with a config hint.
pub fn format_session_error(err: &SessionError) -> Vec<String> {
    let mut lines = vec![err.to_string()];
    if let SessionError::PermissionsNotGranted(missing) = err {
        for permission in missing {
            lines.push(format!("    {}: {}", permission, permission.hint()));
        }
    }
    lines
}

pub fn print_session_error(err: &SessionError) {
    for line in format_session_error(err) {
        println!("{}", line);
    }
}

/// Format the resolved setup shown by `check`.
pub fn format_check(config: &ClientConfig, output_dir: &Path, endpoint: &str) -> Vec<String> {
    let camera = if let Some(still) = &config.camera.still {
        format!("still {}", still.display())
    } else {
        config.camera.command.join(" ")
    };
    let location = match (
        config.location.latitude,
        config.location.longitude,
        &config.location.fix_file,
    ) {
        (Some(lat), Some(lon), _) => format!("fixed {lat}, {lon}"),
        (_, _, Some(file)) => format!("fix file {}", file.display()),
        _ => "none".to_string(),
    };
    vec![
        format!("Camera: {camera}"),
        format!("Location: {location}"),
        format!("Captures: {}", output_dir.display()),
        format!("Server: {endpoint}"),
        format!(
            "Reduction: {} px budget, quality {}",
            config.reduction.pixel_budget, config.reduction.quality
        ),
    ]
}
