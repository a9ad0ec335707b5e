//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each image is shown by its 1-based position in the batch and its source
//! reference, with the produced file and storage key as indented context.
//! Positions match the order of `imageName` in the request, so a failing
//! image can be traced straight back to its entry.
//!
//! # Output Format
//!
//! ## Progress
//!
//! ```text
//! Batch 3f1c (2 images)
//!     001 uploads/a.jpg → a.png
//!         800x600, 412.7 KB
//!     002 uploads/b.png → b.jpg
//!         640x480, 88.1 KB
//!     001 stored as uploads/a.png
//!     002 stored as uploads/b.jpg
//! ```
//!
//! ## Result
//!
//! ```text
//! Files uploaded successfully
//!     a.png → https://bucket/uploads/a.png
//!     b.jpg → https://bucket/uploads/b.jpg
//! ```
//!
//! # Architecture
//!
//! Each kind of output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure, with no I/O and no side effects.

use crate::handler::HandlerResponse;
use crate::process::ProcessEvent;
use crate::request::BatchResponse;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size with one decimal.
fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted {
            upload_id,
            image_count,
        } => vec![format!(
            "Batch {} ({})",
            upload_id,
            plural(*image_count, "image", "images")
        )],
        ProcessEvent::ImageRendered {
            index,
            reference,
            filename,
            width,
            height,
            bytes,
        } => vec![
            format!(
                "{}{} {} → {}",
                indent(1),
                format_index(index + 1),
                display_reference(reference),
                filename
            ),
            format!(
                "{}{}x{}, {}",
                indent(2),
                width,
                height,
                format_size(*bytes)
            ),
        ],
        ProcessEvent::ImageStored { index, key } => vec![format!(
            "{}{} stored as {}",
            indent(1),
            format_index(index + 1),
            key
        )],
        ProcessEvent::RolledBack { restored, removed } => vec![format!(
            "Rolled back: {} restored, {} removed",
            plural(*restored, "object", "objects"),
            removed
        )],
    }
}

/// Inline data URIs are shortened to their media type.
fn display_reference(reference: &str) -> String {
    match reference.strip_prefix("data:") {
        Some(rest) => {
            let media = rest.split([';', ',']).next().unwrap_or_default();
            format!("(inline {})", if media.is_empty() { "data" } else { media })
        }
        None => reference.to_string(),
    }
}

// ============================================================================
// Results
// ============================================================================

/// Format a successful batch: message, then one `filename → url` per image.
pub fn format_batch_response(response: &BatchResponse) -> Vec<String> {
    let mut lines = vec![response.message.clone()];
    for (filename, url) in response.filenames.iter().zip(&response.urls) {
        lines.push(format!("{}{} → {}", indent(1), filename, url));
    }
    lines
}

pub fn print_batch_response(response: &BatchResponse) {
    for line in format_batch_response(response) {
        println!("{}", line);
    }
}

/// Format a handler response: status line, headers, blank line, body.
pub fn format_handler_response(response: &HandlerResponse) -> Vec<String> {
    let mut lines = vec![format!("Status: {}", response.status)];
    for (name, value) in &response.headers {
        lines.push(format!("{}: {}", name, value));
    }
    lines.push(String::new());
    if !response.body.is_empty() {
        lines.push(response.body.clone());
    }
    lines
}

pub fn print_handler_response(response: &HandlerResponse) {
    for line in format_handler_response(response) {
        println!("{}", line);
    }
}
