//! Request diagnostic dump: writes the artifacts of one coding request to disk.
//!
//! **Activation**: only when a dump directory is configured (`MEDCODER_DUMP_DIR`).
//! Nothing here can fail a request; every error is logged and swallowed.
//!
//! **Output structure**:
//! ```text
//! {dump_dir}/{request_id}/
//!   01-request.json
//!   02-raw-response.txt
//!   03-result.json
//! ```

use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const REQUEST_FILE: &str = "01-request.json";
pub const RAW_RESPONSE_FILE: &str = "02-raw-response.txt";
pub const RESULT_FILE: &str = "03-result.json";

// ──────────────────────────────────────────────
// Dump directory resolution
// ──────────────────────────────────────────────

/// `base/{request_id}`, created on demand. `None` when it cannot be created.
pub fn dump_dir_for(base: &Path, request_id: &Uuid) -> Option<PathBuf> {
    let dir = base.join(request_id.to_string());

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Request dump: could not create directory"
        );
        return None;
    }

    Some(dir)
}

// ──────────────────────────────────────────────
// Dump writers
// ──────────────────────────────────────────────

/// Pretty-print `value` into `dir/filename`. Used for the outbound request and
/// the normalized result.
pub fn dump_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => dump_text(dir, filename, &json),
        Err(e) => tracing::warn!(
            file = filename,
            error = %e,
            "Request dump: could not serialize artifact"
        ),
    }
}

/// Store `text` verbatim in `dir/filename`.
pub fn dump_text(dir: &Path, filename: &str, text: &str) {
    let path = dir.join(filename);
    if let Err(e) = std::fs::write(&path, text) {
        tracing::warn!(path = %path.display(), error = %e, "Request dump: write failed");
        return;
    }
    tracing::debug!(path = %path.display(), bytes = text.len(), "Request dump: artifact stored");
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
