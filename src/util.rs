//! Bounded input readers.
//!
//! Action input and profile files are small JSON documents. Anything larger
//! than [`MAX_INPUT_SIZE`] is rejected before it is parsed.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{LeadflowError, Result};

/// Maximum size of one input document (1 MB).
pub const MAX_INPUT_SIZE: u64 = 1024 * 1024;

/// Read a file into a string, rejecting files over [`MAX_INPUT_SIZE`].
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_INPUT_SIZE)
}

/// Read a file into a string with a custom size limit.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| LeadflowError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(LeadflowError::invalid_input(format!(
            "file {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| LeadflowError::storage(path, e))
}

/// Read a stream to its end, failing once more than `max_size` bytes arrive.
pub fn read_stream_with_limit<R: Read>(reader: R, label: &str, max_size: u64) -> Result<String> {
    let mut input = String::new();
    reader
        .take(max_size + 1)
        .read_to_string(&mut input)
        .map_err(|e| LeadflowError::storage(label, e))?;

    if input.len() as u64 > max_size {
        return Err(LeadflowError::invalid_input(format!(
            "{} exceeds {} bytes",
            label, max_size
        )));
    }
    Ok(input)
}
