// src/util.rs — Shared utility functions

use std::path::Path;

/// Parse a list-style text file body: one entry per line, surrounding
/// whitespace trimmed, blank lines and `#` comments dropped.
pub fn list_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Read a list-style file. `Ok(None)` when the file does not exist.
pub fn read_list_file(path: &Path) -> std::io::Result<Option<Vec<String>>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(
            list_lines(&content).into_iter().map(String::from).collect(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Truncate a string for display/logging (UTF-8 safe).
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}
