//! String helpers shared by the storage and notification crates.

/// Truncates to at most `max_len` bytes on a char boundary, marking the cut.
///
/// ```
/// use beacon_common::text::truncate_string;
///
/// assert_eq!(truncate_string("hello", 10), "hello");
/// assert_eq!(truncate_string("hello world", 5), "hello... [truncated]");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
