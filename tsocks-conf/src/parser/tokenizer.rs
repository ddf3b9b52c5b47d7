//! Line tokenizer for the configuration file

/// Maximum number of fields taken from one line; the rest is ignored
pub const MAX_FIELDS: usize = 10;

/// Marker that starts a trailing comment when it begins a field
pub const COMMENT_MARKER: char = '#';

fn is_field_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Split a line into at most [`MAX_FIELDS`] space/tab delimited fields.
///
/// Tokenizing stops at the first field beginning with `#`; that field and
/// everything after it are dropped. An empty result means the line is blank
/// or only a comment.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(is_field_separator)
        .filter(|field| !field.is_empty())
        .take_while(|field| !field.starts_with(COMMENT_MARKER))
        .take(MAX_FIELDS)
        .collect()
}
