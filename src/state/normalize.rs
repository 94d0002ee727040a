use sha1::{Digest, Sha1};

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-1 digest of `text`.
pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
