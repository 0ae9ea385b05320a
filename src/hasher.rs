//! Content digest computation for remote files

/// Compute the hex-encoded content digest for a file body.
///
/// Digests are compared between cycles to detect modification; size is
/// recorded alongside but never used for change detection.
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(blake3::hash(content).as_bytes())
}
