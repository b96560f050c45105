//! Content hashing with build-timestamp normalization.
//!
//! Artifacts may embed the RFC 3339 instant they were built at; two otherwise
//! identical generations must not hash differently because of it. Every match
//! is rewritten to the epoch sentinel, padded to the match length so all other
//! byte offsets survive untouched.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

static BUILD_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z").expect("timestamp pattern")
});

const SENTINEL: &[u8] = b"1970-01-01T00:00:00Z";

pub fn normalize_timestamps(bytes: &[u8]) -> Vec<u8> {
    BUILD_TIMESTAMP
        .replace_all(bytes, |caps: &regex::bytes::Captures<'_>| {
            let mut replacement = SENTINEL.to_vec();
            // The pattern never matches fewer bytes than the sentinel.
            replacement.resize(caps[0].len(), b'0');
            replacement
        })
        .into_owned()
}

/// SHA-256 hex digest of raw bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of an artifact's timestamp-normalized content.
pub fn hash_artifact(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(digest_bytes(&normalize_timestamps(&bytes)))
}
