use crate::error::SynthError;
use sha2::{Digest, Sha256};

/// Path segments that name a construct's primary resource and are left out of logical ids.
const HIDDEN_SEGMENTS: [&str; 2] = ["Resource", "Default"];
const HASH_LEN: usize = 8;
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Checks that a construct id can be used as one segment of a construct path.
pub fn validate_construct_id(id: &str) -> Result<(), SynthError> {
    let invalid = |message: &str| SynthError::InvalidConstructId {
        id: id.to_string(),
        message: message.to_string(),
    };
    if id.is_empty() {
        return Err(invalid("construct ids cannot be empty"));
    }
    if id.contains('/') {
        return Err(invalid("construct ids cannot contain '/'"));
    }
    if !id.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("construct ids need at least one letter or digit"));
    }
    Ok(())
}

/// Upper-case hex prefix of the SHA-256 of a construct path.
pub fn path_hash(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let hex = format!("{:x}", digest).to_uppercase();
    hex[..HASH_LEN].to_string()
}

/// Derives a stable logical id from a construct path, e.g.
/// `state_machine/Resource` becomes `statemachine` followed by an 8-digit hash.
pub fn logical_id(path: &str) -> String {
    let mut human: String = path
        .split('/')
        .filter(|segment| !HIDDEN_SEGMENTS.contains(segment))
        .flat_map(|segment| segment.chars().filter(|c| c.is_ascii_alphanumeric()))
        .collect();
    if human.is_empty() || human.starts_with(|c: char| c.is_ascii_digit()) {
        human.insert(0, 'R');
    }
    human.truncate(MAX_LOGICAL_ID_LEN - HASH_LEN);
    format!("{}{}", human, path_hash(path))
}

/// Derives a deterministic physical name of at most `max_len` characters:
/// `<stack>-<path>-<hash>`, shortening the readable part when needed.
pub fn physical_name(stack_name: &str, path: &str, max_len: usize) -> String {
    let readable: String = path
        .split('/')
        .filter(|segment| !HIDDEN_SEGMENTS.contains(segment))
        .flat_map(|segment| segment.chars().filter(|c| c.is_ascii_alphanumeric()))
        .collect();
    let stack: String = stack_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let hash = path_hash(&format!("{}/{}", stack_name, path));

    let mut prefix = format!("{}-{}", stack, readable);
    // room for "-" plus the hash
    let budget = max_len.saturating_sub(HASH_LEN + 1);
    prefix.truncate(budget);
    format!("{}-{}", prefix.trim_end_matches('-'), hash)
}
