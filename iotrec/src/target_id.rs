//! Composite identifier for per-target log levels.
//!
//! A target is addressed by `targetType:targetName`. Target names may contain
//! colons themselves (thing group ARNs, client ids), so parsing splits on the
//! first colon only.

use thiserror::Error;

/// Separator between target type and target name.
pub const SEPARATOR: char = ':';

/// Identifier errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Malformed target identifier '{0}': expected <targetType>:<targetName>")]
    MalformedIdentifier(String),
}

/// Build a target id from its two parts. No normalization is applied.
pub fn build(target_type: &str, target_name: &str) -> String {
    format!("{target_type}{SEPARATOR}{target_name}")
}

/// Split a target id into `(target_type, target_name)` on the first colon.
pub fn parse(target_id: &str) -> Result<(String, String), IdentifierError> {
    target_id
        .split_once(SEPARATOR)
        .map(|(target_type, target_name)| (target_type.to_string(), target_name.to_string()))
        .ok_or_else(|| IdentifierError::MalformedIdentifier(target_id.to_string()))
}
