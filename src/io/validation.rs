//! Import validation and duplicate detection.
//!
//! Validates imported records before any persistence happens and tracks
//! which texts have already been seen during a run.

use super::imported::ImportedMemory;
use crate::models::{MemoryRecord, MemoryType, parse_timestamp};
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Warning: issue noted but import can proceed.
    Warning,
    /// Error: the record cannot be imported.
    Error,
}

/// A validation issue found during import.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// The field that has an issue.
    pub field: String,
    /// Description of the issue.
    pub message: String,
    /// Severity of the issue.
    pub severity: ValidationSeverity,
}

impl ValidationIssue {
    /// Creates a warning issue.
    #[must_use]
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }

    /// Creates an error issue.
    #[must_use]
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }
}

/// Result of validating one imported record.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Issues found, warnings included.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns true if no error-level issue was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Iterates warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
    }
}

/// Validates imported records.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportValidator;

impl ImportValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates one record.
    ///
    /// Missing text is an error. Unknown types and unparseable timestamps are
    /// warnings: the record is still imported with defaults.
    #[must_use]
    pub fn validate(&self, imported: &ImportedMemory) -> ValidationResult {
        let mut issues = Vec::new();

        if imported.resolved_text().is_none() {
            issues.push(ValidationIssue::error("memory", "Memory has no content"));
        }

        if let Some(ref t) = imported.memory_type {
            if MemoryType::parse(t).is_none() {
                issues.push(ValidationIssue::warning(
                    "type",
                    format!("Unknown type '{t}', using 'custom'"),
                ));
            }
        }

        if let Some(ref ts) = imported.created_at {
            if parse_timestamp(ts).is_none() {
                issues.push(ValidationIssue::warning(
                    "created_at",
                    format!("Unparseable timestamp '{ts}', using current time"),
                ));
            }
        }

        ValidationResult { issues }
    }

    /// All-or-nothing gate run before persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecords`] with the number of records that
    /// fail validation, if there are any.
    pub fn ensure_all_valid(&self, records: &[ImportedMemory]) -> Result<()> {
        let count = records
            .iter()
            .filter(|r| !self.validate(r).is_valid())
            .count();
        if count > 0 {
            return Err(Error::InvalidRecords { count });
        }
        Ok(())
    }
}

/// How two memory texts are compared for duplicate suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DuplicatePolicy {
    /// Byte-for-byte equality.
    #[default]
    Exact,
    /// Equality after trimming leading/trailing whitespace.
    Trimmed,
    /// Equality after trimming, lowercasing and collapsing whitespace.
    Normalized,
}

impl DuplicatePolicy {
    /// Returns the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Trimmed => "trimmed",
            Self::Normalized => "normalized",
        }
    }

    /// Returns the comparison key for `text` under this policy.
    #[must_use]
    pub fn key(&self, text: &str) -> String {
        match self {
            Self::Exact => text.to_string(),
            Self::Trimmed => text.trim().to_string(),
            Self::Normalized => content_hash(text),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "trimmed" | "trim" => Ok(Self::Trimmed),
            "normalized" | "normalised" => Ok(Self::Normalized),
            _ => Err(Error::InvalidInput(format!("Unknown duplicate policy: {s}"))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Texts already present or already persisted during an import run.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    policy: DuplicatePolicy,
    seen: HashSet<String>,
}

impl DuplicateSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            seen: HashSet::new(),
        }
    }

    /// Creates a set seeded with the texts of an existing collection.
    #[must_use]
    pub fn seeded(policy: DuplicatePolicy, existing: &[MemoryRecord]) -> Self {
        let mut set = Self::new(policy);
        for record in existing {
            set.insert(record.text());
        }
        set
    }

    /// Returns true if `text` matches a seen text.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(&self.policy.key(text))
    }

    /// Adds `text`; returns false if it was already present.
    pub fn insert(&mut self, text: &str) -> bool {
        self.seen.insert(self.policy.key(text))
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Normalizes text for comparison: trim, lowercase, collapse whitespace.
#[must_use]
pub fn normalize_text(content: &str) -> String {
    content
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase hex SHA-256 of the normalized text.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(content).as_bytes());
    hex::encode(hasher.finalize())
}
