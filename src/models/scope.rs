//! Memory store partitioning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default family name when none is configured.
pub const DEFAULT_FAMILY: &str = "default";

/// The `(user, family)` pair a memory store partitions records by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryScope {
    /// Owning user.
    pub user_id: String,
    /// Family (household or group) the user belongs to.
    pub family: String,
}

impl MemoryScope {
    /// Creates a scope.
    #[must_use]
    pub fn new(user_id: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            family: family.into(),
        }
    }
}

impl Default for MemoryScope {
    fn default() -> Self {
        Self::new("default-user", DEFAULT_FAMILY)
    }
}

impl fmt::Display for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.user_id)
    }
}
