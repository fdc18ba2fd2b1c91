//! Partition naming.
//!
//! Every partition is named `<version>/<namespace>/<role>`, so one release
//! owns exactly one partition per role and stale releases can be found by
//! prefix alone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// What a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Offline fallback set and mandatory static assets.
    Static,
    /// Visited documents.
    Pages,
    /// Images stashed on cache-first misses.
    Images,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Static, Role::Pages, Role::Images];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Static => "static",
            Role::Pages => "pages",
            Role::Images => "images",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Role::Static),
            "pages" => Ok(Role::Pages),
            "images" => Ok(Role::Images),
            other => Err(Error::InvalidInput(format!("unknown partition role: {other}"))),
        }
    }
}

/// Partition names for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    version_tag: String,
    namespace: String,
}

impl PartitionNames {
    pub fn new(version_tag: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { version_tag: version_tag.into(), namespace: namespace.into() }
    }

    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    pub fn name(&self, role: Role) -> String {
        format!("{}/{}/{}", self.version_tag, self.namespace, role)
    }

    /// Whether `name` belongs to this release.
    pub fn is_current(&self, name: &str) -> bool {
        belongs_to(name, &self.version_tag)
    }
}

/// A partition belongs to a version when its first path segment is that version.
///
/// The tag must be followed by `/`: `v10/app/pages` does not belong to `v1`.
pub fn belongs_to(name: &str, version_tag: &str) -> bool {
    name.strip_prefix(version_tag).is_some_and(|rest| rest.starts_with('/'))
}
