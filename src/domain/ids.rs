//! Domain identifier types
//!
//! Every aggregate and piece is keyed by a UUID. Each key gets its own newtype so
//! an export id can never be passed where an import id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parses an identifier from its hyphenated string form
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty or not a UUID
            pub fn parse(value: &str) -> Result<Self, String> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(format!("{} cannot be empty", $label));
                }
                Uuid::parse_str(trimmed)
                    .map(Self)
                    .map_err(|e| format!("Invalid {} '{}': {}", $label, value, e))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_identifier!(
    /// Identity of a cloneable resource (a project or a scenario)
    ResourceId,
    "resource ID"
);

uuid_identifier!(
    /// Identity of an export aggregate
    ExportId,
    "export ID"
);

uuid_identifier!(
    /// Identity of an import aggregate
    ImportId,
    "import ID"
);

uuid_identifier!(
    /// Identity of a single piece within an export or import
    ComponentId,
    "component ID"
);

uuid_identifier!(
    /// Identity of the user owning an import
    UserId,
    "user ID"
);
