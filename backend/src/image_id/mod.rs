//! Public image identifiers, which double as storage keys

use std::fmt;

use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

/// Opaque 128-bit random identifier rendered as 32 lowercase hex chars
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Length of every generated identifier
    pub const LEN: usize = 32;

    /// Generates a fresh identifier from the OS random source
    ///
    /// Collisions are not checked; 122 random bits make them negligible.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrows the identifier as a storage key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_id_is_32_lowercase_hex_chars() {
        let id = ImageId::generate();
        assert_eq!(id.as_str().len(), ImageId::LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<_> = (0..10_000).map(|_| ImageId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn display_matches_storage_key() {
        let id = ImageId::generate();
        assert_eq!(id.to_string(), id.as_str());
        assert_eq!(id.clone().into_inner(), id.as_str());
    }
}
