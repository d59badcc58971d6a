//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Identifiers are opaque strings owned by the catalogue database. Because a
//! stream id ends up as a file-name component of the sprite artifact, every
//! id is restricted to ASCII letters, digits, `-` and `_` on parse, which
//! rules out path separators and `..` by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum accepted identifier length.
pub const MAX_ID_LEN: usize = 128;

/// Reason an identifier string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier is longer than {MAX_ID_LEN} characters")]
    TooLong,
    #[error("identifier contains invalid character {0:?}")]
    InvalidChar(char),
}

fn validate(s: &str) -> std::result::Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    match s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        Some(c) => Err(IdError::InvalidChar(c)),
        None => Ok(()),
    }
}

/// Generate a newtype ID wrapper over a validated `String`.
///
/// The macro produces a struct with:
/// - `new()` to create a random v4 UUID-backed id
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Serialize`, `Deserialize`
/// - `Display` and `FromStr` (validating) delegating to the inner string
/// - `as_str()` for borrowing the raw value
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(try_from = "String", into = "String")]
            pub struct $name(String);

            impl $name {
                /// Create a new random ID.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4().to_string())
                }

                /// Borrow the raw identifier.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl FromStr for $name {
                type Err = IdError;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    validate(s)?;
                    Ok(Self(s.to_string()))
                }
            }

            impl TryFrom<String> for $name {
                type Error = IdError;

                fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                    validate(&s)?;
                    Ok(Self(s))
                }
            }

            impl From<$name> for String {
                fn from(id: $name) -> Self {
                    id.0
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

typed_id! {
    /// Unique identifier for an episode.
    EpisodeId,
    /// Unique identifier for a video stream (the segmented source of an episode).
    StreamId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = EpisodeId::new();
        let b = EpisodeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_and_from_str() {
        let id: StreamId = "test-stream-id".parse().unwrap();
        assert_eq!(id.to_string(), "test-stream-id");
        assert_eq!(id.as_str(), "test-stream-id");
    }

    #[test]
    fn generated_ids_parse_back() {
        let id = StreamId::new();
        let parsed: StreamId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(EpisodeId::from_str(""), Err(IdError::Empty));
    }

    #[test]
    fn rejects_path_components() {
        assert_eq!(
            StreamId::from_str("../etc"),
            Err(IdError::InvalidChar('.'))
        );
        assert_eq!(
            StreamId::from_str("a/b"),
            Err(IdError::InvalidChar('/'))
        );
        assert!(StreamId::from_str("a\\b").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_ID_LEN + 1);
        assert_eq!(EpisodeId::from_str(&long), Err(IdError::TooLong));
        assert!(EpisodeId::from_str(&"a".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn serde_is_transparent_and_validating() {
        let id: EpisodeId = "ep_01".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ep_01\"");
        let back: EpisodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        assert!(serde_json::from_str::<EpisodeId>("\"bad id\"").is_err());
    }

    #[test]
    fn hash_set_usage() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let id = StreamId::new();
        set.insert(id.clone());
        assert!(set.contains(&id));
    }
}
