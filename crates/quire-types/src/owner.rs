use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that may never appear in an owner id.
///
/// Owners travel inside manifest attribute values, so anything that would
/// terminate or open a tag is forbidden.
const FORBIDDEN_CHARS: &[char] = &['"', '<', '>'];

/// Account namespace a record is stored under.
///
/// Owners are canonicalized to lowercase on construction, so `0xABC` and
/// `0xabc` name the same namespace and always serialize identically.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Owner(String);

impl Owner {
    /// Validate and canonicalize an owner id.
    pub fn new(id: impl AsRef<str>) -> Result<Self, TypeError> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(TypeError::InvalidOwner {
                owner: id.to_string(),
                reason: "owner must not be empty".into(),
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidOwner {
                owner: id.to_string(),
                reason: "owner must not contain whitespace".into(),
            });
        }
        if let Some(ch) = id.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
            return Err(TypeError::InvalidOwner {
                owner: id.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
        Ok(Self(id.to_lowercase()))
    }

    /// The canonical (lowercase) id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner({})", self.0)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Owner {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Owner {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        owner.0
    }
}

impl AsRef<str> for Owner {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
