use serde::{Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string credential whose memory is zeroed on drop.
///
/// Used for passwords and bearer tokens while they live in request bodies or
/// headers. `Debug` and `Display` never print the contents.
#[derive(Zeroize, ZeroizeOnDrop, Default)]
pub struct Secret {
    data: String,
}

impl Secret {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// Borrow the secret value.
    ///
    /// The returned slice points at memory that is zeroed when `self` drops.
    pub fn expose_secret(&self) -> &str {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl From<String> for Secret {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

impl From<&str> for Secret {
    fn from(data: &str) -> Self {
        Self::new(data)
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.data.as_bytes() == other.data.as_bytes()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Secret: {} bytes]", self.len())
    }
}

// Request bodies carry the raw value; nothing deserializes into a Secret.
impl Serialize for Secret {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data)
    }
}
