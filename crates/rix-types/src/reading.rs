//! Reading records.
//!
//! A reading is an immutable, timestamped measurement produced by a device.
//! It comes in exactly two shapes, captured by the closed [`Reading`] enum:
//! a simple (scalar, textual) value or a binary value with a media type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// Fields shared by every reading variant.
///
/// `id` is kept as text so that a client-supplied identifier can be carried
/// until it is validated; an empty `id` asks the repository to generate one.
/// A zero `created` asks the repository to stamp the current time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaseReading {
    pub id: String,
    pub created: Timestamp,
    pub origin: Timestamp,
    pub device_name: String,
    pub resource_name: String,
    pub profile_name: String,
    pub value_type: String,
}

impl BaseReading {
    pub fn new(
        device_name: impl Into<String>,
        resource_name: impl Into<String>,
        profile_name: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            resource_name: resource_name.into(),
            profile_name: profile_name.into(),
            value_type: value_type.into(),
            ..Default::default()
        }
    }
}

/// A reading carrying a scalar value rendered as text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleReading {
    #[serde(flatten)]
    pub base: BaseReading,
    #[serde(default)]
    pub value: String,
}

impl SimpleReading {
    pub fn new(base: BaseReading, value: impl Into<String>) -> Self {
        Self {
            base,
            value: value.into(),
        }
    }
}

/// A reading carrying an opaque binary payload.
///
/// The payload is never persisted by the repository; only the structural
/// fields and the media type survive a write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryReading {
    #[serde(flatten)]
    pub base: BaseReading,
    #[serde(default)]
    pub binary_value: Vec<u8>,
    #[serde(default)]
    pub media_type: String,
}

impl BinaryReading {
    pub fn new(base: BaseReading, media_type: impl Into<String>, binary_value: Vec<u8>) -> Self {
        Self {
            base,
            binary_value,
            media_type: media_type.into(),
        }
    }
}

/// Discriminant of a [`Reading`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingKind {
    Simple,
    Binary,
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// A device reading.
///
/// Serialized as a single JSON document: the base fields at the top level,
/// the variant fields beside them, and a `readingKind` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "readingKind", rename_all = "camelCase")]
pub enum Reading {
    Simple(SimpleReading),
    Binary(BinaryReading),
}

impl Reading {
    pub fn kind(&self) -> ReadingKind {
        match self {
            Self::Simple(_) => ReadingKind::Simple,
            Self::Binary(_) => ReadingKind::Binary,
        }
    }

    pub fn base(&self) -> &BaseReading {
        match self {
            Self::Simple(r) => &r.base,
            Self::Binary(r) => &r.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseReading {
        match self {
            Self::Simple(r) => &mut r.base,
            Self::Binary(r) => &mut r.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn device_name(&self) -> &str {
        &self.base().device_name
    }

    pub fn created(&self) -> Timestamp {
        self.base().created
    }

    /// Set the identifier, consuming and returning the reading.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.base_mut().id = id.into();
        self
    }

    /// Set the creation timestamp, consuming and returning the reading.
    pub fn with_created(mut self, created: Timestamp) -> Self {
        self.base_mut().created = created;
        self
    }
}

impl From<SimpleReading> for Reading {
    fn from(r: SimpleReading) -> Self {
        Self::Simple(r)
    }
}

impl From<BinaryReading> for Reading {
    fn from(r: BinaryReading) -> Self {
        Self::Binary(r)
    }
}
