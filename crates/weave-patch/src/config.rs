//! Patch compiler configuration.

use std::borrow::Cow;

/// How elements without an authored `id` are keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IdentityStrategy {
    /// A fresh random key per compile. Keys never repeat across compiles,
    /// so executors cannot match unkeyed elements between two patches.
    #[default]
    Generated,
    /// A key derived from the element's position path (`@0.2.1`),
    /// counted from the nearest ancestor with an authored id (`card-1@0`).
    /// Identical markup always yields identical keys.
    Structural,
}

/// The key an element with `id` attribute `id` is given.
///
/// Every `@` is doubled, so an authored key never contains an odd run of
/// `@` while every structural key does. `"@0"` keys as `"@@0"` and cannot
/// meet the structural key of the first top-level element.
#[must_use]
pub fn authored_key(id: &str) -> Cow<'_, str> {
    if id.contains('@') {
        Cow::Owned(id.replace('@', "@@"))
    } else {
        Cow::Borrowed(id)
    }
}

/// Configuration for [`PatchCompiler`](crate::PatchCompiler).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PatchConfig {
    /// Maximum number of cached patches before the least recently used one
    /// is evicted. Zero disables the bound.
    /// Default: 256
    pub cache_capacity: usize,

    /// Keying of elements without an `id` attribute.
    /// Default: `Generated`
    pub identity: IdentityStrategy,

    /// Omit attributes whose value is empty (`disabled`, `class=""`).
    /// Default: true
    pub drop_empty_attributes: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            identity: IdentityStrategy::Generated,
            drop_empty_attributes: true,
        }
    }
}

impl PatchConfig {
    /// Configuration with deterministic element keys.
    #[must_use]
    pub fn structural() -> Self {
        Self {
            identity: IdentityStrategy::Structural,
            ..Self::default()
        }
    }

    /// Builder-style capacity override.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
