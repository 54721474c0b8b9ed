//! Error types for catalog construction and resource loading.

use thiserror::Error;

use crate::uri::Uri;

/// Errors returned while building a [`BiomeCatalog`](crate::BiomeCatalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error reading the manifest file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// RON deserialization error.
    #[error("ron parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Two model assets share a name.
    #[error("duplicate model asset name: {0}")]
    DuplicateAsset(String),

    /// Two biomes share a name.
    #[error("duplicate biome name: {0}")]
    DuplicateBiome(String),

    /// The catalog already holds as many entries as its id type can address.
    #[error("catalog full: cannot register more than {limit} {kind}")]
    CatalogFull {
        /// `"biomes"` or `"model assets"`.
        kind: &'static str,
        /// Maximum number of entries.
        limit: u64,
    },

    /// A biome names a model asset the manifest does not define.
    #[error("biome {biome} references unknown model asset {asset}")]
    UnknownAsset {
        /// Name of the referencing biome.
        biome: String,
        /// Name of the missing asset.
        asset: String,
    },
}

/// Errors returned by a [`ResourceLoader`](crate::ResourceLoader).
///
/// The residency pipeline never propagates these; a failed load leaves the
/// corresponding model or texture absent.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing exists at the URI.
    #[error("resource not found: {0}")]
    NotFound(Uri),

    /// The resource exists but could not be read.
    #[error("io error reading {uri}: {source}")]
    Io {
        /// The URI being read.
        uri: Uri,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The image could not be decoded.
    #[error("image decode error for {uri}: {source}")]
    Image {
        /// The URI being decoded.
        uri: Uri,
        /// Underlying error.
        #[source]
        source: image::ImageError,
    },

    /// The model file could not be parsed.
    #[error("model parse error for {uri}: {source}")]
    Model {
        /// The URI being parsed.
        uri: Uri,
        /// Underlying error.
        #[source]
        source: ron::error::SpannedError,
    },
}
