//! Resource loading: the [`ResourceLoader`] seam plus filesystem and in-memory loaders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::raster::Image;
use crate::scene::{ALBEDO_UNIT, Geometry, Node};
use crate::texture::Texture;
use crate::uri::Uri;

/// Opaque options forwarded to every load call of a materialization pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadOptions {
    /// Directory relative URIs resolve against, overriding the loader default.
    pub base_dir: Option<PathBuf>,
    /// Free-form loader hints.
    pub hints: BTreeMap<String, String>,
}

impl LoadOptions {
    /// Sets the base directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Adds a hint.
    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(key.into(), value.into());
        self
    }

    /// Looks up a hint.
    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(String::as_str)
    }
}

/// Loads models and images by URI.
///
/// Implementations perform blocking I/O and are called while the resident
/// data lock is held, from whichever thread drives materialization.
pub trait ResourceLoader: Send + Sync {
    /// Loads a model scene graph.
    fn load_model(&self, uri: &Uri, options: &LoadOptions) -> Result<Node, LoadError>;

    /// Loads and decodes an image.
    fn load_image(&self, uri: &Uri, options: &LoadOptions) -> Result<Image, LoadError>;
}

// ---------------------------------------------------------------------------
// Model file format
// ---------------------------------------------------------------------------

/// On-disk RON model description read by [`FileSystemLoader`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelFile {
    /// Node name.
    pub name: String,
    /// Meshes drawn at this node.
    #[serde(default)]
    pub meshes: Vec<MeshEntry>,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<ModelFile>,
}

/// A mesh inside a [`ModelFile`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeshEntry {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates.
    #[serde(default)]
    pub tex_coords: Vec<[f32; 2]>,
    /// Triangle indices.
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Albedo image, relative to the model file.
    #[serde(default)]
    pub texture: Option<String>,
}

impl ModelFile {
    /// Converts to a scene graph, resolving albedo textures through `texture_for`.
    pub fn into_node(self, texture_for: &mut impl FnMut(&str) -> Option<Arc<Texture>>) -> Node {
        let mut node = Node::new(self.name);
        for (index, mesh) in self.meshes.into_iter().enumerate() {
            let mut geometry = Geometry::new(
                mesh.positions.into_iter().map(Vec3::from).collect(),
                mesh.tex_coords.into_iter().map(Vec2::from).collect(),
                mesh.indices,
            );
            if let Some(texture) = mesh.texture.as_deref().and_then(&mut *texture_for) {
                geometry.bind(ALBEDO_UNIT, texture);
            }
            node.children
                .push(Node::new(format!("{}#{index}", node.name)).with_geometry(geometry));
        }
        for child in self.children {
            node.children.push(child.into_node(texture_for));
        }
        node
    }
}

// ---------------------------------------------------------------------------
// FileSystemLoader
// ---------------------------------------------------------------------------

/// Loads images with the `image` crate and models from RON [`ModelFile`]s.
#[derive(Clone, Debug, Default)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    /// Creates a loader resolving relative URIs against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, uri: &Uri, options: &LoadOptions) -> PathBuf {
        let path = Path::new(uri.full());
        if path.is_absolute() {
            return path.to_path_buf();
        }
        options
            .base_dir
            .as_deref()
            .unwrap_or(&self.root)
            .join(path)
    }
}

impl ResourceLoader for FileSystemLoader {
    fn load_model(&self, uri: &Uri, options: &LoadOptions) -> Result<Node, LoadError> {
        let path = self.resolve(uri, options);
        if !path.is_file() {
            return Err(LoadError::NotFound(uri.clone()));
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            uri: uri.clone(),
            source,
        })?;
        let file: ModelFile = ron::from_str(&contents).map_err(|source| LoadError::Model {
            uri: uri.clone(),
            source,
        })?;

        let node = file.into_node(&mut |name| {
            let texture_uri = uri.sibling(name);
            match self.load_image(&texture_uri, options) {
                Ok(image) => Some(Arc::new(Texture::from_source(image, texture_uri))),
                Err(err) => {
                    log::warn!("Model {uri}: {err}");
                    None
                }
            }
        });
        Ok(node)
    }

    fn load_image(&self, uri: &Uri, options: &LoadOptions) -> Result<Image, LoadError> {
        let path = self.resolve(uri, options);
        if !path.is_file() {
            return Err(LoadError::NotFound(uri.clone()));
        }
        let decoded = image::open(&path).map_err(|source| LoadError::Image {
            uri: uri.clone(),
            source,
        })?;
        Ok(Image::from(decoded))
    }
}

// ---------------------------------------------------------------------------
// MemoryLoader
// ---------------------------------------------------------------------------

/// In-memory resource table that counts every load request per URI.
///
/// Each successful load returns a fresh copy, the way a file would be
/// re-read, so deduplication above the loader is observable.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    models: FxHashMap<Uri, Node>,
    images: FxHashMap<Uri, Image>,
    requests: Mutex<FxHashMap<Uri, usize>>,
}

impl MemoryLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model.
    pub fn insert_model(&mut self, uri: impl Into<Uri>, node: Node) {
        self.models.insert(uri.into(), node);
    }

    /// Registers an image.
    pub fn insert_image(&mut self, uri: impl Into<Uri>, image: Image) {
        self.images.insert(uri.into(), image);
    }

    /// How many times `uri` has been requested, successful or not.
    pub fn request_count(&self, uri: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Uri::new(uri))
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, uri: &Uri) {
        *self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(uri.clone())
            .or_insert(0) += 1;
    }
}

impl ResourceLoader for MemoryLoader {
    fn load_model(&self, uri: &Uri, _options: &LoadOptions) -> Result<Node, LoadError> {
        self.record(uri);
        self.models
            .get(uri)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(uri.clone()))
    }

    fn load_image(&self, uri: &Uri, _options: &LoadOptions) -> Result<Image, LoadError> {
        self.record(uri);
        self.images
            .get(uri)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(uri.clone()))
    }
}
