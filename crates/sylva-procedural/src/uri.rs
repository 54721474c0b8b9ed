//! Resource locators for models and billboard images.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a model or image, as written in the catalog.
///
/// Kept as a plain string so catalogs can name local paths or remote
/// resources alike; the [`ResourceLoader`](crate::ResourceLoader) decides
/// how to resolve it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    /// Creates a URI from any string-like value.
    pub fn new(full: impl Into<String>) -> Self {
        Self(full.into())
    }

    /// The full URI string.
    pub fn full(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty URI.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new URI with `suffix` appended verbatim (`tree.obj` + `.side.png`).
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(format!("{}{}", self.0, suffix))
    }

    /// Everything before the final extension (`dir/pine.png` -> `dir/pine`).
    pub fn name_less_extension(&self) -> &str {
        match self.extension_dot() {
            Some(dot) => &self.0[..dot],
            None => &self.0,
        }
    }

    /// The final extension without the dot, or `""` when there is none.
    pub fn extension(&self) -> &str {
        match self.extension_dot() {
            Some(dot) => &self.0[dot + 1..],
            None => "",
        }
    }

    /// The file name component (`dir/pine.png` -> `pine.png`).
    pub fn base(&self) -> &str {
        match self.separator() {
            Some(sep) => &self.0[sep + 1..],
            None => &self.0,
        }
    }

    /// Resolves `name` next to this URI (`dir/pine.ron` + `bark.png` -> `dir/bark.png`).
    /// Names that already look absolute are returned unchanged.
    pub fn sibling(&self, name: &str) -> Self {
        if name.starts_with('/') || name.contains("://") {
            return Self::new(name);
        }
        match self.separator() {
            Some(sep) => Self(format!("{}{}", &self.0[..=sep], name)),
            None => Self::new(name),
        }
    }

    fn separator(&self) -> Option<usize> {
        self.0.rfind(['/', '\\'])
    }

    fn extension_dot(&self) -> Option<usize> {
        let dot = self.0.rfind('.')?;
        match self.separator() {
            Some(sep) if sep > dot => None,
            _ => Some(dot),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Uri {
    fn from(value: String) -> Self {
        Self(value)
    }
}
