//! Extension name to schema URI registry.

use std::collections::BTreeMap;

use tracing::warn;

const DEFAULT_EXTENSIONS: &[(&str, &str)] = &[
    (
        "version",
        "https://stac-extensions.github.io/version/v1.0.0/schema.json",
    ),
    (
        "processing",
        "https://stac-extensions.github.io/processing/v1.1.0/schema.json",
    ),
    (
        "item-assets",
        "https://stac-extensions.github.io/item-assets/v1.0.0/schema.json",
    ),
    (
        "datacube",
        "https://stac-extensions.github.io/datacube/v2.0.0/schema.json",
    ),
    ("eo", "https://stac-extensions.github.io/eo/v1.0.0/schema.json"),
    ("sar", "https://stac-extensions.github.io/sar/v1.0.0/schema.json"),
    (
        "storage",
        "https://stac-extensions.github.io/storage/v1.0.0/schema.json",
    ),
];

/// Maps extension names (`eo`, `datacube`, ...) to schema URIs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRegistry {
    uris: BTreeMap<String, String>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self {
            uris: DEFAULT_EXTENSIONS
                .iter()
                .map(|(name, uri)| ((*name).to_string(), (*uri).to_string()))
                .collect(),
        }
    }
}

impl ExtensionRegistry {
    /// Built-in registry with `overrides` merged over it.
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut registry = Self::default();
        registry.uris.extend(overrides);
        registry
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.uris.get(name).map(String::as_str)
    }

    /// URIs of the given extensions, in order. Unknown names are skipped.
    pub fn resolve<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|name| match self.get(name) {
                Some(uri) => Some(uri.to_string()),
                None => {
                    warn!(extension = %name, "unknown STAC extension");
                    None
                }
            })
            .collect()
    }
}
