//! Partial audiobook manifest schema.
//!
//! Only the fields consumed by the DRM pipeline are modelled: the Feedbooks
//! rights extension inside `metadata` and the `links` array. Decoding is
//! lenient. A field of the wrong JSON type is treated as absent instead of
//! failing the whole manifest, matching how publishers' manifests are seen in
//! the wild.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DrmError, Result};

/// Metadata key of the Feedbooks rights extension.
pub const FEEDBOOKS_RIGHTS_KEY: &str = "http://www.feedbooks.com/audiobooks/rights";

/// Link relation of the license-status document.
pub const LICENSE_REL: &str = "license";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Manifest {
    /// `None` when the manifest has no `metadata` object.
    pub metadata: Option<ManifestMetadata>,
    pub links: Vec<ManifestLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestMetadata {
    pub identifier: Option<String>,
    pub title: Option<String>,
    /// Feedbooks rights extension, when present as an object.
    pub rights: Option<RightsWindow>,
}

/// Raw rights window strings. Parsing happens during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RightsWindow {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestLink {
    pub rel: Option<String>,
    pub href: Option<String>,
    /// The link's `type` attribute.
    pub media_type: Option<String>,
}

impl ManifestLink {
    pub fn is_license(&self) -> bool {
        self.rel.as_deref() == Some(LICENSE_REL)
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_owned)
}

impl RightsWindow {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            start: string_field(object, "start"),
            end: string_field(object, "end"),
        }
    }
}

impl ManifestMetadata {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            identifier: string_field(object, "identifier"),
            title: string_field(object, "title"),
            rights: object
                .get(FEEDBOOKS_RIGHTS_KEY)
                .and_then(Value::as_object)
                .map(RightsWindow::from_object),
        }
    }
}

impl ManifestLink {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            rel: string_field(object, "rel"),
            href: string_field(object, "href"),
            media_type: string_field(object, "type"),
        }
    }
}

impl Manifest {
    /// Decode a manifest from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Decode a manifest from an already parsed JSON document.
    ///
    /// Fails only when the document itself is not an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| {
            DrmError::InvalidManifest("manifest root must be a JSON object".to_string())
        })?;

        let metadata = root
            .get("metadata")
            .and_then(Value::as_object)
            .map(ManifestMetadata::from_object);

        let links = root
            .get("links")
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(Value::as_object)
                    .map(ManifestLink::from_object)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { metadata, links })
    }

    pub fn license_links(&self) -> impl Iterator<Item = &ManifestLink> {
        self.links.iter().filter(|link| link.is_license())
    }

    pub fn rights(&self) -> Option<&RightsWindow> {
        self.metadata.as_ref().and_then(|m| m.rights.as_ref())
    }
}

impl TryFrom<Value> for Manifest {
    type Error = DrmError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}
