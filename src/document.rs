//! Serializable map documents, stored as RON.

use crate::extent::Extent;
use crate::frame::{GroupId, MapFrame, NodeId};
use crate::layer::{Feature, FeatureLayer, ImageLayer};
use crate::projection::ProjectionInfo;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when reading or writing a map document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse map document: {0}")]
    Parse(#[from] ron::de::SpannedError),
    #[error("failed to serialize map document: {0}")]
    Serialize(#[from] ron::Error),
}

/// Root of a map document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    pub name: String,
    /// Projection of the frame, and of every layer that does not name its own.
    pub projection: ProjectionInfo,
    #[serde(default)]
    pub layers: Vec<DocumentNode>,
}

/// One entry of the document's layer tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentNode {
    Group {
        name: String,
        #[serde(default)]
        children: Vec<DocumentNode>,
    },
    Features {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projection: Option<ProjectionInfo>,
        #[serde(default)]
        features: Vec<Feature>,
    },
    Image {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        projection: Option<ProjectionInfo>,
        path: String,
        bounds: Extent,
    },
}

impl MapDocument {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let ron_string = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&ron_string)
    }

    pub fn save(&self, path: &Path, pretty: bool) -> Result<(), DocumentError> {
        let ron_string = self.to_ron(pretty)?;
        fs::write(path, ron_string).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_ron(text: &str) -> Result<Self, DocumentError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron(&self, pretty: bool) -> Result<String, DocumentError> {
        if !pretty {
            return Ok(ron::to_string(self)?);
        }

        let pretty_config = PrettyConfig::new()
            .depth_limit(12)
            .indentor("  ".to_string())
            .struct_names(true)
            .enumerate_arrays(false);

        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }

    /// Builds a live frame holding this document's layer tree.
    pub fn into_frame(self) -> MapFrame {
        let mut frame = MapFrame::new(self.projection.clone());
        for node in self.layers {
            add_node(&mut frame, None, node, &self.projection);
        }
        frame
    }

    /// Captures the current state of `frame` as a document.
    ///
    /// Layers of kinds unknown to the document format are skipped.
    pub fn from_frame(name: impl Into<String>, frame: &MapFrame) -> Self {
        let projection = frame.projection();
        Self {
            name: name.into(),
            projection: projection.clone(),
            layers: frame
                .children()
                .iter()
                .filter_map(|&node| capture_node(frame, node, projection))
                .collect(),
        }
    }
}

fn add_node(frame: &mut MapFrame, parent: Option<GroupId>, node: DocumentNode, default: &ProjectionInfo) {
    match node {
        DocumentNode::Group { name, children } => {
            let group = frame.add_group(parent, name);
            for child in children {
                add_node(frame, Some(group), child, default);
            }
        }
        DocumentNode::Features {
            name,
            projection,
            features,
        } => {
            let layer = FeatureLayer::new(name, projection.unwrap_or_else(|| default.clone()), features);
            frame.add_layer(parent, Box::new(layer));
        }
        DocumentNode::Image {
            name,
            projection,
            path,
            bounds,
        } => {
            let layer = ImageLayer::new(name, projection.unwrap_or_else(|| default.clone()), path, bounds);
            frame.add_layer(parent, Box::new(layer));
        }
    }
}

fn capture_node(frame: &MapFrame, node: NodeId, default: &ProjectionInfo) -> Option<DocumentNode> {
    // Only record a layer projection when it differs from the frame's.
    let own = |projection: &ProjectionInfo| (projection != default).then(|| projection.clone());

    match node {
        NodeId::Group(id) => {
            let group = frame.group(id)?;
            Some(DocumentNode::Group {
                name: group.name.clone(),
                children: group
                    .children()
                    .iter()
                    .filter_map(|&child| capture_node(frame, child, default))
                    .collect(),
            })
        }
        NodeId::Layer(id) => {
            let layer = frame.layer(id)?;
            let any = layer.as_any();
            if let Some(features) = any.downcast_ref::<FeatureLayer>() {
                Some(DocumentNode::Features {
                    name: layer.name().to_string(),
                    projection: own(layer.projection()),
                    features: features.features().to_vec(),
                })
            } else if let Some(image) = any.downcast_ref::<ImageLayer>() {
                Some(DocumentNode::Image {
                    name: layer.name().to_string(),
                    projection: own(layer.projection()),
                    path: image.path().to_string(),
                    bounds: image.bounds(),
                })
            } else {
                log::warn!("Skipping layer '{}' of a kind documents cannot store", layer.name());
                None
            }
        }
    }
}
