//! Map layers: the geometry-owning leaves of a map frame.

use crate::extent::Extent;
use crate::projection::{ProjectionError, ProjectionInfo};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Errors a layer can report while reprojecting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("layer '{0}' cannot be reprojected")]
    NotReprojectable(String),
    #[error("feature '{feature}' could not be reprojected: {source}")]
    Feature {
        feature: String,
        #[source]
        source: ProjectionError,
    },
}

/// A node of the layer tree that owns geometry in some projection.
pub trait MapLayer: fmt::Debug {
    fn name(&self) -> &str;

    /// The projection the layer's geometry is currently stored in.
    fn projection(&self) -> &ProjectionInfo;

    /// Whether [`MapLayer::reproject`] can succeed for this kind of layer.
    fn can_reproject(&self) -> bool;

    /// Transforms the owned geometry in place into `target`.
    fn reproject(&mut self, target: &ProjectionInfo) -> Result<(), LayerError>;

    fn as_any(&self) -> &dyn Any;
}

/// Vector geometry, with coordinates as `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    /// Exterior ring first, then holes.
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    /// Returns a copy with every coordinate passed through `f`.
    pub fn try_map_coords<E>(&self, mut f: impl FnMut([f64; 2]) -> Result<[f64; 2], E>) -> Result<Geometry, E> {
        Ok(match self {
            Geometry::Point(coord) => Geometry::Point(f(*coord)?),
            Geometry::LineString(coords) => {
                Geometry::LineString(coords.iter().map(|c| f(*c)).collect::<Result<_, _>>()?)
            }
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(|c| f(*c)).collect::<Result<Vec<_>, _>>())
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// A named piece of vector geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub geometry: Geometry,
}

/// A layer of vector features. Always reprojectable.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    name: String,
    projection: ProjectionInfo,
    features: Vec<Feature>,
}

impl FeatureLayer {
    pub fn new(name: impl Into<String>, projection: ProjectionInfo, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            projection,
            features,
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

impl MapLayer for FeatureLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn projection(&self) -> &ProjectionInfo {
        &self.projection
    }

    fn can_reproject(&self) -> bool {
        true
    }

    /// Either every feature is transformed or the layer is left as it was.
    fn reproject(&mut self, target: &ProjectionInfo) -> Result<(), LayerError> {
        if &self.projection == target {
            return Ok(());
        }

        let from = &self.projection;
        let features = self
            .features
            .iter()
            .map(|feature| {
                let geometry = feature
                    .geometry
                    .try_map_coords(|coord| from.transform(target, coord))
                    .map_err(|source| LayerError::Feature {
                        feature: feature.name.clone(),
                        source,
                    })?;
                Ok(Feature {
                    name: feature.name.clone(),
                    geometry,
                })
            })
            .collect::<Result<Vec<_>, LayerError>>()?;

        log::debug!(
            "Reprojected {} features of '{}' from {} to {}",
            features.len(),
            self.name,
            from,
            target
        );

        self.features = features;
        self.projection = target.clone();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A georeferenced raster. Pixels are never resampled, so it cannot be
/// reprojected.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    name: String,
    projection: ProjectionInfo,
    path: String,
    bounds: Extent,
}

impl ImageLayer {
    pub fn new(name: impl Into<String>, projection: ProjectionInfo, path: impl Into<String>, bounds: Extent) -> Self {
        Self {
            name: name.into(),
            projection,
            path: path.into(),
            bounds,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bounds(&self) -> Extent {
        self.bounds
    }
}

impl MapLayer for ImageLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn projection(&self) -> &ProjectionInfo {
        &self.projection
    }

    fn can_reproject(&self) -> bool {
        false
    }

    fn reproject(&mut self, _target: &ProjectionInfo) -> Result<(), LayerError> {
        Err(LayerError::NotReprojectable(self.name.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
