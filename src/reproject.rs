//! Cascading a projection change from a map frame down to its layers and groups.

use crate::frame::{LayerId, MapFrame};
use crate::layer::{LayerError, MapLayer};
use crate::projection::{ProjectionError, ProjectionInfo};
use serde::Serialize;
use thiserror::Error;

/// Errors that abort a reprojection cascade.
///
/// A layer failure stops the cascade where it happened: layers visited
/// earlier keep the new projection, the failing layer and every later one
/// keep the old one, and neither groups nor the frame are retagged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReprojectError {
    #[error("invalid target projection: {0}")]
    Projection(#[from] ProjectionError),
    #[error("failed to reproject layer '{name}': {source}")]
    Layer {
        layer: LayerId,
        name: String,
        #[source]
        source: LayerError,
    },
}

/// What happened to a single layer during a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOutcome {
    /// The layer's geometry now lives in the target projection.
    Reprojected,
    /// The layer does not support reprojection and kept its old projection.
    CannotReproject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerReport {
    pub layer: LayerId,
    pub name: String,
    pub outcome: LayerOutcome,
}

/// Per-layer results of a completed cascade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReprojectReport {
    pub projection: ProjectionInfo,
    pub layers: Vec<LayerReport>,
    pub groups: usize,
}

impl ReprojectReport {
    pub fn reprojected(&self) -> impl Iterator<Item = &LayerReport> {
        self.layers
            .iter()
            .filter(|report| report.outcome == LayerOutcome::Reprojected)
    }

    /// Layers left in their previous projection.
    pub fn stale(&self) -> impl Iterator<Item = &LayerReport> {
        self.layers
            .iter()
            .filter(|report| report.outcome == LayerOutcome::CannotReproject)
    }

    /// True when every layer ended up in the target projection.
    pub fn is_complete(&self) -> bool {
        self.stale().next().is_none()
    }
}

/// Reprojects every layer of `frame` into `projection`, retags every group,
/// and finally adopts `projection` on the frame itself.
pub fn reproject_map_frame(
    frame: &mut MapFrame,
    projection: &ProjectionInfo,
) -> Result<ReprojectReport, ReprojectError> {
    reproject_map_frame_with(frame, projection, |_| {})
}

/// Like [`reproject_map_frame`], additionally calling `on_cant_reproject`
/// for each layer that does not support reprojection.
pub fn reproject_map_frame_with<F>(
    frame: &mut MapFrame,
    projection: &ProjectionInfo,
    mut on_cant_reproject: F,
) -> Result<ReprojectReport, ReprojectError>
where
    F: FnMut(&dyn MapLayer),
{
    log::info!(
        "Reprojecting map frame from {} to {}",
        frame.projection(),
        projection
    );

    let layer_ids = frame.all_layers();
    let mut layers = Vec::with_capacity(layer_ids.len());

    for id in layer_ids {
        let Some(layer) = frame.layer_mut(id) else {
            continue;
        };
        let name = layer.name().to_string();

        let outcome = if layer.can_reproject() {
            layer
                .reproject(projection)
                .map_err(|source| ReprojectError::Layer {
                    layer: id,
                    name: name.clone(),
                    source,
                })?;
            LayerOutcome::Reprojected
        } else {
            log::warn!("Layer '{name}' cannot be reprojected, keeping {}", layer.projection());
            on_cant_reproject(&*layer);
            LayerOutcome::CannotReproject
        };

        layers.push(LayerReport {
            layer: id,
            name,
            outcome,
        });
    }

    let group_ids = frame.all_groups();
    for &id in &group_ids {
        if let Some(group) = frame.group_mut(id) {
            group.projection = projection.clone();
        }
    }
    log::debug!("Retagged {} group(s) with {}", group_ids.len(), projection);

    frame.set_projection(projection.clone());

    let report = ReprojectReport {
        projection: projection.clone(),
        layers,
        groups: group_ids.len(),
    };

    log::info!(
        "Reprojected {} layer(s), {} left stale",
        report.reprojected().count(),
        report.stale().count()
    );

    Ok(report)
}

/// Parses `descriptor` and runs [`reproject_map_frame_with`] with it.
pub fn reproject_map_frame_str<F>(
    frame: &mut MapFrame,
    descriptor: &str,
    on_cant_reproject: F,
) -> Result<ReprojectReport, ReprojectError>
where
    F: FnMut(&dyn MapLayer),
{
    let projection = ProjectionInfo::parse(descriptor)?;
    reproject_map_frame_with(frame, &projection, on_cant_reproject)
}
