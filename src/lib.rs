//! Coordinate-system core of a GIS map view: extent normalization across the
//! antimeridian, and reprojection of a map frame's layer tree.

pub mod config;
pub mod document;
pub mod extent;
pub mod frame;
pub mod layer;
pub mod map;
pub mod projection;
pub mod reproject;

pub use config::{Config, ConfigError};
pub use document::{DocumentError, DocumentNode, MapDocument};
pub use extent::{Extent, ExtentError, crosses_dateline, normalize};
pub use frame::{Group, GroupId, LayerId, MapFrame, NodeId, ProjectionChanged, ProjectionListeners};
pub use layer::{Feature, FeatureLayer, Geometry, ImageLayer, LayerError, MapLayer};
pub use map::Map;
pub use projection::{ProjectionError, ProjectionInfo};
pub use reproject::{
    LayerOutcome, LayerReport, ReprojectError, ReprojectReport, reproject_map_frame, reproject_map_frame_str,
    reproject_map_frame_with,
};
