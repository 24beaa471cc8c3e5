//! The map container that owns a frame and mirrors its projection.

use crate::frame::{MapFrame, ProjectionChanged, ProjectionListeners};
use crate::layer::MapLayer;
use crate::projection::ProjectionInfo;
use crate::reproject::{self, ReprojectError, ReprojectReport};
use std::sync::mpsc::{Receiver, TryRecvError};

/// A map container. Follows the projection of its frame by listening to it
/// rather than being referenced by it.
#[derive(Debug)]
pub struct Map {
    frame: MapFrame,
    projection: ProjectionInfo,
    frame_changes: Receiver<ProjectionChanged>,
    listeners: ProjectionListeners,
}

impl Map {
    pub fn new(mut frame: MapFrame) -> Self {
        let frame_changes = frame.subscribe();
        let projection = frame.projection().clone();
        Self {
            frame,
            projection,
            frame_changes,
            listeners: ProjectionListeners::default(),
        }
    }

    pub fn frame(&self) -> &MapFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut MapFrame {
        &mut self.frame
    }

    pub fn into_frame(self) -> MapFrame {
        self.frame
    }

    pub fn projection(&self) -> &ProjectionInfo {
        &self.projection
    }

    /// Registers interest in projection changes of this map.
    pub fn subscribe(&mut self) -> Receiver<ProjectionChanged> {
        self.listeners.subscribe()
    }

    /// Adopts the most recent projection announced by the frame and passes
    /// the change on to this map's own listeners.
    ///
    /// Returns whether the map's projection changed.
    pub fn sync(&mut self) -> bool {
        let mut latest = None;
        loop {
            match self.frame_changes.try_recv() {
                Ok(event) => latest = Some(event.new),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("Map frame projection channel disconnected");
                    break;
                }
            }
        }

        let Some(new) = latest else {
            return false;
        };
        if new == self.projection {
            return false;
        }

        let old = std::mem::replace(&mut self.projection, new.clone());
        log::info!("Map projection changed from {old} to {new}");
        self.listeners.notify(ProjectionChanged { old, new });
        true
    }

    /// Runs the reprojection cascade on the frame, then syncs the map.
    ///
    /// The map is synced even when the cascade fails part way.
    pub fn reproject<F>(
        &mut self,
        projection: &ProjectionInfo,
        on_cant_reproject: F,
    ) -> Result<ReprojectReport, ReprojectError>
    where
        F: FnMut(&dyn MapLayer),
    {
        let result = reproject::reproject_map_frame_with(&mut self.frame, projection, on_cant_reproject);
        self.sync();
        result
    }
}
