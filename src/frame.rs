//! The map frame: root of the layer tree and holder of its coordinate system.
//!
//! Layers and groups live in flat arenas owned by the frame and are addressed
//! through [`LayerId`] and [`GroupId`] handles. Tree traversal hands out
//! snapshots of those handles, so callers may mutate nodes while iterating.

use crate::layer::MapLayer;
use crate::projection::ProjectionInfo;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

/// Handle to a layer inside a [`MapFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LayerId(usize);

/// Handle to a group inside a [`MapFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(usize);

/// A child slot of the frame root or of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    Layer(LayerId),
    Group(GroupId),
}

/// A named container of layers and nested groups. Has no geometry of its own,
/// only a projection tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub projection: ProjectionInfo,
    children: Vec<NodeId>,
}

impl Group {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Sent to listeners whenever a frame or map adopts a new projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionChanged {
    pub old: ProjectionInfo,
    pub new: ProjectionInfo,
}

/// Fan-out of [`ProjectionChanged`] events to any number of receivers.
#[derive(Debug, Default)]
pub struct ProjectionListeners {
    senders: Vec<Sender<ProjectionChanged>>,
}

impl ProjectionListeners {
    pub fn subscribe(&mut self) -> Receiver<ProjectionChanged> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Delivers `event` to every live receiver, forgetting dropped ones.
    pub fn notify(&mut self, event: ProjectionChanged) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
        log::debug!(
            "Notified {} listener(s) of projection change {} -> {}",
            self.senders.len(),
            event.old,
            event.new
        );
    }
}

/// Root coordinate-system holder of a layer tree.
#[derive(Debug)]
pub struct MapFrame {
    projection: ProjectionInfo,
    layers: Vec<Box<dyn MapLayer>>,
    groups: Vec<Group>,
    root: Vec<NodeId>,
    listeners: ProjectionListeners,
}

impl MapFrame {
    pub fn new(projection: ProjectionInfo) -> Self {
        Self {
            projection,
            layers: Vec::new(),
            groups: Vec::new(),
            root: Vec::new(),
            listeners: ProjectionListeners::default(),
        }
    }

    pub fn projection(&self) -> &ProjectionInfo {
        &self.projection
    }

    /// Adopts `projection` and notifies listeners if it differs from the
    /// current one. Touches no layer or group.
    pub fn set_projection(&mut self, projection: ProjectionInfo) {
        if self.projection == projection {
            return;
        }
        let old = std::mem::replace(&mut self.projection, projection.clone());
        self.listeners.notify(ProjectionChanged {
            old,
            new: projection,
        });
    }

    /// Registers interest in projection changes of this frame.
    pub fn subscribe(&mut self) -> Receiver<ProjectionChanged> {
        self.listeners.subscribe()
    }

    /// Adds a layer under `parent`, or at the top level when `parent` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this frame.
    pub fn add_layer(&mut self, parent: Option<GroupId>, layer: Box<dyn MapLayer>) -> LayerId {
        let id = LayerId(self.layers.len());
        self.layers.push(layer);
        self.children_mut(parent).push(NodeId::Layer(id));
        id
    }

    /// Adds an empty group tagged with the frame's projection.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this frame.
    pub fn add_group(&mut self, parent: Option<GroupId>, name: impl Into<String>) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(Group {
            name: name.into(),
            projection: self.projection.clone(),
            children: Vec::new(),
        });
        self.children_mut(parent).push(NodeId::Group(id));
        id
    }

    fn children_mut(&mut self, parent: Option<GroupId>) -> &mut Vec<NodeId> {
        match parent {
            Some(GroupId(index)) => &mut self.groups[index].children,
            None => &mut self.root,
        }
    }

    /// Top-level children, in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.root
    }

    pub fn layer(&self, id: LayerId) -> Option<&dyn MapLayer> {
        self.layers.get(id.0).map(|layer| layer.as_ref())
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut (dyn MapLayer + 'static)> {
        self.layers.get_mut(id.0).map(|layer| layer.as_mut())
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(id.0)
    }

    /// Every layer below the frame, depth-first in document order.
    pub fn all_layers(&self) -> Vec<LayerId> {
        let mut out = Vec::with_capacity(self.layers.len());
        self.walk(&self.root, &mut |node| {
            if let NodeId::Layer(id) = node {
                out.push(id);
            }
        });
        out
    }

    /// Every group below the frame, depth-first in document order.
    pub fn all_groups(&self) -> Vec<GroupId> {
        let mut out = Vec::with_capacity(self.groups.len());
        self.walk(&self.root, &mut |node| {
            if let NodeId::Group(id) = node {
                out.push(id);
            }
        });
        out
    }

    fn walk(&self, nodes: &[NodeId], visit: &mut impl FnMut(NodeId)) {
        for &node in nodes {
            visit(node);
            if let NodeId::Group(GroupId(index)) = node {
                self.walk(&self.groups[index].children, visit);
            }
        }
    }
}
