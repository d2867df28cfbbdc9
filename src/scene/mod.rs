//! Drawable scene graph handed to the renderer each frame.
//!
//! Nodes live in an arena keyed by [`NodeHandle`]. Removing a node is the
//! only way its resources are released, so every owner (star, satellite,
//! effect, constellation) must remove what it added.

pub mod camera;
pub mod ray;

use log::trace;
use nalgebra::Vector3;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::universe::Color;

pub use camera::{Camera, FlyTarget, Viewport};
pub use ray::Ray;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeHandle(u64);

/// What a node depicts; used for picking and tooltip derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Star { height: u64 },
    Satellite { height: u64 },
    Nova { height: u64 },
    Comet,
    AddressCenter,
    AddressNode,
}

impl NodeKind {
    /// Kinds the pointer can hover.
    pub fn is_pickable(&self) -> bool {
        matches!(
            self,
            NodeKind::Star { .. }
                | NodeKind::Satellite { .. }
                | NodeKind::AddressCenter
                | NodeKind::AddressNode
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub position: Vector3<f64>,
    /// Base draw radius before `scale`.
    pub radius: f64,
    pub scale: f64,
    pub color: Color,
    pub opacity: f64,
    pub visible: bool,
}

impl SceneNode {
    pub fn new(kind: NodeKind, position: Vector3<f64>, radius: f64, color: Color) -> Self {
        Self {
            kind,
            position,
            radius,
            scale: 1.0,
            color,
            opacity: 1.0,
            visible: true,
        }
    }

    pub fn bounding_radius(&self) -> f64 {
        self.radius * self.scale
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeHandle, SceneNode>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeHandle {
        let handle = NodeHandle(self.next_id);
        self.next_id += 1;
        self.nodes.insert(handle, node);
        handle
    }

    /// Dispose a node. Returns it if it was still present.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<SceneNode> {
        let node = self.nodes.remove(&handle);
        if let Some(n) = &node {
            trace!("SCENE - disposed {:?} {:?}", handle, n.kind);
        }
        node
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(&handle)
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&handle)
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &SceneNode)> {
        self.nodes.iter().map(|(h, n)| (*h, n))
    }

    pub fn count_where(&self, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes.values().filter(|n| pred(&n.kind)).count()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Per-kind node counts, reported in state snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneSummary {
    pub total: usize,
    pub stars: usize,
    pub satellites: usize,
    pub novas: usize,
    pub comets: usize,
    pub address_nodes: usize,
}

impl From<&Scene> for SceneSummary {
    fn from(scene: &Scene) -> Self {
        let mut summary = SceneSummary {
            total: scene.len(),
            ..Default::default()
        };
        for (_, node) in scene.iter() {
            match node.kind {
                NodeKind::Star { .. } => summary.stars += 1,
                NodeKind::Satellite { .. } => summary.satellites += 1,
                NodeKind::Nova { .. } => summary.novas += 1,
                NodeKind::Comet => summary.comets += 1,
                NodeKind::AddressCenter | NodeKind::AddressNode => summary.address_nodes += 1,
            }
        }
        summary
    }
}

/// Drawing capability. Receives the whole graph and camera once per frame.
pub trait Renderer {
    fn render(&mut self, scene: &Scene, camera: &Camera, pixel_ratio: f64);
}

/// Renderer that draws nothing and periodically traces what it would draw.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
}

impl LogRenderer {
    const REPORT_EVERY: u64 = 600;
}

impl Renderer for LogRenderer {
    fn render(&mut self, scene: &Scene, camera: &Camera, pixel_ratio: f64) {
        self.frames += 1;
        if self.frames % Self::REPORT_EVERY == 0 {
            let visible = scene.iter().filter(|(_, n)| n.visible).count();
            log::debug!(
                "RENDER - frame {}: {}/{} nodes visible, camera at ({:.1}, {:.1}, {:.1}), pixel ratio {:.2}",
                self.frames,
                visible,
                scene.len(),
                camera.position.x,
                camera.position.y,
                camera.position.z,
                pixel_ratio
            );
        }
    }
}
