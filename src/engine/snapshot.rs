//! Read-only view of the engine published after every frame.

use nalgebra::Vector3;
use serde::Serialize;

use super::hover::Tooltip;
use super::{Engine, VisualState};
use crate::feed::AddressStats;
use crate::scene::SceneSummary;
use crate::universe::{BlockStar, Color};

fn point(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarSnapshot {
    pub height: u64,
    pub id: String,
    pub miner: String,
    pub tx_count: u64,
    pub total_fees: f64,
    pub timestamp: i64,
    pub is_rbf: bool,
    pub visible: bool,
    pub color: Option<Color>,
    pub position: [f64; 3],
    pub satellites: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSnapshot {
    pub position: [f64; 3],
    pub look_at: [f64; 3],
    pub fov_deg: f64,
    pub aspect: f64,
    /// Where the camera is flying, if anywhere.
    pub fly_target: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationSnapshot {
    pub address: String,
    pub stats: AddressStats,
    pub points: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub frontier: Option<u64>,
    pub stars: Vec<StarSnapshot>,
    pub camera: Option<CameraSnapshot>,
    pub visual: Option<VisualState>,
    pub pixel_ratio: f64,
    pub scene: SceneSummary,
    pub known_miners: Vec<String>,
    pub constellation: Option<ConstellationSnapshot>,
    pub tooltip: Option<Tooltip>,
    pub clock_ms: f64,
}

impl Engine {
    fn star_snapshot(&self, star: &BlockStar) -> StarSnapshot {
        let node = self.scene.get(star.node);
        StarSnapshot {
            height: star.height,
            id: star.block_id.clone(),
            miner: star.miner.clone(),
            tx_count: star.tx_count,
            total_fees: star.total_fees,
            timestamp: star.timestamp,
            is_rbf: star.is_rbf,
            visible: node.is_some_and(|n| n.visible),
            color: node.map(|n| n.color),
            position: point(&star.position),
            satellites: star.satellites.len(),
        }
    }

    /// Stars are listed by height.
    pub fn state(&self) -> StateSnapshot {
        let mut stars: Vec<StarSnapshot> = self
            .registry
            .all()
            .iter()
            .map(|star| self.star_snapshot(star))
            .collect();
        stars.sort_by_key(|s| s.height);

        StateSnapshot {
            frontier: self.registry.frontier(),
            stars,
            camera: Some(CameraSnapshot {
                position: point(&self.camera.position),
                look_at: point(&self.camera.look_at),
                fov_deg: self.camera.fov_deg,
                aspect: self.camera.aspect,
                fly_target: self.fly_target.map(|t| point(&t.position)),
            }),
            visual: Some(self.visual.clone()),
            pixel_ratio: self.effective_pixel_ratio(),
            scene: SceneSummary::from(&self.scene),
            known_miners: self.known_miners.iter().cloned().collect(),
            constellation: self.registry.constellation().map(|c| ConstellationSnapshot {
                address: c.address.clone(),
                stats: c.stats.clone(),
                points: c.points.len(),
            }),
            tooltip: self.hover.tooltip.clone(),
            clock_ms: self.clock_ms,
        }
    }
}
