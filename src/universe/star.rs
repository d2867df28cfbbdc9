use nalgebra::Vector3;
use rand::Rng;
use std::f64::consts::TAU;

use super::{GENESIS_RADIUS, SATELLITE_RADIUS, STAR_RADIUS, TX_ORBIT_RADIUS};
use crate::feed::{BlockRecord, TxRecord};
use crate::scene::{NodeHandle, NodeKind, Scene, SceneNode};
use crate::universe::Color;

/// Deterministic placement on a widening spiral. Radius grows with height,
/// so no two heights share a position; genesis sits at the origin.
pub fn star_position(height: u64, tx_count: u64) -> Vector3<f64> {
    if height == 0 {
        return Vector3::zeros();
    }
    let h = height as f64;
    let radius = h * 0.1 + 5.0;
    let angle = h * 0.1;
    Vector3::new(
        angle.cos() * radius,
        (tx_count % 50) as f64 * 0.2,
        angle.sin() * radius,
    )
}

/// A sampled transaction circling its block.
#[derive(Debug, Clone)]
pub struct Satellite {
    pub parent_height: u64,
    pub orbit_angle: f64,
    pub orbit_radius: f64,
    pub angular_speed: f64,
    pub node: NodeHandle,
}

impl Satellite {
    pub fn advance(&mut self) {
        self.orbit_angle += self.angular_speed;
    }

    pub fn position_around(&self, parent: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            parent.x + self.orbit_angle.cos() * self.orbit_radius,
            parent.y,
            parent.z + self.orbit_angle.sin() * self.orbit_radius,
        )
    }
}

/// One mined block in the scene.
#[derive(Debug, Clone)]
pub struct BlockStar {
    pub height: u64,
    pub block_id: String,
    pub miner: String,
    pub tx_count: u64,
    pub total_fees: f64,
    pub timestamp: i64,
    pub is_rbf: bool,
    pub position: Vector3<f64>,
    pub node: NodeHandle,
    pub satellites: Vec<Satellite>,
}

impl BlockStar {
    /// Build the star and add its node to `scene`. Satellites come separately.
    pub fn spawn(block: &BlockRecord, scene: &mut Scene) -> Self {
        let position = star_position(block.height, block.tx_count);
        let radius = if block.height == 0 {
            GENESIS_RADIUS
        } else {
            STAR_RADIUS
        };
        let node = scene.add(SceneNode::new(
            NodeKind::Star {
                height: block.height,
            },
            position,
            radius,
            Color::WHITE,
        ));

        Self {
            height: block.height,
            block_id: block.id.clone(),
            miner: block.miner.clone(),
            tx_count: block.tx_count,
            total_fees: block.total_fees,
            timestamp: block.timestamp,
            is_rbf: block.is_rbf,
            position,
            node,
            satellites: Vec::new(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Put up to `max` satellites in orbit, evenly phased, with randomized
    /// radius and speed.
    pub fn attach_satellites<R: Rng>(
        &mut self,
        txs: &[TxRecord],
        max: usize,
        scene: &mut Scene,
        rng: &mut R,
    ) {
        let count = txs.len().min(max);
        for j in 0..count {
            let orbit_angle = j as f64 / count as f64 * TAU;
            let orbit_radius = TX_ORBIT_RADIUS + rng.gen_range(0.0..1.5);
            let start = Vector3::new(
                self.position.x + orbit_angle.cos() * orbit_radius,
                self.position.y,
                self.position.z + orbit_angle.sin() * orbit_radius,
            );
            let node = scene.add(SceneNode::new(
                NodeKind::Satellite {
                    height: self.height,
                },
                start,
                SATELLITE_RADIUS,
                Color::from_hex(0x00ffcc),
            ));
            self.satellites.push(Satellite {
                parent_height: self.height,
                orbit_angle,
                orbit_radius,
                angular_speed: 0.01 + rng.gen_range(0.0..0.01),
                node,
            });
        }
    }
}
