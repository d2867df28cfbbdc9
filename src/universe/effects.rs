//! Transient, time-driven scene effects: halving novas and mempool comets.

use nalgebra::Vector3;
use rand::Rng;
use thiserror::Error;

use super::{COMET_DURATION_MS, COMET_SHELL_RADIUS, NOVA_DURATION_MS};
use crate::feed::TxRecord;
use crate::scene::{NodeHandle, NodeKind, Scene, SceneNode};
use crate::universe::Color;

const NOVA_RING_RADIUS: f64 = 0.12;
const NOVA_PEAK_OPACITY: f64 = 0.9;
const COMET_RADIUS: f64 = 0.08;

/// Why an effect was dropped mid-flight.
#[derive(Error, Debug, PartialEq)]
pub enum EffectError {
    #[error("effect node {0:?} is gone")]
    MissingNode(NodeHandle),

    #[error("effect progress is not finite ({0})")]
    NonFinite(f64),
}

/// Lifetime fraction in [0, ∞), or an error for non-finite timing.
fn progress(now_ms: f64, start_ms: f64, duration_ms: f64) -> Result<f64, EffectError> {
    let t = (now_ms - start_ms) / duration_ms;
    if !t.is_finite() {
        return Err(EffectError::NonFinite(t));
    }
    Ok(t.max(0.0))
}

/// Expanding, fading ring marking a halving block.
#[derive(Debug, Clone)]
pub struct Nova {
    pub height: u64,
    pub node: NodeHandle,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Nova {
    pub fn spawn(height: u64, position: Vector3<f64>, start_ms: f64, scene: &mut Scene) -> Self {
        let mut ring = SceneNode::new(
            NodeKind::Nova { height },
            position,
            NOVA_RING_RADIUS,
            Color::from_hex(0xffaa00),
        );
        ring.opacity = NOVA_PEAK_OPACITY;
        Self {
            height,
            node: scene.add(ring),
            start_ms,
            duration_ms: NOVA_DURATION_MS,
        }
    }

    /// Update the ring for `now_ms`. `Ok(false)` once its lifetime is over;
    /// the caller then disposes the node.
    pub fn advance(&self, now_ms: f64, scene: &mut Scene) -> Result<bool, EffectError> {
        let t = progress(now_ms, self.start_ms, self.duration_ms)?;
        if t >= 1.0 {
            return Ok(false);
        }
        let ring = scene
            .get_mut(self.node)
            .ok_or(EffectError::MissingNode(self.node))?;
        ring.scale = 1.0 + t * 25.0;
        ring.opacity = NOVA_PEAK_OPACITY * (1.0 - t);
        Ok(true)
    }
}

/// A pending transaction falling toward the chain's frontier.
#[derive(Debug, Clone)]
pub struct Comet {
    pub txid: String,
    pub node: NodeHandle,
    pub origin: Vector3<f64>,
    pub target: Vector3<f64>,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Comet {
    pub fn spawn<R: Rng>(
        tx: &TxRecord,
        anchor: Vector3<f64>,
        start_ms: f64,
        scene: &mut Scene,
        rng: &mut R,
    ) -> Self {
        let origin = anchor + random_direction(rng) * COMET_SHELL_RADIUS;
        // Hotter (higher fee rate) comets burn whiter.
        let heat = tx.fee_rate().map_or(0.0, |r| (r / 100.0).min(1.0));
        let node = scene.add(SceneNode::new(
            NodeKind::Comet,
            origin,
            COMET_RADIUS,
            Color::from_hsl(0.55, 1.0, 0.55 + 0.4 * heat),
        ));
        Self {
            txid: tx.txid.clone(),
            node,
            origin,
            target: anchor,
            start_ms,
            duration_ms: COMET_DURATION_MS,
        }
    }

    pub fn advance(&self, now_ms: f64, scene: &mut Scene) -> Result<bool, EffectError> {
        let t = progress(now_ms, self.start_ms, self.duration_ms)?;
        if t >= 1.0 {
            return Ok(false);
        }
        let node = scene
            .get_mut(self.node)
            .ok_or(EffectError::MissingNode(self.node))?;
        node.position = self.origin.lerp(&self.target, t);
        node.opacity = 1.0 - 0.5 * t;
        Ok(true)
    }
}

fn random_direction<R: Rng>(rng: &mut R) -> Vector3<f64> {
    loop {
        let v = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let n = v.norm();
        if n > 1e-3 && n <= 1.0 {
            return v / n;
        }
    }
}
