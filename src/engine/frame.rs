//! Per-frame work, in order: camera tween, orbits, transient effects, hover.

use log::{debug, warn};

use super::Engine;
use super::hover::{self, TOOLTIP_OFFSET, Tooltip};
use crate::scene::camera::{FLY_DAMPING, FLY_EPSILON};
use crate::scene::{NodeHandle, Scene};
use crate::universe::EffectError;

/// Keep a live effect; dispose a finished or broken one.
fn keep_or_dispose(
    result: Result<bool, EffectError>,
    node: NodeHandle,
    scene: &mut Scene,
    label: impl FnOnce() -> String,
) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            scene.remove(node);
            false
        }
        Err(e) => {
            warn!("FRAME - dropping {}: {}", label(), e);
            scene.remove(node);
            false
        }
    }
}

impl Engine {
    /// Advance the engine to `now_ms` (monotonic milliseconds).
    pub fn tick(&mut self, now_ms: f64) {
        self.clock_ms = now_ms;
        self.step_camera();
        self.step_orbits();
        self.step_effects(now_ms);
        self.step_hover(now_ms);
    }

    /// One damped step of an active fly; clears the target on arrival.
    pub(crate) fn step_camera(&mut self) {
        let Some(target) = self.fly_target else {
            return;
        };
        let remaining = self.camera.step_toward(&target, FLY_DAMPING);
        if remaining < FLY_EPSILON {
            self.fly_target = None;
            debug!("CAMERA - arrived ({remaining:.3} from target)");
        }
    }

    /// Only satellites of visible stars move, and none while orbits are off.
    fn step_orbits(&mut self) {
        if !self.visual.show_tx_orbits {
            return;
        }
        for star in self.registry.all_mut() {
            let Some(parent) = self
                .scene
                .get(star.node)
                .filter(|n| n.visible)
                .map(|n| n.position)
            else {
                continue;
            };
            for sat in &mut star.satellites {
                sat.advance();
                if let Some(node) = self.scene.get_mut(sat.node) {
                    node.position = sat.position_around(&parent);
                }
            }
        }
    }

    fn step_effects(&mut self, now_ms: f64) {
        let scene = &mut self.scene;
        self.novas.retain(|nova| {
            let result = nova.advance(now_ms, scene);
            keep_or_dispose(result, nova.node, scene, || format!("nova #{}", nova.height))
        });
        self.comets.retain(|comet| {
            let result = comet.advance(now_ms, scene);
            keep_or_dispose(result, comet.node, scene, || format!("comet {}", comet.txid))
        });
    }

    fn step_hover(&mut self, now_ms: f64) {
        if !self.hover.due(now_ms) {
            return;
        }
        let Some((ndc_x, ndc_y)) = self.pointer else {
            self.hover.tooltip = None;
            return;
        };

        let ray = self.camera.ray_through(ndc_x, ndc_y);
        let content = hover::pick(&self.scene, &ray)
            .and_then(|kind| hover::describe(kind, &self.registry));
        let (px, py) = self.viewport.to_pixels(ndc_x, ndc_y);
        self.hover.tooltip = content.map(|content| Tooltip {
            text: content.lines(),
            content,
            x: px + TOOLTIP_OFFSET,
            y: py + TOOLTIP_OFFSET,
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::TooltipContent;
    use crate::engine::tests::engine_with;
    use crate::feed::{BlockRecord, TxRecord};
    use crate::universe::FilterPatch;

    const FRAME_MS: f64 = 16.0;

    #[test]
    fn fly_ends_within_epsilon_and_clears_target() {
        let mut engine = engine_with(&[100, 5_000]);
        assert!(engine.fly_to_block(5_000));
        let goal = engine.fly_target().expect("target").position;

        let mut frames = 0;
        let mut distance = (goal - engine.camera().position).norm();
        while engine.fly_target().is_some() && frames < 1_000 {
            frames += 1;
            engine.tick(frames as f64 * FRAME_MS);
            let next = (goal - engine.camera().position).norm();
            assert!(next < distance, "frame {frames}: {next} >= {distance}");
            distance = next;
        }
        assert!(frames > 1 && frames < 1_000);
        assert!((engine.camera().position - goal).norm() < 0.1);

        let rest = engine.camera().position;
        engine.tick((frames + 10) as f64 * FRAME_MS);
        assert_eq!(engine.camera().position, rest);
    }

    #[test]
    fn orbits_move_only_for_visible_stars() {
        let mut engine = engine_with(&[]);
        let mut busy = BlockRecord::sample(10, 0.5, "x");
        busy.tx_list = vec![TxRecord::default(); 3];
        let mut quiet = BlockRecord::sample(11, 0.05, "x");
        quiet.tx_list = vec![TxRecord::default(); 3];
        engine.add_block_star(&busy);
        engine.add_block_star(&quiet);
        engine.set_filters(FilterPatch {
            high_fee: Some(true),
            ..Default::default()
        });

        let angles = |e: &crate::engine::Engine, h| -> Vec<f64> {
            e.registry()
                .get_by_height(h)
                .expect("star")
                .satellites
                .iter()
                .map(|s| s.orbit_angle)
                .collect()
        };
        let (busy_before, quiet_before) = (angles(&engine, 10), angles(&engine, 11));
        engine.tick(FRAME_MS);
        assert_ne!(angles(&engine, 10), busy_before);
        assert_eq!(angles(&engine, 11), quiet_before);

        engine.set_show_tx_orbits(false);
        let frozen = angles(&engine, 10);
        engine.tick(2.0 * FRAME_MS);
        assert_eq!(angles(&engine, 10), frozen);
    }

    #[test]
    fn nova_is_disposed_after_its_lifetime() {
        let mut engine = engine_with(&[]);
        engine.tick(1_000.0);
        engine.add_block_star(&BlockRecord::sample(210_000, 0.1, "x"));
        let node = engine.novas()[0].node;

        engine.tick(3_000.0);
        assert!(engine.scene().get(node).expect("ring").scale > 1.0);
        engine.tick(5_000.0);
        assert!(engine.novas().is_empty());
        assert!(!engine.scene().contains(node));
    }

    #[test]
    fn broken_effect_is_dropped_without_panicking() {
        let mut engine = engine_with(&[]);
        engine.add_block_star(&BlockRecord::sample(630_000, 0.1, "x"));
        let node = engine.novas[0].node;
        engine.scene.remove(node);
        engine.tick(10.0);
        assert!(engine.novas().is_empty());
    }

    #[test]
    fn comets_land_and_disappear() {
        let mut engine = engine_with(&[100]);
        let txs = vec![TxRecord {
            txid: "c0".into(),
            ..Default::default()
        }];
        assert_eq!(engine.spawn_comets(&txs, 100), 1);
        engine.tick(3_000.0);
        assert_eq!(engine.comets().len(), 1);
        engine.tick(6_500.0);
        assert!(engine.comets().is_empty());
        assert_eq!(engine.scene().len(), 2);
    }

    #[test]
    fn hover_picks_genesis_then_clears_on_throttled_schedule() {
        let mut engine = engine_with(&[]);
        engine.set_pointer(640.0, 360.0);
        engine.tick(0.0);

        let tooltip = engine.tooltip().expect("genesis under the pointer");
        assert!(matches!(
            &tooltip.content,
            TooltipContent::Block { height: 0, miner, .. } if miner == "Satoshi"
        ));
        assert_eq!(tooltip.text[0], "Block #0");
        assert_eq!(tooltip.text[3], "Fees: 0.000000 BTC");
        assert!((tooltip.x - 650.0).abs() < 1e-9);
        assert!((tooltip.y - 370.0).abs() < 1e-9);

        engine.set_pointer(0.0, 0.0);
        engine.tick(50.0);
        assert!(engine.tooltip().is_some());
        engine.tick(100.0);
        assert!(engine.tooltip().is_some());
        engine.tick(101.0);
        assert!(engine.tooltip().is_none());
    }
}
