//! Self-check run against a live engine. Every check is isolated: a failing
//! or panicking check is reported and the rest still run.

use log::{info, warn};
use serde::Serialize;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::engine::{Engine, hover};
use crate::feed::AddressStats;
use crate::scene::NodeKind;
use crate::universe::constellation::MAX_CONSTELLATION_POINTS;
use crate::universe::{ColorMode, FilterPatch, resolve_color, resolve_visibility};

/// Address with no on-chain activity, used to exercise constellation building.
pub const CHECK_ADDRESS: &str = "bc1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq";
const SIMULATED_MS: f64 = 500.0;
const SIMULATED_FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticResult {
    pub ok: bool,
    pub message: String,
}

impl DiagnosticResult {
    fn new(ok: bool, message: impl Into<String>) -> Self {
        Self {
            ok,
            message: message.into(),
        }
    }
}

type Check = fn(&mut Engine) -> Result<(), String>;

const CHECKS: &[(&str, Check)] = &[
    ("Scene has nodes", scene_has_nodes),
    ("Stars rendered (>0)", stars_rendered),
    ("Genesis star present", genesis_present),
    ("Tooltip derivable for a star", tooltip_derivable),
    ("At least one block >0 loaded", block_above_genesis),
    ("Camera moved on fly_to_block()", camera_moves),
    ("High-fee filter applies", high_fee_filter_applies),
    ("Color mode switch ok", color_mode_switches),
    ("Address constellation created", constellation_builds),
    ("Frontier known", frontier_known),
];

pub fn run_diagnostics(engine: &mut Engine) -> Vec<DiagnosticResult> {
    let results = match catch_unwind(AssertUnwindSafe(|| run_checks(engine, CHECKS))) {
        Ok(results) => results,
        Err(panic) => vec![DiagnosticResult::new(
            false,
            format!("Diagnostics crashed: {}", panic_message(&*panic)),
        )],
    };
    let failed = results.iter().filter(|r| !r.ok).count();
    if failed == 0 {
        info!("DIAGNOSTICS - {} checks passed", results.len());
    } else {
        warn!("DIAGNOSTICS - {failed}/{} checks failed", results.len());
    }
    results
}

fn run_checks(engine: &mut Engine, checks: &[(&str, Check)]) -> Vec<DiagnosticResult> {
    let mut results = Vec::with_capacity(checks.len());
    for (name, check) in checks {
        let result = match catch_unwind(AssertUnwindSafe(|| check(engine))) {
            Ok(Ok(())) => DiagnosticResult::new(true, *name),
            Ok(Err(reason)) => DiagnosticResult::new(false, format!("{name}: {reason}")),
            Err(panic) => {
                DiagnosticResult::new(false, format!("{name}: panicked: {}", panic_message(&*panic)))
            }
        };
        results.push(result);
    }
    results
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn scene_has_nodes(engine: &mut Engine) -> Result<(), String> {
    if engine.scene().is_empty() {
        return Err("scene graph is empty".into());
    }
    Ok(())
}

fn stars_rendered(engine: &mut Engine) -> Result<(), String> {
    match engine.scene().count_where(|k| matches!(k, NodeKind::Star { .. })) {
        0 => Err("no star nodes".into()),
        _ => Ok(()),
    }
}

fn genesis_present(engine: &mut Engine) -> Result<(), String> {
    engine
        .registry()
        .get_by_height(0)
        .map(|_| ())
        .ok_or_else(|| "height 0 not registered".into())
}

fn tooltip_derivable(engine: &mut Engine) -> Result<(), String> {
    let star = engine.registry().all().first().ok_or("no stars")?;
    hover::describe(NodeKind::Star { height: star.height }, engine.registry())
        .map(|_| ())
        .ok_or_else(|| format!("no tooltip for block #{}", star.height))
}

fn any_height_above_genesis(engine: &Engine) -> Option<u64> {
    engine
        .registry()
        .all()
        .iter()
        .map(|s| s.height)
        .find(|h| *h > 0)
}

fn block_above_genesis(engine: &mut Engine) -> Result<(), String> {
    any_height_above_genesis(engine)
        .map(|_| ())
        .ok_or_else(|| "only genesis is loaded".into())
}

fn camera_moves(engine: &mut Engine) -> Result<(), String> {
    let height = any_height_above_genesis(engine).ok_or("nothing to fly to")?;
    let before = engine.camera().position;
    if !engine.fly_to_block(height) {
        return Err(format!("block #{height} unknown"));
    }
    // Tween only: the engine clock, orbits and hover schedule stay put.
    for _ in 0..(SIMULATED_MS / SIMULATED_FRAME_MS).ceil() as usize {
        engine.step_camera();
    }
    if engine.camera().position == before {
        return Err("camera did not move".into());
    }
    Ok(())
}

fn visibility_matches(engine: &Engine) -> bool {
    let filters = &engine.visual().filters;
    engine
        .registry()
        .all()
        .iter()
        .all(|star| engine.is_star_visible(star.height) == resolve_visibility(star, filters))
}

fn high_fee_filter_applies(engine: &mut Engine) -> Result<(), String> {
    engine.set_filters(FilterPatch {
        high_fee: Some(true),
        ..Default::default()
    });
    let on = visibility_matches(engine);
    engine.set_filters(FilterPatch {
        high_fee: Some(false),
        ..Default::default()
    });
    let off = visibility_matches(engine);
    match (on, off) {
        (true, true) => Ok(()),
        _ => Err(format!("visibility mismatch (filter on: {on}, off: {off})")),
    }
}

fn color_mode_switches(engine: &mut Engine) -> Result<(), String> {
    engine.set_color_mode(ColorMode::Miner);
    let mismatched = engine
        .registry()
        .all()
        .iter()
        .filter(|star| {
            engine.scene().get(star.node).map(|n| n.color)
                != Some(resolve_color(star, ColorMode::Miner, 0))
        })
        .count();
    engine.set_color_mode(ColorMode::Fee);
    if mismatched > 0 {
        return Err(format!("{mismatched} stars not colored by miner"));
    }
    Ok(())
}

fn constellation_builds(engine: &mut Engine) -> Result<(), String> {
    engine.show_address_constellation(CHECK_ADDRESS, AddressStats::default());
    let constellation = engine.registry().constellation().ok_or("none registered")?;
    let expected = 1 + CHECK_ADDRESS.chars().count().min(MAX_CONSTELLATION_POINTS);
    let live = engine
        .scene()
        .count_where(|k| matches!(k, NodeKind::AddressCenter | NodeKind::AddressNode));
    if constellation.address != CHECK_ADDRESS || live != expected {
        return Err(format!("expected {expected} nodes, found {live}"));
    }
    Ok(())
}

fn frontier_known(engine: &mut Engine) -> Result<(), String> {
    engine
        .frontier()
        .map(|_| ())
        .ok_or_else(|| "no frontier".into())
}
