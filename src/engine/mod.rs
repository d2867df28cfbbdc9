//! The scene-state engine: one value owning the registry, the scene graph,
//! the camera and the visual mode. Everything that mutates visual state goes
//! through its methods, called from a single frame loop.

pub mod frame;
pub mod hover;
pub mod intent;
pub mod snapshot;

use chrono::Utc;
use log::{debug, info, warn};
use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::feed::{AddressStats, BlockRecord, TxRecord};
use crate::scene::{Camera, FlyTarget, Scene, Viewport};
use crate::universe::{
    Comet, EntityRegistry, FilterPatch, Filters, Nova, StarId, Upsert, is_halving_height,
    resolve_color, resolve_visibility, satellite_visibility,
};

pub use crate::universe::ColorMode;
pub use hover::{HoverState, Tooltip, TooltipContent};
pub use intent::Intent;
pub use snapshot::StateSnapshot;

/// Camera offset from a star when flying to it.
pub const STAR_FLY_OFFSET: [f64; 3] = [0.0, 0.0, 6.0];
/// Camera offset from a constellation center.
pub const ADDRESS_FLY_OFFSET: [f64; 3] = [0.0, 0.0, 8.0];

pub const DEFAULT_MAX_TX_PER_BLOCK: usize = 10;
pub const DEFAULT_MAX_COMETS: usize = 50;
pub const DEFAULT_PIXEL_RATIO_SCALE: f64 = 0.85;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Satellites drawn per star.
    pub max_tx_per_block: usize,
    /// Comets alive at once.
    pub max_comets: usize,
    pub pixel_ratio_scale: f64,
    pub color_mode: ColorMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tx_per_block: DEFAULT_MAX_TX_PER_BLOCK,
            max_comets: DEFAULT_MAX_COMETS,
            pixel_ratio_scale: DEFAULT_PIXEL_RATIO_SCALE,
            color_mode: ColorMode::default(),
        }
    }
}

/// Process-wide visual mode, read by attribute resolution and the frame loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualState {
    pub color_mode: ColorMode,
    pub filters: Filters,
    pub show_tx_orbits: bool,
    pub show_comets: bool,
    pub pixel_ratio_scale: f64,
}

/// Outcome of merging one batch of fetched blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Heights registered by this batch, ascending.
    pub added: Vec<u64>,
    /// Records at or below the frontier, or repeated within the batch.
    pub skipped: usize,
    /// Added blocks whose transaction list could not be fetched.
    pub partial: usize,
    /// Miner names seen for the first time.
    pub new_miners: Vec<String>,
}

pub struct Engine {
    config: EngineConfig,
    registry: EntityRegistry,
    scene: Scene,
    camera: Camera,
    fly_target: Option<FlyTarget>,
    visual: VisualState,
    viewport: Viewport,
    /// Pointer in normalized device coordinates, once it has moved.
    pointer: Option<(f64, f64)>,
    hover: HoverState,
    novas: Vec<Nova>,
    comets: Vec<Comet>,
    known_miners: BTreeSet<String>,
    clock_ms: f64,
    rng: StdRng,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Engine with a fixed seed for orbit and comet randomness.
    pub fn seeded(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        let visual = VisualState {
            color_mode: config.color_mode,
            filters: Filters::default(),
            show_tx_orbits: true,
            show_comets: true,
            pixel_ratio_scale: config.pixel_ratio_scale,
        };
        let viewport = Viewport::default();
        Self {
            config,
            registry: EntityRegistry::new(),
            scene: Scene::new(),
            camera: Camera {
                aspect: viewport.aspect(),
                ..Camera::default()
            },
            fly_target: None,
            visual,
            viewport,
            pointer: None,
            hover: HoverState::default(),
            novas: Vec::new(),
            comets: Vec::new(),
            known_miners: BTreeSet::new(),
            clock_ms: 0.0,
            rng,
        }
    }

    /* -------------------- Accessors -------------------- */

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn fly_target(&self) -> Option<&FlyTarget> {
        self.fly_target.as_ref()
    }

    pub fn visual(&self) -> &VisualState {
        &self.visual
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.hover.tooltip.as_ref()
    }

    pub fn novas(&self) -> &[Nova] {
        &self.novas
    }

    pub fn comets(&self) -> &[Comet] {
        &self.comets
    }

    pub fn known_miners(&self) -> impl Iterator<Item = &str> {
        self.known_miners.iter().map(String::as_str)
    }

    pub fn frontier(&self) -> Option<u64> {
        self.registry.frontier()
    }

    /// Device pixel density times the configured scale.
    pub fn effective_pixel_ratio(&self) -> f64 {
        self.viewport.device_pixel_ratio * self.visual.pixel_ratio_scale
    }

    pub fn is_star_visible(&self, height: u64) -> bool {
        self.registry
            .get_by_height(height)
            .and_then(|star| self.scene.get(star.node))
            .is_some_and(|node| node.visible)
    }

    /* -------------------- Ingestion -------------------- */

    /// Start over: empty scene, genesis, then `blocks`, then one attribute pass.
    pub fn init_scene(&mut self, blocks: Vec<BlockRecord>) {
        self.scene.clear();
        self.registry.clear();
        self.novas.clear();
        self.comets.clear();
        self.known_miners.clear();
        self.fly_target = None;
        self.hover = HoverState::default();
        self.camera = Camera {
            aspect: self.viewport.aspect(),
            ..Camera::default()
        };

        self.insert(&BlockRecord::genesis());
        for block in &blocks {
            self.insert(block);
        }
        self.apply_attributes();

        info!(
            "SCENE - initialized with {} stars (frontier {:?}, {} miners)",
            self.registry.len(),
            self.registry.frontier(),
            self.known_miners.len()
        );
    }

    /// Register one block and resolve its attributes. Known heights are
    /// left exactly as they are.
    pub fn add_block_star(&mut self, block: &BlockRecord) -> Upsert {
        let upsert = self.insert(block);
        if let Upsert::Created(id) = upsert {
            self.apply_star_attributes(id);
        }
        upsert
    }

    /// Merge a realtime batch: only heights above the frontier (as of now,
    /// not as of when the batch was fetched), ascending, then one full
    /// attribute pass.
    pub fn ingest_batch(&mut self, mut blocks: Vec<BlockRecord>) -> IngestReport {
        let frontier = self.registry.frontier();
        blocks.sort_by_key(|b| b.height);

        let mut report = IngestReport::default();
        for block in &blocks {
            if frontier.is_some_and(|top| block.height <= top) {
                report.skipped += 1;
                continue;
            }
            let miner_is_new = !self.known_miners.contains(&block.miner);
            match self.insert(block) {
                Upsert::Created(_) => {
                    report.added.push(block.height);
                    if !block.enriched {
                        report.partial += 1;
                    }
                    if miner_is_new {
                        report.new_miners.push(block.miner.clone());
                    }
                }
                Upsert::Existing(_) => report.skipped += 1,
            }
        }

        if !report.added.is_empty() {
            self.apply_attributes();
            info!(
                "INGEST - added {:?} (skipped {}, partial {}, new miners {:?})",
                report.added, report.skipped, report.partial, report.new_miners
            );
        } else {
            debug!("INGEST - nothing above frontier {:?}", frontier);
        }
        report
    }

    fn insert(&mut self, block: &BlockRecord) -> Upsert {
        let upsert = self.registry.upsert(
            block,
            self.config.max_tx_per_block,
            &mut self.scene,
            &mut self.rng,
        );
        if upsert.is_created() {
            self.known_miners.insert(block.miner.clone());
            if is_halving_height(block.height) {
                let position = self
                    .registry
                    .get(upsert.id())
                    .map_or_else(|| Vector3::zeros(), |s| s.position);
                info!("NOVA - halving block #{} ingested", block.height);
                self.novas
                    .push(Nova::spawn(block.height, position, self.clock_ms, &mut self.scene));
            }
        }
        upsert
    }

    /* -------------------- Attribute resolution -------------------- */

    fn apply_attributes(&mut self) {
        self.apply_colors();
        self.apply_visibility();
    }

    fn apply_star_attributes(&mut self, id: StarId) {
        let Some(star) = self.registry.get(id) else {
            return;
        };
        let now_secs = Utc::now().timestamp();
        let color = resolve_color(star, self.visual.color_mode, now_secs);
        let visible = resolve_visibility(star, &self.visual.filters);
        let show_sat = satellite_visibility(visible, self.visual.show_tx_orbits);

        if let Some(node) = self.scene.get_mut(star.node) {
            node.color = color;
            node.visible = visible;
        }
        for sat in &star.satellites {
            if let Some(node) = self.scene.get_mut(sat.node) {
                node.visible = show_sat;
            }
        }
    }

    fn apply_colors(&mut self) {
        let now_secs = Utc::now().timestamp();
        for star in self.registry.all() {
            if let Some(node) = self.scene.get_mut(star.node) {
                node.color = resolve_color(star, self.visual.color_mode, now_secs);
            }
        }
    }

    fn apply_visibility(&mut self) {
        for star in self.registry.all() {
            let visible = resolve_visibility(star, &self.visual.filters);
            if let Some(node) = self.scene.get_mut(star.node) {
                node.visible = visible;
            }
            let show_sat = satellite_visibility(visible, self.visual.show_tx_orbits);
            for sat in &star.satellites {
                if let Some(node) = self.scene.get_mut(sat.node) {
                    node.visible = show_sat;
                }
            }
        }
        self.apply_constellation_visibility();
    }

    /// Decorative address points follow the orbit toggle; the center never hides.
    fn apply_constellation_visibility(&mut self) {
        let Some(constellation) = self.registry.constellation() else {
            return;
        };
        for handle in &constellation.points {
            if let Some(node) = self.scene.get_mut(*handle) {
                node.visible = self.visual.show_tx_orbits;
            }
        }
    }

    /* -------------------- Public API -------------------- */

    /// Aim the camera at a known star. Returns false for unknown heights so
    /// the caller can fall back to fetching the block.
    pub fn fly_to_block(&mut self, height: u64) -> bool {
        let Some(star) = self.registry.get_by_height(height) else {
            return false;
        };
        self.fly_target = Some(FlyTarget::facing(
            star.position,
            Vector3::from(STAR_FLY_OFFSET),
        ));
        debug!("CAMERA - flying to block #{height}");
        true
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.visual.color_mode = mode;
        self.apply_colors();
    }

    /// Merge `patch` into the active filters and recompute visibility.
    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.visual.filters.merge(patch);
        self.apply_visibility();
    }

    pub fn set_show_tx_orbits(&mut self, show: bool) {
        self.visual.show_tx_orbits = show;
        self.apply_visibility();
    }

    /// Turning comets off also clears the ones in flight.
    pub fn set_show_comets(&mut self, show: bool) {
        self.visual.show_comets = show;
        if !show {
            for comet in self.comets.drain(..) {
                self.scene.remove(comet.node);
            }
        }
    }

    pub fn set_pixel_ratio(&mut self, scale: f64) {
        if !scale.is_finite() || scale <= 0.0 {
            warn!("SCENE - ignoring pixel ratio scale {scale}");
            return;
        }
        self.visual.pixel_ratio_scale = scale;
    }

    pub fn set_viewport(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.viewport = Viewport {
            width: width.max(1.0),
            height: height.max(1.0),
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        };
        self.camera.aspect = self.viewport.aspect();
    }

    /// Pointer position in viewport pixels.
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer = Some(self.viewport.to_ndc(x, y));
    }

    /// Launch comets toward the star at `anchor_height`. Already-flying txids
    /// are skipped; the oldest comets make room once the cap is reached.
    /// Returns how many were launched.
    pub fn spawn_comets(&mut self, txs: &[TxRecord], anchor_height: u64) -> usize {
        if !self.visual.show_comets || self.config.max_comets == 0 {
            return 0;
        }
        let Some(anchor) = self.registry.get_by_height(anchor_height).map(|s| s.position) else {
            debug!("COMET - anchor #{anchor_height} unknown, skipping {} txs", txs.len());
            return 0;
        };

        let mut launched = 0;
        for tx in txs {
            if self.comets.iter().any(|c| c.txid == tx.txid) {
                continue;
            }
            if self.comets.len() >= self.config.max_comets {
                let oldest = self.comets.remove(0);
                self.scene.remove(oldest.node);
            }
            let comet = Comet::spawn(tx, anchor, self.clock_ms, &mut self.scene, &mut self.rng);
            self.comets.push(comet);
            launched += 1;
        }
        launched
    }

    /// Replace the live constellation with one for `address` and fly to it.
    pub fn show_address_constellation(&mut self, address: &str, stats: AddressStats) {
        let center = self
            .registry
            .replace_constellation(address, stats, &mut self.scene)
            .center_position();
        self.apply_constellation_visibility();
        self.fly_target = Some(FlyTarget::facing(center, Vector3::from(ADDRESS_FLY_OFFSET)));
        info!("ADDRESS - showing constellation for {address}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Engine, EngineConfig};
    use crate::feed::{AddressStats, BlockRecord, TxInput, TxRecord};
    use crate::scene::NodeKind;
    use crate::universe::{ColorMode, FilterPatch, resolve_color};
    use proptest::prelude::*;

    pub(crate) fn engine_with(heights: &[u64]) -> Engine {
        let mut engine = Engine::seeded(EngineConfig::default(), 42);
        let blocks = heights
            .iter()
            .map(|&h| BlockRecord::sample(h, h as f64 / 1_000.0, "AntPool"))
            .collect();
        engine.init_scene(blocks);
        engine
    }

    fn with_txs(mut block: BlockRecord, n: usize) -> BlockRecord {
        block.tx_list = (0..n)
            .map(|i| TxRecord {
                txid: format!("{}-{i}", block.height),
                vin: vec![TxInput { sequence: u32::MAX }],
                ..Default::default()
            })
            .collect();
        block
    }

    #[test]
    fn init_seeds_genesis_and_blocks() {
        let engine = engine_with(&[100, 250]);
        assert!(engine.registry().get_by_height(0).is_some());
        assert_eq!(engine.registry().len(), 3);
        assert_eq!(engine.frontier(), Some(250));
        let miners: Vec<&str> = engine.known_miners().collect();
        assert_eq!(miners, vec!["AntPool", "Satoshi"]);
    }

    #[test]
    fn reinit_starts_from_scratch() {
        let mut engine = engine_with(&[100, 250]);
        engine.init_scene(vec![BlockRecord::sample(7, 0.1, "x")]);
        assert_eq!(engine.registry().len(), 2);
        assert_eq!(engine.scene().len(), 2);
    }

    #[test]
    fn add_block_star_is_idempotent() {
        let mut engine = engine_with(&[100]);
        let block = with_txs(BlockRecord::sample(300, 0.5, "F2Pool"), 4);
        let first = engine.add_block_star(&block);
        let nodes = engine.scene().len();
        engine.set_color_mode(ColorMode::Miner);
        let second = engine.add_block_star(&block);

        assert_eq!(first.id(), second.id());
        assert!(!second.is_created());
        assert_eq!(engine.scene().len(), nodes);
        assert_eq!(engine.registry().get_by_height(300).map(|s| s.satellites.len()), Some(4));
    }

    #[test]
    fn new_star_gets_current_filters_and_colors() {
        let mut engine = engine_with(&[100]);
        engine.set_filters(FilterPatch {
            high_fee: Some(true),
            ..Default::default()
        });
        engine.set_color_mode(ColorMode::Miner);
        engine.add_block_star(&with_txs(BlockRecord::sample(301, 0.1, "ViaBTC"), 2));

        let star = engine.registry().get_by_height(301).expect("added");
        let node = engine.scene().get(star.node).expect("node");
        assert!(!node.visible);
        assert_eq!(node.color, resolve_color(star, ColorMode::Miner, 0));
        for sat in &star.satellites {
            assert!(!engine.scene().get(sat.node).expect("sat").visible);
        }
    }

    #[test]
    fn halving_heights_spawn_a_nova() {
        let mut engine = engine_with(&[]);
        engine.add_block_star(&BlockRecord::sample(420_000, 0.1, "x"));
        engine.add_block_star(&BlockRecord::sample(420_001, 0.1, "x"));
        engine.add_block_star(&BlockRecord::sample(420_000, 0.1, "x"));
        assert_eq!(engine.novas().len(), 1);
        assert_eq!(engine.novas()[0].height, 420_000);
    }

    #[test]
    fn batch_skips_heights_at_or_below_frontier() {
        let mut engine = engine_with(&[100, 200]);
        let mut partial = BlockRecord::sample(202, 0.1, "Luxor");
        partial.enriched = false;
        let report = engine.ingest_batch(vec![
            partial,
            BlockRecord::sample(150, 0.1, "x"),
            BlockRecord::sample(201, 0.1, "AntPool"),
            BlockRecord::sample(201, 0.1, "AntPool"),
        ]);

        assert_eq!(report.added, vec![201, 202]);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.partial, 1);
        assert_eq!(report.new_miners, vec!["Luxor".to_string()]);
        assert!(engine.registry().get_by_height(150).is_none());
        let order: Vec<u64> = engine.registry().all().iter().map(|s| s.height).collect();
        assert_eq!(order, vec![0, 100, 200, 201, 202]);
    }

    #[test]
    fn stale_batch_leaves_registry_unchanged() {
        let mut engine = engine_with(&[100, 200]);
        let nodes = engine.scene().len();
        let report = engine.ingest_batch(vec![
            BlockRecord::sample(200, 0.1, "x"),
            BlockRecord::sample(199, 0.1, "x"),
        ]);
        assert!(report.added.is_empty());
        assert_eq!(engine.registry().len(), 3);
        assert_eq!(engine.scene().len(), nodes);
    }

    #[test]
    fn fly_to_unknown_height_reports_false() {
        let mut engine = engine_with(&[100]);
        assert!(!engine.fly_to_block(5));
        assert!(engine.fly_target().is_none());
        assert!(engine.fly_to_block(100));
        let star = engine.registry().get_by_height(100).expect("known").position;
        let target = engine.fly_target().expect("target");
        assert!(((target.position - star).z - 6.0).abs() < 1e-12);
        assert_eq!(target.look_at, star);
    }

    #[test]
    fn orbit_toggle_hides_satellites_and_address_points() {
        let mut engine = engine_with(&[]);
        engine.add_block_star(&with_txs(BlockRecord::sample(10, 0.5, "x"), 3));
        engine.show_address_constellation("bc1qtoggle", AddressStats::default());

        engine.set_show_tx_orbits(false);
        let star = engine.registry().get_by_height(10).expect("star");
        assert!(star.satellites.iter().all(|s| !engine.scene().get(s.node).expect("sat").visible));
        let c = engine.registry().constellation().expect("constellation");
        assert!(engine.scene().get(c.center).expect("center").visible);
        assert!(c.points.iter().all(|p| !engine.scene().get(*p).expect("pt").visible));

        engine.set_show_tx_orbits(true);
        let star = engine.registry().get_by_height(10).expect("star");
        assert!(star.satellites.iter().all(|s| engine.scene().get(s.node).expect("sat").visible));
    }

    #[test]
    fn constellation_replacement_keeps_exactly_one() {
        let mut engine = engine_with(&[100]);
        engine.show_address_constellation("bc1qfirst", AddressStats::default());
        let first = engine.registry().constellation().expect("first").nodes();
        engine.show_address_constellation("1SecondAddress", AddressStats::default());

        assert!(first.iter().all(|h| !engine.scene().contains(*h)));
        let live = engine.scene().count_where(|k| matches!(k, NodeKind::AddressCenter | NodeKind::AddressNode));
        assert_eq!(live, 1 + "1SecondAddress".len());
        assert_eq!(
            engine.registry().constellation().map(|c| c.address.as_str()),
            Some("1SecondAddress")
        );
        assert!(engine.fly_target().is_some());
    }

    #[test]
    fn comets_are_capped_deduped_and_cleared() {
        let config = EngineConfig {
            max_comets: 3,
            ..EngineConfig::default()
        };
        let mut engine = Engine::seeded(config, 5);
        engine.init_scene(vec![BlockRecord::sample(100, 0.1, "x")]);

        let txs: Vec<TxRecord> = (0..5)
            .map(|i| TxRecord {
                txid: format!("tx{i}"),
                ..Default::default()
            })
            .collect();
        assert_eq!(engine.spawn_comets(&txs, 100), 5);
        assert_eq!(engine.comets().len(), 3);
        let ids: Vec<&str> = engine.comets().iter().map(|c| c.txid.as_str()).collect();
        assert_eq!(ids, vec!["tx2", "tx3", "tx4"]);
        assert_eq!(engine.scene().count_where(|k| matches!(k, NodeKind::Comet)), 3);

        assert_eq!(engine.spawn_comets(&txs[3..], 100), 0);
        assert_eq!(engine.spawn_comets(&txs, 999), 0);

        engine.set_show_comets(false);
        assert!(engine.comets().is_empty());
        assert_eq!(engine.scene().count_where(|k| matches!(k, NodeKind::Comet)), 0);
        assert_eq!(engine.spawn_comets(&txs, 100), 0);
    }

    #[test]
    fn pixel_ratio_rejects_nonsense() {
        let mut engine = engine_with(&[]);
        engine.set_viewport(800.0, 600.0, 2.0);
        engine.set_pixel_ratio(0.5);
        assert!((engine.effective_pixel_ratio() - 1.0).abs() < 1e-12);
        engine.set_pixel_ratio(f64::NAN);
        engine.set_pixel_ratio(-1.0);
        assert!((engine.visual().pixel_ratio_scale - 0.5).abs() < 1e-12);
        assert!((engine.camera().aspect - 800.0 / 600.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn frontier_never_decreases(batches in prop::collection::vec(
            prop::collection::vec(0u64..2_000, 0..8), 1..8)
        ) {
            let mut engine = engine_with(&[500]);
            let mut last = engine.frontier();
            for batch in batches {
                let before = engine.registry().len();
                let top = engine.frontier();
                let stale = batch.iter().all(|h| top.is_some_and(|t| *h <= t));
                engine.ingest_batch(batch.iter().map(|&h| BlockRecord::sample(h, 0.1, "x")).collect());
                prop_assert!(engine.frontier() >= last);
                if stale {
                    prop_assert_eq!(engine.registry().len(), before);
                }
                last = engine.frontier();
            }
        }

        #[test]
        fn high_fee_filter_matches_threshold(fees in 0.0f64..2.0) {
            let mut engine = engine_with(&[]);
            engine.add_block_star(&BlockRecord::sample(77, fees, "x"));
            engine.set_filters(FilterPatch { high_fee: Some(true), ..Default::default() });
            prop_assert_eq!(engine.is_star_visible(77), fees > 0.2);
        }
    }
}
