//! Messages that mutate the engine. HTTP handlers and pollers send these;
//! the frame loop applies them in arrival order at the start of a frame.

use log::debug;
use tokio::sync::oneshot;

use super::Engine;
use crate::diagnostics::{DiagnosticResult, run_diagnostics};
use crate::feed::{AddressStats, BlockRecord, TxRecord};
use crate::universe::{ColorMode, FilterPatch};

#[derive(Debug)]
pub enum Intent {
    /// Fly to a known star; replies whether the height was known.
    FlyTo {
        height: u64,
        reply: oneshot::Sender<bool>,
    },
    /// Add a block fetched on demand, optionally flying to it.
    AddBlock {
        block: BlockRecord,
        fly: bool,
        reply: Option<oneshot::Sender<bool>>,
    },
    /// A realtime batch from the block poller.
    IngestBatch(Vec<BlockRecord>),
    SetColorMode(ColorMode),
    SetFilters(FilterPatch),
    SetShowTxOrbits(bool),
    SetShowComets(bool),
    SetPixelRatio(f64),
    PointerMoved {
        x: f64,
        y: f64,
    },
    Resize {
        width: f64,
        height: f64,
        device_pixel_ratio: f64,
    },
    /// Mempool transactions, launched toward the frontier star.
    SpawnComets(Vec<TxRecord>),
    ShowAddress {
        address: String,
        stats: AddressStats,
    },
    RunDiagnostics {
        reply: oneshot::Sender<Vec<DiagnosticResult>>,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::FlyTo { .. } => "fly_to",
            Intent::AddBlock { .. } => "add_block",
            Intent::IngestBatch(_) => "ingest_batch",
            Intent::SetColorMode(_) => "set_color_mode",
            Intent::SetFilters(_) => "set_filters",
            Intent::SetShowTxOrbits(_) => "set_show_tx_orbits",
            Intent::SetShowComets(_) => "set_show_comets",
            Intent::SetPixelRatio(_) => "set_pixel_ratio",
            Intent::PointerMoved { .. } => "pointer_moved",
            Intent::Resize { .. } => "resize",
            Intent::SpawnComets(_) => "spawn_comets",
            Intent::ShowAddress { .. } => "show_address",
            Intent::RunDiagnostics { .. } => "run_diagnostics",
        }
    }
}

/// Apply one intent. A dropped reply receiver is not an error: the
/// requester simply stopped waiting.
pub fn dispatch(engine: &mut Engine, intent: Intent) {
    if !matches!(intent, Intent::PointerMoved { .. }) {
        debug!("INTENT - {}", intent.name());
    }
    match intent {
        Intent::FlyTo { height, reply } => {
            let _ = reply.send(engine.fly_to_block(height));
        }
        Intent::AddBlock { block, fly, reply } => {
            engine.add_block_star(&block);
            let flew = fly && engine.fly_to_block(block.height);
            if let Some(reply) = reply {
                let _ = reply.send(flew);
            }
        }
        Intent::IngestBatch(blocks) => {
            engine.ingest_batch(blocks);
        }
        Intent::SetColorMode(mode) => engine.set_color_mode(mode),
        Intent::SetFilters(patch) => engine.set_filters(patch),
        Intent::SetShowTxOrbits(show) => engine.set_show_tx_orbits(show),
        Intent::SetShowComets(show) => engine.set_show_comets(show),
        Intent::SetPixelRatio(scale) => engine.set_pixel_ratio(scale),
        Intent::PointerMoved { x, y } => engine.set_pointer(x, y),
        Intent::Resize {
            width,
            height,
            device_pixel_ratio,
        } => engine.set_viewport(width, height, device_pixel_ratio),
        Intent::SpawnComets(txs) => {
            if let Some(frontier) = engine.frontier() {
                engine.spawn_comets(&txs, frontier);
            }
        }
        Intent::ShowAddress { address, stats } => {
            engine.show_address_constellation(&address, stats);
        }
        Intent::RunDiagnostics { reply } => {
            let _ = reply.send(run_diagnostics(engine));
        }
    }
}
