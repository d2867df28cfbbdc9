use serde::Serialize;

use crate::scene::{NodeKind, Ray, Scene};
use crate::universe::{AddressConstellation, BlockStar, EntityRegistry};

/// Minimum time between two picking passes.
pub const HOVER_INTERVAL_MS: f64 = 100.0;
/// Tooltip offset from the pointer, in pixels.
pub const TOOLTIP_OFFSET: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TooltipContent {
    Address {
        address: String,
        funded_btc: f64,
        spent_btc: f64,
        tx_count: u64,
    },
    Block {
        height: u64,
        miner: String,
        tx_count: u64,
        total_fees: f64,
    },
    Transaction,
}

impl TooltipContent {
    pub fn for_star(star: &BlockStar) -> Self {
        TooltipContent::Block {
            height: star.height,
            miner: star.miner.clone(),
            tx_count: star.tx_count,
            total_fees: star.total_fees,
        }
    }

    pub fn for_address(constellation: &AddressConstellation) -> Self {
        TooltipContent::Address {
            address: constellation.address.clone(),
            funded_btc: constellation.stats.funded_btc(),
            spent_btc: constellation.stats.spent_btc(),
            tx_count: constellation.stats.chain_stats.tx_count,
        }
    }

    /// Display lines. BTC amounts to 8 places, block fees to 6.
    pub fn lines(&self) -> Vec<String> {
        match self {
            TooltipContent::Address {
                address,
                funded_btc,
                spent_btc,
                tx_count,
            } => vec![
                format!("Address: {address}"),
                format!("Funded: {funded_btc:.8} BTC"),
                format!("Spent: {spent_btc:.8} BTC"),
                format!("Tx Count: {tx_count}"),
            ],
            TooltipContent::Block {
                height,
                miner,
                tx_count,
                total_fees,
            } => vec![
                format!("Block #{height}"),
                format!("Miner: {miner}"),
                format!("Tx Count: {tx_count}"),
                format!("Fees: {total_fees:.6} BTC"),
            ],
            TooltipContent::Transaction => vec!["Transaction".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub content: TooltipContent,
    /// What the overlay prints, one entry per row.
    pub text: Vec<String>,
    /// Viewport pixels.
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub last_check_ms: f64,
    pub tooltip: Option<Tooltip>,
}

impl Default for HoverState {
    fn default() -> Self {
        Self {
            last_check_ms: f64::NEG_INFINITY,
            tooltip: None,
        }
    }
}

impl HoverState {
    /// True (and the check time recorded) when enough time has passed since
    /// the last pass.
    pub fn due(&mut self, now_ms: f64) -> bool {
        if now_ms - self.last_check_ms > HOVER_INTERVAL_MS {
            self.last_check_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/// Nearest visible, pickable node along `ray`.
pub fn pick(scene: &Scene, ray: &Ray) -> Option<NodeKind> {
    scene
        .iter()
        .filter(|(_, node)| node.visible && node.kind.is_pickable())
        .filter_map(|(_, node)| {
            ray.intersect_sphere(&node.position, node.bounding_radius())
                .map(|distance| (distance, node.kind))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, kind)| kind)
}

/// Tooltip text for a picked node. `None` if what it refers to is gone.
pub fn describe(kind: NodeKind, registry: &EntityRegistry) -> Option<TooltipContent> {
    match kind {
        NodeKind::Star { height } => registry.get_by_height(height).map(TooltipContent::for_star),
        NodeKind::AddressCenter => registry.constellation().map(TooltipContent::for_address),
        NodeKind::Satellite { .. } | NodeKind::AddressNode => Some(TooltipContent::Transaction),
        NodeKind::Nova { .. } | NodeKind::Comet => None,
    }
}
