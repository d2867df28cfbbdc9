pub mod attributes;
pub mod constellation;
pub mod effects;
pub mod registry;
pub mod star;

pub use attributes::{
    Color, ColorMode, FilterPatch, Filters, resolve_color, resolve_visibility,
    satellite_visibility,
};
pub use constellation::AddressConstellation;
pub use effects::{Comet, EffectError, Nova};
pub use registry::{EntityRegistry, StarId, Upsert};
pub use star::{BlockStar, Satellite, star_position};

/// Blocks between subsidy halvings; each halving height gets a nova.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Fees (BTC) a block must exceed to pass the high-fee filter.
pub const HIGH_FEE_THRESHOLD: f64 = 0.2;

/// Draw radii
pub const STAR_RADIUS: f64 = 0.3;
pub const GENESIS_RADIUS: f64 = 2.0;
pub const SATELLITE_RADIUS: f64 = 0.05;

/// Base orbit radius; each satellite adds up to 1.5 on top.
pub const TX_ORBIT_RADIUS: f64 = 2.0;

pub const NOVA_DURATION_MS: f64 = 4_000.0;
pub const COMET_DURATION_MS: f64 = 6_000.0;
/// Distance from the anchor star at which comets appear.
pub const COMET_SHELL_RADIUS: f64 = 60.0;

pub fn is_halving_height(height: u64) -> bool {
    height > 0 && height % HALVING_INTERVAL == 0
}
