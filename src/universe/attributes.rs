//! Star color and visibility. Everything here is a pure function of the
//! star's block data and the current visual mode.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

use super::{BlockStar, HIGH_FEE_THRESHOLD};

/// Age at which the age gradient saturates (two years).
const AGE_SPAN_SECS: f64 = 60.0 * 60.0 * 24.0 * 365.0 * 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    #[serde(alias = "fees")]
    Fee,
    Age,
    Miner,
}

impl FromStr for ColorMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fee" | "fees" => Ok(ColorMode::Fee),
            "age" => Ok(ColorMode::Age),
            "miner" => Ok(ColorMode::Miner),
            _ => Err("color mode must be one of fee, age, miner"),
        }
    }
}

/// Linear RGB in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self {
            r: channel(16),
            g: channel(8),
            b: channel(0),
        }
    }

    /// HSL with hue in turns (wrapped into [0, 1)) and s, l clamped to [0, 1].
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            let v = l as f32;
            return Self { r: v, g: v, b: v };
        }
        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;
        Self {
            r: hue_to_channel(q, p, h + 1.0 / 3.0) as f32,
            g: hue_to_channel(q, p, h) as f32,
            b: hue_to_channel(q, p, h - 1.0 / 3.0) as f32,
        }
    }
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub high_fee: bool,
    /// Empty means "any miner".
    pub miner: String,
    pub rbf: bool,
}

/// Partial filter update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPatch {
    #[serde(default, alias = "highFee")]
    pub high_fee: Option<bool>,
    #[serde(default)]
    pub miner: Option<String>,
    #[serde(default)]
    pub rbf: Option<bool>,
}

impl Filters {
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(high_fee) = patch.high_fee {
            self.high_fee = high_fee;
        }
        if let Some(miner) = patch.miner {
            self.miner = miner;
        }
        if let Some(rbf) = patch.rbf {
            self.rbf = rbf;
        }
    }
}

/// Hue in whole degrees from a SHA-256 of the miner name.
pub fn miner_hue(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    word % 360
}

pub fn resolve_color(star: &BlockStar, mode: ColorMode, now_secs: i64) -> Color {
    // Genesis anchors the spiral and is drawn white in every mode.
    if star.is_genesis() {
        return Color::WHITE;
    }
    match mode {
        ColorMode::Fee => {
            let brightness = (star.total_fees * 4.0).clamp(0.0, 1.0);
            Color::from_hsl(0.12, 1.0, brightness)
        }
        ColorMode::Age => {
            let age = (now_secs.saturating_sub(star.timestamp) as f64 / AGE_SPAN_SECS).clamp(0.0, 1.0);
            Color::from_hsl(0.66 - 0.66 * age, 1.0, 0.5)
        }
        ColorMode::Miner => Color::from_hsl(miner_hue(&star.miner) as f64 / 360.0, 0.7, 0.5),
    }
}

pub fn resolve_visibility(star: &BlockStar, filters: &Filters) -> bool {
    if filters.high_fee && star.total_fees <= HIGH_FEE_THRESHOLD {
        return false;
    }
    if !filters.miner.is_empty() && star.miner != filters.miner {
        return false;
    }
    if filters.rbf && !star.is_rbf {
        return false;
    }
    true
}

/// Satellites show only when their star does and orbits are switched on.
pub fn satellite_visibility(star_visible: bool, show_tx_orbits: bool) -> bool {
    star_visible && show_tx_orbits
}
