use actix_web::HttpResponse;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::engine::{Intent, StateSnapshot};
use crate::feed::{FetchError, MempoolSpace};
use crate::runtime::SharedSnapshot;
use crate::universe::ColorMode;

/// Shared handler state: a line into the frame loop, its latest published
/// snapshot, and the supplier used for on-demand lookups.
pub struct AppState {
    pub intents: UnboundedSender<Intent>,
    pub snapshot: SharedSnapshot,
    pub supplier: MempoolSpace,
}

impl AppState {
    /// Queue an intent for the next frame. 202 on success, 503 once the
    /// frame loop has stopped.
    pub fn enqueue(&self, intent: Intent) -> HttpResponse {
        let name = intent.name();
        match self.intents.send(intent) {
            Ok(()) => HttpResponse::Accepted().json(QueuedResponse { queued: name }),
            Err(_) => frame_loop_gone(),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshot.read().expect("rwlock poisoned").clone()
    }
}

pub fn frame_loop_gone() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorResponse {
        error: "frame loop is not running".to_string(),
    })
}

/// 404 for records the explorer does not know, 502 for everything else.
pub fn fetch_error_response(e: &FetchError) -> HttpResponse {
    let body = ErrorResponse {
        error: e.to_string(),
    };
    if e.is_not_found() {
        HttpResponse::NotFound().json(body)
    } else {
        warn!("API - upstream failure: {e}");
        HttpResponse::BadGateway().json(body)
    }
}

/// Why an on-demand lookup could not finish.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("frame loop is not running")]
    FrameLoopGone,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl NavigationError {
    pub fn to_response(&self) -> HttpResponse {
        match self {
            NavigationError::FrameLoopGone => frame_loop_gone(),
            NavigationError::Fetch(e) => fetch_error_response(e),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct QueuedResponse {
    pub queued: &'static str,
}

/* ---------- Control Models ---------- */

#[derive(Deserialize)]
pub struct ColorModeRequest {
    pub mode: ColorMode,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct PixelRatioRequest {
    pub scale: f64,
}

#[derive(Deserialize)]
pub struct PointerRequest {
    pub x: f64,
    pub y: f64,
}

fn unit_ratio() -> f64 {
    1.0
}

#[derive(Deserialize)]
pub struct ViewportRequest {
    pub width: f64,
    pub height: f64,
    #[serde(default = "unit_ratio")]
    pub device_pixel_ratio: f64,
}

/* ---------- Navigation Models ---------- */

#[derive(Debug, Serialize)]
pub struct FlyResponse {
    pub height: u64,
    /// "scene" when the star was already loaded, "fetched" otherwise.
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub address: String,
    pub funded_btc: f64,
    pub spent_btc: f64,
    pub tx_count: u64,
}
