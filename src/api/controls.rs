use actix_web::{HttpResponse, Responder, post, web};

use super::models::{
    AppState, ColorModeRequest, PixelRatioRequest, PointerRequest, ToggleRequest, ViewportRequest,
};
use crate::engine::Intent;
use crate::universe::FilterPatch;

/// Merge the given filter fields into the active ones.
#[post("/filters/")]
pub async fn set_filters(
    state: web::Data<AppState>,
    body: web::Json<FilterPatch>,
) -> impl Responder {
    state.enqueue(Intent::SetFilters(body.into_inner()))
}

#[post("/color-mode/")]
pub async fn set_color_mode(
    state: web::Data<AppState>,
    body: web::Json<ColorModeRequest>,
) -> impl Responder {
    state.enqueue(Intent::SetColorMode(body.mode))
}

#[post("/orbits/")]
pub async fn set_orbits(state: web::Data<AppState>, body: web::Json<ToggleRequest>) -> impl Responder {
    state.enqueue(Intent::SetShowTxOrbits(body.enabled))
}

#[post("/comets/")]
pub async fn set_comets(state: web::Data<AppState>, body: web::Json<ToggleRequest>) -> impl Responder {
    state.enqueue(Intent::SetShowComets(body.enabled))
}

#[post("/pixel-ratio/")]
pub async fn set_pixel_ratio(
    state: web::Data<AppState>,
    body: web::Json<PixelRatioRequest>,
) -> impl Responder {
    if !body.scale.is_finite() || body.scale <= 0.0 {
        return HttpResponse::BadRequest().body("scale must be > 0");
    }
    state.enqueue(Intent::SetPixelRatio(body.scale))
}

/// Pointer position in viewport pixels.
#[post("/pointer/")]
pub async fn set_pointer(state: web::Data<AppState>, body: web::Json<PointerRequest>) -> impl Responder {
    state.enqueue(Intent::PointerMoved {
        x: body.x,
        y: body.y,
    })
}

#[post("/viewport/")]
pub async fn set_viewport(
    state: web::Data<AppState>,
    body: web::Json<ViewportRequest>,
) -> impl Responder {
    if body.width <= 0.0 || body.height <= 0.0 {
        return HttpResponse::BadRequest().body("width and height must be > 0");
    }
    state.enqueue(Intent::Resize {
        width: body.width,
        height: body.height,
        device_pixel_ratio: body.device_pixel_ratio,
    })
}
