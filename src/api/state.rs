use actix_web::{HttpResponse, Responder, get, post, web};
use log::info;
use tokio::sync::oneshot;

use super::models::{AppState, frame_loop_gone};
use crate::engine::Intent;

/// Latest snapshot published by the frame loop.
#[get("/state/")]
pub async fn get_state(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.snapshot())
}

/// Run the self-check inside the frame loop and return its results.
#[post("/diagnostics/")]
pub async fn run_diagnostics(state: web::Data<AppState>) -> impl Responder {
    let (reply, results) = oneshot::channel();
    if state.intents.send(Intent::RunDiagnostics { reply }).is_err() {
        return frame_loop_gone();
    }
    match results.await {
        Ok(results) => {
            info!(
                "DIAGNOSTICS - {}/{} passed",
                results.iter().filter(|r| r.ok).count(),
                results.len()
            );
            HttpResponse::Ok().json(results)
        }
        Err(_) => frame_loop_gone(),
    }
}
