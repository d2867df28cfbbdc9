use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use super::models::{AddressResponse, AppState, FlyResponse, NavigationError};
use crate::engine::Intent;
use crate::feed::{DataSupplier, fetch_block_by_height};

/// Fly to a block. Unknown heights are fetched from the explorer, added to
/// the scene, then flown to.
#[post("/fly/{height}/")]
pub async fn fly_to(state: web::Data<AppState>, path: web::Path<u64>) -> impl Responder {
    match fly_or_fetch(&state.supplier, &state.intents, path.into_inner()).await {
        Ok(flown) => HttpResponse::Ok().json(flown),
        Err(e) => e.to_response(),
    }
}

/// Look up an address and show its constellation.
#[get("/address/{address}/")]
pub async fn show_address(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let address = path.into_inner().trim().to_string();
    if address.is_empty() {
        return HttpResponse::BadRequest().body("address required");
    }
    match lookup_address(&state.supplier, &state.intents, address).await {
        Ok(found) => HttpResponse::Ok().json(found),
        Err(e) => e.to_response(),
    }
}

/// Ask the frame loop to fly to `height`. When the scene lacks it, fetch
/// height → hash → block, add the star and fly there. Nothing is queued
/// after a failed fetch.
pub async fn fly_or_fetch<S: DataSupplier>(
    supplier: &S,
    intents: &UnboundedSender<Intent>,
    height: u64,
) -> Result<FlyResponse, NavigationError> {
    let (reply, known) = oneshot::channel();
    intents
        .send(Intent::FlyTo { height, reply })
        .map_err(|_| NavigationError::FrameLoopGone)?;
    if known.await.map_err(|_| NavigationError::FrameLoopGone)? {
        return Ok(FlyResponse {
            height,
            source: "scene",
        });
    }
    debug!("FLY - block #{height} not in scene, fetching");

    let block = fetch_block_by_height(supplier, height).await?;
    info!("FLY - fetched block #{height} ({} sampled txs)", block.tx_list.len());

    let (reply, flew) = oneshot::channel();
    intents
        .send(Intent::AddBlock {
            block,
            fly: true,
            reply: Some(reply),
        })
        .map_err(|_| NavigationError::FrameLoopGone)?;
    flew.await.map_err(|_| NavigationError::FrameLoopGone)?;
    Ok(FlyResponse {
        height,
        source: "fetched",
    })
}

/// Fetch address stats and queue the constellation. A failed lookup leaves
/// the current constellation alone.
pub async fn lookup_address<S: DataSupplier>(
    supplier: &S,
    intents: &UnboundedSender<Intent>,
    address: String,
) -> Result<AddressResponse, NavigationError> {
    let stats = supplier.fetch_address_info(&address).await?;
    let found = AddressResponse {
        address: address.clone(),
        funded_btc: stats.funded_btc(),
        spent_btc: stats.spent_btc(),
        tx_count: stats.chain_stats.tx_count,
    };
    intents
        .send(Intent::ShowAddress { address, stats })
        .map_err(|_| NavigationError::FrameLoopGone)?;
    Ok(found)
}
