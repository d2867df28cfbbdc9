mod api;
mod config;
mod diagnostics;
mod engine;
mod feed;
mod runtime;
mod scene;
mod universe;

use actix_web::{App, HttpServer, rt, web};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use api::AppState;
use config::Config;
use engine::Engine;
use feed::{MempoolSpace, fetch_latest_blocks};
use scene::LogRenderer;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    let supplier = MempoolSpace::new(&config.api_base_url).map_err(std::io::Error::other)?;

    let mut engine = Engine::new(config.engine());
    match fetch_latest_blocks(&supplier).await {
        Ok(blocks) => engine.init_scene(blocks),
        Err(e) => {
            warn!("INIT - recent blocks unavailable, starting with genesis only: {e}");
            engine.init_scene(Vec::new());
        }
    }

    let snapshot = Arc::new(RwLock::new(engine.state()));
    let (intents, inbox) = mpsc::unbounded_channel();

    rt::spawn(runtime::run_frame_loop(
        engine,
        LogRenderer::default(),
        inbox,
        snapshot.clone(),
        config.frame_interval(),
    ));
    rt::spawn(runtime::run_realtime_poller(
        supplier.clone(),
        intents.clone(),
        snapshot.clone(),
        config.realtime_interval(),
    ));
    rt::spawn(runtime::run_mempool_poller(
        supplier.clone(),
        intents.clone(),
        snapshot.clone(),
        config.mempool_interval(),
        config.max_comets,
    ));

    let state = web::Data::new(AppState {
        intents,
        snapshot,
        supplier,
    });

    let (host, port) = (config.host.clone(), config.port);
    info!("🌌 Starting block universe at http://{host}:{port} (explorer {})", config.api_base_url);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
