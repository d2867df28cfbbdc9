//! Long-running tasks: the frame loop that owns the engine, and the two
//! pollers feeding it. They talk only through the intent channel and the
//! published snapshot.

use log::{debug, info, warn};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, MissedTickBehavior};

use crate::engine::intent::dispatch;
use crate::engine::{Engine, Intent, StateSnapshot};
use crate::feed::{DataSupplier, poll_new_blocks};
use crate::scene::Renderer;

pub type SharedSnapshot = Arc<RwLock<StateSnapshot>>;

pub fn publish(snapshot: &SharedSnapshot, state: StateSnapshot) {
    *snapshot.write().expect("rwlock poisoned") = state;
}

fn read<T>(snapshot: &SharedSnapshot, f: impl FnOnce(&StateSnapshot) -> T) -> T {
    f(&snapshot.read().expect("rwlock poisoned"))
}

/// One frame: apply queued intents, advance, draw. Returns false once every
/// sender is gone.
pub fn run_frame<R: Renderer>(
    engine: &mut Engine,
    renderer: &mut R,
    intents: &mut UnboundedReceiver<Intent>,
    now_ms: f64,
) -> bool {
    let open = loop {
        match intents.try_recv() {
            Ok(intent) => dispatch(engine, intent),
            Err(TryRecvError::Empty) => break true,
            Err(TryRecvError::Disconnected) => break false,
        }
    };
    engine.tick(now_ms);
    renderer.render(engine.scene(), engine.camera(), engine.effective_pixel_ratio());
    open
}

/// The render loop. Owns the engine for the life of the process.
pub async fn run_frame_loop<R: Renderer>(
    mut engine: Engine,
    mut renderer: R,
    mut intents: UnboundedReceiver<Intent>,
    snapshot: SharedSnapshot,
    frame: Duration,
) {
    let started = Instant::now();
    let mut ticker = time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("FRAME - loop started ({} ms per frame)", frame.as_millis());

    loop {
        ticker.tick().await;
        let now_ms = started.elapsed().as_secs_f64() * 1_000.0;
        let open = run_frame(&mut engine, &mut renderer, &mut intents, now_ms);
        publish(&snapshot, engine.state());
        if !open {
            info!("FRAME - intent channel closed, stopping");
            return;
        }
    }
}

/// One realtime cycle. Returns false once the frame loop is gone.
pub async fn realtime_cycle<S: DataSupplier>(
    supplier: &S,
    intents: &UnboundedSender<Intent>,
    snapshot: &SharedSnapshot,
) -> bool {
    let frontier = read(snapshot, |s| s.frontier);
    match poll_new_blocks(supplier, frontier).await {
        Ok(blocks) if blocks.is_empty() => true,
        Ok(blocks) => {
            debug!("POLL - queueing {} block(s)", blocks.len());
            intents.send(Intent::IngestBatch(blocks)).is_ok()
        }
        Err(e) => {
            warn!("POLL - realtime cycle skipped: {e}");
            !intents.is_closed()
        }
    }
}

pub async fn run_realtime_poller<S: DataSupplier>(
    supplier: S,
    intents: UnboundedSender<Intent>,
    snapshot: SharedSnapshot,
    every: Duration,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the initial load already covered it.
    ticker.tick().await;
    info!("POLL - realtime every {} ms", every.as_millis());

    loop {
        ticker.tick().await;
        if !realtime_cycle(&supplier, &intents, &snapshot).await {
            info!("POLL - realtime poller stopping");
            return;
        }
    }
}

/// One mempool cycle; does nothing while comets are hidden.
pub async fn mempool_cycle<S: DataSupplier>(
    supplier: &S,
    intents: &UnboundedSender<Intent>,
    snapshot: &SharedSnapshot,
    limit: usize,
) -> bool {
    let enabled = read(snapshot, |s| s.visual.as_ref().is_some_and(|v| v.show_comets));
    if !enabled || limit == 0 {
        return !intents.is_closed();
    }
    match supplier.fetch_recent_mempool_txs(limit).await {
        Ok(txs) if txs.is_empty() => true,
        Ok(txs) => intents.send(Intent::SpawnComets(txs)).is_ok(),
        Err(e) => {
            debug!("POLL - mempool cycle skipped: {e}");
            !intents.is_closed()
        }
    }
}

pub async fn run_mempool_poller<S: DataSupplier>(
    supplier: S,
    intents: UnboundedSender<Intent>,
    snapshot: SharedSnapshot,
    every: Duration,
    limit: usize,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("POLL - mempool every {} ms (up to {limit} txs)", every.as_millis());

    loop {
        ticker.tick().await;
        if !mempool_cycle(&supplier, &intents, &snapshot, limit).await {
            info!("POLL - mempool poller stopping");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SharedSnapshot, mempool_cycle, publish, realtime_cycle, run_frame};
    use crate::engine::tests::engine_with;
    use crate::engine::{Engine, Intent};
    use crate::feed::mock::MockSupplier;
    use crate::feed::{BlockRecord, TxRecord};
    use crate::scene::{Camera, Renderer, Scene};
    use std::sync::{Arc, RwLock};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        last_nodes: usize,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, scene: &Scene, _camera: &Camera, _pixel_ratio: f64) {
            self.frames += 1;
            self.last_nodes = scene.len();
        }
    }

    fn shared(engine: &Engine) -> SharedSnapshot {
        Arc::new(RwLock::new(engine.state()))
    }

    #[test]
    fn frame_applies_intents_before_rendering() {
        let mut engine = engine_with(&[100]);
        let mut renderer = CountingRenderer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Intent::IngestBatch(vec![BlockRecord::sample(101, 0.1, "x")]))
            .expect("open");

        assert!(run_frame(&mut engine, &mut renderer, &mut rx, 16.0));
        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.last_nodes, 3);

        drop(tx);
        assert!(!run_frame(&mut engine, &mut renderer, &mut rx, 32.0));
    }

    #[actix_web::test]
    async fn realtime_cycle_queues_only_blocks_above_published_frontier() {
        let engine = engine_with(&[100]);
        let snapshot = shared(&engine);
        let mock = MockSupplier::with_recent(vec![
            BlockRecord::sample(102, 0.1, "x"),
            BlockRecord::sample(100, 0.1, "x"),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(realtime_cycle(&mock, &tx, &snapshot).await);
        match rx.try_recv() {
            Ok(Intent::IngestBatch(blocks)) => {
                assert_eq!(blocks.iter().map(|b| b.height).collect::<Vec<_>>(), vec![102]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn failed_poll_sends_nothing() {
        let engine = engine_with(&[100]);
        let snapshot = shared(&engine);
        let mut mock = MockSupplier::with_recent(vec![BlockRecord::sample(102, 0.1, "x")]);
        mock.fail_recent = true;
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(realtime_cycle(&mock, &tx, &snapshot).await);
        assert!(rx.try_recv().is_err());
        drop(rx);
        assert!(!realtime_cycle(&mock, &tx, &snapshot).await);
    }

    #[actix_web::test]
    async fn mempool_cycle_respects_comet_toggle() {
        let mut engine = engine_with(&[100]);
        let snapshot = shared(&engine);
        let mut mock = MockSupplier::default();
        mock.mempool = (0..4)
            .map(|i| TxRecord {
                txid: format!("m{i}"),
                ..Default::default()
            })
            .collect();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(mempool_cycle(&mock, &tx, &snapshot, 3).await);
        assert!(matches!(rx.try_recv(), Ok(Intent::SpawnComets(txs)) if txs.len() == 3));

        engine.set_show_comets(false);
        publish(&snapshot, engine.state());
        assert!(mempool_cycle(&mock, &tx, &snapshot, 3).await);
        assert!(rx.try_recv().is_err());
        assert_eq!(mock.calls.borrow().len(), 1);
    }
}
