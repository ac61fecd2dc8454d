//! # Example: Idle Worker
//!
//! Deferred cleanup runs on a dedicated background task. Recipients come and go;
//! the worker sweeps dead subscriptions while the main task keeps sending.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use weakbus::{Bus, BusConfig, FaultPolicy, Handler, IdleWorker};

struct Tick(u64);

struct Listener {
    id: usize,
}

weakbus::routable!(Tick, Listener);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "weakbus=debug".into()))
        .init();

    let worker = Arc::new(IdleWorker::spawn());
    let cfg = BusConfig {
        fault_policy: FaultPolicy::Isolate,
        ..BusConfig::named("ticker")
    };
    let bus = Bus::builder(cfg).with_scheduler(Arc::clone(&worker)).build();

    let mut listeners = Vec::new();
    for id in 0..4 {
        let listener = Arc::new(Listener { id });
        bus.register(
            &listener,
            None,
            false,
            Handler::new("on_tick", |l: &Listener, t: &Tick| {
                if l.id == 3 && t.0 == 1 {
                    panic!("listener 3 chokes on tick 1");
                }
                println!("[listener {}] tick {}", l.id, t.0);
            }),
        )?;
        listeners.push(listener);
    }

    for tick in 0..4u64 {
        let n = bus.send(&Tick(tick))?;
        println!("[main] tick {tick} reached {n} listener(s)");
        listeners.pop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        println!("[main] stats = {:?}", bus.stats());
    }

    worker.shutdown().await;
    Ok(())
}
