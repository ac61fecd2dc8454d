//! # Example: Basic Messaging
//!
//! A screen subscribes to `Resize`; a sender broadcasts without knowing who listens.
//! Dropping the screen is enough to stop delivery.
//!
//! Run with `RUST_LOG=weakbus=debug cargo run --example basic_messaging`.

use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use weakbus::{Bus, BusError, Handler};

struct Resize {
    width: u32,
    height: u32,
}

struct Screen {
    size: Mutex<(u32, u32)>,
}

impl Screen {
    fn on_resize(&self, msg: &Resize) {
        println!("[screen] resized to {}x{}", msg.width, msg.height);
        if let Ok(mut size) = self.size.lock() {
            *size = (msg.width, msg.height);
        }
    }
}

weakbus::routable!(Resize, Screen);

fn main() -> Result<(), BusError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bus = Bus::new();
    let screen = Arc::new(Screen {
        size: Mutex::new((0, 0)),
    });
    bus.register(&screen, None, false, Handler::from_fn(Screen::on_resize))?;

    let n = bus.send(&Resize {
        width: 800,
        height: 600,
    })?;
    println!("[main] delivered to {n} handler(s)");

    drop(screen);
    let n = bus.send(&Resize {
        width: 1024,
        height: 768,
    })?;
    println!("[main] after drop: delivered to {n} handler(s), stats = {:?}", bus.stats());
    Ok(())
}
