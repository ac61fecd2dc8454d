//! # Example: Channels and Lineage
//!
//! - Two panels listen to `Status` on different tokens.
//! - An auditor subscribes to `MessageBase` with derived delivery and sees every
//!   library message, whatever its concrete type.
//! - A notification with a callback lets the recipient answer the sender.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use weakbus::messages::{GenericMessage, MessageBase, NotificationWithCallback};
use weakbus::{Bus, BusError, Handler, Token};

struct Status(&'static str);

struct Panel {
    name: &'static str,
}

struct Auditor;

weakbus::routable!(Status, Panel, Auditor);

fn main() -> Result<(), BusError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bus = Bus::new();

    let left = Arc::new(Panel { name: "left" });
    let right = Arc::new(Panel { name: "right" });
    let on_status = Handler::new("on_status", |p: &Panel, s: &Status| {
        println!("[{}] status: {}", p.name, s.0);
    });
    bus.register(&left, Some(Token::from("left")), false, on_status.clone())?;
    bus.subscribe(&right).token("right").handle(on_status)?;

    bus.send_with_token(&Status("saving"), "left")?;
    bus.send_with_token(&Status("idle"), "right")?;
    println!("[main] untokenized send reached {}", bus.send(&Status("lost"))?);

    let auditor = Arc::new(Auditor);
    bus.subscribe(&auditor)
        .derived()
        .handle(Handler::new("audit", |_: &Auditor, m: &MessageBase| {
            println!("[audit] message from {}", m.sender().unwrap_or("?"));
        }))?;
    bus.subscribe(&auditor)
        .derived()
        .handle(Handler::new(
            "confirm",
            |_: &Auditor, m: &NotificationWithCallback<bool>| {
                println!("[audit] asked: {}", m.notification().notification());
                m.execute(true);
            },
        ))?;

    bus.send(&GenericMessage::new(42u32).with_base(MessageBase::from_sender("counter")))?;

    let confirmed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&confirmed);
    let ask = NotificationWithCallback::new("overwrite file?", move |yes: bool| {
        flag.store(yes, Ordering::SeqCst);
    })
    .with_base(MessageBase::from_sender("editor"));
    bus.send(&ask)?;
    println!("[main] confirmed = {}", confirmed.load(Ordering::SeqCst));

    Ok(())
}
