#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use weakbus::{Bus, BusConfig, FaultPolicy, Lineage, ManualIdle, Routable};

/// Recipient that records what it saw.
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, what: impl Into<String>) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(what.into());
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Routable for Recorder {}

#[derive(Debug)]
pub struct Foo {
    pub val: i32,
}

impl Routable for Foo {}

#[derive(Debug)]
pub struct Base {
    pub id: u32,
}

impl Routable for Base {}

#[derive(Debug)]
pub struct Derived {
    pub base: Base,
}

impl Routable for Derived {
    fn lineage(lineage: &mut Lineage<Self>) {
        lineage.is_a::<Base>(|d| &d.base);
    }
}

/// Bus whose cleanup passes only run when the test pumps `idle`.
pub fn manual_bus(policy: FaultPolicy) -> (Bus, Arc<ManualIdle>) {
    let idle = Arc::new(ManualIdle::new());
    let cfg = BusConfig {
        fault_policy: policy,
        ..BusConfig::named("test")
    };
    let bus = Bus::builder(cfg).with_scheduler(Arc::clone(&idle)).build();
    (bus, idle)
}
