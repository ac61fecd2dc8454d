mod common;

use std::panic::{self, AssertUnwindSafe};

use common::{manual_bus, Foo, Recorder};
use weakbus::{FaultPolicy, Handler};

fn boom() -> Handler<Recorder, Foo> {
    Handler::new("boom", |_: &Recorder, m: &Foo| {
        if m.val < 0 {
            panic!("negative value {}", m.val);
        }
    })
}

fn record() -> Handler<Recorder, Foo> {
    Handler::new("record", |r: &Recorder, m: &Foo| r.push(m.val.to_string()))
}

#[test]
fn test_isolate_policy_contains_panics() {
    let (bus, _idle) = manual_bus(FaultPolicy::Isolate);
    assert!(bus.config().isolates_faults());
    let a = Recorder::new();
    let b = Recorder::new();
    bus.register(&a, None, false, boom()).unwrap();
    bus.register(&b, None, false, record()).unwrap();

    assert_eq!(bus.send(&Foo { val: -1 }).unwrap(), 1);
    assert_eq!(bus.send(&Foo { val: 2 }).unwrap(), 2);
    assert_eq!(b.seen(), vec!["-1", "2"]);
}

#[test]
fn test_propagate_policy_unwinds_and_stops_the_pass() {
    let (bus, _idle) = manual_bus(FaultPolicy::Propagate);
    let a = Recorder::new();
    let b = Recorder::new();
    bus.register(&a, None, false, boom()).unwrap();
    bus.register(&b, None, false, record()).unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| bus.send(&Foo { val: -1 })));
    assert!(outcome.is_err());
    assert!(b.seen().is_empty());

    // no lock was held across the handler, so the bus is still usable
    bus.unregister(&a);
    assert_eq!(bus.send(&Foo { val: -1 }).unwrap(), 1);
    assert_eq!(b.seen(), vec!["-1"]);
}

#[test]
fn test_cleanup_is_requested_when_a_send_unwinds() {
    let (bus, idle) = manual_bus(FaultPolicy::Propagate);
    let a = Recorder::new();
    let gone = Recorder::new();
    bus.register(&a, None, false, boom()).unwrap();
    bus.register(&gone, None, false, record()).unwrap();
    idle.run_pending();
    assert!(!bus.cleanup_pending());

    drop(gone);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| bus.send(&Foo { val: -1 })));
    assert!(outcome.is_err());
    assert!(bus.cleanup_pending());
    assert_eq!(idle.pending(), 1);

    idle.run_pending();
    assert!(!bus.cleanup_pending());
    assert_eq!(bus.stats().exact_entries, 1);
}
