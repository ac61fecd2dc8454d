mod common;

use common::{Foo, Recorder};
use weakbus::{global, Bus, BusConfig, Handler};

// One test owns the process-wide default so nothing races on it.
#[test]
fn test_default_bus_lifecycle() {
    global::reset();
    assert!(!global::is_initialized());

    let first = global::get();
    assert!(global::is_initialized());
    assert!(first.same_bus(&global::get()));
    assert_eq!(first.config().name, "global");

    let a = Recorder::new();
    first
        .register(&a, None, false, Handler::new("rec", |r: &Recorder, m: &Foo| r.push(m.val.to_string())))
        .unwrap();
    assert_eq!(global::get().send(&Foo { val: 3 }).unwrap(), 1);

    let custom = Bus::builder(BusConfig::named("custom")).build();
    let previous = global::override_default(custom.clone()).expect("a default existed");
    assert!(previous.same_bus(&first));
    assert!(global::get().same_bus(&custom));
    assert_eq!(global::get().send(&Foo { val: 4 }).unwrap(), 0);

    let removed = global::reset().expect("custom was installed");
    assert!(removed.same_bus(&custom));
    let fresh = global::get();
    assert!(!fresh.same_bus(&first));
    assert!(!fresh.same_bus(&custom));
    assert_eq!(a.seen(), vec!["3"]);
}
