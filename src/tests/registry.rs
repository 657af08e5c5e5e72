//! Registry identity and leak accounting.

use std::mem;
use std::sync::Arc;

use crate::tests::{env, sim_registry};
use crate::{Buffer, DeviceType, Handle, Kind, MemFlags, Platform, Wrapper};

#[test]
fn same_handle_wraps_to_same_object() {
    let (reg, _driver) = sim_registry();

    let p1 = Platform::first(&reg).unwrap();
    let p2 = Platform::first(&reg).unwrap();
    assert!(Arc::ptr_eq(p1.obj(), p2.obj()));

    let d1 = p1.devices(DeviceType::ALL).unwrap();
    let d2 = p2.devices(DeviceType::ALL).unwrap();
    for (a, b) in d1.iter().zip(d2.iter()) {
        assert!(Arc::ptr_eq(a.obj(), b.obj()));
    }
}

#[test]
fn queried_handles_resolve_through_registry() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    // The context's device list comes back from a native query, yet it
    // resolves to the very wrapper the context was built over.
    let queried = e.context.devices().unwrap();
    assert!(Arc::ptr_eq(queried[0].obj(), e.device.obj()));

    let looked_up = reg.get(e.context.handle()).unwrap();
    assert!(Arc::ptr_eq(&looked_up, e.context.obj()));
}

#[test]
fn dropped_wrapper_leaves_no_map_entry() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let handle = {
        let buf = Buffer::<u8>::new(&e.context, MemFlags::READ_WRITE, 8).unwrap();
        buf.handle()
    };
    assert!(reg.get(handle).is_none());
}

#[test]
fn null_handle_is_rejected() {
    let (reg, _driver) = sim_registry();
    let err = reg.adopt(Kind::Context, Handle::null(), Vec::new(), None).unwrap_err();
    assert!(err.is_args());
}

#[test]
fn memcheck_passes_when_everything_dropped() {
    let (reg, _driver) = sim_registry();
    {
        let e = env(&reg);
        let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 32).unwrap();
        let wait = Default::default();
        let mut host = vec![0u32; 32];
        buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    }
    assert!(reg.memcheck());
    assert_eq!(reg.created(), reg.dropped());
    assert_eq!(reg.live(), 0);
}

#[test]
fn registry_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<crate::Registry>();
    assert_send_sync::<crate::Context>();
    assert_send_sync::<Buffer<u32>>();
}

#[test]
fn concurrent_adoption_yields_one_wrapper() {
    use std::sync::Barrier;
    use std::thread;

    let (reg, _driver) = sim_registry();
    let handle = {
        let platform = Platform::first(&reg).unwrap();
        platform.devices(DeviceType::ALL).unwrap()[0].handle()
    };

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let joins: Vec<_> = (0..threads)
        .map(|_| {
            let reg = reg.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                crate::Device::from_raw(&reg, handle).unwrap()
            })
        })
        .collect();

    let devices: Vec<_> = joins.into_iter().map(|j| j.join().unwrap()).collect();
    for pair in devices.windows(2) {
        assert!(Arc::ptr_eq(pair[0].obj(), pair[1].obj()));
    }
    drop(devices);
    assert!(reg.memcheck());
}

#[test]
fn memcheck_flags_a_leak() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    mem::forget(e.context.clone());
    drop(e);
    assert!(!reg.memcheck());
    assert!(reg.created() > reg.dropped());
}
