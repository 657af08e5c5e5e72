//! Wrapper reference counting: cloning shares, dropping releases.

use crate::tests::{env, sim_registry};
use crate::{Buffer, MemFlags, Wrapper};

#[test]
fn clone_increments_and_drop_decrements() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    assert_eq!(e.context.ref_count(), 2); // held here and by the queue
    let c2 = e.context.clone();
    assert_eq!(e.context.ref_count(), 3);
    let c3 = c2.clone();
    assert_eq!(e.context.ref_count(), 4);
    drop(c3);
    assert_eq!(e.context.ref_count(), 3);
    drop(c2);
    assert_eq!(e.context.ref_count(), 2);
}

#[test]
fn queue_keeps_context_alive() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let context_handle = e.context.handle();

    drop(e.context);

    // The queue still owns the context through its dependency edge.
    let via_queue = e.queue.context().unwrap();
    assert_eq!(via_queue.handle(), context_handle);
    assert!(reg.get(context_handle).is_some());
}

#[test]
fn dependent_drop_releases_dependencies() {
    let (reg, driver) = sim_registry();
    let e = env(&reg);
    let context_handle = e.context.handle();

    drop(e.context);
    assert!(reg.get(context_handle).is_some());

    // The queue's drop tears down its held context and device wrappers
    // along with its own native object.
    drop(e.queue);
    assert!(reg.get(context_handle).is_none());
    assert_eq!(driver.object_count(), 0);
}

#[test]
fn last_drop_releases_native_object() {
    let (reg, driver) = sim_registry();
    let e = env(&reg);

    let before = driver.object_count();
    {
        let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 64).unwrap();
        assert_eq!(driver.object_count(), before + 1);
        let buf2 = buf.clone();
        assert_eq!(buf2.ref_count(), 2);
        drop(buf);
        // A live clone holds the native reference.
        assert_eq!(driver.object_count(), before + 1);
    }
    assert_eq!(driver.object_count(), before);
}

#[test]
fn native_count_stays_one_across_clones() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let buf = Buffer::<f32>::new(&e.context, MemFlags::READ_WRITE, 16).unwrap();
    let buf2 = buf.clone();
    // Host-side sharing never touches the native count; the wrapper owns
    // exactly one native reference.
    assert_eq!(buf.reference_count().unwrap(), 1);
    assert_eq!(buf2.ref_count(), 2);
}
