//! Buffer transfers: read, write, copy, fill and mapping.

use rand::distributions::Standard;
use rand::{self, Rng};

use crate::tests::{env, sim_registry};
use crate::{Buffer, EventList, MapFlags, MemFlags, Wrapper};

const LEN: usize = 1 << 10;

fn random_vec(len: usize) -> Vec<u32> {
    rand::thread_rng().sample_iter(Standard).take(len).collect()
}

#[test]
fn write_then_read_roundtrip() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let data = random_vec(LEN);
    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, LEN).unwrap();
    buf.write(&e.queue, 0, &data, &wait).unwrap();

    let mut host = vec![0u32; LEN];
    buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    assert_eq!(host, data);
}

#[test]
fn with_data_initializes_contents() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let data = random_vec(LEN);
    let buf = Buffer::<u32>::with_data(&e.context, MemFlags::READ_ONLY, &data).unwrap();
    assert_eq!(buf.len(), LEN);
    assert_eq!(buf.native_size().unwrap(), LEN * 4);

    let mut host = vec![0u32; LEN];
    buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    assert_eq!(host, data);
}

#[test]
fn copy_with_offsets() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let data = random_vec(LEN);
    let src = Buffer::<u32>::with_data(&e.context, MemFlags::READ_WRITE, &data).unwrap();
    let dst = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, LEN).unwrap();

    let half = LEN / 2;
    src.copy_to(&e.queue, &dst, half, 0, half, &wait).unwrap();

    let mut host = vec![0u32; half];
    dst.read(&e.queue, 0, &mut host, &wait).unwrap();
    assert_eq!(&host[..], &data[half..]);

    let mut untouched = vec![0u32; half];
    dst.read(&e.queue, half, &mut untouched, &wait).unwrap();
    assert!(untouched.iter().all(|&v| v == 0));
}

#[test]
fn fill_a_span() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 16).unwrap();
    buf.fill(&e.queue, 0xDEAD_BEEF, 4, 8, &wait).unwrap();

    let mut host = vec![0u32; 16];
    buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    for (i, &v) in host.iter().enumerate() {
        if (4..12).contains(&i) {
            assert_eq!(v, 0xDEAD_BEEF);
        } else {
            assert_eq!(v, 0);
        }
    }
}

#[test]
fn map_for_reading() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let data = random_vec(64);
    let buf = Buffer::<u32>::with_data(&e.context, MemFlags::READ_WRITE, &data).unwrap();

    let map = buf.map(&e.queue, MapFlags::READ, 16, 32).unwrap();
    assert_eq!(buf.map_count().unwrap(), 1);
    assert_eq!(&map[..], &data[16..48]);
    map.unmap().unwrap();
    assert_eq!(buf.map_count().unwrap(), 0);
}

#[test]
fn map_for_writing_writes_back() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 8).unwrap();
    {
        let mut map = buf.map(&e.queue, MapFlags::WRITE, 0, 8).unwrap();
        for (i, v) in map.iter_mut().enumerate() {
            *v = i as u32;
        }
        // Dropped here; write-back happens on the implicit unmap.
    }
    let mut host = vec![0u32; 8];
    buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    assert_eq!(host, (0..8).collect::<Vec<u32>>());
}

#[test]
fn read_only_map_does_not_write_back() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let data = random_vec(8);
    let buf = Buffer::<u32>::with_data(&e.context, MemFlags::READ_WRITE, &data).unwrap();
    {
        let mut map = buf.map(&e.queue, MapFlags::READ, 0, 8).unwrap();
        for v in map.iter_mut() {
            *v = 0;
        }
    }
    let mut host = vec![0u32; 8];
    buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    assert_eq!(host, data);
}

#[test]
fn zero_length_buffer_is_rejected() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let err = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 0).unwrap_err();
    assert!(err.is_args());
}

#[test]
fn out_of_range_read_is_rejected() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 8).unwrap();
    let mut host = vec![0u32; 8];
    let err = buf.read(&e.queue, 4, &mut host, &wait).unwrap_err();
    assert!(err.is_args());
}

#[test]
fn overflowing_offset_is_rejected() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 8).unwrap();
    let mut host = vec![0u32; 8];
    // An offset near usize::MAX must not wrap the span check around.
    let err = buf.read(&e.queue, usize::MAX - 4, &mut host, &wait).unwrap_err();
    assert!(err.is_args());
}

#[test]
fn buffer_context_back_reference_is_non_owning() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 8).unwrap();
    assert_eq!(buf.context().unwrap().handle(), e.context.handle());

    drop(e.queue);
    drop(e.context);
    // The buffer does not keep the context wrapper alive.
    assert!(buf.context().is_none());
}
