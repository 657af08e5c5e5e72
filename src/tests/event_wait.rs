//! Events and wait lists.

use crate::tests::{env, sim_registry};
use crate::{Buffer, CommandExecutionStatus, EventList, MemFlags, Wrapper};

#[test]
fn enqueue_returns_a_completed_event() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 8).unwrap();
    let event = buf.write(&e.queue, 0, &[1, 2, 3, 4, 5, 6, 7, 8], &wait).unwrap();

    assert_eq!(event.status().unwrap(), CommandExecutionStatus::Complete);
    event.wait().unwrap();
    assert_eq!(event.queue().unwrap().handle(), e.queue.handle());
}

#[test]
fn wait_list_feeds_the_next_command() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let none = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 4).unwrap();
    let w1 = buf.write(&e.queue, 0, &[1, 2, 3, 4], &none).unwrap();
    let w2 = buf.fill(&e.queue, 9, 0, 2, &EventList::from(w1)).unwrap();

    let mut wait = EventList::new();
    wait.push(w2);
    assert_eq!(wait.len(), 1);

    let mut host = [0u32; 4];
    buf.read(&e.queue, 0, &mut host, &wait).unwrap();
    assert_eq!(host, [9, 9, 3, 4]);
}

#[test]
fn event_list_collects_and_waits() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let none = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 16).unwrap();
    let events: EventList = (0..4)
        .map(|i| buf.fill(&e.queue, i, (i as usize) * 4, 4, &none).unwrap())
        .collect();
    assert_eq!(events.len(), 4);
    events.wait().unwrap();
    assert!(events[0].is_complete().unwrap());
}

#[test]
fn empty_wait_list_wait_is_a_no_op() {
    let (_reg, _driver) = sim_registry();
    let list = EventList::new();
    assert!(list.is_empty());
    list.wait().unwrap();
}

#[test]
fn queue_flush_and_finish() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    e.queue.flush().unwrap();
    e.queue.finish().unwrap();
}

#[test]
fn event_keeps_queue_alive() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let none = EventList::new();

    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 4).unwrap();
    let event = buf.write(&e.queue, 0, &[0; 4], &none).unwrap();

    let queue_handle = e.queue.handle();
    drop(e.queue);
    assert!(reg.get(queue_handle).is_some());
    assert_eq!(event.queue().unwrap().handle(), queue_handle);
}
