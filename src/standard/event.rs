//! Event wrappers and wait lists.

use std::sync::Arc;

use crate::driver::Handle;
use crate::error::Result;
use crate::standard::Queue;
use crate::types::{CommandExecutionStatus, EventInfo, Kind};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_event`, marking the completion point of an enqueued
/// command. Holds its queue as a dependency.
#[derive(Debug, Clone)]
pub struct Event {
    obj: Arc<Obj>,
}

impl Event {
    pub(crate) fn from_obj(obj: Arc<Obj>) -> Event {
        Event { obj }
    }

    /// Wraps the event handle an enqueue operation returned, transferring
    /// its native reference.
    pub(crate) fn adopt(queue: &Queue, raw: Handle) -> Result<Event> {
        let reg = queue.registry().clone();
        let obj = reg.adopt(Kind::Event, raw, vec![queue.obj().clone()], None)?;
        Ok(Event::from_obj(obj))
    }

    /// Blocks until the command this event marks has completed.
    pub fn wait(&self) -> Result<()> {
        self.registry().driver().wait_for_events(&[self.handle()])
    }

    /// Execution status, always read from the native API.
    pub fn status(&self) -> Result<CommandExecutionStatus> {
        self.registry().driver().event_status(self.handle())
    }

    pub fn is_complete(&self) -> Result<bool> {
        Ok(self.status()? == CommandExecutionStatus::Complete)
    }

    pub fn queue(&self) -> Option<Queue> {
        self.obj.dep_of_kind(Kind::Queue).map(Queue::from_obj)
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(EventInfo::ReferenceCount)
    }
}

impl Wrapper for Event {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

/// An ordered list of events for use as an enqueue wait list.
#[derive(Debug, Clone, Default)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    pub fn new() -> EventList {
        EventList { events: Vec::new() }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub(crate) fn handles(&self) -> Vec<Handle> {
        self.events.iter().map(|e| e.handle()).collect()
    }

    /// Blocks until every listed event is complete. A no-op when empty.
    pub fn wait(&self) -> Result<()> {
        match self.events.first() {
            Some(first) => {
                first.registry().driver().wait_for_events(&self.handles())
            }
            None => Ok(()),
        }
    }
}

impl From<Event> for EventList {
    fn from(event: Event) -> EventList {
        EventList { events: vec![event] }
    }
}

impl std::iter::FromIterator<Event> for EventList {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> EventList {
        EventList { events: iter.into_iter().collect() }
    }
}

impl std::ops::Index<usize> for EventList {
    type Output = Event;

    fn index(&self, index: usize) -> &Event {
        &self.events[index]
    }
}
