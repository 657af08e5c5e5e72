//! The command queue wrapper.

use std::fmt;
use std::sync::Arc;

use crate::driver::Handle;
use crate::error::Result;
use crate::standard::{Context, Device};
use crate::types::{Kind, QueueInfo, QueueProperties};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_command_queue`.
///
/// Holds its context and device as dependencies.
#[derive(Clone)]
pub struct Queue {
    obj: Arc<Obj>,
}

impl Queue {
    pub(crate) fn from_obj(obj: Arc<Obj>) -> Queue {
        Queue { obj }
    }

    pub fn new(context: &Context, device: &Device, properties: QueueProperties) -> Result<Queue> {
        let reg = context.registry().clone();
        let raw = reg.driver().create_queue(context.handle(), device.handle(), properties)?;
        let deps = vec![context.obj().clone(), device.obj().clone()];
        Ok(Queue { obj: reg.adopt(Kind::Queue, raw, deps, None)? })
    }

    /// The queue's context, from the held dependency when present and the
    /// native query otherwise.
    pub fn context(&self) -> Result<Context> {
        if let Some(obj) = self.obj.dep_of_kind(Kind::Context) {
            return Ok(Context::from_obj(obj));
        }
        let raw = self.info_scalar::<usize, _>(QueueInfo::Context)?;
        let obj = self.registry().adopt_retained(
            Kind::Context,
            Handle::from_raw(raw),
            Vec::new(),
            None,
        )?;
        Ok(Context::from_obj(obj))
    }

    pub fn device(&self) -> Result<Device> {
        if let Some(obj) = self.obj.dep_of_kind(Kind::Device) {
            return Ok(Device::from_obj(obj));
        }
        let raw = self.info_scalar::<usize, _>(QueueInfo::Device)?;
        let obj = self.registry().adopt_retained(
            Kind::Device,
            Handle::from_raw(raw),
            Vec::new(),
            None,
        )?;
        Ok(Device::from_obj(obj))
    }

    pub fn properties(&self) -> Result<QueueProperties> {
        let bits = self.info_scalar::<u64, _>(QueueInfo::Properties)?;
        Ok(QueueProperties::from_bits_truncate(bits))
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(QueueInfo::ReferenceCount)
    }

    /// Submits any buffered commands without waiting for them.
    pub fn flush(&self) -> Result<()> {
        self.registry().driver().flush(self.handle())
    }

    /// Blocks until every command submitted to the queue has completed.
    pub fn finish(&self) -> Result<()> {
        self.registry().driver().finish(self.handle())
    }
}

impl Wrapper for Queue {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Queue")
            .field("handle", &self.handle())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
