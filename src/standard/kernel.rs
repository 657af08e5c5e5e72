//! The kernel wrapper and argument binding.

use std::sync::Arc;

use crate::driver::ArgVal;
use crate::error::Result;
use crate::standard::{Buffer, Event, EventList, Image, Program, Queue};
use crate::types::{ClPrm, KernelInfo, Kind};
use crate::util;
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_kernel`. Holds its program as a dependency.
#[derive(Debug, Clone)]
pub struct Kernel {
    obj: Arc<Obj>,
}

impl Kernel {
    /// Creates a kernel for a named entry point of a built program.
    pub fn new(program: &Program, name: &str) -> Result<Kernel> {
        let reg = program.registry().clone();
        let raw = reg.driver().create_kernel(program.handle(), name)?;
        let deps = vec![program.obj().clone()];
        Ok(Kernel { obj: reg.adopt(Kind::Kernel, raw, deps, None)? })
    }

    pub fn set_arg_buffer<T: ClPrm>(&self, index: u32, buffer: &Buffer<T>) -> Result<()> {
        self.registry()
            .driver()
            .set_kernel_arg(self.handle(), index, ArgVal::Mem(buffer.handle()))
    }

    pub fn set_arg_image(&self, index: u32, image: &Image) -> Result<()> {
        self.registry()
            .driver()
            .set_kernel_arg(self.handle(), index, ArgVal::Mem(image.handle()))
    }

    pub fn set_arg_scalar<T: ClPrm>(&self, index: u32, value: T) -> Result<()> {
        let value = [value];
        self.registry().driver().set_kernel_arg(
            self.handle(),
            index,
            ArgVal::Scalar(util::as_bytes(&value)),
        )
    }

    /// Reserves device-local scratch space for an argument slot.
    pub fn set_arg_local(&self, index: u32, size_bytes: usize) -> Result<()> {
        self.registry()
            .driver()
            .set_kernel_arg(self.handle(), index, ArgVal::Local(size_bytes))
    }

    /// Launches over a global work size. Unused trailing dimensions are
    /// given as zero.
    pub fn enqueue(
        &self,
        queue: &Queue,
        global_work_size: [usize; 3],
        wait: &EventList,
    ) -> Result<Event> {
        let raw = self.registry().driver().enqueue_kernel(
            queue.handle(),
            self.handle(),
            global_work_size,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    pub fn function_name(&self) -> Result<String> {
        self.info_string(KernelInfo::FunctionName)
    }

    pub fn num_args(&self) -> Result<u32> {
        self.info_scalar(KernelInfo::NumArgs)
    }

    pub fn program(&self) -> Option<Program> {
        self.obj.dep_of_kind(Kind::Program).map(Program::from_obj)
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(KernelInfo::ReferenceCount)
    }
}

impl Wrapper for Kernel {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}
