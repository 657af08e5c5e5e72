//! Reference-counted wrappers over the OpenCL host API.
//!
//! Every native object family (platform, device, context, queue, buffer,
//! image, event, program, kernel) gets a typed wrapper around a shared
//! [`Obj`], so cloning a wrapper is reference counting and dropping the
//! last clone releases the native object. A [`Registry`] keeps at most
//! one wrapper object per native handle and tallies creates against
//! drops for end-of-run leak checks.
//!
//! The native API sits behind the [`Driver`] trait. The `opencl` cargo
//! feature enables [`ClDriver`] over an installed runtime; [`SimDriver`],
//! an in-memory simulation, is always available and backs the test suite.
//!
//! ```
//! use std::sync::Arc;
//! use oclw::{Buffer, Context, MemFlags, Queue, QueueProperties, Registry, SimDriver};
//!
//! # fn main() -> oclw::Result<()> {
//! let reg = Registry::new(Arc::new(SimDriver::new()));
//! let context = Context::builder(&reg).build()?;
//! let device = context.devices()?.remove(0);
//! let queue = Queue::new(&context, &device, QueueProperties::empty())?;
//!
//! let buf = Buffer::<u32>::with_data(&context, MemFlags::READ_WRITE, &[1, 2, 3, 4])?;
//! let mut host = [0u32; 4];
//! buf.read(&queue, 0, &mut host, &Default::default())?;
//! assert_eq!(host, [1, 2, 3, 4]);
//! # Ok(())
//! # }
//! ```

pub mod driver;
mod error;
mod registry;
pub mod standard;
pub mod types;
pub mod util;
mod wrap;

#[cfg(test)]
mod tests;

pub use crate::driver::{ArgVal, Driver, Handle, SimDriver};
#[cfg(feature = "opencl")]
pub use crate::driver::ClDriver;
pub use crate::error::{eval_errcode, ApiError, Error, Result, Status};
pub use crate::registry::Registry;
pub use crate::standard::{
    Buffer, Context, ContextBuilder, Device, DeviceSpecifier, Event, EventList, Image, ImageMap,
    Kernel, MemMap, Platform, Program, Queue,
};
pub use crate::types::{
    ClPrm, CommandExecutionStatus, ContextInfo, DeviceInfo, DeviceType, EventInfo,
    ImageChannelDataType, ImageChannelOrder, ImageDescriptor, ImageFormat, ImageInfo, InfoQuery,
    KernelInfo, Kind, MapFlags, MemFlags, MemInfo, MemObjectType, PlatformInfo, ProgramInfo,
    QueueInfo, QueueProperties,
};
pub use crate::wrap::{Obj, Wrapper};
