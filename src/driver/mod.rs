//! The native API boundary.
//!
//! Every wrapper in this crate reaches the OpenCL host API through the
//! [`Driver`] trait: enumeration, creation, retain/release, the closed
//! info-query dispatch and the enqueue family. Two implementations ship
//! with the crate:
//!
//! * [`ClDriver`] (cargo feature `opencl`): thin safe wrappers over the
//!   `cl-sys` entry points.
//! * [`SimDriver`]: an in-memory simulation of a single platform, used by
//!   the test suite and by downstream code that wants to exercise wrapper
//!   lifetimes without an installed OpenCL runtime.

use std::fmt;

use crate::error::Result;
use crate::types::{
    CommandExecutionStatus, DeviceType, ImageDescriptor, ImageFormat, InfoQuery, Kind, MapFlags,
    MemFlags, QueueProperties,
};

#[cfg(feature = "opencl")]
mod cl;
mod sim;

#[cfg(feature = "opencl")]
pub use self::cl::ClDriver;
pub use self::sim::SimDriver;

/// An opaque native handle.
///
/// Identity is by value equality of the underlying native identifier, never
/// by wrapper identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    pub fn from_raw(raw: usize) -> Handle {
        Handle(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }

    pub fn null() -> Handle {
        Handle(0)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

/// A kernel argument value at binding time.
#[derive(Debug, Clone, Copy)]
pub enum ArgVal<'a> {
    /// A memory object (buffer or image) handle.
    Mem(Handle),
    /// A scalar passed by value, as raw bytes.
    Scalar(&'a [u8]),
    /// Device-local scratch space of the given byte size.
    Local(usize),
}

/// The native OpenCL host API, as consumed by the wrapper layer.
///
/// All operations are synchronous from the caller's perspective; enqueue
/// operations hand back an event [`Handle`] representing the completion
/// point of the submitted command. Implementations must be safe for
/// concurrent use from multiple threads.
pub trait Driver: fmt::Debug + Send + Sync {
    // -- Enumeration. --------------------------------------------------

    fn platform_ids(&self) -> Result<Vec<Handle>>;

    fn device_ids(&self, platform: Handle, devtype: DeviceType) -> Result<Vec<Handle>>;

    // -- Lifetime. -----------------------------------------------------

    /// Increments the native reference count. A no-op for platforms and
    /// (root) devices, which the native API does not reference count.
    fn retain(&self, kind: Kind, handle: Handle) -> Result<()>;

    /// Decrements the native reference count. This may or may not be the
    /// final native release; the native object can still be referenced
    /// elsewhere. A no-op for platforms and root devices.
    fn release(&self, kind: Kind, handle: Handle) -> Result<()>;

    // -- Creation. -----------------------------------------------------

    fn create_context(&self, devices: &[Handle]) -> Result<Handle>;

    fn create_queue(
        &self,
        context: Handle,
        device: Handle,
        properties: QueueProperties,
    ) -> Result<Handle>;

    fn create_buffer(
        &self,
        context: Handle,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Handle>;

    fn create_image(
        &self,
        context: Handle,
        flags: MemFlags,
        format: ImageFormat,
        desc: ImageDescriptor,
        host_data: Option<&[u8]>,
    ) -> Result<Handle>;

    fn create_program_with_source(&self, context: Handle, sources: &[&str]) -> Result<Handle>;

    /// Builds a program for the given devices. Failure carries the build
    /// log as `Error::ProgramBuild`.
    fn build_program(&self, program: Handle, devices: &[Handle], options: &str) -> Result<()>;

    fn create_kernel(&self, program: Handle, name: &str) -> Result<Handle>;

    // -- Information queries. ------------------------------------------

    /// Issues the native query matching `query`'s family and returns the
    /// raw value bytes, sized as the native API reported them. An empty
    /// result means the attribute is legitimately absent.
    fn info(&self, query: InfoQuery, handle: Handle) -> Result<Box<[u8]>>;

    // -- Kernel binding and launch. ------------------------------------

    fn set_kernel_arg(&self, kernel: Handle, index: u32, arg: ArgVal) -> Result<()>;

    fn enqueue_kernel(
        &self,
        queue: Handle,
        kernel: Handle,
        global_work_size: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle>;

    // -- Buffer commands. ----------------------------------------------

    fn enqueue_read_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        dst: &mut [u8],
        wait: &[Handle],
    ) -> Result<Handle>;

    fn enqueue_write_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        src: &[u8],
        wait: &[Handle],
    ) -> Result<Handle>;

    fn enqueue_copy_buffer(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
        wait: &[Handle],
    ) -> Result<Handle>;

    /// Fills `len` bytes at `offset` with repetitions of `pattern`.
    fn enqueue_fill_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        pattern: &[u8],
        offset: usize,
        len: usize,
        wait: &[Handle],
    ) -> Result<Handle>;

    // -- Image commands (origins/regions in elements). -----------------

    fn enqueue_read_image(
        &self,
        queue: Handle,
        mem: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        dst: &mut [u8],
        wait: &[Handle],
    ) -> Result<Handle>;

    fn enqueue_write_image(
        &self,
        queue: Handle,
        mem: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        src: &[u8],
        wait: &[Handle],
    ) -> Result<Handle>;

    fn enqueue_copy_image(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_origin: [usize; 3],
        dst_origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle>;

    /// Fills a region with a single element value, given as pixel bytes.
    fn enqueue_fill_image(
        &self,
        queue: Handle,
        mem: Handle,
        pixel: &[u8],
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle>;

    fn enqueue_copy_image_to_buffer(
        &self,
        queue: Handle,
        src_image: Handle,
        dst_buffer: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        dst_offset: usize,
        wait: &[Handle],
    ) -> Result<Handle>;

    fn enqueue_copy_buffer_to_image(
        &self,
        queue: Handle,
        src_buffer: Handle,
        dst_image: Handle,
        src_offset: usize,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle>;

    // -- Mapping. ------------------------------------------------------
    //
    // Mapping in this layer is copy-based: `map_*` returns an owned host
    // snapshot of the region whose content equals the native resource's
    // content at map time; `unmap_*` writes modifications back when the
    // mapping was created for writing and always balances the native map
    // count.

    fn map_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        flags: MapFlags,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>>;

    fn unmap_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        data: &[u8],
        write_back: bool,
    ) -> Result<()>;

    /// Maps an image region; returns the host snapshot and its row pitch in
    /// bytes.
    fn map_image(
        &self,
        queue: Handle,
        mem: Handle,
        flags: MapFlags,
        origin: [usize; 3],
        region: [usize; 3],
    ) -> Result<(Vec<u8>, usize)>;

    fn unmap_image(
        &self,
        queue: Handle,
        mem: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        data: &[u8],
        write_back: bool,
    ) -> Result<()>;

    // -- Queue and event control. --------------------------------------

    fn flush(&self, queue: Handle) -> Result<()>;

    fn finish(&self, queue: Handle) -> Result<()>;

    /// Blocks the calling thread until every listed event is complete.
    fn wait_for_events(&self, events: &[Handle]) -> Result<()>;

    fn event_status(&self, event: Handle) -> Result<CommandExecutionStatus>;
}
