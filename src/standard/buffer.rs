//! The typed buffer wrapper and its mapping guard.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::error;

use crate::error::{Error, Result};
use crate::standard::{Context, Event, EventList, Queue};
use crate::types::{ClPrm, Kind, MapFlags, MemFlags, MemInfo};
use crate::util;
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_mem` buffer holding `len` elements of `T`.
///
/// The element type fixes how offsets and lengths scale to bytes; the
/// native object itself is untyped. The wrapper keeps a non-owning back
/// reference to its context.
#[derive(Debug, Clone)]
pub struct Buffer<T: ClPrm> {
    obj: Arc<Obj>,
    len: usize,
    _pd: PhantomData<T>,
}

impl<T: ClPrm> Buffer<T> {
    /// A zero-initialized device buffer of `len` elements.
    pub fn new(context: &Context, flags: MemFlags, len: usize) -> Result<Buffer<T>> {
        Buffer::create(context, flags, len, None)
    }

    /// A buffer initialized from a host slice.
    pub fn with_data(context: &Context, flags: MemFlags, data: &[T]) -> Result<Buffer<T>> {
        Buffer::create(
            context,
            flags | MemFlags::COPY_HOST_PTR,
            data.len(),
            Some(util::as_bytes(data)),
        )
    }

    fn create(
        context: &Context,
        flags: MemFlags,
        len: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Buffer<T>> {
        if len == 0 {
            return Err(Error::Args("buffer length must be non-zero"));
        }
        let reg = context.registry().clone();
        let size = len * std::mem::size_of::<T>();
        let raw = reg.driver().create_buffer(context.handle(), flags, size, host_data)?;
        let origin = Some(Arc::downgrade(context.obj()));
        let obj = reg.adopt(Kind::Buffer, raw, Vec::new(), origin)?;
        Ok(Buffer { obj, len, _pd: PhantomData })
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total byte size, as the wrapper sees it.
    pub fn size_bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// The creating context, if its wrapper is still alive. The back
    /// reference is non-owning, so this can be `None` after the context
    /// wrapper is dropped.
    pub fn context(&self) -> Option<Context> {
        self.obj.origin().map(Context::from_obj)
    }

    /// Byte size as the native API reports it. Cached.
    pub fn native_size(&self) -> Result<usize> {
        self.info_scalar(MemInfo::Size)
    }

    pub fn mem_flags(&self) -> Result<MemFlags> {
        let bits = self.info_scalar::<u64, _>(MemInfo::Flags)?;
        Ok(MemFlags::from_bits_truncate(bits))
    }

    /// Outstanding native mappings. Never cached.
    pub fn map_count(&self) -> Result<u32> {
        self.info_scalar(MemInfo::MapCount)
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(MemInfo::ReferenceCount)
    }

    fn check_span(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::Args("buffer span exceeds buffer length")),
        }
    }

    /// Blocking read of `dst.len()` elements starting at `offset`.
    pub fn read(
        &self,
        queue: &Queue,
        offset: usize,
        dst: &mut [T],
        wait: &EventList,
    ) -> Result<Event> {
        self.check_span(offset, dst.len())?;
        let raw = self.registry().driver().enqueue_read_buffer(
            queue.handle(),
            self.handle(),
            offset * std::mem::size_of::<T>(),
            util::as_bytes_mut(dst),
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Blocking write of `src` starting at `offset`.
    pub fn write(
        &self,
        queue: &Queue,
        offset: usize,
        src: &[T],
        wait: &EventList,
    ) -> Result<Event> {
        self.check_span(offset, src.len())?;
        let raw = self.registry().driver().enqueue_write_buffer(
            queue.handle(),
            self.handle(),
            offset * std::mem::size_of::<T>(),
            util::as_bytes(src),
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Device-side copy of `len` elements into another buffer.
    pub fn copy_to(
        &self,
        queue: &Queue,
        dst: &Buffer<T>,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
        wait: &EventList,
    ) -> Result<Event> {
        self.check_span(src_offset, len)?;
        dst.check_span(dst_offset, len)?;
        let elem = std::mem::size_of::<T>();
        let raw = self.registry().driver().enqueue_copy_buffer(
            queue.handle(),
            self.handle(),
            dst.handle(),
            src_offset * elem,
            dst_offset * elem,
            len * elem,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Fills `len` elements starting at `offset` with `value`.
    pub fn fill(
        &self,
        queue: &Queue,
        value: T,
        offset: usize,
        len: usize,
        wait: &EventList,
    ) -> Result<Event> {
        self.check_span(offset, len)?;
        let pattern = [value];
        let elem = std::mem::size_of::<T>();
        let raw = self.registry().driver().enqueue_fill_buffer(
            queue.handle(),
            self.handle(),
            util::as_bytes(&pattern),
            offset * elem,
            len * elem,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Maps `len` elements starting at `offset` into host memory.
    ///
    /// The returned guard dereferences to the mapped elements and writes
    /// modifications back on unmap when `flags` include a write mode.
    pub fn map(
        &self,
        queue: &Queue,
        flags: MapFlags,
        offset: usize,
        len: usize,
    ) -> Result<MemMap<T>> {
        self.check_span(offset, len)?;
        let elem = std::mem::size_of::<T>();
        let bytes = self.registry().driver().map_buffer(
            queue.handle(),
            self.handle(),
            flags,
            offset * elem,
            len * elem,
        )?;
        Ok(MemMap {
            data: util::vec_from_transfer(bytes)?,
            mem: self.obj.clone(),
            queue: queue.clone(),
            offset_bytes: offset * elem,
            flags,
            unmapped: false,
        })
    }
}

impl<T: ClPrm> Wrapper for Buffer<T> {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

/// A mapped buffer region.
///
/// Unmaps on drop; explicit [`unmap`] surfaces any write-back error
/// instead of logging it.
///
/// [`unmap`]: MemMap::unmap
#[derive(Debug)]
pub struct MemMap<T: ClPrm> {
    data: Vec<T>,
    mem: Arc<Obj>,
    queue: Queue,
    offset_bytes: usize,
    flags: MapFlags,
    unmapped: bool,
}

impl<T: ClPrm> MemMap<T> {
    pub fn unmap(mut self) -> Result<()> {
        self.unmap_inner()
    }

    fn unmap_inner(&mut self) -> Result<()> {
        if self.unmapped {
            return Ok(());
        }
        self.unmapped = true;
        self.mem.registry().driver().unmap_buffer(
            self.queue.handle(),
            self.mem.handle(),
            self.offset_bytes,
            util::as_bytes(&self.data),
            self.flags.writes_back(),
        )
    }
}

impl<T: ClPrm> Deref for MemMap<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: ClPrm> DerefMut for MemMap<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: ClPrm> Drop for MemMap<T> {
    fn drop(&mut self) {
        if let Err(err) = self.unmap_inner() {
            error!("unmap failed for {:?}: {}", self.mem.handle(), err);
        }
    }
}
