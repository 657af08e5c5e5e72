//! The image wrapper and its mapping guard.
//!
//! Images are byte-addressed here: element size follows the image format,
//! and origins/regions are given in elements per axis. Transfers between
//! images and typed buffers go through the untyped byte view.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::error;

use crate::error::{Error, Result};
use crate::standard::{Buffer, Context, Event, EventList, Queue};
use crate::types::{
    ClPrm, ImageDescriptor, ImageFormat, ImageInfo, Kind, MapFlags, MemFlags, MemInfo,
};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_mem` image.
#[derive(Debug, Clone)]
pub struct Image {
    obj: Arc<Obj>,
    format: ImageFormat,
    desc: ImageDescriptor,
}

impl Image {
    /// Creates an image, optionally initialized from tightly packed host
    /// pixel data covering the whole image.
    pub fn new(
        context: &Context,
        flags: MemFlags,
        format: ImageFormat,
        desc: ImageDescriptor,
        host_data: Option<&[u8]>,
    ) -> Result<Image> {
        desc.validate()?;
        let mut flags = flags;
        if let Some(data) = host_data {
            if data.len() != desc.required_bytes(&format) {
                return Err(Error::Args("host data size does not match image dimensions"));
            }
            if !flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR) {
                flags |= MemFlags::COPY_HOST_PTR;
            }
        }
        let reg = context.registry().clone();
        let raw = reg.driver().create_image(context.handle(), flags, format, desc, host_data)?;
        let origin = Some(Arc::downgrade(context.obj()));
        let obj = reg.adopt(Kind::Image, raw, Vec::new(), origin)?;
        Ok(Image { obj, format, desc })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.desc
    }

    /// Bytes per element (pixel).
    pub fn element_size(&self) -> usize {
        self.format.pixel_bytes()
    }

    /// The full-image region, for whole-image transfers.
    pub fn whole_region(&self) -> [usize; 3] {
        self.desc.dims()
    }

    pub fn context(&self) -> Option<Context> {
        self.obj.origin().map(Context::from_obj)
    }

    fn region_bytes(&self, region: [usize; 3]) -> usize {
        region[0] * region[1] * region[2] * self.element_size()
    }

    // -- Native info queries (cached except where mutable). ------------

    pub fn native_format(&self) -> Result<ImageFormat> {
        let raws = self.info_vec::<u32, _>(ImageInfo::Format)?;
        if raws.len() != 2 {
            return Err(Error::InvalidData(format!(
                "image format query returned {} words",
                raws.len()
            )));
        }
        ImageFormat::from_raw(raws[0], raws[1])
    }

    pub fn native_element_size(&self) -> Result<usize> {
        self.info_scalar(ImageInfo::ElementSize)
    }

    pub fn row_pitch(&self) -> Result<usize> {
        self.info_scalar(ImageInfo::RowPitch)
    }

    pub fn slice_pitch(&self) -> Result<usize> {
        self.info_scalar(ImageInfo::SlicePitch)
    }

    pub fn width(&self) -> Result<usize> {
        self.info_scalar(ImageInfo::Width)
    }

    pub fn height(&self) -> Result<usize> {
        self.info_scalar(ImageInfo::Height)
    }

    pub fn depth(&self) -> Result<usize> {
        self.info_scalar(ImageInfo::Depth)
    }

    /// Outstanding native mappings. Never cached.
    pub fn map_count(&self) -> Result<u32> {
        self.info_scalar(MemInfo::MapCount)
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(MemInfo::ReferenceCount)
    }

    // -- Transfers. ----------------------------------------------------

    /// Blocking read of a region into tightly packed host memory.
    pub fn read(
        &self,
        queue: &Queue,
        origin: [usize; 3],
        region: [usize; 3],
        dst: &mut [u8],
        wait: &EventList,
    ) -> Result<Event> {
        if dst.len() < self.region_bytes(region) {
            return Err(Error::Args("destination slice too small for image region"));
        }
        let raw = self.registry().driver().enqueue_read_image(
            queue.handle(),
            self.handle(),
            origin,
            region,
            dst,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Blocking write of tightly packed host memory into a region.
    pub fn write(
        &self,
        queue: &Queue,
        origin: [usize; 3],
        region: [usize; 3],
        src: &[u8],
        wait: &EventList,
    ) -> Result<Event> {
        if src.len() < self.region_bytes(region) {
            return Err(Error::Args("source slice too small for image region"));
        }
        let raw = self.registry().driver().enqueue_write_image(
            queue.handle(),
            self.handle(),
            origin,
            region,
            src,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Device-side copy of a region into another image.
    pub fn copy_to(
        &self,
        queue: &Queue,
        dst: &Image,
        src_origin: [usize; 3],
        dst_origin: [usize; 3],
        region: [usize; 3],
        wait: &EventList,
    ) -> Result<Event> {
        let raw = self.registry().driver().enqueue_copy_image(
            queue.handle(),
            self.handle(),
            dst.handle(),
            src_origin,
            dst_origin,
            region,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Fills a region with one element value, given as pixel bytes.
    pub fn fill(
        &self,
        queue: &Queue,
        pixel: &[u8],
        origin: [usize; 3],
        region: [usize; 3],
        wait: &EventList,
    ) -> Result<Event> {
        if pixel.len() != self.element_size() {
            return Err(Error::Args("fill value size does not match element size"));
        }
        let raw = self.registry().driver().enqueue_fill_image(
            queue.handle(),
            self.handle(),
            pixel,
            origin,
            region,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Copies a region into a buffer at a byte offset.
    pub fn copy_to_buffer<T: ClPrm>(
        &self,
        queue: &Queue,
        dst: &Buffer<T>,
        origin: [usize; 3],
        region: [usize; 3],
        dst_offset_bytes: usize,
        wait: &EventList,
    ) -> Result<Event> {
        if dst_offset_bytes + self.region_bytes(region) > dst.size_bytes() {
            return Err(Error::Args("image region exceeds destination buffer size"));
        }
        let raw = self.registry().driver().enqueue_copy_image_to_buffer(
            queue.handle(),
            self.handle(),
            dst.handle(),
            origin,
            region,
            dst_offset_bytes,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Copies buffer bytes into an image region.
    pub fn copy_from_buffer<T: ClPrm>(
        &self,
        queue: &Queue,
        src: &Buffer<T>,
        src_offset_bytes: usize,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &EventList,
    ) -> Result<Event> {
        if src_offset_bytes + self.region_bytes(region) > src.size_bytes() {
            return Err(Error::Args("image region exceeds source buffer size"));
        }
        let raw = self.registry().driver().enqueue_copy_buffer_to_image(
            queue.handle(),
            src.handle(),
            self.handle(),
            src_offset_bytes,
            origin,
            region,
            &wait.handles(),
        )?;
        Event::adopt(queue, raw)
    }

    /// Maps a region into host memory.
    pub fn map(
        &self,
        queue: &Queue,
        flags: MapFlags,
        origin: [usize; 3],
        region: [usize; 3],
    ) -> Result<ImageMap> {
        let (data, row_pitch) = self.registry().driver().map_image(
            queue.handle(),
            self.handle(),
            flags,
            origin,
            region,
        )?;
        Ok(ImageMap {
            data,
            row_pitch,
            mem: self.obj.clone(),
            queue: queue.clone(),
            origin,
            region,
            flags,
            unmapped: false,
        })
    }
}

impl Wrapper for Image {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

/// A mapped image region, tightly packed row by row.
#[derive(Debug)]
pub struct ImageMap {
    data: Vec<u8>,
    row_pitch: usize,
    mem: Arc<Obj>,
    queue: Queue,
    origin: [usize; 3],
    region: [usize; 3],
    flags: MapFlags,
    unmapped: bool,
}

impl ImageMap {
    /// Bytes per mapped row.
    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    pub fn unmap(mut self) -> Result<()> {
        self.unmap_inner()
    }

    fn unmap_inner(&mut self) -> Result<()> {
        if self.unmapped {
            return Ok(());
        }
        self.unmapped = true;
        self.mem.registry().driver().unmap_image(
            self.queue.handle(),
            self.mem.handle(),
            self.origin,
            self.region,
            &self.data,
            self.flags.writes_back(),
        )
    }
}

impl Deref for ImageMap {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ImageMap {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for ImageMap {
    fn drop(&mut self) {
        if let Err(err) = self.unmap_inner() {
            error!("unmap failed for {:?}: {}", self.mem.handle(), err);
        }
    }
}
