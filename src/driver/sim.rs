//! An in-memory simulation of a single-platform OpenCL runtime.
//!
//! `SimDriver` implements the full [`Driver`] surface against process-local
//! state: buffers and images are plain byte vectors, every enqueued command
//! executes synchronously and completes its event immediately, and kernel
//! launches are recorded but compute nothing (kernel numeric behavior is
//! the native runtime's business, not this layer's). Info calls are
//! counted so cache behavior is observable from tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use log::trace;

use super::{ArgVal, Driver, Handle};
use crate::error::{ApiError, Error, Result, Status};
use crate::types::{
    CommandExecutionStatus, DeviceType, ImageDescriptor, ImageFormat, InfoQuery, Kind, MapFlags,
    MemFlags, QueueProperties,
};

const HANDLE_BASE: usize = 0x1000;
const HANDLE_STEP: usize = 0x10;

fn api(status: Status, fn_name: &'static str) -> Error {
    ApiError::new(status, fn_name).into()
}

fn enc_u32(v: u32) -> Box<[u8]> {
    Vec::from(&v.to_ne_bytes()[..]).into_boxed_slice()
}

fn enc_i32(v: i32) -> Box<[u8]> {
    Vec::from(&v.to_ne_bytes()[..]).into_boxed_slice()
}

fn enc_u64(v: u64) -> Box<[u8]> {
    Vec::from(&v.to_ne_bytes()[..]).into_boxed_slice()
}

fn enc_usize(v: usize) -> Box<[u8]> {
    Vec::from(&v.to_ne_bytes()[..]).into_boxed_slice()
}

fn enc_str(s: &str) -> Box<[u8]> {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    bytes.into_boxed_slice()
}

fn enc_handles(handles: &[Handle]) -> Box<[u8]> {
    let mut bytes = Vec::with_capacity(handles.len() * std::mem::size_of::<usize>());
    for h in handles {
        bytes.extend_from_slice(&h.as_raw().to_ne_bytes());
    }
    bytes.into_boxed_slice()
}

fn empty() -> Box<[u8]> {
    Vec::new().into_boxed_slice()
}

#[derive(Debug)]
struct SimDevice {
    handle: Handle,
    devtype: DeviceType,
    name: String,
}

#[derive(Debug, Clone, Copy)]
struct ImageMeta {
    format: ImageFormat,
    desc: ImageDescriptor,
}

impl ImageMeta {
    fn elem(&self) -> usize {
        self.format.pixel_bytes()
    }

    fn dims(&self) -> [usize; 3] {
        self.desc.dims()
    }

    fn check_region(
        &self,
        origin: [usize; 3],
        region: [usize; 3],
        fn_name: &'static str,
    ) -> Result<()> {
        let dims = self.dims();
        for i in 0..3 {
            if region[i] == 0 || origin[i] + region[i] > dims[i] {
                return Err(api(Status::CL_INVALID_VALUE, fn_name));
            }
        }
        Ok(())
    }

    /// Gathers a tightly packed host copy of a region.
    fn copy_out(
        &self,
        data: &[u8],
        origin: [usize; 3],
        region: [usize; 3],
        fn_name: &'static str,
    ) -> Result<Vec<u8>> {
        self.check_region(origin, region, fn_name)?;
        let elem = self.elem();
        let [w, h, _] = self.dims();
        let row = w * elem;
        let slice = row * h;
        let mut out = Vec::with_capacity(region[0] * region[1] * region[2] * elem);
        for z in 0..region[2] {
            for y in 0..region[1] {
                let off = (origin[2] + z) * slice + (origin[1] + y) * row + origin[0] * elem;
                out.extend_from_slice(&data[off..off + region[0] * elem]);
            }
        }
        Ok(out)
    }

    /// Scatters a tightly packed host region into image storage.
    fn copy_in(
        &self,
        data: &mut [u8],
        origin: [usize; 3],
        region: [usize; 3],
        src: &[u8],
        fn_name: &'static str,
    ) -> Result<()> {
        self.check_region(origin, region, fn_name)?;
        let elem = self.elem();
        if src.len() < region[0] * region[1] * region[2] * elem {
            return Err(api(Status::CL_INVALID_VALUE, fn_name));
        }
        let [w, h, _] = self.dims();
        let row = w * elem;
        let slice = row * h;
        let src_row = region[0] * elem;
        for z in 0..region[2] {
            for y in 0..region[1] {
                let dst_off = (origin[2] + z) * slice + (origin[1] + y) * row + origin[0] * elem;
                let src_off = (z * region[1] + y) * src_row;
                data[dst_off..dst_off + src_row]
                    .copy_from_slice(&src[src_off..src_off + src_row]);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum OwnedArg {
    Mem(Handle),
    Scalar(Vec<u8>),
    Local(usize),
}

#[derive(Debug)]
enum Body {
    Context {
        devices: Vec<Handle>,
    },
    Queue {
        context: Handle,
        device: Handle,
        properties: QueueProperties,
    },
    Mem {
        context: Handle,
        data: Vec<u8>,
        flags: MemFlags,
        image: Option<ImageMeta>,
        map_count: u32,
    },
    Program {
        context: Handle,
        source: String,
        built: bool,
    },
    Kernel {
        program: Handle,
        name: String,
        args: HashMap<u32, OwnedArg>,
    },
    Event {
        queue: Handle,
        status: CommandExecutionStatus,
    },
}

#[derive(Debug)]
struct SimObject {
    refs: u32,
    body: Body,
}

#[derive(Debug)]
struct SimState {
    next: usize,
    platform: Handle,
    devices: Vec<SimDevice>,
    objects: HashMap<Handle, SimObject>,
}

impl SimState {
    fn alloc(&mut self) -> Handle {
        let h = Handle::from_raw(self.next);
        self.next += HANDLE_STEP;
        h
    }

    fn insert(&mut self, body: Body) -> Handle {
        let h = self.alloc();
        self.objects.insert(h, SimObject { refs: 1, body });
        h
    }

    fn object(&self, handle: Handle, status: Status, fn_name: &'static str) -> Result<&SimObject> {
        self.objects.get(&handle).ok_or_else(|| api(status, fn_name))
    }

    fn context(&self, handle: Handle, fn_name: &'static str) -> Result<&Vec<Handle>> {
        match self.object(handle, Status::CL_INVALID_CONTEXT, fn_name)?.body {
            Body::Context { ref devices } => Ok(devices),
            _ => Err(api(Status::CL_INVALID_CONTEXT, fn_name)),
        }
    }

    fn queue(&self, handle: Handle, fn_name: &'static str) -> Result<()> {
        match self.object(handle, Status::CL_INVALID_COMMAND_QUEUE, fn_name)?.body {
            Body::Queue { .. } => Ok(()),
            _ => Err(api(Status::CL_INVALID_COMMAND_QUEUE, fn_name)),
        }
    }

    fn check_wait_list(&self, wait: &[Handle], fn_name: &'static str) -> Result<()> {
        for &ev in wait {
            match self.objects.get(&ev) {
                Some(SimObject { body: Body::Event { .. }, .. }) => {}
                _ => return Err(api(Status::CL_INVALID_EVENT_WAIT_LIST, fn_name)),
            }
        }
        Ok(())
    }

    fn complete_event(&mut self, queue: Handle) -> Handle {
        self.insert(Body::Event { queue, status: CommandExecutionStatus::Complete })
    }

    fn buffer_data(&self, handle: Handle, fn_name: &'static str) -> Result<&Vec<u8>> {
        match self.object(handle, Status::CL_INVALID_MEM_OBJECT, fn_name)?.body {
            Body::Mem { ref data, image: None, .. } => Ok(data),
            _ => Err(api(Status::CL_INVALID_MEM_OBJECT, fn_name)),
        }
    }

    fn buffer_data_mut(&mut self, handle: Handle, fn_name: &'static str) -> Result<&mut Vec<u8>> {
        match self.objects.get_mut(&handle) {
            Some(SimObject { body: Body::Mem { ref mut data, image: None, .. }, .. }) => Ok(data),
            _ => Err(api(Status::CL_INVALID_MEM_OBJECT, fn_name)),
        }
    }

    fn image(&self, handle: Handle, fn_name: &'static str) -> Result<(&Vec<u8>, ImageMeta)> {
        match self.object(handle, Status::CL_INVALID_MEM_OBJECT, fn_name)?.body {
            Body::Mem { ref data, image: Some(meta), .. } => Ok((data, meta)),
            _ => Err(api(Status::CL_INVALID_MEM_OBJECT, fn_name)),
        }
    }

    fn image_mut(
        &mut self,
        handle: Handle,
        fn_name: &'static str,
    ) -> Result<(&mut Vec<u8>, ImageMeta)> {
        match self.objects.get_mut(&handle) {
            Some(SimObject { body: Body::Mem { ref mut data, image: Some(meta), .. }, .. }) => {
                Ok((data, *meta))
            }
            _ => Err(api(Status::CL_INVALID_MEM_OBJECT, fn_name)),
        }
    }
}

/// A simulated driver exposing one platform with a configurable device
/// roster.
#[derive(Debug)]
pub struct SimDriver {
    state: Mutex<SimState>,
    info_calls: AtomicUsize,
}

impl SimDriver {
    /// One GPU and one CPU device.
    pub fn new() -> SimDriver {
        SimDriver::with_devices(&[DeviceType::GPU, DeviceType::CPU])
    }

    pub fn with_devices(devtypes: &[DeviceType]) -> SimDriver {
        let mut next = HANDLE_BASE;
        let platform = Handle::from_raw(next);
        next += HANDLE_STEP;
        let devices = devtypes
            .iter()
            .enumerate()
            .map(|(i, &devtype)| {
                let handle = Handle::from_raw(next);
                next += HANDLE_STEP;
                let label = if devtype.contains(DeviceType::GPU) { "gpu" } else { "cpu" };
                SimDevice { handle, devtype, name: format!("sim {} {}", label, i) }
            })
            .collect();

        SimDriver {
            state: Mutex::new(SimState { next, platform, devices, objects: HashMap::new() }),
            info_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `info` calls issued so far; lets tests verify that the
    /// wrapper cache suppresses repeat native queries.
    pub fn info_call_count(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    /// Number of live simulated native objects (excluding the fixed
    /// platform and device roster).
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<SimState> {
        self.state.lock().expect("sim driver state mutex poisoned")
    }

    fn device_info(&self, handle: Handle, query: crate::types::DeviceInfo) -> Result<Box<[u8]>> {
        use crate::types::DeviceInfo;

        let state = self.lock();
        let dev = state
            .devices
            .iter()
            .find(|d| d.handle == handle)
            .ok_or_else(|| api(Status::CL_INVALID_DEVICE, "clGetDeviceInfo"))?;
        Ok(match query {
            DeviceInfo::Type => enc_u64(dev.devtype.bits()),
            DeviceInfo::VendorId => enc_u32(0x51_3D),
            DeviceInfo::MaxComputeUnits => enc_u32(4),
            DeviceInfo::ImageSupport => enc_u32(1),
            DeviceInfo::Name => enc_str(&dev.name),
            DeviceInfo::Vendor => enc_str("oclw"),
            DeviceInfo::DriverVersion => enc_str("0.1"),
            DeviceInfo::Profile => enc_str("FULL_PROFILE"),
            DeviceInfo::Version => enc_str("OpenCL 1.2 oclw-sim"),
            DeviceInfo::Extensions => enc_str(""),
            DeviceInfo::Platform => enc_usize(state.platform.as_raw()),
        })
    }
}

impl Default for SimDriver {
    fn default() -> SimDriver {
        SimDriver::new()
    }
}

impl Driver for SimDriver {
    fn platform_ids(&self) -> Result<Vec<Handle>> {
        Ok(vec![self.lock().platform])
    }

    fn device_ids(&self, platform: Handle, devtype: DeviceType) -> Result<Vec<Handle>> {
        let state = self.lock();
        if platform != state.platform {
            return Err(api(Status::CL_INVALID_PLATFORM, "clGetDeviceIDs"));
        }
        let ids: Vec<Handle> = state
            .devices
            .iter()
            .filter(|d| devtype.intersects(d.devtype))
            .map(|d| d.handle)
            .collect();
        if ids.is_empty() {
            return Err(api(Status::CL_DEVICE_NOT_FOUND, "clGetDeviceIDs"));
        }
        Ok(ids)
    }

    fn retain(&self, kind: Kind, handle: Handle) -> Result<()> {
        match kind {
            Kind::Platform | Kind::Device => Ok(()),
            _ => {
                let mut state = self.lock();
                match state.objects.get_mut(&handle) {
                    Some(obj) => {
                        obj.refs += 1;
                        Ok(())
                    }
                    None => Err(api(Status::CL_INVALID_VALUE, "clRetain")),
                }
            }
        }
    }

    fn release(&self, kind: Kind, handle: Handle) -> Result<()> {
        match kind {
            Kind::Platform | Kind::Device => Ok(()),
            _ => {
                let mut state = self.lock();
                let remove = match state.objects.get_mut(&handle) {
                    Some(obj) => {
                        obj.refs -= 1;
                        obj.refs == 0
                    }
                    None => return Err(api(Status::CL_INVALID_VALUE, "clRelease")),
                };
                if remove {
                    state.objects.remove(&handle);
                    trace!("sim: released {:?} {:?}", kind, handle);
                }
                Ok(())
            }
        }
    }

    fn create_context(&self, devices: &[Handle]) -> Result<Handle> {
        let mut state = self.lock();
        if devices.is_empty() {
            return Err(api(Status::CL_INVALID_VALUE, "clCreateContext"));
        }
        for dev in devices {
            if !state.devices.iter().any(|d| d.handle == *dev) {
                return Err(api(Status::CL_INVALID_DEVICE, "clCreateContext"));
            }
        }
        Ok(state.insert(Body::Context { devices: devices.to_vec() }))
    }

    fn create_queue(
        &self,
        context: Handle,
        device: Handle,
        properties: QueueProperties,
    ) -> Result<Handle> {
        let mut state = self.lock();
        let members = state.context(context, "clCreateCommandQueue")?;
        if !members.contains(&device) {
            return Err(api(Status::CL_INVALID_DEVICE, "clCreateCommandQueue"));
        }
        Ok(state.insert(Body::Queue { context, device, properties }))
    }

    fn create_buffer(
        &self,
        context: Handle,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.context(context, "clCreateBuffer")?;
        if size == 0 {
            return Err(api(Status::CL_INVALID_BUFFER_SIZE, "clCreateBuffer"));
        }
        let data = match host_data {
            Some(src) => {
                if !flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR)
                    || src.len() != size
                {
                    return Err(api(Status::CL_INVALID_HOST_PTR, "clCreateBuffer"));
                }
                src.to_vec()
            }
            None => {
                if flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR) {
                    return Err(api(Status::CL_INVALID_HOST_PTR, "clCreateBuffer"));
                }
                vec![0u8; size]
            }
        };
        Ok(state.insert(Body::Mem { context, data, flags, image: None, map_count: 0 }))
    }

    fn create_image(
        &self,
        context: Handle,
        flags: MemFlags,
        format: ImageFormat,
        desc: ImageDescriptor,
        host_data: Option<&[u8]>,
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.context(context, "clCreateImage")?;
        let meta = ImageMeta { format, desc };
        let size = desc.required_bytes(&format);
        if size == 0 {
            return Err(api(Status::CL_INVALID_IMAGE_DESCRIPTOR, "clCreateImage"));
        }
        let data = match host_data {
            Some(src) => {
                if !flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR)
                    || src.len() != size
                {
                    return Err(api(Status::CL_INVALID_HOST_PTR, "clCreateImage"));
                }
                src.to_vec()
            }
            None => {
                if flags.intersects(MemFlags::COPY_HOST_PTR | MemFlags::USE_HOST_PTR) {
                    return Err(api(Status::CL_INVALID_HOST_PTR, "clCreateImage"));
                }
                vec![0u8; size]
            }
        };
        Ok(state.insert(Body::Mem { context, data, flags, image: Some(meta), map_count: 0 }))
    }

    fn create_program_with_source(&self, context: Handle, sources: &[&str]) -> Result<Handle> {
        let mut state = self.lock();
        state.context(context, "clCreateProgramWithSource")?;
        if sources.is_empty() {
            return Err(api(Status::CL_INVALID_VALUE, "clCreateProgramWithSource"));
        }
        let source = sources.join("\n");
        Ok(state.insert(Body::Program { context, source, built: false }))
    }

    fn build_program(&self, program: Handle, devices: &[Handle], _options: &str) -> Result<()> {
        let mut state = self.lock();
        for dev in devices {
            if !state.devices.iter().any(|d| d.handle == *dev) {
                return Err(api(Status::CL_INVALID_DEVICE, "clBuildProgram"));
            }
        }
        match state.objects.get_mut(&program) {
            Some(SimObject { body: Body::Program { ref source, ref mut built, .. }, .. }) => {
                // The simulation fails any source carrying a preprocessor
                // `#error`, mirroring a real compile failure with a log.
                if let Some(line) = source.lines().find(|l| l.trim_start().starts_with("#error")) {
                    return Err(Error::ProgramBuild(line.trim().to_string()));
                }
                *built = true;
                Ok(())
            }
            _ => Err(api(Status::CL_INVALID_PROGRAM, "clBuildProgram")),
        }
    }

    fn create_kernel(&self, program: Handle, name: &str) -> Result<Handle> {
        let mut state = self.lock();
        let names = match state.object(program, Status::CL_INVALID_PROGRAM, "clCreateKernel")?.body {
            Body::Program { ref source, built, .. } => {
                if !built {
                    return Err(api(Status::CL_INVALID_PROGRAM_EXECUTABLE, "clCreateKernel"));
                }
                kernel_names(source)
            }
            _ => return Err(api(Status::CL_INVALID_PROGRAM, "clCreateKernel")),
        };
        if !names.iter().any(|n| n == name) {
            return Err(api(Status::CL_INVALID_KERNEL_NAME, "clCreateKernel"));
        }
        Ok(state.insert(Body::Kernel {
            program,
            name: name.to_string(),
            args: HashMap::new(),
        }))
    }

    fn info(&self, query: InfoQuery, handle: Handle) -> Result<Box<[u8]>> {
        use crate::types::{
            ContextInfo, EventInfo, ImageInfo, KernelInfo, MemInfo, PlatformInfo, ProgramInfo,
            QueueInfo,
        };

        self.info_calls.fetch_add(1, Ordering::SeqCst);

        match query {
            InfoQuery::Platform(q) => {
                let state = self.lock();
                if handle != state.platform {
                    return Err(api(Status::CL_INVALID_PLATFORM, "clGetPlatformInfo"));
                }
                Ok(match q {
                    PlatformInfo::Profile => enc_str("FULL_PROFILE"),
                    PlatformInfo::Version => enc_str("OpenCL 1.2 oclw-sim"),
                    PlatformInfo::Name => enc_str("oclw simulated platform"),
                    PlatformInfo::Vendor => enc_str("oclw"),
                    PlatformInfo::Extensions => enc_str(""),
                })
            }
            InfoQuery::Device(q) => self.device_info(handle, q),
            InfoQuery::Context(q) => {
                let state = self.lock();
                let obj = state.object(handle, Status::CL_INVALID_CONTEXT, "clGetContextInfo")?;
                match obj.body {
                    Body::Context { ref devices } => Ok(match q {
                        ContextInfo::ReferenceCount => enc_u32(obj.refs),
                        ContextInfo::Devices => enc_handles(devices),
                        ContextInfo::Properties => empty(),
                        ContextInfo::NumDevices => enc_u32(devices.len() as u32),
                    }),
                    _ => Err(api(Status::CL_INVALID_CONTEXT, "clGetContextInfo")),
                }
            }
            InfoQuery::Queue(q) => {
                let state = self.lock();
                let obj =
                    state.object(handle, Status::CL_INVALID_COMMAND_QUEUE, "clGetCommandQueueInfo")?;
                match obj.body {
                    Body::Queue { context, device, properties } => Ok(match q {
                        QueueInfo::Context => enc_usize(context.as_raw()),
                        QueueInfo::Device => enc_usize(device.as_raw()),
                        QueueInfo::ReferenceCount => enc_u32(obj.refs),
                        QueueInfo::Properties => enc_u64(properties.bits()),
                    }),
                    _ => Err(api(Status::CL_INVALID_COMMAND_QUEUE, "clGetCommandQueueInfo")),
                }
            }
            InfoQuery::Mem(q) => {
                let state = self.lock();
                let obj = state.object(handle, Status::CL_INVALID_MEM_OBJECT, "clGetMemObjectInfo")?;
                match obj.body {
                    Body::Mem { context, ref data, flags, ref image, map_count } => Ok(match q {
                        MemInfo::Type => enc_u32(match image {
                            Some(meta) => meta.desc.image_type as u32,
                            None => 0x10F0, // CL_MEM_OBJECT_BUFFER
                        }),
                        MemInfo::Flags => enc_u64(flags.bits()),
                        MemInfo::Size => enc_usize(data.len()),
                        MemInfo::HostPtr => empty(),
                        MemInfo::MapCount => enc_u32(map_count),
                        MemInfo::ReferenceCount => enc_u32(obj.refs),
                        MemInfo::Context => enc_usize(context.as_raw()),
                        MemInfo::AssociatedMemObject => empty(),
                        MemInfo::Offset => enc_usize(0),
                    }),
                    _ => Err(api(Status::CL_INVALID_MEM_OBJECT, "clGetMemObjectInfo")),
                }
            }
            InfoQuery::Image(q) => {
                let state = self.lock();
                let (_, meta) = state.image(handle, "clGetImageInfo")?;
                let elem = meta.elem();
                Ok(match q {
                    ImageInfo::Format => {
                        let mut bytes = Vec::with_capacity(8);
                        bytes.extend_from_slice(&(meta.format.channel_order as u32).to_ne_bytes());
                        bytes.extend_from_slice(
                            &(meta.format.channel_data_type as u32).to_ne_bytes(),
                        );
                        bytes.into_boxed_slice()
                    }
                    ImageInfo::ElementSize => enc_usize(elem),
                    ImageInfo::RowPitch => enc_usize(meta.desc.width * elem),
                    ImageInfo::SlicePitch => enc_usize(if meta.desc.depth > 1 {
                        meta.desc.width * meta.desc.height.max(1) * elem
                    } else {
                        0
                    }),
                    ImageInfo::Width => enc_usize(meta.desc.width),
                    ImageInfo::Height => enc_usize(meta.desc.height),
                    ImageInfo::Depth => enc_usize(meta.desc.depth),
                })
            }
            InfoQuery::Event(q) => {
                let state = self.lock();
                let obj = state.object(handle, Status::CL_INVALID_EVENT, "clGetEventInfo")?;
                match obj.body {
                    Body::Event { queue, status } => Ok(match q {
                        EventInfo::CommandQueue => enc_usize(queue.as_raw()),
                        EventInfo::CommandType => empty(),
                        EventInfo::ReferenceCount => enc_u32(obj.refs),
                        EventInfo::CommandExecutionStatus => enc_i32(status as i32),
                        EventInfo::Context => empty(),
                    }),
                    _ => Err(api(Status::CL_INVALID_EVENT, "clGetEventInfo")),
                }
            }
            InfoQuery::Program(q) => {
                let state = self.lock();
                let obj = state.object(handle, Status::CL_INVALID_PROGRAM, "clGetProgramInfo")?;
                match obj.body {
                    Body::Program { context, ref source, .. } => Ok(match q {
                        ProgramInfo::ReferenceCount => enc_u32(obj.refs),
                        ProgramInfo::Context => enc_usize(context.as_raw()),
                        ProgramInfo::NumDevices => {
                            enc_u32(state.context(context, "clGetProgramInfo")?.len() as u32)
                        }
                        ProgramInfo::Devices => {
                            enc_handles(state.context(context, "clGetProgramInfo")?)
                        }
                        ProgramInfo::Source => enc_str(source),
                    }),
                    _ => Err(api(Status::CL_INVALID_PROGRAM, "clGetProgramInfo")),
                }
            }
            InfoQuery::Kernel(q) => {
                let state = self.lock();
                let obj = state.object(handle, Status::CL_INVALID_KERNEL, "clGetKernelInfo")?;
                match obj.body {
                    Body::Kernel { program, ref name, ref args } => Ok(match q {
                        KernelInfo::FunctionName => enc_str(name),
                        // Bound-argument count; the simulation does not
                        // parse declared parameter lists.
                        KernelInfo::NumArgs => enc_u32(args.len() as u32),
                        KernelInfo::ReferenceCount => enc_u32(obj.refs),
                        KernelInfo::Context => empty(),
                        KernelInfo::Program => enc_usize(program.as_raw()),
                    }),
                    _ => Err(api(Status::CL_INVALID_KERNEL, "clGetKernelInfo")),
                }
            }
        }
    }

    fn set_kernel_arg(&self, kernel: Handle, index: u32, arg: ArgVal) -> Result<()> {
        let mut state = self.lock();
        let owned = match arg {
            ArgVal::Mem(mem) => {
                match state.objects.get(&mem) {
                    Some(SimObject { body: Body::Mem { .. }, .. }) => {}
                    _ => return Err(api(Status::CL_INVALID_MEM_OBJECT, "clSetKernelArg")),
                }
                OwnedArg::Mem(mem)
            }
            ArgVal::Scalar(bytes) => OwnedArg::Scalar(bytes.to_vec()),
            ArgVal::Local(size) => OwnedArg::Local(size),
        };
        match state.objects.get_mut(&kernel) {
            Some(SimObject { body: Body::Kernel { ref mut args, .. }, .. }) => {
                args.insert(index, owned);
                Ok(())
            }
            _ => Err(api(Status::CL_INVALID_KERNEL, "clSetKernelArg")),
        }
    }

    fn enqueue_kernel(
        &self,
        queue: Handle,
        kernel: Handle,
        global_work_size: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueNDRangeKernel")?;
        state.check_wait_list(wait, "clEnqueueNDRangeKernel")?;
        match state.objects.get(&kernel) {
            Some(SimObject { body: Body::Kernel { .. }, .. }) => {}
            _ => return Err(api(Status::CL_INVALID_KERNEL, "clEnqueueNDRangeKernel")),
        }
        if global_work_size.iter().all(|&d| d == 0) {
            return Err(api(Status::CL_INVALID_GLOBAL_WORK_SIZE, "clEnqueueNDRangeKernel"));
        }
        // Launch recorded only; the simulation computes nothing.
        Ok(state.complete_event(queue))
    }

    fn enqueue_read_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        dst: &mut [u8],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueReadBuffer")?;
        state.check_wait_list(wait, "clEnqueueReadBuffer")?;
        {
            let data = state.buffer_data(mem, "clEnqueueReadBuffer")?;
            if offset + dst.len() > data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueReadBuffer"));
            }
            dst.copy_from_slice(&data[offset..offset + dst.len()]);
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_write_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        src: &[u8],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueWriteBuffer")?;
        state.check_wait_list(wait, "clEnqueueWriteBuffer")?;
        {
            let data = state.buffer_data_mut(mem, "clEnqueueWriteBuffer")?;
            if offset + src.len() > data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueWriteBuffer"));
            }
            data[offset..offset + src.len()].copy_from_slice(src);
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_copy_buffer(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueCopyBuffer")?;
        state.check_wait_list(wait, "clEnqueueCopyBuffer")?;
        let chunk = {
            let src_data = state.buffer_data(src, "clEnqueueCopyBuffer")?;
            if src_offset + len > src_data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueCopyBuffer"));
            }
            src_data[src_offset..src_offset + len].to_vec()
        };
        {
            let dst_data = state.buffer_data_mut(dst, "clEnqueueCopyBuffer")?;
            if dst_offset + len > dst_data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueCopyBuffer"));
            }
            dst_data[dst_offset..dst_offset + len].copy_from_slice(&chunk);
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_fill_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        pattern: &[u8],
        offset: usize,
        len: usize,
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueFillBuffer")?;
        state.check_wait_list(wait, "clEnqueueFillBuffer")?;
        if pattern.is_empty() || len % pattern.len() != 0 {
            return Err(api(Status::CL_INVALID_VALUE, "clEnqueueFillBuffer"));
        }
        {
            let data = state.buffer_data_mut(mem, "clEnqueueFillBuffer")?;
            if offset + len > data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueFillBuffer"));
            }
            for chunk in data[offset..offset + len].chunks_mut(pattern.len()) {
                chunk.copy_from_slice(pattern);
            }
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_read_image(
        &self,
        queue: Handle,
        mem: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        dst: &mut [u8],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueReadImage")?;
        state.check_wait_list(wait, "clEnqueueReadImage")?;
        {
            let (data, meta) = state.image(mem, "clEnqueueReadImage")?;
            let out = meta.copy_out(data, origin, region, "clEnqueueReadImage")?;
            if dst.len() < out.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueReadImage"));
            }
            dst[..out.len()].copy_from_slice(&out);
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_write_image(
        &self,
        queue: Handle,
        mem: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        src: &[u8],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueWriteImage")?;
        state.check_wait_list(wait, "clEnqueueWriteImage")?;
        {
            let (data, meta) = state.image_mut(mem, "clEnqueueWriteImage")?;
            meta.copy_in(data, origin, region, src, "clEnqueueWriteImage")?;
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_copy_image(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_origin: [usize; 3],
        dst_origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueCopyImage")?;
        state.check_wait_list(wait, "clEnqueueCopyImage")?;
        let chunk = {
            let (data, meta) = state.image(src, "clEnqueueCopyImage")?;
            meta.copy_out(data, src_origin, region, "clEnqueueCopyImage")?
        };
        {
            let (data, meta) = state.image_mut(dst, "clEnqueueCopyImage")?;
            meta.copy_in(data, dst_origin, region, &chunk, "clEnqueueCopyImage")?;
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_fill_image(
        &self,
        queue: Handle,
        mem: Handle,
        pixel: &[u8],
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueFillImage")?;
        state.check_wait_list(wait, "clEnqueueFillImage")?;
        {
            let (data, meta) = state.image_mut(mem, "clEnqueueFillImage")?;
            if pixel.len() != meta.elem() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueFillImage"));
            }
            let count = region[0] * region[1] * region[2];
            let mut filled = Vec::with_capacity(count * pixel.len());
            for _ in 0..count {
                filled.extend_from_slice(pixel);
            }
            meta.copy_in(data, origin, region, &filled, "clEnqueueFillImage")?;
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_copy_image_to_buffer(
        &self,
        queue: Handle,
        src_image: Handle,
        dst_buffer: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        dst_offset: usize,
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueCopyImageToBuffer")?;
        state.check_wait_list(wait, "clEnqueueCopyImageToBuffer")?;
        let chunk = {
            let (data, meta) = state.image(src_image, "clEnqueueCopyImageToBuffer")?;
            meta.copy_out(data, origin, region, "clEnqueueCopyImageToBuffer")?
        };
        {
            let data = state.buffer_data_mut(dst_buffer, "clEnqueueCopyImageToBuffer")?;
            if dst_offset + chunk.len() > data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueCopyImageToBuffer"));
            }
            data[dst_offset..dst_offset + chunk.len()].copy_from_slice(&chunk);
        }
        Ok(state.complete_event(queue))
    }

    fn enqueue_copy_buffer_to_image(
        &self,
        queue: Handle,
        src_buffer: Handle,
        dst_image: Handle,
        src_offset: usize,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueCopyBufferToImage")?;
        state.check_wait_list(wait, "clEnqueueCopyBufferToImage")?;
        let chunk = {
            let data = state.buffer_data(src_buffer, "clEnqueueCopyBufferToImage")?;
            let elem = state.image(dst_image, "clEnqueueCopyBufferToImage")?.1.elem();
            let len = region[0] * region[1] * region[2] * elem;
            if src_offset + len > data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueCopyBufferToImage"));
            }
            data[src_offset..src_offset + len].to_vec()
        };
        {
            let (data, meta) = state.image_mut(dst_image, "clEnqueueCopyBufferToImage")?;
            meta.copy_in(data, origin, region, &chunk, "clEnqueueCopyBufferToImage")?;
        }
        Ok(state.complete_event(queue))
    }

    fn map_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        _flags: MapFlags,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueMapBuffer")?;
        let snapshot = {
            let data = state.buffer_data(mem, "clEnqueueMapBuffer")?;
            if offset + len > data.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueMapBuffer"));
            }
            data[offset..offset + len].to_vec()
        };
        if let Some(SimObject { body: Body::Mem { ref mut map_count, .. }, .. }) =
            state.objects.get_mut(&mem)
        {
            *map_count += 1;
        }
        Ok(snapshot)
    }

    fn unmap_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        data: &[u8],
        write_back: bool,
    ) -> Result<()> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueUnmapMemObject")?;
        if write_back {
            let store = state.buffer_data_mut(mem, "clEnqueueUnmapMemObject")?;
            if offset + data.len() > store.len() {
                return Err(api(Status::CL_INVALID_VALUE, "clEnqueueUnmapMemObject"));
            }
            store[offset..offset + data.len()].copy_from_slice(data);
        }
        if let Some(SimObject { body: Body::Mem { ref mut map_count, .. }, .. }) =
            state.objects.get_mut(&mem)
        {
            *map_count = map_count.saturating_sub(1);
        }
        Ok(())
    }

    fn map_image(
        &self,
        queue: Handle,
        mem: Handle,
        _flags: MapFlags,
        origin: [usize; 3],
        region: [usize; 3],
    ) -> Result<(Vec<u8>, usize)> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueMapImage")?;
        let (snapshot, row_pitch) = {
            let (data, meta) = state.image(mem, "clEnqueueMapImage")?;
            let out = meta.copy_out(data, origin, region, "clEnqueueMapImage")?;
            (out, region[0] * meta.elem())
        };
        if let Some(SimObject { body: Body::Mem { ref mut map_count, .. }, .. }) =
            state.objects.get_mut(&mem)
        {
            *map_count += 1;
        }
        Ok((snapshot, row_pitch))
    }

    fn unmap_image(
        &self,
        queue: Handle,
        mem: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        data: &[u8],
        write_back: bool,
    ) -> Result<()> {
        let mut state = self.lock();
        state.queue(queue, "clEnqueueUnmapMemObject")?;
        if write_back {
            let (store, meta) = state.image_mut(mem, "clEnqueueUnmapMemObject")?;
            meta.copy_in(store, origin, region, data, "clEnqueueUnmapMemObject")?;
        }
        if let Some(SimObject { body: Body::Mem { ref mut map_count, .. }, .. }) =
            state.objects.get_mut(&mem)
        {
            *map_count = map_count.saturating_sub(1);
        }
        Ok(())
    }

    fn flush(&self, queue: Handle) -> Result<()> {
        self.lock().queue(queue, "clFlush")
    }

    fn finish(&self, queue: Handle) -> Result<()> {
        self.lock().queue(queue, "clFinish")
    }

    fn wait_for_events(&self, events: &[Handle]) -> Result<()> {
        if events.is_empty() {
            return Err(api(Status::CL_INVALID_VALUE, "clWaitForEvents"));
        }
        let state = self.lock();
        for ev in events {
            match state.objects.get(ev) {
                Some(SimObject { body: Body::Event { .. }, .. }) => {}
                _ => return Err(api(Status::CL_INVALID_EVENT, "clWaitForEvents")),
            }
        }
        Ok(())
    }

    fn event_status(&self, event: Handle) -> Result<CommandExecutionStatus> {
        let state = self.lock();
        match state.object(event, Status::CL_INVALID_EVENT, "clGetEventInfo")?.body {
            Body::Event { status, .. } => Ok(status),
            _ => Err(api(Status::CL_INVALID_EVENT, "clGetEventInfo")),
        }
    }
}

/// Extracts `__kernel` entry-point names from OpenCL C source, leniently.
fn kernel_names(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut toks = source.split_whitespace().peekable();
    while let Some(tok) = toks.next() {
        if tok != "__kernel" && tok != "kernel" {
            continue;
        }
        while let Some(&next) = toks.peek() {
            toks.next();
            if next == "void" {
                break;
            }
        }
        if let Some(sig) = toks.next() {
            let name: String = sig.chars().take_while(|c| *c != '(').collect();
            if !name.is_empty() {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_name_extraction() {
        let src = "__kernel void add(__global int* a) {}\nkernel void scale (float x) {}";
        assert_eq!(kernel_names(src), vec!["add".to_string(), "scale".to_string()]);
    }
}
