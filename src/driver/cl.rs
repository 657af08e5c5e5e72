//! The `cl-sys` backed driver.
//!
//! Thin safe shims over the native entry points. Each call converts
//! arguments, invokes the C function, and routes the status code through
//! [`eval_errcode`] so failures surface as `Error::Api` carrying the
//! function name and decoded status.

use std::ffi::CString;
use std::os::raw::{c_char, c_void};
use std::ptr;

use cl_sys as ffi;
use libc::size_t;
use num_traits::FromPrimitive;

use super::{ArgVal, Driver, Handle};
use crate::error::{eval_errcode, ApiError, Error, Result, Status};
use crate::types::{
    CommandExecutionStatus, DeviceType, EventInfo, ImageDescriptor, ImageFormat, ImageInfo,
    InfoQuery, Kind, MapFlags, MemFlags, QueueProperties,
};

/// Driver implementation over an installed OpenCL runtime.
#[derive(Debug, Default)]
pub struct ClDriver;

impl ClDriver {
    pub fn new() -> ClDriver {
        ClDriver
    }
}

fn ev_list(wait: &[Handle]) -> Vec<ffi::cl_event> {
    wait.iter().map(|h| h.as_raw() as ffi::cl_event).collect()
}

fn ev_args(list: &[ffi::cl_event]) -> (ffi::cl_uint, *const ffi::cl_event) {
    if list.is_empty() {
        (0, ptr::null())
    } else {
        (list.len() as ffi::cl_uint, list.as_ptr())
    }
}

/// Two-step native info query: size probe, then value fetch.
fn get_info<F>(mut call: F, fn_name: &'static str) -> Result<Box<[u8]>>
where
    F: FnMut(size_t, *mut c_void, *mut size_t) -> ffi::cl_int,
{
    let mut size: size_t = 0;
    eval_errcode(call(0, ptr::null_mut(), &mut size), (), fn_name)?;
    if size == 0 {
        return Ok(Vec::new().into_boxed_slice());
    }
    let mut buf = vec![0u8; size as usize];
    eval_errcode(
        call(size, buf.as_mut_ptr() as *mut c_void, ptr::null_mut()),
        (),
        fn_name,
    )?;
    Ok(buf.into_boxed_slice())
}

fn work_dims(global_work_size: [usize; 3]) -> Result<Vec<size_t>> {
    let dim = match global_work_size.iter().rposition(|&d| d != 0) {
        Some(last) => last + 1,
        None => {
            return Err(ApiError::new(
                Status::CL_INVALID_GLOBAL_WORK_SIZE,
                "clEnqueueNDRangeKernel",
            )
            .into())
        }
    };
    Ok(global_work_size[..dim]
        .iter()
        .map(|&d| d.max(1) as size_t)
        .collect())
}

fn image_desc(desc: &ImageDescriptor) -> ffi::cl_image_desc {
    ffi::cl_image_desc {
        image_type: desc.image_type as ffi::cl_mem_object_type,
        image_width: desc.width as size_t,
        image_height: desc.height as size_t,
        image_depth: desc.depth as size_t,
        image_array_size: 0,
        image_row_pitch: desc.row_pitch as size_t,
        image_slice_pitch: desc.slice_pitch as size_t,
        num_mip_levels: 0,
        num_samples: 0,
        buffer: ptr::null_mut(),
    }
}

fn image_format(format: &ImageFormat) -> ffi::cl_image_format {
    ffi::cl_image_format {
        image_channel_order: format.channel_order as ffi::cl_channel_order,
        image_channel_data_type: format.channel_data_type as ffi::cl_channel_type,
    }
}

impl Driver for ClDriver {
    fn platform_ids(&self) -> Result<Vec<Handle>> {
        let mut count: ffi::cl_uint = 0;
        let errcode = unsafe { ffi::clGetPlatformIDs(0, ptr::null_mut(), &mut count) };
        eval_errcode(errcode, (), "clGetPlatformIDs")?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut ids = vec![ptr::null_mut() as ffi::cl_platform_id; count as usize];
        let errcode =
            unsafe { ffi::clGetPlatformIDs(count, ids.as_mut_ptr(), ptr::null_mut()) };
        eval_errcode(errcode, (), "clGetPlatformIDs")?;
        Ok(ids.into_iter().map(|p| Handle::from_raw(p as usize)).collect())
    }

    fn device_ids(&self, platform: Handle, devtype: DeviceType) -> Result<Vec<Handle>> {
        let platform = platform.as_raw() as ffi::cl_platform_id;
        let devtype = devtype.bits() as ffi::cl_device_type;
        let mut count: ffi::cl_uint = 0;
        let errcode =
            unsafe { ffi::clGetDeviceIDs(platform, devtype, 0, ptr::null_mut(), &mut count) };
        eval_errcode(errcode, (), "clGetDeviceIDs")?;
        let mut ids = vec![ptr::null_mut() as ffi::cl_device_id; count as usize];
        let errcode = unsafe {
            ffi::clGetDeviceIDs(platform, devtype, count, ids.as_mut_ptr(), ptr::null_mut())
        };
        eval_errcode(errcode, (), "clGetDeviceIDs")?;
        Ok(ids.into_iter().map(|d| Handle::from_raw(d as usize)).collect())
    }

    fn retain(&self, kind: Kind, handle: Handle) -> Result<()> {
        let raw = handle.as_raw();
        let (errcode, fn_name) = unsafe {
            match kind {
                Kind::Platform | Kind::Device => return Ok(()),
                Kind::Context => {
                    (ffi::clRetainContext(raw as ffi::cl_context), "clRetainContext")
                }
                Kind::Queue => (
                    ffi::clRetainCommandQueue(raw as ffi::cl_command_queue),
                    "clRetainCommandQueue",
                ),
                Kind::Buffer | Kind::Image => {
                    (ffi::clRetainMemObject(raw as ffi::cl_mem), "clRetainMemObject")
                }
                Kind::Program => {
                    (ffi::clRetainProgram(raw as ffi::cl_program), "clRetainProgram")
                }
                Kind::Kernel => (ffi::clRetainKernel(raw as ffi::cl_kernel), "clRetainKernel"),
                Kind::Event => (ffi::clRetainEvent(raw as ffi::cl_event), "clRetainEvent"),
            }
        };
        eval_errcode(errcode, (), fn_name)
    }

    fn release(&self, kind: Kind, handle: Handle) -> Result<()> {
        let raw = handle.as_raw();
        let (errcode, fn_name) = unsafe {
            match kind {
                Kind::Platform | Kind::Device => return Ok(()),
                Kind::Context => {
                    (ffi::clReleaseContext(raw as ffi::cl_context), "clReleaseContext")
                }
                Kind::Queue => (
                    ffi::clReleaseCommandQueue(raw as ffi::cl_command_queue),
                    "clReleaseCommandQueue",
                ),
                Kind::Buffer | Kind::Image => {
                    (ffi::clReleaseMemObject(raw as ffi::cl_mem), "clReleaseMemObject")
                }
                Kind::Program => {
                    (ffi::clReleaseProgram(raw as ffi::cl_program), "clReleaseProgram")
                }
                Kind::Kernel => {
                    (ffi::clReleaseKernel(raw as ffi::cl_kernel), "clReleaseKernel")
                }
                Kind::Event => (ffi::clReleaseEvent(raw as ffi::cl_event), "clReleaseEvent"),
            }
        };
        eval_errcode(errcode, (), fn_name)
    }

    fn create_context(&self, devices: &[Handle]) -> Result<Handle> {
        if devices.is_empty() {
            return Err(Error::Args("context device list must be non-empty"));
        }
        let ids: Vec<ffi::cl_device_id> =
            devices.iter().map(|d| d.as_raw() as ffi::cl_device_id).collect();
        let mut errcode: ffi::cl_int = 0;
        let context = unsafe {
            ffi::clCreateContext(
                ptr::null(),
                ids.len() as ffi::cl_uint,
                ids.as_ptr(),
                None,
                ptr::null_mut(),
                &mut errcode,
            )
        };
        eval_errcode(errcode, Handle::from_raw(context as usize), "clCreateContext")
    }

    fn create_queue(
        &self,
        context: Handle,
        device: Handle,
        properties: QueueProperties,
    ) -> Result<Handle> {
        let mut errcode: ffi::cl_int = 0;
        let queue = unsafe {
            ffi::clCreateCommandQueue(
                context.as_raw() as ffi::cl_context,
                device.as_raw() as ffi::cl_device_id,
                properties.bits() as ffi::cl_command_queue_properties,
                &mut errcode,
            )
        };
        eval_errcode(errcode, Handle::from_raw(queue as usize), "clCreateCommandQueue")
    }

    fn create_buffer(
        &self,
        context: Handle,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Handle> {
        let host_ptr = match host_data {
            Some(data) => data.as_ptr() as *mut c_void,
            None => ptr::null_mut(),
        };
        let mut errcode: ffi::cl_int = 0;
        let mem = unsafe {
            ffi::clCreateBuffer(
                context.as_raw() as ffi::cl_context,
                flags.bits() as ffi::cl_mem_flags,
                size as size_t,
                host_ptr,
                &mut errcode,
            )
        };
        eval_errcode(errcode, Handle::from_raw(mem as usize), "clCreateBuffer")
    }

    fn create_image(
        &self,
        context: Handle,
        flags: MemFlags,
        format: ImageFormat,
        desc: ImageDescriptor,
        host_data: Option<&[u8]>,
    ) -> Result<Handle> {
        let host_ptr = match host_data {
            Some(data) => data.as_ptr() as *mut c_void,
            None => ptr::null_mut(),
        };
        let fmt = image_format(&format);
        let dsc = image_desc(&desc);
        let mut errcode: ffi::cl_int = 0;
        let mem = unsafe {
            ffi::clCreateImage(
                context.as_raw() as ffi::cl_context,
                flags.bits() as ffi::cl_mem_flags,
                &fmt,
                &dsc,
                host_ptr,
                &mut errcode,
            )
        };
        eval_errcode(errcode, Handle::from_raw(mem as usize), "clCreateImage")
    }

    fn create_program_with_source(&self, context: Handle, sources: &[&str]) -> Result<Handle> {
        if sources.is_empty() {
            return Err(Error::Args("program source list must be non-empty"));
        }
        // Lengths are passed explicitly, so embedded NULs never matter.
        let ptrs: Vec<*const c_char> =
            sources.iter().map(|s| s.as_ptr() as *const c_char).collect();
        let lens: Vec<size_t> = sources.iter().map(|s| s.len() as size_t).collect();
        let mut errcode: ffi::cl_int = 0;
        let program = unsafe {
            ffi::clCreateProgramWithSource(
                context.as_raw() as ffi::cl_context,
                ptrs.len() as ffi::cl_uint,
                ptrs.as_ptr(),
                lens.as_ptr(),
                &mut errcode,
            )
        };
        eval_errcode(
            errcode,
            Handle::from_raw(program as usize),
            "clCreateProgramWithSource",
        )
    }

    fn build_program(&self, program: Handle, devices: &[Handle], options: &str) -> Result<()> {
        let ids: Vec<ffi::cl_device_id> =
            devices.iter().map(|d| d.as_raw() as ffi::cl_device_id).collect();
        let opts = CString::new(options)?;
        let errcode = unsafe {
            ffi::clBuildProgram(
                program.as_raw() as ffi::cl_program,
                ids.len() as ffi::cl_uint,
                if ids.is_empty() { ptr::null() } else { ids.as_ptr() },
                opts.as_ptr(),
                None,
                ptr::null_mut(),
            )
        };
        if errcode == Status::CL_BUILD_PROGRAM_FAILURE as i32 {
            let log = self.build_log(program, devices).unwrap_or_default();
            return Err(Error::ProgramBuild(log));
        }
        eval_errcode(errcode, (), "clBuildProgram")
    }

    fn create_kernel(&self, program: Handle, name: &str) -> Result<Handle> {
        let name = CString::new(name)?;
        let mut errcode: ffi::cl_int = 0;
        let kernel = unsafe {
            ffi::clCreateKernel(
                program.as_raw() as ffi::cl_program,
                name.as_ptr(),
                &mut errcode,
            )
        };
        eval_errcode(errcode, Handle::from_raw(kernel as usize), "clCreateKernel")
    }

    fn info(&self, query: InfoQuery, handle: Handle) -> Result<Box<[u8]>> {
        let raw = handle.as_raw();
        let param = query.param();
        match query {
            InfoQuery::Platform(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetPlatformInfo(raw as ffi::cl_platform_id, param, size, value, ret)
                },
                "clGetPlatformInfo",
            ),
            InfoQuery::Device(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetDeviceInfo(raw as ffi::cl_device_id, param, size, value, ret)
                },
                "clGetDeviceInfo",
            ),
            InfoQuery::Context(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetContextInfo(raw as ffi::cl_context, param, size, value, ret)
                },
                "clGetContextInfo",
            ),
            InfoQuery::Queue(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetCommandQueueInfo(
                        raw as ffi::cl_command_queue,
                        param,
                        size,
                        value,
                        ret,
                    )
                },
                "clGetCommandQueueInfo",
            ),
            InfoQuery::Mem(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetMemObjectInfo(raw as ffi::cl_mem, param, size, value, ret)
                },
                "clGetMemObjectInfo",
            ),
            InfoQuery::Image(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetImageInfo(raw as ffi::cl_mem, param, size, value, ret)
                },
                "clGetImageInfo",
            ),
            InfoQuery::Event(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetEventInfo(raw as ffi::cl_event, param, size, value, ret)
                },
                "clGetEventInfo",
            ),
            InfoQuery::Program(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetProgramInfo(raw as ffi::cl_program, param, size, value, ret)
                },
                "clGetProgramInfo",
            ),
            InfoQuery::Kernel(_) => get_info(
                |size, value, ret| unsafe {
                    ffi::clGetKernelInfo(raw as ffi::cl_kernel, param, size, value, ret)
                },
                "clGetKernelInfo",
            ),
        }
    }

    fn set_kernel_arg(&self, kernel: Handle, index: u32, arg: ArgVal) -> Result<()> {
        let kernel = kernel.as_raw() as ffi::cl_kernel;
        let errcode = match arg {
            ArgVal::Mem(mem) => {
                let mem = mem.as_raw() as ffi::cl_mem;
                unsafe {
                    ffi::clSetKernelArg(
                        kernel,
                        index,
                        std::mem::size_of::<ffi::cl_mem>() as size_t,
                        &mem as *const ffi::cl_mem as *const c_void,
                    )
                }
            }
            ArgVal::Scalar(bytes) => unsafe {
                ffi::clSetKernelArg(
                    kernel,
                    index,
                    bytes.len() as size_t,
                    bytes.as_ptr() as *const c_void,
                )
            },
            ArgVal::Local(size) => unsafe {
                ffi::clSetKernelArg(kernel, index, size as size_t, ptr::null())
            },
        };
        eval_errcode(errcode, (), "clSetKernelArg")
    }

    fn enqueue_kernel(
        &self,
        queue: Handle,
        kernel: Handle,
        global_work_size: [usize; 3],
        wait: &[Handle],
    ) -> Result<Handle> {
        let gws = work_dims(global_work_size)?;
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueNDRangeKernel(
                queue.as_raw() as ffi::cl_command_queue,
                kernel.as_raw() as ffi::cl_kernel,
                gws.len() as ffi::cl_uint,
                ptr::null(),
                gws.as_ptr(),
                ptr::null(),
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueNDRangeKernel")
    }

    fn enqueue_read_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        dst: &mut [u8],
        wait: &[Handle],
    ) -> Result<Handle> {
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueReadBuffer(
                queue.as_raw() as ffi::cl_command_queue,
                mem.as_raw() as ffi::cl_mem,
                ffi::CL_TRUE,
                offset as size_t,
                dst.len() as size_t,
                dst.as_mut_ptr() as *mut c_void,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueReadBuffer")
    }

    fn enqueue_write_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        offset: usize,
        src: &[u8],
        wait: &[Handle],
    ) -> Result<Handle> {
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueWriteBuffer(
                queue.as_raw() as ffi::cl_command_queue,
                mem.as_raw() as ffi::cl_mem,
                ffi::CL_TRUE,
                offset as size_t,
                src.len() as size_t,
                src.as_ptr() as *const c_void,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueWriteBuffer")
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
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueCopyBuffer(
                queue.as_raw() as ffi::cl_command_queue,
                src.as_raw() as ffi::cl_mem,
                dst.as_raw() as ffi::cl_mem,
                src_offset as size_t,
                dst_offset as size_t,
                len as size_t,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueCopyBuffer")
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
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueFillBuffer(
                queue.as_raw() as ffi::cl_command_queue,
                mem.as_raw() as ffi::cl_mem,
                pattern.as_ptr() as *const c_void,
                pattern.len() as size_t,
                offset as size_t,
                len as size_t,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueFillBuffer")
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
        let origin: [size_t; 3] = [origin[0], origin[1], origin[2]];
        let region: [size_t; 3] = [region[0], region[1], region[2]];
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueReadImage(
                queue.as_raw() as ffi::cl_command_queue,
                mem.as_raw() as ffi::cl_mem,
                ffi::CL_TRUE,
                origin.as_ptr(),
                region.as_ptr(),
                0,
                0,
                dst.as_mut_ptr() as *mut c_void,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueReadImage")
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
        let origin: [size_t; 3] = [origin[0], origin[1], origin[2]];
        let region: [size_t; 3] = [region[0], region[1], region[2]];
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueWriteImage(
                queue.as_raw() as ffi::cl_command_queue,
                mem.as_raw() as ffi::cl_mem,
                ffi::CL_TRUE,
                origin.as_ptr(),
                region.as_ptr(),
                0,
                0,
                src.as_ptr() as *const c_void,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueWriteImage")
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
        let src_origin: [size_t; 3] = [src_origin[0], src_origin[1], src_origin[2]];
        let dst_origin: [size_t; 3] = [dst_origin[0], dst_origin[1], dst_origin[2]];
        let region: [size_t; 3] = [region[0], region[1], region[2]];
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueCopyImage(
                queue.as_raw() as ffi::cl_command_queue,
                src.as_raw() as ffi::cl_mem,
                dst.as_raw() as ffi::cl_mem,
                src_origin.as_ptr(),
                dst_origin.as_ptr(),
                region.as_ptr(),
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(errcode, Handle::from_raw(event as usize), "clEnqueueCopyImage")
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
        // clEnqueueFillImage wants the color in the runtime's four-channel
        // encoding rather than element bytes, so fill by writing a tiled
        // host region instead. Semantics are identical for Complete events.
        let count = region[0].max(1) * region[1].max(1) * region[2].max(1);
        let mut tiled = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            tiled.extend_from_slice(pixel);
        }
        self.enqueue_write_image(queue, mem, origin, region, &tiled, wait)
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
        let origin: [size_t; 3] = [origin[0], origin[1], origin[2]];
        let region: [size_t; 3] = [region[0], region[1], region[2]];
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueCopyImageToBuffer(
                queue.as_raw() as ffi::cl_command_queue,
                src_image.as_raw() as ffi::cl_mem,
                dst_buffer.as_raw() as ffi::cl_mem,
                origin.as_ptr(),
                region.as_ptr(),
                dst_offset as size_t,
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(
            errcode,
            Handle::from_raw(event as usize),
            "clEnqueueCopyImageToBuffer",
        )
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
        let origin: [size_t; 3] = [origin[0], origin[1], origin[2]];
        let region: [size_t; 3] = [region[0], region[1], region[2]];
        let evs = ev_list(wait);
        let (n, evp) = ev_args(&evs);
        let mut event: ffi::cl_event = ptr::null_mut();
        let errcode = unsafe {
            ffi::clEnqueueCopyBufferToImage(
                queue.as_raw() as ffi::cl_command_queue,
                src_buffer.as_raw() as ffi::cl_mem,
                dst_image.as_raw() as ffi::cl_mem,
                src_offset as size_t,
                origin.as_ptr(),
                region.as_ptr(),
                n,
                evp,
                &mut event,
            )
        };
        eval_errcode(
            errcode,
            Handle::from_raw(event as usize),
            "clEnqueueCopyBufferToImage",
        )
    }

    fn map_buffer(
        &self,
        queue: Handle,
        mem: Handle,
        flags: MapFlags,
        offset: usize,
        len: usize,
    ) -> Result<Vec<u8>> {
        // Copy-based mapping: the native mapping lives only long enough to
        // snapshot the region. Write-back happens in `unmap_buffer`.
        let queue_raw = queue.as_raw() as ffi::cl_command_queue;
        let mem_raw = mem.as_raw() as ffi::cl_mem;
        let mut errcode: ffi::cl_int = 0;
        let mapped = unsafe {
            ffi::clEnqueueMapBuffer(
                queue_raw,
                mem_raw,
                ffi::CL_TRUE,
                flags.bits() as ffi::cl_map_flags,
                offset as size_t,
                len as size_t,
                0,
                ptr::null(),
                ptr::null_mut(),
                &mut errcode,
            )
        };
        eval_errcode(errcode, (), "clEnqueueMapBuffer")?;
        let snapshot =
            unsafe { std::slice::from_raw_parts(mapped as *const u8, len).to_vec() };
        let errcode = unsafe {
            ffi::clEnqueueUnmapMemObject(queue_raw, mem_raw, mapped, 0, ptr::null(), ptr::null_mut())
        };
        eval_errcode(errcode, (), "clEnqueueUnmapMemObject")?;
        self.finish(queue)?;
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
        if write_back {
            self.enqueue_write_buffer(queue, mem, offset, data, &[])?;
        }
        Ok(())
    }

    fn map_image(
        &self,
        queue: Handle,
        mem: Handle,
        flags: MapFlags,
        origin: [usize; 3],
        region: [usize; 3],
    ) -> Result<(Vec<u8>, usize)> {
        let queue_raw = queue.as_raw() as ffi::cl_command_queue;
        let mem_raw = mem.as_raw() as ffi::cl_mem;
        let o: [size_t; 3] = [origin[0], origin[1], origin[2]];
        let r: [size_t; 3] = [region[0], region[1], region[2]];
        let mut row_pitch: size_t = 0;
        let mut slice_pitch: size_t = 0;
        let mut errcode: ffi::cl_int = 0;
        let mapped = unsafe {
            ffi::clEnqueueMapImage(
                queue_raw,
                mem_raw,
                ffi::CL_TRUE,
                flags.bits() as ffi::cl_map_flags,
                o.as_ptr(),
                r.as_ptr(),
                &mut row_pitch,
                &mut slice_pitch,
                0,
                ptr::null(),
                ptr::null_mut(),
                &mut errcode,
            )
        };
        eval_errcode(errcode, (), "clEnqueueMapImage")?;
        // Repack rows tightly so callers see a contiguous region regardless
        // of the runtime's pitch. The runtime may pad `row_pitch`, so the
        // element size comes from the image itself.
        let bytes = self.info(InfoQuery::Image(ImageInfo::ElementSize), mem)?;
        let elem = crate::util::scalar_from_bytes::<usize>(&bytes)?;
        let packed_row = region[0] * elem.max(1);
        let rows = region[1].max(1) * region[2].max(1);
        let mut snapshot = Vec::with_capacity(packed_row * rows);
        for i in 0..rows {
            let row = unsafe {
                std::slice::from_raw_parts(
                    (mapped as *const u8).add(i * row_pitch as usize),
                    packed_row,
                )
            };
            snapshot.extend_from_slice(row);
        }
        let errcode = unsafe {
            ffi::clEnqueueUnmapMemObject(queue_raw, mem_raw, mapped, 0, ptr::null(), ptr::null_mut())
        };
        eval_errcode(errcode, (), "clEnqueueUnmapMemObject")?;
        self.finish(queue)?;
        Ok((snapshot, packed_row))
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
        if write_back {
            self.enqueue_write_image(queue, mem, origin, region, data, &[])?;
        }
        Ok(())
    }

    fn flush(&self, queue: Handle) -> Result<()> {
        let errcode = unsafe { ffi::clFlush(queue.as_raw() as ffi::cl_command_queue) };
        eval_errcode(errcode, (), "clFlush")
    }

    fn finish(&self, queue: Handle) -> Result<()> {
        let errcode = unsafe { ffi::clFinish(queue.as_raw() as ffi::cl_command_queue) };
        eval_errcode(errcode, (), "clFinish")
    }

    fn wait_for_events(&self, events: &[Handle]) -> Result<()> {
        if events.is_empty() {
            return Err(Error::Args("event wait list must be non-empty"));
        }
        let evs = ev_list(events);
        let errcode =
            unsafe { ffi::clWaitForEvents(evs.len() as ffi::cl_uint, evs.as_ptr()) };
        eval_errcode(errcode, (), "clWaitForEvents")
    }

    fn event_status(&self, event: Handle) -> Result<CommandExecutionStatus> {
        let bytes = self.info(InfoQuery::Event(EventInfo::CommandExecutionStatus), event)?;
        let code = crate::util::scalar_from_bytes::<i32>(&bytes)?;
        CommandExecutionStatus::from_i32(code)
            .ok_or_else(|| Error::InvalidData(format!("unknown event status {}", code)))
    }
}

impl ClDriver {
    /// Concatenated build logs across the given devices; empty when no
    /// device produced one.
    fn build_log(&self, program: Handle, devices: &[Handle]) -> Result<String> {
        let mut full = String::new();
        for dev in devices {
            let mut size: size_t = 0;
            let errcode = unsafe {
                ffi::clGetProgramBuildInfo(
                    program.as_raw() as ffi::cl_program,
                    dev.as_raw() as ffi::cl_device_id,
                    ffi::CL_PROGRAM_BUILD_LOG,
                    0,
                    ptr::null_mut(),
                    &mut size,
                )
            };
            eval_errcode(errcode, (), "clGetProgramBuildInfo")?;
            if size == 0 {
                continue;
            }
            let mut buf = vec![0u8; size as usize];
            let errcode = unsafe {
                ffi::clGetProgramBuildInfo(
                    program.as_raw() as ffi::cl_program,
                    dev.as_raw() as ffi::cl_device_id,
                    ffi::CL_PROGRAM_BUILD_LOG,
                    size,
                    buf.as_mut_ptr() as *mut c_void,
                    ptr::null_mut(),
                )
            };
            eval_errcode(errcode, (), "clGetProgramBuildInfo")?;
            full.push_str(&crate::util::string_from_bytes(&buf)?);
            full.push('\n');
        }
        Ok(full.trim_end().to_string())
    }
}
