//! Enumerators, flags and plain-old-data structures mirroring the native
//! OpenCL type vocabulary.

mod enums;
mod flags;
mod structs;

pub use self::enums::{
    CommandExecutionStatus, ContextInfo, DeviceInfo, EventInfo, ImageInfo, InfoQuery, Kind,
    KernelInfo, MemInfo, PlatformInfo, ProgramInfo, QueueInfo,
};
pub use self::flags::{DeviceType, MapFlags, MemFlags, QueueProperties};
pub use self::structs::{
    ImageChannelDataType, ImageChannelOrder, ImageDescriptor, ImageFormat, MemObjectType,
};

use std::fmt::Debug;

/// A plain-old-data scalar which can cross the host/device boundary.
///
/// Implementors guarantee that any bit pattern of the right size is a valid
/// value and that the type carries no padding, drop glue or references, so
/// slices of it may be viewed as raw bytes for native transfers and info
/// decoding.
pub unsafe trait ClPrm: Copy + Default + PartialEq + Debug + Send + Sync + 'static {}

macro_rules! impl_cl_prm {
    ($($ty:ty),+) => { $(unsafe impl ClPrm for $ty {})+ };
}

impl_cl_prm!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, usize, isize);
