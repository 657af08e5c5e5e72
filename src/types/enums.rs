//! Wrapper-kind discriminators and the closed set of information queries.
//!
//! Each wrapped object category has its own query enum whose discriminants
//! are the native `CL_*` parameter names. `InfoQuery` glues them into a
//! single cache key / dispatch value.

use num_traits::FromPrimitive;

/// Discriminator for the finite set of wrapped object categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Platform,
    Device,
    Context,
    Queue,
    Buffer,
    Image,
    Event,
    Program,
    Kernel,
}

impl Kind {
    /// `true` for the memory-object kinds.
    pub fn is_mem(self) -> bool {
        match self {
            Kind::Buffer | Kind::Image => true,
            _ => false,
        }
    }
}

/// cl_platform_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PlatformInfo {
    Profile = 0x0900,
    Version = 0x0901,
    Name = 0x0902,
    Vendor = 0x0903,
    Extensions = 0x0904,
}

/// cl_device_info (the subset this crate exposes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceInfo {
    Type = 0x1000,
    VendorId = 0x1001,
    MaxComputeUnits = 0x1002,
    ImageSupport = 0x1016,
    Name = 0x102B,
    Vendor = 0x102C,
    DriverVersion = 0x102D,
    Profile = 0x102E,
    Version = 0x102F,
    Extensions = 0x1030,
    Platform = 0x1031,
}

/// cl_context_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ContextInfo {
    ReferenceCount = 0x1080,
    Devices = 0x1081,
    Properties = 0x1082,
    NumDevices = 0x1083,
}

/// cl_command_queue_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum QueueInfo {
    Context = 0x1090,
    Device = 0x1091,
    ReferenceCount = 0x1092,
    Properties = 0x1093,
}

/// cl_mem_info (common to buffers and images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemInfo {
    Type = 0x1100,
    Flags = 0x1101,
    Size = 0x1102,
    HostPtr = 0x1103,
    MapCount = 0x1104,
    ReferenceCount = 0x1105,
    Context = 0x1106,
    AssociatedMemObject = 0x1107,
    Offset = 0x1108,
}

/// cl_image_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ImageInfo {
    Format = 0x1110,
    ElementSize = 0x1111,
    RowPitch = 0x1112,
    SlicePitch = 0x1113,
    Width = 0x1114,
    Height = 0x1115,
    Depth = 0x1116,
}

/// cl_event_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventInfo {
    CommandQueue = 0x11D0,
    CommandType = 0x11D1,
    ReferenceCount = 0x11D2,
    CommandExecutionStatus = 0x11D3,
    Context = 0x11D4,
}

/// cl_program_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ProgramInfo {
    ReferenceCount = 0x1160,
    Context = 0x1161,
    NumDevices = 0x1162,
    Devices = 0x1163,
    Source = 0x1164,
}

/// cl_kernel_info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum KernelInfo {
    FunctionName = 0x1190,
    NumArgs = 0x1191,
    ReferenceCount = 0x1192,
    Context = 0x1193,
    Program = 0x1194,
}

/// A single information query, parameterized by the category of query.
///
/// Used both as the per-wrapper cache key and as the dispatch value handed
/// to the driver, which selects the matching `clGet*Info` function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoQuery {
    Platform(PlatformInfo),
    Device(DeviceInfo),
    Context(ContextInfo),
    Queue(QueueInfo),
    Mem(MemInfo),
    Image(ImageInfo),
    Event(EventInfo),
    Program(ProgramInfo),
    Kernel(KernelInfo),
}

impl InfoQuery {
    /// The raw `cl_uint` parameter name.
    pub fn param(self) -> u32 {
        match self {
            InfoQuery::Platform(q) => q as u32,
            InfoQuery::Device(q) => q as u32,
            InfoQuery::Context(q) => q as u32,
            InfoQuery::Queue(q) => q as u32,
            InfoQuery::Mem(q) => q as u32,
            InfoQuery::Image(q) => q as u32,
            InfoQuery::Event(q) => q as u32,
            InfoQuery::Program(q) => q as u32,
            InfoQuery::Kernel(q) => q as u32,
        }
    }

    /// Whether this query family is legal for a wrapper of `kind`.
    ///
    /// Memory-object queries apply to both buffers and images; image
    /// queries only to images; everything else must match exactly.
    pub fn applies_to(self, kind: Kind) -> bool {
        match self {
            InfoQuery::Platform(_) => kind == Kind::Platform,
            InfoQuery::Device(_) => kind == Kind::Device,
            InfoQuery::Context(_) => kind == Kind::Context,
            InfoQuery::Queue(_) => kind == Kind::Queue,
            InfoQuery::Mem(_) => kind.is_mem(),
            InfoQuery::Image(_) => kind == Kind::Image,
            InfoQuery::Event(_) => kind == Kind::Event,
            InfoQuery::Program(_) => kind == Kind::Program,
            InfoQuery::Kernel(_) => kind == Kind::Kernel,
        }
    }

    /// Whether the queried attribute is immutable after resource creation
    /// and may therefore be cached.
    ///
    /// Native reference counts, map counts and event execution status all
    /// change behind this layer's back; those always bypass the cache.
    pub fn cacheable(self) -> bool {
        match self {
            InfoQuery::Context(ContextInfo::ReferenceCount)
            | InfoQuery::Queue(QueueInfo::ReferenceCount)
            | InfoQuery::Mem(MemInfo::ReferenceCount)
            | InfoQuery::Mem(MemInfo::MapCount)
            | InfoQuery::Event(_)
            | InfoQuery::Program(ProgramInfo::ReferenceCount)
            | InfoQuery::Kernel(KernelInfo::ReferenceCount) => false,
            _ => true,
        }
    }
}

macro_rules! impl_into_query {
    ($($ty:ident => $variant:ident),+) => {
        $(impl From<$ty> for InfoQuery {
            fn from(q: $ty) -> InfoQuery {
                InfoQuery::$variant(q)
            }
        })+
    };
}

impl_into_query! {
    PlatformInfo => Platform,
    DeviceInfo => Device,
    ContextInfo => Context,
    QueueInfo => Queue,
    MemInfo => Mem,
    ImageInfo => Image,
    EventInfo => Event,
    ProgramInfo => Program,
    KernelInfo => Kernel
}

/// The execution status of a command identified by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CommandExecutionStatus {
    Complete = 0,
    Running = 1,
    Submitted = 2,
    Queued = 3,
}

impl FromPrimitive for CommandExecutionStatus {
    fn from_i64(code: i64) -> Option<CommandExecutionStatus> {
        match code {
            0 => Some(CommandExecutionStatus::Complete),
            1 => Some(CommandExecutionStatus::Running),
            2 => Some(CommandExecutionStatus::Submitted),
            3 => Some(CommandExecutionStatus::Queued),
            _ => None,
        }
    }

    fn from_u64(code: u64) -> Option<CommandExecutionStatus> {
        CommandExecutionStatus::from_i64(code as i64)
    }
}
