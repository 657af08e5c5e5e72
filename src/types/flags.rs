//! Bitfield types matching the native `cl_bitfield` parameter values.

use bitflags::bitflags;

bitflags! {
    /// cl_device_type
    pub struct DeviceType: u64 {
        const DEFAULT = 1;
        const CPU = 1 << 1;
        const GPU = 1 << 2;
        const ACCELERATOR = 1 << 3;
        const CUSTOM = 1 << 4;
        const ALL = 0xFFFF_FFFF;
    }
}

impl Default for DeviceType {
    fn default() -> DeviceType {
        DeviceType::ALL
    }
}

bitflags! {
    /// cl_mem_flags
    pub struct MemFlags: u64 {
        const READ_WRITE = 1;
        const WRITE_ONLY = 1 << 1;
        const READ_ONLY = 1 << 2;
        const USE_HOST_PTR = 1 << 3;
        const ALLOC_HOST_PTR = 1 << 4;
        const COPY_HOST_PTR = 1 << 5;
        const HOST_WRITE_ONLY = 1 << 7;
        const HOST_READ_ONLY = 1 << 8;
        const HOST_NO_ACCESS = 1 << 9;
    }
}

impl Default for MemFlags {
    fn default() -> MemFlags {
        MemFlags::READ_WRITE
    }
}

bitflags! {
    /// cl_map_flags
    pub struct MapFlags: u64 {
        const READ = 1;
        const WRITE = 1 << 1;
        const WRITE_INVALIDATE_REGION = 1 << 2;
    }
}

impl MapFlags {
    /// Whether an unmap of a mapping created with these flags must write
    /// host-side modifications back to the native resource.
    pub fn writes_back(self) -> bool {
        self.intersects(MapFlags::WRITE | MapFlags::WRITE_INVALIDATE_REGION)
    }
}

bitflags! {
    /// cl_command_queue_properties
    pub struct QueueProperties: u64 {
        const OUT_OF_ORDER_EXEC_MODE_ENABLE = 1;
        const PROFILING_ENABLE = 1 << 1;
    }
}

impl Default for QueueProperties {
    fn default() -> QueueProperties {
        QueueProperties::empty()
    }
}
