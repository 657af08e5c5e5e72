//! The platform wrapper.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result, Status};
use crate::registry::Registry;
use crate::standard::Device;
use crate::types::{DeviceType, Kind, PlatformInfo};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_platform_id`.
///
/// Platforms are root objects: the native API does not reference count
/// them, so wrapper lifetime is purely host-side bookkeeping.
#[derive(Debug, Clone)]
pub struct Platform {
    obj: Arc<Obj>,
}

impl Platform {
    pub(crate) fn from_obj(obj: Arc<Obj>) -> Platform {
        Platform { obj }
    }

    /// All platforms the driver reports.
    pub fn list(reg: &Registry) -> Result<Vec<Platform>> {
        let ids = reg.driver().platform_ids()?;
        ids.into_iter()
            .map(|id| Ok(Platform::from_obj(reg.adopt(Kind::Platform, id, Vec::new(), None)?)))
            .collect()
    }

    /// The first available platform.
    pub fn first(reg: &Registry) -> Result<Platform> {
        Platform::list(reg)?.into_iter().next().ok_or(Error::PlatformNotFound)
    }

    /// Devices of the given type on this platform. An empty list, not an
    /// error, when none match.
    pub fn devices(&self, devtype: DeviceType) -> Result<Vec<Device>> {
        let reg = self.registry().clone();
        let ids = match reg.driver().device_ids(self.handle(), devtype) {
            Ok(ids) => ids,
            Err(ref err) if err.api_status() == Some(Status::CL_DEVICE_NOT_FOUND) => Vec::new(),
            Err(err) => return Err(err),
        };
        ids.into_iter()
            .map(|id| Ok(Device::from_obj(reg.adopt(Kind::Device, id, Vec::new(), None)?)))
            .collect()
    }

    pub fn name(&self) -> Result<String> {
        self.info_string(PlatformInfo::Name)
    }

    pub fn vendor(&self) -> Result<String> {
        self.info_string(PlatformInfo::Vendor)
    }

    pub fn version(&self) -> Result<String> {
        self.info_string(PlatformInfo::Version)
    }

    pub fn profile(&self) -> Result<String> {
        self.info_string(PlatformInfo::Profile)
    }

    pub fn extensions(&self) -> Result<Vec<String>> {
        let raw = self.info_string(PlatformInfo::Extensions)?;
        Ok(raw.split_whitespace().map(str::to_string).collect())
    }
}

impl Wrapper for Platform {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.name(), self.version()) {
            (Ok(name), Ok(version)) => write!(f, "{} ({})", name, version),
            _ => write!(f, "{:?}", self.handle()),
        }
    }
}
