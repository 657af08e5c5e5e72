//! The device wrapper and the device-selection vocabulary.

use std::sync::Arc;

use crate::driver::Handle;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::standard::Platform;
use crate::types::{DeviceInfo, DeviceType, Kind};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_device_id`.
///
/// Root devices are not reference counted natively; like platforms they
/// exist for the lifetime of the runtime.
#[derive(Debug, Clone)]
pub struct Device {
    obj: Arc<Obj>,
}

impl Device {
    pub(crate) fn from_obj(obj: Arc<Obj>) -> Device {
        Device { obj }
    }

    /// Wraps a raw device handle. Fails on a null handle.
    pub fn from_raw(reg: &Registry, handle: Handle) -> Result<Device> {
        Ok(Device::from_obj(reg.adopt_retained(Kind::Device, handle, Vec::new(), None)?))
    }

    pub fn name(&self) -> Result<String> {
        self.info_string(DeviceInfo::Name)
    }

    pub fn vendor(&self) -> Result<String> {
        self.info_string(DeviceInfo::Vendor)
    }

    pub fn version(&self) -> Result<String> {
        self.info_string(DeviceInfo::Version)
    }

    pub fn device_type(&self) -> Result<DeviceType> {
        let bits = self.info_scalar::<u64, _>(DeviceInfo::Type)?;
        Ok(DeviceType::from_bits_truncate(bits))
    }

    pub fn vendor_id(&self) -> Result<u32> {
        self.info_scalar(DeviceInfo::VendorId)
    }

    pub fn max_compute_units(&self) -> Result<u32> {
        self.info_scalar(DeviceInfo::MaxComputeUnits)
    }

    pub fn image_support(&self) -> Result<bool> {
        Ok(self.info_scalar::<u32, _>(DeviceInfo::ImageSupport)? != 0)
    }

    pub fn extensions(&self) -> Result<Vec<String>> {
        let raw = self.info_string(DeviceInfo::Extensions)?;
        Ok(raw.split_whitespace().map(str::to_string).collect())
    }

    /// The platform this device belongs to, wrapped through the registry
    /// so repeated calls hand back the same wrapper object.
    pub fn platform(&self) -> Result<Platform> {
        let raw = self.info_scalar::<usize, _>(DeviceInfo::Platform)?;
        let obj = self.registry().adopt_retained(
            Kind::Platform,
            Handle::from_raw(raw),
            Vec::new(),
            None,
        )?;
        Ok(Platform::from_obj(obj))
    }
}

impl Wrapper for Device {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

/// Specifies how a set of devices is chosen from a platform.
#[derive(Debug, Clone)]
pub enum DeviceSpecifier {
    /// Every device on the platform.
    All,
    /// The first device reported.
    First,
    /// The device at the given enumeration index.
    Single(usize),
    /// Devices at the given indices, in order. Out-of-range indices fail.
    Indices(Vec<usize>),
    /// Like `Indices` but wrapping around the device count.
    WrappingIndices(Vec<usize>),
    /// Devices matching a type mask.
    TypeFlags(DeviceType),
    /// Devices whose name contains the given substring, case-insensitive.
    NameContains(String),
}

impl DeviceSpecifier {
    /// Resolves the specifier against a platform.
    ///
    /// Selections that name a particular device (`First`, `Single`,
    /// `Indices`) fail with `DeviceNotFound` when they cannot be
    /// satisfied; filter selections yield an empty list instead.
    pub fn to_device_list(&self, platform: &Platform) -> Result<Vec<Device>> {
        let all = platform.devices(DeviceType::ALL)?;
        match *self {
            DeviceSpecifier::All => Ok(all),
            DeviceSpecifier::First => {
                all.into_iter().next().map(|d| vec![d]).ok_or(Error::DeviceNotFound)
            }
            DeviceSpecifier::Single(idx) => {
                all.into_iter().nth(idx).map(|d| vec![d]).ok_or(Error::DeviceNotFound)
            }
            DeviceSpecifier::Indices(ref idxs) => idxs
                .iter()
                .map(|&i| all.get(i).cloned().ok_or(Error::DeviceNotFound))
                .collect(),
            DeviceSpecifier::WrappingIndices(ref idxs) => {
                if all.is_empty() {
                    return Err(Error::DeviceNotFound);
                }
                Ok(idxs.iter().map(|&i| all[i % all.len()].clone()).collect())
            }
            DeviceSpecifier::TypeFlags(devtype) => platform.devices(devtype),
            DeviceSpecifier::NameContains(ref needle) => {
                let needle = needle.to_lowercase();
                let mut matched = Vec::new();
                for dev in all {
                    if dev.name()?.to_lowercase().contains(&needle) {
                        matched.push(dev);
                    }
                }
                Ok(matched)
            }
        }
    }
}

impl Default for DeviceSpecifier {
    fn default() -> DeviceSpecifier {
        DeviceSpecifier::All
    }
}

impl From<DeviceType> for DeviceSpecifier {
    fn from(devtype: DeviceType) -> DeviceSpecifier {
        DeviceSpecifier::TypeFlags(devtype)
    }
}
