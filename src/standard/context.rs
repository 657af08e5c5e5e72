//! The context wrapper and its builder.

use std::sync::Arc;

use crate::driver::Handle;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::standard::{Device, DeviceSpecifier, Platform};
use crate::types::{ContextInfo, Kind};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_context`.
///
/// The wrapper holds its devices as dependencies, so a context keeps the
/// wrappers of the devices it was created over alive.
#[derive(Debug, Clone)]
pub struct Context {
    obj: Arc<Obj>,
}

impl Context {
    pub(crate) fn from_obj(obj: Arc<Obj>) -> Context {
        Context { obj }
    }

    pub fn builder(reg: &Registry) -> ContextBuilder {
        ContextBuilder::new(reg.clone())
    }

    /// Creates a context over the given devices.
    ///
    /// The platform, derived from the first device, is held as a
    /// dependency alongside the devices so its wrapper outlives any
    /// external references.
    pub fn from_devices(reg: &Registry, devices: &[Device]) -> Result<Context> {
        if devices.is_empty() {
            return Err(Error::Args("context device list must be non-empty"));
        }
        let platform = devices[0].platform()?;
        let handles: Vec<Handle> = devices.iter().map(|d| d.handle()).collect();
        let raw = reg.driver().create_context(&handles)?;
        let mut deps: Vec<Arc<Obj>> = devices.iter().map(|d| d.obj().clone()).collect();
        deps.push(platform.obj().clone());
        Ok(Context::from_obj(reg.adopt(Kind::Context, raw, deps, None)?))
    }

    /// Creates a context from raw device handles, wrapping each first.
    ///
    /// Wrapping stops at the first invalid handle; devices wrapped up to
    /// that point are torn down normally by their drops.
    pub fn from_device_handles(reg: &Registry, handles: &[Handle]) -> Result<Context> {
        let mut devices = Vec::with_capacity(handles.len());
        for &handle in handles {
            devices.push(Device::from_raw(reg, handle)?);
        }
        Context::from_devices(reg, &devices)
    }

    /// The context's devices, resolved through the native query so an
    /// externally created context reports correctly.
    pub fn devices(&self) -> Result<Vec<Device>> {
        let reg = self.registry().clone();
        let raws = self.info_vec::<usize, _>(ContextInfo::Devices)?;
        raws.into_iter()
            .map(|raw| Device::from_raw(&reg, Handle::from_raw(raw)))
            .collect()
    }

    pub fn num_devices(&self) -> Result<u32> {
        self.info_scalar(ContextInfo::NumDevices)
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(ContextInfo::ReferenceCount)
    }

    /// The platform of the context's devices. Answered from the held
    /// dependency when present, falling back to the first device's
    /// platform attribute for externally created contexts.
    pub fn platform(&self) -> Result<Platform> {
        if let Some(obj) = self.obj.dep_of_kind(Kind::Platform) {
            return Ok(Platform::from_obj(obj));
        }
        self.devices()?.first().ok_or(Error::DeviceNotFound)?.platform()
    }
}

impl Wrapper for Context {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}

/// Builds a [`Context`] from a platform and a device selection.
#[derive(Debug)]
pub struct ContextBuilder {
    reg: Registry,
    platform: Option<Platform>,
    spec: DeviceSpecifier,
}

impl ContextBuilder {
    pub fn new(reg: Registry) -> ContextBuilder {
        ContextBuilder { reg, platform: None, spec: DeviceSpecifier::default() }
    }

    pub fn platform(mut self, platform: Platform) -> ContextBuilder {
        self.platform = Some(platform);
        self
    }

    pub fn devices<S: Into<DeviceSpecifier>>(mut self, spec: S) -> ContextBuilder {
        self.spec = spec.into();
        self
    }

    pub fn build(self) -> Result<Context> {
        let platform = match self.platform {
            Some(p) => p,
            None => Platform::first(&self.reg)?,
        };
        let devices = self.spec.to_device_list(&platform)?;
        if devices.is_empty() {
            return Err(Error::DeviceNotFound);
        }
        Context::from_devices(&self.reg, &devices)
    }
}
