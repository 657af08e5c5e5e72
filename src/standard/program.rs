//! The program wrapper.

use std::sync::Arc;

use crate::driver::Handle;
use crate::error::{Error, Result};
use crate::standard::{Context, Device};
use crate::types::{Kind, ProgramInfo};
use crate::wrap::{Obj, Wrapper};

/// A wrapped `cl_program`. Holds its context as a dependency.
#[derive(Debug, Clone)]
pub struct Program {
    obj: Arc<Obj>,
}

impl Program {
    pub(crate) fn from_obj(obj: Arc<Obj>) -> Program {
        Program { obj }
    }

    /// Creates a program from OpenCL C source fragments.
    pub fn with_source(context: &Context, sources: &[&str]) -> Result<Program> {
        if sources.is_empty() {
            return Err(Error::Args("program source list must be non-empty"));
        }
        let reg = context.registry().clone();
        let raw = reg.driver().create_program_with_source(context.handle(), sources)?;
        let deps = vec![context.obj().clone()];
        Ok(Program { obj: reg.adopt(Kind::Program, raw, deps, None)? })
    }

    /// Builds for the given devices, or for every device of the program's
    /// context when the list is empty. Compile failures surface as
    /// `Error::ProgramBuild` carrying the build log.
    pub fn build(&self, devices: &[Device], options: &str) -> Result<()> {
        let handles: Vec<Handle> = devices.iter().map(|d| d.handle()).collect();
        self.registry().driver().build_program(self.handle(), &handles, options)
    }

    pub fn source(&self) -> Result<String> {
        self.info_string(ProgramInfo::Source)
    }

    pub fn num_devices(&self) -> Result<u32> {
        self.info_scalar(ProgramInfo::NumDevices)
    }

    pub fn devices(&self) -> Result<Vec<Device>> {
        let reg = self.registry().clone();
        let raws = self.info_vec::<usize, _>(ProgramInfo::Devices)?;
        raws.into_iter()
            .map(|raw| Device::from_raw(&reg, Handle::from_raw(raw)))
            .collect()
    }

    pub fn context(&self) -> Option<Context> {
        self.obj.dep_of_kind(Kind::Context).map(Context::from_obj)
    }

    /// The native reference count. Never cached.
    pub fn reference_count(&self) -> Result<u32> {
        self.info_scalar(ProgramInfo::ReferenceCount)
    }
}

impl Wrapper for Program {
    fn obj(&self) -> &Arc<Obj> {
        &self.obj
    }
}
