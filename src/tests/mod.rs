//! Test support: a registry over the simulated driver plus a ready-made
//! context/device/queue environment.

mod buffer_ops;
mod context;
mod event_wait;
mod image_ops;
mod info_cache;
mod program_kernel;
mod ref_count;
mod registry;

use std::sync::Arc;

use crate::{
    Context, Device, DeviceSpecifier, Queue, QueueProperties, Registry, SimDriver,
};

pub(crate) fn sim_registry() -> (Registry, Arc<SimDriver>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let driver = Arc::new(SimDriver::new());
    (Registry::new(driver.clone()), driver)
}

pub(crate) struct Env {
    pub context: Context,
    pub device: Device,
    pub queue: Queue,
}

pub(crate) fn env(reg: &Registry) -> Env {
    let context = Context::builder(reg)
        .devices(DeviceSpecifier::First)
        .build()
        .unwrap();
    let device = context.devices().unwrap().remove(0);
    let queue = Queue::new(&context, &device, QueueProperties::empty()).unwrap();
    Env { context, device, queue }
}
