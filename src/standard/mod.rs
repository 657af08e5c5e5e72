//! Typed wrappers over the native object families.

mod buffer;
mod context;
mod device;
mod event;
mod image;
mod kernel;
mod platform;
mod program;
mod queue;

pub use self::buffer::{Buffer, MemMap};
pub use self::context::{Context, ContextBuilder};
pub use self::device::{Device, DeviceSpecifier};
pub use self::event::{Event, EventList};
pub use self::image::{Image, ImageMap};
pub use self::kernel::Kernel;
pub use self::platform::Platform;
pub use self::program::Program;
pub use self::queue::Queue;
