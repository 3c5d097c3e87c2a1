pub mod descriptor;
pub mod dispatch;
pub mod handler;
pub mod registry;

pub use descriptor::{synthesize, CapabilitySpec, ParamSpec, ParamType, ToolDescriptor};
pub use dispatch::DispatchExecutor;
pub use handler::{Capability, RegisteredCapability};
pub use registry::CapabilityRegistry;
