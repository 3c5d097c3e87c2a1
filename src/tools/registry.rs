use std::sync::Arc;

use tracing::debug;

use super::descriptor::{synthesize, ToolDescriptor};
use super::handler::{Capability, RegisteredCapability, Typed};
use crate::error::RegistrationError;

/// Catalog of capabilities, fixed at startup. Registration order is the
/// order descriptors are presented to the model.
///
/// Never mutated once requests are being served, so it can be shared behind
/// an `Arc` without locking.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<RegisteredCapability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: Vec::new(),
        }
    }

    /// Register a capability. Rejects duplicate names and malformed specs.
    pub fn register(&mut self, capability: impl Capability) -> Result<(), RegistrationError> {
        let spec = capability.spec();
        spec.validate()?;
        if self.lookup(&spec.name).is_some() {
            return Err(RegistrationError::DuplicateName(spec.name));
        }
        debug!(capability = %spec.name, params = spec.params.len(), "registered capability");
        self.capabilities.push(RegisteredCapability {
            spec,
            handler: Arc::new(Typed(capability)),
        });
        Ok(())
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with(mut self, capability: impl Capability) -> Result<Self, RegistrationError> {
        self.register(capability)?;
        Ok(self)
    }

    /// All capabilities, in registration order.
    pub fn all(&self) -> &[RegisteredCapability] {
        &self.capabilities
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredCapability> {
        self.capabilities.iter().find(|c| c.spec.name == name)
    }

    /// Descriptors for every capability, recomputed on each call.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.capabilities.iter().map(|c| synthesize(&c.spec)).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.spec.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }
}
