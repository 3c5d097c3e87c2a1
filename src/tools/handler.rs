use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::descriptor::CapabilitySpec;
use crate::error::HandlerError;

/// A capability the router can dispatch to. One implementation per capability.
///
/// `spec()` is the hand-written declaration the model sees; `Args` is the
/// typed shape the model's arguments are decoded into before `call` runs.
/// The two must agree: every parameter without a default in `spec()` should
/// be a non-optional field of `Args`.
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    type Args: DeserializeOwned + Send + 'static;

    fn spec(&self) -> CapabilitySpec;

    async fn call(&self, args: Self::Args) -> Result<String, HandlerError>;
}

pub(crate) type PendingCall = Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send>>;

/// Object-safe view of a `Capability`, so the registry can hold a mix of them.
pub(crate) trait ErasedCapability: Send + Sync {
    /// Decode arguments into the handler's typed shape. On success returns
    /// the not-yet-started call.
    fn prepare(self: Arc<Self>, args: Value) -> Result<PendingCall, String>;
}

pub(crate) struct Typed<C>(pub C);

impl<C: Capability> ErasedCapability for Typed<C> {
    fn prepare(self: Arc<Self>, args: Value) -> Result<PendingCall, String> {
        let args: C::Args = serde_json::from_value(args).map_err(|e| e.to_string())?;
        Ok(Box::pin(async move { self.0.call(args).await }))
    }
}

/// A registered capability: its declaration plus its handler.
#[derive(Clone)]
pub struct RegisteredCapability {
    pub spec: CapabilitySpec,
    pub(crate) handler: Arc<dyn ErasedCapability>,
}

impl RegisteredCapability {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

impl std::fmt::Debug for RegisteredCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCapability")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
