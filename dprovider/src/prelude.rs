//! Common `dprovider` imports for downstream crates.

pub use crate::{
    BoxedEventStream, Credential, CredentialPool, LazyProviderClient, ModelEventStream,
    ModelResponse, NoopOperationHooks, ProviderClient, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, RateLimits, RateMonitor, RateStats,
    RetryPolicy, Role, StopReason, StreamEvent, TokenUsage, Turn, TurnRequest, parse_key_list,
};
pub use dcommon::{BoxFuture, GenerationOptions};
