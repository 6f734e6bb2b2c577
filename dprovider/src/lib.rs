//! Provider clients, credential pools, and rate observation for duochat.
//!
//! Everything here is transport-level: a [`ProviderClient`] opens one stream
//! per call and never retries. Retry, rotation, and failover decisions live in
//! the chat layer, which drives these types.
//!
//! ```rust
//! use dprovider::{CredentialPool, ProviderId, RateMonitor};
//!
//! let pool = CredentialPool::with_cursor(ProviderId::Gemini, ["key-one", "key-two"], 0)
//!     .expect("pool should build");
//! assert!(pool.rotate());
//!
//! let monitor = RateMonitor::default();
//! monitor.record(10, 20);
//! assert_eq!(monitor.stats().token_count, 30);
//! ```

mod credentials;
mod error;
mod model;
mod provider;
mod rate;
mod resilience;
mod stream;

pub mod adapters;
pub mod prelude;

pub use credentials::{Credential, CredentialPool, SecretString, parse_key_list};
pub use error::{ProviderError, ProviderErrorKind};
pub use model::{ModelResponse, ProviderId, Role, StopReason, TokenUsage, Turn, TurnRequest};
pub use provider::{LazyProviderClient, ProviderClient, ProviderFuture};
pub use rate::{RateLimits, RateMonitor, RateStats};
pub use resilience::{NoopOperationHooks, ProviderOperationHooks, RetryPolicy};
pub use stream::{BoxedEventStream, ModelEventStream, StreamEvent, VecEventStream};

pub use dcommon::{BoxFuture, GenerationOptions};
