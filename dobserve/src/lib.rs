//! Observability hooks for provider attempts and chat turns.
//!
//! ```rust
//! use dobserve::{SafeChatHooks, SafeProviderHooks, TracingObservabilityHooks};
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _chat_hooks = SafeChatHooks::new(TracingObservabilityHooks);
//! ```

mod composite_hooks;
mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use composite_hooks::CompositeHooks;
pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeChatHooks, SafeProviderHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        CompositeHooks, MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks,
        TracingObservabilityHooks,
    };
}
