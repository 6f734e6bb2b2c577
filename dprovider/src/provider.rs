use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{BoxedEventStream, ProviderError, ProviderId, TurnRequest};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A streaming chat backend.
///
/// One call opens one stream. Implementations never retry: errors surface as
/// either the outer `Err` (request rejected before streaming) or an `Err`
/// item inside the stream.
pub trait ProviderClient: Send + Sync {
    fn id(&self) -> ProviderId;

    fn default_model(&self) -> &str {
        self.id().default_model()
    }

    fn stream_turn<'a>(
        &'a self,
        request: TurnRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>>;
}

type ClientInit = Box<dyn Fn() -> Result<Arc<dyn ProviderClient>, ProviderError> + Send + Sync>;

/// Defers building a client until its first request.
///
/// Construction failures are returned from that request and retried on the
/// next one; a successful client is kept for the life of this value.
pub struct LazyProviderClient {
    id: ProviderId,
    init: ClientInit,
    cell: OnceCell<Arc<dyn ProviderClient>>,
}

impl LazyProviderClient {
    pub fn new<F>(id: ProviderId, init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ProviderClient>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            id,
            init: Box::new(init),
            cell: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    async fn client(&self) -> Result<&Arc<dyn ProviderClient>, ProviderError> {
        self.cell
            .get_or_try_init(|| async { (self.init)() })
            .await
    }
}

impl std::fmt::Debug for LazyProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProviderClient")
            .field("id", &self.id)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl ProviderClient for LazyProviderClient {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn stream_turn<'a>(
        &'a self,
        request: TurnRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let client = self.client().await?;
            client.stream_turn(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::StreamExt;

    use super::*;
    use crate::{StreamEvent, VecEventStream};

    struct EchoClient;

    impl ProviderClient for EchoClient {
        fn id(&self) -> ProviderId {
            ProviderId::DeepSeek
        }

        fn stream_turn<'a>(
            &'a self,
            request: TurnRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            Box::pin(async move {
                let stream: BoxedEventStream<'a> = Box::pin(VecEventStream::new(vec![Ok(
                    StreamEvent::TextDelta(request.user_text),
                )]));
                Ok(stream)
            })
        }
    }

    #[tokio::test]
    async fn lazy_client_builds_once_on_first_request() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let lazy = LazyProviderClient::new(ProviderId::DeepSeek, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EchoClient) as Arc<dyn ProviderClient>)
        });

        assert!(!lazy.is_initialized());
        assert_eq!(builds.load(Ordering::SeqCst), 0);

        for text in ["one", "two"] {
            let mut stream = lazy
                .stream_turn(TurnRequest::new("deepseek-chat", Vec::new(), text))
                .await
                .expect("stream should open");
            let first = stream.next().await.expect("event").expect("ok event");
            assert_eq!(first, StreamEvent::TextDelta(text.to_string()));
        }

        assert!(lazy.is_initialized());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(lazy.default_model(), "deepseek-chat");
    }

    #[tokio::test]
    async fn lazy_client_surfaces_init_failure_and_retries_later() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let lazy = LazyProviderClient::new(ProviderId::Zhipu, move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProviderError::transport("client build failed"))
            } else {
                Ok(Arc::new(EchoClient) as Arc<dyn ProviderClient>)
            }
        });

        let first = lazy
            .stream_turn(TurnRequest::new("glm-4.6", Vec::new(), "hi"))
            .await;
        assert!(first.is_err());
        assert!(!lazy.is_initialized());

        let second = lazy
            .stream_turn(TurnRequest::new("glm-4.6", Vec::new(), "hi"))
            .await;
        assert!(second.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }
}
