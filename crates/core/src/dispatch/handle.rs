use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tollgate_domain::{ApiResponse, Result, TollgateError};
use uuid::Uuid;

/// Future resolving to the terminal outcome of a submitted request
///
/// Dropping the handle does not cancel the request; its outcome is still
/// recorded in the metrics and then discarded. If the dispatcher goes away
/// without answering, the handle resolves to [`TollgateError::Shutdown`].
#[derive(Debug)]
#[must_use = "a response handle does nothing unless awaited"]
pub struct ResponseHandle {
    request_id: Uuid,
    receiver: oneshot::Receiver<Result<ApiResponse>>,
}

impl ResponseHandle {
    pub(crate) fn new(request_id: Uuid, receiver: oneshot::Receiver<Result<ApiResponse>>) -> Self {
        Self { request_id, receiver }
    }

    /// Id of the request this handle answers for
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

impl Future for ResponseHandle {
    type Output = Result<ApiResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TollgateError::Shutdown)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_resolves_with_reply() {
        let (tx, rx) = oneshot::channel();
        let handle = ResponseHandle::new(Uuid::new_v4(), rx);
        tx.send(Ok(ApiResponse::new(204))).unwrap();

        let response = handle.await.unwrap();
        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn test_dropped_sender_maps_to_shutdown() {
        let (tx, rx) = oneshot::channel::<Result<ApiResponse>>();
        let id = Uuid::new_v4();
        let handle = ResponseHandle::new(id, rx);
        assert_eq!(handle.request_id(), id);
        drop(tx);

        assert_eq!(handle.await.unwrap_err(), TollgateError::Shutdown);
    }
}
