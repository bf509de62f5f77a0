use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Debug)]
pub enum PeripheralEvent {
    StateUpdate {
        state: ManagerState,
    },
    CharacteristicSubscriptionUpdate {
        request: PeripheralRequest,
        subscribed: bool,
    },
    ReadRequest {
        pending: PendingRead,
    },
}

/// Hardware state as reported by the BLE stack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ManagerState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralRequest {
    pub client: String,
    pub service: Uuid,
    pub characteristic: Uuid,
}

#[derive(Debug, PartialEq)]
pub struct ReadRequestResponse {
    pub value: Vec<u8>,
    pub response: RequestResponse,
}

impl ReadRequestResponse {
    pub fn success(value: Vec<u8>) -> Self {
        Self {
            value,
            response: RequestResponse::Success,
        }
    }

    pub fn failure(response: RequestResponse) -> Self {
        Self {
            value: Vec::new(),
            response,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestResponse {
    Success,
    InvalidHandle,
    RequestNotSupported,
    InvalidOffset,
    UnlikelyError,
}

/// An inbound read waiting for its answer.
///
/// `respond` consumes the request, so it can be answered at most once. A
/// request dropped without an answer replies `UnlikelyError` on its way out,
/// so the client is never left without a response either.
#[derive(Debug)]
pub struct PendingRead {
    pub request: PeripheralRequest,
    pub offset: u64,
    responder: Option<oneshot::Sender<ReadRequestResponse>>,
}

impl PendingRead {
    pub fn new(
        request: PeripheralRequest,
        offset: u64,
    ) -> (Self, oneshot::Receiver<ReadRequestResponse>) {
        let (responder, receiver) = oneshot::channel();
        let pending = Self {
            request,
            offset,
            responder: Some(responder),
        };
        (pending, receiver)
    }

    pub fn characteristic(&self) -> Uuid {
        self.request.characteristic
    }

    pub fn respond(mut self, response: ReadRequestResponse) {
        if let Some(responder) = self.responder.take() {
            if responder.send(response).is_err() {
                log::debug!(
                    "Read response for {} dropped, requester went away",
                    self.request.characteristic
                );
            }
        }
    }
}

impl Drop for PendingRead {
    fn drop(&mut self) {
        if let Some(responder) = self.responder.take() {
            log::warn!(
                "Read request for {} dropped without a response",
                self.request.characteristic
            );
            let _ = responder.send(ReadRequestResponse::failure(RequestResponse::UnlikelyError));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PeripheralRequest {
        PeripheralRequest {
            client: "central-a".to_string(),
            service: Uuid::from_u128(1),
            characteristic: Uuid::from_u128(2),
        }
    }

    #[tokio::test]
    async fn respond_delivers_exactly_one_response() {
        let (pending, mut receiver) = PendingRead::new(request(), 0);
        pending.respond(ReadRequestResponse::success(b"42".to_vec()));

        let response = (&mut receiver).await.unwrap();
        assert_eq!(response, ReadRequestResponse::success(b"42".to_vec()));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_request_answers_with_failure() {
        let (pending, receiver) = PendingRead::new(request(), 0);
        drop(pending);

        let response = receiver.await.unwrap();
        assert_eq!(response.response, RequestResponse::UnlikelyError);
        assert!(response.value.is_empty());
    }
}
