use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use imagecast_backend::{BackendError, FunctionInvoker};
use imagecast_core::FunctionResponse;

/// In-memory [`FunctionInvoker`].
///
/// By default it echoes the request payload back with status 200. A fixed
/// response can be configured with [`with_response`](Self::with_response).
#[derive(Debug, Default)]
pub struct MemoryFunctionInvoker {
    response: Option<FunctionResponse>,
    invocations: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MemoryFunctionInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `response`.
    #[must_use]
    pub fn with_response(mut self, response: FunctionResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Function names and payloads received so far.
    pub async fn invocations(&self) -> Vec<(String, serde_json::Value)> {
        self.invocations.lock().await.clone()
    }
}

#[async_trait]
impl FunctionInvoker for MemoryFunctionInvoker {
    async fn invoke(
        &self,
        function: &str,
        payload: &serde_json::Value,
    ) -> Result<FunctionResponse, BackendError> {
        debug!(function, "memory function invoked");
        self.invocations
            .lock()
            .await
            .push((function.to_owned(), payload.clone()));

        if let Some(response) = &self.response {
            return Ok(response.clone());
        }
        Ok(FunctionResponse::ok(200, Some(serde_json::to_string(payload)?)))
    }
}
