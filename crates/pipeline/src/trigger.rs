use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use imagecast_backend::FunctionInvoker;

/// Invokes a fixed external function with a static payload.
pub struct ExternalTrigger {
    invoker: Arc<dyn FunctionInvoker>,
    function_name: String,
    payload: serde_json::Value,
    timeout: Duration,
}

impl ExternalTrigger {
    pub fn new(
        invoker: Arc<dyn FunctionInvoker>,
        function_name: impl Into<String>,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Self {
        Self {
            invoker,
            function_name: function_name.into(),
            payload,
            timeout,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Invoke the function once and describe the result.
    ///
    /// Never fails: timeouts, transport errors and function errors are all
    /// rendered into the returned text.
    #[instrument(skip(self), fields(function = %self.function_name))]
    pub async fn trigger(&self) -> String {
        let name = &self.function_name;
        let result =
            tokio::time::timeout(self.timeout, self.invoker.invoke(name, &self.payload)).await;

        match result {
            Err(_elapsed) => {
                warn!(timeout = ?self.timeout, "function invocation timed out");
                format!(
                    "Function '{name}' timed out after {} ms",
                    self.timeout.as_millis()
                )
            }
            Ok(Err(e)) => {
                warn!(error = %e, "function invocation failed");
                format!("Function '{name}' could not be invoked: {e}")
            }
            Ok(Ok(response)) => {
                let payload = response.payload.as_deref().unwrap_or("");
                if let Some(function_error) = &response.function_error {
                    warn!(
                        status_code = response.status_code,
                        function_error = %function_error,
                        "function reported an error"
                    );
                    format!("Function '{name}' failed ({function_error}): {payload}")
                } else if response.succeeded() {
                    info!(status_code = response.status_code, "function invoked");
                    format!(
                        "Function '{name}' returned status {}: {payload}",
                        response.status_code
                    )
                } else {
                    warn!(status_code = response.status_code, "function returned an error status");
                    format!(
                        "Function '{name}' failed with status {}: {payload}",
                        response.status_code
                    )
                }
            }
        }
    }
}
