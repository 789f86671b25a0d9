use serde::{Deserialize, Serialize};

/// Result of a synchronous external function invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Transport-level status code reported by the function service.
    pub status_code: i32,
    /// Raw response payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Set when the function itself raised an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_error: Option<String>,
}

impl FunctionResponse {
    pub fn ok(status_code: i32, payload: Option<String>) -> Self {
        Self {
            status_code,
            payload,
            function_error: None,
        }
    }

    /// Whether the invocation completed without a function error.
    pub fn succeeded(&self) -> bool {
        self.function_error.is_none() && (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_2xx_and_no_function_error() {
        assert!(FunctionResponse::ok(200, None).succeeded());
        assert!(!FunctionResponse::ok(500, None).succeeded());
        let failed = FunctionResponse {
            status_code: 200,
            payload: None,
            function_error: Some("Unhandled".into()),
        };
        assert!(!failed.succeeded());
    }
}
