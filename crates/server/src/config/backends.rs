use serde::Deserialize;

fn default_memory() -> String {
    "memory".to_owned()
}

/// Blob store backend (`"memory"` or `"s3"`).
#[derive(Debug, Deserialize)]
pub struct BlobConfig {
    #[serde(default = "default_memory")]
    pub backend: String,
    /// Use path-style S3 addressing (needed by most local emulators).
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_memory(),
            force_path_style: false,
        }
    }
}

/// Image catalog backend (`"memory"` or `"postgres"`).
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_memory")]
    pub backend: String,
    /// Connection URL. Required for `postgres`.
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// `disable`, `prefer`, `require`, `verify-ca` or `verify-full`.
    pub ssl_mode: Option<String>,
    pub ssl_root_cert: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: default_memory(),
            url: None,
            pool_size: default_pool_size(),
            schema: default_schema(),
            table_prefix: default_table_prefix(),
            ssl_mode: None,
            ssl_root_cert: None,
        }
    }
}

fn default_pool_size() -> u32 {
    5
}

fn default_schema() -> String {
    "public".to_owned()
}

fn default_table_prefix() -> String {
    "imagecast_".to_owned()
}

/// Upload notification queue backend (`"memory"` or `"sqs"`).
#[derive(Debug, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_memory")]
    pub backend: String,
    /// Queue URL. Required for `sqs`.
    pub url: Option<String>,
    /// Long-poll wait time for receives.
    pub wait_time_seconds: Option<i32>,
    /// Visibility timeout applied to received messages.
    pub visibility_timeout_seconds: Option<i32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_memory(),
            url: None,
            wait_time_seconds: None,
            visibility_timeout_seconds: None,
        }
    }
}

/// Notification topic backend (`"memory"` or `"sns"`).
#[derive(Debug, Deserialize)]
pub struct TopicConfig {
    #[serde(default = "default_memory")]
    pub backend: String,
    /// Topic ARN. Required for `sns`.
    pub arn: Option<String>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            backend: default_memory(),
            arn: None,
        }
    }
}

/// External function backend (`"memory"` or `"lambda"`).
#[derive(Debug, Deserialize)]
pub struct FunctionConfig {
    #[serde(default = "default_memory")]
    pub backend: String,
    /// Function name or ARN.
    #[serde(default = "default_function_name")]
    pub name: String,
    /// Optional version or alias.
    pub qualifier: Option<String>,
    /// Static payload sent on every trigger.
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
    /// Upper bound on a single invocation.
    #[serde(default = "default_function_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            backend: default_memory(),
            name: default_function_name(),
            qualifier: None,
            payload: default_payload(),
            timeout_seconds: default_function_timeout(),
        }
    }
}

fn default_function_name() -> String {
    "imagecast-trigger".to_owned()
}

fn default_payload() -> serde_json::Value {
    serde_json::json!({ "source": "imagecast" })
}

fn default_function_timeout() -> u64 {
    10
}
