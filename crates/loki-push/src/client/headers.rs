pub const SCOPE_ORG_ID: &str = "x-scope-orgid";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const USER_AGENT_VALUE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub const PUSH_PATH: &str = "/loki/api/v1/push";
pub const DEFAULT_TENANT: &str = "tenant1";
