/// STOMP protocol versions offered in the CONNECT frame
pub const STOMP_ACCEPT_VERSION: &str = "1.2";

/// Delay before reconnecting a dropped live connection, in milliseconds
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// Heartbeat interval offered in both directions, in milliseconds
pub const DEFAULT_HEARTBEAT_MS: u64 = 4_000;

/// Capacity of the per-view event inbox
pub const DEFAULT_INBOX_CAPACITY: usize = 256;

/// Maximum number of locally written ids remembered for echo suppression
pub const DEFAULT_ECHO_CAPACITY: usize = 1_024;

/// Default REST API base URL (local development)
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Default STOMP-over-WebSocket endpoint (local development)
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

/// Default REST request timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default page size for paginated list endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest inbound frame accepted from the broker (256 KiB)
pub const MAX_FRAME_SIZE: usize = 262_144;
