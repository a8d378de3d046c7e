pub const DEFAULT_BASE_URL: &str = "ws://127.0.0.1:8080";
pub const DEFAULT_CHANNEL: &str = "default";
pub const DEFAULT_CAPACITY: usize = 1024;
