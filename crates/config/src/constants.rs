//! Shared configuration defaults.

/// Port the control-plane REST API listens on when the configured host
/// string carries no explicit port.
pub const DEFAULT_API_PORT: u16 = 9443;

/// HTTP request timeout for API calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on a single remote command, connection setup included.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// TCP connection timeout handed to the ssh transport.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default login user for remote command execution.
pub const DEFAULT_SSH_USER: &str = "root";

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "clusterhc.json";
