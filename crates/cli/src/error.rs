//! Process exit codes for scripting and automation.
//!
//! A health check is usually driven by something that only reads the
//! exit status, so the codes distinguish "the cluster is unhealthy"
//! from "the tool could not run".

/// Structured exit codes for clusterhc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Every executed check succeeded, was informational, or was skipped.
    Success = 0,

    /// At least one check failed or errored — the cluster needs a look.
    ChecksFailed = 1,

    /// Configuration or usage error; nothing was checked.
    ConfigError = 2,

    /// The control-plane API was unreachable before the run started.
    ConnectionError = 3,

    /// Interrupted by SIGINT (Unix convention: 128 + 2).
    Interrupted = 130,
}

impl ExitCode {
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_documented_contract() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::ChecksFailed.as_i32(), 1);
        assert_eq!(ExitCode::ConfigError.as_i32(), 2);
        assert_eq!(ExitCode::ConnectionError.as_i32(), 3);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }
}
