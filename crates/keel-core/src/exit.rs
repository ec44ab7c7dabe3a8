//! Exit codes reported to the supervising process.

use std::fmt;

/// Exit codes the framework reports to its supervisor.
///
/// The values are a contract with external supervisors and must not change.
/// On Unix the wider values truncate to a single byte at the OS boundary;
/// the in-process representation keeps the full value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// The application ran to completion.
    Success = 200,
    /// A failure escaped the business logic and was intercepted at the run
    /// boundary.
    UncaughtException = 666,
    /// A lifecycle-control operation failed.
    GenericFailure = 1,
}

impl ExitCode {
    /// Numeric value handed to `std::process::exit`.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Maps a raw code back into the closed set. Unknown codes are not
    /// representable.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            200 => Some(Self::Success),
            666 => Some(Self::UncaughtException),
            1 => Some(Self::GenericFailure),
            _ => None,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::UncaughtException => "uncaught_exception",
            Self::GenericFailure => "generic_failure",
        };
        write!(f, "{}", name)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.code()
    }
}
