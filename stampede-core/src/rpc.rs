use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Canonical RPC status codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Status {
    /// Maps a numeric status code. Codes outside the canonical range are `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Ok,
            1 => Status::Cancelled,
            3 => Status::InvalidArgument,
            4 => Status::DeadlineExceeded,
            5 => Status::NotFound,
            6 => Status::AlreadyExists,
            7 => Status::PermissionDenied,
            8 => Status::ResourceExhausted,
            9 => Status::FailedPrecondition,
            10 => Status::Aborted,
            11 => Status::OutOfRange,
            12 => Status::Unimplemented,
            13 => Status::Internal,
            14 => Status::Unavailable,
            15 => Status::DataLoss,
            16 => Status::Unauthenticated,
            _ => Status::Unknown,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Cancelled => 1,
            Status::Unknown => 2,
            Status::InvalidArgument => 3,
            Status::DeadlineExceeded => 4,
            Status::NotFound => 5,
            Status::AlreadyExists => 6,
            Status::PermissionDenied => 7,
            Status::ResourceExhausted => 8,
            Status::FailedPrecondition => 9,
            Status::Aborted => 10,
            Status::OutOfRange => 11,
            Status::Unimplemented => 12,
            Status::Internal => 13,
            Status::Unavailable => 14,
            Status::DataLoss => 15,
            Status::Unauthenticated => 16,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::Cancelled => "CANCELLED",
            Status::Unknown => "UNKNOWN",
            Status::InvalidArgument => "INVALID_ARGUMENT",
            Status::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Status::NotFound => "NOT_FOUND",
            Status::AlreadyExists => "ALREADY_EXISTS",
            Status::PermissionDenied => "PERMISSION_DENIED",
            Status::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Status::FailedPrecondition => "FAILED_PRECONDITION",
            Status::Aborted => "ABORTED",
            Status::OutOfRange => "OUT_OF_RANGE",
            Status::Unimplemented => "UNIMPLEMENTED",
            Status::Internal => "INTERNAL",
            Status::Unavailable => "UNAVAILABLE",
            Status::DataLoss => "DATA_LOSS",
            Status::Unauthenticated => "UNAUTHENTICATED",
        };
        write!(f, "{name}")
    }
}

/// Outcome of a single `invoke`. Only feeds the aggregators; never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct InvocationResult {
    pub status: Status,
    pub message: String,
    pub latency: Duration,
}

impl InvocationResult {
    pub fn new(status: Status, message: impl Into<String>, latency: Duration) -> Self {
        Self {
            status,
            message: message.into(),
            latency,
        }
    }
}

/// Options handed to the client on `connect`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ConnectOptions {
    /// Connect without TLS.
    #[serde(default)]
    pub plaintext: bool,

    /// Give up on a connection attempt after this long. No limit when unset.
    #[serde(default, deserialize_with = "crate::config::human_duration_opt")]
    pub timeout: Option<Duration>,
}

/// A named assertion evaluated against every [`InvocationResult`] of a target.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Check {
    pub name: String,
    pub assert: Assertion,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    Status(Status),
    MessageContains(String),
    LatencyBelowMs(u64),
}

impl Check {
    pub fn new(name: &str, assert: Assertion) -> Self {
        Self {
            name: name.to_string(),
            assert,
        }
    }

    pub fn status_ok(name: &str) -> Self {
        Self::new(name, Assertion::Status(Status::Ok))
    }

    pub fn evaluate(&self, result: &InvocationResult) -> bool {
        match &self.assert {
            Assertion::Status(status) => result.status == *status,
            Assertion::MessageContains(needle) => result.message.contains(needle.as_str()),
            Assertion::LatencyBelowMs(ms) => result.latency < Duration::from_millis(*ms),
        }
    }
}
