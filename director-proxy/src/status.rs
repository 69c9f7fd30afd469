//! gRPC status codes and the `grpc-status`/`grpc-message` trailer pair.
//!
//! `Status` carries only a code and a message, with no binary-details or
//! custom-metadata fields, since this proxy never originates rich status
//! details: it either forwards a backend's trailers byte-for-byte or
//! synthesizes a bare code+message pair of its own.

use std::fmt;

use director_core::error::{DirectorError, StatusCode};
use http::HeaderMap;

const GRPC_STATUS_HEADER: &str = "grpc-status";
const GRPC_MESSAGE_HEADER: &str = "grpc-message";

/// gRPC status codes, matching the [gRPC status code table].
///
/// [gRPC status code table]: https://github.com/grpc/grpc/blob/master/doc/statuscodes.md
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    pub fn from_i32(i: i32) -> Self {
        match i {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as i32)
    }
}

impl From<StatusCode> for Code {
    fn from(code: StatusCode) -> Self {
        match code {
            StatusCode::DataLoss => Code::DataLoss,
            StatusCode::Unimplemented => Code::Unimplemented,
            StatusCode::Unavailable => Code::Unavailable,
        }
    }
}

/// A bare gRPC status: a code plus a human-readable message, convertible
/// to and from the `grpc-status`/`grpc-message` trailer pair.
#[derive(Debug, Clone)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Builds the trailer map a response carries its status in.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(2);
        map.insert(
            GRPC_STATUS_HEADER,
            http::HeaderValue::from_str(&(self.code as i32).to_string())
                .expect("status code digits are always valid header bytes"),
        );
        if !self.message.is_empty() {
            if let Ok(value) = http::HeaderValue::from_str(&self.message) {
                map.insert(GRPC_MESSAGE_HEADER, value);
            }
        }
        map
    }

    /// Reads a status back out of a trailer map, if one is present. A
    /// response with no `grpc-status` trailer has no status to report
    /// (e.g. a plain streaming success with trailers supplied elsewhere).
    pub fn from_header_map(headers: &HeaderMap) -> Option<Self> {
        let code = headers
            .get(GRPC_STATUS_HEADER)?
            .to_str()
            .ok()?
            .parse::<i32>()
            .ok()?;
        let message = headers
            .get(GRPC_MESSAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Some(Self::new(Code::from_i32(code), message))
    }
}

impl From<DirectorError> for Status {
    fn from(err: DirectorError) -> Self {
        Status::new(Code::from(err.code()), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_header_map() {
        let status = Status::new(Code::Unavailable, "connection is not alive");
        let headers = status.to_header_map();
        let parsed = Status::from_header_map(&headers).unwrap();
        assert_eq!(parsed.code(), Code::Unavailable);
        assert_eq!(parsed.message(), "connection is not alive");
    }

    #[test]
    fn director_error_maps_to_matching_grpc_code() {
        let status: Status = DirectorError::UnknownEndpoint("x".into()).into();
        assert_eq!(status.code(), Code::Unimplemented);
        assert!(status.message().contains("unknown endpoint x"));
    }
}
