use std::fmt;
use std::str::FromStr;

use crate::error::HttpError;

/// Protocol version named on a request or status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
    Http2,
    Http3,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::Http2 => "HTTP/2",
            Version::Http3 => "HTTP/3",
        }
    }

    /// Parses the `major[.minor]` token that follows `HTTP/`.
    pub fn from_token(token: &str) -> Result<Self, HttpError> {
        match token {
            "1.0" => Ok(Version::Http10),
            "1.1" => Ok(Version::Http11),
            "2" | "2.0" => Ok(Version::Http2),
            "3" | "3.0" => Ok(Version::Http3),
            _ => Err(HttpError::MalformedResponse),
        }
    }
}

impl FromStr for Version {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("HTTP/")
            .ok_or(HttpError::MalformedResponse)
            .and_then(Version::from_token)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
