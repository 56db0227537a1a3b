use std::io::{self, BufRead};

use tracing::trace;

use crate::error::{HttpError, Result, SocketError};

use super::response::{HttpResponse, StatusCode};
use super::version::Version;

/// Default limit on the size of a response head.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Parses a response head (status line and headers) from a buffered reader.
///
/// The reader is left positioned at the first body byte.
#[derive(Debug, Clone, Copy)]
pub struct ResponseParser {
    max_header_bytes: usize,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            max_header_bytes: MAX_HEADER_BYTES,
        }
    }

    pub fn with_limit(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }

    /// Parses one head into `response`. On failure `response` is unchanged.
    ///
    /// End of stream before the status line is `eof`; anything else that does
    /// not follow the grammar, including a head over the size limit, is
    /// `malformed_response`.
    pub fn parse<R: BufRead + ?Sized>(&self, reader: &mut R, response: &mut HttpResponse) -> Result<()> {
        let mut budget = self.max_header_bytes;

        let status_line = read_line(reader, &mut budget)?.ok_or(SocketError::Eof)?;
        let mut parsed = parse_status_line(&status_line)?;

        let mut last_name: Option<String> = None;
        loop {
            let line = read_line(reader, &mut budget)?.ok_or(HttpError::MalformedResponse)?;
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                // obsolete line folding continues the previous value
                let name = last_name.as_deref().ok_or(HttpError::MalformedResponse)?;
                let value = parsed
                    .headers_mut()
                    .last_mut(name)
                    .ok_or(HttpError::MalformedResponse)?;
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            let (name, value) = line.split_once(':').ok_or(HttpError::MalformedResponse)?;
            if name.is_empty() || name.contains([' ', '\t']) {
                return Err(HttpError::MalformedResponse.into());
            }
            let value = value.trim_start_matches([' ', '\t']);
            parsed.headers_mut().append(name, value);
            last_name = Some(name.to_string());
        }

        trace!(
            status = parsed.status().as_u16(),
            headers = parsed.headers().len(),
            "response head parsed"
        );
        *response = parsed;
        Ok(())
    }
}

/// Reads a response head with the default size limit.
pub fn read_response<R: BufRead + ?Sized>(reader: &mut R) -> Result<HttpResponse> {
    let mut response = HttpResponse::default();
    ResponseParser::new().parse(reader, &mut response)?;
    Ok(response)
}

fn parse_status_line(line: &str) -> Result<HttpResponse> {
    let rest = line.strip_prefix("HTTP/").ok_or(HttpError::MalformedResponse)?;
    let (version, rest) = rest.split_once(' ').ok_or(HttpError::MalformedResponse)?;
    let version = Version::from_token(version)?;

    let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpError::MalformedResponse.into());
    }
    let code: u16 = code.parse().map_err(|_| HttpError::MalformedResponse)?;

    Ok(HttpResponse::new(version, StatusCode::new(code), reason))
}

/// Reads one line and strips its `\n` or `\r\n` terminator, charging the
/// bytes consumed to `budget`. `Ok(None)` is end of stream before any byte.
pub(crate) fn read_line<R: BufRead + ?Sized>(reader: &mut R, budget: &mut usize) -> Result<Option<String>> {
    let mut line = Vec::new();
    loop {
        let (found, used) = {
            let available = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if available.is_empty() {
                if line.is_empty() {
                    return Ok(None);
                }
                return Err(HttpError::MalformedResponse.into());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    line.extend_from_slice(&available[..i]);
                    (true, i + 1)
                }
                None => {
                    line.extend_from_slice(available);
                    (false, available.len())
                }
            }
        };
        reader.consume(used);
        *budget = budget.checked_sub(used).ok_or(HttpError::MalformedResponse)?;
        if found {
            break;
        }
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}
