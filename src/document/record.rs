use crate::crawler::FetchedResponse;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

const WARC_VERSION: &str = "WARC/1.0";
const CRLF: &[u8] = b"\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Errors from reading a serialized record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record does not start with WARC/1.0")]
    MissingVersion,

    #[error("Record header block is not terminated")]
    UnterminatedHeader,

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Missing record header: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Record block truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Record is not followed by a blank line")]
    MissingTrailer,

    #[error("HTTP block has no header terminator")]
    MalformedHttpBlock,
}

/// One archived HTTP response
///
/// Created once per successful fetch and never modified. The capture time
/// is kept at whole-second precision so it survives a round trip through
/// the `WARC-Date` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    id: Uuid,
    url: Url,
    captured_at: DateTime<Utc>,
    status_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl DocumentRecord {
    /// Creates a record with a fresh id, captured now
    pub fn new(
        url: Url,
        status_line: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            captured_at: Utc::now().trunc_subsecs(0),
            status_line: status_line.into(),
            headers,
            body,
        }
    }

    /// Creates a record from a fetched response, consuming it
    pub fn from_response(url: Url, response: FetchedResponse) -> Self {
        Self::new(url, response.status_line, response.headers, response.body)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// File name the record is stored under
    pub fn file_name(&self) -> String {
        format!("{}.warc", self.id)
    }

    /// Serializes the record in WARC response framing
    ///
    /// The record header block is followed by the HTTP block (status line,
    /// headers, blank line, raw body), whose exact byte length is given by
    /// `Content-Length`, and a closing blank line. All line breaks are CRLF.
    pub fn to_bytes(&self) -> Vec<u8> {
        let http_block = self.http_block();

        let header = format!(
            "{WARC_VERSION}\r\n\
             WARC-Type: response\r\n\
             WARC-Date: {}\r\n\
             WARC-Record-ID: <urn:uuid:{}>\r\n\
             WARC-Target-URI: {}\r\n\
             Content-Type: application/http; msgtype=response\r\n\
             Content-Length: {}\r\n\
             \r\n",
            self.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.id,
            self.url,
            http_block.len(),
        );

        let mut bytes = Vec::with_capacity(header.len() + http_block.len() + BLANK_LINE.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&http_block);
        bytes.extend_from_slice(BLANK_LINE);
        bytes
    }

    fn http_block(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(self.body.len() + 512);
        block.extend_from_slice(self.status_line.as_bytes());
        block.extend_from_slice(CRLF);
        for (name, value) in &self.headers {
            block.extend_from_slice(name.as_bytes());
            block.extend_from_slice(b": ");
            block.extend_from_slice(value.as_bytes());
            block.extend_from_slice(CRLF);
        }
        block.extend_from_slice(CRLF);
        block.extend_from_slice(&self.body);
        block
    }

    /// Reads a record back from the bytes produced by [`Self::to_bytes`]
    pub fn parse(bytes: &[u8]) -> Result<Self, RecordError> {
        let header_end = find(bytes, BLANK_LINE).ok_or(RecordError::UnterminatedHeader)?;
        let header_text = String::from_utf8_lossy(&bytes[..header_end]);
        let mut lines = header_text.split("\r\n");

        if lines.next() != Some(WARC_VERSION) {
            return Err(RecordError::MissingVersion);
        }

        let fields = lines.map(split_header).collect::<Result<Vec<_>, _>>()?;
        let field = |name: &'static str| {
            fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
                .ok_or(RecordError::MissingField(name))
        };

        let id = field("WARC-Record-ID")?;
        let id = id
            .strip_prefix("<urn:uuid:")
            .and_then(|rest| rest.strip_suffix('>'))
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| invalid("WARC-Record-ID", id))?;

        let date = field("WARC-Date")?;
        let captured_at = DateTime::parse_from_rfc3339(date)
            .map_err(|_| invalid("WARC-Date", date))?
            .with_timezone(&Utc);

        let target = field("WARC-Target-URI")?;
        let url = Url::parse(target).map_err(|_| invalid("WARC-Target-URI", target))?;

        let length = field("Content-Length")?;
        let length: usize = length
            .parse()
            .map_err(|_| invalid("Content-Length", length))?;

        let block_start = header_end + BLANK_LINE.len();
        let available = bytes.len() - block_start;
        if available < length {
            return Err(RecordError::Truncated {
                expected: length,
                actual: available,
            });
        }
        let block = &bytes[block_start..block_start + length];
        if !bytes[block_start + length..].starts_with(BLANK_LINE) {
            return Err(RecordError::MissingTrailer);
        }

        let (status_line, headers, body) = parse_http_block(block)?;

        Ok(Self {
            id,
            url,
            captured_at,
            status_line,
            headers,
            body,
        })
    }
}

fn parse_http_block(
    block: &[u8],
) -> Result<(String, Vec<(String, String)>, Vec<u8>), RecordError> {
    // The status line is followed by CRLF even when there are no headers
    let status_end = find(block, CRLF).ok_or(RecordError::MalformedHttpBlock)?;
    let status_line = String::from_utf8_lossy(&block[..status_end]).into_owned();

    let rest = &block[status_end + CRLF.len()..];
    let (header_bytes, body) = if rest.starts_with(CRLF) {
        (&rest[..0], &rest[CRLF.len()..])
    } else {
        let end = find(rest, BLANK_LINE).ok_or(RecordError::MalformedHttpBlock)?;
        (&rest[..end], &rest[end + BLANK_LINE.len()..])
    };

    let headers = if header_bytes.is_empty() {
        Vec::new()
    } else {
        String::from_utf8_lossy(header_bytes)
            .split("\r\n")
            .map(split_header)
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok((status_line, headers, body.to_vec()))
}

fn split_header(line: &str) -> Result<(String, String), RecordError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| RecordError::MalformedHeader(line.to_string()))?;
    let value = value.strip_prefix(' ').unwrap_or(value);
    Ok((name.to_string(), value.to_string()))
}

fn invalid(field: &'static str, value: &str) -> RecordError {
    RecordError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
