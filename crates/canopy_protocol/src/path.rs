//! Validated locations in the store tree.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;

/// Maximum number of segments in a path.
pub const MAX_DEPTH: usize = 32;

/// Maximum length of a single segment, in bytes.
pub const MAX_KEY_BYTES: usize = 768;

const FORBIDDEN: [char; 5] = ['.', '$', '#', '[', ']'];

/// A normalized path such as `/users/alice/score`.
///
/// Empty segments are dropped while parsing, so `"a//b/"` and `"/a/b"` are the
/// same path. The root is `/` and has no segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses and validates a path.
    pub fn parse(raw: &str) -> ProtocolResult<Self> {
        let segments: Vec<String> = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        for segment in &segments {
            validate_segment(raw, segment)?;
        }

        if segments.len() > MAX_DEPTH {
            return Err(ProtocolError::invalid_path(
                raw,
                format!("depth {} exceeds {}", segments.len(), MAX_DEPTH),
            ));
        }

        Ok(Self { segments })
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true for `/`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Appends a relative path (which may itself contain `/`).
    pub fn child(&self, relative: &str) -> ProtocolResult<Path> {
        let relative = Path::parse(relative)?;
        if relative.is_root() {
            return Err(ProtocolError::invalid_path(
                relative.to_string(),
                "child path must not be empty",
            ));
        }

        let mut segments = self.segments.clone();
        segments.extend(relative.segments);
        if segments.len() > MAX_DEPTH {
            return Err(ProtocolError::invalid_path(
                format!("{}/{}", self, segments[self.depth()..].join("/")),
                format!("depth {} exceeds {}", segments.len(), MAX_DEPTH),
            ));
        }

        Ok(Self { segments })
    }

    /// Returns true if `other` is this path or lies below it.
    pub fn contains(&self, other: &Path) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// REST URL for this path under `base_url`, e.g. `https://db/a/b.json`.
    pub fn to_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let encoded: Vec<String> = self.segments.iter().map(|s| encode_segment(s)).collect();
        format!("{}/{}.json", base, encoded.join("/"))
    }

    /// Extracts the path from a REST URL produced by [`Path::to_url`].
    ///
    /// Scheme, authority and query string are ignored; the `.json` suffix is
    /// optional.
    pub fn from_url(url: &str) -> ProtocolResult<Path> {
        let without_scheme = match url.find("://") {
            Some(i) => {
                let rest = &url[i + 3..];
                rest.find('/').map(|j| &rest[j..]).unwrap_or("/")
            }
            None => url,
        };
        let without_query = without_scheme
            .split_once('?')
            .map(|(p, _)| p)
            .unwrap_or(without_scheme);
        let raw = without_query
            .strip_suffix(".json")
            .unwrap_or(without_query);

        let decoded = raw
            .split('/')
            .map(|s| decode_segment(s).ok_or_else(|| ProtocolError::invalid_path(url, "bad escape")))
            .collect::<ProtocolResult<Vec<_>>>()?;

        Path::parse(&decoded.join("/"))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl FromStr for Path {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

fn validate_segment(raw: &str, segment: &str) -> ProtocolResult<()> {
    if segment.len() > MAX_KEY_BYTES {
        return Err(ProtocolError::invalid_path(
            raw,
            format!("segment longer than {} bytes", MAX_KEY_BYTES),
        ));
    }
    if let Some(c) = segment.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(ProtocolError::invalid_path(
            raw,
            format!("forbidden character {:?}", c),
        ));
    }
    if segment.chars().any(|c| c.is_ascii_control()) {
        return Err(ProtocolError::invalid_path(raw, "control character"));
    }
    Ok(())
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn decode_segment(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
