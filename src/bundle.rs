//! CDN bundle reference resolution
//!
//! A bundle reference names one or more files on the CDN:
//!
//! - **grouped**: `<base>/<id>~<count>/` expands to `count` files, each addressed as
//!   `<base>/<id>~<count>/nth/<i>/` for `i` in `0..count`
//! - **single**: `<base>/<id>/` names exactly one file
//!
//! Resolution is a pure function of the reference string: no I/O, and the
//! resulting order maps 1:1 onto the destination filename suffix.

use crate::error::FetchError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Largest file count accepted in a grouped reference
pub const MAX_GROUP_SIZE: u32 = 1000;

static GROUPED_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<id>[0-9A-Za-z][0-9A-Za-z_-]*)~(?P<count>[^/]*)$")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

static SINGLE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z][0-9A-Za-z_-]*$").unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// One fetchable file within a bundle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleFile {
    /// Direct URL of the file
    pub url: String,
    /// Zero-based position within the bundle
    pub index: usize,
}

/// The resolved form of a bundle reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bundle {
    files: Vec<BundleFile>,
    grouped: bool,
}

impl Bundle {
    /// Files in ascending index order
    pub fn files(&self) -> &[BundleFile] {
        &self.files
    }

    /// URLs in ascending index order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.url.as_str())
    }

    /// Number of files the reference designates
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false for a successfully resolved bundle
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether the reference used the grouped `<id>~<count>` shape
    pub fn is_grouped(&self) -> bool {
        self.grouped
    }
}

fn malformed(reference: &str, reason: impl Into<String>) -> FetchError {
    FetchError::MalformedReference {
        reference: reference.to_string(),
        reason: reason.into(),
    }
}

/// Expand a bundle reference into its ordered file URLs
///
/// # Errors
///
/// Returns [`FetchError::MalformedReference`] when the reference is not an
/// absolute http(s) URL, carries a query or fragment, or its last path segment
/// matches neither the grouped nor the single shape. A grouped segment whose
/// count does not parse as an integer in `1..=MAX_GROUP_SIZE` is rejected
/// rather than guessed.
///
/// # Example
///
/// ```
/// let bundle = bundle_dl::bundle::resolve("https://cdn.example/abc123~2/").unwrap();
/// let urls: Vec<&str> = bundle.urls().collect();
/// assert_eq!(
///     urls,
///     ["https://cdn.example/abc123~2/nth/0/", "https://cdn.example/abc123~2/nth/1/"]
/// );
/// ```
pub fn resolve(reference: &str) -> Result<Bundle, FetchError> {
    let url = Url::parse(reference)
        .map_err(|e| malformed(reference, format!("not an absolute URL: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(malformed(
            reference,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    let host = url
        .host_str()
        .ok_or_else(|| malformed(reference, "missing host"))?;
    if url.query().is_some() || url.fragment().is_some() {
        return Err(malformed(reference, "query strings and fragments are not allowed"));
    }

    let path = url.path();
    let path = path.strip_suffix('/').unwrap_or(path);
    let (prefix, segment) = path
        .rsplit_once('/')
        .ok_or_else(|| malformed(reference, "missing identifier"))?;
    if segment.is_empty() {
        return Err(malformed(reference, "missing identifier"));
    }

    let base = match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, prefix),
        None => format!("{}://{}{}", url.scheme(), host, prefix),
    };

    if segment.contains('~') {
        let caps = GROUPED_SEGMENT
            .captures(segment)
            .ok_or_else(|| malformed(reference, "invalid grouped identifier"))?;
        let id = &caps["id"];
        let count_str = &caps["count"];
        let count: u32 = count_str
            .parse()
            .map_err(|_| malformed(reference, format!("invalid file count {count_str:?}")))?;
        if count == 0 || count > MAX_GROUP_SIZE {
            return Err(malformed(
                reference,
                format!("file count {count} outside 1..={MAX_GROUP_SIZE}"),
            ));
        }

        let files = (0..count as usize)
            .map(|index| BundleFile {
                url: format!("{base}/{id}~{count}/nth/{index}/"),
                index,
            })
            .collect();
        return Ok(Bundle {
            files,
            grouped: true,
        });
    }

    if !SINGLE_SEGMENT.is_match(segment) {
        return Err(malformed(reference, format!("invalid identifier {segment:?}")));
    }

    Ok(Bundle {
        files: vec![BundleFile {
            url: format!("{base}/{segment}/"),
            index: 0,
        }],
        grouped: false,
    })
}
