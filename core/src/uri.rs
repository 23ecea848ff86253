//! URL construction: path segment encoding and query strings.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except unreserved characters (`A-Z a-z 0-9 - . _ ~`) is
/// escaped, so a `/` or `,` inside a segment never acts as a separator.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a single path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Strip trailing slashes from a base address.
pub fn normalize_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base address with independently encoded segments.
///
/// Every segment is kept, empty ones included. Leaving out optional segments
/// is the caller's job.
pub fn join_path<S: AsRef<str>>(base_url: &str, segments: &[S]) -> String {
    let mut url = normalize_base(base_url);
    for segment in segments.iter().map(AsRef::as_ref) {
        url.push('/');
        url.push_str(&encode_segment(segment));
    }
    url
}

/// Render query pairs as `k=v&k2=v2`. Returns `None` for no pairs so the
/// caller can leave the `?` off entirely.
pub fn query_string<'a, I>(pairs: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut serializer = ::url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in pairs {
        serializer.append_pair(key, value);
        any = true;
    }
    any.then(|| serializer.finish())
}
