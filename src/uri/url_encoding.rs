//! Percent-encoding for query names and values.
//!
//! Only used when a [`UriBuilder`](super::UriBuilder) is configured with
//! [`QueryEncoding::Percent`](super::QueryEncoding::Percent). Spaces become
//! `+`, matching form-style query strings.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped inside query components, excluding space.
///
/// Unreserved characters (alphanumerics, `-`, `_`, `.`, `~`) pass through
/// as-is per RFC 3986.
const QUERY_ENCODE_SET_NO_SPACE: &AsciiSet = &CONTROLS
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'\'');

/// Percent-encode `s` into `out`, mapping spaces to `+` in a single pass.
pub(super) fn push_encoded(out: &mut String, s: &str) {
    let mut first = true;
    for chunk in s.split(' ') {
        if !first {
            out.push('+');
        }
        first = false;
        out.extend(utf8_percent_encode(chunk, QUERY_ENCODE_SET_NO_SPACE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn encode(s: &str) -> String {
        let mut out = String::new();
        push_encoded(&mut out, s);
        out
    }

    #[rstest]
    #[case("hello world", "hello+world")]
    #[case("a=b&c=d", "a%3Db%26c%3Dd")]
    #[case("2017-11-23T19:35:54Z", "2017-11-23T19%3A35%3A54Z")]
    #[case("me@example.org", "me%40example.org")]
    #[case("tdry_1.5~x", "tdry_1.5~x")]
    #[case("", "")]
    #[case("  a ", "++a+")]
    fn encodes_query_components(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(encode(input), expected);
    }
}
