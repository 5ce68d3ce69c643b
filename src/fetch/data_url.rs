use anyhow::{bail, Context, Error};

/// Decodes a `data:` URL body per RFC 2397, in memory, no I/O.
///
/// Only the parts the engine actually produces/consumes matter here: an
/// optional `;base64` flag before the comma, percent-decoding otherwise. The
/// media-type itself is never inspected.
pub fn decode(url: &url::Url) -> Result<Vec<u8>, Error> {
    let rest = url.path();
    let (meta, data) = rest
        .split_once(',')
        .with_context(|| format!("data URL '{url}' has no comma separating metadata from payload"))?;

    if meta.ends_with(";base64") {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .with_context(|| format!("data URL '{url}' has invalid base64 payload"))
    } else {
        Ok(percent_decode(data))
    }
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""), 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(bytes[i]);
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

/// Validates that `s` only ever names the `data` scheme this module handles;
/// used by callers before dispatching so an unrelated scheme never reaches
/// [`decode`].
pub fn is_data_url(url: &url::Url) -> bool {
    url.scheme() == "data"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_percent_encoded_payload() {
        let url = url::Url::parse("data:,example%20file%0A").unwrap();
        assert_eq!(decode(&url).unwrap(), b"example file\n");
    }

    #[test]
    fn decodes_base64_payload() {
        let url = url::Url::parse("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(decode(&url).unwrap(), b"hello");
    }

    #[test]
    fn rejects_url_missing_comma() {
        let url = url::Url::parse("data:text/plain").unwrap();
        assert!(decode(&url).is_err());
    }
}
