use crate::{DataMap, Headers};

/// A `multipart/*` payload: a boundary plus the parts it frames.
///
/// See [RFC 2046 §5.1](https://tools.ietf.org/html/rfc2046#section-5.1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    /// the boundary delimiter, without the leading `--`
    pub boundary: String,
    /// the framed parts, in order
    pub parts: Vec<MultipartPart>,
}

/// One part of a [`Multipart`] payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPart {
    /// the part's own headers
    pub headers: Headers,
    /// raw content bytes, without the final CRLF before the next
    /// boundary
    pub content: Vec<u8>,
}

impl Multipart {
    /// A multipart payload with the given boundary and no parts.
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Whether `boundary` may legally frame a multipart payload:
    /// non-empty printable ASCII not ending in a space.
    pub fn valid_boundary(boundary: &str) -> bool {
        !boundary.is_empty()
            && boundary.bytes().all(|byte| (b' '..=b'~').contains(&byte))
            && !boundary.ends_with(' ')
    }

    /// Derives a boundary that appears nowhere in `data`, by differing
    /// from every value at some position.
    pub fn suggest_boundary(data: &DataMap) -> String {
        fn not_byte(byte: u8) -> char {
            if byte.is_ascii_alphabetic() {
                '0'
            } else if byte.is_ascii_digit() {
                'n'
            } else {
                'y'
            }
        }

        let mut boundary = String::new();
        for (_, value) in data {
            match value.as_bytes().get(boundary.len()) {
                Some(&byte) => boundary.push(not_byte(byte)),
                None => boundary.push('p'),
            }
        }

        if boundary.is_empty() {
            "p0ny".to_string()
        } else {
            boundary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_validity() {
        assert!(Multipart::valid_boundary("p0ny"));
        assert!(Multipart::valid_boundary("a b"));
        assert!(!Multipart::valid_boundary(""));
        assert!(!Multipart::valid_boundary("ends in space "));
        assert!(!Multipart::valid_boundary("tab\there"));
    }

    #[test]
    fn suggested_boundaries_avoid_the_data() {
        let mut data = DataMap::new();
        data.append("a", "hello");
        data.append("b", "world");
        let boundary = Multipart::suggest_boundary(&data);
        assert!(Multipart::valid_boundary(&boundary));
        for (_, value) in &data {
            assert!(!value.contains(&boundary));
        }
        assert_eq!(Multipart::suggest_boundary(&DataMap::new()), "p0ny");
    }
}
