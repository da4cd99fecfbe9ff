use crate::{parser::Http1Parser, scan::StrScanner, Error, Headers};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A MIME content type: `type/subtype` plus at most one parameter.
///
/// Type, subtype, and the parameter name are stored lowercased. The
/// parameter value keeps its case except for `charset`, whose values are
/// case-insensitive by definition and therefore lowercased too.
///
/// ```
/// # use sorrel_http::MimeType;
/// let parsed: MimeType = "Text/Plain;Charset=UTF-8".parse().unwrap();
/// assert_eq!(parsed, MimeType::new("text", "plain").with_parameter("charset", "utf-8"));
/// assert!(parsed.matches_type("text", "plain"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    type_: String,
    subtype: String,
    parameter: Option<(String, String)>,
}

impl MimeType {
    /// Builds a `type/subtype` pair without a parameter.
    pub fn new(type_: impl AsRef<str>, subtype: impl AsRef<str>) -> Self {
        Self {
            type_: type_.as_ref().to_ascii_lowercase(),
            subtype: subtype.as_ref().to_ascii_lowercase(),
            parameter: None,
        }
    }

    /// Attaches the `name=value` parameter, applying the case-folding
    /// rules. An empty name or value clears the parameter instead.
    pub fn with_parameter(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.as_ref();
        if name.is_empty() || value.is_empty() {
            self.parameter = None;
        } else {
            let value = if name == "charset" {
                value.to_ascii_lowercase()
            } else {
                value.to_string()
            };
            self.parameter = Some((name, value));
        }
        self
    }

    /// The lowercased primary type.
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// The lowercased subtype.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The parameter, if present.
    pub fn parameter(&self) -> Option<(&str, &str)> {
        self.parameter
            .as_ref()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Compares only type and subtype, ignoring any parameter.
    pub fn matches_type(&self, type_: &str, subtype: &str) -> bool {
        self.type_.eq_ignore_ascii_case(type_) && self.subtype.eq_ignore_ascii_case(subtype)
    }
}

impl FromStr for MimeType {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut scanner = StrScanner::new(input);
        let type_ = scanner.take_line(b'/');
        let subtype = scanner.take_until(|byte| byte.is_ascii_whitespace() || byte == b';');
        if type_.is_empty() || subtype.is_empty() {
            return Err(Error::InvalidMimeType);
        }

        let mut mime = MimeType::new(type_, subtype);
        let mut parameters = Headers::new();
        if Http1Parser::header_parameters(scanner.remaining(), ';', &mut parameters) {
            if let Some((name, value)) = parameters.front() {
                mime = mime.with_parameter(name, value);
            }
        }
        Ok(mime)
    }
}

impl Display for MimeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        if let Some((name, value)) = &self.parameter {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_folds_case() {
        let mime: MimeType = "Text/Plain;Charset=UTF-8".parse().unwrap();
        assert_eq!(
            mime,
            MimeType::new("text", "plain").with_parameter("charset", "utf-8")
        );
        assert_eq!(mime.to_string(), "text/plain;charset=utf-8");
    }

    #[test]
    fn non_charset_parameter_values_keep_case() {
        let mime: MimeType = "multipart/form-data; Boundary=P0ny".parse().unwrap();
        assert_eq!(mime.parameter(), Some(("boundary", "P0ny")));
        assert_ne!(
            mime,
            MimeType::new("multipart", "form-data").with_parameter("boundary", "p0ny")
        );
    }

    #[test]
    fn quoted_parameter_values() {
        let mime: MimeType = r#"text/plain; title="a; b""#.parse().unwrap();
        assert_eq!(mime.parameter(), Some(("title", "a; b")));
    }

    #[test]
    fn rejects_incomplete_types() {
        assert!("text".parse::<MimeType>().is_err());
        assert!("/plain".parse::<MimeType>().is_err());
        assert!("text/".parse::<MimeType>().is_err());
    }

    #[test]
    fn type_matching_ignores_parameters() {
        let mime: MimeType = "application/x-www-form-urlencoded".parse().unwrap();
        assert!(mime.matches_type("application", "x-www-form-urlencoded"));
        assert!(!mime.matches_type("application", "json"));
    }
}
