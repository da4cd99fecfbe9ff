use crate::Error;
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// An HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Method {
    /// The DELETE method deletes the specified resource.
    Delete,

    /// The GET method requests a representation of the specified
    /// resource. Requests using GET should only retrieve data.
    Get,

    /// The HEAD method asks for a response identical to that of a GET
    /// request, but without the response body.
    Head,

    /// The OPTIONS method is used to describe the communication options
    /// for the target resource.
    Options,

    /// The PATCH method is used to apply partial modifications to a
    /// resource.
    Patch,

    /// The POST method is used to submit an entity to the specified
    /// resource, often causing a change in state or side effects on the
    /// server.
    Post,

    /// The PUT method replaces all current representations of the
    /// target resource with the request payload.
    Put,

    /// The CONNECT method establishes a tunnel to the server identified
    /// by the target resource.
    Connect,

    /// The TRACE method performs a message loop-back test along the
    /// path to the target resource.
    Trace,
}

impl Method {
    /// The method's canonical uppercase name.
    pub const fn as_str(&self) -> &'static str {
        use Method::*;
        match self {
            Delete => "DELETE",
            Get => "GET",
            Head => "HEAD",
            Options => "OPTIONS",
            Patch => "PATCH",
            Post => "POST",
            Put => "PUT",
            Connect => "CONNECT",
            Trace => "TRACE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        use Method::*;
        match method {
            "DELETE" => Ok(Delete),
            "GET" => Ok(Get),
            "HEAD" => Ok(Head),
            "OPTIONS" => Ok(Options),
            "PATCH" => Ok(Patch),
            "POST" => Ok(Post),
            "PUT" => Ok(Put),
            "CONNECT" => Ok(Connect),
            "TRACE" => Ok(Trace),
            _ => Err(Error::UnrecognizedMethod(method.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_names() {
        for method in [
            Method::Delete,
            Method::Get,
            Method::Head,
            Method::Options,
            Method::Patch,
            Method::Post,
            Method::Put,
            Method::Connect,
            Method::Trace,
        ] {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
    }

    #[test]
    fn is_case_sensitive() {
        assert!("get".parse::<Method>().is_err());
        assert!("BREW".parse::<Method>().is_err());
    }
}
