//! Apache-style access log formatting.
//!
//! Supports the common subset of the Apache log format labels, e.g.
//! `%h %l %u %t "%r" %s %b` for the combined-log prefix. Labels may take
//! an `%{argument}x` form, as in `%{User-Agent}i`.

use sorrel_http::{Connection, Request, Response};
use std::fmt::Write;

fn clf(value: u64) -> String {
    if value == 0 {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn dash_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn elapsed_microseconds(request: &Request, response: &Response) -> u128 {
    response
        .date
        .duration_since(request.received)
        .map(|elapsed| elapsed.as_micros())
        .unwrap_or_default()
}

fn process_label(
    output: &mut String,
    label: char,
    argument: &str,
    connection: &Connection,
    request: &Request,
    response: &Response,
) {
    match label {
        '%' => output.push('%'),
        // remote host / remote ip
        'h' | 'a' => match connection.remote_address() {
            Some(addr) => {
                let _ = write!(output, "{}", addr.ip());
            }
            None => output.push('-'),
        },
        // local ip
        'A' => match connection.local_address() {
            Some(addr) => {
                let _ = write!(output, "{}", addr.ip());
            }
            None => output.push('-'),
        },
        // response size, plain and CLF
        'B' => {
            let _ = write!(output, "{}", response.body.content_length());
        }
        'b' => output.push_str(&clf(response.body.content_length())),
        // a request cookie
        'C' => output.push_str(dash_if_empty(&request.cookies[argument])),
        // time to serve, microseconds
        'D' => {
            let _ = write!(output, "{}", elapsed_microseconds(request, response));
        }
        // request protocol
        'H' => {
            let _ = write!(output, "{}", request.protocol);
        }
        // a request header
        'i' => output.push_str(dash_if_empty(&request.headers[argument])),
        // keepalive request count; connections are not kept alive
        'k' => output.push('0'),
        // remote logname
        'l' => output.push('-'),
        'm' => {
            let _ = write!(output, "{}", request.method);
        }
        // a response header
        'o' => output.push_str(dash_if_empty(&response.headers[argument])),
        'p' => {
            let port = match argument {
                "remote" => connection.remote_address().map(|addr| addr.port()),
                _ => connection.local_address().map(|addr| addr.port()),
            };
            match port {
                Some(port) => {
                    let _ = write!(output, "{port}");
                }
                None => output.push('-'),
            }
        }
        // query string, with its question mark
        'q' => output.push_str(&request.url.query_string(true)),
        // first line of the request
        'r' => {
            let _ = write!(
                output,
                "{} {} {}",
                request.method, request.url, request.protocol
            );
        }
        's' => {
            let _ = write!(output, "{}", response.status.code);
        }
        // request time; the strftime argument is not supported
        't' => {
            let _ = write!(output, "[{}]", httpdate::fmt_http_date(request.received));
        }
        // time to serve, in the unit given by the argument
        'T' => {
            let microseconds = elapsed_microseconds(request, response);
            let value = match argument {
                "us" => microseconds,
                "ms" => microseconds / 1_000,
                _ => microseconds / 1_000_000,
            };
            let _ = write!(output, "{value}");
        }
        // remote user from auth
        'u' => output.push_str(dash_if_empty(&request.auth.user)),
        // requested path, no query string
        'U' => output.push_str(&request.url.path.url_encoded(true)),
        // connection status at completion
        'X' => output.push(if connection.connected() { '-' } else { 'X' }),
        other => log::debug!("unsupported log format label %{other}"),
    }
}

/// Renders one access log line for a completed exchange.
pub fn log_response(
    format: &str,
    connection: &Connection,
    request: &Request,
    response: &Response,
) -> String {
    let mut output = String::with_capacity(format.len() * 2);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }

        let mut argument = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            loop {
                match chars.next() {
                    Some('}') | None => break,
                    Some(inner) => argument.push(inner),
                }
            }
        }

        let Some(label) = chars.next() else {
            break;
        };
        process_label(
            &mut output,
            label,
            &argument,
            connection,
            request,
            response,
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sorrel_http::{Method, Request, Response, Status};

    fn fixtures() -> (std::sync::Arc<Connection>, Request, Response) {
        let (connection, _) = Connection::synthetic(Vec::new());
        let mut request = Request::get("/a/b?x=1");
        request.headers.append("User-Agent", "test-agent");
        request.method = Method::Get;
        let mut response = Response::new(Status::NOT_FOUND);
        response.date = request.received;
        (connection, request, response)
    }

    #[test]
    fn common_log_prefix() {
        let (connection, request, response) = fixtures();
        let line = log_response("%h %l %u \"%r\" %s %b", &connection, &request, &response);
        assert_eq!(line, "- - - \"GET /a/b?x=1 HTTP/1.1\" 404 -");
    }

    #[test]
    fn header_arguments() {
        let (connection, request, response) = fixtures();
        assert_eq!(
            log_response("%{User-Agent}i", &connection, &request, &response),
            "test-agent"
        );
        assert_eq!(
            log_response("%{Missing}i", &connection, &request, &response),
            "-"
        );
    }

    #[test]
    fn literal_percent_and_path() {
        let (connection, request, response) = fixtures();
        assert_eq!(
            log_response("%U %% %q", &connection, &request, &response),
            "/a/b % ?x=1"
        );
    }

    #[test]
    fn timing_labels_do_not_panic() {
        let (connection, request, response) = fixtures();
        assert_eq!(
            log_response("%T/%{ms}T", &connection, &request, &response),
            "0/0"
        );
    }
}
