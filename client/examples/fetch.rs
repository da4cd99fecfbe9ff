//! Fetch a URL from the command line and print the response body.

use sorrel_client::Client;
use sorrel_http::{Request, Uri};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://example.com/".to_string());

    let client = Client::new()
        .with_timeout(Duration::from_secs(10))
        .with_max_redirects(5);

    let mut request = Request::get(Uri::from(target.as_str()));
    let mut response = client.query(&mut request)?;

    eprintln!("{}", response.status);
    print!("{}", response.body.read_string()?);
    Ok(())
}
