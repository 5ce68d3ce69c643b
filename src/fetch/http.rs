use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Error};
use log::{trace, warn};
use reqwest::blocking::Client;

use ignition_api::config::{HttpHeader, Timeouts};

const MAX_REDIRECTS: usize = 5;
const BACKOFF_INITIAL: Duration = Duration::from_millis(250);
const BACKOFF_CAP: Duration = Duration::from_secs(5);

/// Per-attempt and overall deadlines, carried straight from `Timeouts`
/// (§4.3). `total == Duration::ZERO` means "no overall deadline".
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub response_headers: Duration,
    pub total: Duration,
}

impl Deadlines {
    /// Builds the deadlines a parsed config's `ignition.timeouts` actually
    /// declares (§3), instead of the hardcoded defaults used before any
    /// config has been parsed yet.
    pub fn from_timeouts(timeouts: &Timeouts) -> Self {
        Deadlines {
            response_headers: Duration::from_secs(timeouts.response_headers_secs() as u64),
            total: Duration::from_secs(timeouts.total_secs() as u64),
        }
    }
}

/// Performs an HTTP(S) GET with retry-with-backoff on transport failure or
/// 5xx, honoring `deadlines` (§4.3's fetcher contract).
pub fn get(url: &url::Url, headers: &[HttpHeader], ca_bundle: Option<&[u8]>, deadlines: Deadlines) -> Result<Vec<u8>, Error> {
    let client = build_client(ca_bundle, deadlines.response_headers)?;

    let start = Instant::now();
    let mut backoff = BACKOFF_INITIAL;

    loop {
        trace!("Fetching '{url}'");
        let attempt = send_once(&client, url, headers);

        match attempt {
            Ok(bytes) => return Ok(bytes),
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) => {
                if deadlines.total != Duration::ZERO && start.elapsed() >= deadlines.total {
                    return Err(err.context(format!("total fetch timeout of {:?} exceeded", deadlines.total)));
                }
                warn!("Fetch of '{url}' failed, retrying in {backoff:?}: {err:#}");
                std::thread::sleep(jittered(backoff));
                backoff = (backoff * 2).min(BACKOFF_CAP);
            }
        }
    }
}

fn build_client(ca_bundle: Option<&[u8]>, response_headers_timeout: Duration) -> Result<Client, Error> {
    let mut builder = Client::builder()
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(response_headers_timeout);

    if let Some(pem) = ca_bundle {
        let cert = reqwest::Certificate::from_pem(pem).context("invalid CA bundle PEM")?;
        builder = builder.add_root_certificate(cert);
    }

    builder.build().context("failed to build HTTP client")
}

fn send_once(client: &Client, url: &url::Url, headers: &[HttpHeader]) -> Result<Vec<u8>, Error> {
    let mut req = client.get(url.clone());
    for header in headers {
        req = req.header(&header.name, &header.value);
    }

    let response = req.send().context("transport error")?;
    let status = response.status();

    if status.is_success() {
        return response.bytes().map(|b| b.to_vec()).context("failed to read response body");
    }

    if status.as_u16() == 404 {
        bail!("'{url}' returned 404");
    }
    if status.is_client_error() {
        bail!("'{url}' returned client error {status}");
    }

    // 5xx and anything else unexpected is retried by the caller.
    Err(anyhow!("'{url}' returned {status}"))
}

/// 5xx and transport errors are retried; 4xx (other than having already been
/// turned into a bail above) is not. We approximate "retryable" as "not a
/// 404/4xx bail", since [`send_once`] only reaches the generic branch for
/// 5xx/transport failures.
fn is_retryable(err: &Error) -> bool {
    !is_not_found(err) && !err.to_string().contains("client error")
}

/// Whether `err` is the 404 raised by [`send_once`] (§4.3's "optional fetch"
/// pathway needs to tell this apart from every other fetch failure).
pub fn is_not_found(err: &Error) -> bool {
    err.to_string().contains("404")
}

fn jittered(d: Duration) -> Duration {
    let jitter_ms = rand::random::<u64>() % 50;
    d + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        let err = anyhow!("'http://x' returned 503 Service Unavailable");
        assert!(is_retryable(&err));
    }

    #[test]
    fn not_found_is_not_retryable() {
        let err = anyhow!("'http://x' returned 404");
        assert!(!is_retryable(&err));
    }

    #[test]
    fn jittered_backoff_never_shrinks_below_base() {
        let base = Duration::from_millis(250);
        for _ in 0..20 {
            assert!(jittered(base) >= base);
        }
    }
}
