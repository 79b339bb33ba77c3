pub mod normalizer;
pub mod video;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use std::{error::Error, thread::sleep, time::Duration};

use crate::config::ScrapeConfig;

const USER_AGENT_DEFAULT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The server answered with a non-success status
    #[error("http status {0}")]
    Status(u16),

    /// No usable answer (connection, timeout, body read)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Source of raw page markup. Every network read in the pipeline goes
/// through this trait.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher with retries.
///
/// - transport errors are retried, through `OPT_PROXY` if set
/// - 429 backs off before retrying
/// - other 4xx give up after one proxied attempt
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    proxy_client: Option<reqwest::blocking::Client>,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> anyhow::Result<Self> {
        let opt_proxy = std::env::var("OPT_PROXY").unwrap_or_default();

        let client = Self::client_builder(config).build()?;
        let proxy_client = if opt_proxy.is_empty() {
            None
        } else {
            Some(
                Self::client_builder(config)
                    .proxy(reqwest::Proxy::all(&opt_proxy)?)
                    .build()?,
            )
        };

        Ok(Self {
            client,
            proxy_client,
            max_retries: config.max_retries.max(1),
        })
    }

    fn client_builder(config: &ScrapeConfig) -> reqwest::blocking::ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(10))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let url_parsed =
            reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let host = url_parsed.host_str().unwrap_or_default();
        let path = url_parsed.path();
        let iden = format!("{host}{path}");

        let mut force_proxy = false;
        let mut last_error = FetchError::Transport("no attempt made".into());

        for r in 0..self.max_retries {
            if r > 0 {
                log::debug!("{iden}: retrying");
            }

            let client = match (&self.proxy_client, force_proxy) {
                (Some(proxy), true) => {
                    log::debug!("{iden}: using proxy");
                    proxy
                }
                _ => &self.client,
            };

            log::debug!("{iden}: requesting");

            let resp = match client.get(url_parsed.clone()).send() {
                Ok(r) => r,
                Err(err) => {
                    force_proxy = true;
                    log::warn!("{iden}: {err}: {:#?}", get_error(&err));
                    last_error = FetchError::Transport(get_error(&err));
                    continue;
                }
            };

            let status = resp.status();

            if status.is_success() {
                return resp.text().map_err(|err| {
                    log::debug!("{iden}: body read failed, timeout={}", err.is_timeout());
                    FetchError::Transport(get_error(&err))
                });
            }

            log::debug!("{iden}: {status}");
            last_error = FetchError::Status(status.as_u16());

            if status == StatusCode::TOO_MANY_REQUESTS {
                sleep(Duration::from_secs(u64::from(r + 1) * 2));
                continue;
            }

            if status.is_client_error() {
                // no need to try again, it's over...
                if force_proxy || self.proxy_client.is_none() {
                    break;
                }

                force_proxy = true;
            }
        }

        Err(last_error)
    }
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected_without_request() {
        let fetcher = HttpFetcher::new(&ScrapeConfig::default()).unwrap();
        let result = fetcher.fetch("not a url");
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        let config = ScrapeConfig {
            timeout_secs: 2,
            max_retries: 1,
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        // port 9 (discard) is not listening on loopback
        let result = fetcher.fetch("http://127.0.0.1:9/");
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
