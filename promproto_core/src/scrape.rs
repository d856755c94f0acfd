use async_std::future::timeout;
use async_std::net::{TcpStream, ToSocketAddrs};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

use crate::debug::DEBUG;

/// Asks the endpoint for the delimited protobuf exposition format
pub const ACCEPT_HEADER: &str =
    "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=delimited";

const PROTOBUF_CONTENT_TYPE: &str = "application/vnd.google.protobuf";

/// How long to wait to resolve, connect and receive response headers.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the response body.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("invalid url {url:?}: {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported url scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
}

/// Fill in the parts of a scrape url users usually leave out.
///
/// A missing scheme defaults to `http://` and an empty path to `/metrics`;
/// anything that was given explicitly is kept as is.
pub fn normalize_url(input: &str) -> Result<Url, UrlError> {
    let input = input.trim();
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{}", input)
    };
    let mut url = Url::parse(&with_scheme).map_err(|source| UrlError::Invalid {
        url: input.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => (),
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/metrics");
    }
    Ok(url)
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("connection refused")]
    Refused,
    #[error("connection timed out")]
    ConnectTimeout,
    #[error("could not resolve host {host:?}")]
    UnresolvedHost {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    #[error("HTTP {code} {reason}")]
    Status { code: u16, reason: String },
    #[error("read timeout waiting for response")]
    ReadTimeout,
    #[error("failed to scrape: {0}")]
    Failed(surf::Error),
}

impl ScrapeError {
    /// A suggestion for the user on how to resolve the error, if there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ScrapeError::Refused => Some("Make sure the metrics server is running and accessible."),
            ScrapeError::ConnectTimeout => Some("The server may be unreachable or behind a firewall."),
            _ => None,
        }
    }

    fn from_connect(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ScrapeError::Refused,
            io::ErrorKind::TimedOut => ScrapeError::ConnectTimeout,
            _ => ScrapeError::Connect(err),
        }
    }
}

pub type ScrapeResult = std::result::Result<Scrape, ScrapeError>;

/// A successful response from a metrics endpoint
#[derive(Debug)]
pub struct Scrape {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl Scrape {
    /// Whether the server answered with the protobuf format.
    ///
    /// Some servers ignore the `Accept` header; the body is decoded anyway.
    pub fn has_protobuf_content_type(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|content_type| content_type.contains(PROTOBUF_CONTENT_TYPE))
            .unwrap_or(false)
    }
}

pub struct ScrapeTarget {
    /// The url to be scraped.
    ///
    /// e.g. http://10.0.15.15:9025/metrics
    pub url: Url,

    client: surf::Client,
}

impl ScrapeTarget {
    pub fn new(url: Url) -> Self {
        ScrapeTarget {
            url,
            client: surf::Client::new(),
        }
    }

    /// Make a request to the scrape target and return the response
    pub async fn scrape(&self) -> ScrapeResult {
        let result = self.fetch().await;
        match &result {
            Ok(scrape) => {
                DEBUG.scrape_succeeded(scrape.body.len());
                if !scrape.has_protobuf_content_type() {
                    DEBUG.content_type_mismatch();
                }
            }
            Err(err) => {
                DEBUG.scrape_failed();
                match err {
                    ScrapeError::ConnectTimeout | ScrapeError::ReadTimeout => DEBUG.scrape_timeout(),
                    ScrapeError::Refused => DEBUG.scrape_refused(),
                    _ => (),
                }
            }
        }
        result
    }

    /// Resolve the host and open (then drop) a connection to it.
    ///
    /// The http client reports connection failures as plain strings, so refused and timed
    /// out connections are classified here before the request is sent.
    async fn connect(&self) -> Result<(), ScrapeError> {
        let port = self.url.port_or_known_default().unwrap_or(80);
        let addrs: Vec<SocketAddr> = match self.url.host() {
            Some(Host::Domain(domain)) => (domain, port)
                .to_socket_addrs()
                .await
                .map_err(|source| ScrapeError::UnresolvedHost {
                    host: domain.to_string(),
                    source,
                })?
                .collect(),
            Some(Host::Ipv4(ip)) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
            Some(Host::Ipv6(ip)) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
            None => return Ok(()),
        };
        TcpStream::connect(&addrs[..])
            .await
            .map_err(ScrapeError::from_connect)?;
        Ok(())
    }

    async fn fetch(&self) -> ScrapeResult {
        timeout(CONNECT_TIMEOUT, self.connect())
            .await
            .map_err(|_| ScrapeError::ConnectTimeout)??;

        let request = surf::get(self.url.as_str()).header("Accept", ACCEPT_HEADER);
        let mut response = timeout(CONNECT_TIMEOUT, self.client.send(request))
            .await
            .map_err(|_| ScrapeError::ConnectTimeout)?
            .map_err(ScrapeError::Failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                code: status.into(),
                reason: status.canonical_reason().to_string(),
            });
        }
        let content_type = response
            .header("Content-Type")
            .map(|values| values.last().as_str().to_string());

        let body = timeout(READ_TIMEOUT, response.body_bytes())
            .await
            .map_err(|_| ScrapeError::ReadTimeout)?
            .map_err(ScrapeError::Failed)?;
        Ok(Scrape { body, content_type })
    }
}
