//! DNS-over-HTTP resolver with system fallback.
//!
//! Lookups go to an HTTP DNS service first (`GET http://119.29.29.29/d?dn=<host>`),
//! which answers with a bare dotted-decimal address. When the service cannot be
//! reached, or answers with anything else, the lookup is retried once through
//! the fallback resolver ([`GaiResolver`] unless configured otherwise).
//!
//! # Example
//!
//! ```rust,ignore
//! use httpdns::dns::HttpDnsResolver;
//!
//! let resolver = HttpDnsResolver::new("/data/app/cache")?;
//! let ip = resolver.get_address_string("example.com").await?;
//! ```

use super::answer::{parse_answer, AnswerError};
use super::resolve::addrs_from_ips;
use super::{GaiResolver, HostOverrides, Name, Resolve, Resolving};
use crate::base::neterror::NetError;
use crate::client::HttpDnsClient;
use crate::config::HttpDnsConfig;
use crate::http::DnsTransport;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use url::Url;

/// Builds the transport on first use.
pub type TransportFactory = Arc<dyn Fn() -> Arc<dyn DnsTransport> + Send + Sync>;

/// Why the HTTP DNS answer was not used.
#[derive(Debug, Clone)]
pub enum PrimaryFailure {
    /// Network or protocol failure talking to the service.
    Transport(NetError),
    /// The service answered, but not with a usable address. Holds a
    /// prefix of the body.
    MalformedAnswer(String),
}

impl fmt::Display for PrimaryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryFailure::Transport(e) => write!(f, "transport failure: {e}"),
            PrimaryFailure::MalformedAnswer(body) => write!(f, "malformed answer: {body:?}"),
        }
    }
}

/// Outcome of one pass through the resolution pipeline.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Answered from the override table.
    Overridden(Vec<IpAddr>),
    /// The HTTP DNS service answered.
    Primary(Vec<IpAddr>),
    /// The service was unusable and the fallback resolver answered.
    Fallback {
        addrs: Vec<IpAddr>,
        cause: PrimaryFailure,
    },
    /// No address. `cause` is `None` when the query was rejected up front.
    Failed {
        error: NetError,
        cause: Option<PrimaryFailure>,
    },
}

impl Resolution {
    pub fn used_fallback(&self) -> bool {
        matches!(
            self,
            Resolution::Fallback { .. } | Resolution::Failed { cause: Some(_), .. }
        )
    }

    /// Addresses on success, the terminal error otherwise.
    pub fn into_result(self) -> Result<Vec<IpAddr>, NetError> {
        match self {
            Resolution::Overridden(addrs)
            | Resolution::Primary(addrs)
            | Resolution::Fallback { addrs, .. } => Ok(addrs),
            Resolution::Failed { error, .. } => Err(error),
        }
    }
}

/// Where lookups are sent.
#[derive(Debug, Clone)]
struct Endpoint {
    base: Url,
    path: String,
    query_key: String,
    client_ip: Option<IpAddr>,
}

impl Endpoint {
    fn from_config(config: &HttpDnsConfig) -> Result<Self, NetError> {
        let base = Url::parse(&format!("http://{}/", config.server))
            .map_err(|_| NetError::InvalidUrl)?;
        if base.host_str().is_none() || base.cannot_be_a_base() {
            return Err(NetError::InvalidUrl);
        }
        Ok(Self {
            base,
            path: config.path.clone(),
            query_key: config.query_key.clone(),
            client_ip: config.client_ip,
        })
    }

    fn url_for(&self, name: &Name) -> Result<Url, NetError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| NetError::InvalidUrl)?
            .clear()
            .push(&self.path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(&self.query_key, name.as_str());
            if let Some(ip) = self.client_ip {
                query.append_pair("ip", &ip.to_string());
            }
        }
        Ok(url)
    }
}

struct Inner {
    endpoint: Endpoint,
    transport: OnceLock<Arc<dyn DnsTransport>>,
    make_transport: TransportFactory,
    fallback: Arc<dyn Resolve>,
    overrides: HostOverrides,
}

/// Resolver that prefers an HTTP DNS service and falls back to the system.
///
/// Cloning is cheap and clones share the same transport. The transport is
/// built lazily on the first lookup, exactly once even under concurrent
/// first use, and lives as long as the resolver.
#[derive(Clone)]
pub struct HttpDnsResolver {
    inner: Arc<Inner>,
}

impl HttpDnsResolver {
    /// Resolver with default settings, caching under `<cache_dir>/httpdns`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, NetError> {
        Self::from_config(HttpDnsConfig::new().cache_dir(cache_dir))
    }

    /// Resolver built entirely from configuration.
    pub fn from_config(config: HttpDnsConfig) -> Result<Self, NetError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> HttpDnsResolverBuilder {
        HttpDnsResolverBuilder::default()
    }

    /// The lookup URL for `name`.
    pub fn query_url(&self, name: &Name) -> Result<Url, NetError> {
        self.inner.endpoint.url_for(name)
    }

    /// The shared transport, built on first call.
    pub fn transport(&self) -> &Arc<dyn DnsTransport> {
        self.inner.transport.get_or_init(|| {
            tracing::debug!("building http dns transport");
            (self.inner.make_transport)()
        })
    }

    /// Run the full pipeline and report which path produced the answer.
    pub async fn resolve_detailed(&self, name: impl Into<Name>) -> Resolution {
        let name = name.into();
        if let Err(error) = name.validate() {
            return Resolution::Failed { error, cause: None };
        }

        if let Some(ips) = self.inner.overrides.get(&name) {
            tracing::debug!(domain = %name, "answered from override table");
            return Resolution::Overridden(ips.to_vec());
        }

        let cause = match self.query_primary(&name).await {
            Ok(addrs) => return Resolution::Primary(addrs),
            Err(cause) => cause,
        };

        tracing::warn!(domain = %name, cause = %cause, "http dns unusable, falling back");
        match self.inner.fallback.resolve(name.clone()).await {
            Ok(addrs) => {
                let addrs: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
                if addrs.is_empty() {
                    tracing::debug!(domain = %name, "fallback returned no addresses");
                    return Resolution::Failed {
                        error: NetError::host_resolution_failed(name.as_str()),
                        cause: Some(cause),
                    };
                }
                Resolution::Fallback { addrs, cause }
            }
            Err(e) => {
                tracing::debug!(domain = %name, error = %e, "fallback resolution failed");
                Resolution::Failed {
                    error: NetError::host_resolution_failed(name.as_str()),
                    cause: Some(cause),
                }
            }
        }
    }

    /// Resolve `name` to one or more addresses.
    pub async fn resolve(&self, name: impl Into<Name>) -> Result<Vec<IpAddr>, NetError> {
        self.resolve_detailed(name).await.into_result()
    }

    /// First resolved address of `name` in textual form.
    pub async fn get_address_string(&self, name: impl Into<Name>) -> Result<String, NetError> {
        let name = name.into();
        let addrs = self.resolve(name.clone()).await?;
        addrs
            .first()
            .map(ToString::to_string)
            .ok_or_else(|| NetError::host_resolution_failed(name.as_str()))
    }

    async fn query_primary(&self, name: &Name) -> Result<Vec<IpAddr>, PrimaryFailure> {
        let url = self.query_url(name).map_err(PrimaryFailure::Transport)?;
        tracing::debug!(domain = %name, url = %url, "resolving via http dns");

        let answer = self
            .transport()
            .fetch(&url)
            .await
            .map_err(PrimaryFailure::Transport)?;

        match parse_answer(answer.body()) {
            Ok(addrs) => {
                tracing::debug!(
                    domain = %name,
                    cached = answer.from_cache(),
                    "http dns resolution complete"
                );
                Ok(addrs)
            }
            Err(kind) => {
                let body = String::from_utf8_lossy(answer.body());
                let snippet: String = body.chars().take(64).collect();
                if kind == AnswerError::Address {
                    tracing::debug!(domain = %name, body = %snippet, "octet out of range");
                }
                Err(PrimaryFailure::MalformedAnswer(snippet))
            }
        }
    }
}

impl Resolve for HttpDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let this = self.clone();
        Box::pin(async move {
            let ips = HttpDnsResolver::resolve(&this, name).await?;
            Ok(addrs_from_ips(ips))
        })
    }
}

impl fmt::Debug for HttpDnsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDnsResolver")
            .field("endpoint", &self.inner.endpoint.base.as_str())
            .field("transport_ready", &self.inner.transport.get().is_some())
            .field("override_count", &self.inner.overrides.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpDnsResolver`].
#[derive(Default)]
pub struct HttpDnsResolverBuilder {
    config: HttpDnsConfig,
    make_transport: Option<TransportFactory>,
    fallback: Option<Arc<dyn Resolve>>,
    overrides: HostOverrides,
}

impl HttpDnsResolverBuilder {
    pub fn config(mut self, config: HttpDnsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`HttpDnsClient`] construction.
    pub fn transport_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn DnsTransport> + Send + Sync + 'static,
    {
        let factory: TransportFactory = Arc::new(factory);
        self.make_transport = Some(factory);
        self
    }

    /// Use an already-built transport.
    pub fn transport(self, transport: Arc<dyn DnsTransport>) -> Self {
        self.transport_factory(move || transport.clone())
    }

    /// Resolver consulted when the HTTP DNS answer is unusable.
    pub fn fallback(mut self, fallback: Arc<dyn Resolve>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Static answers that bypass both paths.
    pub fn overrides(mut self, overrides: HostOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn build(self) -> Result<HttpDnsResolver, NetError> {
        let endpoint = Endpoint::from_config(&self.config)?;
        let make_transport = match self.make_transport {
            Some(factory) => factory,
            None => {
                let config = self.config.clone();
                let factory: TransportFactory = Arc::new(move || {
                    Arc::new(HttpDnsClient::from_config(&config)) as Arc<dyn DnsTransport>
                });
                factory
            }
        };
        let fallback: Arc<dyn Resolve> = match self.fallback {
            Some(fallback) => fallback,
            None => Arc::new(GaiResolver::new()),
        };

        Ok(HttpDnsResolver {
            inner: Arc::new(Inner {
                endpoint,
                transport: OnceLock::new(),
                make_transport,
                fallback,
                overrides: self.overrides,
            }),
        })
    }
}
