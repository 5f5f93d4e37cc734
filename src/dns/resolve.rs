//! Core DNS resolution types and traits.
//!
//! This module defines the `Resolve` trait and supporting types shared by
//! the HTTP DNS resolver, the system fallback and the override table.

use crate::base::neterror::NetError;
use std::{
    collections::HashMap,
    fmt,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
};

/// A domain name to resolve into IP addresses.
///
/// This is a lightweight wrapper around a hostname string that provides
/// a type-safe way to pass domain names to resolvers.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`] from any string-like type.
    #[inline]
    pub fn new(host: impl Into<Box<str>>) -> Self {
        Self { host: host.into() }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }

    /// True if the name is empty or only whitespace.
    pub fn is_empty(&self) -> bool {
        self.host.trim().is_empty()
    }

    /// Rejects names no resolver can act on.
    pub fn validate(&self) -> Result<(), NetError> {
        if self.is_empty() {
            return Err(NetError::InvalidArgument("hostname is empty"));
        }
        Ok(())
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Alias for an `Iterator` trait object over `SocketAddr`.
pub type Addrs = Box<dyn Iterator<Item = SocketAddr> + Send>;

/// Alias for the `Future` type returned by a DNS resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Addrs, NetError>> + Send>>;

/// Wraps plain IPs as port-0 socket addresses.
pub(crate) fn addrs_from_ips(ips: Vec<IpAddr>) -> Addrs {
    Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)))
}

/// Trait for DNS resolution.
///
/// This is the seam through which an HTTP client's connection path asks for
/// addresses. Implementations must be thread-safe.
///
/// # Design Notes
///
/// - Uses `&self` for concurrent resolution without mutable access.
/// - Returns boxed futures for trait object compatibility.
pub trait Resolve: Send + Sync {
    /// Resolves a domain name to IP addresses.
    ///
    /// The returned addresses will have port 0; callers should set the
    /// appropriate port based on the target service.
    fn resolve(&self, name: Name) -> Resolving;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name) -> Resolving {
        (**self).resolve(name)
    }
}

/// Static hostname-to-address table.
///
/// Keys are matched case-insensitively and a single trailing dot is ignored,
/// so `API.local.` and `api.local` hit the same entry.
#[derive(Debug, Clone, Default)]
pub struct HostOverrides {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl HostOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the addresses for `host`. Empty address lists are ignored.
    pub fn insert(&mut self, host: &str, addrs: Vec<IpAddr>) {
        if addrs.is_empty() {
            return;
        }
        self.entries.insert(normalize(host), addrs);
    }

    pub fn with(mut self, host: &str, addrs: Vec<IpAddr>) -> Self {
        self.insert(host, addrs);
        self
    }

    pub fn get(&self, name: &Name) -> Option<&[IpAddr]> {
        self.entries.get(&normalize(name.as_str())).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(host: &str) -> String {
    host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase()
}

/// DNS resolver wrapper that supports hostname overrides.
///
/// This resolver first checks a table of hostname-to-address overrides before
/// falling back to the underlying resolver. Useful for:
/// - Testing without real DNS
/// - Pinning hosts to a staging server during development
///
/// # Example
///
/// ```rust,ignore
/// use httpdns::dns::{DnsResolverWithOverrides, GaiResolver, HostOverrides};
///
/// let overrides = HostOverrides::new()
///     .with("api.local", vec!["127.0.0.1".parse().unwrap()]);
///
/// let resolver = DnsResolverWithOverrides::new(Arc::new(GaiResolver::new()), overrides);
/// ```
pub struct DnsResolverWithOverrides {
    inner: Arc<dyn Resolve>,
    overrides: Arc<HostOverrides>,
}

impl DnsResolverWithOverrides {
    /// Creates a new resolver with the given overrides.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fallback resolver for non-overridden hostnames.
    /// * `overrides` - Table of hostnames to their resolved addresses.
    pub fn new(inner: Arc<dyn Resolve>, overrides: HostOverrides) -> Self {
        Self {
            inner,
            overrides: Arc::new(overrides),
        }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(&self, name: Name) -> Resolving {
        if let Some(ips) = self.overrides.get(&name) {
            tracing::debug!(domain = %name, "answered from override table");
            let addrs = addrs_from_ips(ips.to_vec());
            return Box::pin(std::future::ready(Ok(addrs)));
        }
        self.inner.resolve(name)
    }
}

impl fmt::Debug for DnsResolverWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolverWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_name_from_str() {
        let name = Name::from("example.com");
        assert_eq!(name.as_str(), "example.com");
        assert_eq!(name.to_string(), "example.com");
    }

    #[test]
    fn test_empty_name_is_invalid() {
        assert!(matches!(
            Name::new("").validate(),
            Err(NetError::InvalidArgument(_))
        ));
        assert!(matches!(
            Name::new("   ").validate(),
            Err(NetError::InvalidArgument(_))
        ));
        assert!(Name::new("example.com").validate().is_ok());
    }

    #[test]
    fn test_overrides_normalize_keys() {
        let overrides =
            HostOverrides::new().with("API.Local.", vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);

        assert_eq!(
            overrides.get(&Name::new("api.local")),
            Some(&[IpAddr::V4(Ipv4Addr::LOCALHOST)][..])
        );
        assert!(overrides.get(&Name::new("other.local")).is_none());
    }

    #[test]
    fn test_overrides_ignore_empty_lists() {
        let overrides = HostOverrides::new().with("api.local", vec![]);
        assert!(overrides.is_empty());
    }

    struct MockResolver {
        response: Vec<SocketAddr>,
    }

    impl Resolve for MockResolver {
        fn resolve(&self, _name: Name) -> Resolving {
            let addrs = self.response.clone();
            Box::pin(async move { Ok(Box::new(addrs.into_iter()) as Addrs) })
        }
    }

    #[tokio::test]
    async fn test_override_resolver_hit() {
        let mock = Arc::new(MockResolver {
            response: vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 0)],
        });

        let overrides = HostOverrides::new().with(
            "override.local",
            vec![IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))],
        );

        let resolver = DnsResolverWithOverrides::new(mock, overrides);
        let addrs: Vec<_> = resolver
            .resolve(Name::new("override.local"))
            .await
            .unwrap()
            .collect();

        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(addrs[0].port(), 0);
    }

    #[tokio::test]
    async fn test_override_resolver_miss() {
        let mock = Arc::new(MockResolver {
            response: vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 0)],
        });

        let resolver = DnsResolverWithOverrides::new(mock, HostOverrides::new());

        let addrs: Vec<_> = resolver
            .resolve(Name::new("not-overridden.com"))
            .await
            .unwrap()
            .collect();

        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].ip(), IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
    }
}
