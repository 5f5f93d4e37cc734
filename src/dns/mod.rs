//! DNS Resolution Module
//!
//! Provides pluggable DNS resolution with support for:
//! - DNS-over-HTTP lookups with system fallback ([`HttpDnsResolver`])
//! - System resolver (getaddrinfo via thread pool)
//! - Hostname-to-IP override mechanism
//!
//! # Architecture
//!
//! The `Resolve` trait is the core abstraction that allows different
//! resolver implementations to be used interchangeably by a connection
//! path. [`HttpDnsResolver`] is itself a `Resolve` and owns another one as
//! its fallback.
//!
//! # Example
//!
//! ```rust,ignore
//! use httpdns::dns::{HttpDnsResolver, Name, Resolve};
//!
//! let resolver = HttpDnsResolver::new("/data/app/cache")?;
//! let addrs = resolver.resolve(Name::new("example.com")).await?;
//! for addr in addrs {
//!     println!("Resolved: {}", addr);
//! }
//! ```

pub mod answer;
mod gai;
mod httpdns;
mod resolve;

pub use gai::GaiResolver;
pub use httpdns::{
    HttpDnsResolver, HttpDnsResolverBuilder, PrimaryFailure, Resolution, TransportFactory,
};
pub use resolve::{Addrs, DnsResolverWithOverrides, HostOverrides, Name, Resolve, Resolving};
