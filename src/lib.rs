//! # httpdns
//!
//! Hostname resolution through a DNS-over-HTTP service, with the system
//! resolver as fallback.
//!
//! Local or ISP resolvers can be hijacked, stale or slow. `httpdns` asks a
//! central HTTP endpoint instead (`GET http://119.29.29.29/d?dn=<host>`),
//! accepts only a bare dotted-decimal answer, and falls back to
//! `getaddrinfo` whenever the service is unreachable or answers with
//! anything else.
//!
//! ## Features
//!
//! - **Two-step pipeline**: primary HTTP lookup, exactly one fallback, tagged outcome
//! - **Response Cache**: on-disk, 10 MB budget, LRU eviction
//! - **Forced Freshness**: every answer is cacheable for 7200 seconds
//! - **Pluggable**: implements the [`dns::Resolve`] trait used by connection paths
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use httpdns::dns::HttpDnsResolver;
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolver = HttpDnsResolver::new("/data/app/cache").unwrap();
//!     let ip = resolver.get_address_string("example.com").await.unwrap();
//!     println!("example.com -> {ip}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core types and error definitions
//! - [`client`] - HTTP client performing the DNS-over-HTTP GET
//! - [`config`] - Resolver configuration
//! - [`dns`] - Resolvers and the `Resolve` trait
//! - [`http`] - Connections, response cache and freshness rewrite

pub mod base;
pub mod client;
pub mod config;
pub mod dns;
pub mod http;

pub use base::neterror::NetError;
pub use config::HttpDnsConfig;
pub use dns::{HttpDnsResolver, Resolution};
