//! # proxy-select
//!
//! This crate decides which outbound proxy, if any, a client should use
//! for a given target, following the legacy JVM networking-property
//! conventions: `http.proxyHost`/`http.proxyPort` pairs per scheme, a
//! generic `proxyHost` fallback, a `socksProxyHost` fallback, and
//! `nonProxyHosts` wildcard exclusion lists.
//!
//! ## Modules
//!
//! - [`config`]: The [`ConfigSource`] lookup seam plus file, environment,
//!   and hot-reloading sources
//! - [`error`]: Error types for the settings surfaces
//! - [`fixed`]: Fixed local-relay endpoints for embedders that skip
//!   resolution
//! - [`logging`]: Logging setup for the CLI
//! - [`matcher`]: `nonProxyHosts` exclusion-pattern matching
//! - [`resolver`]: The resolution engine
//!
//! ## Example
//!
//! ```
//! use proxy_select::{ProxyDescriptor, ProxyResolver};
//! use std::collections::HashMap;
//!
//! let mut settings = HashMap::new();
//! settings.insert("https.proxyHost".to_string(), "proxy.corp.example".to_string());
//! settings.insert("https.nonProxyHosts".to_string(), "localhost|*.corp.example".to_string());
//!
//! let resolver = ProxyResolver::new(settings);
//!
//! // No port configured, so the scheme default (443 for https) applies.
//! assert_eq!(
//!     resolver.select("https", "upstream.example"),
//!     ProxyDescriptor::Http { host: "proxy.corp.example".to_string(), port: 443 }
//! );
//!
//! // Excluded hosts connect directly.
//! assert_eq!(resolver.select("https", "build.corp.example"), ProxyDescriptor::Direct);
//! ```
//!
//! ## Resolution Priority
//!
//! A `(scheme, host)` target resolves in the following order:
//!
//! 1. **Scheme rule**: unrecognized schemes are never proxied
//! 2. **Exclusion list**: hosts matching `<scheme>.nonProxyHosts` go direct
//! 3. **Scheme-specific proxy**: `<scheme>.proxyHost` / `<scheme>.proxyPort`
//! 4. **Generic HTTP proxy**: `proxyHost` / `proxyPort`
//! 5. **SOCKS proxy**: `socksProxyHost` / `socksProxyPort`
//!
//! A proxy port of `-1` disables that proxy outright: the target resolves
//! to a direct connection instead of falling through to a lower tier.

pub mod config;
pub mod error;
pub mod fixed;
pub mod logging;
pub mod matcher;
pub mod resolver;

pub use config::{ConfigManager, ConfigSource, EnvConfig, ProxyConfig};
pub use error::{ProxyError, Result};
pub use matcher::matches_exclusion_list;
pub use resolver::{ProxyDescriptor, ProxyKind, ProxyResolver};
