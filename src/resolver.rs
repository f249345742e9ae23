//! Proxy resolution logic.
//!
//! This module implements the resolution priority for a `(scheme, host)`
//! target:
//! 1. Scheme rule lookup (unrecognized schemes are never proxied)
//! 2. Exclusion list (`<scheme>.nonProxyHosts`): matching hosts go direct
//! 3. Scheme-specific proxy (`<scheme>.proxyHost` / `<scheme>.proxyPort`)
//! 4. Generic HTTP proxy (`proxyHost` / `proxyPort`)
//! 5. SOCKS proxy (`socksProxyHost` / `socksProxyPort`)
//!
//! Resolution never fails. A missing or malformed setting degrades to the
//! next tier and ultimately to a direct connection, with one exception: a
//! proxy port of `-1` disables that proxy outright, so the target resolves
//! to [`ProxyDescriptor::Direct`] without consulting lower tiers.

use crate::config::ConfigSource;
use crate::matcher::matches_exclusion_list;
use http::Uri;
use std::fmt;
use tracing::{debug, trace};

/// Generic HTTP proxy keys, consulted when the scheme rule allows fallback.
const GENERIC_HOST_KEY: &str = "proxyHost";
const GENERIC_PORT_KEY: &str = "proxyPort";

/// SOCKS proxy keys, consulted for every recognized scheme.
const SOCKS_HOST_KEY: &str = "socksProxyHost";
const SOCKS_PORT_KEY: &str = "socksProxyPort";
const SOCKS_DEFAULT_PORT: u16 = 1080;

/// Port value that explicitly disables a configured proxy.
const DISABLED_PORT: i32 = -1;

/// Scheme-specific proxy host/port key pair.
#[derive(Debug, Clone, Copy)]
struct KeyPair {
    host: &'static str,
    port: &'static str,
}

/// Per-scheme resolution rule.
///
/// Supporting a new scheme means adding a row to [`SCHEME_RULES`], not a
/// new branch in the resolver.
#[derive(Debug, Clone, Copy)]
struct SchemeRule {
    /// Scheme name, matched case-insensitively.
    scheme: &'static str,
    /// Port assumed when a proxy host is configured without a port.
    default_port: u16,
    /// Scheme-specific proxy keys, if the scheme has its own pair.
    keys: Option<KeyPair>,
    /// Exclusion-list key checked before any proxy lookup.
    exclusion_key: Option<&'static str>,
    /// Whether the generic `proxyHost`/`proxyPort` pair applies.
    generic_fallback: bool,
}

const SCHEME_RULES: [SchemeRule; 4] = [
    SchemeRule {
        scheme: "http",
        default_port: 80,
        keys: Some(KeyPair {
            host: "http.proxyHost",
            port: "http.proxyPort",
        }),
        exclusion_key: Some("http.nonProxyHosts"),
        generic_fallback: true,
    },
    SchemeRule {
        scheme: "https",
        default_port: 443,
        keys: Some(KeyPair {
            host: "https.proxyHost",
            port: "https.proxyPort",
        }),
        exclusion_key: Some("https.nonProxyHosts"),
        generic_fallback: true,
    },
    SchemeRule {
        // FTP targets are fetched through HTTP-style proxies, so the
        // assumed port is 80, not 21.
        scheme: "ftp",
        default_port: 80,
        keys: Some(KeyPair {
            host: "ftp.proxyHost",
            port: "ftp.proxyPort",
        }),
        exclusion_key: Some("ftp.nonProxyHosts"),
        generic_fallback: true,
    },
    SchemeRule {
        // Raw socket targets only ever use the SOCKS fallback; the
        // default port is never consulted.
        scheme: "socket",
        default_port: 0,
        keys: None,
        exclusion_key: None,
        generic_fallback: false,
    },
];

impl SchemeRule {
    /// Finds the rule for a scheme, matching ASCII case-insensitively.
    fn find(scheme: &str) -> Option<SchemeRule> {
        SCHEME_RULES
            .iter()
            .find(|rule| rule.scheme.eq_ignore_ascii_case(scheme))
            .copied()
    }
}

/// The flavor of proxy a lookup produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    /// HTTP-style proxy (also carries https and ftp targets).
    Http,
    /// SOCKS proxy.
    Socks,
}

/// Result of proxy resolution.
///
/// The proxied variants always carry both a host and a port; the host is an
/// unresolved name, since the engine never touches DNS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyDescriptor {
    /// Connect directly, without a proxy.
    Direct,

    /// Route through an HTTP-style proxy.
    Http {
        /// Proxy host.
        host: String,
        /// Proxy port.
        port: u16,
    },

    /// Route through a SOCKS proxy.
    Socks {
        /// Proxy host.
        host: String,
        /// Proxy port.
        port: u16,
    },
}

impl ProxyDescriptor {
    /// Builds a proxied descriptor of the given kind.
    pub fn proxied(kind: ProxyKind, host: impl Into<String>, port: u16) -> Self {
        match kind {
            ProxyKind::Http => Self::Http {
                host: host.into(),
                port,
            },
            ProxyKind::Socks => Self::Socks {
                host: host.into(),
                port,
            },
        }
    }

    /// Returns true for a direct (proxy-less) connection.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct)
    }

    /// The proxy endpoint host, if any.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Direct => None,
            Self::Http { host, .. } | Self::Socks { host, .. } => Some(host),
        }
    }

    /// The proxy endpoint port, if any.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Direct => None,
            Self::Http { port, .. } | Self::Socks { port, .. } => Some(*port),
        }
    }
}

impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "DIRECT"),
            Self::Http { host, port } => write!(f, "HTTP {host}:{port}"),
            Self::Socks { host, port } => write!(f, "SOCKS {host}:{port}"),
        }
    }
}

/// Proxy resolver over an injected settings source.
///
/// The resolver holds no state of its own: every call re-reads the source,
/// so a shared source such as [`crate::config::ConfigManager`] can change
/// between calls and the next resolution observes it.
#[derive(Debug, Clone)]
pub struct ProxyResolver<S> {
    source: S,
}

impl<S: ConfigSource> ProxyResolver<S> {
    /// Creates a resolver reading from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Selects the proxy for a `scheme`/`host` target.
    ///
    /// `scheme` is matched case-insensitively; `host` is a bare hostname
    /// without a port and may be empty. Resolution never fails: whatever
    /// the settings hold, some [`ProxyDescriptor`] comes back.
    pub fn select(&self, scheme: &str, host: &str) -> ProxyDescriptor {
        let Some(rule) = SchemeRule::find(scheme) else {
            trace!(scheme = %scheme, "Scheme is not proxy-eligible");
            return ProxyDescriptor::Direct;
        };

        // The exclusion list wins over every configured proxy.
        if let Some(key) = rule.exclusion_key {
            if let Some(pattern) = self.source.get(key) {
                if matches_exclusion_list(host, &pattern) {
                    debug!(host = %host, key = %key, "Host excluded from proxying");
                    return ProxyDescriptor::Direct;
                }
            }
        }

        if let Some(keys) = rule.keys {
            if let Some(descriptor) =
                self.lookup_proxy(keys.host, keys.port, ProxyKind::Http, rule.default_port)
            {
                debug!(
                    scheme = %rule.scheme,
                    descriptor = %descriptor,
                    "Resolved via scheme-specific proxy"
                );
                return descriptor;
            }
        }

        if rule.generic_fallback {
            if let Some(descriptor) = self.lookup_proxy(
                GENERIC_HOST_KEY,
                GENERIC_PORT_KEY,
                ProxyKind::Http,
                rule.default_port,
            ) {
                debug!(
                    scheme = %rule.scheme,
                    descriptor = %descriptor,
                    "Resolved via generic HTTP proxy"
                );
                return descriptor;
            }
        }

        if let Some(descriptor) = self.lookup_proxy(
            SOCKS_HOST_KEY,
            SOCKS_PORT_KEY,
            ProxyKind::Socks,
            SOCKS_DEFAULT_PORT,
        ) {
            debug!(
                scheme = %rule.scheme,
                descriptor = %descriptor,
                "Resolved via SOCKS proxy"
            );
            return descriptor;
        }

        trace!(scheme = %rule.scheme, host = %host, "No proxy configured");
        ProxyDescriptor::Direct
    }

    /// Selects the proxy for a URI target.
    ///
    /// Convenience wrapper over [`select`](Self::select) that extracts the
    /// scheme and host. URIs missing either piece resolve along the normal
    /// degradation path, which ends at `Direct`.
    pub fn select_uri(&self, uri: &Uri) -> ProxyDescriptor {
        self.select(uri.scheme_str().unwrap_or(""), uri.host().unwrap_or(""))
    }

    /// Looks up the proxy pair at `host_key`/`port_key`.
    ///
    /// `None` means the pair is not configured and resolution falls through
    /// to the next tier. A configured host whose port is `-1` yields
    /// `Some(Direct)`: the proxy is explicitly disabled and lower tiers
    /// must not be consulted.
    fn lookup_proxy(
        &self,
        host_key: &str,
        port_key: &str,
        kind: ProxyKind,
        default_port: u16,
    ) -> Option<ProxyDescriptor> {
        let host = self
            .source
            .get(host_key)
            .filter(|value| !value.is_empty())?;

        let port = self.lookup_int(port_key, i32::from(default_port));
        if port == DISABLED_PORT {
            debug!(key = %port_key, "Proxy explicitly disabled");
            return Some(ProxyDescriptor::Direct);
        }

        // Anything that does not fit a real port falls back to the default.
        let port = u16::try_from(port).unwrap_or(default_port);
        Some(ProxyDescriptor::proxied(kind, host, port))
    }

    /// Reads an integer setting, falling back to `default` when the value
    /// is absent or not an integer.
    fn lookup_int(&self, key: &str, default: i32) -> i32 {
        match self.source.get(key) {
            Some(value) => value.parse().unwrap_or(default),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_unrecognized_scheme_is_direct() {
        let resolver = ProxyResolver::new(source(&[
            ("http.proxyHost", "proxy.corp.example"),
            ("proxyHost", "fallback.corp.example"),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(resolver.select("gopher", "example.com"), ProxyDescriptor::Direct);
        assert_eq!(resolver.select("ws", "example.com"), ProxyDescriptor::Direct);
        assert_eq!(resolver.select("", "example.com"), ProxyDescriptor::Direct);
    }

    #[test]
    fn test_scheme_match_is_case_insensitive() {
        let resolver = ProxyResolver::new(source(&[("https.proxyHost", "proxy.corp.example")]));

        let expected = ProxyDescriptor::Http {
            host: "proxy.corp.example".to_string(),
            port: 443,
        };
        assert_eq!(resolver.select("https", "example.com"), expected);
        assert_eq!(resolver.select("HTTPS", "example.com"), expected);
        assert_eq!(resolver.select("hTtPs", "example.com"), expected);
    }

    #[test]
    fn test_scheme_specific_proxy_wins_over_generic() {
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "scheme.corp.example"),
            ("https.proxyPort", "8443"),
            ("proxyHost", "generic.corp.example"),
            ("proxyPort", "3128"),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(
            resolver.select("https", "example.com"),
            ProxyDescriptor::Http {
                host: "scheme.corp.example".to_string(),
                port: 8443,
            }
        );
    }

    #[test]
    fn test_generic_proxy_wins_over_socks() {
        let resolver = ProxyResolver::new(source(&[
            ("proxyHost", "generic.corp.example"),
            ("proxyPort", "3128"),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(
            resolver.select("http", "example.com"),
            ProxyDescriptor::Http {
                host: "generic.corp.example".to_string(),
                port: 3128,
            }
        );
    }

    #[test]
    fn test_generic_proxy_defaults_to_scheme_port() {
        // One generic host, no port: the assumed port follows the scheme.
        let resolver = ProxyResolver::new(source(&[("proxyHost", "generic.corp.example")]));

        assert_eq!(resolver.select("http", "example.com").port(), Some(80));
        assert_eq!(resolver.select("https", "example.com").port(), Some(443));
        assert_eq!(resolver.select("ftp", "example.com").port(), Some(80));
    }

    #[test]
    fn test_socks_fallback() {
        let resolver = ProxyResolver::new(source(&[
            ("socksProxyHost", "socks.corp.example"),
            ("socksProxyPort", "9150"),
        ]));

        assert_eq!(
            resolver.select("https", "example.com"),
            ProxyDescriptor::Socks {
                host: "socks.corp.example".to_string(),
                port: 9150,
            }
        );
    }

    #[test]
    fn test_socks_default_port() {
        let resolver = ProxyResolver::new(source(&[("socksProxyHost", "socks.corp.example")]));

        assert_eq!(resolver.select("http", "example.com").port(), Some(1080));
    }

    #[test]
    fn test_socket_scheme_only_uses_socks() {
        let resolver = ProxyResolver::new(source(&[
            ("http.proxyHost", "proxy.corp.example"),
            ("proxyHost", "generic.corp.example"),
        ]));
        assert_eq!(resolver.select("socket", "example.com"), ProxyDescriptor::Direct);

        let resolver = ProxyResolver::new(source(&[("socksProxyHost", "socks.corp.example")]));
        assert_eq!(
            resolver.select("socket", "example.com"),
            ProxyDescriptor::Socks {
                host: "socks.corp.example".to_string(),
                port: 1080,
            }
        );
    }

    #[test]
    fn test_exclusion_beats_configured_proxy() {
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "proxy.corp.example"),
            ("https.nonProxyHosts", "localhost|*.corp.example"),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(resolver.select("https", "localhost"), ProxyDescriptor::Direct);
        assert_eq!(
            resolver.select("https", "build.corp.example"),
            ProxyDescriptor::Direct
        );
        // Non-matching hosts still get the proxy.
        assert!(!resolver.select("https", "upstream.example").is_direct());
    }

    #[test]
    fn test_exclusion_key_is_per_scheme() {
        let resolver = ProxyResolver::new(source(&[
            ("http.proxyHost", "proxy.corp.example"),
            ("https.nonProxyHosts", "localhost"),
        ]));

        // The https exclusion list says nothing about http targets.
        assert_eq!(
            resolver.select("http", "localhost"),
            ProxyDescriptor::Http {
                host: "proxy.corp.example".to_string(),
                port: 80,
            }
        );
    }

    #[test]
    fn test_disabled_port_short_circuits() {
        // Port -1 disables the scheme proxy and must not fall through to
        // the perfectly good generic and SOCKS pairs below it.
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "proxy.corp.example"),
            ("https.proxyPort", "-1"),
            ("proxyHost", "generic.corp.example"),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(resolver.select("https", "example.com"), ProxyDescriptor::Direct);
    }

    #[test]
    fn test_disabled_generic_port_short_circuits() {
        let resolver = ProxyResolver::new(source(&[
            ("proxyHost", "generic.corp.example"),
            ("proxyPort", "-1"),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(resolver.select("http", "example.com"), ProxyDescriptor::Direct);
    }

    #[test]
    fn test_disabled_socks_port_is_direct() {
        let resolver = ProxyResolver::new(source(&[
            ("socksProxyHost", "socks.corp.example"),
            ("socksProxyPort", "-1"),
        ]));

        assert_eq!(resolver.select("http", "example.com"), ProxyDescriptor::Direct);
    }

    #[test]
    fn test_missing_port_uses_scheme_default() {
        let resolver = ProxyResolver::new(source(&[("http.proxyHost", "proxy.corp.example")]));
        assert_eq!(resolver.select("http", "example.com").port(), Some(80));

        let resolver = ProxyResolver::new(source(&[("https.proxyHost", "proxy.corp.example")]));
        assert_eq!(resolver.select("https", "example.com").port(), Some(443));

        // FTP goes through an HTTP proxy, so 80 rather than 21.
        let resolver = ProxyResolver::new(source(&[("ftp.proxyHost", "proxy.corp.example")]));
        assert_eq!(resolver.select("ftp", "example.com").port(), Some(80));
    }

    #[test]
    fn test_unparseable_port_uses_default() {
        let resolver = ProxyResolver::new(source(&[
            ("http.proxyHost", "proxy.corp.example"),
            ("http.proxyPort", "not-a-port"),
        ]));
        assert_eq!(resolver.select("http", "example.com").port(), Some(80));

        // Leading or trailing whitespace does not parse either.
        let resolver = ProxyResolver::new(source(&[
            ("http.proxyHost", "proxy.corp.example"),
            ("http.proxyPort", " 8080"),
        ]));
        assert_eq!(resolver.select("http", "example.com").port(), Some(80));
    }

    #[test]
    fn test_out_of_range_port_uses_default() {
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "proxy.corp.example"),
            ("https.proxyPort", "99999"),
        ]));
        assert_eq!(resolver.select("https", "example.com").port(), Some(443));

        // Only exactly -1 is the disable sentinel; other negatives are junk.
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "proxy.corp.example"),
            ("https.proxyPort", "-7"),
        ]));
        assert_eq!(resolver.select("https", "example.com").port(), Some(443));
    }

    #[test]
    fn test_empty_host_value_falls_through() {
        let resolver = ProxyResolver::new(source(&[
            ("http.proxyHost", ""),
            ("socksProxyHost", "socks.corp.example"),
        ]));

        assert_eq!(
            resolver.select("http", "example.com"),
            ProxyDescriptor::Socks {
                host: "socks.corp.example".to_string(),
                port: 1080,
            }
        );
    }

    #[test]
    fn test_no_settings_at_all_is_direct() {
        let resolver = ProxyResolver::new(HashMap::new());
        assert_eq!(resolver.select("https", "example.com"), ProxyDescriptor::Direct);
    }

    #[test]
    fn test_select_is_idempotent() {
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "proxy.corp.example"),
            ("https.proxyPort", "8443"),
        ]));

        let first = resolver.select("https", "example.com");
        let second = resolver.select("https", "example.com");
        assert_eq!(first, second);
    }

    #[test]
    fn test_select_uri() {
        let resolver = ProxyResolver::new(source(&[
            ("https.proxyHost", "proxy.corp.example"),
            ("https.nonProxyHosts", "*.corp.example"),
        ]));

        let uri: Uri = "https://upstream.example/path?q=1".parse().unwrap();
        assert_eq!(
            resolver.select_uri(&uri),
            ProxyDescriptor::Http {
                host: "proxy.corp.example".to_string(),
                port: 443,
            }
        );

        let excluded: Uri = "https://ci.corp.example/".parse().unwrap();
        assert_eq!(resolver.select_uri(&excluded), ProxyDescriptor::Direct);

        // A bare path has neither scheme nor host.
        let bare: Uri = "/relative/path".parse().unwrap();
        assert_eq!(resolver.select_uri(&bare), ProxyDescriptor::Direct);
    }

    #[test]
    fn test_descriptor_accessors() {
        let direct = ProxyDescriptor::Direct;
        assert!(direct.is_direct());
        assert_eq!(direct.host(), None);
        assert_eq!(direct.port(), None);

        let http = ProxyDescriptor::proxied(ProxyKind::Http, "proxy.corp.example", 3128);
        assert!(!http.is_direct());
        assert_eq!(http.host(), Some("proxy.corp.example"));
        assert_eq!(http.port(), Some(3128));

        let socks = ProxyDescriptor::proxied(ProxyKind::Socks, "socks.corp.example", 1080);
        match socks {
            ProxyDescriptor::Socks { ref host, port } => {
                assert_eq!(host, "socks.corp.example");
                assert_eq!(port, 1080);
            }
            _ => panic!("Expected Socks descriptor"),
        }
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(ProxyDescriptor::Direct.to_string(), "DIRECT");
        assert_eq!(
            ProxyDescriptor::Http {
                host: "proxy.corp.example".to_string(),
                port: 3128,
            }
            .to_string(),
            "HTTP proxy.corp.example:3128"
        );
        assert_eq!(
            ProxyDescriptor::Socks {
                host: "127.0.0.1".to_string(),
                port: 9150,
            }
            .to_string(),
            "SOCKS 127.0.0.1:9150"
        );
    }
}
