//! Fixed local-relay endpoints.
//!
//! Embedders that force all traffic through a local relay (a Tor-style
//! setup with a SOCKS listener on 9150 and an HTTP listener on 8218) skip
//! resolution entirely and read these accessors instead. The resolver
//! never consults them.

use crate::resolver::ProxyDescriptor;

/// Address of the local relay.
pub const RELAY_HOST: &str = "127.0.0.1";

/// SOCKS port of the local relay.
pub const RELAY_SOCKS_PORT: u16 = 9150;

/// HTTP port of the local relay.
pub const RELAY_HTTP_PORT: u16 = 8218;

/// The relay's SOCKS endpoint as a descriptor.
pub fn socks_relay() -> ProxyDescriptor {
    ProxyDescriptor::Socks {
        host: RELAY_HOST.to_string(),
        port: RELAY_SOCKS_PORT,
    }
}

/// The relay's HTTP endpoint as a descriptor.
pub fn http_relay() -> ProxyDescriptor {
    ProxyDescriptor::Http {
        host: RELAY_HOST.to_string(),
        port: RELAY_HTTP_PORT,
    }
}
