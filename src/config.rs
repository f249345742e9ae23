//! Settings sources for the resolver.
//!
//! The resolver reads settings through the [`ConfigSource`] trait: a plain
//! key-value lookup keyed by the legacy JVM networking property names
//! (`http.proxyHost`, `proxyPort`, `socksProxyHost`, ...). This module
//! provides the trait plus the built-in sources:
//!
//! - [`ProxyConfig`]: a typed YAML settings file with per-scheme sections
//! - [`EnvConfig`]: process environment variables, read live
//! - [`ConfigManager`]: thread-safe holder around [`ProxyConfig`] with
//!   hot-reloading via `notify`

use crate::error::{ProxyError, Result};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Read-only key-value lookup the resolver queries for proxy settings.
///
/// Keys are the recognized property names listed in [`ProxyConfig`].
/// Implementations must tolerate arbitrary keys and be safe for concurrent
/// reads; the resolver adds no locking of its own.
pub trait ConfigSource {
    /// Returns the raw string value for `key`, or `None` if unset.
    fn get(&self, key: &str) -> Option<String>;
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Ad-hoc source, mostly for tests and embedders with their own stores.
impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Proxy settings for one URL scheme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SchemeSettings {
    /// Proxy host for this scheme.
    pub proxy_host: Option<String>,

    /// Proxy port; `-1` disables the proxy for this scheme outright.
    pub proxy_port: Option<i32>,

    /// Hosts that bypass the proxy: `|`- or `,`-separated entries,
    /// `*` wildcards allowed.
    pub non_proxy_hosts: Option<String>,
}

/// Host/port pair for the tiers without an exclusion list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EndpointSettings {
    /// Proxy host.
    pub proxy_host: Option<String>,

    /// Proxy port; `-1` disables this tier outright.
    pub proxy_port: Option<i32>,
}

/// Root settings structure, loadable from a YAML file.
///
/// Every section is optional; a file with none of them resolves everything
/// to a direct connection. The [`ConfigSource`] impl maps the sections onto
/// the flat recognized-key namespace:
///
/// | Section           | Keys                                                        |
/// |-------------------|-------------------------------------------------------------|
/// | `http`            | `http.proxyHost`, `http.proxyPort`, `http.nonProxyHosts`    |
/// | `https`           | `https.proxyHost`, `https.proxyPort`, `https.nonProxyHosts` |
/// | `ftp`             | `ftp.proxyHost`, `ftp.proxyPort`, `ftp.nonProxyHosts`       |
/// | `generic`         | `proxyHost`, `proxyPort`                                    |
/// | `socks`           | `socksProxyHost`, `socksProxyPort`                          |
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Settings for plain HTTP targets.
    pub http: SchemeSettings,

    /// Settings for HTTPS targets.
    pub https: SchemeSettings,

    /// Settings for FTP targets.
    pub ftp: SchemeSettings,

    /// Generic HTTP proxy, the fallback for schemes without their own pair.
    pub generic: EndpointSettings,

    /// SOCKS proxy, the last fallback for every scheme.
    pub socks: EndpointSettings,
}

impl ProxyConfig {
    /// Loads settings from a YAML file.
    ///
    /// An empty file is valid and yields default (all-direct) settings.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProxyError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(ProxyConfig::default());
        }

        let config: ProxyConfig =
            serde_yaml::from_str(&contents).map_err(|e| ProxyError::config_parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validates the settings.
    ///
    /// Ports must be `-1` (disabled) or fit in 0-65535. The resolver itself
    /// tolerates junk from arbitrary sources; the file loader is stricter so
    /// typos surface at load time instead of silently picking default ports.
    pub fn validate(&self) -> Result<()> {
        for (section, port) in [
            ("http", self.http.proxy_port),
            ("https", self.https.proxy_port),
            ("ftp", self.ftp.proxy_port),
            ("generic", self.generic.proxy_port),
            ("socks", self.socks.proxy_port),
        ] {
            if let Some(port) = port {
                if port != -1 && !(0..=65535).contains(&port) {
                    return Err(ProxyError::config_validation(format!(
                        "{section}: proxy_port {port} out of range (0-65535, or -1 to disable)"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Applies a single override by recognized key name.
    ///
    /// Returns false for unrecognized keys and for port values that are not
    /// integers; the settings are left untouched in both cases.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let string_slot = match key {
            "http.proxyHost" => Some(&mut self.http.proxy_host),
            "https.proxyHost" => Some(&mut self.https.proxy_host),
            "ftp.proxyHost" => Some(&mut self.ftp.proxy_host),
            "proxyHost" => Some(&mut self.generic.proxy_host),
            "socksProxyHost" => Some(&mut self.socks.proxy_host),
            "http.nonProxyHosts" => Some(&mut self.http.non_proxy_hosts),
            "https.nonProxyHosts" => Some(&mut self.https.non_proxy_hosts),
            "ftp.nonProxyHosts" => Some(&mut self.ftp.non_proxy_hosts),
            _ => None,
        };
        if let Some(slot) = string_slot {
            *slot = Some(value.to_string());
            return true;
        }

        let port_slot = match key {
            "http.proxyPort" => Some(&mut self.http.proxy_port),
            "https.proxyPort" => Some(&mut self.https.proxy_port),
            "ftp.proxyPort" => Some(&mut self.ftp.proxy_port),
            "proxyPort" => Some(&mut self.generic.proxy_port),
            "socksProxyPort" => Some(&mut self.socks.proxy_port),
            _ => None,
        };
        if let Some(slot) = port_slot {
            return match value.parse() {
                Ok(port) => {
                    *slot = Some(port);
                    true
                }
                Err(_) => false,
            };
        }

        false
    }
}

impl ConfigSource for ProxyConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "http.proxyHost" => self.http.proxy_host.clone(),
            "http.proxyPort" => self.http.proxy_port.map(|port| port.to_string()),
            "http.nonProxyHosts" => self.http.non_proxy_hosts.clone(),
            "https.proxyHost" => self.https.proxy_host.clone(),
            "https.proxyPort" => self.https.proxy_port.map(|port| port.to_string()),
            "https.nonProxyHosts" => self.https.non_proxy_hosts.clone(),
            "ftp.proxyHost" => self.ftp.proxy_host.clone(),
            "ftp.proxyPort" => self.ftp.proxy_port.map(|port| port.to_string()),
            "ftp.nonProxyHosts" => self.ftp.non_proxy_hosts.clone(),
            "proxyHost" => self.generic.proxy_host.clone(),
            "proxyPort" => self.generic.proxy_port.map(|port| port.to_string()),
            "socksProxyHost" => self.socks.proxy_host.clone(),
            "socksProxyPort" => self.socks.proxy_port.map(|port| port.to_string()),
            _ => None,
        }
    }
}

/// Settings source reading the recognized keys verbatim from process
/// environment variables.
///
/// Values are read live on every lookup, not snapshotted, so changes made
/// through [`std::env::set_var`] are observed by the next resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl EnvConfig {
    /// Creates an environment-backed source.
    pub fn new() -> Self {
        Self
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Thread-safe settings holder with hot-reload support.
#[derive(Clone)]
pub struct ConfigManager {
    /// Current settings.
    config: Arc<RwLock<ProxyConfig>>,

    /// Path to the settings file.
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager and loads the initial settings.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref().to_path_buf();
        let config = ProxyConfig::load(&config_path)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Gets a clone of the current settings.
    pub fn snapshot(&self) -> ProxyConfig {
        self.config.read().unwrap().clone()
    }

    /// Reloads the settings from disk.
    ///
    /// On failure the previous settings stay in place.
    pub fn reload(&self) -> Result<()> {
        info!("Reloading proxy settings from {:?}", self.config_path);

        match ProxyConfig::load(&self.config_path) {
            Ok(new_config) => {
                let mut config = self.config.write().unwrap();
                *config = new_config;
                info!("Proxy settings reloaded successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to reload proxy settings: {}", e);
                Err(e)
            }
        }
    }

    /// Starts watching the settings file for changes.
    /// Returns a channel receiver that signals once per successful reload.
    pub fn start_watcher(&self) -> Result<Receiver<()>> {
        let (reload_tx, reload_rx) = std::sync::mpsc::channel();
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = notify_tx.send(());
                    }
                }
            },
            NotifyConfig::default(),
        )?;

        // Watch the parent directory to catch file replacements. A bare
        // relative filename has an empty parent; watch the file itself then.
        let watch_path = match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => self.config_path.as_path(),
        };
        watcher.watch(watch_path, RecursiveMode::NonRecursive)?;

        info!("Started watching {:?} for changes", self.config_path);

        let manager = self.clone();
        std::thread::spawn(move || {
            // The watcher stops when dropped; keep it alive with the thread.
            let _watcher = watcher;

            // Debounce: editors write in several steps, reload once.
            let mut last_reload = std::time::Instant::now();
            let debounce_duration = std::time::Duration::from_millis(500);

            loop {
                match notify_rx.recv() {
                    Ok(()) => {
                        let now = std::time::Instant::now();
                        if now.duration_since(last_reload) >= debounce_duration {
                            if manager.reload().is_ok() {
                                last_reload = now;
                                if reload_tx.send(()).is_err() {
                                    break;
                                }
                            }
                        } else {
                            debug!("Debouncing settings reload");
                        }
                    }
                    Err(_) => {
                        warn!("Settings watcher channel closed");
                        break;
                    }
                }
            }
        });

        Ok(reload_rx)
    }
}

impl ConfigSource for ConfigManager {
    fn get(&self, key: &str) -> Option<String> {
        self.config.read().unwrap().get(key)
    }
}
