//! # proxy-select
//!
//! Resolves which proxy a client should use for one or more target URLs,
//! against a settings file, the process environment, or ad-hoc overrides.
//!
//! ## Features
//!
//! - **Scheme-aware resolution**: per-scheme proxy pairs with generic HTTP
//!   and SOCKS fallbacks
//! - **Exclusion lists**: `nonProxyHosts`-style wildcard patterns
//! - **Hot Reload**: `--watch` re-resolves when the settings file changes
//! - **Flexible Logging**: configurable log levels, formats, and outputs
//!
//! ## Usage
//!
//! ```bash
//! # Resolve against ./proxy.yaml (or /etc/proxy-select/proxy.yaml)
//! proxy-select https://example.com
//!
//! # Explicit settings file, several targets
//! proxy-select -c corp.yaml https://example.com ftp://mirror.example
//!
//! # Ad-hoc overrides, no file needed
//! proxy-select -D socksProxyHost=127.0.0.1 -D socksProxyPort=9150 https://example.com
//!
//! # Resolve against process environment variables
//! proxy-select --env https://example.com
//!
//! # Keep running and re-print whenever the settings file changes
//! proxy-select -c corp.yaml --watch https://example.com
//! ```
//!
//! Output is one line per target on stdout: the target followed by
//! `DIRECT`, `HTTP host:port`, or `SOCKS host:port`. Logs go to stderr.

use clap::Parser;
use http::Uri;
use proxy_select::config::{ConfigManager, ConfigSource, EnvConfig, ProxyConfig};
use proxy_select::logging::{self, LoggingConfig};
use proxy_select::resolver::ProxyResolver;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Resolves which proxy applies to target URLs, exclusion rules included.
#[derive(Parser, Debug)]
#[command(name = "proxy-select")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URLs to resolve (e.g. https://example.com)
    #[arg(required = true, value_name = "TARGET")]
    targets: Vec<String>,

    /// Path to the proxy settings file
    #[arg(short, long, env = "PROXY_SELECT_CONFIG", conflicts_with = "env")]
    config: Option<PathBuf>,

    /// Override a single setting by key, e.g. -D proxyHost=proxy.corp (repeatable)
    #[arg(
        short = 'D',
        long = "define",
        value_name = "KEY=VALUE",
        value_parser = parse_define,
        conflicts_with = "env"
    )]
    defines: Vec<(String, String)>,

    /// Resolve against process environment variables instead of a file
    #[arg(long)]
    env: bool,

    /// Keep running and re-resolve whenever the settings file changes
    #[arg(short, long, requires = "config", conflicts_with = "defines")]
    watch: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace, -vvvv trace+deps)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Log format
    #[arg(long, value_parser = ["pretty", "compact", "json"], default_value = "pretty")]
    log_format: String,

    /// Log destination: stderr, stdout, or a file path
    #[arg(long, default_value = "stderr", value_name = "DEST")]
    log_output: String,
}

impl Args {
    /// Converts verbosity count to log level string
    fn log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }
        match self.verbose {
            0 => None, // Use the default
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()), // 4+ includes dependency tracing
        }
    }

    /// Whether to include verbose dependency logging
    fn trace_deps(&self) -> bool {
        self.verbose >= 4
    }
}

/// Parses a KEY=VALUE override.
fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

/// Application entry point.
fn main() {
    let args = Args::parse();

    // Initialize logging before anything that might want to log
    let logging_config = LoggingConfig {
        output: args.log_output.clone(),
        format: logging::parse_format(&args.log_format),
        ..Default::default()
    };
    let _log_guard =
        match logging::init_logging(&logging_config, args.log_level(), args.trace_deps()) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Failed to initialize logging: {}", e);
                std::process::exit(1);
            }
        };

    info!(version = env!("CARGO_PKG_VERSION"), "Starting proxy-select");

    let targets = parse_targets(&args.targets);

    // Environment mode needs no settings file at all
    if args.env {
        info!("Resolving against process environment variables");
        let resolver = ProxyResolver::new(EnvConfig::new());
        print_resolutions(&resolver, &targets);
        return;
    }

    let (mut config, config_manager) = load_config(&args);

    for (key, value) in &args.defines {
        if !config.set(key, value) {
            warn!(key = %key, "Ignoring unrecognized or malformed override");
        }
    }

    if args.watch {
        // clap guarantees -c was given; a load failure still leaves us
        // without a manager, and there is nothing to watch then.
        let Some(manager) = config_manager else {
            error!("Cannot watch: settings file was not loaded");
            std::process::exit(1);
        };
        run_watch(&manager, &targets);
    } else {
        let resolver = ProxyResolver::new(config);
        print_resolutions(&resolver, &targets);
    }
}

/// Parses target arguments as URIs, exiting on malformed input.
fn parse_targets(raw: &[String]) -> Vec<(String, Uri)> {
    let mut targets = Vec::with_capacity(raw.len());
    for target in raw {
        match target.parse::<Uri>() {
            Ok(uri) => targets.push((target.clone(), uri)),
            Err(e) => {
                eprintln!("Invalid target {target:?}: {e}");
                std::process::exit(2);
            }
        }
    }
    targets
}

/// Resolves every target and prints one line per target to stdout.
fn print_resolutions<S: ConfigSource>(resolver: &ProxyResolver<S>, targets: &[(String, Uri)]) {
    for (raw, uri) in targets {
        let descriptor = resolver.select_uri(uri);
        println!("{} {}", raw, descriptor);
    }
}

/// Resolves once, then again after every settings reload.
fn run_watch(manager: &ConfigManager, targets: &[(String, Uri)]) {
    let resolver = ProxyResolver::new(manager.clone());
    print_resolutions(&resolver, targets);

    let rx = match manager.start_watcher() {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to start settings watcher: {}", e);
            std::process::exit(1);
        }
    };

    info!("Watching for settings changes, press Ctrl-C to stop");
    while rx.recv().is_ok() {
        print_resolutions(&resolver, targets);
    }
}

/// Load settings from file or use defaults
fn load_config(args: &Args) -> (ProxyConfig, Option<ConfigManager>) {
    // Determine settings path
    let config_path = args.config.clone().or_else(|| {
        // Check default paths
        let defaults = [
            "./proxy.yaml",
            "./proxy.yml",
            "/etc/proxy-select/proxy.yaml",
        ];
        defaults.iter().map(PathBuf::from).find(|path| path.exists())
    });

    match config_path {
        Some(path) => {
            if path.exists() {
                match ConfigManager::new(&path) {
                    Ok(manager) => {
                        info!(path = %path.display(), "Loaded proxy settings");
                        let config = manager.snapshot();
                        (config, Some(manager))
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to load settings");
                        warn!("Continuing with empty settings");
                        (ProxyConfig::default(), None)
                    }
                }
            } else {
                // Explicitly specified path doesn't exist - warn but continue
                warn!(path = %path.display(), "Settings file not found");
                warn!("Continuing with empty settings");
                (ProxyConfig::default(), None)
            }
        }
        None => {
            // No settings file - empty settings resolve everything to DIRECT
            (ProxyConfig::default(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("proxyHost=proxy.corp.example"),
            Ok(("proxyHost".to_string(), "proxy.corp.example".to_string()))
        );
        // The first `=` splits; later ones belong to the value.
        assert_eq!(
            parse_define("key=a=b"),
            Ok(("key".to_string(), "a=b".to_string()))
        );
        assert!(parse_define("no-equals").is_err());
        assert!(parse_define("=value").is_err());
    }
}
