//! Server configuration and CLI argument parsing
//!
//! This module handles all server configuration through:
//! - Command-line arguments
//! - Environment variables (with TOKENGATE_ prefix)
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! tokengate --upstream https://time.example.com --port 9090
//!
//! # Using environment variables
//! export TOKENGATE_UPSTREAM=https://time.example.com,https://time-backup.example.com
//! export TOKENGATE_BUCKET_SIZE=20
//! tokengate
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use std::time::Duration;
use tokengate::{RateLimitConfig, RefillPolicy};

/// Main configuration structure for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener configuration
    pub http: HttpConfig,
    /// Admission control parameters
    pub limiter: LimiterConfig,
    /// Upstream time API configuration
    pub upstream: UpstreamConfig,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Token bucket and cleanup sweep settings
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub tokens_per_interval: u32,
    /// Refill interval in milliseconds
    pub interval_ms: u64,
    pub bucket_size: u32,
    pub refill_policy: RefillPolicyArg,
    /// Idle time in seconds before a client's bucket is evicted
    pub idle_timeout_secs: u64,
    /// Period of the cleanup sweep in seconds
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URLs tried in order; the first success wins
    pub base_urls: Vec<String>,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
}

/// Refill policy as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillPolicyArg {
    Discard,
    Carry,
}

impl std::str::FromStr for RefillPolicyArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "discard" => Ok(RefillPolicyArg::Discard),
            "carry" => Ok(RefillPolicyArg::Carry),
            _ => Err(anyhow!(
                "Invalid refill policy: {}. Valid options are: discard, carry",
                s
            )),
        }
    }
}

impl From<RefillPolicyArg> for RefillPolicy {
    fn from(arg: RefillPolicyArg) -> Self {
        match arg {
            RefillPolicyArg::Discard => RefillPolicy::Discard,
            RefillPolicyArg::Carry => RefillPolicy::Carry,
        }
    }
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables with the
/// TOKENGATE_ prefix. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "tokengate",
    about = "Rate-limited edge mediator for an upstream time API",
    long_about = "Admits requests per client with a token bucket and forwards admitted requests to an upstream time API, falling back across base URLs.\n\nEnvironment variables with TOKENGATE_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // HTTP listener
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "TOKENGATE_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 8080,
        env = "TOKENGATE_PORT"
    )]
    pub port: u16,

    // Admission control
    #[arg(
        long,
        value_name = "N",
        help = "Tokens granted per interval",
        default_value_t = 1,
        env = "TOKENGATE_TOKENS_PER_INTERVAL"
    )]
    pub tokens_per_interval: u32,
    #[arg(
        long,
        value_name = "MS",
        help = "Refill interval (milliseconds)",
        default_value_t = 2000,
        env = "TOKENGATE_INTERVAL_MS"
    )]
    pub interval_ms: u64,
    #[arg(
        long,
        value_name = "N",
        help = "Maximum burst size per client",
        default_value_t = 10,
        env = "TOKENGATE_BUCKET_SIZE"
    )]
    pub bucket_size: u32,
    #[arg(
        long,
        value_name = "POLICY",
        help = "Refill policy: discard, carry",
        default_value = "discard",
        env = "TOKENGATE_REFILL_POLICY"
    )]
    pub refill_policy: RefillPolicyArg,
    #[arg(
        long,
        value_name = "SECS",
        help = "Idle time before a client's bucket is evicted (seconds)",
        default_value_t = 300,
        env = "TOKENGATE_IDLE_TIMEOUT"
    )]
    pub idle_timeout: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Cleanup sweep period (seconds)",
        default_value_t = 60,
        env = "TOKENGATE_CLEANUP_INTERVAL"
    )]
    pub cleanup_interval: u64,

    // Upstream
    #[arg(
        long,
        value_name = "URLS",
        help = "Comma-separated upstream base URLs, tried in order",
        value_delimiter = ',',
        env = "TOKENGATE_UPSTREAM"
    )]
    pub upstream: Vec<String>,
    #[arg(
        long,
        value_name = "MS",
        help = "Timeout per upstream attempt (milliseconds)",
        default_value_t = 5000,
        env = "TOKENGATE_UPSTREAM_TIMEOUT_MS"
    )]
    pub upstream_timeout_ms: u64,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "TOKENGATE_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No upstream base URL is specified
    /// - A limiter parameter is zero
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        let config = Self::from_args(args);
        config.validate()?;
        Ok(config)
    }

    fn from_args(args: Args) -> Self {
        Config {
            http: HttpConfig {
                host: args.host,
                port: args.port,
            },
            limiter: LimiterConfig {
                tokens_per_interval: args.tokens_per_interval,
                interval_ms: args.interval_ms,
                bucket_size: args.bucket_size,
                refill_policy: args.refill_policy,
                idle_timeout_secs: args.idle_timeout,
                cleanup_interval_secs: args.cleanup_interval,
            },
            upstream: UpstreamConfig {
                base_urls: args
                    .upstream
                    .into_iter()
                    .map(|url| url.trim().to_string())
                    .filter(|url| !url.is_empty())
                    .collect(),
                timeout_ms: args.upstream_timeout_ms,
            },
            log_level: args.log_level,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.upstream.base_urls.is_empty() {
            return Err(anyhow!(
                "At least one upstream base URL must be specified.\n\n\
                Example:\n  \
                tokengate --upstream https://time.example.com\n  \
                tokengate --upstream https://a.example.com,https://b.example.com\n\n\
                For more information, try '--help'"
            ));
        }

        if self.limiter.cleanup_interval_secs == 0 {
            return Err(anyhow!("Cleanup interval must be greater than zero"));
        }

        if self.upstream.timeout_ms == 0 {
            return Err(anyhow!("Upstream timeout must be greater than zero"));
        }

        self.rate_limit()?;
        Ok(())
    }

    /// Build the admission controller parameters
    pub fn rate_limit(&self) -> Result<RateLimitConfig> {
        RateLimitConfig::builder()
            .tokens_per_interval(self.limiter.tokens_per_interval)
            .interval(Duration::from_millis(self.limiter.interval_ms))
            .bucket_size(self.limiter.bucket_size)
            .refill_policy(self.limiter.refill_policy.into())
            .idle_timeout(Duration::from_secs(self.limiter.idle_timeout_secs))
            .build()
            .map_err(|e| anyhow!("{e}"))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.limiter.cleanup_interval_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("tokengate Environment Variables");
        println!("===============================");
        println!();
        println!("All environment variables use the TOKENGATE_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("HTTP Configuration:");
        println!("  TOKENGATE_HOST=<host>                    HTTP host [default: 127.0.0.1]");
        println!("  TOKENGATE_PORT=<port>                    HTTP port [default: 8080]");
        println!();

        println!("Admission Control:");
        println!("  TOKENGATE_TOKENS_PER_INTERVAL=<n>        Tokens granted per interval [default: 1]");
        println!("  TOKENGATE_INTERVAL_MS=<ms>               Refill interval [default: 2000]");
        println!("  TOKENGATE_BUCKET_SIZE=<n>                Burst size per client [default: 10]");
        println!(
            "  TOKENGATE_REFILL_POLICY=<policy>         Refill policy: discard, carry [default: discard]"
        );
        println!("  TOKENGATE_IDLE_TIMEOUT=<secs>            Idle eviction threshold [default: 300]");
        println!("  TOKENGATE_CLEANUP_INTERVAL=<secs>        Cleanup sweep period [default: 60]");
        println!();

        println!("Upstream:");
        println!("  TOKENGATE_UPSTREAM=<url,url,...>         Upstream base URLs (required)");
        println!("  TOKENGATE_UPSTREAM_TIMEOUT_MS=<ms>       Timeout per attempt [default: 5000]");
        println!();

        println!("General Configuration:");
        println!(
            "  TOKENGATE_LOG_LEVEL=<level>              Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  export TOKENGATE_UPSTREAM=https://time.example.com");
        println!("  export TOKENGATE_BUCKET_SIZE=20");
        println!("  tokengate --port 9090");
    }
}
