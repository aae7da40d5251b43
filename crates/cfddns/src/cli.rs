// Command-line surface of the cfddns binary.
//
// Flags mirror the classic cloudflare-ddns helper: one action flag, a
// target selection (`--domain`, or `--zone` with `--alias`, or raw lines),
// and value flags. Every combination rule is checked here, before any
// remote call is made.

use cfddns_core::config::{AUTOMATIC_TTL, MIN_TTL};
use cfddns_core::target::parse_bool;
use cfddns_core::{ClientConfig, Credentials, Error, ProxyConfig, Result, SessionConfig};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A DDNS helper for Cloudflare: list, create, update or delete A, AAAA and
/// CNAME records.
#[derive(Parser, Debug)]
#[command(name = "cfddns")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("action").multiple(false)))]
pub struct Cli {
    /// Email of the Cloudflare account (with --api-key)
    #[arg(short, long, env = "CF_API_EMAIL")]
    pub email: Option<String>,

    /// Global API key of the Cloudflare account
    #[arg(short = 'k', long, env = "CF_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Scoped API token (used instead of --email/--api-key)
    #[arg(long, env = "CF_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// List all zones
    #[arg(long, group = "action")]
    pub list_zone: bool,

    /// List records of the selected zones or domains
    #[arg(long, group = "action")]
    pub list_record: bool,

    /// Make the selected names hold exactly the given records
    #[arg(long, group = "action")]
    pub update_record: bool,

    /// Create the given records, leaving existing ones alone
    #[arg(long, group = "action")]
    pub add_record: bool,

    /// Delete the selected records
    #[arg(long, group = "action")]
    pub delete_record: bool,

    /// Zone (root domain) in Cloudflare
    #[arg(short, long)]
    pub zone: Vec<String>,

    /// Fully-qualified name; "--alias a --zone example.com" is "--domain a.example.com"
    #[arg(short, long)]
    pub domain: Vec<String>,

    /// Name prefix inside each --zone ("@" for the zone apex)
    #[arg(short, long)]
    pub alias: Vec<String>,

    /// IPv4 address(es) for A records
    #[arg(short = '4', long = "ipv4")]
    pub ipv4: Vec<String>,

    /// IPv6 address(es) for AAAA records
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: Vec<String>,

    /// Discover the public IPv4 address and use it like --ipv4
    #[arg(long)]
    pub detect_ipv4: bool,

    /// Discover the public IPv6 address and use it like --ipv6
    #[arg(long)]
    pub detect_ipv6: bool,

    /// CNAME target
    #[arg(short, long)]
    pub cname: Option<String>,

    /// CNAME target relative to each zone ("w1" becomes "w1.<zone>")
    #[arg(long)]
    pub cname_alias: Option<String>,

    /// Record type(s) to list or delete
    #[arg(long)]
    pub dns_type: Vec<String>,

    /// TTL for records (1 means automatic)
    #[arg(short, long, default_value_t = 60)]
    pub ttl: u32,

    /// Route traffic through Cloudflare's proxy
    #[arg(
        long,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        value_parser = parse_flag
    )]
    pub proxied: bool,

    /// Raw record "name,type,content,ttl,proxied", applied to every --zone
    #[arg(short, long)]
    pub raw: Vec<String>,

    /// File with one raw record per line
    #[arg(long)]
    pub raw_file: Option<PathBuf>,

    /// Raw record whose content is relative to each --zone
    #[arg(long)]
    pub raw_alias: Vec<String>,

    /// File with one alias-style raw record per line
    #[arg(long)]
    pub raw_alias_file: Option<PathBuf>,

    /// Proxy for http:// requests
    #[arg(long, env = "HTTP_PROXY")]
    pub http_proxy: Option<String>,

    /// Proxy for https:// requests
    #[arg(long, env = "HTTPS_PROXY")]
    pub https_proxy: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Pause between mutating calls, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CFDDNS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    parse_bool(value).map_err(|e| e.to_string())
}

/// The single operation a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ListZones,
    ListRecords,
    Update,
    Create,
    Delete,
}

impl Cli {
    /// The selected action
    pub fn command(&self) -> Result<Command> {
        let selected = [
            (self.list_zone, Command::ListZones),
            (self.list_record, Command::ListRecords),
            (self.update_record, Command::Update),
            (self.add_record, Command::Create),
            (self.delete_record, Command::Delete),
        ];
        let mut chosen = selected.iter().filter(|(set, _)| *set).map(|(_, command)| *command);

        match (chosen.next(), chosen.next()) {
            (Some(command), None) => Ok(command),
            (None, _) => Err(Error::validation(
                "no action given; use one of --list-zone, --list-record, --update-record, --add-record, --delete-record",
            )),
            (Some(_), Some(_)) => Err(Error::validation("only one action may be given")),
        }
    }

    /// Credentials from flags or environment
    ///
    /// An API token takes precedence over an email/key pair.
    pub fn credentials(&self) -> Result<Credentials> {
        let credentials = match (&self.api_token, &self.email, &self.api_key) {
            (Some(token), _, _) if !token.is_empty() => Credentials::api_token(token),
            (_, Some(email), Some(key)) => Credentials::api_key(email, key),
            (_, None, _) => {
                return Err(Error::validation("no email; use --email or --api-token"));
            }
            (_, _, None) => {
                return Err(Error::validation("no API key; use --api-key or --api-token"));
            }
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => Err(Error::validation(format!(
                "log level {other:?} is not valid; use trace, debug, info, warn or error"
            ))),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout_secs: self.timeout,
            proxy: ProxyConfig::new(self.http_proxy.clone(), self.https_proxy.clone()),
            ..ClientConfig::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_default_ttl(self.ttl)
            .with_default_proxied(self.proxied)
            .with_inter_call_delay(Duration::from_millis(self.delay_ms))
    }

    fn has_addresses(&self) -> bool {
        !self.ipv4.is_empty() || !self.ipv6.is_empty() || self.detect_ipv4 || self.detect_ipv6
    }

    fn has_cname(&self) -> bool {
        self.cname.is_some() || self.cname_alias.is_some()
    }

    fn has_plain_raw(&self) -> bool {
        !self.raw.is_empty() || self.raw_file.is_some()
    }

    fn has_alias_raw(&self) -> bool {
        !self.raw_alias.is_empty() || self.raw_alias_file.is_some()
    }

    fn has_raw(&self) -> bool {
        self.has_plain_raw() || self.has_alias_raw()
    }

    /// Check flag combinations
    ///
    /// Zone and domain existence are checked later, once zones are known.
    pub fn validate(&self) -> Result<Command> {
        let command = self.command()?;
        self.credentials()?;
        self.log_level()?;

        if self.ttl != AUTOMATIC_TTL && self.ttl < MIN_TTL {
            return Err(Error::validation(format!(
                "--ttl must be {AUTOMATIC_TTL} (automatic) or at least {MIN_TTL}, got {}",
                self.ttl
            )));
        }
        if self.timeout == 0 {
            return Err(Error::validation("--timeout must be greater than zero"));
        }
        if command == Command::ListZones {
            return Ok(command);
        }

        if self.has_addresses() {
            if self.has_cname() {
                return Err(Error::validation(
                    "do not use --cname or --cname-alias with --ipv4 or --ipv6",
                ));
            }
            if self.has_raw() {
                return Err(Error::validation(
                    "do not use --raw, --raw-file, --raw-alias or --raw-alias-file with --ipv4 or --ipv6",
                ));
            }
            self.check_zone_or_domain()?;
        } else if self.has_cname() {
            if self.has_raw() {
                return Err(Error::validation(
                    "do not use --raw, --raw-file, --raw-alias or --raw-alias-file with --cname or --cname-alias",
                ));
            }
            if self.cname.is_some() && self.cname_alias.is_some() {
                return Err(Error::validation("use either --cname or --cname-alias, not both"));
            }
            if self.cname_alias.is_some() {
                if self.zone.is_empty() || self.alias.is_empty() {
                    return Err(Error::validation("use --zone and --alias with --cname-alias"));
                }
                if !self.domain.is_empty() {
                    return Err(Error::validation("do not use --domain with --cname-alias"));
                }
            } else {
                self.check_zone_or_domain()?;
            }
        } else if self.has_raw() {
            if !self.alias.is_empty() || !self.domain.is_empty() {
                return Err(Error::validation(
                    "do not use --alias or --domain with --raw, --raw-file, --raw-alias or --raw-alias-file",
                ));
            }
            if self.zone.is_empty() {
                return Err(Error::validation(
                    "use --zone with --raw, --raw-file, --raw-alias or --raw-alias-file",
                ));
            }
            if self.has_plain_raw() && self.has_alias_raw() {
                return Err(Error::validation(
                    "do not use --raw or --raw-file with --raw-alias or --raw-alias-file",
                ));
            }
        } else if self.zone.is_empty() && self.domain.is_empty() {
            return Err(Error::validation("no zone or domain given; use --zone or --domain"));
        }

        Ok(command)
    }

    fn check_zone_or_domain(&self) -> Result<()> {
        if !self.zone.is_empty() {
            if self.alias.is_empty() {
                return Err(Error::validation("use --alias with --zone"));
            }
            if !self.domain.is_empty() {
                return Err(Error::validation("do not use --domain with --zone"));
            }
        } else if self.domain.is_empty() {
            return Err(Error::validation("use --zone with --alias, or --domain"));
        }
        Ok(())
    }
}
