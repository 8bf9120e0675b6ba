use std::env;
use std::fs::read_to_string;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use yaml_rust::{Yaml, YamlLoader};

use crate::error::ConfigError;

pub const DNS_PORT: u16 = 53;
pub const DEFAULT_CONFIG_FILE: &str = "resolver.yml";
pub const CONFIG_ENV_VAR: &str = "RESOLVER_CONFIG";

/// IPv4 addresses of a.root-servers.net through m.root-servers.net.
const ROOT_HINTS: [Ipv4Addr; 13] = [
    Ipv4Addr::new(198, 41, 0, 4),
    Ipv4Addr::new(170, 247, 170, 2),
    Ipv4Addr::new(192, 33, 4, 12),
    Ipv4Addr::new(199, 7, 91, 13),
    Ipv4Addr::new(192, 203, 230, 10),
    Ipv4Addr::new(192, 5, 5, 241),
    Ipv4Addr::new(192, 112, 36, 4),
    Ipv4Addr::new(198, 97, 190, 53),
    Ipv4Addr::new(192, 36, 148, 17),
    Ipv4Addr::new(192, 58, 128, 30),
    Ipv4Addr::new(193, 0, 14, 129),
    Ipv4Addr::new(199, 7, 83, 42),
    Ipv4Addr::new(202, 12, 27, 33),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Recursive resolver to forward to. Without one, resolution starts at
    /// the root servers.
    pub nameserver: Option<SocketAddr>,
    pub root_servers: Vec<SocketAddr>,
    /// How long one attempt waits for a reply.
    pub timeout: Duration,
    pub attempts: u32,
    /// Delay before the second attempt, doubled for each one after.
    pub backoff: Duration,
    pub max_referral_depth: usize,
    pub max_cname_depth: usize,
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            nameserver: None,
            root_servers: ROOT_HINTS
                .iter()
                .map(|ip| SocketAddr::new(IpAddr::V4(*ip), DNS_PORT))
                .collect(),
            timeout: Duration::from_millis(2000),
            attempts: 3,
            backoff: Duration::from_millis(200),
            max_referral_depth: 16,
            max_cname_depth: 8,
            cache_capacity: 1024,
        }
    }
}

impl ResolverConfig {
    /// Loads `path`, else the file named by `$RESOLVER_CONFIG`, else
    /// `resolver.yml` if the working directory has one. With none of those
    /// the defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let docs = YamlLoader::load_from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: display,
            source,
        })?;
        match docs.first() {
            Some(doc) => Self::from_yaml(doc),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(yaml: &Yaml) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        match yaml {
            Yaml::Hash(_) => {}
            Yaml::Null => return Ok(config),
            _ => return Err(invalid("<root>", "the config file must be a mapping")),
        }

        if let Some(value) = extract_string(yaml, "nameserver")? {
            config.nameserver = Some(parse_nameserver(&value).map_err(|e| invalid("nameserver", &e))?);
        }
        match &yaml["root-servers"] {
            Yaml::BadValue | Yaml::Null => {}
            Yaml::Array(entries) => {
                let mut servers = Vec::with_capacity(entries.len());
                for entry in entries {
                    let text = entry
                        .as_str()
                        .ok_or_else(|| invalid("root-servers", "entries must be strings"))?;
                    servers.push(parse_nameserver(text).map_err(|e| invalid("root-servers", &e))?);
                }
                if servers.is_empty() {
                    return Err(invalid("root-servers", "list is empty"));
                }
                config.root_servers = servers;
            }
            _ => return Err(invalid("root-servers", "must be a list")),
        }
        if let Some(ms) = extract_positive(yaml, "timeout-ms")? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = narrow::<u32>("attempts", extract_positive(yaml, "attempts")?)? {
            config.attempts = attempts;
        }
        if let Some(ms) = extract_integer(yaml, "backoff-ms")? {
            config.backoff = Duration::from_millis(ms);
        }
        if let Some(depth) = narrow::<usize>("max-referral-depth", extract_positive(yaml, "max-referral-depth")?)? {
            config.max_referral_depth = depth;
        }
        if let Some(depth) = narrow::<usize>("max-cname-depth", extract_integer(yaml, "max-cname-depth")?)? {
            config.max_cname_depth = depth;
        }
        if let Some(capacity) = narrow::<usize>("cache-capacity", extract_positive(yaml, "cache-capacity")?)? {
            config.cache_capacity = capacity;
        }
        Ok(config)
    }
}

/// Reads a root hints file: whitespace separated addresses, `#` starts a
/// comment.
pub fn load_root_servers(path: &Path) -> Result<Vec<SocketAddr>, ConfigError> {
    let contents = read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let servers = contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .map(|token| parse_nameserver(token).map_err(|e| invalid("root-servers", &e)))
        .collect::<Result<Vec<_>, _>>()?;
    if servers.is_empty() {
        return Err(invalid("root-servers", &format!("{} lists no servers", path.display())));
    }
    Ok(servers)
}

/// Accepts `1.2.3.4`, `1.2.3.4:5353`, `::1` or `[::1]:5353`.
pub fn parse_nameserver(text: &str) -> Result<SocketAddr, String> {
    let text = text.trim();
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Ok(addr);
    }
    text.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| format!("{:?} is not an IP address", text))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_owned(),
        reason: reason.to_owned(),
    }
}

fn extract_integer(yaml: &Yaml, key: &str) -> Result<Option<u64>, ConfigError> {
    match &yaml[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(n) if *n >= 0 => Ok(Some(*n as u64)),
        _ => Err(invalid(key, "must be a non-negative integer")),
    }
}

fn extract_positive(yaml: &Yaml, key: &str) -> Result<Option<u64>, ConfigError> {
    match extract_integer(yaml, key)? {
        Some(0) => Err(invalid(key, "must be greater than zero")),
        other => Ok(other),
    }
}

fn narrow<T: TryFrom<u64>>(key: &str, value: Option<u64>) -> Result<Option<T>, ConfigError> {
    value
        .map(|n| T::try_from(n).map_err(|_| invalid(key, &format!("{} is too large", n))))
        .transpose()
}

fn extract_string(yaml: &Yaml, key: &str) -> Result<Option<String>, ConfigError> {
    match &yaml[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(s) => Ok(Some(s.clone())),
        _ => Err(invalid(key, "must be a string")),
    }
}
