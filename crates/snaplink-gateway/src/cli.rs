use clap::{Parser, ValueEnum};
use snaplink_enrichment::geo::DEFAULT_API_URL_TEMPLATE;
use snaplink_generator::DEFAULT_ALPHABET;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "SNAPLINK_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "SNAPLINK_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SNAPLINK_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNAPLINK_MYSQL_DSN";
pub const MYSQL_MAX_CONNECTIONS_ENV: &str = "SNAPLINK_MYSQL_MAX_CONNECTIONS";
pub const CODE_LENGTH_ENV: &str = "SNAPLINK_CODE_LENGTH";
pub const ALPHABET_ENV: &str = "SNAPLINK_ALPHABET";
pub const GEO_LOOKUP_ENV: &str = "SNAPLINK_GEO_LOOKUP";
pub const GEO_API_URL_ENV: &str = "SNAPLINK_GEO_API_URL";
pub const GEO_TIMEOUT_SECS_ENV: &str = "SNAPLINK_GEO_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "SNAPLINK_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "snaplink-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public origin short URLs are rendered against.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = MYSQL_MAX_CONNECTIONS_ENV, default_value_t = 16)]
    pub mysql_max_connections: u32,

    /// Length of generated short codes.
    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = 6)]
    pub code_length: usize,

    #[arg(long, env = ALPHABET_ENV, default_value = DEFAULT_ALPHABET)]
    pub alphabet: String,

    /// Geolocate clicks through the HTTP lookup API.
    #[arg(long, env = GEO_LOOKUP_ENV)]
    pub geo_lookup: bool,

    /// Lookup URL with an `{ip}` placeholder.
    #[arg(long, env = GEO_API_URL_ENV, default_value = DEFAULT_API_URL_TEMPLATE)]
    pub geo_api_url: String,

    #[arg(long, env = GEO_TIMEOUT_SECS_ENV, default_value_t = 5)]
    pub geo_timeout_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
