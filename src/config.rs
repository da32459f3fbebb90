use crate::request::FieldMappings;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// The field-mapping file could not be read.
    #[error("Failed to read field mappings from {path}: {source}")]
    MappingsRead {
        /// Path named by `FIELD_MAPPINGS_FILE`.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The field-mapping file was not valid JSON for the mapping table.
    #[error("Failed to parse field mappings from {path}: {source}")]
    MappingsParse {
        /// Path named by `FIELD_MAPPINGS_FILE`.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime configuration for the chunkrelay server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Route that accepts content submissions.
    pub intake_path: String,
    /// Static API key attached to every callback POST.
    pub callback_api_key: Option<String>,
    /// Header name used to carry the callback API key.
    pub callback_api_key_header: String,
    /// Maximum number of chunks per callback envelope.
    pub batch_size: usize,
    /// Upper bound on pipelines running at the same time.
    pub pipeline_concurrency: usize,
    /// Whitespace-token budget used when splitting extracted text into pages.
    pub page_token_budget: usize,
    /// Connector tags handled natively by the platform.
    pub native_connectors: Vec<String>,
    /// Connector tags delivered through third-party ingestion.
    pub ingestion_connectors: Vec<String>,
    /// Declarative canonical-name to transport-key table.
    pub field_mappings: FieldMappings,
    /// Number of failure records retained for `GET /failures`.
    pub dead_letter_capacity: usize,
}

const DEFAULT_NATIVE_CONNECTORS: &[&str] = &[
    "confluenceServer",
    "confluenceCloud",
    "serviceNow",
    "zendesk",
    "sharepointOnline",
    "googleDrive",
    "azureStorage",
    "salesforce",
    "oracleKnowledge",
    "dropbox",
    "dotCMS",
    "customConnector",
];

const DEFAULT_INGESTION_CONNECTORS: &[&str] = &[
    "airtable",
    "github",
    "gitlab",
    "greenhouse",
    "hubspot",
    "jira",
    "marketo",
    "monday",
    "notion",
    "slack",
    "amazonAds",
    "amazonSellerPartner",
    "amplitude",
    "azureBlobStorage",
    "bingAds",
    "chargebee",
    "facebookMarketing",
    "fileCsvJsonExcelFeatherParquet",
    "freshdesk",
    "googleAds",
    "googleAnalytics4Ga4",
    "googleSearchConsole",
    "googleSheets",
    "harvest",
    "instagram",
    "intercom",
    "iterable",
    "klaviyo",
    "linkedinAds",
    "mailchimp",
    "microsoftSqlServer",
    "mixpanel",
    "mongodb",
    "mysql",
    "paypalTransaction",
    "pinterest",
    "postgres",
    "recharge",
    "s3",
    "sendgrid",
    "sentry",
    "shopify",
    "snapchatMarketing",
    "stripe",
    "surveymonkey",
    "tiktokMarketing",
    "twilio",
    "typeform",
    "woocommerce",
];

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: None,
            intake_path: "/extract".to_string(),
            callback_api_key: None,
            callback_api_key_header: "apikey".to_string(),
            batch_size: 50,
            pipeline_concurrency: 16,
            page_token_budget: 512,
            native_connectors: to_owned_list(DEFAULT_NATIVE_CONNECTORS),
            ingestion_connectors: to_owned_list(DEFAULT_INGESTION_CONNECTORS),
            field_mappings: FieldMappings::default(),
            dead_letter_capacity: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, layering values over the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let field_mappings = match optional("FIELD_MAPPINGS_FILE") {
            Some(path) => load_mappings(PathBuf::from(path))?,
            None => defaults.field_mappings,
        };

        Ok(Self {
            server_port: optional("SERVER_PORT")
                .map(|value| parse_value("SERVER_PORT", &value))
                .transpose()?,
            intake_path: optional("INTAKE_PATH")
                .map(|value| normalize_route(&value))
                .unwrap_or(defaults.intake_path),
            callback_api_key: optional("CALLBACK_API_KEY"),
            callback_api_key_header: optional("CALLBACK_API_KEY_HEADER")
                .map(|value| value.trim().to_ascii_lowercase())
                .unwrap_or(defaults.callback_api_key_header),
            batch_size: positive(
                optional("CALLBACK_BATCH_SIZE"),
                "CALLBACK_BATCH_SIZE",
                defaults.batch_size,
            )?,
            pipeline_concurrency: positive(
                optional("PIPELINE_CONCURRENCY"),
                "PIPELINE_CONCURRENCY",
                defaults.pipeline_concurrency,
            )?,
            page_token_budget: positive(
                optional("EXTRACTION_PAGE_TOKENS"),
                "EXTRACTION_PAGE_TOKENS",
                defaults.page_token_budget,
            )?,
            native_connectors: optional("NATIVE_CONNECTORS")
                .map(|value| split_list(&value))
                .unwrap_or(defaults.native_connectors),
            ingestion_connectors: optional("INGESTION_CONNECTORS")
                .map(|value| split_list(&value))
                .unwrap_or(defaults.ingestion_connectors),
            field_mappings,
            dead_letter_capacity: optional("DEAD_LETTER_CAPACITY")
                .map(|value| parse_value("DEAD_LETTER_CAPACITY", &value))
                .transpose()?
                .unwrap_or(defaults.dead_letter_capacity),
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn positive(value: Option<String>, key: &str, default: usize) -> Result<usize, ConfigError> {
    match value {
        Some(raw) => match parse_value::<usize>(key, &raw)? {
            0 => Err(ConfigError::InvalidValue(key.to_string())),
            parsed => Ok(parsed),
        },
        None => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_route(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn load_mappings(path: PathBuf) -> Result<FieldMappings, ConfigError> {
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::MappingsRead {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::MappingsParse { path, source })
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        intake_path = %config.intake_path,
        server_port = ?config.server_port,
        batch_size = config.batch_size,
        pipeline_concurrency = config.pipeline_concurrency,
        native_connectors = config.native_connectors.len(),
        ingestion_connectors = config.ingestion_connectors.len(),
        has_api_key = config.callback_api_key.is_some(),
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
