//! Sierra API credentials and connection settings.
use crate::result::{SierraError, SierraResult};
use json::JsonValue;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CREDS_ENV_VAR: &str = "SIERRA_CREDS";
const HOME_CREDS_FILE: &str = ".sierra/creds.json";
const LOCAL_CREDS_FILE: &str = "./creds.json";

/// Max time we'll wait for a response to an HTTP request.
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: u64 = 60;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,

    /// API base URL, e.g. https://example.org/iii/sierra-api/v6
    pub host: String,

    /// HTTP request timeout in seconds.
    pub timeout: u64,
}

impl Credentials {
    /// Read credentials from a JSON file.
    pub fn from_json_file(filename: impl AsRef<Path>) -> SierraResult<Self> {
        let filename = filename.as_ref();

        let text = fs::read_to_string(filename)
            .map_err(|e| format!("Error reading credentials file {filename:?}: {e}"))?;

        let value = json::parse(&text)
            .map_err(|e| format!("Error parsing credentials file {filename:?}: {e}"))?;

        Credentials::from_json_value(&value)
    }

    /// ```
    /// use sierra::conf::Credentials;
    ///
    /// let value = json::object! {
    ///     "client_id": "me",
    ///     "client_secret": "shh",
    ///     "host": "https://example.org/iii/sierra-api/v6/"
    /// };
    ///
    /// let creds = Credentials::from_json_value(&value).unwrap();
    /// assert_eq!(creds.host, "https://example.org/iii/sierra-api/v6");
    /// assert_eq!(creds.timeout, 60);
    ///
    /// assert!(Credentials::from_json_value(&json::object! {"client_id": "me"}).is_err());
    /// ```
    pub fn from_json_value(value: &JsonValue) -> SierraResult<Self> {
        let required = |key: &str| -> SierraResult<String> {
            value[key]
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| SierraError::invalid(format!("Credentials require a '{key}' value")))
        };

        let timeout = match value["timeout"].as_u64() {
            Some(t) => t,
            None => DEFAULT_HTTP_REQUEST_TIMEOUT,
        };

        Ok(Credentials {
            client_id: required("client_id")?,
            client_secret: required("client_secret")?,
            host: required("host")?.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Find the credentials file.
    ///
    /// Checks the provided option value, the SIERRA_CREDS environment
    /// variable, ~/.sierra/creds.json, then ./creds.json.
    pub fn locate(option: Option<&str>) -> SierraResult<PathBuf> {
        if let Some(file) = option {
            return Ok(PathBuf::from(file));
        }

        if let Ok(file) = env::var(CREDS_ENV_VAR) {
            return Ok(PathBuf::from(file));
        }

        if let Ok(home) = env::var("HOME") {
            let path = Path::new(&home).join(HOME_CREDS_FILE);
            if path.exists() {
                return Ok(path);
            }
        }

        if Path::new(LOCAL_CREDS_FILE).exists() {
            return Ok(PathBuf::from(LOCAL_CREDS_FILE));
        }

        Err(SierraError::invalid(format!(
            "No credentials file found.  See --creds or {CREDS_ENV_VAR}"
        )))
    }
}
