//! Sierra REST API access.
use crate::conf::Credentials;
use crate::record::{Bib, Item};
use crate::result::{SierraError, SierraResult};
use crate::varfield::{self, VarField};
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::fmt;
use std::time::{Duration, Instant};

const BIB_FIELDS: &str = "varFields,items";
const ITEM_FIELDS: &str = "location,varFields";

/// Refresh the access token this many seconds before it expires.
const TOKEN_EXPIRE_MARGIN: u64 = 30;

/// Used when the token response has no expires_in value.
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

/// Read and update operations the reclass workflow needs from a
/// catalog.
pub trait Catalog {
    /// Fetch a bib record with its varFields and item links.
    ///
    /// Returns Err(BibNotFound) if the catalog has no such bib.
    fn get_bib(&mut self, bib_id: &str) -> SierraResult<Bib>;

    /// Fetch items by ID with their location and varFields.
    ///
    /// Callers are responsible for keeping the list within the API's
    /// per-request limit.
    fn get_items(&mut self, item_ids: &[String]) -> SierraResult<Vec<Item>>;

    /// Replace the varFields of an item.
    fn update_item(&mut self, item_id: &str, var_fields: &[VarField]) -> SierraResult<()>;

    /// Replace the varFields of a bib.
    fn update_bib(&mut self, bib_id: &str, var_fields: &[VarField]) -> SierraResult<()>;
}

struct AccessToken {
    value: String,
    expires: Instant,
}

/// Blocking client for the Sierra REST API.
///
/// An access token is requested on connect and refreshed as needed.
pub struct SierraClient {
    creds: Credentials,
    http_client: reqwest::blocking::Client,
    token: Option<AccessToken>,
}

impl fmt::Display for SierraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SierraClient [{}]", self.creds.host)
    }
}

impl SierraClient {
    /// Build the HTTP client and request an access token.
    pub fn connect(creds: Credentials) -> SierraResult<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(creds.timeout))
            .build()
            .map_err(|e| format!("Error building HTTP client: {e}"))?;

        let mut client = SierraClient {
            creds,
            http_client,
            token: None,
        };

        client.refresh_token()?;

        log::info!("{client} connected");

        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.creds.host)
    }

    fn refresh_token(&mut self) -> SierraResult<()> {
        log::debug!("{self} requesting access token");

        let body = serde_urlencoded::to_string([("grant_type", "client_credentials")])
            .map_err(|e| format!("Error encoding token request: {e}"))?;

        let res = self
            .http_client
            .post(self.url("token"))
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()?;

        let value = json::parse(&check_status(res)?.text()?)?;

        let token = value["access_token"]
            .as_str()
            .ok_or_else(|| SierraError::remote(None, format!("Token response has no access_token: {value}")))?;

        let lifetime = value["expires_in"].as_u64().unwrap_or(DEFAULT_TOKEN_LIFETIME);

        self.token = Some(AccessToken {
            value: token.to_string(),
            expires: Instant::now()
                + Duration::from_secs(lifetime.saturating_sub(TOKEN_EXPIRE_MARGIN)),
        });

        Ok(())
    }

    /// Returns a valid access token, requesting a new one if the
    /// current token is missing or about to expire.
    fn token(&mut self) -> SierraResult<String> {
        let expired = match self.token {
            Some(ref t) => Instant::now() >= t.expires,
            None => true,
        };

        if expired {
            self.refresh_token()?;
        }

        self.token
            .as_ref()
            .map(|t| t.value.to_string())
            .ok_or_else(|| "No access token available".into())
    }

    fn put_var_fields(&mut self, path: &str, var_fields: &[VarField]) -> SierraResult<()> {
        let token = self.token()?;
        let body = varfield::var_fields_update_body(var_fields).dump();

        log::trace!("{self} PUT {path} {body}");

        let res = self
            .http_client
            .put(self.url(path))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        check_status(res)?;

        log::debug!("{self} updated {path}");

        Ok(())
    }
}

impl Catalog for SierraClient {
    fn get_bib(&mut self, bib_id: &str) -> SierraResult<Bib> {
        let token = self.token()?;

        let res = self
            .http_client
            .get(self.url(&format!("bibs/{bib_id}")))
            .bearer_auth(token)
            .query(&[("fields", BIB_FIELDS)])
            .send()?;

        if res.status() == StatusCode::NOT_FOUND {
            return Err(SierraError::BibNotFound(bib_id.to_string()));
        }

        let value = json::parse(&check_status(res)?.text()?)?;

        Bib::from_json_value(bib_id, &value)
    }

    fn get_items(&mut self, item_ids: &[String]) -> SierraResult<Vec<Item>> {
        let token = self.token()?;
        let ids = item_ids.join(",");

        let res = self
            .http_client
            .get(self.url("items"))
            .bearer_auth(token)
            .query(&[("id", ids.as_str()), ("fields", ITEM_FIELDS)])
            .send()?;

        if res.status() == StatusCode::NOT_FOUND {
            // Sierra answers 404 when none of the requested items exist.
            log::warn!("{self} no items found for ids={ids}");
            return Ok(Vec::new());
        }

        let value = json::parse(&check_status(res)?.text()?)?;

        value["entries"].members().map(Item::from_json_value).collect()
    }

    fn update_item(&mut self, item_id: &str, var_fields: &[VarField]) -> SierraResult<()> {
        self.put_var_fields(&format!("items/{item_id}"), var_fields)
    }

    fn update_bib(&mut self, bib_id: &str, var_fields: &[VarField]) -> SierraResult<()> {
        self.put_var_fields(&format!("bibs/{bib_id}"), var_fields)
    }
}

impl Drop for SierraClient {
    fn drop(&mut self) {
        // Tokens expire on their own.  Just make sure we stop using it.
        self.token = None;
        log::debug!("{self} session closed");
    }
}

/// Turn non-2xx responses into Remote errors.
fn check_status(res: Response) -> SierraResult<Response> {
    let status = res.status();

    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().unwrap_or_default();

    Err(SierraError::remote(
        Some(status.as_u16()),
        format!("{} {text}", res_reason(status)),
    ))
}

fn res_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}
