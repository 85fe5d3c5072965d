use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Request, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::BackendConfig,
    error::BackendError,
    geocoder::truncate_body,
    model::{MosqueRecord, MosqueUpdate},
};

use super::MosqueStore;

/// PostgREST client for a Supabase project.
///
/// Built once with [`SupabaseClient::connect`] and handed to whatever needs
/// the table; [`SupabaseClient::close`] ends its life.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    table_url: Url,
    anon_key: String,
    http: Client,
}

impl SupabaseClient {
    pub fn connect(config: &BackendConfig) -> Result<Self> {
        let base = format!("{}/rest/v1/", config.url.trim_end_matches('/'));
        let rest_url =
            Url::parse(&base).with_context(|| format!("Invalid backend URL '{}'", config.url))?;
        let table_url = rest_url
            .join(&config.table)
            .with_context(|| format!("Invalid table name '{}'", config.table))?;

        let http = Client::builder()
            .user_agent(concat!("masjid-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            table = %config.table,
            host = table_url.host_str().unwrap_or_default(),
            "backend client ready"
        );

        Ok(Self { table_url, anon_key: config.anon_key.clone(), http })
    }

    pub fn close(self) {
        info!(table_url = %self.table_url, "backend client closed");
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.anon_key).bearer_auth(&self.anon_key)
    }

    /// `GET {table}?select=*`
    pub fn list_request(&self) -> reqwest::Result<Request> {
        self.authorized(self.http.get(self.table_url.clone())).query(&[("select", "*")]).build()
    }

    /// `PATCH {table}?id=eq.{id}` with the six editable columns as the body.
    pub fn update_request(&self, id: i64, update: &MosqueUpdate) -> reqwest::Result<Request> {
        self.authorized(self.http.patch(self.table_url.clone()))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(update)
            .build()
    }

    async fn read_body(res: Response) -> Result<String, BackendError> {
        let status = res.status();
        let body = res.text().await.map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            let err = api_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "backend request failed");
            return Err(err);
        }

        Ok(body)
    }
}

#[async_trait]
impl MosqueStore for SupabaseClient {
    async fn list_mosques(&self) -> Result<Vec<MosqueRecord>, BackendError> {
        let req = self.list_request().map_err(|e| BackendError::Transport(e.to_string()))?;
        let res =
            self.http.execute(req).await.map_err(|e| BackendError::Transport(e.to_string()))?;

        let body = Self::read_body(res).await?;
        let rows: Vec<MosqueRecord> =
            serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))?;

        debug!(rows = rows.len(), "fetched mosques");
        Ok(rows)
    }

    async fn update_mosque(&self, id: i64, update: &MosqueUpdate) -> Result<(), BackendError> {
        let req =
            self.update_request(id, update).map_err(|e| BackendError::Transport(e.to_string()))?;
        let res =
            self.http.execute(req).await.map_err(|e| BackendError::Transport(e.to_string()))?;

        Self::read_body(res).await?;

        debug!(id, "updated mosque");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
}

/// PostgREST reports failures as `{code, message, details, hint}`; the
/// message is what the user gets to see.
pub fn api_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => BackendError::Api { message: err.message },
        Err(_) => BackendError::Status { status, body: truncate_body(body) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DEFAULT_TABLE,
        model::{Prayer, PrayerTimes},
    };

    fn config(url: &str) -> BackendConfig {
        BackendConfig { url: url.into(), anon_key: "anon".into(), table: DEFAULT_TABLE.into() }
    }

    #[test]
    fn table_url_is_under_rest_v1() {
        let client = SupabaseClient::connect(&config("https://abc.supabase.co/")).expect("valid");
        assert_eq!(client.table_url().as_str(), "https://abc.supabase.co/rest/v1/MasjidList");
        client.close();
    }

    fn header<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
        req.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn list_request_selects_all_columns() {
        let client = SupabaseClient::connect(&config("https://abc.supabase.co")).expect("valid");
        let req = client.list_request().expect("buildable");

        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(req.url().as_str(), "https://abc.supabase.co/rest/v1/MasjidList?select=*");
        assert_eq!(header(&req, "apikey"), Some("anon"));
        assert_eq!(header(&req, "authorization"), Some("Bearer anon"));
    }

    #[test]
    fn update_request_targets_row_and_sends_wire_times() {
        let client = SupabaseClient::connect(&config("https://abc.supabase.co")).expect("valid");
        let mut times = PrayerTimes {
            fajar: "05:17:00+05:00".to_string(),
            zuhr: "12:30:00+05:00".to_string(),
            asar: "16:00:00+05:00".to_string(),
            magribh: "18:45:00+05:00".to_string(),
            isha: "20:15:00+05:00".to_string(),
        };
        *times.get_mut(Prayer::Fajar) = "05:30:00+05:00".to_string();
        let update = MosqueUpdate { name: "Wazir Khan".into(), address: "Lahore".into(), times };

        let req = client.update_request(7, &update).expect("buildable");

        assert_eq!(req.method(), reqwest::Method::PATCH);
        assert_eq!(req.url().path(), "/rest/v1/MasjidList");
        assert_eq!(req.url().query(), Some("id=eq.7"));
        assert_eq!(header(&req, "apikey"), Some("anon"));
        assert_eq!(header(&req, "authorization"), Some("Bearer anon"));
        assert_eq!(header(&req, "prefer"), Some("return=minimal"));
        assert_eq!(header(&req, "content-type"), Some("application/json"));

        let bytes = req.body().and_then(|b| b.as_bytes()).expect("json body");
        let body: serde_json::Value = serde_json::from_slice(bytes).expect("valid json");
        assert_eq!(body["Fajar"], "05:30:00+05:00");
        assert_eq!(body["Isha"], "20:15:00+05:00");
        assert_eq!(body["Masjid_Name"], "Wazir Khan");
        assert_eq!(body["Masjid_Address"], "Lahore");
        assert_eq!(body.as_object().map(|o| o.len()), Some(7));
        assert!(body.get("id").is_none());
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = SupabaseClient::connect(&config("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid backend URL"));
    }

    #[test]
    fn postgrest_message_is_kept_verbatim() {
        let body = r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key"}"#;
        assert_eq!(api_error(409, body), BackendError::Api { message: "duplicate key".into() });
        assert_eq!(api_error(409, body).to_string(), "duplicate key");
    }

    #[test]
    fn non_json_error_keeps_status() {
        let err = api_error(502, "<html>Bad Gateway</html>");
        assert_eq!(
            err,
            BackendError::Status { status: 502, body: "<html>Bad Gateway</html>".into() }
        );
    }
}
