// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use plandesk_app::{
    Directory, EntityKind, PageParams, RemoteSort, RequestStatus, Row, RowId, Value,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::BTreeMap;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use url::Url;

const ENVELOPE_KEYS: [&str; 3] = ["data", "items", "results"];
const ORIGINAL_ID_KEYS: [&str; 2] = ["original_id", "originalId"];
const PENDING_STATUS: &str = "pending";

/// Blocking HTTP client for the admin backend.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let mut base_url =
            Url::parse(trimmed).with_context(|| format!("parse api.base_url {trimmed:?}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                base_url.scheme()
            );
        }
        if base_url.cannot_be_a_base() {
            bail!("api.base_url {trimmed:?} cannot carry a path");
        }
        let path = base_url.path().trim_end_matches('/').to_owned();
        base_url.set_path(&path);

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cheapest request that proves the backend answers: one organization.
    pub fn ping(&self) -> Result<()> {
        self.fetch_rows(
            EntityKind::Organization,
            PageParams {
                offset: 0,
                limit: Some(1),
            },
            None,
        )
        .map(|_| ())
    }

    pub fn fetch_rows(
        &self,
        kind: EntityKind,
        page: PageParams,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>> {
        let url = list_url(&self.base_url, kind, page, sort)?;
        log::debug!("GET {url}");
        let body = self.send(self.http.get(url))?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .with_context(|| format!("decode {} list", kind.as_str()))?;
        let mut rows = decode_rows(kind, value)?;
        if kind == EntityKind::Request {
            rows.retain(is_decided);
        }
        Ok(rows)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("api.base_url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(clean_error_response(status, &body));
        }
        Ok(body)
    }
}

impl Directory for Client {
    fn list(
        &mut self,
        kind: EntityKind,
        page: PageParams,
        sort: Option<&RemoteSort>,
    ) -> Result<Vec<Row>> {
        self.fetch_rows(kind, page, sort)
    }

    fn delete(&mut self, kind: EntityKind, id: &RowId) -> Result<()> {
        let url = self.endpoint(&[collection(kind), id.as_str()])?;
        log::info!("DELETE {url}");
        self.send(self.http.delete(url))?;
        Ok(())
    }

    fn transition_request(
        &mut self,
        kind: EntityKind,
        id: &RowId,
        status: RequestStatus,
    ) -> Result<()> {
        let url = self.endpoint(&[collection(kind), id.as_str()])?;
        log::info!("PATCH {url} status={}", status.as_str());
        self.send(self.http.patch(url).json(&StatusPatch {
            status: status.as_str(),
        }))?;
        Ok(())
    }

    fn set_admin(&mut self, kind: EntityKind, id: &RowId, admin: bool) -> Result<()> {
        let url = self.endpoint(&[collection(kind), id.as_str()])?;
        let role = if admin { "admin" } else { "member" };
        log::info!("PATCH {url} role={role}");
        self.send(self.http.patch(url).json(&RolePatch { role }))?;
        Ok(())
    }

    fn assign_plan(&mut self, plan_id: &RowId, organization_ids: &[RowId]) -> Result<()> {
        let url = self.endpoint(&[
            collection(EntityKind::Insurance),
            plan_id.as_str(),
            "assignments",
        ])?;
        log::info!("POST {url} ({} organizations)", organization_ids.len());
        self.send(self.http.post(url).json(&AssignmentRequest {
            organization_ids: organization_ids.iter().map(RowId::as_str).collect(),
        }))?;
        Ok(())
    }
}

/// Path segment the backend serves a kind under.
pub fn collection(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Organization => "organizations",
        EntityKind::User => "users",
        EntityKind::Insurance => "insurance",
        EntityKind::Pending | EntityKind::Request => "requests",
        EntityKind::ViewOnly => "audit",
    }
}

pub fn list_url(
    base_url: &Url,
    kind: EntityKind,
    page: PageParams,
    sort: Option<&RemoteSort>,
) -> Result<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow!("api.base_url cannot carry a path"))?
        .pop_if_empty()
        .push(collection(kind));
    {
        let mut query = url.query_pairs_mut();
        if kind == EntityKind::Pending {
            query.append_pair("status", PENDING_STATUS);
        }
        if let Some(sort) = sort {
            query.append_pair("order_by", &sort.order_by);
            query.append_pair("direction", sort.direction.as_str());
        }
        if page.offset > 0 {
            query.append_pair("offset", &page.offset.to_string());
        }
        if let Some(limit) = page.limit {
            query.append_pair("limit", &limit.to_string());
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

/// The requests collection serves every status; the requests tab only shows
/// the ones already approved or denied.
fn is_decided(row: &Row) -> bool {
    !row
        .text("status")
        .is_some_and(|status| status.trim().eq_ignore_ascii_case(PENDING_STATUS))
}

/// Turns a list response into rows. Accepts a bare array or an object
/// wrapping it under `data`, `items` or `results`.
pub fn decode_rows(kind: EntityKind, value: serde_json::Value) -> Result<Vec<Row>> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut object) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(serde_json::Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| anyhow!("{} list response has no row array", kind.as_str()))?,
        other => bail!(
            "{} list response must be an array, got {}",
            kind.as_str(),
            json_type(&other)
        ),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            serde_json::Value::Object(object) => decode_row(kind, object)
                .with_context(|| format!("{} row {index}", kind.as_str())),
            other => bail!(
                "{} row {index} must be an object, got {}",
                kind.as_str(),
                json_type(&other)
            ),
        })
        .collect()
}

fn decode_row(kind: EntityKind, mut object: Map<String, serde_json::Value>) -> Result<Row> {
    let raw_id = object
        .remove("id")
        .ok_or_else(|| anyhow!("missing id"))
        .and_then(json_id)?;
    let original_id = ORIGINAL_ID_KEYS
        .iter()
        .find_map(|key| object.remove(*key))
        .filter(|value| !value.is_null())
        .map(json_id)
        .transpose()?;

    let prefix = kind.profile().display_prefix();
    let (id, original_id) = match original_id {
        Some(original) => (raw_id, Some(original)),
        None if !prefix.is_empty() && !raw_id.as_str().starts_with(prefix) => (
            RowId::new(format!("{prefix}{raw_id}"))?,
            Some(raw_id),
        ),
        None => (raw_id, None),
    };

    let fields: BTreeMap<String, Value> = object
        .into_iter()
        .map(|(name, value)| (name, json_value(value)))
        .collect();
    Ok(Row {
        id,
        original_id,
        fields,
    })
}

fn json_id(value: serde_json::Value) -> Result<RowId> {
    match value {
        serde_json::Value::String(text) => RowId::new(text),
        serde_json::Value::Number(number) => RowId::new(number.to_string()),
        other => bail!("id must be a string or number, got {}", json_type(&other)),
    }
}

fn json_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Bool(flag),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(integer) => Value::Integer(integer),
            None => number.as_f64().map_or(Value::Null, Value::Decimal),
        },
        serde_json::Value::String(text) => parse_temporal(&text).unwrap_or(Value::Text(text)),
        nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            Value::Text(nested.to_string())
        }
    }
}

/// Date-shaped strings become dates or timestamps; anything else stays text.
fn parse_temporal(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let date_shaped = bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[7] == b'-';
    if !date_shaped {
        return None;
    }
    if bytes.len() == 10 {
        return Date::parse(text, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(Value::Date);
    }
    OffsetDateTime::parse(text, &Rfc3339)
        .ok()
        .map(Value::Timestamp)
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [api].base_url in the config ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = parsed
            .error
            .and_then(|error| match error {
                ErrorDetail::Text(text) => Some(text),
                ErrorDetail::Object { message } => message,
            })
            .or(parsed.message)
            .filter(|message| !message.trim().is_empty());
        if let Some(message) = message {
            return anyhow!("server error ({}): {}", status.as_u16(), message);
        }
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct StatusPatch<'a> {
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct RolePatch<'a> {
    role: &'a str,
}

#[derive(Debug, Serialize)]
struct AssignmentRequest<'a> {
    organization_ids: Vec<&'a str>,
}
