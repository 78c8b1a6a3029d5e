// Tooling-API source: runs SOQL queries over HTTP and parses the records at
// the boundary into typed shapes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::SourceSection;
use crate::error::{ConfigError, FetchError};
use crate::types::{
    ComponentRecord, DependencyEdgeRecord, EdgeScope, Metric, MetricQuery, MetricRow,
    TypeDescriptor,
};

use super::RemoteSource;

/// Fields that may carry a component's display name, highest precedence first.
pub const NAME_FIELDS: [&str; 4] = ["Name", "DeveloperName", "MasterLabel", "FullName"];

/// Warn once daily API usage passes this share of the allowance.
const USAGE_WARN_PERCENT: u64 = 90;

const DEPENDENCY_FIELDS: &str = "MetadataComponentId, MetadataComponentName, \
     MetadataComponentType, RefMetadataComponentId, RefMetadataComponentName, \
     RefMetadataComponentType";

/// Remote source speaking the Tooling query API.
#[derive(Debug)]
pub struct ToolingSource {
    client: Client,
    instance_url: String,
    api_version: String,
    token: String,
    timeout: Duration,
    max_retries: u32,
    /// Calls used in the current window, from the `Sforce-Limit-Info` header.
    api_used: AtomicU64,
    api_limit: AtomicU64,
}

impl ToolingSource {
    /// Build a source from config, reading the token from the configured env var.
    pub fn from_config(config: &SourceSection) -> Result<Self, ConfigError> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| ConfigError::Invalid(format!("{} is not set", config.token_env)))?;
        Self::new(config, token)
    }

    pub fn new(config: &SourceSection, token: String) -> Result<Self, ConfigError> {
        let instance_url = config.require_instance_url()?.to_string();
        // The no-provider rustls feature leaves provider selection to us.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("depgraph/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            instance_url,
            api_version: config.api_version.clone(),
            token,
            timeout,
            max_retries: config.max_retries,
            api_used: AtomicU64::new(0),
            api_limit: AtomicU64::new(0),
        })
    }

    fn tooling_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/tooling/{path}",
            self.instance_url, self.api_version
        )
    }

    /// Run a query and collect every page of records.
    async fn query_records(&self, soql: &str) -> Result<Vec<Value>, FetchError> {
        let mut page: QueryPage = self
            .get_json(&self.tooling_url("query"), Some(soql))
            .await?;
        let mut records = std::mem::take(&mut page.records);

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                return Err(FetchError::Malformed(
                    "page not done but nextRecordsUrl missing".into(),
                ));
            };
            page = self
                .get_json(&format!("{}{next}", self.instance_url), None)
                .await?;
            records.append(&mut page.records);
        }

        debug!(records = records.len(), "query complete");
        Ok(records)
    }

    async fn query_typed<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, FetchError> {
        self.query_records(soql)
            .await?
            .into_iter()
            .map(|record| {
                serde_json::from_value(record).map_err(|e| FetchError::Malformed(e.to_string()))
            })
            .collect()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        soql: Option<&str>,
    ) -> Result<T, FetchError> {
        let mut delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            let mut req = self.client.get(url).bearer_auth(&self.token);
            if let Some(q) = soql {
                req = req.query(&[("q", q)]);
            }

            debug!(url, attempt, "Tooling API request");

            let resp = req.send().await.map_err(|e| self.classify(&e))?;
            self.update_usage(&resp);

            if resp.status().is_success() {
                let body = resp.text().await.map_err(|e| self.classify(&e))?;
                return serde_json::from_str(&body)
                    .map_err(|e| FetchError::Malformed(format!("{url}: {e}")));
            }

            let status = resp.status().as_u16();
            if (status == 429 || status == 503) && attempt < self.max_retries {
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(delay, Duration::from_secs);
                warn!(
                    attempt,
                    status,
                    wait_secs = wait.as_secs(),
                    "Rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(Duration::from_secs(60));
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            if status == 404 {
                return Err(FetchError::NotFound(format!("{url}: {body}")));
            }
            return Err(FetchError::Api { status, body });
        }

        Err(FetchError::Transient(format!(
            "max retries exceeded for {url}"
        )))
    }

    fn classify(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Transient(err.to_string())
        }
    }

    /// Track API usage from response headers.
    fn update_usage(&self, resp: &reqwest::Response) {
        let Some((used, limit)) = resp
            .headers()
            .get("sforce-limit-info")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_limit_info)
        else {
            return;
        };
        self.api_used.store(used, Ordering::Relaxed);
        self.api_limit.store(limit, Ordering::Relaxed);
        if limit > 0 && used * 100 >= limit * USAGE_WARN_PERCENT {
            warn!(used, limit, "Remote API usage high");
        }
    }

    /// Last observed `(used, limit)` API usage, if the remote reported one.
    pub fn api_usage(&self) -> Option<(u64, u64)> {
        let limit = self.api_limit.load(Ordering::Relaxed);
        (limit > 0).then(|| (self.api_used.load(Ordering::Relaxed), limit))
    }
}

#[async_trait::async_trait]
impl RemoteSource for ToolingSource {
    async fn describe_types(&self) -> Result<Vec<TypeDescriptor>, FetchError> {
        let global: GlobalDescribe = self.get_json(&self.tooling_url("sobjects"), None).await?;
        Ok(global
            .sobjects
            .into_iter()
            .filter(|s| s.queryable)
            .map(|s| TypeDescriptor::new(s.name))
            .collect())
    }

    async fn list_components(&self, type_name: &str) -> Result<Vec<ComponentRecord>, FetchError> {
        let soql = inventory_soql(type_name)?;
        let records = self.query_records(&soql).await?;
        records
            .iter()
            .map(|record| parse_component(record, type_name))
            .collect()
    }

    async fn query_dependency_edges(
        &self,
        scope: &EdgeScope,
    ) -> Result<Vec<DependencyEdgeRecord>, FetchError> {
        let Some(soql) = dependency_soql(scope) else {
            return Ok(Vec::new());
        };
        let rows: Vec<RawDependency> = self.query_typed(&soql).await?;
        Ok(rows.into_iter().map(RawDependency::into_record).collect())
    }

    async fn aggregate(&self, query: MetricQuery) -> Result<Vec<MetricRow>, FetchError> {
        match query {
            MetricQuery::ClassSize | MetricQuery::TriggerSize => {
                let table = if query == MetricQuery::ClassSize {
                    "ApexClass"
                } else {
                    "ApexTrigger"
                };
                let rows: Vec<RawSize> = self
                    .query_typed(&format!("SELECT Id, LengthWithoutComments FROM {table}"))
                    .await?;
                Ok(rows
                    .into_iter()
                    .filter_map(|r| {
                        Some(MetricRow {
                            id: r.id,
                            metric: Metric::Size(r.length?),
                        })
                    })
                    .collect())
            }
            MetricQuery::Coverage => {
                let rows: Vec<RawCoverage> = self
                    .query_typed(
                        "SELECT ApexClassOrTriggerId, NumLinesCovered, NumLinesUncovered \
                         FROM ApexCodeCoverageAggregate",
                    )
                    .await?;
                Ok(rows
                    .into_iter()
                    .map(|r| MetricRow {
                        id: r.id,
                        metric: Metric::Lines {
                            covered: r.covered.unwrap_or(0),
                            uncovered: r.uncovered.unwrap_or(0),
                        },
                    })
                    .collect())
            }
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    done: bool,
    next_records_url: Option<String>,
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GlobalDescribe {
    sobjects: Vec<SObjectSummary>,
}

#[derive(Debug, Deserialize)]
struct SObjectSummary {
    name: String,
    #[serde(default = "default_true")]
    queryable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawDependency {
    #[serde(rename = "MetadataComponentId")]
    source_id: String,
    #[serde(rename = "MetadataComponentName")]
    source_name: Option<String>,
    #[serde(rename = "MetadataComponentType")]
    source_type: Option<String>,
    #[serde(rename = "RefMetadataComponentId")]
    target_id: String,
    #[serde(rename = "RefMetadataComponentName")]
    target_name: Option<String>,
    #[serde(rename = "RefMetadataComponentType")]
    target_type: Option<String>,
}

impl RawDependency {
    fn into_record(self) -> DependencyEdgeRecord {
        DependencyEdgeRecord {
            source_id: self.source_id,
            source_name: self.source_name,
            source_type: self.source_type,
            target_id: self.target_id,
            target_name: self.target_name,
            target_type: self.target_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSize {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "LengthWithoutComments")]
    length: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawCoverage {
    #[serde(rename = "ApexClassOrTriggerId")]
    id: String,
    #[serde(rename = "NumLinesCovered")]
    covered: Option<i64>,
    #[serde(rename = "NumLinesUncovered")]
    uncovered: Option<i64>,
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Pick a display name from a raw record using [`NAME_FIELDS`] precedence.
/// Empty strings are skipped.
pub fn resolve_display_name(record: &Map<String, Value>) -> Option<String> {
    NAME_FIELDS.iter().find_map(|field| {
        record
            .get(*field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn parse_component(record: &Value, type_name: &str) -> Result<ComponentRecord, FetchError> {
    let map = record
        .as_object()
        .ok_or_else(|| FetchError::Malformed(format!("{type_name} record is not an object")))?;
    let id = map
        .get("Id")
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::Malformed(format!("{type_name} record without Id")))?;
    Ok(ComponentRecord {
        id: id.to_string(),
        name: resolve_display_name(map),
        kind: Some(type_name.to_string()),
    })
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn inventory_soql(type_name: &str) -> Result<String, FetchError> {
    if !is_identifier(type_name) {
        return Err(FetchError::NotFound(format!("invalid type name: {type_name}")));
    }
    Ok(format!("SELECT FIELDS(STANDARD) FROM {type_name}"))
}

/// Quote a value for a SOQL string literal.
fn soql_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Build the dependency query for `scope`; `None` when the scope is empty.
fn dependency_soql(scope: &EdgeScope) -> Option<String> {
    let filter = match scope {
        EdgeScope::OfType(name) => format!("MetadataComponentType = {}", soql_quote(name)),
        EdgeScope::ById(ids) => {
            if ids.is_empty() {
                return None;
            }
            let list = ids
                .iter()
                .map(|id| soql_quote(id))
                .collect::<Vec<_>>()
                .join(", ");
            format!("MetadataComponentId IN ({list}) OR RefMetadataComponentId IN ({list})")
        }
    };
    Some(format!(
        "SELECT {DEPENDENCY_FIELDS} FROM MetadataComponentDependency WHERE {filter}"
    ))
}

/// Parse `api-usage=123/15000` out of a `Sforce-Limit-Info` header.
fn parse_limit_info(header: &str) -> Option<(u64, u64)> {
    let usage = header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("api-usage="))?;
    let (used, limit) = usage.split_once('/')?;
    Some((used.trim().parse().ok()?, limit.trim().parse().ok()?))
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn object(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn display_name_precedence() {
        let record = object(r#"{"Name": "Invoice", "DeveloperName": "Invoice_c"}"#);
        assert_eq!(resolve_display_name(&record).as_deref(), Some("Invoice"));

        let record = object(r#"{"Name": "", "DeveloperName": "Invoice_c", "MasterLabel": "Inv"}"#);
        assert_eq!(resolve_display_name(&record).as_deref(), Some("Invoice_c"));

        let record = object(r#"{"MasterLabel": "Inv", "FullName": "Invoice__c"}"#);
        assert_eq!(resolve_display_name(&record).as_deref(), Some("Inv"));

        let record = object(r#"{"Id": "01p"}"#);
        assert!(resolve_display_name(&record).is_none());
    }

    #[test]
    fn parse_component_requires_id() {
        let ok: Value = serde_json::from_str(r#"{"Id": "01p1", "Name": "Util"}"#).unwrap();
        let record = parse_component(&ok, "ApexClass").unwrap();
        assert_eq!(record.id, "01p1");
        assert_eq!(record.kind.as_deref(), Some("ApexClass"));

        let bad: Value = serde_json::from_str(r#"{"Name": "Util"}"#).unwrap();
        assert!(matches!(
            parse_component(&bad, "ApexClass"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn soql_quote_escapes() {
        assert_eq!(soql_quote("plain"), "'plain'");
        assert_eq!(soql_quote("it's"), r"'it\'s'");
        assert_eq!(soql_quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn dependency_soql_by_type_and_id() {
        let by_type = dependency_soql(&EdgeScope::OfType("ApexClass".into())).unwrap();
        assert!(by_type.ends_with("WHERE MetadataComponentType = 'ApexClass'"));

        let by_id = dependency_soql(&EdgeScope::ById(vec!["a".into(), "b".into()])).unwrap();
        assert!(by_id.contains("MetadataComponentId IN ('a', 'b')"));
        assert!(by_id.contains("RefMetadataComponentId IN ('a', 'b')"));

        assert!(dependency_soql(&EdgeScope::ById(Vec::new())).is_none());
    }

    #[test]
    fn inventory_soql_rejects_injection() {
        assert!(inventory_soql("ApexClass").is_ok());
        assert!(inventory_soql("ApexClass WHERE 1=1").is_err());
        assert!(inventory_soql("").is_err());
    }

    #[test]
    fn deserialize_dependency_page() {
        let json = r#"{
            "size": 1,
            "totalSize": 1,
            "done": true,
            "records": [{
                "attributes": {"type": "MetadataComponentDependency"},
                "MetadataComponentId": "066A",
                "MetadataComponentName": "Home",
                "MetadataComponentType": "ApexPage",
                "RefMetadataComponentId": "01pB",
                "RefMetadataComponentName": "HomeController",
                "RefMetadataComponentType": "ApexClass"
            }]
        }"#;
        let page: QueryPage = serde_json::from_str(json).unwrap();
        assert!(page.done);
        let raw: RawDependency = serde_json::from_value(page.records[0].clone()).unwrap();
        let edge = raw.into_record();
        assert_eq!(edge.source_id, "066A");
        assert_eq!(edge.target_name.as_deref(), Some("HomeController"));
    }

    #[test]
    fn deserialize_coverage_with_nulls() {
        let json = r#"{"ApexClassOrTriggerId": "01p", "NumLinesCovered": null, "NumLinesUncovered": 4}"#;
        let row: RawCoverage = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, "01p");
        assert!(row.covered.is_none());
        assert_eq!(row.uncovered, Some(4));
    }

    #[test]
    fn describe_defaults_queryable() {
        let json = r#"{"sobjects": [{"name": "ApexClass"}, {"name": "Secret", "queryable": false}]}"#;
        let global: GlobalDescribe = serde_json::from_str(json).unwrap();
        assert!(global.sobjects[0].queryable);
        assert!(!global.sobjects[1].queryable);
    }

    #[test]
    fn limit_info_parsing() {
        assert_eq!(parse_limit_info("api-usage=120/15000"), Some((120, 15000)));
        assert_eq!(
            parse_limit_info("per-app-api-usage=1/10; api-usage=5/100"),
            Some((5, 100))
        );
        assert_eq!(parse_limit_info("garbage"), None);
    }

    #[test]
    fn new_requires_instance_url() {
        let config = SourceSection::default();
        assert!(ToolingSource::new(&config, "t".into()).is_err());
    }

    #[test]
    fn new_trims_trailing_slash() {
        let config = SourceSection {
            instance_url: "https://acme.example.com/".into(),
            ..SourceSection::default()
        };
        let source = ToolingSource::new(&config, "t".into()).unwrap();
        assert_eq!(
            source.tooling_url("query"),
            "https://acme.example.com/services/data/v59.0/tooling/query"
        );
        assert!(source.api_usage().is_none());
    }
}
