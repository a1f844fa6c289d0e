//! In-memory span reader
//!
//! Holds traces per tenant. Used by the test suite and, when a fixture file
//! is configured, by the server binary.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use super::reader::{SpanReader, StorageError};
use crate::model::{Operation, Span, Trace, TraceId};
use crate::query::{OperationListQuery, ServiceListQuery, TraceByIdQuery, TraceSearchQuery};
use crate::tenancy::TenantContext;

/// Tenant key used when a request carries no tenant
const NO_TENANT: &str = "";

#[derive(Default)]
pub struct MemoryReader {
    tenants: DashMap<String, HashMap<TraceId, Trace>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture of the form `{"<tenant>": [span, ...]}`. Spans under
    /// `""` are visible to requests without a tenant.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Backend(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let fixture: HashMap<String, Vec<Span>> = serde_json::from_str(&raw).map_err(|e| {
            StorageError::Backend(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let reader = Self::new();
        let mut spans = 0;
        for (tenant, tenant_spans) in fixture {
            spans += tenant_spans.len();
            for span in tenant_spans {
                reader.write_span(&tenant, span);
            }
        }
        tracing::info!("Loaded {} spans from {}", spans, path.display());
        Ok(reader)
    }

    /// Append a span to its trace, creating the trace if needed
    pub fn write_span(&self, tenant: &str, span: Span) {
        self.tenants
            .entry(tenant.to_string())
            .or_default()
            .entry(span.trace_id)
            .or_default()
            .spans
            .push(span);
    }

    pub fn trace_count(&self) -> usize {
        self.tenants.iter().map(|t| t.value().len()).sum()
    }

    fn tenant_key(ctx: &TenantContext) -> &str {
        ctx.tenant().unwrap_or(NO_TENANT)
    }
}

fn span_matches(span: &Span, query: &TraceSearchQuery) -> bool {
    span.process.service_name == query.service_name
        && query
            .operation_name
            .as_ref()
            .map_or(true, |op| span.operation_name == *op)
        && query.start_time_min.map_or(true, |min| span.start_time >= min)
        && span.start_time <= query.start_time_max
        && query.duration_min.map_or(true, |min| span.duration >= min)
        && query.duration_max.map_or(true, |max| span.duration <= max)
        && query
            .tags
            .iter()
            .all(|(key, value)| tag_matches(span, key, value))
}

/// Tag filters look at span tags, process tags and log fields
fn tag_matches(span: &Span, key: &str, value: &str) -> bool {
    span.tags
        .iter()
        .chain(span.process.tags.iter())
        .chain(span.logs.iter().flat_map(|log| log.fields.iter()))
        .any(|kv| kv.key == key && kv.value.as_string() == value)
}

#[async_trait]
impl SpanReader for MemoryReader {
    async fn get_services(
        &self,
        ctx: &TenantContext,
        _query: &ServiceListQuery,
    ) -> Result<Vec<String>, StorageError> {
        let Some(traces) = self.tenants.get(Self::tenant_key(ctx)) else {
            return Ok(Vec::new());
        };

        let services: BTreeSet<&str> = traces
            .values()
            .flat_map(|t| t.spans.iter())
            .map(|s| s.process.service_name.as_str())
            .collect();

        Ok(services.into_iter().map(str::to_string).collect())
    }

    async fn get_operations(
        &self,
        ctx: &TenantContext,
        query: &OperationListQuery,
    ) -> Result<Vec<Operation>, StorageError> {
        let Some(traces) = self.tenants.get(Self::tenant_key(ctx)) else {
            return Ok(Vec::new());
        };

        let operations: HashSet<Operation> = traces
            .values()
            .flat_map(|t| t.spans.iter())
            .filter(|s| s.process.service_name == query.service_name)
            .map(|s| Operation {
                name: s.operation_name.clone(),
                span_kind: s.kind(),
            })
            .filter(|op| query.span_kind.map_or(true, |kind| op.span_kind == kind))
            .collect();

        let mut operations: Vec<Operation> = operations.into_iter().collect();
        operations.sort_by(|a, b| {
            (a.name.as_str(), a.span_kind.as_str()).cmp(&(b.name.as_str(), b.span_kind.as_str()))
        });
        Ok(operations)
    }

    async fn get_trace(
        &self,
        ctx: &TenantContext,
        query: &TraceByIdQuery,
    ) -> Result<Trace, StorageError> {
        self.tenants
            .get(Self::tenant_key(ctx))
            .and_then(|traces| traces.get(&query.trace_id).cloned())
            .ok_or(StorageError::NotFound(query.trace_id))
    }

    async fn find_traces(
        &self,
        ctx: &TenantContext,
        query: &TraceSearchQuery,
    ) -> Result<Vec<Trace>, StorageError> {
        let Some(traces) = self.tenants.get(Self::tenant_key(ctx)) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(&TraceId, &Trace)> = traces
            .iter()
            .filter(|(_, trace)| trace.spans.iter().any(|s| span_matches(s, query)))
            .collect();

        // Newest first; ties broken by id so results are stable
        matched.sort_by(|(id_a, a), (id_b, b)| {
            b.start_time()
                .cmp(&a.start_time())
                .then_with(|| id_a.cmp(id_b))
        });

        Ok(matched
            .into_iter()
            .take(query.limit)
            .map(|(_, trace)| trace.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeyValue, Log, Process, SpanId, SpanKind, SPAN_KIND_TAG};
    use std::collections::BTreeMap;
    use std::io::Write;

    fn span(trace: u64, id: u64, service: &str, op: &str, start: u64, duration: u64) -> Span {
        let mut span = Span::new(TraceId::new(0, trace), SpanId::new(id), op);
        span.process = Process::new(service);
        span.start_time = start;
        span.duration = duration;
        span
    }

    fn search(service: &str) -> TraceSearchQuery {
        TraceSearchQuery {
            service_name: service.to_string(),
            operation_name: None,
            tags: BTreeMap::new(),
            start_time_min: None,
            start_time_max: u64::MAX,
            duration_min: None,
            duration_max: None,
            limit: 20,
        }
    }

    fn seeded() -> MemoryReader {
        let reader = MemoryReader::new();

        let mut a = span(1, 1, "frontend", "GET /", 1_000, 500);
        a.tags.push(KeyValue::string(SPAN_KIND_TAG, "server"));
        a.tags.push(KeyValue::int64("http.status_code", 200));
        reader.write_span("", a);

        let mut b = span(1, 2, "backend", "query", 1_100, 100);
        b.tags.push(KeyValue::string(SPAN_KIND_TAG, "client"));
        b.logs.push(Log {
            timestamp: 1_150,
            fields: vec![KeyValue::string("event", "retry")],
        });
        reader.write_span("", b);

        let mut c = span(2, 3, "frontend", "POST /login", 5_000, 2_000);
        c.process = Process::new("frontend").with_tags(vec![KeyValue::string("host", "h1")]);
        reader.write_span("", c);

        reader.write_span("acme", span(3, 4, "billing", "charge", 9_000, 10));
        reader
    }

    #[tokio::test]
    async fn test_services_are_tenant_scoped() {
        let reader = seeded();

        let services = reader
            .get_services(&TenantContext::default(), &ServiceListQuery)
            .await
            .unwrap();
        assert_eq!(services, vec!["backend", "frontend"]);

        let services = reader
            .get_services(&TenantContext::new("acme"), &ServiceListQuery)
            .await
            .unwrap();
        assert_eq!(services, vec!["billing"]);

        let services = reader
            .get_services(&TenantContext::new("other"), &ServiceListQuery)
            .await
            .unwrap();
        assert!(services.is_empty());
    }

    #[tokio::test]
    async fn test_operations_filter_by_kind() {
        let reader = seeded();
        let ctx = TenantContext::default();

        let all = reader
            .get_operations(
                &ctx,
                &OperationListQuery {
                    service_name: "frontend".to_string(),
                    span_kind: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "GET /");

        let servers = reader
            .get_operations(
                &ctx,
                &OperationListQuery {
                    service_name: "frontend".to_string(),
                    span_kind: Some(SpanKind::Server),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            servers,
            vec![Operation {
                name: "GET /".to_string(),
                span_kind: SpanKind::Server,
            }]
        );
    }

    #[tokio::test]
    async fn test_get_trace_not_found() {
        let reader = seeded();
        let ctx = TenantContext::default();

        let trace = reader
            .get_trace(&ctx, &TraceByIdQuery::new(TraceId::new(0, 1)))
            .await
            .unwrap();
        assert_eq!(trace.spans.len(), 2);

        // Trace 3 belongs to another tenant
        let err = reader
            .get_trace(&ctx, &TraceByIdQuery::new(TraceId::new(0, 3)))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::NotFound(TraceId::new(0, 3)));
    }

    #[tokio::test]
    async fn test_find_traces_newest_first() {
        let reader = seeded();
        let traces = reader
            .find_traces(&TenantContext::default(), &search("frontend"))
            .await
            .unwrap();
        let ids: Vec<_> = traces.iter().filter_map(Trace::trace_id).collect();
        assert_eq!(ids, vec![TraceId::new(0, 2), TraceId::new(0, 1)]);

        let mut q = search("frontend");
        q.limit = 1;
        let traces = reader.find_traces(&TenantContext::default(), &q).await.unwrap();
        assert_eq!(traces.len(), 1);
    }

    #[tokio::test]
    async fn test_find_traces_filters() {
        let reader = seeded();
        let ctx = TenantContext::default();

        let mut q = search("frontend");
        q.tags.insert("http.status_code".to_string(), "200".to_string());
        let traces = reader.find_traces(&ctx, &q).await.unwrap();
        assert_eq!(traces[0].trace_id(), Some(TraceId::new(0, 1)));
        assert_eq!(traces.len(), 1);

        // Process tags and log fields are searchable too
        let mut q = search("frontend");
        q.tags.insert("host".to_string(), "h1".to_string());
        assert_eq!(reader.find_traces(&ctx, &q).await.unwrap().len(), 1);

        let mut q = search("backend");
        q.tags.insert("event".to_string(), "retry".to_string());
        assert_eq!(reader.find_traces(&ctx, &q).await.unwrap().len(), 1);

        let mut q = search("frontend");
        q.duration_min = Some(1_000);
        let traces = reader.find_traces(&ctx, &q).await.unwrap();
        assert_eq!(traces[0].trace_id(), Some(TraceId::new(0, 2)));
        assert_eq!(traces.len(), 1);

        let mut q = search("frontend");
        q.start_time_min = Some(900);
        q.start_time_max = 1_200;
        let traces = reader.find_traces(&ctx, &q).await.unwrap();
        assert_eq!(traces.len(), 1);

        let mut q = search("frontend");
        q.operation_name = Some("missing".to_string());
        assert!(reader.find_traces(&ctx, &q).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "": [
                    {{"trace_id": "a0", "span_id": "01", "operation_name": "op",
                      "process": {{"service_name": "svc"}}}}
                ],
                "acme": [
                    {{"trace_id": "a1", "span_id": "02", "operation_name": "op",
                      "tags": [{{"key": "span.kind", "type": "string", "value": "server"}}]}}
                ]
            }}"#
        )
        .unwrap();

        let reader = MemoryReader::from_json_file(file.path()).unwrap();
        assert_eq!(reader.trace_count(), 2);
    }

    #[tokio::test]
    async fn test_demo_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/fixture.json");
        let reader = MemoryReader::from_json_file(path).unwrap();
        assert_eq!(reader.trace_count(), 2);

        let services = reader
            .get_services(&TenantContext::default(), &ServiceListQuery)
            .await
            .unwrap();
        assert_eq!(services, vec!["frontend", "users-db"]);
    }

    #[test]
    fn test_from_json_file_reports_errors() {
        let err = MemoryReader::from_json_file("/nonexistent/fixture.json")
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
