//! In-memory search service used by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use searchflow::config::ClientConfig;
use searchflow::error::TransportError;
use searchflow::host::{Accept, Endpoint, HostConfig};
use searchflow::retry::RetryOptions;
use searchflow::transport::{HttpRequest, HttpResponse, Requester};
use searchflow::SearchClient;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a host misbehaves
#[derive(Debug, Clone)]
pub enum HostFailure {
    Unreachable,
    Timeout,
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub host: String,
    pub method: String,
    pub path: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: String,
    pub source: String,
    pub destination: String,
    pub scope: Option<Value>,
}

#[derive(Default)]
pub struct State {
    pub calls: Vec<Call>,
    pub host_failures: HashMap<String, HostFailure>,
    pub indices: HashMap<String, Vec<Value>>,
    pub rules: HashMap<String, Vec<Value>>,
    pub synonyms: HashMap<String, Vec<Value>>,
    pub operations: Vec<Operation>,
    /// Pending polls per task before it reports published
    pub tasks: HashMap<i64, u32>,
    /// Pending polls given to each new task
    pub task_latency: u32,
    pub next_task_id: i64,
    /// Batch calls accepted so far
    pub batch_calls: usize,
    /// Reject every batch after this many were accepted
    pub fail_batches_after: Option<usize>,
    pub fail_copy: bool,
    pub fail_move: bool,
    /// Scripted (status, body) answers for key lookups; the last one repeats
    pub key_script: HashMap<String, VecDeque<(u16, Value)>>,
    pub browse_page_size: usize,
}

pub struct FakeService {
    state: Mutex<State>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_task_id: 1,
                browse_page_size: 1000,
                ..Default::default()
            }),
        })
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn calls_to(&self, host: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| c.host == host).count())
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| c.path.contains(needle)).count())
    }

    pub fn fail_host(&self, host: &str, failure: HostFailure) {
        self.with_state(|s| s.host_failures.insert(host.to_string(), failure));
    }

    pub fn heal_host(&self, host: &str) {
        self.with_state(|s| s.host_failures.remove(host));
    }

    pub fn index(&self, name: &str) -> Option<Vec<Value>> {
        self.with_state(|s| s.indices.get(name).cloned())
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.with_state(|s| s.operations.clone())
    }

    /// Register a finished or pending task directly
    pub fn add_task(&self, pending_polls: u32) -> i64 {
        self.with_state(|s| new_task_with(s, pending_polls))
    }

    pub fn script_key(&self, key: &str, answers: Vec<(u16, Value)>) {
        self.with_state(|s| s.key_script.insert(key.to_string(), answers.into()));
    }
}

fn new_task(state: &mut State) -> i64 {
    let latency = state.task_latency;
    new_task_with(state, latency)
}

fn new_task_with(state: &mut State, pending_polls: u32) -> i64 {
    let id = state.next_task_id;
    state.next_task_id += 1;
    state.tasks.insert(id, pending_polls);
    id
}

fn respond(status: u16, body: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(status, body.to_string()))
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment).unwrap().into_owned()
}

fn object_id(record: &Value) -> Option<String> {
    record
        .get("objectID")
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

fn route(state: &mut State, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let body: Value = request
        .body
        .as_ref()
        .map(|b| serde_json::from_slice(b).unwrap())
        .unwrap_or(Value::Null);
    let segments: Vec<String> = request.path.split('/').skip(1).map(decode).collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("POST", ["1", "indexes", index, "batch"]) => batch(state, index, &body),
        ("GET", ["1", "indexes", _, "task", id]) | ("GET", ["1", "task", id]) => {
            let id: i64 = id.parse().unwrap();
            match state.tasks.get_mut(&id) {
                Some(0) => respond(200, json!({ "status": "published" })),
                Some(pending) => {
                    *pending -= 1;
                    respond(200, json!({ "status": "notPublished" }))
                }
                None => respond(404, json!({ "message": "Task does not exist" })),
            }
        }
        ("POST", ["1", "indexes", index, "operation"]) => operation(state, index, &body),
        ("GET", ["1", "keys", key]) => {
            let script = state.key_script.get_mut(*key);
            match script {
                Some(answers) if !answers.is_empty() => {
                    let (status, body) = if answers.len() > 1 {
                        answers.pop_front().unwrap()
                    } else {
                        answers[0].clone()
                    };
                    respond(status, body)
                }
                _ => respond(404, json!({ "message": "Key does not exist" })),
            }
        }
        ("POST", ["1", "indexes", index, "browse"]) => {
            let records = state.indices.get(*index).cloned().unwrap_or_default();
            let offset: usize = body
                .get("cursor")
                .and_then(|c| c.as_str())
                .map(|c| c.parse().unwrap())
                .unwrap_or(0);
            let size = body
                .get("hitsPerPage")
                .and_then(|h| h.as_u64())
                .map_or(state.browse_page_size, |h| h as usize);
            let end = (offset + size).min(records.len());
            let cursor = (end < records.len()).then(|| end.to_string());
            let hits = &records[offset.min(end)..end];
            respond(
                200,
                json!({ "hits": hits, "cursor": cursor, "nbHits": records.len() }),
            )
        }
        ("POST", ["1", "indexes", index, kind, "search"]) => {
            let source = if *kind == "rules" {
                &state.rules
            } else {
                &state.synonyms
            };
            let items = source.get(*index).cloned().unwrap_or_default();
            let page = body["page"].as_u64().unwrap() as usize;
            let per_page = body["hitsPerPage"].as_u64().unwrap() as usize;
            let start = (page * per_page).min(items.len());
            let end = (start + per_page).min(items.len());
            let hits = &items[start..end];
            respond(200, json!({ "hits": hits, "nbHits": items.len() }))
        }
        _ => respond(404, json!({ "message": format!("No route for {}", request.path) })),
    }
}

fn batch(state: &mut State, index: &str, body: &Value) -> Result<HttpResponse, TransportError> {
    if let Some(limit) = state.fail_batches_after
        && state.batch_calls >= limit
    {
        return respond(400, json!({ "message": "Record is too big" }));
    }
    state.batch_calls += 1;

    let records = state.indices.entry(index.to_string()).or_default();
    let mut object_ids = Vec::new();
    for request in body["requests"].as_array().unwrap() {
        let action = request["action"].as_str().unwrap();
        let record = request["body"].clone();
        let id = object_id(&record).unwrap_or_else(|| format!("auto-{}", records.len()));
        let existing = records.iter().position(|r| object_id(r).as_deref() == Some(&id));
        match (action, existing) {
            ("deleteObject", Some(pos)) => {
                records.remove(pos);
            }
            ("deleteObject", None) => {}
            ("partialUpdateObject" | "partialUpdateObjectNoCreate", Some(pos)) => {
                if let (Some(target), Some(fields)) =
                    (records[pos].as_object_mut(), record.as_object())
                {
                    for (k, v) in fields {
                        target.insert(k.clone(), v.clone());
                    }
                }
            }
            ("partialUpdateObjectNoCreate", None) => {}
            (_, Some(pos)) => records[pos] = record,
            (_, None) => records.push(record),
        }
        object_ids.push(id);
    }

    let task_id = new_task(state);
    respond(200, json!({ "taskID": task_id, "objectIDs": object_ids }))
}

fn operation(state: &mut State, index: &str, body: &Value) -> Result<HttpResponse, TransportError> {
    let kind = body["operation"].as_str().unwrap().to_string();
    let destination = body["destination"].as_str().unwrap().to_string();
    if (kind == "copy" && state.fail_copy) || (kind == "move" && state.fail_move) {
        return respond(400, json!({ "message": format!("{} rejected", kind) }));
    }

    state.operations.push(Operation {
        kind: kind.clone(),
        source: index.to_string(),
        destination: destination.clone(),
        scope: body.get("scope").cloned(),
    });

    if kind == "move" {
        let records = state.indices.remove(index).unwrap_or_default();
        state.indices.insert(destination, records);
    } else if body.get("scope").is_some() {
        state.indices.entry(destination).or_default();
    } else {
        let records = state.indices.get(index).cloned().unwrap_or_default();
        state.indices.insert(destination, records);
    }

    let task_id = new_task(state);
    respond(200, json!({ "taskID": task_id, "updatedAt": "2026-10-16T00:00:00Z" }))
}

#[async_trait]
impl Requester for FakeService {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            host: endpoint.address.clone(),
            method: request.method.to_string(),
            path: request.path_and_query(),
            timeout,
        });

        let failure = state.host_failures.get(&endpoint.address).cloned();
        match failure {
            Some(HostFailure::Unreachable) => Err(TransportError::ConnectionFailed {
                host: endpoint.address.clone(),
                reason: "Connection refused".to_string(),
            }),
            Some(HostFailure::Timeout) => Err(TransportError::Timeout {
                host: endpoint.address.clone(),
                timeout,
            }),
            Some(HostFailure::Status(status)) => {
                respond(status, json!({ "message": "host failure" }))
            }
            None => route(&mut state, request),
        }
    }
}

/// Three read/write hosts in a fixed order
pub const HOSTS: [&str; 3] = ["host-a", "host-b", "host-c"];

pub fn test_config(hosts: &[(&str, Accept)]) -> ClientConfig {
    let mut config = ClientConfig::new("testapp", "secret");
    config.hosts = hosts
        .iter()
        .map(|(address, accept)| HostConfig::new(*address, *accept))
        .collect();
    config.shuffle_hosts = false;
    config.retry.backoff_step_ms = 1;
    config.retry.backoff_cap_ms = 2;
    config
}

pub fn default_config() -> ClientConfig {
    test_config(&HOSTS.map(|h| (h, Accept::ReadWrite)))
}

pub fn client_with(service: &Arc<FakeService>, config: ClientConfig) -> SearchClient {
    SearchClient::with_requester(config, service.clone()).unwrap()
}

pub fn client(service: &Arc<FakeService>) -> SearchClient {
    client_with(service, default_config())
}

/// Retry budget that never sleeps
pub fn fast_retry(max_attempts: u32) -> RetryOptions {
    RetryOptions::new(max_attempts, |_| Duration::ZERO)
}

pub fn records(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "objectID": format!("obj-{}", i), "rank": i }))
        .collect()
}
