//! In-memory stand-ins for the services, used by the screen and app tests.
//! `FakeBackend` keeps JSON records per resource, records every call, and can
//! be told to fail a given resource/verb pair. `StalledBackend` never answers
//! until the test releases it.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Map, Value};

use super::transport::{Resource, Transport};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Verb {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Failure {
    Status(u16, Option<String>),
    Transport,
    /// Answer a list request with a body that is not a list envelope.
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub(crate) resource: Resource,
    pub(crate) verb: Verb,
    pub(crate) id: Option<i64>,
    pub(crate) body: Option<Value>,
}

#[derive(Default)]
struct State {
    records: HashMap<Resource, Vec<Value>>,
    failures: HashMap<(Resource, Verb), Failure>,
    calls: Vec<Call>,
    next_id: i64,
    wrap_lists: bool,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        let backend = Self::default();
        backend.state().next_id = 100;
        backend
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake backend lock poisoned")
    }

    pub(crate) fn with_records(self, resource: Resource, records: Vec<Value>) -> Self {
        self.state().records.insert(resource, records);
        self
    }

    /// Serve lists as `{ "data": [...] }` instead of bare arrays.
    pub(crate) fn wrap_lists(&self, wrap: bool) {
        self.state().wrap_lists = wrap;
    }

    pub(crate) fn fail(&self, resource: Resource, verb: Verb, failure: Failure) {
        self.state().failures.insert((resource, verb), failure);
    }

    pub(crate) fn recover(&self, resource: Resource, verb: Verb) {
        self.state().failures.remove(&(resource, verb));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of create/update/delete calls seen so far.
    pub(crate) fn mutation_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.verb != Verb::List)
            .count()
    }

    pub(crate) fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub(crate) fn records(&self, resource: Resource) -> Vec<Value> {
        self.state()
            .records
            .get(&resource)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(
        &self,
        resource: Resource,
        verb: Verb,
        id: Option<i64>,
        body: Option<&Value>,
    ) -> Result<(), Failure> {
        let mut state = self.state();
        state.calls.push(Call {
            resource,
            verb,
            id,
            body: body.cloned(),
        });
        match state.failures.get(&(resource, verb)) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

fn into_error(failure: Failure) -> ApiError {
    match failure {
        Failure::Status(status, message) => ApiError::Status { status, message },
        Failure::Transport | Failure::Malformed => {
            ApiError::Transport("connection refused".to_string())
        }
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

fn pair(record: &Value) -> (Option<i64>, Option<i64>) {
    (
        record.get("estudianteId").and_then(Value::as_i64),
        record.get("cursoId").and_then(Value::as_i64),
    )
}

fn with_id(body: &Value, id: i64) -> Value {
    let mut fields = body.as_object().cloned().unwrap_or_else(Map::new);
    fields.insert("id".to_string(), json!(id));
    Value::Object(fields)
}

impl Transport for FakeBackend {
    fn list(&self, resource: Resource) -> Result<Value, ApiError> {
        match self.begin(resource, Verb::List, None, None) {
            Ok(()) => {}
            Err(Failure::Malformed) => return Ok(json!({ "message": "no data here" })),
            Err(failure) => return Err(into_error(failure)),
        }
        let state = self.state();
        let records = Value::Array(state.records.get(&resource).cloned().unwrap_or_default());
        if state.wrap_lists {
            Ok(json!({ "message": "ok", "data": records }))
        } else {
            Ok(records)
        }
    }

    fn create(&self, resource: Resource, body: &Value) -> Result<Value, ApiError> {
        self.begin(resource, Verb::Create, None, Some(body))
            .map_err(into_error)?;
        let mut state = self.state();
        let duplicate = resource == Resource::Enrollments
            && state
                .records
                .get(&resource)
                .is_some_and(|records| records.iter().any(|r| pair(r) == pair(body)));
        if duplicate {
            return Err(ApiError::Status {
                status: 409,
                message: None,
            });
        }
        state.next_id += 1;
        let record = with_id(body, state.next_id);
        state
            .records
            .entry(resource)
            .or_default()
            .push(record.clone());
        Ok(json!({ "message": "created", "data": record }))
    }

    fn update(&self, resource: Resource, id: i64, body: &Value) -> Result<Value, ApiError> {
        self.begin(resource, Verb::Update, Some(id), Some(body))
            .map_err(into_error)?;
        let mut state = self.state();
        let records = state.records.entry(resource).or_default();
        match records.iter_mut().find(|r| record_id(r) == Some(id)) {
            Some(record) => {
                *record = with_id(body, id);
                Ok(record.clone())
            }
            None => Err(ApiError::Status {
                status: 404,
                message: Some(format!("No record with id {id}")),
            }),
        }
    }

    fn delete(&self, resource: Resource, id: i64) -> Result<Value, ApiError> {
        self.begin(resource, Verb::Delete, Some(id), None)
            .map_err(into_error)?;
        let mut state = self.state();
        let records = state.records.entry(resource).or_default();
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Err(ApiError::Status {
                status: 404,
                message: None,
            });
        }
        Ok(Value::Null)
    }
}

/// Every request blocks until the paired sender is dropped, then answers
/// with an empty list or body.
pub(crate) struct StalledBackend {
    release: Mutex<Receiver<()>>,
}

impl StalledBackend {
    pub(crate) fn new(release: Receiver<()>) -> Self {
        Self {
            release: Mutex::new(release),
        }
    }

    fn wait(&self) {
        let release = self.release.lock().expect("stalled backend lock poisoned");
        while release.recv().is_ok() {}
    }
}

impl Transport for StalledBackend {
    fn list(&self, _resource: Resource) -> Result<Value, ApiError> {
        self.wait();
        Ok(json!([]))
    }

    fn create(&self, _resource: Resource, _body: &Value) -> Result<Value, ApiError> {
        self.wait();
        Ok(Value::Null)
    }

    fn update(&self, _resource: Resource, _id: i64, _body: &Value) -> Result<Value, ApiError> {
        self.wait();
        Ok(Value::Null)
    }

    fn delete(&self, _resource: Resource, _id: i64) -> Result<Value, ApiError> {
        self.wait();
        Ok(Value::Null)
    }
}
