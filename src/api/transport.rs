use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;

/// The three collections exposed by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Students,
    Courses,
    Enrollments,
}

impl Resource {
    /// Final path segment of the collection endpoint.
    pub const fn segment(self) -> &'static str {
        match self {
            Resource::Students => "estudiantes",
            Resource::Courses => "cursos",
            Resource::Enrollments => "curso-estudiante",
        }
    }
}

/// Raw verbs against a resource collection. Implementations return the
/// response body as JSON (`Null` for an empty body) and turn non-2xx
/// statuses into [`ApiError::Status`]. Requests run on worker threads, so a
/// transport is shared across them.
pub trait Transport: Send + Sync {
    fn list(&self, resource: Resource) -> Result<Value, ApiError>;
    fn create(&self, resource: Resource, body: &Value) -> Result<Value, ApiError>;
    fn update(&self, resource: Resource, id: i64, body: &Value) -> Result<Value, ApiError>;
    fn delete(&self, resource: Resource, id: i64) -> Result<Value, ApiError>;
}

/// Collection URLs for every resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    students: String,
    courses: String,
    enrollments: String,
}

impl Endpoints {
    /// Derive endpoints from the two service base URLs. Students live on the
    /// student service; courses and enrollments on the course service.
    pub fn new(students_base: &str, courses_base: &str) -> Self {
        let students_base = students_base.trim_end_matches('/');
        let courses_base = courses_base.trim_end_matches('/');
        Self {
            students: format!("{students_base}/api/{}", Resource::Students.segment()),
            courses: format!("{courses_base}/api/{}", Resource::Courses.segment()),
            enrollments: format!("{courses_base}/api/{}", Resource::Enrollments.segment()),
        }
    }

    pub fn collection(&self, resource: Resource) -> &str {
        match resource {
            Resource::Students => &self.students,
            Resource::Courses => &self.courses,
            Resource::Enrollments => &self.enrollments,
        }
    }

    pub fn item(&self, resource: Resource, id: i64) -> String {
        format!("{}/{id}", self.collection(resource))
    }
}

/// Blocking reqwest transport. No retries and no timeout: a hung request
/// keeps its worker thread waiting.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoints: Endpoints,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Self::with_endpoints(Endpoints::new(&config.students_url, &config.courses_url))
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { client, endpoints })
    }

    fn send(
        &self,
        request: RequestBuilder,
        resource: Resource,
        verb: &str,
    ) -> Result<Value, ApiError> {
        debug!(resource = resource.segment(), verb, "sending request");
        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        let body = parse_body(text);

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            debug!(
                resource = resource.segment(),
                verb,
                status = status.as_u16(),
                "request rejected"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

/// Mutation bodies are implementation-defined, so a body that is not JSON is
/// kept as a string rather than treated as an error.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text))
}

impl Transport for HttpTransport {
    fn list(&self, resource: Resource) -> Result<Value, ApiError> {
        let request = self.client.get(self.endpoints.collection(resource));
        self.send(request, resource, "GET")
    }

    fn create(&self, resource: Resource, body: &Value) -> Result<Value, ApiError> {
        let request = self.client.post(self.endpoints.collection(resource)).json(body);
        self.send(request, resource, "POST")
    }

    fn update(&self, resource: Resource, id: i64, body: &Value) -> Result<Value, ApiError> {
        let request = self.client.put(self.endpoints.item(resource, id)).json(body);
        self.send(request, resource, "PUT")
    }

    fn delete(&self, resource: Resource, id: i64) -> Result<Value, ApiError> {
        let request = self.client.delete(self.endpoints.item(resource, id));
        self.send(request, resource, "DELETE")
    }
}
