//! Failures raised while talking to the services, and the translation of those
//! failures into the one-line messages shown in the status footer.

use thiserror::Error;

/// Anything that went wrong between issuing a request and holding decoded
/// records.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused connection, ...).
    #[error("request failed: {0}")]
    Transport(String),
    /// The service answered with a non-2xx status.
    #[error("service responded with HTTP {status}")]
    Status {
        status: u16,
        /// The `message` field of the response body, when there was one.
        message: Option<String>,
    },
    /// A list body that is neither an array nor an object with a `data` array.
    #[error("unexpected list envelope: {0}")]
    Shape(&'static str),
    #[error("malformed record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

/// The three kinds of records the client manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Student,
    Course,
    Enrollment,
}

impl Entity {
    pub fn noun(self) -> &'static str {
        match self {
            Entity::Student => "student",
            Entity::Course => "course",
            Entity::Enrollment => "enrollment",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Entity::Student => "students",
            Entity::Course => "courses",
            Entity::Enrollment => "enrollments",
        }
    }
}

/// What the user was doing when a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load(Entity),
    Save(Entity),
    Delete(Entity),
}

impl ApiError {
    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message for the status footer. Specific status codes win over the
    /// server-provided message; the server message wins over the generic text.
    pub fn user_message(&self, action: Action) -> String {
        match self {
            ApiError::Transport(_) => match action {
                Action::Load(entity) => format!(
                    "Failed to load the {}: could not connect to the server.",
                    entity.plural()
                ),
                _ => "Could not connect to the server.".to_string(),
            },
            ApiError::Shape(_) | ApiError::Decode(_) => match action {
                Action::Load(entity) => format!(
                    "Failed to load the {}: unexpected response format.",
                    entity.plural()
                ),
                _ => generic_message(action),
            },
            ApiError::Status { status, message } => {
                if let Some(mapped) = mapped_status_message(action, *status) {
                    return mapped;
                }
                message
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| generic_message(action))
            }
        }
    }
}

fn mapped_status_message(action: Action, status: u16) -> Option<String> {
    let text = match (action, status) {
        (Action::Save(Entity::Enrollment), 409) => "This enrollment already exists.".to_string(),
        (Action::Save(Entity::Student), 409) => {
            "A student with this email already exists.".to_string()
        }
        (Action::Save(Entity::Course), 409) => "A course with this name already exists.".to_string(),
        (Action::Save(Entity::Enrollment), 404) => {
            "The student or course does not exist.".to_string()
        }
        (Action::Save(entity), 404) => format!("The {} no longer exists.", entity.noun()),
        (Action::Delete(entity), 404) => format!("The {} does not exist.", entity.noun()),
        (Action::Delete(entity), 400) => format!(
            "Cannot delete the {}: other records still depend on it.",
            entity.noun()
        ),
        _ => return None,
    };
    Some(text)
}

fn generic_message(action: Action) -> String {
    match action {
        Action::Load(entity) => format!("Failed to load the {}.", entity.plural()),
        Action::Save(entity) => format!("Failed to save the {}.", entity.noun()),
        Action::Delete(entity) => format!("Failed to delete the {}.", entity.noun()),
    }
}
