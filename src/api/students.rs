use serde_json::Value;

use crate::error::ApiError;
use crate::models::{Student, StudentPayload};

use super::envelope::{decode_list, Listed};
use super::transport::{Resource, Transport};

/// Retrieve every student, whatever envelope the service wraps them in.
pub fn fetch_students(api: &dyn Transport) -> Result<Listed<Student>, ApiError> {
    decode_list(api.list(Resource::Students)?)
}

pub fn create_student(api: &dyn Transport, payload: &StudentPayload) -> Result<Value, ApiError> {
    api.create(Resource::Students, &serde_json::to_value(payload)?)
}

pub fn update_student(
    api: &dyn Transport,
    id: i64,
    payload: &StudentPayload,
) -> Result<Value, ApiError> {
    api.update(Resource::Students, id, &serde_json::to_value(payload)?)
}

pub fn delete_student(api: &dyn Transport, id: i64) -> Result<Value, ApiError> {
    api.delete(Resource::Students, id)
}
