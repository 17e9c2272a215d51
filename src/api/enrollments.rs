use serde_json::Value;

use crate::error::ApiError;
use crate::models::{Enrollment, EnrollmentPayload};

use super::envelope::{decode_list, Listed};
use super::transport::{Resource, Transport};

/// Retrieve every student-course link.
pub fn fetch_enrollments(api: &dyn Transport) -> Result<Listed<Enrollment>, ApiError> {
    decode_list(api.list(Resource::Enrollments)?)
}

pub fn create_enrollment(
    api: &dyn Transport,
    payload: &EnrollmentPayload,
) -> Result<Value, ApiError> {
    api.create(Resource::Enrollments, &serde_json::to_value(payload)?)
}

pub fn update_enrollment(
    api: &dyn Transport,
    id: i64,
    payload: &EnrollmentPayload,
) -> Result<Value, ApiError> {
    api.update(Resource::Enrollments, id, &serde_json::to_value(payload)?)
}

pub fn delete_enrollment(api: &dyn Transport, id: i64) -> Result<Value, ApiError> {
    api.delete(Resource::Enrollments, id)
}
