//! Records exchanged with the student and course services. The structs mirror
//! the JSON the services emit (Spanish camelCase keys) while exposing English
//! field names to the rest of the crate. Read models tolerate `null` text
//! fields because the services do not guarantee them; write payloads are what
//! `validation` produces once a draft passes every rule.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Birth dates arrive as text, or as epoch milliseconds when the student
/// service writes dates as timestamps. Both end up as text; milliseconds
/// become the UTC calendar date.
fn date_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(String::new()),
        Some(Raw::Text(text)) => Ok(text),
        Some(Raw::Millis(millis)) => DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|moment| moment.date_naive().format("%Y-%m-%d").to_string())
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {millis}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// A student as listed by the student service.
pub struct Student {
    /// Server-assigned identifier.
    pub id: i64,
    #[serde(rename = "nombre", default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(rename = "apellido", default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    /// Kept as text: the service may send a bare date or a full timestamp.
    #[serde(rename = "fechaNacimiento", default, deserialize_with = "date_text")]
    pub birth_date: String,
    #[serde(rename = "telefono", default, deserialize_with = "null_as_default")]
    pub phone: String,
}

impl Student {
    /// `Given Family`, trimmed so a blank part does not leave stray spaces.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// A course as listed by the course service.
pub struct Course {
    pub id: i64,
    #[serde(rename = "nombre", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "descripcion", default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "creditos", default, deserialize_with = "null_as_default")]
    pub credits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Association between one student and one course. The two foreign keys are
/// optional on the wire; a record missing either one cannot be edited.
pub struct Enrollment {
    pub id: i64,
    #[serde(rename = "estudianteId", default)]
    pub student_id: Option<i64>,
    #[serde(rename = "cursoId", default)]
    pub course_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Body sent on student create/update.
pub struct StudentPayload {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "fechaNacimiento")]
    pub birth_date: String,
    #[serde(rename = "telefono")]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Body sent on course create/update.
pub struct CoursePayload {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "creditos")]
    pub credits: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Body sent on enrollment create/update.
pub struct EnrollmentPayload {
    #[serde(rename = "estudianteId")]
    pub student_id: i64,
    #[serde(rename = "cursoId")]
    pub course_id: i64,
}
