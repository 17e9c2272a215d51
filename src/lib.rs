//! Terminal admin for the student and course services: browse, search,
//! create, edit and delete students, courses and the enrollments linking them.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;
pub mod validation;

pub use config::Config;
pub use models::{Course, Enrollment, Student};
pub use ui::{run_app, App};
