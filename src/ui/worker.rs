//! Background requests. Each call to the services runs on its own thread and
//! reports back over a channel that the event loop drains between frames, so
//! a slow or hung service never blocks drawing or input.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::api::{self, ApiError, Listed, Transport};
use crate::error::Entity;
use crate::models::{Course, CoursePayload, Enrollment, EnrollmentPayload, Student, StudentPayload};
use crate::validation::EditMode;

/// Work a screen asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    LoadStudents,
    LoadCourses,
    /// Enrollments plus the students and courses needed to name them.
    LoadEnrollments,
    SaveStudent(EditMode, StudentPayload),
    SaveCourse(EditMode, CoursePayload),
    SaveEnrollment(EditMode, EnrollmentPayload),
    Delete(Entity, i64),
}

/// The three fetches behind the Enrollments tab. Each one settles on its own.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) enrollments: Result<Listed<Enrollment>, ApiError>,
    pub(crate) students: Result<Listed<Student>, ApiError>,
    pub(crate) courses: Result<Listed<Course>, ApiError>,
}

/// What came back for a [`Request`].
#[derive(Debug)]
pub(crate) enum Reply {
    Students(Result<Listed<Student>, ApiError>),
    Courses(Result<Listed<Course>, ApiError>),
    Enrollments(Snapshot),
    Saved(Entity, EditMode, Result<(), ApiError>),
    Deleted(Entity, i64, Result<(), ApiError>),
}

impl Reply {
    /// The screen that asked for this reply.
    pub(crate) fn entity(&self) -> Entity {
        match self {
            Reply::Students(_) => Entity::Student,
            Reply::Courses(_) => Entity::Course,
            Reply::Enrollments(_) => Entity::Enrollment,
            Reply::Saved(entity, ..) | Reply::Deleted(entity, ..) => *entity,
        }
    }
}

/// Run one request to completion on the calling thread.
pub(crate) fn perform(api: &dyn Transport, request: Request) -> Reply {
    match request {
        Request::LoadStudents => Reply::Students(api::fetch_students(api)),
        Request::LoadCourses => Reply::Courses(api::fetch_courses(api)),
        Request::LoadEnrollments => Reply::Enrollments(Snapshot {
            enrollments: api::fetch_enrollments(api),
            students: api::fetch_students(api),
            courses: api::fetch_courses(api),
        }),
        Request::SaveStudent(mode, payload) => {
            let result = match mode {
                EditMode::Creating => api::create_student(api, &payload),
                EditMode::Editing(id) => api::update_student(api, id, &payload),
            };
            Reply::Saved(Entity::Student, mode, result.map(drop))
        }
        Request::SaveCourse(mode, payload) => {
            let result = match mode {
                EditMode::Creating => api::create_course(api, &payload),
                EditMode::Editing(id) => api::update_course(api, id, &payload),
            };
            Reply::Saved(Entity::Course, mode, result.map(drop))
        }
        Request::SaveEnrollment(mode, payload) => {
            let result = match mode {
                EditMode::Creating => api::create_enrollment(api, &payload),
                EditMode::Editing(id) => api::update_enrollment(api, id, &payload),
            };
            Reply::Saved(Entity::Enrollment, mode, result.map(drop))
        }
        Request::Delete(entity, id) => {
            let result = match entity {
                Entity::Student => api::delete_student(api, id),
                Entity::Course => api::delete_course(api, id),
                Entity::Enrollment => api::delete_enrollment(api, id),
            };
            Reply::Deleted(entity, id, result.map(drop))
        }
    }
}

/// Spawns a thread per request and collects the replies.
pub(crate) struct Worker {
    api: Arc<dyn Transport>,
    sender: Sender<Reply>,
    receiver: Receiver<Reply>,
    in_flight: usize,
}

impl Worker {
    pub(crate) fn new(api: Arc<dyn Transport>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            api,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub(crate) fn dispatch(&mut self, request: Request) {
        debug!(?request, "dispatching request");
        let api = Arc::clone(&self.api);
        let sender = self.sender.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let reply = perform(api.as_ref(), request);
            if sender.send(reply).is_err() {
                debug!("reply dropped: the interface already exited");
            }
        });
    }

    /// A finished reply, if any, without waiting.
    pub(crate) fn try_recv(&mut self) -> Option<Reply> {
        let reply = self.receiver.try_recv().ok()?;
        self.in_flight -= 1;
        Some(reply)
    }

    /// Block until the next reply. `None` once nothing is in flight.
    #[cfg(test)]
    pub(crate) fn recv(&mut self) -> Option<Reply> {
        if self.in_flight == 0 {
            return None;
        }
        let reply = self.receiver.recv().ok()?;
        self.in_flight -= 1;
        Some(reply)
    }
}
