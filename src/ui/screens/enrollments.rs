use tracing::{debug, info, warn};

use super::{skipped_notice, Editor, Listing, Status, IN_PROGRESS};
use crate::api::{ApiError, Listed};
use crate::error::{Action, Entity};
use crate::models::{Course, Enrollment, Student};
use crate::ui::forms::EnrollmentForm;
use crate::ui::worker::{Reply, Request, Snapshot};
use crate::validation::{find_duplicate_enrollment, validate_enrollment, EditMode};

pub(crate) const STUDENT_NOT_FOUND: &str = "Student not found";
pub(crate) const COURSE_NOT_FOUND: &str = "Course not found";

/// State behind the Enrollments tab. Students and courses are loaded here
/// too, only to turn ids into names and to feed the form pickers.
#[derive(Debug, Default)]
pub(crate) struct EnrollmentsScreen {
    pub(crate) listing: Listing<Enrollment>,
    pub(crate) students: Vec<Student>,
    pub(crate) courses: Vec<Course>,
    pub(crate) editor: Option<Editor<EnrollmentForm>>,
    pub(crate) status: Status,
    pub(crate) busy: bool,
    /// Student and course ids to select after the reload following a save.
    focus: Option<(i64, i64)>,
}

/// Keep the loaded records, or fall back to nothing and remember why.
fn settle<T>(
    result: Result<Listed<T>, ApiError>,
    entity: Entity,
    problems: &mut Vec<String>,
) -> Vec<T> {
    match result {
        Ok(listed) => {
            problems.extend(skipped_notice(entity, listed.skipped));
            listed.records
        }
        Err(err) => {
            warn!(error = %err, entity = entity.plural(), "failed to load collection");
            problems.push(err.user_message(Action::Load(entity)));
            Vec::new()
        }
    }
}

impl EnrollmentsScreen {
    pub(crate) fn enrollments(&self) -> &[Enrollment] {
        self.listing.items()
    }

    /// Ask for enrollments, students and courses together.
    pub(crate) fn refresh_all(&mut self) -> Option<Request> {
        if self.busy {
            debug!("enrollments reload skipped while a request is pending");
            return None;
        }
        self.busy = true;
        Some(Request::LoadEnrollments)
    }

    pub(crate) fn apply(&mut self, reply: Reply) -> Option<Request> {
        match reply {
            Reply::Enrollments(snapshot) => {
                self.loaded(snapshot);
                None
            }
            Reply::Saved(_, mode, result) => self.saved(mode, result),
            Reply::Deleted(_, id, result) => self.deleted(id, result),
            Reply::Students(_) | Reply::Courses(_) => None,
        }
    }

    /// Each collection stands on its own: a failed fetch empties only that
    /// one, and every problem ends up on the same status line.
    fn loaded(&mut self, snapshot: Snapshot) {
        self.busy = false;
        let mut problems = Vec::new();
        let enrollments = settle(snapshot.enrollments, Entity::Enrollment, &mut problems);
        self.students = settle(snapshot.students, Entity::Student, &mut problems);
        self.courses = settle(snapshot.courses, Entity::Course, &mut problems);
        self.listing.set_items(enrollments, |_| true);
        if let Some((student_id, course_id)) = self.focus.take() {
            self.listing.select_where(|e| {
                e.student_id == Some(student_id) && e.course_id == Some(course_id)
            });
        }

        if !problems.is_empty() {
            self.status.error(problems.join(" "));
        }
    }

    pub(crate) fn resolve_student_name(&self, id: Option<i64>) -> String {
        id.and_then(|id| self.students.iter().find(|s| s.id == id))
            .map(Student::full_name)
            .unwrap_or_else(|| STUDENT_NOT_FOUND.to_string())
    }

    pub(crate) fn resolve_course_name(&self, id: Option<i64>) -> String {
        id.and_then(|id| self.courses.iter().find(|c| c.id == id))
            .map(|course| course.name.clone())
            .unwrap_or_else(|| COURSE_NOT_FOUND.to_string())
    }

    /// Loaded enrollment linking the same pair, other than `excluding`.
    pub(crate) fn validate_duplicate(
        &self,
        student_id: i64,
        course_id: i64,
        excluding: Option<i64>,
    ) -> Option<&Enrollment> {
        find_duplicate_enrollment(self.listing.items(), student_id, course_id, excluding)
    }

    pub(crate) fn open_create(&mut self) {
        self.editor = Some(Editor::creating(EnrollmentForm::default()));
    }

    /// Records missing either id cannot be edited.
    pub(crate) fn edit(&mut self, enrollment: &Enrollment) {
        match EnrollmentForm::from_enrollment(enrollment) {
            Some(form) => self.editor = Some(Editor::editing(enrollment.id, form)),
            None => {
                warn!(id = enrollment.id, "enrollment is missing a student or course id");
                self.status.error("Invalid enrollment data.");
            }
        }
    }

    pub(crate) fn edit_selected(&mut self) {
        if let Some(enrollment) = self.listing.current().cloned() {
            self.edit(&enrollment);
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.editor = None;
        self.status.clear();
    }

    /// Move the focused picker through the loaded students or courses.
    pub(crate) fn cycle_choice(&mut self, delta: isize) {
        if let Some(editor) = self.editor.as_mut() {
            editor.form.cycle_choice(&self.students, &self.courses, delta);
        }
    }

    pub(crate) fn submit(&mut self) -> Option<Request> {
        if self.busy {
            self.status.error(IN_PROGRESS);
            return None;
        }
        let editor = self.editor.as_mut()?;
        let mode = editor.mode;
        let payload = match validate_enrollment(&editor.form.draft, mode, self.listing.items()) {
            Ok(payload) => payload,
            Err(err) => {
                editor.form.error = Some(err.to_string());
                self.status.error(err.to_string());
                return None;
            }
        };

        debug!(
            student_id = payload.student_id,
            course_id = payload.course_id,
            ?mode,
            "saving enrollment"
        );
        self.busy = true;
        self.focus = Some((payload.student_id, payload.course_id));
        Some(Request::SaveEnrollment(mode, payload))
    }

    fn saved(&mut self, mode: EditMode, result: Result<(), ApiError>) -> Option<Request> {
        match result {
            Ok(()) => {
                self.editor = None;
                let text = match mode {
                    EditMode::Creating => "Enrollment created successfully.",
                    EditMode::Editing(_) => "Enrollment updated successfully.",
                };
                info!(?mode, "enrollment saved");
                self.status.info(text);
                Some(Request::LoadEnrollments)
            }
            Err(err) => {
                warn!(error = %err, ?mode, "failed to save enrollment");
                self.busy = false;
                self.focus = None;
                let message = err.user_message(Action::Save(Entity::Enrollment));
                if let Some(editor) = self.editor.as_mut() {
                    editor.form.error = Some(message.clone());
                }
                self.status.error(message);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, id: i64) -> Option<Request> {
        if self.busy {
            self.status.error(IN_PROGRESS);
            return None;
        }
        self.busy = true;
        Some(Request::Delete(Entity::Enrollment, id))
    }

    fn deleted(&mut self, id: i64, result: Result<(), ApiError>) -> Option<Request> {
        match result {
            Ok(()) => {
                info!(id, "enrollment deleted");
                self.status.info("Enrollment deleted successfully.");
                Some(Request::LoadEnrollments)
            }
            Err(err) => {
                warn!(error = %err, id, "failed to delete enrollment");
                self.busy = false;
                self.status.error(err.user_message(Action::Delete(Entity::Enrollment)));
                None
            }
        }
    }
}
