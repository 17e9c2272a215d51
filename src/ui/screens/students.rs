use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::{matches_term, skipped_notice, Editor, Listing, Status, IN_PROGRESS};
use crate::api::{ApiError, Listed};
use crate::error::{Action, Entity};
use crate::models::Student;
use crate::ui::forms::StudentForm;
use crate::ui::worker::{Reply, Request};
use crate::validation::{eq_folded, validate_student, EditMode};

fn student_matches(student: &Student, term: &str) -> bool {
    matches_term(
        term,
        &[&student.first_name, &student.last_name, &student.email],
    )
}

/// State behind the Students tab.
#[derive(Debug, Default)]
pub(crate) struct StudentsScreen {
    pub(crate) listing: Listing<Student>,
    pub(crate) search: String,
    pub(crate) editor: Option<Editor<StudentForm>>,
    pub(crate) status: Status,
    /// Set from dispatch until the reply (and any reload after it) lands.
    pub(crate) busy: bool,
    /// Email to select once the reload after a save arrives.
    focus: Option<String>,
}

impl StudentsScreen {
    pub(crate) fn students(&self) -> &[Student] {
        self.listing.items()
    }

    /// Ask for the current collection. Skipped while a request is pending.
    pub(crate) fn refresh(&mut self) -> Option<Request> {
        if self.busy {
            debug!("students reload skipped while a request is pending");
            return None;
        }
        self.busy = true;
        Some(Request::LoadStudents)
    }

    /// Take a reply for this tab; returns the follow-up request, if any.
    pub(crate) fn apply(&mut self, reply: Reply) -> Option<Request> {
        match reply {
            Reply::Students(result) => {
                self.loaded(result);
                None
            }
            Reply::Saved(_, mode, result) => self.saved(mode, result),
            Reply::Deleted(_, id, result) => self.deleted(id, result),
            Reply::Courses(_) | Reply::Enrollments(_) => None,
        }
    }

    /// Replace the collection with what the service returned. A failed load
    /// leaves the list empty and reports the error.
    fn loaded(&mut self, result: Result<Listed<Student>, ApiError>) {
        self.busy = false;
        match result {
            Ok(listed) => {
                self.listing.set_items(listed.records, |s| student_matches(s, &self.search));
                if let Some(email) = self.focus.take() {
                    self.listing.select_where(|s| eq_folded(&s.email, &email));
                }
                if let Some(notice) = skipped_notice(Entity::Student, listed.skipped) {
                    self.status.error(notice);
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to load students");
                self.focus = None;
                self.listing.set_items(Vec::new(), |_| true);
                self.status.error(err.user_message(Action::Load(Entity::Student)));
            }
        }
    }

    pub(crate) fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.listing.refilter(|s| student_matches(s, &self.search));
    }

    pub(crate) fn open_create(&mut self) {
        self.editor = Some(Editor::creating(StudentForm::default()));
    }

    /// Copy `student` into the form and switch to edit mode.
    pub(crate) fn edit(&mut self, student: &Student) {
        self.editor = Some(Editor::editing(student.id, StudentForm::from_student(student)));
    }

    pub(crate) fn edit_selected(&mut self) {
        if let Some(student) = self.listing.current().cloned() {
            self.edit(&student);
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.editor = None;
        self.status.clear();
    }

    /// Validate the open form and build the save request. Nothing is sent
    /// when validation fails; on a service error the draft stays open.
    pub(crate) fn submit(&mut self, today: NaiveDate) -> Option<Request> {
        if self.busy {
            self.status.error(IN_PROGRESS);
            return None;
        }
        let editor = self.editor.as_mut()?;
        let mode = editor.mode;
        let payload = match validate_student(&editor.form.draft, mode, self.listing.items(), today)
        {
            Ok(payload) => payload,
            Err(err) => {
                editor.form.error = Some(err.to_string());
                self.status.error(err.to_string());
                return None;
            }
        };

        debug!(email = %payload.email, ?mode, "saving student");
        self.busy = true;
        self.focus = Some(payload.email.clone());
        Some(Request::SaveStudent(mode, payload))
    }

    fn saved(&mut self, mode: EditMode, result: Result<(), ApiError>) -> Option<Request> {
        match result {
            Ok(()) => {
                self.editor = None;
                let text = match mode {
                    EditMode::Creating => "Student created successfully.",
                    EditMode::Editing(_) => "Student updated successfully.",
                };
                info!(?mode, "student saved");
                self.status.info(text);
                Some(Request::LoadStudents)
            }
            Err(err) => {
                warn!(error = %err, ?mode, "failed to save student");
                self.busy = false;
                self.focus = None;
                let message = err.user_message(Action::Save(Entity::Student));
                if let Some(editor) = self.editor.as_mut() {
                    editor.form.error = Some(message.clone());
                }
                self.status.error(message);
                None
            }
        }
    }

    /// Delete by id. The list only changes through the reload that follows a
    /// successful delete.
    pub(crate) fn remove(&mut self, id: i64) -> Option<Request> {
        if self.busy {
            self.status.error(IN_PROGRESS);
            return None;
        }
        self.busy = true;
        Some(Request::Delete(Entity::Student, id))
    }

    fn deleted(&mut self, id: i64, result: Result<(), ApiError>) -> Option<Request> {
        match result {
            Ok(()) => {
                info!(id, "student deleted");
                self.status.info("Student deleted successfully.");
                Some(Request::LoadStudents)
            }
            Err(err) => {
                warn!(error = %err, id, "failed to delete student");
                self.busy = false;
                self.status.error(err.user_message(Action::Delete(Entity::Student)));
                None
            }
        }
    }
}
