use tracing::{debug, info, warn};

use super::{matches_term, skipped_notice, Editor, Listing, Status, IN_PROGRESS};
use crate::api::{ApiError, Listed};
use crate::error::{Action, Entity};
use crate::models::Course;
use crate::ui::forms::CourseForm;
use crate::ui::worker::{Reply, Request};
use crate::validation::{eq_folded, validate_course, EditMode};

fn course_matches(course: &Course, term: &str) -> bool {
    matches_term(term, &[&course.name, &course.description])
}

/// State behind the Courses tab.
#[derive(Debug, Default)]
pub(crate) struct CoursesScreen {
    pub(crate) listing: Listing<Course>,
    pub(crate) search: String,
    pub(crate) editor: Option<Editor<CourseForm>>,
    pub(crate) status: Status,
    pub(crate) busy: bool,
    focus: Option<String>,
}

impl CoursesScreen {
    pub(crate) fn courses(&self) -> &[Course] {
        self.listing.items()
    }

    pub(crate) fn refresh(&mut self) -> Option<Request> {
        if self.busy {
            debug!("courses reload skipped while a request is pending");
            return None;
        }
        self.busy = true;
        Some(Request::LoadCourses)
    }

    pub(crate) fn apply(&mut self, reply: Reply) -> Option<Request> {
        match reply {
            Reply::Courses(result) => {
                self.loaded(result);
                None
            }
            Reply::Saved(_, mode, result) => self.saved(mode, result),
            Reply::Deleted(_, id, result) => self.deleted(id, result),
            Reply::Students(_) | Reply::Enrollments(_) => None,
        }
    }

    fn loaded(&mut self, result: Result<Listed<Course>, ApiError>) {
        self.busy = false;
        match result {
            Ok(listed) => {
                self.listing.set_items(listed.records, |c| course_matches(c, &self.search));
                if let Some(name) = self.focus.take() {
                    self.listing.select_where(|c| eq_folded(&c.name, &name));
                }
                if let Some(notice) = skipped_notice(Entity::Course, listed.skipped) {
                    self.status.error(notice);
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to load courses");
                self.focus = None;
                self.listing.set_items(Vec::new(), |_| true);
                self.status.error(err.user_message(Action::Load(Entity::Course)));
            }
        }
    }

    pub(crate) fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.listing.refilter(|c| course_matches(c, &self.search));
    }

    pub(crate) fn open_create(&mut self) {
        self.editor = Some(Editor::creating(CourseForm::default()));
    }

    pub(crate) fn edit(&mut self, course: &Course) {
        self.editor = Some(Editor::editing(course.id, CourseForm::from_course(course)));
    }

    pub(crate) fn edit_selected(&mut self) {
        if let Some(course) = self.listing.current().cloned() {
            self.edit(&course);
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.editor = None;
        self.status.clear();
    }

    pub(crate) fn submit(&mut self) -> Option<Request> {
        if self.busy {
            self.status.error(IN_PROGRESS);
            return None;
        }
        let editor = self.editor.as_mut()?;
        let mode = editor.mode;
        let payload = match validate_course(&editor.form.draft, mode, self.listing.items()) {
            Ok(payload) => payload,
            Err(err) => {
                editor.form.error = Some(err.to_string());
                self.status.error(err.to_string());
                return None;
            }
        };

        debug!(name = %payload.name, ?mode, "saving course");
        self.busy = true;
        self.focus = Some(payload.name.clone());
        Some(Request::SaveCourse(mode, payload))
    }

    fn saved(&mut self, mode: EditMode, result: Result<(), ApiError>) -> Option<Request> {
        match result {
            Ok(()) => {
                self.editor = None;
                let text = match mode {
                    EditMode::Creating => "Course created successfully.",
                    EditMode::Editing(_) => "Course updated successfully.",
                };
                info!(?mode, "course saved");
                self.status.info(text);
                Some(Request::LoadCourses)
            }
            Err(err) => {
                warn!(error = %err, ?mode, "failed to save course");
                self.busy = false;
                self.focus = None;
                let message = err.user_message(Action::Save(Entity::Course));
                if let Some(editor) = self.editor.as_mut() {
                    editor.form.error = Some(message.clone());
                }
                self.status.error(message);
                None
            }
        }
    }

    /// The service refuses (400) while enrollments still point at the course.
    pub(crate) fn remove(&mut self, id: i64) -> Option<Request> {
        if self.busy {
            self.status.error(IN_PROGRESS);
            return None;
        }
        self.busy = true;
        Some(Request::Delete(Entity::Course, id))
    }

    fn deleted(&mut self, id: i64, result: Result<(), ApiError>) -> Option<Request> {
        match result {
            Ok(()) => {
                info!(id, "course deleted");
                self.status.info("Course deleted successfully.");
                Some(Request::LoadCourses)
            }
            Err(err) => {
                warn!(error = %err, id, "failed to delete course");
                self.busy = false;
                self.status.error(err.user_message(Action::Delete(Entity::Course)));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{Failure, FakeBackend, Verb};
    use crate::api::Resource;
    use crate::ui::worker::perform;
    use crate::validation::CourseDraft;
    use serde_json::json;

    fn backend() -> FakeBackend {
        FakeBackend::new().with_records(
            Resource::Courses,
            vec![
                json!({ "id": 1, "nombre": "Algebra", "descripcion": "Linear algebra basics", "creditos": 4 }),
                json!({ "id": 2, "nombre": "Physics", "descripcion": "Mechanics and waves", "creditos": 5 }),
            ],
        )
    }

    fn run(screen: &mut CoursesScreen, api: &FakeBackend, request: Option<Request>) {
        let mut next = request;
        while let Some(request) = next {
            next = screen.apply(perform(api, request));
        }
    }

    fn loaded(api: &FakeBackend) -> CoursesScreen {
        let mut screen = CoursesScreen::default();
        let request = screen.refresh();
        run(&mut screen, api, request);
        api.clear_calls();
        screen
    }

    fn submit(screen: &mut CoursesScreen, api: &FakeBackend) {
        let request = screen.submit();
        run(screen, api, request);
    }

    #[test]
    fn short_name_is_rejected_locally() {
        let api = backend();
        let mut screen = loaded(&api);

        screen.open_create();
        screen.editor.as_mut().unwrap().form.draft = CourseDraft {
            name: "AB".into(),
            description: "Valid description".into(),
            credits: "3".into(),
        };
        submit(&mut screen, &api);

        assert_eq!(api.mutation_count(), 0);
        assert_eq!(
            screen.status.text(),
            Some("Course name must be at least 3 characters.")
        );
        assert!(screen.editor.is_some());
    }

    #[test]
    fn duplicate_name_is_rejected_case_insensitively() {
        let api = backend();
        let mut screen = loaded(&api);

        screen.open_create();
        screen.editor.as_mut().unwrap().form.draft = CourseDraft {
            name: " algebra ".into(),
            description: "Another algebra course".into(),
            credits: "2".into(),
        };
        submit(&mut screen, &api);

        assert_eq!(api.mutation_count(), 0);
        assert_eq!(
            screen.status.text(),
            Some("A course with this name already exists.")
        );
    }

    #[test]
    fn valid_course_is_created_and_listed() {
        let api = backend();
        let mut screen = loaded(&api);

        screen.open_create();
        screen.editor.as_mut().unwrap().form.draft = CourseDraft {
            name: "Chemistry".into(),
            description: "Atoms and reactions".into(),
            credits: "3".into(),
        };
        submit(&mut screen, &api);

        assert_eq!(api.mutation_count(), 1);
        assert_eq!(api.calls()[0].body.as_ref().unwrap()["creditos"], 3);
        assert!(!screen.busy);
        assert_eq!(screen.courses().len(), 3);
        assert_eq!(screen.listing.current().unwrap().name, "Chemistry");
    }

    #[test]
    fn course_with_enrollments_survives_failed_delete() {
        let api = backend();
        let mut screen = loaded(&api);
        api.fail(
            Resource::Courses,
            Verb::Delete,
            Failure::Status(400, Some("El curso tiene estudiantes inscritos".into())),
        );

        let request = screen.remove(1);
        run(&mut screen, &api, request);

        assert_eq!(
            screen.status.text(),
            Some("Cannot delete the course: other records still depend on it.")
        );
        assert_eq!(api.records(Resource::Courses).len(), 2);
        assert!(!screen.busy);
        let request = screen.refresh();
        run(&mut screen, &api, request);
        assert!(screen.courses().iter().any(|c| c.id == 1));
    }

    #[test]
    fn search_covers_name_and_description() {
        let api = backend();
        let mut screen = loaded(&api);

        screen.set_search("WAVES");
        let names: Vec<_> = screen.listing.visible().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Physics"]);

        screen.set_search("");
        assert_eq!(screen.listing.visible_len(), 2);
    }

    #[test]
    fn unknown_status_uses_server_message() {
        let api = backend();
        let mut screen = loaded(&api);
        api.fail(
            Resource::Courses,
            Verb::Update,
            Failure::Status(500, Some("Database unavailable".into())),
        );

        let physics = screen.courses()[1].clone();
        screen.edit(&physics);
        submit(&mut screen, &api);

        assert_eq!(screen.status.text(), Some("Database unavailable"));
        assert_eq!(
            screen.editor.as_ref().unwrap().form.error.as_deref(),
            Some("Database unavailable")
        );
    }
}
