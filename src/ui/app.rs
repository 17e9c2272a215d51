use std::mem;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use tracing::debug;

use crate::api::Transport;
use crate::error::Entity;
use crate::validation::{date_prefix, EditMode};

use super::forms::ConfirmDelete;
use super::helpers::{centered_rect, key_hints};
use super::screens::{CoursesScreen, Editor, EnrollmentsScreen, Listing, Status, StudentsScreen};
use super::worker::{Reply, Request, Worker};

/// Rows taken by the tab bar, borders included.
const TABS_HEIGHT: u16 = 3;
/// Rows reserved for the status line and the key hints under a top border.
const FOOTER_HEIGHT: u16 = 3;
/// How far PageUp/PageDown move the list cursor.
const PAGE: isize = 5;
/// Placeholder for an empty list whose request has not come back yet.
const LOADING: &str = "Loading...";

/// One tab per collection, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tab {
    Students,
    Courses,
    Enrollments,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Students, Tab::Courses, Tab::Enrollments];

    fn title(self) -> &'static str {
        match self {
            Tab::Students => "Students",
            Tab::Courses => "Courses",
            Tab::Enrollments => "Enrollments",
        }
    }

    fn entity(self) -> Entity {
        match self {
            Tab::Students => Entity::Student,
            Tab::Courses => Entity::Course,
            Tab::Enrollments => Entity::Enrollment,
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Students => 0,
            Tab::Courses => 1,
            Tab::Enrollments => 2,
        }
    }

    fn cycle(self, delta: isize) -> Tab {
        let len = Self::ALL.len() as isize;
        Self::ALL[(self.index() as isize + delta).rem_euclid(len) as usize]
    }
}

/// Modal input state layered over the current tab. Open forms are not modes:
/// each screen owns its own editor.
enum Mode {
    Normal,
    /// Typing into the search bar; the list filters on every key.
    Searching(SearchState),
    /// Waiting for a yes/no before deleting a record.
    ConfirmDelete(ConfirmDelete),
}

/// Query being typed into the search bar.
struct SearchState {
    query: String,
}

/// Top-level state: the three tabs plus whichever modal is open. Forms are
/// owned by the screens; `Mode` only covers search and delete confirmation.
/// Requests go through the worker and their replies are applied in [`App::poll`].
pub struct App {
    worker: Worker,
    tab: Tab,
    students: StudentsScreen,
    courses: CoursesScreen,
    enrollments: EnrollmentsScreen,
    mode: Mode,
}

fn navigate<T>(listing: &mut Listing<T>, code: KeyCode) {
    match code {
        KeyCode::Up => listing.move_selection(-1),
        KeyCode::Down => listing.move_selection(1),
        KeyCode::PageUp => listing.move_selection(-PAGE),
        KeyCode::PageDown => listing.move_selection(PAGE),
        KeyCode::Home => listing.select_first(),
        KeyCode::End => listing.select_last(),
        _ => {}
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl App {
    pub fn new(api: Arc<dyn Transport>) -> Self {
        Self {
            worker: Worker::new(api),
            tab: Tab::Students,
            students: StudentsScreen::default(),
            courses: CoursesScreen::default(),
            enrollments: EnrollmentsScreen::default(),
            mode: Mode::Normal,
        }
    }

    /// Start fetching every collection. Lists fill in as replies arrive.
    pub fn load(&mut self) {
        let requests = [
            self.students.refresh(),
            self.courses.refresh(),
            self.enrollments.refresh_all(),
        ];
        for request in requests {
            self.dispatch(request);
        }
    }

    /// Apply every reply that has arrived since the last call.
    pub fn poll(&mut self) {
        while let Some(reply) = self.worker.try_recv() {
            self.apply(reply);
        }
    }

    /// Block until no request is in flight, applying replies as they come.
    #[cfg(test)]
    pub(crate) fn wait_idle(&mut self) {
        while let Some(reply) = self.worker.recv() {
            self.apply(reply);
        }
    }

    fn dispatch(&mut self, request: Option<Request>) {
        if let Some(request) = request {
            self.worker.dispatch(request);
        }
    }

    fn apply(&mut self, reply: Reply) {
        let follow_up = match reply.entity() {
            Entity::Student => self.students.apply(reply),
            Entity::Course => self.courses.apply(reply),
            Entity::Enrollment => self.enrollments.apply(reply),
        };
        self.dispatch(follow_up);
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal if self.form_open() => {
                self.handle_form_key(code);
                Mode::Normal
            }
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Searching(state) => self.handle_search(code, state),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
        };

        exit
    }

    /// Drop status messages that have been shown long enough.
    pub fn tick(&mut self, now: Instant) {
        self.students.status.expire(now);
        self.courses.status.expire(now);
        self.enrollments.status.expire(now);
    }

    fn form_open(&self) -> bool {
        match self.tab {
            Tab::Students => self.students.editor.is_some(),
            Tab::Courses => self.courses.editor.is_some(),
            Tab::Enrollments => self.enrollments.editor.is_some(),
        }
    }

    fn status(&self) -> &Status {
        match self.tab {
            Tab::Students => &self.students.status,
            Tab::Courses => &self.courses.status,
            Tab::Enrollments => &self.enrollments.status,
        }
    }

    fn status_mut(&mut self) -> &mut Status {
        match self.tab {
            Tab::Students => &mut self.students.status,
            Tab::Courses => &mut self.courses.status,
            Tab::Enrollments => &mut self.enrollments.status,
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if tab == self.tab {
            return;
        }
        debug!(tab = tab.title(), "switching tab");
        self.tab = tab;
        self.reload_current();
    }

    fn reload_current(&mut self) {
        let request = match self.tab {
            Tab::Students => self.students.refresh(),
            Tab::Courses => self.courses.refresh(),
            Tab::Enrollments => self.enrollments.refresh_all(),
        };
        self.dispatch(request);
    }

    fn busy(&self) -> bool {
        match self.tab {
            Tab::Students => self.students.busy,
            Tab::Courses => self.courses.busy,
            Tab::Enrollments => self.enrollments.busy,
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Tab => self.switch_tab(self.tab.cycle(1)),
            KeyCode::BackTab => self.switch_tab(self.tab.cycle(-1)),
            KeyCode::Char('1') => self.switch_tab(Tab::Students),
            KeyCode::Char('2') => self.switch_tab(Tab::Courses),
            KeyCode::Char('3') => self.switch_tab(Tab::Enrollments),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reload_current(),
            KeyCode::Char('+') | KeyCode::Char('n') => match self.tab {
                Tab::Students => self.students.open_create(),
                Tab::Courses => self.courses.open_create(),
                Tab::Enrollments => self.enrollments.open_create(),
            },
            KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Enter => match self.tab {
                Tab::Students => self.students.edit_selected(),
                Tab::Courses => self.courses.edit_selected(),
                Tab::Enrollments => self.enrollments.edit_selected(),
            },
            KeyCode::Char('-') | KeyCode::Char('d') => return self.confirm_selected(),
            KeyCode::Char('f') | KeyCode::Char('/') => {
                let query = match self.tab {
                    Tab::Students => self.students.search.clone(),
                    Tab::Courses => self.courses.search.clone(),
                    Tab::Enrollments => return Mode::Normal,
                };
                return Mode::Searching(SearchState { query });
            }
            _ => match self.tab {
                Tab::Students => navigate(&mut self.students.listing, code),
                Tab::Courses => navigate(&mut self.courses.listing, code),
                Tab::Enrollments => navigate(&mut self.enrollments.listing, code),
            },
        }
        Mode::Normal
    }

    fn confirm_selected(&mut self) -> Mode {
        let target = match self.tab {
            Tab::Students => self
                .students
                .listing
                .current()
                .map(|s| (s.id, s.full_name())),
            Tab::Courses => self
                .courses
                .listing
                .current()
                .map(|c| (c.id, c.name.clone())),
            Tab::Enrollments => self.enrollments.listing.current().map(|e| {
                let label = format!(
                    "{} in {}",
                    self.enrollments.resolve_student_name(e.student_id),
                    self.enrollments.resolve_course_name(e.course_id)
                );
                (e.id, label)
            }),
        };

        match target {
            Some((id, label)) => {
                self.status_mut().clear();
                Mode::ConfirmDelete(ConfirmDelete { id, label })
            }
            None => {
                let message = format!("No {} selected to delete.", self.tab.entity().noun());
                self.status_mut().error(message);
                Mode::Normal
            }
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let request = match self.tab {
                    Tab::Students => self.students.remove(confirm.id),
                    Tab::Courses => self.courses.remove(confirm.id),
                    Tab::Enrollments => self.enrollments.remove(confirm.id),
                };
                self.dispatch(request);
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.status_mut().info("Deletion cancelled.");
                Mode::Normal
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                state.query.clear();
                self.apply_search(&state.query);
                return Mode::Normal;
            }
            KeyCode::Enter => return Mode::Normal,
            KeyCode::Backspace => {
                state.query.pop();
                self.apply_search(&state.query);
            }
            KeyCode::Char(ch) => {
                state.query.push(ch);
                self.apply_search(&state.query);
            }
            _ => match self.tab {
                Tab::Students => navigate(&mut self.students.listing, code),
                Tab::Courses => navigate(&mut self.courses.listing, code),
                Tab::Enrollments => {}
            },
        }
        Mode::Searching(state)
    }

    fn apply_search(&mut self, query: &str) {
        match self.tab {
            Tab::Students => self.students.set_search(query),
            Tab::Courses => self.courses.set_search(query),
            Tab::Enrollments => {}
        }
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        if code == KeyCode::Enter {
            let request = match self.tab {
                Tab::Students => self.students.submit(today()),
                Tab::Courses => self.courses.submit(),
                Tab::Enrollments => self.enrollments.submit(),
            };
            self.dispatch(request);
            return;
        }

        match self.tab {
            Tab::Students => {
                let screen = &mut self.students;
                let Some(editor) = screen.editor.as_mut() else {
                    return;
                };
                match code {
                    KeyCode::Esc => screen.cancel(),
                    KeyCode::Tab | KeyCode::Down => editor.form.next_field(),
                    KeyCode::BackTab | KeyCode::Up => editor.form.previous_field(),
                    KeyCode::Backspace => editor.form.backspace(),
                    KeyCode::Char(ch) => {
                        editor.form.push_char(ch);
                    }
                    _ => {}
                }
            }
            Tab::Courses => {
                let screen = &mut self.courses;
                let Some(editor) = screen.editor.as_mut() else {
                    return;
                };
                match code {
                    KeyCode::Esc => screen.cancel(),
                    KeyCode::Tab | KeyCode::Down => editor.form.next_field(),
                    KeyCode::BackTab | KeyCode::Up => editor.form.previous_field(),
                    KeyCode::Backspace => editor.form.backspace(),
                    KeyCode::Char(ch) => {
                        editor.form.push_char(ch);
                    }
                    _ => {}
                }
            }
            Tab::Enrollments => {
                let screen = &mut self.enrollments;
                let Some(editor) = screen.editor.as_mut() else {
                    return;
                };
                match code {
                    KeyCode::Esc => screen.cancel(),
                    KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                        editor.form.toggle_field()
                    }
                    KeyCode::Left => screen.cycle_choice(-1),
                    KeyCode::Right => screen.cycle_choice(1),
                    KeyCode::Backspace => editor.form.backspace(),
                    KeyCode::Char(ch) => {
                        editor.form.push_char(ch);
                    }
                    _ => {}
                }
            }
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TABS_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            Tab::Students => self.draw_students(frame, chunks[1]),
            Tab::Courses => self.draw_courses(frame, chunks[1]),
            Tab::Enrollments => self.draw_enrollments(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Searching(state) => self.draw_search_bar(frame, chunks[1], state),
            Mode::ConfirmDelete(confirm) => self.draw_confirm(frame, area, confirm),
            Mode::Normal => self.draw_open_form(frame, area),
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let tabs = Tabs::new(Tab::ALL.iter().map(|tab| tab.title()))
            .select(self.tab.index())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Enrollment Admin"),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_students(&self, frame: &mut Frame, area: Rect) {
        let screen = &self.students;
        let rows = screen
            .listing
            .visible()
            .map(|s| {
                ListItem::new(format!(
                    "{:<26} {:<30} {:<10}  {}",
                    s.full_name(),
                    s.email,
                    date_prefix(&s.birth_date),
                    s.phone
                ))
            })
            .collect();
        let empty = if screen.busy {
            LOADING
        } else if screen.students().is_empty() {
            "No students yet. Press '+' to add one."
        } else {
            "No students match the current search."
        };
        let title = listing_title("Students", &screen.listing, &screen.search, screen.busy);
        render_rows(frame, area, &title, rows, screen.listing.selected(), empty);
    }

    fn draw_courses(&self, frame: &mut Frame, area: Rect) {
        let screen = &self.courses;
        let rows = screen
            .listing
            .visible()
            .map(|c| {
                ListItem::new(format!(
                    "{:<24} {:>2} cr  {}",
                    c.name, c.credits, c.description
                ))
            })
            .collect();
        let empty = if screen.busy {
            LOADING
        } else if screen.courses().is_empty() {
            "No courses yet. Press '+' to add one."
        } else {
            "No courses match the current search."
        };
        let title = listing_title("Courses", &screen.listing, &screen.search, screen.busy);
        render_rows(frame, area, &title, rows, screen.listing.selected(), empty);
    }

    fn draw_enrollments(&self, frame: &mut Frame, area: Rect) {
        let screen = &self.enrollments;
        let rows = screen
            .listing
            .visible()
            .map(|e| {
                ListItem::new(format!(
                    "#{:<6} {:<30} {}",
                    e.id,
                    screen.resolve_student_name(e.student_id),
                    screen.resolve_course_name(e.course_id)
                ))
            })
            .collect();
        let title = listing_title("Enrollments", &screen.listing, "", screen.busy);
        let empty = if screen.busy {
            LOADING
        } else {
            "No enrollments yet. Press '+' to add one."
        };
        render_rows(frame, area, &title, rows, screen.listing.selected(), empty);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = match self.status().get() {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.kind.style())),
            None if self.busy() => Line::from(Span::styled(
                "Waiting for the service... (q quits)",
                Style::default().fg(Color::Gray),
            )),
            None => Line::from(""),
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match &self.mode {
            Mode::Searching(_) => key_hints(&[("Enter", "Keep Filter"), ("Esc", "Clear")]),
            Mode::ConfirmDelete(_) => key_hints(&[("y", "Delete"), ("n", "Keep")]),
            Mode::Normal if self.form_open() && self.tab == Tab::Enrollments => key_hints(&[
                ("Tab", "Switch Field"),
                ("←→", "Pick"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ]),
            Mode::Normal if self.form_open() => key_hints(&[
                ("Tab", "Next Field"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ]),
            Mode::Normal if self.tab == Tab::Enrollments => key_hints(&[
                ("Tab", "Switch Tab"),
                ("↑↓", "Select"),
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Delete"),
                ("r", "Reload"),
                ("q", "Quit"),
            ]),
            Mode::Normal => key_hints(&[
                ("Tab", "Switch Tab"),
                ("↑↓", "Select"),
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Delete"),
                ("f", "Search"),
                ("r", "Reload"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_open_form(&self, frame: &mut Frame, area: Rect) {
        match self.tab {
            Tab::Students => {
                if let Some(editor) = &self.students.editor {
                    draw_form(
                        frame,
                        area,
                        &form_title(editor, "Student"),
                        editor.form.lines(),
                        editor.form.error.as_deref(),
                        editor.form.cursor(),
                    );
                }
            }
            Tab::Courses => {
                if let Some(editor) = &self.courses.editor {
                    draw_form(
                        frame,
                        area,
                        &form_title(editor, "Course"),
                        editor.form.lines(),
                        editor.form.error.as_deref(),
                        editor.form.cursor(),
                    );
                }
            }
            Tab::Enrollments => {
                if let Some(editor) = &self.enrollments.editor {
                    let screen = &self.enrollments;
                    let draft = &editor.form.draft;
                    let student_id = draft.student_id.trim().parse().ok();
                    let course_id = draft.course_id.trim().parse().ok();
                    let student = screen.resolve_student_name(student_id);
                    let course = screen.resolve_course_name(course_id);
                    let duplicate = match (editor.mode, student_id, course_id) {
                        (EditMode::Creating, Some(student_id), Some(course_id)) => screen
                            .validate_duplicate(student_id, course_id, None)
                            .map(|existing| {
                                format!("Already enrolled as #{}.", existing.id)
                            }),
                        _ => None,
                    };
                    draw_form(
                        frame,
                        area,
                        &form_title(editor, "Enrollment"),
                        editor.form.lines(&student, &course),
                        editor.form.error.as_deref().or(duplicate.as_deref()),
                        editor.form.cursor(),
                    );
                }
            }
        }
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Delete {} '{}'?",
                self.tab.entity().noun(),
                confirm.label
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

fn form_title<F>(editor: &Editor<F>, noun: &str) -> String {
    match editor.mode {
        EditMode::Creating => format!("New {noun}"),
        EditMode::Editing(id) => format!("Edit {noun} #{id}"),
    }
}

fn listing_title<T>(label: &str, listing: &Listing<T>, search: &str, busy: bool) -> String {
    let total = listing.items().len();
    let mut title = if search.trim().is_empty() {
        format!("{label} ({total})")
    } else {
        format!(
            "{label} ({} of {total}) - search: {search}",
            listing.visible_len()
        )
    };
    if busy {
        title.push_str(" - loading...");
    }
    title
}

fn render_rows(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: Vec<ListItem<'static>>,
    selected: usize,
    empty: &str,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    if rows.is_empty() {
        let message = Paragraph::new(empty.to_string())
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(message, area);
        return;
    }

    let list = List::new(rows)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_form(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    mut lines: Vec<Line<'static>>,
    error: Option<&str>,
    cursor: (u16, u16),
) {
    let popup_area = centered_rect(70, 50, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    lines.push(Line::from(""));
    match error {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::from(Span::styled(
            "Enter to save, Tab to switch, Esc to cancel",
            Style::default().fg(Color::Gray),
        ))),
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    let (column, row) = cursor;
    frame.set_cursor_position((inner.x + column, inner.y + row));
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc};

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use serde_json::json;

    use super::*;
    use crate::api::testing::{Failure, FakeBackend, StalledBackend, Verb};
    use crate::api::Resource;
    use crate::ui::screens::{IN_PROGRESS, STATUS_TTL};

    fn backend() -> Arc<FakeBackend> {
        Arc::new(
            FakeBackend::new()
                .with_records(
                    Resource::Students,
                    vec![json!({ "id": 1, "nombre": "Ana", "apellido": "Lopez", "email": "ana@x.com",
                                 "fechaNacimiento": "2000-01-01", "telefono": "3001234567" })],
                )
                .with_records(
                    Resource::Courses,
                    vec![json!({ "id": 10, "nombre": "Algebra", "descripcion": "Linear algebra basics", "creditos": 4 })],
                )
                .with_records(
                    Resource::Enrollments,
                    vec![
                        json!({ "id": 50, "estudianteId": 1, "cursoId": 10 }),
                        json!({ "id": 51, "estudianteId": 7, "cursoId": 10 }),
                    ],
                ),
        )
    }

    fn app(api: &Arc<FakeBackend>) -> App {
        let mut app = App::new(api.clone());
        app.load();
        app.wait_idle();
        api.clear_calls();
        app
    }

    /// Press each key and let any request it starts finish.
    fn press(app: &mut App, keys: &[KeyCode]) {
        for &key in keys {
            app.handle_key(key);
            app.wait_idle();
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch));
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn q_quits_only_outside_forms() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('+')]);
        assert!(!app.handle_key(KeyCode::Char('q')));
        assert_eq!(app.students.editor.as_ref().unwrap().form.draft.first_name, "q");

        press(&mut app, &[KeyCode::Esc]);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn switching_tabs_reloads_the_tab() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('3')]);

        assert_eq!(app.tab, Tab::Enrollments);
        assert_eq!(api.calls().len(), 3);
        press(&mut app, &[KeyCode::Tab]);
        assert_eq!(app.tab, Tab::Students);
    }

    #[test]
    fn course_typed_through_the_form_is_created() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('+')]);
        type_text(&mut app, "Chemistry");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Atoms and reactions");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "3x");
        press(&mut app, &[KeyCode::Enter]);

        assert_eq!(api.mutation_count(), 1);
        assert!(app.courses.editor.is_none());
        assert_eq!(app.courses.courses().len(), 2);
        assert_eq!(
            app.courses.status.text(),
            Some("Course created successfully.")
        );
    }

    #[test]
    fn delete_requires_confirmation() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('n')]);
        assert_eq!(api.mutation_count(), 0);
        assert_eq!(app.students.status.text(), Some("Deletion cancelled."));

        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('x')]);
        assert!(matches!(app.mode, Mode::ConfirmDelete(_)));
        press(&mut app, &[KeyCode::Char('y')]);

        assert_eq!(api.mutation_count(), 1);
        assert!(app.students.students().is_empty());
    }

    #[test]
    fn dependent_course_delete_is_reported() {
        let api = backend();
        let mut app = app(&api);
        api.fail(Resource::Courses, Verb::Delete, Failure::Status(400, None));

        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('-'), KeyCode::Enter]);

        assert_eq!(
            app.courses.status.text(),
            Some("Cannot delete the course: other records still depend on it.")
        );
        assert_eq!(app.courses.courses().len(), 1);
    }

    #[test]
    fn search_filters_live_and_esc_clears() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('f')]);
        type_text(&mut app, "zzz");
        assert_eq!(app.students.listing.visible_len(), 0);

        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.students.listing.visible_len(), 1);
        assert_eq!(api.calls().len(), 0);
    }

    #[test]
    fn enrollment_picker_fills_ids_from_loaded_records() {
        let api = backend();
        let mut app = app(&api);

        press(
            &mut app,
            &[
                KeyCode::Char('3'),
                KeyCode::Char('+'),
                KeyCode::Right,
                KeyCode::Tab,
                KeyCode::Right,
            ],
        );
        let draft = &app.enrollments.editor.as_ref().unwrap().form.draft;
        assert_eq!((draft.student_id.as_str(), draft.course_id.as_str()), ("1", "10"));

        api.clear_calls();
        press(&mut app, &[KeyCode::Enter]);
        assert!(api.calls().is_empty());
        assert_eq!(
            app.enrollments.status.text(),
            Some("This enrollment already exists.")
        );
    }

    #[test]
    fn statuses_expire_on_tick() {
        let api = backend();
        let mut app = app(&api);
        app.students.status.info("Student created successfully.");

        app.tick(Instant::now());
        assert!(app.students.status.get().is_some());

        app.tick(Instant::now() + STATUS_TTL);
        assert!(app.students.status.get().is_none());
    }

    #[test]
    fn enrollments_render_names_and_placeholders() {
        let api = backend();
        let mut app = app(&api);
        press(&mut app, &[KeyCode::Char('3')]);

        let screen = render(&app);

        assert!(screen.contains("Enrollment Admin"));
        assert!(screen.contains("Ana Lopez"));
        assert!(screen.contains("Student not found"));
        assert!(screen.contains("Algebra"));
    }

    #[test]
    fn enrollment_form_warns_about_existing_pair_before_submit() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('3'), KeyCode::Char('+')]);
        type_text(&mut app, "1");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "10");
        let screen = render(&app);

        assert!(screen.contains("Already enrolled as #50."));
        assert!(screen.contains("Ana Lopez"));
    }

    #[test]
    fn open_form_shows_validation_error() {
        let api = backend();
        let mut app = app(&api);

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Enter]);
        let screen = render(&app);

        assert!(screen.contains("New Student"));
        assert!(screen.contains("All fields are required."));
    }

    #[test]
    fn stalled_service_leaves_the_interface_responsive() {
        let (release, gate) = mpsc::channel::<()>();
        let mut app = App::new(Arc::new(StalledBackend::new(gate)));
        app.load();
        app.poll();

        assert!(app.students.busy);
        let screen = render(&app);
        assert!(screen.contains("Students (0) - loading..."));
        assert!(screen.contains("Waiting for the service"));

        app.handle_key(KeyCode::Char('+'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.students.status.text(), Some(IN_PROGRESS));
        app.handle_key(KeyCode::Esc);
        assert!(app.handle_key(KeyCode::Char('q')));

        drop(release);
        app.wait_idle();
        assert!(!app.students.busy);
        assert!(!app.enrollments.busy);
        assert!(!render(&app).contains("loading"));
    }

    #[test]
    fn replies_are_applied_on_poll() {
        let api = backend();
        let mut app = App::new(api.clone());

        app.load();
        app.poll();
        while app.enrollments.busy || app.students.busy || app.courses.busy {
            std::thread::yield_now();
            app.poll();
        }

        assert_eq!(app.students.students().len(), 1);
        assert_eq!(app.enrollments.enrollments().len(), 2);
    }
}
