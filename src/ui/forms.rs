use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Course, Enrollment, Student};
use crate::validation::{CourseDraft, EnrollmentDraft, StudentDraft};

/// Step through `all` starting from `current`, wrapping at both ends.
fn cycle<T: Copy + PartialEq>(all: &[T], current: T, delta: isize) -> T {
    let len = all.len() as isize;
    let position = all.iter().position(|f| *f == current).unwrap_or(0) as isize;
    all[(position + delta).rem_euclid(len) as usize]
}

/// Render `Label: value`, highlighting the focused field and greying out
/// empty ones.
fn field_line(label: &str, value: &str, placeholder: &str, active: bool) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };
    let style = if active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

/// Column where the cursor sits after `Label: value`.
fn cursor_column(label: &str, value: &str) -> u16 {
    (label.chars().count() + 2 + value.chars().count()) as u16
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum StudentField {
    #[default]
    FirstName,
    LastName,
    Email,
    BirthDate,
    Phone,
}

impl StudentField {
    const ALL: [StudentField; 5] = [
        StudentField::FirstName,
        StudentField::LastName,
        StudentField::Email,
        StudentField::BirthDate,
        StudentField::Phone,
    ];

    fn label(self) -> &'static str {
        match self {
            StudentField::FirstName => "First name",
            StudentField::LastName => "Last name",
            StudentField::Email => "Email",
            StudentField::BirthDate => "Birth date",
            StudentField::Phone => "Phone",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            StudentField::BirthDate => "<YYYY-MM-DD>",
            StudentField::Phone => "<10 digits>",
            _ => "<required>",
        }
    }
}

/// Student draft plus focus and the last rejection message.
#[derive(Debug, Default, Clone)]
pub(crate) struct StudentForm {
    pub(crate) draft: StudentDraft,
    pub(crate) active: StudentField,
    pub(crate) error: Option<String>,
}

impl StudentForm {
    pub(crate) fn from_student(student: &Student) -> Self {
        Self {
            draft: StudentDraft::from_student(student),
            ..Self::default()
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = cycle(&StudentField::ALL, self.active, 1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = cycle(&StudentField::ALL, self.active, -1);
    }

    fn value(&self, field: StudentField) -> &str {
        match field {
            StudentField::FirstName => &self.draft.first_name,
            StudentField::LastName => &self.draft.last_name,
            StudentField::Email => &self.draft.email,
            StudentField::BirthDate => &self.draft.birth_date,
            StudentField::Phone => &self.draft.phone,
        }
    }

    fn value_mut(&mut self, field: StudentField) -> &mut String {
        match field {
            StudentField::FirstName => &mut self.draft.first_name,
            StudentField::LastName => &mut self.draft.last_name,
            StudentField::Email => &mut self.draft.email,
            StudentField::BirthDate => &mut self.draft.birth_date,
            StudentField::Phone => &mut self.draft.phone,
        }
    }

    /// Append a character to the focused field. Phone takes digits only and
    /// the birth date takes digits and dashes.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active {
            StudentField::Phone => ch.is_ascii_digit(),
            StudentField::BirthDate => ch.is_ascii_digit() || ch == '-',
            _ => !ch.is_control(),
        };
        if accepted {
            self.value_mut(self.active).push(ch);
            self.error = None;
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        StudentField::ALL
            .iter()
            .map(|&field| {
                field_line(
                    field.label(),
                    self.value(field),
                    field.placeholder(),
                    field == self.active,
                )
            })
            .collect()
    }

    /// Cursor offset `(column, row)` relative to the form body.
    pub(crate) fn cursor(&self) -> (u16, u16) {
        let row = StudentField::ALL
            .iter()
            .position(|f| *f == self.active)
            .unwrap_or(0) as u16;
        (
            cursor_column(self.active.label(), self.value(self.active)),
            row,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum CourseField {
    #[default]
    Name,
    Description,
    Credits,
}

impl CourseField {
    const ALL: [CourseField; 3] = [
        CourseField::Name,
        CourseField::Description,
        CourseField::Credits,
    ];

    fn label(self) -> &'static str {
        match self {
            CourseField::Name => "Name",
            CourseField::Description => "Description",
            CourseField::Credits => "Credits",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            CourseField::Name => "<at least 3 characters>",
            CourseField::Description => "<10 to 255 characters>",
            CourseField::Credits => "<1-10>",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct CourseForm {
    pub(crate) draft: CourseDraft,
    pub(crate) active: CourseField,
    pub(crate) error: Option<String>,
}

impl CourseForm {
    pub(crate) fn from_course(course: &Course) -> Self {
        Self {
            draft: CourseDraft::from_course(course),
            ..Self::default()
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = cycle(&CourseField::ALL, self.active, 1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = cycle(&CourseField::ALL, self.active, -1);
    }

    fn value(&self, field: CourseField) -> &str {
        match field {
            CourseField::Name => &self.draft.name,
            CourseField::Description => &self.draft.description,
            CourseField::Credits => &self.draft.credits,
        }
    }

    fn value_mut(&mut self, field: CourseField) -> &mut String {
        match field {
            CourseField::Name => &mut self.draft.name,
            CourseField::Description => &mut self.draft.description,
            CourseField::Credits => &mut self.draft.credits,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active {
            CourseField::Credits => ch.is_ascii_digit(),
            _ => !ch.is_control(),
        };
        if accepted {
            self.value_mut(self.active).push(ch);
            self.error = None;
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    pub(crate) fn lines(&self) -> Vec<Line<'static>> {
        CourseField::ALL
            .iter()
            .map(|&field| {
                field_line(
                    field.label(),
                    self.value(field),
                    field.placeholder(),
                    field == self.active,
                )
            })
            .collect()
    }

    pub(crate) fn cursor(&self) -> (u16, u16) {
        let row = CourseField::ALL
            .iter()
            .position(|f| *f == self.active)
            .unwrap_or(0) as u16;
        (
            cursor_column(self.active.label(), self.value(self.active)),
            row,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum EnrollmentField {
    #[default]
    Student,
    Course,
}

impl EnrollmentField {
    fn label(self) -> &'static str {
        match self {
            EnrollmentField::Student => "Student id",
            EnrollmentField::Course => "Course id",
        }
    }
}

/// The two id fields double as pickers: Left/Right walk the loaded
/// collection, digits type an id directly.
#[derive(Debug, Default, Clone)]
pub(crate) struct EnrollmentForm {
    pub(crate) draft: EnrollmentDraft,
    pub(crate) active: EnrollmentField,
    pub(crate) error: Option<String>,
}

impl EnrollmentForm {
    /// `None` when the record is missing either foreign key.
    pub(crate) fn from_enrollment(enrollment: &Enrollment) -> Option<Self> {
        let student_id = enrollment.student_id?;
        let course_id = enrollment.course_id?;
        Some(Self {
            draft: EnrollmentDraft {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
            },
            ..Self::default()
        })
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            EnrollmentField::Student => EnrollmentField::Course,
            EnrollmentField::Course => EnrollmentField::Student,
        };
    }

    fn value_mut(&mut self) -> &mut String {
        match self.active {
            EnrollmentField::Student => &mut self.draft.student_id,
            EnrollmentField::Course => &mut self.draft.course_id,
        }
    }

    fn value(&self, field: EnrollmentField) -> &str {
        match field {
            EnrollmentField::Student => &self.draft.student_id,
            EnrollmentField::Course => &self.draft.course_id,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if !ch.is_ascii_digit() {
            return false;
        }
        self.value_mut().push(ch);
        self.error = None;
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut().pop();
    }

    /// Move the focused field to the next/previous loaded record. An id that
    /// matches nothing restarts from the first (or last) record.
    pub(crate) fn cycle_choice(&mut self, students: &[Student], courses: &[Course], delta: isize) {
        let ids: Vec<i64> = match self.active {
            EnrollmentField::Student => students.iter().map(|s| s.id).collect(),
            EnrollmentField::Course => courses.iter().map(|c| c.id).collect(),
        };
        if ids.is_empty() {
            return;
        }
        let len = ids.len() as isize;
        let current = self.value(self.active).trim().parse::<i64>().ok();
        let next = match current.and_then(|id| ids.iter().position(|candidate| *candidate == id)) {
            Some(position) => (position as isize + delta).rem_euclid(len),
            None if delta >= 0 => 0,
            None => len - 1,
        };
        *self.value_mut() = ids[next as usize].to_string();
        self.error = None;
    }

    /// Field lines followed by the name each id currently resolves to.
    pub(crate) fn lines(&self, student_name: &str, course_name: &str) -> Vec<Line<'static>> {
        let hint = Style::default().fg(Color::Gray);
        let mut student = field_line(
            EnrollmentField::Student.label(),
            self.value(EnrollmentField::Student),
            "<select>",
            self.active == EnrollmentField::Student,
        );
        student.push_span(Span::styled(format!("  {student_name}"), hint));
        let mut course = field_line(
            EnrollmentField::Course.label(),
            self.value(EnrollmentField::Course),
            "<select>",
            self.active == EnrollmentField::Course,
        );
        course.push_span(Span::styled(format!("  {course_name}"), hint));
        vec![student, course]
    }

    pub(crate) fn cursor(&self) -> (u16, u16) {
        let row = match self.active {
            EnrollmentField::Student => 0,
            EnrollmentField::Course => 1,
        };
        (
            cursor_column(self.active.label(), self.value(self.active)),
            row,
        )
    }
}

/// State for the yes/no dialog shown before any delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfirmDelete {
    pub(crate) id: i64,
    pub(crate) label: String,
}
