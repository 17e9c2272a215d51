//! Per-tab state. Each screen owns its loaded collection, the open form (if
//! any) and its status line. Screens never call the services themselves:
//! they hand back a [`Request`](crate::ui::worker::Request) and later apply
//! the matching [`Reply`](crate::ui::worker::Reply).

mod courses;
mod enrollments;
mod students;

use std::cmp::min;
use std::time::{Duration, Instant};

use ratatui::style::{Color, Style};

use crate::error::Entity;
use crate::validation::EditMode;

pub(crate) use courses::CoursesScreen;
pub(crate) use enrollments::EnrollmentsScreen;
pub(crate) use students::StudentsScreen;

/// How long a status message stays on screen.
pub(crate) const STATUS_TTL: Duration = Duration::from_secs(5);

pub(crate) const IN_PROGRESS: &str = "A request is already in progress.";

/// Status text for records dropped while decoding a list.
pub(crate) fn skipped_notice(entity: Entity, skipped: usize) -> Option<String> {
    match skipped {
        0 => None,
        1 => Some(format!(
            "Skipped 1 {} record with an unexpected format.",
            entity.noun()
        )),
        n => Some(format!(
            "Skipped {n} {} records with an unexpected format.",
            entity.noun()
        )),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    pub(crate) fn style(self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StatusMessage {
    pub(crate) text: String,
    pub(crate) kind: StatusKind,
    set_at: Instant,
}

/// One transient message per screen. A new message replaces the old one and
/// resets its timer.
#[derive(Debug, Default)]
pub(crate) struct Status {
    current: Option<StatusMessage>,
}

impl Status {
    pub(crate) fn set(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.current = Some(StatusMessage {
            text: text.into(),
            kind,
            set_at: Instant::now(),
        });
    }

    pub(crate) fn info(&mut self, text: impl Into<String>) {
        self.set(text, StatusKind::Info);
    }

    pub(crate) fn error(&mut self, text: impl Into<String>) {
        self.set(text, StatusKind::Error);
    }

    pub(crate) fn clear(&mut self) {
        self.current = None;
    }

    pub(crate) fn get(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|message| message.text.as_str())
    }

    /// Drop the message once it is older than [`STATUS_TTL`].
    pub(crate) fn expire(&mut self, now: Instant) {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|message| now.saturating_duration_since(message.set_at) >= STATUS_TTL);
        if expired {
            self.current = None;
        }
    }
}

/// An open form together with what submitting it will do.
#[derive(Debug, Clone)]
pub(crate) struct Editor<F> {
    pub(crate) mode: EditMode,
    pub(crate) form: F,
}

impl<F> Editor<F> {
    pub(crate) fn creating(form: F) -> Self {
        Self {
            mode: EditMode::Creating,
            form,
        }
    }

    pub(crate) fn editing(id: i64, form: F) -> Self {
        Self {
            mode: EditMode::Editing(id),
            form,
        }
    }
}

/// Loaded records plus the filtered view and cursor shown in the list.
#[derive(Debug)]
pub(crate) struct Listing<T> {
    items: Vec<T>,
    visible: Vec<usize>,
    selected: usize,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            visible: Vec::new(),
            selected: 0,
        }
    }
}

impl<T> Listing<T> {
    /// Replace the whole collection and recompute the view with `keep`.
    pub(crate) fn set_items(&mut self, items: Vec<T>, keep: impl Fn(&T) -> bool) {
        self.items = items;
        self.refilter(keep);
    }

    pub(crate) fn refilter(&mut self, keep: impl Fn(&T) -> bool) {
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| keep(item))
            .map(|(index, _)| index)
            .collect();
        self.ensure_in_bounds();
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn visible(&self) -> impl Iterator<Item = &T> + '_ {
        self.visible.iter().map(|&index| &self.items[index])
    }

    pub(crate) fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub(crate) fn selected(&self) -> usize {
        self.selected
    }

    pub(crate) fn current(&self) -> Option<&T> {
        self.visible
            .get(self.selected)
            .map(|&index| &self.items[index])
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    /// Put the cursor on the first visible item matching `pred`, if any.
    pub(crate) fn select_where(&mut self, pred: impl Fn(&T) -> bool) {
        if let Some(position) = self
            .visible
            .iter()
            .position(|&index| pred(&self.items[index]))
        {
            self.selected = position;
        }
    }

    fn ensure_in_bounds(&mut self) {
        self.selected = min(self.selected, self.visible.len().saturating_sub(1));
    }
}

/// Case-insensitive substring match over any of `fields`. An empty or blank
/// term matches everything.
pub(crate) fn matches_term(term: &str, fields: &[&str]) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || fields
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
}
