//! Ratatui front-end: one tab per collection, modal forms for create/edit, a
//! yes/no dialog before deletes, and a footer with the current status line.
//! Service calls run on worker threads; the event loop applies their replies.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;
mod worker;

pub use app::App;
pub use terminal::run_app;
