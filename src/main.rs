//! Binary entry point: read the configuration, start logging, load the three
//! collections and hand the terminal to the UI until the user quits.
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use enrollment_admin::api::HttpTransport;
use enrollment_admin::{logging, run_app, App, Config};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let log_path = logging::init(&config).context("failed to initialize logging")?;
    info!(
        students = %config.students_url,
        courses = %config.courses_url,
        log = %log_path.display(),
        "starting enrollment admin"
    );

    let transport = HttpTransport::new(&config).context("failed to build the HTTP client")?;
    let mut app = App::new(Arc::new(transport));
    app.load();
    run_app(&mut app)
}
