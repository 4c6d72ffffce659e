#![deny(unsafe_op_in_unsafe_fn)]
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nerv_dashboard::app::App;
use nerv_dashboard::cli::Cli;
use nerv_dashboard::config::{resolve_root, DashboardConfig, Secrets};
use nerv_dashboard::input::{open_buttons, ButtonSource};
use nerv_dashboard::pages::{build_pages, Feeds};
use nerv_dashboard::panel::open_panel;
use nerv_feeds::{HttpTransport, Transport};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = resolve_root(cli.root.clone())?;

    let log_cfg = nerv_logging::fs::read_config(&root);
    let _logging_guards = nerv_logging::init("nerv-dashboard", &root, &log_cfg)?;
    let _log_watcher = match nerv_logging::spawn_watcher(&root) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!("Logging watcher disabled: {}", err);
            None
        }
    };
    if let Err(err) = nerv_logging::run_retention(&root, &log_cfg) {
        tracing::warn!("Log retention failed: {:#}", err);
    }

    let span = tracing::info_span!("nerv-dashboard", component = "nerv-dashboard");
    let _span_guard = span.enter();

    run(cli, &root)
}

fn run(cli: Cli, root: &std::path::Path) -> Result<()> {
    let mut config = DashboardConfig::load(root)?;
    config.apply_env();
    tracing::info!(
        root = %root.display(),
        location = %config.location.name,
        backend = ?config.display.backend,
        "Starting NERV dashboard"
    );

    let secrets = match Secrets::load(root) {
        Ok(secrets) => secrets,
        Err(err) => {
            tracing::warn!("Ignoring unreadable secrets: {:#}", err);
            None
        }
    };
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new().context("building HTTP client")?);
    let feeds = Feeds::from_secrets(secrets, transport);
    let pages = build_pages(&config.pages.order, &config.location, feeds);

    let panel = open_panel(&config.display, root, cli.preview.clone());
    let buttons = if cli.once {
        None
    } else {
        open_buttons(&config.pins).map(|pad| Box::new(pad) as Box<dyn ButtonSource>)
    };

    let mut app = App::new(config, panel, buttons, pages);
    if let Some(name) = cli.page.as_deref() {
        if !app.select(name) {
            tracing::warn!(page = name, "Unknown page requested; starting on the first page");
        }
    }

    if cli.once {
        if app.update() {
            return Ok(());
        }
        anyhow::bail!("render failed; see log for details");
    }
    app.run()
}
