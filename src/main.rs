use clap::Parser;
use dbdash::cli::{self, Cli, Command, ConnectArgs};
use dbdash::config::{self, AppConfig};
use dbdash::error::DashError;
use dbdash::filter::build_filter_set;
use dbdash::pagination::{PageRequest, load_page_view};
use dbdash::query::{JoinSpec, perform_join};
use dbdash::schema::{self, Catalog};
use dbdash::session::{self, Session};
use dbdash::verbose::{self, Timer};
use dbdash::{discovery, format, masking, output, report};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};

const NO_DATABASE_NOTICE: &str =
    "no database file selected; pass --db-path (run `dbdash databases` to list candidates)";
const JOIN_PRECONDITION_NOTICE: &str =
    "join needs at least two --table values and exactly one non-empty --on per table after the first";

#[tokio::main]
async fn main() {
    // Load .env file (optional, ignore if missing)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let flags = Flags {
        verbose: cli.verbose,
        show_secrets: cli.show_secrets,
        config_path: cli.config.clone(),
    };

    let result = match &cli.command {
        Command::Databases(args) => databases(args, &flags),
        Command::Tables(args) => tables(args, &flags).await,
        Command::Columns(args) => columns(args, &flags).await,
        Command::Page(args) => page(args, &flags).await,
        Command::Join(args) => join(args, &flags).await,
        Command::Report(args) => export_report(args, &flags).await,
    };

    if let Err(err) = result {
        output::print_error(&err);
        process::exit(1);
    }
}

/// Global flags shared by every command.
struct Flags {
    verbose: bool,
    show_secrets: bool,
    config_path: Option<PathBuf>,
}

fn load_config(args: &ConnectArgs, flags: &Flags) -> Result<AppConfig, DashError> {
    let app_config = config::load_from_connect_args(
        args,
        flags.verbose,
        flags.show_secrets,
        flags.config_path.as_ref(),
    )?;
    verbose::init_tracing(app_config.verbose);
    debug!(
        connection = %masking::describe_backend(&app_config.backend, app_config.show_secrets),
        timeout_secs = app_config.query_timeout_secs,
        "resolved configuration"
    );
    Ok(app_config)
}

fn databases(args: &cli::DatabasesArgs, flags: &Flags) -> Result<(), DashError> {
    verbose::init_tracing(flags.verbose);
    let found = discovery::find_database_files(&args.dir)?;
    debug!(dir = %args.dir.display(), count = found.len(), "scanned for database files");
    let names: Vec<String> = found.iter().map(|p| p.display().to_string()).collect();
    output::print_result(&format::names_to_toon("databases", &names)?);
    Ok(())
}

async fn tables(args: &ConnectArgs, flags: &Flags) -> Result<(), DashError> {
    let app_config = load_config(args, flags)?;
    let listed = session::scoped(
        &app_config.backend,
        app_config.query_timeout_secs,
        async |session: &mut Session| schema::list_tables(session).await,
    )
    .await?;

    match listed {
        Some(names) => output::print_result(&format::names_to_toon("tables", &names)?),
        None => output::print_notice(NO_DATABASE_NOTICE),
    }
    Ok(())
}

async fn columns(args: &cli::ColumnsArgs, flags: &Flags) -> Result<(), DashError> {
    let app_config = load_config(&args.connect, flags)?;
    let listed = session::scoped(
        &app_config.backend,
        app_config.query_timeout_secs,
        async |session: &mut Session| {
            let catalog = Catalog::load(session).await?;
            let table = catalog.resolve(&args.table)?;
            schema::list_columns(session, &table).await
        },
    )
    .await?;

    match listed {
        Some(names) => output::print_result(&format::names_to_toon("columns", &names)?),
        None => output::print_notice(NO_DATABASE_NOTICE),
    }
    Ok(())
}

async fn page(args: &cli::PageArgs, flags: &Flags) -> Result<(), DashError> {
    let app_config = load_config(&args.connect, flags)?.with_page_size(args.window.page_size)?;
    let timer = Timer::start();

    let page_size = app_config.page_size;
    let loaded = session::scoped(
        &app_config.backend,
        app_config.query_timeout_secs,
        async |session: &mut Session| {
            let catalog = Catalog::load(session).await?;
            let table = catalog.resolve(&args.table)?;
            let request = PageRequest::new(table, args.window.page, page_size)?;
            load_page_view(session, request).await
        },
    )
    .await?;

    let Some(view) = loaded else {
        output::print_notice(NO_DATABASE_NOTICE);
        return Ok(());
    };

    if view.is_past_end() {
        output::print_notice(&format!(
            "page {} is past the last page (table has {} pages)",
            view.request.page, view.total_pages
        ));
    }

    let filters = build_filter_set(
        &view.frame,
        &args.filters.ranges,
        &args.filters.sets,
        false,
    )?;
    let shown = filters.apply(&view.frame)?;
    info!(
        loaded = view.frame.rows.len(),
        shown = shown.rows.len(),
        elapsed_ms = timer.elapsed_ms() as u64,
        "page ready"
    );

    output::print_result(&format::page_to_toon(&view, &shown, &filters)?);
    Ok(())
}

async fn join(args: &cli::JoinArgs, flags: &Flags) -> Result<(), DashError> {
    let spec = JoinSpec {
        tables: args.tables.clone(),
        predicates: args.predicates.clone(),
        select: args.select.clone(),
    };
    // Nothing to run: no connection is opened.
    if !spec.is_complete() {
        output::print_notice(JOIN_PRECONDITION_NOTICE);
        return Ok(());
    }

    let app_config = load_config(&args.connect, flags)?.with_row_limit(args.limit, args.no_limit);
    let row_limit = app_config.row_limit;
    let timer = Timer::start();

    let outcome = session::scoped(
        &app_config.backend,
        app_config.query_timeout_secs,
        async |session: &mut Session| perform_join(session, &spec, row_limit).await,
    )
    .await?;

    match outcome {
        None => output::print_notice(NO_DATABASE_NOTICE),
        Some(None) => output::print_notice(JOIN_PRECONDITION_NOTICE),
        Some(Some(joined)) => {
            info!(
                rows = joined.frame.rows.len(),
                elapsed_ms = timer.elapsed_ms() as u64,
                "join complete"
            );
            output::print_notice(&format!("join query: {}", joined.sql));
            output::print_result(&format::to_toon(&joined.frame)?);
            if joined.frame.truncated
                && let Some(limit) = row_limit
            {
                output::print_truncation_warning(&output::truncation_message(limit));
            }
        }
    }
    Ok(())
}

async fn export_report(args: &cli::ReportArgs, flags: &Flags) -> Result<(), DashError> {
    let app_config = load_config(&args.connect, flags)?
        .with_page_size(args.window.page_size)?
        .with_report_path(args.output.clone());

    let page_size = app_config.page_size;
    let loaded = session::scoped(
        &app_config.backend,
        app_config.query_timeout_secs,
        async |session: &mut Session| {
            let catalog = Catalog::load(session).await?;
            let table = catalog.resolve(&args.table)?;
            let request = PageRequest::new(table, args.window.page, page_size)?;
            load_page_view(session, request).await
        },
    )
    .await?;

    let Some(view) = loaded else {
        output::print_notice(NO_DATABASE_NOTICE);
        return Ok(());
    };

    let filters = build_filter_set(&view.frame, &args.filters.ranges, &args.filters.sets, true)?;
    let filtered = filters.apply(&view.frame)?;

    let artifact = report::generate_report(&filtered, &filters, &app_config.report_path)?;
    output::print_report_summary(&artifact)?;
    Ok(())
}
