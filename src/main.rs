use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use configuration::settings::Settings;
use configuration::{init_tracing, load_settings, LogFormat};
use core_types::{FormDetails, FormView, ListQuery};
use database::{connect, run_migrations, FormsRepository};
use std::path::PathBuf;
use uuid::Uuid;

mod identity;

use identity::resolve_caller;

/// The main entry point for the field forms operator tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_tracing(&settings.logging).context("Failed to initialise logging")?;

    // Execute the appropriate command
    match cli.command {
        Commands::Migrate => handle_migrate(&settings).await,
        Commands::Health => handle_health(&settings).await,
        Commands::Forms(command) => handle_forms(command, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Operator tool for shrub and pesticide treatment forms.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML settings file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the embedded schema migrations.
    Migrate,
    /// Check that the database is reachable.
    Health,
    /// Inspect and manage forms on behalf of a user.
    #[command(subcommand)]
    Forms(FormsCommand),
}

#[derive(Subcommand)]
enum FormsCommand {
    /// List the user's own forms.
    List(ListArgs),
    /// List every form in the system (admin users only).
    ListAll(ListArgs),
    /// Show one form with its details.
    Show(FormArgs),
    /// Delete one form with its details.
    Delete(FormArgs),
}

#[derive(Args)]
struct ListArgs {
    /// The id of the acting user.
    #[arg(long)]
    user: Uuid,

    /// Sort column: first_name, last_name or created_at.
    #[arg(long)]
    sort_by: Option<String>,

    /// Sort direction: asc or desc.
    #[arg(long)]
    order: Option<String>,

    /// Only forms of this type: shrub or pesticide.
    #[arg(long = "type")]
    form_type: Option<String>,

    /// Case-insensitive match against the client's first or last name.
    #[arg(long)]
    search: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    fn query(&self) -> ListQuery {
        ListQuery::from_params(
            self.sort_by.as_deref(),
            self.order.as_deref(),
            self.form_type.as_deref(),
            self.search.as_deref(),
        )
    }
}

#[derive(Args)]
struct FormArgs {
    /// The id of the acting user.
    #[arg(long)]
    user: Uuid,

    /// The form id.
    #[arg(long)]
    id: Uuid,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn open_repository(settings: &Settings) -> anyhow::Result<FormsRepository> {
    let pool = connect(&settings.database)
        .await
        .context("Failed to connect to the database")?;
    Ok(FormsRepository::with_timeout(pool, settings.database.operation_timeout()))
}

async fn handle_migrate(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repository(settings).await?;
    run_migrations(repo.pool())
        .await
        .context("Failed to run database migrations")?;
    println!("Migrations applied.");
    Ok(())
}

async fn handle_health(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repository(settings).await?;
    repo.health_check().await.context("Database health check failed")?;
    println!("Database is reachable.");
    Ok(())
}

async fn handle_forms(command: FormsCommand, settings: &Settings) -> anyhow::Result<()> {
    let repo = open_repository(settings).await?;

    match command {
        FormsCommand::List(args) => {
            let caller = resolve_caller(repo.pool(), args.user).await?;
            let views = repo.list_forms_by_owner(&caller, &args.query()).await?;
            print_views(&views, args.json)
        }
        FormsCommand::ListAll(args) => {
            let caller = resolve_caller(repo.pool(), args.user).await?;
            let access = caller
                .admin_access()
                .context("Listing all forms requires an approved admin")?;
            let views = repo.list_all_forms(&access, &args.query()).await?;
            print_views(&views, args.json)
        }
        FormsCommand::Show(args) => {
            let caller = resolve_caller(repo.pool(), args.user).await?;
            let view = repo.get_form_view(&caller, args.id).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", detail_table(&view));
            }
            Ok(())
        }
        FormsCommand::Delete(args) => {
            let caller = resolve_caller(repo.pool(), args.user).await?;
            repo.delete_form(&caller, args.id).await?;
            tracing::info!(form_id = %args.id, user_id = %args.user, "Form deleted");
            println!("Deleted form {}.", args.id);
            Ok(())
        }
    }
}

// ==============================================================================
// Output
// ==============================================================================

fn print_views(views: &[FormView], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(views)?);
        return Ok(());
    }
    if views.is_empty() {
        println!("No forms found.");
        return Ok(());
    }
    println!("{}", list_table(views));
    Ok(())
}

fn list_table(views: &[FormView]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Type", "Client", "Town", "Summary", "Created"]);
    for view in views {
        let common = &view.form.common;
        table.add_row(vec![
            view.form.id.to_string(),
            view.form_type().to_string(),
            format!("{} {}", common.first_name, common.last_name),
            common.town.clone(),
            summary(&view.details),
            view.form.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

fn detail_table(view: &FormView) -> Table {
    let form = &view.form;
    let common = &form.common;
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), form.id.to_string()]);
    table.add_row(vec!["Owner".to_string(), form.owner_id.to_string()]);
    table.add_row(vec!["Type".to_string(), form.form_type.to_string()]);
    table.add_row(vec![
        "Client".to_string(),
        format!("{} {}", common.first_name, common.last_name),
    ]);
    table.add_row(vec![
        "Address".to_string(),
        format!(
            "{} {}, {} {}",
            common.street_number, common.street_name, common.town, common.zip_code
        ),
    ]);
    table.add_row(vec!["Home phone".to_string(), common.home_phone.clone()]);
    table.add_row(vec!["Other phone".to_string(), common.other_phone.clone()]);
    table.add_row(vec!["Call before".to_string(), yes_no(common.call_before)]);
    table.add_row(vec!["Holiday".to_string(), yes_no(common.is_holiday)]);

    match &view.details {
        FormDetails::Shrub(shrub) => {
            table.add_row(vec!["Shrubs".to_string(), shrub.num_shrubs.to_string()]);
            table.add_row(vec!["Flea only".to_string(), yes_no(shrub.flea_only)]);
        }
        FormDetails::Pesticide(lawn) => {
            table.add_row(vec!["Lawn area (sq ft)".to_string(), lawn.lawn_area_sq_ft.to_string()]);
            table.add_row(vec!["Fertilizer only".to_string(), yes_no(lawn.fert_only)]);
            for (n, app) in lawn.applications.iter().enumerate() {
                table.add_row(vec![
                    format!("Application {}", n + 1),
                    format!(
                        "chemical {} at {} ({} applied, rate {}) on {}",
                        app.chemical_id,
                        app.location_code,
                        app.amount_applied,
                        app.rate,
                        app.applied_at.format("%Y-%m-%d"),
                    ),
                ]);
            }
        }
    }

    table.add_row(vec!["Created".to_string(), form.created_at.to_rfc3339()]);
    table.add_row(vec!["Updated".to_string(), form.updated_at.to_rfc3339()]);
    table
}

fn summary(details: &FormDetails) -> String {
    match details {
        FormDetails::Shrub(shrub) if shrub.flea_only => {
            format!("{} shrubs, flea only", shrub.num_shrubs)
        }
        FormDetails::Shrub(shrub) => format!("{} shrubs", shrub.num_shrubs),
        FormDetails::Pesticide(lawn) => format!(
            "{} sq ft, {} application(s)",
            lawn.lawn_area_sq_ft,
            lawn.applications.len()
        ),
    }
}

fn yes_no(flag: bool) -> String {
    let word = if flag { "yes" } else { "no" };
    word.to_string()
}
