use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use portreg_cli::console::{ConsoleNotifier, StdinConfirm};
use portreg_cli::render::{describe, format_page};
use portreg_cli::shell::{Shell, StdinLines};
use portreg_cli::{Command, Config, ListFormat};
use portreg_client::PortApiClient;
use portreg_core::{
    import_rows, load_config, AppError, ExportConfig, NewPortRecord, NotificationPort, PortField,
    PortId, PortQuery, PortRegistry, RecordStore, RemoteSync, Workflow, WorkflowOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments
    let config = Config::parse();

    // Setup logging (stderr to keep stdout clean for listings)
    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")?;

    let settings = load_config(config.config.as_deref()).context("Failed to load configuration")?;

    // Initialize services
    let notifier: Arc<dyn NotificationPort> = Arc::new(ConsoleNotifier);
    let store = Arc::new(RecordStore::new());

    let api_url = settings.api_url(config.api_url.as_deref());
    let remote = match &api_url {
        Some(url) => {
            let client = PortApiClient::new(url, &settings.http()).context("Invalid API URL")?;
            Some(Arc::new(RemoteSync::new(
                store.clone(),
                client,
                notifier.clone(),
                &settings.sync(),
            )))
        }
        None if config.command.is_local() => None,
        None => bail!(
            "This command needs a backend: pass --api-url, set PORTREG_API_URL or set [api] url in config.toml"
        ),
    };

    if let Some(remote) = &remote {
        match remote.initialize().await {
            Ok(count) => info!("Working on {} records from {}", count, api_url.as_deref().unwrap_or_default()),
            Err(_) if config.command.is_local() => {
                warn!("Starting with an empty collection; type 'reload' to retry");
            }
            Err(e) => return Err(e).context("Could not load records from the backend"),
        }
    }

    let registry: Arc<dyn PortRegistry> = match &remote {
        Some(remote) => remote.clone(),
        None => store.clone(),
    };

    // Execute command
    let query = config.command.list_query();
    let changes = config.command.update_changes();
    match config.command {
        Command::Shell => {
            let workflow = Workflow::new(registry, Arc::new(StdinConfirm::new(false)), notifier.clone());
            let mut shell = Shell::new(workflow, notifier, settings.export(), StdinLines, std::io::stdout());
            if let Some(remote) = remote {
                shell = shell.with_remote(remote);
            }
            shell.run().await.context("Terminal I/O failed")?;
        }
        Command::List { format, .. } => {
            list(registry.as_ref(), query.unwrap_or_default(), format)?;
        }
        Command::Add {
            port,
            project,
            application,
            description,
        } => {
            let mut workflow = Workflow::new(registry, Arc::new(StdinConfirm::new(false)), notifier);
            add(&mut workflow, NewPortRecord::new(port, project, application, description)).await?;
        }
        Command::Update { id, yes, .. } => {
            let mut workflow = Workflow::new(registry, Arc::new(StdinConfirm::new(yes)), notifier);
            update(&mut workflow, id, changes).await?;
        }
        Command::Delete { id, yes } => {
            let mut workflow = Workflow::new(registry, Arc::new(StdinConfirm::new(yes)), notifier);
            delete(&mut workflow, id).await?;
        }
        Command::Import { file } => {
            import(registry.as_ref(), notifier.as_ref(), &file).await?;
        }
        Command::Export { output } => {
            export(registry.as_ref(), output.as_deref(), &settings.export())?;
        }
    }

    Ok(())
}

/// Print one page of the collection
fn list(registry: &dyn PortRegistry, query: PortQuery, format: ListFormat) -> anyhow::Result<()> {
    let snapshot = registry.snapshot();
    let page = query.run(&snapshot);

    match format {
        ListFormat::Table => println!("{}", format_page(&page)),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&page.items)?),
    }
    Ok(())
}

async fn add(workflow: &mut Workflow, draft: NewPortRecord) -> anyhow::Result<()> {
    match workflow.submit_new(draft).await {
        Ok(WorkflowOutcome::Created(record)) => {
            println!("{}", describe(&record));
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(AppError::Validation(errors)) => bail!("Invalid record:\n{}", errors.render()),
        Err(e) => Err(e).context("Add failed"),
    }
}

async fn update(
    workflow: &mut Workflow,
    id: PortId,
    changes: Vec<(PortField, String)>,
) -> anyhow::Result<()> {
    if changes.is_empty() {
        bail!("Nothing to update: pass at least one of --port, --project, --application, --description");
    }

    workflow.begin_edit(id)?;
    for (field, value) in changes {
        workflow.set_field(field, value);
    }

    match workflow.commit_edit().await {
        Ok(WorkflowOutcome::Committed(record)) => {
            println!("{}", describe(&record));
            Ok(())
        }
        Ok(_) => {
            eprintln!("Update cancelled.");
            Ok(())
        }
        Err(AppError::Validation(errors)) => bail!("Invalid record:\n{}", errors.render()),
        Err(e) => Err(e).context("Update failed"),
    }
}

async fn delete(workflow: &mut Workflow, id: PortId) -> anyhow::Result<()> {
    match workflow.delete(id).await? {
        WorkflowOutcome::Deleted(id) => info!("Deleted record {}", id),
        _ => eprintln!("Nothing deleted."),
    }
    Ok(())
}

/// Merge rows from a spreadsheet and forward them to the backend
async fn import(
    registry: &dyn PortRegistry,
    notifier: &dyn NotificationPort,
    file: &Path,
) -> anyhow::Result<()> {
    info!("Importing {}", file.display());
    let rows = portreg_sheet::read_rows(file)
        .with_context(|| format!("Could not read {}", file.display()))?;

    let summary = import_rows(registry, &rows, notifier).await?;
    if !summary.is_clean() {
        bail!(
            "{} of {} records were not saved to the backend",
            summary.failed_count(),
            summary.merged_count()
        );
    }
    Ok(())
}

fn export(registry: &dyn PortRegistry, output: Option<&str>, config: &ExportConfig) -> anyhow::Result<()> {
    let snapshot = registry.snapshot();
    let path = portreg_sheet::export_records(&snapshot, output, config)?;
    println!("{}", path.display());
    Ok(())
}
