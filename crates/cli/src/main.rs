use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cli::picker::ConsolePicker;
use docassign_core::config::{self, AppConfig};
use docassign_core::coordinator::{AssignError, AssignmentCoordinator, SessionOutcome};
use docassign_core::gateway::{
    ClientDirectory, DocumentStore, SqliteClientDirectory, SqliteDocumentStore,
};
use docassign_core::watcher::{DownloadWatcher, WatchEvent, CANDIDATE_QUEUE_DEPTH};
use std::path::PathBuf;
use std::sync::Arc;
use storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch { dir, user } => run_watch(cfg, dir, user).await,
        Commands::Clients { query, json } => run_clients(cfg, query, json).await,
        Commands::Documents { client, json } => run_documents(cfg, client, json).await,
        Commands::Assign {
            path,
            client,
            user,
            note,
        } => run_assign(cfg, path, client, user, note).await,
    }
}

#[derive(Parser)]
#[command(name = "docassign")]
#[command(about = "Download watcher and client document assignment", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the download folder and assign settled files interactively
    Watch {
        /// Override the configured watch directory
        #[arg(long)]
        dir: Option<String>,
        /// Acting user recorded on created documents
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Search the client directory
    Clients {
        /// Substring to match against client names
        query: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List the documents recorded for a client
    Documents {
        /// Client id
        #[arg(long)]
        client: i64,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Assign a single existing file to a client, no watcher involved
    Assign {
        /// File to assign
        path: String,
        /// Client id
        #[arg(long)]
        client: i64,
        /// Acting user recorded on the document
        #[arg(long, default_value = "local")]
        user: String,
        /// Note stored on the document
        #[arg(long)]
        note: Option<String>,
    },
}

async fn open_gateways(
    cfg: &AppConfig,
) -> Result<(Arc<dyn ClientDirectory>, Arc<SqliteDocumentStore>)> {
    let pool = storage::connect(&cfg.database.path).await.context("db connect")?;
    storage::migrate(&pool).await.context("db migrate")?;
    let clients: Arc<dyn ClientDirectory> = Arc::new(SqliteClientDirectory::new(pool.clone()));
    let documents = Arc::new(SqliteDocumentStore::new(pool));
    Ok((clients, documents))
}

async fn run_watch(cfg: AppConfig, dir: Option<String>, user: String) -> Result<()> {
    let (clients, documents) = open_gateways(&cfg).await?;
    let mut coordinator =
        AssignmentCoordinator::new(clients, documents, Arc::new(ConsolePicker), user);
    coordinator.subscribe(|client_id, document_id| {
        tracing::debug!(client_id, document_id, "assignment completed");
    });

    let directory = PathBuf::from(dir.unwrap_or_else(|| cfg.watch.directory.clone()));
    let (tx, mut rx) = tokio::sync::mpsc::channel(CANDIDATE_QUEUE_DEPTH);
    let mut watcher = DownloadWatcher::new(&cfg);
    watcher.start(&directory, tx)?;
    println!("watching {} (ctrl-c stops)", directory.display());

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(WatchEvent::Candidate(path)) => {
                    report(coordinator.handle_candidate(&path).await);
                }
                Some(WatchEvent::Crashed(reason)) => {
                    eprintln!("watcher stopped: {reason}");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }
    watcher.stop();
    Ok(())
}

fn report(result: std::result::Result<SessionOutcome, AssignError>) {
    match result {
        Ok(SessionOutcome::Completed(done)) => {
            println!("assigned to {}: {}", done.client_name, done.final_name);
        }
        Ok(SessionOutcome::Cancelled) => {
            println!("assignment cancelled; file left in place");
        }
        Err(AssignError::NoFolder(name)) => {
            eprintln!("client '{name}' has no base folder configured; file left in place");
        }
        Err(AssignError::Metadata { orphan, source }) => {
            eprintln!(
                "document record not written ({source}); file already moved to {}",
                orphan.display()
            );
        }
        Err(e) => eprintln!("assignment failed: {e}; file left in place"),
    }
}

async fn run_clients(cfg: AppConfig, query: String, json: bool) -> Result<()> {
    let (clients, _) = open_gateways(&cfg).await?;
    let hits = clients.search(&query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        for client in &hits {
            let folder = client
                .folder
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_else(|| "<no folder>".into());
            println!("{}  {}  {}", client.id, client.name, folder);
        }
        println!("{} client(s)", hits.len());
    }
    Ok(())
}

async fn run_documents(cfg: AppConfig, client_id: i64, json: bool) -> Result<()> {
    let (clients, documents) = open_gateways(&cfg).await?;
    let Some(client) = clients.get(client_id).await? else {
        bail!("no such client: {client_id}");
    };
    let docs = documents.list_for_client(client.id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
    } else {
        for doc in &docs {
            println!("{}  {}  {}", doc.id, doc.rel_path, doc.kind);
        }
        println!("{} document(s) for {}", docs.len(), client.name);
    }
    Ok(())
}

async fn run_assign(
    cfg: AppConfig,
    path: String,
    client_id: i64,
    user: String,
    note: Option<String>,
) -> Result<()> {
    let source = PathBuf::from(path);
    if !source.is_file() {
        bail!("not a file: {}", source.display());
    }
    let (clients, documents) = open_gateways(&cfg).await?;
    let Some(client) = clients.get(client_id).await? else {
        bail!("no such client: {client_id}");
    };
    let coordinator =
        AssignmentCoordinator::new(clients, documents, Arc::new(ConsolePicker), user);
    report(
        coordinator
            .assign_to(&source, &client, note)
            .await
            .map(SessionOutcome::Completed),
    );
    Ok(())
}
