use exn::{OptionExt, ResultExt};
use stash_config::Settings;
use stash_inspect::{ActiveDatabase, Inspector, Value};
use stash_serve::QueryServer;
use stash_store::{Database, Repository, ingest};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use time::format_description::well_known::Rfc3339;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let path = cli.db.clone().unwrap_or_else(|| settings.database.clone());
    tracing::debug!(path = %path.display(), "Using database");

    match cli.command {
        Command::Create => {
            if cli.db.is_none() {
                settings.ensure_database_dir().or_raise(|| ErrorKind::Config)?;
            }
            let db = Database::create(&path).await.or_raise(|| ErrorKind::Store)?;
            db.close().await;
            println!("{}", path.display());
        },
        Command::Add { files, mime } => {
            let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
            let repo = Repository::from(&db);
            for file in &files {
                let ingested = ingest::insert_path(&repo, file, mime.as_deref()).await.or_raise(|| ErrorKind::Store)?;
                match ingested.duplicates.as_slice() {
                    [] => println!("{}\t{}", ingested.id, ingested.file_name),
                    ids => println!("{}\t{}\t(same content as {ids:?})", ingested.id, ingested.file_name),
                }
            }
            db.close().await;
        },
        Command::List { json } => {
            let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
            let files = Repository::from(&db).list().await.or_raise(|| ErrorKind::Store)?;
            for file in files {
                if json {
                    println!("{}", serde_json::to_string(&file).or_raise(|| ErrorKind::Store)?);
                    continue;
                }
                let created = match file.created_at {
                    Some(created) => created.format(&Rfc3339).or_raise(|| ErrorKind::Store)?,
                    None => "-".to_string(),
                };
                let size = file.size.map_or_else(|| "-".to_string(), |size| size.to_string());
                let mime = file.mime_type.as_deref().unwrap_or("-");
                println!("{}\t{size}\t{created}\t{mime}\t{}", file.id, file.file_name);
            }
            db.close().await;
        },
        Command::Get { id, output } => {
            let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
            let file = Repository::from(&db).fetch(id).await.or_raise(|| ErrorKind::Store)?;
            db.close().await;
            match output {
                Some(output) => write_file(&output, &file.content).await?,
                None => std::io::stdout()
                    .lock()
                    .write_all(&file.content)
                    .or_raise(|| ErrorKind::Output(PathBuf::from("<stdout>")))?,
            }
        },
        Command::Rename { id, name } => {
            let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
            Repository::from(&db).rename(id, &name).await.or_raise(|| ErrorKind::Store)?;
            db.close().await;
        },
        Command::Rm { id } => {
            let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
            let deleted = Repository::from(&db).delete(id).await.or_raise(|| ErrorKind::Store)?;
            db.close().await;
            if !deleted {
                tracing::info!(id, "Nothing to delete");
            }
        },
        Command::Verify { id } => {
            let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
            let intact = Repository::from(&db).verify(id).await.or_raise(|| ErrorKind::Store)?;
            db.close().await;
            println!("{id}\t{}", if intact { "ok" } else { "corrupt" });
            if !intact {
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Tables { json } => {
            let inspector = Inspector::open(&path).await.or_raise(|| ErrorKind::Inspect)?;
            for table in inspector.tables().await {
                if json {
                    println!("{}", serde_json::to_string(&table).or_raise(|| ErrorKind::Inspect)?);
                } else {
                    let editable = if table.has_row_id() { "editable" } else { "read-only" };
                    println!("{}\t{}\t{} columns\t{editable}", table.name, table.kind, table.columns.len());
                }
            }
            inspector.close().await;
        },
        Command::Page { table, offset, limit } => {
            let inspector = Inspector::open(&path).await.or_raise(|| ErrorKind::Inspect)?;
            let kind = inspector
                .tables()
                .await
                .into_iter()
                .find(|t| t.name == table)
                .map(|t| t.kind)
                .ok_or_raise(|| ErrorKind::Usage(format!("no table or view named {table:?}")))?;
            let limit = limit.unwrap_or(settings.inspect.page_size);
            let rows = inspector.page(&table, kind, offset, limit).await.or_raise(|| ErrorKind::Inspect)?;
            for row in rows {
                println!("{}", serde_json::to_string(&row).or_raise(|| ErrorKind::Inspect)?);
            }
            inspector.close().await;
        },
        Command::Set { table, row_id, column, value, value_type } => {
            let value = Value::parse(value_type.into(), &value).or_raise(|| ErrorKind::Inspect)?;
            let inspector = Inspector::open(&path).await.or_raise(|| ErrorKind::Inspect)?;
            let updated = inspector
                .update_cell(&table, row_id, &column, &value)
                .await
                .or_raise(|| ErrorKind::Inspect)?;
            inspector.close().await;
            if !updated {
                exn::bail!(ErrorKind::Usage(format!("no row {row_id} in {table}")));
            }
        },
        Command::Serve { port } => serve(&path, port.unwrap_or(settings.server.port)).await?,
    }
    Ok(ExitCode::SUCCESS)
}

async fn write_file(output: &Path, content: &[u8]) -> Result<()> {
    tokio::fs::write(output, content).await.or_raise(|| ErrorKind::Output(output.to_path_buf()))
}

async fn serve(path: &Path, port: u16) -> Result<()> {
    let active = ActiveDatabase::new();
    active.open(path).await.or_raise(|| ErrorKind::Inspect)?;
    let server = QueryServer::new(active.clone());
    let mut events = server.subscribe();
    let addr = server.start(port).await.or_raise(|| ErrorKind::Serve)?;
    eprintln!("Listening on http://{addr} (unauthenticated, all interfaces). Press Ctrl-C to stop.");

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{event}"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Request log fell behind");
                },
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Could not wait for Ctrl-C; shutting down");
    }
    server.stop().await.or_raise(|| ErrorKind::Serve)?;
    drop(server);
    let _ = printer.await;
    active.close().await;
    Ok(())
}
