use clap::{Parser, Subcommand, ValueEnum};
use stash_inspect::ValueKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "stash", version, about = "Store files in SQLite, browse any SQLite file, and serve row lookups")]
pub struct Cli {
    /// Database file to operate on, instead of the configured store.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Additional configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an empty store (or make sure an existing one has the files table).
    Create,
    /// Add files to the store.
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// MIME type for every file, instead of guessing from the extension.
        #[arg(long)]
        mime: Option<String>,
    },
    /// List stored files, newest first.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Write a stored file to standard output or to a path.
    Get {
        id: i64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Change the display name of a stored file.
    Rename { id: i64, name: String },
    /// Delete a stored file.
    Rm { id: i64 },
    /// Check stored content against its recorded size and digests.
    Verify { id: i64 },
    /// List tables and views of the database.
    Tables {
        #[arg(long)]
        json: bool,
    },
    /// Print one page of rows as JSON lines.
    Page {
        table: String,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Defaults to the configured page size.
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Set a single cell, addressed by the row id shown by `page`.
    Set {
        table: String,
        row_id: i64,
        column: String,
        value: String,
        #[arg(long = "type", value_enum, default_value_t = ValueType::Text)]
        value_type: ValueType,
    },
    /// Serve `GET /{table}/{id}` lookups until interrupted.
    Serve {
        /// Defaults to the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    Null,
    Integer,
    Real,
    Text,
    /// Base64-encoded bytes.
    Blob,
}

impl From<ValueType> for ValueKind {
    fn from(value: ValueType) -> Self {
        match value {
            ValueType::Null => Self::Null,
            ValueType::Integer => Self::Integer,
            ValueType::Real => Self::Real,
            ValueType::Text => Self::Text,
            ValueType::Blob => Self::Blob,
        }
    }
}
