use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "noted", version, about = "Terminal client for a remote notes service")]
pub struct Cli {
    /// API base URL (overrides NOTED_API_BASE / NOTED_BACKEND_URL / config file)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all notes, most recently touched first
    List {
        /// Print the notes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new note
    Add {
        /// Title of the note
        title: String,
        /// Note content
        #[arg(long)]
        content: Option<String>,
    },
    /// Edit an existing note
    Edit {
        /// Note id to edit
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note id to delete
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Launch the interactive TUI
    Tui,
}
