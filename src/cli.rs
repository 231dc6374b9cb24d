use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate api docs in markdown format
    #[cfg(feature = "markdown-docs")]
    #[clap(hide = true)]
    MarkdownDocs {},

    /// Start spark as a service.
    Daemon {
        /// Address to listen on
        #[clap(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },

    /// Write down a thought
    Add {
        /// Open $EDITOR to write the note
        #[clap(long, default_value = "false")]
        editor: bool,

        /// Note text
        #[clap(allow_hyphen_values = true)]
        text: Option<String>,
    },

    /// List notes, newest first
    List {
        /// Case-insensitive text to look for
        #[clap(short, long)]
        keyword: Option<String>,

        /// Shuffle instead of sorting by time (ignored with --keyword)
        #[clap(short, long, default_value = "false")]
        random: bool,

        #[clap(short, long, default_value = "20")]
        limit: usize,

        #[clap(short, long, default_value = "0")]
        offset: usize,

        /// Print the count
        #[clap(short = 'c', long, default_value = "false")]
        count: bool,

        /// Print as json
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Open a note together with its related notes
    Show { id: String },

    /// Print notes related to a note as json
    Related { id: String },

    /// Replace the content of a note
    Edit {
        id: String,

        /// New text. Opens $EDITOR when omitted.
        #[clap(allow_hyphen_values = true)]
        text: Option<String>,
    },

    /// Delete a note
    Delete {
        id: String,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Generate embeddings for notes that have none
    Embed {},

    /// Show how many notes are stored and embedded
    Stats {},

    /// Export notes
    Export {
        /// Output file. Prints to stdout when omitted.
        path: Option<PathBuf>,

        /// Export dated markdown instead of json
        #[clap(long, default_value = "false")]
        markdown: bool,
    },

    /// Import notes from a json export, skipping ids that already exist
    Import { path: PathBuf },

    /// Import markdown files, one note per file
    ImportMd {
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check that the embedding provider responds
    TestApi {},
}
