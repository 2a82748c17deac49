//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Aula student portal CLI
#[derive(Parser, Debug)]
#[command(name = "aulactl")]
#[command(about = "Aula - student learning portal", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $AULA_CONFIG and the default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Registration number of the student acting
    #[arg(long, short = 'u', global = true, env = "AULA_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up a student by registration number and show their profile
    Login,

    /// List subjects
    Subjects,

    /// List lessons, optionally by subject or matching a search term
    Lessons {
        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Mark a lesson as completed, or undo it if it already was
    Complete {
        lesson: String,
    },

    /// Change display name
    Rename {
        name: String,
    },

    /// Change profile color tag
    Color {
        tag: String,
    },

    /// Show the experience ranking
    Ranking {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show or hide yourself in the ranking
    Visibility {
        #[arg(value_enum)]
        state: Visibility,
    },

    /// Show the level map of a subject
    Levels {
        subject: String,
    },

    /// Play a level quiz (defaults to the highest unlocked level)
    Play {
        subject: String,

        #[arg(long)]
        level: Option<u32>,
    },

    /// List books in the library
    Library {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Content administration
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Import subjects, lessons, books and exercises from a JSON file
    Seed {
        file: PathBuf,
    },

    /// Register a student
    AddUser {
        #[arg(long)]
        registration: String,

        #[arg(long)]
        name: String,
    },

    /// Delete a document from a collection
    Remove {
        collection: String,
        id: String,
    },

    /// Copy a local file into the blob store
    Upload {
        file: PathBuf,

        /// Destination path inside the blob store
        dest: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    On,
    Off,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::On
    }
}
