use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start lectern as a web service.
    Daemon {},

    /// Print the filtered course catalog as JSON.
    Catalog {},

    /// One-shot search inside a course.
    Search {
        /// Course title, exactly as listed by `catalog`
        #[clap(short, long)]
        course: String,

        /// Free-text query
        #[clap(short, long)]
        query: String,

        /// Override the configured result cap
        #[clap(short = 'k', long)]
        top_k: Option<usize>,
    },
}
