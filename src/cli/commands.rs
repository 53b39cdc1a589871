use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "neurocalm")]
#[command(about = "Daily wellness check-ins with an AI brain coach")]
#[command(version)]
pub struct Args {
    /// Data directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit today's check-in and get scores and recommendations
    Checkin {
        #[arg(long, default_value = "default_user")]
        user: String,
        /// Mood from 1 to 10
        #[arg(long)]
        mood: String,
        /// Hours of sleep, in half-hour steps
        #[arg(long)]
        sleep: String,
        #[arg(long)]
        diet: String,
        #[arg(long)]
        exercise: String,
        #[arg(long)]
        stressors: String,
        /// Goals for the personalized recommendations
        #[arg(long)]
        goals: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Ask the coach a question about today's check-in
    Chat {
        question: String,
        #[arg(long, default_value = "default_user")]
        user: String,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Show the latest check-in, scores and recommendations
    Status {
        #[arg(long, default_value = "default_user")]
        user: String,
    },
    /// Show recent calm and productivity scores
    History {
        #[arg(long, default_value = "default_user")]
        user: String,
        #[arg(long)]
        days: Option<usize>,
    },
    /// Trends, patterns and streaks across past check-ins
    Insights {
        #[arg(long, default_value = "default_user")]
        user: String,
    },
    /// Export stored check-ins as json or csv
    Export {
        #[arg(long, default_value = "default_user")]
        user: String,
        #[arg(long, default_value = "json")]
        format: String,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete every check-in and chat message for a user
    Reset {
        #[arg(long, default_value = "default_user")]
        user: String,
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Run the HTTP API
    Server {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}
