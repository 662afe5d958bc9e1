use std::path::PathBuf;

use clap::Parser;

/// Record a Twitch channel and chapter the recordings by category and title.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Twitch login of the channel to record
    #[arg(short, long, value_parser = parse_username)]
    pub username: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log: String,

    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn parse_username(value: &str) -> Result<String, String> {
    let username = value.trim().to_lowercase();
    if username.is_empty() {
        return Err("username must not be empty".to_string());
    }
    Ok(username)
}
