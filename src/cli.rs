use clap::Parser;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "runw", version = VERSION, about = "Run actions console for pipeline orchestration servers")]
pub struct Cli {
    /// Server root URL (the GraphQL endpoint is <server>/graphql)
    #[arg(short, long, default_value = "http://localhost:3000", value_parser = parse_server_root)]
    pub server: String,

    /// Poll interval in seconds
    #[arg(short, long, default_value_t = 10)]
    pub interval: u64,

    /// Maximum number of runs to display
    #[arg(short, long, default_value_t = 25)]
    pub limit: usize,

    /// Only list runs of this pipeline or job
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Stay on the run list after a re-execution instead of opening the new run
    #[arg(long)]
    pub no_open: bool,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Write debug logs to $XDG_STATE_HOME/runw/debug.log
    #[arg(short, long)]
    pub verbose: bool,
}

/// Accept `http(s)://host[:port][/prefix]` and strip trailing slashes.
pub fn parse_server_root(s: &str) -> Result<String, String> {
    let trimmed = s.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| format!("Server URL must start with http:// or https://, got '{s}'"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("Server URL has no host: '{s}'"));
    }
    if rest.chars().any(char::is_whitespace) {
        return Err(format!("Server URL contains whitespace: '{s}'"));
    }
    Ok(trimmed.to_string())
}
