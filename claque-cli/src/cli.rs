use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "claque",
    about = "Simulates live viewers of a broadcast by replaying a real player's network behavior",
    version
)]
pub struct Args {
    /// Broadcaster identifier (channel name)
    pub broadcaster: String,

    /// Number of simulated viewers to launch
    #[arg(short = 'n', long, default_value = "1")]
    pub viewers: usize,

    /// Upper bound on --viewers
    #[arg(long, default_value = "100")]
    pub max_viewers: usize,

    /// Proxy URL routing every request of each viewer's client (http, https, socks5)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Proxy username (if the proxy requires authentication)
    #[arg(long)]
    pub proxy_username: Option<String>,

    /// Proxy password (if the proxy requires authentication)
    #[arg(long)]
    pub proxy_password: Option<String>,

    /// Seconds between viewer-count reports
    #[arg(long, default_value = "60")]
    pub report_interval: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
