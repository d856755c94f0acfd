use anyhow::{Context, Result};
use promproto_core::scrape::normalize_url;
use std::time::Duration;
use structopt::StructOpt;
use url::Url;

#[derive(Debug)]
pub struct Config {
    /// The endpoint to scrape, after defaulting the scheme and path
    ///
    /// e.g. http://localhost:9090/metrics
    pub url: Url,

    /// Whether to keep refreshing until interrupted
    pub watch: bool,

    /// How long to wait between refreshes in watch mode
    pub interval: Duration,

    /// Enables verbose error output and prints debug counters on exit
    pub debug: bool,

    /// Whether to colorize output
    pub color: bool,
}

impl Config {
    /// Loads configuration from arguments, env and dotenv
    pub fn load() -> Result<Config> {
        // Attempts to find a `.env` file to initialize/extend the environment
        dotenv::dotenv().ok();

        // Load the config from arguments, then environment variables
        let env = Environment::from_args();
        let debug_var = dotenv::var("DEBUG").ok();
        Config::from_environment(env, debug_var)
    }

    fn from_environment(env: Environment, debug_var: Option<String>) -> Result<Config> {
        if env.interval == 0 {
            return Err(anyhow::format_err!("invalid interval: must be at least 1 second"));
        }
        Ok(Config {
            url: normalize_url(&env.url).context("invalid URL")?,
            watch: env.watch,
            interval: Duration::from_secs(env.interval),
            debug: env.debug || parse_toggle(debug_var.as_deref()).context("invalid DEBUG")?,
            color: !env.no_color,
        })
    }
}

/// Parse an on/off environment variable; unset means off
fn parse_toggle(val: Option<&str>) -> Result<bool> {
    Ok(match val {
        Some("true") | Some("on") | Some("1") => true,
        Some("false") | Some("off") | Some("0") | Some("") | None => false,
        Some(val) => val.parse::<bool>()?,
    })
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "promproto",
    about = "Inspect metrics served in the Prometheus protobuf format"
)]
struct Environment {
    /// The metrics endpoint, e.g. "localhost:9090" or "https://host/custom/metrics"
    url: String,

    /// Refresh the output until interrupted
    #[structopt(short, long)]
    watch: bool,

    /// How frequently (in seconds) to refresh in watch mode
    #[structopt(short = "n", long, env = "PROMPROTO_INTERVAL", default_value = "2")]
    interval: u64,

    /// Enables verbose logging of errors
    #[structopt(short, long)]
    debug: bool,

    /// Disables colored output
    #[structopt(long)]
    no_color: bool,
}
