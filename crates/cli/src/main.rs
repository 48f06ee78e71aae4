//! fadebin command-line publisher.
//!
//! Reads piped input, publishes it, and prints the entry URL on stdout.
//! With `--get`, fetches an entry and writes its raw content to stdout.

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use fadebin_client::{ClientConfig, ClientError, DEFAULT_BASE_URL, FadebinClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Publish piped text to a fadebin server.
///
/// Example: cat notes.txt | fadebin -e 1h
#[derive(Debug, Parser)]
#[command(name = "fadebin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server URL.
    #[arg(short, long, env = "FADEBIN_API", default_value = DEFAULT_BASE_URL)]
    api: String,

    /// Lifetime of the entry, e.g. 10m, 1h, 3d, 2w. Server default when omitted.
    #[arg(short, long)]
    expiry: Option<String>,

    /// Request timeout in seconds.
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Print only the URL.
    #[arg(short, long)]
    quiet: bool,

    /// Fetch an entry by id instead of publishing.
    #[arg(short, long, value_name = "ID", conflicts_with = "expiry")]
    get: Option<String>,
}

impl Cli {
    fn client(&self) -> Result<FadebinClient> {
        let config = ClientConfig {
            base_url: self.api.clone(),
            timeout: Duration::from_secs(self.timeout.max(1)),
            ..Default::default()
        };
        Ok(FadebinClient::new(config)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("FADEBIN_LOG"))
        .init();

    let cli = Cli::parse();
    let client = cli.client()?;

    match &cli.get {
        Some(id) => fetch(&client, id).await,
        None => publish(&client, &cli).await,
    }
}

async fn publish(client: &FadebinClient, cli: &Cli) -> Result<()> {
    if std::io::stdin().is_terminal() {
        bail!("no input: pipe content into fadebin, e.g. `cat file.txt | fadebin`");
    }

    let mut content = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut content)
        .await
        .context("reading stdin")?;
    if content.is_empty() {
        bail!("input is empty; nothing to publish");
    }

    let published = client
        .publish(content, cli.expiry.as_deref())
        .await
        .map_err(explain)?;

    println!("{}", published.url);
    if !cli.quiet {
        let local = published.expires_at.with_timezone(&chrono::Local);
        eprintln!("expires {}", local.format("%Y-%m-%d %H:%M:%S %Z"));
    }
    Ok(())
}

async fn fetch(client: &FadebinClient, id: &str) -> Result<()> {
    let content = client.fetch(id).await.map_err(explain)?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&content).await.context("writing stdout")?;
    stdout.flush().await.context("writing stdout")?;
    Ok(())
}

/// Turn client errors into messages a person at a terminal can act on.
fn explain(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::RateLimited { retry_after: Some(wait) } => {
            anyhow::anyhow!("rate limited by server; try again in {}s", wait.as_secs().max(1))
        }
        ClientError::Timeout => anyhow::anyhow!("request timed out; raise it with --timeout"),
        ClientError::Network(e) => anyhow::anyhow!("could not reach server: {e}"),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["fadebin"]).unwrap();
        assert_eq!(cli.timeout, 30);
        assert!(!cli.quiet);
        assert!(cli.expiry.is_none());
        assert!(cli.get.is_none());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["fadebin", "-a", "https://paste.example.com", "-e", "1h", "-t", "5", "-q"])
            .unwrap();
        assert_eq!(cli.api, "https://paste.example.com");
        assert_eq!(cli.expiry.as_deref(), Some("1h"));
        assert_eq!(cli.timeout, 5);
        assert!(cli.quiet);
    }

    #[test]
    fn test_get_conflicts_with_expiry() {
        assert!(Cli::try_parse_from(["fadebin", "-g", "abcDEF123xyz", "-e", "1h"]).is_err());
        let cli = Cli::try_parse_from(["fadebin", "--get", "abcDEF123xyz"]).unwrap();
        assert_eq!(cli.get.as_deref(), Some("abcDEF123xyz"));
    }

    #[test]
    fn test_explain_rate_limit() {
        let err = explain(ClientError::RateLimited { retry_after: Some(Duration::from_secs(12)) });
        assert!(err.to_string().contains("12s"));
    }
}
