//! thread-post - publish prepared posts and threads to X

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use libthreadcast::config::{Config, ScheduleSettings};
use libthreadcast::logging::{level_from_env, LogFormat, LoggingConfig};
use libthreadcast::platforms::twitter::TwitterClient;
use libthreadcast::platforms::Platform;
use libthreadcast::scheduling::thread_due_at;
use libthreadcast::{
    Archive, Credentials, PostReport, Poster, PostsDocument, Scheduler, ThreadStore,
    ThreadcastError,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "thread-post")]
#[command(version, about = "Publish prepared posts and threads to X")]
#[command(long_about = r#"Publish prepared posts and threads to X.

Reads API credentials from credentials.json and posts from posts.json in the
working directory (override with a threadcast.toml config file).

posts.json may be a plain list of strings, published once each in order, or
a {"threads": [...]} document whose threads are published when their
scheduled_time arrives.

EXAMPLES:
    # Publish everything in posts.json
    thread-post

    # Publish thread 3 right away
    thread-post 3 --force

    # Check files and content without touching the network
    thread-post --dry-run

EXIT CODES:
    0 - Success (including an empty posts list)
    1 - A post failed, or a file could not be read
    2 - Authentication failed
    3 - Invalid input (bad thread number or scheduled_time, or content
        failing validation under --dry-run)

A post rejected during a real run, including content too long for X,
counts as a failed post (exit 1).

ENVIRONMENT:
    THREADCAST_CONFIG       Config file path (same as --config)
    THREADCAST_LOG_FORMAT   Log format on stderr (same as --log-format)
    THREADCAST_LOG_LEVEL    Log level: error, warn, info, debug or trace
"#)]
struct Cli {
    /// Thread number to post immediately (1-based index)
    thread_number: Option<usize>,

    /// Force immediate posting of the specified thread
    #[arg(short, long)]
    force: bool,

    /// Path to a threadcast.toml configuration file
    #[arg(short, long, value_name = "PATH", env = "THREADCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Validate files and content without posting
    #[arg(long)]
    dry_run: bool,

    /// Output format for results
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Log format on stderr (text, json or pretty)
    #[arg(long, default_value = "text", env = "THREADCAST_LOG_FORMAT")]
    log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let mut logging = LoggingConfig::new(cli.log_format, level_from_env(), cli.verbose);
    if let Some(path) = config.log_path() {
        logging = logging.with_file(path);
    }
    if let Err(e) = logging.init() {
        eprintln!("Error: cannot open log file: {}", e);
        std::process::exit(1);
    }

    match run(&cli, &config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = e
                .downcast_ref::<ThreadcastError>()
                .map(ThreadcastError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

/// Returns whether every attempted post succeeded
async fn run(cli: &Cli, config: &Config) -> anyhow::Result<bool> {
    let settings = config.schedule.settings()?;

    // Both files are read before any network traffic
    let credentials = Credentials::load(&config.credentials_path())?;
    let posts_path = config.posts_path();
    let document = PostsDocument::load(&posts_path)?;

    let client = TwitterClient::new(credentials, &config.twitter)?;

    if cli.dry_run {
        return dry_run(&client, &document, &settings);
    }

    let mut poster = Poster::new(Box::new(client), settings);
    poster.authenticate().await?;

    let archive = Archive::new(config.archive_path());

    match (cli.thread_number, cli.force, document) {
        (Some(number), true, PostsDocument::Threads(doc)) => {
            let mut store = ThreadStore::new(&posts_path, doc, archive);
            let ids = poster.post_specific_thread(&mut store, number).await?;
            print_ids(&cli.format, &ids)?;
            Ok(true)
        }
        (Some(_), true, PostsDocument::Posts(_)) => Err(ThreadcastError::InvalidInput(format!(
            "{} holds a plain list of posts; thread numbers only apply to thread documents",
            posts_path.display()
        ))
        .into()),
        (_, _, PostsDocument::Posts(texts)) => {
            info!("Posting {} item(s) from {}", texts.len(), posts_path.display());
            let report = poster.post_all(&texts).await;
            print_report(&cli.format, &report)?;
            Ok(report.all_succeeded())
        }
        (_, _, PostsDocument::Threads(doc)) => {
            let store = ThreadStore::new(&posts_path, doc, archive);
            Scheduler::new(&poster, store).run().await?;
            Ok(true)
        }
    }
}

/// Validate every post and schedule, printing what would be published
fn dry_run(
    client: &TwitterClient,
    document: &PostsDocument,
    settings: &ScheduleSettings,
) -> anyhow::Result<bool> {
    let mut stdout = std::io::stdout().lock();
    let mut problems = 0;

    match document {
        PostsDocument::Posts(texts) => {
            for (index, text) in texts.iter().enumerate() {
                match client.validate_content(text) {
                    Ok(()) => writeln!(stdout, "would post {}: {}", index + 1, text)?,
                    Err(e) => {
                        problems += 1;
                        writeln!(stdout, "invalid {}: {}", index + 1, e)?;
                    }
                }
            }
        }
        PostsDocument::Threads(doc) => {
            for (index, thread) in doc.threads.iter().enumerate() {
                let when = match thread_due_at(thread, settings.timezone) {
                    Ok(Some(due)) => due.to_rfc3339(),
                    Ok(None) => "immediately".to_string(),
                    Err(e) => {
                        problems += 1;
                        e.to_string()
                    }
                };
                writeln!(stdout, "thread {} ({} tweets): {}", index + 1, thread.tweets.len(), when)?;

                for tweet in &thread.tweets {
                    if let Err(e) = client.validate_content(&tweet.text) {
                        problems += 1;
                        writeln!(stdout, "  invalid: {}", e)?;
                    }
                }
            }
        }
    }

    if problems > 0 {
        return Err(ThreadcastError::InvalidInput(format!(
            "{} problem(s) found in the posts file",
            problems
        ))
        .into());
    }
    Ok(true)
}

fn print_report(format: &str, report: &PostReport) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    if format == "json" {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        writeln!(stdout, "{}", json)?;
        return Ok(());
    }

    for result in &report.results {
        match (&result.post_id, &result.error) {
            (Some(id), _) => writeln!(stdout, "ok {}: {}", result.position, id)?,
            (None, error) => writeln!(
                stdout,
                "failed {}: {}",
                result.position,
                error.as_deref().unwrap_or("unknown error")
            )?,
        }
    }
    writeln!(
        stdout,
        "{} posted, {} failed",
        report.succeeded(),
        report.failed()
    )?;
    Ok(())
}

fn print_ids(format: &str, ids: &[String]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();

    if format == "json" {
        let json = serde_json::to_string(ids).context("Failed to serialize post ids")?;
        writeln!(stdout, "{}", json)?;
    } else {
        for id in ids {
            writeln!(stdout, "{}", id)?;
        }
    }
    Ok(())
}
