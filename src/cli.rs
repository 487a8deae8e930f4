// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{error, info};

use crate::core::{ConfigManager, Database, FsOps};
use crate::models::{BetaStatus, Job};
use crate::repository::JobRepository;
use crate::scrape::{ScrapeParams, ScrapeSummary};
use crate::services::AppState;
use crate::web::start_web_server;

#[derive(Parser)]
#[command(name = "jobhunt")]
#[command(about = "Job search backend: API server, scraper and admin tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the API server (default)
    Serve,
    /// Create or migrate the database
    Init,
    /// Run one scrape in the foreground and print the summary
    Scrape {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Manage beta access requests
    Beta {
        #[command(subcommand)]
        command: BetaCommand,
    },
    /// Write every stored job to a CSV file
    ExportJobs {
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum BetaCommand {
    /// List requests, optionally filtered by status
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Approve { email: String },
    Reject { email: String },
}

async fn open_database(config: &ConfigManager) -> Result<Database> {
    config.ensure_directories().await?;
    Database::connect(&config.server.database_path).await
}

pub async fn run(cli: Cli, config: ConfigManager) -> Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => start_web_server(config).await,

        Command::Init => {
            let db = open_database(&config).await?;
            db.health_check().await?;
            println!(
                "✅ Database ready at {}",
                config.server.database_path.display()
            );
            Ok(())
        }

        Command::Scrape {
            query,
            location,
            max_pages,
        } => {
            let params = ScrapeParams::from_settings(&config.scraper, query, location, max_pages);
            let db = open_database(&config).await?;
            let state = AppState::from_config(config, db)?;

            info!(
                "Scraping '{}' in '{}' (up to {} pages)",
                params.query.query, params.query.location, params.max_pages
            );
            let summary = state.scraper.run_foreground(params).await?;
            print_summary(&summary);
            Ok(())
        }

        Command::Beta { command } => {
            let db = open_database(&config).await?;
            handle_beta_command(command, &db).await
        }

        Command::ExportJobs { output } => {
            let db = open_database(&config).await?;
            let jobs = JobRepository::new(db.pool()).list_all().await?;
            FsOps::write_file_safe(&output, &jobs_to_csv(&jobs)?).await?;
            println!("✅ Exported {} job(s) to {}", jobs.len(), output.display());
            Ok(())
        }
    }
}

fn print_summary(summary: &ScrapeSummary) {
    println!("Scrape finished: {:?}", summary.stop_reason);
    println!("   Pages scraped:    {}", summary.pages_scraped);
    println!("   Listings seen:    {}", summary.listings_seen);
    println!("   Jobs inserted:    {}", summary.jobs_inserted);
    println!("   Duplicates:       {}", summary.duplicates);
    println!("   Skipped:          {}", summary.skipped);
    if let Some(err) = &summary.error {
        println!("   Last error:       {}", err);
    }
}

async fn handle_beta_command(command: BetaCommand, db: &Database) -> Result<()> {
    let service = crate::services::BetaService::new(db);

    match command {
        BetaCommand::List { status } => {
            let status = status.as_deref().map(BetaStatus::from_str).transpose()?;
            let requests = service.list(status).await?;
            if requests.is_empty() {
                println!("No beta requests");
            }
            for request in requests {
                println!(
                    "{:>4}  {:<9}  {:<32}  {}",
                    request.id,
                    request.status.as_str(),
                    request.email,
                    request.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        BetaCommand::Approve { email } => {
            set_beta_status(&service, &email, BetaStatus::Approved).await?;
        }
        BetaCommand::Reject { email } => {
            set_beta_status(&service, &email, BetaStatus::Rejected).await?;
        }
    }
    Ok(())
}

async fn set_beta_status(
    service: &crate::services::BetaService<'_>,
    email: &str,
    status: BetaStatus,
) -> Result<()> {
    match service.set_status_by_email(email, status).await {
        Ok(request) => {
            println!("✅ {} is now {}", request.email, request.status.as_str());
            Ok(())
        }
        Err(e) => {
            error!("Failed to update beta request for {}: {}", email, e);
            anyhow::bail!("{}", e)
        }
    }
}

/// One row per job, header included
pub fn jobs_to_csv(jobs: &[Job]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for job in jobs {
        writer
            .serialize(job)
            .with_context(|| format!("Failed to serialize job {}", job.id))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::new_job;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["jobhunt"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["jobhunt", "scrape", "--query", "rust", "--max-pages", "3"]);
        match cli.command {
            Some(Command::Scrape {
                query, max_pages, ..
            }) => {
                assert_eq!(query.as_deref(), Some("rust"));
                assert_eq!(max_pages, Some(3));
            }
            _ => panic!("expected scrape"),
        }

        let cli = Cli::parse_from(["jobhunt", "beta", "approve", "ada@example.com"]);
        assert!(matches!(
            cli.command,
            Some(Command::Beta {
                command: BetaCommand::Approve { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_export_has_header_and_rows() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool());
        repo.insert(&new_job("https://jobs.test/1", "Engineer", "Acme, Inc"))
            .await
            .unwrap();
        repo.insert(&new_job("https://jobs.test/2", "Analyst", "Globex"))
            .await
            .unwrap();

        let bytes = jobs_to_csv(&repo.list_all().await.unwrap()).unwrap();
        let content = String::from_utf8(bytes).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("id,url,title,company"));
        assert_eq!(lines.count(), 2);
        assert!(content.contains("\"Acme, Inc\""));
    }
}
