use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use github_client::GithubClient;
use repotrend_common::{Config, RepotrendError};
use waha_client::WahaClient;

use repotrend_bot::groups::GroupStore;
use repotrend_bot::traits::ChatTransport;
use repotrend_bot::{Broadcaster, PostScheduler, PostedLedger};

#[derive(Parser)]
#[command(name = "repotrend", about = "Trending-repo discovery and group broadcast bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daily scheduler and run until interrupted.
    Run,
    /// Run one broadcast now.
    Post {
        /// Comma-separated group ids overriding normal target resolution.
        #[arg(long)]
        groups: Option<String>,
    },
    /// Inspect or change the destination-group selection.
    Groups {
        #[command(subcommand)]
        action: GroupsAction,
    },
    /// Manage the posted-repo ledger.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand)]
enum GroupsAction {
    /// List the groups the chat identity participates in.
    List,
    /// Replace the persisted selection with these comma-separated group ids.
    Select { ids: String },
    /// Clear the persisted selection (broadcasts fall back to all groups).
    Clear,
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Forget everything previously posted.
    Reset,
}

fn parse_group_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("repotrend_bot=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    let searcher = Arc::new(GithubClient::new(config.github_token.clone()));
    let transport = Arc::new(WahaClient::new(
        config.waha_base_url.clone(),
        config.waha_session.clone(),
        config.waha_api_key.clone(),
    ));
    let ledger = PostedLedger::new(config.data_dir.join("posted_repos.json"));
    let groups = GroupStore::new(
        config.data_dir.join("selected_groups.json"),
        config.data_dir.join("group_cache.json"),
    );

    match cli.command {
        Command::Run => {
            let broadcaster = Arc::new(Broadcaster::new(
                searcher,
                Arc::clone(&transport) as Arc<dyn ChatTransport>,
                ledger,
                groups,
                &config,
            ));
            let scheduler = PostScheduler::new(broadcaster, &config);
            scheduler.start();

            info!("repotrend running, ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
            scheduler.stop();
            info!("Shutdown complete");
        }
        Command::Post { groups: override_raw } => {
            let broadcaster = Broadcaster::new(
                searcher,
                Arc::clone(&transport) as Arc<dyn ChatTransport>,
                ledger,
                groups,
                &config,
            );
            let group_override = override_raw.as_deref().map(parse_group_list);
            match broadcaster.broadcast(group_override).await {
                Ok(report) => println!("Broadcast finished: {report}"),
                Err(RepotrendError::BroadcastInProgress) => {
                    println!("A broadcast is already in progress, try again later");
                }
                Err(e) => println!("Broadcast failed: {e}"),
            }
        }
        Command::Groups { action } => match action {
            GroupsAction::List => {
                let listed = transport.list_groups().await?;
                if listed.is_empty() {
                    println!("Not a participant in any group");
                }
                for group in listed {
                    println!(
                        "{}  {} ({} participants)",
                        group.id,
                        group.name.as_deref().unwrap_or("<unnamed>"),
                        group.participant_count
                    );
                }
            }
            GroupsAction::Select { ids } => {
                let selected = parse_group_list(&ids);
                if selected.is_empty() {
                    println!("No group ids given; selection unchanged");
                } else {
                    println!("Selected {} group(s)", selected.len());
                    groups.set_selected(selected);
                }
            }
            GroupsAction::Clear => {
                groups.clear_selection();
                println!("Selection cleared; broadcasts target all groups");
            }
        },
        Command::Ledger { action } => match action {
            LedgerAction::Reset => {
                ledger.reset();
                println!("Ledger reset");
            }
        },
    }

    Ok(())
}
