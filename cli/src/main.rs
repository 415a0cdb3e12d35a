use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use ballot_cli::utils::*;
use ballot_verifier::config::{DEFAULT_LEDGER_URL, DEFAULT_REQUEST_TIMEOUT_MS};
use ballot_verifier::store::constants::DEFAULT_DB_PATH;
use ballot_verifier::tasks::{audit_random_ballot, check_consistency, refresh_stats};
use ballot_verifier::{
    build_scheduler, metrics, AuditTarget, Candidate, ConsistencyOutcome, HeadChainChecker,
    LedgerClient, LedgerConfig, Notifier, PollContext, ProofCapability, Registration,
    SessionController, SnapshotStore, TaskPeriods, TracingNotifier,
};
use clap::Parser;
use log::info;
use tokio::runtime::Builder;

#[derive(Clone, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, env = "LEDGER_URL", default_value = DEFAULT_LEDGER_URL)]
    pub ledger_url: String,

    #[arg(long, env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    #[arg(short, long, env = "LEDGER_USER")]
    pub username: Option<String>,

    #[arg(short, long, env = "LEDGER_PASSWORD")]
    pub password: Option<String>,

    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn ledger_config(&self) -> LedgerConfig {
        let mut config = LedgerConfig::new(&self.ledger_url);
        config.username = self.username.clone();
        config.password = self.password.clone();
        config.request_timeout = Duration::from_millis(self.timeout_ms);
        config
    }
}

#[derive(clap::Subcommand, Clone)]
pub enum Commands {
    Register {
        #[arg(long)]
        citizen_id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        address: String,

        #[arg(long)]
        email: String,
    },
    Vote {
        #[arg(long, value_parser = parse_candidate, help = "Candidate: 1 | 2 | a | b")]
        candidate: Candidate,

        #[arg(long, help = "Defaults to the stored session")]
        voter_id: Option<String>,

        #[arg(long, help = "Defaults to the stored session")]
        ballot_id: Option<String>,
    },
    /// Show the stored session and its status on the ledger
    Session {},
    Stats {},
    /// Audit one ballot's history
    Ballot {
        #[arg(long, help = "Id of ballot to audit")]
        id: String,
    },
    AuditRandom {},
    /// Run one consistency check against the last trusted state
    Verify {},
    /// Keep polling the ledger until Ctrl-C
    Watch {},
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(false)
        .try_init();

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let cli = Cli::parse();
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let ledger = LedgerClient::new(&cli.ledger_config())?;
    let store = SnapshotStore::open(&cli.db_path).await?;
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let poll_context = || {
        PollContext::new(
            ledger.clone(),
            store.clone(),
            ProofCapability::ready(Arc::new(HeadChainChecker)),
            notifier.clone(),
        )
    };

    match cli.command {
        Commands::Register {
            citizen_id,
            name,
            address,
            email,
        } => {
            let controller = SessionController::new(ledger.clone(), store.clone(), notifier.clone());
            let session = controller
                .register(&Registration {
                    citizen_id,
                    name,
                    address,
                    email,
                })
                .await?;
            println!("{}", render_session(&session, None));
        }
        Commands::Vote {
            candidate,
            voter_id,
            ballot_id,
        } => {
            let controller = SessionController::new(ledger.clone(), store.clone(), notifier.clone());
            let stored = controller.session().await?;
            let voter_id = voter_id
                .or_else(|| stored.as_ref().map(|s| s.voter_id.clone()))
                .unwrap_or_default();
            let ballot_id = ballot_id
                .or_else(|| stored.as_ref().map(|s| s.ballot_id.clone()))
                .unwrap_or_default();

            let session = controller
                .cast_vote(&voter_id, &ballot_id, candidate)
                .await?;
            info!("Vote for {} recorded on ballot {}", candidate, session.ballot_id);
        }
        Commands::Session {} => {
            let controller = SessionController::new(ledger.clone(), store.clone(), notifier.clone());
            let Some(session) = controller.session().await? else {
                println!("Not registered");
                return Ok(());
            };
            let status = controller.voter_status().await?;
            println!("{}", render_session(&session, status.as_ref()));
        }
        Commands::Stats {} => {
            let ctx = poll_context();
            refresh_stats(&ctx).await?;
            let stats = ctx
                .dashboard
                .stats()
                .ok_or_else(|| anyhow!("no stats received"))?;
            println!("{}", render_stats(&stats));
        }
        Commands::Ballot { id } => {
            let ctx = poll_context();
            let report = ctx.auditor.audit(&AuditTarget::Ballot(id)).await?;
            println!("{}", render_audit(&report));
            if !report.ok {
                return Err(anyhow!("ballot {} history was altered", report.ballot_id));
            }
        }
        Commands::AuditRandom {} => {
            let ctx = poll_context();
            let Some(report) = audit_random_ballot(&ctx).await? else {
                println!("Ledger has no ballots yet");
                return Ok(());
            };
            println!("{}", render_audit(&report));
            if !report.ok {
                return Err(anyhow!("ballot {} history was altered", report.ballot_id));
            }
        }
        Commands::Verify {} => {
            let ctx = poll_context();
            let outcome = check_consistency(&ctx).await?;
            if let Some(label) = ctx.dashboard.consistency_label() {
                println!("{}", label);
            }
            if let ConsistencyOutcome::Divergent(reason) = outcome {
                return Err(anyhow!("ledger state diverged: {}", reason));
            }
        }
        Commands::Watch {} => {
            let ctx = poll_context();
            let periods = TaskPeriods::from_env();
            let handle = build_scheduler(&ctx, &periods).start();

            let mut ticker = tokio::time::interval(periods.stats);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        println!("{}\n", render_dashboard(&ctx.dashboard.snapshot()));
                    }
                    res = tokio::signal::ctrl_c() => {
                        res?;
                        break;
                    }
                }
            }

            handle.shutdown().await;
            info!("Task metrics: {}", metrics::snapshot_as_json());
        }
    }

    Ok(())
}
