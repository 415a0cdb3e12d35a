use std::sync::Arc;

use ballot_verifier::{
    build_scheduler, metrics, HeadChainChecker, LedgerClient, PollContext, ProofCapability,
    SnapshotStore, TracingNotifier, VerifierConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!(
        git_hash = option_env!("BALLOT_VERIFIER_BUILD_GIT_HASH").unwrap_or("unknown"),
        build_time = option_env!("BALLOT_VERIFIER_BUILD_TIME_UNIX").unwrap_or("unknown"),
        "Starting ballot ledger verifier"
    );

    let config = VerifierConfig::from_env();
    info!("Ledger: {}", config.ledger.base_url);

    let store = SnapshotStore::open(&config.db_path).await?;
    let ledger = LedgerClient::new(&config.ledger)?;

    // The checker comes up on its own schedule; until then consistency
    // cycles are skipped.
    let capability = ProofCapability::new();
    {
        let capability = capability.clone();
        tokio::spawn(async move {
            capability.signal_ready(Arc::new(HeadChainChecker));
        });
    }

    let ctx = PollContext::new(ledger, store, capability, Arc::new(TracingNotifier));
    let handle = build_scheduler(&ctx, &config.periods).start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    handle.shutdown().await;
    ctx.store.close().await;

    info!("Task metrics: {}", metrics::snapshot_as_json());
    Ok(())
}
