//! `idler run` command - Start the reconciliation loop.
//!
//! Checks the gateway is reachable, then runs reconciliation rounds until
//! Ctrl+C. With `--once` a single round is run and summarised.

use std::sync::Arc;

use idler_core::{
    ConfigOverrides, EligibilityFilter, GatewayClient, Outcome, Reconciler, ReconcilerSettings,
};

use crate::gateway::HttpGateway;
use crate::metrics;
use crate::scrape::ScrapeSource;

pub async fn execute(
    config_path: &str,
    overrides: &ConfigOverrides,
    dry_run: bool,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(config = %config_path, dry_run = %dry_run, once = %once, "Starting idler");

    // Load and validate configuration - fail fast on invalid config
    let (config, gateway) = super::connect(config_path, overrides, dry_run)?;
    let dry_run = dry_run || config.idler.dry_run;

    // Refuse to start against a gateway we cannot reach
    let info = gateway.info().await?;
    tracing::info!(
        provider = info.provider.as_deref().unwrap_or("unknown"),
        release = %info.release,
        sha = %info.sha,
        "Connected to gateway"
    );

    println!("dry_run:             {}", dry_run);
    println!("gateway_url:         {}", config.gateway.url);
    println!("metrics_url:         {}", config.metrics.url);
    println!("inactivity_duration: {}", config.idler.inactivity_window);
    println!("reconcile_interval:  {}s", config.idler.reconcile_interval.as_secs());
    println!("scale_label:         {}", config.idler.scale_label);

    let source = ScrapeSource::new(
        config.metrics.url.clone(),
        config.metrics.metric_name.clone(),
        config.gateway.request_timeout,
    )?;

    let settings = ReconcilerSettings {
        filter: EligibilityFilter::new(config.idler.scale_label.clone()),
        call_timeout: config.gateway.request_timeout,
    };
    let gateway: Arc<HttpGateway> = Arc::new(gateway);
    let reconciler = Reconciler::new(gateway, Arc::new(source), settings);

    if once {
        let report = reconciler.reconcile(config.idler.inactivity_window).await?;
        println!();
        for entry in &report.outcomes {
            let detail = match &entry.outcome {
                Outcome::Kept(reason) => format!(" ({})", reason),
                Outcome::Failed(message) => format!(" ({})", message),
                _ => String::new(),
            };
            println!("  {:<30} {}{}", entry.name.as_str(), entry.outcome.as_str(), detail);
        }
        println!();
        println!(
            "Evaluated {} function(s) in {}s: {} scaled, {} kept, {} failed",
            report.evaluated(),
            report.elapsed.as_secs(),
            report.scaled(),
            report.kept(),
            report.failed()
        );
        return Ok(());
    }

    if let Some(port) = config.idler.metrics_port {
        metrics::start_metrics_server(port);
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    let cache = reconciler.cache().clone();
    reconciler
        .run(
            config.idler.inactivity_window,
            config.idler.reconcile_interval,
            shutdown,
            |report| metrics::record_round(report, cache.len()),
        )
        .await;

    Ok(())
}
