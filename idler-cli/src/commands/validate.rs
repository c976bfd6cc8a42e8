// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `idler validate` command - Validate configuration file.

use idler_core::{ConfigLoader, ConfigOverrides};

pub async fn execute(
    file: &str,
    overrides: &ConfigOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file_with(file, overrides) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Gateway:");
            println!("  URL:                 {}", config.gateway.url);
            println!(
                "  Secret Mount Path:   {}",
                config.gateway.secret_mount_path.display()
            );
            println!(
                "  Request Timeout:     {}ms",
                config.gateway.request_timeout.as_millis()
            );
            println!();
            println!("Metric Source:");
            println!("  URL:                 {}", config.metrics.url);
            println!("  Metric:              {}", config.metrics.metric_name);
            println!();
            println!("Idler:");
            println!("  Inactivity Window:   {}", config.idler.inactivity_window);
            println!(
                "  Reconcile Interval:  {}s",
                config.idler.reconcile_interval.as_secs()
            );
            println!("  Scale Label:         {}", config.idler.scale_label);
            println!("  Dry Run:             {}", config.idler.dry_run);
            match config.idler.metrics_port {
                Some(port) => println!("  Metrics Port:        {}", port),
                None => println!("  Metrics Port:        disabled"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
