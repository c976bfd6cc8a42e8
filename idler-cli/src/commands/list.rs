// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `idler list` command - List functions from the gateway.
//!
//! Shows replica counts and whether each function opted in to scale-to-zero.

use idler_core::{ConfigOverrides, EligibilityFilter, GatewayClient};

pub async fn execute(
    config_path: &str,
    overrides: &ConfigOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, gateway) = super::connect(config_path, overrides, true)?;
    let filter = EligibilityFilter::new(config.idler.scale_label.clone());

    let mut functions = gateway.list_functions().await?;
    if functions.is_empty() {
        println!("No functions deployed on the gateway.");
        return Ok(());
    }
    functions.sort_by(|a, b| a.name.cmp(&b.name));

    println!("╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                              GATEWAY FUNCTIONS                               ║");
    println!("╠═══════════════════════════╦════════════╦═══════════════════╦═════════════════╣");
    println!("║ Name                      ║ Replicas   ║ Invocations       ║ Scale to zero   ║");
    println!("╠═══════════════════════════╬════════════╬═══════════════════╬═════════════════╣");

    for func in &functions {
        let managed = if filter.is_eligible(func) { "yes" } else { "no" };

        println!(
            "║ {:<25} ║ {:<10} ║ {:<17} ║ {:<15} ║",
            func.name.as_str(),
            func.available_replicas,
            func.invocation_count,
            managed
        );
    }

    println!("╚═══════════════════════════╩════════════╩═══════════════════╩═════════════════╝");
    println!();
    println!(
        "Total: {} function(s), {} managed (label {})",
        functions.len(),
        functions.iter().filter(|f| filter.is_eligible(f)).count(),
        filter.label()
    );

    Ok(())
}
