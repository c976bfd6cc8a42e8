// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `idler info` command - Show the gateway version.

use idler_core::{ConfigOverrides, GatewayClient};

pub async fn execute(
    config_path: &str,
    overrides: &ConfigOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, gateway) = super::connect(config_path, overrides, true)?;
    let info = gateway.info().await?;

    println!("Gateway:  {}", config.gateway.url);
    println!("Provider: {}", info.provider.as_deref().unwrap_or("unknown"));
    println!("Version:  {}, SHA: {}", info.release, info.sha);

    Ok(())
}
