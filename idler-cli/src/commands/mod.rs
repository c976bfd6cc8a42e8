// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod info;
pub mod list;
pub mod run;
pub mod validate;

use idler_core::{Config, ConfigLoader, ConfigOverrides, Credentials, IdlerResult};

use crate::gateway::HttpGateway;

/// Load configuration and build the gateway client it describes.
pub(crate) fn connect(
    config_path: &str,
    overrides: &ConfigOverrides,
    dry_run: bool,
) -> IdlerResult<(Config, HttpGateway)> {
    let config = ConfigLoader::load_file_with(config_path, overrides)?;
    let credentials = Credentials::load(&config.gateway.secret_mount_path)?;

    let gateway = HttpGateway::new(
        config.gateway.url.clone(),
        config.gateway.request_timeout,
        credentials,
        dry_run || config.idler.dry_run,
    )?;

    Ok((config, gateway))
}
