/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Verifier configuration.
//!
//! A [`VerifierConfig`] is carried by each [`Context`](crate::Context);
//! there is no process-wide configuration. It can be built in code,
//! loaded from the environment with [`from_env`], or round-tripped
//! through YAML with [`from_yaml`] and [`to_yaml`].

use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding [`VerifierConfig::verify_on_build`].
pub const VERIFY_ON_BUILD_ENV: &str = "LINALG_IR_VERIFY_ON_BUILD";

/// Environment variable overriding [`VerifierConfig::log_failures`].
pub const LOG_FAILURES_ENV: &str = "LINALG_IR_LOG_FAILURES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Verify `slice` and `transpose` as they are built, returning the
    /// verification error from the builder. When off, builders always
    /// succeed and [`Context::verify`](crate::Context::verify) must be
    /// called explicitly.
    pub verify_on_build: bool,

    /// Emit a `warn` event for every failed verification.
    pub log_failures: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            verify_on_build: true,
            log_failures: true,
        }
    }
}

/// Load configuration from environment variables, starting from the
/// defaults. Unparseable values are logged and ignored.
pub fn from_env() -> VerifierConfig {
    let mut config = VerifierConfig::default();
    override_bool(VERIFY_ON_BUILD_ENV, &mut config.verify_on_build);
    override_bool(LOG_FAILURES_ENV, &mut config.log_failures);
    tracing::info!(
        verify_on_build = config.verify_on_build,
        log_failures = config.log_failures,
        "loaded verifier configuration from environment"
    );
    config
}

fn override_bool(env_var: &str, slot: &mut bool) {
    let Ok(val) = env::var(env_var) else {
        return;
    };
    match val.trim().parse::<bool>() {
        Ok(parsed) => *slot = parsed,
        Err(e) => {
            tracing::error!(
                "failed to override config from value \"{}\" in ${}: {}",
                val,
                env_var,
                e
            );
        }
    }
}

/// Load configuration from a YAML file. Missing keys take their
/// defaults.
pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<VerifierConfig, anyhow::Error> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Save configuration to a YAML file.
pub fn to_yaml<P: AsRef<Path>>(config: &VerifierConfig, path: P) -> Result<(), anyhow::Error> {
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}
