//! Mapper facade (spec §4.8): ties the serialization bridge and a process
//! launcher together into the public `map` entry point.
//!
//! Launching the helper process is the `ezmap-launch` crate's job; to
//! avoid a dependency cycle (`ezmap-launch` needs `MapperConfig` and
//! `EzmapError` from this crate), the facade is generic over a narrow
//! [`ProcessLauncher`] trait that `ezmap-launch`'s `Launcher` implements.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bridge;
use crate::bundle::WorkerOutcome;
use crate::config::{MapperConfig, RunMode};
use crate::error::{EzmapError, Result};

/// The capability the facade needs from a launcher: compose, spawn, wait,
/// and confirm clean exit. Result-file polling and loading stay in this
/// crate since they are launcher-agnostic.
pub trait ProcessLauncher {
    fn launch_and_wait(&self, config: &MapperConfig, progargs: &[String]) -> Result<()>;
}

/// A long-lived value object (spec §3 "Lifecycles"): configuration is
/// mutable between `map` calls via [`MapperConfig::merged`], but this
/// value itself is reused across calls, as a Python `Mapper` instance is.
pub struct Mapper<L: ProcessLauncher> {
    config: MapperConfig,
    launcher: L,
}

impl<L: ProcessLauncher> Mapper<L> {
    pub fn new(config: MapperConfig, launcher: L) -> Self {
        Mapper { config, launcher }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Run one `map` call: write function + argument tempfiles, launch the
    /// helper, await and load the result file, then clean up (spec §4.8).
    ///
    /// Whether `key` is resolved from a registered blob or compiled fresh
    /// from `source` is governed by `self.config.source` (spec §3/§4.8),
    /// not by the caller; `source` must be `Some` whenever the config has
    /// `source` set.
    ///
    /// A worker's `Err` never aborts the whole call by itself (spec §7) —
    /// it comes back as `WorkerOutcome::Failed` at that item's slot. When
    /// `propagate_worker_errors` is set, any failed slot is collapsed into
    /// this call's own `Err`; otherwise every slot's outcome is returned
    /// for the caller to inspect (spec §9 Open Question resolution, see
    /// DESIGN.md).
    pub fn map<A, R>(&self, key: &str, source: Option<&str>, positional: &[Vec<A>]) -> Result<Vec<WorkerOutcome<R>>>
    where
        A: Serialize + Clone,
        R: Serialize + DeserializeOwned,
    {
        let workdir = self.config.workdir.clone();
        let modfile = if self.config.source {
            let source = source.ok_or_else(|| {
                EzmapError::Config(format!("config.source is set but no source text was given for `{key}`"))
            })?;
            bridge::write_func_source(&workdir, key, source)?
        } else {
            bridge::write_func_blob(&workdir, key)?
        };
        // The helper process is a separate binary that never sees `A`/`R` —
        // it resolves a registered task by key and calls it on raw bytes.
        // Each item's positional tuple is therefore pre-encoded here, one
        // blob per item, rather than shipped as typed columns.
        let n = positional.first().map(Vec::len).unwrap_or(0);
        let item_blobs: Result<Vec<Vec<u8>>> = (0..n)
            .map(|j| {
                let item = ezmap_partition::lookup_item(positional, j);
                bincode::serialize(&item).map_err(crate::error::EzmapError::Encode)
            })
            .collect();
        let argfile = bridge::write_args_file(&workdir, &[item_blobs?], self.config.onall)?;
        let respath = bridge::reserve_result_path(&workdir)?;

        let progargs = vec![
            modfile.path().display().to_string(),
            argfile.path().display().to_string(),
            respath.display().to_string(),
            workdir.display().to_string(),
        ];

        tracing::info!(
            strategy = ?self.config.strategy,
            nodes = %self.config.nodes,
            njobs = n,
            "dispatching map"
        );

        // Results come back the same way: one pre-encoded `WorkerOutcome<R>`
        // blob per item, decoded here now that `R` is back in scope.
        let outcome = self
            .launcher
            .launch_and_wait(&self.config, &progargs)
            .and_then(|_| bridge::read_result_file::<Vec<u8>>(&respath))
            .and_then(|blobs| {
                blobs
                    .iter()
                    .map(|b| {
                        bincode::deserialize::<WorkerOutcome<R>>(b).map_err(EzmapError::Decode)
                    })
                    .collect::<Result<Vec<WorkerOutcome<R>>>>()
            })
            .and_then(|outcomes| {
                if self.config.propagate_worker_errors {
                    if let Some(WorkerOutcome::Failed(reason)) =
                        outcomes.iter().find(|o| matches!(o, WorkerOutcome::Failed(_)))
                    {
                        return Err(EzmapError::InvariantViolation(format!(
                            "worker reported an error: {reason}"
                        )));
                    }
                }
                Ok(outcomes)
            });

        let save = matches!(self.config.run_mode, RunMode::SaveArtifacts);
        bridge::cleanup_or_save(&workdir, modfile.path(), argfile.path(), &respath, save)?;

        tracing::info!(ok = outcome.is_ok(), "map finished");
        outcome
    }
}
