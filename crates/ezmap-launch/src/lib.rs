//! Launcher and scheduler adapters (spec §4.6/§4.7): the concrete
//! [`ezmap_core::ProcessLauncher`] that composes a launcher command,
//! optionally wraps it in a scheduler submission, and runs it to
//! completion.

pub mod command;
pub mod launcher;
pub mod nodespec;
pub mod process;
pub mod scheduler;
pub mod timelimit;

use std::path::{Path, PathBuf};

use ezmap_core::error::{EzmapError, Result};
use ezmap_core::{MapperConfig, ProcessLauncher, RunMode};

use launcher::Launcher;
use nodespec::parse_nodes;
use scheduler::{Scheduler, ScratchPaths};
use timelimit::iso_to_seconds;

/// Reserve a scratch path under `workdir` with the given suffix without
/// creating the file's content yet; shared by the scheduler's
/// jobfile/outfile/errfile allocation.
pub(crate) fn reserve_scratch_path(workdir: &Path, suffix: &str) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(workdir)
        .map_err(|e| EzmapError::Io { path: workdir.display().to_string(), source: e })?;
    let (_, path) = file
        .keep()
        .map_err(|e| EzmapError::Io { path: workdir.display().to_string(), source: e.error })?;
    Ok(path)
}

/// Substitute the mpi launcher's preamble binary for LSF's `mpich_gm`/
/// `mpich_mx` esub variants (spec §4.7: "the original parallel launcher
/// prefix is replaced by `gmmpirun_wrapper`/`mpich_mx_wrapper`").
fn effective_mpirun(config: &MapperConfig) -> String {
    use ezmap_core::{MpichEsub, SchedulerKind};
    match (config.scheduler, config.mpich_esub) {
        (SchedulerKind::Lsf, MpichEsub::Gm) => "gmmpirun_wrapper".to_string(),
        (SchedulerKind::Lsf, MpichEsub::Mx) => "mpich_mx_wrapper".to_string(),
        _ => config.mpirun.clone(),
    }
}

/// The poll timeout to hand to `process::launch_and_wait`: an explicit
/// `config.timeout` wins, otherwise it falls back to the scheduler's own
/// walltime (spec §4.8: unbounded only when neither is set).
fn effective_timeout(config: &MapperConfig) -> Option<u64> {
    config
        .timeout
        .or_else(|| config.timelimit.as_deref().and_then(|t| iso_to_seconds(t).ok()))
}

/// The `ProcessLauncher` implementation wired into `Mapper`. Stateless:
/// every field it needs comes from the `MapperConfig` passed to
/// `launch_and_wait`, so one instance serves every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelperProcess;

impl ProcessLauncher for HelperProcess {
    fn launch_and_wait(&self, config: &MapperConfig, progargs: &[String]) -> Result<()> {
        let nodes = parse_nodes(&config.nodes)?;
        let launcher = Launcher::from_kind(config.launcher, effective_mpirun(config));

        if let Some(binary) = launcher.preamble_binary() {
            process::resolve_binary(binary)?;
        }

        let inner = launcher.compose(&nodes, &config.program, progargs);
        let scheduler = Scheduler::from_kind(config.scheduler, config.mpich_esub);

        let save = matches!(config.run_mode, RunMode::SaveArtifacts);
        let command = match &scheduler {
            Some(scheduler) => {
                let paths = ScratchPaths::reserve(&config.workdir, config)?;
                let submitted = scheduler.submit(&inner, config, &paths);
                paths.cleanup(save);
                submitted
            }
            None => inner,
        };

        if matches!(config.run_mode, RunMode::DebugDryRun) {
            tracing::info!(%command, "dry run: command not executed");
            return Ok(());
        }

        tracing::debug!(%command, "launching helper process");
        let result_path = progargs.get(2).map(PathBuf::from).ok_or_else(|| {
            EzmapError::InvariantViolation("launch_and_wait called without a result path".to_string())
        })?;
        process::launch_and_wait(&command, &result_path, effective_timeout(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezmap_core::{LauncherKind, MpichEsub, SchedulerKind};

    #[test]
    fn effective_mpirun_substitutes_lsf_gm_wrapper() {
        let config = MapperConfig {
            scheduler: SchedulerKind::Lsf,
            mpich_esub: MpichEsub::Gm,
            ..Default::default()
        };
        assert_eq!(effective_mpirun(&config), "gmmpirun_wrapper");
    }

    #[test]
    fn effective_mpirun_passes_through_when_no_esub() {
        let config = MapperConfig {
            scheduler: SchedulerKind::None,
            launcher: LauncherKind::Mpi,
            mpirun: "mpirun.custom".to_string(),
            ..Default::default()
        };
        assert_eq!(effective_mpirun(&config), "mpirun.custom");
    }

    #[test]
    fn effective_timeout_prefers_explicit_value() {
        let config = MapperConfig {
            timeout: Some(30),
            timelimit: Some("01:00:00".to_string()),
            ..Default::default()
        };
        assert_eq!(effective_timeout(&config), Some(30));
    }

    #[test]
    fn effective_timeout_falls_back_to_scheduler_walltime() {
        let config = MapperConfig {
            timeout: None,
            timelimit: Some("00:05:00".to_string()),
            ..Default::default()
        };
        assert_eq!(effective_timeout(&config), Some(300));
    }

    #[test]
    fn effective_timeout_is_unbounded_without_either() {
        let config = MapperConfig { timeout: None, timelimit: None, ..Default::default() };
        assert_eq!(effective_timeout(&config), None);
    }

    #[test]
    fn serial_dry_run_does_not_touch_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let config = MapperConfig {
            launcher: LauncherKind::Serial,
            run_mode: RunMode::DebugDryRun,
            workdir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let progargs = vec![
            "mod".to_string(),
            "arg".to_string(),
            dir.path().join("res.bin").display().to_string(),
            dir.path().display().to_string(),
        ];
        HelperProcess.launch_and_wait(&config, &progargs).unwrap();
        assert!(!dir.path().join("res.bin").exists());
    }
}
