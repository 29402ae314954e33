//! Configuration record (spec §3, §9 DESIGN NOTES).
//!
//! Replaces the Python module's mutable defaults dict with an immutable
//! record composed with a per-call `Overrides`, the way the teacher's
//! `BenchmarkConfig` is built once and passed down rather than mutated in
//! place (`tools::config::BenchmarkConfig`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which of the two distribution strategies a `map` call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Pool,
    Scatter,
}

/// Direct parallel-process launcher selection (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LauncherKind {
    Serial,
    Mpi,
    Slurm,
    Alps,
}

/// Batch scheduler selection (spec §4.7). `None` means no scheduler is
/// attached and the launcher runs the command directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerKind {
    None,
    Torque,
    Moab,
    Lsf,
}

/// `_SAVE`/`_debug` process-wide flags (spec §9), modeled as one explicit
/// enum passed through the configuration instead of global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    Normal,
    SaveArtifacts,
    DebugDryRun,
}

/// LSF-only `mpich` esub variant (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MpichEsub {
    None,
    Gm,
    Mx,
}

/// The full set of recognized options (spec §3's "Configuration record").
/// Immutable; build a new value via [`MapperConfig::merged`] rather than
/// mutating fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    pub nodes: String,
    pub launcher: LauncherKind,
    pub scheduler: SchedulerKind,
    pub workdir: PathBuf,
    pub source: bool,
    pub strategy: Strategy,
    pub onall: bool,
    pub timeout: Option<u64>,
    pub queue: Option<String>,
    pub timelimit: Option<String>,
    pub jobfile: Option<PathBuf>,
    pub outfile: Option<PathBuf>,
    pub errfile: Option<PathBuf>,
    pub mpirun: String,
    pub program: String,
    pub progargs: Vec<String>,
    pub mpich_esub: MpichEsub,
    /// Open-Question resolution: whether a worker's `Err` result surfaces
    /// to the caller as `Mapper::map`'s own `Err`, or is threaded through
    /// unchanged as a value at its slot (spec §7, §9). See DESIGN.md.
    pub propagate_worker_errors: bool,
    pub run_mode: RunMode,
}

impl Default for MapperConfig {
    fn default() -> Self {
        MapperConfig {
            nodes: "1".to_string(),
            launcher: LauncherKind::Serial,
            scheduler: SchedulerKind::None,
            workdir: PathBuf::from("."),
            source: false,
            strategy: Strategy::Pool,
            // Open-Question resolution (spec §9): onall defaults to true.
            onall: true,
            timeout: None,
            queue: None,
            timelimit: None,
            jobfile: None,
            outfile: None,
            errfile: None,
            mpirun: "mpirun".to_string(),
            program: "ezpool".to_string(),
            progargs: Vec::new(),
            mpich_esub: MpichEsub::None,
            propagate_worker_errors: false,
            run_mode: RunMode::Normal,
        }
    }
}

/// Per-call overrides merged onto a base [`MapperConfig`]. Every field is
/// optional; `Some` wins over the base value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub nodes: Option<String>,
    pub launcher: Option<LauncherKind>,
    pub scheduler: Option<SchedulerKind>,
    pub workdir: Option<PathBuf>,
    pub source: Option<bool>,
    pub strategy: Option<Strategy>,
    pub onall: Option<bool>,
    pub timeout: Option<u64>,
    pub queue: Option<String>,
    pub timelimit: Option<String>,
    pub mpirun: Option<String>,
    pub mpich_esub: Option<MpichEsub>,
    pub propagate_worker_errors: Option<bool>,
    pub run_mode: Option<RunMode>,
}

impl MapperConfig {
    /// Compose `self` with `overrides`, returning a new immutable record.
    /// `program`/`progargs`/`jobfile`/`outfile`/`errfile` are not
    /// override-able: the program name follows the strategy (set by
    /// `Mapper::map`) and the scratch paths are allocated per call.
    pub fn merged(&self, overrides: &Overrides) -> MapperConfig {
        MapperConfig {
            nodes: overrides.nodes.clone().unwrap_or_else(|| self.nodes.clone()),
            launcher: overrides.launcher.unwrap_or(self.launcher),
            scheduler: overrides.scheduler.unwrap_or(self.scheduler),
            workdir: overrides.workdir.clone().unwrap_or_else(|| self.workdir.clone()),
            source: overrides.source.unwrap_or(self.source),
            strategy: overrides.strategy.unwrap_or(self.strategy),
            onall: overrides.onall.unwrap_or(self.onall),
            timeout: overrides.timeout.or(self.timeout),
            queue: overrides.queue.clone().or_else(|| self.queue.clone()),
            timelimit: overrides.timelimit.clone().or_else(|| self.timelimit.clone()),
            jobfile: self.jobfile.clone(),
            outfile: self.outfile.clone(),
            errfile: self.errfile.clone(),
            mpirun: overrides.mpirun.clone().unwrap_or_else(|| self.mpirun.clone()),
            program: self.program.clone(),
            progargs: self.progargs.clone(),
            mpich_esub: overrides.mpich_esub.unwrap_or(self.mpich_esub),
            propagate_worker_errors: overrides
                .propagate_worker_errors
                .unwrap_or(self.propagate_worker_errors),
            run_mode: overrides.run_mode.unwrap_or(self.run_mode),
        }
    }
}
