//! Batch scheduler adapters (spec §4.7): wrap an already-composed launcher
//! command in a Torque/Moab/LSF submission line.
//!
//! Grounded on the `Command::new("bsub").arg("-q").arg(queue)...` builder
//! style from the LSF/Apptainer backend, adapted here to produce the exact
//! wrapped-string forms spec.md names (Torque/Moab pipe through `qsub`;
//! LSF's `bsub` takes its flags directly, no `echo`/pipe).

use std::path::{Path, PathBuf};

use ezmap_core::error::Result;
use ezmap_core::{MapperConfig, MpichEsub, SchedulerKind};

use crate::command::{escape_for_double_quotes, CommandBuilder};

#[derive(Debug, Clone)]
pub enum Scheduler {
    Torque,
    Moab,
    Lsf { esub: MpichEsub },
}

impl Scheduler {
    pub fn from_kind(kind: SchedulerKind, esub: MpichEsub) -> Option<Self> {
        match kind {
            SchedulerKind::None => None,
            SchedulerKind::Torque => Some(Scheduler::Torque),
            SchedulerKind::Moab => Some(Scheduler::Moab),
            SchedulerKind::Lsf => Some(Scheduler::Lsf { esub }),
        }
    }

    /// The esub flag LSF needs appended ahead of the wrapped command, if
    /// any (spec §4.7's `mpich_gm`/`mpich_mx` variants).
    pub fn esub_flag(&self) -> Option<&'static str> {
        match self {
            Scheduler::Lsf { esub: MpichEsub::Gm } => Some("-a mpich_gm"),
            Scheduler::Lsf { esub: MpichEsub::Mx } => Some("-a mpich_mx"),
            _ => None,
        }
    }

    /// Wrap `command` (the launcher's composed inner command) in this
    /// scheduler's submission line.
    pub fn submit(&self, command: &str, config: &MapperConfig, paths: &ScratchPaths) -> String {
        match self {
            Scheduler::Torque => {
                let escaped = escape_for_double_quotes(command);
                let mut builder = CommandBuilder::new().raw(format!("echo \"{escaped}\""));
                builder = builder.raw("|").raw("qsub");
                builder = apply_pbs_flags(builder, config, paths);
                builder.build()
            }
            Scheduler::Moab => {
                let escaped = escape_for_double_quotes(command);
                let mut builder = CommandBuilder::new().raw(format!("echo \"{escaped}\""));
                builder = builder.raw("|").raw("msub");
                builder = apply_pbs_flags(builder, config, paths);
                builder.build()
            }
            Scheduler::Lsf { .. } => {
                let mut builder = CommandBuilder::new().raw("bsub").raw("-K");
                if let Some(timelimit) = &config.timelimit {
                    builder = builder.raw("-W").raw(timelimit.clone());
                }
                builder = builder
                    .raw("-n")
                    .raw(config.nodes.clone())
                    .raw("-o")
                    .quoted(paths.outfile.display().to_string())
                    .raw("-e")
                    .quoted(paths.errfile.display().to_string());
                if let Some(queue) = &config.queue {
                    builder = builder.raw("-q").raw(queue.clone());
                }
                builder = builder.raw("-J").raw("ezmap");
                if let Some(flag) = self.esub_flag() {
                    builder = builder.raw(flag);
                }
                builder = builder.raw(command);
                builder = builder.raw("&>").quoted(paths.jobfile.display().to_string());
                builder.build()
            }
        }
    }
}

fn apply_pbs_flags(mut builder: CommandBuilder, config: &MapperConfig, paths: &ScratchPaths) -> CommandBuilder {
    builder = builder.raw("-l").raw(format!("nodes={}", config.nodes));
    if let Some(timelimit) = &config.timelimit {
        builder = builder.raw("-l").raw(format!("walltime={timelimit}"));
    }
    builder = builder
        .raw("-o")
        .quoted(paths.outfile.display().to_string())
        .raw("-e")
        .quoted(paths.errfile.display().to_string());
    if let Some(queue) = &config.queue {
        builder = builder.raw("-q").raw(queue.clone());
    }
    builder.raw("&>").quoted(paths.jobfile.display().to_string())
}

/// Scratch paths a scheduler submission needs for its own bookkeeping,
/// distinct from the serialization bridge's modfile/argfile/resfile.
#[derive(Debug, Clone)]
pub struct ScratchPaths {
    pub jobfile: PathBuf,
    pub outfile: PathBuf,
    pub errfile: PathBuf,
}

impl ScratchPaths {
    /// Allocate fresh scratch paths in `workdir`, honoring any fixed paths
    /// already set on `config` (spec §3's `jobfile`/`outfile`/`errfile`
    /// overrides).
    pub fn reserve(workdir: &Path, config: &MapperConfig) -> Result<ScratchPaths> {
        let jobfile = match &config.jobfile {
            Some(p) => p.clone(),
            None => crate::reserve_scratch_path(workdir, ".job")?,
        };
        let outfile = match &config.outfile {
            Some(p) => p.clone(),
            None => crate::reserve_scratch_path(workdir, ".out")?,
        };
        let errfile = match &config.errfile {
            Some(p) => p.clone(),
            None => crate::reserve_scratch_path(workdir, ".err")?,
        };
        Ok(ScratchPaths { jobfile, outfile, errfile })
    }

    pub fn cleanup(&self, save: bool) {
        if save {
            return;
        }
        for path in [&self.jobfile, &self.outfile, &self.errfile] {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezmap_core::{LauncherKind, Strategy};

    fn base_config() -> MapperConfig {
        MapperConfig {
            nodes: "4".to_string(),
            launcher: LauncherKind::Mpi,
            scheduler: SchedulerKind::Torque,
            strategy: Strategy::Pool,
            queue: Some("batch".to_string()),
            timelimit: Some("01:00:00".to_string()),
            ..Default::default()
        }
    }

    fn paths() -> ScratchPaths {
        ScratchPaths {
            jobfile: PathBuf::from("/tmp/x.job"),
            outfile: PathBuf::from("/tmp/x.out"),
            errfile: PathBuf::from("/tmp/x.err"),
        }
    }

    #[test]
    fn torque_pipes_through_qsub() {
        let config = base_config();
        let command = Scheduler::Torque.submit("mpirun -np 4 ezpool", &config, &paths());
        assert_eq!(
            command,
            "echo \"mpirun -np 4 ezpool\" | qsub -l nodes=4 -l walltime=01:00:00 \
             -o /tmp/x.out -e /tmp/x.err -q batch &> /tmp/x.job"
        );
    }

    #[test]
    fn lsf_does_not_escape_the_inner_command() {
        let mut config = base_config();
        config.scheduler = SchedulerKind::Lsf;
        let scheduler = Scheduler::Lsf { esub: MpichEsub::Gm };
        let command = scheduler.submit("mpirun -np 4 ezpool", &config, &paths());
        assert!(command.starts_with("bsub -K -W 01:00:00 -n 4"));
        assert!(command.contains("-a mpich_gm"));
        assert!(command.contains("mpirun -np 4 ezpool"));
        assert!(command.ends_with("&> /tmp/x.job"));
    }

    #[test]
    fn double_quotes_in_command_are_escaped_for_torque() {
        let config = base_config();
        let command = Scheduler::Torque.submit("ezpool \"weird\"", &config, &paths());
        assert!(command.contains("echo \"ezpool \\\"weird\\\"\""));
    }
}
