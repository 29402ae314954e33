//! Launcher variants (spec §4.6): compose a `(python, program, progargs,
//! nodes, mpirun)` record into a shell invocation.

use crate::command::CommandBuilder;
use crate::nodespec::NodeSpec;
use ezmap_core::LauncherKind;

/// The effective preamble binary for the mpi launcher. Ordinarily
/// `mpirun`/`mpiexec`; under LSF with an `mpich` esub the original prefix
/// is replaced by `gmmpirun_wrapper`/`mpich_mx_wrapper` (spec §4.7).
#[derive(Debug, Clone)]
pub enum Launcher {
    Serial,
    Mpi { mpirun: String },
    Slurm,
    Alps,
}

impl Launcher {
    pub fn from_kind(kind: LauncherKind, mpirun: String) -> Self {
        match kind {
            LauncherKind::Serial => Launcher::Serial,
            LauncherKind::Mpi => Launcher::Mpi { mpirun },
            LauncherKind::Slurm => Launcher::Slurm,
            LauncherKind::Alps => Launcher::Alps,
        }
    }

    /// The binary this launcher needs resolvable on `PATH`, if any
    /// (spec §4.6 step 1). `Serial` runs the helper directly.
    pub fn preamble_binary(&self) -> Option<&str> {
        match self {
            Launcher::Serial => None,
            Launcher::Mpi { mpirun } => Some(mpirun),
            Launcher::Slurm => Some("srun"),
            Launcher::Alps => Some("aprun"),
        }
    }

    /// Compose the inner command (no scheduler wrapping) that runs
    /// `program progargs...` under this launcher's preamble.
    pub fn compose(&self, nodes: &NodeSpec, program: &str, progargs: &[String]) -> String {
        let mut builder = CommandBuilder::new();
        builder = match self {
            Launcher::Serial => builder,
            Launcher::Mpi { mpirun } => builder
                .raw(mpirun.clone())
                .raw("-np")
                .raw(nodes.mpi_tasks().to_string()),
            Launcher::Slurm => builder.raw(format!("srun -n{}", nodes.slurm_repr())),
            Launcher::Alps => builder.raw(format!("aprun -n {}", nodes.alps_repr())),
        };
        builder = builder.quoted(program);
        for arg in progargs {
            builder = builder.quoted(arg);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodespec::parse_nodes;

    #[test]
    fn mpi_launcher_renders_task_count() {
        let nodes = parse_nodes("3:ppn=2").unwrap();
        let launcher = Launcher::Mpi { mpirun: "mpirun".to_string() };
        let cmd = launcher.compose(&nodes, "ezpool", &["a.arg".to_string()]);
        assert_eq!(cmd, "mpirun -np 6 ezpool a.arg");
    }

    #[test]
    fn serial_launcher_ignores_nodes() {
        let nodes = parse_nodes("8").unwrap();
        let cmd = Launcher::Serial.compose(&nodes, "ezpool", &[]);
        assert_eq!(cmd, "ezpool");
    }

    #[test]
    fn progargs_with_spaces_are_quoted() {
        let nodes = parse_nodes("1").unwrap();
        let cmd = Launcher::Serial.compose(&nodes, "ezpool", &["has space".to_string()]);
        assert_eq!(cmd, "ezpool 'has space'");
    }
}
