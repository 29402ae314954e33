//! Node-string grammar (spec §6): `N[:tag…][:ppn=M][,extra]`.

use ezmap_core::error::{EzmapError, Result};

/// A parsed node-string: width, an arbitrary set of resource tags, and an
/// optional processes-per-node count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub n: u32,
    pub tags: Vec<String>,
    pub ppn: Option<u32>,
}

/// Parse `spec` per the grammar `INT (":" TAG)* [":ppn=" INT] ["," EXTRA]`;
/// `EXTRA` is discarded before parsing.
pub fn parse_nodes(spec: &str) -> Result<NodeSpec> {
    let head = spec.split(',').next().unwrap_or(spec);
    let mut parts = head.split(':');
    let n: u32 = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EzmapError::Config(format!("empty node-string `{spec}`")))?
        .trim()
        .parse()
        .map_err(|_| EzmapError::Config(format!("unparseable node-string `{spec}`")))?;

    let mut tags = Vec::new();
    let mut ppn = None;
    for part in parts {
        if let Some(value) = part.strip_prefix("ppn=") {
            ppn = Some(
                value
                    .parse()
                    .map_err(|_| EzmapError::Config(format!("unparseable ppn in `{spec}`")))?,
            );
        } else {
            tags.push(part.to_string());
        }
    }
    Ok(NodeSpec { n, tags, ppn })
}

impl NodeSpec {
    /// `tasks = N·ppn` for the mpi launcher (spec §4.6).
    pub fn mpi_tasks(&self) -> u32 {
        self.n * self.ppn.unwrap_or(1)
    }

    /// `"N"` or `"N -NP"` for the slurm launcher.
    pub fn slurm_repr(&self) -> String {
        match self.ppn {
            Some(p) => format!("{} -N{}", self.n, p),
            None => self.n.to_string(),
        }
    }

    /// `"N"` or `"N -N P"` for the alps launcher.
    pub fn alps_repr(&self) -> String {
        match self.ppn {
            Some(p) => format!("{} -N {}", self.n, p),
            None => self.n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_spec_examples() {
        let spec = parse_nodes("3:core4:ppn=2").unwrap();
        assert_eq!(spec.n, 3);
        assert_eq!(spec.tags, vec!["core4".to_string()]);
        assert_eq!(spec.ppn, Some(2));
        assert_eq!(spec.mpi_tasks(), 6);
        assert_eq!(spec.alps_repr(), "3 -N 2");
        assert_eq!(spec.slurm_repr(), "3 -N2");

        let plain = parse_nodes("4").unwrap();
        assert_eq!(plain.mpi_tasks(), 4);
        assert_eq!(plain.slurm_repr(), "4");
        assert_eq!(plain.alps_repr(), "4");
    }

    #[test]
    fn extra_after_comma_is_discarded() {
        let spec = parse_nodes("4:ppn=2,partition=gpu").unwrap();
        assert_eq!(spec.n, 4);
        assert_eq!(spec.ppn, Some(2));
    }

    #[test]
    fn rejects_unparseable_width() {
        assert!(parse_nodes("not-a-number").is_err());
    }
}
