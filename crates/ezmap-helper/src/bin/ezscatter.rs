//! Scatter–gather helper entry point (spec §2 CLI interfaces; runs
//! [`ezmap_core::Strategy::Scatter`]).

fn main() -> anyhow::Result<()> {
    ezmap_helper::run(ezmap_core::Strategy::Scatter)?;
    Ok(())
}
