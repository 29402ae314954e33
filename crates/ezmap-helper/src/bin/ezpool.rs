//! Worker-pool helper entry point (spec §2 CLI interfaces, out of scope
//! for detailed behavior beyond: invoked by the launcher, runs
//! [`ezmap_core::Strategy::Pool`]).

fn main() -> anyhow::Result<()> {
    ezmap_helper::run(ezmap_core::Strategy::Pool)?;
    Ok(())
}
