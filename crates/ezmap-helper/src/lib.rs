//! Shared body for the `ezpool`/`ezscatter` helper binaries (spec §2 "out
//! of scope: CLI entry points... only their interfaces are specified").
//!
//! Each binary is invoked as `<program> <modfile> <argfile> <resfile>
//! <workdir>` by the launcher (spec §4.5/§4.8): resolve the registered task
//! named in `modfile`, deserialize the per-item argument blobs in
//! `argfile`, dispatch across the real MPI transport with the strategy the
//! binary's name implies, and — on rank 0 only — write the per-item result
//! blobs to `resfile`.

use std::path::PathBuf;

use ezmap_core::bridge;
use ezmap_core::error::{EzmapError, Result};
use ezmap_core::{registry, Bundle, Strategy, WorkerOutcome};
use ezmap_transport::mpi_backend::MpiTransport;
use ezmap_transport::Transport;

pub struct Args {
    pub modfile: PathBuf,
    pub argfile: PathBuf,
    pub resfile: PathBuf,
    pub workdir: PathBuf,
}

pub fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let modfile = args
        .next()
        .ok_or_else(|| EzmapError::Config("missing modfile argument".to_string()))?;
    let argfile = args
        .next()
        .ok_or_else(|| EzmapError::Config("missing argfile argument".to_string()))?;
    let resfile = args
        .next()
        .ok_or_else(|| EzmapError::Config("missing resfile argument".to_string()))?;
    let workdir = args
        .next()
        .ok_or_else(|| EzmapError::Config("missing workdir argument".to_string()))?;
    Ok(Args {
        modfile: PathBuf::from(modfile),
        argfile: PathBuf::from(argfile),
        resfile: PathBuf::from(resfile),
        workdir: PathBuf::from(workdir),
    })
}

/// Run one helper invocation end to end. `strategy` is fixed per binary
/// (`ezpool` always runs [`Strategy::Pool`], `ezscatter` always
/// [`Strategy::Scatter`]) rather than read from the argfile, mirroring the
/// two distinct entry points spec.md names.
pub fn run(strategy: Strategy) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    std::env::set_current_dir(&args.workdir).map_err(|e| EzmapError::Io {
        path: args.workdir.display().to_string(),
        source: e,
    })?;
    let descriptor = bridge::read_func_descriptor(&args.modfile)?;
    let argfile = bridge::read_args_file::<Vec<u8>>(&args.argfile)?;
    let item_blobs = argfile.positional.into_iter().next().unwrap_or_default();

    let task = registry::global().resolve(descriptor.key())?;
    let bundle = Bundle::from1(item_blobs);

    let transport = MpiTransport::new()?;
    let rank = transport.rank();

    // A worker's `Err` is never interpreted on the wire — it travels back
    // as an ordinary `WorkerOutcome::Failed` payload (spec §7); whether
    // that surfaces as an error to the caller is `Mapper::map`'s call,
    // governed by `propagate_worker_errors`.
    let results = ezmap_core::dispatch::<_, Vec<u8>, Vec<u8>, _>(
        &transport,
        &bundle,
        move |items: &[Vec<u8>]| {
            let outcome = match task.call(&items[0]) {
                Ok(bytes) => WorkerOutcome::Value(bytes),
                Err(e) => WorkerOutcome::Failed(e.to_string()),
            };
            bincode::serialize(&outcome).unwrap_or_default()
        },
        strategy,
        argfile.onall,
    )?;

    if rank == 0 {
        bridge::write_result_file(&args.resfile, &results)?;
    }
    Ok(())
}
