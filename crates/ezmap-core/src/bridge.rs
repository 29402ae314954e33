//! Serialization bridge (spec §4.5): dump/load function and argument
//! tuples to the scratch workdir.
//!
//! `bincode` is the wire/tempfile format — the natural serde-backed binary
//! format given the workspace already depends on `serde` for every other
//! wire type. Tempfiles are created with `tempfile::NamedTempFile`, the
//! idiomatic replacement for `dill.temp.dump`/`tempfile.mktemp`; unlike
//! the original it never exposes a create-then-reopen gap, since the
//! handle returned here is the same descriptor the caller reads back.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{EzmapError, Result};
use crate::registry::FuncDescriptor;

fn io_err(path: &Path, source: std::io::Error) -> EzmapError {
    EzmapError::Io { path: path.display().to_string(), source }
}

fn write_bincode<T: Serialize>(workdir: &Path, suffix: &str, value: &T) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(workdir)
        .map_err(|e| io_err(workdir, e))?;
    bincode::serialize_into(file.as_file_mut(), value).map_err(EzmapError::Encode)?;
    Ok(file)
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    bincode::deserialize_from(file).map_err(EzmapError::Decode)
}

/// Blob mode (spec §4.5): only the registry key is written; the helper
/// resolves the callable by that key rather than unpickling it.
pub fn write_func_blob(workdir: &Path, key: &str) -> Result<NamedTempFile> {
    write_bincode(workdir, ".pik", &FuncDescriptor::Blob { key: key.to_string() })
}

/// Source mode (spec §4.5): the literal source text is written alongside
/// a `FUNC = <key>` binding comment, for inspection/debug parity with the
/// original module-file behavior. Resolution still goes through the
/// registry by `key` — the text is never evaluated.
pub fn write_func_source(workdir: &Path, key: &str, source: &str) -> Result<NamedTempFile> {
    let descriptor = FuncDescriptor::Source { key: key.to_string(), source: source.to_string() };
    write_bincode(workdir, ".py", &descriptor)
}

pub fn read_func_descriptor(path: &Path) -> Result<FuncDescriptor> {
    read_bincode(path)
}

/// Argument dump (spec §4.5): `(positional_bundle, kwargs)`; `kwargs`
/// always carries `onall`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ArgFile<A> {
    pub positional: Vec<Vec<A>>,
    pub onall: bool,
}

pub fn write_args_file<A: Serialize + Clone>(
    workdir: &Path,
    positional: &[Vec<A>],
    onall: bool,
) -> Result<NamedTempFile> {
    let payload = ArgFile { positional: positional.to_vec(), onall };
    write_bincode(workdir, ".arg", &payload)
}

pub fn read_args_file<A: DeserializeOwned>(path: &Path) -> Result<ArgFile<A>> {
    read_bincode(path)
}

/// Reserve a path for the result file without creating it yet — the
/// helper process (not this one) will write it.
pub fn reserve_result_path(workdir: &Path) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .tempfile_in(workdir)
        .map_err(|e| io_err(workdir, e))?;
    let (_, path) = file.keep().map_err(|e| io_err(workdir, e.error))?;
    Ok(path)
}

pub fn write_result_file<R: Serialize>(path: &Path, results: &[R]) -> Result<()> {
    let mut file = std::fs::File::create(path).map_err(|e| io_err(path, e))?;
    bincode::serialize_into(&mut file, &results).map_err(EzmapError::Encode)
}

pub fn read_result_file<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let file = std::fs::File::open(path).map_err(|e| {
        EzmapError::LoadFailure { path: path.display().to_string(), reason: e.to_string() }
    })?;
    bincode::deserialize_from(file).map_err(|e| EzmapError::LoadFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Remove scratch files unless save-mode is on (spec §4.5 cleanup
/// contract). Copies to fixed inspection names (`modfile.*`, `argfile.*`,
/// `resfile.*`) when saving, matching the original's debug copies.
pub fn cleanup_or_save(
    workdir: &Path,
    modfile: &Path,
    argfile: &Path,
    resfile: &Path,
    save: bool,
) -> Result<()> {
    if save {
        for (src, fixed_name) in [(modfile, "modfile"), (argfile, "argfile"), (resfile, "resfile")] {
            let ext = src.extension().and_then(|e| e.to_str()).unwrap_or("bin");
            let dest = workdir.join(format!("{fixed_name}.{ext}"));
            std::fs::copy(src, &dest).map_err(|e| io_err(&dest, e))?;
        }
    } else {
        for path in [modfile, argfile, resfile] {
            let _ = std::fs::remove_file(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_descriptor_round_trips_blob_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let blob = write_func_blob(dir.path(), "square").unwrap();
        let descriptor = read_func_descriptor(blob.path()).unwrap();
        assert_eq!(descriptor.key(), "square");
        assert!(matches!(descriptor, FuncDescriptor::Blob { .. }));

        let source = write_func_source(dir.path(), "square", "fn square(x: u32) -> u32 { x * x }").unwrap();
        let descriptor = read_func_descriptor(source.path()).unwrap();
        assert_eq!(descriptor.key(), "square");
        assert!(matches!(descriptor, FuncDescriptor::Source { .. }));
    }

    #[test]
    fn args_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_args_file(dir.path(), &[vec![1, 2, 3]], true).unwrap();
        let loaded: ArgFile<i32> = read_args_file(file.path()).unwrap();
        assert_eq!(loaded.positional, vec![vec![1, 2, 3]]);
        assert!(loaded.onall);
    }

    #[test]
    fn result_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.bin");
        write_result_file(&path, &[1, 4, 9]).unwrap();
        let loaded: Vec<i32> = read_result_file(&path).unwrap();
        assert_eq!(loaded, vec![1, 4, 9]);
    }

    #[test]
    fn unreadable_result_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        let err = read_result_file::<i32>(&path).unwrap_err();
        assert!(matches!(err, EzmapError::LoadFailure { .. }));
    }
}
