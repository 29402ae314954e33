//! Worker pool strategy (spec §4.3): dynamic master–worker dispatch, one
//! item at a time, tag doubling as slot id.
//!
//! Flattens the exception-based tag dispatch of the original into an
//! explicit loop with two event sources on the master: the transport
//! (remote workers replying) and, when `onall` is set, a local worker
//! thread computing one item at a time (spec §5's "parallel process, not
//! a cooperative task"). There is no non-blocking transport primitive
//! (spec §4.1, §5), so the master prefers draining the local channel
//! first and otherwise blocks on the transport — correct, though it adds
//! a little latency versus true select()-style interleaving when both
//! are ready at once.

use std::collections::HashSet;
use std::sync::mpsc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use ezmap_transport::{Status, Transport, EXIT_TAG};

use crate::bundle::Bundle;
use crate::error::{EzmapError, Result};
use crate::ResultVec;

pub fn run<Tp, A, R, F>(transport: &Tp, bundle: &Bundle<A>, func: F, onall: bool) -> Result<Vec<R>>
where
    Tp: Transport,
    A: Serialize + DeserializeOwned + Clone + Send,
    R: Serialize + DeserializeOwned + Send,
    F: Fn(&[A]) -> R + Sync + Send + Clone,
{
    let p = transport.size();
    let rank = transport.rank();
    let n = bundle.len();

    if rank == 0 {
        master(transport, bundle, &func, onall, p, n)
    } else {
        worker(transport, bundle, &func)?;
        transport.barrier();
        Ok(Vec::new())
    }
}

fn master<Tp, A, R, F>(
    transport: &Tp,
    bundle: &Bundle<A>,
    func: &F,
    onall: bool,
    p: usize,
    n: usize,
) -> Result<Vec<R>>
where
    Tp: Transport,
    A: Serialize + DeserializeOwned + Clone + Send,
    R: Serialize + DeserializeOwned + Send,
    F: Fn(&[A]) -> R + Sync + Send + Clone,
{
    if p == 1 {
        if !onall {
            return Err(EzmapError::NoWorkersAvailable);
        }
        let results: Vec<R> = (0..n).map(|j| func(&bundle.item(j))).collect();
        transport.barrier();
        return Ok(results);
    }

    let mut results = ResultVec::empty(n);
    let mut next_index = 0usize;
    let mut recvjob = 0usize;
    let mut exited: HashSet<usize> = HashSet::new();

    // Prime one job per worker, tag = w ⇒ slot = w - 1 (tag starts at 1).
    let prime_upper = p.min(n + 1);
    for w in 1..prime_upper {
        transport.send(&next_index, w, w as i32)?;
        next_index += 1;
    }
    let mut remote_outstanding = prime_upper.saturating_sub(1);

    std::thread::scope(|scope| -> Result<()> {
        let (res_tx, res_rx) = mpsc::channel::<(usize, R)>();
        let (job_tx, job_rx) = mpsc::channel::<(usize, Vec<A>)>();

        let local_handle = onall.then(|| {
            let func = func.clone();
            scope.spawn(move || {
                while let Ok((idx, args)) = job_rx.recv() {
                    let value = func(&args);
                    if res_tx.send((idx, value)).is_err() {
                        break;
                    }
                }
            })
        });

        let mut local_busy = false;
        if onall && next_index < n {
            let _ = job_tx.send((next_index, bundle.item(next_index)));
            next_index += 1;
            local_busy = true;
        }

        while recvjob < n {
            if local_busy {
                if let Ok((idx, value)) = res_rx.try_recv() {
                    results.set(idx, value);
                    recvjob += 1;
                    local_busy = false;
                    if next_index < n {
                        let _ = job_tx.send((next_index, bundle.item(next_index)));
                        next_index += 1;
                        local_busy = true;
                    }
                    continue;
                }
            }

            if remote_outstanding > 0 {
                let (value, status): (R, Status) = transport.recv(None, None)?;
                let slot = (status.tag - 1) as usize;
                results.set(slot, value);
                recvjob += 1;
                remote_outstanding -= 1;
                if next_index < n {
                    transport.send(&next_index, status.source, (next_index + 1) as i32)?;
                    next_index += 1;
                    remote_outstanding += 1;
                } else {
                    transport.send(&0usize, status.source, EXIT_TAG)?;
                    exited.insert(status.source);
                }
            } else if local_busy {
                let (idx, value) = res_rx
                    .recv()
                    .map_err(|_| EzmapError::InvariantViolation("local worker channel closed".into()))?;
                results.set(idx, value);
                recvjob += 1;
                local_busy = false;
                if next_index < n {
                    let _ = job_tx.send((next_index, bundle.item(next_index)));
                    next_index += 1;
                    local_busy = true;
                }
            }
        }

        drop(job_tx);
        if let Some(handle) = local_handle {
            handle
                .join()
                .map_err(|_| EzmapError::InvariantViolation("local worker thread panicked".into()))?;
        }
        Ok(())
    })?;

    // Workers never primed (N < P - 1) were left idle; release them now.
    for w in prime_upper..p {
        transport.send(&0usize, w, EXIT_TAG)?;
    }

    transport.barrier();
    results.into_vec()
}

fn worker<Tp, A, R, F>(transport: &Tp, bundle: &Bundle<A>, func: &F) -> Result<()>
where
    Tp: Transport,
    A: Serialize + DeserializeOwned + Clone,
    R: Serialize + DeserializeOwned,
    F: Fn(&[A]) -> R,
{
    loop {
        let (idx, status): (usize, Status) = transport.recv(Some(0), None)?;
        if status.tag == EXIT_TAG {
            break;
        }
        let item = bundle.item(idx);
        let result = func(&item);
        transport.send(&result, 0, status.tag)?;
    }
    Ok(())
}
