//! Scatter–gather strategy (spec §4.4): static equal-share partition,
//! compute locally, single gather.

use serde::de::DeserializeOwned;
use serde::Serialize;

use ezmap_partition::{self, Skip};
use ezmap_transport::{Status, Transport};

use crate::bundle::Bundle;
use crate::error::Result;
use crate::ResultVec;

pub fn run<Tp, A, R, F>(transport: &Tp, bundle: &Bundle<A>, func: F, onall: bool) -> Result<Vec<R>>
where
    Tp: Transport,
    A: Serialize + DeserializeOwned + Clone,
    R: Serialize + DeserializeOwned + Clone,
    F: Fn(&[A]) -> R,
{
    let p = transport.size();
    let rank = transport.rank();
    let n = bundle.len();

    if p == 1 {
        let results: Vec<R> = (0..n).map(|j| func(&bundle.item(j))).collect();
        transport.barrier();
        return Ok(results);
    }

    // onall=false excludes the master from the compute fabric (spec §4.4
    // edge case "skip = master"); onall=true gives every rank, including
    // the master, a share via the plain flat partition.
    let skip = if onall { Skip::None } else { Skip::Rank(0) };

    // Collective: every rank must call this once, in the same order, so
    // scatter traffic cannot collide with unrelated traffic on `transport`.
    let private = transport.clone_channel()?;

    if rank == 0 {
        for w in 1..p {
            let r = ezmap_partition::range(w, p, n, skip);
            let slice = bundle.slice(r.begin, r.end);
            private.send(&slice, w, 0)?;
        }
    }

    let my_range = ezmap_partition::range(rank, p, n, skip);
    let my_slice: Vec<Vec<A>> = if rank == 0 {
        bundle.slice(my_range.begin, my_range.end)
    } else {
        let (slice, _status): (Vec<Vec<A>>, Status) = private.recv(Some(0), Some(0))?;
        slice
    };

    let local_results: Vec<R> = (0..my_range.len())
        .map(|j| func(&ezmap_partition::lookup_item(&my_slice, j)))
        .collect();

    let mut results = ResultVec::empty(n);
    if rank == 0 {
        for (offset, value) in local_results.into_iter().enumerate() {
            results.set(my_range.begin + offset, value);
        }
        for _ in 1..p {
            let (payload, status): (Vec<R>, Status) = transport.recv(None, None)?;
            let sender_range = ezmap_partition::range(status.source, p, n, skip);
            for (offset, value) in payload.into_iter().enumerate() {
                results.set(sender_range.begin + offset, value);
            }
        }
    } else {
        transport.send(&local_results, 0, rank as i32)?;
    }

    transport.barrier();
    if rank == 0 {
        results.into_vec()
    } else {
        Ok(Vec::new())
    }
}
