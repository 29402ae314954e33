//! Transport adapter: the narrow point-to-point capability set the pool and
//! scatter strategies are written against (spec §4.1).
//!
//! Two implementations are provided. [`LocalTransport`] is an in-process,
//! thread-based stand-in used by tests and `RunMode::DebugDryRun` — there is
//! no MPI runtime available in this environment. [`mpi_backend::MpiTransport`]
//! (feature `mpi`) is the production implementation, a thin `bincode`-over-
//! `rsmpi` wrapper, the direct analog of pyina patching `dill` into
//! `mpi4py`'s pickle hooks (see `mpi_pool.py`'s module header) — except done
//! via explicit encode/decode at the call site rather than monkey-patching
//! the transport's serializer.

use std::collections::VecDeque;
use std::sync::{Arc, Barrier, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message payload")]
    Encode(#[source] Box<bincode::ErrorKind>),
    #[error("failed to decode message payload")]
    Decode(#[source] Box<bincode::ErrorKind>),
    #[error("transport channel closed unexpectedly (rank {rank})")]
    ChannelClosed { rank: usize },
    #[cfg(feature = "mpi")]
    #[error("MPI operation failed: {0}")]
    Mpi(String),
}

/// Source/tag metadata for a received message, mirroring `MPI_Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub source: usize,
    pub tag: i32,
}

/// Reserved tag marking worker termination in the pool strategy (spec §4.1,
/// §6).
pub const EXIT_TAG: i32 = 0;

/// The capability surface consumed by the strategies in `ezmap-core`. All
/// operations are blocking; there is no non-blocking/async send in the core
/// (spec §5).
pub trait Transport: Send + Sync {
    fn size(&self) -> usize;
    fn rank(&self) -> usize;

    fn send<T: Serialize>(&self, payload: &T, dest: usize, tag: i32) -> Result<(), TransportError>;

    /// `source = None` behaves as `MPI_ANY_SOURCE`; `tag = None` as
    /// `MPI_ANY_TAG`.
    fn recv<T: DeserializeOwned>(
        &self,
        source: Option<usize>,
        tag: Option<i32>,
    ) -> Result<(T, Status), TransportError>;

    fn bcast<T: Serialize + DeserializeOwned + Clone>(
        &self,
        payload: Option<T>,
        root: usize,
    ) -> Result<T, TransportError>;

    fn barrier(&self);

    /// Duplicate the communicator so that this rank's traffic on the
    /// returned handle cannot collide with traffic on `self` (spec §4.1,
    /// §4.4 rationale). Collective: every rank must call this the same
    /// number of times in the same order.
    fn clone_channel(&self) -> Result<Self, TransportError>
    where
        Self: Sized;
}

fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>, TransportError> {
    bincode::serialize(payload).map_err(TransportError::Encode)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    bincode::deserialize(bytes).map_err(TransportError::Decode)
}

struct Envelope {
    source: usize,
    tag: i32,
    bytes: Vec<u8>,
}

/// One rank's view of an in-process "world": every rank has an unbounded
/// inbox; `send` pushes directly into the destination's inbox.
struct World {
    senders: Vec<crossbeam_channel::Sender<Envelope>>,
    receivers: Vec<crossbeam_channel::Receiver<Envelope>>,
}

impl World {
    fn new(size: usize) -> Self {
        let mut senders = Vec::with_capacity(size);
        let mut receivers = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = crossbeam_channel::unbounded();
            senders.push(tx);
            receivers.push(rx);
        }
        World { senders, receivers }
    }
}

/// Shared handshake state used to make `clone_channel` collective: the first
/// rank to call it publishes a freshly built `World`; every rank reads that
/// same world before it is reset for the next call.
struct CloneSlot {
    published: Mutex<Option<Arc<World>>>,
    publish_barrier: Barrier,
    consumed_barrier: Barrier,
}

/// In-process, thread-based [`Transport`] for tests and debug-dry-run mode.
/// Not a substitute for [`mpi_backend::MpiTransport`] in production —
/// ranks here are threads within one OS process, sharing no resemblance to
/// the cluster topology the real transport runs on.
pub struct LocalTransport {
    rank: usize,
    world: Arc<World>,
    pending: Mutex<VecDeque<Envelope>>,
    barrier: Arc<Barrier>,
    clone_slot: Arc<CloneSlot>,
}

impl LocalTransport {
    /// Build one `LocalTransport` handle per rank, ready to be moved into
    /// `size` separate threads.
    pub fn world(size: usize) -> Vec<LocalTransport> {
        assert!(size > 0, "a world needs at least one rank");
        let world = Arc::new(World::new(size));
        let barrier = Arc::new(Barrier::new(size));
        let clone_slot = Arc::new(CloneSlot {
            published: Mutex::new(None),
            publish_barrier: Barrier::new(size),
            consumed_barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| LocalTransport {
                rank,
                world: world.clone(),
                pending: Mutex::new(VecDeque::new()),
                barrier: barrier.clone(),
                clone_slot: clone_slot.clone(),
            })
            .collect()
    }

    fn take_matching(&self, source: Option<usize>, tag: Option<i32>) -> Option<Envelope> {
        let mut pending = self.pending.lock().unwrap();
        if let Some(pos) = pending.iter().position(|e| matches(e, source, tag)) {
            return pending.remove(pos);
        }
        None
    }
}

fn matches(envelope: &Envelope, source: Option<usize>, tag: Option<i32>) -> bool {
    source.map(|s| s == envelope.source).unwrap_or(true)
        && tag.map(|t| t == envelope.tag).unwrap_or(true)
}

impl Transport for LocalTransport {
    fn size(&self) -> usize {
        self.world.senders.len()
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn send<T: Serialize>(&self, payload: &T, dest: usize, tag: i32) -> Result<(), TransportError> {
        let bytes = encode(payload)?;
        self.world.senders[dest]
            .send(Envelope { source: self.rank, tag, bytes })
            .map_err(|_| TransportError::ChannelClosed { rank: dest })
    }

    fn recv<T: DeserializeOwned>(
        &self,
        source: Option<usize>,
        tag: Option<i32>,
    ) -> Result<(T, Status), TransportError> {
        if let Some(envelope) = self.take_matching(source, tag) {
            let status = Status { source: envelope.source, tag: envelope.tag };
            return Ok((decode(&envelope.bytes)?, status));
        }
        let inbox = &self.world.receivers[self.rank];
        loop {
            let envelope = inbox
                .recv()
                .map_err(|_| TransportError::ChannelClosed { rank: self.rank })?;
            if matches(&envelope, source, tag) {
                let status = Status { source: envelope.source, tag: envelope.tag };
                return Ok((decode(&envelope.bytes)?, status));
            }
            self.pending.lock().unwrap().push_back(envelope);
        }
    }

    fn bcast<T: Serialize + DeserializeOwned + Clone>(
        &self,
        payload: Option<T>,
        root: usize,
    ) -> Result<T, TransportError> {
        if self.rank == root {
            let value = payload.expect("bcast root must supply a payload");
            for dest in 0..self.size() {
                if dest != root {
                    self.send(&value, dest, EXIT_TAG + 1)?;
                }
            }
            self.barrier();
            Ok(value)
        } else {
            let (value, _status) = self.recv(Some(root), Some(EXIT_TAG + 1))?;
            self.barrier();
            Ok(value)
        }
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn clone_channel(&self) -> Result<Self, TransportError> {
        {
            let mut slot = self.clone_slot.published.lock().unwrap();
            if slot.is_none() {
                *slot = Some(Arc::new(World::new(self.size())));
            }
        }
        self.clone_slot.publish_barrier.wait();

        let new_world = self.clone_slot.published.lock().unwrap().as_ref().unwrap().clone();
        let cloned = LocalTransport {
            rank: self.rank,
            world: new_world,
            pending: Mutex::new(VecDeque::new()),
            barrier: Arc::new(Barrier::new(self.size())),
            clone_slot: Arc::new(CloneSlot {
                published: Mutex::new(None),
                publish_barrier: Barrier::new(self.size()),
                consumed_barrier: Barrier::new(self.size()),
            }),
        };

        self.clone_slot.consumed_barrier.wait();
        if self.rank == 0 {
            *self.clone_slot.published.lock().unwrap() = None;
        }
        Ok(cloned)
    }
}

#[cfg(feature = "mpi")]
pub mod mpi_backend {
    //! Production [`Transport`] over a real MPI implementation via the
    //! `mpi` crate (`rsmpi`), the Rust analog of `mpi4py`.

    use super::*;
    use mpi::datatype::PartitionMut;
    use mpi::point_to_point as p2p;
    use mpi::topology::{Communicator, SimpleCommunicator};
    use mpi::traits::*;

    pub struct MpiTransport {
        world: SimpleCommunicator,
    }

    impl MpiTransport {
        /// Initialize MPI (idempotent per process) and return a transport
        /// bound to `MPI_COMM_WORLD`.
        pub fn new() -> Result<Self, TransportError> {
            let _universe = mpi::initialize()
                .ok_or_else(|| TransportError::Mpi("MPI already initialized".into()))?;
            Ok(MpiTransport { world: mpi::environment::world() })
        }
    }

    impl Transport for MpiTransport {
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn rank(&self) -> usize {
            self.world.rank() as usize
        }

        fn send<T: Serialize>(&self, payload: &T, dest: usize, tag: i32) -> Result<(), TransportError> {
            let bytes = encode(payload)?;
            self.world
                .process_at_rank(dest as i32)
                .send_with_tag(&bytes[..], tag);
            Ok(())
        }

        fn recv<T: DeserializeOwned>(
            &self,
            source: Option<usize>,
            tag: Option<i32>,
        ) -> Result<(T, Status), TransportError> {
            let source_rank = source.map(|s| s as i32).unwrap_or(p2p::any_source().rank());
            let tag = tag.unwrap_or(p2p::Tag::from(p2p::any_tag()));
            let (bytes, status): (Vec<u8>, p2p::Status) = self
                .world
                .process_at_rank(source_rank)
                .receive_vec_with_tag(tag);
            let decoded = decode(&bytes)?;
            Ok((decoded, Status { source: status.source_rank() as usize, tag: status.tag() }))
        }

        fn bcast<T: Serialize + DeserializeOwned + Clone>(
            &self,
            payload: Option<T>,
            root: usize,
        ) -> Result<T, TransportError> {
            let mut bytes = if self.rank() == root {
                encode(&payload.expect("bcast root must supply a payload"))?
            } else {
                Vec::new()
            };
            let mut len = bytes.len();
            self.world.process_at_rank(root as i32).broadcast_into(&mut len);
            if self.rank() != root {
                bytes.resize(len, 0);
            }
            self.world.process_at_rank(root as i32).broadcast_into(&mut bytes[..]);
            decode(&bytes)
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn clone_channel(&self) -> Result<Self, TransportError> {
            Ok(MpiTransport { world: self.world.duplicate() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::thread;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Ping(u32);

    #[test]
    fn point_to_point_preserves_tag_and_source() {
        let mut world = LocalTransport::world(2);
        let t1 = world.pop().unwrap();
        let t0 = world.pop().unwrap();

        let h1 = thread::spawn(move || {
            let (msg, status): (Ping, Status) = t1.recv(None, None).unwrap();
            (msg, status)
        });
        t0.send(&Ping(42), 1, 7).unwrap();
        let (msg, status) = h1.join().unwrap();
        assert_eq!(msg, Ping(42));
        assert_eq!(status, Status { source: 0, tag: 7 });
    }

    #[test]
    fn barrier_synchronizes_all_ranks() {
        let world = LocalTransport::world(4);
        let handles: Vec<_> = world
            .into_iter()
            .map(|t| thread::spawn(move || t.barrier()))
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn bcast_delivers_to_every_rank() {
        let world = LocalTransport::world(3);
        let handles: Vec<_> = world
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    let payload = if t.rank() == 0 { Some(Ping(99)) } else { None };
                    t.bcast(payload, 0).unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), Ping(99));
        }
    }

    #[test]
    fn cloned_channel_does_not_cross_talk_with_parent() {
        let world = LocalTransport::world(2);
        let handles: Vec<_> = world
            .into_iter()
            .map(|t| {
                thread::spawn(move || {
                    let cloned = t.clone_channel().unwrap();
                    if t.rank() == 0 {
                        t.send(&Ping(1), 1, 1).unwrap();
                        cloned.send(&Ping(2), 1, 1).unwrap();
                    } else {
                        let (on_clone, _): (Ping, _) = cloned.recv(None, None).unwrap();
                        let (on_parent, _): (Ping, _) = t.recv(None, None).unwrap();
                        assert_eq!(on_clone, Ping(2));
                        assert_eq!(on_parent, Ping(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
