//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are **waitable**: callers `.wait()` before they
//! trust a received buffer. The collectives used by the metadata pipeline
//! (`all_gather`, `all_reduce_min`, `all_reduce_max`, `barrier`) have
//! default implementations on top of point-to-point messages, see
//! [`crate::algs::collective`]; backends with native collectives override
//! them. The defaults need receives that complete in `wait`; backends
//! reporting `defers_receives() == false` get an error from them instead of
//! a deadlock.
//!
//! Every collective is blocking and must be entered by all ranks in the
//! same order.

use crate::algs::collective;
use crate::amr_error::AmrError;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Message tag. Collectives use two consecutive tags (count, payload).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Tag pair used by the default `all_gather`.
    pub const ALL_GATHER: CommTag = CommTag(0xA3D0);

    #[inline]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `n` steps after this one, wrapping at `u16::MAX`.
    #[inline]
    pub const fn offset(self, n: u16) -> Self {
        Self(self.0.wrapping_add(n))
    }
}

/// Rank-aware communication interface.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// `buf.len()` is the maximum number of bytes accepted; longer messages
    /// are truncated.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// True if `irecv` only posts the receive and the data is collected in
    /// `wait`. The default collectives post every receive before any send,
    /// so a backend that receives eagerly must return `false` here and
    /// override all four collectives.
    fn defers_receives(&self) -> bool {
        true
    }

    /// Every rank's `local` buffer, in rank order.
    fn all_gather(&self, local: &[u8]) -> Result<Vec<Vec<u8>>, AmrError> {
        collective::all_gather_p2p(self, CommTag::ALL_GATHER, local)
    }

    /// Element-wise minimum of `values` over all ranks.
    fn all_reduce_min(&self, values: &[f64]) -> Result<Vec<f64>, AmrError> {
        collective::all_reduce_p2p(self, values, f64::min)
    }

    /// Element-wise maximum of `values` over all ranks.
    fn all_reduce_max(&self, values: &[f64]) -> Result<Vec<f64>, AmrError> {
        collective::all_reduce_p2p(self, values, f64::max)
    }

    /// Returns once every rank has entered the barrier.
    fn barrier(&self) -> Result<(), AmrError> {
        self.all_gather(&[]).map(|_| ())
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// No-op comm for serial runs: a single rank that never communicates.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = DashMap<Key, VecDeque<Bytes>>;

/// Receive handle of [`RayonComm`]; `wait` blocks until the message lands.
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    max_len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            let msg = self
                .mailbox
                .get_mut(&self.key)
                .and_then(|mut queue| queue.pop_front());
            if let Some(bytes) = msg {
                let n = bytes.len().min(self.max_len);
                return Some(bytes[..n].to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// Ranks simulated by threads of one process, sharing a FIFO mailbox per
/// `(src, dst, tag)`.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl RayonComm {
    /// One communicator per rank of a fresh group of `size` ranks.
    pub fn group(size: usize) -> Vec<RayonComm> {
        let mailbox = Arc::new(Mailbox::new());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .entry((self.rank, peer, tag))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            max_len: buf.len(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use crate::amr_error::AmrError;
    use mpi::Count;
    use mpi::collective::SystemOperation;
    use mpi::datatype::PartitionMut;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// `MPI_COMM_WORLD` with native collectives.
    ///
    /// Point-to-point calls are blocking, so `irecv` returns a completed
    /// handle and the default p2p collectives are refused. All four
    /// collectives are native.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initializes MPI. Fails if it is already initialized.
        pub fn new() -> Result<Self, AmrError> {
            let universe = mpi::initialize().ok_or_else(|| AmrError::CommError {
                neighbor: 0,
                message: "MPI is already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    /// Completed MPI operation (blocking backend).
    pub struct MpiHandle(Option<Vec<u8>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, i32::from(tag));
            MpiHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiHandle {
            let (mut msg, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(i32::from(tag));
            msg.truncate(buf.len());
            MpiHandle(Some(msg))
        }

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn defers_receives(&self) -> bool {
            false
        }

        fn all_gather(&self, local: &[u8]) -> Result<Vec<Vec<u8>>, AmrError> {
            let local_count = Count::try_from(local.len()).map_err(|_| AmrError::CommError {
                neighbor: self.rank,
                message: format!("{} bytes exceed the MPI count range", local.len()),
            })?;
            let mut counts: Vec<Count> = vec![0; self.size];
            self.world.all_gather_into(&local_count, &mut counts[..]);
            let displs: Vec<Count> = counts
                .iter()
                .scan(0, |acc, &c| {
                    let d = *acc;
                    *acc += c;
                    Some(d)
                })
                .collect();
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut gathered = vec![0u8; total];
            {
                let mut partition =
                    PartitionMut::new(&mut gathered[..], &counts[..], &displs[..]);
                self.world.all_gather_varcount_into(local, &mut partition);
            }
            Ok(counts
                .iter()
                .zip(&displs)
                .map(|(&c, &d)| gathered[d as usize..(d + c) as usize].to_vec())
                .collect())
        }

        fn all_reduce_min(&self, values: &[f64]) -> Result<Vec<f64>, AmrError> {
            let mut out = vec![0.0; values.len()];
            self.world
                .all_reduce_into(values, &mut out[..], SystemOperation::min());
            Ok(out)
        }

        fn all_reduce_max(&self, values: &[f64]) -> Result<Vec<f64>, AmrError> {
            let mut out = vec![0.0; values.len()];
            self.world
                .all_reduce_into(values, &mut out[..], SystemOperation::max());
            Ok(out)
        }

        fn barrier(&self) -> Result<(), AmrError> {
            self.world.barrier();
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
