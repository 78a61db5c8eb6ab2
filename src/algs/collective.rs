//! Collectives built on point-to-point messages.
//!
//! `all_gather_p2p` runs in two stages, like a neighbor size exchange:
//! every rank first posts its byte count to every peer, then the payload.
//! Every send and receive handle is drained before returning, even when an
//! error is detected part way through.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, expect_exact_len};
use crate::amr_error::AmrError;

/// All-gather of variable-length byte buffers over `comm`.
///
/// Returns one buffer per rank, in rank order; entry `comm.rank()` is a copy
/// of `local`. Fails before any message is posted if `comm` completes
/// receives eagerly.
pub fn all_gather_p2p<C>(comm: &C, tag: CommTag, local: &[u8]) -> Result<Vec<Vec<u8>>, AmrError>
where
    C: Communicator + ?Sized,
{
    let me = comm.rank();
    let size = comm.size();
    if size <= 1 {
        return Ok(vec![local.to_vec()]);
    }
    if !comm.defers_receives() {
        return Err(AmrError::CommError {
            neighbor: me,
            message: "backend completes receives eagerly; it must override the collectives"
                .into(),
        });
    }
    let peers: Vec<usize> = (0..size).filter(|&p| p != me).collect();

    // 1) counts
    let count = WireCount::new(local.len())?;
    let counts = exchange(comm, tag, &peers, bytemuck::bytes_of(&count), |_| {
        std::mem::size_of::<WireCount>()
    })?;
    let mut incoming = vec![0usize; size];
    for (peer, data) in peers.iter().zip(&counts) {
        expect_exact_len(data.len(), std::mem::size_of::<WireCount>()).map_err(|e| {
            AmrError::CommError {
                neighbor: *peer,
                message: format!("size header: {e}"),
            }
        })?;
        let cnt: WireCount = bytemuck::pod_read_unaligned(data);
        incoming[*peer] = cnt.get();
    }

    // 2) payloads
    let payloads = exchange(comm, tag.offset(1), &peers, local, |p| incoming[p])?;
    let mut out = vec![Vec::new(); size];
    out[me] = local.to_vec();
    for (peer, data) in peers.into_iter().zip(payloads) {
        if data.len() != incoming[peer] {
            return Err(AmrError::CommError {
                neighbor: peer,
                message: format!("expected {} payload bytes, got {}", incoming[peer], data.len()),
            });
        }
        out[peer] = data;
    }
    Ok(out)
}

/// Element-wise reduction of `values` over all ranks with `op`.
pub fn all_reduce_p2p<C, F>(comm: &C, values: &[f64], op: F) -> Result<Vec<f64>, AmrError>
where
    C: Communicator + ?Sized,
    F: Fn(f64, f64) -> f64,
{
    let local: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let gathered = comm.all_gather(&local)?;
    let mut acc = values.to_vec();
    for (rank, buf) in gathered.iter().enumerate() {
        if rank == comm.rank() {
            continue;
        }
        if buf.len() != local.len() {
            return Err(AmrError::CommError {
                neighbor: rank,
                message: format!(
                    "reduction over {} values received {} bytes",
                    values.len(),
                    buf.len()
                ),
            });
        }
        for (slot, chunk) in acc.iter_mut().zip(buf.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *slot = op(*slot, f64::from_le_bytes(raw));
        }
    }
    Ok(acc)
}

/// Posts one receive per peer, sends `buf` to every peer, then waits.
/// Results follow `peers` order.
fn exchange<C, L>(
    comm: &C,
    tag: CommTag,
    peers: &[usize],
    buf: &[u8],
    recv_len: L,
) -> Result<Vec<Vec<u8>>, AmrError>
where
    C: Communicator + ?Sized,
    L: Fn(usize) -> usize,
{
    // 1) post all receives
    let mut pending_recvs = Vec::with_capacity(peers.len());
    for &peer in peers {
        let mut scratch = vec![0u8; recv_len(peer)];
        pending_recvs.push((peer, comm.irecv(peer, tag.as_u16(), &mut scratch)));
    }

    // 2) post all sends
    let pending_sends: Vec<_> = peers
        .iter()
        .map(|&peer| comm.isend(peer, tag.as_u16(), buf))
        .collect();

    // 3) wait for all recvs (but do not early-return)
    let mut received = Vec::with_capacity(peers.len());
    let mut maybe_err = None;
    for (peer, h) in pending_recvs {
        match h.wait() {
            Some(data) => received.push(data),
            None if maybe_err.is_none() => {
                maybe_err = Some(AmrError::CommError {
                    neighbor: peer,
                    message: format!("no message from rank {peer} on tag {}", tag.as_u16()),
                });
            }
            None => {}
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(received),
    }
}
