//! Packing box metadata into flat byte buffers and back.
//!
//! The format is documented in [`crate::algs::wire`]: a little-endian `u32`
//! box count followed by fixed 56-byte records. A buffer whose length does
//! not equal `4 + count * 56` is rejected as malformed.

use crate::algs::wire::{WireBox, WireCount};
use crate::amr_error::AmrError;
use crate::topology::amr_box::AmrBox;
use crate::topology::hierarchy::Hierarchy;
use std::mem::size_of;

/// Serializes `boxes` in the given order.
pub fn serialize_boxes(boxes: &[AmrBox]) -> Result<Vec<u8>, AmrError> {
    let mut buf = Vec::with_capacity(size_of::<WireCount>() + boxes.len() * WireBox::SIZE);
    buf.extend_from_slice(bytemuck::bytes_of(&WireCount::new(boxes.len())?));
    for b in boxes {
        buf.extend_from_slice(bytemuck::bytes_of(&WireBox::encode(b)?));
    }
    Ok(buf)
}

/// Serializes the boxes owned by `hierarchy`'s rank, level by level in key
/// order.
pub fn serialize_metadata<G>(hierarchy: &Hierarchy<G>) -> Result<Vec<u8>, AmrError> {
    let rank = hierarchy.rank();
    let local: Vec<AmrBox> = hierarchy
        .all_boxes()
        .filter(|(key, _)| key.rank == rank)
        .map(|(_, b)| *b)
        .collect();
    serialize_boxes(&local)
}

/// Decodes a buffer produced by [`serialize_boxes`].
pub fn deserialize_metadata(buf: &[u8]) -> Result<Vec<AmrBox>, AmrError> {
    let header = size_of::<WireCount>();
    if buf.len() < header {
        return Err(AmrError::MalformedBuffer {
            declared: 0,
            expected_bytes: header,
            found_bytes: buf.len(),
        });
    }
    let count: WireCount = bytemuck::pod_read_unaligned(&buf[..header]);
    let declared = count.get();
    let expected_bytes = declared
        .checked_mul(WireBox::SIZE)
        .and_then(|n| n.checked_add(header));
    if expected_bytes != Some(buf.len()) {
        return Err(AmrError::MalformedBuffer {
            declared,
            expected_bytes: expected_bytes.unwrap_or(usize::MAX),
            found_bytes: buf.len(),
        });
    }
    let records: &[WireBox] = bytemuck::cast_slice(&buf[header..]);
    records.iter().map(WireBox::decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::hierarchy::BlockKey;

    fn sample() -> Vec<AmrBox> {
        vec![
            AmrBox::new(0, [0, 0, 0], [9, 9, 9], [1.0; 3], 0).unwrap(),
            AmrBox::new(1, [4, 4, 4], [11, 11, 11], [0.5; 3], 1).unwrap(),
        ]
    }

    #[test]
    fn empty_list_is_header_only() {
        let buf = serialize_boxes(&[]).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
        assert!(deserialize_metadata(&buf).unwrap().is_empty());
    }

    #[test]
    fn truncated_buffer_is_malformed() {
        let buf = serialize_boxes(&sample()).unwrap();
        assert_eq!(buf.len(), 4 + 2 * 56);
        let err = deserialize_metadata(&buf[..buf.len() - 1]).unwrap_err();
        assert_eq!(
            err,
            AmrError::MalformedBuffer {
                declared: 2,
                expected_bytes: 116,
                found_bytes: 115
            }
        );
        assert!(deserialize_metadata(&buf[..2]).is_err());
    }

    #[test]
    fn only_local_boxes_are_serialized() {
        let mut h: Hierarchy = Hierarchy::new(1);
        let [a, b] = <[AmrBox; 2]>::try_from(sample()).unwrap();
        h.insert_box(BlockKey::new(0, 0), a).unwrap();
        h.insert_box(BlockKey::new(1, 0), b).unwrap();
        let boxes = deserialize_metadata(&serialize_metadata(&h).unwrap()).unwrap();
        assert_eq!(boxes, vec![b]);
    }
}
