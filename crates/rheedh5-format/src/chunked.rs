//! Reassembly of chunked dataset storage into a contiguous row-major
//! buffer. No filter pipeline: RHEED acquisitions store frames raw.

use crate::btree_v1::ChunkInfo;
use crate::error::{ensure_len, FormatError};

/// Copy every chunk into its place in a freshly allocated buffer of the
/// full dataset extent. `dims` and `chunk_dims` are the spatial extents
/// (no element-size dimension); `elem_size` is the datatype size.
pub fn read_chunked_data(
    file: &[u8],
    dims: &[u64],
    chunk_dims: &[u64],
    elem_size: usize,
    chunks: &[ChunkInfo],
) -> Result<Vec<u8>, FormatError> {
    if dims.len() != chunk_dims.len() {
        return Err(FormatError::InvalidMessage {
            what: "data layout",
            detail: format!(
                "chunk rank {} does not match dataset rank {}",
                chunk_dims.len(),
                dims.len()
            ),
        });
    }
    let total: u64 = dims.iter().product::<u64>() * elem_size as u64;
    let mut out = vec![0u8; total as usize];
    let ds_strides = row_major_strides(dims, elem_size);
    let chunk_strides = row_major_strides(chunk_dims, elem_size);

    for chunk in chunks {
        if chunk.offsets.len() != dims.len() + 1 {
            return Err(FormatError::InvalidMessage {
                what: "data layout",
                detail: format!(
                    "chunk key has {} offsets for rank-{} dataset",
                    chunk.offsets.len(),
                    dims.len()
                ),
            });
        }
        let start = chunk.address as usize;
        ensure_len(file, start + chunk.size as usize)?;
        let src = &file[start..start + chunk.size as usize];
        copy_chunk_to_output(src, &chunk.offsets, dims, chunk_dims, &ds_strides, &chunk_strides, elem_size, &mut out)?;
    }
    Ok(out)
}

fn row_major_strides(dims: &[u64], elem_size: usize) -> Vec<u64> {
    let mut strides = vec![elem_size as u64; dims.len()];
    for d in (0..dims.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * dims[d + 1];
    }
    strides
}

#[allow(clippy::too_many_arguments)]
fn copy_chunk_to_output(
    src: &[u8],
    offsets: &[u64],
    dims: &[u64],
    chunk_dims: &[u64],
    ds_strides: &[u64],
    chunk_strides: &[u64],
    elem_size: usize,
    out: &mut [u8],
) -> Result<(), FormatError> {
    let rank = dims.len();
    // Edge chunks may extend past the dataset bounds; clip each axis.
    let mut extent = vec![0u64; rank];
    for d in 0..rank {
        if offsets[d] >= dims[d] {
            return Err(FormatError::InvalidMessage {
                what: "data layout",
                detail: format!("chunk offset {} outside extent {}", offsets[d], dims[d]),
            });
        }
        extent[d] = chunk_dims[d].min(dims[d] - offsets[d]);
    }
    let last = rank - 1;
    let run = (extent[last] * elem_size as u64) as usize;

    let mut idx = vec![0u64; rank.saturating_sub(1)];
    loop {
        let mut src_off = 0u64;
        let mut dst_off = 0u64;
        for d in 0..last {
            src_off += idx[d] * chunk_strides[d];
            dst_off += (offsets[d] + idx[d]) * ds_strides[d];
        }
        dst_off += offsets[last] * ds_strides[last];
        let src_off = src_off as usize;
        let dst_off = dst_off as usize;
        ensure_len(src, src_off + run)?;
        out[dst_off..dst_off + run].copy_from_slice(&src[src_off..src_off + run]);

        // Odometer over all axes but the innermost.
        let mut d = last;
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < extent[d] {
                break;
            }
            idx[d] = 0;
        }
    }
}
