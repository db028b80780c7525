//! Wire format of `albumart` replies.
//!
//! ```text
//! size: <total>          binary: 0
//! binary: <n>            OK
//! <n raw bytes>
//! OK
//! ```
//!
//! The trailing `OK` is written by the dispatcher, not here.

use crate::cover::Chunk;

/// Reply to one `albumart` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtReply {
    /// A slice of the image
    Chunk { total_size: u64, data: Vec<u8> },
    /// No art, for whatever reason
    NoArt,
}

impl ArtReply {
    pub fn from_chunk(chunk: &Chunk<'_>) -> Self {
        ArtReply::Chunk {
            total_size: chunk.total_size,
            data: chunk.data.to_vec(),
        }
    }

    /// Number of payload bytes carried.
    pub fn binary_len(&self) -> usize {
        match self {
            ArtReply::Chunk { data, .. } => data.len(),
            ArtReply::NoArt => 0,
        }
    }

    /// Append the reply fields and payload to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            ArtReply::Chunk { total_size, data } => {
                out.extend_from_slice(format!("size: {}\n", total_size).as_bytes());
                out.extend_from_slice(format!("binary: {}\n", data.len()).as_bytes());
                out.extend_from_slice(data);
                out.push(b'\n');
            }
            ArtReply::NoArt => out.extend_from_slice(b"binary: 0\n"),
        }
    }
}
