//! Multi-document YAML stream splitting
//!
//! Documents are separated by a line holding only `---`. Each chunk is
//! decoded on its own so one malformed document never hides the others.

use crate::resource::{DecodeError, Resource};

const SEPARATOR: &[u8] = b"---";

/// Split a stream on separator lines.
///
/// Empty chunks are kept so chunk positions match document positions in
/// the source, e.g. a leading `---` yields an empty chunk 0.
pub fn split_documents(bytes: &[u8]) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut line_start = 0;

    while line_start < bytes.len() {
        let line_end = bytes[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| line_start + p);

        if bytes[line_start..line_end].trim_ascii_end() == SEPARATOR {
            chunks.push(&bytes[start..line_start]);
            start = (line_end + 1).min(bytes.len());
        }
        line_start = line_end + 1;
    }

    chunks.push(&bytes[start..]);
    chunks
}

/// A decoded chunk with its zero-based position in the stream
#[derive(Debug)]
pub struct Document {
    pub index: usize,
    /// `Ok(None)` for chunks without content
    pub decoded: Result<Option<Resource>, DecodeError>,
}

/// Split `bytes` and decode every chunk
pub fn decode_documents(bytes: &[u8]) -> impl Iterator<Item = Document> + '_ {
    split_documents(bytes)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| Document {
            index,
            decoded: Resource::decode(chunk),
        })
}
