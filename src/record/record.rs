use crate::common::Rid;

/// A record read out of a relation file.
///
/// The bytes are an owned copy of the page contents: changing or deleting the
/// stored record later does not affect a `Record` already handed out, and
/// changes to a `Record` only reach the file through `update_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    rid: Rid,
    data: Vec<u8>,
}

impl Record {
    pub fn new(rid: Rid, data: Vec<u8>) -> Self {
        Self { rid, data }
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    /// Attribute values concatenated in schema (or projection) order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of `RecordFile::update_record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// The slot held a live record and was overwritten.
    Applied,
    /// The slot was free; nothing was written.
    Ignored,
}
