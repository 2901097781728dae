use log::debug;

use crate::common::{PaxError, Result, Rid};

use super::{AttrInfo, Record, RecordFile};

/// Forward cursor over a relation file that projects each record onto a
/// subset of its attributes.
///
/// The scan borrows the file it runs over, so the file cannot be modified or
/// closed while the scan is alive. Records come out in ascending rid order.
pub struct RecordFileScan<'a> {
    file: Option<&'a RecordFile>,
    cursor: Option<Rid>,
    /// (offset in the raw record, length) for each projected attribute
    projection: Vec<(usize, usize)>,
    projected_size: usize,
}

impl<'a> RecordFileScan<'a> {
    pub fn new() -> Self {
        Self {
            file: None,
            cursor: None,
            projection: Vec::new(),
            projected_size: 0,
        }
    }

    /// Binds the scan to `file` and positions it before the first record.
    ///
    /// `attrs` are matched to the relation's attributes by name and emitted
    /// in the order given; an empty list selects every attribute.
    pub fn open_scan(&mut self, file: &'a RecordFile, attrs: &[AttrInfo]) -> Result<()> {
        let relation = file.attributes();
        let projection = if attrs.is_empty() {
            let mut offset = 0;
            relation
                .iter()
                .map(|attr| {
                    let entry = (offset, attr.byte_length());
                    offset += attr.byte_length();
                    entry
                })
                .collect()
        } else {
            attrs
                .iter()
                .map(|wanted| {
                    let mut offset = 0;
                    for attr in relation {
                        if attr.attr_name() == wanted.attr_name() {
                            return Ok((offset, attr.byte_length()));
                        }
                        offset += attr.byte_length();
                    }
                    Err(PaxError::UnknownAttribute(wanted.attr_name().to_string()))
                })
                .collect::<Result<Vec<_>>>()?
        };

        self.projected_size = projection.iter().map(|&(_, len)| len).sum();
        self.projection = projection;
        self.file = Some(file);
        self.cursor = None;
        debug!(
            "opened scan over {} attributes, {} bytes per row",
            self.projection.len(),
            self.projected_size
        );
        Ok(())
    }

    /// Returns the next live record, projected, or `None` once the file is
    /// exhausted.
    pub fn get_next_record(&mut self) -> Result<Option<Record>> {
        let file = self.file.ok_or(PaxError::InvalidHandle)?;
        let next = match self.cursor {
            None => file.get_first_record()?,
            Some(rid) => file.get_next_record(rid)?,
        };
        let Some(record) = next else {
            return Ok(None);
        };

        self.cursor = Some(record.rid());
        let mut row = Vec::with_capacity(self.projected_size);
        for &(offset, len) in &self.projection {
            row.extend_from_slice(&record.data()[offset..offset + len]);
        }
        Ok(Some(Record::new(record.rid(), row)))
    }

    /// Ends the scan. The scan holds no page pins between calls, so there is
    /// nothing to release.
    pub fn close_scan(&mut self) {}
}

impl Default for RecordFileScan<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for RecordFileScan<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_next_record().transpose()
    }
}
