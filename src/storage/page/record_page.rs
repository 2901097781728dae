use crate::common::bitmap;
use crate::common::{PaxError, Result, SlotId, PAGE_SIZE};

/// Record page layout (PAX): every attribute gets its own mini-page and all
/// mini-pages share one occupancy header.
///
/// +-----------------------+
/// | Occupancy header      |  header_size bytes, one bit per slot, MSB-first
/// +-----------------------+
/// | Mini-page 0           |  mini_page_size bytes
/// | [slot 0][slot 1]...   |  fixed stride of step_range bytes
/// +-----------------------+
/// | Mini-page 1           |
/// | ...                   |
/// +-----------------------+
///
/// Every attribute uses the widest attribute's length as its stride, so slot
/// `s` of attribute `i` always starts at `mini_page_start[i] + s * step_range`.
/// Only the first `attr_length[i]` bytes of that stride hold data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    attr_lengths: Vec<usize>,
    record_size: usize,
    step_range: usize,
    slots_per_page: usize,
    header_size: usize,
    mini_page_size: usize,
    mini_page_start: Vec<usize>,
    /// Header contents of a page with no live record. Bits of slots that do
    /// not exist are set so they never look free.
    empty_header: Vec<u8>,
}

impl PageLayout {
    /// Derives the page geometry for a relation from its attribute byte lengths.
    pub fn new(attr_lengths: &[usize]) -> Result<Self> {
        if attr_lengths.is_empty() {
            return Err(PaxError::InvalidSchema(
                "relation has no attributes".to_string(),
            ));
        }
        if attr_lengths.contains(&0) {
            return Err(PaxError::InvalidSchema(
                "attribute byte length must be positive".to_string(),
            ));
        }

        let count = attr_lengths.len();
        let step_range = attr_lengths.iter().copied().max().unwrap_or(1);
        let nominal_slots = (PAGE_SIZE / step_range) / count;
        let header_size = nominal_slots.div_ceil(8);
        let mini_page_size = (PAGE_SIZE - header_size) / count;
        // The header eats into the page, so a mini-page may hold fewer strides
        // than the nominal slot count
        let slots_per_page = nominal_slots.min(mini_page_size / step_range);
        if slots_per_page == 0 {
            return Err(PaxError::InvalidSchema(format!(
                "{} attributes with a {}-byte stride do not fit in one page",
                count, step_range
            )));
        }

        let mini_page_start = (0..count)
            .map(|i| i * mini_page_size + header_size)
            .collect();

        let mut empty_header = vec![0u8; header_size];
        for slot in slots_per_page..header_size * 8 {
            bitmap::set(&mut empty_header, slot, true);
        }

        Ok(Self {
            attr_lengths: attr_lengths.to_vec(),
            record_size: attr_lengths.iter().sum(),
            step_range,
            slots_per_page,
            header_size,
            mini_page_size,
            mini_page_start,
            empty_header,
        })
    }

    /// Length of a raw record: the sum of all attribute lengths.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn step_range(&self) -> usize {
        self.step_range
    }

    /// Number of usable slots on each record page.
    pub fn slots_per_page(&self) -> usize {
        self.slots_per_page
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn mini_page_size(&self) -> usize {
        self.mini_page_size
    }

    pub fn mini_page_start(&self, attr: usize) -> usize {
        self.mini_page_start[attr]
    }

    pub fn empty_header(&self) -> &[u8] {
        &self.empty_header
    }

    /// The final header byte of an empty page.
    pub fn last_header_byte(&self) -> u8 {
        self.empty_header[self.header_size - 1]
    }

    /// Byte offset of attribute `attr` of slot `slot` within the page.
    pub fn slot_offset(&self, attr: usize, slot: SlotId) -> usize {
        self.mini_page_start[attr] + self.step_range * slot.as_usize()
    }

    pub fn contains_slot(&self, slot: SlotId) -> bool {
        slot.as_usize() < self.slots_per_page
    }

    fn header<'p>(&self, page: &'p [u8]) -> &'p [u8] {
        &page[..self.header_size]
    }

    pub fn is_occupied(&self, page: &[u8], slot: SlotId) -> bool {
        debug_assert!(self.contains_slot(slot));
        bitmap::get(self.header(page), slot.as_usize())
    }

    /// True when no slot is free.
    pub fn is_full(&self, page: &[u8]) -> bool {
        bitmap::all_set(self.header(page))
    }

    /// True when no slot holds a live record.
    pub fn is_empty(&self, page: &[u8]) -> bool {
        self.header(page) == &self.empty_header[..]
    }

    pub fn first_free_slot(&self, page: &[u8]) -> Option<SlotId> {
        bitmap::first_clear(self.header(page), self.slots_per_page)
            .map(|slot| SlotId::new(slot as u16))
    }

    /// Lowest occupied slot numbered `from` or higher.
    pub fn next_occupied(&self, page: &[u8], from: usize) -> Option<SlotId> {
        bitmap::next_set(self.header(page), from, self.slots_per_page)
            .map(|slot| SlotId::new(slot as u16))
    }

    pub fn occupied_count(&self, page: &[u8]) -> usize {
        bitmap::count_set(self.header(page), self.slots_per_page)
    }

    /// Gathers the slot's bytes from every mini-page into one owned row.
    pub fn read_record(&self, page: &[u8], slot: SlotId) -> Vec<u8> {
        let mut row = Vec::with_capacity(self.record_size);
        for (attr, &len) in self.attr_lengths.iter().enumerate() {
            let start = self.slot_offset(attr, slot);
            row.extend_from_slice(&page[start..start + len]);
        }
        row
    }
}

/// Mutable view of one record page.
pub struct RecordPage<'a> {
    layout: &'a PageLayout,
    data: &'a mut [u8],
}

impl<'a> RecordPage<'a> {
    /// The buffer must be exactly PAGE_SIZE bytes.
    pub fn new(layout: &'a PageLayout, data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { layout, data }
    }

    /// Resets the header to the empty pattern. Slot bytes are left as they are.
    pub fn init(&mut self) {
        let header_size = self.layout.header_size;
        self.data[..header_size].copy_from_slice(&self.layout.empty_header);
    }

    pub fn is_occupied(&self, slot: SlotId) -> bool {
        self.layout.is_occupied(&*self.data, slot)
    }

    pub fn set_occupied(&mut self, slot: SlotId, occupied: bool) {
        debug_assert!(self.layout.contains_slot(slot));
        bitmap::set(
            &mut self.data[..self.layout.header_size],
            slot.as_usize(),
            occupied,
        );
    }

    pub fn is_full(&self) -> bool {
        self.layout.is_full(&*self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty(&*self.data)
    }

    pub fn first_free_slot(&self) -> Option<SlotId> {
        self.layout.first_free_slot(&*self.data)
    }

    pub fn read_record(&self, slot: SlotId) -> Vec<u8> {
        self.layout.read_record(&*self.data, slot)
    }

    /// Scatters a raw record across the mini-pages. Does not touch the header.
    pub fn write_record(&mut self, slot: SlotId, raw: &[u8]) {
        debug_assert_eq!(raw.len(), self.layout.record_size);
        let mut pos = 0;
        for (attr, &len) in self.layout.attr_lengths.iter().enumerate() {
            let start = self.layout.slot_offset(attr, slot);
            self.data[start..start + len].copy_from_slice(&raw[pos..pos + len]);
            pos += len;
        }
    }
}

/// Read-only view of one record page.
pub struct RecordPageRef<'a> {
    layout: &'a PageLayout,
    data: &'a [u8],
}

impl<'a> RecordPageRef<'a> {
    pub fn new(layout: &'a PageLayout, data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { layout, data }
    }

    pub fn is_occupied(&self, slot: SlotId) -> bool {
        self.layout.is_occupied(self.data, slot)
    }

    pub fn is_full(&self) -> bool {
        self.layout.is_full(self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty(self.data)
    }

    pub fn next_occupied(&self, from: usize) -> Option<SlotId> {
        self.layout.next_occupied(self.data, from)
    }

    pub fn record_count(&self) -> usize {
        self.layout.occupied_count(self.data)
    }

    pub fn read_record(&self, slot: SlotId) -> Vec<u8> {
        self.layout.read_record(self.data, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_layout_geometry() {
        let layout = PageLayout::new(&[4, 8]).unwrap();
        assert_eq!(layout.record_size(), 12);
        assert_eq!(layout.step_range(), 8);
        assert_eq!(layout.header_size(), 32);
        assert_eq!(layout.mini_page_size(), 2032);
        assert_eq!(layout.mini_page_start(0), 32);
        assert_eq!(layout.mini_page_start(1), 2064);
        // 2032 / 8 strides fit, not the nominal 256
        assert_eq!(layout.slots_per_page(), 254);
        assert_eq!(layout.last_header_byte(), 0b0000_0011);

        let last = layout.slot_offset(1, SlotId::new(253));
        assert!(last + 8 <= PAGE_SIZE);
    }

    #[test]
    fn test_page_layout_trailer_bits() {
        // 40 slots fill the 5 header bytes exactly
        let layout = PageLayout::new(&[100]).unwrap();
        assert_eq!(layout.slots_per_page(), 40);
        assert_eq!(layout.header_size(), 5);
        assert_eq!(layout.last_header_byte(), 0x00);

        // 20 slots leave the low 4 bits of the third byte unused
        let layout = PageLayout::new(&[200]).unwrap();
        assert_eq!(layout.slots_per_page(), 20);
        assert_eq!(layout.header_size(), 3);
        assert_eq!(layout.empty_header(), &[0x00, 0x00, 0x0F]);
    }

    #[test]
    fn test_page_layout_rejects_bad_schemas() {
        assert!(matches!(PageLayout::new(&[]), Err(PaxError::InvalidSchema(_))));
        assert!(matches!(PageLayout::new(&[4, 0]), Err(PaxError::InvalidSchema(_))));
        assert!(matches!(
            PageLayout::new(&[PAGE_SIZE, 1]),
            Err(PaxError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_record_page_occupancy() {
        let layout = PageLayout::new(&[200]).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        let mut page = RecordPage::new(&layout, &mut data);
        page.init();

        assert!(page.is_empty());
        assert!(!page.is_full());
        assert_eq!(page.first_free_slot(), Some(SlotId::new(0)));

        for slot in 0..20 {
            let free = page.first_free_slot().unwrap();
            assert_eq!(free, SlotId::new(slot));
            page.set_occupied(free, true);
        }
        assert!(page.is_full());
        assert_eq!(page.first_free_slot(), None);

        page.set_occupied(SlotId::new(7), false);
        assert!(!page.is_occupied(SlotId::new(7)));
        assert_eq!(page.first_free_slot(), Some(SlotId::new(7)));

        for slot in 0..20 {
            page.set_occupied(SlotId::new(slot), false);
        }
        assert!(page.is_empty());
    }

    #[test]
    fn test_record_page_read_write() {
        let layout = PageLayout::new(&[4, 8]).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        let row: Vec<u8> = (1..=12).collect();
        {
            let mut page = RecordPage::new(&layout, &mut data);
            page.init();
            page.write_record(SlotId::new(3), &row);
            page.set_occupied(SlotId::new(3), true);
            assert_eq!(page.read_record(SlotId::new(3)), row);
        }

        // Attribute bytes land in their own mini-pages
        assert_eq!(&data[32 + 24..32 + 28], &row[..4]);
        assert_eq!(&data[2064 + 24..2064 + 32], &row[4..]);

        let page = RecordPageRef::new(&layout, &data);
        assert_eq!(page.record_count(), 1);
        assert_eq!(page.next_occupied(0), Some(SlotId::new(3)));
        assert_eq!(page.next_occupied(4), None);
        assert_eq!(page.read_record(SlotId::new(3)), row);
    }

    #[test]
    fn test_record_page_scan_ignores_trailer() {
        let layout = PageLayout::new(&[4, 8]).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        let mut page = RecordPage::new(&layout, &mut data);
        page.init();
        page.set_occupied(SlotId::new(253), true);

        let page = RecordPageRef::new(&layout, &data);
        assert_eq!(page.next_occupied(0), Some(SlotId::new(253)));
        assert_eq!(page.next_occupied(254), None);
    }
}
