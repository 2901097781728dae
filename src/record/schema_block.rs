//! Encoding of a relation's attribute list into the schema page.
//!
//! Layout, all integers big-endian `i32`:
//!
//! ```text
//! attribute_count
//! repeated attribute_count times:
//!     rel_name_len  rel_name (UTF-8)
//!     attr_name_len attr_name (UTF-8)
//!     type_code
//!     byte_length
//! ```
//!
//! The block must fit in a single page.

use bytes::{Buf, BufMut, BytesMut};

use crate::common::{PaxError, Result, PAGE_SIZE};

use super::{AttrInfo, AttrType};

/// Serializes an attribute list. Fails if the list is empty or the block
/// would not fit in one page.
pub fn encode_schema(attrs: &[AttrInfo]) -> Result<BytesMut> {
    if attrs.is_empty() {
        return Err(PaxError::InvalidSchema(
            "relation has no attributes".to_string(),
        ));
    }

    let mut buf = BytesMut::with_capacity(PAGE_SIZE);
    buf.put_i32(to_i32(attrs.len())?);
    for attr in attrs {
        put_name(&mut buf, attr.rel_name())?;
        put_name(&mut buf, attr.attr_name())?;
        buf.put_i32(attr.attr_type().code());
        buf.put_i32(to_i32(attr.byte_length())?);
    }

    if buf.len() > PAGE_SIZE {
        return Err(PaxError::InvalidSchema(format!(
            "schema block needs {} bytes but a page holds {}",
            buf.len(),
            PAGE_SIZE
        )));
    }
    Ok(buf)
}

/// Reads an attribute list back, in the order it was written.
pub fn decode_schema(mut buf: &[u8]) -> Result<Vec<AttrInfo>> {
    let count = get_len(&mut buf, "attribute count")?;
    if count == 0 {
        return Err(PaxError::InvalidSchema(
            "schema block declares no attributes".to_string(),
        ));
    }

    let mut attrs = Vec::with_capacity(count.min(PAGE_SIZE));
    for _ in 0..count {
        let rel_name = get_name(&mut buf)?;
        let attr_name = get_name(&mut buf)?;
        let code = get_i32(&mut buf)?;
        let attr_type = AttrType::from_code(code)
            .ok_or_else(|| PaxError::InvalidSchema(format!("unknown type code {}", code)))?;
        let byte_length = get_len(&mut buf, "byte length")?;
        attrs.push(AttrInfo::new(rel_name, attr_name, attr_type, byte_length));
    }
    Ok(attrs)
}

fn to_i32(value: usize) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| PaxError::Serialization(format!("{} does not fit in an i32", value)))
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<()> {
    buf.put_i32(to_i32(name.len())?);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn get_i32(buf: &mut &[u8]) -> Result<i32> {
    if buf.remaining() < 4 {
        return Err(PaxError::Serialization(
            "schema block is truncated".to_string(),
        ));
    }
    Ok(buf.get_i32())
}

fn get_len(buf: &mut &[u8], what: &str) -> Result<usize> {
    let value = get_i32(buf)?;
    usize::try_from(value)
        .map_err(|_| PaxError::Serialization(format!("negative {}: {}", what, value)))
}

fn get_name(buf: &mut &[u8]) -> Result<String> {
    let len = get_len(buf, "name length")?;
    if buf.remaining() < len {
        return Err(PaxError::Serialization(
            "schema block is truncated".to_string(),
        ));
    }
    let name = std::str::from_utf8(&buf[..len])
        .map_err(|e| PaxError::Serialization(format!("name is not UTF-8: {}", e)))?
        .to_string();
    buf.advance(len);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> Vec<AttrInfo> {
        vec![
            AttrInfo::new("emp", "id", AttrType::Integer, 4),
            AttrInfo::new("emp", "name", AttrType::Char, 24),
            AttrInfo::new("emp", "salary", AttrType::Double, 8),
        ]
    }

    #[test]
    fn test_schema_block_layout() {
        let attrs = vec![AttrInfo::new("r", "ab", AttrType::Integer, 4)];
        let block = encode_schema(&attrs).unwrap();

        let expected: Vec<u8> = [
            &1i32.to_be_bytes()[..],
            &1i32.to_be_bytes(),
            b"r",
            &2i32.to_be_bytes(),
            b"ab",
            &AttrType::Integer.code().to_be_bytes(),
            &4i32.to_be_bytes(),
        ]
        .concat();
        assert_eq!(&block[..], &expected[..]);
    }

    #[test]
    fn test_schema_block_preserves_order() {
        let attrs = employee();
        let block = encode_schema(&attrs).unwrap();

        // Trailing page bytes after the block are ignored
        let mut page = vec![0u8; PAGE_SIZE];
        page[..block.len()].copy_from_slice(&block);
        assert_eq!(decode_schema(&page).unwrap(), attrs);
    }

    #[test]
    fn test_schema_block_rejects_empty() {
        assert!(matches!(encode_schema(&[]), Err(PaxError::InvalidSchema(_))));
        assert!(matches!(
            decode_schema(&[0u8; 16]),
            Err(PaxError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_schema_block_too_large() {
        let long_name = "x".repeat(PAGE_SIZE);
        let attrs = vec![AttrInfo::new("r", long_name, AttrType::Char, 4)];
        assert!(matches!(
            encode_schema(&attrs),
            Err(PaxError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_schema_block_truncated() {
        let block = encode_schema(&employee()).unwrap();
        let cut = &block[..block.len() - 3];
        assert!(matches!(
            decode_schema(cut),
            Err(PaxError::Serialization(_))
        ));
    }

    #[test]
    fn test_schema_block_unknown_type() {
        let mut block = encode_schema(&[AttrInfo::new("r", "a", AttrType::Integer, 4)])
            .unwrap()
            .to_vec();
        // count, rel len, "r", attr len, "a", then the type code
        let code_at = 4 + 4 + 1 + 4 + 1;
        block[code_at..code_at + 4].copy_from_slice(&77i32.to_be_bytes());
        assert!(matches!(
            decode_schema(&block),
            Err(PaxError::InvalidSchema(_))
        ));
    }
}
