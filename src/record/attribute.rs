use std::fmt;

/// Fixed-width attribute types and their type codes in the schema block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// 1 byte (0 = false, 1 = true)
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit IEEE 754 float
    Float,
    /// 64-bit IEEE 754 float
    Double,
    /// Fixed-length character string, padded to its byte length
    Char,
    /// Microseconds since the Unix epoch, 8 bytes
    Timestamp,
}

impl AttrType {
    /// Type code written into the schema block.
    pub fn code(&self) -> i32 {
        match self {
            AttrType::Boolean => 1,
            AttrType::TinyInt => 2,
            AttrType::SmallInt => 3,
            AttrType::Integer => 4,
            AttrType::BigInt => 5,
            AttrType::Float => 6,
            AttrType::Double => 7,
            AttrType::Char => 8,
            AttrType::Timestamp => 9,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(AttrType::Boolean),
            2 => Some(AttrType::TinyInt),
            3 => Some(AttrType::SmallInt),
            4 => Some(AttrType::Integer),
            5 => Some(AttrType::BigInt),
            6 => Some(AttrType::Float),
            7 => Some(AttrType::Double),
            8 => Some(AttrType::Char),
            9 => Some(AttrType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrType::Boolean => "BOOLEAN",
            AttrType::TinyInt => "TINYINT",
            AttrType::SmallInt => "SMALLINT",
            AttrType::Integer => "INTEGER",
            AttrType::BigInt => "BIGINT",
            AttrType::Float => "FLOAT",
            AttrType::Double => "DOUBLE",
            AttrType::Char => "CHAR",
            AttrType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

/// Describes one attribute of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrInfo {
    rel_name: String,
    attr_name: String,
    attr_type: AttrType,
    byte_length: usize,
}

impl AttrInfo {
    pub fn new(
        rel_name: impl Into<String>,
        attr_name: impl Into<String>,
        attr_type: AttrType,
        byte_length: usize,
    ) -> Self {
        Self {
            rel_name: rel_name.into(),
            attr_name: attr_name.into(),
            attr_type,
            byte_length,
        }
    }

    pub fn rel_name(&self) -> &str {
        &self.rel_name
    }

    pub fn attr_name(&self) -> &str {
        &self.attr_name
    }

    pub fn attr_type(&self) -> AttrType {
        self.attr_type
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }
}

impl fmt::Display for AttrInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {}({})",
            self.rel_name, self.attr_name, self.attr_type, self.byte_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_type_codes() {
        let all = [
            AttrType::Boolean,
            AttrType::TinyInt,
            AttrType::SmallInt,
            AttrType::Integer,
            AttrType::BigInt,
            AttrType::Float,
            AttrType::Double,
            AttrType::Char,
            AttrType::Timestamp,
        ];
        for ty in all {
            assert_eq!(AttrType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(AttrType::from_code(0), None);
        assert_eq!(AttrType::from_code(-3), None);
    }

    #[test]
    fn test_attr_info_display() {
        let attr = AttrInfo::new("emp", "name", AttrType::Char, 20);
        assert_eq!(attr.to_string(), "emp.name CHAR(20)");
    }
}
