//! Tuples, fields and table schemas.
//!
//! Every tuple of a table has the same fixed width, determined by its
//! [`TupleDesc`]. Fields are encoded little-endian:
//!
//! ```text
//! Int   4 bytes                         i32
//! Text  4 bytes length + STRING_LEN     u32 length, payload, zero padding
//! ```

use std::fmt;

use crate::common::config::STRING_LEN;
use crate::common::{Error, RecordId, Result};

/// Type of a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Text,
}

impl FieldType {
    /// Encoded width of a field of this type, in bytes.
    #[inline]
    pub const fn width(self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text => 4 + STRING_LEN,
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Text(_) => FieldType::Text,
        }
    }

    /// Write this field into `buf`, which is exactly `field_type().width()` long.
    fn encode_into(&self, buf: &mut [u8]) {
        match self {
            Field::Int(v) => buf.copy_from_slice(&v.to_le_bytes()),
            Field::Text(s) => {
                let bytes = s.as_bytes();
                buf[..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
                buf[4..4 + bytes.len()].copy_from_slice(bytes);
                buf[4 + bytes.len()..].fill(0);
            }
        }
    }

    fn decode(field_type: FieldType, buf: &[u8]) -> std::result::Result<Field, String> {
        match field_type {
            FieldType::Int => Ok(Field::Int(i32::from_le_bytes([
                buf[0], buf[1], buf[2], buf[3],
            ]))),
            FieldType::Text => {
                let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                if len > STRING_LEN {
                    return Err(format!("text length {} exceeds {}", len, STRING_LEN));
                }
                String::from_utf8(buf[4..4 + len].to_vec())
                    .map(Field::Text)
                    .map_err(|e| e.to_string())
            }
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named column in a [`TupleDesc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Schema of a table: an ordered list of named, typed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    fields: Vec<FieldDef>,
}

impl TupleDesc {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Build a schema with generated column names `f0`, `f1`, ...
    pub fn from_types(types: &[FieldType]) -> Self {
        let fields = types
            .iter()
            .enumerate()
            .map(|(i, &ty)| FieldDef::new(format!("f{}", i), ty))
            .collect();
        Self { fields }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_type(&self, i: usize) -> Option<FieldType> {
        self.fields.get(i).map(|f| f.field_type)
    }

    /// Index of the column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Encoded width of one tuple, in bytes.
    pub fn size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.width()).sum()
    }

    /// Check that `tuple` can be stored under this schema.
    pub fn validate(&self, tuple: &Tuple) -> Result<()> {
        if tuple.fields.len() != self.fields.len() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} fields, got {}",
                self.fields.len(),
                tuple.fields.len()
            )));
        }
        for (def, field) in self.fields.iter().zip(&tuple.fields) {
            if def.field_type != field.field_type() {
                return Err(Error::SchemaMismatch(format!(
                    "column {} expects {:?}, got {:?}",
                    def.name,
                    def.field_type,
                    field.field_type()
                )));
            }
            if let Field::Text(s) = field {
                if s.len() > STRING_LEN {
                    return Err(Error::SchemaMismatch(format!(
                        "column {} holds {} bytes, limit is {}",
                        def.name,
                        s.len(),
                        STRING_LEN
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A row of field values, plus where it is stored once inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            record_id: None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Encode into a slot of exactly `desc.size()` bytes.
    ///
    /// The tuple must already have passed [`TupleDesc::validate`].
    pub(crate) fn encode_into(&self, desc: &TupleDesc, slot: &mut [u8]) {
        let mut offset = 0;
        for (def, field) in desc.fields.iter().zip(&self.fields) {
            let width = def.field_type.width();
            field.encode_into(&mut slot[offset..offset + width]);
            offset += width;
        }
    }

    pub(crate) fn decode(desc: &TupleDesc, slot: &[u8]) -> std::result::Result<Self, String> {
        let mut fields = Vec::with_capacity(desc.fields.len());
        let mut offset = 0;
        for def in &desc.fields {
            let width = def.field_type.width();
            fields.push(Field::decode(def.field_type, &slot[offset..offset + width])?);
            offset += width;
        }
        Ok(Tuple::new(fields))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_text_desc() -> TupleDesc {
        TupleDesc::new(vec![
            FieldDef::new("id", FieldType::Int),
            FieldDef::new("name", FieldType::Text),
        ])
    }

    #[test]
    fn test_desc_size() {
        let desc = int_text_desc();
        assert_eq!(desc.size(), 4 + 4 + STRING_LEN);
        assert_eq!(TupleDesc::from_types(&[FieldType::Int; 3]).size(), 12);
    }

    #[test]
    fn test_desc_lookup() {
        let desc = int_text_desc();
        assert_eq!(desc.index_of("name"), Some(1));
        assert_eq!(desc.index_of("missing"), None);
        assert_eq!(desc.field_type(0), Some(FieldType::Int));
        assert_eq!(TupleDesc::from_types(&[FieldType::Int]).fields()[0].name, "f0");
    }

    #[test]
    fn test_encode_decode_slot() {
        let desc = int_text_desc();
        let tuple = Tuple::new(vec![Field::Int(-17), Field::from("hello")]);
        desc.validate(&tuple).unwrap();

        let mut slot = vec![0xAA; desc.size()];
        tuple.encode_into(&desc, &mut slot);
        let decoded = Tuple::decode(&desc, &slot).unwrap();

        assert_eq!(decoded.fields(), tuple.fields());
        // Text padding is zeroed, not left over from the buffer
        assert!(slot[4 + 4 + 5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_validate_rejects_wrong_arity_and_type() {
        let desc = int_text_desc();
        assert!(matches!(
            desc.validate(&Tuple::new(vec![Field::Int(1)])),
            Err(Error::SchemaMismatch(_))
        ));
        assert!(matches!(
            desc.validate(&Tuple::new(vec![Field::from("x"), Field::from("y")])),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_validate_rejects_long_text() {
        let desc = int_text_desc();
        let long = "x".repeat(STRING_LEN + 1);
        let tuple = Tuple::new(vec![Field::Int(1), Field::Text(long)]);
        assert!(matches!(desc.validate(&tuple), Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let desc = TupleDesc::from_types(&[FieldType::Text]);
        let mut slot = vec![0u8; desc.size()];
        slot[..4].copy_from_slice(&((STRING_LEN as u32) + 1).to_le_bytes());
        assert!(Tuple::decode(&desc, &slot).is_err());
    }

    #[test]
    fn test_tuple_display() {
        let tuple = Tuple::new(vec![Field::Int(3), Field::from("abc")]);
        assert_eq!(format!("{}", tuple), "3\tabc");
    }
}
