//! Row-description registry (§3 Row description, §4.4 RowDescription/DataRow).
//!
//! Holds the column metadata of the current resultset. Replaced wholesale
//! whenever a `RowDescription` frame arrives; used to shape `DataRow`
//! events and to catch a column-count mismatch before it reaches the
//! embedder as malformed data.
//!
//! Grounded on `qs/src/column.rs`'s `ColumnInfo::decode` (the same
//! field-by-field layout) and the column-count assertion in
//! `qs/src/row.rs`'s `Row::inner_clone`.

use bytes::{Buf, Bytes};

use crate::codec::BytesExt;
use crate::common::ByteStr;
use crate::error::ProtocolError;

/// One column's metadata, as declared by a `RowDescription` field (§3).
#[derive(Debug, Clone)]
pub struct FieldDescription {
    /// The field name.
    pub name: ByteStr,
    /// Object ID of the table this column belongs to, or zero.
    pub table_oid: i32,
    /// Attribute number of the column within that table, or zero.
    pub column_index: i16,
    /// Object ID of the field's data type.
    pub type_oid: i32,
    /// Declared size of the data type; negative denotes variable-width.
    pub type_size: i16,
    /// Type modifier; meaning is type-specific.
    pub type_modifier: i32,
    /// `0` = text, `1` = binary.
    pub format_code: i16,
}

impl FieldDescription {
    pub(crate) fn decode(body: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: body.get_nul_bytestr()?,
            table_oid: body.get_i32(),
            column_index: body.get_i16(),
            type_oid: body.get_i32(),
            type_size: body.get_i16(),
            type_modifier: body.get_i32(),
            format_code: body.get_i16(),
        })
    }
}

/// The column layout of the current resultset (§3 Row description).
#[derive(Debug, Clone, Default)]
pub struct RowDescription {
    pub fields: Vec<FieldDescription>,
}

impl RowDescription {
    pub(crate) fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let field_count = body.get_i16();
        let mut fields = Vec::with_capacity(field_count.max(0) as usize);
        for _ in 0..field_count {
            fields.push(FieldDescription::decode(&mut body)?);
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
