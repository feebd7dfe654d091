use std::collections::HashMap;
use std::fmt;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
}

impl ColumnType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INTEGER" | "INT" => Some(ColumnType::Integer),
            "TEXT" => Some(ColumnType::Text),
            "BOOLEAN" | "BOOL" => Some(ColumnType::Boolean),
            _ => None,
        }
    }

    /// Name stored in the `data_type` column of `_columns`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INT",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ColumnType::Integer),
            2 => Some(ColumnType::Text),
            3 => Some(ColumnType::Boolean),
            _ => None,
        }
    }

    pub fn to_code(&self) -> u8 {
        match self {
            ColumnType::Integer => 1,
            ColumnType::Text => 2,
            ColumnType::Boolean => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Integer(i32),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::Text(_) => ColumnType::Text,
            Value::Boolean(_) => ColumnType::Boolean,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One tuple keyed by column name. Also used as an equality predicate: every
/// entry must match, and an empty dict matches everything.
pub type ValueDict = HashMap<String, Value>;

pub fn dict<const N: usize>(pairs: [(&str, Value); N]) -> ValueDict {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Row values in a relation's declared column order, as stored in a block.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData(pub Vec<Value>);

impl RowData {
    /// Layout: `[u16 count]` then per value `[u8 type code][payload]`, where
    /// INT is 4 bytes LE, TEXT is `[u16 len][bytes]` and BOOLEAN one byte.
    pub fn serialize(&self) -> DbResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend(&(self.0.len() as u16).to_le_bytes());
        for col in &self.0 {
            buf.push(col.column_type().to_code());
            match col {
                Value::Integer(i) => buf.extend(&i.to_le_bytes()),
                Value::Text(s) => {
                    let len = u16::try_from(s.len()).map_err(|_| {
                        DbError::Relation(format!("text value of {} bytes is too long", s.len()))
                    })?;
                    buf.extend(&len.to_le_bytes());
                    buf.extend(s.as_bytes());
                }
                Value::Boolean(b) => buf.push(if *b { 1 } else { 0 }),
            }
        }
        Ok(buf)
    }

    pub fn deserialize(bytes: &[u8]) -> DbResult<RowData> {
        let mut reader = Reader { bytes, offset: 0 };
        let num_cols = u16::from_le_bytes(reader.take::<2>()?) as usize;
        let mut cols = Vec::with_capacity(num_cols);
        for _ in 0..num_cols {
            let [code] = reader.take::<1>()?;
            let value = match ColumnType::from_code(code) {
                Some(ColumnType::Integer) => Value::Integer(i32::from_le_bytes(reader.take::<4>()?)),
                Some(ColumnType::Text) => {
                    let len = u16::from_le_bytes(reader.take::<2>()?) as usize;
                    let raw = reader.slice(len)?;
                    Value::Text(String::from_utf8_lossy(raw).to_string())
                }
                Some(ColumnType::Boolean) => {
                    let [b] = reader.take::<1>()?;
                    Value::Boolean(b != 0)
                }
                None => return Err(DbError::Relation(format!("unknown type tag {}", code))),
            };
            cols.push(value);
        }
        Ok(RowData(cols))
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn slice(&mut self, len: usize) -> DbResult<&'a [u8]> {
        let end = self.offset + len;
        if end > self.bytes.len() {
            return Err(DbError::Relation("unexpected end of record".into()));
        }
        let bytes = self.bytes;
        let out = &bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn take<const N: usize>(&mut self) -> DbResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(N)?);
        Ok(out)
    }
}
