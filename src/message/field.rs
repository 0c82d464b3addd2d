use std::fmt;

use crate::utils::{GmsecError, Result};

/// The primitive type carried by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Binary,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
}

impl FieldType {
    /// The name used for this type in XML and JSON.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "BOOL",
            FieldType::Binary => "BIN",
            FieldType::Char => "CHAR",
            FieldType::I8 => "I8",
            FieldType::I16 => "I16",
            FieldType::I32 => "I32",
            FieldType::I64 => "I64",
            FieldType::U8 => "U8",
            FieldType::U16 => "U16",
            FieldType::U32 => "U32",
            FieldType::U64 => "U64",
            FieldType::F32 => "F32",
            FieldType::F64 => "F64",
            FieldType::String => "STRING",
        }
    }

    /// Looks up a type by name, accepting the older aliases as well.
    pub fn from_name(name: &str) -> Option<FieldType> {
        let ty = match name.trim().to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => FieldType::Bool,
            "BIN" | "BINARY" | "BLOB" => FieldType::Binary,
            "CHAR" => FieldType::Char,
            "I8" => FieldType::I8,
            "I16" | "SHORT" => FieldType::I16,
            "I32" | "LONG" => FieldType::I32,
            "I64" => FieldType::I64,
            "U8" => FieldType::U8,
            "U16" | "USHORT" => FieldType::U16,
            "U32" | "ULONG" => FieldType::U32,
            "U64" => FieldType::U64,
            "F32" | "FLOAT" => FieldType::F32,
            "F64" | "DOUBLE" => FieldType::F64,
            "STRING" => FieldType::String,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::I8
                | FieldType::I16
                | FieldType::I32
                | FieldType::I64
                | FieldType::U8
                | FieldType::U16
                | FieldType::U32
                | FieldType::U64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, FieldType::F32 | FieldType::F64)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Binary(Vec<u8>),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Binary(_) => FieldType::Binary,
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
            FieldValue::String(_) => FieldType::String,
        }
    }

    /// Text form used by the XML and JSON encoders. Binary values are hex.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Bool(v) => (if *v { "TRUE" } else { "FALSE" }).to_string(),
            FieldValue::Binary(v) => hex::encode_upper(v),
            FieldValue::Char(v) => v.to_string(),
            FieldValue::I8(v) => v.to_string(),
            FieldValue::I16(v) => v.to_string(),
            FieldValue::I32(v) => v.to_string(),
            FieldValue::I64(v) => v.to_string(),
            FieldValue::U8(v) => v.to_string(),
            FieldValue::U16(v) => v.to_string(),
            FieldValue::U32(v) => v.to_string(),
            FieldValue::U64(v) => v.to_string(),
            FieldValue::F32(v) => v.to_string(),
            FieldValue::F64(v) => v.to_string(),
            FieldValue::String(v) => v.clone(),
        }
    }

    /// Hex of the IEEE-754 bit pattern for floating point values.
    pub fn float_bits(&self) -> Option<String> {
        match self {
            FieldValue::F32(v) => Some(hex::encode_upper(v.to_bits().to_be_bytes())),
            FieldValue::F64(v) => Some(hex::encode_upper(v.to_bits().to_be_bytes())),
            _ => None,
        }
    }

    /// Parses the text form of a value of type `ty`.
    pub fn parse(ty: FieldType, text: &str) -> Result<FieldValue> {
        let bad = || GmsecError::parse(format!("'{text}' is not a valid {ty} value"));
        let trimmed = text.trim();
        let value = match ty {
            FieldType::Bool => FieldValue::Bool(parse_bool(trimmed).ok_or_else(bad)?),
            FieldType::Binary => FieldValue::Binary(hex::decode(trimmed).map_err(|_| bad())?),
            FieldType::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => FieldValue::Char(c),
                    _ => return Err(bad()),
                }
            }
            FieldType::I8 => FieldValue::I8(trimmed.parse().map_err(|_| bad())?),
            FieldType::I16 => FieldValue::I16(trimmed.parse().map_err(|_| bad())?),
            FieldType::I32 => FieldValue::I32(trimmed.parse().map_err(|_| bad())?),
            FieldType::I64 => FieldValue::I64(trimmed.parse().map_err(|_| bad())?),
            FieldType::U8 => FieldValue::U8(trimmed.parse().map_err(|_| bad())?),
            FieldType::U16 => FieldValue::U16(trimmed.parse().map_err(|_| bad())?),
            FieldType::U32 => FieldValue::U32(trimmed.parse().map_err(|_| bad())?),
            FieldType::U64 => FieldValue::U64(trimmed.parse().map_err(|_| bad())?),
            FieldType::F32 => FieldValue::F32(trimmed.parse().map_err(|_| bad())?),
            FieldType::F64 => FieldValue::F64(trimmed.parse().map_err(|_| bad())?),
            FieldType::String => FieldValue::String(text.to_string()),
        };
        Ok(value)
    }

    /// Rebuilds a float from the hex produced by `float_bits`.
    pub fn from_float_bits(ty: FieldType, bits: &str) -> Result<FieldValue> {
        let bytes = hex::decode(bits.trim())
            .map_err(|_| GmsecError::parse(format!("invalid BITS value '{bits}'")))?;
        match ty {
            FieldType::F32 => {
                let raw: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| GmsecError::parse("F32 BITS must be 4 bytes"))?;
                Ok(FieldValue::F32(f32::from_bits(u32::from_be_bytes(raw))))
            }
            FieldType::F64 => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| GmsecError::parse("F64 BITS must be 8 bytes"))?;
                Ok(FieldValue::F64(f64::from_bits(u64::from_be_bytes(raw))))
            }
            other => Err(GmsecError::parse(format!("BITS is not valid for {other} fields"))),
        }
    }

    /// Integer view of the value. Strings holding an integer convert too.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::I8(v) => Some(i64::from(*v)),
            FieldValue::I16(v) => Some(i64::from(*v)),
            FieldValue::I32(v) => Some(i64::from(*v)),
            FieldValue::I64(v) => Some(*v),
            FieldValue::U8(v) => Some(i64::from(*v)),
            FieldValue::U16(v) => Some(i64::from(*v)),
            FieldValue::U32(v) => Some(i64::from(*v)),
            FieldValue::U64(v) => i64::try_from(*v).ok(),
            FieldValue::Char(v) => Some(*v as i64),
            FieldValue::Bool(v) => Some(i64::from(*v)),
            FieldValue::String(v) => v.trim().parse().ok(),
            FieldValue::F32(_) | FieldValue::F64(_) | FieldValue::Binary(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::F32(v) => Some(f64::from(*v)),
            FieldValue::F64(v) => Some(*v),
            FieldValue::String(v) => v.trim().parse().ok(),
            FieldValue::U64(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            FieldValue::String(v) => parse_bool(v.trim()),
            FieldValue::F32(_) | FieldValue::F64(_) | FieldValue::Binary(_) => None,
            other => other.as_i64().map(|v| v != 0),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

field_value_from! {
    bool => Bool,
    Vec<u8> => Binary,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Binary(v.to_vec())
    }
}

/// A named, typed value. Header fields are flagged so encoders can mark them.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: FieldValue,
    header: bool,
}

impl Field {
    pub fn new(name: &str, value: impl Into<FieldValue>) -> Result<Field> {
        if name.is_empty() {
            return Err(GmsecError::illegal_argument("Field name cannot be empty"));
        }
        Ok(Field {
            name: name.to_string(),
            value: value.into(),
            header: false,
        })
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    pub fn is_header(&self) -> bool {
        self.header
    }

    pub fn set_header(&mut self, header: bool) {
        self.header = header;
    }

    pub fn get_string_value(&self) -> String {
        self.value.to_text()
    }

    pub fn get_i64_value(&self) -> Result<i64> {
        self.value.as_i64().ok_or_else(|| self.conversion_error("I64"))
    }

    pub fn get_f64_value(&self) -> Result<f64> {
        self.value.as_f64().ok_or_else(|| self.conversion_error("F64"))
    }

    pub fn get_bool_value(&self) -> Result<bool> {
        self.value.as_bool().ok_or_else(|| self.conversion_error("BOOL"))
    }

    fn conversion_error(&self, target: &str) -> GmsecError {
        GmsecError::TypeConversion(format!(
            "Field {} of type {} cannot be converted to {}",
            self.name,
            self.field_type(),
            target
        ))
    }
}
