use std::any::Any;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// The SQL type a bound value is recorded with. For a batch column it
/// decides the element type of the array the column is bound as.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::Display,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum SqlType {
    /// NULL bound without a type
    Unknown,
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Varchar,
    Text,
    Bytea,
    Date,
    Time,
    Timestamp,
    Timestamptz,
    Uuid,
    Array,
}

impl SqlType {
    /// Postgres name of the type, as used for array elements
    pub fn name(self) -> &'static str {
        match self {
            // Only NULLs were seen, any element type will do
            SqlType::Unknown => "text",
            other => other.into(),
        }
    }

    /// Element type of an array holding values of both types, `None` when
    /// they belong to different families. Integer and float widths widen.
    pub fn unify(self, other: SqlType) -> Option<SqlType> {
        use SqlType::*;
        match (self, other) {
            (Unknown, sql_type) | (sql_type, Unknown) => Some(sql_type),
            (Int2 | Int4 | Int8, Int2 | Int4 | Int8) | (Float4 | Float8, Float4 | Float8) => {
                Some(self.max(other))
            }
            (Varchar | Text, Varchar | Text) => Some(self),
            _ if self == other => Some(self),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<SqlType> {
        let sql_type = match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => SqlType::Bool,
            "int2" | "smallint" | "tinyint" => SqlType::Int2,
            "int4" | "int" | "integer" => SqlType::Int4,
            "int8" | "bigint" => SqlType::Int8,
            "float4" | "real" => SqlType::Float4,
            "float8" | "double" | "double precision" => SqlType::Float8,
            "numeric" | "decimal" => SqlType::Numeric,
            "varchar" | "string" => SqlType::Varchar,
            "text" => SqlType::Text,
            "bytea" | "bytes" => SqlType::Bytea,
            "date" => SqlType::Date,
            "time" => SqlType::Time,
            "timestamp" => SqlType::Timestamp,
            "timestamptz" => SqlType::Timestamptz,
            "uuid" => SqlType::Uuid,
            _ => return None,
        };
        Some(sql_type)
    }
}

/// Large binary object, bound as `bytea`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob(pub Bytes);

/// Large character object, bound as `text`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clob(pub String);

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayValue {
    pub element_type: SqlType,
    pub elements: Vec<SqlValue>,
}

impl ArrayValue {
    pub fn new(element_type: SqlType, elements: Vec<SqlValue>) -> Self {
        ArrayValue {
            element_type,
            elements,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null(SqlType),
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Blob(Blob),
    Clob(Clob),
    Array(ArrayValue),
}

impl SqlValue {
    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Null(sql_type) => *sql_type,
            SqlValue::Bool(_) => SqlType::Bool,
            SqlValue::Byte(_) | SqlValue::Short(_) => SqlType::Int2,
            SqlValue::Int(_) => SqlType::Int4,
            SqlValue::Long(_) => SqlType::Int8,
            SqlValue::Float(_) => SqlType::Float4,
            SqlValue::Double(_) => SqlType::Float8,
            SqlValue::Decimal(_) => SqlType::Numeric,
            SqlValue::String(_) => SqlType::Varchar,
            SqlValue::Bytes(_) | SqlValue::Blob(_) => SqlType::Bytea,
            SqlValue::Date(_) => SqlType::Date,
            SqlValue::Time(_) => SqlType::Time,
            SqlValue::Timestamp(_) => SqlType::Timestamp,
            SqlValue::TimestampTz(_) => SqlType::Timestamptz,
            SqlValue::Uuid(_) => SqlType::Uuid,
            SqlValue::Clob(_) => SqlType::Text,
            SqlValue::Array(_) => SqlType::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for SqlValue {
                fn from(value: $source) -> Self {
                    SqlValue::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    Blob => Blob,
    Clob => Clob,
    ArrayValue => Array,
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        SqlValue::Bytes(value.to_vec())
    }
}

impl From<char> for SqlValue {
    fn from(value: char) -> Self {
        SqlValue::String(value.to_string())
    }
}

/// Infers a value's SQL type from its runtime type. Returns `None` for
/// types that have no SQL counterpart here; those are handed to the
/// database client as they are.
pub fn classify(value: &dyn Any) -> Option<SqlValue> {
    macro_rules! try_as {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(SqlValue::from(v.clone()));
                }
            )*
        };
    }

    if let Some(v) = value.downcast_ref::<SqlValue>() {
        return Some(v.clone());
    }
    try_as!(Uuid, String);
    if let Some(v) = value.downcast_ref::<&str>() {
        return Some(SqlValue::from(*v));
    }
    try_as!(
        Decimal,
        i16,
        i32,
        i64,
        f32,
        f64,
        Vec<u8>,
        NaiveDate,
        NaiveTime,
        NaiveDateTime,
        DateTime<Utc>,
        bool,
        i8,
        Blob,
        Clob,
        ArrayValue,
        char
    );
    // Remaining integers do not fit a signed column of the same width
    if let Some(v) = value.downcast_ref::<u8>() {
        return Some(SqlValue::Short(i16::from(*v)));
    }
    if let Some(v) = value.downcast_ref::<u16>() {
        return Some(SqlValue::Int(i32::from(*v)));
    }
    if let Some(v) = value.downcast_ref::<u32>() {
        return Some(SqlValue::Long(i64::from(*v)));
    }
    if let Some(v) = value.downcast_ref::<u64>() {
        return Some(SqlValue::Decimal(Decimal::from(*v)));
    }
    None
}
