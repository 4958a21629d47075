//! Numeric-type normalization for serializable reports
//!
//! Analyzer results cross the JSON boundary as a [`Datum`] tree. Typed
//! numeric values (fixed-width integers, `f32`/`f64`, homogeneous arrays) are
//! kept as [`NumericScalar`]/[`NumericArray`] until [`convert_numeric_types`]
//! lowers them into the native JSON-shaped variants. Every report goes through
//! that conversion before it is encoded.
//!
//! Two non-finite policies exist:
//! - [`NanPolicy::Preserve`]: NaN and ±infinity survive as native floats and are
//!   written as `NaN`/`Infinity`/`-Infinity` literals when encoded.
//! - [`NanPolicy::NullOnEncode`]: the encoder emits `null` for them, so the
//!   output stays standard JSON. Plain conversion still preserves the values.

use serde::ser::{self, Error as _};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// How non-finite floats are written by [`encode_json`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanPolicy {
    /// Keep NaN/±inf and write them as non-standard literals
    Preserve,
    /// Write NaN/±inf as JSON `null`
    #[default]
    NullOnEncode,
}

/// A typed numeric scalar as produced by statistical routines
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericScalar {
    Bool(bool),
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
}

/// A typed homogeneous numeric array
#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray {
    Bool(Vec<bool>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl NumericArray {
    /// Elements in order, as typed scalars
    pub fn scalars(&self) -> Vec<NumericScalar> {
        match self {
            NumericArray::Bool(v) => v.iter().map(|&x| NumericScalar::Bool(x)).collect(),
            NumericArray::I32(v) => v.iter().map(|&x| NumericScalar::I32(x)).collect(),
            NumericArray::I64(v) => v.iter().map(|&x| NumericScalar::I64(x)).collect(),
            NumericArray::U32(v) => v.iter().map(|&x| NumericScalar::U32(x)).collect(),
            NumericArray::U64(v) => v.iter().map(|&x| NumericScalar::U64(x)).collect(),
            NumericArray::F32(v) => v.iter().map(|&x| NumericScalar::F32(x)).collect(),
            NumericArray::F64(v) => v.iter().map(|&x| NumericScalar::F64(x)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NumericArray::Bool(v) => v.len(),
            NumericArray::I32(v) => v.len(),
            NumericArray::I64(v) => v.len(),
            NumericArray::U32(v) => v.len(),
            NumericArray::U64(v) => v.len(),
            NumericArray::F32(v) => v.len(),
            NumericArray::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Open value tree used at the report/JSON boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Datum>),
    Map(BTreeMap<String, Datum>),
    /// Typed scalar awaiting normalization
    Scalar(NumericScalar),
    /// Typed array awaiting normalization
    Array(NumericArray),
}

impl Datum {
    /// Build a map from `(key, value)` pairs
    pub fn record<'a, I>(fields: I) -> Datum
    where
        I: IntoIterator<Item = (&'a str, Datum)>,
    {
        Datum::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Typed `f64` array, e.g. regression coefficients
    pub fn f64_array(values: &[f64]) -> Datum {
        Datum::Array(NumericArray::F64(values.to_vec()))
    }

    /// Look up a key when this is a map
    pub fn get(&self, key: &str) -> Option<&Datum> {
        match self {
            Datum::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Datum>> {
        match self {
            Datum::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Datum]> {
        match self {
            Datum::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(b) | Datum::Scalar(NumericScalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of native or typed numbers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int(i) => Some(*i as f64),
            Datum::Float(f) => Some(*f),
            Datum::Scalar(s) => match convert_scalar(*s) {
                Datum::Int(i) => Some(i as f64),
                Datum::Float(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// True when the tree holds only native variants
    pub fn is_native(&self) -> bool {
        match self {
            Datum::Scalar(_) | Datum::Array(_) => false,
            Datum::List(items) => items.iter().all(Datum::is_native),
            Datum::Map(map) => map.values().all(Datum::is_native),
            _ => true,
        }
    }
}

impl From<serde_json::Value> for Datum {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Datum::Int(i)
                } else {
                    Datum::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Datum::Str(s),
            Value::Array(items) => Datum::List(items.into_iter().map(Datum::from).collect()),
            Value::Object(map) => {
                Datum::Map(map.into_iter().map(|(k, v)| (k, Datum::from(v))).collect())
            }
        }
    }
}

/// Widen an `f32` through its shortest decimal form so `2.5f32` stays `2.5`
/// and `0.1f32` becomes `0.1` rather than `0.10000000149011612`.
fn widen_f32(x: f32) -> f64 {
    if x.is_finite() {
        x.to_string().parse().unwrap_or(x as f64)
    } else {
        x as f64
    }
}

fn convert_scalar(scalar: NumericScalar) -> Datum {
    // Bool first: it must never be read back as 0/1
    match scalar {
        NumericScalar::Bool(b) => Datum::Bool(b),
        NumericScalar::I8(i) => Datum::Int(i64::from(i)),
        NumericScalar::I16(i) => Datum::Int(i64::from(i)),
        NumericScalar::I32(i) => Datum::Int(i64::from(i)),
        NumericScalar::I64(i) => Datum::Int(i),
        NumericScalar::U8(u) => Datum::Int(i64::from(u)),
        NumericScalar::U16(u) => Datum::Int(i64::from(u)),
        NumericScalar::U32(u) => Datum::Int(i64::from(u)),
        NumericScalar::U64(u) => match i64::try_from(u) {
            Ok(i) => Datum::Int(i),
            Err(_) => Datum::Float(u as f64),
        },
        NumericScalar::F32(f) => Datum::Float(widen_f32(f)),
        NumericScalar::F64(f) => Datum::Float(f),
    }
}

/// Lower every typed numeric value into native variants
///
/// Maps recurse key-for-key, lists element-for-element, arrays become lists of
/// converted elements. Non-finite floats are preserved. Applying the function
/// to its own output returns the same tree.
pub fn convert_numeric_types(datum: Datum) -> Datum {
    match datum {
        Datum::Scalar(s) => convert_scalar(s),
        Datum::Array(a) => Datum::List(a.scalars().into_iter().map(convert_scalar).collect()),
        Datum::List(items) => Datum::List(items.into_iter().map(convert_numeric_types).collect()),
        Datum::Map(map) => Datum::Map(
            map.into_iter()
                .map(|(k, v)| (k, convert_numeric_types(v)))
                .collect(),
        ),
        native => native,
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Datum::Null => serializer.serialize_unit(),
            Datum::Bool(b) => serializer.serialize_bool(*b),
            Datum::Int(i) => serializer.serialize_i64(*i),
            // serde_json writes non-finite floats as null
            Datum::Float(f) => serializer.serialize_f64(*f),
            Datum::Str(s) => serializer.serialize_str(s),
            Datum::List(items) => serializer.collect_seq(items),
            Datum::Map(map) => serializer.collect_map(map),
            Datum::Scalar(s) => convert_scalar(*s).serialize(serializer),
            Datum::Array(a) => serializer.collect_seq(a.scalars().into_iter().map(convert_scalar)),
        }
    }
}

/// Normalize and encode a tree as JSON text
///
/// `NullOnEncode` goes through `serde_json`. `Preserve` needs the bare
/// `NaN`/`Infinity` literals serde_json refuses to emit, so it has its own
/// writer using the same layout.
pub fn encode_json(datum: &Datum, policy: NanPolicy, pretty: bool) -> serde_json::Result<String> {
    let native = convert_numeric_types(datum.clone());
    match policy {
        NanPolicy::NullOnEncode if pretty => serde_json::to_string_pretty(&native),
        NanPolicy::NullOnEncode => serde_json::to_string(&native),
        NanPolicy::Preserve => {
            let mut out = String::new();
            write_preserving(&mut out, &native, pretty, 0)?;
            Ok(out)
        }
    }
}

fn write_indent(out: &mut String, pretty: bool, depth: usize) {
    if pretty {
        out.push('\n');
        out.push_str(&"  ".repeat(depth));
    }
}

fn write_preserving(out: &mut String, datum: &Datum, pretty: bool, depth: usize) -> serde_json::Result<()> {
    match datum {
        Datum::Float(f) if f.is_nan() => out.push_str("NaN"),
        Datum::Float(f) if f.is_infinite() => {
            out.push_str(if *f > 0.0 { "Infinity" } else { "-Infinity" })
        }
        Datum::List(items) if !items.is_empty() => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_indent(out, pretty, depth + 1);
                write_preserving(out, item, pretty, depth + 1)?;
            }
            write_indent(out, pretty, depth);
            out.push(']');
        }
        Datum::Map(map) if !map.is_empty() => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_indent(out, pretty, depth + 1);
                out.push_str(&serde_json::to_string(key)?);
                out.push_str(if pretty { ": " } else { ":" });
                write_preserving(out, value, pretty, depth + 1)?;
            }
            write_indent(out, pretty, depth);
            out.push('}');
        }
        leaf => out.push_str(&serde_json::to_string(leaf)?),
    }
    Ok(())
}

/// Failure while lowering a value into a [`Datum`]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct DatumError(String);

impl ser::Error for DatumError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DatumError(msg.to_string())
    }
}

/// Lower any serializable value into a report tree
///
/// Numbers stay typed ([`Datum::Scalar`]) until [`convert_numeric_types`]
/// runs, and non-finite floats survive. Map keys are coerced to strings, so
/// noise-level maps come out as `{"0": ...}`.
pub fn to_datum<T: Serialize + ?Sized>(value: &T) -> Result<Datum, DatumError> {
    value.serialize(DatumSerializer)
}

/// Serializer producing [`Datum`] trees
pub struct DatumSerializer;

impl Serializer for DatumSerializer {
    type Ok = Datum;
    type Error = DatumError;
    type SerializeSeq = SerializeList;
    type SerializeTuple = SerializeList;
    type SerializeTupleStruct = SerializeList;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeRecord;
    type SerializeStruct = SerializeRecord;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::Bool(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::I8(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::I16(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::I32(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::I64(v)))
    }

    fn serialize_u8(self, v: u8) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::U8(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::U16(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::U32(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::U64(v)))
    }

    fn serialize_f32(self, v: f32) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::F32(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Datum, DatumError> {
        Ok(Datum::Scalar(NumericScalar::F64(v)))
    }

    fn serialize_char(self, v: char) -> Result<Datum, DatumError> {
        Ok(Datum::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Datum, DatumError> {
        Ok(Datum::Str(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Datum, DatumError> {
        Ok(Datum::List(
            v.iter().map(|&b| Datum::Scalar(NumericScalar::U8(b))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Datum, DatumError> {
        Ok(Datum::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Datum, DatumError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Datum, DatumError> {
        Ok(Datum::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Datum, DatumError> {
        Ok(Datum::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Datum, DatumError> {
        Ok(Datum::Str(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Datum, DatumError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Datum, DatumError> {
        Ok(Datum::record([(variant, to_datum(value)?)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeList, DatumError> {
        Ok(SerializeList {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeList, DatumError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeList, DatumError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant, DatumError> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeRecord, DatumError> {
        Ok(SerializeRecord::default())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<SerializeRecord, DatumError> {
        Ok(SerializeRecord::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeStructVariant, DatumError> {
        Ok(SerializeStructVariant {
            variant,
            fields: BTreeMap::new(),
        })
    }
}

pub struct SerializeList {
    items: Vec<Datum>,
}

impl ser::SerializeSeq for SerializeList {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DatumError> {
        self.items.push(to_datum(value)?);
        Ok(())
    }

    fn end(self) -> Result<Datum, DatumError> {
        Ok(Datum::List(self.items))
    }
}

impl ser::SerializeTuple for SerializeList {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DatumError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Datum, DatumError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeList {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DatumError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Datum, DatumError> {
        ser::SerializeSeq::end(self)
    }
}

pub struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Datum>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DatumError> {
        self.items.push(to_datum(value)?);
        Ok(())
    }

    fn end(self) -> Result<Datum, DatumError> {
        Ok(Datum::record([(self.variant, Datum::List(self.items))]))
    }
}

#[derive(Default)]
pub struct SerializeRecord {
    fields: BTreeMap<String, Datum>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeRecord {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), DatumError> {
        self.next_key = Some(map_key(to_datum(key)?)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DatumError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| DatumError::custom("map value serialized before its key"))?;
        self.fields.insert(key, to_datum(value)?);
        Ok(())
    }

    fn end(self) -> Result<Datum, DatumError> {
        Ok(Datum::Map(self.fields))
    }
}

impl ser::SerializeStruct for SerializeRecord {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DatumError> {
        self.fields.insert(key.to_string(), to_datum(value)?);
        Ok(())
    }

    fn end(self) -> Result<Datum, DatumError> {
        Ok(Datum::Map(self.fields))
    }
}

pub struct SerializeStructVariant {
    variant: &'static str,
    fields: BTreeMap<String, Datum>,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Datum;
    type Error = DatumError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DatumError> {
        self.fields.insert(key.to_string(), to_datum(value)?);
        Ok(())
    }

    fn end(self) -> Result<Datum, DatumError> {
        Ok(Datum::record([(self.variant, Datum::Map(self.fields))]))
    }
}

// Integer and bool keys become their decimal/literal text
fn map_key(key: Datum) -> Result<String, DatumError> {
    match convert_numeric_types(key) {
        Datum::Str(s) => Ok(s),
        Datum::Int(i) => Ok(i.to_string()),
        Datum::Float(f) => Ok(f.to_string()),
        Datum::Bool(b) => Ok(b.to_string()),
        other => Err(DatumError(format!("unsupported map key: {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Datum {
        Datum::from(serde_json::from_str::<serde_json::Value>(text).unwrap())
    }

    #[test]
    fn test_convert_scalars_to_native() {
        let data = Datum::record([
            ("a", Datum::Scalar(NumericScalar::I64(1))),
            ("b", Datum::Scalar(NumericScalar::F64(2.5))),
            ("c", Datum::Scalar(NumericScalar::Bool(true))),
        ]);
        let converted = convert_numeric_types(data);
        assert_eq!(
            converted,
            Datum::record([
                ("a", Datum::Int(1)),
                ("b", Datum::Float(2.5)),
                ("c", Datum::Bool(true)),
            ])
        );
    }

    #[test]
    fn test_bool_scalar_is_not_an_integer() {
        let converted = convert_numeric_types(Datum::Scalar(NumericScalar::Bool(false)));
        assert_eq!(converted, Datum::Bool(false));
    }

    #[test]
    fn test_all_integer_widths_become_int() {
        let scalars = [
            NumericScalar::I8(-3),
            NumericScalar::I16(300),
            NumericScalar::I32(5),
            NumericScalar::U8(7),
            NumericScalar::U16(9),
            NumericScalar::U32(11),
            NumericScalar::U64(13),
        ];
        for s in scalars {
            assert!(matches!(convert_numeric_types(Datum::Scalar(s)), Datum::Int(_)));
        }
    }

    #[test]
    fn test_huge_u64_falls_back_to_float() {
        let converted = convert_numeric_types(Datum::Scalar(NumericScalar::U64(u64::MAX)));
        assert!(matches!(converted, Datum::Float(_)));
    }

    #[test]
    fn test_f32_keeps_short_decimal() {
        let converted = convert_numeric_types(Datum::Scalar(NumericScalar::F32(0.1)));
        assert_eq!(converted, Datum::Float(0.1));
    }

    #[test]
    fn test_array_becomes_list() {
        let converted = convert_numeric_types(Datum::Array(NumericArray::I64(vec![1, 2, 3])));
        assert_eq!(
            converted,
            Datum::List(vec![Datum::Int(1), Datum::Int(2), Datum::Int(3)])
        );
    }

    #[test]
    fn test_nested_structures_recurse() {
        let data = Datum::record([
            (
                "list",
                Datum::List(vec![
                    Datum::Scalar(NumericScalar::I64(1)),
                    Datum::Scalar(NumericScalar::F64(2.0)),
                ]),
            ),
            (
                "dict",
                Datum::record([("x", Datum::Scalar(NumericScalar::I32(5)))]),
            ),
            ("array", Datum::Array(NumericArray::F64(vec![1.5, 2.5]))),
        ]);
        let converted = convert_numeric_types(data);
        assert!(converted.is_native());
        assert_eq!(converted.get("dict").unwrap().get("x"), Some(&Datum::Int(5)));
        assert_eq!(
            converted.get("array").unwrap().as_list().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_nan_and_infinity_preserved_by_conversion() {
        let converted = convert_numeric_types(Datum::record([
            ("nan", Datum::Scalar(NumericScalar::F64(f64::NAN))),
            ("pos", Datum::Scalar(NumericScalar::F64(f64::INFINITY))),
            ("neg", Datum::Scalar(NumericScalar::F64(f64::NEG_INFINITY))),
        ]));
        assert!(converted.get("nan").unwrap().as_f64().unwrap().is_nan());
        assert_eq!(converted.get("pos").unwrap().as_f64(), Some(f64::INFINITY));
        assert_eq!(converted.get("neg").unwrap().as_f64(), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn test_native_structure_unchanged() {
        let data = Datum::record([
            ("str", Datum::Str("text".to_string())),
            ("int", Datum::Int(42)),
            ("float", Datum::Float(0.85)),
            ("bool", Datum::Bool(true)),
            ("none", Datum::Null),
        ]);
        assert_eq!(convert_numeric_types(data.clone()), data);
        assert_eq!(convert_numeric_types(Datum::Map(BTreeMap::new())), Datum::Map(BTreeMap::new()));
        assert_eq!(convert_numeric_types(Datum::List(vec![])), Datum::List(vec![]));
    }

    #[test]
    fn test_encode_null_on_encode_policy() {
        let data = Datum::record([
            ("value", Datum::Scalar(NumericScalar::F64(f64::NAN))),
            ("pos_inf", to_datum(&f64::INFINITY).unwrap()),
            ("neg_inf", to_datum(&f64::NEG_INFINITY).unwrap()),
        ]);
        let text = encode_json(&data, NanPolicy::NullOnEncode, false).unwrap();
        let loaded = parse(&text);
        assert_eq!(loaded.get("value"), Some(&Datum::Null));
        assert_eq!(loaded.get("pos_inf"), Some(&Datum::Null));
        assert_eq!(loaded.get("neg_inf"), Some(&Datum::Null));
    }

    #[test]
    fn test_encode_preserve_policy_writes_literals() {
        let data = Datum::List(vec![
            to_datum(&f64::NAN).unwrap(),
            to_datum(&f64::INFINITY).unwrap(),
            to_datum(&f64::NEG_INFINITY).unwrap(),
        ]);
        assert_eq!(
            encode_json(&data, NanPolicy::Preserve, false).unwrap(),
            "[NaN,Infinity,-Infinity]"
        );
    }

    #[test]
    fn test_encode_mixed_types() {
        let data = Datum::record([
            ("int", Datum::Scalar(NumericScalar::I32(10))),
            ("float", Datum::Scalar(NumericScalar::F32(2.5))),
            ("array", Datum::Array(NumericArray::F64(vec![1.0, 2.0]))),
            ("bool", Datum::Scalar(NumericScalar::Bool(false))),
            ("str", Datum::Str("text".to_string())),
        ]);
        let loaded = parse(&encode_json(&data, NanPolicy::NullOnEncode, true).unwrap());
        assert_eq!(loaded.get("int"), Some(&Datum::Int(10)));
        assert_eq!(loaded.get("float"), Some(&Datum::Float(2.5)));
        assert_eq!(
            loaded.get("array"),
            Some(&Datum::List(vec![Datum::Float(1.0), Datum::Float(2.0)]))
        );
        assert_eq!(loaded.get("bool"), Some(&Datum::Bool(false)));
        assert_eq!(loaded.get("str").and_then(Datum::as_str), Some("text"));
    }

    #[test]
    fn test_encode_escapes_strings() {
        let data = Datum::record([("quote", Datum::Str("say \"hi\"\n".to_string()))]);
        let loaded = parse(&encode_json(&data, NanPolicy::NullOnEncode, false).unwrap());
        assert_eq!(loaded.get("quote").and_then(Datum::as_str), Some("say \"hi\"\n"));
    }

    #[test]
    fn test_map_keys_coerced_to_strings() {
        let mut series = BTreeMap::new();
        series.insert(0u32, 0.407);
        series.insert(10u32, 0.308);
        let datum = to_datum(&series).unwrap();
        assert!(datum.get("0").is_some());
        assert!(datum.get("10").is_some());
    }

    #[derive(Serialize)]
    struct Summary {
        name: &'static str,
        count: usize,
        spread: f64,
        levels: Vec<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    }

    #[test]
    fn test_derived_struct_lowers_to_typed_record() {
        let summary = Summary {
            name: "semantic_distances",
            count: 7,
            spread: f64::NAN,
            levels: vec![0, 50],
            note: None,
        };
        let datum = to_datum(&summary).unwrap();
        assert!(!datum.is_native());
        assert_eq!(datum.get("count"), Some(&Datum::Scalar(NumericScalar::U64(7))));
        assert!(datum.get("note").is_none());

        let native = convert_numeric_types(datum);
        assert!(native.get("spread").unwrap().as_f64().unwrap().is_nan());
        assert_eq!(
            native.get("levels"),
            Some(&Datum::List(vec![Datum::Int(0), Datum::Int(50)]))
        );
    }

    #[test]
    fn test_null_on_encode_matches_serde_json_pretty_layout() {
        let data = Datum::record([
            ("a", Datum::List(vec![Datum::Int(1), Datum::Float(0.5)])),
            ("b", Datum::Map(BTreeMap::new())),
        ]);
        let expected = serde_json::to_string_pretty(&serde_json::json!({
            "a": [1, 0.5],
            "b": {}
        }))
        .unwrap();
        assert_eq!(encode_json(&data, NanPolicy::NullOnEncode, true).unwrap(), expected);
        // Preserve uses the same layout when every float is finite
        assert_eq!(encode_json(&data, NanPolicy::Preserve, true).unwrap(), expected);
    }

    #[test]
    fn test_enum_variants_and_non_string_keys() {
        #[derive(Serialize, PartialEq, Eq, PartialOrd, Ord)]
        #[serde(rename_all = "lowercase")]
        enum Band {
            Low,
        }

        let mut sizes = BTreeMap::new();
        sizes.insert(Band::Low, 3usize);
        let datum = convert_numeric_types(to_datum(&sizes).unwrap());
        assert_eq!(datum.get("low"), Some(&Datum::Int(3)));

        let nested: BTreeMap<(u32, u32), u32> = [((1, 2), 3)].into_iter().collect();
        assert!(to_datum(&nested).is_err());
    }
}
