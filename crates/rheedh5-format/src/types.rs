use std::collections::HashMap;
use std::fmt;

use crate::attribute::AttributeMessage;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;

/// Decoded attribute value. Integers widen to 64 bits; f32 widens to
/// f64; fixed-length strings are trimmed at the first NUL.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    I64(i64),
    I64Array(Vec<i64>),
    U64(u64),
    F64(f64),
    F64Array(Vec<f64>),
    String(String),
    StringArray(Vec<String>),
}

impl AttrValue {
    /// Short type label for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::I64(_) => "integer",
            AttrValue::I64Array(_) => "integer array",
            AttrValue::U64(_) => "unsigned integer",
            AttrValue::F64(_) => "float",
            AttrValue::F64Array(_) => "float array",
            AttrValue::String(_) => "string",
            AttrValue::StringArray(_) => "string array",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::I64(v) => write!(f, "{v}"),
            AttrValue::U64(v) => write!(f, "{v}"),
            AttrValue::F64(v) => write!(f, "{v}"),
            AttrValue::String(v) => write!(f, "{v}"),
            AttrValue::I64Array(v) => write!(f, "{v:?}"),
            AttrValue::F64Array(v) => write!(f, "{v:?}"),
            AttrValue::StringArray(v) => write!(f, "{v:?}"),
        }
    }
}

/// Decode every attribute message of an object header into a name map.
pub fn attrs_to_map(header: &ObjectHeader) -> Result<HashMap<String, AttrValue>, FormatError> {
    let mut map = HashMap::new();
    for msg in header.messages_of(MessageType::Attribute) {
        let attr = AttributeMessage::parse(&msg.data)?;
        let value = decode_attr_value(&attr)?;
        map.insert(attr.name, value);
    }
    Ok(map)
}

pub fn decode_attr_value(attr: &AttributeMessage) -> Result<AttrValue, FormatError> {
    let n = attr.dataspace.num_elements() as usize;
    let scalar = attr.dataspace.is_scalar;
    match attr.datatype {
        Datatype::FixedPoint { size, signed, big_endian } => {
            let values: Vec<i64> = (0..n)
                .map(|i| read_int(&attr.raw_data[i * size as usize..], size, signed, big_endian))
                .collect();
            if scalar {
                if !signed && size == 8 {
                    return Ok(AttrValue::U64(values[0] as u64));
                }
                Ok(AttrValue::I64(values[0]))
            } else {
                Ok(AttrValue::I64Array(values))
            }
        }
        Datatype::Float { size, big_endian } => {
            let values: Vec<f64> = (0..n)
                .map(|i| read_float(&attr.raw_data[i * size as usize..], size, big_endian))
                .collect();
            if scalar {
                Ok(AttrValue::F64(values[0]))
            } else {
                Ok(AttrValue::F64Array(values))
            }
        }
        Datatype::String { size } => {
            let size = size as usize;
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                let bytes = &attr.raw_data[i * size..(i + 1) * size];
                let nul = bytes.iter().position(|&b| b == 0).unwrap_or(size);
                let s = std::str::from_utf8(&bytes[..nul]).map_err(|_| {
                    FormatError::InvalidMessage {
                        what: "attribute",
                        detail: format!("string value of {:?} is not valid UTF-8", attr.name),
                    }
                })?;
                values.push(s.to_owned());
            }
            if scalar {
                Ok(AttrValue::String(values.remove(0)))
            } else {
                Ok(AttrValue::StringArray(values))
            }
        }
    }
}

fn read_int(bytes: &[u8], size: u32, signed: bool, big_endian: bool) -> i64 {
    let size = size as usize;
    let mut raw = [0u8; 8];
    if big_endian {
        raw[8 - size..].copy_from_slice(&bytes[..size]);
        let unsigned = u64::from_be_bytes(raw);
        extend_sign(unsigned, size, signed)
    } else {
        raw[..size].copy_from_slice(&bytes[..size]);
        let unsigned = u64::from_le_bytes(raw);
        extend_sign(unsigned, size, signed)
    }
}

fn extend_sign(unsigned: u64, size: usize, signed: bool) -> i64 {
    if !signed || size == 8 {
        return unsigned as i64;
    }
    let shift = 64 - size * 8;
    ((unsigned << shift) as i64) >> shift
}

fn read_float(bytes: &[u8], size: u32, big_endian: bool) -> f64 {
    match (size, big_endian) {
        (4, false) => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (4, true) => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (_, false) => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        (_, true) => f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataspace::Dataspace;

    fn attr(dt: Datatype, dims: &[u64], raw: Vec<u8>) -> AttributeMessage {
        AttributeMessage {
            name: "a".into(),
            datatype: dt,
            dataspace: Dataspace::parse(&Dataspace::serialize_v2(dims)).unwrap(),
            raw_data: raw,
        }
    }

    #[test]
    fn scalar_signed_integers_extend() {
        let a = attr(
            Datatype::FixedPoint { size: 2, signed: true, big_endian: false },
            &[],
            (-5i16).to_le_bytes().to_vec(),
        );
        assert_eq!(decode_attr_value(&a).unwrap(), AttrValue::I64(-5));
    }

    #[test]
    fn scalar_u64_stays_unsigned() {
        let a = attr(
            Datatype::FixedPoint { size: 8, signed: false, big_endian: false },
            &[],
            u64::MAX.to_le_bytes().to_vec(),
        );
        assert_eq!(decode_attr_value(&a).unwrap(), AttrValue::U64(u64::MAX));
    }

    #[test]
    fn big_endian_integers() {
        let a = attr(
            Datatype::FixedPoint { size: 4, signed: true, big_endian: true },
            &[],
            120i32.to_be_bytes().to_vec(),
        );
        assert_eq!(decode_attr_value(&a).unwrap(), AttrValue::I64(120));
    }

    #[test]
    fn f32_widens() {
        let a = attr(
            Datatype::Float { size: 4, big_endian: false },
            &[],
            120.0f32.to_le_bytes().to_vec(),
        );
        assert_eq!(decode_attr_value(&a).unwrap(), AttrValue::F64(120.0));
    }

    #[test]
    fn string_array_trims_nuls() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"ab\0\0");
        raw.extend_from_slice(b"cdef");
        let a = attr(Datatype::String { size: 4 }, &[2], raw);
        assert_eq!(
            decode_attr_value(&a).unwrap(),
            AttrValue::StringArray(vec!["ab".into(), "cdef".into()])
        );
    }
}
