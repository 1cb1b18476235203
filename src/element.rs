use std::fmt;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
    depth_tracking::DepthTracker,
    error::{Error, Result},
    marker::Marker,
};

/// A single encoded element. Arrays and maps only carry their length; their contents are the
/// elements that follow.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    Null,
    Bool(bool),
    /// Non-negative integer.
    PosInt(u64),
    /// Strictly negative integer.
    NegInt(i64),
    Str(&'a str),
    F32(f32),
    F64(f64),
    Bin(&'a [u8]),
    Array(usize),
    Map(usize),
}

impl<'a> Element<'a> {
    /// Build an integer element from a signed value, normalizing non-negative values.
    pub fn int(v: i64) -> Self {
        if v < 0 {
            Element::NegInt(v)
        } else {
            Element::PosInt(v as u64)
        }
    }

    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Null => "Null",
            Bool(_) => "Bool",
            PosInt(_) | NegInt(_) => "Int",
            Str(_) => "Str",
            F32(_) => "F32",
            F64(_) => "F64",
            Bin(_) => "Bin",
            Array(_) => "Array",
            Map(_) => "Map",
        }
    }
}

impl<'a> fmt::Display for Element<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize, markers: [Marker; 3]) {
    if len <= u8::MAX as usize {
        buf.push(markers[0].into());
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(markers[1].into());
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        buf.push(markers[2].into());
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
}

/// Serialize an element onto a byte vector. Doesn't check if Array & Map structures make
/// sense, just writes elements out. Lengths must fit in a u32; the serializer checks this before
/// getting here.
pub fn serialize_elem(buf: &mut Vec<u8>, elem: Element) {
    use self::Element::*;
    match elem {
        Null => buf.push(Marker::Null.into()),
        Bool(v) => buf.push(if v { Marker::True } else { Marker::False }.into()),
        PosInt(v) => {
            if v <= 127 {
                buf.push(Marker::PosFixInt(v as u8).into());
            } else if v <= u8::MAX as u64 {
                buf.push(Marker::UInt8.into());
                buf.push(v as u8);
            } else if v <= u16::MAX as u64 {
                buf.push(Marker::UInt16.into());
                buf.extend_from_slice(&(v as u16).to_le_bytes());
            } else if v <= u32::MAX as u64 {
                buf.push(Marker::UInt32.into());
                buf.extend_from_slice(&(v as u32).to_le_bytes());
            } else {
                buf.push(Marker::UInt64.into());
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        NegInt(v) => {
            if v >= -32 {
                buf.push(Marker::NegFixInt(v as i8).into());
            } else if v >= i8::MIN as i64 {
                buf.push(Marker::Int8.into());
                buf.push(v as u8);
            } else if v >= i16::MIN as i64 {
                buf.push(Marker::Int16.into());
                buf.extend_from_slice(&(v as i16).to_le_bytes());
            } else if v >= i32::MIN as i64 {
                buf.push(Marker::Int32.into());
                buf.extend_from_slice(&(v as i32).to_le_bytes());
            } else {
                buf.push(Marker::Int64.into());
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        Str(v) => {
            let len = v.len();
            if len <= 31 {
                buf.push(Marker::FixStr(len as u8).into());
            } else {
                write_len(buf, len, [Marker::Str8, Marker::Str16, Marker::Str32]);
            }
            buf.extend_from_slice(v.as_bytes());
        }
        F32(v) => {
            buf.push(Marker::F32.into());
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        F64(v) => {
            buf.push(Marker::F64.into());
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Bin(v) => {
            write_len(buf, v.len(), [Marker::Bin8, Marker::Bin16, Marker::Bin32]);
            buf.extend_from_slice(v);
        }
        Array(len) => {
            if len <= 15 {
                buf.push(Marker::FixArray(len as u8).into());
            } else {
                write_len(buf, len, [Marker::Array8, Marker::Array16, Marker::Array32]);
            }
        }
        Map(len) => {
            if len <= 15 {
                buf.push(Marker::FixMap(len as u8).into());
            } else {
                write_len(buf, len, [Marker::Map8, Marker::Map16, Marker::Map32]);
            }
        }
    }
}

fn not_shortest(what: &str, v: impl fmt::Display) -> Error {
    Error::Decode(format!(
        "Got {} with value = {}. This is not the shortest encoding.",
        what, v
    ))
}

/// Pulls elements off of an encoded byte slice, rejecting anything that isn't in canonical form.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    depth_tracking: DepthTracker,
    errored: bool,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self {
            data,
            depth_tracking: DepthTracker::new(),
            errored: false,
        }
    }

    pub fn peek_marker(&self) -> Option<Marker> {
        self.data.first().map(|n| Marker::from_u8(*n))
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    fn short(&self, step: &'static str, expected: usize) -> Error {
        Error::LengthTooShort {
            step,
            actual: self.data.len(),
            expected,
        }
    }

    fn read_u8(&mut self, step: &'static str) -> Result<u8> {
        let err = self.short(step, 1);
        self.data.read_u8().map_err(|_| err)
    }

    fn read_u16(&mut self, step: &'static str) -> Result<u16> {
        let err = self.short(step, 2);
        self.data.read_u16::<LittleEndian>().map_err(|_| err)
    }

    fn read_u32(&mut self, step: &'static str) -> Result<u32> {
        let err = self.short(step, 4);
        self.data.read_u32::<LittleEndian>().map_err(|_| err)
    }

    fn read_u64(&mut self, step: &'static str) -> Result<u64> {
        let err = self.short(step, 8);
        self.data.read_u64::<LittleEndian>().map_err(|_| err)
    }

    fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(self.short(step, len));
        }
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        Ok(bytes)
    }

    fn take_str(&mut self, len: usize, step: &'static str) -> Result<&'a str> {
        let bytes = self.take(len, step)?;
        std::str::from_utf8(bytes)
            .map_err(|e| Error::Decode(format!("String isn't valid UTF-8: {}", e)))
    }

    /// Reads an 8/16/32-bit length, checking it's the shortest encoding for the value.
    fn read_len(&mut self, width: u8, step: &'static str, what: &str) -> Result<usize> {
        let (len, min) = match width {
            1 => (self.read_u8(step)? as usize, 0),
            2 => (self.read_u16(step)? as usize, u8::MAX as usize + 1),
            _ => (self.read_u32(step)? as usize, u16::MAX as usize + 1),
        };
        if len < min {
            return Err(not_shortest(what, len));
        }
        Ok(len)
    }

    fn check_container(&self, what: &str, len: usize, min_bytes: usize) -> Result<()> {
        if len.saturating_mul(min_bytes) > self.data.len() {
            return Err(Error::Decode(format!(
                "Got {} marker with length = {}, but there are only {} bytes left.",
                what,
                len,
                self.data.len()
            )));
        }
        Ok(())
    }

    // Given a retrieved marker, try to turn it into the next element, which may move through the
    // data. This function *does not* set the errored flag; that's up to the caller.
    fn parse_element(&mut self, marker: Marker) -> Result<Element<'a>> {
        use self::Marker::*;
        let elem = match marker {
            Reserved => return Err(Error::Decode(String::from("Reserved marker found"))),
            Null => Element::Null,
            False => Element::Bool(false),
            True => Element::Bool(true),
            PosFixInt(v) => Element::PosInt(v as u64),
            UInt8 => {
                let v = self.read_u8("decode UInt8")?;
                if v < 128 {
                    return Err(not_shortest("UInt8", v));
                }
                Element::PosInt(v as u64)
            }
            UInt16 => {
                let v = self.read_u16("decode UInt16")?;
                if v <= u8::MAX as u16 {
                    return Err(not_shortest("UInt16", v));
                }
                Element::PosInt(v as u64)
            }
            UInt32 => {
                let v = self.read_u32("decode UInt32")?;
                if v <= u16::MAX as u32 {
                    return Err(not_shortest("UInt32", v));
                }
                Element::PosInt(v as u64)
            }
            UInt64 => {
                let v = self.read_u64("decode UInt64")?;
                if v <= u32::MAX as u64 {
                    return Err(not_shortest("UInt64", v));
                }
                Element::PosInt(v)
            }
            NegFixInt(v) => Element::NegInt(v as i64),
            Int8 => {
                let v = self.read_u8("decode Int8")? as i8;
                if v >= -32 {
                    return Err(not_shortest("Int8", v));
                }
                Element::NegInt(v as i64)
            }
            Int16 => {
                let v = self.read_u16("decode Int16")? as i16;
                if v >= i8::MIN as i16 {
                    return Err(not_shortest("Int16", v));
                }
                Element::NegInt(v as i64)
            }
            Int32 => {
                let v = self.read_u32("decode Int32")? as i32;
                if v >= i16::MIN as i32 {
                    return Err(not_shortest("Int32", v));
                }
                Element::NegInt(v as i64)
            }
            Int64 => {
                let v = self.read_u64("decode Int64")? as i64;
                if v >= i32::MIN as i64 {
                    return Err(not_shortest("Int64", v));
                }
                Element::NegInt(v)
            }
            F32 => Element::F32(f32::from_bits(self.read_u32("decode F32")?)),
            F64 => Element::F64(f64::from_bits(self.read_u64("decode F64")?)),
            FixStr(len) => Element::Str(self.take_str(len as usize, "get FixStr content")?),
            Str8 => {
                let len = self.read_len(1, "decode Str8 length", "Str8")?;
                if len <= 31 {
                    return Err(not_shortest("Str8 length", len));
                }
                Element::Str(self.take_str(len, "get Str8 content")?)
            }
            Str16 => {
                let len = self.read_len(2, "decode Str16 length", "Str16 length")?;
                Element::Str(self.take_str(len, "get Str16 content")?)
            }
            Str32 => {
                let len = self.read_len(4, "decode Str32 length", "Str32 length")?;
                Element::Str(self.take_str(len, "get Str32 content")?)
            }
            Bin8 => {
                let len = self.read_len(1, "decode Bin8 length", "Bin8 length")?;
                Element::Bin(self.take(len, "get Bin8 content")?)
            }
            Bin16 => {
                let len = self.read_len(2, "decode Bin16 length", "Bin16 length")?;
                Element::Bin(self.take(len, "get Bin16 content")?)
            }
            Bin32 => {
                let len = self.read_len(4, "decode Bin32 length", "Bin32 length")?;
                Element::Bin(self.take(len, "get Bin32 content")?)
            }
            FixArray(len) => {
                let len = len as usize;
                self.check_container("FixArray", len, 1)?;
                Element::Array(len)
            }
            Array8 => {
                let len = self.read_len(1, "decode Array8 length", "Array8 length")?;
                if len <= 15 {
                    return Err(not_shortest("Array8 length", len));
                }
                self.check_container("Array8", len, 1)?;
                Element::Array(len)
            }
            Array16 => {
                let len = self.read_len(2, "decode Array16 length", "Array16 length")?;
                self.check_container("Array16", len, 1)?;
                Element::Array(len)
            }
            Array32 => {
                let len = self.read_len(4, "decode Array32 length", "Array32 length")?;
                self.check_container("Array32", len, 1)?;
                Element::Array(len)
            }
            FixMap(len) => {
                let len = len as usize;
                self.check_container("FixMap", len, 2)?;
                Element::Map(len)
            }
            Map8 => {
                let len = self.read_len(1, "decode Map8 length", "Map8 length")?;
                if len <= 15 {
                    return Err(not_shortest("Map8 length", len));
                }
                self.check_container("Map8", len, 2)?;
                Element::Map(len)
            }
            Map16 => {
                let len = self.read_len(2, "decode Map16 length", "Map16 length")?;
                self.check_container("Map16", len, 2)?;
                Element::Map(len)
            }
            Map32 => {
                let len = self.read_len(4, "decode Map32 length", "Map32 length")?;
                self.check_container("Map32", len, 2)?;
                Element::Map(len)
            }
        };
        self.depth_tracking
            .update_elem(&elem)
            .map_err(|_| Error::ParseLimit("Depth limit exceeded".to_string()))?;
        Ok(elem)
    }
}

impl<'a> std::iter::Iterator for Parser<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let (&marker, data) = self.data.split_first()?;
        self.data = data;
        let result = self.parse_element(Marker::from_u8(marker));
        if result.is_err() {
            self.errored = true;
        }
        Some(result)
    }
}
