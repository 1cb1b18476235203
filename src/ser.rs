//! Serialization.
//!
//! Structs and maps are written with their keys in sorted order, so a given value always encodes
//! to the same bytes no matter what order a `HashMap` iterates in.
//!
//! Enum variants, when mapped, are:
//! - Unit - Just the variant name as a string
//! - Newtype - Map with one pair. Key is variant name, content is the value
//! - Tuple - Map with one pair. Key is variant name, content is the tuple as an array
//! - Struct - Map with one pair. Key is variant name, content is the struct

use serde::ser::*;
use std::{collections::BTreeMap, mem};

use crate::depth_tracking::DepthTracker;
use crate::element::*;
use crate::error::{Error, Result};

/// Serialize any value into a new byte vector.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut se = PackSerializer::default();
    value.serialize(&mut se)?;
    Ok(se.buf)
}

/// Serialize a value, appending to an existing buffer.
pub fn to_vec_with<T: Serialize + ?Sized>(buf: Vec<u8>, value: &T) -> Result<Vec<u8>> {
    let mut se = PackSerializer {
        depth_tracking: DepthTracker::new(),
        buf,
    };
    value.serialize(&mut se)?;
    Ok(se.buf)
}

#[derive(Default)]
struct PackSerializer {
    depth_tracking: DepthTracker,
    buf: Vec<u8>,
}

impl PackSerializer {
    fn encode_element(&mut self, elem: Element) -> Result<()> {
        self.track(&elem)?;
        serialize_elem(&mut self.buf, elem);
        Ok(())
    }

    fn track(&mut self, elem: &Element) -> Result<()> {
        self.depth_tracking
            .update_elem(elem)
            .map_err(|_| Error::Encode("Depth limit exceeded".to_string()))
    }

    fn check_len(len: usize) -> Result<usize> {
        if len > u32::MAX as usize {
            Err(Error::Encode(format!(
                "length {} doesn't fit in a 32-bit length field",
                len
            )))
        } else {
            Ok(len)
        }
    }
}

impl<'a> Serializer for &'a mut PackSerializer {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = TupleSerializer<'a>;
    type SerializeTupleStruct = TupleSerializer<'a>;
    type SerializeTupleVariant = TupleSerializer<'a>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = StructSerializer<'a>;
    type SerializeStructVariant = StructSerializer<'a>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.encode_element(Element::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.encode_element(Element::int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.encode_element(Element::PosInt(v))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.encode_element(Element::F32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.encode_element(Element::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut tmp = [0u8; 4];
        self.encode_element(Element::Str(v.encode_utf8(&mut tmp)))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        PackSerializer::check_len(v.len())?;
        self.encode_element(Element::Str(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        PackSerializer::check_len(v.len())?;
        self.encode_element(Element::Bin(v))
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, v: &T) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.encode_element(Element::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        v: &T,
    ) -> Result<()> {
        v.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        SeqSerializer::new(self, len)
    }

    fn serialize_tuple(self, len: usize) -> Result<TupleSerializer<'a>> {
        self.encode_element(Element::Array(PackSerializer::check_len(len)?))?;
        Ok(TupleSerializer::new(self))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<TupleSerializer<'a>> {
        // Tuple structs just discard the name
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        self.serialize_tuple(len)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        MapSerializer::new(self)
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.encode_element(Element::Map(len))?;
        Ok(StructSerializer::new(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.encode_element(Element::Map(1))?;
        self.encode_element(Element::Str(variant))?;
        self.encode_element(Element::Map(len))?;
        Ok(StructSerializer::new(self))
    }
}

/// Encode a sequence of possibly unknown length.
///
/// If the length is known, this looks just like the TupleSerializer. If it isn't, we can't write
/// the array marker ahead of time, so instead we:
///
/// 1. Swap a temporary buffer into the PackSerializer
/// 2. Update the depth tracker with a placeholder Array element
/// 3. Serialize elements into the temporary buffer, counting them
/// 4. On end(), swap the original buffer back, write the real array marker (skipping the depth
///    tracker), copy the temporary buffer over, and drop the placeholder depth
struct SeqSerializer<'a> {
    se: &'a mut PackSerializer,
    unknown_len: Option<(usize, Vec<u8>)>,
}

impl<'a> SeqSerializer<'a> {
    fn new(se: &'a mut PackSerializer, len: Option<usize>) -> Result<Self> {
        if let Some(len) = len {
            se.encode_element(Element::Array(PackSerializer::check_len(len)?))?;
            Ok(Self {
                se,
                unknown_len: None,
            })
        } else {
            se.track(&Element::Array(u32::MAX as usize))?;
            let enc = mem::take(&mut se.buf);
            Ok(Self {
                se,
                unknown_len: Some((0, enc)),
            })
        }
    }
}

impl<'a> SerializeSeq for SeqSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        if let Some((ref mut len, _)) = self.unknown_len {
            *len += 1;
        }
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        if let Some((len, enc)) = self.unknown_len {
            PackSerializer::check_len(len)?;
            let enc = mem::replace(&mut self.se.buf, enc);
            serialize_elem(&mut self.se.buf, Element::Array(len));
            self.se.buf.extend_from_slice(&enc);
            self.se.depth_tracking.early_end();
        }
        Ok(())
    }
}

struct TupleSerializer<'a> {
    se: &'a mut PackSerializer,
}

impl<'a> TupleSerializer<'a> {
    fn new(se: &'a mut PackSerializer) -> Self {
        Self { se }
    }
}

impl<'a> SerializeTuple for TupleSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleStruct for TupleSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleVariant for TupleSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.se)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Maps are always reordered: each key/value pair is encoded into its own buffer, stored in a
/// BTreeMap, and flushed in key order at the end. The map marker is written last, once we know
/// how many distinct keys there were.
struct MapSerializer<'a> {
    se: &'a mut PackSerializer,
    map: BTreeMap<String, Vec<u8>>,
    pending_key: String,
}

impl<'a> MapSerializer<'a> {
    fn new(se: &'a mut PackSerializer) -> Result<Self> {
        se.track(&Element::Map(u32::MAX as usize))?;
        Ok(Self {
            se,
            map: BTreeMap::new(),
            pending_key: String::new(),
        })
    }
}

impl<'a> SerializeMap for MapSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(KeySerializer::new(&mut self.pending_key))
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        // Slot in buffer, fill it like we're writing to the actual buffer, then store it off for
        // later reordering
        let buf = mem::take(&mut self.se.buf);
        self.se.encode_element(Element::Str(&self.pending_key))?;
        value.serialize(&mut *self.se)?;
        let buf = mem::replace(&mut self.se.buf, buf);
        let key = mem::take(&mut self.pending_key);
        if self.map.contains_key(&key) {
            return Err(Error::Encode(format!("map has duplicate key: {}", key)));
        }
        self.map.insert(key, buf);
        Ok(())
    }

    fn end(self) -> Result<()> {
        let MapSerializer { se, map, .. } = self;
        PackSerializer::check_len(map.len())?;
        serialize_elem(&mut se.buf, Element::Map(map.len()));
        for vec in map.values() {
            se.buf.extend_from_slice(vec);
        }
        se.depth_tracking.early_end();
        Ok(())
    }
}

struct StructSerializer<'a> {
    se: &'a mut PackSerializer,
    map: BTreeMap<&'static str, Vec<u8>>,
}

impl<'a> StructSerializer<'a> {
    fn new(se: &'a mut PackSerializer) -> Self {
        Self {
            se,
            map: BTreeMap::new(),
        }
    }

    fn serialize_field_inner<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        let buf = mem::take(&mut self.se.buf);
        self.se.encode_element(Element::Str(field))?;
        value.serialize(&mut *self.se)?;
        let buf = mem::replace(&mut self.se.buf, buf);
        if self.map.insert(field, buf).is_some() {
            return Err(Error::Encode(format!("struct has duplicate field: {}", field)));
        }
        Ok(())
    }

    fn end_inner(self) -> Result<()> {
        for vec in self.map.values() {
            self.se.buf.extend_from_slice(vec);
        }
        Ok(())
    }
}

impl<'a> SerializeStruct for StructSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.serialize_field_inner(field, value)
    }

    fn end(self) -> Result<()> {
        self.end_inner()
    }
}

impl<'a> SerializeStructVariant for StructSerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        field: &'static str,
        value: &T,
    ) -> Result<()> {
        self.serialize_field_inner(field, value)
    }

    fn end(self) -> Result<()> {
        self.end_inner()
    }
}

/// Map keys must come out as strings; anything else is an encoding error.
struct KeySerializer<'a> {
    s: &'a mut String,
}

impl<'a> KeySerializer<'a> {
    fn new(s: &'a mut String) -> Self {
        s.clear();
        Self { s }
    }

    fn ser_fail(&self, received: &'static str) -> Error {
        Error::Encode(format!("map keys must be strings, received {}", received))
    }
}

impl<'a> Serializer for KeySerializer<'a> {
    type Ok = ();
    type Error = Error;

    fn serialize_char(self, v: char) -> Result<()> {
        self.s.push(v);
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.s.push_str(v);
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.s.push_str(variant);
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        v: &T,
    ) -> Result<()> {
        v.serialize(self)
    }

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, _: bool) -> Result<()> {
        Err(self.ser_fail("bool"))
    }

    fn serialize_i8(self, _: i8) -> Result<()> {
        Err(self.ser_fail("i8"))
    }

    fn serialize_i16(self, _: i16) -> Result<()> {
        Err(self.ser_fail("i16"))
    }

    fn serialize_i32(self, _: i32) -> Result<()> {
        Err(self.ser_fail("i32"))
    }

    fn serialize_i64(self, _: i64) -> Result<()> {
        Err(self.ser_fail("i64"))
    }

    fn serialize_u8(self, _: u8) -> Result<()> {
        Err(self.ser_fail("u8"))
    }

    fn serialize_u16(self, _: u16) -> Result<()> {
        Err(self.ser_fail("u16"))
    }

    fn serialize_u32(self, _: u32) -> Result<()> {
        Err(self.ser_fail("u32"))
    }

    fn serialize_u64(self, _: u64) -> Result<()> {
        Err(self.ser_fail("u64"))
    }

    fn serialize_f32(self, _: f32) -> Result<()> {
        Err(self.ser_fail("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<()> {
        Err(self.ser_fail("f64"))
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<()> {
        Err(self.ser_fail("bytes"))
    }

    fn serialize_none(self) -> Result<()> {
        Err(self.ser_fail("None"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _: &T) -> Result<()> {
        Err(self.ser_fail("Some"))
    }

    fn serialize_unit(self) -> Result<()> {
        Err(self.ser_fail("unit"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<()> {
        Err(self.ser_fail("unit_struct"))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(self.ser_fail("newtype_variant"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(self.ser_fail("seq"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple> {
        Err(self.ser_fail("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(self.ser_fail("tuple_struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(self.ser_fail("tuple_variant"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap> {
        Err(self.ser_fail("map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(self.ser_fail("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(self.ser_fail("struct_variant"))
    }
}
