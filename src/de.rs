//! Deserialization.
//!
//! Mirrors `ser`: map and struct keys must appear in strictly increasing order, so a duplicate or
//! out-of-order key is an error rather than a silent overwrite.

use std::fmt;

use serde::de::Error as DeError;
use serde::de::*;

use crate::{
    element::*,
    error::{Error, Result},
};

/// Deserialize a value from a byte slice. All bytes must be consumed.
pub fn from_slice<'de, T: Deserialize<'de>>(buf: &'de [u8]) -> Result<T> {
    let mut de = PackDeserializer::new(buf);
    let value = T::deserialize(&mut de)?;
    let left = de.parser.remaining();
    if left != 0 {
        return Err(Error::Decode(format!(
            "{} trailing bytes after the encoded value",
            left
        )));
    }
    Ok(value)
}

struct PackDeserializer<'a> {
    parser: Parser<'a>,
}

impl<'a> PackDeserializer<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            parser: Parser::new(buf),
        }
    }

    fn next_elem(&mut self) -> Result<Element<'a>> {
        self.parser.next().ok_or(Error::LengthTooShort {
            step: "get next element",
            actual: 0,
            expected: 1,
        })?
    }
}

impl<'de, 'a> serde::Deserializer<'de> for &'a mut PackDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let elem = self.next_elem()?;
        match elem {
            Element::Null => visitor.visit_unit(),
            Element::Bool(v) => visitor.visit_bool(v),
            Element::PosInt(v) => visitor.visit_u64(v),
            Element::NegInt(v) => visitor.visit_i64(v),
            Element::Str(v) => visitor.visit_borrowed_str(v),
            Element::F32(v) => visitor.visit_f32(v),
            Element::F64(v) => visitor.visit_f64(v),
            Element::Bin(v) => visitor.visit_borrowed_bytes(v),
            Element::Array(len) => {
                let mut access = SeqAccess::new(self, len);
                let value = visitor.visit_seq(&mut access)?;
                access.finish(len)?;
                Ok(value)
            }
            Element::Map(len) => {
                let mut access = MapAccess::new(self, len);
                let value = visitor.visit_map(&mut access)?;
                access.finish(len)?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        use crate::marker::Marker;
        let marker = self.parser.peek_marker().ok_or(Error::LengthTooShort {
            step: "get optional value",
            actual: 0,
            expected: 1,
        })?;
        if marker == Marker::Null {
            self.next_elem()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(EnumAccess::new(self))
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf unit unit_struct newtype_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct EnumAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    has_value: bool,
}

impl<'a, 'de> EnumAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>) -> Self {
        Self {
            de,
            has_value: false,
        }
    }
}

impl<'a, 'de> serde::de::EnumAccess<'de> for EnumAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(mut self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        use crate::marker::Marker;
        let marker = self.de.parser.peek_marker().ok_or(Error::LengthTooShort {
            step: "get enum variant",
            actual: 0,
            expected: 1,
        })?;
        let val = match marker {
            Marker::FixMap(1) => {
                self.de.next_elem()?;
                self.has_value = true;
                seed.deserialize(&mut *self.de)?
            }
            m if m.is_str() => {
                self.has_value = false;
                seed.deserialize(&mut *self.de)?
            }
            _ => {
                return Err(Error::Decode(
                    "expected a size-1 map or a string for an enum".to_string(),
                ))
            }
        };
        Ok((val, self))
    }
}

impl<'a, 'de> serde::de::VariantAccess<'de> for EnumAccess<'a, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        if self.has_value {
            Err(Error::invalid_type(Unexpected::NewtypeVariant, &"unit variant"))
        } else {
            Ok(())
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        if self.has_value {
            seed.deserialize(&mut *self.de)
        } else {
            Err(Error::invalid_type(Unexpected::UnitVariant, &"newtype variant"))
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            serde::Deserializer::deserialize_map(&mut *self.de, visitor)
        } else {
            Err(Error::invalid_type(Unexpected::UnitVariant, &"struct variant"))
        }
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.has_value {
            serde::Deserializer::deserialize_tuple(&mut *self.de, len, visitor)
        } else {
            Err(Error::invalid_type(Unexpected::UnitVariant, &"tuple variant"))
        }
    }
}

struct SeqAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    size_left: usize,
}

impl<'a, 'de> SeqAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>, len: usize) -> Self {
        Self { de, size_left: len }
    }

    /// A visitor that stops early would leave the rest of the array to be misread as whatever
    /// comes next.
    fn finish(&self, len: usize) -> Result<()> {
        if self.size_left != 0 {
            return Err(Error::invalid_length(len, &"fewer elements in array"));
        }
        Ok(())
    }
}

impl<'a, 'b, 'de> serde::de::SeqAccess<'de> for &'b mut SeqAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.size_left > 0 {
            self.size_left -= 1;
            let val = seed.deserialize(&mut *self.de)?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}

#[derive(Clone, Copy)]
struct KeyStr<'de>(&'de str);

impl<'de> Deserialize<'de> for KeyStr<'de> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor;
        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = KeyStr<'de>;

            fn expecting(
                &self,
                fmt: &mut fmt::Formatter<'_>,
            ) -> std::result::Result<(), fmt::Error> {
                write!(fmt, "a key string")
            }

            fn visit_borrowed_str<E: serde::de::Error>(
                self,
                v: &'de str,
            ) -> std::result::Result<Self::Value, E> {
                Ok(KeyStr(v))
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}

impl<'de> Deserializer<'de> for KeyStr<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.0)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf option unit unit_struct newtype_struct
        seq tuple tuple_struct map struct enum identifier ignored_any
    }
}

struct MapAccess<'a, 'de> {
    de: &'a mut PackDeserializer<'de>,
    size_left: usize,
    last_str: Option<KeyStr<'de>>,
}

impl<'a, 'de> MapAccess<'a, 'de> {
    fn new(de: &'a mut PackDeserializer<'de>, len: usize) -> Self {
        Self {
            de,
            size_left: len,
            last_str: None,
        }
    }

    fn finish(&self, len: usize) -> Result<()> {
        if self.size_left != 0 {
            return Err(Error::invalid_length(len, &"fewer entries in map"));
        }
        Ok(())
    }
}

impl<'a, 'b, 'de> serde::de::MapAccess<'de> for &'b mut MapAccess<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.size_left == 0 {
            return Ok(None);
        }
        self.size_left -= 1;
        let new_str = KeyStr::deserialize(&mut *self.de)?;
        if let Some(last_str) = self.last_str {
            if new_str.0 <= last_str.0 {
                return Err(Error::Decode(format!(
                    "map keys are unordered: {} follows {}",
                    new_str.0, last_str.0
                )));
            }
        }
        self.last_str = Some(new_str);
        Ok(Some(seed.deserialize(new_str)?))
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}
