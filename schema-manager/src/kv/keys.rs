//! Bit-exact persistent key layout and the small ordered-tuple
//! encoding used to build it. Each tuple element is emitted as a
//! big-endian length prefix followed by its raw bytes, the same framing
//! `codec::bytes_codec` uses for length-prefixed values — this keeps a
//! prefix-tuple's encoding a true byte prefix of any tuple that extends
//! it, which is all `range_starts_with` needs.

use byteorder::{BigEndian, WriteBytesExt};

const AIS: &str = "ais/";
const GENERATION: &str = "generation";
const BLOBS: &str = "pb/";

fn encode_tuple(parts: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    for part in parts {
        buf.write_u32::<BigEndian>(part.len() as u32).expect("writing to a Vec cannot fail");
        buf.extend_from_slice(part);
    }
    buf
}

/// `("sm/", "ais/", "generation")`.
pub fn generation_key(namespace: &str) -> Vec<u8> {
    encode_tuple(&[namespace.as_bytes(), AIS.as_bytes(), GENERATION.as_bytes()])
}

/// `("sm/", "ais/", "pb/", <schemaName>)`.
pub fn schema_blob_key(namespace: &str, schema_name: &str) -> Vec<u8> {
    encode_tuple(&[namespace.as_bytes(), AIS.as_bytes(), BLOBS.as_bytes(), schema_name.as_bytes()])
}

/// Prefix for a `range_starts_with` scan over every per-schema blob.
pub fn schema_blob_prefix(namespace: &str) -> Vec<u8> {
    encode_tuple(&[namespace.as_bytes(), AIS.as_bytes(), BLOBS.as_bytes()])
}

/// Encodes a generation value as a packed 64-bit signed integer.
pub fn encode_generation(generation: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    buf.write_i64::<BigEndian>(generation).expect("writing to a Vec cannot fail");
    buf
}

/// Decodes a generation value packed by [`encode_generation`].
pub fn decode_generation(bytes: &[u8]) -> crate::error::CResult<i64> {
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    let mut cursor = Cursor::new(bytes);
    cursor
        .read_i64::<BigEndian>()
        .map_err(|e| crate::error::Error::Kv(format!("malformed generation value: {e}")))
}

/// Recovers the schema name from a blob key produced by [`schema_blob_key`].
/// Used by tests and by anything that wants to know which schema a scanned
/// key belongs to without re-deriving it from the value.
pub fn schema_name_from_blob_key(namespace: &str, key: &[u8]) -> Option<String> {
    let prefix = schema_blob_prefix(namespace);
    if !key.starts_with(&prefix) {
        return None;
    }
    let rest = &key[prefix.len()..];
    if rest.len() < 4 {
        return None;
    }
    let len = u32::from_be_bytes(rest[0..4].try_into().ok()?) as usize;
    let name_bytes = rest.get(4..4 + len)?;
    String::from_utf8(name_bytes.to_vec()).ok()
}
