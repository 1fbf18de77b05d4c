//! UBJSON decoding into `serde_json::Value`.
//!
//! XGBoost 2.x writes models in UBJSON when the file name has no `.json`
//! extension. The document has the same shape as the JSON format, so the
//! decoded value feeds the same serde types. Optimized containers (`$` type
//! and `#` count headers) are supported, which is how XGBoost writes its
//! float and integer arrays.

use serde_json::{Map, Value};

use super::reader::{ByteReader, DecodeError};

const MAX_DEPTH: usize = 64;

/// Decode one UBJSON value from `bytes`. Trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = ByteReader::new(bytes);
    let value = read_value(&mut reader, 0)?;
    if reader.remaining() != 0 {
        return Err(reader.invalid("trailing data after the document"));
    }
    Ok(value)
}

fn read_value(r: &mut ByteReader<'_>, depth: usize) -> Result<Value, DecodeError> {
    loop {
        let offset = r.offset();
        let marker = r.u8()?;
        if marker != b'N' {
            return read_typed(r, marker, offset, depth);
        }
    }
}

fn read_typed(r: &mut ByteReader<'_>, marker: u8, offset: usize, depth: usize) -> Result<Value, DecodeError> {
    let value = match marker {
        b'Z' => Value::Null,
        b'T' => Value::Bool(true),
        b'F' => Value::Bool(false),
        b'i' => Value::from(r.i8()?),
        b'U' => Value::from(r.u8()?),
        b'I' => Value::from(r.i16_be()?),
        b'l' => Value::from(r.i32_be()?),
        b'L' => Value::from(r.i64_be()?),
        // Non-finite floats have no JSON form and decode as null.
        b'd' => Value::from(f64::from(r.f32_be()?)),
        b'D' => Value::from(r.f64_be()?),
        b'C' => Value::String(char::from(r.u8()?).to_string()),
        b'S' | b'H' => Value::String(read_string(r)?),
        b'[' => read_array(r, depth + 1)?,
        b'{' => read_object(r, depth + 1)?,
        _ => return Err(DecodeError::InvalidMarker { marker, offset }),
    };
    Ok(value)
}

fn read_length(r: &mut ByteReader<'_>) -> Result<usize, DecodeError> {
    let offset = r.offset();
    let len = match r.u8()? {
        b'i' => i64::from(r.i8()?),
        b'U' => i64::from(r.u8()?),
        b'I' => i64::from(r.i16_be()?),
        b'l' => i64::from(r.i32_be()?),
        b'L' => r.i64_be()?,
        marker => return Err(DecodeError::InvalidMarker { marker, offset }),
    };
    usize::try_from(len).map_err(|_| DecodeError::Invalid {
        offset,
        reason: format!("negative length {len}"),
    })
}

fn read_string(r: &mut ByteReader<'_>) -> Result<String, DecodeError> {
    let len = read_length(r)?;
    let offset = r.offset();
    let bytes = r.take(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::Invalid {
        offset,
        reason: "string is not valid UTF-8".to_owned(),
    })
}

/// Optional `$type` and `#count` following `[` or `{`.
fn read_container_header(r: &mut ByteReader<'_>) -> Result<(Option<u8>, Option<usize>), DecodeError> {
    let mut elem_type = None;
    if r.peek() == Some(b'$') {
        r.skip(1)?;
        elem_type = Some(r.u8()?);
    }
    if r.peek() == Some(b'#') {
        r.skip(1)?;
        return Ok((elem_type, Some(read_length(r)?)));
    }
    if elem_type.is_some() {
        return Err(r.invalid("typed container without a count"));
    }
    Ok((None, None))
}

fn read_element(r: &mut ByteReader<'_>, elem_type: Option<u8>, depth: usize) -> Result<Value, DecodeError> {
    match elem_type {
        Some(marker) => {
            let offset = r.offset();
            read_typed(r, marker, offset, depth)
        }
        None => read_value(r, depth),
    }
}

fn check_depth(r: &ByteReader<'_>, depth: usize) -> Result<(), DecodeError> {
    if depth > MAX_DEPTH {
        Err(r.invalid(format!("containers nested deeper than {MAX_DEPTH}")))
    } else {
        Ok(())
    }
}

fn read_array(r: &mut ByteReader<'_>, depth: usize) -> Result<Value, DecodeError> {
    check_depth(r, depth)?;
    let (elem_type, count) = read_container_header(r)?;

    let mut items = Vec::new();
    match count {
        Some(n) => {
            items.reserve(n.min(r.remaining()));
            for _ in 0..n {
                items.push(read_element(r, elem_type, depth)?);
            }
        }
        None => loop {
            match r.peek() {
                Some(b']') => {
                    r.skip(1)?;
                    break;
                }
                Some(b'N') => r.skip(1)?,
                _ => items.push(read_value(r, depth)?),
            }
        },
    }
    Ok(Value::Array(items))
}

fn read_object(r: &mut ByteReader<'_>, depth: usize) -> Result<Value, DecodeError> {
    check_depth(r, depth)?;
    let (elem_type, count) = read_container_header(r)?;

    let mut map = Map::new();
    match count {
        Some(n) => {
            for _ in 0..n {
                let key = read_string(r)?;
                map.insert(key, read_element(r, elem_type, depth)?);
            }
        }
        None => loop {
            match r.peek() {
                Some(b'}') => {
                    r.skip(1)?;
                    break;
                }
                Some(b'N') => r.skip(1)?,
                _ => {
                    let key = read_string(r)?;
                    map.insert(key, read_value(r, depth)?);
                }
            }
        },
    }
    Ok(Value::Object(map))
}
