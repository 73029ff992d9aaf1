use crate::{FolError, Result};
use encoding::label::encoding_from_whatwg_label;
use encoding::types::EncodingRef;
use encoding::{DecoderTrap, EncoderTrap};

/// Size of the name field at the start of every index entry
pub const NAME_FIELD_SIZE: usize = 128;
/// Longest encoded name, so that the field always keeps a NUL terminator
pub const MAX_NAME_SIZE: usize = NAME_FIELD_SIZE - 1;

// Archive paths are stored in the game's native code page
const NAME_ENCODING_LABEL: &str = "gbk";

/// Serializes an archive path into a fixed-size, NUL-padded name field.
///
/// Names longer than `MAX_NAME_SIZE` bytes once encoded are truncated.
pub fn serialize_name_field(name: &str) -> Result<[u8; NAME_FIELD_SIZE]> {
    let mut encoded = serialize_to_gbk(name)?;
    if encoded.len() > MAX_NAME_SIZE {
        log::warn!("'{}' is too long and will be truncated", name);
        encoded.truncate(MAX_NAME_SIZE);
    }
    let mut field = [0; NAME_FIELD_SIZE];
    field[..encoded.len()].copy_from_slice(&encoded);
    Ok(field)
}

/// Extracts the archive path stored in a name field, up to the first NUL
/// char or the end of the field.
pub fn string_from_name_field(field: &[u8]) -> Result<String> {
    let name_end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    string_from_gbk(&field[..name_end])
}

pub fn serialize_to_gbk(string: &str) -> Result<Vec<u8>> {
    let encoder = name_encoding()?;
    match encoder.encode(string, EncoderTrap::Strict) {
        Ok(v) => Ok(v),
        Err(_) => {
            log::warn!(
                "'{}' contains characters GBK cannot represent, dropping them",
                string
            );
            encoder
                .encode(string, EncoderTrap::Ignore)
                .map_err(|_| FolError::serialization_error("Encoding failed"))
        }
    }
}

pub fn string_from_gbk(v: &[u8]) -> Result<String> {
    let decoder = name_encoding()?;
    if let Ok(s) = decoder.decode(v, DecoderTrap::Strict) {
        return Ok(s);
    }
    // Some tools wrote UTF-8 names, and truncation can split a GBK sequence
    match std::str::from_utf8(v) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => decoder
            .decode(v, DecoderTrap::Replace)
            .map_err(FolError::serialization_error),
    }
}

fn name_encoding() -> Result<EncodingRef> {
    encoding_from_whatwg_label(NAME_ENCODING_LABEL)
        .ok_or_else(|| FolError::serialization_error("Encoding unavailable"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_field_ascii() {
        let field = serialize_name_field("data\\texture\\a.bmp").unwrap();
        assert_eq!(&field[..18], b"data\\texture\\a.bmp");
        assert!(field[18..].iter().all(|&b| b == 0));
        assert_eq!(
            string_from_name_field(&field).unwrap(),
            "data\\texture\\a.bmp"
        );
    }

    #[test]
    fn test_name_field_gbk() {
        let name = "data\\角色\\hero.spr";
        let field = serialize_name_field(name).unwrap();
        // Two CJK chars take two bytes each in GBK
        assert_eq!(field.iter().position(|&b| b == 0), Some(18));
        assert_eq!(string_from_name_field(&field).unwrap(), name);
    }

    #[test]
    fn test_name_field_truncation() {
        let name = "a".repeat(200);
        let field = serialize_name_field(&name).unwrap();
        assert_eq!(field[MAX_NAME_SIZE], 0);
        assert_eq!(string_from_name_field(&field).unwrap(), "a".repeat(127));
    }

    #[test]
    fn test_unterminated_name_field() {
        let field = [b'x'; NAME_FIELD_SIZE];
        assert_eq!(string_from_name_field(&field).unwrap(), "x".repeat(128));
    }
}
