use crate::fol::INDEX_ENTRY_SIZE;

const WORD_SIZE: usize = std::mem::size_of::<u32>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

pub fn encrypt_file_content(data: &mut [u8], key: u32) {
    transform_content(data, key, Direction::Encrypt)
}

pub fn decrypt_file_content(data: &mut [u8], key: u32) {
    transform_content(data, key, Direction::Decrypt)
}

pub fn encrypt_index_entry(entry: &mut [u8; INDEX_ENTRY_SIZE], key: u32) {
    transform_index(entry, key, Direction::Encrypt)
}

pub fn decrypt_index_entry(entry: &mut [u8; INDEX_ENTRY_SIZE], key: u32) {
    transform_index(entry, key, Direction::Decrypt)
}

/// Applies the content cipher to every complete little-endian word of
/// `buffer`. The 1 to 3 trailing bytes of unaligned buffers are left as-is.
pub fn transform_content(buffer: &mut [u8], key: u32, direction: Direction) {
    transform_words(buffer, key, direction, content_term)
}

/// Applies the index cipher to a whole index entry.
pub fn transform_index(entry: &mut [u8; INDEX_ENTRY_SIZE], key: u32, direction: Direction) {
    transform_words(&mut entry[..], key, direction, index_term);
}

fn transform_words<F>(buffer: &mut [u8], key: u32, direction: Direction, term: F)
where
    F: Fn(u32) -> u32,
{
    for (i, word_bytes) in buffer.chunks_exact_mut(WORD_SIZE).enumerate() {
        // Only the low 32 bits of the word index matter
        let offset = key.wrapping_add(term(i as u32));
        let mut raw_word = [0; WORD_SIZE];
        raw_word.copy_from_slice(word_bytes);
        let word = u32::from_le_bytes(raw_word);
        let word = match direction {
            Direction::Encrypt => word.wrapping_add(offset),
            Direction::Decrypt => word.wrapping_sub(offset),
        };
        word_bytes.copy_from_slice(&word.to_le_bytes());
    }
}

// 99 * i^2
fn content_term(i: u32) -> u32 {
    99u32.wrapping_mul(i.wrapping_mul(i))
}

// 9 * i^3
fn index_term(i: u32) -> u32 {
    9u32.wrapping_mul(i.wrapping_mul(i).wrapping_mul(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use proptest::prelude::*;

    #[test]
    fn test_content_known_vector() {
        let mut data = hex!("00000000 00000000 00000000");
        encrypt_file_content(&mut data, 1);
        // Words: 0 + 1 + 0, 0 + 1 + 99, 0 + 1 + 396
        assert_eq!(data, hex!("01000000 64000000 8d010000"));
        decrypt_file_content(&mut data, 1);
        assert_eq!(data, [0u8; 12]);
    }

    #[test]
    fn test_content_wraps_around() {
        let mut data = hex!("ffffffff");
        encrypt_file_content(&mut data, 2);
        assert_eq!(data, hex!("01000000"));
        decrypt_file_content(&mut data, 2);
        assert_eq!(data, hex!("ffffffff"));
    }

    #[test]
    fn test_content_tail_untouched() {
        let mut data = hex!("10203040 aabbcc");
        encrypt_file_content(&mut data, 0xDEAD_BEEF);
        assert_ne!(data[..4], hex!("10203040"));
        assert_eq!(data[4..], hex!("aabbcc"));
    }

    #[test]
    fn test_content_short_buffer_untouched() {
        let mut data = hex!("010203");
        encrypt_file_content(&mut data, 0x1234_5678);
        assert_eq!(data, hex!("010203"));
    }

    #[test]
    fn test_index_known_vector() {
        let mut entry = [0u8; INDEX_ENTRY_SIZE];
        encrypt_index_entry(&mut entry, 0);
        // Word 2 gets 9 * 8 = 72, the last word gets 9 * 33^3
        assert_eq!(entry[8..12], 72u32.to_le_bytes());
        assert_eq!(entry[132..136], (9u32 * 33 * 33 * 33).to_le_bytes());
        // Exactly 34 words, none left out
        assert_eq!(INDEX_ENTRY_SIZE, 34 * WORD_SIZE);
        for (i, word_bytes) in entry.chunks_exact(WORD_SIZE).enumerate() {
            let i = i as u32;
            assert_eq!(word_bytes, (9 * i * i * i).to_le_bytes());
        }
        decrypt_index_entry(&mut entry, 0);
        assert_eq!(entry, [0u8; INDEX_ENTRY_SIZE]);
    }

    proptest! {
        #[test]
        fn prop_content_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512), key in any::<u32>()) {
            let mut buffer = data.clone();
            encrypt_file_content(&mut buffer, key);
            let tail = data.len() - data.len() % WORD_SIZE;
            prop_assert_eq!(&buffer[tail..], &data[tail..]);
            decrypt_file_content(&mut buffer, key);
            prop_assert_eq!(buffer, data);
        }

        #[test]
        fn prop_index_round_trip(data in proptest::collection::vec(any::<u8>(), INDEX_ENTRY_SIZE), key in any::<u32>()) {
            let mut entry = [0u8; INDEX_ENTRY_SIZE];
            entry.copy_from_slice(&data);
            decrypt_index_entry(&mut entry, key);
            encrypt_index_entry(&mut entry, key);
            prop_assert_eq!(&entry[..], &data[..]);
        }
    }
}
