//! Message generation for demos and performance runs.
//!
//! Generated text stays within printable ASCII so every message is
//! encodable, and is reproducible from a seed.
//!
//! # Design
//!
//! Generated messages mix:
//! - Word-like runs over a small alphabet (typical chat payloads)
//! - Repeated patterns (long runs of identical parity groups)
//! - Arbitrary printable characters

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const FIRST_PRINTABLE: u8 = 0x20;
const LAST_PRINTABLE: u8 = 0x7e;

/// Generate one printable message of exactly `len` characters.
pub fn generate_message(rng: &mut ChaCha8Rng, len: usize) -> String {
    let mut text = String::with_capacity(len);

    while text.len() < len {
        let remaining = len - text.len();
        let segment = remaining.min(rng.gen_range(4..=24));

        match rng.gen_range(0..10u8) {
            // 50% word-like
            0..=4 => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz ";
                for _ in 0..segment {
                    let idx = rng.gen_range(0..alphabet.len());
                    text.push(char::from(alphabet[idx]));
                }
            }

            // 20% repeating pattern
            5..=6 => {
                let pattern = generate_pattern(rng);
                for i in 0..segment {
                    text.push(char::from(pattern[i % pattern.len()]));
                }
            }

            // 30% arbitrary printable
            _ => {
                for _ in 0..segment {
                    text.push(char::from(rng.gen_range(FIRST_PRINTABLE..=LAST_PRINTABLE)));
                }
            }
        }
    }

    text
}

/// Generate `count` messages of `len` characters from one seed.
pub fn generate_messages(seed: u64, count: usize, len: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| generate_message(&mut rng, len)).collect()
}

/// Generate a small repeating pattern.
fn generate_pattern(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let pattern_len = rng.gen_range(2..=6);
    (0..pattern_len)
        .map(|_| rng.gen_range(FIRST_PRINTABLE..=LAST_PRINTABLE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiresim_core::bitio::string_to_bytes;

    #[test]
    fn test_generate_messages() {
        let messages = generate_messages(42, 5, 30);
        assert_eq!(messages.len(), 5);
        assert!(messages.iter().all(|m| m.len() == 30));
    }

    #[test]
    fn test_determinism() {
        assert_eq!(generate_messages(12345, 3, 50), generate_messages(12345, 3, 50));
    }

    #[test]
    fn test_different_seeds() {
        assert_ne!(generate_messages(1, 1, 100), generate_messages(2, 1, 100));
    }

    #[test]
    fn test_always_encodable() {
        for size in [0, 1, 7, 100, 1000] {
            for message in generate_messages(999, 4, size) {
                assert_eq!(message.len(), size);
                assert!(message.bytes().all(|b| (FIRST_PRINTABLE..=LAST_PRINTABLE).contains(&b)));
                assert!(string_to_bytes(&message).is_ok());
            }
        }
    }
}
