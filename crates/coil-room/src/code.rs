//! Room code generation.

use std::collections::HashMap;

use coil_protocol::RoomCode;
use rand::Rng;

/// Code alphabet. Visually ambiguous characters (I, O, 0, 1) are
/// excluded so codes survive being read aloud.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Six characters over a 32-character alphabet: about a billion codes
/// against at most a few thousand live rooms.
const CODE_LENGTH: usize = 6;

/// Draws one random candidate code.
pub(crate) fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    RoomCode::new(&code)
}

/// Allocates a code that is not currently in use.
///
/// Checked-and-retried rather than merely low-probability: a candidate
/// colliding with a live room is thrown away and redrawn, so the returned
/// code is guaranteed fresh at the moment of allocation. The caller holds
/// the registry lock, which keeps that moment race-free. Codes become
/// reusable once their room is destroyed.
pub(crate) fn allocate_code<V>(
    live: &HashMap<RoomCode, V>,
    mut candidate: impl FnMut() -> RoomCode,
) -> RoomCode {
    loop {
        let code = candidate();
        if !live.contains_key(&code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_characters() {
        for _ in 0..100 {
            assert_eq!(generate_code().as_str().len(), 6);
        }
    }

    #[test]
    fn test_generated_codes_stay_inside_the_alphabet() {
        for _ in 0..200 {
            let code = generate_code();
            for byte in code.as_str().bytes() {
                assert!(
                    ALPHABET.contains(&byte),
                    "unexpected character {:?} in {}",
                    byte as char,
                    code
                );
            }
        }
    }

    #[test]
    fn test_generated_codes_never_contain_ambiguous_characters() {
        for _ in 0..200 {
            let code = generate_code();
            for banned in ['I', 'O', '0', '1'] {
                assert!(!code.as_str().contains(banned), "got {code}");
            }
        }
    }

    #[test]
    fn test_allocate_code_retries_past_live_collisions() {
        let mut live = HashMap::new();
        live.insert(RoomCode::new("AAAAAA"), ());
        live.insert(RoomCode::new("BBBBBB"), ());

        let mut scripted = vec![
            RoomCode::new("AAAAAA"),
            RoomCode::new("BBBBBB"),
            RoomCode::new("CCCCCC"),
        ]
        .into_iter();

        let code = allocate_code(&live, || scripted.next().unwrap());
        assert_eq!(code, RoomCode::new("CCCCCC"));
    }

    #[test]
    fn test_allocate_code_accepts_first_fresh_candidate() {
        let live: HashMap<RoomCode, ()> = HashMap::new();
        let code = allocate_code(&live, || RoomCode::new("K7QX3B"));
        assert_eq!(code, RoomCode::new("K7QX3B"));
    }
}
