use crate::protocol::mysql::constants::SCRAMBLE_SIZE;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates the 20-byte scramble sent in the handshake's auth-plugin-data.
/// The adapter never checks the client's response against it — any
/// credentials are accepted — but stock clients refuse to complete the
/// handshake without a plausible-looking scramble present.
pub fn gen_scramble() -> [u8; SCRAMBLE_SIZE] {
    let mut salt: [u8; SCRAMBLE_SIZE] = [0; SCRAMBLE_SIZE];
    let mut r = StdRng::from_entropy();
    for salt_item in salt.iter_mut() {
        let salt_rand = r.gen_range(0..127) as u8;
        *salt_item = salt_rand;
        if *salt_item == b'\0' || *salt_item == b'$' {
            *salt_item += 1;
        }
    }
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scramble_has_no_nul_or_dollar_bytes() {
        for _ in 0..50 {
            let s = gen_scramble();
            assert!(s.iter().all(|b| *b != 0 && *b != b'$'));
        }
    }
}
