//! Content identity
//!
//! The SHA-256 digest of the full file bytes is the canonical identity of a
//! piece of content; the on-chain registry and duplicate detection both key
//! on it. Watermark ids are the human-readable tag embedded into pixels.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of the given bytes.
///
/// Deterministic: byte-identical content always yields the same digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(bytes);
	hex::encode(hasher.finalize())
}

/// 0x-prefixed digest form used for on-chain metadata hashes.
pub fn metadata_hash(bytes: &[u8]) -> String {
	format!("0x{}", sha256_hex(bytes))
}

/// Generate a unique, human-readable watermark id.
///
/// Format: `DIPP-<timestamp36>-<random36>`, uppercase. Uniqueness comes from
/// the millisecond timestamp plus 4 random base-36 digits.
pub fn generate_watermark_id() -> String {
	let millis = chrono::Utc::now().timestamp_millis() as u64;
	let mut rng = rand::thread_rng();
	let salt: u32 = rng.gen_range(0..36u32.pow(4));
	format!("DIPP-{}-{:0>4}", to_base36(millis), to_base36(salt as u64))
}

fn to_base36(mut n: u64) -> String {
	const DIGITS: [char; 36] = [
		'0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H',
		'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
	];
	if n == 0 {
		return "0".to_string();
	}
	let mut out = Vec::new();
	while n > 0 {
		out.push(DIGITS[(n % 36) as usize]);
		n /= 36;
	}
	out.iter().rev().collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn digest_is_deterministic() {
		let bytes = b"the same content";
		assert_eq!(sha256_hex(bytes), sha256_hex(bytes));
	}

	#[test]
	fn digest_matches_known_vector() {
		// sha256("abc")
		assert_eq!(
			sha256_hex(b"abc"),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
	}

	#[test]
	fn digest_is_lowercase_hex() {
		let digest = sha256_hex(b"DippChain");
		assert_eq!(digest.len(), 64);
		assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn metadata_hash_is_prefixed() {
		assert!(metadata_hash(b"x").starts_with("0x"));
		assert_eq!(metadata_hash(b"x").len(), 66);
	}

	#[test]
	fn watermark_ids_are_unique_and_tagged() {
		let a = generate_watermark_id();
		let b = generate_watermark_id();
		assert!(a.starts_with("DIPP-"));
		// Random salt makes collisions within one millisecond vanishingly rare
		assert_ne!(a, b);
	}
}
