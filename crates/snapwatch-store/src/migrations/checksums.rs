//! SHA-256 checksums of migration SQL

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `content`
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = compute_checksum("CREATE TABLE captures (id INTEGER)");
        let b = compute_checksum("CREATE TABLE captures (id INTEGER)");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, compute_checksum("CREATE TABLE captures (id TEXT)"));
    }
}
