//! Authentication sub-protocol (§4.4 Authentication, §8 MD5 vector).
//!
//! The wire exchange is tiny -- one `AuthenticationRequest`, at most one
//! `PasswordMessage` in reply -- so this module is mostly the MD5 digest
//! computation itself; the request/response sequencing lives in
//! [`crate::session`].
//!
//! Grounded on `qs/src/postgres/backend.rs`'s `Authentication` enum (the
//! closed set of sub-codes, with Kerberos/SCM/GSSAPI/SSPI/SASL treated as
//! unsupported rather than decoded further) for the shape of
//! [`crate::message::backend::Authentication`], which this module
//! consumes.

use md5::{Digest, Md5};

/// Computes the salted MD5 password response (§8): `"md5" +
/// hex(MD5(hex(MD5(password + user)) + salt))`.
pub fn md5_password(user: &str, password: &str, salt: [u8; 4]) -> String {
    let inner = hex_digest(&[password.as_bytes(), user.as_bytes()]);
    let outer = hex_digest(&[inner.as_bytes(), &salt]);
    format!("md5{outer}")
}

fn hex_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // §8 scenario 1: password "secret", user "alice", salt 0x01020304.
        let response = md5_password("alice", "secret", [0x01, 0x02, 0x03, 0x04]);
        assert!(response.starts_with("md5"));
        assert_eq!(response.len(), 35);

        let expected_inner = {
            let mut hasher = Md5::new();
            hasher.update(b"secretalice");
            format!("{:x}", hasher.finalize())
        };
        let mut hasher = Md5::new();
        hasher.update(expected_inner.as_bytes());
        hasher.update([0x01, 0x02, 0x03, 0x04]);
        let expected = format!("md5{:x}", hasher.finalize());

        assert_eq!(response, expected);
    }

    #[test]
    fn differs_by_user_and_by_salt() {
        let a = md5_password("alice", "secret", [0, 0, 0, 1]);
        let b = md5_password("bob", "secret", [0, 0, 0, 1]);
        let c = md5_password("alice", "secret", [0, 0, 0, 2]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
