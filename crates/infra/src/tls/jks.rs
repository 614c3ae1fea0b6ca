//! Reader for Sun JKS keystores
//!
//! Only the first private key entry and its certificate chain are
//! extracted. The store password doubles as the key password, matching how
//! destination services provision JKS content.

use pkcs8::der::asn1::OctetStringRef;
use pkcs8::der::{Decode, Reader, SliceReader};
use pkcs8::{AlgorithmIdentifierRef, ObjectIdentifier};
use sha1::{Digest, Sha1};
use thiserror::Error;
use zeroize::Zeroizing;

const MAGIC: u32 = 0xFEED_FEED;
const PRIVATE_KEY_TAG: u32 = 1;
const TRUSTED_CERT_TAG: u32 = 2;
const DIGEST_LEN: usize = 20;
/// Mixed into the integrity digest after the password.
const INTEGRITY_WHITENER: &[u8] = b"Mighty Aphrodite";
const KEY_PROTECTOR: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.42.2.17.1.1");

#[derive(Debug, Error)]
pub enum JksError {
    #[error("not a JKS keystore")]
    NotJks,

    #[error("unsupported JKS version {0}")]
    Version(u32),

    #[error("keystore is truncated")]
    Truncated,

    #[error("unknown keystore entry tag {0}")]
    EntryTag(u32),

    #[error("keystore integrity check failed; wrong password or corrupted store")]
    Integrity,

    #[error("private key entry is malformed: {0}")]
    KeyEncoding(String),

    #[error("private key uses unsupported protection {0}")]
    Protection(ObjectIdentifier),

    #[error("private key could not be recovered with the keystore password")]
    KeyPassword,

    #[error("keystore contains no private key entry")]
    MissingPrivateKey,
}

/// First private key entry of a JKS store.
pub struct JksKeyEntry {
    pub alias: String,
    /// Unencrypted PKCS#8 `PrivateKeyInfo`.
    pub key: Zeroizing<Vec<u8>>,
    /// DER certificates, leaf first.
    pub chain: Vec<Vec<u8>>,
}

/// True when `data` starts with the JKS magic number.
pub fn is_jks(data: &[u8]) -> bool {
    data.get(..4).is_some_and(|magic| magic == MAGIC.to_be_bytes())
}

/// Verify the store digest and recover the first private key entry.
///
/// # Errors
/// Returns [`JksError`] for foreign or truncated content, a wrong password,
/// or a store without a private key entry.
pub fn read_key_entry(data: &[u8], password: &str) -> Result<JksKeyEntry, JksError> {
    if !is_jks(data) {
        return Err(JksError::NotJks);
    }
    let password = password_bytes(password);
    let body_len = data.len().checked_sub(DIGEST_LEN).ok_or(JksError::Truncated)?;
    let (body, expected) = data.split_at(body_len);

    let mut digest = Sha1::new();
    digest.update(password.as_slice());
    digest.update(INTEGRITY_WHITENER);
    digest.update(body);
    if digest.finalize().as_slice() != expected {
        return Err(JksError::Integrity);
    }

    let mut cursor = Cursor { data: body, position: 4 };
    let version = cursor.u32()?;
    if !(1..=2).contains(&version) {
        return Err(JksError::Version(version));
    }

    for _ in 0..cursor.u32()? {
        let tag = cursor.u32()?;
        let alias = cursor.utf()?;
        cursor.take(8)?;
        match tag {
            PRIVATE_KEY_TAG => {
                let protected = cursor.block()?;
                let mut chain = Vec::new();
                for _ in 0..cursor.u32()? {
                    chain.push(cursor.certificate(version)?);
                }
                let key = recover_key(protected, &password)?;
                return Ok(JksKeyEntry { alias, key, chain });
            }
            TRUSTED_CERT_TAG => {
                cursor.certificate(version)?;
            }
            other => return Err(JksError::EntryTag(other)),
        }
    }

    Err(JksError::MissingPrivateKey)
}

/// Password characters as big-endian UTF-16 code units.
fn password_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(password.encode_utf16().flat_map(u16::to_be_bytes).collect())
}

/// Undo the key protector: `salt || ciphertext || check`, where the
/// keystream is chained SHA-1 over the password and the previous block.
fn recover_key(protected: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>, JksError> {
    let encrypted = protected_data(protected)?;
    let ciphertext_len = encrypted
        .len()
        .checked_sub(2 * DIGEST_LEN)
        .filter(|len| *len > 0)
        .ok_or_else(|| JksError::KeyEncoding("protected key is too short".into()))?;
    let (salt, rest) = encrypted.split_at(DIGEST_LEN);
    let (ciphertext, check) = rest.split_at(ciphertext_len);

    let mut plain = Zeroizing::new(Vec::with_capacity(ciphertext_len));
    let mut block = Zeroizing::new(salt.to_vec());
    for chunk in ciphertext.chunks(DIGEST_LEN) {
        let mut hasher = Sha1::new();
        hasher.update(password);
        hasher.update(block.as_slice());
        block.copy_from_slice(&hasher.finalize());
        plain.extend(chunk.iter().zip(block.iter()).map(|(byte, key)| byte ^ key));
    }

    let mut hasher = Sha1::new();
    hasher.update(password);
    hasher.update(plain.as_slice());
    if hasher.finalize().as_slice() != check {
        return Err(JksError::KeyPassword);
    }
    Ok(plain)
}

/// Payload of the `EncryptedPrivateKeyInfo` wrapping a protected key.
fn protected_data(der: &[u8]) -> Result<&[u8], JksError> {
    let malformed = |err: pkcs8::der::Error| JksError::KeyEncoding(err.to_string());
    let mut reader = SliceReader::new(der).map_err(malformed)?;
    let (algorithm, data) = reader
        .sequence(|seq| {
            let algorithm = AlgorithmIdentifierRef::decode(seq)?;
            let data = OctetStringRef::decode(seq)?;
            Ok((algorithm.oid, data.as_bytes()))
        })
        .map_err(malformed)?;
    reader.finish(()).map_err(malformed)?;

    if algorithm != KEY_PROTECTOR {
        return Err(JksError::Protection(algorithm));
    }
    Ok(data)
}

/// Big-endian reader over the keystore body.
struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], JksError> {
        let end = self.position.checked_add(len).ok_or(JksError::Truncated)?;
        let slice = self.data.get(self.position..end).ok_or(JksError::Truncated)?;
        self.position = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], JksError> {
        self.take(N)?.try_into().map_err(|_| JksError::Truncated)
    }

    fn u32(&mut self) -> Result<u32, JksError> {
        self.array().map(u32::from_be_bytes)
    }

    fn utf(&mut self) -> Result<String, JksError> {
        let len = u16::from_be_bytes(self.array()?);
        let bytes = self.take(usize::from(len))?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn block(&mut self) -> Result<&'a [u8], JksError> {
        let len = usize::try_from(self.u32()?).map_err(|_| JksError::Truncated)?;
        self.take(len)
    }

    /// Version 2 stores prefix every certificate with its type name.
    fn certificate(&mut self, version: u32) -> Result<Vec<u8>, JksError> {
        if version == 2 {
            self.utf()?;
        }
        self.block().map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JKS: &[u8] = include_bytes!("../../tests/fixtures/client.jks");
    const P12: &[u8] = include_bytes!("../../tests/fixtures/client.p12");

    #[test]
    fn recognizes_the_magic_number() {
        assert!(is_jks(JKS));
        assert!(!is_jks(P12));
        assert!(!is_jks(&[0xFE, 0xED]));
    }

    #[test]
    fn recovers_the_private_key_entry() {
        let entry = read_key_entry(JKS, "changeit").unwrap();

        assert_eq!(entry.alias, "warden-client");
        assert_eq!(entry.chain.len(), 1);
        assert!(pkcs8::PrivateKeyInfo::try_from(entry.key.as_slice()).is_ok());
    }

    #[test]
    fn wrong_password_fails_the_integrity_check() {
        assert!(matches!(read_key_entry(JKS, "wrong"), Err(JksError::Integrity)));
    }

    #[test]
    fn truncated_store_is_rejected() {
        assert!(matches!(read_key_entry(&JKS[..4], "changeit"), Err(JksError::Truncated)));
        assert!(matches!(read_key_entry(&JKS[..64], "changeit"), Err(JksError::Integrity)));
    }

    #[test]
    fn pkcs12_content_is_not_jks() {
        assert!(matches!(read_key_entry(P12, "changeit"), Err(JksError::NotJks)));
    }

    #[test]
    fn tampered_key_fails_recovery() {
        let mut cursor = Cursor { data: JKS, position: 16 };
        cursor.utf().unwrap();
        cursor.take(8).unwrap();
        let mut protected = cursor.block().unwrap().to_vec();
        assert!(recover_key(&protected, &password_bytes("changeit")).is_ok());

        // The check digest trails the ciphertext at the end of the DER.
        let last_ciphertext_byte = protected.len() - DIGEST_LEN - 1;
        protected[last_ciphertext_byte] ^= 0xFF;
        assert!(matches!(
            recover_key(&protected, &password_bytes("changeit")),
            Err(JksError::KeyPassword)
        ));
    }
}
