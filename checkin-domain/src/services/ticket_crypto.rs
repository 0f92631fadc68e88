// Ticket payload cipher
//
// Payloads are `<urlsafe-base64 iv>|<urlsafe-base64 ciphertext>`, encrypted
// with AES-256-CBC/PKCS#7 under a key derived by PBKDF2-HMAC-SHA1 from the
// ticket secret `uuid/hmac` (used as both password and salt).

use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha1::Sha1;
use thiserror::Error;

const KEY_DERIVATION_ROUNDS: u32 = 1000;
const KEY_LEN: usize = 32;
const PAYLOAD_SEPARATOR: char = '|';

/// URL-safe alphabet; padding optional on decode.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("payload has no '|' separator")]
    MissingSeparator,
    #[error("payload segment is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid iv length {0}")]
    InvalidIv(usize),
    #[error("decryption failed: wrong key or corrupted ciphertext")]
    BadPadding,
    #[error("plaintext is not utf-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// AES key derived from one ticket secret.
#[derive(Clone)]
pub struct TicketCipher {
    key: [u8; KEY_LEN],
}

impl TicketCipher {
    /// Deterministic: the server derives the same key from the same secret.
    pub fn derive(secret: &str) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha1>(
            secret.as_bytes(),
            secret.as_bytes(),
            KEY_DERIVATION_ROUNDS,
            &mut key,
        );
        Self { key }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn decrypt(&self, payload: &str) -> Result<String, CryptoError> {
        let (iv, body) = payload
            .split_once(PAYLOAD_SEPARATOR)
            .ok_or(CryptoError::MissingSeparator)?;
        let iv = URL_SAFE_LENIENT.decode(iv)?;
        let body = URL_SAFE_LENIENT.decode(body)?;
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &iv)
            .map_err(|_| CryptoError::InvalidIv(iv.len()))?;
        let plain = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&body)
            .map_err(|_| CryptoError::BadPadding)?;
        Ok(String::from_utf8(plain)?)
    }

    /// Produces a payload in the same format the server emits.
    pub fn encrypt(&self, iv: &[u8], plaintext: &str) -> Result<String, CryptoError> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.key, iv)
            .map_err(|_| CryptoError::InvalidIv(iv.len()))?;
        let body = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        Ok(format!(
            "{}{}{}",
            URL_SAFE_LENIENT.encode(iv),
            PAYLOAD_SEPARATOR,
            URL_SAFE_LENIENT.encode(body)
        ))
    }
}

pub fn decrypt(secret: &str, payload: &str) -> Result<String, CryptoError> {
    TicketCipher::derive(secret).decrypt(payload)
}
