//! Módulo de criptografia para credenciais de terceiros
//!
//! As configurações da clínica guardam a senha do Naver como texto. Ao
//! gravar um snapshot com chave, esse campo sai do modelo e é selado com
//! AES-256-GCM usando as primitivas deste módulo.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{PortalError, PortalResult};

/// Tamanho do nonce em bytes para AES-GCM
const AES_GCM_NONCE_SIZE: usize = 12;

/// Chave AES-256 (zerada ao sair de escopo)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Cria uma nova chave aleatória
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Cria uma chave a partir de bytes existentes
    pub fn from_bytes(bytes: &[u8]) -> PortalResult<Self> {
        if bytes.len() != 32 {
            return Err(PortalError::Crypto(format!(
                "A chave deve ter 32 bytes, recebeu {}",
                bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(***)")
    }
}

/// Valor selado e o nonce usado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Criptografa dados usando AES-256-GCM
pub fn encrypt(data: &[u8], key: &EncryptionKey) -> PortalResult<SealedSecret> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| PortalError::Crypto(format!("Falha na criptografia: {}", e)))?;

    Ok(SealedSecret {
        ciphertext,
        nonce: nonce.to_vec(),
    })
}

/// Descriptografa dados usando AES-256-GCM
pub fn decrypt(sealed: &SealedSecret, key: &EncryptionKey) -> PortalResult<Vec<u8>> {
    if sealed.nonce.len() != AES_GCM_NONCE_SIZE {
        return Err(PortalError::Crypto(format!(
            "Nonce inválido: esperado {} bytes, recebido {}",
            AES_GCM_NONCE_SIZE,
            sealed.nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
        .map_err(|e| PortalError::Crypto(format!("Falha na descriptografia: {}", e)))
}

/// Sela um texto
pub fn seal_str(value: &str, key: &EncryptionKey) -> PortalResult<SealedSecret> {
    encrypt(value.as_bytes(), key)
}

/// Abre um texto selado com `seal_str`
pub fn open_str(sealed: &SealedSecret, key: &EncryptionKey) -> PortalResult<String> {
    let mut plaintext = decrypt(sealed, key)?;
    let value = String::from_utf8(plaintext.clone())
        .map_err(|_| PortalError::Crypto("Texto selado não é UTF-8".to_string()));
    plaintext.zeroize();
    value
}
