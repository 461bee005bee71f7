// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token stores: in-memory and encrypted on-disk.
//!
//! On-disk layout is one file per provider, `<dir>/<provider>.token`,
//! holding plaintext JSON when no passphrase is configured, otherwise
//! `ivHex:cipherHex` under AES-256-CBC with a SHA-256-derived key. The
//! directory is created 0700 and token files are written 0600.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use aes::cipher::{block_padding::Pkcs7, BlockModeDecrypt, BlockModeEncrypt, KeyIvInit};
use anyhow::Context;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::provider::Provider;

use super::oauth::OAuthToken;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;

/// Storage for cached OAuth tokens, keyed by provider.
///
/// Implementations synchronize internally; callers never coordinate.
pub trait TokenStore: Send + Sync {
    fn get(&self, provider: Provider) -> anyhow::Result<Option<OAuthToken>>;
    fn save(&self, token: &OAuthToken) -> anyhow::Result<()>;
    /// Clear one provider's token, or all of them.
    fn clear(&self, provider: Option<Provider>) -> anyhow::Result<()>;
    fn list(&self) -> anyhow::Result<Vec<Provider>>;
}

/// Volatile store for tests and short-lived embedders.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<Provider, OAuthToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, provider: Provider) -> anyhow::Result<Option<OAuthToken>> {
        Ok(self.tokens.lock().get(&provider).cloned())
    }

    fn save(&self, token: &OAuthToken) -> anyhow::Result<()> {
        self.tokens.lock().insert(token.provider, token.clone());
        Ok(())
    }

    fn clear(&self, provider: Option<Provider>) -> anyhow::Result<()> {
        let mut tokens = self.tokens.lock();
        match provider {
            Some(provider) => {
                tokens.remove(&provider);
            }
            None => tokens.clear(),
        }
        Ok(())
    }

    fn list(&self) -> anyhow::Result<Vec<Provider>> {
        Ok(self.tokens.lock().keys().copied().collect())
    }
}

/// Durable store with optional passphrase-derived encryption.
pub struct FileTokenStore {
    dir: PathBuf,
    /// SHA-256 of the passphrase; `None` stores plaintext JSON.
    key: Option<[u8; 32]>,
    /// Serializes read-modify-write cycles on the directory.
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Open (creating if needed) a store at `dir`. With a passphrase,
    /// tokens are AES-256-CBC encrypted with `SHA-256(passphrase)`.
    pub fn new(dir: impl Into<PathBuf>, passphrase: Option<&str>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create token dir {}", dir.display()))?;
        set_mode(&dir, 0o700)?;

        let key = passphrase.map(|p| {
            let digest = Sha256::digest(p.as_bytes());
            let mut key = [0u8; 32];
            key.copy_from_slice(&digest);
            key
        });

        Ok(Self { dir, key, lock: Mutex::new(()) })
    }

    fn token_path(&self, provider: Provider) -> PathBuf {
        self.dir.join(format!("{provider}.token"))
    }

    fn encode(&self, plaintext: &[u8]) -> String {
        match self.key {
            None => String::from_utf8_lossy(plaintext).into_owned(),
            Some(key) => {
                let mut iv = [0u8; IV_LEN];
                rand::rng().fill_bytes(&mut iv);
                let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
                    .encrypt_padded_vec::<Pkcs7>(plaintext);
                format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
            }
        }
    }

    fn decode(&self, contents: &str) -> anyhow::Result<Vec<u8>> {
        match self.key {
            None => Ok(contents.as_bytes().to_vec()),
            Some(key) => {
                let (iv_hex, cipher_hex) = contents
                    .trim()
                    .split_once(':')
                    .context("malformed token file: missing iv separator")?;
                let iv = hex::decode(iv_hex).context("malformed token file: bad iv hex")?;
                anyhow::ensure!(iv.len() == IV_LEN, "malformed token file: iv length");
                let ciphertext =
                    hex::decode(cipher_hex).context("malformed token file: bad cipher hex")?;
                let mut iv_arr = [0u8; IV_LEN];
                iv_arr.copy_from_slice(&iv);
                Aes256CbcDec::new(&key.into(), &iv_arr.into())
                    .decrypt_padded_vec::<Pkcs7>(&ciphertext)
                    .map_err(|_| anyhow::anyhow!("token decryption failed (wrong passphrase?)"))
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, provider: Provider) -> anyhow::Result<Option<OAuthToken>> {
        let _guard = self.lock.lock();
        let path = self.token_path(provider);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        let plaintext = self.decode(&contents)?;
        let token: OAuthToken = serde_json::from_slice(&plaintext).context("parse token file")?;
        Ok(Some(token))
    }

    fn save(&self, token: &OAuthToken) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        let path = self.token_path(token.provider);
        let plaintext = serde_json::to_vec(token).context("serialize token")?;
        let encoded = self.encode(&plaintext);

        // Write via temp + rename, then clamp modes.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, encoded).with_context(|| format!("write {}", tmp.display()))?;
        set_mode(&tmp, 0o600)?;
        std::fs::rename(&tmp, &path).context("rename token file")?;
        Ok(())
    }

    fn clear(&self, provider: Option<Provider>) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        match provider {
            Some(provider) => {
                let path = self.token_path(provider);
                if path.exists() {
                    std::fs::remove_file(&path)
                        .with_context(|| format!("remove {}", path.display()))?;
                }
            }
            None => {
                for provider in all_providers() {
                    let path = self.token_path(provider);
                    if path.exists() {
                        std::fs::remove_file(&path)
                            .with_context(|| format!("remove {}", path.display()))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn list(&self) -> anyhow::Result<Vec<Provider>> {
        let _guard = self.lock.lock();
        Ok(all_providers()
            .into_iter()
            .filter(|provider| self.token_path(*provider).exists())
            .collect())
    }
}

fn all_providers() -> [Provider; 5] {
    [
        Provider::Github,
        Provider::Gitlab,
        Provider::Bitbucket,
        Provider::AzureDevops,
        Provider::SelfHosted,
    ]
}

fn set_mode(path: &Path, mode: u32) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    permissions.set_mode(mode);
    std::fs::set_permissions(path, permissions)
        .with_context(|| format!("chmod {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
