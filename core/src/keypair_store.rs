use clap::Parser;
use log::{debug, info};
use solana_sdk::signature::{read_keypair_file, write_keypair_file, Keypair, Signer};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

/// Secret and public key halves of an ed25519 keypair.
const KEYPAIR_LENGTH: usize = 64;

#[derive(Clone, Parser, Debug)]
pub struct SessionArgs {
    /// Directory holding the session keypairs and collection state
    #[arg(long, env, default_value = ".cnft")]
    pub session_dir: PathBuf,

    /// Name of the wallet used as payer, tree creator and collection authority
    #[arg(long, env, default_value = "Wallet_1")]
    pub wallet: String,
}

#[derive(ThisError, Debug)]
pub enum KeypairStoreError {
    #[error("invalid session name {0:?}")]
    InvalidName(String),
    #[error("parse keypair from env {name}: {message}")]
    Env { name: String, message: String },
    #[error("read keypair {path:?}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("write keypair {path:?}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("create session dir: {0}")]
    Io(#[from] std::io::Error),
}

/// Named signing identities persisted as solana-cli style keypair files.
///
/// A key can also be supplied through an environment variable carrying the
/// session name and holding the 64 secret key bytes as a JSON array.
#[derive(Debug, Clone)]
pub struct KeypairStore {
    dir: PathBuf,
}

impl KeypairStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &SessionArgs) -> Self {
        Self::new(config.session_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, KeypairStoreError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !valid {
            return Err(KeypairStoreError::InvalidName(name.to_string()));
        }

        Ok(self.dir.join(format!("{}.json", name)))
    }

    pub fn get_or_create(&self, name: &str) -> Result<Keypair, KeypairStoreError> {
        let path = self.path_for(name)?;

        if let Ok(value) = std::env::var(name) {
            let keypair = keypair_from_json(&value).map_err(|message| KeypairStoreError::Env {
                name: name.to_string(),
                message,
            })?;
            debug!("loaded keypair {} from env {}", keypair.pubkey(), name);

            return Ok(keypair);
        }

        if path.exists() {
            let keypair = read_keypair_file(&path).map_err(|e| KeypairStoreError::Read {
                path: path.clone(),
                message: e.to_string(),
            })?;
            debug!("loaded keypair {} from {:?}", keypair.pubkey(), path);

            return Ok(keypair);
        }

        fs::create_dir_all(&self.dir)?;

        let keypair = Keypair::new();
        write_keypair_file(&keypair, &path).map_err(|e| KeypairStoreError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;

        info!("created keypair {} for {} at {:?}", keypair.pubkey(), name, path);

        Ok(keypair)
    }
}

fn keypair_from_json(value: &str) -> Result<Keypair, String> {
    let bytes: Vec<u8> = serde_json::from_str(value).map_err(|e| e.to_string())?;

    if bytes.len() != KEYPAIR_LENGTH {
        return Err(format!(
            "expected {} secret key bytes, found {}",
            KEYPAIR_LENGTH,
            bytes.len()
        ));
    }

    Keypair::from_bytes(&bytes).map_err(|e| e.to_string())
}
