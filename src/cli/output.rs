//! Output formatting and file I/O for the CLI.

use std::fs;
use std::path::Path;

use curve25519_dalek::EdwardsPoint;
use serde::{Deserialize, Serialize};

use crate::keys::{self, Keypair};

/// JSON form of a keypair, hex-encoded.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeypairFile {
    pub secret: String,
    pub public: String,
}

impl From<&Keypair> for KeypairFile {
    fn from(kp: &Keypair) -> Self {
        KeypairFile {
            secret: hex::encode(kp.sk.as_bytes()),
            public: hex::encode(kp.pk.compress().as_bytes()),
        }
    }
}

impl KeypairFile {
    pub fn into_keypair(self) -> Result<Keypair, Box<dyn std::error::Error>> {
        let sk = keys::scalar_from_bytes(&hex::decode(&self.secret)?)?;
        Ok(Keypair::from_secret(sk))
    }
}

/// TOML roster listing trustee public keys in committee order.
#[derive(Serialize, Deserialize)]
pub struct RosterFile {
    pub trustees: Vec<String>,
}

impl RosterFile {
    pub fn keys(&self) -> Result<Vec<EdwardsPoint>, Box<dyn std::error::Error>> {
        self.trustees
            .iter()
            .map(|line| Ok(keys::point_from_bytes(&hex::decode(line)?)?))
            .collect()
    }
}

/// JSON chain state for the file-backed CLI flow.
///
/// Holds the in-process committee's keypairs and every appended block
/// payload in order. Replaying the payloads against a fresh [`Ledger`]
/// reproduces the same block ids, since only the header bytes are hashed.
///
/// [`Ledger`]: crate::ledger::Ledger
#[derive(Serialize, Deserialize)]
pub struct ChainFile {
    pub trustees: Vec<KeypairFile>,
    /// Hex-encoded marshaled block payloads, genesis excluded.
    pub blocks: Vec<String>,
}

pub fn write_keypair(path: &Path, kp: &Keypair) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&KeypairFile::from(kp))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_keypair(path: &Path) -> Result<Keypair, Box<dyn std::error::Error>> {
    let file: KeypairFile = serde_json::from_str(&fs::read_to_string(path)?)?;
    file.into_keypair()
}

pub fn read_chain(path: &Path) -> Result<ChainFile, Box<dyn std::error::Error>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

pub fn write_chain(path: &Path, chain: &ChainFile) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, serde_json::to_string_pretty(chain)?)?;
    Ok(())
}

pub fn read_roster(path: &Path) -> Result<Vec<EdwardsPoint>, Box<dyn std::error::Error>> {
    let roster: RosterFile = toml::from_str(&fs::read_to_string(path)?)?;
    roster.keys()
}

/// Reads a public-key file: one hex-encoded compressed point per line.
pub fn read_pubkeys(path: &Path) -> Result<Vec<EdwardsPoint>, Box<dyn std::error::Error>> {
    fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Ok(keys::point_from_bytes(&hex::decode(line)?)?))
        .collect()
}

pub fn write_roster(path: &Path, keys: &[EdwardsPoint]) -> Result<(), Box<dyn std::error::Error>> {
    let roster = RosterFile {
        trustees: keys
            .iter()
            .map(|k| hex::encode(k.compress().as_bytes()))
            .collect(),
    };
    fs::write(path, toml::to_string_pretty(&roster)?)?;
    Ok(())
}
