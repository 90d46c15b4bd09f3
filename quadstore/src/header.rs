//! The environment header record: a single fixed-layout value written once
//! at bootstrap time into the `__header` sub-database, so that a binary
//! opening an existing store can refuse to proceed with a mismatched key
//! width (Design Notes §9: "store the chosen W in an environment header
//! record so that mismatched binaries refuse to open a store").

use crate::error::{CResult, Error};
use crate::key::KeyWidth;

pub const HEADER_DB_NAME: &str = "__header";
const HEADER_RECORD_KEY: &[u8] = b"header";
const FORMAT_VERSION: u8 = 1;
const SEED_LEN: usize = 16;
const RECORD_LEN: usize = 1 /* version */ + 1 /* key width */ + SEED_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format_version: u8,
    pub key_width: KeyWidth,
    pub hash_seed: [u8; SEED_LEN],
}

impl Header {
    pub fn new(key_width: KeyWidth, hash_seed: [u8; SEED_LEN]) -> Self {
        Self { format_version: FORMAT_VERSION, key_width, hash_seed }
    }

    pub fn record_key() -> &'static [u8] {
        HEADER_RECORD_KEY
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_LEN);
        buf.push(self.format_version);
        buf.push(self.key_width.as_u8());
        buf.extend_from_slice(&self.hash_seed);
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() != RECORD_LEN {
            return Err(Error::Corrupted(format!(
                "header record has {} bytes, expected {}",
                bytes.len(),
                RECORD_LEN
            )));
        }
        let format_version = bytes[0];
        let key_width = KeyWidth::from_u8(bytes[1])?;
        let mut hash_seed = [0u8; SEED_LEN];
        hash_seed.copy_from_slice(&bytes[2..2 + SEED_LEN]);
        Ok(Self { format_version, key_width, hash_seed })
    }

    /// The fixed seed referenced by Design Notes §9 ("a hard-coded 16-byte
    /// seed"), used the first time a store is bootstrapped. Stored verbatim
    /// afterwards so a salvage tool can rehash terms consistently even if a
    /// future version changes this default.
    pub fn default_seed() -> [u8; SEED_LEN] {
        *b"quadstore-seed-0"
    }
}
