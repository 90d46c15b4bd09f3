use std::path::Path;

use heed::types::Bytes;
use heed::{DatabaseFlags, EnvFlags, EnvOpenOptions};

use crate::error::{CResult, Error};
use crate::header::{Header, HEADER_DB_NAME};
use crate::key::KeyWidth;
use crate::kv::cursor::Cursor;
use crate::kv::txn::Txn;

/// Sub-database names, spelled out once so the Quad Index, Term Dictionary
/// and Namespace Binding modules never hand-roll a string literal.
pub mod db_name {
    pub const TERM_BY_KEY: &str = "term_by_key";
    pub const KEY_BY_HASH: &str = "key_by_hash";
    pub const TRIPLE_TO_CTX: &str = "triple_to_ctx";
    pub const CTX_TO_TRIPLE: &str = "ctx_to_triple";
    pub const CTX_SET: &str = "ctx_set";
    pub const S_TO_PO: &str = "s_to_po";
    pub const P_TO_SO: &str = "p_to_so";
    pub const O_TO_SP: &str = "o_to_sp";
    pub const PREFIX_TO_NS: &str = "prefix_to_ns";
    pub const NS_TO_PREFIX: &str = "ns_to_prefix";
}

const ALL_DB_NAMES: &[(&str, bool)] = &[
    (db_name::TERM_BY_KEY, false),
    (db_name::KEY_BY_HASH, false),
    (db_name::TRIPLE_TO_CTX, true),
    (db_name::CTX_TO_TRIPLE, true),
    (db_name::CTX_SET, false),
    (db_name::S_TO_PO, true),
    (db_name::P_TO_SO, true),
    (db_name::O_TO_SP, true),
    (db_name::PREFIX_TO_NS, false),
    (db_name::NS_TO_PREFIX, false),
];

/// Open options for [`Env::open`], named after spec §4.1's enumeration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub map_size: usize,
    pub max_dbs: u32,
    pub max_readers: u32,
    pub no_subdir: bool,
    pub read_ahead: bool,
    pub create: bool,
    pub key_width: KeyWidth,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            map_size: 1 << 30,
            max_dbs: (ALL_DB_NAMES.len() + 1) as u32,
            max_readers: 126,
            no_subdir: false,
            read_ahead: false,
            create: true,
            key_width: KeyWidth::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvStats {
    pub num_triples: u64,
    pub env_size: u64,
    pub per_db_entries: Vec<(String, u64)>,
}

/// The concrete KV engine: a `heed::Env` plus the store's fixed set of named
/// sub-databases, opened once at bootstrap and reused for the life of the
/// process.
pub struct Env {
    env: heed::Env,
    header: Header,
    dbs: std::collections::HashMap<&'static str, Cursor>,
}

impl Env {
    pub fn open(path: &Path, config: &StoreConfig) -> CResult<Self> {
        if config.create {
            if config.no_subdir {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            } else {
                std::fs::create_dir_all(path)?;
            }
        }

        let mut options = EnvOpenOptions::new();
        options.map_size(config.map_size);
        options.max_dbs(config.max_dbs);
        options.max_readers(config.max_readers);

        let mut flags = EnvFlags::empty();
        if config.no_subdir {
            flags |= EnvFlags::NO_SUB_DIR;
        }
        if !config.read_ahead {
            flags |= EnvFlags::NO_READ_AHEAD;
        }
        options.flags(flags);

        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let header_db =
            env.database_options().types::<Bytes, Bytes>().name(HEADER_DB_NAME).create(&mut wtxn)?;

        let header = match header_db.get(&wtxn, Header::record_key())? {
            Some(bytes) => {
                let stored = Header::decode(bytes)?;
                if stored.key_width != config.key_width {
                    log::error!(
                        "refusing to open {} bootstrapped with key_width={} bytes under requested key_width={} bytes",
                        path.display(),
                        stored.key_width.as_u8(),
                        config.key_width.as_u8()
                    );
                    return Err(Error::KeyWidthMismatch {
                        stored: stored.key_width.as_u8(),
                        requested: config.key_width.as_u8(),
                    });
                }
                stored
            }
            None => {
                let fresh = Header::new(config.key_width, Header::default_seed());
                header_db.put(&mut wtxn, Header::record_key(), &fresh.encode())?;
                log::info!(
                    "bootstrapped quadstore environment at {} (key_width={} bytes)",
                    path.display(),
                    fresh.key_width.bytes()
                );
                fresh
            }
        };

        let mut dbs = std::collections::HashMap::new();
        for (name, dup_sort) in ALL_DB_NAMES {
            let db = if *dup_sort {
                env.database_options()
                    .types::<Bytes, Bytes>()
                    .flags(DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED)
                    .name(name)
                    .create(&mut wtxn)?
            } else {
                env.database_options().types::<Bytes, Bytes>().name(name).create(&mut wtxn)?
            };
            dbs.insert(*name, Cursor::new(db, *dup_sort));
        }
        wtxn.commit()?;

        Ok(Self { env, header, dbs })
    }

    pub fn key_width(&self) -> KeyWidth {
        self.header.key_width
    }

    pub fn hash_seed(&self) -> [u8; 16] {
        self.header.hash_seed
    }

    pub fn db(&self, name: &str) -> CResult<&Cursor> {
        self.dbs.get(name).ok_or_else(|| Error::Corrupted(format!("no such sub-database {name}")))
    }

    pub fn txn(&self, write: bool) -> CResult<Txn<'_>> {
        if write {
            Ok(Txn::Write(self.env.write_txn()?))
        } else {
            Ok(Txn::Read(self.env.read_txn()?))
        }
    }

    pub fn clear_stale_readers(&self) -> CResult<usize> {
        let cleared = self.env.clear_stale_readers()?;
        if cleared > 0 {
            log::info!("cleared {cleared} stale reader slot(s)");
        }
        Ok(cleared)
    }

    pub fn stats(&self) -> CResult<EnvStats> {
        let txn = self.txn(false)?;
        let num_triples = self.db(db_name::TRIPLE_TO_CTX)?.len(&txn)?;
        let mut per_db_entries = Vec::new();
        for (name, _) in ALL_DB_NAMES {
            let entries = self.db(name)?.len(&txn)?;
            per_db_entries.push((name.to_string(), entries));
        }
        let env_size = self.env.real_disk_size().unwrap_or(0);
        Ok(EnvStats { num_triples, env_size, per_db_entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_then_reopen_same_width_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig { key_width: KeyWidth::W5, ..Default::default() };
        {
            let env = Env::open(dir.path(), &config).unwrap();
            assert_eq!(env.key_width(), KeyWidth::W5);
        }
        let env = Env::open(dir.path(), &config).unwrap();
        assert_eq!(env.key_width(), KeyWidth::W5);
    }

    #[test]
    fn reopen_with_different_width_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_a = StoreConfig { key_width: KeyWidth::W4, ..Default::default() };
        let _env = Env::open(dir.path(), &config_a).unwrap();

        let config_b = StoreConfig { key_width: KeyWidth::W8, ..Default::default() };
        let err = Env::open(dir.path(), &config_b).unwrap_err();
        assert!(matches!(err, Error::KeyWidthMismatch { .. }));
    }
}
