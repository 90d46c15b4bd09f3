//! The KV Engine Wrapper (spec §4.1): a scoped environment, transaction and
//! cursor layer atop `heed`'s memory-mapped, copy-on-write B+tree.
//!
//! The shape mirrors the teacher's `storage::engine::Engine` trait paired
//! with a concrete engine (`storage::log_cask::LogCask`): here the sole
//! concrete engine is [`env::Env`], wrapping `heed::Env` instead of a
//! bitcask log, because the spec needs mmap COW B+tree semantics a
//! log-structured engine cannot give.

mod cursor;
mod env;
mod txn;

pub use cursor::{Cursor, DelFlags, GetOp, PutFlags};
pub use env::{db_name, Env, EnvStats, StoreConfig};
pub use txn::Txn;
