use heed::types::Bytes;
use heed::Database;

use crate::error::{CResult, Error};
use crate::kv::txn::Txn;

/// The positioning operations spec §4.1 asks for. `heed` exposes cursoring
/// as typed iterators rather than an imperative cursor object, so each
/// variant below is realized by picking the iterator (or direct getter)
/// that produces the same result.
pub enum GetOp<'a> {
    Exact(&'a [u8]),
    First,
    Last,
    Next(&'a [u8]),
    NextDup(&'a [u8], &'a [u8]),
    NextNoDup(&'a [u8]),
    SetRange(&'a [u8]),
    GetBoth(&'a [u8], &'a [u8]),
    FirstDup(&'a [u8]),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PutFlags {
    pub no_overwrite: bool,
    pub no_dup_data: bool,
    pub append: bool,
}

pub enum DelFlags<'a> {
    One(&'a [u8]),
    AllDuplicates,
}

/// A handle to one sub-database, opened with `DUP_SORT` when `dup_sort` is
/// set. Unlike an LMDB cursor, this type carries no cursor-local position —
/// every `get` call is given the key(s) it needs, matching the way the
/// higher layers already track their own scan position (`Quad Index`
/// lookups reassemble results from a single pass, never mid-scan resume).
pub struct Cursor {
    db: Database<Bytes, Bytes>,
    pub(crate) dup_sort: bool,
}

impl Cursor {
    pub(crate) fn new(db: Database<Bytes, Bytes>, dup_sort: bool) -> Self {
        Self { db, dup_sort }
    }

    pub fn get(&self, txn: &Txn, op: GetOp) -> CResult<Option<(Vec<u8>, Vec<u8>)>> {
        let ro = txn.as_ro();
        match op {
            GetOp::Exact(key) => {
                let val = self.db.get(ro, key)?;
                Ok(val.map(|v| (key.to_vec(), v.to_vec())))
            }
            GetOp::First => {
                let mut iter = self.db.iter(ro)?;
                Ok(iter.next().transpose()?.map(|(k, v)| (k.to_vec(), v.to_vec())))
            }
            GetOp::Last => {
                let mut iter = self.db.rev_iter(ro)?;
                Ok(iter.next().transpose()?.map(|(k, v)| (k.to_vec(), v.to_vec())))
            }
            GetOp::Next(after_key) => {
                let mut iter = self.db.range(ro, &(after_key.to_vec()..))?;
                // Skip the entry equal to `after_key` itself, if present.
                for item in &mut iter {
                    let (k, v) = item?;
                    if k != after_key {
                        return Ok(Some((k.to_vec(), v.to_vec())));
                    }
                }
                Ok(None)
            }
            GetOp::NextDup(key, after_val) => {
                let dups = self.db.get_duplicates(ro, key)?;
                if let Some(mut dups) = dups {
                    for item in &mut dups {
                        let (k, v) = item?;
                        if v == after_val {
                            if let Some(next) = dups.next() {
                                let (k2, v2) = next?;
                                return Ok(Some((k2.to_vec(), v2.to_vec())));
                            }
                            return Ok(None);
                        }
                        let _ = k;
                    }
                }
                Ok(None)
            }
            GetOp::NextNoDup(after_key) => {
                let mut iter = self.db.range(ro, &(after_key.to_vec()..))?;
                for item in &mut iter {
                    let (k, v) = item?;
                    if k != after_key {
                        return Ok(Some((k.to_vec(), v.to_vec())));
                    }
                }
                Ok(None)
            }
            GetOp::SetRange(lower_bound) => {
                let mut iter = self.db.range(ro, &(lower_bound.to_vec()..))?;
                Ok(iter.next().transpose()?.map(|(k, v)| (k.to_vec(), v.to_vec())))
            }
            GetOp::GetBoth(key, val) => {
                if let Some(dups) = self.db.get_duplicates(ro, key)? {
                    for item in dups {
                        let (k, v) = item?;
                        if v == val {
                            return Ok(Some((k.to_vec(), v.to_vec())));
                        }
                    }
                }
                Ok(None)
            }
            GetOp::FirstDup(key) => {
                let first = self.db.first_duplicate(ro, key)?;
                Ok(first.map(|v| (key.to_vec(), v.to_vec())))
            }
        }
    }

    /// Iterates every duplicate value stored under `key`, in sort order.
    pub fn iter_dup(&self, txn: &Txn, key: &[u8]) -> CResult<Vec<Vec<u8>>> {
        let ro = txn.as_ro();
        let mut out = Vec::new();
        if let Some(dups) = self.db.get_duplicates(ro, key)? {
            for item in dups {
                let (_, v) = item?;
                out.push(v.to_vec());
            }
        }
        Ok(out)
    }

    /// Iterates every (key, value) pair in the sub-database, in key order.
    pub fn iter_all(&self, txn: &Txn) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let ro = txn.as_ro();
        let mut out = Vec::new();
        for item in self.db.iter(ro)? {
            let (k, v) = item?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }

    pub fn put(&self, txn: &mut Txn, key: &[u8], val: &[u8], flags: PutFlags) -> CResult<()> {
        let rw = txn.as_rw_mut()?;
        let mut put_flags = heed::PutFlags::empty();
        if flags.no_overwrite {
            put_flags |= heed::PutFlags::NO_OVERWRITE;
        }
        if flags.no_dup_data {
            put_flags |= heed::PutFlags::NO_DUP_DATA;
        }
        if flags.append {
            put_flags |= heed::PutFlags::APPEND;
        }
        match self.db.put_with_flags(rw, put_flags, key, val) {
            Ok(()) => Ok(()),
            Err(err) => {
                let mapped: Error = err.into();
                if matches!(mapped, Error::KeyExists) {
                    Err(Error::KeyExists)
                } else {
                    Err(mapped)
                }
            }
        }
    }

    pub fn del(&self, txn: &mut Txn, key: &[u8], flags: DelFlags) -> CResult<bool> {
        let rw = txn.as_rw_mut()?;
        match flags {
            DelFlags::One(val) => Ok(self.db.delete_one_duplicate(rw, key, val)?),
            DelFlags::AllDuplicates => Ok(self.db.delete(rw, key)?),
        }
    }

    pub fn len(&self, txn: &Txn) -> CResult<u64> {
        Ok(self.db.len(txn.as_ro())?)
    }

    pub fn stat(&self, txn: &Txn) -> CResult<heed::Stat> {
        Ok(self.db.stat(txn.as_ro())?)
    }
}
