//! Bidirectional map between RDF terms and fixed-width [`Key`]s (spec §4.3).

use crate::error::{CResult, Error};
use crate::key::{decode_key, encode_key, next_key, Key, DEFAULT_GRAPH_KEY};
use crate::kv::{db_name, Cursor, Env, GetOp, PutFlags, Txn};
use crate::term::codec;
use crate::term::Term;

/// A view over an [`Env`]'s `term_by_key` and `key_by_hash` sub-databases.
/// Holds no state of its own; every call reads the environment header for
/// the current key width and hash seed, so a `Dictionary` is cheap to
/// construct per-operation.
pub struct Dictionary<'a> {
    env: &'a Env,
}

impl<'a> Dictionary<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }

    fn term_by_key(&self) -> CResult<&Cursor> {
        self.env.db(db_name::TERM_BY_KEY)
    }

    fn key_by_hash(&self) -> CResult<&Cursor> {
        self.env.db(db_name::KEY_BY_HASH)
    }

    /// Serializes, hashes and probes `key_by_hash`. On hit, returns the
    /// existing key without allocating. On miss, returns `None`.
    pub fn to_key_or_miss(&self, txn: &Txn, term: &Term) -> CResult<Option<Key>> {
        let bytes = codec::serialize(term)?;
        let hash = codec::hash_bytes(&bytes, &self.env.hash_seed());
        let key_by_hash = self.key_by_hash()?;
        let Some((_, key_bytes)) = key_by_hash.get(txn, GetOp::Exact(&hash))? else {
            return Ok(None);
        };
        let term_by_key = self.term_by_key()?;
        match term_by_key.get(txn, GetOp::Exact(&key_bytes))? {
            Some((_, stored_bytes)) if stored_bytes == bytes => Ok(Some(decode_key(&key_bytes)?)),
            Some(_) => Err(Error::Corrupted(
                "hash collision: stored term bytes differ from the probed term".to_string(),
            )),
            None => Err(Error::Corrupted(format!(
                "key_by_hash points at key {:?} absent from term_by_key",
                key_bytes
            ))),
        }
    }

    /// Returns `term`'s key, allocating a new one if this is the first time
    /// it has been seen. The new key is the big-endian-byte-counter
    /// successor of the current maximum key in `term_by_key` (spec §4.3's
    /// allocator rule), written with `append` semantics since term keys are
    /// always inserted in increasing order.
    pub fn to_key(&self, txn: &mut Txn, term: &Term) -> CResult<Key> {
        if let Some(key) = self.to_key_or_miss(txn, term)? {
            return Ok(key);
        }

        let width = self.env.key_width();
        let bytes = codec::serialize(term)?;
        let hash = codec::hash_bytes(&bytes, &self.env.hash_seed());

        let last_key = match self.term_by_key()?.get(txn, GetOp::Last)? {
            Some((k, _)) => decode_key(&k)?,
            None => DEFAULT_GRAPH_KEY,
        };
        let new_key = next_key(last_key, width)?;
        let key_bytes = encode_key(new_key, width)?;

        self.term_by_key()?.put(
            txn,
            &key_bytes,
            &bytes,
            PutFlags { append: true, ..Default::default() },
        )?;
        self.key_by_hash()?.put(
            txn,
            &hash,
            &key_bytes,
            PutFlags { no_overwrite: true, ..Default::default() },
        )?;

        Ok(new_key)
    }

    /// Looks up `key`'s term. Fails `NotFound` if absent — the one place
    /// spec §7 allows `not_found` to surface as an error rather than an
    /// empty result.
    pub fn from_key(&self, txn: &Txn, key: Key) -> CResult<Term> {
        let width = self.env.key_width();
        let key_bytes = encode_key(key, width)?;
        match self.term_by_key()?.get(txn, GetOp::Exact(&key_bytes))? {
            Some((_, bytes)) => codec::deserialize(&bytes),
            None => Err(Error::NotFound(format!("key {key}"))),
        }
    }

    pub fn from_keys(&self, txn: &Txn, keys: &[Key]) -> CResult<Vec<Term>> {
        keys.iter().map(|&k| self.from_key(txn, k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::StoreConfig;

    fn open_env() -> (tempfile::TempDir, Env) {
        let dir = tempfile::tempdir().unwrap();
        let env = Env::open(dir.path(), &StoreConfig::default()).unwrap();
        (dir, env)
    }

    #[test]
    fn distinct_terms_get_distinct_keys_and_roundtrip() {
        let (_dir, env) = open_env();
        let dict = Dictionary::new(&env);
        let mut txn = env.txn(true).unwrap();

        let t1 = Term::iri("http://ex.org/a");
        let t2 = Term::iri("http://ex.org/b");
        let k1 = dict.to_key(&mut txn, &t1).unwrap();
        let k2 = dict.to_key(&mut txn, &t2).unwrap();
        assert_ne!(k1, k2);
        assert_eq!(dict.from_key(&txn, k1).unwrap(), t1);
        assert_eq!(dict.from_key(&txn, k2).unwrap(), t2);
    }

    #[test]
    fn re_interning_the_same_term_returns_the_same_key() {
        let (_dir, env) = open_env();
        let dict = Dictionary::new(&env);
        let mut txn = env.txn(true).unwrap();

        let t = Term::iri("http://ex.org/a");
        let k1 = dict.to_key(&mut txn, &t).unwrap();
        let k2 = dict.to_key(&mut txn, &t).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn to_key_or_miss_never_allocates() {
        let (_dir, env) = open_env();
        let dict = Dictionary::new(&env);
        let mut txn = env.txn(true).unwrap();

        let t = Term::iri("http://ex.org/never-seen");
        assert_eq!(dict.to_key_or_miss(&txn, &t).unwrap(), None);
        dict.to_key(&mut txn, &t).unwrap();
        assert!(dict.to_key_or_miss(&txn, &t).unwrap().is_some());
    }

    #[test]
    fn keys_are_allocated_strictly_increasing() {
        let (_dir, env) = open_env();
        let dict = Dictionary::new(&env);
        let mut txn = env.txn(true).unwrap();

        let mut prev = None;
        for i in 0..50 {
            let t = Term::iri(format!("http://ex.org/{i}"));
            let k = dict.to_key(&mut txn, &t).unwrap();
            if let Some(p) = prev {
                assert!(k > p);
            }
            prev = Some(k);
        }
    }

    #[test]
    fn unknown_key_is_not_found() {
        let (_dir, env) = open_env();
        let dict = Dictionary::new(&env);
        let txn = env.txn(false).unwrap();
        assert!(matches!(dict.from_key(&txn, 999), Err(Error::NotFound(_))));
    }
}
