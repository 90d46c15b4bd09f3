//! Namespace Binding (spec §4.7): a small bidirectional prefix↔IRI map
//! stored alongside quad data.

use crate::error::{CResult, Error};
use crate::kv::{db_name, Env, GetOp, PutFlags, Txn};

pub struct Namespaces<'a> {
    env: &'a Env,
}

impl<'a> Namespaces<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }

    /// Updates `prefix→namespace` and `namespace→prefix` atomically.
    /// Propagates `key_exists` rather than swallowing it, unlike `add`
    /// (spec §7: "`key_exists` ... propagated by `bind`").
    pub fn bind(&self, txn: &mut Txn, prefix: &str, namespace: &str) -> CResult<()> {
        let prefix_to_ns = self.env.db(db_name::PREFIX_TO_NS)?;
        let ns_to_prefix = self.env.db(db_name::NS_TO_PREFIX)?;

        prefix_to_ns.put(
            txn,
            prefix.as_bytes(),
            namespace.as_bytes(),
            PutFlags { no_overwrite: true, ..Default::default() },
        )?;
        ns_to_prefix.put(
            txn,
            namespace.as_bytes(),
            prefix.as_bytes(),
            PutFlags { no_overwrite: true, ..Default::default() },
        )?;
        Ok(())
    }

    pub fn namespace(&self, txn: &Txn, prefix: &str) -> CResult<Option<String>> {
        let found = self.env.db(db_name::PREFIX_TO_NS)?.get(txn, GetOp::Exact(prefix.as_bytes()))?;
        found.map(|(_, v)| decode_utf8(&v)).transpose()
    }

    pub fn prefix(&self, txn: &Txn, namespace: &str) -> CResult<Option<String>> {
        let found = self.env.db(db_name::NS_TO_PREFIX)?.get(txn, GetOp::Exact(namespace.as_bytes()))?;
        found.map(|(_, v)| decode_utf8(&v)).transpose()
    }

    pub fn all(&self, txn: &Txn) -> CResult<Vec<(String, String)>> {
        let pairs = self.env.db(db_name::PREFIX_TO_NS)?.iter_all(txn)?;
        pairs
            .into_iter()
            .map(|(prefix, ns)| Ok((decode_utf8(&prefix)?, decode_utf8(&ns)?)))
            .collect()
    }
}

fn decode_utf8(bytes: &[u8]) -> CResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::Corrupted(format!("namespace table holds non-utf8 bytes: {e}")))
}
