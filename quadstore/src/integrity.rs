//! The invariant checker behind the CLI's `check-refint` command (spec
//! §6.4, §8 P1-P3): walks every sub-database and reports every violation
//! of spec §3's invariants 3-6 it finds, rather than stopping at the
//! first one, so a salvage run can see the full extent of the damage.

use std::collections::HashSet;

use crate::key::{decode_key, DoubleKey, Key, TripleKey, DEFAULT_GRAPH_KEY, NULL_KEY};
use crate::kv::{db_name, Env, Txn};

/// One invariant violation found by [`check_refint`], already formatted
/// for display — the CLI just prints these and exits 2 if any exist.
pub type Violation = String;

/// Checks every persisted quad against spec §3 invariants 3-6:
///
/// - 3/4: `triple_to_ctx` and `ctx_to_triple` mirror each other exactly.
/// - 5: every triple's three compound-index projections exist.
/// - 6: no key appearing anywhere is absent from `term_by_key`.
pub fn check_refint(env: &Env, txn: &Txn) -> crate::error::CResult<Vec<Violation>> {
    let width = env.key_width();
    let mut violations = Vec::new();

    let mut known_keys: HashSet<Key> = HashSet::new();
    for (k, _) in env.db(db_name::TERM_BY_KEY)?.iter_all(txn)? {
        known_keys.insert(decode_key(&k)?);
    }

    let triple_rows = env.db(db_name::TRIPLE_TO_CTX)?.iter_all(txn)?;
    let mut triple_to_ctx_pairs: HashSet<(TripleKey, Key)> = HashSet::new();
    for (k, v) in &triple_rows {
        let triple = TripleKey::decode(k, width)?;
        let ctx = decode_key(v)?;
        triple_to_ctx_pairs.insert((triple, ctx));

        for key in [triple.s, triple.p, triple.o] {
            if !known_keys.contains(&key) {
                violations.push(format!(
                    "triple_to_ctx references key {key} absent from term_by_key (triple {triple:?}, ctx {ctx})"
                ));
            }
        }
        // The default graph's context key is a reserved sentinel (§9) that is
        // never interned into `term_by_key`; every other context key must be.
        if ctx != DEFAULT_GRAPH_KEY && ctx != NULL_KEY && !known_keys.contains(&ctx) {
            violations.push(format!(
                "triple_to_ctx references ctx key {ctx} absent from term_by_key (triple {triple:?})"
            ));
        }
    }

    let ctx_to_triple_rows = env.db(db_name::CTX_TO_TRIPLE)?.iter_all(txn)?;
    let mut ctx_to_triple_pairs: HashSet<(TripleKey, Key)> = HashSet::new();
    for (k, v) in &ctx_to_triple_rows {
        let ctx = decode_key(k)?;
        let triple = TripleKey::decode(v, width)?;
        ctx_to_triple_pairs.insert((triple, ctx));
    }

    for pair in &triple_to_ctx_pairs {
        if !ctx_to_triple_pairs.contains(pair) {
            violations.push(format!(
                "triple_to_ctx has ({:?}, ctx {}) with no mirror in ctx_to_triple",
                pair.0, pair.1
            ));
        }
    }
    for pair in &ctx_to_triple_pairs {
        if !triple_to_ctx_pairs.contains(pair) {
            violations.push(format!(
                "ctx_to_triple has ({:?}, ctx {}) with no mirror in triple_to_ctx",
                pair.0, pair.1
            ));
        }
    }

    let distinct_triples: HashSet<TripleKey> = triple_to_ctx_pairs.iter().map(|(t, _)| *t).collect();

    let s_to_po = double_index_pairs(env, txn, db_name::S_TO_PO)?;
    let p_to_so = double_index_pairs(env, txn, db_name::P_TO_SO)?;
    let o_to_sp = double_index_pairs(env, txn, db_name::O_TO_SP)?;

    for triple in &distinct_triples {
        if !s_to_po.contains(&(triple.s, DoubleKey::new(triple.p, triple.o))) {
            violations.push(format!("{triple:?} is missing its s_to_po projection"));
        }
        if !p_to_so.contains(&(triple.p, DoubleKey::new(triple.s, triple.o))) {
            violations.push(format!("{triple:?} is missing its p_to_so projection"));
        }
        if !o_to_sp.contains(&(triple.o, DoubleKey::new(triple.s, triple.p))) {
            violations.push(format!("{triple:?} is missing its o_to_sp projection"));
        }
    }

    let ctx_set: HashSet<Key> = env
        .db(db_name::CTX_SET)?
        .iter_all(txn)?
        .into_iter()
        .map(|(k, _)| decode_key(&k))
        .collect::<crate::error::CResult<_>>()?;
    for (_, ctx) in &triple_to_ctx_pairs {
        if !ctx_set.contains(ctx) {
            violations.push(format!("context {ctx} holds triples but is absent from ctx_set"));
        }
    }

    Ok(violations)
}

fn double_index_pairs(env: &Env, txn: &Txn, db: &str) -> crate::error::CResult<HashSet<(Key, DoubleKey)>> {
    let width = env.key_width();
    let mut out = HashSet::new();
    for (k, v) in env.db(db)?.iter_all(txn)? {
        out.insert((decode_key(&k)?, DoubleKey::decode(&v, width)?));
    }
    Ok(out)
}
