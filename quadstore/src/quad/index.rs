//! The six sub-databases of spec §4.4 and the add/remove/lookup protocols
//! layered over them.

use crate::error::{CResult, Error};
use crate::key::{encode_key, DoubleKey, Key, TripleKey, DEFAULT_GRAPH_KEY};
use crate::kv::{db_name, DelFlags, Env, GetOp, PutFlags, Txn};
use crate::quad::planner::{Planner, Position};

/// A triple pattern in which any position may be unbound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pattern {
    pub s: Option<Key>,
    pub p: Option<Key>,
    pub o: Option<Key>,
}

impl Pattern {
    pub fn new(s: Option<Key>, p: Option<Key>, o: Option<Key>) -> Self {
        Self { s, p, o }
    }

    pub fn bound_count(&self) -> usize {
        [self.s, self.p, self.o].iter().filter(|x| x.is_some()).count()
    }
}

fn index_db_name(pos: Position) -> &'static str {
    match pos {
        Position::S => db_name::S_TO_PO,
        Position::P => db_name::P_TO_SO,
        Position::O => db_name::O_TO_SP,
    }
}

/// The fixed order of the two fields packed into a compound index's
/// `DoubleKey` value, keyed by which position drives the index.
fn value_fields(pos: Position) -> (Position, Position) {
    match pos {
        Position::S => (Position::P, Position::O),
        Position::P => (Position::S, Position::O),
        Position::O => (Position::S, Position::P),
    }
}

fn assemble(values: [(Position, Key); 3]) -> TripleKey {
    let mut s = 0;
    let mut p = 0;
    let mut o = 0;
    for (pos, val) in values {
        match pos {
            Position::S => s = val,
            Position::P => p = val,
            Position::O => o = val,
        }
    }
    TripleKey::new(s, p, o)
}

fn other_two(pos: Position) -> (Position, Position) {
    match pos {
        Position::S => (Position::P, Position::O),
        Position::P => (Position::S, Position::O),
        Position::O => (Position::S, Position::P),
    }
}

pub struct QuadIndex {
    planner: Planner,
}

impl Default for QuadIndex {
    fn default() -> Self {
        Self { planner: Planner::default() }
    }
}

impl QuadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_planner(planner: Planner) -> Self {
        Self { planner }
    }

    fn ignore_key_exists(result: CResult<()>) -> CResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(Error::KeyExists) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Inserts `(s, p, o)` into `ctx` (or the default graph), all five
    /// writes in the caller's transaction. A duplicate insert is a no-op
    /// (spec §4.4's `add` protocol swallows `key_exists` throughout).
    pub fn add(&self, env: &Env, txn: &mut Txn, s: Key, p: Key, o: Key, ctx: Option<Key>) -> CResult<()> {
        let width = env.key_width();
        let ck = ctx.unwrap_or(DEFAULT_GRAPH_KEY);
        let ck_bytes = encode_key(ck, width)?;

        Self::ignore_key_exists(env.db(db_name::CTX_SET)?.put(
            txn,
            &ck_bytes,
            &[],
            PutFlags { no_overwrite: true, ..Default::default() },
        ))?;

        let spok = TripleKey::new(s, p, o);
        let spok_bytes = spok.encode(width)?;

        Self::ignore_key_exists(env.db(db_name::TRIPLE_TO_CTX)?.put(
            txn,
            &spok_bytes,
            &ck_bytes,
            PutFlags { no_dup_data: true, ..Default::default() },
        ))?;
        Self::ignore_key_exists(env.db(db_name::CTX_TO_TRIPLE)?.put(
            txn,
            &ck_bytes,
            &spok_bytes,
            PutFlags { no_dup_data: true, ..Default::default() },
        ))?;

        self.put_projections(env, txn, spok)?;
        Ok(())
    }

    fn put_projections(&self, env: &Env, txn: &mut Txn, triple: TripleKey) -> CResult<()> {
        let width = env.key_width();
        let s_bytes = encode_key(triple.s, width)?;
        let p_bytes = encode_key(triple.p, width)?;
        let o_bytes = encode_key(triple.o, width)?;
        let po = DoubleKey::new(triple.p, triple.o).encode(width)?;
        let so = DoubleKey::new(triple.s, triple.o).encode(width)?;
        let sp = DoubleKey::new(triple.s, triple.p).encode(width)?;

        Self::ignore_key_exists(env.db(db_name::S_TO_PO)?.put(
            txn,
            &s_bytes,
            &po,
            PutFlags { no_dup_data: true, ..Default::default() },
        ))?;
        Self::ignore_key_exists(env.db(db_name::P_TO_SO)?.put(
            txn,
            &p_bytes,
            &so,
            PutFlags { no_dup_data: true, ..Default::default() },
        ))?;
        Self::ignore_key_exists(env.db(db_name::O_TO_SP)?.put(
            txn,
            &o_bytes,
            &sp,
            PutFlags { no_dup_data: true, ..Default::default() },
        ))?;
        Ok(())
    }

    fn delete_projections(&self, env: &Env, txn: &mut Txn, triple: TripleKey) -> CResult<()> {
        let width = env.key_width();
        let s_bytes = encode_key(triple.s, width)?;
        let p_bytes = encode_key(triple.p, width)?;
        let o_bytes = encode_key(triple.o, width)?;
        let po = DoubleKey::new(triple.p, triple.o).encode(width)?;
        let so = DoubleKey::new(triple.s, triple.o).encode(width)?;
        let sp = DoubleKey::new(triple.s, triple.p).encode(width)?;

        env.db(db_name::S_TO_PO)?.del(txn, &s_bytes, DelFlags::One(&po))?;
        env.db(db_name::P_TO_SO)?.del(txn, &p_bytes, DelFlags::One(&so))?;
        env.db(db_name::O_TO_SP)?.del(txn, &o_bytes, DelFlags::One(&sp))?;
        Ok(())
    }

    /// Resolves `pattern` (ignoring unknown terms, which are the caller's
    /// responsibility to have already filtered to a no-op via
    /// `to_key_or_miss`), then deletes every matching triple from `ctx` (or
    /// every context, if `ctx` is `None`).
    pub fn remove(&self, env: &Env, txn: &mut Txn, pattern: Pattern, ctx: Option<Key>) -> CResult<()> {
        let width = env.key_width();
        let matches = self.lookup(env, txn, pattern, ctx)?;

        for triple in matches {
            let spok_bytes = triple.encode(width)?;
            if let Some(ck) = ctx {
                let ck_bytes = encode_key(ck, width)?;
                env.db(db_name::TRIPLE_TO_CTX)?.del(txn, &spok_bytes, DelFlags::One(&ck_bytes))?;
                env.db(db_name::CTX_TO_TRIPLE)?.del(txn, &ck_bytes, DelFlags::One(&spok_bytes))?;

                let remaining = env.db(db_name::TRIPLE_TO_CTX)?.iter_dup(txn, &spok_bytes)?;
                if remaining.is_empty() {
                    self.delete_projections(env, txn, triple)?;
                }
            } else {
                let ctxs = env.db(db_name::TRIPLE_TO_CTX)?.iter_dup(txn, &spok_bytes)?;
                for ck_bytes in &ctxs {
                    env.db(db_name::CTX_TO_TRIPLE)?.del(txn, ck_bytes, DelFlags::One(&spok_bytes))?;
                }
                env.db(db_name::TRIPLE_TO_CTX)?.del(txn, &spok_bytes, DelFlags::AllDuplicates)?;
                self.delete_projections(env, txn, triple)?;
            }
        }
        Ok(())
    }

    pub fn lookup(&self, env: &Env, txn: &Txn, pattern: Pattern, ctx: Option<Key>) -> CResult<Vec<TripleKey>> {
        match pattern.bound_count() {
            3 => self.lookup_three_bound(env, txn, pattern, ctx),
            0 => self.lookup_zero_bound(env, txn, ctx),
            1 => self.lookup_one_bound(env, txn, pattern, ctx),
            2 => self.lookup_two_bound(env, txn, pattern, ctx),
            _ => unreachable!("bound_count is always 0..=3"),
        }
    }

    /// Every context a triple currently participates in.
    pub fn contexts_of(&self, env: &Env, txn: &Txn, triple: TripleKey) -> CResult<Vec<Key>> {
        let width = env.key_width();
        let spok_bytes = triple.encode(width)?;
        env.db(db_name::TRIPLE_TO_CTX)?
            .iter_dup(txn, &spok_bytes)?
            .iter()
            .map(|b| crate::key::decode_key(b))
            .collect()
    }

    fn lookup_three_bound(&self, env: &Env, txn: &Txn, pattern: Pattern, ctx: Option<Key>) -> CResult<Vec<TripleKey>> {
        let width = env.key_width();
        let spok = TripleKey::new(pattern.s.unwrap(), pattern.p.unwrap(), pattern.o.unwrap());
        let spok_bytes = spok.encode(width)?;

        if let Some(ck) = ctx {
            let ck_bytes = encode_key(ck, width)?;
            let found = env.db(db_name::CTX_TO_TRIPLE)?.get(txn, GetOp::GetBoth(&ck_bytes, &spok_bytes))?;
            Ok(if found.is_some() { vec![spok] } else { vec![] })
        } else {
            let found = env.db(db_name::TRIPLE_TO_CTX)?.get(txn, GetOp::FirstDup(&spok_bytes))?;
            Ok(if found.is_some() { vec![spok] } else { vec![] })
        }
    }

    fn lookup_zero_bound(&self, env: &Env, txn: &Txn, ctx: Option<Key>) -> CResult<Vec<TripleKey>> {
        let width = env.key_width();
        if let Some(ck) = ctx {
            let ck_bytes = encode_key(ck, width)?;
            env.db(db_name::CTX_TO_TRIPLE)?
                .iter_dup(txn, &ck_bytes)?
                .iter()
                .map(|b| TripleKey::decode(b, width))
                .collect()
        } else {
            // `triple_to_ctx` is `DUP_SORT`: `iter_all` yields one (key, value)
            // row per (triple, context) duplicate, key-ordered. A triple
            // present in several contexts would otherwise be returned once
            // per context; skip adjacent-equal keys to get one row per triple.
            let mut out = Vec::new();
            let mut last_key: Option<Vec<u8>> = None;
            for (k, _) in env.db(db_name::TRIPLE_TO_CTX)?.iter_all(txn)? {
                if last_key.as_deref() != Some(k.as_slice()) {
                    out.push(TripleKey::decode(&k, width)?);
                    last_key = Some(k);
                }
            }
            Ok(out)
        }
    }

    fn lookup_one_bound(&self, env: &Env, txn: &Txn, pattern: Pattern, ctx: Option<Key>) -> CResult<Vec<TripleKey>> {
        let width = env.key_width();
        let (pos, val) = if let Some(s) = pattern.s {
            (Position::S, s)
        } else if let Some(p) = pattern.p {
            (Position::P, p)
        } else {
            (Position::O, pattern.o.unwrap())
        };

        let key_bytes = encode_key(val, width)?;
        let (f1, f2) = value_fields(pos);
        let dups = env.db(index_db_name(pos))?.iter_dup(txn, &key_bytes)?;

        let mut out = Vec::with_capacity(dups.len());
        for dup in &dups {
            let dk = DoubleKey::decode(dup, width)?;
            let triple = assemble([(pos, val), (f1, dk.a), (f2, dk.b)]);
            out.push(triple);
        }

        if let Some(ck) = ctx {
            self.filter_by_ctx(env, txn, out, ck)
        } else {
            Ok(out)
        }
    }

    fn lookup_two_bound(&self, env: &Env, txn: &Txn, pattern: Pattern, ctx: Option<Key>) -> CResult<Vec<TripleKey>> {
        let width = env.key_width();
        let bound: Vec<(Position, Key)> = [
            pattern.s.map(|v| (Position::S, v)),
            pattern.p.map(|v| (Position::P, v)),
            pattern.o.map(|v| (Position::O, v)),
        ]
        .into_iter()
        .flatten()
        .collect();
        let (pos_a, val_a) = bound[0];
        let (pos_b, val_b) = bound[1];

        let driver = self.planner.pick_driver(pos_a, pos_b);
        let (non_driver, driver_val, non_driver_val) = if driver == pos_a {
            (pos_b, val_a, val_b)
        } else {
            (pos_a, val_b, val_a)
        };
        let unbound = {
            let (x, y) = other_two(driver);
            if x == non_driver {
                y
            } else {
                x
            }
        };

        let key_bytes = encode_key(driver_val, width)?;
        let (f1, f2) = value_fields(driver);
        let dups = env.db(index_db_name(driver))?.iter_dup(txn, &key_bytes)?;

        let mut out = Vec::new();
        for dup in &dups {
            let dk = DoubleKey::decode(dup, width)?;
            let values = [(driver, driver_val), (f1, dk.a), (f2, dk.b)];
            let found_non_driver = values.iter().find(|(p, _)| *p == non_driver).unwrap().1;
            if found_non_driver == non_driver_val {
                let unbound_val = values.iter().find(|(p, _)| *p == unbound).unwrap().1;
                out.push(assemble([(driver, driver_val), (non_driver, non_driver_val), (unbound, unbound_val)]));
            }
        }

        if let Some(ck) = ctx {
            self.filter_by_ctx(env, txn, out, ck)
        } else {
            Ok(out)
        }
    }

    fn filter_by_ctx(&self, env: &Env, txn: &Txn, candidates: Vec<TripleKey>, ctx: Key) -> CResult<Vec<TripleKey>> {
        let width = env.key_width();
        let ck_bytes = encode_key(ctx, width)?;
        let mut out = Vec::with_capacity(candidates.len());
        for triple in candidates {
            let spok_bytes = triple.encode(width)?;
            if env.db(db_name::CTX_TO_TRIPLE)?.get(txn, GetOp::GetBoth(&ck_bytes, &spok_bytes))?.is_some() {
                out.push(triple);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::StoreConfig;
    use std::collections::HashSet;

    fn open_env() -> (tempfile::TempDir, Env) {
        let dir = tempfile::tempdir().unwrap();
        let env = Env::open(dir.path(), &StoreConfig::default()).unwrap();
        (dir, env)
    }

    fn as_set(v: Vec<TripleKey>) -> HashSet<TripleKey> {
        v.into_iter().collect()
    }

    #[test]
    fn add_then_lookup_zero_bound_scoped_to_context() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 10, 11, 12, Some(100)).unwrap();

        let in_ctx = idx.lookup(&env, &txn, Pattern::default(), Some(100)).unwrap();
        assert_eq!(as_set(in_ctx), as_set(vec![TripleKey::new(10, 11, 12)]));

        let other_ctx = idx.lookup(&env, &txn, Pattern::default(), Some(200)).unwrap();
        assert!(other_ctx.is_empty());
    }

    #[test]
    fn set_replaces_object_for_a_subject_predicate() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, None).unwrap();
        idx.add(&env, &mut txn, 1, 2, 4, None).unwrap();

        let got = idx.lookup(&env, &txn, Pattern::new(Some(1), Some(2), None), None).unwrap();
        assert_eq!(as_set(got), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(1, 2, 4)]));

        idx.remove(&env, &mut txn, Pattern::new(Some(1), Some(2), None), None).unwrap();
        idx.add(&env, &mut txn, 1, 2, 5, None).unwrap();

        let got = idx.lookup(&env, &txn, Pattern::new(Some(1), Some(2), None), None).unwrap();
        assert_eq!(as_set(got), as_set(vec![TripleKey::new(1, 2, 5)]));
    }

    #[test]
    fn remove_from_one_context_keeps_triple_in_the_other() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, Some(100)).unwrap();
        idx.add(&env, &mut txn, 1, 2, 3, Some(200)).unwrap();

        let triple = TripleKey::new(1, 2, 3);
        assert_eq!(idx.contexts_of(&env, &txn, triple).unwrap().len(), 2);

        idx.remove(&env, &mut txn, Pattern::new(Some(1), Some(2), Some(3)), Some(100)).unwrap();
        assert_eq!(idx.contexts_of(&env, &txn, triple).unwrap(), vec![200]);
    }

    #[test]
    fn zero_bound_no_ctx_lookup_yields_one_row_per_triple_not_per_context() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, Some(100)).unwrap();
        idx.add(&env, &mut txn, 1, 2, 3, Some(200)).unwrap();
        idx.add(&env, &mut txn, 1, 2, 3, Some(300)).unwrap();
        idx.add(&env, &mut txn, 4, 5, 6, None).unwrap();

        let all = idx.lookup(&env, &txn, Pattern::default(), None).unwrap();
        assert_eq!(as_set(all.clone()), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(4, 5, 6)]));
        assert_eq!(all.len(), 2, "a triple in 3 contexts must appear once, not 3 times");
    }

    #[test]
    fn removing_the_last_context_deletes_projections() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, Some(100)).unwrap();
        idx.remove(&env, &mut txn, Pattern::new(Some(1), Some(2), Some(3)), Some(100)).unwrap();

        assert!(idx.lookup(&env, &txn, Pattern::new(Some(1), None, None), None).unwrap().is_empty());
        assert!(idx.lookup(&env, &txn, Pattern::new(None, Some(2), None), None).unwrap().is_empty());
        assert!(idx.lookup(&env, &txn, Pattern::new(None, None, Some(3)), None).unwrap().is_empty());
    }

    #[test]
    fn one_bound_lookup_reassembles_all_three_positions() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, None).unwrap();
        idx.add(&env, &mut txn, 1, 20, 30, None).unwrap();
        idx.add(&env, &mut txn, 9, 2, 3, None).unwrap();

        let by_s = idx.lookup(&env, &txn, Pattern::new(Some(1), None, None), None).unwrap();
        assert_eq!(as_set(by_s), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(1, 20, 30)]));

        let by_p = idx.lookup(&env, &txn, Pattern::new(None, Some(2), None), None).unwrap();
        assert_eq!(as_set(by_p), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(9, 2, 3)]));

        let by_o = idx.lookup(&env, &txn, Pattern::new(None, None, Some(3)), None).unwrap();
        assert_eq!(as_set(by_o), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(9, 2, 3)]));
    }

    #[test]
    fn two_bound_lookup_filters_on_the_non_driver_position() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, None).unwrap();
        idx.add(&env, &mut txn, 1, 2, 4, None).unwrap();
        idx.add(&env, &mut txn, 1, 9, 3, None).unwrap();

        let sp = idx.lookup(&env, &txn, Pattern::new(Some(1), Some(2), None), None).unwrap();
        assert_eq!(as_set(sp), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(1, 2, 4)]));

        let so = idx.lookup(&env, &txn, Pattern::new(Some(1), None, Some(3)), None).unwrap();
        assert_eq!(as_set(so), as_set(vec![TripleKey::new(1, 2, 3), TripleKey::new(1, 9, 3)]));

        let po = idx.lookup(&env, &txn, Pattern::new(None, Some(2), Some(3)), None).unwrap();
        assert_eq!(as_set(po), as_set(vec![TripleKey::new(1, 2, 3)]));
    }

    #[test]
    fn adding_the_same_triple_twice_is_idempotent() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, Some(100)).unwrap();
        idx.add(&env, &mut txn, 1, 2, 3, Some(100)).unwrap();

        let all = idx.lookup(&env, &txn, Pattern::default(), None).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn removing_an_unknown_pattern_is_a_no_op() {
        let (_dir, env) = open_env();
        let idx = QuadIndex::new();
        let mut txn = env.txn(true).unwrap();

        idx.add(&env, &mut txn, 1, 2, 3, None).unwrap();
        idx.remove(&env, &mut txn, Pattern::new(Some(7), Some(8), Some(9)), None).unwrap();

        let all = idx.lookup(&env, &txn, Pattern::default(), None).unwrap();
        assert_eq!(all, vec![TripleKey::new(1, 2, 3)]);
    }
}
