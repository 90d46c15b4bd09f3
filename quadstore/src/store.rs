//! The Graph-centric façade consumed by the LDP layer (spec §6.3).

use std::path::Path;

use crate::error::CResult;
use crate::graph::Graph;
use crate::key::{DEFAULT_GRAPH_KEY, Key};
use crate::kv::{db_name, Env, EnvStats, StoreConfig, Txn};
use crate::namespace::Namespaces;
use crate::quad::{Pattern, QuadIndex};
use crate::term::{Dictionary, Term};

/// A single-file, transactional RDF quad store.
pub struct Store {
    env: Env,
    index: QuadIndex,
}

impl Store {
    pub fn open(path: &Path, config: &StoreConfig) -> CResult<Self> {
        let env = Env::open(path, config)?;
        Ok(Self { env, index: QuadIndex::new() })
    }

    /// Consumes the store, releasing the memory map.
    pub fn close(self) {
        drop(self)
    }

    /// Runs `f` inside a transaction, committing on `Ok` and aborting on
    /// `Err` or panic (by virtue of `Txn`'s own `Drop`). This is the scoped
    /// transaction abstraction of spec §4.1.
    ///
    /// Reentrancy is intentionally *explicit* rather than hidden: a nested
    /// operation observes the same transaction by receiving the `&mut Txn`
    /// passed down to it, the ordinary way Rust threads mutable state
    /// through a call graph, rather than through implicit thread-local
    /// lookup (Design Notes §9 already rules out hidden global state for
    /// the store handle itself; the same reasoning applies to the active
    /// transaction). Calling `txn_ctx` again while a caller already holds a
    /// `&mut Txn` is a misuse the type system prevents: the outer `Txn`
    /// borrows the `Env` exclusively for its lifetime.
    pub fn txn_ctx<T>(&self, write: bool, f: impl FnOnce(&mut Txn) -> CResult<T>) -> CResult<T> {
        let mut txn = self.env.txn(write)?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.abort();
                Err(err)
            }
        }
    }

    pub fn get(&self, uri: Term, capacity: usize) -> Graph<'_> {
        Graph::named(&self.env, uri, capacity)
    }

    pub fn add_graph(&self, txn: &mut Txn, graph: &Graph<'_>, ctx: Option<&Term>) -> CResult<()> {
        let dict = Dictionary::new(&self.env);
        let ck = match ctx.or(graph.uri()) {
            Some(uri) => Some(dict.to_key(txn, uri)?),
            None => None,
        };
        for (s, p, o) in graph.iter(txn)? {
            let sk = dict.to_key(txn, &s)?;
            let pk = dict.to_key(txn, &p)?;
            let ok = dict.to_key(txn, &o)?;
            self.index.add(&self.env, txn, sk, pk, ok, ck)?;
        }
        Ok(())
    }

    fn to_key_pattern(
        &self,
        txn: &Txn,
        s: Option<&Term>,
        p: Option<&Term>,
        o: Option<&Term>,
    ) -> CResult<Option<Pattern>> {
        let dict = Dictionary::new(&self.env);
        let sk = s.map(|t| dict.to_key_or_miss(txn, t)).transpose()?.flatten();
        if s.is_some() && sk.is_none() {
            return Ok(None);
        }
        let pk = p.map(|t| dict.to_key_or_miss(txn, t)).transpose()?.flatten();
        if p.is_some() && pk.is_none() {
            return Ok(None);
        }
        let ok = o.map(|t| dict.to_key_or_miss(txn, t)).transpose()?.flatten();
        if o.is_some() && ok.is_none() {
            return Ok(None);
        }
        Ok(Some(Pattern::new(sk, pk, ok)))
    }

    pub fn remove(
        &self,
        txn: &mut Txn,
        s: Option<&Term>,
        p: Option<&Term>,
        o: Option<&Term>,
        ctx: Option<&Term>,
    ) -> CResult<()> {
        let Some(pattern) = self.to_key_pattern(txn, s, p, o)? else {
            return Ok(());
        };
        let dict = Dictionary::new(&self.env);
        let ck = ctx.map(|t| dict.to_key_or_miss(txn, t)).transpose()?.flatten();
        if ctx.is_some() && ck.is_none() {
            return Ok(());
        }
        self.index.remove(&self.env, txn, pattern, ck)
    }

    /// `(s, p, o, ctx)` quads matching `pattern`. When `ctx` is omitted,
    /// every context a matching triple participates in is yielded as a
    /// separate row.
    pub fn triples(
        &self,
        txn: &Txn,
        s: Option<&Term>,
        p: Option<&Term>,
        o: Option<&Term>,
        ctx: Option<&Term>,
    ) -> CResult<Vec<(Term, Term, Term, Term)>> {
        let Some(pattern) = self.to_key_pattern(txn, s, p, o)? else {
            return Ok(Vec::new());
        };
        let dict = Dictionary::new(&self.env);

        if let Some(ctx_term) = ctx {
            let Some(ck) = dict.to_key_or_miss(txn, ctx_term)? else {
                return Ok(Vec::new());
            };
            let triples = self.index.lookup(&self.env, txn, pattern, Some(ck))?;
            return triples
                .into_iter()
                .map(|tk| {
                    Ok((dict.from_key(txn, tk.s)?, dict.from_key(txn, tk.p)?, dict.from_key(txn, tk.o)?, ctx_term.clone()))
                })
                .collect();
        }

        let triples = self.index.lookup(&self.env, txn, pattern, None)?;
        let mut out = Vec::new();
        for tk in triples {
            for ck in self.index.contexts_of(&self.env, txn, tk)? {
                let ctx_term = self.key_to_context_term(txn, ck)?;
                out.push((dict.from_key(txn, tk.s)?, dict.from_key(txn, tk.p)?, dict.from_key(txn, tk.o)?, ctx_term));
            }
        }
        Ok(out)
    }

    fn key_to_context_term(&self, txn: &Txn, ck: Key) -> CResult<Term> {
        if ck == DEFAULT_GRAPH_KEY {
            return Ok(Term::iri("urn:quadstore:default-graph"));
        }
        Dictionary::new(&self.env).from_key(txn, ck)
    }

    /// Every distinct context, or (if `pattern` is given) only those a
    /// matching triple participates in.
    pub fn contexts(
        &self,
        txn: &Txn,
        pattern: Option<(Option<&Term>, Option<&Term>, Option<&Term>)>,
    ) -> CResult<Vec<Term>> {
        match pattern {
            None => {
                let ctx_set = self.env.db(db_name::CTX_SET)?;
                ctx_set
                    .iter_all(txn)?
                    .into_iter()
                    .map(|(k, _)| self.key_to_context_term(txn, crate::key::decode_key(&k)?))
                    .collect()
            }
            Some((s, p, o)) => {
                let Some(pat) = self.to_key_pattern(txn, s, p, o)? else {
                    return Ok(Vec::new());
                };
                let mut seen = std::collections::HashSet::new();
                let mut out = Vec::new();
                for tk in self.index.lookup(&self.env, txn, pat, None)? {
                    for ck in self.index.contexts_of(&self.env, txn, tk)? {
                        if seen.insert(ck) {
                            out.push(self.key_to_context_term(txn, ck)?);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    pub fn namespaces(&self, txn: &Txn) -> CResult<Vec<(String, String)>> {
        Namespaces::new(&self.env).all(txn)
    }

    pub fn bind(&self, txn: &mut Txn, prefix: &str, namespace: &str) -> CResult<()> {
        Namespaces::new(&self.env).bind(txn, prefix, namespace)
    }

    pub fn stats(&self) -> CResult<EnvStats> {
        self.env.stats()
    }

    /// Walks every sub-database and reports every invariant violation found
    /// (spec §8 P1-P3), backing the CLI's `check-refint` command.
    pub fn check_refint(&self, txn: &Txn) -> CResult<Vec<crate::integrity::Violation>> {
        crate::integrity::check_refint(&self.env, txn)
    }

    pub fn clear_stale_readers(&self) -> CResult<usize> {
        self.env.clear_stale_readers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), &StoreConfig::default()).unwrap();
        (dir, store)
    }

    #[test]
    fn scenario_1_add_and_scope_by_context() {
        let (_dir, store) = open_store();
        let (s, p, o, g, other) = (
            Term::iri("http://ex.org/s"),
            Term::iri("http://ex.org/p"),
            Term::iri("http://ex.org/o"),
            Term::iri("http://ex.org/g"),
            Term::iri("http://ex.org/other"),
        );

        store
            .txn_ctx(true, |txn| {
                let dict = Dictionary::new(&store.env);
                let (sk, pk, ok, gk) =
                    (dict.to_key(txn, &s)?, dict.to_key(txn, &p)?, dict.to_key(txn, &o)?, dict.to_key(txn, &g)?);
                store.index.add(&store.env, txn, sk, pk, ok, Some(gk))
            })
            .unwrap();

        let txn = store.env.txn(false).unwrap();
        let in_g = store.triples(&txn, None, None, None, Some(&g)).unwrap();
        assert_eq!(in_g.len(), 1);
        assert_eq!((in_g[0].0.clone(), in_g[0].1.clone(), in_g[0].2.clone()), (s, p, o));

        let in_other = store.triples(&txn, None, None, None, Some(&other)).unwrap();
        assert!(in_other.is_empty());
    }

    #[test]
    fn scenario_3_contexts_reflect_remove() {
        let (_dir, store) = open_store();
        let (s, p, o, g1, g2) = (
            Term::iri("http://ex.org/s"),
            Term::iri("http://ex.org/p"),
            Term::iri("http://ex.org/o"),
            Term::iri("http://ex.org/g1"),
            Term::iri("http://ex.org/g2"),
        );

        store
            .txn_ctx(true, |txn| {
                let dict = Dictionary::new(&store.env);
                let (sk, pk, ok) = (dict.to_key(txn, &s)?, dict.to_key(txn, &p)?, dict.to_key(txn, &o)?);
                let g1k = dict.to_key(txn, &g1)?;
                let g2k = dict.to_key(txn, &g2)?;
                store.index.add(&store.env, txn, sk, pk, ok, Some(g1k))?;
                store.index.add(&store.env, txn, sk, pk, ok, Some(g2k))
            })
            .unwrap();

        let txn = store.env.txn(false).unwrap();
        let mut ctxs = store.contexts(&txn, Some((Some(&s), Some(&p), Some(&o)))).unwrap();
        ctxs.sort_by_key(|t| format!("{t:?}"));
        assert_eq!(ctxs.len(), 2);
        drop(txn);

        store.txn_ctx(true, |txn| store.remove(txn, Some(&s), Some(&p), Some(&o), Some(&g1))).unwrap();

        let txn = store.env.txn(false).unwrap();
        let ctxs = store.contexts(&txn, Some((Some(&s), Some(&p), Some(&o)))).unwrap();
        assert_eq!(ctxs, vec![g2]);
    }

    #[test]
    fn scenario_4_aborted_txn_leaves_store_unchanged() {
        let (_dir, store) = open_store();
        let before = store.stats().unwrap().num_triples;

        let result: CResult<()> = store.txn_ctx(true, |txn| {
            let dict = Dictionary::new(&store.env);
            for i in 0..100 {
                let s = Term::iri(format!("http://ex.org/s{i}"));
                let sk = dict.to_key(txn, &s)?;
                store.index.add(&store.env, txn, sk, sk, sk, None)?;
            }
            Err(crate::error::Error::InvalidArgument("force-abort".to_string()))
        });
        assert!(result.is_err());

        let after = store.stats().unwrap().num_triples;
        assert_eq!(before, after);
    }

    #[test]
    fn scenario_6_double_add_increments_once() {
        let (_dir, store) = open_store();
        let before = store.stats().unwrap().num_triples;

        let t = (Term::iri("http://ex.org/s"), Term::iri("http://ex.org/p"), Term::iri("http://ex.org/o"));
        for _ in 0..2 {
            store
                .txn_ctx(true, |txn| {
                    let dict = Dictionary::new(&store.env);
                    let (sk, pk, ok) = (dict.to_key(txn, &t.0)?, dict.to_key(txn, &t.1)?, dict.to_key(txn, &t.2)?);
                    store.index.add(&store.env, txn, sk, pk, ok, None)
                })
                .unwrap();
        }

        let after = store.stats().unwrap().num_triples;
        assert_eq!(after - before, 1);
    }

    #[test]
    fn bind_and_namespaces() {
        let (_dir, store) = open_store();
        store.txn_ctx(true, |txn| store.bind(txn, "ex", "http://ex.org/")).unwrap();
        let txn = store.env.txn(false).unwrap();
        assert_eq!(store.namespaces(&txn).unwrap(), vec![("ex".to_string(), "http://ex.org/".to_string())]);
    }
}
