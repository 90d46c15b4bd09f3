//! Graph (spec §4.6): a [`KeySet`] bound to a store, exposing RDF-term-level
//! add/remove/lookup/slicing and set algebra. The unit returned to the LDP
//! layer.

use std::collections::HashSet;
use std::ops::{BitAnd, BitOr, BitXor, Sub};

use crate::error::{CResult, Error};
use crate::key::{Key, TripleKey};
use crate::keyset::KeySet;
use crate::kv::{Env, Txn};
use crate::quad::{Pattern, QuadIndex};
use crate::term::{Dictionary, Term};

/// The result of [`Graph::slice`], shaped after RDFLib's `graph[s:p:o]`
/// slicing protocol: the more positions left unbound, the richer the
/// result, down to a plain boolean when all three are bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slice {
    Present(bool),
    Terms(HashSet<Term>),
    Pairs(HashSet<(Term, Term)>),
    Triples(HashSet<(Term, Term, Term)>),
}

/// A store-bound, optionally-named set of triple-keys.
pub struct Graph<'a> {
    env: &'a Env,
    index: QuadIndex,
    keys: KeySet,
    uri: Option<Term>,
}

impl<'a> PartialEq for Graph<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl<'a> Eq for Graph<'a> {}

impl<'a> Graph<'a> {
    fn same_store(&self, other: &Graph<'a>) -> CResult<()> {
        if std::ptr::eq(self.env, other.env) {
            Ok(())
        } else {
            Err(Error::InvalidArgument("graphs belong to different stores".to_string()))
        }
    }

    fn ctx_key(&self, txn: &Txn) -> CResult<Option<Key>> {
        match &self.uri {
            None => Ok(None),
            Some(uri) => Ok(Some(Dictionary::new(self.env).to_key_or_miss(txn, uri)?.unwrap_or_default())),
        }
    }

    pub fn empty(env: &'a Env, capacity: usize) -> Self {
        Self { env, index: QuadIndex::new(), keys: KeySet::with_capacity(capacity), uri: None }
    }

    pub fn named(env: &'a Env, uri: Term, capacity: usize) -> Self {
        Self { env, index: QuadIndex::new(), keys: KeySet::with_capacity(capacity), uri: Some(uri) }
    }

    /// Interns every term in `triples` (allocating new keys as needed) and
    /// builds an in-memory graph over them. Does not write anything to the
    /// persistent index — see [`Graph::add`] for that.
    pub fn from_triples(
        env: &'a Env,
        txn: &mut Txn,
        triples: impl IntoIterator<Item = (Term, Term, Term)>,
    ) -> CResult<Self> {
        let dict = Dictionary::new(env);
        let mut keys = KeySet::with_capacity(0);
        for (s, p, o) in triples {
            let sk = dict.to_key(txn, &s)?;
            let pk = dict.to_key(txn, &p)?;
            let ok = dict.to_key(txn, &o)?;
            keys.add(TripleKey::new(sk, pk, ok), true);
        }
        Ok(Self { env, index: QuadIndex::new(), keys, uri: None })
    }

    pub fn copy(&self, uri: Option<Term>) -> Self {
        Self { env: self.env, index: QuadIndex::new(), keys: self.keys.copy(), uri: uri.or_else(|| self.uri.clone()) }
    }

    pub fn empty_copy(&self, uri: Option<Term>) -> Self {
        Self {
            env: self.env,
            index: QuadIndex::new(),
            keys: KeySet::with_capacity(0),
            uri: uri.or_else(|| self.uri.clone()),
        }
    }

    pub fn uri(&self) -> Option<&Term> {
        self.uri.as_ref()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Interns and persists every triple into this graph's context (or the
    /// default graph, if unnamed), then mirrors the addition into the
    /// in-memory `KeySet`.
    pub fn add(&mut self, txn: &mut Txn, triples: impl IntoIterator<Item = (Term, Term, Term)>) -> CResult<()> {
        let dict = Dictionary::new(self.env);
        let ctx = match &self.uri {
            Some(uri) => Some(dict.to_key(txn, uri)?),
            None => None,
        };
        for (s, p, o) in triples {
            let sk = dict.to_key(txn, &s)?;
            let pk = dict.to_key(txn, &p)?;
            let ok = dict.to_key(txn, &o)?;
            self.index.add(self.env, txn, sk, pk, ok, ctx)?;
            self.keys.add(TripleKey::new(sk, pk, ok), true);
        }
        Ok(())
    }

    fn to_key_pattern(&self, txn: &Txn, s: Option<&Term>, p: Option<&Term>, o: Option<&Term>) -> CResult<Option<Pattern>> {
        let dict = Dictionary::new(self.env);
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

    /// Removes every triple matching `pattern` from this graph's context,
    /// persistently and in memory. A pattern with an unknown term is a
    /// no-op (spec §4.4's remove protocol).
    pub fn remove(&mut self, txn: &mut Txn, s: Option<&Term>, p: Option<&Term>, o: Option<&Term>) -> CResult<()> {
        let Some(pattern) = self.to_key_pattern(txn, s, p, o)? else {
            return Ok(());
        };
        let ctx = self.ctx_key(txn)?;
        self.index.remove(self.env, txn, pattern, ctx)?;
        for tk in self.keys.lookup(pattern).iter().collect::<Vec<_>>() {
            self.keys.remove(tk);
        }
        Ok(())
    }

    /// Replaces every `(s, p, *)` with exactly `(s, p, o)`.
    pub fn set(&mut self, txn: &mut Txn, s: Term, p: Term, o: Term) -> CResult<()> {
        self.remove(txn, Some(&s), Some(&p), None)?;
        self.add(txn, [(s, p, o)])?;
        Ok(())
    }

    pub fn contains(&self, txn: &Txn, s: &Term, p: &Term, o: &Term) -> CResult<bool> {
        let Some(pattern) = self.to_key_pattern(txn, Some(s), Some(p), Some(o))? else {
            return Ok(false);
        };
        let tk = TripleKey::new(pattern.s.unwrap(), pattern.p.unwrap(), pattern.o.unwrap());
        Ok(self.keys.contains(tk))
    }

    pub fn lookup(&self, txn: &Txn, s: Option<&Term>, p: Option<&Term>, o: Option<&Term>) -> CResult<Self> {
        let Some(pattern) = self.to_key_pattern(txn, s, p, o)? else {
            return Ok(self.empty_copy(None));
        };
        Ok(Self {
            env: self.env,
            index: QuadIndex::new(),
            keys: self.keys.lookup(pattern),
            uri: self.uri.clone(),
        })
    }

    fn materialize(&self, txn: &Txn, tk: TripleKey) -> CResult<(Term, Term, Term)> {
        let dict = Dictionary::new(self.env);
        Ok((dict.from_key(txn, tk.s)?, dict.from_key(txn, tk.p)?, dict.from_key(txn, tk.o)?))
    }

    pub fn slice(&self, txn: &Txn, s: Option<&Term>, p: Option<&Term>, o: Option<&Term>) -> CResult<Slice> {
        let unbound = [s.is_none(), p.is_none(), o.is_none()].iter().filter(|x| **x).count();
        if unbound == 0 {
            return Ok(Slice::Present(self.contains(txn, s.unwrap(), p.unwrap(), o.unwrap())?));
        }

        let matched = self.lookup(txn, s, p, o)?;
        let triples: Vec<(Term, Term, Term)> =
            matched.keys.iter().map(|tk| self.materialize(txn, tk)).collect::<CResult<_>>()?;

        match unbound {
            3 => Ok(Slice::Triples(triples.into_iter().collect())),
            1 => {
                let terms = if s.is_none() {
                    triples.into_iter().map(|(s, _, _)| s).collect()
                } else if p.is_none() {
                    triples.into_iter().map(|(_, p, _)| p).collect()
                } else {
                    triples.into_iter().map(|(_, _, o)| o).collect()
                };
                Ok(Slice::Terms(terms))
            }
            2 => {
                let pairs = if s.is_none() && p.is_none() {
                    triples.into_iter().map(|(s, p, _)| (s, p)).collect()
                } else if s.is_none() {
                    triples.into_iter().map(|(s, _, o)| (s, o)).collect()
                } else {
                    triples.into_iter().map(|(_, p, o)| (p, o)).collect()
                };
                Ok(Slice::Pairs(pairs))
            }
            _ => unreachable!(),
        }
    }

    /// Materializes every triple in the graph. Eager rather than a lazy
    /// `Iterator`, since the latter would tie this graph's public API to
    /// the lifetime of whatever `txn` the caller happens to be holding.
    pub fn iter(&self, txn: &Txn) -> CResult<Vec<(Term, Term, Term)>> {
        self.keys.iter().map(|tk| self.materialize(txn, tk)).collect()
    }

    pub fn terms_by_position(&self, txn: &Txn, position: char) -> CResult<HashSet<Term>> {
        let dict = Dictionary::new(self.env);
        self.keys
            .iter()
            .map(|tk| {
                let key = match position {
                    's' => tk.s,
                    'p' => tk.p,
                    'o' => tk.o,
                    other => return Err(Error::InvalidArgument(format!("unknown position '{other}'"))),
                };
                dict.from_key(txn, key)
            })
            .collect()
    }

    /// Named graphs only: the object of the triple `(self.uri, predicate,
    /// ?)`, requiring at most one match when `strict`.
    pub fn value(&self, txn: &Txn, predicate: &Term, strict: bool) -> CResult<Option<Term>> {
        let Some(uri) = self.uri.clone() else {
            return Ok(None);
        };
        let matched = self.lookup(txn, Some(&uri), Some(predicate), None)?;
        let mut iter = matched.keys.iter();
        let first = iter.next();
        if strict && iter.next().is_some() {
            return Err(Error::InvalidArgument(
                "value() matched more than one triple under strict mode".to_string(),
            ));
        }
        first.map(|tk| Dictionary::new(self.env).from_key(txn, tk.o)).transpose()
    }

    pub fn union(&self, other: &Self) -> CResult<Self> {
        self.same_store(other)?;
        Ok(Self { env: self.env, index: QuadIndex::new(), keys: self.keys.union(&other.keys), uri: self.uri.clone() })
    }

    pub fn intersect(&self, other: &Self) -> CResult<Self> {
        self.same_store(other)?;
        Ok(Self {
            env: self.env,
            index: QuadIndex::new(),
            keys: self.keys.intersect(&other.keys),
            uri: self.uri.clone(),
        })
    }

    pub fn difference(&self, other: &Self) -> CResult<Self> {
        self.same_store(other)?;
        Ok(Self {
            env: self.env,
            index: QuadIndex::new(),
            keys: self.keys.subtract(&other.keys),
            uri: self.uri.clone(),
        })
    }

    pub fn symmetric_difference(&self, other: &Self) -> CResult<Self> {
        self.same_store(other)?;
        Ok(Self { env: self.env, index: QuadIndex::new(), keys: self.keys.xor(&other.keys), uri: self.uri.clone() })
    }

    pub fn union_in_place(&mut self, other: &Self) -> CResult<()> {
        self.same_store(other)?;
        self.keys = self.keys.union(&other.keys);
        Ok(())
    }

    pub fn intersect_in_place(&mut self, other: &Self) -> CResult<()> {
        self.same_store(other)?;
        self.keys = self.keys.intersect(&other.keys);
        Ok(())
    }

    pub fn difference_in_place(&mut self, other: &Self) -> CResult<()> {
        self.same_store(other)?;
        self.keys = self.keys.subtract(&other.keys);
        Ok(())
    }

    pub fn symmetric_difference_in_place(&mut self, other: &Self) -> CResult<()> {
        self.same_store(other)?;
        self.keys = self.keys.xor(&other.keys);
        Ok(())
    }
}

impl<'a> BitOr for &Graph<'a> {
    type Output = CResult<Graph<'a>>;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl<'a> BitAnd for &Graph<'a> {
    type Output = CResult<Graph<'a>>;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersect(rhs)
    }
}

impl<'a> Sub for &Graph<'a> {
    type Output = CResult<Graph<'a>>;
    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

impl<'a> BitXor for &Graph<'a> {
    type Output = CResult<Graph<'a>>;
    fn bitxor(self, rhs: Self) -> Self::Output {
        self.symmetric_difference(rhs)
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
    fn add_then_contains_and_iter() {
        let (_dir, env) = open_env();
        let mut txn = env.txn(true).unwrap();
        let mut g = Graph::named(&env, Term::iri("http://ex.org/g"), 0);

        g.add(&mut txn, [(Term::iri("http://ex.org/s"), Term::iri("http://ex.org/p"), Term::iri("http://ex.org/o"))])
            .unwrap();

        assert!(g
            .contains(&txn, &Term::iri("http://ex.org/s"), &Term::iri("http://ex.org/p"), &Term::iri("http://ex.org/o"))
            .unwrap());
        assert_eq!(g.iter(&txn).unwrap().len(), 1);
    }

    #[test]
    fn set_replaces_object_for_subject_predicate() {
        let (_dir, env) = open_env();
        let mut txn = env.txn(true).unwrap();
        let mut g = Graph::empty(&env, 0);

        let s = Term::iri("http://ex.org/s");
        let p = Term::iri("http://ex.org/p");
        g.add(&mut txn, [(s.clone(), p.clone(), Term::plain_literal("a"))]).unwrap();
        g.add(&mut txn, [(s.clone(), p.clone(), Term::plain_literal("b"))]).unwrap();
        g.set(&mut txn, s.clone(), p.clone(), Term::plain_literal("c")).unwrap();

        let remaining = g.lookup(&txn, Some(&s), Some(&p), None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.iter(&txn).unwrap()[0].2, Term::plain_literal("c"));
    }

    #[test]
    fn set_algebra_over_graphs() {
        let (_dir, env) = open_env();
        let mut txn = env.txn(true).unwrap();
        let mut g1 = Graph::empty(&env, 0);
        let mut g2 = Graph::empty(&env, 0);

        let t1 = (Term::iri("http://ex.org/a"), Term::iri("http://ex.org/p"), Term::iri("http://ex.org/x"));
        let t2 = (Term::iri("http://ex.org/b"), Term::iri("http://ex.org/p"), Term::iri("http://ex.org/y"));
        g1.add(&mut txn, [t1.clone()]).unwrap();
        g2.add(&mut txn, [t2.clone()]).unwrap();

        let union = g1.union(&g2).unwrap();
        assert_eq!(union.len(), 2);

        let x_term = Term::iri("http://ex.org/x");
        assert!(union.contains(&txn, &t1.0, &t1.1, &t1.2).unwrap());

        let xor = g1.symmetric_difference(&g1).unwrap();
        assert!(xor.is_empty());
        let _ = x_term;
    }

    #[test]
    fn slice_returns_bool_terms_pairs_or_triples() {
        let (_dir, env) = open_env();
        let mut txn = env.txn(true).unwrap();
        let mut g = Graph::empty(&env, 0);
        let s = Term::iri("http://ex.org/s");
        let p = Term::iri("http://ex.org/p");
        let o = Term::iri("http://ex.org/o");
        g.add(&mut txn, [(s.clone(), p.clone(), o.clone())]).unwrap();

        assert_eq!(g.slice(&txn, Some(&s), Some(&p), Some(&o)).unwrap(), Slice::Present(true));
        match g.slice(&txn, Some(&s), Some(&p), None).unwrap() {
            Slice::Terms(terms) => assert!(terms.contains(&o)),
            other => panic!("expected Terms, got {other:?}"),
        }
    }
}
