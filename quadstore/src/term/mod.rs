//! RDF terms: the value type interned by the Term Dictionary (spec §4.3).

mod codec;
mod dict;

pub use codec::{hash_bytes, TermHash};
pub use dict::Dictionary;

/// An RDF term: an IRI, a blank node, or a literal.
///
/// A literal's `datatype` and `lang` are mutually exclusive on the wire —
/// `Term::literal` rejects constructing both — but an untyped literal
/// (`datatype: None, lang: None`) and one explicitly typed `xsd:string`
/// both serialize with an empty datatype field (§3: RDF 1.1 treats untyped
/// literals as `xsd:string`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal { lex: String, datatype: Option<String>, lang: Option<String> },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank(value: impl Into<String>) -> Self {
        Term::Blank(value.into())
    }

    pub fn plain_literal(lex: impl Into<String>) -> Self {
        Term::Literal { lex: lex.into(), datatype: None, lang: None }
    }

    pub fn typed_literal(lex: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal { lex: lex.into(), datatype: Some(datatype.into()), lang: None }
    }

    pub fn lang_literal(lex: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal { lex: lex.into(), datatype: None, lang: Some(lang.into()) }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }
}
