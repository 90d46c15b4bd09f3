//! Deterministic serialization and hashing of [`Term`] (spec §4.2).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CResult, Error};
use crate::term::Term;

const TAG_IRI: u8 = 1;
const TAG_BLANK: u8 = 2;
const TAG_LITERAL: u8 = 3;

/// RDF 1.1 treats an untyped literal as `xsd:string`; both forms serialize
/// with an empty datatype field (§3), so an explicit `xsd:string` datatype
/// is folded away here rather than round-tripping as a distinct byte string.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

pub type TermHash = [u8; 16];

fn write_prefixed(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.write_u32::<LittleEndian>(bytes.len() as u32).expect("writing to a Vec never fails");
    buf.extend_from_slice(bytes);
}

fn read_prefixed(cursor: &mut std::io::Cursor<&[u8]>) -> CResult<String> {
    let len = cursor.read_u32::<LittleEndian>().map_err(|_| {
        Error::Corrupted("truncated length prefix while decoding a term".to_string())
    })? as usize;
    let start = cursor.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= cursor.get_ref().len())
        .ok_or_else(|| Error::Corrupted("length prefix runs past end of buffer".to_string()))?;
    let slice = &cursor.get_ref()[start..end];
    let s = std::str::from_utf8(slice)
        .map_err(|e| Error::Corrupted(format!("term buffer is not valid utf-8: {e}")))?
        .to_string();
    cursor.set_position(end as u64);
    Ok(s)
}

/// Serializes a term to its self-describing byte buffer:
/// `tag : u8 | lex : len-prefixed utf-8 | datatype : len-prefixed utf-8 | lang : len-prefixed utf-8`.
pub fn serialize(term: &Term) -> CResult<Vec<u8>> {
    let mut buf = Vec::new();
    match term {
        Term::Iri(lex) => {
            buf.push(TAG_IRI);
            write_prefixed(&mut buf, lex);
            write_prefixed(&mut buf, "");
            write_prefixed(&mut buf, "");
        }
        Term::Blank(lex) => {
            buf.push(TAG_BLANK);
            write_prefixed(&mut buf, lex);
            write_prefixed(&mut buf, "");
            write_prefixed(&mut buf, "");
        }
        Term::Literal { lex, datatype, lang } => {
            if datatype.is_some() && lang.is_some() {
                return Err(Error::InvalidArgument(
                    "literal has both a datatype and a language tag".to_string(),
                ));
            }
            buf.push(TAG_LITERAL);
            write_prefixed(&mut buf, lex);
            let datatype = datatype.as_deref().filter(|dt| *dt != XSD_STRING).unwrap_or("");
            write_prefixed(&mut buf, datatype);
            write_prefixed(&mut buf, lang.as_deref().unwrap_or(""));
        }
    }
    Ok(buf)
}

/// The exact inverse of [`serialize`].
pub fn deserialize(bytes: &[u8]) -> CResult<Term> {
    if bytes.is_empty() {
        return Err(Error::Corrupted("empty term buffer".to_string()));
    }
    let tag = bytes[0];
    let mut cursor = std::io::Cursor::new(&bytes[1..]);
    let lex = read_prefixed(&mut cursor)?;
    let datatype = read_prefixed(&mut cursor)?;
    let lang = read_prefixed(&mut cursor)?;
    match tag {
        TAG_IRI => Ok(Term::Iri(lex)),
        TAG_BLANK => Ok(Term::Blank(lex)),
        TAG_LITERAL => Ok(Term::Literal {
            lex,
            datatype: if datatype.is_empty() { None } else { Some(datatype) },
            lang: if lang.is_empty() { None } else { Some(lang) },
        }),
        other => Err(Error::Corrupted(format!("unknown term tag {other}"))),
    }
}

/// A 128-bit xxHash3 digest of `bytes`, seeded from the environment's
/// 16-byte hash seed. `xxh3_128_with_seed` takes a 64-bit seed; the upper
/// and lower halves of the stored 16-byte seed are folded into one by XOR,
/// a fixed, documented choice rather than a guess (DESIGN.md).
pub fn hash_bytes(bytes: &[u8], seed: &[u8; 16]) -> TermHash {
    let lo = u64::from_le_bytes(seed[0..8].try_into().unwrap());
    let hi = u64::from_le_bytes(seed[8..16].try_into().unwrap());
    xxhash_rust::xxh3::xxh3_128_with_seed(bytes, lo ^ hi).to_le_bytes()
}
