//! Namespace prefixes: the RDFa initial context, and the [`PrefixMap`] the
//! Turtle writer compacts IRIs with.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use curie::PrefixMapping;
use indexmap::IndexMap;

// https://www.w3.org/2011/rdfa-context/rdfa-1.1
const INITIAL_PREFIXES: &[(&str, &str)] = &[
    // Defined by [rdfa-core]
    ("", "http://www.w3.org/1999/xhtml/vocab#"),
    // W3C documents
    ("as", "https://www.w3.org/ns/activitystreams#"),
    ("csvw", "http://www.w3.org/ns/csvw#"),
    ("dcat", "http://www.w3.org/ns/dcat#"),
    ("dqv", "http://www.w3.org/ns/dqv#"),
    ("duv", "http://www.w3.org/ns/duv#"),
    ("grddl", "http://www.w3.org/2003/g/data-view#"),
    ("jsonld", "http://json-ld.org/vocab#"),
    ("ma", "http://www.w3.org/ns/ma-ont#"),
    ("org", "http://www.w3.org/ns/org#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("qb", "http://purl.org/linked-data/cube#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfa", "http://www.w3.org/ns/rdfa#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("rif", "http://www.w3.org/2007/rif#"),
    ("rr", "http://www.w3.org/ns/r2rml#"),
    ("sd", "http://www.w3.org/ns/sparql-service-description#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("skosxl", "http://www.w3.org/2008/05/skos-xl#"),
    ("sosa", "http://www.w3.org/ns/sosa/"),
    ("ssn", "http://www.w3.org/ns/ssn/"),
    ("time", "http://www.w3.org/2006/time#"),
    ("void", "http://rdfs.org/ns/void#"),
    ("wdr", "http://www.w3.org/2007/05/powder#"),
    ("wdrs", "http://www.w3.org/2007/05/powder-s#"),
    ("xhv", "http://www.w3.org/1999/xhtml/vocab#"),
    ("xml", "http://www.w3.org/XML/1998/namespace"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    // "widely used"
    ("cc", "http://creativecommons.org/ns#"),
    ("ctag", "http://commontag.org/ns#"),
    ("dc", "http://purl.org/dc/terms/"),
    ("dc11", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("gr", "http://purl.org/goodrelations/v1#"),
    ("ical", "http://www.w3.org/2002/12/cal/icaltzd#"),
    ("og", "http://ogp.me/ns#"),
    ("rev", "http://purl.org/stuff/rev#"),
    ("schema", "http://schema.org/"),
    ("schemas", "https://schema.org/"),
    ("sioc", "http://rdfs.org/sioc/ns#"),
    ("v", "http://rdf.data-vocabulary.org/#"),
    ("vcard", "http://www.w3.org/2006/vcard/ns#"),
];

// https://www.w3.org/2011/rdfa-context/rdfa-1.1
// Vocabulary terms
const INITIAL_TERMS: &[(&str, &str)] = &[
    ("describedby", "http://www.w3.org/2007/05/powder-s#describedby"),
    ("license", "http://www.w3.org/1999/xhtml/vocab#license"),
    ("role", "http://www.w3.org/1999/xhtml/vocab#role"),
];

/// The prefix mappings every document starts with, in the form the CURIE
/// resolver consumes.
pub fn initial_context_prefixes() -> &'static PrefixMapping {
    static INITIAL_CONTEXT: OnceLock<PrefixMapping> = OnceLock::new();
    INITIAL_CONTEXT.get_or_init(|| {
        let mut mapping = PrefixMapping::default();
        for (prefix, iri) in INITIAL_PREFIXES {
            mapping
                .add_prefix(prefix, iri)
                .expect("initial context prefixes are never reserved");
        }
        mapping
    })
}

pub fn initial_context_terms() -> &'static BTreeMap<String, oxrdf::NamedNode> {
    static INITIAL_CONTEXT: OnceLock<BTreeMap<String, oxrdf::NamedNode>> = OnceLock::new();
    INITIAL_CONTEXT.get_or_init(|| {
        INITIAL_TERMS
            .iter()
            .map(|(term, iri)| (term.to_string(), oxrdf::NamedNode::new_unchecked(*iri)))
            .collect()
    })
}

/// Prefix names mapped to namespace IRIs, as used for Turtle output.
///
/// Insertion order matters: when two prefixes share the same namespace the
/// one inserted last is preferred, so that a prefix a document declares wins
/// over an initial-context alias for the same vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixMap {
    mappings: IndexMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The named prefixes of the RDFa initial context. The empty prefix is
    /// left out; it is only meaningful as RDFa's `:term` syntax.
    pub fn initial_context() -> Self {
        INITIAL_PREFIXES
            .iter()
            .filter(|(prefix, _)| !prefix.is_empty())
            .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
            .collect()
    }

    /// Adds or replaces a mapping, moving it to the most-preferred position.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let prefix = prefix.into();
        self.mappings.shift_remove(&prefix);
        self.mappings.insert(prefix, namespace.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.mappings.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Splits `iri` into `(prefix, local)` using the longest namespace that
    /// leaves a local part Turtle can write without escapes.
    pub fn compact<'a>(&'a self, iri: &'a str) -> Option<(&'a str, &'a str)> {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, namespace) in self.iter() {
            if !is_pn_prefix(prefix) {
                continue;
            }

            let Some(local) = iri.strip_prefix(namespace) else {
                continue;
            };

            if !is_pn_local(local) {
                continue;
            }

            // ties go to the later insertion
            if best.is_none_or(|(_, best_local)| local.len() <= best_local.len()) {
                best = Some((prefix, local));
            }
        }
        best
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PrefixMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PrefixMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (prefix, namespace) in iter {
            self.insert(prefix, namespace);
        }
    }
}

impl From<&PrefixMapping> for PrefixMap {
    fn from(mapping: &PrefixMapping) -> Self {
        mapping
            .mappings()
            .filter(|(prefix, _)| !prefix.is_empty())
            .map(|(prefix, namespace)| (prefix.to_string(), namespace.to_string()))
            .collect()
    }
}

fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

// PN_CHARS_U and the extra PN_CHARS ranges
fn is_pn_chars(c: char) -> bool {
    is_pn_chars_base(c)
        || matches!(c,
            '_' | '-' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

// PN_PREFIX ::= PN_CHARS_BASE ((PN_CHARS | '.')* PN_CHARS)?
fn is_pn_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(first) => {
            is_pn_chars_base(first)
                && !prefix.ends_with('.')
                && chars.all(|c| is_pn_chars(c) || c == '.')
        }
    }
}

// PN_LOCAL, without PLX escapes
fn is_pn_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        None => true,
        Some(first) => {
            (is_pn_chars_base(first) || first.is_ascii_digit() || matches!(first, '_' | ':'))
                && !local.ends_with('.')
                && chars.all(|c| is_pn_chars(c) || matches!(c, '.' | ':'))
        }
    }
}
