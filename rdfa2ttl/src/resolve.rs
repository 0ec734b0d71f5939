//! Per-element scope and the attribute-datatype aware resolution of terms,
//! CURIEs and IRIs ([rdfa-core] 7.4).

use std::collections::BTreeMap;
use std::rc::Rc;

use curie::{Curie, ExpansionError, PrefixMapping};
use icu::locale::LanguageIdentifier;
use log::trace;
use oxiri::IriParseError;
use oxrdf::{NamedNode, NamedNodeRef, NamedOrBlankNode};

use crate::context::{EvaluationContext, IncompleteTriple, SharedListMapping};
use crate::graph::BlankNodes;
use crate::processor::{PGType, ProcessorGraph};

/// Non-hierarchical schemes that are accepted as absolute IRIs even though
/// they look like a CURIE with an undeclared prefix.
const KNOWN_SCHEMES: &[&str] = &[
    "urn", "mailto", "tel", "tag", "data", "geo", "news", "sip", "did",
];

/// The state of an attribute after resolution.
pub(crate) enum Attr<T> {
    Missing,
    /// Present, but nothing in it resolved.
    Empty,
    Value(T),
}

impl<T> Attr<T> {
    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Missing => Attr::Missing,
            Attr::Empty => Attr::Empty,
            Attr::Value(v) => Attr::Value(f(v)),
        }
    }

    pub(crate) fn is_present(&self) -> bool {
        !matches!(self, Attr::Missing)
    }

    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }

    pub(crate) fn into_value(self) -> Option<T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }
}

pub(crate) enum Relation {
    Forward(NamedNode),
    Reverse(NamedNode),
    List(NamedNode),
}

enum CurieError {
    EmptyCurie,
    InvalidIRI(String),
    ExpansionError(ExpansionError),
}

struct NotCURIE;
struct NotTERM;

// “During the course of processing a number of locally scoped values are needed, as follows:
#[derive(Clone)]
pub(crate) struct LocalScope<'a> {
    pub(crate) eval_context: &'a EvaluationContext,
    processor: &'a ProcessorGraph,
    blank_nodes: &'a BlankNodes,
    // “An initially empty list of IRI mappings, called the local list of IRI mappings.
    pub(crate) iri_mappings: Rc<PrefixMapping>,
    // “An initially empty list of incomplete triples, called the local list of incomplete triples.
    pub(crate) incomplete_triples: Vec<IncompleteTriple>,
    // “An initially empty language value.
    pub(crate) current_language: Option<Rc<LanguageIdentifier>>,
    // “A skip element flag, which indicates whether the current element can safely be ignored
    //  since it has no relevant RDFa attributes. Note that descendant elements will still be processed.
    pub(crate) skip_element: bool,
    // “A new subject value, which once calculated will set the parent subject in an evaluation context,
    //  as well as being used to complete any incomplete triples, as described in the next section.
    pub(crate) new_subject: Option<Rc<NamedOrBlankNode>>,
    // “A value for the current object resource, the resource to use when creating triples that have a resource object.
    pub(crate) current_object_resource: Option<Rc<NamedOrBlankNode>>,
    // “A value for the typed resource, the source for creating rdf:type relationships to types specified in @typeof.
    pub(crate) typed_resource: Option<Rc<NamedOrBlankNode>>,
    // “The local term mappings, a list of terms and their associated IRIs.
    pub(crate) term_mappings: Rc<BTreeMap<String, NamedNode>>,
    // “The local list mapping, mapping IRIs to lists
    pub(crate) list_mapping: SharedListMapping,
    // “A local default vocabulary, an IRI to use as a prefix mapping when a term is used.
    pub(crate) default_vocab: Option<NamedNode>,
}

impl<'a> LocalScope<'a> {
    pub(crate) fn new(
        eval_context: &'a EvaluationContext,
        processor: &'a ProcessorGraph,
        blank_nodes: &'a BlankNodes,
    ) -> Self {
        // “First, the local values are initialized, as follows:
        Self {
            eval_context,
            processor,
            blank_nodes,
            // “the skip element flag is set to 'false';
            skip_element: false,
            // “new subject is set to null;
            new_subject: None,
            // “current object resource is set to null;
            current_object_resource: None,
            // “typed resource is set to null;
            typed_resource: None,
            // “the local list of IRI mappings is set to the list of IRI mappings from the evaluation context;
            iri_mappings: eval_context.iri_mappings.clone(),
            // “the local list of incomplete triples is set to null;
            incomplete_triples: Vec::new(),
            // “the list mapping is set to (a reference of) the list mapping from the evaluation context;
            list_mapping: eval_context.list_mapping.clone(),
            // “the current language value is set to the language value from the evaluation context.
            current_language: eval_context.language.clone(),
            // “the local term mappings is set to the term mappings from the evaluation context.
            term_mappings: eval_context.term_mappings.clone(),
            // “the local default vocabulary is set to the default vocabulary from the evaluation context.
            default_vocab: eval_context.default_vocab.clone(),
        }
    }

    /// A copy of this scope with a different default vocabulary.
    pub(crate) fn with_vocabulary(&self, vocab: NamedNode) -> Self {
        Self {
            default_vocab: Some(vocab),
            ..self.clone()
        }
    }

    pub(crate) fn warn(&self, pg_type: PGType, message: &str) {
        self.processor.emit(pg_type, message);
    }

    pub(crate) fn fresh_blank_node(&self) -> Rc<NamedOrBlankNode> {
        Rc::new(self.blank_nodes.fresh().into())
    }

    /// An empty CURIE resolves to the base.
    pub(crate) fn empty_curie(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(self.eval_context.base.as_str())
    }

    // When resolving a term, the outcome might be that it _must_ be ignored.
    // This is indicated by returning [`None`].
    fn resolve_term(&self, term: &str) -> Result<Option<NamedNode>, NotTERM> {
        // [rdfa-core] 7.5.3
        // > term     ::=  NCNameStartChar termChar*
        // > termChar ::=  ( NameChar - ':' ) | '/'
        let is_term = !term.is_empty()
            && !term.starts_with('/')
            && term
                .split('/')
                .all(|s| rxml_validation::validate_ncname(s).is_ok());

        if !is_term {
            return Err(NotTERM);
        }

        // > If there is a local default vocabulary the IRI is obtained
        // > by concatenating that value and the term.
        if let Some(vocab) = &self.default_vocab {
            return Ok(Some(NamedNode::new_unchecked(format!("{}{term}", vocab.as_str()))));
        }

        // > First compare against the list case-sensitively,
        if let Some(term_iri) = self.term_mappings.get(term) {
            return Ok(Some(term_iri.clone()));
        }

        // > and if there is no match then compare case-insensitively.
        if let Some(term_iri) = self
            .term_mappings
            .iter()
            .find_map(|(key, iri)| key.eq_ignore_ascii_case(term).then(|| iri.clone()))
        {
            return Ok(Some(term_iri));
        }

        // > Otherwise, the term has no associated IRI and MUST be ignored.
        self.warn(
            PGType::UnresolvedTerm,
            &format!("Unresolved term: {term} (no vocabulary or term mapping)"),
        );
        Ok(None)
    }

    /// Resolves a (non-safe) CURIE to an IRI or bnode.
    fn resolve_curie(&self, value: &str) -> Result<NamedOrBlankNode, CurieError> {
        if value.is_empty() {
            return Err(CurieError::EmptyCurie);
        }

        let expanded = match value.split_once(':') {
            Some(("_", label)) => {
                // [_:] is permitted by RDFa and stands for one node per document
                return Ok(self.blank_nodes.labelled(label).into());
            }
            Some((prefix, suffix)) => {
                let prefix = prefix.to_ascii_lowercase();
                self.iri_mappings
                    .expand_curie(&Curie::new(Some(prefix.as_str()), suffix))
            }
            None => self.iri_mappings.expand_curie(&Curie::new(None, value)),
        };

        match expanded {
            // See note just before [rdfa-core] 7.4.1: a relative IRI can
            // (though should not) be used as a prefix, so resolve it.
            Ok(iri) => match self.resolve_relative_iri(&iri) {
                Ok(absolute_iri) => Ok(absolute_iri.into()),
                Err(_) => Err(CurieError::InvalidIRI(iri)),
            },
            Err(err) => Err(CurieError::ExpansionError(err)),
        }
    }

    /// Resolves a SafeCURIE or CURIE to an IRI or bnode.
    fn resolve_safecurie_or_curie(
        &self,
        value: &str,
    ) -> Result<Option<NamedOrBlankNode>, NotCURIE> {
        let Some(safe) = value
            .strip_prefix('[')
            .and_then(|value| value.strip_suffix(']'))
        else {
            return self.resolve_curie(value).map(Some).map_err(|_| NotCURIE);
        };

        // a SafeCURIE that does not resolve MUST be ignored
        match self.resolve_curie(safe) {
            Ok(iri) => Ok(Some(iri)),
            Err(CurieError::EmptyCurie | CurieError::ExpansionError(ExpansionError::MissingDefault)) => {
                Ok(None)
            }
            Err(CurieError::InvalidIRI(iri)) => {
                self.warn(
                    PGType::UnresolvedCurie,
                    &format!("Invalid CURIE: {value} (expanded to invalid IRI value <{iri}>)"),
                );
                Ok(None)
            }
            Err(CurieError::ExpansionError(ExpansionError::Invalid)) => {
                self.warn(
                    PGType::UnresolvedCurie,
                    &format!("Invalid CURIE: {value} (no such prefix defined)"),
                );
                Ok(None)
            }
        }
    }

    /// Resolves an IRI-only attribute value (`@href`, `@src`).
    pub(crate) fn attribute_iri(&self, value: &str) -> Option<NamedNode> {
        match self.resolve_relative_iri(value) {
            Ok(iri) => Some(iri),
            Err(err) => {
                self.report_invalid_iri(err, value);
                None
            }
        }
    }

    /// Resolves an IRI reference against the base.
    pub(crate) fn resolve_relative_iri(&self, value: &str) -> Result<NamedNode, IriParseError> {
        let iri = self.eval_context.base.resolve(value)?;
        Ok(NamedNode::new_unchecked(iri.into_inner()))
    }

    pub(crate) fn safecurie_or_curie_or_iri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_safecurie_or_curie(value) {
            Ok(val) => val, // value or MUST be ignored
            Err(NotCURIE) => match self.resolve_relative_iri(value) {
                Ok(val) => Some(val.into()),
                Err(err) => {
                    self.report_invalid_iri(err, value);
                    None
                }
            },
        }
    }

    fn curie_or_absiri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_curie(value) {
            Ok(val) => Some(val),
            // without a colon this can only have been a term, which was ignored
            Err(CurieError::EmptyCurie | CurieError::ExpansionError(ExpansionError::MissingDefault)) => {
                trace!("- ignoring non-CURIE value: {value}");
                None
            }
            Err(CurieError::ExpansionError(ExpansionError::Invalid)) if !looks_like_iri(value) => {
                self.warn(
                    PGType::UnresolvedCurie,
                    &format!("Invalid CURIE: {value} (no such prefix defined)"),
                );
                None
            }
            Err(_) => match NamedNode::new(value) {
                Ok(iri) => Some(iri.into()),
                Err(err) => {
                    self.report_invalid_iri(err, value);
                    None
                }
            },
        }
    }

    fn report_invalid_iri(&self, err: IriParseError, value: &str) {
        self.warn(PGType::Warning, &format!("Invalid IRI: <{value}> ({err})"));
    }

    pub(crate) fn term_or_curie_or_absiri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_term(value) {
            Ok(result) => result.map(NamedOrBlankNode::from), // value or MUST be ignored
            Err(NotTERM) => self.curie_or_absiri(value),
        }
    }

    pub(crate) fn many_curie_or_absiri(&self, value: &str) -> Vec<NamedOrBlankNode> {
        value
            .split_ascii_whitespace()
            .filter_map(|v| self.curie_or_absiri(v))
            .collect()
    }

    pub(crate) fn many_term_or_curie_or_absiri(&self, value: &str) -> Vec<NamedOrBlankNode> {
        value
            .split_ascii_whitespace()
            .filter_map(|v| self.term_or_curie_or_absiri(v))
            .collect()
    }

    pub(crate) fn predicates(&self, attr: &str, values: Vec<NamedOrBlankNode>) -> Vec<NamedNode> {
        values
            .into_iter()
            .filter_map(|v| self.to_predicate(attr, v))
            .collect()
    }

    /// Narrows a resolved value to something usable as a predicate.
    pub(crate) fn to_predicate(&self, attr: &str, value: NamedOrBlankNode) -> Option<NamedNode> {
        match value {
            NamedOrBlankNode::NamedNode(n) => Some(n),
            NamedOrBlankNode::BlankNode(b) => {
                self.warn(
                    PGType::Warning,
                    &format!("@{attr} cannot refer to a bnode: [{b}]"),
                );
                None
            }
        }
    }
}

/// Whether a `prefix:suffix` token with an undeclared prefix should still be
/// read as an absolute IRI.
fn looks_like_iri(value: &str) -> bool {
    match value.split_once(':') {
        Some((scheme, rest)) => {
            rest.starts_with("//")
                || KNOWN_SCHEMES
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(scheme))
        }
        None => false,
    }
}

#[cfg(test)]
mod test {
    use oxiri::Iri;
    use oxrdf::BlankNode;

    use super::*;

    fn context() -> EvaluationContext {
        let base = Iri::parse("http://example.org/doc".to_string()).unwrap();
        EvaluationContext::new(base, None, None)
    }

    fn named(iri: &str) -> Option<NamedOrBlankNode> {
        Some(NamedNode::new_unchecked(iri).into())
    }

    #[test]
    fn resolves_curies_terms_and_iris() {
        let ctx = context();
        let pg = ProcessorGraph::default();
        let bnodes = BlankNodes::default();
        let local = LocalScope::new(&ctx, &pg, &bnodes);

        assert_eq!(
            local.term_or_curie_or_absiri("foaf:name"),
            named("http://xmlns.com/foaf/0.1/name")
        );
        assert_eq!(
            local.term_or_curie_or_absiri("FOAF:name"),
            named("http://xmlns.com/foaf/0.1/name")
        );
        assert_eq!(
            local.term_or_curie_or_absiri("license"),
            named("http://www.w3.org/1999/xhtml/vocab#license")
        );
        assert_eq!(
            local.term_or_curie_or_absiri("http://example.org/p"),
            named("http://example.org/p")
        );
        assert_eq!(
            local.safecurie_or_curie_or_iri("#me"),
            named("http://example.org/doc#me")
        );
        assert_eq!(
            local.safecurie_or_curie_or_iri("[foaf:Person]"),
            named("http://xmlns.com/foaf/0.1/Person")
        );
        assert!(pg.into_graph().is_empty());
    }

    #[test]
    fn vocabulary_applies_to_terms_only() {
        let ctx = context();
        let pg = ProcessorGraph::default();
        let bnodes = BlankNodes::default();
        let mut local = LocalScope::new(&ctx, &pg, &bnodes);
        local.default_vocab = Some(NamedNode::new_unchecked("http://schema.org/"));

        assert_eq!(
            local.term_or_curie_or_absiri("name"),
            named("http://schema.org/name")
        );
        assert_eq!(
            local.term_or_curie_or_absiri("dc:title"),
            named("http://purl.org/dc/terms/title")
        );
    }

    #[test]
    fn unknown_prefixes_are_dropped_with_a_warning() {
        let ctx = context();
        let pg = ProcessorGraph::default();
        let bnodes = BlankNodes::default();
        let local = LocalScope::new(&ctx, &pg, &bnodes);

        assert_eq!(local.term_or_curie_or_absiri("bogus:thing"), None);
        assert_eq!(
            local.term_or_curie_or_absiri("urn:isbn:0451450523"),
            named("urn:isbn:0451450523")
        );
        assert_eq!(
            local.term_or_curie_or_absiri("mailto:ivan@w3.org"),
            named("mailto:ivan@w3.org")
        );
        assert_eq!(local.safecurie_or_curie_or_iri("[bogus:thing]"), None);
        assert_eq!(local.term_or_curie_or_absiri("undefinedterm"), None);

        assert_eq!(
            local.many_term_or_curie_or_absiri("bogus:thing foaf:knows"),
            vec![NamedNode::new_unchecked("http://xmlns.com/foaf/0.1/knows").into()]
        );

        let warnings = pg.into_graph();
        let classes: Vec<_> = warnings
            .triples_for_predicate(oxrdf::vocab::rdf::TYPE)
            .map(|t| t.object.to_string())
            .collect();
        assert_eq!(
            classes,
            vec![
                "<http://www.w3.org/ns/rdfa#UnresolvedCurie>",
                "<http://www.w3.org/ns/rdfa#UnresolvedCurie>",
                "<http://www.w3.org/ns/rdfa#UnresolvedTerm>",
                "<http://www.w3.org/ns/rdfa#UnresolvedCurie>",
            ]
        );
    }

    #[test]
    fn blank_node_curies_use_the_arena() {
        let ctx = context();
        let pg = ProcessorGraph::default();
        let bnodes = BlankNodes::default();
        let local = LocalScope::new(&ctx, &pg, &bnodes);

        let a = local.safecurie_or_curie_or_iri("_:a");
        let empty = local.safecurie_or_curie_or_iri("[_:]");
        assert_eq!(a, Some(BlankNode::new_unchecked("b1").into()));
        assert_eq!(empty, Some(BlankNode::new_unchecked("b2").into()));
        assert_eq!(local.safecurie_or_curie_or_iri("[_:a]"), a);
        assert_eq!(local.safecurie_or_curie_or_iri("_:"), empty);

        let b = a.unwrap();
        assert_eq!(local.to_predicate("rel", b), None);
    }

    #[test]
    fn without_property_only_declared_curies_count() {
        let ctx = context();
        let pg = ProcessorGraph::default();
        let bnodes = BlankNodes::default();
        let local = LocalScope::new(&ctx, &pg, &bnodes);

        assert_eq!(
            local.many_curie_or_absiri("stylesheet foaf:knows"),
            vec![NamedNode::new_unchecked("http://xmlns.com/foaf/0.1/knows").into()]
        );
        assert!(pg.into_graph().is_empty());
    }
}
