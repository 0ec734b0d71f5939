//! The state inherited from element to element during extraction.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use curie::PrefixMapping;
use icu::locale::LanguageIdentifier;
use indexmap::IndexMap;
use log::debug;
use oxiri::Iri;
use oxrdf::{NamedNode, NamedOrBlankNode, Term};

use crate::prefixes::{initial_context_prefixes, initial_context_terms};

pub(crate) type SharedList = RefCell<Vec<Term>>;

/// Lists collected for `@inlist`, keyed by predicate.
///
/// The mapping is shared by reference between an element and the descendants
/// that keep its subject, so that every `@inlist` value in that region lands
/// in the same list. An element with a new subject starts a fresh mapping and
/// is responsible for turning it into collections once its subtree is done.
#[derive(Default, Debug)]
pub(crate) struct ListMapping {
    lists: IndexMap<NamedNode, Rc<SharedList>>,
}

pub(crate) type SharedListMapping = Rc<RefCell<ListMapping>>;

impl ListMapping {
    pub(crate) fn ensure_list(&mut self, predicate: &NamedNode) -> Rc<SharedList> {
        if let Some(list) = self.lists.get(predicate) {
            return list.clone();
        }

        debug!("created new list for predicate: {predicate}");
        let list: Rc<SharedList> = Default::default();
        self.lists.insert(predicate.clone(), list.clone());
        list
    }

    pub(crate) fn insert_value(&mut self, predicate: &NamedNode, term: Term) {
        debug!("inserting into list ({predicate}): {term}");
        self.ensure_list(predicate).borrow_mut().push(term);
    }

    /// The lists in creation order.
    pub(crate) fn lists(&self) -> impl Iterator<Item = (&NamedNode, &Rc<SharedList>)> {
        self.lists.iter()
    }
}

/// A relation waiting for a descendant to supply the missing resource.
#[derive(Clone, Debug)]
pub(crate) enum IncompleteTriple {
    /// `@rel` together with `@inlist`: the next subject joins the list.
    List(Rc<SharedList>),
    /// `@rel`: parent subject → next subject.
    Forward(NamedNode),
    /// `@rev`: next subject → parent subject.
    Reverse(NamedNode),
}

// “During processing, each rule is applied using information provided by an evaluation context.
#[derive(Clone)]
pub(crate) struct EvaluationContext {
    /// The IRI relative references resolve against, without fragment.
    pub(crate) base: Iri<String>,

    pub(crate) parent_subject: Rc<NamedOrBlankNode>,

    // note that this is a subject, not an object: literals never become a parent object
    pub(crate) parent_object: Option<Rc<NamedOrBlankNode>>,

    /// Copy-on-write: a descendant that declares prefixes clones the mapping
    /// before changing it, so ancestors and siblings never see the update.
    pub(crate) iri_mappings: Rc<PrefixMapping>,

    pub(crate) incomplete_triples: Vec<IncompleteTriple>,

    pub(crate) list_mapping: SharedListMapping,

    pub(crate) language: Option<Rc<LanguageIdentifier>>,

    pub(crate) term_mappings: Rc<BTreeMap<String, NamedNode>>,

    pub(crate) default_vocab: Option<NamedNode>,
}

impl EvaluationContext {
    pub(crate) fn new(
        base: Iri<String>,
        default_language: Option<LanguageIdentifier>,
        default_vocab: Option<NamedNode>,
    ) -> Self {
        // resolving the empty reference drops any fragment, so the base can
        // be used directly as the value of the empty CURIE
        let base = base.resolve("").unwrap_or(base);
        let parent_subject = NamedNode::new_unchecked(base.as_str());

        Self {
            base,
            parent_subject: Rc::new(parent_subject.into()),
            parent_object: None,
            iri_mappings: Rc::new(initial_context_prefixes().clone()),
            incomplete_triples: Vec::new(),
            list_mapping: SharedListMapping::default(),
            language: default_language.map(Rc::new),
            term_mappings: Rc::new(initial_context_terms().clone()),
            default_vocab,
        }
    }
}

#[cfg(test)]
mod test {
    use oxrdf::Literal;

    use super::*;

    fn p(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    #[test]
    fn new_context_strips_fragment_from_base() {
        let base = Iri::parse("http://example.org/doc#frag".to_string()).unwrap();
        let ctx = EvaluationContext::new(base, None, None);
        assert_eq!(ctx.base.as_str(), "http://example.org/doc");
        assert_eq!(
            ctx.parent_subject.as_ref(),
            &NamedOrBlankNode::from(NamedNode::new_unchecked("http://example.org/doc"))
        );
        assert!(ctx.parent_object.is_none());
    }

    #[test]
    fn lists_keep_insertion_order() {
        let mut mapping = ListMapping::default();
        mapping.insert_value(&p("b"), Literal::new_simple_literal("1").into());
        mapping.ensure_list(&p("a"));
        mapping.insert_value(&p("b"), Literal::new_simple_literal("2").into());

        let lists: Vec<_> = mapping
            .lists()
            .map(|(predicate, list)| (predicate.clone(), list.borrow().len()))
            .collect();
        assert_eq!(lists, vec![(p("b"), 2), (p("a"), 0)]);
    }

    #[test]
    fn shared_mapping_sees_descendant_lists() {
        let ctx = EvaluationContext::new(
            Iri::parse("http://example.org/".to_string()).unwrap(),
            None,
            None,
        );
        let child = ctx.clone();
        child
            .list_mapping
            .borrow_mut()
            .insert_value(&p("a"), Literal::new_simple_literal("x").into());

        assert!(Rc::ptr_eq(&ctx.list_mapping, &child.list_mapping));
        assert!(ctx.list_mapping.borrow().lists().next().is_some());
    }
}
