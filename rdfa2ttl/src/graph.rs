//! The node model: triples, the ordered [`Graph`] they are collected into,
//! and the per-run blank node arena.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use oxrdf::{BlankNode, NamedNode, NamedNodeRef, NamedOrBlankNode, Term};

use crate::prefixes::PrefixMap;

/// An RDF statement. Subjects may only be IRIs or blank nodes and predicates
/// may only be IRIs, which the field types enforce.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: NamedOrBlankNode,
    pub predicate: NamedNode,
    pub object: Term,
}

impl Triple {
    pub fn new(
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    fn write_ntriples(
        &self,
        f: &mut fmt::Formatter<'_>,
        well_known_prefix: Option<&str>,
    ) -> fmt::Result {
        match &self.subject {
            NamedOrBlankNode::NamedNode(n) => write!(f, "{n}")?,
            NamedOrBlankNode::BlankNode(b) => write_blank(f, b, well_known_prefix)?,
        }
        write!(f, " {} ", self.predicate)?;
        match &self.object {
            Term::BlankNode(b) => write_blank(f, b, well_known_prefix)?,
            other => write!(f, "{other}")?,
        }
        f.write_str(" .")
    }
}

fn write_blank(
    f: &mut fmt::Formatter<'_>,
    node: &BlankNode,
    well_known_prefix: Option<&str>,
) -> fmt::Result {
    match well_known_prefix {
        Some(prefix) => write!(f, "<{prefix}{}>", node.as_str()),
        None => write!(f, "{node}"),
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_ntriples(f, None)
    }
}

/// An ordered collection of triples.
///
/// Duplicates are kept: RDFa can legitimately produce the same statement from
/// several elements, and insertion order is what the Turtle writer uses to
/// decide the order of subjects and predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    triples: Vec<Triple>,
    prefixes: PrefixMap,
    well_known_prefix: Option<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn triples_for_subject<'a>(
        &'a self,
        subject: &'a NamedOrBlankNode,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| &t.subject == subject)
    }

    pub fn triples_for_predicate<'a>(
        &'a self,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.predicate.as_str() == predicate.as_str())
    }

    /// Keeps only the triples for which `keep` returns true, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&Triple) -> bool) {
        self.triples.retain(keep);
    }

    /// The namespace prefixes that were in scope while the graph was produced.
    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    pub fn with_prefixes(mut self, prefixes: PrefixMap) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn well_known_prefix(&self) -> Option<&str> {
        self.well_known_prefix.as_deref()
    }

    /// Sets the prefix used to skolemize blank nodes in N-Triples output.
    pub fn with_well_known_prefix(mut self, prefix: Option<String>) -> Self {
        self.well_known_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    /// Renders the graph as N-Triples, one statement per line in insertion order.
    pub fn to_ntriples(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for triple in &self.triples {
            triple.write_ntriples(f, self.well_known_prefix.as_deref())?;
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = std::slice::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

impl From<&Graph> for oxrdf::Graph {
    fn from(graph: &Graph) -> Self {
        let mut result = oxrdf::Graph::new();
        for t in graph {
            let subject: oxrdf::SubjectRef<'_> = match &t.subject {
                NamedOrBlankNode::NamedNode(n) => n.as_ref().into(),
                NamedOrBlankNode::BlankNode(b) => b.as_ref().into(),
            };
            result.insert(oxrdf::TripleRef::new(
                subject,
                t.predicate.as_ref(),
                t.object.as_ref(),
            ));
        }
        result
    }
}

/// Allocates blank nodes for a single extraction run.
///
/// Every node is labelled `b<N>` from a private counter, including the ones
/// the document names itself with `_:label`, so that generated and
/// document-supplied labels can never collide.
#[derive(Debug, Default)]
pub(crate) struct BlankNodes {
    next: Cell<u64>,
    labelled: RefCell<HashMap<String, BlankNode>>,
}

impl BlankNodes {
    pub(crate) fn fresh(&self) -> BlankNode {
        let id = self.next.get() + 1;
        self.next.set(id);
        BlankNode::new_unchecked(format!("b{id}"))
    }

    /// Returns the node for a document label; the same label always yields
    /// the same node within one run. The empty label stands for `[_:]`.
    pub(crate) fn labelled(&self, label: &str) -> BlankNode {
        if let Some(node) = self.labelled.borrow().get(label) {
            return node.clone();
        }

        let node = self.fresh();
        self.labelled
            .borrow_mut()
            .insert(label.to_string(), node.clone());
        node
    }
}

#[cfg(test)]
mod test {
    use oxrdf::{Literal, vocab::rdf};

    use super::*;

    #[test]
    fn fresh_nodes_are_distinct() {
        let nodes = BlankNodes::default();
        let a = nodes.fresh();
        let b = nodes.fresh();
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "b1");
        assert_eq!(b.as_str(), "b2");
    }

    #[test]
    fn labels_are_stable_and_do_not_collide() {
        let nodes = BlankNodes::default();
        let fresh = nodes.fresh();
        let named = nodes.labelled("b1");
        assert_ne!(fresh, named);
        assert_eq!(named, nodes.labelled("b1"));
        assert_ne!(named, nodes.labelled(""));
    }

    #[test]
    fn ntriples_keeps_duplicates_and_order() {
        let s = NamedNode::new_unchecked("http://example.org/s");
        let mut graph = Graph::new();
        graph.insert(Triple::new(s.clone(), rdf::TYPE, NamedNode::new_unchecked("http://example.org/T")));
        graph.insert(Triple::new(s.clone(), rdf::VALUE, Literal::new_simple_literal("x")));
        graph.insert(Triple::new(s, rdf::VALUE, Literal::new_simple_literal("x")));

        assert_eq!(graph.len(), 3);
        assert_eq!(
            graph.to_ntriples(),
            "<http://example.org/s> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/T> .\n\
             <http://example.org/s> <http://www.w3.org/1999/02/22-rdf-syntax-ns#value> \"x\" .\n\
             <http://example.org/s> <http://www.w3.org/1999/02/22-rdf-syntax-ns#value> \"x\" .\n"
        );
    }

    #[test]
    fn skolemizes_with_well_known_prefix() {
        let nodes = BlankNodes::default();
        let b = nodes.fresh();
        let graph: Graph = [Triple::new(b, rdf::VALUE, Literal::new_simple_literal("x"))]
            .into_iter()
            .collect();
        let graph =
            graph.with_well_known_prefix(Some("http://example.org/.well-known/genid/".into()));
        assert_eq!(
            graph.to_ntriples(),
            "<http://example.org/.well-known/genid/b1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#value> \"x\" .\n"
        );
    }
}
