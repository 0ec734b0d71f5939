//! The processor graph, where problems the extractor recovered from are
//! recorded.

use std::cell::RefCell;

use log::warn;
use oxrdf::{Literal, NamedNodeRef, vocab::rdf};

use crate::graph::{BlankNodes, Graph, Triple};
use crate::vocab::{dc, rdfa};

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub(crate) enum PGType {
    Warning,
    DocumentError,
    UnresolvedCurie,
    UnresolvedTerm,
    PrefixRedefinition,
}

impl From<PGType> for NamedNodeRef<'static> {
    fn from(val: PGType) -> Self {
        match val {
            PGType::Warning => rdfa::WARNING,
            PGType::DocumentError => rdfa::DOCUMENT_ERROR,
            PGType::UnresolvedCurie => rdfa::UNRESOLVED_CURIE,
            PGType::UnresolvedTerm => rdfa::UNRESOLVED_TERM,
            PGType::PrefixRedefinition => rdfa::PREFIX_REDEFINITION,
        }
    }
}

/// Collects processor messages during one extraction run.
///
/// Messages get their own blank node arena so that a warning never shifts
/// the labels of blank nodes in the output graph.
#[derive(Debug, Default)]
pub(crate) struct ProcessorGraph {
    graph: RefCell<Graph>,
    blank_nodes: BlankNodes,
}

impl ProcessorGraph {
    pub(crate) fn emit(&self, pg_type: PGType, message: &str) {
        warn!("{pg_type}: {message}");

        let node = self.blank_nodes.fresh();
        let class: NamedNodeRef = pg_type.into();

        let mut graph = self.graph.borrow_mut();
        // new bnode is-a PGClass
        graph.insert(Triple::new(node.clone(), rdf::TYPE, class.into_owned()));
        graph.insert(Triple::new(
            node,
            dc::DESCRIPTION,
            Literal::new_simple_literal(message),
        ));
    }

    pub(crate) fn into_graph(self) -> Graph {
        self.graph.into_inner()
    }
}

#[cfg(test)]
mod test {
    use oxrdf::{NamedOrBlankNode, Term};

    use super::*;

    #[test]
    fn each_message_gets_a_typed_node() {
        let pg = ProcessorGraph::default();
        pg.emit(PGType::UnresolvedCurie, "no such prefix: bogus");
        pg.emit(PGType::Warning, "second");

        let graph = pg.into_graph();
        assert_eq!(graph.len(), 4);

        let types: Vec<_> = graph
            .triples_for_predicate(rdf::TYPE)
            .map(|t| (t.subject.clone(), t.object.clone()))
            .collect();
        assert_eq!(types.len(), 2);
        assert_ne!(types[0].0, types[1].0);
        assert_eq!(types[0].1, Term::from(rdfa::UNRESOLVED_CURIE.into_owned()));
        assert!(matches!(types[0].0, NamedOrBlankNode::BlankNode(_)));
    }
}
