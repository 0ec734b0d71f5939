use itertools::Itertools;
use oxrdf::{NamedOrBlankNode, SubjectRef, TripleRef};
use rdfa2ttl::{Graph, Triple};

pub const BASE: &str = "http://example.org/";

fn from_oxrdf(triple: TripleRef<'_>) -> Triple {
    #[allow(unreachable_patterns)]
    let subject: NamedOrBlankNode = match triple.subject {
        SubjectRef::NamedNode(n) => n.into_owned().into(),
        SubjectRef::BlankNode(b) => b.into_owned().into(),
        _ => unreachable!("RDF-star triples are never produced"),
    };
    Triple::new(
        subject,
        triple.predicate.into_owned(),
        triple.object.into_owned(),
    )
}

/// Relabels blank nodes canonically and writes the graph as Turtle with its
/// triples sorted, so isomorphic graphs give identical text.
pub fn canonical_turtle(graph: &Graph) -> String {
    let graph = oxrdf::Graph::from(graph);

    // NB: we use rdf_canon here because the one provided by oxrdf hangs
    let idents = rdf_canon::issue_graph_with::<sha2::Sha256>(&graph, &Default::default()).unwrap();
    let graph = rdf_canon::relabel_graph(&graph, &idents).unwrap();

    let sorted: Graph = graph
        .iter()
        .sorted_by_cached_key(|t| {
            (
                t.subject.to_string(),
                if t.predicate.as_str() == "http://www.w3.org/1999/02/22-rdf-syntax-ns#type" {
                    // make "a" come first
                    None
                } else {
                    Some(t.predicate.to_string())
                },
                t.object.to_string(),
            )
        })
        .map(from_oxrdf)
        .collect();

    rdfa2ttl::to_turtle(&sorted)
}

pub fn parse_turtle(ttl: &str) -> Graph {
    let mut graph = oxrdf::Graph::new();
    for triple in oxttl::TurtleParser::new().with_base_iri(BASE).unwrap().for_slice(ttl.as_bytes()) {
        graph.insert(&triple.unwrap());
    }
    graph.iter().map(from_oxrdf).collect()
}

/// Checks that the statements of `html` are isomorphic to the Turtle `ttl`,
/// and that the Turtle written for them reads back as the same graph.
#[allow(unused)]
pub fn assert_graph(html: &str, ttl: &str) {
    let output = rdfa2ttl::parse(html, BASE, None).unwrap();

    pretty_assertions::assert_eq!(
        canonical_turtle(&output),
        canonical_turtle(&parse_turtle(ttl))
    );

    assert_reparses(&output);
}

#[allow(unused)]
pub fn assert_reparses(graph: &Graph) {
    let written = rdfa2ttl::to_turtle(graph);
    pretty_assertions::assert_eq!(
        canonical_turtle(graph),
        canonical_turtle(&parse_turtle(&written)),
        "written as:\n{written}"
    );
}
