//! Extracts RDFa 1.1 statements from HTML documents and writes them as Turtle.
//!
//! ```no_run
//! let graph = rdfa2ttl::parse(
//!     r#"<p vocab="http://schema.org/" typeof="Person"><span property="name">Ada</span></p>"#,
//!     "http://example.org/",
//!     None,
//! )?;
//! print!("{}", rdfa2ttl::to_turtle(&graph));
//! # Ok::<(), rdfa2ttl::Error>(())
//! ```

use std::collections::HashSet;

use log::{debug, warn};
use oxiri::Iri;
use oxrdf::vocab::rdf;
use oxrdf::{NamedOrBlankNode, Term};
use scraper::{ElementRef, Html};

mod context;
mod extract;
mod graph;
mod prefixes;
mod processor;
mod resolve;
mod turtle;
mod vocab;

use extract::RdfaProcessor;
use graph::BlankNodes;
use vocab::rdfa;

pub use graph::{Graph, Triple};
pub use prefixes::{PrefixMap, initial_context_prefixes, initial_context_terms};
pub use turtle::{TurtleSerializer, to_turtle, to_turtle_with_prefixes};

#[derive(derive_more::Error, derive_more::Display, derive_more::From, Debug)]
pub enum Error {
    #[display("Invalid base IRI: `{iri}`")]
    #[from(skip)]
    InvalidBase {
        source: oxiri::IriParseError,
        iri: String,
    },

    #[display("The document has no root element")]
    #[from(skip)]
    MissingRoot,

    #[display("N-Triples syntax error: {_0}")]
    NTriples(oxttl::TurtleSyntaxError),
}

/// Both graphs produced by one extraction run.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub output: Graph,
    /// Warnings about the markup; never affects `output`.
    pub processor: Graph,
}

/// Extracts the RDFa statements of `document`.
///
/// `base` is the document's IRI; a `<base href>` in the document overrides
/// it. If `well_known_prefix` is given, [`Graph::to_ntriples`] writes blank
/// nodes as skolem IRIs under it.
pub fn extract(
    document: &Html,
    base: &str,
    well_known_prefix: Option<&str>,
) -> Result<Graph, Error> {
    extract_with_processor_graph(document, base, well_known_prefix).map(|e| e.output)
}

pub fn extract_with_processor_graph(
    document: &Html,
    base: &str,
    well_known_prefix: Option<&str>,
) -> Result<Extraction, Error> {
    let base = Iri::parse(base.to_string()).map_err(|source| Error::InvalidBase {
        source,
        iri: base.to_string(),
    })?;

    let root = document
        .tree
        .root()
        .children()
        .find_map(ElementRef::wrap)
        .ok_or(Error::MissingRoot)?;

    let processor = RdfaProcessor::new();
    processor.run(root, base);
    let (mut output, processor) = processor.finish();

    property_copying(&mut output);

    let well_known_prefix = well_known_prefix
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let valid = oxrdf::NamedNode::new(format!("{p}b1")).is_ok();
            if !valid {
                warn!("Ignoring well-known prefix <{p}>: it does not form IRIs");
            }
            valid
        })
        .map(str::to_string);

    Ok(Extraction {
        output: output.with_well_known_prefix(well_known_prefix),
        processor,
    })
}

/// Parses `html` as a full document and extracts its statements.
pub fn parse(html: &str, base: &str, well_known_prefix: Option<&str>) -> Result<Graph, Error> {
    let document = Html::parse_document(html);
    for err in &document.errors {
        debug!("HTML parse error: {err}");
    }

    extract(&document, base, well_known_prefix)
}

/// Extracts the statements of `html` as N-Triples.
pub fn html_to_rdfa(
    html: &str,
    base: &str,
    well_known_prefix: Option<&str>,
) -> Result<String, Error> {
    parse(html, base, well_known_prefix).map(|graph| graph.to_ntriples())
}

/// Rewrites N-Triples as Turtle. IRIs under `well_known_prefix` are turned
/// back into blank nodes so they can be nested.
pub fn rdfa_to_turtle(ntriples: &str, well_known_prefix: Option<&str>) -> Result<String, Error> {
    let well_known_prefix = well_known_prefix.map(str::trim).filter(|p| !p.is_empty());
    let blank_nodes = BlankNodes::default();

    let deskolemize = |iri: oxrdf::NamedNode| -> NamedOrBlankNode {
        match well_known_prefix.and_then(|prefix| iri.as_str().strip_prefix(prefix)) {
            Some(label) if !label.is_empty() => blank_nodes.labelled(label).into(),
            _ => iri.into(),
        }
    };

    let mut graph = Graph::new();
    for triple in oxttl::NTriplesParser::new().for_slice(ntriples.as_bytes()) {
        let triple = triple?;

        #[allow(unreachable_patterns)]
        let subject = match triple.subject {
            oxrdf::Subject::NamedNode(n) => deskolemize(n),
            oxrdf::Subject::BlankNode(b) => blank_nodes.labelled(b.as_str()).into(),
            _ => continue,
        };

        #[allow(unreachable_patterns)]
        let object: Term = match triple.object {
            Term::NamedNode(n) => deskolemize(n).into(),
            Term::BlankNode(b) => blank_nodes.labelled(b.as_str()).into(),
            Term::Literal(l) => l.into(),
            _ => continue,
        };

        graph.insert(Triple::new(subject, triple.predicate, object));
    }

    Ok(to_turtle_with_prefixes(
        &graph,
        &PrefixMap::initial_context(),
    ))
}

// [rdfa-core] 10.1 Property Copying
fn property_copying(graph: &mut Graph) {
    loop {
        let mut new_triples: Vec<Triple> = Vec::new();
        for copy_triple in graph.triples_for_predicate(rdfa::COPY) {
            let Some(pattern) = copied_pattern(graph, copy_triple) else {
                continue;
            };

            for triple in graph.triples_for_subject(&pattern) {
                let copied = Triple::new(
                    copy_triple.subject.clone(),
                    triple.predicate.clone(),
                    triple.object.clone(),
                );
                if !graph.contains(&copied) && !new_triples.contains(&copied) {
                    new_triples.push(copied);
                }
            }
        }

        if new_triples.is_empty() {
            break;
        }

        debug!("Copied {} triples from patterns", new_triples.len());
        graph.extend(new_triples);
    }

    let mut triples_to_remove = HashSet::new();
    for copy_triple in graph.triples_for_predicate(rdfa::COPY) {
        triples_to_remove.insert(copy_triple.clone());
        let Some(pattern) = copied_pattern(graph, copy_triple) else {
            continue;
        };

        triples_to_remove.insert(Triple::new(
            copy_triple.subject.clone(),
            rdf::TYPE,
            rdfa::PATTERN.into_owned(),
        ));

        for triple in graph.triples_for_subject(&pattern) {
            triples_to_remove.insert(triple.clone());
        }
    }

    graph.retain(|t| !triples_to_remove.contains(t));
}

/// The object of an `rdfa:copy` triple, if it is typed as an `rdfa:Pattern`.
fn copied_pattern(graph: &Graph, copy_triple: &Triple) -> Option<NamedOrBlankNode> {
    let pattern: NamedOrBlankNode = match &copy_triple.object {
        Term::NamedNode(n) => n.clone().into(),
        Term::BlankNode(b) => b.clone().into(),
        Term::Literal(_) => return None,
    };

    let typed = Triple::new(pattern.clone(), rdf::TYPE, rdfa::PATTERN.into_owned());
    graph.contains(&typed).then_some(pattern)
}

#[cfg(test)]
mod test {
    use oxrdf::{Literal, NamedNode};

    use super::*;

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(value)
    }

    #[test]
    fn patterns_are_copied_and_removed() {
        let s = iri("http://example.org/s");
        let pattern = iri("http://example.org/pattern");
        let name = iri("http://schema.org/name");

        let mut graph: Graph = [
            Triple::new(s.clone(), rdfa::COPY, pattern.clone()),
            Triple::new(pattern.clone(), rdf::TYPE, rdfa::PATTERN.into_owned()),
            Triple::new(pattern, name.clone(), Literal::new_simple_literal("Ada")),
        ]
        .into_iter()
        .collect();

        property_copying(&mut graph);

        assert_eq!(
            graph.iter().cloned().collect::<Vec<_>>(),
            vec![Triple::new(s, name, Literal::new_simple_literal("Ada"))]
        );
    }

    #[test]
    fn copies_of_things_that_are_not_patterns_are_dropped() {
        let s = iri("http://example.org/s");
        let other = iri("http://example.org/other");
        let name = iri("http://schema.org/name");

        let mut graph: Graph = [
            Triple::new(s.clone(), rdfa::COPY, other.clone()),
            Triple::new(other.clone(), name.clone(), Literal::new_simple_literal("x")),
        ]
        .into_iter()
        .collect();

        property_copying(&mut graph);

        assert_eq!(
            graph.iter().cloned().collect::<Vec<_>>(),
            vec![Triple::new(other, name, Literal::new_simple_literal("x"))]
        );
    }

    #[test]
    fn invalid_base_is_an_error() {
        let err = parse("<html></html>", "not an iri", None).unwrap_err();
        assert!(matches!(err, Error::InvalidBase { .. }));
    }

    #[test]
    fn blank_well_known_prefix_is_ignored() {
        let graph = parse(
            r#"<p typeof="http://schema.org/Thing"></p>"#,
            "http://example.org/",
            Some("  "),
        )
        .unwrap();
        assert_eq!(graph.well_known_prefix(), None);
    }

    #[test]
    fn well_known_prefix_must_form_iris() {
        let html = r#"<p typeof="http://schema.org/Thing"></p>"#;

        let graph = parse(html, "http://example.org/", Some("not an iri")).unwrap();
        assert_eq!(graph.well_known_prefix(), None);

        let ntriples = html_to_rdfa(html, "http://example.org/", Some("not an iri")).unwrap();
        assert!(ntriples.starts_with("_:"));
        assert!(rdfa_to_turtle(&ntriples, Some("not an iri")).is_ok());

        let graph = parse(html, "http://example.org/", Some("urn:genid:")).unwrap();
        assert_eq!(graph.well_known_prefix(), Some("urn:genid:"));
    }
}
