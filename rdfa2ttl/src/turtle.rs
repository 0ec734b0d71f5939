//! Turtle output for [`Graph`]s.
//!
//! Subjects are written in the order they were first seen. Blank nodes that
//! are referenced exactly once are nested where they are referenced, as
//! `[ ... ]` or, for well-formed RDF collections, as `( ... )`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term};

use crate::graph::{Graph, Triple};
use crate::prefixes::PrefixMap;

/// Writes `graph` as Turtle, compacting IRIs with the prefixes the graph was
/// extracted with (or the RDFa initial context if it carries none).
pub fn to_turtle(graph: &Graph) -> String {
    let serializer = if graph.prefixes().is_empty() {
        TurtleSerializer::new()
    } else {
        TurtleSerializer::new().with_prefixes(graph.prefixes().clone())
    };
    serializer.serialize(graph)
}

/// Writes `graph` as Turtle, compacting IRIs with `prefixes` only.
pub fn to_turtle_with_prefixes(graph: &Graph, prefixes: &PrefixMap) -> String {
    TurtleSerializer::new()
        .with_prefixes(prefixes.clone())
        .serialize(graph)
}

#[derive(Clone, Debug)]
pub struct TurtleSerializer {
    prefixes: PrefixMap,
    indent: usize,
}

impl Default for TurtleSerializer {
    fn default() -> Self {
        Self {
            prefixes: PrefixMap::initial_context(),
            indent: 4,
        }
    }
}

impl TurtleSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefixes(mut self, prefixes: PrefixMap) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Spaces per nesting level.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn serialize(&self, graph: &Graph) -> String {
        Writer::new(self, graph).write()
    }
}

type Properties<'g> = IndexMap<&'g NamedNode, Vec<&'g Term>>;

struct Writer<'s, 'g> {
    prefixes: &'s PrefixMap,
    indent: usize,
    subjects: IndexMap<&'g NamedOrBlankNode, Properties<'g>>,
    /// How many (distinct) triples use a blank node as their object.
    references: HashMap<&'g BlankNode, usize>,
    /// The subject of the triple that refers to a blank node.
    referrers: HashMap<&'g BlankNode, &'g NamedOrBlankNode>,
    written: RefCell<HashSet<&'g BlankNode>>,
    used_prefixes: RefCell<BTreeSet<String>>,
}

impl<'s, 'g> Writer<'s, 'g> {
    fn new(serializer: &'s TurtleSerializer, graph: &'g Graph) -> Self {
        let mut seen: HashSet<&Triple> = HashSet::new();
        let mut subjects: IndexMap<&NamedOrBlankNode, Properties> = IndexMap::new();
        let mut references = HashMap::new();
        let mut referrers = HashMap::new();

        for triple in graph.iter().filter(|t| seen.insert(*t)) {
            subjects
                .entry(&triple.subject)
                .or_default()
                .entry(&triple.predicate)
                .or_default()
                .push(&triple.object);

            if let Term::BlankNode(object) = &triple.object {
                *references.entry(object).or_insert(0) += 1;
                referrers.insert(object, &triple.subject);
            }
        }

        // `a` always comes first
        for properties in subjects.values_mut() {
            if let Some(index) = properties
                .keys()
                .position(|p| p.as_str() == rdf::TYPE.as_str())
            {
                properties.move_index(index, 0);
            }
        }

        Self {
            prefixes: &serializer.prefixes,
            indent: serializer.indent,
            subjects,
            references,
            referrers,
            written: Default::default(),
            used_prefixes: Default::default(),
        }
    }

    fn write(&self) -> String {
        let mut blocks = Vec::new();

        for (&subject, properties) in &self.subjects {
            match subject {
                NamedOrBlankNode::NamedNode(iri) => {
                    let mut out = String::new();
                    self.write_iri(&mut out, iri.as_str());
                    blocks.push(self.block(out, properties));
                }
                NamedOrBlankNode::BlankNode(node) => match self.reference_count(node) {
                    0 => {
                        self.mark_written(node);
                        blocks.push(self.block("[]".to_string(), properties));
                    }
                    // nested where it is referenced
                    1 => {}
                    _ => {
                        self.mark_written(node);
                        blocks.push(self.block(format!("_:{}", node.as_str()), properties));
                    }
                },
            }
        }

        // Whatever is still unwritten hangs off a cycle of blank nodes that
        // are each referenced once; enter each such cycle through a label.
        for &subject in self.subjects.keys() {
            let NamedOrBlankNode::BlankNode(node) = subject else {
                continue;
            };
            if self.is_written(node) {
                continue;
            }

            let entry = self.cycle_entry(node);
            if let Some(properties) = self.properties_of(entry) {
                self.mark_written(entry);
                blocks.push(self.block(format!("_:{}", entry.as_str()), properties));
            }
        }

        let mut out = String::new();
        for prefix in self.used_prefixes.borrow().iter() {
            if let Some(namespace) = self.prefixes.get(prefix) {
                out.push_str("@prefix ");
                out.push_str(prefix);
                out.push_str(": ");
                write_iriref(&mut out, namespace);
                out.push_str(" .\n");
            }
        }

        if !out.is_empty() && !blocks.is_empty() {
            out.push('\n');
        }

        out.push_str(&blocks.join("\n"));
        out
    }

    fn block(&self, subject: String, properties: &Properties<'g>) -> String {
        let mut out = subject;
        out.push(' ');
        self.write_properties(&mut out, properties, 1);
        out.push_str(" .\n");
        out
    }

    fn write_properties(&self, out: &mut String, properties: &Properties<'g>, depth: usize) {
        for (i, (predicate, objects)) in properties.iter().enumerate() {
            if i > 0 {
                out.push_str(" ;\n");
                self.write_indent(out, depth);
            }

            if predicate.as_str() == rdf::TYPE.as_str() {
                out.push('a');
            } else {
                self.write_iri(out, predicate.as_str());
            }

            out.push(' ');
            for (j, &object) in objects.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                self.write_object(out, object, depth);
            }
        }
    }

    fn write_object(&self, out: &mut String, object: &'g Term, depth: usize) {
        match object {
            Term::NamedNode(iri) if iri.as_str() == rdf::NIL.as_str() => out.push_str("()"),
            Term::NamedNode(iri) => self.write_iri(out, iri.as_str()),
            Term::BlankNode(node) => self.write_blank_object(out, node, depth),
            Term::Literal(literal) => self.write_literal(out, literal),
        }
    }

    fn write_blank_object(&self, out: &mut String, node: &'g BlankNode, depth: usize) {
        if self.reference_count(node) != 1 || self.is_written(node) {
            out.push_str("_:");
            out.push_str(node.as_str());
            return;
        }

        if let Some((nodes, items)) = self.collection(node) {
            self.written.borrow_mut().extend(nodes);
            out.push('(');
            for item in items {
                out.push(' ');
                self.write_object(out, item, depth);
            }
            out.push_str(" )");
            return;
        }

        self.mark_written(node);
        let Some(properties) = self.properties_of(node) else {
            out.push_str("[]");
            return;
        };

        out.push_str("[\n");
        self.write_indent(out, depth + 1);
        self.write_properties(out, properties, depth + 1);
        out.push('\n');
        self.write_indent(out, depth);
        out.push(']');
    }

    /// The nodes and items of the collection starting at `head`, if it is one
    /// that can be written with `( ... )`.
    fn collection(&self, head: &'g BlankNode) -> Option<(Vec<&'g BlankNode>, Vec<&'g Term>)> {
        let mut nodes = Vec::new();
        let mut items = Vec::new();
        let mut node = head;

        loop {
            if nodes.contains(&node) || self.reference_count(node) != 1 || self.is_written(node) {
                return None;
            }

            let properties = self.properties_of(node)?;
            if properties.len() != 2 {
                return None;
            }

            let &[first] = single(properties, rdf::FIRST.as_str())? else {
                return None;
            };
            let &[rest] = single(properties, rdf::REST.as_str())? else {
                return None;
            };
            nodes.push(node);
            items.push(first);

            match rest {
                Term::NamedNode(iri) if iri.as_str() == rdf::NIL.as_str() => {
                    return Some((nodes, items));
                }
                Term::BlankNode(next) => node = next,
                _ => return None,
            }
        }
    }

    /// Walks up through blank nodes that are referenced once and not yet
    /// written, stopping when it comes back around or can go no further.
    fn cycle_entry(&self, node: &'g BlankNode) -> &'g BlankNode {
        let mut seen = HashSet::new();
        let mut current = node;
        while seen.insert(current) {
            match self.referrers.get(current).copied() {
                Some(NamedOrBlankNode::BlankNode(parent))
                    if self.reference_count(parent) == 1 && !self.is_written(parent) =>
                {
                    current = parent
                }
                _ => break,
            }
        }
        current
    }

    fn properties_of(&self, node: &BlankNode) -> Option<&Properties<'g>> {
        self.subjects.get(&NamedOrBlankNode::from(node.clone()))
    }

    fn reference_count(&self, node: &BlankNode) -> usize {
        self.references.get(node).copied().unwrap_or(0)
    }

    fn is_written(&self, node: &BlankNode) -> bool {
        self.written.borrow().contains(node)
    }

    fn mark_written(&self, node: &'g BlankNode) {
        self.written.borrow_mut().insert(node);
    }

    fn write_indent(&self, out: &mut String, depth: usize) {
        out.push_str(&" ".repeat(self.indent * depth));
    }

    fn write_iri(&self, out: &mut String, iri: &str) {
        match self.prefixes.compact(iri) {
            Some((prefix, local)) => {
                self.used_prefixes.borrow_mut().insert(prefix.to_string());
                out.push_str(prefix);
                out.push(':');
                out.push_str(local);
            }
            None => write_iriref(out, iri),
        }
    }

    fn write_literal(&self, out: &mut String, literal: &Literal) {
        out.push('"');
        write_escaped(out, literal.value());
        out.push('"');

        if let Some(language) = literal.language() {
            out.push('@');
            out.push_str(language);
        } else if literal.datatype() != xsd::STRING {
            out.push_str("^^");
            self.write_iri(out, literal.datatype().as_str());
        }
    }
}

/// The objects of `predicate`, if it is the only value of the property.
fn single<'p, 'g>(properties: &'p Properties<'g>, predicate: &str) -> Option<&'p [&'g Term]> {
    properties
        .iter()
        .find(|(p, _)| p.as_str() == predicate)
        .map(|(_, objects)| objects.as_slice())
}

// IRIREF ::= '<' ([^#x00-#x20<>"{}|^`\] | UCHAR)* '>'
fn write_iriref(out: &mut String, iri: &str) {
    out.push('<');
    for c in iri.chars() {
        match c {
            '\u{00}'..='\u{20}' | '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('>');
}

fn write_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(value)
    }

    #[test]
    fn escapes_literals() {
        let mut out = String::new();
        write_escaped(&mut out, "say \"hi\"\\\n\tthen\u{7}\u{c}");
        assert_eq!(out, r#"say \"hi\"\\\n\tthen\u0007\f"#);
    }

    #[test]
    fn escapes_iris() {
        let mut out = String::new();
        write_iriref(&mut out, "http://example.org/a b{c}");
        assert_eq!(out, r"<http://example.org/a\u0020b\u007Bc\u007D>");
    }

    #[test]
    fn writes_literal_suffixes() {
        let s = iri("http://example.org/s");
        let p = iri("http://example.org/p");
        let graph: Graph = [
            Triple::new(s.clone(), p.clone(), Literal::new_simple_literal("plain")),
            Triple::new(
                s.clone(),
                p.clone(),
                Literal::new_language_tagged_literal_unchecked("hallo", "de"),
            ),
            Triple::new(s, p, Literal::new_typed_literal("1", xsd::INTEGER)),
        ]
        .into_iter()
        .collect();

        let prefixes: PrefixMap = [("ex", "http://example.org/")].into_iter().collect();
        assert_eq!(
            to_turtle_with_prefixes(&graph, &prefixes),
            "@prefix ex: <http://example.org/> .\n\
             \n\
             ex:s ex:p \"plain\", \"hallo\"@de, \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n"
        );
    }

    #[test]
    fn empty_graph_is_empty_text() {
        assert_eq!(to_turtle(&Graph::new()), "");
    }

    #[test]
    fn cycles_fall_back_to_labels() {
        let a = BlankNode::new_unchecked("a");
        let b = BlankNode::new_unchecked("b");
        let p = iri("http://example.org/p");
        let graph: Graph = [
            Triple::new(a.clone(), p.clone(), b.clone()),
            Triple::new(b, p, a),
        ]
        .into_iter()
        .collect();

        let prefixes: PrefixMap = [("ex", "http://example.org/")].into_iter().collect();
        assert_eq!(
            to_turtle_with_prefixes(&graph, &prefixes),
            "@prefix ex: <http://example.org/> .\n\
             \n\
             _:a ex:p [\n        ex:p _:a\n    ] .\n"
        );
    }

    #[test]
    fn indentation_is_configurable() {
        let s = iri("http://example.org/s");
        let graph: Graph = [
            Triple::new(s.clone(), iri("http://example.org/p"), iri("http://example.org/o")),
            Triple::new(s, iri("http://example.org/q"), iri("http://example.org/o")),
        ]
        .into_iter()
        .collect();

        let prefixes: PrefixMap = [("ex", "http://example.org/")].into_iter().collect();
        assert_eq!(
            TurtleSerializer::new()
                .with_prefixes(prefixes)
                .with_indent(2)
                .serialize(&graph),
            "@prefix ex: <http://example.org/> .\n\nex:s ex:p ex:o ;\n  ex:q ex:o .\n"
        );
    }
}
