//! The RDFa processing sequence ([rdfa-core] 7.5) over an HTML element tree,
//! with the HTML+RDFa extensions.

use std::borrow::Cow;
use std::cell::RefCell;
use std::ops::Not;
use std::rc::Rc;
use std::str::FromStr;

use curie::Curie;
use icu::locale::LanguageIdentifier;
use itertools::Itertools;
use log::{debug, log_enabled, trace};
use oxiri::Iri;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, Term};
use scraper::ElementRef;
use scraper::node::Element;
use vec1::{Size0Error, Vec1};

use crate::context::{EvaluationContext, IncompleteTriple, SharedListMapping};
use crate::graph::{BlankNodes, Graph, Triple};
use crate::prefixes::PrefixMap;
use crate::processor::{PGType, ProcessorGraph};
use crate::resolve::{Attr, LocalScope, Relation};
use crate::vocab::{self, rdfa, xhv};

pub(crate) trait HostLanguage {
    fn default_language(&self) -> Option<LanguageIdentifier>;
    fn default_vocabulary(&self) -> Option<NamedNode>;
}

pub(crate) struct HtmlHost;

// [html-rdfa] 3.1
impl HostLanguage for HtmlHost {
    fn default_vocabulary(&self) -> Option<NamedNode> {
        None
    }

    fn default_language(&self) -> Option<LanguageIdentifier> {
        None
    }
}

pub(crate) struct RdfaProcessor {
    output: RefCell<Graph>,
    processor: ProcessorGraph,
    blank_nodes: BlankNodes,
    /// Every prefix declared anywhere in the document, on top of the initial
    /// context, for compacting IRIs in Turtle output.
    prefixes: RefCell<PrefixMap>,
}

impl RdfaProcessor {
    pub(crate) fn new() -> Self {
        Self {
            output: Default::default(),
            processor: Default::default(),
            blank_nodes: Default::default(),
            prefixes: RefCell::new(PrefixMap::initial_context()),
        }
    }

    /// Returns the output graph (carrying the accumulated prefixes) and the
    /// processor graph.
    pub(crate) fn finish(self) -> (Graph, Graph) {
        let output = self
            .output
            .into_inner()
            .with_prefixes(self.prefixes.into_inner());
        (output, self.processor.into_graph())
    }

    pub(crate) fn run(&self, root: ElementRef<'_>, base: Iri<String>) {
        enum S<'a> {
            Child(ElementRef<'a>, Rc<EvaluationContext>, bool),
            OutputLists(Rc<NamedOrBlankNode>, SharedListMapping),
        }

        let host = HtmlHost;
        let base = self.document_base(root, base);
        let eval_context =
            EvaluationContext::new(base, host.default_language(), host.default_vocabulary());

        let mut stack = vec![S::Child(root, Rc::new(eval_context), true)];

        while let Some(stack_item) = stack.pop() {
            match stack_item {
                S::Child(element, base_ctx, is_root_element) => {
                    let new_ctx = self.process_element(&base_ctx, element, is_root_element, &host);

                    // 14.
                    // “For each IRI in the local list mapping, if the equivalent list does not
                    //  exist in the evaluation context, indicating that the list was originally
                    //  instantiated on the current element, use the list as follows:
                    //
                    // A mapping is only replaced when the element has a new subject, so the
                    // lists are ours exactly when the mapping is not the one we were given.
                    // They are written out once the whole subtree has contributed to them.
                    if !Rc::ptr_eq(&new_ctx.list_mapping, &base_ctx.list_mapping) {
                        stack.push(S::OutputLists(
                            new_ctx.parent_subject.clone(),
                            new_ctx.list_mapping.clone(),
                        ));
                    }

                    let new_ctx = Rc::new(new_ctx);
                    for child in element.children().rev().filter_map(ElementRef::wrap) {
                        stack.push(S::Child(child, new_ctx.clone(), false));
                    }
                }
                S::OutputLists(subject, list_mapping) => {
                    for (predicate, list) in list_mapping.borrow().lists() {
                        self.emit_list(&subject, predicate, &list.borrow());
                    }
                }
            }
        }
    }

    /// The base to use for the document: `html>head>base[href]`, resolved
    /// against the caller's base, if present.
    fn document_base(&self, root: ElementRef<'_>, base: Iri<String>) -> Iri<String> {
        fn child<'a>(parent: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
            parent
                .children()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == name)
        }

        let Some(base_href) = child(root, "head")
            .and_then(|head| child(head, "base"))
            .and_then(|base_el| base_el.value().attr("href"))
        else {
            return base;
        };

        match base.resolve(base_href) {
            Ok(resolved) => {
                trace!("<base> found: {resolved}");
                resolved
            }
            Err(err) => {
                self.processor.emit(
                    PGType::DocumentError,
                    &format!("Invalid <base href=\"{base_href}\"> ({err}), keeping <{base}>"),
                );
                base
            }
        }
    }

    fn emit(&self, triple: Triple) {
        trace!("- Emitting output triple: {triple}");
        self.output.borrow_mut().insert(triple);
    }

    // “If there are zero items in the list associated with the IRI, generate the following triple:
    //    subject = current subject, predicate = full IRI of the local list mapping associated with this list,
    //    object = http://www.w3.org/1999/02/22-rdf-syntax-ns#nil
    //  Otherwise, a list of bnodes is created, one per item, linked by rdf:rest.
    fn emit_list(&self, subject: &NamedOrBlankNode, predicate: &NamedNode, items: &[Term]) {
        debug!("closing list ({predicate}) of {subject} with {} item(s)", items.len());

        let nodes: Vec<BlankNode> = items.iter().map(|_| self.blank_nodes.fresh()).collect();
        for (i, (node, item)) in nodes.iter().zip(items).enumerate() {
            self.emit(Triple::new(node.clone(), rdf::FIRST, item.clone()));
            let rest: Term = match nodes.get(i + 1) {
                Some(next) => next.clone().into(),
                None => rdf::NIL.into_owned().into(),
            };
            self.emit(Triple::new(node.clone(), rdf::REST, rest));
        }

        let head: Term = match nodes.first() {
            Some(head) => head.clone().into(),
            None => rdf::NIL.into_owned().into(),
        };
        self.emit(Triple::new(subject.clone(), predicate.clone(), head));
    }

    /// Collects `@prefix` and `xmlns:*` declarations, `xmlns:` first so that
    /// `@prefix` wins when both name the same prefix.
    fn prefix_declarations<'e>(&self, el: &'e Element) -> Vec<(String, &'e str)> {
        let mut declarations = Vec::new();

        for (name, value) in el.attrs.iter() {
            let prefix = if name.prefix.as_deref() == Some("xmlns") {
                Some(&*name.local)
            } else {
                name.local.strip_prefix("xmlns:")
            };

            if let Some(prefix) = prefix {
                declarations.push((prefix.to_ascii_lowercase(), &**value));
            }
        }

        if let Some(value) = el.attr("prefix") {
            let mut tokens = value.split_ascii_whitespace();
            while let Some(token) = tokens.next() {
                let Some(prefix) = token.strip_suffix(':') else {
                    self.processor.emit(
                        PGType::Warning,
                        &format!("@prefix syntax error: expected 'prefix:' but found '{token}'"),
                    );
                    continue;
                };

                let Some(iri) = tokens.next() else {
                    self.processor.emit(
                        PGType::Warning,
                        &format!("@prefix syntax error: no IRI for '{token}'"),
                    );
                    break;
                };

                declarations.push((prefix.to_ascii_lowercase(), iri));
            }
        }

        declarations
    }

    fn process_element(
        &self,
        eval_context: &EvaluationContext,
        element: ElementRef<'_>,
        is_root_element: bool,
        host: &impl HostLanguage,
    ) -> EvaluationContext {
        let el = element.value();

        if log_enabled!(log::Level::Trace) {
            let mut ancestor_stack: Vec<&str> = element
                .ancestors()
                .filter_map(|x| x.value().as_element().map(|x| x.name()))
                .collect();
            ancestor_stack.reverse();
            let attrs = el.attrs().map(|(n, v)| format!("@{n}='{v}'")).join(" ");
            trace!(
                "{}{}{} {attrs}",
                ancestor_stack.join(">"),
                ancestor_stack
                    .is_empty()
                    .not()
                    .then_some(">")
                    .unwrap_or_default(),
                el.name()
            );
        }

        // 1.
        let mut local = LocalScope::new(eval_context, &self.processor, &self.blank_nodes);

        // [rdfa-core] 7.5: 2.
        if let Some(vocab) = el.attr("vocab") {
            if vocab.is_empty() {
                trace!("- @vocab is empty, resetting default vocabulary");
                local.default_vocab = host.default_vocabulary();
            } else {
                match local.resolve_relative_iri(vocab) {
                    Ok(vocab) => {
                        trace!("- default vocabulary is now: {vocab}");
                        self.emit(Triple::new(
                            local.empty_curie().into_owned(),
                            rdfa::USES_VOCABULARY,
                            vocab.clone(),
                        ));
                        local.default_vocab = Some(vocab);
                    }
                    Err(err) => local.warn(
                        PGType::Warning,
                        &format!("Invalid @vocab IRI: <{vocab}> ({err})"),
                    ),
                }
            }
        }

        // 3.
        let declarations = self.prefix_declarations(el);
        if !declarations.is_empty() {
            let mut mappings = Rc::unwrap_or_clone(local.iri_mappings);
            // note that we do not ever set_default,
            // this would define a "no prefix" mapping
            // which is MUST NOT in RDFa
            for (prefix, iri) in declarations {
                if prefix == "_" {
                    self.processor.emit(PGType::Warning, "Invalid prefix: the prefix '_' is reserved.");
                    continue;
                }

                if rxml_validation::validate_ncname(&prefix).is_err() {
                    self.processor.emit(
                        PGType::Warning,
                        &format!("Invalid prefix: '{prefix}' is not an NCName."),
                    );
                    continue;
                }

                if let Ok(existing) = mappings.expand_curie(&Curie::new(Some(prefix.as_str()), "")) {
                    if existing != iri {
                        self.processor.emit(
                            PGType::PrefixRedefinition,
                            &format!("Prefix '{prefix}' redefined from <{existing}> to <{iri}>"),
                        );
                    }
                }

                match mappings.add_prefix(&prefix, iri) {
                    Ok(()) => {
                        debug!("- prefix {prefix}: is now <{iri}>");
                        if NamedNode::new(iri).is_ok() {
                            self.prefixes.borrow_mut().insert(prefix, iri);
                        }
                    }
                    Err(_) => self.processor.emit(
                        PGType::Warning,
                        &format!("Invalid prefix: '{prefix}' cannot be declared."),
                    ),
                }
            }

            local.iri_mappings = Rc::new(mappings);
        }

        if let Some(lang) = el.attr("xml:lang").or(el.attr("lang")) {
            if lang.is_empty() {
                local.current_language = None;
            } else {
                match LanguageIdentifier::from_str(lang) {
                    Ok(lang) => {
                        trace!("- current language is now: {lang}");
                        local.current_language = Some(Rc::new(lang));
                    }
                    Err(e) => {
                        local.warn(
                            PGType::Warning,
                            &format!("Invalid language identifier ({lang}): {e}"),
                        );
                    }
                }
            }
        }

        let property: Attr<Vec1<NamedNode>> = attr_many(el, "property", |v| {
            local.predicates("property", local.many_term_or_curie_or_absiri(v))
        });

        let inlist = el.attr("inlist").is_some();
        let rel_dir = if inlist {
            Relation::List
        } else {
            Relation::Forward
        };
        let rev_dir = Relation::Reverse;

        let rel: Option<Vec<Relation>>;
        let rev: Option<Vec<Relation>>;
        if property.is_present() {
            // [html-rdfa] extension #7
            rel = attr_many(el, "rel", |v| {
                local.predicates("rel", local.many_curie_or_absiri(v))
            })
            .into_value()
            .map(|v| v.into_iter().map(rel_dir).collect());
            rev = attr_many(el, "rev", |v| {
                local.predicates("rev", local.many_curie_or_absiri(v))
            })
            .into_value()
            .map(|v| v.into_iter().map(rev_dir).collect());
        } else {
            rel = match attr_many(el, "rel", |v| {
                local.predicates("rel", local.many_term_or_curie_or_absiri(v))
            }) {
                Attr::Missing => None,
                Attr::Empty => Some(Vec::new()),
                Attr::Value(v) => Some(v.into_iter().map(rel_dir).collect()),
            };
            rev = match attr_many(el, "rev", |v| {
                local.predicates("rev", local.many_term_or_curie_or_absiri(v))
            }) {
                Attr::Missing => None,
                Attr::Empty => Some(Vec::new()),
                Attr::Value(v) => Some(v.into_iter().map(rev_dir).collect()),
            };
        }

        let relations = match (rel, rev) {
            (None, None) => None,
            (Some(rel), None) => Some(rel),
            (None, Some(rev)) => Some(rev),
            (Some(mut rel), Some(rev)) => {
                rel.extend(rev);
                Some(rel)
            }
        };

        // [role-attribute]
        if let Some(role) = el.attr("role") {
            self.process_role(&local, el, role);
        }

        let content = el.attr("content");

        let type_of: Attr<Vec1<NamedOrBlankNode>> =
            attr_many(el, "typeof", |v| local.many_term_or_curie_or_absiri(v));

        let about: Attr<Rc<NamedOrBlankNode>> =
            attr1(el, "about", |v| local.safecurie_or_curie_or_iri(v)).map(Rc::new);
        let resource: Attr<Rc<NamedOrBlankNode>> =
            attr1(el, "resource", |v| local.safecurie_or_curie_or_iri(v)).map(Rc::new);

        let href: Attr<NamedNode> = attr1(el, "href", |v| local.attribute_iri(v));
        let src: Attr<NamedNode> = attr1(el, "src", |v| local.attribute_iri(v));

        let datatype: Attr<NamedNode> = attr1(el, "datatype", |v| {
            local
                .term_or_curie_or_absiri(v)
                .and_then(|dt| local.to_predicate("datatype", dt))
        });

        // read from the "resource attributes"
        let resource_present = resource.is_present() || href.is_present() || src.is_present();
        let resource_value: Option<Rc<NamedOrBlankNode>> = resource
            .value()
            .cloned()
            .or_else(|| Some(Rc::new(href.into_value()?.into())))
            .or_else(|| Some(Rc::new(src.into_value()?.into())));

        // 5.
        if relations.is_none() {
            // 5.1
            if property.is_present() && content.is_none() && !datatype.is_present() {
                if let Some(about) = about.value() {
                    trace!("- Using @about as new subject");
                    local.new_subject = Some(about.clone());
                } else if is_root_element {
                    trace!("- Using empty @about as new subject");
                    local.new_subject = Some(Rc::new(local.empty_curie().into_owned().into()));
                } else if let Some(parent_object) = &eval_context.parent_object {
                    trace!("- Using parent object as new subject: {parent_object}");
                    local.new_subject = Some(parent_object.clone());
                }

                if type_of.is_present() {
                    if let Some(about) = about.value() {
                        trace!("- Using @about as typed resource");
                        local.typed_resource = Some(about.clone());
                    } else if is_root_element {
                        local.typed_resource =
                            Some(Rc::new(local.empty_curie().into_owned().into()));
                    }
                    // “otherwise,
                    else {
                        // “by using the resource from @resource, if present,
                        //  otherwise, by using the IRI from @href, if present,
                        //  otherwise, by using the IRI from @src, if present,
                        //  otherwise, the value of typed resource is set to a newly created bnode.
                        let typed_resource = match &resource_value {
                            Some(resource) => resource.clone(),
                            None => {
                                trace!("- Using new blank node as typed resource");
                                local.fresh_blank_node()
                            }
                        };

                        local.typed_resource = Some(typed_resource.clone());

                        local.current_object_resource = Some(typed_resource);
                    }
                }
            }
            // 5.2: “otherwise:
            else {
                if about.is_present() || resource_present {
                    if let Some(about) = about.value() {
                        trace!("- Using @about as new subject");
                        local.new_subject = Some(about.clone())
                    } else if let Some(resource) = &resource_value {
                        trace!("- Using @resource/@href/@src as new subject");
                        local.new_subject = Some(resource.clone());
                    }
                }

                // [html-rdfa] extension #8
                // > if no IRI is provided by a resource attribute, then first check to see
                // > if the element is the head or body element. If it is, then set new subject
                // > to parent object.
                if local.new_subject.is_none() && matches!(el.name(), "head" | "body") {
                    trace!(
                        "- [head/body] using parent object as new subject: {:?}",
                        eval_context.parent_object
                    );
                    local.new_subject = eval_context.parent_object.clone();
                }

                if local.new_subject.is_none() {
                    if is_root_element {
                        local.new_subject =
                            Some(Rc::new(local.empty_curie().into_owned().into()));
                        trace!("- Using empty CURIE as new subject (root element)");
                    } else if type_of.is_present() {
                        local.new_subject = Some(local.fresh_blank_node());
                        trace!(
                            "- Using blank node as new subject (@typeof present): {:?}",
                            local.new_subject
                        );
                    } else if let Some(parent_object) = &eval_context.parent_object {
                        local.new_subject = Some(parent_object.clone());
                        trace!("- Using parent object as new subject: {parent_object}");

                        if !property.is_present() {
                            trace!("- Skip element set to 'true' (no @property).");
                            local.skip_element = true;
                        }
                    }
                }

                if type_of.is_present() {
                    local.typed_resource = local.new_subject.clone();
                }
            }
        }
        // 6.
        else {
            if let Some(about) = about.value() {
                trace!("- Using @about as new subject: {about}");
                local.new_subject = Some(about.clone());

                if type_of.is_present() {
                    local.typed_resource = local.new_subject.clone();
                }
            }

            if local.new_subject.is_none() {
                if is_root_element {
                    local.new_subject = Some(Rc::new(local.empty_curie().into_owned().into()));
                    trace!("- Using empty CURIE as new subject (root element)");
                } else {
                    // “otherwise, if parent object is present, new subject is set to that.
                    local.new_subject = eval_context.parent_object.clone();
                    trace!(
                        "- Using parent object as new subject: {:?}",
                        local.new_subject
                    );
                }
            }

            if let Some(resource) = &resource_value {
                // “by using the resource from @resource, if present,
                //  otherwise, by using the IRI from @href, if present,
                //  otherwise, by using the IRI from @src, if present;
                local.current_object_resource = Some(resource.clone());
                trace!("- Using @resource/@href/@src as current object resource: {resource}");
            } else if type_of.is_present() && !about.is_present() {
                local.current_object_resource = Some(local.fresh_blank_node());
                trace!(
                    "- Using blank node as current object resource (@typeof present): {:?}",
                    local.current_object_resource
                );
            }

            if type_of.is_present() && !about.is_present() {
                local.typed_resource = local.current_object_resource.clone();
            }
        }

        // 7.
        if let (Some(typed_resource), Some(type_of)) = (local.typed_resource.as_deref(), type_of.value())
        {
            for type_iri in type_of {
                self.emit(Triple::new(
                    typed_resource.clone(),
                    rdf::TYPE,
                    type_iri.clone(),
                ));
            }
        }

        // 8.
        if local.new_subject.is_some() && local.new_subject != eval_context.parent_object {
            trace!("- Setting new list mapping");
            local.list_mapping = Default::default();
        }

        // 9.
        if let Some(current_object_resource) = local.current_object_resource.as_deref() {
            if let Some(relations) = &relations {
                let term: Term = current_object_resource.clone().into();
                for relation in relations {
                    match relation {
                        Relation::List(predicate) => {
                            local
                                .list_mapping
                                .borrow_mut()
                                .insert_value(predicate, term.clone());
                        }
                        Relation::Forward(predicate) => {
                            if let Some(new_subject) = local.new_subject.as_deref() {
                                self.emit(Triple::new(
                                    new_subject.clone(),
                                    predicate.clone(),
                                    term.clone(),
                                ));
                            }
                        }
                        Relation::Reverse(predicate) => {
                            if let Some(new_subject) = local.new_subject.as_deref() {
                                self.emit(Triple::new(
                                    current_object_resource.clone(),
                                    predicate.clone(),
                                    new_subject.clone(),
                                ));
                            }
                        }
                    }
                }
            }
        }
        // [rdfa-core] 7.5: 10.
        else if let Some(relations) = &relations {
            trace!("- current object resource is null, storing incomplete triples");
            local.current_object_resource = Some(local.fresh_blank_node());
            for relation in relations {
                let incomplete = match relation {
                    Relation::List(p) => {
                        IncompleteTriple::List(local.list_mapping.borrow_mut().ensure_list(p))
                    }
                    Relation::Forward(p) => IncompleteTriple::Forward(p.clone()),
                    Relation::Reverse(p) => IncompleteTriple::Reverse(p.clone()),
                };
                local.incomplete_triples.push(incomplete);
            }

            trace!("- incomplete triples: {:?}", local.incomplete_triples);
        }

        // 11.
        if let Some(properties) = property.into_value() {
            let lang = local
                .current_language
                .as_ref()
                .map(|l| l.to_string().to_ascii_lowercase());
            let lang = lang.as_deref();

            let mut otherwise_datatype: Option<NamedNodeRef<'static>> = None;
            let content_val: Cow<str> = if let Some(content) = content {
                content.into()
            } else {
                // [html-rdfa] extension #9 & #10
                let value = el.attr("datetime").map(Cow::Borrowed).or_else(|| {
                    (el.name() == "time").then(|| Cow::Owned(element.text().join("")))
                });

                if let Some(dt) = value {
                    otherwise_datatype = datetime_datatype(&dt);
                    dt
                } else {
                    Cow::Owned(element.text().join(""))
                }
            };

            let current_property_value: Term = match &datatype {
                Attr::Empty => {
                    trace!("- Empty datatype, using plain literal");
                    plain_literal(&content_val, lang).into()
                }
                // “otherwise, as an XML literal if @datatype is present and is set to XMLLiteral
                //  The value of the XML literal is a string created by serializing to text,
                //  all nodes that are descendants of the current element
                Attr::Value(datatype)
                    if datatype.as_ref() == rdf::XML_LITERAL
                        || datatype.as_ref() == vocab::rdf::HTML =>
                {
                    Literal::new_typed_literal(element.inner_html(), datatype.clone()).into()
                }
                // “as a typed literal if @datatype is present, does not have an empty value
                Attr::Value(datatype) => {
                    Literal::new_typed_literal(&*content_val, datatype.clone()).into()
                }
                Attr::Missing => {
                    if let Some(otherwise_datatype) = otherwise_datatype {
                        // [html-rdfa] extension #9
                        // “if the value of @datetime lexically matches a valid xsd:date, xsd:time,
                        //  xsd:dateTime, xsd:duration, xsd:gYear, or xsd:gYearMonth a typed literal
                        //  must be generated, with its datatype set to the matching xsd datatype.
                        Literal::new_typed_literal(&*content_val, otherwise_datatype).into()
                    } else if let Some(content) = content {
                        plain_literal(content, lang).into()
                    } else if let Some(resource) =
                        resource_value.as_deref().filter(|_| relations.is_none())
                    {
                        resource.clone().into()
                    }
                    // the typed resource, for @typeof without @about
                    else if let Some(typed_resource) =
                        local.typed_resource.as_deref().filter(|_| {
                            relations.is_none() && type_of.is_present() && !about.is_present()
                        })
                    {
                        typed_resource.clone().into()
                    }
                    // otherwise as a plain literal.
                    else {
                        plain_literal(&content_val, lang).into()
                    }
                }
            };

            if inlist {
                let mut list_mapping = local.list_mapping.borrow_mut();
                for property in &properties {
                    list_mapping.insert_value(property, current_property_value.clone());
                }
            } else if let Some(new_subject) = local.new_subject.as_deref() {
                for property in properties {
                    self.emit(Triple::new(
                        new_subject.clone(),
                        property,
                        current_property_value.clone(),
                    ));
                }
            }
        }

        // 12.
        if let Some(new_subject) = local.new_subject.as_deref().filter(|_| !local.skip_element) {
            for incomplete in &eval_context.incomplete_triples {
                match incomplete {
                    IncompleteTriple::List(list) => {
                        list.borrow_mut().push(new_subject.clone().into())
                    }
                    IncompleteTriple::Forward(predicate) => self.emit(Triple::new(
                        eval_context.parent_subject.as_ref().clone(),
                        predicate.clone(),
                        new_subject.clone(),
                    )),
                    IncompleteTriple::Reverse(predicate) => self.emit(Triple::new(
                        new_subject.clone(),
                        predicate.clone(),
                        eval_context.parent_subject.as_ref().clone(),
                    )),
                }
            }
        }

        // 13.
        if local.skip_element {
            EvaluationContext {
                language: local.current_language,
                iri_mappings: local.iri_mappings,
                // ERRATA: this also needs to be copied
                default_vocab: local.default_vocab,
                ..eval_context.clone()
            }
        } else {
            EvaluationContext {
                base: eval_context.base.clone(),
                parent_subject: local
                    .new_subject
                    .clone()
                    .unwrap_or_else(|| eval_context.parent_subject.clone()),
                parent_object: Some(
                    local
                        .current_object_resource
                        .or(local.new_subject)
                        .unwrap_or_else(|| eval_context.parent_subject.clone()),
                ),
                iri_mappings: local.iri_mappings,
                incomplete_triples: local.incomplete_triples,
                list_mapping: local.list_mapping,
                language: local.current_language,
                default_vocab: local.default_vocab,
                // ERRATA: undocumented, but assumed
                term_mappings: local.term_mappings,
            }
        }
    }

    // [role-attribute]
    fn process_role(&self, local: &LocalScope<'_>, el: &Element, role: &str) {
        let role_subject: NamedOrBlankNode = match el.attr("id") {
            Some(id) => match NamedNode::new(format!("{}#{id}", local.empty_curie().as_str())) {
                Ok(subject) => subject.into(),
                Err(err) => {
                    local.warn(PGType::Warning, &format!("Invalid @id for @role: {id} ({err})"));
                    return;
                }
            },
            None => self.blank_nodes.fresh().into(),
        };

        // > An RDFa Processor MUST behave as if there is an in-scope vocabulary
        // > of http://www.w3.org/1999/xhtml/vocab# for the value(s) of the @role attribute.
        let role_local = local.with_vocabulary(NamedNode::new_unchecked(xhv::VOCAB));

        for role in role_local.many_term_or_curie_or_absiri(role) {
            self.emit(Triple::new(role_subject.clone(), xhv::ROLE, role));
        }
    }
}

fn attr1<T>(el: &Element, name: &str, proj: impl FnOnce(&str) -> Option<T>) -> Attr<T> {
    match el.attr(name) {
        None => Attr::Missing,
        Some(v) => match proj(v) {
            None => Attr::Empty,
            Some(v) => Attr::Value(v),
        },
    }
}

fn attr_many<T>(el: &Element, name: &str, proj: impl FnOnce(&str) -> Vec<T>) -> Attr<Vec1<T>> {
    match el.attr(name) {
        None => Attr::Missing,
        Some(v) => match Vec1::try_from_vec(proj(v)) {
            Err(Size0Error) => Attr::Empty,
            Ok(v) => Attr::Value(v),
        },
    }
}

fn plain_literal(value: &str, lang: Option<&str>) -> Literal {
    match lang {
        Some(lang) => Literal::new_language_tagged_literal_unchecked(value, lang),
        None => Literal::new_simple_literal(value),
    }
}

/// The xsd datatype a `@datetime` value lexically matches, if any.
fn datetime_datatype(value: &str) -> Option<NamedNodeRef<'static>> {
    if oxsdatatypes::Duration::from_str(value).is_ok() {
        Some(xsd::DURATION)
    } else if oxsdatatypes::DateTime::from_str(value).is_ok() {
        Some(xsd::DATE_TIME)
    } else if oxsdatatypes::Date::from_str(value).is_ok() {
        Some(xsd::DATE)
    } else if oxsdatatypes::Time::from_str(value).is_ok() {
        Some(xsd::TIME)
    } else if oxsdatatypes::GYearMonth::from_str(value).is_ok() {
        Some(xsd::G_YEAR_MONTH)
    } else if oxsdatatypes::GYear::from_str(value).is_ok() {
        Some(xsd::G_YEAR)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn datetime_values_are_typed_by_lexical_form() {
        assert_eq!(datetime_datatype("2012-03-18"), Some(xsd::DATE));
        assert_eq!(datetime_datatype("2012-03-18T00:00:00Z"), Some(xsd::DATE_TIME));
        assert_eq!(datetime_datatype("00:00:00Z"), Some(xsd::TIME));
        assert_eq!(datetime_datatype("P2011Y06M28DT00H00M00S"), Some(xsd::DURATION));
        assert_eq!(datetime_datatype("2012-03"), Some(xsd::G_YEAR_MONTH));
        assert_eq!(datetime_datatype("2012"), Some(xsd::G_YEAR));
        assert_eq!(datetime_datatype("foo"), None);
    }

    #[test]
    fn lists_are_written_front_to_back() {
        let processor = RdfaProcessor::new();
        let s: NamedOrBlankNode = NamedNode::new_unchecked("http://example.org/s").into();
        let p = NamedNode::new_unchecked("http://example.org/p");
        processor.emit_list(
            &s,
            &p,
            &[
                Literal::new_simple_literal("1").into(),
                Literal::new_simple_literal("2").into(),
            ],
        );
        processor.emit_list(&s, &p, &[]);

        let (output, _) = processor.finish();
        let lines: Vec<String> = output.iter().map(|t| t.to_string()).collect();
        let first = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#first>";
        let rest = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#rest>";
        let nil = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#nil>";
        assert_eq!(
            lines,
            vec![
                format!("_:b1 {first} \"1\" ."),
                format!("_:b1 {rest} _:b2 ."),
                format!("_:b2 {first} \"2\" ."),
                format!("_:b2 {rest} {nil} ."),
                "<http://example.org/s> <http://example.org/p> _:b1 .".to_string(),
                format!("<http://example.org/s> <http://example.org/p> {nil} ."),
            ]
        );
    }
}
