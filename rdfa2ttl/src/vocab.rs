pub(crate) mod dc {
    use oxrdf::NamedNodeRef;

    pub static DESCRIPTION: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/description");
}

pub(crate) mod xhv {
    use oxrdf::NamedNodeRef;

    pub static VOCAB: &str = "http://www.w3.org/1999/xhtml/vocab#";

    pub static ROLE: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/xhtml/vocab#role");
}

pub(crate) mod rdf {
    use oxrdf::NamedNodeRef;

    pub static HTML: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML");
}

pub(crate) mod rdfa {
    use oxrdf::NamedNodeRef;

    pub static COPY: NamedNodeRef = NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#copy");

    pub static PATTERN: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#Pattern");

    pub static WARNING: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#Warning");

    pub static DOCUMENT_ERROR: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#DocumentError");

    pub static UNRESOLVED_CURIE: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#UnresolvedCurie");

    pub static UNRESOLVED_TERM: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#UnresolvedTerm");

    pub static PREFIX_REDEFINITION: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#PrefixRedefinition");

    pub static USES_VOCABULARY: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#usesVocabulary");
}
