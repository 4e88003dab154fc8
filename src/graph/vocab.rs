//! Ontology terms used by the sink, as `NamedNodeRef` constants.

use oxigraph::model::NamedNodeRef;

macro_rules! terms {
    ($($name:ident = $iri:literal;)*) => {
        $(pub const $name: NamedNodeRef<'static> = NamedNodeRef::new_unchecked($iri);)*
    };
}

// devkg classes
terms! {
    SESSION = "http://devkg.local/ontology#Session";
    USER_MESSAGE = "http://devkg.local/ontology#UserMessage";
    ASSISTANT_MESSAGE = "http://devkg.local/ontology#AssistantMessage";
    DEVELOPER = "http://devkg.local/ontology#Developer";
    ENTITY = "http://devkg.local/ontology#Entity";
    KNOWLEDGE_TRIPLE = "http://devkg.local/ontology#KnowledgeTriple";
}

// devkg properties
terms! {
    HAS_SOURCE_PLATFORM = "http://devkg.local/ontology#hasSourcePlatform";
    HAS_SOURCE_FILE = "http://devkg.local/ontology#hasSourceFile";
    HAS_MESSAGE_ID = "http://devkg.local/ontology#hasMessageId";
    USED_IN_SESSION = "http://devkg.local/ontology#usedInSession";
    HAS_PARENT_MESSAGE = "http://devkg.local/ontology#hasParentMessage";
    MENTIONS_TOPIC = "http://devkg.local/ontology#mentionsTopic";
    TRIPLE_SUBJECT = "http://devkg.local/ontology#tripleSubject";
    TRIPLE_OBJECT = "http://devkg.local/ontology#tripleObject";
    TRIPLE_PREDICATE_LABEL = "http://devkg.local/ontology#triplePredicateLabel";
    EXTRACTED_FROM = "http://devkg.local/ontology#extractedFrom";
    EXTRACTED_IN_SESSION = "http://devkg.local/ontology#extractedInSession";
}

// external vocabularies
terms! {
    SIOC_HAS_CREATOR = "http://rdfs.org/sioc/ns#has_creator";
    SIOC_HAS_CONTAINER = "http://rdfs.org/sioc/ns#has_container";
    SIOC_CONTENT = "http://rdfs.org/sioc/ns#content";
    DCTERMS_CREATED = "http://purl.org/dc/terms/created";
    DCTERMS_MODIFIED = "http://purl.org/dc/terms/modified";
    DCTERMS_TITLE = "http://purl.org/dc/terms/title";
    DCTERMS_DESCRIPTION = "http://purl.org/dc/terms/description";
    SKOS_ALT_LABEL = "http://www.w3.org/2004/02/skos/core#altLabel";
    OWL_SAME_AS = "http://www.w3.org/2002/07/owl#sameAs";
}
