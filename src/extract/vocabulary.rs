//! The curated devkg predicate vocabulary.
//!
//! Mirrors the ontology's object properties one-to-one. The set is closed:
//! anything an LLM proposes outside it is mapped onto [`Predicate::RelatedTo`].

use serde::{Deserialize, Serialize};

/// One of the 24 relation types a knowledge triple may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Uses,
    DependsOn,
    Enables,
    IsPartOf,
    HasPart,
    Implements,
    Extends,
    AlternativeTo,
    Solves,
    Produces,
    Configures,
    ComposesWith,
    Provides,
    Requires,
    IsTypeOf,
    BuiltWith,
    DeployedOn,
    StoresIn,
    QueriedWith,
    IntegratesWith,
    Broader,
    Narrower,
    RelatedTo,
    ServesAs,
}

impl Predicate {
    /// Every predicate, in prompt order.
    pub const ALL: [Predicate; 24] = [
        Self::Uses,
        Self::DependsOn,
        Self::Enables,
        Self::IsPartOf,
        Self::HasPart,
        Self::Implements,
        Self::Extends,
        Self::AlternativeTo,
        Self::Solves,
        Self::Produces,
        Self::Configures,
        Self::ComposesWith,
        Self::Provides,
        Self::Requires,
        Self::IsTypeOf,
        Self::BuiltWith,
        Self::DeployedOn,
        Self::StoresIn,
        Self::QueriedWith,
        Self::IntegratesWith,
        Self::Broader,
        Self::Narrower,
        Self::RelatedTo,
        Self::ServesAs,
    ];

    /// The catch-all used when nothing else matches.
    pub const FALLBACK: Predicate = Self::RelatedTo;

    /// The camelCase local name used in the ontology and in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uses => "uses",
            Self::DependsOn => "dependsOn",
            Self::Enables => "enables",
            Self::IsPartOf => "isPartOf",
            Self::HasPart => "hasPart",
            Self::Implements => "implements",
            Self::Extends => "extends",
            Self::AlternativeTo => "alternativeTo",
            Self::Solves => "solves",
            Self::Produces => "produces",
            Self::Configures => "configures",
            Self::ComposesWith => "composesWith",
            Self::Provides => "provides",
            Self::Requires => "requires",
            Self::IsTypeOf => "isTypeOf",
            Self::BuiltWith => "builtWith",
            Self::DeployedOn => "deployedOn",
            Self::StoresIn => "storesIn",
            Self::QueriedWith => "queriedWith",
            Self::IntegratesWith => "integratesWith",
            Self::Broader => "broader",
            Self::Narrower => "narrower",
            Self::RelatedTo => "relatedTo",
            Self::ServesAs => "servesAs",
        }
    }

    /// One-line gloss shown to the LLM.
    pub fn description(self) -> &'static str {
        match self {
            Self::Uses => "X uses technology/tool Y",
            Self::DependsOn => "X depends on Y",
            Self::Enables => "X enables capability Y",
            Self::IsPartOf => "X is part of larger Y",
            Self::HasPart => "X has component Y",
            Self::Implements => "X implements pattern/spec Y",
            Self::Extends => "X extends/specializes Y",
            Self::AlternativeTo => "X is alternative to Y",
            Self::Solves => "X solves problem Y",
            Self::Produces => "X produces output Y",
            Self::Configures => "X configures Y",
            Self::ComposesWith => "X composes/combines with Y",
            Self::Provides => "X provides capability Y",
            Self::Requires => "X requires Y",
            Self::IsTypeOf => "X is a type/kind of Y",
            Self::BuiltWith => "X is built with Y",
            Self::DeployedOn => "X is deployed on platform Y",
            Self::StoresIn => "X stores data in Y",
            Self::QueriedWith => "X is queried using Y",
            Self::IntegratesWith => "X integrates with Y",
            Self::Broader => "X is a broader concept than Y",
            Self::Narrower => "X is a narrower concept than Y",
            Self::RelatedTo => "X is related to Y (generic)",
            Self::ServesAs => "X serves as / acts as Y",
        }
    }

    /// Exact (case-sensitive) lookup by local name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Case-insensitive lookup by local name.
    pub fn from_name_ignore_case(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
