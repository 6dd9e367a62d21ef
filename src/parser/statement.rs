//! The abstract statement tree both surface syntaxes reduce to.
//!
//! A YANG module and its YIN rendering carry the same statements; the
//! two readers in this crate produce the same [`Statement`] tree, and
//! the builder only ever sees this form.

use std::fmt;

/// Every statement keyword the loader understands. Vendor extension
/// statements (`prefix:keyword`) are carried as [`Keyword::Extension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Module,
    Submodule,
    YangVersion,
    Namespace,
    Prefix,
    Import,
    Include,
    RevisionDate,
    BelongsTo,
    Organization,
    Contact,
    Description,
    Reference,
    Revision,
    Feature,
    IfFeature,
    Identity,
    Base,
    Typedef,
    Type,
    Units,
    Default,
    Status,
    Config,
    Mandatory,
    Presence,
    Container,
    Leaf,
    LeafList,
    List,
    Choice,
    Case,
    Anyxml,
    Uses,
    Grouping,
    Augment,
    Refine,
    When,
    Must,
    ErrorMessage,
    ErrorAppTag,
    Key,
    Unique,
    MinElements,
    MaxElements,
    OrderedBy,
    Range,
    Length,
    Pattern,
    Enum,
    Bit,
    Position,
    Value,
    FractionDigits,
    Path,
    RequireInstance,
    Rpc,
    Input,
    Output,
    Notification,
    Deviation,
    Deviate,
    ExtensionDef,
    Argument,
    YinElement,
    /// `prefix:keyword` vendor extension statement
    Extension { prefix: String, name: String },
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Keyword> {
        Some(match name {
            "module" => Keyword::Module,
            "submodule" => Keyword::Submodule,
            "yang-version" => Keyword::YangVersion,
            "namespace" => Keyword::Namespace,
            "prefix" => Keyword::Prefix,
            "import" => Keyword::Import,
            "include" => Keyword::Include,
            "revision-date" => Keyword::RevisionDate,
            "belongs-to" => Keyword::BelongsTo,
            "organization" => Keyword::Organization,
            "contact" => Keyword::Contact,
            "description" => Keyword::Description,
            "reference" => Keyword::Reference,
            "revision" => Keyword::Revision,
            "feature" => Keyword::Feature,
            "if-feature" => Keyword::IfFeature,
            "identity" => Keyword::Identity,
            "base" => Keyword::Base,
            "typedef" => Keyword::Typedef,
            "type" => Keyword::Type,
            "units" => Keyword::Units,
            "default" => Keyword::Default,
            "status" => Keyword::Status,
            "config" => Keyword::Config,
            "mandatory" => Keyword::Mandatory,
            "presence" => Keyword::Presence,
            "container" => Keyword::Container,
            "leaf" => Keyword::Leaf,
            "leaf-list" => Keyword::LeafList,
            "list" => Keyword::List,
            "choice" => Keyword::Choice,
            "case" => Keyword::Case,
            "anyxml" => Keyword::Anyxml,
            "uses" => Keyword::Uses,
            "grouping" => Keyword::Grouping,
            "augment" => Keyword::Augment,
            "refine" => Keyword::Refine,
            "when" => Keyword::When,
            "must" => Keyword::Must,
            "error-message" => Keyword::ErrorMessage,
            "error-app-tag" => Keyword::ErrorAppTag,
            "key" => Keyword::Key,
            "unique" => Keyword::Unique,
            "min-elements" => Keyword::MinElements,
            "max-elements" => Keyword::MaxElements,
            "ordered-by" => Keyword::OrderedBy,
            "range" => Keyword::Range,
            "length" => Keyword::Length,
            "pattern" => Keyword::Pattern,
            "enum" => Keyword::Enum,
            "bit" => Keyword::Bit,
            "position" => Keyword::Position,
            "value" => Keyword::Value,
            "fraction-digits" => Keyword::FractionDigits,
            "path" => Keyword::Path,
            "require-instance" => Keyword::RequireInstance,
            "rpc" => Keyword::Rpc,
            "input" => Keyword::Input,
            "output" => Keyword::Output,
            "notification" => Keyword::Notification,
            "deviation" => Keyword::Deviation,
            "deviate" => Keyword::Deviate,
            "extension" => Keyword::ExtensionDef,
            "argument" => Keyword::Argument,
            "yin-element" => Keyword::YinElement,
            _ => return None,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Keyword::Module => "module",
            Keyword::Submodule => "submodule",
            Keyword::YangVersion => "yang-version",
            Keyword::Namespace => "namespace",
            Keyword::Prefix => "prefix",
            Keyword::Import => "import",
            Keyword::Include => "include",
            Keyword::RevisionDate => "revision-date",
            Keyword::BelongsTo => "belongs-to",
            Keyword::Organization => "organization",
            Keyword::Contact => "contact",
            Keyword::Description => "description",
            Keyword::Reference => "reference",
            Keyword::Revision => "revision",
            Keyword::Feature => "feature",
            Keyword::IfFeature => "if-feature",
            Keyword::Identity => "identity",
            Keyword::Base => "base",
            Keyword::Typedef => "typedef",
            Keyword::Type => "type",
            Keyword::Units => "units",
            Keyword::Default => "default",
            Keyword::Status => "status",
            Keyword::Config => "config",
            Keyword::Mandatory => "mandatory",
            Keyword::Presence => "presence",
            Keyword::Container => "container",
            Keyword::Leaf => "leaf",
            Keyword::LeafList => "leaf-list",
            Keyword::List => "list",
            Keyword::Choice => "choice",
            Keyword::Case => "case",
            Keyword::Anyxml => "anyxml",
            Keyword::Uses => "uses",
            Keyword::Grouping => "grouping",
            Keyword::Augment => "augment",
            Keyword::Refine => "refine",
            Keyword::When => "when",
            Keyword::Must => "must",
            Keyword::ErrorMessage => "error-message",
            Keyword::ErrorAppTag => "error-app-tag",
            Keyword::Key => "key",
            Keyword::Unique => "unique",
            Keyword::MinElements => "min-elements",
            Keyword::MaxElements => "max-elements",
            Keyword::OrderedBy => "ordered-by",
            Keyword::Range => "range",
            Keyword::Length => "length",
            Keyword::Pattern => "pattern",
            Keyword::Enum => "enum",
            Keyword::Bit => "bit",
            Keyword::Position => "position",
            Keyword::Value => "value",
            Keyword::FractionDigits => "fraction-digits",
            Keyword::Path => "path",
            Keyword::RequireInstance => "require-instance",
            Keyword::Rpc => "rpc",
            Keyword::Input => "input",
            Keyword::Output => "output",
            Keyword::Notification => "notification",
            Keyword::Deviation => "deviation",
            Keyword::Deviate => "deviate",
            Keyword::ExtensionDef => "extension",
            Keyword::Argument => "argument",
            Keyword::YinElement => "yin-element",
            Keyword::Extension { name, .. } => name,
        }
    }

    /// YIN mapping of the statement argument: the attribute/element name
    /// and whether it is carried as a child element (`yin-element`).
    pub fn yin_argument(&self) -> Option<(&'static str, bool)> {
        Some(match self {
            Keyword::Module | Keyword::Submodule => ("name", false),
            Keyword::YangVersion => ("value", false),
            Keyword::Namespace => ("uri", false),
            Keyword::Prefix => ("value", false),
            Keyword::Import | Keyword::Include => ("module", false),
            Keyword::RevisionDate => ("date", false),
            Keyword::BelongsTo => ("module", false),
            Keyword::Organization => ("text", true),
            Keyword::Contact => ("text", true),
            Keyword::Description => ("text", true),
            Keyword::Reference => ("text", true),
            Keyword::Revision => ("date", false),
            Keyword::Feature => ("name", false),
            Keyword::IfFeature => ("name", false),
            Keyword::Identity => ("name", false),
            Keyword::Base => ("name", false),
            Keyword::Typedef => ("name", false),
            Keyword::Type => ("name", false),
            Keyword::Units => ("name", false),
            Keyword::Default => ("value", false),
            Keyword::Status => ("value", false),
            Keyword::Config => ("value", false),
            Keyword::Mandatory => ("value", false),
            Keyword::Presence => ("value", false),
            Keyword::Container => ("name", false),
            Keyword::Leaf => ("name", false),
            Keyword::LeafList => ("name", false),
            Keyword::List => ("name", false),
            Keyword::Choice => ("name", false),
            Keyword::Case => ("name", false),
            Keyword::Anyxml => ("name", false),
            Keyword::Uses => ("name", false),
            Keyword::Grouping => ("name", false),
            Keyword::Augment => ("target-node", false),
            Keyword::Refine => ("target-node", false),
            Keyword::When => ("condition", false),
            Keyword::Must => ("condition", false),
            Keyword::ErrorMessage => ("value", true),
            Keyword::ErrorAppTag => ("value", false),
            Keyword::Key => ("value", false),
            Keyword::Unique => ("tag", false),
            Keyword::MinElements => ("value", false),
            Keyword::MaxElements => ("value", false),
            Keyword::OrderedBy => ("value", false),
            Keyword::Range => ("value", false),
            Keyword::Length => ("value", false),
            Keyword::Pattern => ("value", false),
            Keyword::Enum => ("name", false),
            Keyword::Bit => ("name", false),
            Keyword::Position => ("value", false),
            Keyword::Value => ("value", false),
            Keyword::FractionDigits => ("value", false),
            Keyword::Path => ("value", false),
            Keyword::RequireInstance => ("value", false),
            Keyword::Rpc => ("name", false),
            Keyword::Input | Keyword::Output => return None,
            Keyword::Notification => ("name", false),
            Keyword::Deviation => ("target-node", false),
            Keyword::Deviate => ("value", false),
            Keyword::ExtensionDef => ("name", false),
            Keyword::Argument => ("name", false),
            Keyword::YinElement => ("value", false),
            Keyword::Extension { .. } => return None,
        })
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyword::Extension { prefix, name } => write!(f, "{prefix}:{name}"),
            other => f.write_str(other.name()),
        }
    }
}

/// One parsed statement: keyword, optional argument, substatements.
#[derive(Debug, Clone)]
pub struct Statement {
    pub keyword: Keyword,
    pub arg: Option<String>,
    pub children: Vec<Statement>,
    /// 1-based source line, for error messages
    pub line: usize,
}

impl Statement {
    pub fn new(keyword: Keyword, arg: Option<String>, line: usize) -> Self {
        Statement {
            keyword,
            arg,
            children: Vec::new(),
            line,
        }
    }

    /// The argument, or empty when missing.
    pub fn arg_str(&self) -> &str {
        self.arg.as_deref().unwrap_or("")
    }

    pub fn find(&self, kw: &Keyword) -> Option<&Statement> {
        self.children.iter().find(|c| &c.keyword == kw)
    }
}
