//! Unified error type for schema loading and data validation.
//!
//! Every loader failure is fatal to the current load: the module being
//! parsed is torn down and the repository is left unchanged. The error
//! message embeds the schema or data path breadcrumb where one is known.

/// Result type alias for operations that can fail with a [`YangError`].
pub type YangResult<T> = Result<T, YangError>;

/// All errors produced by the schema loader, resolver and data validator.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum YangError {
    /// Lexer met a character it cannot start a token with
    #[error("unexpected character: {0}")]
    UnexpectedChar(String),

    /// A quoted string or comment ran into the end of input
    #[error("unterminated string: {0}")]
    UnterminatedString(String),

    /// A backslash with nothing to escape
    #[error("bad escape sequence: {0}")]
    BadEscape(String),

    /// A statement that may appear at most once appeared again
    #[error("duplicate statement: {0}")]
    DuplicateStatement(String),

    /// A mandatory substatement is missing
    #[error("missing required substatement: {0}")]
    MissingRequiredChild(String),

    /// A statement appeared where its parent does not allow it
    #[error("unexpected statement: {0}")]
    UnexpectedStatementInContext(String),

    /// An identifier collides within its scope
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// A prefix does not match any import or the module's own prefix
    #[error("unknown prefix: {0}")]
    UnknownPrefix(String),

    /// The resolver made a full pass without progress
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A chain of leafrefs revisits a leaf
    #[error("circular leafref: {0}")]
    CircularLeafref(String),

    /// A range/length expression is malformed or out of order
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Bit position past UINT32_MAX
    #[error("bit position overflow: {0}")]
    BitPositionOverflow(String),

    /// Enum value past INT32_MAX
    #[error("enum value overflow: {0}")]
    EnumValueOverflow(String),

    /// A mandatory leaf or choice also declares a default
    #[error("mandatory node with default: {0}")]
    MandatoryWithDefault(String),

    /// A different revision of the module is already implemented
    #[error("conflicting implemented revision: {0}")]
    ConflictingImplementedRevision(String),

    /// A deviation targets the module it is defined in
    #[error("deviation of own module: {0}")]
    DeviationOfOwnModule(String),

    /// A `deviate not-supported` would remove a list key
    #[error("not-supported deviation removes a list key: {0}")]
    NotSupportedRemovesKey(String),

    /// A value does not conform to its schema type or placement
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A mandatory data node has no instance
    #[error("missing mandatory node: {0}")]
    MissingMandatory(String),

    /// Invariant violation inside the library
    #[error("internal error: {0}")]
    Internal(String),
}

impl YangError {
    /// Short stable name of the error code, independent of the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedChar(_) => "UnexpectedChar",
            Self::UnterminatedString(_) => "UnterminatedString",
            Self::BadEscape(_) => "BadEscape",
            Self::DuplicateStatement(_) => "DuplicateStatement",
            Self::MissingRequiredChild(_) => "MissingRequiredChild",
            Self::UnexpectedStatementInContext(_) => "UnexpectedStatementInContext",
            Self::DuplicateIdentifier(_) => "DuplicateIdentifier",
            Self::UnknownPrefix(_) => "UnknownPrefix",
            Self::UnresolvedReference(_) => "UnresolvedReference",
            Self::CircularLeafref(_) => "CircularLeafref",
            Self::InvalidRange(_) => "InvalidRange",
            Self::BitPositionOverflow(_) => "BitPositionOverflow",
            Self::EnumValueOverflow(_) => "EnumValueOverflow",
            Self::MandatoryWithDefault(_) => "MandatoryWithDefault",
            Self::ConflictingImplementedRevision(_) => "ConflictingImplementedRevision",
            Self::DeviationOfOwnModule(_) => "DeviationOfOwnModule",
            Self::NotSupportedRemovesKey(_) => "NotSupportedRemovesKey",
            Self::InvalidValue(_) => "InvalidValue",
            Self::MissingMandatory(_) => "MissingMandatory",
            Self::Internal(_) => "Internal",
        }
    }
}
