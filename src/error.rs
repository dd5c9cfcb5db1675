pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, miette::Diagnostic, Debug, Eq, PartialEq, Clone)]
pub enum Error {
    #[error("Referenced category ({cat:?}) is not defined")]
    CategoryMissing { cat: String },

    #[error("Referenced definition ({name:?}) is not defined in category {cat:?}")]
    NameMissing { cat: String, name: String },

    #[error("Category {cat:?} has no rule definitions to generate from")]
    #[diagnostic(help("every definition in this category may have been pruned as unreachable"))]
    EmptyCategory { cat: String },

    #[error("Category group {group:?} does not declare a top-level category")]
    MissingTopCategory { group: String },

    #[error("Alternation has no alternatives to choose from")]
    EmptyAlternation,

    #[error("Reference expansion exceeded the runaway limit ({limit})")]
    #[diagnostic(help("a reference cycle with no leaf branch was built without preprocessing"))]
    RunawayRecursion { limit: usize },

    #[error("Found unreachable rules")]
    UnreachableRules { rules: Vec<String> },

    #[error("May be trapped in a dead loop")]
    TrapLoop { rules: Vec<String> },
}

impl Error {
    /// A recoverable failure aborts only the sample being built; the
    /// generator rolls back any staged definitions and tries again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RunawayRecursion { .. })
    }
}
