use std::fmt;

pub type BoxedIncludeProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrepperError {
    /// Any error reported by the user-supplied `IncludeProvider`
    #[error("file {file:?} was not found: {cause}")]
    FileNotFound { file: String, cause: String },

    /// Paths need both a file name and an extension, since the extension decides the shader stage
    #[error("path {0:?} has no file name or extension")]
    MissingFileName(String),

    /// Recursively included file, along with the file which included it
    #[error("file {file:?} is recursively included from {from:?}")]
    RecursiveInclude { file: String, from: String },

    #[error("string does not have a matching end quote")]
    MissingClosingQuote,

    /// A structural token was expected but something else was found
    #[error("expected {expected}, found {found:?}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    #[error("unexpected end of file, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("type {0:?} not recognized")]
    UnknownType(String),

    #[error("vector type {0:?} should be of the format TvecN where T is the element type and N is the number of components")]
    MalformedVectorType(String),

    #[error("boolean values should be true or false, found {0:?}")]
    InvalidBoolean(String),

    #[error("{0:?} is not a valid number")]
    InvalidNumber(String),

    #[error("#requires_implementation should be the first token of the file")]
    MisplacedRequiresImplementation,

    #[error("this is not an implementation file; use a file which implements the required functions")]
    NotAnImplementation,

    #[error("#vertex_shader should only be present in a fragment shader")]
    VertexShaderOutsideFragment,

    #[error("#vertex_shader path {0:?} does not point to a vertex shader")]
    NotAVertexShader(String),

    #[error("multiple vertex shaders are linked by this file")]
    MultipleVertexShaders,

    /// Two flattened uniforms ended up with the same name. Both are kept.
    #[error("uniform {0:?} is present twice")]
    UniformCollision(String),
}

impl PrepperError {
    /// Warnings are reported but do not invalidate the program.
    pub fn is_warning(&self) -> bool {
        matches!(self, PrepperError::UniformCollision(_))
    }
}

/// A problem found while processing a program, along with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// File the problem was found in
    pub file: String,

    /// Line within `file`, starting at 1; zero when the problem concerns the whole file
    pub line: usize,

    pub error: PrepperError,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, line: usize, error: PrepperError) -> Self {
        Self {
            file: file.into(),
            line,
            error,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.error.is_warning()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.is_warning() { "warning" } else { "error" };
        if self.line == 0 {
            write!(f, "{}: {}: {}", self.file, severity, self.error)
        } else {
            write!(f, "{}({}): {}: {}", self.file, self.line, severity, self.error)
        }
    }
}
