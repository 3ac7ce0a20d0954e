//! **shader-linker** is a preprocessor for an extended GLSL dialect. On top of plain GLSL
//! it understands:
//!
//! ```text
//! #include "relative/path"
//! #requires_implementation          // first token of a template file
//! #vertex_shader "relative/path"    // fragment files only, at most once
//! struct NAME { TYPE FIELD; ... };
//! uniform TYPE NAME [= VALUE | = (VALUE, ...)];
//! ```
//!
//! Includes are expanded once per include chain, the fragment shader is linked with the
//! vertex shader it names, and every `uniform` declaration (including default values) is
//! collected and flattened into a list of [`Uniform`]s, with struct fields addressed by
//! dotted paths such as `light.color`. Other directives are copied into the expanded
//! code, so they can be subsequently handled by the shader compiler.
//!
//! Problems never abort processing: they are collected as [`Diagnostic`]s, and the
//! (possibly partial) sources are returned alongside them for debugging.
//!
//! # Example
//!
//! ```no_run
//! let mut provider = shader_linker::FileIncludeProvider::new("shaders");
//! let program = shader_linker::process_program("shaders/main.frag", &mut provider);
//!
//! if program.is_valid() {
//!     for uniform in &program.uniforms {
//!         println!("{}: {:?}", uniform.name, uniform.values);
//!     }
//! } else {
//!     for diagnostic in &program.diagnostics {
//!         eprintln!("{}", diagnostic);
//!     }
//! }
//! ```

mod discovery;
mod error;
mod include_provider;
pub mod lexer;
mod parser;
mod source_map;
mod variable;

#[cfg(feature = "gl_compiler")]
pub mod gl_compiler;

#[cfg(test)]
mod tests;

pub use discovery::*;
pub use error::*;
pub use include_provider::*;
pub use parser::{parse_file, IncludeChain, ParsedFile, SymbolTables};
pub use source_map::*;
pub use variable::*;

/// A processed vertex/fragment program, ready to be handed to the graphics API.
#[derive(Debug)]
pub struct ShaderProgram {
    /// Errors and warnings from every file in the program, in the order they were found
    pub diagnostics: Vec<Diagnostic>,

    pub vertex_source: EmittedSource,
    pub fragment_source: EmittedSource,

    /// Leaf uniforms, ordered by declared uniform name
    pub uniforms: Vec<Uniform>,
}

impl ShaderProgram {
    /// False if any error (as opposed to a warning) was found anywhere in the program.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.iter().all(Diagnostic::is_warning)
    }

    pub fn vertex_shader_code(&self) -> &str {
        self.vertex_source.as_str()
    }

    pub fn fragment_shader_code(&self) -> &str {
        self.fragment_source.as_str()
    }
}

/// Process an entry file, and then any code recursively included or linked.
///
/// `entry_path` is loaded as-is; paths in directives go through
/// [`IncludeProvider::resolve_path`]. The entry must be an implementation file:
/// a file starting with `#requires_implementation` can only be included.
pub fn process_program(
    entry_path: &str,
    include_provider: &mut dyn IncludeProvider,
) -> ShaderProgram {
    let path = ResolvedIncludePath(entry_path.to_owned());
    let parsed = parse_file(
        path.clone(),
        include_provider,
        true,
        SymbolTables::default(),
        IncludeChain::default(),
    );

    let (uniforms, collisions) = parsed.tables.flatten_uniforms(&path.0);
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(collisions);

    let fragment_source = if parsed.path.is_fragment_shader() {
        parsed.source
    } else {
        EmittedSource::new()
    };

    ShaderProgram {
        diagnostics,
        vertex_source: parsed.vertex_source.unwrap_or_default(),
        fragment_source,
        uniforms,
    }
}
