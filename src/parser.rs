use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use log::{debug, warn};

use crate::lexer::{Lexer, Token, TokenKind};
use crate::{
    Diagnostic, ElementType, EmittedSource, IncludeProvider, PrepperError, ResolvedIncludePath,
    Uniform, UniformValues, Variable,
};

/// Declarations visible to one include chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTables {
    /// Declared uniforms; a later declaration of the same name replaces the earlier one.
    pub uniforms: BTreeMap<String, Variable>,

    /// Field templates of declared struct types; the first definition of a name wins.
    pub struct_types: BTreeMap<String, Vec<Variable>>,
}

impl SymbolTables {
    /// Merges tables returned by a nested parse into these ones.
    pub fn merge(&mut self, other: SymbolTables) {
        self.uniforms.extend(other.uniforms);
        for (name, fields) in other.struct_types {
            self.struct_types.entry(name).or_insert(fields);
        }
    }

    /// Flattens every uniform into leaf uniforms, in uniform name order.
    ///
    /// Leaves sharing a name with another uniform are reported as warnings against `file`,
    /// and both are kept.
    pub fn flatten_uniforms(&self, file: &str) -> (Vec<Uniform>, Vec<Diagnostic>) {
        let mut leaves = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen = HashSet::new();

        for (name, variable) in &self.uniforms {
            for leaf in variable.flatten("") {
                let first_seen = seen.insert(leaf.name.clone());
                let shadows_other = leaf.name != *name && self.uniforms.contains_key(&leaf.name);
                if shadows_other || !first_seen {
                    warn!("Uniform {} is present twice", leaf.name);
                    diagnostics.push(Diagnostic::new(
                        file,
                        0,
                        PrepperError::UniformCollision(leaf.name.clone()),
                    ));
                }
                leaves.push(leaf);
            }
        }

        (leaves, diagnostics)
    }
}

/// Include bookkeeping threaded through recursive parses.
#[derive(Clone, Debug, Default)]
pub struct IncludeChain {
    /// Files already expanded in this chain; they are skipped when included again.
    pub visited: HashSet<ResolvedIncludePath>,

    /// Files currently being parsed, outermost first. Including one of these is a cycle.
    pub active: Vec<ResolvedIncludePath>,
}

/// Everything a parse of one file produces.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: ResolvedIncludePath,

    /// Composed source of this file with its includes expanded
    pub source: EmittedSource,

    /// Vertex shader source, if this file is one or links/includes one
    pub vertex_source: Option<EmittedSource>,

    pub tables: SymbolTables,
    pub diagnostics: Vec<Diagnostic>,
    pub chain: IncludeChain,
}

/// Parses `path` and, recursively, every file it includes or links.
///
/// `tables` and `chain` are owned copies of the caller's state; the caller merges
/// the returned ones back into its own.
pub fn parse_file(
    path: ResolvedIncludePath,
    include_provider: &mut dyn IncludeProvider,
    is_implementation: bool,
    tables: SymbolTables,
    mut chain: IncludeChain,
) -> ParsedFile {
    chain.active.push(path.clone());

    let mut parser = Parser {
        include_provider,
        path,
        is_implementation,
        tokens: Vec::new(),
        pos: 0,
        tables,
        chain,
        source: EmittedSource::new(),
        vertex_source: None,
        diagnostics: Vec::new(),
    };
    parser.process();

    let mut chain = parser.chain;
    chain.active.pop();

    ParsedFile {
        path: parser.path,
        source: parser.source,
        vertex_source: parser.vertex_source,
        tables: parser.tables,
        diagnostics: parser.diagnostics,
        chain,
    }
}

/// Recovery state: the current declaration was abandoned after an error,
/// and the cursor sits on the next semicolon (or past the last token).
struct Resync;

enum DeclaredType {
    Values(ElementType, usize),
    Struct(Vec<Variable>),
}

/// `<prefix>vecN` with N in 1..=9
fn parse_vector_type(text: &str) -> Option<(ElementType, usize)> {
    let idx = text.find("vec")?;
    let element = ElementType::from_vector_prefix(&text[..idx])?;
    let mut arity = text[idx + 3..].chars();

    match (arity.next(), arity.next()) {
        (Some(c @ '1'..='9'), None) => Some((element, c as usize - '0' as usize)),
        _ => None,
    }
}

struct Parser<'a> {
    include_provider: &'a mut dyn IncludeProvider,
    path: ResolvedIncludePath,
    is_implementation: bool,
    tokens: Vec<Token>,
    pos: usize,
    tables: SymbolTables,
    chain: IncludeChain,
    source: EmittedSource,
    vertex_source: Option<EmittedSource>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn process(&mut self) {
        if !self.path.has_file_name_and_extension() {
            let error = PrepperError::MissingFileName(self.path.0.clone());
            self.diagnostics
                .push(Diagnostic::new(self.path.0.clone(), 0, error));
            return;
        }

        let lexer = Lexer::new(&self.path, &mut *self.include_provider);
        let lexer_valid = lexer.is_valid();
        let (tokens, diagnostics) = lexer.into_parts();
        self.diagnostics.extend(diagnostics);

        if !lexer_valid {
            return;
        }

        debug!("Parsing {} ({} tokens)", self.path.0, tokens.len());
        self.tokens = tokens;

        while self.pos < self.tokens.len() {
            if let Err(Resync) = self.parse_construct() {
                debug!("{}({}): skipped to the next semicolon", self.path.0, self.line());
            }
            self.pos += 1;
        }

        if self.path.is_vertex_shader() {
            self.vertex_source = Some(self.source.clone());
        }
    }

    fn parse_construct(&mut self) -> Result<(), Resync> {
        let kind = self.tokens[self.pos].kind;
        let text = self.tokens[self.pos].text.clone();

        match kind {
            TokenKind::Directive => match text.as_str() {
                "#include" => self.include_file(),
                "#requires_implementation" => self.check_requires_implementation(),
                "#vertex_shader" => self.link_vertex_shader(),
                _ => self.emit_current(),
            },
            TokenKind::Keyword => match text.as_str() {
                "struct" => return self.register_struct(),
                "uniform" => return self.register_uniform(),
                _ => self.emit_current(),
            },
            TokenKind::String => self.emit_str(&format!("\"{}\"", text)),
            _ => self.emit_current(),
        }

        Ok(())
    }

    fn include_file(&mut self) {
        if !self.expect(TokenKind::String, "a file path after #include") {
            self.emit_current();
            return;
        }

        let path = match self.resolve_current() {
            Some(path) => path,
            None => return,
        };

        if self.chain.visited.contains(&path) {
            debug!("Skipping {}; already included", path.0);
            return;
        }

        // Only the roots of a chain (the entry file, a linked vertex shader) can be active
        // without being visited.
        if self.chain.active.contains(&path) {
            self.error(PrepperError::RecursiveInclude {
                file: path.0,
                from: self.path.0.clone(),
            });
            return;
        }
        self.chain.visited.insert(path.clone());

        let child = parse_file(
            path,
            &mut *self.include_provider,
            false,
            self.tables.clone(),
            self.chain.clone(),
        );

        self.chain.visited = child.chain.visited;
        self.tables.merge(child.tables);
        self.diagnostics.extend(child.diagnostics);

        if let Some(vertex_source) = child.vertex_source {
            if self.vertex_source.is_some() {
                self.error(PrepperError::MultipleVertexShaders);
            } else {
                self.vertex_source = Some(vertex_source);
            }
        }

        self.source.append(&child.source);
    }

    fn check_requires_implementation(&mut self) {
        if self.pos != 0 {
            self.error(PrepperError::MisplacedRequiresImplementation);
        }

        if self.is_implementation {
            self.error(PrepperError::NotAnImplementation);
        }
    }

    fn link_vertex_shader(&mut self) {
        if !self.path.is_fragment_shader() {
            self.error(PrepperError::VertexShaderOutsideFragment);
        }

        if !self.expect(TokenKind::String, "a file path after #vertex_shader") {
            self.emit_current();
            return;
        }

        if self.vertex_source.is_some() {
            self.error(PrepperError::MultipleVertexShaders);
            return;
        }

        let path = match self.resolve_current() {
            Some(path) => path,
            None => return,
        };

        if !path.is_vertex_shader() {
            self.error(PrepperError::NotAVertexShader(path.0.clone()));
        }

        if self.chain.active.contains(&path) {
            self.error(PrepperError::RecursiveInclude {
                file: path.0,
                from: self.path.0.clone(),
            });
            return;
        }

        debug!("Linking vertex shader {} into {}", path.0, self.path.0);

        // The vertex shader is its own include chain; only the cycle guard carries over.
        let chain = IncludeChain {
            visited: HashSet::new(),
            active: self.chain.active.clone(),
        };
        let linked = parse_file(
            path,
            &mut *self.include_provider,
            true,
            self.tables.clone(),
            chain,
        );

        self.tables.merge(linked.tables);
        self.diagnostics.extend(linked.diagnostics);
        self.vertex_source = linked.vertex_source;
    }

    fn register_struct(&mut self) -> Result<(), Resync> {
        self.emit_current();
        self.expect_or_resync(TokenKind::Keyword, "a struct name")?;
        let name = self.tokens[self.pos].text.clone();
        self.emit_current();

        self.expect_or_resync(TokenKind::OpenCurly, "an opening curly brace")?;
        self.emit_current();

        let mut fields = Vec::new();
        while let Some(kind) = self.peek_kind() {
            if kind == TokenKind::CloseCurly {
                break;
            }
            if let Ok(field) = self.parse_variable() {
                fields.push(field);
            }
        }

        self.expect_or_resync(TokenKind::CloseCurly, "a closing curly brace")?;
        self.emit_current();

        self.expect_or_resync(TokenKind::Semicolon, "a semicolon")?;
        self.emit_current();
        self.emit_str("\n");

        if !self.tables.struct_types.contains_key(&name) {
            self.tables.struct_types.insert(name, fields);
        }

        Ok(())
    }

    fn register_uniform(&mut self) -> Result<(), Resync> {
        self.emit_current();
        let variable = self.parse_variable()?;
        self.tables.uniforms.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// `TYPE NAME [= VALUE | = (VALUE, ...)] ;`
    fn parse_variable(&mut self) -> Result<Variable, Resync> {
        self.expect_or_resync(TokenKind::Keyword, "a type")?;
        let declared_type = self.determine_type()?;
        self.emit_current();

        self.expect_or_resync(TokenKind::Keyword, "a variable name")?;
        let name = self.tokens[self.pos].text.clone();
        self.emit_current();

        let variable = match declared_type {
            DeclaredType::Values(element, size) => {
                let values = self.parse_assignment_values(element, size)?;
                Variable::with_values(name, values)
            }
            DeclaredType::Struct(fields) => Variable::with_fields(name, &fields),
        };

        self.expect_or_resync(TokenKind::Semicolon, "a semicolon")?;
        self.emit_current();

        Ok(variable)
    }

    fn determine_type(&mut self) -> Result<DeclaredType, Resync> {
        let text = self.tokens[self.pos].text.clone();

        if let Some(element) = ElementType::from_scalar_keyword(&text) {
            return Ok(DeclaredType::Values(element, 1));
        }

        if let Some((element, size)) = parse_vector_type(&text) {
            return Ok(DeclaredType::Values(element, size));
        }

        if let Some(fields) = self.tables.struct_types.get(&text) {
            return Ok(DeclaredType::Struct(fields.clone()));
        }

        if text.contains("vec") {
            self.error(PrepperError::MalformedVectorType(text));
        } else {
            self.error(PrepperError::UnknownType(text));
        }
        Err(self.resync())
    }

    fn parse_assignment_values(
        &mut self,
        element: ElementType,
        size: usize,
    ) -> Result<UniformValues, Resync> {
        if self.peek_kind() != Some(TokenKind::Equals) {
            return Ok(element.zeroed(size));
        }
        self.expect_or_resync(TokenKind::Equals, "an equals sign")?;

        let parenthesized = size != 1;
        if parenthesized {
            self.expect_or_resync(TokenKind::OpenParen, "an opening parenthesis")?;
        }

        let values = match element {
            ElementType::Boolean => UniformValues::Boolean(self.parse_values(size, Self::parse_bool)?),
            ElementType::Integer => {
                UniformValues::Integer(self.parse_values(size, |p| p.parse_number(true, false))?)
            }
            ElementType::Unsigned => {
                UniformValues::Unsigned(self.parse_values(size, |p| p.parse_number(false, false))?)
            }
            ElementType::Float => {
                UniformValues::Float(self.parse_values(size, |p| p.parse_number(true, true))?)
            }
            ElementType::Double => {
                UniformValues::Double(self.parse_values(size, |p| p.parse_number(true, true))?)
            }
        };

        if parenthesized {
            self.expect_or_resync(TokenKind::CloseParen, "a closing parenthesis")?;
        }

        Ok(values)
    }

    fn parse_values<T>(
        &mut self,
        size: usize,
        mut parse_value: impl FnMut(&mut Self) -> Result<T, Resync>,
    ) -> Result<Vec<T>, Resync> {
        let mut values = Vec::with_capacity(size);

        for i in 0..size {
            values.push(parse_value(self)?);
            if i + 1 < size {
                self.expect_or_resync(TokenKind::Comma, "a comma separating values")?;
            }
        }

        Ok(values)
    }

    fn parse_bool(&mut self) -> Result<bool, Resync> {
        self.expect_or_resync(TokenKind::Boolean, "a boolean value")?;

        match self.tokens[self.pos].text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => {
                let error = PrepperError::InvalidBoolean(other.to_owned());
                self.error(error);
                Ok(false)
            }
        }
    }

    /// Parses an optionally negated number; `float` also accepts integer literals
    /// and a trailing `f`.
    fn parse_number<T: FromStr + Default>(&mut self, signed: bool, float: bool) -> Result<T, Resync> {
        let negative = signed && self.peek_kind() == Some(TokenKind::Minus);
        if negative {
            self.expect(TokenKind::Minus, "a minus sign");
        }

        let found = if float {
            self.expect_one_of(
                &[TokenKind::Float, TokenKind::Integer],
                "a floating point value",
            )
        } else {
            self.expect(TokenKind::Integer, "an integer value")
        };
        if !found {
            return Err(self.resync());
        }

        let text = self.tokens[self.pos].text.as_str();
        let digits = if float {
            text.strip_suffix('f').unwrap_or(text)
        } else {
            text
        };
        let literal = if negative {
            format!("-{}", digits)
        } else {
            digits.to_owned()
        };

        match literal.parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                self.error(PrepperError::InvalidNumber(literal));
                Ok(T::default())
            }
        }
    }

    fn resolve_current(&mut self) -> Option<ResolvedIncludePath> {
        let path = self.tokens[self.pos].text.clone();

        match self.include_provider.resolve_path(&path) {
            Ok(resolved) => Some(resolved),
            Err(cause) => {
                self.error(PrepperError::FileNotFound {
                    file: path,
                    cause: cause.to_string(),
                });
                None
            }
        }
    }

    /// Kind of the next non-whitespace token after the cursor.
    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens
            .get(self.pos + 1..)
            .unwrap_or(&[])
            .iter()
            .find(|t| t.kind != TokenKind::Whitespace)
            .map(|t| t.kind)
    }

    /// Moves to the next non-whitespace token, copying skipped whitespace into the output,
    /// and records an error unless it is one of `kinds`.
    fn expect_one_of(&mut self, kinds: &[TokenKind], expected: &'static str) -> bool {
        self.pos += 1;
        self.skip_whitespace();

        match self.tokens.get(self.pos) {
            Some(token) if kinds.contains(&token.kind) => true,
            Some(token) => {
                let error = PrepperError::UnexpectedToken {
                    expected,
                    found: token.text.clone(),
                };
                self.error(error);
                false
            }
            None => {
                self.error(PrepperError::UnexpectedEof(expected));
                false
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> bool {
        self.expect_one_of(&[kind], expected)
    }

    fn expect_or_resync(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), Resync> {
        if self.expect(kind, expected) {
            Ok(())
        } else {
            Err(self.resync())
        }
    }

    /// Skips ahead to the next semicolon without emitting anything.
    fn resync(&mut self) -> Resync {
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind == TokenKind::Semicolon {
                break;
            }
            self.pos += 1;
        }
        Resync
    }

    fn skip_whitespace(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind != TokenKind::Whitespace {
                break;
            }
            self.source.push_str(&token.text, &self.path.0, token.line);
            self.pos += 1;
        }
    }

    fn emit_current(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            self.source.push_str(&token.text, &self.path.0, token.line);
        }
    }

    fn emit_str(&mut self, text: &str) {
        let line = self.line();
        self.source.push_str(text, &self.path.0, line);
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.line)
    }

    fn error(&mut self, error: PrepperError) {
        let line = self.line();
        self.diagnostics
            .push(Diagnostic::new(self.path.0.clone(), line, error));
    }
}
