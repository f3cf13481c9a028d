//! Declaration-level reading of Java source files.
//!
//! Compiled classes carry no javadoc and usually no parameter names. When library sources
//! are available (the Android SDK ships them under `sources/<api>`), both are read from
//! the matching `.java` file and copied onto the decoded class.
//!
//! Only declarations are parsed: package, types, fields, methods and constructors. Method
//! bodies, initialisers and initialiser blocks are skipped as balanced token runs.

use crate::core::signature::{parse_type_signature, MethodSignature, TypeSignature};
use crate::domain::model::DecodedClass;
use crate::utils::error::{Result, TypeInfoError};

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
    "sealed",
];

/// A parsed `.java` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Dotted package name, empty for the default package.
    pub package: String,
    pub types: Vec<SourceType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceType {
    pub name: String,
    pub docs: String,
    /// Type variables declared here or by an enclosing type.
    pub type_variables: Vec<String>,
    pub members: Vec<SourceMember>,
    pub types: Vec<SourceType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMember {
    pub kind: MemberKind,
    pub name: String,
    pub docs: String,
    pub type_variables: Vec<String>,
    pub parameters: Vec<SourceParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParameter {
    pub name: String,
    pub ty: SourceTypeName,
}

/// A type as written in source, reduced to its last name segment and array dimensions.
/// Varargs count as one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTypeName {
    pub name: String,
    pub dims: usize,
}

pub fn parse_java_source(source: &str) -> Result<SourceFile> {
    let tokens = Lexer::new(source).lex()?;
    Parser::new(tokens).parse_file()
}

impl SourceFile {
    /// The type for a short signature such as `java/util/Map$Entry`.
    pub fn find_type(&self, short_signature: &str) -> Option<&SourceType> {
        let mut names = short_signature.split('$');
        let top = names.next()?;
        let (package, simple_name) = top.rsplit_once('/').unwrap_or(("", top));
        if package.replace('/', ".") != self.package {
            return None;
        }
        let mut current = self.types.iter().find(|t| t.name == simple_name)?;
        for name in names {
            current = current.types.iter().find(|t| t.name == name)?;
        }
        Some(current)
    }
}

impl SourceType {
    /// Copy javadoc and parameter names onto the compiled form of this type. Fields match
    /// by name; methods and constructors by name and erased parameter types.
    pub fn populate(&self, decoded: &mut DecodedClass) {
        decoded.docs = self.docs.clone();
        for member in &self.members {
            match member.kind {
                MemberKind::Field => {
                    if let Some(field) = decoded.fields.iter_mut().find(|f| f.name == member.name) {
                        field.docs = member.docs.clone();
                    }
                }
                MemberKind::Method | MemberKind::Constructor => {
                    let name = match member.kind {
                        MemberKind::Constructor => "<init>",
                        _ => member.name.as_str(),
                    };
                    let found = decoded.methods.iter_mut().find(|m| {
                        m.name == name && member.matches_descriptor(&m.sig, &self.type_variables)
                    });
                    if let Some(method) = found {
                        method.docs = member.docs.clone();
                        method.pnames = member.parameters.iter().map(|p| p.name.clone()).collect();
                    }
                }
            }
        }
    }
}

impl SourceMember {
    fn field(name: &str, docs: String) -> Self {
        Self {
            kind: MemberKind::Field,
            name: name.to_string(),
            docs,
            type_variables: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn matches_descriptor(&self, descriptor: &str, owner_type_variables: &[String]) -> bool {
        let Ok(signature) = MethodSignature::parse(descriptor) else {
            return false;
        };
        let is_type_variable = |name: &str| {
            self.type_variables
                .iter()
                .chain(owner_type_variables)
                .any(|v| v == name)
        };
        signature.parameters.len() == self.parameters.len()
            && signature
                .parameters
                .iter()
                .zip(&self.parameters)
                .all(|(sig, param)| param.ty.matches(sig, &is_type_variable))
    }
}

impl SourceTypeName {
    /// Whether an erased descriptor type can be the compiled form of this source type.
    /// Type variables erase to their bound, so any reference type of the same
    /// dimensions is accepted for them.
    pub fn matches(&self, descriptor: &str, is_type_variable: &dyn Fn(&str) -> bool) -> bool {
        let Ok(parsed) = parse_type_signature(descriptor) else {
            return false;
        };
        let (dims, element) = parsed.array_parts();
        if dims != self.dims {
            return false;
        }
        match element {
            TypeSignature::Primitive(c) => primitive_keyword(*c) == Some(self.name.as_str()),
            TypeSignature::Class(class) => {
                is_type_variable(&self.name)
                    || class.name.rsplit(|c: char| c == '/' || c == '$').next() == Some(self.name.as_str())
            }
            TypeSignature::TypeVariable(_) => true,
            TypeSignature::Array(_) => false,
        }
    }
}

fn primitive_keyword(descriptor: char) -> Option<&'static str> {
    Some(match descriptor {
        'B' => "byte",
        'C' => "char",
        'D' => "double",
        'F' => "float",
        'I' => "int",
        'J' => "long",
        'S' => "short",
        'Z' => "boolean",
        'V' => "void",
        _ => return None,
    })
}

/// Javadoc text without the comment delimiters and leading `*` margins.
fn clean_javadoc(comment: &str) -> String {
    let body = comment.strip_prefix("/**").unwrap_or(comment);
    let body = body.strip_suffix("*/").unwrap_or(body);
    body.lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    /// String, character and numeric literals.
    Literal,
    Symbol(u8),
    Eof,
}

#[derive(Debug, Clone, Copy)]
struct SpannedToken<'a> {
    token: Token<'a>,
    position: usize,
    /// Javadoc comment directly before the token.
    docs: Option<&'a str>,
}

struct Lexer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    fn lex(mut self) -> Result<Vec<SpannedToken<'a>>> {
        let bytes = self.input.as_bytes();
        let mut tokens = Vec::new();
        let mut docs = None;

        while let Some(&ch) = bytes.get(self.offset) {
            let start = self.offset;
            let next = bytes.get(start + 1).copied();
            let token = match ch {
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' => {
                    self.offset += 1;
                    continue;
                }
                b'/' if next == Some(b'/') => {
                    self.consume_while(bytes, |b| b != b'\n');
                    continue;
                }
                b'/' if next == Some(b'*') => {
                    let end = self.input[start + 2..]
                        .find("*/")
                        .ok_or_else(|| TypeInfoError::source_parse(start, "unterminated comment"))?;
                    self.offset = start + 2 + end + 2;
                    let comment = &self.input[start..self.offset];
                    if comment.starts_with("/**") && comment.len() > 4 {
                        docs = Some(comment);
                    }
                    continue;
                }
                b'"' if self.input[start..].starts_with("\"\"\"") => {
                    let end = self.input[start + 3..]
                        .find("\"\"\"")
                        .ok_or_else(|| TypeInfoError::source_parse(start, "unterminated text block"))?;
                    self.offset = start + 3 + end + 3;
                    Token::Literal
                }
                b'"' | b'\'' => {
                    self.skip_quoted(bytes, ch)?;
                    Token::Literal
                }
                b'0'..=b'9' => {
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');
                    Token::Literal
                }
                b if is_identifier_byte(b) => {
                    self.consume_while(bytes, |b| is_identifier_byte(b) || b.is_ascii_digit());
                    Token::Ident(&self.input[start..self.offset])
                }
                _ => {
                    self.offset += 1;
                    Token::Symbol(ch)
                }
            };
            tokens.push(SpannedToken {
                token,
                position: start,
                docs: docs.take(),
            });
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
            docs: None,
        });
        Ok(tokens)
    }

    fn skip_quoted(&mut self, bytes: &[u8], quote: u8) -> Result<()> {
        let start = self.offset;
        self.offset += 1;
        while let Some(&b) = bytes.get(self.offset) {
            self.offset += 1;
            match b {
                b'\\' => self.offset += 1,
                b'\n' => break,
                b if b == quote => return Ok(()),
                _ => {}
            }
        }
        Err(TypeInfoError::source_parse(start, "unterminated literal"))
    }

    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }
}

/// Non-ASCII bytes are taken as identifier text so multi-byte names stay whole.
fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

enum Declaration {
    Type(SourceType),
    Members(Vec<SourceMember>),
    Skipped,
}

struct Parser<'a> {
    tokens: Vec<SpannedToken<'a>>,
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<SpannedToken<'a>>) -> Self {
        Self { tokens, index: 0 }
    }

    fn parse_file(&mut self) -> Result<SourceFile> {
        let mut package = String::new();
        let mut types = Vec::new();
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Symbol(b';') => self.advance(),
                Token::Ident("package") => {
                    self.advance();
                    package = self.qualified_name()?;
                    self.expect_symbol(b';')?;
                }
                Token::Ident("import") => self.skip_past(b';')?,
                _ => {
                    if let Declaration::Type(ty) = self.parse_declaration("", &[])? {
                        types.push(ty);
                    }
                }
            }
        }
        Ok(SourceFile { package, types })
    }

    fn parse_declaration(&mut self, owner: &str, outer_type_variables: &[String]) -> Result<Declaration> {
        let start = self.index;
        self.skip_modifiers()?;
        let docs = self.docs_since(start);

        match self.peek() {
            Token::Symbol(b'{') => {
                self.skip_balanced(b'{', b'}')?;
                Ok(Declaration::Skipped)
            }
            Token::Symbol(b';') => {
                self.advance();
                Ok(Declaration::Skipped)
            }
            Token::Ident("class" | "interface" | "enum" | "record") => {
                self.parse_type(docs, outer_type_variables).map(Declaration::Type)
            }
            Token::Symbol(b'@') => {
                self.advance();
                self.parse_type(docs, outer_type_variables).map(Declaration::Type)
            }
            _ => self.parse_members(owner, docs).map(Declaration::Members),
        }
    }

    fn parse_type(&mut self, docs: String, outer_type_variables: &[String]) -> Result<SourceType> {
        let keyword = self.expect_ident()?;
        let name = self.expect_ident()?.to_string();
        let mut type_variables = outer_type_variables.to_vec();
        if self.peek() == Token::Symbol(b'<') {
            type_variables.extend(self.parse_type_parameters()?);
        }

        // extends, implements, permits and record components
        loop {
            match self.peek() {
                Token::Symbol(b'{') => break,
                Token::Symbol(b'(') => self.skip_balanced(b'(', b')')?,
                Token::Eof => return Err(self.error("expected type body")),
                _ => self.advance(),
            }
        }
        self.advance();

        let mut ty = SourceType {
            name,
            docs,
            type_variables,
            members: Vec::new(),
            types: Vec::new(),
        };
        if keyword == "enum" {
            self.parse_enum_constants(&mut ty.members)?;
        }
        while !self.matches(Token::Symbol(b'}')) {
            if self.peek() == Token::Eof {
                return Err(self.error("unterminated type body"));
            }
            match self.parse_declaration(&ty.name, &ty.type_variables)? {
                Declaration::Type(inner) => ty.types.push(inner),
                Declaration::Members(members) => ty.members.extend(members),
                Declaration::Skipped => {}
            }
        }
        Ok(ty)
    }

    fn parse_enum_constants(&mut self, members: &mut Vec<SourceMember>) -> Result<()> {
        loop {
            match self.peek() {
                Token::Symbol(b';') => {
                    self.advance();
                    return Ok(());
                }
                Token::Symbol(b'}') => return Ok(()),
                Token::Symbol(b',') => self.advance(),
                Token::Eof => return Err(self.error("unterminated enum body")),
                _ => {
                    let start = self.index;
                    self.skip_modifiers()?;
                    let docs = self.docs_since(start);
                    let name = self.expect_ident()?;
                    if self.peek() == Token::Symbol(b'(') {
                        self.skip_balanced(b'(', b')')?;
                    }
                    if self.peek() == Token::Symbol(b'{') {
                        self.skip_balanced(b'{', b'}')?;
                    }
                    members.push(SourceMember::field(name, docs));
                }
            }
        }
    }

    fn parse_members(&mut self, owner: &str, docs: String) -> Result<Vec<SourceMember>> {
        let mut type_variables = Vec::new();
        if self.peek() == Token::Symbol(b'<') {
            type_variables = self.parse_type_parameters()?;
            self.skip_modifiers()?;
        }

        if self.peek() == Token::Ident(owner) && self.peek_at(1) == Token::Symbol(b'(') {
            self.advance();
            let parameters = self.parse_parameters()?;
            self.skip_member_tail()?;
            return Ok(vec![SourceMember {
                kind: MemberKind::Constructor,
                name: owner.to_string(),
                docs,
                type_variables,
                parameters,
            }]);
        }

        self.parse_type_name()?;
        let name = self.expect_ident()?;
        if self.peek() == Token::Symbol(b'(') {
            let parameters = self.parse_parameters()?;
            self.skip_member_tail()?;
            return Ok(vec![SourceMember {
                kind: MemberKind::Method,
                name: name.to_string(),
                docs,
                type_variables,
                parameters,
            }]);
        }

        let mut fields = vec![SourceMember::field(name, docs.clone())];
        loop {
            match self.peek() {
                Token::Symbol(b';') => {
                    self.advance();
                    return Ok(fields);
                }
                Token::Symbol(b',') => {
                    self.advance();
                    let name = self.expect_ident()?;
                    fields.push(SourceMember::field(name, docs.clone()));
                }
                Token::Symbol(b'=') => self.skip_initializer()?,
                Token::Symbol(b'[') => self.skip_balanced(b'[', b']')?,
                _ => return Err(self.error("expected field declaration")),
            }
        }
    }

    fn parse_type_parameters(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut depth = 0usize;
        let mut expect_name = true;
        loop {
            match self.peek() {
                Token::Symbol(b'<') => {
                    depth += 1;
                    expect_name = depth == 1;
                }
                Token::Symbol(b'>') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(names);
                    }
                }
                Token::Symbol(b',') if depth == 1 => expect_name = true,
                Token::Symbol(b'@') => {
                    self.skip_annotation()?;
                    continue;
                }
                Token::Ident(name) if expect_name => {
                    names.push(name.to_string());
                    expect_name = false;
                }
                Token::Eof => return Err(self.error("unterminated type parameters")),
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_parameters(&mut self) -> Result<Vec<SourceParameter>> {
        self.expect_symbol(b'(')?;
        let mut parameters = Vec::new();
        while !self.matches(Token::Symbol(b')')) {
            let mut ty = self.parse_type_name()?;
            let name = self.expect_ident()?;
            while self.peek() == Token::Symbol(b'[') && self.peek_at(1) == Token::Symbol(b']') {
                self.advance();
                self.advance();
                ty.dims += 1;
            }
            // explicit receiver parameter
            if name != "this" {
                parameters.push(SourceParameter {
                    name: name.to_string(),
                    ty,
                });
            }
            if !self.matches(Token::Symbol(b',')) && self.peek() != Token::Symbol(b')') {
                return Err(self.error("expected ',' or ')' in parameter list"));
            }
        }
        Ok(parameters)
    }

    fn parse_type_name(&mut self) -> Result<SourceTypeName> {
        self.skip_modifiers()?;
        let mut name = self.expect_ident()?;
        loop {
            match self.peek() {
                Token::Symbol(b'<') => self.skip_balanced(b'<', b'>')?,
                Token::Symbol(b'.') if matches!(self.peek_at(1), Token::Ident(_)) => {
                    self.advance();
                    name = self.expect_ident()?;
                }
                Token::Symbol(b'.') if self.peek_at(1) == Token::Symbol(b'@') => {
                    self.advance();
                    self.skip_annotation()?;
                }
                _ => break,
            }
        }

        let mut dims = 0;
        loop {
            if self.peek() == Token::Symbol(b'[') && self.peek_at(1) == Token::Symbol(b']') {
                self.advance();
                self.advance();
                dims += 1;
            } else if (0..3).all(|i| self.peek_at(i) == Token::Symbol(b'.')) {
                (0..3).for_each(|_| self.advance());
                dims += 1;
            } else if self.peek() == Token::Symbol(b'@') {
                self.skip_annotation()?;
            } else {
                break;
            }
        }
        Ok(SourceTypeName {
            name: name.to_string(),
            dims,
        })
    }

    /// Modifiers and annotations in any order. Stops at `@interface`.
    fn skip_modifiers(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Token::Ident(word) if MODIFIERS.contains(&word) => self.advance(),
                Token::Ident("non")
                    if self.peek_at(1) == Token::Symbol(b'-')
                        && self.peek_at(2) == Token::Ident("sealed") =>
                {
                    (0..3).for_each(|_| self.advance());
                }
                Token::Symbol(b'@') if self.peek_at(1) != Token::Ident("interface") => {
                    self.skip_annotation()?
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_annotation(&mut self) -> Result<()> {
        self.expect_symbol(b'@')?;
        self.qualified_name()?;
        if self.peek() == Token::Symbol(b'(') {
            self.skip_balanced(b'(', b')')?;
        }
        Ok(())
    }

    /// Throws clause, annotation defaults and the body or `;` that ends a method.
    fn skip_member_tail(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Token::Symbol(b';') => {
                    self.advance();
                    return Ok(());
                }
                Token::Symbol(b'{') => return self.skip_balanced(b'{', b'}'),
                Token::Symbol(b'(') => self.skip_balanced(b'(', b')')?,
                Token::Eof => return Err(self.error("unterminated method declaration")),
                _ => self.advance(),
            }
        }
    }

    /// Skips `= expr` up to the `;` or the `,` that starts the next declarator.
    fn skip_initializer(&mut self) -> Result<()> {
        self.expect_symbol(b'=')?;
        loop {
            match self.peek() {
                Token::Symbol(b';') => return Ok(()),
                Token::Symbol(b',') if self.starts_declarator(1) => return Ok(()),
                Token::Symbol(b'(') => self.skip_balanced(b'(', b')')?,
                Token::Symbol(b'{') => self.skip_balanced(b'{', b'}')?,
                Token::Symbol(b'[') => self.skip_balanced(b'[', b']')?,
                Token::Eof => return Err(self.error("unterminated field initializer")),
                _ => self.advance(),
            }
        }
    }

    /// A comma inside `new HashMap<K, V>()` is not followed by `name =`, `name,` or `name;`.
    fn starts_declarator(&self, offset: usize) -> bool {
        matches!(self.peek_at(offset), Token::Ident(_))
            && matches!(
                self.peek_at(offset + 1),
                Token::Symbol(b'=' | b',' | b';' | b'[')
            )
    }

    fn skip_balanced(&mut self, open: u8, close: u8) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Symbol(b) if b == open => depth += 1,
                Token::Symbol(b) if b == close => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                Token::Eof => return Err(self.error(format!("unbalanced '{}'", open as char))),
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_past(&mut self, symbol: u8) -> Result<()> {
        while !self.matches(Token::Symbol(symbol)) {
            if self.peek() == Token::Eof {
                return Err(self.error(format!("expected '{}'", symbol as char)));
            }
            self.advance();
        }
        Ok(())
    }

    fn qualified_name(&mut self) -> Result<String> {
        let mut name = self.expect_ident()?.to_string();
        while self.peek() == Token::Symbol(b'.') && matches!(self.peek_at(1), Token::Ident(_)) {
            self.advance();
            name.push('.');
            name.push_str(self.expect_ident()?);
        }
        Ok(name)
    }

    fn docs_since(&self, start: usize) -> String {
        self.tokens[start..=self.index]
            .iter()
            .find_map(|t| t.docs)
            .map(clean_javadoc)
            .unwrap_or_default()
    }

    fn expect_ident(&mut self) -> Result<&'a str> {
        match self.peek() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn expect_symbol(&mut self, symbol: u8) -> Result<()> {
        if self.matches(Token::Symbol(symbol)) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", symbol as char)))
        }
    }

    fn matches(&mut self, token: Token<'a>) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Token<'a> {
        self.tokens[self.index].token
    }

    fn peek_at(&self, offset: usize) -> Token<'a> {
        self.tokens
            .get(self.index + offset)
            .map_or(Token::Eof, |t| t.token)
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> TypeInfoError {
        let found = match self.peek() {
            Token::Ident(name) => name.to_string(),
            Token::Literal => "literal".to_string(),
            Token::Symbol(b) => (b as char).to_string(),
            Token::Eof => "end of input".to_string(),
        };
        TypeInfoError::source_parse(
            self.tokens[self.index].position,
            format!("{}, found {}", message.into(), found),
        )
    }
}
