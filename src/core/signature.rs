//! Parsing of JVM generic signatures.
//!
//! Class declarations carry a `Signature` attribute when they declare type variables or
//! extend/implement parameterized types:
//!
//! ```text
//! <T1:Ljava/lang/Object;T3::Ljava/lang/Comparable<TT1;>;>Ljava/util/ArrayList;
//! ```
//!
//! Each type variable is `Name:` followed by an optional class bound and any number of
//! `:`-prefixed interface bounds, so an interface-only variable reads `Name::...`.

use crate::utils::error::{Result, TypeInfoError};
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

pub const OBJECT_SIGNATURE: &str = "Ljava/lang/Object;";

static TYPE_VARIABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[BSIJFDCZV]|L.+?[<;]|T(\w+);").expect("type variable reference pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Primitive(char),
    Class(ClassTypeSignature),
    TypeVariable(String),
    Array(Box<TypeSignature>),
}

/// A class type reference. Nested types are folded into a binary name
/// (`a/b/Outer$Inner`) and keep only the innermost type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSignature {
    pub name: String,
    pub arguments: Vec<TypeArgumentSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgumentSignature {
    Any,
    Extends(TypeSignature),
    Super(TypeSignature),
    Exact(TypeSignature),
}

impl TypeSignature {
    /// Number of array dimensions and the innermost element signature.
    pub fn array_parts(&self) -> (usize, &TypeSignature) {
        let mut dims = 0;
        let mut current = self;
        while let TypeSignature::Array(inner) = current {
            dims += 1;
            current = inner;
        }
        (dims, current)
    }

    pub fn erasure(&self) -> String {
        match self {
            TypeSignature::Primitive(c) => c.to_string(),
            TypeSignature::Class(class) => format!("L{};", class.name),
            TypeSignature::TypeVariable(_) => OBJECT_SIGNATURE.to_string(),
            TypeSignature::Array(inner) => format!("[{}", inner.erasure()),
        }
    }

    pub fn mentions_type_variable(&self) -> bool {
        match self {
            TypeSignature::Primitive(_) => false,
            TypeSignature::TypeVariable(_) => true,
            TypeSignature::Array(inner) => inner.mentions_type_variable(),
            TypeSignature::Class(class) => class.arguments.iter().any(|arg| match arg {
                TypeArgumentSignature::Any => false,
                TypeArgumentSignature::Extends(t)
                | TypeArgumentSignature::Super(t)
                | TypeArgumentSignature::Exact(t) => t.mentions_type_variable(),
            }),
        }
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Primitive(c) => write!(f, "{}", c),
            TypeSignature::Class(class) => write!(f, "{}", class),
            TypeSignature::TypeVariable(name) => write!(f, "T{};", name),
            TypeSignature::Array(inner) => write!(f, "[{}", inner),
        }
    }
}

impl fmt::Display for ClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "<")?;
            for arg in &self.arguments {
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        write!(f, ";")
    }
}

impl fmt::Display for TypeArgumentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgumentSignature::Any => write!(f, "*"),
            TypeArgumentSignature::Extends(t) => write!(f, "+{}", t),
            TypeArgumentSignature::Super(t) => write!(f, "-{}", t),
            TypeArgumentSignature::Exact(t) => write!(f, "{}", t),
        }
    }
}

/// A declared type variable with its bounds, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVariable {
    pub name: String,
    pub bounds: Vec<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub signature: String,
    pub interface: bool,
}

impl TypeVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> String {
        let bounds: String = self.bounds.iter().map(Bound::signature).collect();
        format!("{}:{}", self.name, bounds)
    }

    /// Erasure of the leftmost bound, `Ljava/lang/Object;` when unbounded.
    pub fn erased_signature(&self) -> String {
        self.bounds
            .first()
            .and_then(|b| parse_type_signature(&b.signature).ok())
            .map(|sig| sig.erasure())
            .unwrap_or_else(|| OBJECT_SIGNATURE.to_string())
    }
}

impl Bound {
    pub fn class(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            interface: false,
        }
    }

    pub fn interface(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            interface: true,
        }
    }

    pub fn kind(&self) -> &'static str {
        if self.interface {
            "interface"
        } else {
            "class"
        }
    }

    pub fn signature(&self) -> String {
        if self.interface {
            format!(":{}", self.signature)
        } else {
            self.signature.clone()
        }
    }
}

/// Type variables and supertypes decoded from a class `Signature` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeDeclarationSignature {
    pub type_variables: Vec<TypeVariable>,
    pub superclasses: Vec<String>,
}

impl fmt::Display for TypeDeclarationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_variables(f, &self.type_variables)?;
        for sup in &self.superclasses {
            write!(f, "{}", sup)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodSignature {
    pub type_variables: Vec<TypeVariable>,
    pub parameters: Vec<String>,
    pub return_type: String,
    pub exceptions: Vec<String>,
}

impl MethodSignature {
    pub fn parse(signature: &str) -> Result<Self> {
        let mut reader = SignatureReader::new(signature);
        let type_variables = if reader.peek() == Some(b'<') {
            reader.read_type_variables()?
        } else {
            Vec::new()
        };

        reader.expect(b'(')?;
        let mut parameters = Vec::new();
        loop {
            match reader.peek() {
                Some(b')') => break,
                Some(_) => parameters.push(reader.read_type_text()?.to_string()),
                None => return Err(reader.error("unterminated parameter list")),
            }
        }
        reader.expect(b')')?;
        let return_type = reader.read_type_text()?.to_string();

        let mut exceptions = Vec::new();
        while reader.peek() == Some(b'^') {
            reader.pos += 1;
            exceptions.push(reader.read_type_text()?.to_string());
        }
        reader.finish()?;

        Ok(Self {
            type_variables,
            parameters,
            return_type,
            exceptions,
        })
    }

    pub fn mentions_type_variable(&self) -> bool {
        !self.type_variables.is_empty()
            || self
                .parameters
                .iter()
                .chain(std::iter::once(&self.return_type))
                .filter_map(|sig| parse_type_signature(sig).ok())
                .any(|sig| sig.mentions_type_variable())
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_variables(f, &self.type_variables)?;
        write!(f, "(")?;
        for param in &self.parameters {
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.return_type)?;
        for exception in &self.exceptions {
            write!(f, "^{}", exception)?;
        }
        Ok(())
    }
}

fn write_type_variables(f: &mut fmt::Formatter<'_>, vars: &[TypeVariable]) -> fmt::Result {
    if vars.is_empty() {
        return Ok(());
    }
    write!(f, "<")?;
    for tv in vars {
        write!(f, "{}", tv.signature())?;
    }
    write!(f, ">")
}

/// Parse a class `Signature` attribute into its type variables and supertypes.
pub fn parse_type_declaration_signature(signature: &str) -> Result<TypeDeclarationSignature> {
    let mut reader = SignatureReader::new(signature);
    let type_variables = if reader.peek() == Some(b'<') {
        reader.read_type_variables()?
    } else {
        Vec::new()
    };

    let mut superclasses = Vec::new();
    while !reader.at_end() {
        superclasses.push(reader.read_type_text()?.to_string());
    }

    Ok(TypeDeclarationSignature {
        type_variables,
        superclasses,
    })
}

pub fn parse_type_variables(signature: &str) -> Result<Vec<TypeVariable>> {
    let mut reader = SignatureReader::new(signature);
    let vars = reader.read_type_variables()?;
    reader.finish()?;
    Ok(vars)
}

/// Split concatenated type signatures (`ILjava/lang/String;[TT;*`) into their parts.
pub fn split_type_signature_list(signature: &str) -> Result<Vec<String>> {
    let mut reader = SignatureReader::new(signature);
    let mut types = Vec::new();
    while let Some(c) = reader.peek() {
        let start = reader.pos;
        match c {
            b'*' => reader.pos += 1,
            b'+' | b'-' => {
                reader.pos += 1;
                reader.read_type()?;
            }
            _ => {
                reader.read_type()?;
            }
        }
        types.push(signature[start..reader.pos].to_string());
    }
    Ok(types)
}

pub fn parse_type_signature(signature: &str) -> Result<TypeSignature> {
    let mut reader = SignatureReader::new(signature);
    let ty = reader.read_type()?;
    reader.finish()?;
    Ok(ty)
}

/// Replace `T<name>;` references with whatever `lookup` returns for the name.
/// Class names are skipped, so `Ljava/lang/Thread;` is never taken for a variable.
pub fn substitute_type_variables<F>(signature: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    TYPE_VARIABLE_REFERENCE
        .replace_all(signature, |caps: &Captures| {
            caps.get(1)
                .and_then(|name| lookup(name.as_str()))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

struct SignatureReader<'a> {
    signature: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SignatureReader<'a> {
    fn new(signature: &'a str) -> Self {
        Self {
            signature,
            bytes: signature.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn error(&self, message: impl Into<String>) -> TypeInfoError {
        TypeInfoError::SignatureError {
            signature: self.signature.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!(
                "expected '{}' but found '{}'",
                expected as char, c as char
            ))),
            None => Err(self.error(format!(
                "expected '{}' but reached the end",
                expected as char
            ))),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing characters"))
        }
    }

    fn read_identifier(&mut self, terminators: &[u8]) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if terminators.contains(&c) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.signature[start..self.pos].to_string())
    }

    fn read_type_text(&mut self) -> Result<&'a str> {
        let start = self.pos;
        self.read_type()?;
        Ok(&self.signature[start..self.pos])
    }

    fn read_type(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some(c @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V')) => {
                self.pos += 1;
                Ok(TypeSignature::Primitive(c as char))
            }
            Some(b'[') => {
                self.pos += 1;
                Ok(TypeSignature::Array(Box::new(self.read_type()?)))
            }
            Some(b'L') => self.read_class_type().map(TypeSignature::Class),
            Some(b'T') => {
                self.pos += 1;
                let name = self.read_identifier(&[b';', b'<', b'>'])?;
                self.expect(b';')?;
                Ok(TypeSignature::TypeVariable(name))
            }
            Some(c) => Err(self.error(format!("unexpected '{}' in type signature", c as char))),
            None => Err(self.error("unexpected end of type signature")),
        }
    }

    fn read_class_type(&mut self) -> Result<ClassTypeSignature> {
        self.expect(b'L')?;
        let mut name = self.read_identifier(&[b'<', b';', b'.'])?;
        let mut arguments = Vec::new();
        loop {
            if self.peek() == Some(b'<') {
                arguments = self.read_type_arguments()?;
            }
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    let inner = self.read_identifier(&[b'<', b';', b'.'])?;
                    name.push('$');
                    name.push_str(&inner);
                    arguments.clear();
                }
                Some(b';') => {
                    self.pos += 1;
                    return Ok(ClassTypeSignature { name, arguments });
                }
                Some(c) => {
                    return Err(self.error(format!("unexpected '{}' in class type", c as char)))
                }
                None => return Err(self.error("unterminated class type")),
            }
        }
    }

    fn read_type_arguments(&mut self) -> Result<Vec<TypeArgumentSignature>> {
        self.expect(b'<')?;
        let mut arguments = Vec::new();
        loop {
            let argument = match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'*') => {
                    self.pos += 1;
                    TypeArgumentSignature::Any
                }
                Some(b'+') => {
                    self.pos += 1;
                    TypeArgumentSignature::Extends(self.read_type()?)
                }
                Some(b'-') => {
                    self.pos += 1;
                    TypeArgumentSignature::Super(self.read_type()?)
                }
                Some(_) => TypeArgumentSignature::Exact(self.read_type()?),
                None => return Err(self.error("unterminated type arguments")),
            };
            arguments.push(argument);
        }
        if arguments.is_empty() {
            return Err(self.error("empty type argument list"));
        }
        Ok(arguments)
    }

    fn read_type_variables(&mut self) -> Result<Vec<TypeVariable>> {
        self.expect(b'<')?;
        let mut vars = Vec::new();
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
                None => return Err(self.error("unterminated type variables signature")),
            }

            let mut tv = TypeVariable::new(self.read_identifier(&[b':', b'>'])?);
            self.expect(b':')?;
            // an immediate ':' means there is no class bound, only interface bounds
            if self.peek() != Some(b':') {
                tv.bounds.push(Bound::class(self.read_type_text()?));
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                tv.bounds.push(Bound::interface(self.read_type_text()?));
            }
            vars.push(tv);
        }
        if vars.is_empty() {
            return Err(self.error("empty type variables signature"));
        }
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declaration_without_type_variables() {
        let decl =
            parse_type_declaration_signature("Ljava/util/AbstractList<TE;>;Ljava/util/List<TE;>;")
                .unwrap();
        assert!(decl.type_variables.is_empty());
        assert_eq!(
            decl.superclasses,
            vec!["Ljava/util/AbstractList<TE;>;", "Ljava/util/List<TE;>;"]
        );
    }

    #[test]
    fn test_interface_only_bound_is_marked_interface() {
        let vars = parse_type_variables("<T::Ljava/lang/Comparable;:Ljava/io/Serializable;>").unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "T");
        assert_eq!(
            vars[0].bounds,
            vec![
                Bound::interface("Ljava/lang/Comparable;"),
                Bound::interface("Ljava/io/Serializable;"),
            ]
        );
        assert_eq!(vars[0].bounds[0].kind(), "interface");
        assert_eq!(vars[0].erased_signature(), "Ljava/lang/Comparable;");
    }

    #[test]
    fn test_type_variable_bound_by_another_variable() {
        let vars = parse_type_variables("<K:Ljava/lang/Object;V:TK;>").unwrap();
        assert_eq!(vars[1].bounds, vec![Bound::class("TK;")]);
        assert_eq!(vars[1].signature(), "V:TK;");
        assert_eq!(vars[1].erased_signature(), OBJECT_SIGNATURE);
    }

    #[test]
    fn test_split_type_signature_list() {
        let parts =
            split_type_signature_list("I[[JLjava/util/Map<TK;+Ljava/lang/Number;>;TT;*").unwrap();
        assert_eq!(
            parts,
            vec!["I", "[[J", "Ljava/util/Map<TK;+Ljava/lang/Number;>;", "TT;", "*"]
        );
        assert!(split_type_signature_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_nested_class_type() {
        let sig = parse_type_signature("Ljava/util/Map<TK;TV;>.Entry<TK;TV;>;").unwrap();
        match sig {
            TypeSignature::Class(class) => {
                assert_eq!(class.name, "java/util/Map$Entry");
                assert_eq!(class.arguments.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_array_parts_and_erasure() {
        let sig = parse_type_signature("[[Ljava/util/List<Ljava/lang/String;>;").unwrap();
        let (dims, base) = sig.array_parts();
        assert_eq!(dims, 2);
        assert_eq!(base.to_string(), "Ljava/util/List<Ljava/lang/String;>;");
        assert_eq!(sig.erasure(), "[[Ljava/util/List;");
    }

    #[test]
    fn test_wildcards_render_back() {
        let text = "Ljava/util/Map<*+Ljava/lang/Number;-TT;>;";
        assert_eq!(parse_type_signature(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_method_signature_with_type_variables_and_throws() {
        let sig =
            MethodSignature::parse("<T:Ljava/lang/Object;>([TT;I)Ljava/util/List<TT;>;^Ljava/io/IOException;")
                .unwrap();
        assert_eq!(sig.type_variables.len(), 1);
        assert_eq!(sig.parameters, vec!["[TT;", "I"]);
        assert_eq!(sig.return_type, "Ljava/util/List<TT;>;");
        assert_eq!(sig.exceptions, vec!["Ljava/io/IOException;"]);
        assert!(sig.mentions_type_variable());
        assert_eq!(
            sig.to_string(),
            "<T:Ljava/lang/Object;>([TT;I)Ljava/util/List<TT;>;^Ljava/io/IOException;"
        );
    }

    #[test]
    fn test_plain_descriptor_does_not_mention_type_variables() {
        let sig = MethodSignature::parse("(Ljava/lang/Thread;)V").unwrap();
        assert!(!sig.mentions_type_variable());
    }

    #[test]
    fn test_malformed_signatures_are_errors() {
        assert!(parse_type_variables("<T:Ljava/lang/Object;").is_err());
        assert!(parse_type_signature("Ljava/lang/String").is_err());
        assert!(parse_type_signature("Q").is_err());
        assert!(parse_type_signature("II").is_err());
        assert!(MethodSignature::parse("(I").is_err());

        match parse_type_signature("Ljava/util/List<>;") {
            Err(TypeInfoError::SignatureError { offset, .. }) => assert_eq!(offset, 17),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_substitute_type_variables_skips_class_names() {
        let out = substitute_type_variables("(TT;Ljava/lang/Thread;)Ljava/util/List<TT;>;", |name| {
            (name == "T").then(|| "Ljava/lang/String;".to_string())
        });
        assert_eq!(out, "(Ljava/lang/String;Ljava/lang/Thread;)Ljava/util/List<Ljava/lang/String;>;");
    }
}
