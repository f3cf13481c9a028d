use crate::core::java_type::RawTypeName;
use crate::core::member::{Constructor, Field, Method};
use crate::core::signature::{parse_type_declaration_signature, TypeVariable};
use crate::domain::model::{AccessFlags, DecodedClass};
use crate::utils::error::Result;
use std::fmt;

const ACCESS_KEYWORDS: [&str; 12] = [
    "public",
    "private",
    "protected",
    "static",
    "final",
    "synchronized",
    "volatile",
    "transient",
    "native",
    "interface",
    "abstract",
    "strict",
];

/// Access and property bits of a class, field or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const PUBLIC: u16 = 0x0001;
    /// Shares its bit with `transient`; only meaningful on methods.
    pub const VARARGS: u16 = 0x0080;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn has(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    /// Keywords for the set bits, lowest bit first.
    pub fn keywords(self) -> Vec<&'static str> {
        ACCESS_KEYWORDS
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, kw)| *kw)
            .collect()
    }

    pub fn contains_keyword(self, keyword: &str) -> bool {
        self.keywords().contains(&keyword)
    }

    /// Each keyword followed by a space, e.g. `"public static "`.
    pub fn label(self) -> String {
        self.keywords().iter().map(|kw| format!("{} ", kw)).collect()
    }
}

impl From<AccessFlags> for Modifiers {
    fn from(flags: AccessFlags) -> Self {
        Self(flags.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Enum,
    Interface,
    Annotation,
    Primitive,
    Array,
    TypeVariable,
}

impl TypeKind {
    /// Annotation types also carry the interface bit, so they are checked first.
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.has(Modifiers::ANNOTATION) {
            TypeKind::Annotation
        } else if modifiers.has(Modifiers::INTERFACE) {
            TypeKind::Interface
        } else if modifiers.has(Modifiers::ENUM) {
            TypeKind::Enum
        } else {
            TypeKind::Class
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Enum => "enum",
            TypeKind::Interface => "interface",
            TypeKind::Annotation => "@interface",
            TypeKind::Primitive => "primitive",
            TypeKind::Array => "array",
            TypeKind::TypeVariable => "typevar",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A class, enum, interface or annotation type as compiled, before any type arguments
/// are applied.
#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub name: RawTypeName,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub docs: String,
    pub type_variables: Vec<TypeVariable>,
    /// Superclass first, then interfaces, as full type signatures (`L...;`).
    pub super_signatures: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub constructors: Vec<Constructor>,
}

impl ClassDeclaration {
    pub fn from_decoded(decoded: &DecodedClass) -> Result<Self> {
        let modifiers = Modifiers::from(decoded.mods);

        let (type_variables, super_signatures) = match decoded.signature() {
            Some(signature) => {
                let parsed = parse_type_declaration_signature(signature)?;
                (parsed.type_variables, parsed.superclasses)
            }
            None => {
                // the plain superclass/interfaces are short names, normalise them to L...;
                let supers = decoded
                    .superclass
                    .iter()
                    .chain(decoded.interfaces.iter())
                    .map(|name| format!("L{};", name))
                    .collect();
                (Vec::new(), supers)
            }
        };

        let mut methods = Vec::new();
        let mut constructors = Vec::new();
        for m in &decoded.methods {
            match m.name.as_str() {
                "<init>" => constructors.push(Constructor::from_decoded(m)?),
                "<clinit>" => {}
                _ => methods.push(Method::from_decoded(m)?),
            }
        }

        let fields = decoded.fields.iter().map(Field::from_decoded).collect();

        Ok(Self {
            name: RawTypeName::new(&decoded.thisclass),
            kind: TypeKind::from_modifiers(modifiers),
            modifiers,
            docs: decoded.docs.clone(),
            type_variables,
            super_signatures,
            fields,
            methods,
            constructors,
        })
    }

    pub fn short_signature(&self) -> &str {
        self.name.short_signature()
    }
}
