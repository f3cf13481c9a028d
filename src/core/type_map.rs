use crate::core::declaration::ClassDeclaration;
use crate::core::java_type::{
    ArrayType, ClassType, JavaType, PrimitiveType, TypeArgument, TypeVariableType, UnresolvedType,
    WildcardKind, WildcardType,
};
use crate::core::signature::{
    parse_type_signature, TypeArgumentSignature, TypeSignature, TypeVariable,
};
use crate::domain::model::DecodedClass;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

const OBJECT_TYPE: &str = "java/lang/Object";

/// A type variable name as seen from a method or class body.
#[derive(Debug, Clone, Copy)]
pub enum ScopedVariable<'a> {
    Declared(&'a TypeVariable),
    Bound(&'a TypeArgument),
}

/// The type variables in effect while resolving a signature. Method variables shadow
/// class variables of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScope<'a> {
    method_variables: &'a [TypeVariable],
    class_variables: &'a [TypeVariable],
    class_arguments: &'a [TypeArgument],
}

impl<'a> TypeScope<'a> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_class(variables: &'a [TypeVariable], arguments: &'a [TypeArgument]) -> Self {
        Self {
            method_variables: &[],
            class_variables: variables,
            class_arguments: arguments,
        }
    }

    pub fn with_method(self, method_variables: &'a [TypeVariable]) -> Self {
        Self {
            method_variables,
            ..self
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ScopedVariable<'a>> {
        if let Some(tv) = self.method_variables.iter().find(|tv| tv.name == name) {
            return Some(ScopedVariable::Declared(tv));
        }
        if !self.class_arguments.is_empty() {
            return self
                .class_arguments
                .iter()
                .find(|arg| arg.variable.name == name)
                .map(ScopedVariable::Bound);
        }
        self.class_variables
            .iter()
            .find(|tv| tv.name == name)
            .map(ScopedVariable::Declared)
    }
}

/// Loaded class types keyed by short signature (`java/util/List`).
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    types: HashMap<String, ClassType>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ty: ClassType) {
        self.types.insert(ty.short_signature(), ty);
    }

    pub fn insert_declaration(&mut self, declaration: ClassDeclaration) -> ClassType {
        let ty = ClassType::new(Arc::new(declaration));
        self.insert(ty.clone());
        ty
    }

    /// Add every decodable class; the ones whose signatures do not parse are skipped
    /// with a warning. Returns the number added.
    pub fn extend_from_decoded<I>(&mut self, classes: I) -> usize
    where
        I: IntoIterator<Item = DecodedClass>,
    {
        let mut added = 0;
        for decoded in classes {
            match ClassDeclaration::from_decoded(&decoded) {
                Ok(declaration) => {
                    self.insert_declaration(declaration);
                    added += 1;
                }
                Err(e) => tracing::warn!("Skipping type {}: {}", decoded.thisclass, e),
            }
        }
        added
    }

    pub fn get(&self, short_signature: &str) -> Option<&ClassType> {
        self.types.get(short_signature)
    }

    /// Look up a type by a name written the Java way (`java.util.Map.Entry`) or as a short
    /// signature. Trailing dotted segments are tried as nested types, innermost first.
    pub fn find_by_name(&self, name: &str) -> Option<&ClassType> {
        let mut candidate = name.replace('.', "/");
        loop {
            if let Some(ty) = self.types.get(&candidate) {
                return Some(ty);
            }
            let split = candidate.rfind('/')?;
            candidate.replace_range(split..=split, "$");
        }
    }

    pub fn contains(&self, short_signature: &str) -> bool {
        self.types.contains_key(short_signature)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassType> {
        self.types.values()
    }

    pub fn packages(&self) -> BTreeSet<String> {
        self.types
            .values()
            .map(|t| t.package_name().to_string())
            .collect()
    }

    pub fn object_type(&self) -> JavaType {
        match self.types.get(OBJECT_TYPE) {
            Some(object) => JavaType::Class(object.clone()),
            None => JavaType::Unresolved(UnresolvedType::new(OBJECT_TYPE)),
        }
    }

    /// Resolve a type signature to a type. Both full (`Ljava/lang/String;`) and short
    /// (`java/lang/String`, `java/util/List<Ljava/lang/String;>`) forms are accepted.
    /// Anything that cannot be found becomes [`JavaType::Unresolved`].
    pub fn resolve(&self, signature: &str, scope: &TypeScope<'_>) -> JavaType {
        let parsed = parse_type_signature(signature)
            .or_else(|_| parse_type_signature(&format!("L{};", signature)));
        match parsed {
            Ok(sig) => self.resolve_signature(&sig, scope),
            Err(e) => {
                tracing::debug!("Unparseable type signature '{}': {}", signature, e);
                JavaType::Unresolved(UnresolvedType::new(signature))
            }
        }
    }

    pub fn resolve_signature(&self, signature: &TypeSignature, scope: &TypeScope<'_>) -> JavaType {
        match signature {
            TypeSignature::Primitive(c) => match PrimitiveType::from_signature(*c) {
                Some(p) => JavaType::Primitive(p),
                None => JavaType::Unresolved(UnresolvedType::new(&c.to_string())),
            },
            TypeSignature::Array(_) => {
                let (dims, base) = signature.array_parts();
                JavaType::Array(ArrayType::new(self.resolve_signature(base, scope), dims))
            }
            TypeSignature::TypeVariable(name) => match scope.lookup(name) {
                Some(ScopedVariable::Bound(arg)) => arg.ty.clone(),
                Some(ScopedVariable::Declared(tv)) => {
                    JavaType::TypeVariable(TypeVariableType::new(tv.clone()))
                }
                // TODO: look through enclosing types before falling back to Object
                None => self.object_type(),
            },
            TypeSignature::Class(class) => {
                let Some(raw) = self.types.get(&class.name) else {
                    return JavaType::Unresolved(UnresolvedType::new(&class.name));
                };
                if class.arguments.is_empty() {
                    return JavaType::Class(raw.clone());
                }
                let arguments = class
                    .arguments
                    .iter()
                    .map(|arg| self.resolve_argument(arg, scope))
                    .collect();
                JavaType::Class(raw.specialise(arguments, self))
            }
        }
    }

    fn resolve_argument(&self, argument: &TypeArgumentSignature, scope: &TypeScope<'_>) -> JavaType {
        match argument {
            TypeArgumentSignature::Any => JavaType::Wildcard(WildcardType::unbounded()),
            TypeArgumentSignature::Extends(t) => JavaType::Wildcard(WildcardType::bounded(
                WildcardKind::Extends,
                self.resolve_signature(t, scope),
            )),
            TypeArgumentSignature::Super(t) => JavaType::Wildcard(WildcardType::bounded(
                WildcardKind::Super,
                self.resolve_signature(t, scope),
            )),
            TypeArgumentSignature::Exact(t) => self.resolve_signature(t, scope),
        }
    }
}
