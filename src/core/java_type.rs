use crate::core::declaration::{ClassDeclaration, Modifiers, TypeKind};
use crate::core::member::{Constructor, Field, Method};
use crate::core::signature::{TypeVariable, OBJECT_SIGNATURE};
use crate::core::type_map::{TypeMap, TypeScope};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Name parts of a binary class name such as `java/util/Map$Entry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawTypeName {
    short_signature: String,
    package_name: String,
    dotted_type_name: String,
    simple_type_name: String,
}

impl RawTypeName {
    pub fn new(short_signature: &str) -> Self {
        let (package, name) = match short_signature.rfind('/') {
            Some(i) => (&short_signature[..i], &short_signature[i + 1..]),
            None => ("", short_signature),
        };
        let simple = name.rsplit('$').next().unwrap_or(name);
        Self {
            short_signature: short_signature.to_string(),
            package_name: package.replace('/', "."),
            dotted_type_name: name.replace('$', "."),
            simple_type_name: simple.to_string(),
        }
    }

    /// `java/util/Map$Entry`
    pub fn short_signature(&self) -> &str {
        &self.short_signature
    }

    /// `java.util`
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// `Entry`
    pub fn simple_type_name(&self) -> &str {
        &self.simple_type_name
    }

    /// `Map.Entry`
    pub fn dotted_type_name(&self) -> &str {
        &self.dotted_type_name
    }

    /// `java.util.Map.Entry`
    pub fn fully_dotted_raw_name(&self) -> String {
        self.short_signature.replace(['/', '$'], ".")
    }

    /// `Ljava/util/Map$Entry;`
    pub fn type_signature(&self) -> String {
        format!("L{};", self.short_signature)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    Long,
    Short,
    Byte,
    Float,
    Double,
    Char,
    Boolean,
    Void,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 9] = [
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Short,
        PrimitiveType::Byte,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::Char,
        PrimitiveType::Boolean,
        PrimitiveType::Void,
    ];

    pub fn signature(self) -> char {
        match self {
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Short => 'S',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
            PrimitiveType::Char => 'C',
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Void => 'V',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Short => "short",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Char => "char",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Void => "void",
        }
    }

    pub fn from_signature(signature: char) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.signature() == signature)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_primitive_type_name(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    base: Box<JavaType>,
    dims: usize,
}

impl ArrayType {
    /// Nested arrays are flattened, so `base` is never itself an array.
    pub fn new(base: JavaType, dims: usize) -> Self {
        match base {
            JavaType::Array(inner) => Self {
                base: inner.base,
                dims: inner.dims + dims,
            },
            base => Self {
                base: Box::new(base),
                dims,
            },
        }
    }

    pub fn base(&self) -> &JavaType {
        &self.base
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn element_type(&self) -> JavaType {
        self.strip_dimensions(1)
            .unwrap_or_else(|| JavaType::Array(self.clone()))
    }

    /// The type left after removing `count` dimensions, if there are that many.
    pub fn strip_dimensions(&self, count: usize) -> Option<JavaType> {
        match self.dims.checked_sub(count)? {
            0 => Some((*self.base).clone()),
            remaining => Some(JavaType::Array(ArrayType {
                base: self.base.clone(),
                dims: remaining,
            })),
        }
    }

    fn brackets(&self) -> String {
        "[]".repeat(self.dims)
    }

    fn prefix(&self) -> String {
        "[".repeat(self.dims)
    }
}

/// A declared type variable bound to a concrete type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeArgument {
    pub variable: TypeVariable,
    pub ty: JavaType,
}

impl TypeArgument {
    pub fn label(&self) -> String {
        self.ty.label()
    }

    pub fn type_signature(&self) -> String {
        self.ty.type_signature()
    }
}

/// A class, enum, interface or annotation type, optionally specialised with type
/// arguments. Cloning is cheap: the declaration is shared.
#[derive(Debug, Clone)]
pub struct ClassType {
    declaration: Arc<ClassDeclaration>,
    type_arguments: Vec<TypeArgument>,
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.short_signature() == other.short_signature()
    }
}

impl ClassType {
    pub fn new(declaration: Arc<ClassDeclaration>) -> Self {
        Self {
            declaration,
            type_arguments: Vec::new(),
        }
    }

    pub fn declaration(&self) -> &ClassDeclaration {
        &self.declaration
    }

    pub fn name(&self) -> &RawTypeName {
        &self.declaration.name
    }

    pub fn package_name(&self) -> &str {
        self.declaration.name.package_name()
    }

    pub fn kind(&self) -> TypeKind {
        self.declaration.kind
    }

    pub fn modifiers(&self) -> Modifiers {
        self.declaration.modifiers
    }

    pub fn docs(&self) -> &str {
        &self.declaration.docs
    }

    pub fn fields(&self) -> &[Field] {
        &self.declaration.fields
    }

    pub fn methods(&self) -> &[Method] {
        &self.declaration.methods
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.declaration.constructors
    }

    pub fn type_variables(&self) -> &[TypeVariable] {
        &self.declaration.type_variables
    }

    pub fn type_arguments(&self) -> &[TypeArgument] {
        &self.type_arguments
    }

    pub fn is_specialised(&self) -> bool {
        !self.type_arguments.is_empty()
    }

    /// `java/util/List<Ljava/lang/String;>` for a specialised type.
    pub fn short_signature(&self) -> String {
        format!(
            "{}{}",
            self.declaration.name.short_signature(),
            self.arguments_text(TypeArgument::type_signature, "")
        )
    }

    pub fn raw_type_signature(&self) -> String {
        self.declaration.name.type_signature()
    }

    pub fn type_signature(&self) -> String {
        format!("L{};", self.short_signature())
    }

    pub fn simple_type_name(&self) -> &str {
        self.declaration.name.simple_type_name()
    }

    pub fn dotted_type_name(&self) -> &str {
        self.declaration.name.dotted_type_name()
    }

    pub fn fully_dotted_raw_name(&self) -> String {
        self.declaration.name.fully_dotted_raw_name()
    }

    pub fn fully_dotted_type_name(&self) -> String {
        format!(
            "{}{}",
            self.fully_dotted_raw_name(),
            self.arguments_text(|arg| arg.ty.fully_dotted_type_name(), ",")
        )
    }

    pub fn label(&self) -> String {
        format!(
            "{}{}",
            self.simple_type_name(),
            self.arguments_text(TypeArgument::label, ",")
        )
    }

    fn arguments_text<F>(&self, format: F, separator: &str) -> String
    where
        F: Fn(&TypeArgument) -> String,
    {
        if self.type_arguments.is_empty() {
            return String::new();
        }
        let args: Vec<String> = self.type_arguments.iter().map(format).collect();
        format!("<{}>", args.join(separator))
    }

    /// Type variables visible inside this type: the bound arguments once specialised,
    /// otherwise the declared variables.
    pub fn scope(&self) -> TypeScope<'_> {
        TypeScope::for_class(&self.declaration.type_variables, &self.type_arguments)
    }

    /// Bind each declared type variable to the matching entry of `types`; variables
    /// without an entry become `java.lang.Object`.
    pub fn specialise(&self, types: Vec<JavaType>, type_map: &TypeMap) -> ClassType {
        let mut types = types.into_iter();
        let type_arguments = self
            .declaration
            .type_variables
            .iter()
            .map(|tv| TypeArgument {
                variable: tv.clone(),
                ty: types.next().unwrap_or_else(|| type_map.object_type()),
            })
            .collect();
        ClassType {
            declaration: Arc::clone(&self.declaration),
            type_arguments,
        }
    }

    pub fn resolve_type(
        &self,
        signature: &str,
        method_variables: &[TypeVariable],
        types: &TypeMap,
    ) -> JavaType {
        types.resolve(signature, &self.scope().with_method(method_variables))
    }

    pub fn supers(&self, types: &TypeMap) -> Vec<JavaType> {
        self.declaration
            .super_signatures
            .iter()
            .map(|sig| self.resolve_type(sig, &[], types))
            .collect()
    }

    /// Fields and methods called `name` declared here or in any supertype, searched
    /// breadth-first. Methods already found with the same signature are skipped.
    pub fn find_decls_by_name(&self, name: &str, types: &TypeMap) -> DeclarationsByName {
        let mut found = DeclarationsByName::default();
        let mut queue = VecDeque::from([self.clone()]);
        let mut done = HashSet::new();
        let mut method_signatures = HashSet::new();

        while let Some(ty) = queue.pop_front() {
            if !done.insert(ty.short_signature()) {
                continue;
            }
            found.fields.extend(
                ty.fields()
                    .iter()
                    .filter(|f| f.name == name)
                    .map(|f| Member::new(&ty, f.clone())),
            );
            for m in ty.methods().iter().filter(|m| m.name == name) {
                if method_signatures.insert(m.method_signature(&ty)) {
                    found.methods.push(Member::new(&ty, m.clone()));
                }
            }
            queue.extend(ty.supers(types).into_iter().filter_map(|s| match s {
                JavaType::Class(class) => Some(class),
                _ => None,
            }));
        }
        found
    }
}

/// A member paired with the (possibly specialised) type it was found on.
#[derive(Debug, Clone)]
pub struct Member<T> {
    pub owner: ClassType,
    pub member: T,
}

impl<T> Member<T> {
    fn new(owner: &ClassType, member: T) -> Self {
        Self {
            owner: owner.clone(),
            member,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeclarationsByName {
    pub fields: Vec<Member<Field>>,
    pub methods: Vec<Member<Method>>,
}

/// A type variable that has not been bound to an argument.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeVariableType {
    pub variable: TypeVariable,
}

impl TypeVariableType {
    pub fn new(variable: TypeVariable) -> Self {
        Self { variable }
    }

    pub fn name(&self) -> &str {
        &self.variable.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardKind {
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WildcardType {
    pub bound: Option<(WildcardKind, Box<JavaType>)>,
}

impl WildcardType {
    pub fn unbounded() -> Self {
        Self { bound: None }
    }

    pub fn bounded(kind: WildcardKind, ty: JavaType) -> Self {
        Self {
            bound: Some((kind, Box::new(ty))),
        }
    }

    pub fn bound_type(&self) -> Option<&JavaType> {
        self.bound.as_ref().map(|(_, ty)| ty.as_ref())
    }
}

/// A reference to a class that is not in the type map.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedType {
    name: RawTypeName,
}

impl UnresolvedType {
    /// Accepts `Lpkg/Name;` or `pkg/Name`.
    pub fn new(signature: &str) -> Self {
        let short = signature
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .unwrap_or(signature);
        Self {
            name: RawTypeName::new(short),
        }
    }

    pub fn name(&self) -> &RawTypeName {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JavaType {
    Primitive(PrimitiveType),
    Array(ArrayType),
    Class(ClassType),
    TypeVariable(TypeVariableType),
    Wildcard(WildcardType),
    Unresolved(UnresolvedType),
    /// The type of the `null` literal, used when reifying call arguments.
    Null,
}

impl JavaType {
    pub fn type_kind(&self) -> TypeKind {
        match self {
            JavaType::Primitive(_) => TypeKind::Primitive,
            JavaType::Array(_) => TypeKind::Array,
            JavaType::Class(c) => c.kind(),
            JavaType::TypeVariable(_) | JavaType::Wildcard(_) => TypeKind::TypeVariable,
            JavaType::Unresolved(_) | JavaType::Null => TypeKind::Class,
        }
    }

    /// Single identifier name, e.g. `Entry` for `java.util.Map.Entry`.
    pub fn simple_type_name(&self) -> String {
        match self {
            JavaType::Primitive(p) => p.name().to_string(),
            JavaType::Array(a) => format!("{}{}", a.base.simple_type_name(), a.brackets()),
            JavaType::Class(c) => c.simple_type_name().to_string(),
            JavaType::TypeVariable(tv) => tv.name().to_string(),
            JavaType::Wildcard(_) => "?".to_string(),
            JavaType::Unresolved(u) => u.name.simple_type_name().to_string(),
            JavaType::Null => "null".to_string(),
        }
    }

    /// Dotted name from the top-level type, e.g. `Map.Entry`.
    pub fn dotted_type_name(&self) -> String {
        match self {
            JavaType::Array(a) => format!("{}{}", a.base.dotted_type_name(), a.brackets()),
            JavaType::Class(c) => c.dotted_type_name().to_string(),
            JavaType::Unresolved(u) => u.name.dotted_type_name().to_string(),
            other => other.simple_type_name(),
        }
    }

    pub fn fully_dotted_raw_name(&self) -> String {
        match self {
            JavaType::Array(a) => format!("{}{}", a.base.fully_dotted_raw_name(), a.brackets()),
            JavaType::Class(c) => c.fully_dotted_raw_name(),
            JavaType::Unresolved(u) => u.name.fully_dotted_raw_name(),
            other => other.simple_type_name(),
        }
    }

    pub fn fully_dotted_type_name(&self) -> String {
        match self {
            JavaType::Array(a) => {
                format!("{}{}", a.base.fully_dotted_type_name(), a.brackets())
            }
            JavaType::Class(c) => c.fully_dotted_type_name(),
            JavaType::Wildcard(w) => match &w.bound {
                None => "?".to_string(),
                Some((WildcardKind::Extends, ty)) => {
                    format!("? extends {}", ty.fully_dotted_type_name())
                }
                Some((WildcardKind::Super, ty)) => {
                    format!("? super {}", ty.fully_dotted_type_name())
                }
            },
            other => other.fully_dotted_raw_name(),
        }
    }

    /// Displayable name, e.g. `Map<String,List<Integer>>`.
    pub fn label(&self) -> String {
        match self {
            JavaType::Array(a) => format!("{}{}", a.base.label(), a.brackets()),
            JavaType::Class(c) => c.label(),
            JavaType::Wildcard(w) => match &w.bound {
                None => "?".to_string(),
                Some((WildcardKind::Extends, ty)) => format!("? extends {}", ty.label()),
                Some((WildcardKind::Super, ty)) => format!("? super {}", ty.label()),
            },
            other => other.simple_type_name(),
        }
    }

    /// Erased signature, e.g. `Ljava/util/List;`.
    pub fn raw_type_signature(&self) -> String {
        match self {
            JavaType::Primitive(p) => p.signature().to_string(),
            JavaType::Array(a) => format!("{}{}", a.prefix(), a.base.raw_type_signature()),
            JavaType::Class(c) => c.raw_type_signature(),
            JavaType::TypeVariable(tv) => tv.variable.erased_signature(),
            JavaType::Wildcard(w) => match &w.bound {
                Some((WildcardKind::Extends, ty)) => ty.raw_type_signature(),
                _ => OBJECT_SIGNATURE.to_string(),
            },
            JavaType::Unresolved(u) => u.name.type_signature(),
            JavaType::Null => String::new(),
        }
    }

    /// Full signature including type arguments, e.g. `Ljava/util/List<Ljava/lang/String;>;`.
    pub fn type_signature(&self) -> String {
        match self {
            JavaType::Array(a) => format!("{}{}", a.prefix(), a.base.type_signature()),
            JavaType::Class(c) => c.type_signature(),
            JavaType::TypeVariable(tv) => format!("T{};", tv.name()),
            JavaType::Wildcard(w) => match &w.bound {
                None => "*".to_string(),
                Some((WildcardKind::Extends, ty)) => format!("+{}", ty.type_signature()),
                Some((WildcardKind::Super, ty)) => format!("-{}", ty.type_signature()),
            },
            other => other.raw_type_signature(),
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            JavaType::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Declared fields; arrays expose their `length`.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            JavaType::Class(c) => c.fields().to_vec(),
            JavaType::Array(_) => vec![Field::array_length()],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_type_name_parts() {
        let name = RawTypeName::new("java/util/Map$Entry");
        assert_eq!(name.package_name(), "java.util");
        assert_eq!(name.simple_type_name(), "Entry");
        assert_eq!(name.dotted_type_name(), "Map.Entry");
        assert_eq!(name.fully_dotted_raw_name(), "java.util.Map.Entry");
        assert_eq!(name.type_signature(), "Ljava/util/Map$Entry;");

        let default_package = RawTypeName::new("TypeVars");
        assert_eq!(default_package.package_name(), "");
        assert_eq!(default_package.simple_type_name(), "TypeVars");
    }

    #[test]
    fn test_primitive_lookup() {
        assert_eq!(PrimitiveType::from_name("boolean"), Some(PrimitiveType::Boolean));
        assert_eq!(PrimitiveType::from_signature('J'), Some(PrimitiveType::Long));
        assert!(PrimitiveType::is_primitive_type_name("void"));
        assert!(!PrimitiveType::is_primitive_type_name("String"));
        assert_eq!(PrimitiveType::from_signature('L'), None);
    }

    #[test]
    fn test_array_names_and_element_type() {
        let ints = JavaType::Array(ArrayType::new(JavaType::Primitive(PrimitiveType::Int), 2));
        assert_eq!(ints.label(), "int[][]");
        assert_eq!(ints.type_signature(), "[[I");

        let JavaType::Array(array) = &ints else {
            panic!("expected array");
        };
        let element = array.element_type();
        assert_eq!(element.label(), "int[]");
        assert_eq!(array.strip_dimensions(2), Some(JavaType::Primitive(PrimitiveType::Int)));
        assert_eq!(array.strip_dimensions(3), None);

        let fields = ints.fields();
        assert_eq!(fields[0].name, "length");
    }

    #[test]
    fn test_nested_arrays_flatten() {
        let inner = JavaType::Array(ArrayType::new(JavaType::Primitive(PrimitiveType::Byte), 1));
        let outer = ArrayType::new(inner, 2);
        assert_eq!(outer.dims(), 3);
        assert_eq!(outer.base(), &JavaType::Primitive(PrimitiveType::Byte));
    }

    #[test]
    fn test_unresolved_type_names() {
        let ty = JavaType::Unresolved(UnresolvedType::new("Lcom/example/Outer$Inner;"));
        assert_eq!(ty.simple_type_name(), "Inner");
        assert_eq!(ty.dotted_type_name(), "Outer.Inner");
        assert_eq!(ty.fully_dotted_type_name(), "com.example.Outer.Inner");
        assert_eq!(ty.type_signature(), "Lcom/example/Outer$Inner;");
    }

    #[test]
    fn test_wildcard_labels() {
        let number = JavaType::Unresolved(UnresolvedType::new("java/lang/Number"));
        let wildcard = JavaType::Wildcard(WildcardType::bounded(WildcardKind::Extends, number));
        assert_eq!(wildcard.label(), "? extends Number");
        assert_eq!(wildcard.type_signature(), "+Ljava/lang/Number;");
        assert_eq!(wildcard.raw_type_signature(), "Ljava/lang/Number;");
        assert_eq!(JavaType::Wildcard(WildcardType::unbounded()).type_signature(), "*");
    }
}
