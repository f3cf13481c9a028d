use crate::core::declaration::Modifiers;
use crate::core::java_type::{ClassType, JavaType, PrimitiveType};
use crate::core::signature::{substitute_type_variables, MethodSignature, TypeVariable, OBJECT_SIGNATURE};
use crate::core::type_map::{TypeMap, TypeScope};
use crate::domain::model::{find_signature_attribute, has_attribute, DecodedField, DecodedMethod};
use crate::utils::error::Result;
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Generic signature when the class file has one, otherwise the descriptor.
    pub signature: String,
    pub modifiers: Modifiers,
    pub docs: String,
}

impl Field {
    pub fn from_decoded(f: &DecodedField) -> Self {
        let signature = find_signature_attribute(&f.attributes).unwrap_or(&f.descriptor);
        Self {
            name: f.name.clone(),
            signature: signature.to_string(),
            modifiers: Modifiers::from(f.mods),
            docs: f.docs.clone(),
        }
    }

    pub fn array_length() -> Self {
        Self {
            name: "length".to_string(),
            signature: "I".to_string(),
            modifiers: Modifiers::from_bits(Modifiers::PUBLIC),
            docs: String::new(),
        }
    }

    pub fn is_enum_value(&self) -> bool {
        self.modifiers.has(Modifiers::ENUM)
    }

    pub fn is_synthetic(&self) -> bool {
        self.modifiers.has(Modifiers::SYNTHETIC)
    }

    pub fn resolve_type(&self, scope: &TypeScope<'_>, types: &TypeMap) -> JavaType {
        types.resolve(&self.signature, scope)
    }

    pub fn field_type(&self, owner: &ClassType, types: &TypeMap) -> JavaType {
        self.resolve_type(&owner.scope(), types)
    }

    pub fn label(&self, owner: &ClassType, types: &TypeMap) -> String {
        format!(
            "{}{} {}",
            self.modifiers.label(),
            self.field_type(owner, types).label(),
            self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: JavaType,
    pub varargs: bool,
}

impl Parameter {
    /// `String... names` for a varargs `String[]`, otherwise `Type name`.
    pub fn label(&self) -> String {
        let mut type_label = self.ty.label();
        if self.varargs {
            if let Some(stripped) = type_label.strip_suffix("[]") {
                type_label = format!("{}...", stripped);
            } else {
                type_label.push_str("...");
            }
        }
        format!("{} {}", type_label, self.name)
    }
}

/// What methods and constructors have in common.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBase {
    pub modifiers: Modifiers,
    pub docs: String,
    pub signature: String,
    pub type_variables: Vec<TypeVariable>,
    pub parameter_signatures: Vec<String>,
    pub return_signature: String,
    pub exceptions: Vec<String>,
    pub parameter_names: Vec<String>,
    has_code: bool,
}

impl MethodBase {
    fn new(m: &DecodedMethod, signature: &str) -> Result<Self> {
        let parsed = MethodSignature::parse(signature)?;
        Ok(Self {
            modifiers: Modifiers::from(m.mods),
            docs: m.docs.clone(),
            signature: signature.to_string(),
            type_variables: parsed.type_variables,
            parameter_signatures: parsed.parameters,
            return_signature: parsed.return_type,
            exceptions: parsed.exceptions,
            parameter_names: m.pnames.clone(),
            has_code: has_attribute(&m.attributes, "Code"),
        })
    }

    /// Abstract and native methods have no `Code` attribute, default interface methods do.
    pub fn has_implementation(&self) -> bool {
        self.has_code
    }

    pub fn is_synthetic(&self) -> bool {
        self.modifiers.has(Modifiers::SYNTHETIC)
    }

    pub fn is_variable_arity(&self) -> bool {
        !self.parameter_signatures.is_empty() && self.modifiers.has(Modifiers::VARARGS)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_signatures.len()
    }

    pub fn scope<'a>(&'a self, owner: &'a ClassType) -> TypeScope<'a> {
        owner.scope().with_method(&self.type_variables)
    }

    pub fn parameters(&self, owner: &ClassType, types: &TypeMap) -> Vec<Parameter> {
        let scope = self.scope(owner);
        let last = self.parameter_signatures.len().saturating_sub(1);
        self.parameter_signatures
            .iter()
            .enumerate()
            .map(|(i, sig)| Parameter {
                name: self
                    .parameter_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("arg{}", i)),
                ty: types.resolve(sig, &scope),
                varargs: i == last && self.is_variable_arity(),
            })
            .collect()
    }

    pub fn return_type(&self, owner: &ClassType, types: &TypeMap) -> JavaType {
        types.resolve(&self.return_signature, &self.scope(owner))
    }

    /// The signature with the owner's type arguments substituted, so two inherited
    /// methods compare equal once specialised.
    pub fn method_signature(&self, owner: &ClassType) -> String {
        if self.type_variables.is_empty() && !owner.is_specialised() {
            return self.signature.clone();
        }
        substitute_type_variables(&self.signature, |name| {
            if self.type_variables.iter().any(|tv| tv.name == name) {
                return None;
            }
            owner
                .type_arguments()
                .iter()
                .find(|arg| arg.variable.name == name)
                .map(|arg| match &arg.ty {
                    JavaType::Wildcard(w) => w
                        .bound_type()
                        .map(JavaType::type_signature)
                        .unwrap_or_else(|| OBJECT_SIGNATURE.to_string()),
                    ty => ty.type_signature(),
                })
        })
    }
}

fn parameter_list(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(Parameter::label)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn method_label(
    modifiers: Modifiers,
    return_type: &JavaType,
    name: &str,
    parameters: &[Parameter],
) -> String {
    let mut keywords: Vec<&str> = modifiers
        .keywords()
        .into_iter()
        .filter(|kw| !matches!(*kw, "abstract" | "transient" | "native"))
        .collect();
    if !keywords.is_empty() {
        keywords.push("");
    }
    format!(
        "{}{} {}({})",
        keywords.join(" "),
        return_type.label(),
        name,
        parameter_list(parameters)
    )
}

pub(crate) fn constructor_label(modifiers: Modifiers, owner: &ClassType, parameters: &[Parameter]) -> String {
    format!(
        "{}{}({})",
        modifiers.label().replace("transient ", ""),
        owner.simple_type_name(),
        parameter_list(parameters)
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    base: MethodBase,
}

impl Method {
    pub fn from_decoded(m: &DecodedMethod) -> Result<Self> {
        let signature = find_signature_attribute(&m.attributes).unwrap_or(&m.sig);
        Ok(Self {
            name: m.name.clone(),
            base: MethodBase::new(m, signature)?,
        })
    }

    pub fn base(&self) -> &MethodBase {
        &self.base
    }

    /// `public static <T> List<T> asList(T... a)` minus abstract/transient/native.
    pub fn label(&self, owner: &ClassType, types: &TypeMap) -> String {
        method_label(
            self.modifiers,
            &self.return_type(owner, types),
            &self.name,
            &self.parameters(owner, types),
        )
    }

    /// `asList(T... a): List`
    pub fn short_label(&self, owner: &ClassType, types: &TypeMap) -> String {
        format!(
            "{}({}): {}",
            self.name,
            parameter_list(&self.parameters(owner, types)),
            self.return_type(owner, types).simple_type_name()
        )
    }
}

impl Deref for Method {
    type Target = MethodBase;

    fn deref(&self) -> &MethodBase {
        &self.base
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    base: MethodBase,
}

impl Constructor {
    /// The generic signature is only used when it mentions a type variable: for inner
    /// classes it omits the synthetic outer-instance parameter the descriptor has.
    pub fn from_decoded(m: &DecodedMethod) -> Result<Self> {
        let signature = find_signature_attribute(&m.attributes)
            .filter(|sig| {
                MethodSignature::parse(sig)
                    .map(|parsed| parsed.mentions_type_variable())
                    .unwrap_or(false)
            })
            .unwrap_or(&m.sig);
        Ok(Self {
            base: MethodBase::new(m, signature)?,
        })
    }

    pub fn base(&self) -> &MethodBase {
        &self.base
    }

    pub fn return_type(&self) -> JavaType {
        JavaType::Primitive(PrimitiveType::Void)
    }

    pub fn label(&self, owner: &ClassType, types: &TypeMap) -> String {
        constructor_label(self.modifiers, owner, &self.parameters(owner, types))
    }
}

impl Deref for Constructor {
    type Target = MethodBase;

    fn deref(&self) -> &MethodBase {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::java_type::ArrayType;
    use crate::domain::model::{AccessFlags, AttributeData, DecodedAttribute};

    fn decoded_method(name: &str, mods: u16, sig: &str, generic: Option<&str>) -> DecodedMethod {
        let mut attributes = vec![DecodedAttribute {
            name: "Code".into(),
            info: AttributeData::Encoded(String::new()),
            signature: None,
        }];
        if let Some(generic) = generic {
            attributes.push(DecodedAttribute {
                name: "Signature".into(),
                info: AttributeData::Raw(vec![0, 1]),
                signature: Some(generic.into()),
            });
        }
        DecodedMethod {
            mods: AccessFlags(mods),
            name: name.into(),
            sig: sig.into(),
            attributes,
            docs: String::new(),
            pnames: vec![],
        }
    }

    #[test]
    fn test_method_prefers_generic_signature() {
        let m = decoded_method(
            "first",
            0x0001,
            "(Ljava/util/List;)Ljava/lang/Object;",
            Some("<T:Ljava/lang/Object;>(Ljava/util/List<TT;>;)TT;"),
        );
        let method = Method::from_decoded(&m).unwrap();
        assert_eq!(method.type_variables.len(), 1);
        assert_eq!(method.return_signature, "TT;");
        assert!(method.has_implementation());
        assert!(!method.is_variable_arity());
    }

    #[test]
    fn test_constructor_ignores_signature_without_type_variables() {
        let m = decoded_method(
            "<init>",
            0x0001,
            "(Lcom/example/Outer;Ljava/lang/String;)V",
            Some("(Ljava/lang/String;)V"),
        );
        let ctor = Constructor::from_decoded(&m).unwrap();
        assert_eq!(ctor.parameter_count(), 2);
        assert_eq!(ctor.return_type(), JavaType::Primitive(PrimitiveType::Void));
    }

    #[test]
    fn test_varargs_flag_applies_to_last_parameter() {
        let m = decoded_method("format", 0x0089, "(Ljava/lang/String;[Ljava/lang/Object;)V", None);
        let method = Method::from_decoded(&m).unwrap();
        assert!(method.is_variable_arity());
        assert!(method.modifiers.contains_keyword("transient"));
    }

    #[test]
    fn test_parameter_labels() {
        let varargs = Parameter {
            name: "args".into(),
            ty: JavaType::Array(ArrayType::new(JavaType::Primitive(PrimitiveType::Int), 1)),
            varargs: true,
        };
        assert_eq!(varargs.label(), "int... args");

        let plain = Parameter {
            name: "count".into(),
            ty: JavaType::Primitive(PrimitiveType::Long),
            varargs: false,
        };
        assert_eq!(plain.label(), "long count");
    }

    #[test]
    fn test_field_flags() {
        let f = DecodedField {
            mods: AccessFlags(0x4019),
            name: "RED".into(),
            descriptor: "Lcom/example/Color;".into(),
            attributes: vec![],
            docs: String::new(),
        };
        let field = Field::from_decoded(&f);
        assert!(field.is_enum_value());
        assert!(!field.is_synthetic());
        assert_eq!(field.signature, "Lcom/example/Color;");
        assert_eq!(field.modifiers.label(), "public static final ");
    }
}
