use crate::core::declaration::Modifiers;
use crate::core::java_type::{ArrayType, ClassType, JavaType, WildcardType};
use crate::core::member::{
    constructor_label, method_label, Constructor, Method, MethodBase, Parameter,
};
use crate::core::signature::TypeVariable;
use crate::core::type_map::TypeMap;
use std::collections::HashMap;

/// Type variable bindings collected from the arguments of one call.
struct Reifier<'a> {
    types: &'a TypeMap,
    bindings: HashMap<String, JavaType>,
}

impl<'a> Reifier<'a> {
    fn new(types: &'a TypeMap) -> Self {
        Self {
            types,
            bindings: HashMap::new(),
        }
    }

    fn parameters(&mut self, base: &MethodBase, owner: &ClassType, arg_types: &[JavaType]) -> Vec<Parameter> {
        base.parameters(owner, self.types)
            .into_iter()
            .enumerate()
            .map(|(i, p)| Parameter {
                ty: self.reify(&p.ty, arg_types.get(i)),
                ..p
            })
            .collect()
    }

    /// Match a parameter type against the argument passed for it. The first argument
    /// seen for a type variable wins.
    fn reify(&mut self, ty: &JavaType, arg: Option<&JavaType>) -> JavaType {
        match ty {
            JavaType::TypeVariable(tv) => {
                if let Some(bound) = self.bindings.get(tv.name()) {
                    return bound.clone();
                }
                match arg {
                    // null fits every reference type, and a missing argument says nothing
                    None | Some(JavaType::Null) => ty.clone(),
                    Some(arg) => {
                        self.bindings.insert(tv.name().to_string(), arg.clone());
                        arg.clone()
                    }
                }
            }
            JavaType::Array(array) => {
                let element_arg = match arg {
                    Some(JavaType::Array(arg_array)) => arg_array.strip_dimensions(array.dims()),
                    Some(JavaType::Null) => Some(JavaType::Null),
                    _ => None,
                };
                match element_arg {
                    Some(element_arg) => JavaType::Array(ArrayType::new(
                        self.reify(array.base(), Some(&element_arg)),
                        array.dims(),
                    )),
                    None => self.substitute(ty),
                }
            }
            JavaType::Class(class) if class.is_specialised() => {
                let arg_arguments = match arg {
                    Some(JavaType::Class(arg_class)) => arg_class.type_arguments(),
                    _ => return self.substitute(ty),
                };
                let reified = class
                    .type_arguments()
                    .iter()
                    .enumerate()
                    .map(|(i, param_arg)| match arg_arguments.get(i) {
                        Some(arg_arg) => self.reify(&param_arg.ty, Some(&arg_arg.ty)),
                        None => param_arg.ty.clone(),
                    })
                    .collect();
                JavaType::Class(class.specialise(reified, self.types))
            }
            JavaType::Wildcard(w) => match &w.bound {
                Some((kind, bound)) => {
                    let arg_bound = match arg {
                        Some(JavaType::Wildcard(arg_w)) => arg_w.bound_type(),
                        other => other,
                    };
                    JavaType::Wildcard(WildcardType::bounded(*kind, self.reify(bound, arg_bound)))
                }
                None => ty.clone(),
            },
            _ => ty.clone(),
        }
    }

    /// Replace bound type variables wherever they appear in `ty`.
    fn substitute(&self, ty: &JavaType) -> JavaType {
        match ty {
            JavaType::TypeVariable(tv) => self
                .bindings
                .get(tv.name())
                .cloned()
                .unwrap_or_else(|| ty.clone()),
            JavaType::Array(array) => {
                JavaType::Array(ArrayType::new(self.substitute(array.base()), array.dims()))
            }
            JavaType::Class(class) if class.is_specialised() => {
                let arguments = class
                    .type_arguments()
                    .iter()
                    .map(|arg| self.substitute(&arg.ty))
                    .collect();
                JavaType::Class(class.specialise(arguments, self.types))
            }
            JavaType::Wildcard(w) => match &w.bound {
                Some((kind, bound)) => {
                    JavaType::Wildcard(WildcardType::bounded(*kind, self.substitute(bound)))
                }
                None => ty.clone(),
            },
            _ => ty.clone(),
        }
    }

    /// Declared variables that no argument pinned down.
    fn remaining(&self, declared: &[TypeVariable]) -> Vec<TypeVariable> {
        declared
            .iter()
            .filter(|tv| !self.bindings.contains_key(&tv.name))
            .cloned()
            .collect()
    }
}

/// A method as seen from a call site, with type variables inferred from the arguments.
#[derive(Debug, Clone)]
pub struct ReifiedMethod {
    pub owner: ClassType,
    pub name: String,
    pub modifiers: Modifiers,
    pub parameters: Vec<Parameter>,
    pub return_type: JavaType,
    pub type_variables: Vec<TypeVariable>,
}

impl ReifiedMethod {
    pub fn build(method: &Method, owner: &ClassType, arg_types: &[JavaType], types: &TypeMap) -> Self {
        let mut reifier = Reifier::new(types);
        let parameters = reifier.parameters(method.base(), owner, arg_types);
        let return_type = reifier.substitute(&method.return_type(owner, types));
        Self {
            owner: owner.clone(),
            name: method.name.clone(),
            modifiers: method.modifiers,
            parameters,
            return_type,
            type_variables: reifier.remaining(&method.type_variables),
        }
    }

    pub fn label(&self) -> String {
        method_label(self.modifiers, &self.return_type, &self.name, &self.parameters)
    }
}

#[derive(Debug, Clone)]
pub struct ReifiedConstructor {
    pub owner: ClassType,
    pub modifiers: Modifiers,
    pub parameters: Vec<Parameter>,
    pub type_variables: Vec<TypeVariable>,
}

impl ReifiedConstructor {
    pub fn build(
        constructor: &Constructor,
        owner: &ClassType,
        arg_types: &[JavaType],
        types: &TypeMap,
    ) -> Self {
        let mut reifier = Reifier::new(types);
        let parameters = reifier.parameters(constructor.base(), owner, arg_types);
        Self {
            owner: owner.clone(),
            modifiers: constructor.modifiers,
            parameters,
            type_variables: reifier.remaining(&constructor.type_variables),
        }
    }

    pub fn label(&self) -> String {
        constructor_label(self.modifiers, &self.owner, &self.parameters)
    }
}
