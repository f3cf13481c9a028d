mod common;

use common::{sample_library, ClassFileBuilder};
use java_typeinfo::core::declaration::TypeKind;
use java_typeinfo::core::java_type::{ArrayType, PrimitiveType};
use java_typeinfo::core::type_map::TypeScope;
use java_typeinfo::{decode_class, ClassType, JavaType, ReifiedConstructor, ReifiedMethod, TypeMap};

fn load_sample() -> TypeMap {
    let mut types = TypeMap::new();
    let decoded = sample_library()
        .iter()
        .map(|(_, bytes)| decode_class(bytes).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(types.extend_from_decoded(decoded), 9);
    types
}

fn class(types: &TypeMap, signature: &str) -> ClassType {
    match types.resolve(signature, &TypeScope::empty()) {
        JavaType::Class(c) => c,
        other => panic!("{} resolved to {:?}", signature, other),
    }
}

fn string_type(types: &TypeMap) -> JavaType {
    JavaType::Class(types.get("java/lang/String").unwrap().clone())
}

#[test]
fn test_type_kinds_and_packages() {
    let types = load_sample();
    assert_eq!(types.get("java/lang/Comparable").unwrap().kind(), TypeKind::Interface);
    assert_eq!(types.get("java/util/ArrayList").unwrap().kind(), TypeKind::Class);

    let packages: Vec<String> = types.packages().into_iter().collect();
    assert_eq!(packages, vec!["", "java.lang", "java.util"]);
}

#[test]
fn test_find_by_java_name() {
    let mut types = load_sample();
    let entry = ClassFileBuilder::new("java/util/Map$Entry", 0x0601)
        .superclass("java/lang/Object")
        .build();
    types.extend_from_decoded([decode_class(&entry).unwrap()]);

    assert_eq!(
        types.find_by_name("java.util.ArrayList").unwrap().short_signature(),
        "java/util/ArrayList"
    );
    assert!(types.find_by_name("java/util/List").is_some());
    assert_eq!(
        types.find_by_name("java.util.Map.Entry").unwrap().short_signature(),
        "java/util/Map$Entry"
    );
    assert!(types.find_by_name("java.util.Map$Entry").is_some());
    assert!(types.find_by_name("java.util.Missing").is_none());
    assert!(types.find_by_name("Missing").is_none());
}

#[test]
fn test_resolve_signatures() {
    let types = load_sample();
    let scope = TypeScope::empty();

    let list = types.resolve("Ljava/util/List<Ljava/lang/String;>;", &scope);
    assert_eq!(list.label(), "List<String>");
    assert_eq!(list.type_signature(), "Ljava/util/List<Ljava/lang/String;>;");
    assert_eq!(list.raw_type_signature(), "Ljava/util/List;");
    assert_eq!(list.fully_dotted_type_name(), "java.util.List<java.lang.String>");

    let short = types.resolve("java/util/List", &scope);
    assert_eq!(short.label(), "List");

    let missing = types.resolve("Lcom/example/Missing;", &scope);
    assert!(matches!(missing, JavaType::Unresolved(_)));
    assert_eq!(missing.fully_dotted_type_name(), "com.example.Missing");

    let grid = types.resolve("[[I", &scope);
    assert_eq!(
        grid,
        JavaType::Array(ArrayType::new(JavaType::Primitive(PrimitiveType::Int), 2))
    );

    let wildcard = types.resolve("Ljava/util/List<+Ljava/lang/Comparable<*>;>;", &scope);
    assert_eq!(wildcard.label(), "List<? extends Comparable<?>>");
}

#[test]
fn test_specialised_members() {
    let types = load_sample();
    let list = class(&types, "Ljava/util/List<Ljava/lang/String;>;");
    let get = list.methods().iter().find(|m| m.name == "get").unwrap();

    assert_eq!(get.return_type(&list, &types).label(), "String");
    assert_eq!(get.method_signature(&list), "(I)Ljava/lang/String;");
    assert_eq!(get.label(&list, &types), "public String get(int arg0)");
    assert!(!get.has_implementation());

    let raw_list = types.get("java/util/List").unwrap();
    let raw_return = get.return_type(raw_list, &types);
    assert!(matches!(raw_return, JavaType::TypeVariable(_)));
    assert_eq!(raw_return.label(), "E");
    assert_eq!(raw_return.raw_type_signature(), "Ljava/lang/Object;");
    assert_eq!(get.method_signature(raw_list), "(I)TE;");
}

#[test]
fn test_fields_follow_type_arguments() {
    let types = load_sample();
    let list = class(&types, "Ljava/util/ArrayList<Ljava/lang/String;>;");

    let labels: Vec<String> = list.fields().iter().map(|f| f.label(&list, &types)).collect();
    assert_eq!(labels, vec!["private int size", "private String first"]);
}

#[test]
fn test_missing_type_arguments_default_to_object() {
    let types = load_sample();
    let raw = types.get("java/util/ArrayList").unwrap();
    let specialised = raw.specialise(Vec::new(), &types);
    assert_eq!(specialised.label(), "ArrayList<Object>");
}

#[test]
fn test_supertypes_are_specialised() {
    let types = load_sample();
    let list = class(&types, "Ljava/util/ArrayList<Ljava/lang/String;>;");

    let supers: Vec<String> = list.supers(&types).iter().map(JavaType::label).collect();
    assert_eq!(supers, vec!["Object", "List<String>"]);

    let type_vars = types.get("TypeVars").unwrap();
    let supers: Vec<String> = type_vars.supers(&types).iter().map(JavaType::label).collect();
    assert_eq!(supers, vec!["ArrayList"]);
    assert_eq!(type_vars.type_variables().len(), 5);
}

#[test]
fn test_find_declarations_through_supertypes() {
    let types = load_sample();
    let list = class(&types, "Ljava/util/ArrayList<Ljava/lang/String;>;");

    let get = list.find_decls_by_name("get", &types);
    assert_eq!(get.methods.len(), 1);
    assert_eq!(get.methods[0].owner.simple_type_name(), "ArrayList");

    // List<String>.add and Collection<String>.add have the same signature
    let add = list.find_decls_by_name("add", &types);
    assert_eq!(add.methods.len(), 1);
    assert_eq!(add.methods[0].owner.label(), "List<String>");

    let size = list.find_decls_by_name("size", &types);
    assert_eq!(size.fields.len(), 1);
    assert_eq!(size.methods.len(), 1);
    assert_eq!(size.methods[0].owner.simple_type_name(), "Collection");

    let to_string = list.find_decls_by_name("toString", &types);
    assert_eq!(to_string.methods[0].owner.simple_type_name(), "Object");

    assert!(list.find_decls_by_name("nothing", &types).methods.is_empty());
}

#[test]
fn test_constructors_and_static_initialiser() {
    let types = load_sample();
    let array_list = types.get("java/util/ArrayList").unwrap();
    let labels: Vec<String> = array_list
        .constructors()
        .iter()
        .map(|c| c.label(array_list, &types))
        .collect();
    assert_eq!(
        labels,
        vec!["public ArrayList()", "public ArrayList(Collection<? extends E> arg0)"]
    );

    let arrays = types.get("java/util/Arrays").unwrap();
    assert!(arrays.methods().iter().all(|m| m.name != "<clinit>"));
    assert!(arrays.constructors().is_empty());
}

#[test]
fn test_generic_method_labels() {
    let types = load_sample();
    let arrays = types.get("java/util/Arrays").unwrap();
    let as_list = arrays.methods().iter().find(|m| m.name == "asList").unwrap();

    assert!(as_list.is_variable_arity());
    assert_eq!(as_list.parameter_count(), 1);
    assert_eq!(
        as_list.label(arrays, &types),
        "public static List<T> asList(T... arg0)"
    );
    assert_eq!(as_list.short_label(arrays, &types), "asList(T... arg0): List");
}

#[test]
fn test_reify_varargs_method() {
    let types = load_sample();
    let arrays = types.get("java/util/Arrays").unwrap();
    let as_list = arrays.methods().iter().find(|m| m.name == "asList").unwrap();

    let strings = JavaType::Array(ArrayType::new(string_type(&types), 1));
    let reified = ReifiedMethod::build(as_list, arrays, &[strings], &types);
    assert_eq!(reified.return_type.label(), "List<String>");
    assert!(reified.type_variables.is_empty());
    assert_eq!(
        reified.label(),
        "public static List<String> asList(String... arg0)"
    );
}

#[test]
fn test_reify_leaves_null_and_missing_arguments_unbound() {
    let types = load_sample();
    let arrays = types.get("java/util/Arrays").unwrap();
    let as_list = arrays.methods().iter().find(|m| m.name == "asList").unwrap();

    let with_null = ReifiedMethod::build(as_list, arrays, &[JavaType::Null], &types);
    assert_eq!(with_null.return_type.label(), "List<T>");
    assert_eq!(with_null.type_variables.len(), 1);
    assert_eq!(with_null.type_variables[0].name, "T");

    let without_args = ReifiedMethod::build(as_list, arrays, &[], &types);
    assert_eq!(without_args.parameters[0].ty.label(), "T[]");
    assert_eq!(without_args.type_variables.len(), 1);
}

#[test]
fn test_reify_through_type_arguments() {
    let types = load_sample();
    let arrays = types.get("java/util/Arrays").unwrap();
    let first_of = arrays.methods().iter().find(|m| m.name == "firstOf").unwrap();

    let list = types.resolve("Ljava/util/List<Ljava/lang/String;>;", &TypeScope::empty());
    let reified = ReifiedMethod::build(first_of, arrays, &[list], &types);
    assert_eq!(reified.return_type.label(), "String");
    assert_eq!(reified.parameters[0].ty.label(), "List<String>");
}

#[test]
fn test_reify_constructor() {
    let types = load_sample();
    let array_list = types.get("java/util/ArrayList").unwrap();
    let copy = &array_list.constructors()[1];

    let list = types.resolve("Ljava/util/List<Ljava/lang/String;>;", &TypeScope::empty());
    let reified = ReifiedConstructor::build(copy, array_list, &[list], &types);
    assert_eq!(
        reified.label(),
        "public ArrayList(Collection<? extends String> arg0)"
    );
    assert!(reified.type_variables.is_empty());
}
