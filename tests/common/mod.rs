#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const TYPE_VARS_SIGNATURE: &str = "<T1:Ljava/lang/Object;T2:Ljava/lang/String;T3::Ljava/lang/Comparable<TT2;>;T4::Ljava/lang/Comparable<Ljava/lang/Enum;>;:Ljava/util/List;T5::Ljava/util/List;:Ljava/lang/Comparable<Ljava/lang/Enum;>;>Ljava/util/ArrayList;";

const ACC_PUBLIC: u16 = 0x0001;
const ACC_PRIVATE: u16 = 0x0002;
const ACC_STATIC: u16 = 0x0008;
const ACC_FINAL: u16 = 0x0010;
const ACC_SUPER: u16 = 0x0020;
const ACC_VARARGS: u16 = 0x0080;
const ACC_NATIVE: u16 = 0x0100;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;

/// `return` with no exception table or attributes.
const RETURN_CODE: [u8; 13] = [0, 1, 0, 1, 0, 0, 0, 1, 0xB1, 0, 0, 0, 0];

/// Assembles a class file with just enough structure for the decoder.
pub struct ClassFileBuilder {
    pool: Vec<Vec<u8>>,
    indexes: HashMap<String, u16>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassFileBuilder {
    pub fn new(name: &str, access: u16) -> Self {
        let mut builder = Self {
            pool: Vec::new(),
            indexes: HashMap::new(),
            access,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        };
        builder.this_class = builder.class(name);
        builder
    }

    pub fn superclass(mut self, name: &str) -> Self {
        self.super_class = self.class(name);
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        let attribute = self.signature_attribute(signature);
        self.attributes.push(attribute);
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str, signature: Option<&str>) -> Self {
        let mut attributes = Vec::new();
        if let Some(signature) = signature {
            attributes.push(self.signature_attribute(signature));
        }
        let member = self.member(access, name, descriptor, attributes);
        self.fields.push(member);
        self
    }

    pub fn method(
        mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
    ) -> Self {
        let mut attributes = Vec::new();
        if access & (ACC_ABSTRACT | ACC_NATIVE) == 0 {
            attributes.push(self.attribute("Code", RETURN_CODE.to_vec()));
        }
        if let Some(signature) = signature {
            attributes.push(self.signature_attribute(signature));
        }
        let member = self.member(access, name, descriptor, attributes);
        self.methods.push(member);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
        push_u2(&mut out, self.pool.len() as u16 + 1);
        for entry in &self.pool {
            out.extend_from_slice(entry);
        }
        push_u2(&mut out, self.access);
        push_u2(&mut out, self.this_class);
        push_u2(&mut out, self.super_class);
        push_u2(&mut out, self.interfaces.len() as u16);
        for index in &self.interfaces {
            push_u2(&mut out, *index);
        }
        for table in [&self.fields, &self.methods, &self.attributes] {
            push_u2(&mut out, table.len() as u16);
            for item in table {
                out.extend_from_slice(item);
            }
        }
        out
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let key = format!("utf8:{}", value);
        if let Some(index) = self.indexes.get(&key) {
            return *index;
        }
        let mut entry = vec![1];
        push_u2(&mut entry, value.len() as u16);
        entry.extend_from_slice(value.as_bytes());
        self.add_entry(key, entry)
    }

    fn class(&mut self, name: &str) -> u16 {
        let key = format!("class:{}", name);
        if let Some(index) = self.indexes.get(&key) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut entry = vec![7];
        push_u2(&mut entry, name_index);
        self.add_entry(key, entry)
    }

    fn add_entry(&mut self, key: String, entry: Vec<u8>) -> u16 {
        self.pool.push(entry);
        let index = self.pool.len() as u16;
        self.indexes.insert(key, index);
        index
    }

    fn attribute(&mut self, name: &str, info: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        push_u2(&mut out, self.utf8(name));
        out.extend_from_slice(&(info.len() as u32).to_be_bytes());
        out.extend_from_slice(&info);
        out
    }

    fn signature_attribute(&mut self, signature: &str) -> Vec<u8> {
        let index = self.utf8(signature);
        self.attribute("Signature", index.to_be_bytes().to_vec())
    }

    fn member(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<Vec<u8>>) -> Vec<u8> {
        let mut out = Vec::new();
        push_u2(&mut out, access);
        push_u2(&mut out, self.utf8(name));
        push_u2(&mut out, self.utf8(descriptor));
        push_u2(&mut out, attributes.len() as u16);
        for attribute in attributes {
            out.extend_from_slice(&attribute);
        }
        out
    }
}

fn push_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// A handful of JDK-shaped classes plus the `Normal` and `TypeVars` fixtures, as
/// `(jar entry name, class bytes)`.
pub fn sample_library() -> Vec<(String, Vec<u8>)> {
    let object = ClassFileBuilder::new("java/lang/Object", ACC_PUBLIC | ACC_SUPER)
        .method(ACC_PUBLIC, "<init>", "()V", None)
        .method(ACC_PUBLIC, "toString", "()Ljava/lang/String;", None)
        .method(ACC_PUBLIC | ACC_NATIVE, "hashCode", "()I", None);

    let string = ClassFileBuilder::new("java/lang/String", ACC_PUBLIC | ACC_FINAL | ACC_SUPER)
        .superclass("java/lang/Object")
        .interface("java/lang/Comparable")
        .signature("Ljava/lang/Object;Ljava/lang/Comparable<Ljava/lang/String;>;")
        .method(ACC_PUBLIC, "length", "()I", None);

    let comparable = ClassFileBuilder::new("java/lang/Comparable", ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .superclass("java/lang/Object")
        .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        .method(ACC_PUBLIC | ACC_ABSTRACT, "compareTo", "(Ljava/lang/Object;)I", Some("(TT;)I"));

    let collection = ClassFileBuilder::new("java/util/Collection", ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .superclass("java/lang/Object")
        .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;")
        .method(ACC_PUBLIC | ACC_ABSTRACT, "size", "()I", None)
        .method(ACC_PUBLIC | ACC_ABSTRACT, "add", "(Ljava/lang/Object;)Z", Some("(TE;)Z"));

    let list = ClassFileBuilder::new("java/util/List", ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .superclass("java/lang/Object")
        .interface("java/util/Collection")
        .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Collection<TE;>;")
        .method(ACC_PUBLIC | ACC_ABSTRACT, "get", "(I)Ljava/lang/Object;", Some("(I)TE;"))
        .method(ACC_PUBLIC | ACC_ABSTRACT, "add", "(Ljava/lang/Object;)Z", Some("(TE;)Z"));

    let array_list = ClassFileBuilder::new("java/util/ArrayList", ACC_PUBLIC | ACC_SUPER)
        .superclass("java/lang/Object")
        .interface("java/util/List")
        .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/List<TE;>;")
        .field(ACC_PRIVATE, "size", "I", None)
        .field(ACC_PRIVATE, "first", "Ljava/lang/Object;", Some("TE;"))
        .method(ACC_PUBLIC, "<init>", "()V", None)
        .method(
            ACC_PUBLIC,
            "<init>",
            "(Ljava/util/Collection;)V",
            Some("(Ljava/util/Collection<+TE;>;)V"),
        )
        .method(ACC_PUBLIC, "get", "(I)Ljava/lang/Object;", Some("(I)TE;"));

    let arrays = ClassFileBuilder::new("java/util/Arrays", ACC_PUBLIC | ACC_SUPER)
        .superclass("java/lang/Object")
        .method(
            ACC_PUBLIC | ACC_STATIC | ACC_VARARGS,
            "asList",
            "([Ljava/lang/Object;)Ljava/util/List;",
            Some("<T:Ljava/lang/Object;>([TT;)Ljava/util/List<TT;>;"),
        )
        .method(
            ACC_PUBLIC | ACC_STATIC,
            "firstOf",
            "(Ljava/util/List;)Ljava/lang/Object;",
            Some("<T:Ljava/lang/Object;>(Ljava/util/List<TT;>;)TT;"),
        )
        .method(ACC_STATIC, "<clinit>", "()V", None);

    let normal = ClassFileBuilder::new("Normal", ACC_SUPER).superclass("java/util/ArrayList");

    let type_vars = ClassFileBuilder::new("TypeVars", ACC_SUPER)
        .superclass("java/util/ArrayList")
        .signature(TYPE_VARS_SIGNATURE);

    [
        ("java/lang/Object", object),
        ("java/lang/String", string),
        ("java/lang/Comparable", comparable),
        ("java/util/Collection", collection),
        ("java/util/List", list),
        ("java/util/ArrayList", array_list),
        ("java/util/Arrays", arrays),
        ("Normal", normal),
        ("TypeVars", type_vars),
    ]
    .into_iter()
    .map(|(name, builder)| (format!("{}.class", name), builder.build()))
    .collect()
}

pub fn zip_bytes(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
