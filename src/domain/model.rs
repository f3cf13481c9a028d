use serde::{Deserialize, Serialize};

/// Class file version as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassVersion {
    pub minor: u16,
    pub major: u16,
}

/// Raw access flag bits. Serialized as `{ "bits": 33, "value": "0x0021" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "AccessFlagsRepr", into = "AccessFlagsRepr")]
pub struct AccessFlags(pub u16);

#[derive(Serialize, Deserialize)]
struct AccessFlagsRepr {
    bits: u16,
    #[serde(default)]
    value: String,
}

impl From<AccessFlagsRepr> for AccessFlags {
    fn from(repr: AccessFlagsRepr) -> Self {
        AccessFlags(repr.bits)
    }
}

impl From<AccessFlags> for AccessFlagsRepr {
    fn from(flags: AccessFlags) -> Self {
        AccessFlagsRepr {
            bits: flags.0,
            value: format!("0x{:04x}", flags.0),
        }
    }
}

impl AccessFlags {
    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, mask: u16) -> bool {
        self.0 & mask != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeData {
    /// Base64 text, used for `Code` bodies.
    Encoded(String),
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedAttribute {
    pub name: String,
    pub info: AttributeData,
    #[serde(
        rename = "Signature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedField {
    pub mods: AccessFlags,
    pub name: String,
    #[serde(rename = "type")]
    pub descriptor: String,
    #[serde(default)]
    pub attributes: Vec<DecodedAttribute>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMethod {
    pub mods: AccessFlags,
    pub name: String,
    pub sig: String,
    #[serde(default)]
    pub attributes: Vec<DecodedAttribute>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docs: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pnames: Vec<String>,
}

/// One compiled type, as produced by the class decoder and stored in cache files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedClass {
    pub version: ClassVersion,
    pub mods: AccessFlags,
    pub thisclass: String,
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<DecodedField>,
    #[serde(default)]
    pub methods: Vec<DecodedMethod>,
    #[serde(default)]
    pub attributes: Vec<DecodedAttribute>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docs: String,
}

pub fn find_signature_attribute(attributes: &[DecodedAttribute]) -> Option<&str> {
    attributes
        .iter()
        .find(|a| a.name == "Signature")
        .and_then(|a| a.signature.as_deref())
}

pub fn has_attribute(attributes: &[DecodedAttribute], name: &str) -> bool {
    attributes.iter().any(|a| a.name == name)
}

impl DecodedClass {
    pub fn signature(&self) -> Option<&str> {
        find_signature_attribute(&self.attributes)
    }
}
