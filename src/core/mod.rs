pub mod classfile;
pub mod declaration;
pub mod java_type;
pub mod library;
pub mod member;
pub mod reified;
pub mod signature;
pub mod source;
pub mod type_map;

pub use crate::domain::model::DecodedClass;
pub use crate::domain::ports::{LibraryConfigProvider, Storage};
pub use crate::utils::error::Result;
