pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::TomlConfig, LibrarySettings};

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use core::classfile::{decode_class, decode_class_file};
pub use core::java_type::{ClassType, JavaType};
pub use core::library::{AndroidLibraryOptions, LibraryLoader};
pub use core::reified::{ReifiedConstructor, ReifiedMethod};
pub use core::source::parse_java_source;
pub use core::type_map::TypeMap;
pub use utils::error::{Result, TypeInfoError};
