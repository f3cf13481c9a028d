pub mod cli;
pub mod toml_config;

use crate::domain::ports::LibraryConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_api_level, validate_file_extension, validate_path, Validate};
use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "java-typeinfo")]
#[command(about = "Decode Java class files and build type caches for Java libraries")]
pub struct CliConfig {
    /// Path to an optional TOML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Decode a single .class file and print it as cache JSON
    Decode {
        class_file: PathBuf,

        #[arg(long)]
        pretty: bool,
    },

    /// Build a type cache from a .jar/.aar, or from an Android platform
    BuildCache {
        /// Library to decode; the Android platform jar is used when omitted
        #[arg(long)]
        jar: Option<String>,

        /// Java sources for javadoc and parameter names (Android builds use <sdk_root>/sources/<api>)
        #[arg(long, requires = "jar")]
        sources: Option<String>,

        /// Android platform, e.g. android-25
        #[arg(long)]
        api: Option<String>,

        /// Android SDK folder (defaults to $ANDROID_SDK)
        #[arg(long)]
        sdk_root: Option<PathBuf>,

        /// Cache file to write
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Load a cache file and summarise it, or describe one type
    Load {
        cache: Option<String>,

        /// Libraries to load from a zipped cache, with their dependencies
        #[arg(long, value_delimiter = ',')]
        filter: Vec<String>,

        /// Type to describe, e.g. java/util/ArrayList
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Parse a class generic signature and print it back
    Signature { signature: String },
}

/// Library settings with command line values taking precedence over the settings file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibrarySettings {
    pub sdk_root: Option<PathBuf>,
    pub api: Option<String>,
    pub cache_path: Option<String>,
    pub libraries: Vec<String>,
}

impl LibrarySettings {
    /// Fill anything left unset from `fallback`.
    pub fn or_from(self, fallback: Option<&dyn LibraryConfigProvider>) -> Self {
        let Some(fallback) = fallback else {
            return self;
        };
        Self {
            sdk_root: self.sdk_root.or_else(|| fallback.sdk_root()),
            api: self.api.or_else(|| fallback.api_level().map(str::to_string)),
            cache_path: self
                .cache_path
                .or_else(|| fallback.cache_path().map(str::to_string)),
            libraries: if self.libraries.is_empty() {
                fallback.libraries().to_vec()
            } else {
                self.libraries
            },
        }
    }
}

impl LibraryConfigProvider for LibrarySettings {
    fn sdk_root(&self) -> Option<PathBuf> {
        self.sdk_root.clone()
    }

    fn api_level(&self) -> Option<&str> {
        self.api.as_deref()
    }

    fn cache_path(&self) -> Option<&str> {
        self.cache_path.as_deref()
    }

    fn libraries(&self) -> &[String] {
        &self.libraries
    }
}

impl Validate for LibrarySettings {
    fn validate(&self) -> Result<()> {
        if let Some(api) = &self.api {
            validate_api_level("api", api)?;
        }
        if let Some(path) = &self.cache_path {
            validate_path("cache", path)?;
            validate_file_extension("cache", path, &["json", "zip"])?;
        }
        Ok(())
    }
}
