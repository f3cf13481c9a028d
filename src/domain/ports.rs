use crate::utils::error::Result;
use std::path::PathBuf;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Where library inputs and the type cache live, regardless of whether the values came
/// from the command line or a TOML file.
pub trait LibraryConfigProvider: Send + Sync {
    fn sdk_root(&self) -> Option<PathBuf>;
    fn api_level(&self) -> Option<&str>;
    fn cache_path(&self) -> Option<&str>;
    fn libraries(&self) -> &[String];
}
