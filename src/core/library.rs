use crate::core::classfile::decode_class;
use crate::core::source::{parse_java_source, SourceFile};
use crate::core::type_map::TypeMap;
use crate::domain::model::DecodedClass;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, TypeInfoError};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::LazyLock;
use zip::ZipArchive;

const MANIFEST_ENTRY: &str = "manifest.json";
const ANDROID_SDK_ENV: &str = "ANDROID_SDK";

/// `pkg/Name.class` and `pkg/Name$Inner.class`; anonymous and local classes don't match.
static CLASS_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+/[a-zA-Z_]\w*(\$[a-zA-Z_]\w*)*)\.class$").expect("valid class entry regex")
});

#[derive(Debug, Clone, Default)]
pub struct AndroidLibraryOptions {
    /// Platform name, e.g. `android-25`.
    pub api: String,
    /// Android SDK folder; the `ANDROID_SDK` environment variable when unset.
    pub sdk_root: Option<PathBuf>,
}

impl AndroidLibraryOptions {
    pub fn new(api: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            sdk_root: None,
        }
    }

    pub fn with_sdk_root(mut self, sdk_root: impl Into<PathBuf>) -> Self {
        self.sdk_root = Some(sdk_root.into());
        self
    }

    fn resolved_sdk_root(&self) -> Result<PathBuf> {
        match &self.sdk_root {
            Some(root) => Ok(root.clone()),
            None => std::env::var_os(ANDROID_SDK_ENV)
                .map(PathBuf::from)
                .ok_or_else(|| TypeInfoError::MissingConfigError {
                    field: "sdk_root".to_string(),
                }),
        }
    }

    pub fn jar_path(&self) -> Result<PathBuf> {
        Ok(self
            .resolved_sdk_root()?
            .join("platforms")
            .join(&self.api)
            .join("android.jar"))
    }

    /// `<sdk_root>/sources/<api>`, where the SDK keeps the platform's Java sources.
    pub fn source_path(&self) -> Result<PathBuf> {
        Ok(self.resolved_sdk_root()?.join("sources").join(&self.api))
    }
}

/// Reads and writes library type caches through a [`Storage`].
pub struct LibraryLoader<S: Storage> {
    storage: S,
}

impl<S: Storage> LibraryLoader<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Add the types held in a cache file to `types`.
    ///
    /// A `.zip` cache holds a `manifest.json` mapping each library to its dependencies and
    /// one JSON array per library under `cache/`. With a `filter`, only the entries for the
    /// named libraries and everything they depend on are loaded. Any other file is read as
    /// a single JSON array.
    pub async fn load_java_library_cache_file(
        &self,
        cache_file: &str,
        filter: Option<&[String]>,
        mut types: TypeMap,
    ) -> Result<TypeMap> {
        let data = self.storage.read_file(cache_file).await?;
        tracing::debug!("Read cache file {} ({} bytes)", cache_file, data.len());

        let is_zip = cache_file.to_ascii_lowercase().ends_with(".zip");
        let filter = filter.map(<[String]>::to_vec);
        let decoded = tokio::task::spawn_blocking(move || {
            let documents = if is_zip {
                read_zipped_cache(data, filter.as_deref())?
            } else {
                vec![data]
            };
            documents
                .iter()
                .map(|doc| parse_cache_document(doc))
                .collect::<Result<Vec<_>>>()
        })
        .await??;

        let mut added = 0;
        for classes in decoded {
            added += types.extend_from_decoded(classes);
        }
        tracing::info!("Loaded {} types from {}", added, cache_file);
        Ok(types)
    }

    /// Decode every class in a jar (or the `classes.jar` inside an `.aar`), write them to
    /// `cache_file` as a JSON array and return the resulting types.
    ///
    /// With a `source_base`, each `pkg/Outer$Inner` class takes its javadoc and parameter
    /// names from `<source_base>/pkg/Outer.java` when that file exists and parses.
    pub async fn create_java_library_cache_file(
        &self,
        jar_file: &str,
        source_base: Option<&str>,
        cache_file: &str,
    ) -> Result<TypeMap> {
        let data = self.storage.read_file(jar_file).await?;
        let is_aar = jar_file.to_ascii_lowercase().ends_with(".aar");
        let jar_name = jar_file.to_string();

        let decoded = tokio::task::spawn_blocking(move || {
            let jar = if is_aar { extract_classes_jar(data)? } else { data };
            decode_jar(&jar, &jar_name)
        })
        .await??;

        let decoded = match source_base {
            Some(source_base) => self.add_source_information(decoded, source_base).await?,
            None => decoded,
        };

        let json = serde_json::to_vec(&decoded)?;
        self.storage.write_file(cache_file, &json).await?;
        tracing::info!(
            "Wrote {} decoded types from {} to {}",
            decoded.len(),
            jar_file,
            cache_file
        );

        let mut types = TypeMap::new();
        types.extend_from_decoded(decoded);
        Ok(types)
    }

    pub async fn create_android_library_cache_file(
        &self,
        cache_file: &str,
        options: &AndroidLibraryOptions,
    ) -> Result<TypeMap> {
        let jar = options.jar_path()?;
        let sources = options.source_path()?.to_string_lossy().into_owned();
        tracing::debug!("Using Android platform library {}", jar.display());
        self.create_java_library_cache_file(&jar.to_string_lossy(), Some(sources.as_str()), cache_file)
            .await
    }

    async fn add_source_information(
        &self,
        mut decoded: Vec<DecodedClass>,
        source_base: &str,
    ) -> Result<Vec<DecodedClass>> {
        let top_level: BTreeSet<String> = decoded
            .iter()
            .map(|class| top_level_name(&class.thisclass).to_string())
            .collect();

        let mut sources = Vec::new();
        for name in top_level {
            let path = format!("{}/{}.java", source_base.trim_end_matches('/'), name);
            match self.storage.read_file(&path).await {
                Ok(data) => sources.push((name, path, data)),
                Err(e) => tracing::debug!("No source for {}: {}", name, e),
            }
        }
        if sources.is_empty() {
            tracing::warn!("No Java sources found under {}", source_base);
            return Ok(decoded);
        }

        let decoded = tokio::task::spawn_blocking(move || {
            let mut parsed: HashMap<String, SourceFile> = HashMap::new();
            for (name, path, data) in sources {
                match parse_java_source(&String::from_utf8_lossy(&data)) {
                    Ok(file) => {
                        parsed.insert(name, file);
                    }
                    Err(e) => tracing::warn!("Skipping source {}: {}", path, e),
                }
            }

            let mut documented = 0;
            for class in decoded.iter_mut() {
                let source_type = parsed
                    .get(top_level_name(&class.thisclass))
                    .and_then(|file| file.find_type(&class.thisclass));
                if let Some(source_type) = source_type {
                    source_type.populate(class);
                    documented += 1;
                }
            }
            tracing::info!(
                "Added source information to {} of {} types",
                documented,
                decoded.len()
            );
            decoded
        })
        .await?;
        Ok(decoded)
    }
}

/// `a/b/Outer` for `a/b/Outer$Inner`.
fn top_level_name(short_signature: &str) -> &str {
    short_signature
        .split_once('$')
        .map_or(short_signature, |(top, _)| top)
}

/// The cache documents selected from a zipped cache.
fn read_zipped_cache(data: Vec<u8>, filter: Option<&[String]>) -> Result<Vec<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let wanted = match filter {
        Some(libraries) => {
            let manifest: HashMap<String, serde_json::Value> =
                serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)?;
            Some(with_dependencies(libraries, &manifest))
        }
        None => None,
    };

    let mut documents = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !entry.is_file() || !name.starts_with("cache/") || !name.ends_with(".json") {
            continue;
        }
        if let Some(wanted) = &wanted {
            if !wanted.iter().any(|lib| name.contains(lib.as_str())) {
                continue;
            }
        }
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        tracing::debug!("Selected cache entry {}", name);
        documents.push(buf);
    }
    Ok(documents)
}

/// `libraries` plus their dependencies, recursively, in discovery order.
fn with_dependencies(libraries: &[String], manifest: &HashMap<String, serde_json::Value>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut pending: Vec<String> = libraries.iter().rev().cloned().collect();
    while let Some(lib) = pending.pop() {
        if found.contains(&lib) {
            continue;
        }
        if let Some(serde_json::Value::Array(deps)) = manifest.get(&lib) {
            pending.extend(deps.iter().rev().filter_map(|d| d.as_str().map(str::to_string)));
        }
        found.push(lib);
    }
    found
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

fn parse_cache_document(data: &[u8]) -> Result<Vec<DecodedClass>> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    if !value.is_array() {
        return Err(TypeInfoError::cache_format("Cache data is not a JSON array"));
    }
    Ok(serde_json::from_value(value)?)
}

fn extract_classes_jar(aar: Vec<u8>) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(aar))?;
    let name = archive
        .file_names()
        .find(|name| name.ends_with("classes.jar"))
        .map(str::to_string)
        .ok_or_else(|| TypeInfoError::cache_format("AAR archive has no classes.jar"))?;
    read_entry(&mut archive, &name)
}

/// Decoded classes of a jar, sorted by name. Entries that fail to decode are skipped.
fn decode_jar(jar: &[u8], jar_name: &str) -> Result<Vec<DecodedClass>> {
    let mut archive = ZipArchive::new(Cursor::new(jar))?;
    let mut decoded = Vec::new();
    let mut skipped = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.is_file() || !CLASS_ENTRY.is_match(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        match decode_class(&bytes) {
            Ok(class) => decoded.push(class),
            Err(e) => {
                tracing::warn!("Skipping {} in {}: {}", name, jar_name, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("{} class entries in {} could not be decoded", skipped, jar_name);
    }
    decoded.sort_by(|a, b| a.thisclass.cmp(&b.thisclass));
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_entry_pattern() {
        assert!(CLASS_ENTRY.is_match("java/util/List.class"));
        assert!(CLASS_ENTRY.is_match("java/util/Map$Entry.class"));
        assert!(!CLASS_ENTRY.is_match("java/util/Foo$1.class"));
        assert!(!CLASS_ENTRY.is_match("module-info.class"));
        assert!(!CLASS_ENTRY.is_match("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_dependencies_are_followed_once() {
        let manifest: HashMap<String, serde_json::Value> = serde_json::from_str(
            r#"{
                "androidx.cardview:cardview": ["androidx.annotation:annotation"],
                "androidx.annotation:annotation": ["androidx.cardview:cardview"],
                "other": "not-a-list"
            }"#,
        )
        .unwrap();

        let libs = with_dependencies(&["androidx.cardview:cardview".to_string()], &manifest);
        assert_eq!(
            libs,
            vec!["androidx.cardview:cardview", "androidx.annotation:annotation"]
        );

        let libs = with_dependencies(&["other".to_string()], &manifest);
        assert_eq!(libs, vec!["other"]);
    }

    #[test]
    fn test_cache_document_must_be_array() {
        let err = parse_cache_document(br#"{"thisclass": "a/B"}"#).unwrap_err();
        assert!(matches!(err, TypeInfoError::CacheFormatError { .. }));
        assert!(parse_cache_document(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_android_jar_path() {
        let options = AndroidLibraryOptions::new("android-25").with_sdk_root("/opt/sdk");
        assert_eq!(
            options.jar_path().unwrap(),
            PathBuf::from("/opt/sdk/platforms/android-25/android.jar")
        );
        assert_eq!(
            options.source_path().unwrap(),
            PathBuf::from("/opt/sdk/sources/android-25")
        );
    }

    #[test]
    fn test_sdk_root_falls_back_to_environment() {
        let options = AndroidLibraryOptions::new("android-30");
        let previous = std::env::var_os(ANDROID_SDK_ENV);

        std::env::set_var(ANDROID_SDK_ENV, "/env/sdk");
        let jar = options.jar_path();
        let sources = options.source_path();
        std::env::remove_var(ANDROID_SDK_ENV);
        let missing = options.jar_path();
        if let Some(previous) = previous {
            std::env::set_var(ANDROID_SDK_ENV, previous);
        }

        assert_eq!(
            jar.unwrap(),
            PathBuf::from("/env/sdk/platforms/android-30/android.jar")
        );
        assert_eq!(sources.unwrap(), PathBuf::from("/env/sdk/sources/android-30"));
        assert!(matches!(
            missing,
            Err(TypeInfoError::MissingConfigError { ref field }) if field == "sdk_root"
        ));
    }

    #[test]
    fn test_top_level_name() {
        assert_eq!(top_level_name("java/util/Map$Entry"), "java/util/Map");
        assert_eq!(top_level_name("java/util/Map"), "java/util/Map");
    }
}
