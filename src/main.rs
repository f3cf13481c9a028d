use anyhow::Context;
use clap::Parser;
use java_typeinfo::core::signature::parse_type_declaration_signature;
use java_typeinfo::core::type_map::TypeMap;
use java_typeinfo::domain::ports::LibraryConfigProvider;
use java_typeinfo::utils::logger;
use java_typeinfo::utils::validation::{validate_required_field, Validate};
use java_typeinfo::{
    decode_class_file, AndroidLibraryOptions, ClassType, CliConfig, Command, LibraryLoader,
    LibrarySettings, LocalStorage, TomlConfig, TypeInfoError,
};
use std::time::Instant;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    let file_config = match config.config.as_ref().map(TomlConfig::from_file).transpose() {
        Ok(file_config) => file_config,
        Err(e) => {
            eprintln!("❌ Failed to load config file: {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let json_logs = config.json_logs || file_config.as_ref().is_some_and(TomlConfig::json_logs);
    if json_logs {
        logger::init_json_logger();
    } else {
        logger::init_logger(
            config.verbose,
            file_config.as_ref().and_then(TomlConfig::log_level),
        );
    }
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = run(config.command, file_config.as_ref()).await {
        tracing::error!("❌ {:#}", e);
        match e.downcast_ref::<TypeInfoError>() {
            Some(err) => {
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 {}", err.recovery_suggestion());
            }
            None => eprintln!("❌ {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(command: Command, file_config: Option<&TomlConfig>) -> anyhow::Result<()> {
    if let Some(file_config) = file_config {
        file_config.validate()?;
    }
    let fallback = file_config.map(|c| c as &dyn LibraryConfigProvider);
    let loader = LibraryLoader::new(LocalStorage::default());

    match command {
        Command::Decode { class_file, pretty } => {
            let decoded = decode_class_file(&class_file)
                .with_context(|| format!("decoding {}", class_file.display()))?;
            let json = if pretty {
                serde_json::to_string_pretty(&decoded)?
            } else {
                serde_json::to_string(&decoded)?
            };
            println!("{}", json);
        }

        Command::BuildCache {
            jar,
            sources,
            api,
            sdk_root,
            output,
        } => {
            let settings = LibrarySettings {
                sdk_root,
                api,
                cache_path: output,
                libraries: Vec::new(),
            }
            .or_from(fallback);
            settings.validate()?;

            let cache_path = validate_required_field("output", &settings.cache_path)?;

            let started = Instant::now();
            let types = match jar {
                Some(jar) => {
                    tracing::info!("Building cache {} from {}", cache_path, jar);
                    loader
                        .create_java_library_cache_file(&jar, sources.as_deref(), cache_path)
                        .await?
                }
                None => {
                    let api = validate_required_field("api", &settings.api)?;
                    let mut options = AndroidLibraryOptions::new(api);
                    options.sdk_root = settings.sdk_root();
                    tracing::info!("Building cache {} for {}", cache_path, api);
                    loader
                        .create_android_library_cache_file(cache_path, &options)
                        .await?
                }
            };
            println!(
                "✅ Wrote {} types to {} in {}ms",
                types.len(),
                cache_path,
                started.elapsed().as_millis()
            );
        }

        Command::Load {
            cache,
            filter,
            type_name,
        } => {
            let settings = LibrarySettings {
                cache_path: cache,
                libraries: filter,
                ..Default::default()
            }
            .or_from(fallback);
            settings.validate()?;

            let cache_path = validate_required_field("cache", &settings.cache_path)?;
            let filter = (!settings.libraries().is_empty()).then(|| settings.libraries());

            let started = Instant::now();
            let types = loader
                .load_java_library_cache_file(cache_path, filter, TypeMap::new())
                .await?;
            println!(
                "Loaded {} types from {} packages in {}ms",
                types.len(),
                types.packages().len(),
                started.elapsed().as_millis()
            );

            if let Some(name) = type_name {
                let ty = types
                    .find_by_name(&name)
                    .with_context(|| format!("type {} is not in the cache", name))?;
                describe_type(ty, &types);
            }
        }

        Command::Signature { signature } => {
            let parsed = parse_type_declaration_signature(&signature)?;
            for tv in &parsed.type_variables {
                let bounds: Vec<String> = tv
                    .bounds
                    .iter()
                    .map(|b| format!("{} {}", b.kind(), b.signature))
                    .collect();
                println!("{}: {}", tv.name, bounds.join(", "));
            }
            for sup in &parsed.superclasses {
                println!("super {}", sup);
            }
            println!("{}", parsed);
        }
    }

    Ok(())
}

fn describe_type(ty: &ClassType, types: &TypeMap) {
    println!(
        "{}{} {}",
        ty.modifiers().label(),
        ty.kind(),
        ty.fully_dotted_raw_name()
    );
    for sup in ty.supers(types) {
        println!("  : {}", sup.fully_dotted_type_name());
    }
    for field in ty.fields() {
        println!("  {}", field.label(ty, types));
    }
    for constructor in ty.constructors() {
        println!("  {}", constructor.label(ty, types));
    }
    for method in ty.methods() {
        println!("  {}", method.label(ty, types));
    }
}
