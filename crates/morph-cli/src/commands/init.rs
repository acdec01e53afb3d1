//! `morph init` — scaffold a service definition and a starter schema.

use std::fs;
use std::path::Path;

use anyhow::bail;

use morph_core::config::ServiceConfig;

const STARTER_SCHEMA: &str = "type User {\n  id: ID! @unique\n  name: String!\n}\n";

pub fn init(path: &str, name: Option<&str>) -> anyhow::Result<()> {
    let dir = Path::new(path);
    let config_path = dir.join("morph.toml");
    if config_path.is_file() {
        bail!("{} already exists", config_path.display());
    }

    let service_name = match name {
        Some(name) => name.to_string(),
        None => dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "service".to_string()),
    };

    fs::create_dir_all(dir)?;
    let config = ServiceConfig::scaffold(&service_name, "dev", "local", "http://localhost:4466");
    config.write_to(&config_path)?;

    let schema_dir = dir.join("schema");
    fs::create_dir_all(&schema_dir)?;
    let schema_file = schema_dir.join("datamodel.graphql");
    if !schema_file.is_file() {
        fs::write(&schema_file, STARTER_SCHEMA)?;
    }

    println!("Created {}", config_path.display());
    println!("Created {}", schema_file.display());
    println!("Next: adjust the schema, then run `morph deploy`.");
    Ok(())
}
