use crate::config::generate::generate_starter_config;
use crate::config::user_config_path;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Try ~/.config/bundlelog/config.yml first
    let config_path = match user_config_path() {
        Some(user_config) => match user_config.parent().map(fs::create_dir_all) {
            Some(Err(_)) => {
                eprintln!("Warning: Could not create {}", user_config.display());
                eprintln!("Falling back to /etc/bundlelog/config.yml");
                None
            }
            _ => Some(user_config),
        },
        None => None,
    };
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("/etc/bundlelog/config.yml"));

    if config_path.exists() {
        eprintln!("Remove it first or use --stdout to print the config");
        return Err(format!("config file already exists at {}", config_path.display()).into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

pub fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;

    println!("Validating config file: {}", path.display());

    match crate::config::load_config(&path) {
        Ok(_) => {
            println!("✓ Config is valid");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Config validation failed:\n{}", e);
            Err(e.into())
        }
    }
}
