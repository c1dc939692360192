//! # Schema Generator
//!
//! Prints the JSON schema of the rotator configuration file.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin schemagen > schema/configuration.schema.json
//! ```

use keyvault_rotator::config::ConfigurationFile;

fn main() {
    let schema = schemars::schema_for!(ConfigurationFile);

    match serde_json::to_string_pretty(&schema) {
        Ok(json) => {
            println!("{json}");
        }
        Err(e) => {
            eprintln!("Failed to serialize configuration schema: {e}");
            std::process::exit(1);
        }
    }
}
