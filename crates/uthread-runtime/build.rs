//! Build script for uthread-runtime
//!
//! Handles configuration merging:
//! 1. Start with library defaults
//! 2. If UTHREAD_CONFIG_RS env var is set, parse user's config file
//! 3. Merge user values over defaults (user wins)
//! 4. Generate OUT_DIR/uthread_merged_config.rs
//!
//! User only needs to specify values they want to change.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration parameter definition
struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

/// All configuration parameters with their defaults
const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "STACK_SIZE",
        rust_type: "usize",
        default_value: "256 * 1024", // 256KB
    },
    ConfigParam {
        name: "MAX_UTHREADS",
        rust_type: "usize",
        default_value: "65_536",
    },
    ConfigParam {
        name: "GUARD_PAGES",
        rust_type: "usize",
        default_value: "1",
    },
    ConfigParam {
        name: "DEBUG_LOGGING",
        rust_type: "bool",
        default_value: "false",
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("uthread_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("UTHREAD_CONFIG_RS").ok();
    if let Some(user_path) = &user_path {
        println!("cargo:rerun-if-changed={}", user_path);

        match fs::read_to_string(user_path) {
            Ok(content) => {
                for unknown in parse_and_merge(&content, &mut config) {
                    println!("cargo:warning=Unknown config parameter: {}", unknown);
                }
                println!("cargo:warning=Using custom config: {}", user_path);
            }
            Err(e) => {
                println!(
                    "cargo:warning=Failed to read UTHREAD_CONFIG_RS ({}): {}",
                    user_path, e
                );
            }
        }
    }

    println!("cargo:rerun-if-env-changed=UTHREAD_CONFIG_RS");
    println!("cargo:rerun-if-changed=build.rs");

    let output = generate_config(&config, user_path.is_some());
    fs::write(&dest_path, &output).expect("Failed to write merged config");
}

/// Merge `pub const NAME: TYPE = VALUE;` lines over the defaults.
///
/// Returns the names that are not known parameters.
fn parse_and_merge(content: &str, config: &mut HashMap<&str, String>) -> Vec<String> {
    let mut unknown = Vec::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("//") || !line.starts_with("pub const ") {
            continue;
        }

        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };

        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => unknown.push(name),
        }
    }

    unknown
}

/// Parse a single const line and return (name, value)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();

    let colon_pos = rest.find(':')?;
    let name = rest[..colon_pos].trim().to_string();

    let eq_pos = rest.find('=')?;
    let semi_pos = rest.rfind(';').unwrap_or(rest.len());
    if semi_pos <= eq_pos {
        return None;
    }

    let value = rest[eq_pos + 1..semi_pos].trim().to_string();
    if value.is_empty() {
        return None;
    }

    Some((name, value))
}

/// Generate the merged config Rust file
fn generate_config(config: &HashMap<&str, String>, has_user_config: bool) -> String {
    let mut output = String::new();

    output.push_str("// Auto-generated by build.rs - do not edit\n");
    output.push_str("// Configuration merged from library defaults");
    if has_user_config {
        output.push_str(" and user's uthread_config.rs");
    }
    output.push_str("\n\n");

    for param in CONFIG_PARAMS {
        let value = config
            .get(param.name)
            .map(String::as_str)
            .unwrap_or(param.default_value);
        output.push_str(&format!(
            "pub const {}: {} = {};\n",
            param.name, param.rust_type, value
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_const_line() {
        let result = parse_const_line("pub const MAX_UTHREADS: usize = 128;");
        assert_eq!(result, Some(("MAX_UTHREADS".into(), "128".into())));

        let result = parse_const_line("pub const STACK_SIZE: usize = 64 * 1024;");
        assert_eq!(result, Some(("STACK_SIZE".into(), "64 * 1024".into())));

        assert_eq!(parse_const_line("pub const BROKEN: usize;"), None);
    }

    #[test]
    fn test_parse_and_merge() {
        let mut config: HashMap<&str, String> = HashMap::new();
        config.insert("STACK_SIZE", "256 * 1024".into());

        let user_config = r#"
            // Custom config
            pub const STACK_SIZE: usize = 1024 * 1024;
            pub const DEBUG_LOGGING: bool = true;
            pub const WORKERS: usize = 4;
        "#;

        let unknown = parse_and_merge(user_config, &mut config);

        assert_eq!(config.get("STACK_SIZE"), Some(&"1024 * 1024".to_string()));
        assert_eq!(config.get("DEBUG_LOGGING"), Some(&"true".to_string()));
        assert_eq!(unknown, vec!["WORKERS".to_string()]);
    }
}
