//! Build script for uthread-runtime
//!
//! Configuration merging:
//! 1. Start with library defaults
//! 2. If UTH_CONFIG_RS is set, parse the user's config file
//! 3. Merge user values over defaults (user wins)
//! 4. Generate OUT_DIR/uth_merged_config.rs
//!
//! The user file only lists the values it changes.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "MAX_THREADS",
        rust_type: "usize",
        default_value: "100",
    },
    ConfigParam {
        name: "STACK_SIZE",
        rust_type: "usize",
        default_value: "64 * 1024",
    },
    ConfigParam {
        name: "QUANTUM_USECS",
        rust_type: "i64",
        default_value: "10_000",
    },
    ConfigParam {
        name: "DEBUG_LOGGING",
        rust_type: "bool",
        default_value: "false",
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("uth_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("UTH_CONFIG_RS").ok();
    if let Some(path) = &user_path {
        println!("cargo:rerun-if-changed={}", path);

        match fs::read_to_string(path) {
            Ok(content) => {
                for unknown in parse_and_merge(&content, &mut config) {
                    println!("cargo:warning=Unknown config parameter: {}", unknown);
                }
                println!("cargo:warning=Using custom config: {}", path);
            }
            Err(e) => {
                println!("cargo:warning=Failed to read UTH_CONFIG_RS ({}): {}", path, e);
            }
        }
    }
    println!("cargo:rerun-if-env-changed=UTH_CONFIG_RS");

    let output = generate_config(&config, user_path.is_some());
    fs::write(&dest_path, output).expect("Failed to write merged config");
}

/// Merge `pub const NAME: TYPE = VALUE;` lines into `config`
///
/// Returns the names that are not known parameters; those are skipped.
fn parse_and_merge(content: &str, config: &mut HashMap<&str, String>) -> Vec<String> {
    let mut unknown = Vec::new();

    for line in content.lines().map(str::trim) {
        if !line.starts_with("pub const ") {
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

/// Split one const line into (name, value)
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

fn generate_config(config: &HashMap<&str, String>, custom: bool) -> String {
    let mut output = String::new();

    output.push_str("// Auto-generated by build.rs - do not edit\n");
    output.push_str("// Configuration merged from library defaults");
    if custom {
        output.push_str(" and UTH_CONFIG_RS");
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
        assert_eq!(
            parse_const_line("pub const MAX_THREADS: usize = 250;"),
            Some(("MAX_THREADS".into(), "250".into()))
        );
        assert_eq!(
            parse_const_line("pub const STACK_SIZE: usize = 128 * 1024;"),
            Some(("STACK_SIZE".into(), "128 * 1024".into()))
        );
        assert_eq!(parse_const_line("pub const BROKEN: usize;"), None);
    }

    #[test]
    fn test_parse_and_merge() {
        let mut config: HashMap<&str, String> = HashMap::new();
        config.insert("MAX_THREADS", "100".into());
        config.insert("QUANTUM_USECS", "10_000".into());

        let user_config = r#"
            // Small and fast
            pub const MAX_THREADS: usize = 16;
            pub const QUANTUM_USECS: i64 = 500;
            pub const WORKERS: usize = 4;
        "#;

        let unknown = parse_and_merge(user_config, &mut config);

        assert_eq!(config.get("MAX_THREADS"), Some(&"16".to_string()));
        assert_eq!(config.get("QUANTUM_USECS"), Some(&"500".to_string()));
        assert_eq!(unknown, vec!["WORKERS".to_string()]);
    }

    #[test]
    fn test_generate_defaults() {
        let config = HashMap::new();
        let out = generate_config(&config, false);
        assert!(out.contains("pub const MAX_THREADS: usize = 100;"));
        assert!(out.contains("pub const QUANTUM_USECS: i64 = 10_000;"));
    }
}
