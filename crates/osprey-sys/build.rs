use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_INCLUDE_DIR: &str = "/usr/local/include";
const DEFAULT_LIB_DIR: &str = "/usr/local/lib";
const DEFAULT_LIB_NAME: &str = "ospray";
const DEFAULT_MAJOR_VERSION: &str = "1";
const DEFAULT_MINOR_VERSION: &str = "0";

fn main() -> Result<()> {
    for var in [
        "OSPRAY_INCLUDE_DIR",
        "OSPRAY_LIB_DIR",
        "OSPRAY_LIB_NAME",
        "MAJOR_VERSION",
        "MINOR_VERSION",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let include_dir = PathBuf::from(var_or("OSPRAY_INCLUDE_DIR", DEFAULT_INCLUDE_DIR));
    let lib_dir = PathBuf::from(var_or("OSPRAY_LIB_DIR", DEFAULT_LIB_DIR));
    let lib_name = var_or("OSPRAY_LIB_NAME", DEFAULT_LIB_NAME);
    let major = parse_version("MAJOR_VERSION", DEFAULT_MAJOR_VERSION)?;
    let minor = parse_version("MINOR_VERSION", DEFAULT_MINOR_VERSION)?;

    let header = include_dir.join("ospray").join("ospray.h");
    if !header.exists() {
        println!(
            "cargo:warning=ospray header not found at {}; set OSPRAY_INCLUDE_DIR",
            header.display()
        );
    }

    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=dylib={lib_name}");
    println!("cargo:rustc-env=OSPREY_SYS_MAJOR_VERSION={major}");
    println!("cargo:rustc-env=OSPREY_SYS_MINOR_VERSION={minor}");
    println!("cargo:include={}", include_dir.display());

    Ok(())
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_version(name: &str, default: &str) -> Result<u32> {
    let raw = var_or(name, default);
    let value = raw
        .trim()
        .parse::<u32>()
        .with_context(|| format!("{name} must be an unsigned integer, got {raw:?}"))?;
    if value > 999 {
        return Err(anyhow!("{name} out of range: {value}"));
    }
    Ok(value)
}
