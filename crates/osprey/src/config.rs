//! Process-wide library configuration parsed from `--osp:` flags.

use crate::device::DeviceKind;
use crate::error::{Error, Result};
use log::LevelFilter;

pub const FLAG_PREFIX: &str = "--osp:";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Stderr,
    Stdout,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryConfig {
    pub debug: bool,
    /// 0 warns only, 1 adds info, 2 adds debug, 3 and above trace.
    pub log_level: u8,
    pub log_output: LogOutput,
    /// Render threads; 0 lets the device decide.
    pub num_threads: usize,
    pub set_affinity: Option<bool>,
    pub device: DeviceKind,
    /// The `--osp:` flags exactly as given, for devices that parse their own.
    pub flags: Vec<String>,
    /// Library flags no device understands; warned about when the library starts.
    pub unknown_flags: Vec<String>,
}

impl LibraryConfig {
    /// Splits library flags out of `args`.
    ///
    /// Returns the configuration and every argument that was not a library
    /// flag, in order. Unknown `--osp:` flags are dropped and kept in
    /// `unknown_flags`.
    pub fn from_args<I, S>(args: I) -> Result<(Self, Vec<String>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = LibraryConfig::default();
        let mut rest = Vec::new();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let Some(flag) = arg.strip_prefix(FLAG_PREFIX) else {
                rest.push(arg);
                continue;
            };

            let (name, inline_value) = match flag.split_once('=') {
                Some((name, value)) => (name.to_string(), Some(value.to_string())),
                None => (flag.to_string(), None),
            };
            config.flags.push(arg.clone());

            let mut value = |config: &mut LibraryConfig| -> Result<String> {
                if let Some(value) = inline_value.clone() {
                    return Ok(value);
                }
                let value = args.next().ok_or_else(|| Error::InvalidFlag {
                    flag: arg.clone(),
                    reason: "missing value".to_string(),
                })?;
                config.flags.push(value.clone());
                Ok(value)
            };

            match name.as_str() {
                "debug" => {
                    config.debug = true;
                    config.log_level = config.log_level.max(2);
                    config.num_threads = 1;
                }
                "verbose" => config.log_level = config.log_level.max(1),
                "vv" => config.log_level = config.log_level.max(2),
                "loglevel" => {
                    let raw = value(&mut config)?;
                    config.log_level = parse_number(&arg, &raw)?;
                }
                "logoutput" => {
                    let raw = value(&mut config)?;
                    config.log_output = match raw.as_str() {
                        "cout" | "stdout" => LogOutput::Stdout,
                        "cerr" | "stderr" => LogOutput::Stderr,
                        _ => {
                            return Err(Error::InvalidFlag {
                                flag: arg,
                                reason: format!("unknown log output '{raw}'"),
                            })
                        }
                    };
                }
                "numthreads" => {
                    let raw = value(&mut config)?;
                    config.num_threads = parse_number(&arg, &raw)?;
                }
                "setaffinity" => {
                    let raw = value(&mut config)?;
                    let on: u8 = parse_number(&arg, &raw)?;
                    config.set_affinity = Some(on != 0);
                }
                "device" => {
                    let raw = value(&mut config)?;
                    config.device = raw.parse().map_err(|_| Error::InvalidFlag {
                        flag: arg.clone(),
                        reason: format!("unknown device '{raw}'"),
                    })?;
                }
                _ => config.unknown_flags.push(arg),
            }
        }

        Ok((config, rest))
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::InvalidFlag {
        flag: flag.to_string(),
        reason: format!("expected a number, got '{raw}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn library_flags_are_stripped_in_order() {
        let (config, rest) = LibraryConfig::from_args(args(&[
            "tutorial",
            "--osp:debug",
            "--width",
            "64",
            "--osp:numthreads",
            "3",
            "--height=48",
        ]))
        .unwrap();

        assert_eq!(rest, args(&["tutorial", "--width", "64", "--height=48"]));
        assert!(config.debug);
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.log_level_filter(), LevelFilter::Debug);
        assert_eq!(config.flags, args(&["--osp:debug", "--osp:numthreads", "3"]));
    }

    #[test]
    fn inline_values_and_devices() {
        let (config, rest) =
            LibraryConfig::from_args(["--osp:loglevel=3", "--osp:device=native"]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(config.log_level, 3);
        assert_eq!(config.device, DeviceKind::Native);
    }

    #[test]
    fn unknown_flags_are_dropped() {
        let (config, rest) = LibraryConfig::from_args(["--osp:mpi", "scene.json"]).unwrap();
        assert_eq!(rest, args(&["scene.json"]));
        assert_eq!(config, LibraryConfig {
            flags: args(&["--osp:mpi"]),
            unknown_flags: args(&["--osp:mpi"]),
            ..LibraryConfig::default()
        });
    }

    #[test]
    fn missing_or_malformed_values_fail() {
        assert!(matches!(
            LibraryConfig::from_args(["--osp:numthreads"]),
            Err(Error::InvalidFlag { .. })
        ));
        assert!(matches!(
            LibraryConfig::from_args(["--osp:numthreads", "many"]),
            Err(Error::InvalidFlag { .. })
        ));
        assert!(matches!(
            LibraryConfig::from_args(["--osp:logoutput", "syslog"]),
            Err(Error::InvalidFlag { .. })
        ));
    }
}
