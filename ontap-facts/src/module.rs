// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

//! The Ansible module boundary: argument parsing and the JSON result
//! records written to stdout.

use crate::{collector::Facts, OntapFactsError};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    fmt::Display,
    io::{self, Read},
    path::{Path, PathBuf},
    process,
    str::FromStr,
};

/// Playbooks quote scalars freely, so numeric parameters arrive as either
/// JSON numbers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber<T> {
    Number(T),
    String(String),
}

fn string_or_number<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(x) => Ok(x),
        StringOrNumber::String(s) => s.parse().map_err(de::Error::custom),
    }
}

fn opt_string_or_number<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::Number(x)) => Ok(Some(x)),
        Some(StringOrNumber::String(s)) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

fn default_server_type() -> String {
    "FILER".to_string()
}

fn default_transport_type() -> String {
    "HTTPS".to_string()
}

fn default_style() -> String {
    "LOGIN".to_string()
}

fn default_cluster_mode() -> bool {
    true
}

/// The module parameters.
///
/// `na_port` defaults per transport (443 for HTTPS, 80 for HTTP) when
/// absent. `timeout` is accepted for interface compatibility and never
/// applied.
#[derive(Debug, Deserialize)]
pub struct ModuleArgs {
    pub host: String,
    pub nauser: String,
    pub napass: String,
    #[serde(default = "default_server_type")]
    pub na_server_type: String,
    #[serde(default = "default_transport_type")]
    pub na_transport_type: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub na_port: Option<u16>,
    #[serde(default = "default_style")]
    pub na_style: String,
    /// Selects the clustered operation set; filer-oriented targets set
    /// this false to skip `cluster-identity-get`.
    #[serde(default = "default_cluster_mode")]
    pub na_cluster_mode: bool,
    #[serde(default)]
    pub logfile: Option<PathBuf>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timeout: u64,
}

#[derive(Debug, Serialize)]
struct ModuleResult {
    changed: bool,
    rc: i32,
    ansible_facts: Facts,
}

#[derive(Debug, Serialize)]
struct ModuleFailure {
    failed: bool,
    msg: String,
}

/// Parse a module-arguments document. Ansible hands new-style modules
/// their parameters wrapped in an `ANSIBLE_MODULE_ARGS` object; a bare
/// parameter object is accepted as well.
pub fn parse_args(contents: &str) -> Result<ModuleArgs, OntapFactsError> {
    let mut v: Value = serde_json::from_str(contents)?;

    let v = v
        .get_mut("ANSIBLE_MODULE_ARGS")
        .map(Value::take)
        .unwrap_or(v);

    Ok(serde_json::from_value(v)?)
}

/// Read the arguments from the file Ansible names on the command line, or
/// from stdin when invoked without one.
pub fn read_args(path: Option<&Path>) -> Result<ModuleArgs, OntapFactsError> {
    let contents = match path {
        Some(p) => std::fs::read_to_string(p)?,
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;

            s
        }
    };

    parse_args(&contents)
}

/// Report success: the facts, `changed` always false (this module never
/// mutates the target), and the conventional 0 return code.
pub fn exit_json(facts: Facts) -> ! {
    let x = ModuleResult {
        changed: false,
        rc: 0,
        ansible_facts: facts,
    };

    println!(
        "{}",
        serde_json::to_string(&x).expect("Could not serialize module result")
    );

    process::exit(0)
}

/// Report failure and terminate without emitting any facts.
pub fn fail_json(msg: impl std::fmt::Display) -> ! {
    let x = ModuleFailure {
        failed: true,
        msg: msg.to_string(),
    };

    println!(
        "{}",
        serde_json::to_string(&x).expect("Could not serialize module result")
    );

    process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_args_defaults() {
        let x = parse_args(
            r#"{"host": "filer01", "nauser": "admin", "napass": "secret"}"#,
        )
        .unwrap();

        assert_eq!(x.host, "filer01");
        assert_eq!(x.na_server_type, "FILER");
        assert_eq!(x.na_transport_type, "HTTPS");
        assert_eq!(x.na_port, None);
        assert_eq!(x.na_style, "LOGIN");
        assert!(x.na_cluster_mode);
        assert_eq!(x.logfile, None);
        assert_eq!(x.timeout, 0);
    }

    #[test]
    fn test_parse_args_ansible_wrapper() {
        let x = parse_args(
            r#"{"ANSIBLE_MODULE_ARGS": {
                  "host": "filer01",
                  "nauser": "admin",
                  "napass": "secret",
                  "na_transport_type": "HTTP",
                  "na_port": 8080,
                  "na_cluster_mode": false,
                  "logfile": "/tmp/netapp.log"
               }}"#,
        )
        .unwrap();

        assert_eq!(x.na_transport_type, "HTTP");
        assert_eq!(x.na_port, Some(8080));
        assert!(!x.na_cluster_mode);
        assert_eq!(x.logfile.as_deref(), Some(Path::new("/tmp/netapp.log")));
    }

    #[test]
    fn test_parse_args_quoted_numbers() {
        let x = parse_args(
            r#"{"host": "filer01",
                "nauser": "admin",
                "napass": "secret",
                "na_port": "8443",
                "timeout": "30"}"#,
        )
        .unwrap();

        assert_eq!(x.na_port, Some(8443));
        assert_eq!(x.timeout, 30);

        assert!(parse_args(
            r#"{"host": "filer01",
                "nauser": "admin",
                "napass": "secret",
                "na_port": "not-a-port"}"#,
        )
        .is_err());
    }

    #[test]
    fn test_parse_args_missing_credentials() {
        assert!(parse_args(r#"{"host": "filer01"}"#).is_err());
    }

    #[test]
    fn test_result_record_shape() {
        let mut facts = Facts::new();
        facts.insert("cluster_version_info".to_string(), json!({"version": "9.1"}));

        let x = ModuleResult {
            changed: false,
            rc: 0,
            ansible_facts: facts,
        };

        assert_eq!(
            serde_json::to_value(&x).unwrap(),
            json!({
                "changed": false,
                "rc": 0,
                "ansible_facts": { "cluster_version_info": { "version": "9.1" } }
            })
        );
    }

    #[test]
    fn test_failure_record_shape() {
        let x = ModuleFailure {
            failed: true,
            msg: "errno: 13005, reason: nope".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&x).unwrap(),
            json!({ "failed": true, "msg": "errno: 13005, reason: nope" })
        );
    }
}
