//! Payload validation: declarative per-resource field-constraint tables
//! interpreted by a single generic validator.
//!
//! Two modes: `Strict` for creates, where required fields must be
//! present, and `Partial` for updates, where only supplied fields are
//! checked. Unknown fields are silently discarded. Errors are collected
//! per field instead of short-circuiting on the first violation.
//!
//! The output keeps only the fields that were present and valid,
//! preserving explicit nulls, so callers can tell "key absent" apart from
//! "key present with null" when applying partial updates.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Strict,
    Partial,
}

#[derive(Debug)]
pub enum Kind {
    /// UTF-8 string with an inclusive character-count range. `max` of
    /// `usize::MAX` means unbounded.
    Str { min: usize, max: usize },
    /// String restricted to a fixed set of choices.
    Choice {
        choices: &'static [&'static str],
        message: &'static str,
    },
    /// Integer fitting in i32.
    Int,
}

#[derive(Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub nullable: bool,
    pub required_msg: &'static str,
}

pub const AUTH_SCHEMA: &[FieldRule] = &[
    FieldRule {
        name: "username",
        kind: Kind::Str { min: 3, max: 80 },
        required: true,
        nullable: false,
        required_msg: "O campo 'username' é obrigatório.",
    },
    FieldRule {
        name: "password",
        kind: Kind::Str {
            min: 6,
            max: usize::MAX,
        },
        required: true,
        nullable: false,
        required_msg: "O campo 'password' é obrigatório.",
    },
];

pub const CATEGORIA_SCHEMA: &[FieldRule] = &[
    FieldRule {
        name: "nome",
        kind: Kind::Str { min: 1, max: 120 },
        required: true,
        nullable: false,
        required_msg: "O nome da categoria é obrigatório.",
    },
    FieldRule {
        name: "descricao",
        kind: Kind::Str {
            min: 0,
            max: usize::MAX,
        },
        required: false,
        nullable: true,
        required_msg: "",
    },
];

pub const DISPOSITIVO_SCHEMA: &[FieldRule] = &[
    FieldRule {
        name: "nome",
        kind: Kind::Str { min: 1, max: 140 },
        required: true,
        nullable: false,
        required_msg: "O nome do dispositivo é obrigatório.",
    },
    FieldRule {
        name: "serial",
        kind: Kind::Str { min: 1, max: 140 },
        required: true,
        nullable: false,
        required_msg: "O serial do dispositivo é obrigatório.",
    },
    FieldRule {
        name: "status",
        kind: Kind::Choice {
            choices: &["ativo", "inativo"],
            message: "Status deve ser 'ativo' ou 'inativo'.",
        },
        required: false,
        nullable: false,
        required_msg: "",
    },
    FieldRule {
        name: "categoria_id",
        kind: Kind::Int,
        required: false,
        nullable: true,
        required_msg: "",
    },
];

/// Aggregated field errors: field name to message.
#[derive(Debug)]
pub struct ValidationErrors(pub BTreeMap<String, String>);

/// The subset of the payload that was present and passed validation,
/// explicit nulls included.
#[derive(Debug)]
pub struct ValidPayload(Map<String, Value>);

impl ValidPayload {
    /// Whether the key was supplied at all (including as null).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Present, non-null string value.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<String> {
        self.0.get(name)?.as_str().map(str::to_string)
    }

    /// Presence-aware string: `None` = key absent, `Some(None)` = key
    /// present with null, `Some(Some(_))` = key present with a value.
    #[must_use]
    pub fn opt_str(&self, name: &str) -> Option<Option<String>> {
        let value = self.0.get(name)?;
        Some(value.as_str().map(str::to_string))
    }

    /// Present, non-null integer value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn int(&self, name: &str) -> Option<i32> {
        self.0.get(name)?.as_i64().map(|v| v as i32)
    }

    /// Presence-aware integer, same convention as [`Self::opt_str`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn opt_int(&self, name: &str) -> Option<Option<i32>> {
        let value = self.0.get(name)?;
        Some(value.as_i64().map(|v| v as i32))
    }
}

fn check_value(value: &Value, kind: &Kind) -> Result<(), String> {
    match kind {
        Kind::Str { min, max } => {
            let Some(s) = value.as_str() else {
                return Err("Deve ser uma string.".to_string());
            };
            let len = s.chars().count();
            if len < *min || len > *max {
                if *max == usize::MAX {
                    return Err(format!("Deve ter no mínimo {min} caracteres."));
                }
                return Err(format!("Deve ter entre {min} e {max} caracteres."));
            }
            Ok(())
        }
        Kind::Choice { choices, message } => {
            let Some(s) = value.as_str() else {
                return Err("Deve ser uma string.".to_string());
            };
            if choices.contains(&s) {
                Ok(())
            } else {
                Err((*message).to_string())
            }
        }
        Kind::Int => {
            let in_range = value
                .as_i64()
                .is_some_and(|v| i32::try_from(v).is_ok());
            if in_range {
                Ok(())
            } else {
                Err("Deve ser um número inteiro.".to_string())
            }
        }
    }
}

/// Validate `payload` against `schema`, collecting every field error.
/// A non-object payload is treated as an empty one.
pub fn validate(
    payload: &Value,
    schema: &[FieldRule],
    mode: Mode,
) -> Result<ValidPayload, ValidationErrors> {
    let empty = Map::new();
    let object = payload.as_object().unwrap_or(&empty);

    let mut errors = BTreeMap::new();
    let mut out = Map::new();

    for rule in schema {
        match object.get(rule.name) {
            None => {
                if mode == Mode::Strict && rule.required {
                    errors.insert(rule.name.to_string(), rule.required_msg.to_string());
                }
            }
            Some(Value::Null) => {
                if rule.nullable {
                    out.insert(rule.name.to_string(), Value::Null);
                } else {
                    errors.insert(
                        rule.name.to_string(),
                        "O campo não pode ser nulo.".to_string(),
                    );
                }
            }
            Some(value) => match check_value(value, &rule.kind) {
                Ok(()) => {
                    out.insert(rule.name.to_string(), value.clone());
                }
                Err(msg) => {
                    errors.insert(rule.name.to_string(), msg);
                }
            },
        }
    }

    if errors.is_empty() {
        Ok(ValidPayload(out))
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_collects_all_missing_fields() {
        let err = validate(&json!({}), AUTH_SCHEMA, Mode::Strict).unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert!(err.0.contains_key("username"));
        assert!(err.0.contains_key("password"));
    }

    #[test]
    fn test_strict_length_bounds() {
        let err = validate(
            &json!({"username": "ab", "password": "short"}),
            AUTH_SCHEMA,
            Mode::Strict,
        )
        .unwrap_err();
        assert_eq!(err.0.len(), 2);

        let ok = validate(
            &json!({"username": "abc", "password": "longenough"}),
            AUTH_SCHEMA,
            Mode::Strict,
        )
        .unwrap();
        assert_eq!(ok.str("username").as_deref(), Some("abc"));
    }

    #[test]
    fn test_partial_skips_absent_required_fields() {
        let ok = validate(&json!({}), DISPOSITIVO_SCHEMA, Mode::Partial).unwrap();
        assert!(!ok.contains("nome"));
        assert!(!ok.contains("serial"));
    }

    #[test]
    fn test_unknown_fields_discarded() {
        let ok = validate(
            &json!({"nome": "Racks", "cor": "azul"}),
            CATEGORIA_SCHEMA,
            Mode::Strict,
        )
        .unwrap();
        assert!(ok.contains("nome"));
        assert!(!ok.contains("cor"));
    }

    #[test]
    fn test_explicit_null_preserved_for_nullable_field() {
        let ok = validate(
            &json!({"categoria_id": null}),
            DISPOSITIVO_SCHEMA,
            Mode::Partial,
        )
        .unwrap();
        assert_eq!(ok.opt_int("categoria_id"), Some(None));

        let absent = validate(&json!({}), DISPOSITIVO_SCHEMA, Mode::Partial).unwrap();
        assert_eq!(absent.opt_int("categoria_id"), None);
    }

    #[test]
    fn test_null_rejected_for_non_nullable_field() {
        let err = validate(&json!({"nome": null}), CATEGORIA_SCHEMA, Mode::Partial).unwrap_err();
        assert!(err.0.contains_key("nome"));
    }

    #[test]
    fn test_status_choices() {
        let err = validate(
            &json!({"status": "quebrado"}),
            DISPOSITIVO_SCHEMA,
            Mode::Partial,
        )
        .unwrap_err();
        assert_eq!(
            err.0.get("status").map(String::as_str),
            Some("Status deve ser 'ativo' ou 'inativo'.")
        );

        let ok = validate(
            &json!({"status": "inativo"}),
            DISPOSITIVO_SCHEMA,
            Mode::Partial,
        )
        .unwrap();
        assert_eq!(ok.str("status").as_deref(), Some("inativo"));
    }

    #[test]
    fn test_type_errors() {
        let err = validate(
            &json!({"nome": 5, "serial": "ok-1", "categoria_id": "x"}),
            DISPOSITIVO_SCHEMA,
            Mode::Strict,
        )
        .unwrap_err();
        assert!(err.0.contains_key("nome"));
        assert!(err.0.contains_key("categoria_id"));
        assert!(!err.0.contains_key("serial"));
    }
}
