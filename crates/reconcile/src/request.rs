//! Decoding of untyped attribute maps into typed configurations.
//!
//! The transport hands attributes over as a JSON object. They are checked
//! against the declared [`ResourceSchema`] first, so every problem is
//! reported on the attribute it concerns, and then deserialized into the
//! per-kind configuration type. Computed attributes are ignored on input.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::{ReconcileError, ReconcileResult},
    key_value::KeyValueConfig,
    schema::{KEY_VALUE_SCHEMA, ResourceSchema, USER_SCHEMA},
    user::UserConfig,
};

/// An untyped attribute map.
pub type Attributes = Map<String, Value>;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyValueAttributes {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UserAttributes {
    username: String,
    password: String,
}

/// Decodes `etcd_key_value` attributes.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] naming the first unknown,
/// missing or non-string attribute.
pub fn decode_key_value(attributes: &Attributes) -> ReconcileResult<KeyValueConfig> {
    let decoded: KeyValueAttributes = decode(&KEY_VALUE_SCHEMA, attributes)?;
    Ok(KeyValueConfig::new(decoded.key, decoded.value))
}

/// Decodes `etcd_user` attributes.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] naming the first unknown,
/// missing or non-string attribute.
pub fn decode_user(attributes: &Attributes) -> ReconcileResult<UserConfig> {
    let decoded: UserAttributes = decode(&USER_SCHEMA, attributes)?;
    Ok(UserConfig::new(decoded.username, decoded.password))
}

fn decode<T>(schema: &ResourceSchema, attributes: &Attributes) -> ReconcileResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let mut inputs = Attributes::new();
    for (name, value) in attributes {
        match schema.attribute(name) {
            None => {
                return Err(ReconcileError::invalid_input(
                    name.as_str(),
                    format!("unsupported attribute for {}", schema.type_name()),
                ));
            },
            Some(attribute) if attribute.computed => {},
            Some(_) => {
                inputs.insert(name.clone(), value.clone());
            },
        }
    }

    for attribute in schema.required() {
        match inputs.get(attribute.name) {
            None | Some(Value::Null) => {
                return Err(ReconcileError::invalid_input(attribute.name, "attribute is required"));
            },
            Some(Value::String(_)) => {},
            Some(_) => {
                return Err(ReconcileError::invalid_input(attribute.name, "must be a string"));
            },
        }
    }

    serde_json::from_value(Value::Object(inputs))
        .map_err(|err| ReconcileError::invalid_input(schema.type_name(), err.to_string()))
}
