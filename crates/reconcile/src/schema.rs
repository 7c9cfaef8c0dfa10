//! Declared attribute schema per resource kind.
//!
//! Both kinds are replace-only: every user-settable attribute forces a new
//! resource when it changes, and `id` is computed by the reconciler.

use serde_json::{Map, Value};

use crate::error::ResourceKind;

/// One declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSchema {
    /// Attribute name as it appears in configuration.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Must be set in configuration.
    pub required: bool,
    /// Set by the reconciler, never by configuration.
    pub computed: bool,
    /// A change destroys and recreates the resource.
    pub force_new: bool,
    /// Value must be masked in plans and logs.
    pub sensitive: bool,
}

impl AttributeSchema {
    const fn input(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
            computed: false,
            force_new: true,
            sensitive: false,
        }
    }

    const fn secret(name: &'static str, description: &'static str) -> Self {
        Self { sensitive: true, ..Self::input(name, description) }
    }

    const fn id(description: &'static str) -> Self {
        Self {
            name: "id",
            description,
            required: false,
            computed: true,
            force_new: false,
            sensitive: false,
        }
    }
}

/// The declared schema of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSchema {
    /// Kind this schema describes.
    pub kind: ResourceKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Declared attributes.
    pub attributes: &'static [AttributeSchema],
}

/// Schema of `etcd_key_value`.
pub const KEY_VALUE_SCHEMA: ResourceSchema = ResourceSchema {
    kind: ResourceKind::KeyValue,
    description: "A single key/value entry, created only if the key is absent.",
    attributes: &[
        AttributeSchema::id("The key, once the entry has been created."),
        AttributeSchema::input("key", "Key to create. Must not be empty."),
        AttributeSchema::input("value", "Value stored under the key. May be empty."),
    ],
};

/// Schema of `etcd_user`.
pub const USER_SCHEMA: ResourceSchema = ResourceSchema {
    kind: ResourceKind::User,
    description: "A user account registered with the cluster's authentication store.",
    attributes: &[
        AttributeSchema::id("The username, once the user has been created."),
        AttributeSchema::input("username", "Name of the user. Must not be empty."),
        AttributeSchema::secret("password", "Password of the user, at least 10 characters."),
    ],
};

/// Returns `true` if `name` is declared sensitive by any resource kind.
#[must_use]
pub fn is_sensitive(name: &str) -> bool {
    ResourceKind::ALL
        .iter()
        .filter_map(|kind| ResourceSchema::of(*kind).attribute(name))
        .any(|attribute| attribute.sensitive)
}

impl ResourceSchema {
    /// Returns the schema of `kind`.
    #[must_use]
    pub fn of(kind: ResourceKind) -> &'static Self {
        match kind {
            ResourceKind::KeyValue => &KEY_VALUE_SCHEMA,
            ResourceKind::User => &USER_SCHEMA,
        }
    }

    /// The resource type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeSchema> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Attributes configuration must set.
    pub fn required(&self) -> impl Iterator<Item = &'static AttributeSchema> {
        self.attributes.iter().filter(|attribute| attribute.required)
    }

    /// Names of the force-new attributes whose value differs between `prior`
    /// and `desired`. Empty means the resource can stay as it is.
    #[must_use]
    pub fn requires_replacement(
        &self,
        prior: &Map<String, Value>,
        desired: &Map<String, Value>,
    ) -> Vec<&'static str> {
        self.attributes
            .iter()
            .filter(|attribute| attribute.force_new && !attribute.computed)
            .filter(|attribute| prior.get(attribute.name) != desired.get(attribute.name))
            .map(|attribute| attribute.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[rstest]
    #[case::key_value(ResourceKind::KeyValue, &["key", "value"])]
    #[case::user(ResourceKind::User, &["username", "password"])]
    fn test_required_inputs_force_replacement(
        #[case] kind: ResourceKind,
        #[case] expected: &[&str],
    ) {
        let schema = ResourceSchema::of(kind);
        let required: Vec<&str> = schema.required().map(|a| a.name).collect();
        assert_eq!(required, expected);
        assert!(schema.required().all(|a| a.force_new && !a.computed));
    }

    #[rstest]
    #[case::key_value(ResourceKind::KeyValue)]
    #[case::user(ResourceKind::User)]
    fn test_id_is_computed(#[case] kind: ResourceKind) {
        let id = ResourceSchema::of(kind).attribute("id");
        assert!(id.is_some_and(|a| a.computed && !a.required && !a.force_new));
    }

    #[test]
    fn test_only_password_is_sensitive() {
        let sensitive: Vec<&str> = ResourceKind::ALL
            .iter()
            .flat_map(|kind| ResourceSchema::of(*kind).attributes)
            .filter(|a| a.sensitive)
            .map(|a| a.name)
            .collect();
        assert_eq!(sensitive, vec!["password"]);
    }

    #[test]
    fn test_requires_replacement_lists_changed_inputs() {
        let prior = object(json!({ "id": "k", "key": "k", "value": "a" }));
        let same = object(json!({ "key": "k", "value": "a" }));
        let changed = object(json!({ "key": "k", "value": "b" }));

        assert!(KEY_VALUE_SCHEMA.requires_replacement(&prior, &same).is_empty());
        assert_eq!(KEY_VALUE_SCHEMA.requires_replacement(&prior, &changed), vec!["value"]);
    }

    #[rstest]
    #[case::password("password", true)]
    #[case::username("username", false)]
    #[case::value("value", false)]
    #[case::undeclared("token", false)]
    fn test_is_sensitive(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_sensitive(name), expected);
    }

    #[test]
    fn test_type_name_follows_kind() {
        assert_eq!(KEY_VALUE_SCHEMA.type_name(), "etcd_key_value");
        assert_eq!(USER_SCHEMA.type_name(), "etcd_user");
    }
}
