//! Dispatch of lifecycle verbs by resource type name.
//!
//! [`ResourceRegistry`] is the surface the transport talks to. It speaks
//! untyped attribute maps and [`Diagnostics`]; everything below it speaks
//! typed configurations and [`ReconcileError`](crate::ReconcileError).

use std::{fmt, sync::Arc};

use etcd_provider_store::StoreClient;
use serde_json::Value;
use zeroize::Zeroize;

use crate::{
    context::OperationContext,
    diagnostics::{Diagnostic, Diagnostics},
    error::ResourceKind,
    key_value::{KeyValueReconciler, KeyValueState},
    outcome::{DeleteOutcome, ReadOutcome},
    policy,
    request::{self, Attributes},
    schema::{self, ResourceSchema},
    user::{UserConfig, UserReconciler},
};

/// Tracked state of one resource.
///
/// Sensitive attributes are redacted by `Debug` and zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct ResourceState {
    /// Resource identity.
    pub id: String,
    /// Attribute values, including the computed `id`.
    pub attributes: Attributes,
}

impl ResourceState {
    fn string_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }
}

struct RedactedAttributes<'a>(&'a Attributes);

impl fmt::Debug for RedactedAttributes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.0 {
            if schema::is_sensitive(name) {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

impl fmt::Debug for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceState")
            .field("id", &self.id)
            .field("attributes", &RedactedAttributes(&self.attributes))
            .finish()
    }
}

impl Drop for ResourceState {
    fn drop(&mut self) {
        for (name, value) in &mut self.attributes {
            match value {
                Value::String(text) if schema::is_sensitive(name) => text.zeroize(),
                _ => {},
            }
        }
    }
}

/// What applying a desired configuration requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    /// Nothing is tracked yet.
    Create,
    /// Tracked state already matches.
    NoOp,
    /// Destroy and recreate because these attributes changed.
    Replace {
        /// The changed force-new attributes.
        attributes: Vec<&'static str>,
    },
}

fn key_value_state(state: KeyValueState) -> ResourceState {
    let mut attributes = Attributes::new();
    attributes.insert("id".into(), Value::String(state.id.clone()));
    attributes.insert("key".into(), Value::String(String::from_utf8_lossy(&state.key).into()));
    attributes.insert("value".into(), Value::String(String::from_utf8_lossy(&state.value).into()));
    ResourceState { id: state.id, attributes }
}

fn user_state(id: String, config: &UserConfig) -> ResourceState {
    let mut attributes = Attributes::new();
    attributes.insert("id".into(), Value::String(id.clone()));
    attributes.insert("username".into(), Value::String(config.username.clone()));
    attributes.insert("password".into(), Value::String(config.password.as_str().to_owned()));
    ResourceState { id, attributes }
}

fn unknown_type(type_name: &str) -> Diagnostics {
    Diagnostic::error("Unknown resource type", format!("{type_name:?} is not a supported resource"))
        .into()
}

/// Routes create/read/delete/plan to the reconciler of each resource type.
///
/// | Type name | Reconciler |
/// |-----------|------------|
/// | `etcd_key_value` | [`KeyValueReconciler`] |
/// | `etcd_user` | [`UserReconciler`] |
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use etcd_provider_reconcile::{OperationContext, ResourceRegistry};
/// use etcd_provider_store::MemoryStore;
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let registry = ResourceRegistry::new(Arc::new(MemoryStore::new()));
/// let ctx = OperationContext::new();
///
/// let serde_json::Value::Object(attributes) = json!({ "key": "k", "value": "v" }) else {
///     unreachable!()
/// };
/// let state = registry.create(&ctx, "etcd_key_value", &attributes).await.unwrap();
/// assert_eq!(state.id, "k");
/// # });
/// ```
pub struct ResourceRegistry<S: ?Sized> {
    key_values: KeyValueReconciler<S>,
    users: UserReconciler<S>,
}

impl<S: ?Sized> fmt::Debug for ResourceRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("types", &ResourceKind::ALL.map(ResourceKind::type_name))
            .finish()
    }
}

impl<S: StoreClient + ?Sized> ResourceRegistry<S> {
    /// Creates a registry whose reconcilers share `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            key_values: KeyValueReconciler::new(Arc::clone(&store)),
            users: UserReconciler::new(store),
        }
    }

    /// Names of every supported resource type.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> {
        ResourceKind::ALL.into_iter().map(ResourceKind::type_name)
    }

    /// Declared schema of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic if the type is unknown.
    pub fn schema(&self, type_name: &str) -> Result<&'static ResourceSchema, Diagnostics> {
        let kind = ResourceKind::from_type_name(type_name).ok_or_else(|| unknown_type(type_name))?;
        Ok(ResourceSchema::of(kind))
    }

    /// Creates a resource from its declared attributes.
    ///
    /// # Errors
    ///
    /// Returns diagnostics for unknown types, undecodable attributes and any
    /// [`ReconcileError`](crate::ReconcileError) of the underlying create.
    #[tracing::instrument(name = "registry_create", skip(self, ctx, attributes))]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        attributes: &Attributes,
    ) -> Result<ResourceState, Diagnostics> {
        match ResourceKind::from_type_name(type_name) {
            Some(ResourceKind::KeyValue) => {
                let config = request::decode_key_value(attributes)?;
                let state = self.key_values.create(ctx, &config).await?;
                Ok(key_value_state(state))
            },
            Some(ResourceKind::User) => {
                let config = request::decode_user(attributes)?;
                let state = self.users.create(ctx, &config).await?;
                Ok(user_state(state.id, &config))
            },
            None => Err(unknown_type(type_name)),
        }
    }

    /// Refreshes tracked state.
    ///
    /// Returns `Ok(None)` when the resource is gone and must be dropped from
    /// state. Users cannot be read back, so their prior state is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns diagnostics for unknown types and read failures.
    #[tracing::instrument(name = "registry_read", skip(self, ctx, prior), fields(id = %prior.id))]
    pub async fn read(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        prior: &ResourceState,
    ) -> Result<Option<ResourceState>, Diagnostics> {
        match ResourceKind::from_type_name(type_name) {
            Some(ResourceKind::KeyValue) => {
                let key = prior.string_attribute("key").unwrap_or(&prior.id);
                match self.key_values.read(ctx, key.as_bytes()).await? {
                    ReadOutcome::Present(state) => Ok(Some(key_value_state(state))),
                    ReadOutcome::Absent => Ok(None),
                }
            },
            Some(ResourceKind::User) => Ok(Some(prior.clone())),
            None => Err(unknown_type(type_name)),
        }
    }

    /// Destroys a resource.
    ///
    /// On success the returned diagnostics hold at most a warning, emitted
    /// when the resource was already gone.
    ///
    /// # Errors
    ///
    /// Returns diagnostics for unknown types and delete failures.
    #[tracing::instrument(name = "registry_delete", skip(self, ctx, prior), fields(id = %prior.id))]
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        prior: &ResourceState,
    ) -> Result<Diagnostics, Diagnostics> {
        let kind = ResourceKind::from_type_name(type_name).ok_or_else(|| unknown_type(type_name))?;
        let identity = prior.string_attribute(kind.identity_attribute()).unwrap_or(&prior.id);

        let outcome = match kind {
            ResourceKind::KeyValue => self.key_values.delete(ctx, identity.as_bytes()).await?,
            ResourceKind::User => self.users.delete(ctx, identity).await?,
        };

        Ok(match outcome {
            DeleteOutcome::Deleted => Diagnostics::new(),
            DeleteOutcome::AlreadyAbsent => Diagnostic::warning(
                "Resource already absent",
                format!("{kind} {identity:?} did not exist; nothing was deleted"),
            )
            .into(),
        })
    }

    /// Plans the change from `prior` to `desired`.
    ///
    /// `desired` is fully validated, so policy violations surface at plan
    /// time without any store call. There is never an in-place update.
    ///
    /// # Errors
    ///
    /// Returns diagnostics for unknown types and invalid attributes.
    pub fn plan(
        &self,
        type_name: &str,
        prior: Option<&ResourceState>,
        desired: &Attributes,
    ) -> Result<PlanAction, Diagnostics> {
        let kind = ResourceKind::from_type_name(type_name).ok_or_else(|| unknown_type(type_name))?;
        match kind {
            ResourceKind::KeyValue => {
                let config = request::decode_key_value(desired)?;
                policy::validate_key(&config.key)?;
            },
            ResourceKind::User => {
                let config = request::decode_user(desired)?;
                self.users.validate(&config)?;
            },
        }

        let Some(prior) = prior else {
            return Ok(PlanAction::Create);
        };

        let changed = ResourceSchema::of(kind).requires_replacement(&prior.attributes, desired);
        if changed.is_empty() {
            Ok(PlanAction::NoOp)
        } else {
            tracing::debug!(type_name, ?changed, "replacement required");
            Ok(PlanAction::Replace { attributes: changed })
        }
    }
}
