//! # Reconciliation Driver
//!
//! One pass walks a fixed sequence of states:
//!
//! ```text
//! ResolvingDbCoordinates -> BuildingCoreCredentials -> BuildingOptionalBundles -> Done
//!            \___________________________\_______________________\______-> Failed
//! ```
//!
//! Every secret goes through create-if-absent, so a pass only ever adds
//! records. A failure stops the pass where it is; secrets created before the
//! failure stay, and re-running picks up from there.
//!
//! Passwords generated for secrets that were actually created are kept in a
//! [`PassCache`] for the rest of the pass, so dependent bundles embed the
//! same value the owning service will use.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, info_span, Instrument};

use crate::bundles::dispatcher::DispatcherPasswords;
use crate::bundles::metadata::{MetadataPasswords, METADATA_SERVICE};
use crate::bundles::service_tokens::TokenRequest;
use crate::bundles::{
    audit, database, dispatcher, identity, metadata, service_tokens, signing, storage,
    BuiltBundle, BundleKind, DbCoordinates, PassCache, Payload, SecretNamer,
};
use crate::errors::{Result, SeederError};
use crate::event::{RequestType, ResourceEvent, ResourceResponse};
use crate::invocation::InvocationContext;
use crate::random;
use crate::secrets::{CreateOptions, SecretGateway, SecretString};

/// Per-service secret whose password the dispatcher's indexing job reuses
const INDEXD_SERVICE: &str = "indexd";

/// Suffix of the physical resource id derived when the event carries none
const PHYSICAL_ID_SUFFIX: &str = "g3auto-secrets";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    ResolvingDbCoordinates,
    BuildingCoreCredentials,
    BuildingOptionalBundles,
    Done,
    Failed,
}

impl ReconcileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolvingDbCoordinates => "ResolvingDbCoordinates",
            Self::BuildingCoreCredentials => "BuildingCoreCredentials",
            Self::BuildingOptionalBundles => "BuildingOptionalBundles",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub physical_resource_id: String,
    /// Names created by this pass, in creation order. Secrets that already
    /// existed are not listed.
    pub created: Vec<String>,
}

/// One target of a pass and whether the store already has it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub name: String,
    pub kind: BundleKind,
    pub present: bool,
}

/// `<project>-<env>-g3auto-secrets`
pub fn default_physical_resource_id(project: &str, env: &str) -> String {
    format!("{}-{}-{}", project, env, PHYSICAL_ID_SUFFIX)
}

/// Physical id for a response when the properties could not be parsed.
fn fallback_physical_resource_id(event: &ResourceEvent) -> String {
    if let Some(id) = &event.physical_resource_id {
        return id.clone();
    }
    let props = &event.resource_properties;
    let field = |key: &str| props.get(key).and_then(Value::as_str);
    match (field("project"), field("envName")) {
        (Some(project), Some(env)) => default_physical_resource_id(project, env),
        _ => PHYSICAL_ID_SUFFIX.to_string(),
    }
}

/// Drives reconciliation passes against one secret store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    gateway: SecretGateway,
}

impl Reconciler {
    pub fn new(gateway: SecretGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &SecretGateway {
        &self.gateway
    }

    /// Handle a lifecycle event and render the response. Never fails: errors
    /// become a `FAILED` response.
    pub async fn handle_event(&self, event: &ResourceEvent) -> ResourceResponse {
        if event.request_type == RequestType::Delete {
            // Secrets outlive the stack; nothing is touched
            info!(
                physical_resource_id = ?event.physical_resource_id,
                "Delete requested; leaving secrets in place"
            );
            let physical_resource_id = fallback_physical_resource_id(event);
            return ResourceResponse::success(event, physical_resource_id, Vec::new());
        }

        let context = match InvocationContext::from_properties(&event.resource_properties) {
            Ok(context) => context,
            Err(e) => {
                error!(error = %e, "Rejected resource properties");
                let physical_resource_id = fallback_physical_resource_id(event);
                return ResourceResponse::failure(event, physical_resource_id, Vec::new(), &e);
            }
        };

        let physical_resource_id = event.physical_resource_id.clone().unwrap_or_else(|| {
            default_physical_resource_id(&context.project, &context.env_name)
        });

        let (created, result) = self.run(&context, Some(event.request_type)).await;
        match result {
            Ok(()) => ResourceResponse::success(event, physical_resource_id, created),
            Err(e) => ResourceResponse::failure(event, physical_resource_id, created, &e),
        }
    }

    /// Run one pass for an already-parsed invocation.
    pub async fn reconcile(&self, context: &InvocationContext) -> Result<ReconcileOutcome> {
        let (created, result) = self.run(context, None).await;
        result?;
        Ok(ReconcileOutcome {
            physical_resource_id: default_physical_resource_id(&context.project, &context.env_name),
            created,
        })
    }

    /// Names created by the pass, even when it failed part way, with its result.
    async fn run(
        &self,
        context: &InvocationContext,
        request_type: Option<RequestType>,
    ) -> (Vec<String>, Result<()>) {
        let span = info_span!(
            "reconcile",
            project = %context.project,
            env = %context.env_name,
            request_type = request_type.map_or("Direct", |r| r.as_str()),
        );

        async move {
            let mut pass = Pass::new(&self.gateway, context);
            let result = pass.execute().await;
            match &result {
                Ok(()) => {
                    info!(
                        created = pass.created.len(),
                        state = %pass.state,
                        "Reconciliation complete"
                    );
                }
                Err(e) => {
                    error!(
                        state = %ReconcileState::Failed,
                        failed_in = ?e.step(),
                        created = ?pass.created,
                        error = %e,
                        "Reconciliation failed"
                    );
                }
            }
            (pass.created, result)
        }
        .instrument(span)
        .await
    }

    /// Target names an invocation would produce, in pass order, with their
    /// current presence. Creates nothing.
    pub async fn plan(&self, context: &InvocationContext) -> Result<Vec<PlanEntry>> {
        let namer = SecretNamer::new(&context.project, &context.env_name);

        let mut targets: Vec<(String, BundleKind)> = context
            .services
            .iter()
            .map(|service| (namer.service(service), BundleKind::DatabaseCredential))
            .collect();
        targets.extend(
            BundleKind::OPTIONAL_ORDER
                .into_iter()
                .filter(|kind| context.create.is_enabled(*kind))
                .map(|kind| (namer.bundle(kind), kind)),
        );

        let mut entries = Vec::with_capacity(targets.len());
        for (name, kind) in targets {
            let present = self.gateway.exists(&name).await.map_err(|e| e.in_step(&name))?;
            entries.push(PlanEntry { name, kind, present });
        }
        Ok(entries)
    }
}

/// State of a single pass
struct Pass<'a> {
    gateway: &'a SecretGateway,
    context: &'a InvocationContext,
    namer: SecretNamer,
    state: ReconcileState,
    coordinates: Option<DbCoordinates>,
    cache: PassCache,
    created: Vec<String>,
}

impl<'a> Pass<'a> {
    fn new(gateway: &'a SecretGateway, context: &'a InvocationContext) -> Self {
        Self {
            gateway,
            context,
            namer: SecretNamer::new(&context.project, &context.env_name),
            state: ReconcileState::ResolvingDbCoordinates,
            coordinates: None,
            cache: PassCache::new(),
            created: Vec::new(),
        }
    }

    fn enter(&mut self, state: ReconcileState) {
        debug!(from = %self.state, to = %state, "State transition");
        self.state = state;
    }

    fn create_options(&self) -> CreateOptions<'a> {
        let context = self.context;
        CreateOptions {
            encryption_key_id: context.encryption_key_id.as_deref(),
            tags: Some(&context.tags),
        }
    }

    async fn execute(&mut self) -> Result<()> {
        self.enter(ReconcileState::ResolvingDbCoordinates);
        let coordinates = self
            .resolve_db_coordinates()
            .await
            .map_err(|e| e.in_step(ReconcileState::ResolvingDbCoordinates.as_str()))?;
        debug!(host = %coordinates.host, port = %coordinates.port, "Resolved database coordinates");
        self.coordinates = Some(coordinates);

        self.enter(ReconcileState::BuildingCoreCredentials);
        let context = self.context;
        for service in &context.services {
            let name = self.namer.service(service);
            self.core_credential(service).await.map_err(|e| e.in_step(&name))?;
        }

        self.enter(ReconcileState::BuildingOptionalBundles);
        for kind in BundleKind::OPTIONAL_ORDER {
            if !context.create.is_enabled(kind) {
                debug!(bundle = %kind, flag = kind.flag_name(), "Bundle disabled");
                continue;
            }
            let name = self.namer.bundle(kind);
            self.optional_bundle(kind).await.map_err(|e| e.in_step(&name))?;
        }

        self.enter(ReconcileState::Done);
        Ok(())
    }

    async fn resolve_db_coordinates(&self) -> Result<DbCoordinates> {
        let host = self.context.db_host_override.as_deref();
        let port = self.context.db_port_override.as_deref();
        if host.is_some() && port.is_some() {
            return DbCoordinates::resolve(host, port, None);
        }

        let master_name = self.context.master_secret_name.as_deref().ok_or_else(|| {
            SeederError::missing_db_coordinates("no overrides and no masterSecretName given")
        })?;
        let master = self.gateway.try_read_json(master_name).await?.ok_or_else(|| {
            SeederError::missing_db_coordinates(format!("master secret {} not found", master_name))
        })?;

        DbCoordinates::resolve(host, port, Some(&master))
    }

    fn coordinates(&self) -> Result<&DbCoordinates> {
        self.coordinates
            .as_ref()
            .ok_or_else(|| SeederError::missing_db_coordinates("coordinates were not resolved"))
    }

    fn password(&self) -> Result<SecretString> {
        random::generate_password(self.context.password_length)
    }

    /// Cached per-service password from this pass, else a fresh one.
    fn reuse_or_generate(&self, service: &str) -> Result<SecretString> {
        match self.cache.db_password(service) {
            Some(password) => Ok(password.clone()),
            None => self.password(),
        }
    }

    async fn core_credential(&mut self, service: &str) -> Result<()> {
        let password = self.password()?;
        let bundle = database::build(&self.namer, service, self.coordinates()?, &password);

        if self.persist(&bundle).await? {
            self.cache.record_db_password(service, password);
        }
        Ok(())
    }

    async fn optional_bundle(&mut self, kind: BundleKind) -> Result<()> {
        match kind {
            BundleKind::Metadata => {
                metadata::hostname(&self.context.g3auto)?;
                let passwords = MetadataPasswords {
                    db_password: self.reuse_or_generate(METADATA_SERVICE)?,
                    admin_password: self.password()?,
                };
                let coordinates = self.coordinates()?;
                let bundle =
                    metadata::build(&self.namer, &self.context.g3auto, coordinates, &passwords)?;
                if self.persist(&bundle).await? {
                    self.cache.record_metadata_admin(passwords.admin_password);
                }
            }
            BundleKind::IdentityBroker => {
                let bundle = identity::build(&self.namer, &self.context.g3auto)?;
                self.persist(&bundle).await?;
            }
            BundleKind::PelicanStorage => {
                let bundle = storage::build_pelican(&self.namer, &self.context.g3auto)?;
                self.persist(&bundle).await?;
            }
            BundleKind::ManifestStorage => {
                let bundle = storage::build_manifest(&self.namer, &self.context.g3auto)?;
                self.persist(&bundle).await?;
            }
            BundleKind::Audit => {
                let bundle = audit::build(&self.namer, &self.context.g3auto)?;
                self.persist(&bundle).await?;
            }
            BundleKind::DispatcherJob => {
                let passwords = DispatcherPasswords {
                    indexing: self.reuse_or_generate(INDEXD_SERVICE)?,
                    metadata_service: self.reuse_or_generate(METADATA_SERVICE)?,
                };
                let (bundle, indexing) =
                    dispatcher::build(&self.namer, &self.context.g3auto, &passwords)?;
                if self.persist(&bundle).await? {
                    self.cache.record_dispatcher_indexing(indexing);
                }
            }
            BundleKind::ServiceTokens => {
                let request = TokenRequest {
                    users: self.context.indexd_service_users.as_deref(),
                    static_tokens: &self.context.indexd_service_static,
                };
                let bundle =
                    service_tokens::build(&self.namer, request, &self.cache, self.gateway).await?;
                self.persist(&bundle).await?;
            }
            BundleKind::SigningKey => {
                // Key generation is slow; skip it when the secret is already there
                if self.gateway.exists(&self.namer.bundle(kind)).await? {
                    debug!(bundle = %kind, "Signing key already present");
                    return Ok(());
                }
                let bundle = signing::build(&self.namer, self.context.signing_key_bits)?;
                self.persist(&bundle).await?;
            }
            BundleKind::DatabaseCredential => {}
        }
        Ok(())
    }

    /// Create-if-absent; records the name when this pass created it.
    async fn persist(&mut self, bundle: &BuiltBundle) -> Result<bool> {
        let options = self.create_options();
        let created = match &bundle.payload {
            Payload::Json(value) => {
                self.gateway.create_if_absent(&bundle.name, value, options).await?
            }
            Payload::Plain(raw) => {
                let raw = raw.expose_secret();
                self.gateway.create_plain_if_absent(&bundle.name, raw, options).await?
            }
        };

        if created {
            self.created.push(bundle.name.clone());
        } else {
            debug!(secret = %bundle.name, bundle = %bundle.kind, "Left existing secret untouched");
        }
        Ok(created)
    }
}
