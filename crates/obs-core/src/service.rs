//! Observation service
//!
//! Ties the registry, the factory, the filter translator and a store
//! together. Built once at startup and shared by reference; holds no
//! per-request state.

use std::sync::Arc;
use std::time::Duration;

use obs_observation::{
    Filter, FilterTranslator, GenericValidator, NewObservation, Observation, ObservationFactory,
    PayloadValidator, Referenceable, SearchParams,
};
use obs_store::{FileStore, MemoryStore, ObservationStore, RequestContext, DEFAULT_TIMEOUT};
use obs_taxonomy::{Resolved, TaxonomyRegistry};
use serde_json::Value as JsonValue;

use crate::clock::{Clock, IdGenerator, SystemClock, UuidIds};
use crate::config::{ServiceConfig, StoreBackend, GENERIC_UPLOAD_PROCESS};
use crate::error::ServiceError;

/// Creates, records and queries observations
pub struct ObservationService {
    registry: Arc<TaxonomyRegistry>,
    factory: ObservationFactory,
    translator: FilterTranslator,
    store: Arc<dyn ObservationStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    generic_process_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for ObservationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationService")
            .field("taxonomy", &self.registry.version())
            .field("clock", &self.clock)
            .field("ids", &self.ids)
            .field("generic_process_id", &self.generic_process_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ObservationService {
    /// Start building a service
    #[inline]
    #[must_use]
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Build a service from configuration: load the definitions, compile
    /// their schemas and open the configured store
    ///
    /// # Errors
    /// Returns error if the definitions cannot be loaded, a schema does not
    /// compile, or the store cannot be opened
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;

        let registry = match &config.taxonomy.path {
            Some(path) => TaxonomyRegistry::from_path(path)?,
            None => TaxonomyRegistry::builtin()?,
        };
        tracing::info!(version = %registry.version(), "taxonomy loaded");

        let store: Arc<dyn ObservationStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File => Arc::new(
                FileStore::open(&config.store.directory)
                    .await
                    .map_err(|e| ServiceError::storage("open", e))?,
            ),
        };

        Self::builder()
            .registry(Arc::new(registry))
            .store(store)
            .generic_process_id(&config.generic_process_id)
            .timeout(config.store_timeout())
            .build()
    }

    /// Fresh request context bounded by the configured store timeout
    #[inline]
    #[must_use]
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.timeout)
    }

    /// The taxonomy, for the definitions listing
    #[inline]
    #[must_use]
    pub fn definitions(&self) -> &TaxonomyRegistry {
        &self.registry
    }

    /// Validate and store a submission
    ///
    /// When the registry knows the submission's property type, `result` is
    /// also checked against that type's schema.
    ///
    /// # Errors
    /// Returns validation failures, or a storage failure
    pub async fn create(
        &self,
        ctx: &RequestContext,
        new_obs: NewObservation,
    ) -> Result<Observation, ServiceError> {
        let property_type = self
            .registry
            .property_type_by_id(&new_obs.property_type.id);

        let observation = self
            .factory
            .create_checked(new_obs, property_type, self.ids.next_id(), self.clock.now())
            .map_err(|e| {
                tracing::warn!(error = %e, "observation rejected");
                ServiceError::from(e)
            })?;

        self.persist(ctx, observation).await
    }

    /// Resolve a slug triple and check a payload against the resolved
    /// property type, without storing anything
    ///
    /// # Errors
    /// Returns a resolution miss naming the unresolved segment, or the
    /// payload's validation failures
    pub fn check_payload(
        &self,
        feature_type_slug: &str,
        property_slug: &str,
        property_type_slug: &str,
        payload: &JsonValue,
    ) -> Result<Resolved<'_>, ServiceError> {
        let resolved = self
            .registry
            .resolve(feature_type_slug, property_slug, property_type_slug)
            .map_err(|e| {
                tracing::warn!(error = %e, "taxonomy resolution failed");
                e
            })?;
        tracing::debug!(
            feature_type = %resolved.feature_type.id,
            property = %resolved.property.id,
            property_type = %resolved.property_type.id,
            "resolved taxonomy triple"
        );

        self.factory
            .validator()
            .payload()
            .validate(payload, resolved.property_type)
            .map_err(|e| {
                tracing::warn!(error = %e, "payload rejected");
                ServiceError::from(e)
            })?;

        Ok(resolved)
    }

    /// Record a payload through the taxonomy: resolve the slugs, validate
    /// the payload against the property type, then store a synthesized
    /// observation of `feature_id`
    ///
    /// # Errors
    /// Returns a resolution miss naming the unresolved segment, payload
    /// validation failures, structural failures (e.g. a malformed
    /// `feature_id`), or a storage failure
    pub async fn record(
        &self,
        ctx: &RequestContext,
        feature_type_slug: &str,
        property_slug: &str,
        property_type_slug: &str,
        feature_id: &str,
        payload: JsonValue,
    ) -> Result<Observation, ServiceError> {
        let resolved = self.check_payload(
            feature_type_slug,
            property_slug,
            property_type_slug,
            &payload,
        )?;

        let new_obs = NewObservation::new(
            Referenceable::new(feature_id),
            Referenceable::new(&resolved.feature_type.id).with_label(&resolved.feature_type.name),
            Referenceable::new(&resolved.property.id).with_label(&resolved.property.name),
            Referenceable::new(&resolved.property_type.id)
                .with_label(&resolved.property_type.name),
            Referenceable::new(&self.generic_process_id),
            payload,
        );

        let observation = self
            .factory
            .create(new_obs, self.ids.next_id(), self.clock.now())
            .map_err(|e| {
                tracing::warn!(error = %e, "observation rejected");
                ServiceError::from(e)
            })?;

        self.persist(ctx, observation).await
    }

    /// [`Self::record`] from an undecoded request body
    ///
    /// # Errors
    /// Returns [`ServiceError::MalformedPayload`] if the body is not JSON,
    /// otherwise as [`Self::record`]
    pub async fn record_raw(
        &self,
        ctx: &RequestContext,
        feature_type_slug: &str,
        property_slug: &str,
        property_type_slug: &str,
        feature_id: &str,
        body: &[u8],
    ) -> Result<Observation, ServiceError> {
        let payload: JsonValue = serde_json::from_slice(body)
            .map_err(|e| ServiceError::MalformedPayload(e.to_string()))?;

        self.record(
            ctx,
            feature_type_slug,
            property_slug,
            property_type_slug,
            feature_id,
            payload,
        )
        .await
    }

    /// Fetch one observation
    ///
    /// # Errors
    /// Returns [`ServiceError::NotFound`] if absent, or a storage failure
    pub async fn find(&self, ctx: &RequestContext, id: &str) -> Result<Observation, ServiceError> {
        ctx.run("find_by_id", self.store.find_by_id(id))
            .await
            .map_err(|e| ServiceError::storage("find_by_id", e))
    }

    /// Observations matching every filter, most recent first
    ///
    /// # Errors
    /// Returns a filter error before touching the store, or a storage
    /// failure; no matches is an empty list
    pub async fn list(
        &self,
        ctx: &RequestContext,
        filters: &[Filter],
    ) -> Result<Vec<Observation>, ServiceError> {
        let query = self.translator.translate(filters).map_err(|e| {
            tracing::warn!(error = %e, "unsupported filter");
            e
        })?;
        tracing::debug!(clauses = query.clauses.len(), "translated filters");

        ctx.run("find_many", self.store.find_many(&query))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "listing observations failed");
                ServiceError::storage("find_many", e)
            })
    }

    /// [`Self::list`] from a JSON search document
    ///
    /// # Errors
    /// As [`Self::list`], plus a filter error if the document is malformed
    pub async fn search(
        &self,
        ctx: &RequestContext,
        search: &str,
    ) -> Result<Vec<Observation>, ServiceError> {
        let params = SearchParams::from_json(search)?;
        self.list(ctx, &params.filters).await
    }

    async fn persist(
        &self,
        ctx: &RequestContext,
        observation: Observation,
    ) -> Result<Observation, ServiceError> {
        if let Err(e) = ctx.run("save", self.store.save(&observation)).await {
            tracing::error!(id = observation.id(), error = %e, "saving observation failed");
            return Err(ServiceError::storage("save", e));
        }

        tracing::info!(
            id = observation.id(),
            feature = observation.feature_id(),
            property_type = observation.property_type_id(),
            "observation recorded"
        );
        Ok(observation)
    }
}

/// Builder for [`ObservationService`]
///
/// Unset collaborators fall back to the built-in definitions, an
/// in-memory store, the system clock and random UUIDs.
#[derive(Default)]
pub struct ServiceBuilder {
    registry: Option<Arc<TaxonomyRegistry>>,
    store: Option<Arc<dyn ObservationStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    translator: FilterTranslator,
    generic_process_id: Option<String>,
    timeout: Option<Duration>,
}

impl ServiceBuilder {
    /// With definitions
    #[must_use]
    pub fn registry(mut self, registry: Arc<TaxonomyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// With store
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ObservationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// With clock
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// With id generator
    #[must_use]
    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// With filter translator
    #[must_use]
    pub fn translator(mut self, translator: FilterTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// With generic upload process id
    #[must_use]
    pub fn generic_process_id(mut self, id: impl Into<String>) -> Self {
        self.generic_process_id = Some(id.into());
        self
    }

    /// With per-call store timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Compile the payload schemas and assemble the service
    ///
    /// # Errors
    /// Returns error if the built-in definitions are needed and invalid,
    /// or a schema does not compile
    pub fn build(self) -> Result<ObservationService, ServiceError> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(TaxonomyRegistry::builtin()?),
        };
        let payload = PayloadValidator::new(&registry)?;
        let factory = ObservationFactory::new(GenericValidator::new(Arc::new(payload)));

        Ok(ObservationService {
            registry,
            factory,
            translator: self.translator,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidIds)),
            generic_process_id: self
                .generic_process_id
                .unwrap_or_else(|| GENERIC_UPLOAD_PROCESS.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}
