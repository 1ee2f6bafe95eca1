//! Tiered evidence resolver
//!
//! Resolves an identifier to a document by walking the tiers in
//! [`crate::domain::TierName::CASCADE`] order, one at a time, stopping at the first tier
//! that yields usable content. Results are cached; concurrent resolutions
//! of the same identifier share one cascade.

use std::sync::Arc;

use chrono::Utc;
use evidence_identifiers::{Identifier, IdentifierKind};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cache::{CacheStore, Completion, SingleFlight};
use crate::config::{ResolverConfig, TierSettings};
use crate::domain::{CachedRecord, EvidenceSnippet, ResolvedRecord, TierAttempt};
use crate::error::{EngineError, ResolveError, Result, TierError};
use crate::evidence::{check_record, EvidenceCheck};
use crate::extract::{ContentExtractor, Extracted, PdfTextDecoder, PdfiumDecoder};
use crate::http::{HttpClient, HttpError, HttpFetch, HttpResponse, LimiterState, RateLimiters};
use crate::sources::{
    cascade_tiers, CrossrefSource, PubMedSource, SourceError, SourceTier, TierContext, TierPlan,
    WorkMetadata,
};

const METADATA_SCOPE: &str = "metadata";

/// Per-call resolution options
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Ignore cached entries and run a fresh cascade
    pub force_refresh: bool,
    /// Abort the cascade when cancelled
    pub cancel: Option<CancellationToken>,
}

impl ResolveOptions {
    pub fn force_refresh() -> Self {
        Self {
            force_refresh: true,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Content found by a winning tier
struct TierSuccess {
    document_url: String,
    text: Option<String>,
    local_path: Option<std::path::PathBuf>,
}

/// Evidence resolution engine
pub struct EvidenceResolver {
    config: ResolverConfig,
    http: Arc<dyn HttpFetch>,
    extractor: ContentExtractor,
    cache: Arc<CacheStore>,
    tiers: Vec<Box<dyn SourceTier>>,
    limiters: RateLimiters,
    flights: SingleFlight<String, Result<ResolvedRecord>>,
    pubmed: PubMedSource,
    crossref: CrossrefSource,
}

impl EvidenceResolver {
    /// Build a resolver with the reqwest client, pdfium decoder and the
    /// configured cache store
    pub fn new(config: ResolverConfig) -> std::result::Result<Self, EngineError> {
        config.validate()?;
        let http = Arc::new(HttpClient::new(&config.user_agent)?);
        let cache = match &config.cache.path {
            Some(path) => CacheStore::open(path)?,
            None => CacheStore::in_memory()?,
        };
        Self::with_components(config, http, Arc::new(PdfiumDecoder), Arc::new(cache))
    }

    /// Build a resolver from explicit parts
    pub fn with_components(
        config: ResolverConfig,
        http: Arc<dyn HttpFetch>,
        decoder: Arc<dyn PdfTextDecoder>,
        cache: Arc<CacheStore>,
    ) -> std::result::Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            tiers: cascade_tiers(&config),
            pubmed: PubMedSource::from_config(&config),
            crossref: CrossrefSource::from_config(&config),
            extractor: ContentExtractor::new(decoder),
            limiters: RateLimiters::new(),
            flights: SingleFlight::new(),
            config,
            http,
            cache,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolve an identifier string to a document
    pub async fn resolve(&self, raw: &str) -> Result<ResolvedRecord> {
        self.resolve_with(raw, ResolveOptions::default()).await
    }

    /// Resolve with explicit options.
    ///
    /// A malformed identifier fails before any cache or network access.
    pub async fn resolve_with(&self, raw: &str, options: ResolveOptions) -> Result<ResolvedRecord> {
        let identifier = Identifier::parse(raw)?;
        self.resolve_identifier(&identifier, options).await
    }

    /// Resolve an already-parsed identifier
    pub async fn resolve_identifier(
        &self,
        identifier: &Identifier,
        options: ResolveOptions,
    ) -> Result<ResolvedRecord> {
        let cancel = options.cancel.unwrap_or_default();
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled {
                identifier: identifier.clone(),
            });
        }

        if !options.force_refresh {
            if let Some(outcome) = self.lookup_cache(identifier) {
                return outcome;
            }
        }

        // A refresh waits out any in-flight cascade, then leads under the same key
        let key = identifier.cache_key();
        let force_refresh = options.force_refresh;
        let work = || self.lead(identifier, force_refresh, &cancel);
        let outcome = async {
            if force_refresh {
                self.flights.run_after(&key, work).await
            } else {
                self.flights.run(&key, work).await
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResolveError::Cancelled {
                identifier: identifier.clone(),
            }),
            outcome = outcome => outcome,
        }
    }

    /// Check a snippet against an identifier's abstract and full text
    pub async fn assess(&self, raw: &str, snippet: &EvidenceSnippet) -> Result<EvidenceCheck> {
        let resolved = self.resolve(raw).await?;
        Ok(check_record(&resolved.record, snippet, &self.config.scoring))
    }

    /// Cached outcome, if one should answer without a cascade
    fn lookup_cache(&self, identifier: &Identifier) -> Option<Result<ResolvedRecord>> {
        match self.cache.get(identifier) {
            Ok(Some(record)) => {
                tracing::debug!("Cache hit for {}", identifier);
                return Some(Ok(ResolvedRecord {
                    record,
                    attempts: Vec::new(),
                    from_cache: true,
                }));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", identifier, e),
        }

        match self.cache.get_negative(identifier) {
            Ok(Some(entry))
                if entry.suppresses_cascade(
                    self.config.cache.negative_ttl(),
                    self.config.cache.max_cascades_per_identifier,
                    Utc::now(),
                ) =>
            {
                tracing::debug!(
                    "Negative cache hit for {} ({} failed cascades)",
                    identifier,
                    entry.cascade_count
                );
                Some(Err(ResolveError::NotFound {
                    identifier: identifier.clone(),
                    attempts: entry.attempts,
                }))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Negative cache read failed for {}: {}", identifier, e);
                None
            }
        }
    }

    /// Work done by the single-flight leader
    async fn lead(
        &self,
        identifier: &Identifier,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Completion<Result<ResolvedRecord>> {
        // A previous leader may have finished between our lookup and joining
        if !force_refresh {
            if let Some(outcome) = self.lookup_cache(identifier) {
                return Completion::Publish(outcome);
            }
        } else if let Err(e) = self.cache.clear_negative(identifier) {
            tracing::warn!("Failed to clear negative entry for {}: {}", identifier, e);
        }

        match self.cascade(identifier, cancel).await {
            Err(ResolveError::Cancelled { identifier }) => {
                tracing::info!("Resolution of {} cancelled", identifier);
                Completion::Withdraw(Err(ResolveError::Cancelled { identifier }))
            }
            outcome => Completion::Publish(outcome),
        }
    }

    async fn cascade(
        &self,
        identifier: &Identifier,
        cancel: &CancellationToken,
    ) -> Result<ResolvedRecord> {
        let cancelled = || ResolveError::Cancelled {
            identifier: identifier.clone(),
        };

        let metadata = if self.config.fetch_metadata {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                metadata = self.fetch_metadata(identifier) => metadata,
            }
        } else {
            WorkMetadata::default()
        };

        let ctx = TierContext::new(identifier)
            .with_linked_doi(metadata.doi.as_deref())
            .with_title(metadata.title.as_deref());

        tracing::info!("Resolving {}", identifier);
        let mut attempts = Vec::with_capacity(self.tiers.len());

        for tier in &self.tiers {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let urls = match tier.plan(&ctx) {
                TierPlan::Fetch(urls) => urls,
                TierPlan::Skip(reason) => {
                    tracing::debug!("Skipping tier {} for {}: {}", tier.name(), identifier, reason);
                    attempts.push(TierAttempt::skipped(tier.name(), reason));
                    continue;
                }
            };

            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                outcome = self.attempt_tier(tier.as_ref(), &urls, identifier) => outcome,
            };
            let latency = started.elapsed();

            match outcome {
                Ok(success) => {
                    tracing::info!(
                        "Tier {} resolved {} to {}",
                        tier.name(),
                        identifier,
                        success.document_url
                    );
                    attempts.push(TierAttempt::success(tier.name(), latency));

                    let doi = ctx.doi.map(str::to_string);
                    let record = CachedRecord {
                        identifier: identifier.clone(),
                        title: metadata.title,
                        abstract_text: metadata.abstract_text,
                        authors: metadata.authors,
                        year: metadata.year,
                        journal: metadata.journal,
                        doi,
                        pdf_url: success.document_url,
                        pdf_source_tier: tier.name(),
                        pdf_local_path: success.local_path,
                        extracted_text: success.text,
                        fetched_at: Utc::now(),
                    };
                    if let Err(e) = self.cache.put(&record) {
                        tracing::warn!("Failed to cache record for {}: {}", identifier, e);
                    }

                    return Ok(ResolvedRecord {
                        record,
                        attempts,
                        from_cache: false,
                    });
                }
                Err(e) => {
                    tracing::warn!("Tier {} failed for {}: {}", tier.name(), identifier, e);
                    attempts.push(TierAttempt::failure(tier.name(), e, latency));
                }
            }
        }

        tracing::warn!("No tier produced content for {}", identifier);
        if let Err(e) = self.cache.record_negative(identifier, &attempts) {
            tracing::warn!("Failed to record negative entry for {}: {}", identifier, e);
        }
        Err(ResolveError::NotFound {
            identifier: identifier.clone(),
            attempts,
        })
    }

    /// Try each candidate URL of a tier in order
    async fn attempt_tier(
        &self,
        tier: &dyn SourceTier,
        urls: &[String],
        identifier: &Identifier,
    ) -> std::result::Result<TierSuccess, TierError> {
        let mut errors = Vec::new();
        for url in urls {
            match self.attempt_url(tier, url, identifier).await {
                Ok(success) => return Ok(success),
                Err(e) => {
                    tracing::debug!("{} candidate {} failed: {}", tier.name(), url, e);
                    errors.push(e);
                }
            }
        }

        if errors.len() == 1 {
            return Err(errors.remove(0));
        }
        let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Err(TierError::AllCandidatesFailed(reasons.join("; ")))
    }

    async fn attempt_url(
        &self,
        tier: &dyn SourceTier,
        url: &str,
        identifier: &Identifier,
    ) -> std::result::Result<TierSuccess, TierError> {
        let scope = tier.name().as_str();
        let settings = self.config.tiers.get(tier.name());
        let response = self
            .fetch_following(scope, url, settings, self.config.max_redirects)
            .await?;
        if !response.is_success() {
            return Err(TierError::HttpStatus(response.status));
        }

        match tier.interpret(&response, &self.extractor)? {
            Extracted::Text { text } => {
                let local_path = self.store_document(identifier, &response.body);
                Ok(TierSuccess {
                    document_url: response.url,
                    text: Some(text),
                    local_path,
                })
            }
            Extracted::DocumentUrl { url, rule } => {
                if let Some(rule) = rule {
                    tracing::debug!("{} matched {:?} on {}", tier.name(), rule, response.url);
                }
                if !self.config.download_documents {
                    return Ok(TierSuccess {
                        document_url: url,
                        text: None,
                        local_path: None,
                    });
                }
                self.download(scope, settings, &url, identifier).await
            }
        }
    }

    /// Fetch and decode a document link (at most one redirect hop)
    async fn download(
        &self,
        scope: &str,
        settings: &TierSettings,
        url: &str,
        identifier: &Identifier,
    ) -> std::result::Result<TierSuccess, TierError> {
        let response = self.fetch_following(scope, url, settings, 1).await?;
        if !response.is_success() {
            return Err(TierError::ExtractionFailed(format!(
                "document download returned HTTP {}",
                response.status
            )));
        }
        let text = self.extractor.decode_pdf(&response.body)?;
        let local_path = self.store_document(identifier, &response.body);
        Ok(TierSuccess {
            document_url: response.url,
            text: Some(text),
            local_path,
        })
    }

    fn store_document(&self, identifier: &Identifier, bytes: &[u8]) -> Option<std::path::PathBuf> {
        if !self.config.download_documents {
            return None;
        }
        match self.cache.store_document(identifier, bytes) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Failed to store document for {}: {}", identifier, e);
                None
            }
        }
    }

    /// GET following up to `max_hops` redirects
    async fn fetch_following(
        &self,
        scope: &str,
        url: &str,
        settings: &TierSettings,
        max_hops: u32,
    ) -> std::result::Result<HttpResponse, TierError> {
        let mut current = url.to_string();
        let mut hops = 0;
        loop {
            let response = self.fetch_once(scope, &current, settings).await?;
            if !response.is_redirect() {
                return Ok(response);
            }
            if hops >= max_hops {
                return Err(TierError::Transport(format!(
                    "too many redirects from {}",
                    url
                )));
            }
            let location = response.location().ok_or_else(|| {
                TierError::Transport(format!("redirect without location from {}", current))
            })?;
            let next = Url::parse(&current)
                .and_then(|base| base.join(location))
                .map_err(|e| TierError::Transport(format!("bad redirect target: {}", e)))?;
            tracing::debug!("Following redirect {} -> {}", current, next);
            current = next.to_string();
            hops += 1;
        }
    }

    /// One rate-limited GET with a single retry after a 429
    async fn fetch_once(
        &self,
        scope: &str,
        url: &str,
        settings: &TierSettings,
    ) -> std::result::Result<HttpResponse, TierError> {
        let limiter = self.limiters.for_url(scope, url, &settings.rate_limit);
        let timeout = settings.timeout();
        let mut retried = false;

        loop {
            limiter.acquire().await.map_err(|_| TierError::RateLimited)?;

            let result = match tokio::time::timeout(timeout, self.http.get(url, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(HttpError::Timeout),
            };

            match result {
                Ok(response) => {
                    limiter.on_success();
                    return Ok(response);
                }
                Err(HttpError::RateLimited { retry_after }) => {
                    let state = limiter.on_rate_limited(retry_after);
                    tracing::warn!("Rate limited by {} ({:?})", url, state);
                    if retried || matches!(state, LimiterState::Exhausted(_)) {
                        return Err(TierError::RateLimited);
                    }
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch_metadata(&self, identifier: &Identifier) -> WorkMetadata {
        let url = match identifier.kind() {
            IdentifierKind::Pmid => self.pubmed.request_url(identifier.value()),
            IdentifierKind::Doi => self.crossref.request_url(identifier.value()),
        };

        let settings = &self.config.tiers.metadata;
        let result = match self
            .fetch_following(METADATA_SCOPE, &url, settings, self.config.max_redirects)
            .await
        {
            Ok(response) if response.is_success() => {
                let body = response.text();
                match identifier.kind() {
                    IdentifierKind::Pmid => PubMedSource::parse_efetch_response(&body),
                    IdentifierKind::Doi => CrossrefSource::parse_work_response(&body),
                }
            }
            Ok(response) if response.status == 404 => Err(SourceError::NotFound),
            Ok(response) => Err(SourceError::Parse(format!("HTTP {}", response.status))),
            Err(e) => Err(SourceError::Parse(e.to_string())),
        };

        match result {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Metadata lookup failed for {}: {}", identifier, e);
                WorkMetadata::default()
            }
        }
    }
}

