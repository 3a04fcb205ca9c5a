use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    CUSTOM_STYLE_ID, GenerationConfig, GenerationFailure, ImageServiceError, ReferenceImage,
    ReferenceImageError, ReferenceImageId, Stanza, StanzaId, StoryboardCatalog, StoryboardError,
    StyleSelection, segment_lyrics,
};
use crate::infra::key_selection::KeySelectionHost;

use super::background_jobs::{BackgroundJobs, JobOutcome};
use super::key_gate::{KeyGate, KeyGateState, KeySelectionPolicy};
use super::prompt_composer::PromptComposer;
use super::reference_intake::{ReferenceImageLoader, ReferenceIntake};
use super::stanza_store::StanzaStore;
use super::GenerationService;

/// Which completion decides a stanza's final state when several requests for
/// it overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Whichever response arrives last wins, even if it was issued first.
    #[default]
    LastArrivalWins,
    /// Only the most recently issued request may update the stanza.
    LatestRequestWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoryboardOptions {
    pub response_ordering: ResponseOrdering,
    pub key_selection: KeySelectionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationDispatch {
    UnknownStanza,
    /// The premium model is gated; the key selection flow was started instead.
    KeySelectionRequested,
    Dispatched { ticket: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    StanzaRemoved,
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoryboardUpdate {
    ImageReady {
        stanza_id: StanzaId,
    },
    GenerationFailed {
        stanza_id: StanzaId,
        failure: GenerationFailure,
    },
    ResponseDiscarded {
        stanza_id: StanzaId,
        reason: DiscardReason,
    },
    ReferenceAdded {
        reference_id: ReferenceImageId,
    },
    ReferenceDropped {
        reference_id: ReferenceImageId,
    },
    ReferenceRejected {
        path: PathBuf,
        error: ReferenceImageError,
    },
    KeySelectionFinished {
        state: KeyGateState,
    },
}

/// Per-stanza generation orchestrator.
///
/// Every operation returns immediately; network calls, file decodes and the
/// key selection flow run in the background. Their results only touch state
/// inside [`Storyboard::pump_updates`], so all mutation happens on the thread
/// that owns the storyboard.
pub struct Storyboard {
    catalog: StoryboardCatalog,
    config: GenerationConfig,
    stanzas: StanzaStore,
    references: ReferenceIntake,
    key_gate: KeyGate,
    host: Arc<dyn KeySelectionHost>,
    generation: GenerationService,
    response_ordering: ResponseOrdering,
    jobs: BackgroundJobs,
}

impl Storyboard {
    /// Asks the host once for an already selected key.
    pub fn new(
        catalog: StoryboardCatalog,
        generation: GenerationService,
        host: Arc<dyn KeySelectionHost>,
        loader: Arc<dyn ReferenceImageLoader>,
        options: StoryboardOptions,
    ) -> Result<Self, StoryboardError> {
        catalog.validate()?;
        let key_gate = KeyGate::new(host.has_selected_key(), options.key_selection);
        let config = catalog.default_config();

        Ok(Self {
            catalog,
            config,
            stanzas: StanzaStore::new(),
            references: ReferenceIntake::new(loader),
            key_gate,
            host,
            generation,
            response_ordering: options.response_ordering,
            jobs: BackgroundJobs::new(),
        })
    }

    pub fn catalog(&self) -> &StoryboardCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn set_style(&mut self, style: StyleSelection) -> Result<(), StoryboardError> {
        if let StyleSelection::Preset(style_id) = &style
            && (style_id == CUSTOM_STYLE_ID || self.catalog.style(style_id).is_none())
        {
            return Err(StoryboardError::validation(format!(
                "style '{style_id}' is not a preset style"
            )));
        }
        self.config.style = style;
        Ok(())
    }

    pub fn set_model(&mut self, model_id: &str) -> Result<(), StoryboardError> {
        let model_id = model_id.trim();
        if self.catalog.model(model_id).is_none() {
            return Err(StoryboardError::validation(format!(
                "model '{model_id}' is not listed in the catalog"
            )));
        }
        self.config.model_id = model_id.to_string();
        Ok(())
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: &str) -> Result<(), StoryboardError> {
        let aspect_ratio = aspect_ratio.trim();
        if !self.catalog.supports_aspect_ratio(aspect_ratio) {
            return Err(StoryboardError::validation(format!(
                "aspect ratio '{aspect_ratio}' is not listed in the catalog"
            )));
        }
        self.config.aspect_ratio = aspect_ratio.to_string();
        Ok(())
    }

    pub fn set_context(&mut self, context: impl Into<String>) {
        self.config.context = context.into();
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.config.subject = subject.into();
    }

    /// Replaces every stanza with the segments of `raw`. Blank input leaves
    /// the current collection alone. Returns the number of new stanzas.
    pub fn load_lyrics(&mut self, raw: &str) -> usize {
        let stanzas = segment_lyrics(raw);
        if stanzas.is_empty() {
            return 0;
        }

        let count = stanzas.len();
        self.stanzas.replace_all(stanzas);
        info!(stanzas = count, "lyrics segmented");
        count
    }

    pub fn stanzas(&self) -> &[Stanza] {
        self.stanzas.as_slice()
    }

    pub fn stanza(&self, id: StanzaId) -> Option<&Stanza> {
        self.stanzas.get(id)
    }

    /// Removes the stanza at once. A request still running for it is not
    /// cancelled; its result is discarded when it arrives.
    pub fn delete_stanza(&mut self, id: StanzaId) -> bool {
        self.stanzas.remove(id)
    }

    /// Starts a new project: drops stanzas, reference images, context,
    /// subject and custom style text. Style, model and aspect ratio stay.
    pub fn reset(&mut self) {
        self.stanzas.clear();
        self.references.clear();
        self.config.context.clear();
        self.config.subject.clear();
        if let StyleSelection::Custom(text) = &mut self.config.style {
            text.clear();
        }
    }

    pub fn key_gate_state(&self) -> KeyGateState {
        self.key_gate.state()
    }

    pub fn requires_gate(&self) -> bool {
        self.key_gate
            .requires_gate(self.catalog.is_premium_model(&self.config.model_id))
    }

    /// Starts the host key selection flow. Returns `false` when a flow is
    /// already running.
    pub fn select_key(&mut self) -> Result<bool, StoryboardError> {
        if !self.key_gate.begin_selection() {
            return Ok(false);
        }

        let host = Arc::clone(&self.host);
        let confirm = self.key_gate.policy() == KeySelectionPolicy::ConfirmWithHost;
        let spawned = self.jobs.spawn("key-selection", move || {
            host.select_key();
            JobOutcome::KeySelection {
                confirmed: confirm.then(|| host.has_selected_key()),
            }
        });
        if let Err(error) = spawned {
            self.key_gate.abort_selection();
            return Err(error);
        }

        info!("key selection requested");
        Ok(true)
    }

    pub fn request_generation(&mut self, id: StanzaId) -> Result<GenerationDispatch, StoryboardError> {
        let Some(stanza) = self.stanzas.get(id) else {
            debug!(stanza = %id, "generation requested for unknown stanza");
            return Ok(GenerationDispatch::UnknownStanza);
        };

        if self.requires_gate() {
            info!(model = %self.config.model_id, "premium model needs a selected key");
            self.select_key()?;
            return Ok(GenerationDispatch::KeySelectionRequested);
        }

        let request = PromptComposer::compose(
            &self.catalog,
            &self.config,
            self.references.images(),
            stanza.text(),
        );
        debug!(stanza = %id, prompt = ?request.text_prompt(), "composed generation request");

        let Some(ticket) = self.stanzas.begin_request(id) else {
            return Ok(GenerationDispatch::UnknownStanza);
        };

        let generation = self.generation.clone();
        let spawned = self.jobs.spawn("generation", move || JobOutcome::Generation {
            stanza_id: id,
            ticket,
            result: generation.generate(request),
        });
        if let Err(error) = spawned {
            self.stanzas.complete_failure(id, error.to_string());
            return Err(error);
        }

        info!(
            stanza = %id,
            ticket,
            model = %self.config.model_id,
            references = self.references.images().len(),
            "image generation dispatched"
        );
        Ok(GenerationDispatch::Dispatched { ticket })
    }

    pub fn references(&self) -> &[ReferenceImage] {
        self.references.images()
    }

    /// Starts decoding `paths`. The images appear once their decode finishes
    /// and [`Storyboard::pump_updates`] runs.
    pub fn add_reference_files(
        &mut self,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<usize, StoryboardError> {
        self.references.begin(&self.jobs, paths)
    }

    pub fn remove_reference(&mut self, id: ReferenceImageId) -> bool {
        self.references.remove(id)
    }

    /// True while background work is running or waiting to be applied.
    pub fn has_pending_work(&self) -> bool {
        self.jobs.has_pending_work()
    }

    /// Applies every finished background task, in arrival order.
    pub fn pump_updates(&mut self) -> Vec<StoryboardUpdate> {
        let mut updates = Vec::new();

        for completion in self.jobs.drain() {
            debug!(job = completion.job_id, "applying background job outcome");
            match completion.outcome {
                JobOutcome::Generation {
                    stanza_id,
                    ticket,
                    result,
                } => self.apply_generation(stanza_id, ticket, result, &mut updates),
                JobOutcome::ReferenceDecoded { path, result } => {
                    updates.extend(self.references.apply(path, result));
                }
                JobOutcome::KeySelection { confirmed } => {
                    let state = self.key_gate.finish_selection(confirmed);
                    info!(?state, "key selection finished");
                    updates.push(StoryboardUpdate::KeySelectionFinished { state });
                }
            }
        }

        updates
    }

    fn apply_generation(
        &mut self,
        stanza_id: StanzaId,
        ticket: u64,
        result: Result<String, ImageServiceError>,
        updates: &mut Vec<StoryboardUpdate>,
    ) {
        let outcome = result.map_err(|error| {
            let failure = GenerationFailure::classify(&error);
            warn!(stanza = %stanza_id, kind = ?failure.kind(), %error, "image generation failed");
            // A rejected key is a session-wide condition, so the gate closes
            // even if this stanza is gone.
            if failure.resets_key_gate() {
                self.key_gate.reset();
                if let Err(error) = self.select_key() {
                    warn!(%error, "could not restart key selection");
                }
            }
            failure
        });

        if !self.stanzas.contains(stanza_id) {
            debug!(stanza = %stanza_id, "response for removed stanza discarded");
            updates.push(StoryboardUpdate::ResponseDiscarded {
                stanza_id,
                reason: DiscardReason::StanzaRemoved,
            });
            return;
        }
        if self.response_ordering == ResponseOrdering::LatestRequestWins
            && !self.stanzas.is_latest_ticket(stanza_id, ticket)
        {
            debug!(stanza = %stanza_id, ticket, "superseded response discarded");
            updates.push(StoryboardUpdate::ResponseDiscarded {
                stanza_id,
                reason: DiscardReason::Superseded,
            });
            return;
        }

        match outcome {
            Ok(image_url) => {
                self.stanzas.complete_success(stanza_id, image_url);
                info!(stanza = %stanza_id, ticket, "image generated");
                updates.push(StoryboardUpdate::ImageReady { stanza_id });
            }
            Err(failure) => {
                self.stanzas
                    .complete_failure(stanza_id, failure.user_message());
                updates.push(StoryboardUpdate::GenerationFailed { stanza_id, failure });
            }
        }
    }
}
