mod background_jobs;
mod generation_service;
mod key_gate;
mod prompt_composer;
mod reference_intake;
mod stanza_store;
mod storyboard;

pub use generation_service::GenerationService;
pub use key_gate::{KeyGate, KeyGateState, KeySelectionPolicy};
pub use prompt_composer::{PromptComposer, style_description};
pub use reference_intake::{FileReferenceImageLoader, ReferenceImageLoader};
pub use stanza_store::StanzaStore;
pub use storyboard::{
    DiscardReason, GenerationDispatch, ResponseOrdering, Storyboard, StoryboardOptions,
    StoryboardUpdate,
};
