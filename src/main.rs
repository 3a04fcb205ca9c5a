use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use lyric_storyboard::{
    app::{
        FileReferenceImageLoader, GenerationDispatch, GenerationService, KeySelectionPolicy,
        ResponseOrdering, Storyboard, StoryboardOptions, StoryboardUpdate,
    },
    domain::{StoryboardCatalog, StyleSelection},
    infra::{
        catalog_file::load_catalog_file,
        image::{ApiKeySlot, GeminiImageService, decode_data_uri},
        key_selection::TerminalKeyHost,
    },
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const UPDATE_POLL_INTERVAL_MS: u64 = 50;

/// Turns song lyrics into one generated image per stanza
#[derive(Parser, Debug)]
#[command(name = "lyric-storyboard")]
#[command(about = "Generate a storyboard image for every stanza of a song")]
#[command(version)]
struct Args {
    /// Lyrics text file; stanzas are separated by blank lines. Reads stdin when omitted
    #[arg(short, long)]
    lyrics: Option<PathBuf>,

    /// Global visual context for the whole song
    #[arg(long, default_value = "")]
    context: String,

    /// Main character or subject to keep consistent across frames
    #[arg(long, default_value = "")]
    subject: String,

    /// Preset style id from the catalog
    #[arg(long, conflicts_with = "custom_style")]
    style: Option<String>,

    /// Free-form style description used instead of a preset
    #[arg(long)]
    custom_style: Option<String>,

    /// Model id from the catalog
    #[arg(long, env = "LYRIC_STORYBOARD_MODEL")]
    model: Option<String>,

    /// Aspect ratio from the catalog, e.g. 16:9
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Reference image (repeatable, at most three are kept)
    #[arg(short, long = "reference")]
    references: Vec<PathBuf>,

    /// JSON catalog replacing the built-in models, ratios and styles
    #[arg(long, env = "LYRIC_STORYBOARD_CATALOG")]
    catalog: Option<PathBuf>,

    /// Directory receiving stanza-NN image files
    #[arg(short, long, default_value = "storyboard")]
    output: PathBuf,

    /// Ignore responses from requests that were superseded by a newer one
    #[arg(long)]
    latest_request_wins: bool,

    /// Ask the key host whether a key was really chosen after selection
    #[arg(long)]
    confirm_key: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lyric_storyboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let (mut storyboard, api_keys) = build_storyboard(&args)?;
    apply_config(&mut storyboard, &args)?;

    let lyrics = read_lyrics(args.lyrics.as_deref())?;
    let stanza_count = storyboard.load_lyrics(&lyrics);
    if stanza_count == 0 {
        bail!("the lyrics contain no stanzas");
    }

    if !args.references.is_empty() {
        storyboard.add_reference_files(args.references.clone())?;
        report(&drain_until_idle(&mut storyboard));
    }

    if storyboard.requires_gate() {
        let prompt_input = if args.lyrics.is_some() {
            KeyPromptInput::Stdin
        } else {
            KeyPromptInput::ConsumedByLyrics
        };
        open_key_gate(&mut storyboard, &api_keys, prompt_input)?;
    }

    let ids: Vec<_> = storyboard.stanzas().iter().map(|stanza| stanza.id()).collect();
    for id in ids {
        if let GenerationDispatch::KeySelectionRequested = storyboard.request_generation(id)? {
            bail!("the API key was rejected before generation could start");
        }
    }
    report(&drain_until_idle(&mut storyboard));

    let failed = write_images(&storyboard, &args.output)?;
    if failed > 0 {
        bail!("{failed} of {stanza_count} stanzas failed to generate");
    }

    info!(
        stanzas = stanza_count,
        output = %args.output.display(),
        "storyboard written"
    );
    Ok(())
}

fn build_storyboard(args: &Args) -> Result<(Storyboard, ApiKeySlot)> {
    let catalog = match &args.catalog {
        Some(path) => load_catalog_file(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => StoryboardCatalog::default(),
    };

    let api_keys = ApiKeySlot::new();
    let service = GeminiImageService::from_env(api_keys.clone())
        .context("failed to configure the image service")?;
    let options = StoryboardOptions {
        response_ordering: if args.latest_request_wins {
            ResponseOrdering::LatestRequestWins
        } else {
            ResponseOrdering::LastArrivalWins
        },
        key_selection: if args.confirm_key {
            KeySelectionPolicy::ConfirmWithHost
        } else {
            KeySelectionPolicy::Optimistic
        },
    };

    let storyboard = Storyboard::new(
        catalog,
        GenerationService::new(service),
        Arc::new(TerminalKeyHost::stdin(api_keys.clone())),
        Arc::new(FileReferenceImageLoader),
        options,
    )?;
    Ok((storyboard, api_keys))
}

/// Whether stdin can still answer the key prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPromptInput {
    Stdin,
    ConsumedByLyrics,
}

/// Runs the key prompt for a gated model and fails unless a key was stored.
fn open_key_gate(
    storyboard: &mut Storyboard,
    api_keys: &ApiKeySlot,
    prompt_input: KeyPromptInput,
) -> Result<()> {
    let model_id = storyboard.config().model_id.clone();
    if prompt_input == KeyPromptInput::ConsumedByLyrics {
        bail!(
            "model '{model_id}' needs an API key, but stdin already carried the lyrics; \
             pass them with --lyrics <file> or set LYRIC_STORYBOARD_API_KEY"
        );
    }

    storyboard.select_key()?;
    report(&drain_until_idle(storyboard));
    if storyboard.requires_gate() || !api_keys.is_set() {
        bail!("model '{model_id}' needs an API key from a paid project");
    }
    Ok(())
}

fn apply_config(storyboard: &mut Storyboard, args: &Args) -> Result<()> {
    if let Some(style) = &args.style {
        storyboard.set_style(StyleSelection::Preset(style.clone()))?;
    }
    if let Some(text) = &args.custom_style {
        storyboard.set_style(StyleSelection::Custom(text.clone()))?;
    }
    if let Some(model) = &args.model {
        storyboard.set_model(model)?;
    }
    if let Some(aspect_ratio) = &args.aspect_ratio {
        storyboard.set_aspect_ratio(aspect_ratio)?;
    }
    storyboard.set_context(args.context.clone());
    storyboard.set_subject(args.subject.clone());
    Ok(())
}

fn read_lyrics(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read lyrics from {}", path.display())),
        None => {
            let mut lyrics = String::new();
            io::stdin()
                .read_to_string(&mut lyrics)
                .context("failed to read lyrics from stdin")?;
            Ok(lyrics)
        }
    }
}

fn drain_until_idle(storyboard: &mut Storyboard) -> Vec<StoryboardUpdate> {
    let mut updates = Vec::new();
    loop {
        updates.extend(storyboard.pump_updates());
        if !storyboard.has_pending_work() {
            return updates;
        }
        thread::sleep(Duration::from_millis(UPDATE_POLL_INTERVAL_MS));
    }
}

fn report(updates: &[StoryboardUpdate]) {
    for update in updates {
        match update {
            StoryboardUpdate::ReferenceRejected { error, .. } => {
                eprintln!("{}", error.user_message());
            }
            StoryboardUpdate::ReferenceDropped { .. } => {
                eprintln!("At most three reference images are used; extra images were ignored.");
            }
            StoryboardUpdate::GenerationFailed { failure, .. } => {
                warn!(kind = ?failure.kind(), "stanza generation failed");
            }
            _ => {}
        }
    }
}

/// Writes every generated image and returns how many stanzas have none.
fn write_images(storyboard: &Storyboard, output: &Path) -> Result<usize> {
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    let mut failed = 0;
    for (index, stanza) in storyboard.stanzas().iter().enumerate() {
        let number = index + 1;
        let Some(image_url) = stanza.image_url() else {
            failed += 1;
            eprintln!(
                "Stanza {number}: {}",
                stanza.error().unwrap_or("no image was generated")
            );
            continue;
        };

        let image = decode_data_uri(image_url)
            .with_context(|| format!("stanza {number} returned an unreadable image"))?;
        let path = output.join(format!("stanza-{number:02}.{}", image.file_extension()));
        fs::write(&path, &image.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(stanza = number, path = %path.display(), "image saved");
    }
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use lyric_storyboard::app::{
        FileReferenceImageLoader, GenerationService, KeyGateState, Storyboard, StoryboardOptions,
    };
    use lyric_storyboard::domain::{PREMIUM_MODEL_ID, StoryboardCatalog};
    use lyric_storyboard::infra::image::{ApiKeySlot, GeminiImageService};
    use lyric_storyboard::infra::key_selection::TerminalKeyHost;

    use super::{KeyPromptInput, open_key_gate};

    fn premium_storyboard(api_keys: &ApiKeySlot, key_input: &'static str) -> Storyboard {
        let service = GeminiImageService::with_config(api_keys.clone(), "http://127.0.0.1:9", None)
            .expect("service should build");
        let mut storyboard = Storyboard::new(
            StoryboardCatalog::default(),
            GenerationService::new(service),
            Arc::new(TerminalKeyHost::new(api_keys.clone(), Cursor::new(key_input))),
            Arc::new(FileReferenceImageLoader),
            StoryboardOptions::default(),
        )
        .expect("default catalog should be valid");
        storyboard
            .set_model(PREMIUM_MODEL_ID)
            .expect("premium model is listed");
        storyboard
    }

    #[test]
    fn gate_fails_fast_when_lyrics_used_stdin() {
        let api_keys = ApiKeySlot::new();
        let mut storyboard = premium_storyboard(&api_keys, "paid-key\n");

        let error = open_key_gate(&mut storyboard, &api_keys, KeyPromptInput::ConsumedByLyrics)
            .expect_err("prompt must not run on consumed stdin");

        assert!(error.to_string().contains("--lyrics"));
        assert!(!api_keys.is_set());
        assert_eq!(storyboard.key_gate_state(), KeyGateState::NoKeySelected);
    }

    #[test]
    fn gate_rejects_prompt_that_hit_end_of_input() {
        let api_keys = ApiKeySlot::new();
        let mut storyboard = premium_storyboard(&api_keys, "");

        let error = open_key_gate(&mut storyboard, &api_keys, KeyPromptInput::Stdin)
            .expect_err("no key was entered");

        assert!(error.to_string().contains("needs an API key"));
        assert!(!api_keys.is_set());
    }

    #[test]
    fn gate_opens_when_key_is_entered() {
        let api_keys = ApiKeySlot::new();
        let mut storyboard = premium_storyboard(&api_keys, "paid-key\n");

        open_key_gate(&mut storyboard, &api_keys, KeyPromptInput::Stdin)
            .expect("entered key should open the gate");

        assert_eq!(api_keys.current().as_deref(), Some("paid-key"));
        assert!(!storyboard.requires_gate());
    }
}
