#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lyric_storyboard::app::{
    FileReferenceImageLoader, GenerationService, ReferenceImageLoader, Storyboard,
    StoryboardOptions, StoryboardUpdate,
};
use lyric_storyboard::domain::{
    ImageRequest, ImageResponse, ImageServiceError, InlineData, ResponseCandidate, ResponsePart,
    StoryboardCatalog,
};
use lyric_storyboard::infra::image::ImageService;
use lyric_storyboard::infra::key_selection::KeySelectionHost;

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const HELD_CALL_TIMEOUT: Duration = Duration::from_secs(5);

type Reply = Result<ImageResponse, ImageServiceError>;

/// Image service whose calls block until the test answers them, so tests
/// decide the order in which responses arrive.
#[derive(Clone, Default)]
pub(crate) struct HeldImageService {
    calls: Arc<Mutex<Vec<HeldCall>>>,
}

struct HeldCall {
    request: ImageRequest,
    reply: Option<Sender<Reply>>,
}

impl HeldImageService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().expect("held calls lock poisoned").len()
    }

    pub(crate) fn request(&self, index: usize) -> ImageRequest {
        self.calls.lock().expect("held calls lock poisoned")[index]
            .request
            .clone()
    }

    pub(crate) fn wait_for_calls(&self, expected: usize) {
        let start = Instant::now();
        while self.call_count() < expected {
            assert!(
                start.elapsed() < WAIT_TIMEOUT,
                "expected {expected} image service calls, saw {}",
                self.call_count()
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub(crate) fn respond(&self, index: usize, reply: Reply) {
        let sender = self.calls.lock().expect("held calls lock poisoned")[index]
            .reply
            .take()
            .expect("call should be answered only once");
        sender.send(reply).expect("held call should still be waiting");
    }
}

impl ImageService for HeldImageService {
    fn generate(&self, request: &ImageRequest) -> Result<ImageResponse, ImageServiceError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.calls
            .lock()
            .expect("held calls lock poisoned")
            .push(HeldCall {
                request: request.clone(),
                reply: Some(reply_tx),
            });

        reply_rx
            .recv_timeout(HELD_CALL_TIMEOUT)
            .unwrap_or_else(|_| Err(ImageServiceError::request("held call was never answered")))
    }
}

/// Key host that records selection flows. `grants_key` decides whether a
/// flow leaves a key behind.
pub(crate) struct FakeKeyHost {
    selected: AtomicBool,
    grants_key: bool,
    select_calls: AtomicUsize,
    hold: Mutex<Option<Receiver<()>>>,
}

impl FakeKeyHost {
    pub(crate) fn new(has_key: bool, grants_key: bool) -> Arc<Self> {
        Arc::new(Self {
            selected: AtomicBool::new(has_key),
            grants_key,
            select_calls: AtomicUsize::new(0),
            hold: Mutex::new(None),
        })
    }

    /// Selection flows block until the returned sender fires.
    pub(crate) fn held(has_key: bool, grants_key: bool) -> (Arc<Self>, Sender<()>) {
        let (release_tx, release_rx) = mpsc::channel();
        let host = Arc::new(Self {
            selected: AtomicBool::new(has_key),
            grants_key,
            select_calls: AtomicUsize::new(0),
            hold: Mutex::new(Some(release_rx)),
        });
        (host, release_tx)
    }

    pub(crate) fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }
}

impl KeySelectionHost for FakeKeyHost {
    fn has_selected_key(&self) -> bool {
        self.selected.load(Ordering::SeqCst)
    }

    fn select_key(&self) {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(release) = self.hold.lock().expect("hold lock poisoned").as_ref() {
            let _ = release.recv_timeout(HELD_CALL_TIMEOUT);
        }
        if self.grants_key {
            self.selected.store(true, Ordering::SeqCst);
        }
    }
}

pub(crate) fn image_response(data: &str) -> ImageResponse {
    ImageResponse {
        candidates: vec![ResponseCandidate {
            parts: vec![
                ResponsePart {
                    text: Some("Here is your frame.".to_string()),
                    inline_data: None,
                },
                ResponsePart {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: Some("image/png".to_string()),
                        data: data.to_string(),
                    }),
                },
            ],
        }],
    }
}

pub(crate) fn storyboard_with(
    service: &HeldImageService,
    host: Arc<FakeKeyHost>,
    options: StoryboardOptions,
) -> Storyboard {
    storyboard_with_loader(service, host, Arc::new(FileReferenceImageLoader), options)
}

pub(crate) fn storyboard_with_loader(
    service: &HeldImageService,
    host: Arc<FakeKeyHost>,
    loader: Arc<dyn ReferenceImageLoader>,
    options: StoryboardOptions,
) -> Storyboard {
    Storyboard::new(
        StoryboardCatalog::default(),
        GenerationService::new(service.clone()),
        host,
        loader,
        options,
    )
    .expect("default catalog should be valid")
}

/// Pumps until `done` accepts the updates collected so far.
pub(crate) fn pump_until(
    storyboard: &mut Storyboard,
    done: impl Fn(&[StoryboardUpdate]) -> bool,
) -> Vec<StoryboardUpdate> {
    let start = Instant::now();
    let mut updates = Vec::new();
    loop {
        updates.extend(storyboard.pump_updates());
        if done(&updates) {
            return updates;
        }
        assert!(
            start.elapsed() < WAIT_TIMEOUT,
            "updates did not arrive in time, got {updates:?}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

pub(crate) fn pump_until_idle(storyboard: &mut Storyboard) -> Vec<StoryboardUpdate> {
    let start = Instant::now();
    let mut updates = Vec::new();
    loop {
        updates.extend(storyboard.pump_updates());
        if !storyboard.has_pending_work() {
            return updates;
        }
        assert!(
            start.elapsed() < WAIT_TIMEOUT,
            "background work did not settle in time"
        );
        thread::sleep(Duration::from_millis(5));
    }
}
