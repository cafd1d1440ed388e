//! Common test utilities: scripted channel doubles and request builders

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use songchul::models::{ContentType, PublishRequest, UploadedVideo};
use songchul::publisher::fallback::{
    AutomationError, AutomationSession, Locator, SessionFactory, SessionSnapshot, SurfaceSelectors,
};
use songchul::publisher::{PrimaryChannel, PrimaryError};

/// Create a publish request whose media file actually exists under `dir`
pub fn make_request(dir: &Path, file_name: &str, content_type: ContentType) -> PublishRequest {
    let media = dir.join(file_name);
    std::fs::write(&media, b"test media bytes").unwrap();

    let mut request = PublishRequest::new(&format!("테스트 영상 {file_name}"), media, content_type);
    request.description = "테스트 설명".to_string();
    request.source_url = Some(format!("https://news.example.com/articles/{file_name}"));
    request
}

/// Selectors with exactly one candidate per control, so scripted sessions
/// can key their behavior on the locator value
#[allow(dead_code)]
pub fn simple_selectors() -> SurfaceSelectors {
    SurfaceSelectors {
        auth_signals: vec![Locator::css("#auth")],
        upload_entry: vec![Locator::css("#upload")],
        file_input: vec![Locator::css("#file")],
        title_field: vec![Locator::css("#title")],
        description_field: vec![Locator::css("#desc")],
        thumbnail_input: vec![Locator::css("#thumb")],
        content_classification: vec![Locator::css("#classify")],
        next_button: vec![Locator::css("#next")],
        end_template: vec![Locator::css("#template")],
        visibility_public: vec![Locator::css("#vis-public")],
        visibility_unlisted: vec![Locator::css("#vis-unlisted")],
        visibility_private: vec![Locator::css("#vis-private")],
        intermediate_save: vec![Locator::css("#save")],
        publish_button: vec![Locator::css("#publish")],
        share_link: vec![Locator::css("#share")],
        close_dialog: vec![Locator::css("#close")],
    }
}

// ============================================================================
// Scripted automation sessions
// ============================================================================

/// How one scripted session should behave
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ScriptedAttempt {
    /// Every control exists, publish yields this video id
    Succeed { video_id: String },
    /// Controls exist but every click fails with a driver error
    FailClicks,
    /// Authentication signal appears only after this many polls
    AuthAfterPolls { polls: u32, video_id: String },
}

/// Lifetime of one session: acquisition to teardown
#[derive(Debug, Clone)]
pub struct AttemptSpan {
    pub started: Instant,
    pub ended: Option<Instant>,
    /// Media file name attached during the attempt
    pub media: Option<String>,
}

/// Factory that hands out scripted sessions and records their lifetimes
pub struct MockSessionFactory {
    script: Mutex<VecDeque<ScriptedAttempt>>,
    spans: Arc<Mutex<Vec<AttemptSpan>>>,
    sessions_created: AtomicUsize,
    /// Minimum wall-clock width of each attempt span
    work_delay: Duration,
}

#[allow(dead_code)]
impl MockSessionFactory {
    pub fn new(script: Vec<ScriptedAttempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            spans: Arc::new(Mutex::new(Vec::new())),
            sessions_created: AtomicUsize::new(0),
            work_delay: Duration::from_millis(10),
        }
    }

    /// Factory where every attempt succeeds with a generated video id
    pub fn always_succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub fn spans(&self) -> Vec<AttemptSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn create(
        &self,
        _snapshot: Option<&SessionSnapshot>,
    ) -> Result<Box<dyn AutomationSession>, AutomationError> {
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedAttempt::Succeed {
                video_id: format!("mockvid{n:03}"),
            });

        tokio::time::sleep(self.work_delay).await;

        let span_index = {
            let mut spans = self.spans.lock().unwrap();
            spans.push(AttemptSpan {
                started: Instant::now(),
                ended: None,
                media: None,
            });
            spans.len() - 1
        };

        let auth_polls_left = match &behavior {
            ScriptedAttempt::AuthAfterPolls { polls, .. } => *polls,
            _ => 0,
        };

        Ok(Box::new(MockSession {
            behavior,
            auth_polls_left,
            spans: Arc::clone(&self.spans),
            span_index,
        }))
    }
}

struct MockSession {
    behavior: ScriptedAttempt,
    auth_polls_left: u32,
    spans: Arc<Mutex<Vec<AttemptSpan>>>,
    span_index: usize,
}

impl MockSession {
    fn video_id(&self) -> &str {
        match &self.behavior {
            ScriptedAttempt::Succeed { video_id } => video_id,
            ScriptedAttempt::AuthAfterPolls { video_id, .. } => video_id,
            ScriptedAttempt::FailClicks => "unreachable",
        }
    }
}

#[async_trait]
impl AutomationSession for MockSession {
    async fn navigate(&mut self, _url: &str) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn exists(&mut self, locator: &Locator) -> Result<bool, AutomationError> {
        if locator.value == "#auth" && self.auth_polls_left > 0 {
            self.auth_polls_left -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn click(&mut self, locator: &Locator) -> Result<(), AutomationError> {
        match self.behavior {
            ScriptedAttempt::FailClicks => Err(AutomationError::Driver(format!(
                "element not interactable: {locator}"
            ))),
            _ => Ok(()),
        }
    }

    async fn clear(&mut self, _locator: &Locator) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn send_keys(&mut self, _locator: &Locator, _text: &str) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn press_backspace(&mut self, _locator: &Locator) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn set_file(&mut self, _locator: &Locator, path: &Path) -> Result<(), AutomationError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.spans.lock().unwrap()[self.span_index].media = Some(name);
        Ok(())
    }

    async fn read_attribute(
        &mut self,
        _locator: &Locator,
        _name: &str,
    ) -> Result<Option<String>, AutomationError> {
        Ok(Some(format!("https://youtu.be/{}", self.video_id())))
    }

    async fn export_state(&mut self) -> Result<SessionSnapshot, AutomationError> {
        Ok(SessionSnapshot::new(json!({"cookies": ["mock=1"]})))
    }

    async fn dispose(&mut self) {
        self.spans.lock().unwrap()[self.span_index].ended = Some(Instant::now());
    }
}

// ============================================================================
// Scripted primary channel
// ============================================================================

/// One scripted primary-channel response
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum PrimaryScript {
    Succeed { video_id: String },
    QuotaExceeded { message: String },
    Fail { message: String },
}

/// Primary channel double that replays a fixed response sequence
pub struct ScriptedPrimary {
    script: Mutex<VecDeque<PrimaryScript>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedPrimary {
    pub fn new(script: Vec<PrimaryScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrimaryChannel for ScriptedPrimary {
    async fn upload_video(
        &self,
        _request: &PublishRequest,
    ) -> Result<UploadedVideo, PrimaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.script.lock().unwrap().pop_front() {
            Some(PrimaryScript::Succeed { video_id }) => Ok(UploadedVideo {
                video_url: format!("https://youtu.be/{video_id}"),
                video_id,
            }),
            Some(PrimaryScript::QuotaExceeded { message }) => {
                Err(PrimaryError::QuotaExceeded { message })
            }
            Some(PrimaryScript::Fail { message }) => Err(PrimaryError::Other { message }),
            None => Err(PrimaryError::Other {
                message: "no scripted response left".to_string(),
            }),
        }
    }
}
