//! Per-attempt upload state machine for the interactive publish surface
//!
//! One attempt walks a linear sequence of named steps, each with its own
//! bounded wait. Any step failure aborts the attempt with a structured
//! failure; the session is torn down unconditionally afterwards so the next
//! queued job starts clean. There is no in-attempt retry — retry belongs to
//! the caller.

use rand::rngs::StdRng;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::AutomationError;
use super::selectors::SurfaceSelectors;
use super::session::{first_match, AutomationSession, Locator, SessionFactory, SnapshotStore};
use super::typing::{plan_typing, KeyAction};
use super::url::extract_video_id;
use crate::config::AutomationConfig;
use crate::models::{ContentType, FailureKind, PublishRequest, UploadedVideo};

/// Interval between authentication polls while waiting for a manual login
const LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between success-indicator polls after triggering publish
const PUBLISH_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// Step and failure types
// ============================================================================

/// Named states of one upload attempt, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStep {
    SessionInit,
    AuthCheck,
    InitiateUpload,
    MetadataEntry,
    StepAdvance,
    VisibilitySelect,
    Publish,
    Extract,
    Teardown,
}

impl AttemptStep {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionInit => "session_init",
            Self::AuthCheck => "auth_check",
            Self::InitiateUpload => "initiate_upload",
            Self::MetadataEntry => "metadata_entry",
            Self::StepAdvance => "step_advance",
            Self::VisibilitySelect => "visibility_select",
            Self::Publish => "publish",
            Self::Extract => "extract",
            Self::Teardown => "teardown",
        }
    }
}

impl std::fmt::Display for AttemptStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure reason returned across the fallback boundary
#[derive(Debug)]
pub struct AttemptFailure {
    pub step: AttemptStep,
    pub error: AutomationError,
}

impl AttemptFailure {
    /// Map to the orchestrator-level failure taxonomy
    pub fn failure_kind(&self) -> FailureKind {
        if self.error.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Unrecoverable
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

impl std::error::Error for AttemptFailure {}

/// Outcome of one fallback attempt
pub type AttemptResult = Result<UploadedVideo, AttemptFailure>;

// ============================================================================
// Attempt runner
// ============================================================================

/// State machine driving one upload attempt over a fresh session
pub(super) struct UploadAttempt<'a> {
    config: &'a AutomationConfig,
    selectors: &'a SurfaceSelectors,
    snapshots: &'a SnapshotStore,
    rng: &'a mut StdRng,
}

impl<'a> UploadAttempt<'a> {
    pub fn new(
        config: &'a AutomationConfig,
        selectors: &'a SurfaceSelectors,
        snapshots: &'a SnapshotStore,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            config,
            selectors,
            snapshots,
            rng,
        }
    }

    /// Run the full attempt: acquire, drive, and unconditionally tear down
    pub async fn run(
        &mut self,
        factory: &dyn SessionFactory,
        request: &PublishRequest,
    ) -> AttemptResult {
        let snapshot = self.snapshots.load();
        let had_snapshot = snapshot.is_some();

        let mut session = bounded(
            self.config.session_init_timeout_secs,
            factory.create(snapshot.as_ref()),
        )
        .await
        .map_err(|error| AttemptFailure {
            step: AttemptStep::SessionInit,
            error,
        })?;

        debug!(
            restored_snapshot = had_snapshot,
            title = %request.title,
            content_type = %request.content_type,
            "Automation session acquired"
        );

        let result = self.drive(session.as_mut(), request, had_snapshot).await;

        // Teardown is unconditional: attempt isolation over startup cost
        session.dispose().await;

        if let Err(ref failure) = result {
            warn!(step = %failure.step, error = %failure.error, "Fallback attempt failed");
        }

        result
    }

    /// Execute the step sequence against a live session
    async fn drive(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        request: &PublishRequest,
        had_snapshot: bool,
    ) -> AttemptResult {
        self.auth_check(session, had_snapshot)
            .await
            .map_err(at(AttemptStep::AuthCheck))?;

        self.initiate_upload(session, request)
            .await
            .map_err(at(AttemptStep::InitiateUpload))?;

        self.metadata_entry(session, request)
            .await
            .map_err(at(AttemptStep::MetadataEntry))?;

        self.step_advance(session, request.content_type)
            .await
            .map_err(at(AttemptStep::StepAdvance))?;

        self.visibility_select(session, request)
            .await
            .map_err(at(AttemptStep::VisibilitySelect))?;

        let share_url = self
            .publish(session)
            .await
            .map_err(at(AttemptStep::Publish))?;

        let video = self
            .extract(session, &share_url)
            .await
            .map_err(at(AttemptStep::Extract))?;

        info!(
            video_id = %video.video_id,
            content_type = %request.content_type,
            "Fallback publish succeeded"
        );

        Ok(video)
    }

    // Step 2: detect authenticated state; otherwise wait for a manual login
    async fn auth_check(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        had_snapshot: bool,
    ) -> Result<(), AutomationError> {
        bounded(
            self.config.auth_check_timeout_secs,
            session.navigate(&self.config.studio_url),
        )
        .await?;

        if first_match(session, &self.selectors.auth_signals)
            .await?
            .is_some()
        {
            return Ok(());
        }

        if had_snapshot {
            debug!("Restored session snapshot no longer authenticated");
        }

        info!(
            bound_secs = self.config.login_wait_timeout_secs,
            "Unauthenticated; waiting for manual login"
        );

        let timeout = Duration::from_secs(self.config.login_wait_timeout_secs);
        let wait = async {
            loop {
                tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
                if first_match(session, &self.selectors.auth_signals)
                    .await?
                    .is_some()
                {
                    return Ok::<_, AutomationError>(());
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result?,
            Err(_) => return Err(AutomationError::LoginTimeout),
        }

        // Persist the fresh authenticated state for future attempts
        match session.export_state().await {
            Ok(snapshot) => {
                if let Err(e) = self.snapshots.save(&snapshot) {
                    warn!(error = %e, "Failed to persist session snapshot");
                }
            }
            Err(e) => warn!(error = %e, "Failed to export session state"),
        }

        Ok(())
    }

    // Step 3: open the upload dialog and attach the media file
    async fn initiate_upload(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        request: &PublishRequest,
    ) -> Result<(), AutomationError> {
        let timeout = self.config.step_timeout_secs;

        let entry = require(session, &self.selectors.upload_entry, "upload_entry").await?;
        bounded(timeout, session.click(&entry)).await?;

        let input = require(session, &self.selectors.file_input, "file_input").await?;
        bounded(timeout, session.set_file(&input, &request.media_path)).await?;

        // Let the surface register the attachment before touching metadata
        let settle = self.sample_delay(self.config.settle_delay_ms);
        tokio::time::sleep(settle).await;

        Ok(())
    }

    // Step 4: populate metadata with humanized typing
    async fn metadata_entry(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        request: &PublishRequest,
    ) -> Result<(), AutomationError> {
        let title_field = require(session, &self.selectors.title_field, "title_field").await?;
        self.type_humanized(session, &title_field, &request.title)
            .await?;

        if !request.description.is_empty() {
            let desc_field = require(
                session,
                &self.selectors.description_field,
                "description_field",
            )
            .await?;
            self.type_humanized(session, &desc_field, &request.description)
                .await?;
        }

        if let Some(thumbnail) = &request.thumbnail_path {
            match first_match(session, &self.selectors.thumbnail_input).await? {
                Some(input) => {
                    let input = input.clone();
                    bounded(
                        self.config.step_timeout_secs,
                        session.set_file(&input, thumbnail),
                    )
                    .await?;
                }
                None => debug!("No thumbnail control found; continuing without one"),
            }
        }

        let classification = require(
            session,
            &self.selectors.content_classification,
            "content_classification",
        )
        .await?;
        bounded(self.config.step_timeout_secs, session.click(&classification)).await?;

        Ok(())
    }

    // Step 5: advance through the dialog pages
    async fn step_advance(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        content_type: ContentType,
    ) -> Result<(), AutomationError> {
        let advances = match content_type {
            ContentType::Longform => 3,
            ContentType::Shorts => 2,
        };

        for step in 0..advances {
            // Long-form gets an optional end-of-video template on the
            // video-elements page; its absence is not a failure.
            if step == 1
                && content_type == ContentType::Longform
                && self.config.longform_end_template
            {
                match first_match(session, &self.selectors.end_template).await? {
                    Some(template) => {
                        let template = template.clone();
                        bounded(self.config.step_timeout_secs, session.click(&template)).await?;
                    }
                    None => debug!("End-of-video template control not found; skipping"),
                }
            }

            let next = require(session, &self.selectors.next_button, "next_button").await?;
            bounded(self.config.step_timeout_secs, session.click(&next)).await?;

            let delay = self.sample_delay(self.config.step_delay_ms);
            tokio::time::sleep(delay).await;
        }

        Ok(())
    }

    // Step 6: pick the requested visibility; intermediate save is best-effort
    async fn visibility_select(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        request: &PublishRequest,
    ) -> Result<(), AutomationError> {
        let candidates = self.selectors.visibility(request.privacy);
        let radio = require(session, candidates, "visibility").await?;
        bounded(self.config.step_timeout_secs, session.click(&radio)).await?;

        match first_match(session, &self.selectors.intermediate_save).await? {
            Some(save) => {
                let save = save.clone();
                bounded(self.config.step_timeout_secs, session.click(&save)).await?;
            }
            None => info!("No intermediate save control on this surface version"),
        }

        Ok(())
    }

    // Step 7: trigger the terminal action and wait for the share URL
    async fn publish(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
    ) -> Result<String, AutomationError> {
        let button = require(session, &self.selectors.publish_button, "publish_button").await?;
        bounded(self.config.step_timeout_secs, session.click(&button)).await?;

        let timeout = Duration::from_secs(self.config.publish_timeout_secs);
        let wait = async {
            loop {
                if let Some(link) = first_match(session, &self.selectors.share_link).await? {
                    let link = link.clone();
                    if let Some(href) = session.read_attribute(&link, "href").await? {
                        return Ok::<_, AutomationError>(href);
                    }
                }
                tokio::time::sleep(PUBLISH_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(AutomationError::StepTimeout {
                timeout_secs: self.config.publish_timeout_secs,
            }),
        }
    }

    // Step 8: parse the share URL and dismiss the success dialog
    async fn extract(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        share_url: &str,
    ) -> Result<UploadedVideo, AutomationError> {
        let video_id = extract_video_id(share_url)?;

        // Dismissing the dialog is cosmetic; the session dies right after
        if let Ok(Some(close)) = first_match(session, &self.selectors.close_dialog).await {
            let close = close.clone();
            let _ = session.click(&close).await;
        }

        Ok(UploadedVideo {
            video_id,
            video_url: share_url.to_string(),
        })
    }

    /// Type text into a control through a humanized key plan
    async fn type_humanized(
        &mut self,
        session: &mut (dyn AutomationSession + '_),
        field: &Locator,
        text: &str,
    ) -> Result<(), AutomationError> {
        bounded(self.config.step_timeout_secs, session.clear(field)).await?;

        let plan = plan_typing(text, &self.config.typing, self.rng);
        let mut buf = [0u8; 4];
        for action in plan {
            match action {
                KeyAction::Type(c) => {
                    session.send_keys(field, c.encode_utf8(&mut buf)).await?;
                }
                KeyAction::Backspace => session.press_backspace(field).await?,
                KeyAction::Pause(d) => tokio::time::sleep(d).await,
            }
        }

        Ok(())
    }

    fn sample_delay(&mut self, range: (u64, u64)) -> Duration {
        let (lo, hi) = range;
        let ms = if hi > lo {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        };
        Duration::from_millis(ms)
    }
}

/// Attach a step name to an automation error
fn at(step: AttemptStep) -> impl Fn(AutomationError) -> AttemptFailure {
    move |error| AttemptFailure { step, error }
}

/// Run a future under this step's own bound
async fn bounded<T, F>(timeout_secs: u64, fut: F) -> Result<T, AutomationError>
where
    F: Future<Output = Result<T, AutomationError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(AutomationError::StepTimeout { timeout_secs }),
    }
}

/// Locate a required control or fail the step with `LocatorExhausted`
async fn require(
    session: &mut (dyn AutomationSession + '_),
    candidates: &[Locator],
    control: &'static str,
) -> Result<Locator, AutomationError> {
    match first_match(session, candidates).await? {
        Some(locator) => Ok(locator.clone()),
        None => Err(AutomationError::LocatorExhausted { control }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names() {
        assert_eq!(AttemptStep::SessionInit.as_str(), "session_init");
        assert_eq!(AttemptStep::Teardown.as_str(), "teardown");
    }

    #[test]
    fn test_failure_kind_mapping() {
        let transient = AttemptFailure {
            step: AttemptStep::StepAdvance,
            error: AutomationError::LocatorExhausted {
                control: "next_button",
            },
        };
        assert_eq!(transient.failure_kind(), FailureKind::Transient);

        let unrecoverable = AttemptFailure {
            step: AttemptStep::Publish,
            error: AutomationError::Unexpected("copyright dialog".to_string()),
        };
        assert_eq!(unrecoverable.failure_kind(), FailureKind::Unrecoverable);
    }

    #[test]
    fn test_failure_display_names_the_step() {
        let failure = AttemptFailure {
            step: AttemptStep::AuthCheck,
            error: AutomationError::LoginTimeout,
        };
        let rendered = failure.to_string();
        assert!(rendered.starts_with("auth_check:"));
        assert!(rendered.contains("login"));
    }
}
