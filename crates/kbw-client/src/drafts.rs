//! Draft editing with debounced auto-save.
//!
//! [`DraftEditor`] keeps a working copy of a post's fields next to the last
//! copy the server accepted. Every edit that leaves the two apart restarts the
//! auto-save timer. Saves are single-flight: while one is running, further
//! attempts report [`SaveOutcome::InFlight`] and write nothing. Every
//! server-side action needs a signed-in session and fails locally without one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use kbw_core::{Error, Result};
use kbw_core::types::{Post, PostChanges, PostFields};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::TRACING_TARGET_DRAFTS;
use crate::api::BlogApi;
use crate::session::Session;

/// Default quiet period before an edited draft is saved.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(30);

/// Draft editor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftConfig {
    /// Quiet period after the last edit before the draft is saved.
    pub autosave_delay: Duration,
}

impl DraftConfig {
    /// Sets the auto-save quiet period.
    pub fn with_autosave_delay(mut self, autosave_delay: Duration) -> Self {
        self.autosave_delay = autosave_delay;
        self
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
        }
    }
}

/// Result of a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The working copy was written.
    Saved,
    /// Nothing to write.
    Clean,
    /// Another save was running; nothing was written.
    InFlight,
}

/// Snapshot of the editor's save state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftStatus {
    pub dirty: bool,
    pub saving: bool,
    pub last_saved_at: Option<Timestamp>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct DraftState {
    working: PostFields,
    saved: PostFields,
    last_saved_at: Option<Timestamp>,
    last_error: Option<String>,
}

impl DraftState {
    fn is_dirty(&self) -> bool {
        self.working != self.saved
    }
}

/// Returns only the fields that differ from the saved copy.
fn changes_between(saved: &PostFields, working: &PostFields) -> PostChanges {
    fn changed<T: PartialEq + Clone>(saved: &T, working: &T) -> Option<T> {
        (saved != working).then(|| working.clone())
    }

    PostChanges {
        title: changed(&saved.title, &working.title),
        excerpt: changed(&saved.excerpt, &working.excerpt),
        content: changed(&saved.content, &working.content),
        tags: changed(&saved.tags, &working.tags),
        cover_image_url: changed(&saved.cover_image_url, &working.cover_image_url),
    }
}

/// Clears the single-flight flag however the save ends, cancellation included.
struct SavingGuard<'a> {
    saving: &'a AtomicBool,
    done: &'a Notify,
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.saving.store(false, Ordering::Release);
        self.done.notify_waiters();
    }
}

/// Pending auto-save.
///
/// Whoever claims the flag first wins: the task claims it when its quiet
/// period ends, a cancel claims it to abort the sleep. A claimed save is
/// never aborted.
#[derive(Debug)]
struct AutosaveTimer {
    task: JoinHandle<()>,
    claimed: Arc<AtomicBool>,
}

impl AutosaveTimer {
    fn cancel(self) {
        if !self.claimed.swap(true, Ordering::AcqRel) {
            self.task.abort();
        }
    }
}

#[derive(Debug)]
struct DraftInner<A> {
    api: A,
    session: Session,
    post_id: Uuid,
    state: Mutex<DraftState>,
    saving: AtomicBool,
    save_done: Notify,
}

impl<A: BlogApi> DraftInner<A> {
    fn lock(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_signed_in() {
            Ok(())
        } else {
            Err(Error::authentication_required())
        }
    }

    async fn save_now(&self) -> Result<SaveOutcome> {
        self.require_session()?;
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(SaveOutcome::InFlight);
        }
        let _guard = SavingGuard {
            saving: &self.saving,
            done: &self.save_done,
        };

        let (sent, changes) = {
            let state = self.lock();
            if !state.is_dirty() {
                return Ok(SaveOutcome::Clean);
            }
            (
                state.working.clone(),
                changes_between(&state.saved, &state.working),
            )
        };

        match self.api.update_post(self.post_id, &changes).await {
            Ok(_) => {
                let mut state = self.lock();
                state.saved = sent;
                state.last_saved_at = Some(Timestamp::now());
                state.last_error = None;

                tracing::debug!(
                    target: TRACING_TARGET_DRAFTS,
                    post_id = %self.post_id,
                    dirty = state.is_dirty(),
                    "Draft saved"
                );
                Ok(SaveOutcome::Saved)
            }
            Err(error) => {
                self.lock().last_error = Some(error.message().to_owned());
                tracing::warn!(
                    target: TRACING_TARGET_DRAFTS,
                    post_id = %self.post_id,
                    error = %error,
                    "Draft save failed"
                );
                Err(error)
            }
        }
    }
}

/// Editor for one post.
///
/// Must be used inside a Tokio runtime: edits spawn the auto-save timer.
/// Dropping the editor, or calling [`close`](Self::close), cancels a timer
/// that has not fired yet. A save the timer already started runs to the end.
#[derive(Debug)]
pub struct DraftEditor<A> {
    inner: Arc<DraftInner<A>>,
    config: DraftConfig,
    timer: Mutex<Option<AutosaveTimer>>,
}

impl<A: BlogApi + 'static> DraftEditor<A> {
    /// Opens an editor on an existing post.
    pub fn open(api: A, session: Session, post: &Post, config: DraftConfig) -> Self {
        let fields = post.fields();
        let state = DraftState {
            working: fields.clone(),
            saved: fields,
            last_saved_at: None,
            last_error: None,
        };

        Self {
            inner: Arc::new(DraftInner {
                api,
                session,
                post_id: post.id,
                state: Mutex::new(state),
                saving: AtomicBool::new(false),
                save_done: Notify::new(),
            }),
            config,
            timer: Mutex::new(None),
        }
    }

    /// Creates an empty draft on the server and opens an editor on it.
    ///
    /// # Errors
    ///
    /// Fails with `AuthenticationRequired`, before any network call, when
    /// the session is signed out.
    pub async fn create(api: A, session: Session, config: DraftConfig) -> Result<Self> {
        if !session.is_signed_in() {
            return Err(Error::authentication_required());
        }

        let post = api.create_post().await?;
        tracing::info!(
            target: TRACING_TARGET_DRAFTS,
            post_id = %post.id,
            "Draft created"
        );
        Ok(Self::open(api, session, &post, config))
    }

    pub fn post_id(&self) -> Uuid {
        self.inner.post_id
    }

    /// Returns the working copy.
    pub fn fields(&self) -> PostFields {
        self.inner.lock().working.clone()
    }

    pub fn status(&self) -> DraftStatus {
        let state = self.inner.lock();
        DraftStatus {
            dirty: state.is_dirty(),
            saving: self.inner.saving.load(Ordering::Acquire),
            last_saved_at: state.last_saved_at,
            last_error: state.last_error.clone(),
        }
    }

    /// Changes the working copy and returns whether it now differs from the
    /// saved copy.
    ///
    /// A dirty draft restarts the auto-save timer. A clean one cancels it.
    pub fn edit(&self, f: impl FnOnce(&mut PostFields)) -> bool {
        let dirty = {
            let mut state = self.inner.lock();
            f(&mut state.working);
            state.is_dirty()
        };

        if dirty {
            self.schedule_autosave();
        } else {
            self.cancel_autosave();
        }
        dirty
    }

    pub fn set_title(&self, title: impl Into<String>) -> bool {
        let title = title.into();
        self.edit(|fields| fields.title = title)
    }

    pub fn set_excerpt(&self, excerpt: impl Into<String>) -> bool {
        let excerpt = excerpt.into();
        self.edit(|fields| fields.excerpt = excerpt)
    }

    pub fn set_content(&self, content: impl Into<String>) -> bool {
        let content = content.into();
        self.edit(|fields| fields.content = content)
    }

    pub fn set_tags(&self, tags: Vec<String>) -> bool {
        self.edit(|fields| fields.tags = tags)
    }

    pub fn set_cover_image_url(&self, cover_image_url: Option<String>) -> bool {
        self.edit(|fields| fields.cover_image_url = cover_image_url)
    }

    /// Saves the working copy unless it is clean or another save is running.
    ///
    /// # Errors
    ///
    /// Fails with `AuthenticationRequired` when signed out, otherwise returns
    /// the API error. The draft stays dirty either way.
    pub async fn save_now(&self) -> Result<SaveOutcome> {
        self.inner.save_now().await
    }

    /// Saves until the working copy is clean, waiting out running saves.
    async fn flush(&self) -> Result<()> {
        loop {
            let done = self.inner.save_done.notified();
            match self.inner.save_now().await? {
                SaveOutcome::Clean => return Ok(()),
                SaveOutcome::Saved => {}
                SaveOutcome::InFlight => done.await,
            }
        }
    }

    /// Saves pending edits and publishes the post.
    ///
    /// # Errors
    ///
    /// Fails with a validation error, before any network call, when the title
    /// or the body is empty, and likewise when signed out. Save failures
    /// abort the publish.
    pub async fn publish(&self) -> Result<Post> {
        self.fields().validate_for_publish()?;
        self.inner.require_session()?;
        self.flush().await?;

        let post = self.inner.api.publish_post(self.inner.post_id).await?;
        tracing::info!(
            target: TRACING_TARGET_DRAFTS,
            post_id = %post.id,
            "Post published"
        );
        Ok(post)
    }

    /// Returns the post to draft.
    pub async fn unpublish(&self) -> Result<Post> {
        self.inner.require_session()?;
        let post = self.inner.api.unpublish_post(self.inner.post_id).await?;
        tracing::info!(
            target: TRACING_TARGET_DRAFTS,
            post_id = %post.id,
            "Post unpublished"
        );
        Ok(post)
    }

    /// Deletes the post. Pending edits are discarded.
    pub async fn delete(&self) -> Result<()> {
        self.inner.require_session()?;
        self.cancel_autosave();
        self.inner.api.delete_post(self.inner.post_id).await?;
        tracing::info!(
            target: TRACING_TARGET_DRAFTS,
            post_id = %self.inner.post_id,
            "Post deleted"
        );
        Ok(())
    }

    /// Cancels the auto-save timer. Edits made afterwards start it again.
    pub fn close(&self) {
        self.cancel_autosave();
    }

    fn schedule_autosave(&self) {
        let inner = Arc::downgrade(&self.inner);
        let delay = self.config.autosave_delay;
        let claimed = Arc::new(AtomicBool::new(false));
        let claim = Arc::clone(&claimed);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if claim.swap(true, Ordering::AcqRel) {
                return;
            }
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if !inner.lock().is_dirty() || !inner.session.is_signed_in() {
                return;
            }
            if let Err(error) = inner.save_now().await {
                tracing::debug!(
                    target: TRACING_TARGET_DRAFTS,
                    post_id = %inner.post_id,
                    error = %error,
                    "Auto-save failed, kept in status"
                );
            }
        });

        let timer = AutosaveTimer { task, claimed };
        if let Some(previous) = self.timer_lock().replace(timer) {
            previous.cancel();
        }
    }

    fn cancel_autosave(&self) {
        if let Some(timer) = self.timer_lock().take() {
            timer.cancel();
        }
    }

    fn timer_lock(&self) -> MutexGuard<'_, Option<AutosaveTimer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> Drop for DraftEditor<A> {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = timer.take() {
            timer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use kbw_core::ErrorKind;
    use kbw_core::store::PostStore;
    use kbw_core::types::PostStatus;

    use super::*;
    use crate::api::MockApi;
    use crate::session::{Session, SessionInfo};

    fn signed_in() -> Session {
        Session::signed_in(SessionInfo::new(Uuid::now_v7(), "ada@kbw.vc", "token"))
    }

    fn api() -> MockApi {
        MockApi::new(signed_in())
    }

    async fn editor(api: &MockApi) -> anyhow::Result<DraftEditor<MockApi>> {
        Ok(DraftEditor::create(api.clone(), signed_in(), DraftConfig::default()).await?)
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_fires_after_quiet_period() -> anyhow::Result<()> {
        let api = api();
        let editor = editor(&api).await?;

        assert!(editor.set_title("Launch notes"));
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(api.calls("update_post"), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.calls("update_post"), 1);
        let status = editor.status();
        assert!(!status.dirty);
        assert!(status.last_saved_at.is_some());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_autosave_lets_it_finish() -> anyhow::Result<()> {
        let api = api().with_latency(Duration::from_secs(2));
        let editor = editor(&api).await?;

        editor.set_title("first");
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(editor.status().saving);

        editor.set_title("second");
        tokio::time::sleep(Duration::from_secs(2)).await;
        let status = editor.status();
        assert!(status.last_saved_at.is_some());
        assert!(status.dirty);

        tokio::time::sleep(Duration::from_secs(31)).await;
        let updates = api.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].title.as_deref(), Some("first"));
        assert_eq!(updates[1].title.as_deref(), Some("second"));
        assert!(!editor.status().dirty);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn edits_restart_the_timer() -> anyhow::Result<()> {
        let api = api();
        let editor = editor(&api).await?;

        editor.set_title("Launch");
        tokio::time::sleep(Duration::from_secs(20)).await;
        editor.set_title("Launch notes");
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(api.calls("update_post"), 0);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(api.calls("update_post"), 1);
        assert_eq!(api.updates()[0].title.as_deref(), Some("Launch notes"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_edit_writes_nothing() -> anyhow::Result<()> {
        let api = api();
        let editor = editor(&api).await?;

        assert!(editor.set_content("draft body"));
        assert!(!editor.set_content(""));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.calls("update_post"), 0);
        assert!(!editor.status().dirty);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_saves_are_single_flight() -> anyhow::Result<()> {
        let api = api().with_latency(Duration::from_secs(1));
        let editor = editor(&api).await?;
        editor.set_title("Launch notes");

        let (first, second) = tokio::join!(editor.save_now(), editor.save_now());
        assert_eq!(first?, SaveOutcome::Saved);
        assert_eq!(second?, SaveOutcome::InFlight);
        assert_eq!(api.calls("update_post"), 1);
        assert_eq!(editor.save_now().await?, SaveOutcome::Clean);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn saved_copy_is_what_was_sent() -> anyhow::Result<()> {
        let api = api().with_latency(Duration::from_secs(1));
        let editor = editor(&api).await?;
        editor.set_title("first");

        let (saved, _) = tokio::join!(editor.save_now(), async {
            editor.set_title("second");
        });
        assert_eq!(saved?, SaveOutcome::Saved);
        assert!(editor.status().dirty);
        assert_eq!(api.updates()[0].title.as_deref(), Some("first"));
        assert_eq!(api.updates()[0].content, None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_stays_dirty() -> anyhow::Result<()> {
        let api = api();
        let editor = editor(&api).await?;
        editor.set_title("Launch notes");
        api.fail_next("update_post", ErrorKind::ServiceUnavailable);

        let error = editor.save_now().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ServiceUnavailable);
        let status = editor.status();
        assert!(status.dirty);
        assert!(!status.saving);
        assert!(status.last_error.is_some());

        assert_eq!(editor.save_now().await?, SaveOutcome::Saved);
        assert!(editor.status().last_error.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn publish_requires_title_and_body() -> anyhow::Result<()> {
        let api = api();
        let editor = editor(&api).await?;
        editor.set_title("Launch notes");

        let error = editor.publish().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(api.calls("update_post"), 0);
        assert_eq!(api.calls("publish_post"), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn publish_flushes_pending_edits() -> anyhow::Result<()> {
        let api = api().with_latency(Duration::from_millis(300));
        let editor = editor(&api).await?;
        editor.set_title("Launch notes");
        editor.set_content("We shipped.");

        let (saved, published) = tokio::join!(editor.save_now(), editor.publish());
        assert_eq!(saved?, SaveOutcome::Saved);
        let post = published?;
        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.title, "Launch notes");
        assert_eq!(api.calls("update_post"), 1);

        let post = editor.unpublish().await?;
        assert_eq!(post.status, PostStatus::Draft);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_autosave() -> anyhow::Result<()> {
        let api = api();

        let closed = editor(&api).await?;
        closed.set_title("closed");
        closed.close();

        let dropped = editor(&api).await?;
        dropped.set_title("dropped");
        drop(dropped);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.calls("update_post"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn signed_out_create_never_reaches_server() {
        let api = MockApi::new(Session::new());

        let error = DraftEditor::create(api.clone(), Session::new(), DraftConfig::default())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthenticationRequired);
        assert_eq!(api.calls("create_post"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_out_editor_makes_no_calls() -> anyhow::Result<()> {
        let api = api();
        let session = signed_in();
        let editor = DraftEditor::create(api.clone(), session.clone(), DraftConfig::default()).await?;
        editor.set_title("Launch notes");
        editor.set_content("We shipped.");
        session.set(None);

        let error = editor.save_now().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthenticationRequired);
        for result in [editor.publish().await.map(drop), editor.unpublish().await.map(drop)] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::AuthenticationRequired);
        }
        assert_eq!(
            editor.delete().await.unwrap_err().kind(),
            ErrorKind::AuthenticationRequired
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        for operation in ["update_post", "publish_post", "unpublish_post", "delete_post"] {
            assert_eq!(api.calls(operation), 0, "{operation}");
        }
        assert!(editor.status().dirty);
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_post() -> anyhow::Result<()> {
        let api = api();
        let editor = editor(&api).await?;
        let post_id = editor.post_id();
        editor.set_title("gone soon");

        editor.delete().await?;
        assert!(api.store().find_post(post_id).await?.is_none());
        Ok(())
    }
}
