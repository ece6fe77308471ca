//! Optimistic like and bookmark toggles.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use kbw_core::types::{EngagementKind, EngagementState, EngagementSummary};
use kbw_core::{Error, Result};
use uuid::Uuid;

use crate::TRACING_TARGET_ENGAGEMENT;
use crate::api::BlogApi;
use crate::optimistic::{Optimistic, Ticket};
use crate::session::Session;

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server flipped the edge and reported this state.
    Applied(EngagementState),
    /// A toggle of the same post and kind was still running.
    Ignored,
}

type ToggleKey = (Uuid, EngagementKind);

#[derive(Debug, Default)]
struct Ledger {
    states: HashMap<ToggleKey, Optimistic<EngagementState>>,
    in_flight: HashSet<ToggleKey>,
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a toggle as running until it is settled or dropped.
///
/// Dropping an unsettled toggle, as happens when the caller cancels it,
/// rolls the optimistic flip back.
struct InFlight<'a> {
    ledger: &'a Mutex<Ledger>,
    key: ToggleKey,
    ticket: Ticket,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, result: Result<EngagementState>) -> Result<EngagementState> {
        let mut ledger = lock(self.ledger);
        ledger.in_flight.remove(&self.key);
        let state = ledger.states.entry(self.key).or_default();
        let result = match result {
            Ok(server) => {
                state.confirm(self.ticket, server);
                Ok(server)
            }
            Err(error) => {
                state.rollback(self.ticket);
                Err(error)
            }
        };

        self.settled = true;
        result
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut ledger = lock(self.ledger);
        ledger.in_flight.remove(&self.key);
        if let Some(state) = ledger.states.get_mut(&self.key) {
            state.rollback(self.ticket);
        }
    }
}

/// Like and bookmark state of the posts a user has seen.
#[derive(Debug)]
pub struct EngagementToggles<A> {
    api: A,
    session: Session,
    ledger: Mutex<Ledger>,
}

impl<A: BlogApi> EngagementToggles<A> {
    pub fn new(api: A, session: Session) -> Self {
        Self {
            api,
            session,
            ledger: Mutex::default(),
        }
    }

    /// Returns the state to show for a post and kind.
    pub fn state(&self, post_id: Uuid, kind: EngagementKind) -> EngagementState {
        lock(&self.ledger)
            .states
            .get(&(post_id, kind))
            .map(|state| *state.value())
            .unwrap_or_default()
    }

    /// Returns whether a toggle of this post and kind is running.
    pub fn is_in_flight(&self, post_id: Uuid, kind: EngagementKind) -> bool {
        lock(&self.ledger).in_flight.contains(&(post_id, kind))
    }

    /// Seeds both kinds of a post from the server.
    ///
    /// Kinds with a toggle still running keep their optimistic value.
    pub async fn load(&self, post_id: Uuid) -> Result<EngagementSummary> {
        let summary = self.api.engagement_summary(post_id).await?;

        let mut ledger = lock(&self.ledger);
        for kind in [EngagementKind::Like, EngagementKind::Bookmark] {
            let key = (post_id, kind);
            if !ledger.in_flight.contains(&key) {
                ledger.states.entry(key).or_default().reset(summary.state(kind));
            }
        }
        Ok(summary)
    }

    /// Flips the signed-in user's like or bookmark on a post.
    ///
    /// The flip shows immediately. It is reconciled with the server's answer,
    /// or undone if the call fails or is cancelled.
    pub async fn toggle(&self, post_id: Uuid, kind: EngagementKind) -> Result<ToggleOutcome> {
        if !self.session.is_signed_in() {
            return Err(Error::authentication_required());
        }

        let key = (post_id, kind);
        let ticket = {
            let mut ledger = lock(&self.ledger);
            if !ledger.in_flight.insert(key) {
                tracing::debug!(
                    target: TRACING_TARGET_ENGAGEMENT,
                    post_id = %post_id,
                    kind = %kind,
                    "Toggle already in flight, ignoring"
                );
                return Ok(ToggleOutcome::Ignored);
            }

            let state = ledger.states.entry(key).or_default();
            let flipped = state.value().flipped();
            state.begin(flipped)
        };
        let in_flight = InFlight {
            ledger: &self.ledger,
            key,
            ticket,
            settled: false,
        };

        let result = self.api.toggle_engagement(post_id, kind).await;
        let state = in_flight.settle(result)?;

        tracing::debug!(
            target: TRACING_TARGET_ENGAGEMENT,
            post_id = %post_id,
            kind = %kind,
            active = state.active,
            count = state.count,
            "Toggle applied"
        );
        Ok(ToggleOutcome::Applied(state))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jiff::Timestamp;
    use kbw_core::ErrorKind;
    use kbw_core::store::{EngagementStore, MemoryStore};
    use kbw_core::types::{Post, PostStatus};

    use super::*;
    use crate::api::MockApi;
    use crate::session::SessionInfo;

    async fn published_post(store: &MemoryStore) -> Uuid {
        let now = Timestamp::now();
        let post = Post {
            id: Uuid::now_v7(),
            author_id: Uuid::now_v7(),
            title: "Hello".to_owned(),
            excerpt: String::new(),
            content: "World".to_owned(),
            tags: Vec::new(),
            status: PostStatus::Published,
            cover_image_url: None,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let post_id = post.id;
        store.put_post(post).await;
        post_id
    }

    fn signed_in() -> Session {
        Session::signed_in(SessionInfo::new(Uuid::now_v7(), "ada@kbw.vc", "token"))
    }

    #[tokio::test]
    async fn toggle_requires_sign_in() -> anyhow::Result<()> {
        let api = MockApi::new(Session::new());
        let post_id = published_post(api.store()).await;
        let toggles = EngagementToggles::new(api.clone(), Session::new());

        let error = toggles.toggle(post_id, EngagementKind::Like).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AuthenticationRequired);
        assert_eq!(api.calls("toggle_engagement"), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_toggle_is_ignored_while_in_flight() -> anyhow::Result<()> {
        let session = signed_in();
        let api = MockApi::new(session.clone()).with_latency(Duration::from_millis(500));
        let post_id = published_post(api.store()).await;
        let toggles = EngagementToggles::new(api.clone(), session);

        let (first, second) = tokio::join!(toggles.toggle(post_id, EngagementKind::Like), async {
            assert!(toggles.state(post_id, EngagementKind::Like).active);
            toggles.toggle(post_id, EngagementKind::Like).await
        });

        let applied = EngagementState {
            active: true,
            count: 1,
        };
        assert_eq!(first?, ToggleOutcome::Applied(applied));
        assert_eq!(second?, ToggleOutcome::Ignored);
        assert_eq!(api.calls("toggle_engagement"), 1);
        assert_eq!(toggles.state(post_id, EngagementKind::Like), applied);
        assert_eq!(
            toggles.state(post_id, EngagementKind::Bookmark),
            EngagementState::default()
        );
        Ok(())
    }

    #[tokio::test]
    async fn failure_rolls_back_and_releases() -> anyhow::Result<()> {
        let session = signed_in();
        let api = MockApi::new(session.clone());
        let post_id = published_post(api.store()).await;
        let toggles = EngagementToggles::new(api.clone(), session);
        api.fail_next("toggle_engagement", ErrorKind::Storage);

        let error = toggles
            .toggle(post_id, EngagementKind::Bookmark)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert_eq!(
            toggles.state(post_id, EngagementKind::Bookmark),
            EngagementState::default()
        );
        assert!(!toggles.is_in_flight(post_id, EngagementKind::Bookmark));

        let outcome = toggles.toggle(post_id, EngagementKind::Bookmark).await?;
        assert_eq!(
            outcome,
            ToggleOutcome::Applied(EngagementState {
                active: true,
                count: 1
            })
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_toggle_rolls_back() -> anyhow::Result<()> {
        let session = signed_in();
        let api = MockApi::new(session.clone()).with_latency(Duration::from_secs(5));
        let post_id = published_post(api.store()).await;
        let toggles = EngagementToggles::new(api.clone(), session);

        let cancelled = tokio::time::timeout(
            Duration::from_secs(1),
            toggles.toggle(post_id, EngagementKind::Like),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(!toggles.is_in_flight(post_id, EngagementKind::Like));
        assert_eq!(
            toggles.state(post_id, EngagementKind::Like),
            EngagementState::default()
        );
        Ok(())
    }

    #[tokio::test]
    async fn load_seeds_from_summary() -> anyhow::Result<()> {
        let session = signed_in();
        let api = MockApi::new(session.clone());
        let post_id = published_post(api.store()).await;
        api.store()
            .toggle_engagement(EngagementKind::Like, post_id, Uuid::now_v7())
            .await?;
        let toggles = EngagementToggles::new(api.clone(), session);

        let summary = toggles.load(post_id).await?;
        assert_eq!(summary.like_count, 1);
        assert_eq!(
            toggles.state(post_id, EngagementKind::Like),
            EngagementState {
                active: false,
                count: 1
            }
        );

        toggles.toggle(post_id, EngagementKind::Like).await?;
        assert_eq!(
            toggles.state(post_id, EngagementKind::Like),
            EngagementState {
                active: true,
                count: 2
            }
        );
        Ok(())
    }
}
