use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::db::Database;
use crate::economy::{self, EconomyConfig, EconomyError};
use crate::events::{AppEvent, Notification, Route};
use crate::models::{
    Account, UploadedVideo, VerificationOutcome, VerificationRecord, WatchSession,
};
use crate::verify::{self, Analyzer, ScreenshotUpload, VerifyError};
use crate::watch::WatchState;
use crate::youtube;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("missing video title")]
    MissingTitle,

    #[error("not a recognizable YouTube video URL")]
    InvalidUrl,

    #[error("no account is signed in")]
    NotSignedIn,

    #[error("account already exists")]
    AccountExists,

    #[error("no such account")]
    UnknownAccount,

    #[error("no eligible watch session to claim")]
    NothingToClaim,

    #[error("coins already earned for this video")]
    AlreadyClaimed,
}

struct ControllerState {
    account: Option<Account>,
    watch: WatchState,
    /// Most recent concluded, eligible, still-unclaimed session.
    pending_claim: Option<WatchSession>,
    claimed_sessions: HashSet<String>,
}

/// Single-user event boundary: consumes UI events, runs the economy rules,
/// persists through the ledger store and emits notification/navigation
/// effects. The in-memory account only advances after the matching store
/// write succeeds; on failure it stays at the last confirmed value.
///
/// Coin mutations are serialized by the state mutex. The UI is still
/// expected to disable a triggering control while its call is in flight.
#[derive(Clone)]
pub struct AppController {
    config: EconomyConfig,
    db: Database,
    analyzer: Arc<dyn Analyzer>,
    state: Arc<Mutex<ControllerState>>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl AppController {
    pub fn new(
        db: Database,
        config: EconomyConfig,
        analyzer: Arc<dyn Analyzer>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            config,
            db,
            analyzer,
            state: Arc::new(Mutex::new(ControllerState {
                account: None,
                watch: WatchState::new(),
                pending_claim: None,
                claimed_sessions: HashSet::new(),
            })),
            events,
        }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Creates the account and seeds the signup bonus.
    pub async fn register(&self, account_id: &str) -> Result<Account> {
        let mut state = self.state.lock().await;

        if self.db.read_account(account_id).await?.is_some() {
            self.notify(Notification::error(
                "Registration failed",
                "An account with this id already exists. Try logging in instead.",
            ));
            return Err(InputError::AccountExists.into());
        }

        let now = Utc::now();
        let account = economy::apply_signup_bonus(Account::new(account_id, now), &self.config)?;

        self.db.upsert_account(&account).await.map_err(|err| {
            self.notify_store_failure("register");
            err
        })?;

        info!("Registered account {account_id}");
        state.account = Some(account.clone());
        self.emit(AppEvent::BalanceChanged {
            balance: account.coin_balance,
        });
        self.notify(Notification::success(
            "Registration successful!",
            format!(
                "Welcome! You received {} coins for your first video upload.",
                self.config.signup_bonus
            ),
        ));
        Ok(account)
    }

    /// Loads an existing account. Never re-seeds the bonus; that is what
    /// made the original's balance resettable on every login.
    pub async fn login(&self, account_id: &str) -> Result<Account> {
        let mut state = self.state.lock().await;

        let Some(account) = self.db.read_account(account_id).await? else {
            self.notify(Notification::error(
                "Login failed",
                "No account with this id. Register first.",
            ));
            return Err(InputError::UnknownAccount.into());
        };

        state.account = Some(account.clone());
        self.emit(AppEvent::BalanceChanged {
            balance: account.coin_balance,
        });
        self.notify(Notification::info(
            "Welcome back!",
            "Ready to boost your channel?",
        ));
        Ok(account)
    }

    /// Starts a watch session and hands the video off to the browser.
    pub async fn open_video(&self, video_id: &str) -> Result<()> {
        self.open_video_at(video_id, Utc::now()).await
    }

    pub async fn open_video_at(&self, video_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.watch.begin(video_id, now);

        self.emit(AppEvent::OpenExternal {
            url: youtube::watch_url(video_id),
        });
        self.notify(Notification::info(
            "Video opened in YouTube",
            "Watch for at least 3 minutes to earn coins. We'll track when you return!",
        ));
        Ok(())
    }

    /// The session clock runs from open to focus-regain, so blur itself
    /// records nothing.
    pub async fn window_blur(&self) {
        debug!("window blurred");
    }

    /// Concludes the live session when the app regains focus. Returns the
    /// finalized session, or `None` if nothing was being watched.
    pub async fn window_focus(&self) -> Result<Option<WatchSession>> {
        self.window_focus_at(Utc::now()).await
    }

    pub async fn window_focus_at(&self, now: DateTime<Utc>) -> Result<Option<WatchSession>> {
        let mut state = self.state.lock().await;

        let Some(session) = state
            .watch
            .conclude(now, self.config.eligibility_threshold_ms)
        else {
            return Ok(None);
        };

        let Some(account_id) = state.account.as_ref().map(|account| account.id.clone()) else {
            // Nobody to credit: the session is discarded rather than
            // left claimable by whoever signs in next.
            warn!("concluded a watch session with no signed-in account; discarded");
            return Ok(Some(session));
        };

        self.db
            .insert_watch_session(&account_id, &session)
            .await
            .map_err(|err| {
                self.notify_store_failure("record watch session");
                err
            })?;

        if session.eligible {
            state.pending_claim = Some(session.clone());
            self.notify(Notification::success(
                "Watch complete!",
                format!(
                    "You watched long enough to earn {} coins. Claim them now!",
                    self.config.watch_reward
                ),
            ));
        } else {
            let watched_secs = session.watch_duration_ms / 1000;
            self.notify(Notification::info(
                "Not quite enough",
                format!("You watched {watched_secs}s; 3 minutes are needed to earn coins."),
            ));
        }

        Ok(Some(session))
    }

    /// Awards the watch reward for the pending eligible session. Claims
    /// are once per session and once per video; the rules engine itself
    /// keeps no claim state.
    pub async fn claim_watch_coins(&self) -> Result<u64> {
        let mut state = self.state.lock().await;

        let Some(account) = state.account.clone() else {
            self.notify_sign_in();
            return Err(InputError::NotSignedIn.into());
        };

        let Some(session) = state.pending_claim.take() else {
            self.notify(Notification::error(
                "Nothing to claim",
                "Watch a video for at least 3 minutes first.",
            ));
            return Err(InputError::NothingToClaim.into());
        };

        if state.claimed_sessions.contains(&session.id)
            || self
                .db
                .video_claimed(&account.id, &session.video_id)
                .await?
        {
            self.notify(Notification::error(
                "Already earned!",
                "You've already earned coins from this video.",
            ));
            return Err(InputError::AlreadyClaimed.into());
        }

        let mut updated = economy::award_watch_coins(account, &self.config);
        updated.updated_at = Utc::now();

        // Credit and claimed flag land in one transaction; a failure
        // leaves both the store and memory at the pre-claim state.
        if let Err(err) = self.db.record_claim(&updated, &session.id).await {
            // Leave the claim pending so the user can retry.
            state.pending_claim = Some(session);
            self.notify_store_failure("claim watch coins");
            return Err(err);
        }

        state.claimed_sessions.insert(session.id);
        state.account = Some(updated.clone());
        self.emit(AppEvent::BalanceChanged {
            balance: updated.coin_balance,
        });
        self.notify(Notification::success(
            format!("+{} coins earned!", self.config.watch_reward),
            "Great job! Keep watching to earn more coins.",
        ));
        Ok(self.config.watch_reward)
    }

    /// Runs a screenshot through validation, dedup and the analyzer, and
    /// credits whatever the detection was worth.
    pub async fn submit_verification(
        &self,
        video_id: &str,
        upload: ScreenshotUpload,
    ) -> Result<VerificationOutcome> {
        let mut state = self.state.lock().await;

        let Some(account) = state.account.clone() else {
            self.notify_sign_in();
            return Err(InputError::NotSignedIn.into());
        };

        let fingerprint = upload.fingerprint();
        if self.db.verification_exists(video_id, &fingerprint).await? {
            self.notify(Notification::error(
                "Duplicate screenshot",
                "This screenshot was already submitted for this video.",
            ));
            return Err(VerifyError::DuplicateSubmission.into());
        }

        let outcome =
            verify::verify_screenshot(&upload, &self.config, self.analyzer.as_ref()).map_err(
                |err| {
                    self.notify(Notification::error("Verification failed", err.to_string()));
                    err
                },
            )?;

        let now = Utc::now();
        let record = VerificationRecord {
            id: Uuid::new_v4().to_string(),
            video_id: video_id.to_string(),
            file_fingerprint: fingerprint,
            liked: outcome.liked,
            subscribed: outcome.subscribed,
            coins_awarded: outcome.coins_awarded,
            created_at: now,
        };
        let mut updated = economy::award_verification_coins(account, &outcome);
        updated.updated_at = now;

        // Record and credit commit together, so a failed write never
        // strands a fingerprint that would reject the retry as a
        // duplicate.
        self.db
            .record_verification(&updated, &record)
            .await
            .map_err(|err| {
                self.notify_store_failure("record verification");
                err
            })?;

        state.account = Some(updated.clone());
        self.emit(AppEvent::BalanceChanged {
            balance: updated.coin_balance,
        });
        if outcome.coins_awarded > 0 {
            self.notify(Notification::success(
                format!("+{} coins earned!", outcome.coins_awarded),
                "Verification complete. Thanks for supporting the creator!",
            ));
        } else {
            self.notify(Notification::info(
                "No like detected",
                "We couldn't spot a like in your screenshot, so no coins this time.",
            ));
        }
        Ok(outcome)
    }

    /// Validates and charges an upload, then queues the video for
    /// promotion. First upload is free; after that it costs coins.
    pub async fn submit_upload(
        &self,
        title: &str,
        url: &str,
        thumbnail_url: Option<&str>,
    ) -> Result<UploadedVideo> {
        let mut state = self.state.lock().await;

        let Some(account) = state.account.clone() else {
            self.notify_sign_in();
            return Err(InputError::NotSignedIn.into());
        };

        if title.trim().is_empty() {
            self.notify(Notification::error(
                "Missing title",
                "Give your video a title before uploading.",
            ));
            return Err(InputError::MissingTitle.into());
        }

        if youtube::extract_video_id(url).is_none() {
            self.notify(Notification::error(
                "Invalid URL",
                "Please enter a valid YouTube video URL.",
            ));
            return Err(InputError::InvalidUrl.into());
        }

        let was_free = !account.free_upload_used;
        let mut charged = match economy::charge_upload(account, &self.config) {
            Ok(charged) => charged,
            Err(EconomyError::UploadDenied { shortfall }) => {
                self.notify(Notification::error(
                    "Insufficient coins",
                    format!(
                        "You need {shortfall} more coins to upload videos. Earn coins by watching videos first!"
                    ),
                ));
                self.emit(AppEvent::Navigate { route: Route::Earn });
                return Err(EconomyError::UploadDenied { shortfall }.into());
            }
            Err(err) => return Err(err.into()),
        };

        let now = Utc::now();
        charged.updated_at = now;

        let video = UploadedVideo {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            source_url: url.to_string(),
            thumbnail_url: thumbnail_url.map(|s| s.to_string()),
            owner_id: charged.id.clone(),
            created_at: now,
        };

        // Video and charge commit together; a failed write leaves no
        // unpaid video in the promotion queue.
        self.db.record_upload(&charged, &video).await.map_err(|err| {
            self.notify_store_failure("save your upload");
            err
        })?;

        state.account = Some(charged.clone());
        self.emit(AppEvent::BalanceChanged {
            balance: charged.coin_balance,
        });
        self.notify(Notification::success(
            "Video uploaded successfully!",
            if was_free {
                "Welcome bonus: your first upload is free!".to_string()
            } else {
                "Video added to promotion queue.".to_string()
            },
        ));
        self.emit(AppEvent::Navigate {
            route: Route::Dashboard,
        });
        Ok(video)
    }

    /// Current balance for display, from the last confirmed account state.
    pub async fn balance(&self) -> Result<u64> {
        let state = self.state.lock().await;
        state
            .account
            .as_ref()
            .map(|account| account.coin_balance)
            .ok_or_else(|| InputError::NotSignedIn.into())
    }

    pub async fn videos(&self, owner_id: Option<&str>) -> Result<Vec<UploadedVideo>> {
        self.db.list_videos(owner_id).await
    }

    /// Whether this account has at least one eligible session for the
    /// video.
    pub async fn has_watched_video(&self, video_id: &str) -> Result<bool> {
        let state = self.state.lock().await;
        let Some(account) = state.account.as_ref() else {
            return Err(InputError::NotSignedIn.into());
        };
        let sessions = self.db.list_watch_sessions(&account.id).await?;
        Ok(sessions
            .iter()
            .any(|session| session.video_id == video_id && session.eligible))
    }

    /// Ids of all videos with an eligible watch, in watch order.
    pub async fn watched_video_ids(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let Some(account) = state.account.as_ref() else {
            return Err(InputError::NotSignedIn.into());
        };
        let sessions = self.db.list_watch_sessions(&account.id).await?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.eligible)
            .map(|session| session.video_id)
            .collect())
    }

    fn emit(&self, event: AppEvent) {
        // The UI may have gone away; losing effects then is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, notification: Notification) {
        self.emit(AppEvent::Notification(notification));
    }

    fn notify_sign_in(&self) {
        self.notify(Notification::error(
            "Not signed in",
            "Log in or register to continue.",
        ));
    }

    fn notify_store_failure(&self, action: &str) {
        self.notify(Notification::error(
            "Something went wrong",
            format!("We couldn't {action} right now. Please try again."),
        ));
    }
}
