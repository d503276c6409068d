//! Engine facade: the command surface and the scheduled cycles.
//!
//! Owns the member store (behind a mutex that is never held across an
//! await point), the transport handle, and the transient wizard map.
//! Pure computation is delegated to [`progress`](crate::progress) and
//! [`scoring`](crate::scoring); everything here is orchestration.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PreconditionFailed, Result, StateConflict};
use crate::leaderboard;
use crate::progress::{compute_progress, tenure_title, RankLabel};
use crate::registration::{parse_price, DateInput, RegistrationWizard};
use crate::scoring::{effective_days, rank, RankEntry};
use crate::storage::{Database, MemberId, ProgressSnapshot};
use crate::transport::{ChatTransport, Destination, MembershipStatus, SubDestination};

/// What a successful wizard commit hands back for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub snapshot: ProgressSnapshot,
    pub rank: RankLabel,
    pub title: String,
}

/// Member progress & leaderboard engine.
pub struct Engine<T: ChatTransport> {
    store: Mutex<Database>,
    transport: T,
    wizard: RegistrationWizard,
    config: Config,
}

impl<T: ChatTransport> Engine<T> {
    pub fn new(store: Database, transport: T, config: Config) -> Self {
        Self {
            store: Mutex::new(store),
            transport,
            wizard: RegistrationWizard::new(),
            config,
        }
    }

    fn store(&self) -> MutexGuard<'_, Database> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Start (or restart) the registration wizard for a member.
    pub fn start_registration(&self, member: MemberId) {
        self.wizard.start(member);
    }

    /// Abandon an in-flight registration.
    pub fn cancel_registration(&self, member: MemberId) {
        self.wizard.cancel(member);
    }

    /// Capture the cutoff date; advances the wizard to the price step.
    pub fn submit_date(&self, member: MemberId, input: &DateInput) -> Result<chrono::NaiveDate> {
        self.wizard.submit_date(member, input, Utc::now().date_naive())
    }

    /// Capture the price and commit the registration.
    ///
    /// Preconditions checked in order: a pending cutoff date exists, the
    /// member has not already registered, and the member holds active
    /// standing in the destination group. Transient wizard state is only
    /// cleared after the persisted write succeeds, so any failure leaves
    /// the member able to retry without re-entering the date.
    pub async fn submit_price(
        &self,
        member: MemberId,
        display_name: Option<&str>,
        input: &str,
    ) -> Result<CommitOutcome> {
        let cutoff = self
            .wizard
            .pending_cutoff(member)
            .ok_or(StateConflict::NoPendingDate(member))?;
        let price = parse_price(input)?;

        // One-shot registration: a prior committed cutoff date rejects
        // the attempt before any store mutation.
        if let Some(existing) = self.store().member(member)? {
            if existing.cutoff_date.is_some() {
                return Err(PreconditionFailed::AlreadyRegistered(member).into());
            }
        }

        let destination = self.config.destination();
        let status = self.transport.query_membership(destination, member).await?;
        if !status.is_active() {
            return Err(PreconditionFailed::NotGroupMember(member).into());
        }

        let today = Utc::now().date_naive();
        let progress = compute_progress(Some(cutoff), Some(price), today);
        let snapshot = {
            let store = self.store();
            store.upsert_member(member, display_name, Some(cutoff), Some(price), Some(true))?;
            store.upsert_snapshot(member, progress.days, progress.saved)?;
            store.record_audit(
                Some(member),
                "register",
                Some(&json!({ "cutoff": cutoff, "price": price })),
            )?;
            store.snapshot(member)?.ok_or_else(|| {
                crate::error::StoreError::QueryFailed("snapshot missing after commit".into())
            })?
        };
        self.wizard.clear_committed(member);

        let title = tenure_title(progress.days);
        // Owners cannot carry a bot-assigned badge; everyone else gets a
        // best-effort grant that never fails the commit.
        if status != MembershipStatus::Owner {
            if let Err(err) = self
                .transport
                .grant_limited_privilege(destination, member, &title)
                .await
            {
                warn!(%member, %err, "tenure badge grant failed");
            }
        }

        info!(%member, days = progress.days, "registration committed");
        Ok(CommitOutcome {
            snapshot,
            rank: RankLabel::from_days(progress.days),
            title,
        })
    }

    // ── Member commands ──────────────────────────────────────────────

    /// Record a relapse; returns the new count. A relapse before any
    /// registration silently creates a zeroed snapshot.
    pub fn report_relapse(&self, member: MemberId) -> Result<u32> {
        let store = self.store();
        let count = store.increment_relapse(member)?;
        store.record_audit(Some(member), "relapse", Some(&json!({ "count": count })))?;
        Ok(count)
    }

    pub fn get_snapshot(&self, member: MemberId) -> Result<Option<ProgressSnapshot>> {
        Ok(self.store().snapshot(member)?)
    }

    /// Most recent audited actions for one member, newest first.
    pub fn recent_actions(&self, member: MemberId, limit: usize) -> Result<Vec<String>> {
        Ok(self.store().recent_audit(member, limit)?)
    }

    /// Soft withdrawal: drops the member from the board, record kept.
    pub fn withdraw(&self, member: MemberId) -> Result<()> {
        let store = self.store();
        store.set_membership(member, false)?;
        store.record_audit(Some(member), "withdraw", None)?;
        Ok(())
    }

    pub fn set_notifications(&self, member: MemberId, enabled: bool) -> Result<()> {
        let store = self.store();
        if store.member(member)?.is_none() {
            // Opting in before registering creates a bare record.
            store.upsert_member(member, None, None, None, None)?;
        }
        store.set_notifications(member, enabled)?;
        Ok(())
    }

    /// Explicit reset: purge everything and release the tenure badge.
    /// The only sanctioned path back to re-registration.
    pub async fn reset_member(&self, member: MemberId) -> Result<()> {
        self.wizard.cancel(member);
        if let Err(err) = self
            .transport
            .grant_limited_privilege(self.config.destination(), member, &tenure_title(0))
            .await
        {
            warn!(%member, %err, "badge reset failed");
        }
        let store = self.store();
        store.record_audit(Some(member), "reset", None)?;
        store.delete_all_data_for(member)?;
        Ok(())
    }

    // ── Leaderboard ──────────────────────────────────────────────────

    /// Ranked board text, limited to `limit` rows (`None` = unbounded).
    pub fn get_leaderboard_text(&self, limit: Option<usize>) -> Result<String> {
        let rows = self.store().ranked_rows()?;
        let entries = rank(
            rows.into_iter()
                .map(|(member, snapshot)| RankEntry { member, snapshot })
                .collect(),
        );
        Ok(leaderboard::render(&entries, limit))
    }

    /// Publish the board into the configured destination, replacing the
    /// previously tracked post.
    pub async fn publish_leaderboard(&self) -> Result<()> {
        let destination = self.config.destination();
        let sub = self.config.sub_destination();
        let text = self.get_leaderboard_text(Some(self.config.leaderboard_limit))?;

        let previous = self
            .store()
            .leaderboard_post(destination, sub)?
            .map(|post| post.message_id);
        let sent = leaderboard::replace_post(&self.transport, destination, sub, previous, &text).await?;
        self.store().set_leaderboard_post(destination, sub, sent)?;
        info!(destination = destination.0, message = sent.0, "leaderboard published");
        Ok(())
    }

    // ── Scheduled cycles ─────────────────────────────────────────────

    /// Job (a): store-wide recompute, then publish.
    ///
    /// Each member's recompute is all-or-nothing for that member; a
    /// failure is logged and skipped, never aborting the cycle. Safe to
    /// call repeatedly.
    pub async fn run_leaderboard_cycle(&self) -> Result<()> {
        let cycle = Uuid::new_v4();
        let today = Utc::now().date_naive();
        let members = self.store().list_active_members()?;
        info!(%cycle, members = members.len(), "recompute cycle started");

        let mut badge_updates = Vec::new();
        for member in &members {
            let store = self.store();
            let relapse_count = match store.snapshot(member.id) {
                Ok(snapshot) => snapshot.map(|s| s.relapse_count).unwrap_or(0),
                Err(err) => {
                    warn!(%cycle, member = %member.id, %err, "snapshot read failed, skipping");
                    continue;
                }
            };
            let progress = compute_progress(member.cutoff_date, member.unit_price, today);
            let days = effective_days(progress.days, relapse_count);
            let saved = if days == 0 { 0.0 } else { progress.saved };
            if let Err(err) = store.upsert_snapshot(member.id, days, saved) {
                warn!(%cycle, member = %member.id, %err, "member recompute failed, skipping");
                continue;
            }
            badge_updates.push((member.id, days));
        }

        // Tenure badges after all store writes; best-effort per member.
        let destination = self.config.destination();
        for (member, days) in badge_updates {
            if days == 0 {
                continue;
            }
            match self.transport.query_membership(destination, member).await {
                Ok(MembershipStatus::Owner) => continue,
                Ok(_) => {
                    if let Err(err) = self
                        .transport
                        .grant_limited_privilege(destination, member, &tenure_title(days))
                        .await
                    {
                        warn!(%cycle, %member, %err, "badge update failed");
                    }
                }
                Err(err) => warn!(%cycle, %member, %err, "membership check failed"),
            }
        }

        self.publish_leaderboard().await?;
        info!(%cycle, "recompute cycle finished");
        Ok(())
    }

    /// Job (b): notification fan-out to opted-in members. One member's
    /// send failure never aborts the rest.
    pub async fn run_notification_cycle(&self) -> Result<()> {
        let today = Utc::now().date_naive();
        let recipients = self.store().list_notification_opt_ins()?;
        for member in recipients {
            let progress = compute_progress(member.cutoff_date, member.unit_price, today);
            let text = format!(
                "Good morning! Your streak: {} d., saved: {:.0}",
                progress.days, progress.saved
            );
            if let Err(err) = self
                .transport
                .send_message(Destination::direct(member.id), SubDestination::none(), &text)
                .await
            {
                warn!(member = %member.id, %err, "notification send failed, skipping");
            }
        }
        Ok(())
    }
}
