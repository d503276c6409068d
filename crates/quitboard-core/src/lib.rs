//! # Quitboard Core Library
//!
//! Core business logic for Quitboard, a community tracker that measures
//! each member's streak since a personal cutoff date, converts elapsed
//! time into a reward/penalty score, and periodically republishes a
//! ranked leaderboard to a shared channel.
//!
//! ## Architecture
//!
//! - **Progress & scoring**: pure, clock-free arithmetic -- callers
//!   supply `today`
//! - **Registration wizard**: an in-process state machine capturing
//!   cutoff date and unit price before committing a member record
//! - **Storage**: SQLite member store with per-row atomic mutations
//! - **Leaderboard**: rendering plus the replace-not-edit post policy
//! - **Scheduler**: a recurring trigger driving recompute and fan-out
//!
//! The chat backend is consumed through the [`ChatTransport`] trait;
//! this crate ships no network code.
//!
//! ## Key Components
//!
//! - [`Engine`]: command surface and scheduled cycles
//! - [`Database`]: member, snapshot, and post-tracker persistence
//! - [`RegistrationWizard`]: transient wizard state machine
//! - [`Trigger`]: daily or fixed-interval firing schedule

pub mod config;
pub mod engine;
pub mod error;
pub mod leaderboard;
pub mod progress;
pub mod registration;
pub mod scheduler;
pub mod scoring;
pub mod storage;
pub mod transport;

pub use config::Config;
pub use engine::{CommitOutcome, Engine};
pub use error::{
    ConfigError, EngineError, PreconditionFailed, StateConflict, StoreError, TransportError,
    ValidationError,
};
pub use progress::{compute_progress, tenure_title, Progress, RankLabel};
pub use registration::{DateInput, RegistrationWizard};
pub use scheduler::Trigger;
pub use scoring::{rank, score, RankEntry, PENALTY_PER_RELAPSE, RESET_THRESHOLD};
pub use storage::{Database, LeaderboardPost, Member, MemberId, ProgressSnapshot};
pub use transport::{
    ChatTransport, Destination, MembershipStatus, MessageId, NullTransport, SubDestination,
};
