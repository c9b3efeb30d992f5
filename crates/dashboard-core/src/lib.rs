//! Data coordination for the Dota dashboard.
//!
//! Entity contexts own the UI-facing collections (teams, matches,
//! players, heroes). The [`DataCoordinator`] runs the multi-step team
//! workflows across them and derives a single status for the UI. All
//! network access goes through the fetch clients in `dota_client`, and
//! collections are persisted best-effort through a [`Persistence`]
//! backend.

pub mod aggregate;
pub mod contexts;
pub mod coordinator;
pub mod entity;
pub mod ops;
pub mod persist;

#[cfg(test)]
mod testing;

pub use aggregate::{MatchParticipation, TeamAggregate, TeamKey, TeamPerformance};
pub use contexts::{Entry, HeroContext, MatchContext, PlayerContext, TeamContext};
pub use coordinator::{
    Command, DataCoordinator, RestoreSummary, UiStatus, WorkflowOutcome, WorkflowStatus,
};
pub use entity::{CommandError, EntityStatus, FirstLoadFailure, LoadOutcome, Services};
pub use ops::{OperationHandle, OperationTracker, RefreshRegistry};
pub use persist::{NoPersistence, PersistError, Persistence};
