//! Entity contexts: the UI-facing collections.
//!
//! Each context is the only writer of its collection. Commands insert
//! optimistic entries, run the fetch through the matching fetch client,
//! and apply the result only if their operation handle is still current.

mod hero;
mod keyed;
mod team;


pub use hero::HeroContext;
pub use keyed::{Entry, EntityContext, Loadable, MatchContext, PlayerContext};
pub use team::TeamContext;
