//! # Space Ledger State
//!
//! Folds signed space events into [`SpaceState`].
//!
//! The reducer is stateless: it takes an optional prior state and one
//! event, and returns a new state or a typed rejection. Its only side
//! channel is the injected [`IdentityVerifier`].
//!
//! ```rust,no_run
//! # async fn example(
//! #     events: Vec<space_ledger_core::SpaceEvent>,
//! #     registry: space_ledger_state::ProofRegistry,
//! # ) -> space_ledger_state::Result<()> {
//! use space_ledger_state::apply_events;
//!
//! let state = apply_events(&events, &registry).await?;
//! println!("{} members", state.members.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod reducer;
pub mod state;
pub mod verifier;

pub use error::{Result, StateError};
pub use reducer::{apply_event, apply_event_with_timeout, apply_events, DEFAULT_VERIFY_TIMEOUT};
pub use state::{Role, SpaceInbox, SpaceInvitation, SpaceMember, SpacePhase, SpaceState};
pub use verifier::{verify_with_timeout, IdentityKey, IdentityVerifier, ProofRegistry};
