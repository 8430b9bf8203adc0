//! The verifier/prover side of a decentralized-identity present-proof
//! exchange: a durable, resumable state machine tracking one presentation
//! exchange across asynchronous, possibly out-of-order messages, plus the
//! restriction-matching check proving a presentation genuinely satisfies
//! what was requested.
//!
//! Wire transport, envelope encryption, the persistence engine, and the
//! zero-knowledge proof system itself are external collaborators injected
//! through the [`provider`] traits.

pub mod error;
pub mod format;
pub mod generate;
pub mod manager;
pub mod messages;
pub mod provider;
pub mod state;

pub use crate::error::Error;
pub use crate::manager::ExchangeManager;
pub use crate::state::{ExchangeRecord, Initiator, Role, State};
