pub mod allowance;
pub mod conservation;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod mock;
pub mod registry;
pub mod transaction;

pub use allowance::AllowanceGate;
pub use engine::Engine;
pub use error::{Error, Result};
pub use ledger::{LedgerError, PublicLedger};
pub use registry::{NoteRegistry, NoteState, RegistryDelta};
pub use transaction::{JoinSplitTransaction, TxState};
