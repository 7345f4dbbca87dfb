pub mod amount;
pub mod error;
pub mod ledger;
pub mod member;
pub mod period;
pub mod traits;

pub use amount::Amount;
pub use error::Error;
pub use ledger::{LedgerDefaults, LedgerState, Snapshot};
pub use member::Member;
pub use traits::{Analyzer, ErrorReporter, ImageExtractor, LedgerStore};
