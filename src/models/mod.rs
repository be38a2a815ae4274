pub mod job;
pub mod verdict;
pub mod wallet;
pub mod audit;

pub use job::{JobState, ScanJob};
pub use verdict::{FetchedContent, RiskAssessment, ScanResult};
pub use wallet::{Reservation, ReservationStatus, Transaction, TransactionType, Wallet};
pub use audit::{AuditLogEntry, AuditLogInput};
