//! Payment orchestration: the control-flow hub that sequences KYC, fraud,
//! card-control and limit checks ahead of the ledger commit, plus the
//! scheduler that drives deferred payments through the same path.

pub mod error;
pub mod interbank;
pub mod orchestrator;
pub mod schedule;
pub mod scheduler;
pub mod types;

pub use error::PaymentError;
pub use interbank::{GatewayAcceptance, GatewayError, InterbankGateway, InterbankRequest};
pub use orchestrator::PaymentService;
pub use schedule::{PaymentSchedule, ScheduleRepository, ScheduleStatus};
pub use scheduler::SchedulerWorker;
pub use types::{PaymentOutcome, PaymentRequest, TransferKind};
