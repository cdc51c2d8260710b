pub mod reporting_engine;
pub mod settlement_engine;

pub use reporting_engine::ReportingEngine;
pub use settlement_engine::{PaymentRequest, SettlementEngine, SettlementPolicy};
