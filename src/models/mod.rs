pub mod contract;
pub mod job;
pub mod money;
pub mod profile;
pub mod report;

pub use contract::{Contract, ContractStatus};
pub use job::{Job, JobFilter};
pub use money::{fits_money_column, max_money, MONEY_SCALE};
pub use profile::{InsufficientFundsError, Profile, ProfileType};
pub use report::{ClientEarnings, DateRange, ProfessionEarnings};
