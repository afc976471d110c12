pub mod tick_log;

pub use tick_log::{append_tick_record, TickLedgerRecord};
