pub mod config;
pub mod gas;
pub mod ledger;
pub mod logging;
pub mod signer;
pub mod storage;
