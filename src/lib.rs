//! Shared-expense ledger: groups log expenses paid by one member, and the ledger
//! works out who owes whom.
//!
//! Balances are a full-history reduction over a group's expenses
//! ([`balance::compute_balances`]); [`settlement::plan_settlement`] turns them into a
//! short list of pairwise payments, and recorded payments are appended back to the
//! ledger as "Settlement" expenses ([`ledger::Ledger::record_settlement`]).

pub mod auth;
pub mod balance;
pub mod config;
pub mod error;
pub mod ledger;
pub mod routes;
pub mod schemas;
pub mod settlement;
pub mod store;

pub use balance::{compute_balances, Balances, EPSILON};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use settlement::{plan_settlement, Transaction};
