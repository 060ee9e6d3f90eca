pub mod ledger;
pub mod region;
pub mod repo;
pub mod scan;
