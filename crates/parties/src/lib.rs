//! Parties: customers referenced by invoices.

pub mod customer;

pub use customer::Customer;
