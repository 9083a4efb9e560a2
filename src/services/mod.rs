// Document stores
pub mod invoices;
pub mod orders;

// Inbound document pipeline
pub mod ingestion;
