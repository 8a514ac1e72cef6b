// Application layer: concrete source adapters built on the shared plumbing.

pub mod sources;
