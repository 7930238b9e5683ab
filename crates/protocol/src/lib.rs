//! Core data units carried through the polymur pipeline.
//!
//! Everything that moves between listeners, the distribution engine and the
//! destination writers is one of two things: a [`Record`] (a single Graphite
//! plaintext line) or a [`Batch`] (an ordered group of records carried as a
//! unit through a queue or over HTTPS).
//!
//! Records are reference-counted immutable strings. The same record is
//! cloned into every destination queue under broadcast distribution, so the
//! clone must be cheap and the contents must never change after ingress.

mod batch;
mod record;

pub use batch::Batch;
pub use record::Record;
