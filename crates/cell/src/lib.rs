//! Serialized cells: values owned by a dedicated worker thread.
//!
//! Every read, write, and read-modify-write against a [`SerializedCell`] is
//! shipped to the cell's worker as a request and applied strictly in arrival
//! order. Operations on the same cell therefore never interleave, and a writer
//! that returns from [`SerializedCell::set`] happens-before any later reader
//! going through the same cell. Callers never see a lock.
//!
//! Handles are cheap to clone and all clones talk to the same worker. When the
//! last handle is dropped the worker drains whatever requests are already
//! queued and exits.

mod cell;

pub use cell::SerializedCell;
