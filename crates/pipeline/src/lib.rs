//! Weir - Processor pipeline stage
//!
//! A [`ProcessorStage`] applies one [`Processor`] between two transaction
//! streams; a chain of processors is a chain of stages, one task per
//! chain position. A processor can pass a message through, explode it
//! into several, or drop it:
//!
//! - every returned message is forwarded downstream as its own
//!   transaction, in return order, and upstream is acknowledged only once
//!   all of them are (first failure wins)
//! - an empty return drops the message and short-circuits upstream with
//!   the processor's response (`Ack` for intentional drops)
//!
//! [`Processor`]: weir_core::Processor

mod stage;

pub use stage::ProcessorStage;
