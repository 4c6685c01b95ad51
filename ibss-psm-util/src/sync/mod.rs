//! Synchronization primitives shared between interrupt handlers and the
//! cooperative run loop.
//!
//! Both primitives are built on [`critical_section`], so they work on single
//! core MCUs (interrupts disabled) as well as on hosts (global lock) without
//! depending on a specific executor.
pub mod channel;
pub mod irq_cell;

pub use channel::*;
pub use irq_cell::*;
