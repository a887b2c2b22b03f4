#![allow(clippy::needless_doctest_main)]
//!
//! A discrete event simulation kernel.
//!
//! This crate decides *what runs next* and *when*. Work is scheduled as
//! events with a virtual timestamp, kept in a pluggable [`Scheduler`](crate::scheduler::Scheduler)
//! and executed in strict `(timestamp, uid)` order by a kernel. Two kernels
//! are provided: the [`Runtime`](crate::runtime::Runtime) which advances virtual
//! time as fast as possible and the [`RealtimeRuntime`](crate::runtime::RealtimeRuntime)
//! which paces virtual time against the wall clock through a
//! [`Synchronizer`](crate::sync::Synchronizer).
//!
//! # Building a simple event simulation
//!
//! ```
//! use des_kernel::prelude::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let mut rt = Builder::new().quiet().build();
//!
//! for delay in [5, 3, 8] {
//!     let log = log.clone();
//!     rt.schedule(SimTime::from_ticks(delay), move |k: &mut dyn Kernel| {
//!         log.borrow_mut().push(k.now().ticks());
//!     });
//! }
//!
//! assert_eq!(rt.run(), RunOutcome::Drained);
//! assert_eq!(*log.borrow(), vec![3, 5, 8]);
//! ```
//!
//! Events receive the kernel as `&mut dyn Kernel`, so that they can
//! schedule, cancel or remove further events. Handles to scheduled
//! events ([`EventId`](crate::runtime::EventId)) never own the event, they only
//! observe it.
//!
//! # Submitting work from other threads
//!
//! The kernels are bound to the thread that created them. Other threads
//! interact through a [`SimulatorHandle`](crate::runtime::SimulatorHandle), whose
//! submissions are drained into the scheduler by the owning thread between
//! two events.
//!

#[macro_use]
mod macros;

pub mod prelude;
pub mod runtime;
pub mod scheduler;
pub mod sync;
pub mod time;
