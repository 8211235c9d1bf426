// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tm-engine: the scheduling logic built on top of tm-core's data model and
//! tm-storage's Modifier — the event cache, result resolver, driver,
//! admission/cancellation, dispatcher, reaper, readers and the `Scheduler`
//! facade that wires them together (§4).

mod admission;
mod dispatcher;
mod driver;
mod event_cache;
mod reaper;
mod readers;
mod resolver;
mod scheduler;

pub use admission::{Adder, Canceller};
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use driver::Driver;
pub use event_cache::EventCache;
pub use reaper::Reaper;
pub use readers::Readers;
pub use resolver::ResultResolver;
pub use scheduler::{PeriodicCleaning, RunHandle, Scheduler, SchedulerConfig};
