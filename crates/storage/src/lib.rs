// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tm-storage: the Modifier (§4.1), the only component that writes to the
//! persisted `State`.

pub mod modifier;

pub use modifier::Modifier;
