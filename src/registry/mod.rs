// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Bounded storage for in-flight records
//!
//! Two structures keep captured state from growing without limit: a TTL
//! registry for records and a fixed-capacity ring buffer for message logs.

mod ring;
mod store;

pub use ring::RingBuffer;
pub use store::{IdGenerator, Merge, Registry, RegistryEntry};
