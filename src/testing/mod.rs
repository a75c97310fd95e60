//! Testing infrastructure for the stop governors.
//!
//! Fixtures build throwaway project and home directories so governors can be
//! exercised end to end against the real file system.
//!
//! # Example
//!
//! ```rust,ignore
//! use stop_governor::testing::TestFixture;
//!
//! let fixture = TestFixture::new().with_ticket("PROJ-1");
//! fixture.write_task(r#"{"id":"1","status":"pending","metadata":{"autoRun":true}}"#);
//! ```

#[cfg(test)]
pub mod fixtures;

#[cfg(test)]
pub use fixtures::*;
