//! In-memory browser used by the CLI and the test suite.
//!
//! A [`BrowserFixture`] describes the pages a run will meet; [`Simulation`] wires a
//! [`crate::relay::BackgroundService`] to one [`crate::relay::ContentScript`] per tab
//! and pumps tab loads and relay messages until the browser is idle.

mod fixture;
mod simulation;

pub use fixture::{BrowserFixture, ElementFixture, PageFixture};
pub use simulation::{DriverCall, RecordedEvent, SimulatedBrowser, SimulatedPage, Simulation};
