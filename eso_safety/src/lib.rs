//! # EsoCore Safety Supervisor Library
//!
//! Supervisory core for machine-safety I/O: dual-channel safety inputs,
//! fail-safe relay outputs with feedback, a software watchdog and a
//! safety state machine that forces the safe state on any fault.
//!
//! ## Layers
//!
//! 1. **ChannelMonitor**: debounce, cross-monitoring, stuck-at proof test
//! 2. **OutputSupervisor**: energize gate, feedback and short supervision
//! 3. **FaultAggregator**: one surfaced fault code, fixed precedence
//! 4. **SafetyStateMachine**: pure transition table
//! 5. **SafetySupervisor**: public contract, owns all of the above
//!
//! ## Zero-Allocation Cycle
//!
//! Channel state lives in fixed arrays, the event log and observer table
//! in `heapless` containers. `cycle()` performs no heap allocation.

pub mod config;
pub mod cycle;
pub mod events;
pub mod safety;
pub mod shared;
pub mod state;
pub mod supervisor;

pub use crate::events::{EventQueue, FnObserver, ObserverId, SafetyObserver};
pub use crate::shared::{SharedSupervisor, StopHandle};
pub use crate::supervisor::SafetySupervisor;
