//! Background actors
//!
//! ## Architecture Overview
//!
//! ```text
//!   relay (main) ──spawns──▶ SchedulerActor ──every interval──▶ MetricsService::sweep
//!        │                        ▲
//!        │ SchedulerHandle        │ mpsc commands (SweepNow, Shutdown)
//!        └──▶ API state ──────────┘   last report via watch channel
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the actor owns an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels carry replies back to the handle
//! 3. **State**: the latest sweep report is published on a watch channel

pub mod messages;
pub mod scheduler;

pub use messages::{SchedulerCommand, SweepFailure, SweepReport};
pub use scheduler::{SchedulerActor, SchedulerHandle, SchedulerSettings};
