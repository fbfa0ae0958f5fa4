//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements     | Connects to                   |
//! |----------------|----------------|-------------------------------|
//! | `automation`   | AutomationPort | Scripted ground-handling flags|
//! | `channel_sink` | EventSink      | Bounded embassy channel       |
//! | `config_file`  | ConfigPort     | JSON file (atomic save)       |
//! | `log_sink`     | EventSink      | `log` facade                  |
//! | `loopback`     | SimulatorPort  | In-memory key/value store     |
//! | `plan_file`    | PlanSource     | OFP JSON file drop            |
//! | `time`         | ClockPort      | `Instant` / manual test clock |

pub mod automation;
pub mod channel_sink;
pub mod config_file;
pub mod log_sink;
pub mod loopback;
pub mod plan_file;
pub mod time;
