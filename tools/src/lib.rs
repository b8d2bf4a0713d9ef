//! Scenario runner and size reports for the gsnap codec.
//!
//! A scenario is a JSON list of ghost states per tick. Running it encodes
//! every tick against the previous ones exactly as a server would, decodes
//! the packets back, checks that every sent component survived, and reports
//! where the bits went.

mod run;
mod scenario;

pub use run::{
    format_report_pretty, run_scenario, ComponentReport, EntityReport, PacketReport, RunOptions,
    RunReport, TickReport,
};
pub use scenario::{Scenario, ScenarioComponent, ScenarioTick, ScenarioValue};
