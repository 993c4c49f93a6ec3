pub use client::{Catalog, SierraClient};
pub use common::batch::{Reclassifier, RunSummary};
pub use common::worklist::{WorkList, WorkUnit};
pub use csvlog::{CsvSink, ReclassSink};
pub use logging::Logger;
pub use record::{Bib, Item};
pub use result::{SierraError, SierraResult};
pub use varfield::{FieldBody, Subfield, VarField};

pub mod client;
pub mod common;
pub mod conf;
pub mod csvlog;
pub mod logging;
pub mod record;
pub mod result;
pub mod script;
pub mod util;
pub mod varfield;

#[cfg(test)]
mod tests;
