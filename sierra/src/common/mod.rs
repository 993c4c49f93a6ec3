pub mod batch;
pub mod callnumber;
pub mod reclass;
pub mod worklist;
