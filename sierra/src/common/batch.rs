//! Reclassification batch driver.
//!
//! Each work unit runs to completion before the next starts:
//! fetch the bib, fetch its items, decide which bib call numbers may
//! go, update the LPA reference items, then update the bib.
use crate::client::Catalog;
use crate::common::callnumber::{self, BIB_CALL_NUMBER_TAG, ITEM_CALL_NUMBER_TAG};
use crate::common::reclass;
use crate::common::worklist::WorkUnit;
use crate::csvlog::{self, AuditEntry, ReclassSink};
use crate::record::{Bib, Item};
use crate::result::SierraResult;
use crate::util;
use crate::varfield::VarField;
use std::fmt;
use std::time::Instant;

/// Max item IDs per item read request.
pub const ITEM_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitOutcome {
    /// Items and bib were updated.
    Updated,
    /// No item needed a new call number.  The bib was left alone.
    NothingToUpdate,
    BibNotFound,
    BibNotRetrieved,
    ItemsNotRetrieved,
}

/// What happened to a single work unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub bib_id: String,
    pub outcome: UnitOutcome,
    pub items_updated: Vec<String>,
    pub items_failed: usize,
    pub requests: usize,
}

impl UnitReport {
    fn new(bib_id: &str) -> Self {
        UnitReport {
            bib_id: bib_id.to_string(),
            outcome: UnitOutcome::NothingToUpdate,
            items_updated: Vec::new(),
            items_failed: 0,
            requests: 0,
        }
    }
}

/// Run totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub units_processed: usize,
    pub bibs_updated: usize,
    pub items_updated: usize,
    pub items_failed: usize,
    pub bibs_not_found: usize,
    pub requests: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &UnitReport) {
        self.units_processed += 1;
        self.items_updated += report.items_updated.len();
        self.items_failed += report.items_failed;
        self.requests += report.requests;

        match report.outcome {
            UnitOutcome::Updated => self.bibs_updated += 1,
            UnitOutcome::BibNotFound => self.bibs_not_found += 1,
            _ => {}
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} bibs: {} bibs updated, {} items updated, \
            {} items failed, {} bibs not found, {} requests",
            self.units_processed,
            self.bibs_updated,
            self.items_updated,
            self.items_failed,
            self.bibs_not_found,
            self.requests,
        )
    }
}

pub struct Reclassifier<C: Catalog, S: ReclassSink> {
    catalog: C,
    sink: S,
    dry_run: bool,
    summary: RunSummary,
}

impl<C: Catalog, S: ReclassSink> Reclassifier<C, S> {
    pub fn new(catalog: C, sink: S) -> Self {
        Reclassifier {
            catalog,
            sink,
            dry_run: false,
            summary: RunSummary::default(),
        }
    }

    /// Read everything, update nothing.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Process every work unit in order.
    ///
    /// A malformed work list row, an invalid classification, a failed
    /// bib update, or a failed log write stops the run.
    pub fn run<I>(&mut self, units: I) -> SierraResult<RunSummary>
    where
        I: IntoIterator<Item = SierraResult<WorkUnit>>,
    {
        for unit in units {
            let unit = unit?;
            let report = self.process_unit(&unit)?;
            self.summary.absorb(&report);
        }

        log::info!("{}", self.summary);

        Ok(self.summary.clone())
    }

    /// Reclassify one bib and its LPA reference items.
    pub fn process_unit(&mut self, unit: &WorkUnit) -> SierraResult<UnitReport> {
        let start = Instant::now();
        let timestamp = util::timestamp_now();
        let mut report = UnitReport::new(&unit.bib_id);

        log::info!(
            "Processing bib {} classification={} special_cutter={}",
            unit.bib_id,
            unit.classification,
            unit.special_cutter
        );

        let (class_part, cutter_part) =
            callnumber::split_classification(&unit.classification, unit.special_cutter)?;

        let item_field =
            callnumber::call_number_field(&class_part, &cutter_part, ITEM_CALL_NUMBER_TAG)?;
        let bib_field =
            callnumber::call_number_field(&class_part, &cutter_part, BIB_CALL_NUMBER_TAG)?;

        report.requests += 1;
        // Not-found and remote failures skip the unit.  Anything else
        // stops the run.
        let bib = match self.catalog.get_bib(&unit.bib_id) {
            Ok(b) => b,
            Err(e) if e.is_bib_not_found() || e.is_remote() => {
                log::error!("Cannot retrieve bib {}: {e}", unit.bib_id);

                let (marker, outcome) = if e.is_bib_not_found() {
                    (csvlog::BIB_NOT_FOUND_MARKER, UnitOutcome::BibNotFound)
                } else {
                    (csvlog::BIB_NOT_RETRIEVED_MARKER, UnitOutcome::BibNotRetrieved)
                };

                return self.abandon_unit(unit, timestamp, marker, outcome, report);
            }
            Err(e) => return Err(e),
        };

        let items = match self.fetch_items(&bib, &mut report) {
            Ok(i) => i,
            Err(e) if e.is_remote() => {
                log::error!("Cannot retrieve items for bib {}: {e}", unit.bib_id);

                return self.abandon_unit(
                    unit,
                    timestamp,
                    csvlog::ITEMS_NOT_RETRIEVED_MARKER,
                    UnitOutcome::ItemsNotRetrieved,
                    report,
                );
            }
            Err(e) => return Err(e),
        };

        let for_deletion = reclass::safe_to_delete_call_numbers(&items);
        let other_location = reclass::other_location_call_numbers(&items);

        for cn in reclass::unconfirmed_call_numbers(bib.var_fields(), &for_deletion, &other_location)
        {
            log::warn!(
                "Bib {} call number '{cn}' matches no item call number; leaving it in place",
                bib.id()
            );
        }

        for item in items.iter().filter(|i| reclass::item_needs_reclass(i)) {
            self.update_item(bib.id(), item, &item_field, &mut report)?;
        }

        if report.items_updated.is_empty() {
            log::info!("Bib {} has no items to reclassify", bib.id());
        } else {
            let mut bib_fields =
                reclass::rewrite_bib_fields(bib.var_fields(), &for_deletion, &other_location)?;

            bib_fields.push(bib_field);

            self.update_bib(&bib, &bib_fields, &mut report)?;
            report.outcome = UnitOutcome::Updated;
        }

        self.sink.audit(&AuditEntry::Completed {
            timestamp,
            bib_id: unit.bib_id.to_string(),
            classification: unit.classification.to_string(),
            item_ids: report.items_updated.clone(),
            requests: report.requests,
            elapsed: start.elapsed(),
        })?;

        Ok(report)
    }

    fn abandon_unit(
        &mut self,
        unit: &WorkUnit,
        timestamp: String,
        marker: &'static str,
        outcome: UnitOutcome,
        mut report: UnitReport,
    ) -> SierraResult<UnitReport> {
        self.sink.audit(&AuditEntry::Failed {
            timestamp,
            bib_id: unit.bib_id.to_string(),
            classification: unit.classification.to_string(),
            marker,
        })?;

        report.outcome = outcome;
        Ok(report)
    }

    /// Fetch the bib's items in batches, retaining link order.
    fn fetch_items(&mut self, bib: &Bib, report: &mut UnitReport) -> SierraResult<Vec<Item>> {
        let mut items = Vec::new();

        for batch in util::split_into_batches(&bib.item_ids(), ITEM_BATCH_SIZE) {
            log::debug!("Fetching items for bib {}: {batch:?}", bib.id());

            report.requests += 1;
            items.extend(self.catalog.get_items(&batch)?);
        }

        Ok(items)
    }

    /// Apply the new call number to one item.
    ///
    /// Items with more than one call number and items the remote system
    /// refused to update are written to the error log and skipped.
    fn update_item(
        &mut self,
        bib_id: &str,
        item: &Item,
        new_field: &VarField,
        report: &mut UnitReport,
    ) -> SierraResult<()> {
        let new_fields = match reclass::change_item_call_number(item, new_field) {
            Ok(f) => f,
            Err(e) if e.is_multi_call_num() => {
                log::error!("Bib {bib_id}: {e}");
                report.items_failed += 1;
                return self.sink.item_failed(bib_id, item.id());
            }
            Err(e) => return Err(e),
        };

        if self.dry_run {
            log::info!("Dry run: would update item {}", item.id());
            report.items_updated.push(item.id().to_string());
            return Ok(());
        }

        report.requests += 1;

        match self.catalog.update_item(item.id(), &new_fields) {
            Ok(()) => {}
            Err(e) if e.is_remote() => {
                log::error!("Bib {bib_id}: update of item {} failed: {e}", item.id());
                report.items_failed += 1;
                return self.sink.item_failed(bib_id, item.id());
            }
            Err(e) => return Err(e),
        }

        log::info!("Item {} updated", item.id());
        report.items_updated.push(item.id().to_string());

        Ok(())
    }

    /// Bib update failures are not recovered.  The items were already
    /// changed and someone needs to look at the bib.
    fn update_bib(
        &mut self,
        bib: &Bib,
        var_fields: &[VarField],
        report: &mut UnitReport,
    ) -> SierraResult<()> {
        if self.dry_run {
            log::info!("Dry run: would update bib {}", bib.id());
            return Ok(());
        }

        report.requests += 1;

        self.catalog.update_bib(bib.id(), var_fields).inspect_err(|e| {
            log::error!("Update of bib {} failed after item updates: {e}", bib.id())
        })?;

        log::info!("Bib {} updated", bib.id());

        Ok(())
    }
}
