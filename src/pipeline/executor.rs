//! Command execution engine.
//!
//! A [`Session`] owns the version store and applies commands and cleaning
//! runs to the selected version, storing every result as a new version and
//! recording it in the lineage history for undo.

use super::report::report_command;
use super::spec::Command;
use crate::analyser::filter::FilterEngine;
use crate::analyser::lifecycle::version::base_name;
use crate::analyser::lifecycle::{Lineage, Operation, Version, VersionStore};
use crate::analyser::logic::{Cleaner, CleaningOptions};
use crate::config::AppConfig;
use crate::error::{CleanError, JanitorError, Result, StoreError};
use crate::logging::FrameLogger;
use polars::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Result of one successful command or cleaning run
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Name the result was stored under
    pub version: String,

    pub frame: Arc<DataFrame>,

    /// Rows in the result
    pub row_count: usize,

    /// Per-column cleaning problems that did not stop the run
    pub warnings: Vec<CleanError>,
}

/// One command's result within a batch
#[derive(Debug)]
pub struct BatchEntry {
    pub index: usize,
    pub filename: String,

    /// The result, or an empty placeholder when the command failed
    pub frame: Arc<DataFrame>,

    pub count: usize,

    /// Stored version name, or the failure
    pub result: Result<String>,
}

impl BatchEntry {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Human-readable report of the entry's frame
    pub fn report(&self) -> String {
        report_command(&self.frame, self.count)
    }
}

/// Report generated after a batch of commands
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Row count per command, in order; failed commands count 0
    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.count).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch completed: {} commands, {} succeeded, {} failed, {} rows produced",
            self.entries.len(),
            self.succeeded(),
            self.failed(),
            self.counts().iter().sum::<usize>()
        )
    }
}

/// A frame produced by running an operation, before it is stored
struct Produced {
    frame: DataFrame,
    warnings: Vec<CleanError>,
}

/// The pure part of the session: runs operations on frames without touching the store.
#[derive(Default)]
struct Executor {
    engine: FilterEngine,
    cleaner: Cleaner,
}

impl Executor {
    /// Filter, then clean.
    fn run_command(&self, input: &DataFrame, command: &Command) -> Result<Produced> {
        let mut frame = match command.filter_node()? {
            Some(node) => {
                let mask = self.engine.evaluate_node(input, &node)?;
                input.filter(&mask)?
            }
            None => input.clone(),
        };

        let mut warnings = Vec::new();
        if command.has_scruff()
            && let Some(options) = &command.scruff
        {
            let outcome = self.cleaner.clean(&frame, options)?;
            frame = outcome.frame;
            warnings = outcome.warnings;
        }

        Ok(Produced { frame, warnings })
    }

    fn run_clean(&self, input: &DataFrame, options: &CleaningOptions) -> Result<Produced> {
        let outcome = self.cleaner.clean(input, options)?;
        Ok(Produced {
            frame: outcome.frame,
            warnings: outcome.warnings,
        })
    }

    /// Rebuild a lineage from its original by re-running `operations` in order.
    ///
    /// Also returns the name of the version the last operation produced.
    fn replay(
        &self,
        lineage: &Lineage,
        operations: &[Operation],
    ) -> Result<(Lineage, Option<String>)> {
        let mut rebuilt = lineage.restart();
        let mut last_produced = None;

        for operation in operations {
            let input = rebuilt
                .get(operation.target())
                .map(|v| Arc::clone(&v.frame))
                .ok_or_else(|| StoreError::UnknownVersion(operation.target().to_owned()))?;

            let (name, description, produced) = match operation {
                Operation::Command { command, .. } => (
                    rebuilt.qualify_name(&command.filename),
                    command.description.clone(),
                    self.run_command(&input, command)?,
                ),
                Operation::Clean {
                    options, output, ..
                } => (
                    rebuilt.qualify_name(output),
                    scruff_description(options),
                    self.run_clean(&input, options)?,
                ),
            };

            let stored = rebuilt.insert(Version::new(name, produced.frame, description))?;
            last_produced = Some(stored.name.clone());
            rebuilt.history_mut().push(operation.clone());
        }

        Ok((rebuilt, last_produced))
    }
}

fn scruff_description(options: &CleaningOptions) -> String {
    format!("Scruffed with: {}", options.active_summary().join(", "))
}

/// The command orchestrator for one user session.
pub struct Session {
    store: VersionStore,
    executor: Executor,
    logger: FrameLogger,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(FilterEngine::default(), Cleaner::default())
    }
}

impl Session {
    pub fn new(engine: FilterEngine, cleaner: Cleaner) -> Self {
        Self {
            store: VersionStore::default(),
            executor: Executor { engine, cleaner },
            logger: FrameLogger::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            FilterEngine::new(config.filter.date_fallback),
            Cleaner::default(),
        )
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// Register an upload; its original becomes the selected version and its history starts empty.
    pub fn load_data(&mut self, upload_name: impl Into<String>, frame: DataFrame) {
        let upload_name = upload_name.into();
        self.logger.log_data_info(&frame, "Initial Load");
        tracing::info!("Loaded {upload_name}");
        self.store.add_upload(upload_name, frame);
    }

    pub fn select_upload(&mut self, upload: &str) -> Result<()> {
        Ok(self.store.select_upload(upload)?)
    }

    pub fn select_version(&mut self, name: &str) -> Result<()> {
        Ok(self.store.select_version(name)?)
    }

    /// The selected version's data
    pub fn current_frame(&self) -> Result<Arc<DataFrame>> {
        Ok(Arc::clone(&self.store.selected_version()?.frame))
    }

    /// Run a command against `target` (or the selected version) and store the result.
    ///
    /// The store is left untouched if the command fails.
    pub fn apply_command(
        &mut self,
        command: &Command,
        target: Option<&str>,
    ) -> Result<CommandOutcome> {
        let source = match target {
            Some(name) => self.store.version(name)?,
            None => self.store.selected_version()?,
        };
        let target = source.name.clone();
        let input = Arc::clone(&source.frame);

        self.logger.log_data_info(&input, "Before Command");
        let produced = self.executor.run_command(&input, command)?;
        let after = produced.frame.shape();

        let version =
            self.store
                .add_version(&command.filename, produced.frame, command.description.clone())?;
        self.store.record(Operation::Command {
            command: command.clone(),
            target: target.clone(),
        })?;

        self.logger.log_operation_result(
            &format!("Command {version}"),
            input.shape(),
            after,
            Some(&json!({
                "target": target,
                "description": command.description,
                "filtered": command.has_filters(),
                "scruffed": command.has_scruff(),
            })),
        );
        self.outcome(version, produced.warnings)
    }

    /// Clean the selected version into `{base}_scruffed.csv`.
    pub fn scruff(&mut self, options: &CleaningOptions) -> Result<CommandOutcome> {
        let source = self.store.selected_version()?;
        let target = source.name.clone();
        let input = Arc::clone(&source.frame);
        let output = format!("{}_scruffed.csv", base_name(&target));

        self.logger.log_data_info(&input, "Before Scruff");
        let produced = self.executor.run_clean(&input, options)?;
        let after = produced.frame.shape();

        let version = self
            .store
            .add_version(&output, produced.frame, scruff_description(options))?;
        self.store.record(Operation::Clean {
            options: options.clone(),
            target,
            output,
        })?;

        self.logger.log_operation_result(
            "Scruffing",
            input.shape(),
            after,
            serde_json::to_value(options).ok().as_ref(),
        );
        self.outcome(version, produced.warnings)
    }

    /// Run each command against the version selected when the batch starts.
    ///
    /// A failing command is logged and yields an empty placeholder with count 0;
    /// the remaining commands still run.
    pub fn apply_commands(&mut self, commands: &[Command]) -> Result<BatchReport> {
        let target = self.store.selected_version()?.name.clone();
        let mut report = BatchReport::default();

        for (index, command) in commands.iter().enumerate() {
            let entry = match self.apply_command(command, Some(&target)) {
                Ok(outcome) => BatchEntry {
                    index,
                    filename: command.filename.clone(),
                    count: outcome.row_count,
                    frame: outcome.frame,
                    result: Ok(outcome.version),
                },
                Err(err) => {
                    self.logger
                        .log_error(&format!("Error applying command {index}: {err}"));
                    BatchEntry {
                        index,
                        filename: command.filename.clone(),
                        frame: Arc::new(DataFrame::empty()),
                        count: 0,
                        result: Err(JanitorError::Command {
                            index,
                            filename: command.filename.clone(),
                            source: Box::new(err),
                        }),
                    }
                }
            };
            report.entries.push(entry);
        }

        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Drop the last operation and rebuild the active lineage from its original.
    ///
    /// Returns `false` when there is nothing to undo. The lineage is only
    /// replaced once the rebuild has fully succeeded; the version produced by
    /// the last remaining operation is selected, or the original if none remain.
    pub fn undo(&mut self) -> Result<bool> {
        let lineage = self.store.active_lineage()?;
        let Some((last, remaining)) = lineage.history().entries().split_last() else {
            return Ok(false);
        };

        tracing::info!("Undoing {}", last.describe());
        let (rebuilt, last_produced) = self.executor.replay(lineage, remaining)?;
        self.store
            .replace_active_lineage(rebuilt, last_produced.as_deref())?;
        Ok(true)
    }

    /// Discard every derived version and the history; the original is selected.
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset_lineage()?;
        tracing::info!("Lineage reset to original");
        Ok(())
    }

    pub fn remove_versions(&mut self, names: &[&str]) -> Result<()> {
        self.store.remove_versions(names)?;
        tracing::info!("Removed versions: {}", names.join(", "));
        Ok(())
    }

    pub fn remove_version(&mut self, name: &str) -> Result<()> {
        self.remove_versions(&[name])
    }

    pub fn export_version(&self, name: &str) -> Result<Vec<u8>> {
        self.store.export_version(name)
    }

    pub fn export_lineage(&self) -> Result<Vec<u8>> {
        self.store.export_lineage()
    }

    fn outcome(&self, version: String, warnings: Vec<CleanError>) -> Result<CommandOutcome> {
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        let frame = Arc::clone(&self.store.version(&version)?.frame);
        Ok(CommandOutcome {
            row_count: frame.height(),
            version,
            frame,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use serde_json::json;

    fn session() -> Result<Session> {
        let mut session = Session::default();
        session.load_data(
            "orders.csv",
            df!(
                "amount" => [Some(50i64), Some(150), None, Some(200), Some(99)],
                "region" => ["north", "south", "north", "east", "south"]
            )?,
        );
        Ok(session)
    }

    fn big_orders() -> Command {
        Command::new("big.csv", "amount over 100")
            .with_filters(json!({"amount": {"op": ">", "value": 100}}))
    }

    fn names(session: &Session) -> Result<Vec<String>> {
        Ok(session
            .store()
            .active_lineage()?
            .version_names()
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    #[test]
    fn test_apply_command_stores_and_selects() -> Result<()> {
        let mut session = session()?;
        let outcome = session.apply_command(&big_orders(), None)?;
        assert_eq!(outcome.version, "orders_big.csv");
        assert_eq!(outcome.row_count, 2);
        assert_eq!(session.store().selected_version_name(), Some("orders_big.csv"));
        assert_eq!(session.store().active_lineage()?.history().len(), 1);
        Ok(())
    }

    #[test]
    fn test_command_without_filters_or_scruff_copies_input() -> Result<()> {
        let mut session = session()?;
        let outcome = session.apply_command(&Command::default_template(), None)?;
        assert_eq!(outcome.row_count, 5);
        assert!(outcome.frame.equals_missing(&session.store().lineage("orders.csv")?.original().frame));
        Ok(())
    }

    #[test]
    fn test_failed_command_leaves_store_untouched() -> Result<()> {
        let mut session = session()?;
        let bad = Command::new("bad.csv", "").with_filters(json!({"missing": {"op": "==", "value": 1}}));
        let err = session.apply_command(&bad, None);
        assert!(matches!(
            err,
            Err(JanitorError::Filter(FilterError::UnknownColumn { .. }))
        ));
        assert_eq!(names(&session)?, vec!["orders.csv"]);
        assert!(session.store().active_lineage()?.history().is_empty());
        Ok(())
    }

    #[test]
    fn test_batch_runs_against_starting_selection() -> Result<()> {
        let mut session = session()?;
        let commands = vec![
            big_orders(),
            Command::new("broken.csv", "").with_filters(json!({"amount": {"op": "~=", "value": 1}})),
            Command::new("south.csv", "south")
                .with_filters(json!({"region": {"op": "==", "value": "south"}})),
        ];
        let report = session.apply_commands(&commands)?;

        assert_eq!(report.counts(), vec![2, 0, 2]);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.entries[1].result,
            Err(JanitorError::Command { index: 1, .. })
        ));
        assert_eq!(report.entries[1].frame.height(), 0);
        assert_eq!(
            names(&session)?,
            vec!["orders.csv", "orders_big.csv", "orders_south.csv"]
        );
        // The second command ran on the original, not on the first command's result
        let history = session.store().active_lineage()?.history().entries().to_vec();
        assert!(history.iter().all(|op| op.target() == "orders.csv"));
        Ok(())
    }

    #[test]
    fn test_scruff_names_version_after_selection() -> Result<()> {
        let mut session = session()?;
        session.apply_command(&big_orders(), None)?;
        let outcome = session.scruff(&CleaningOptions {
            drop_na_rows: true,
            ..Default::default()
        })?;
        assert_eq!(outcome.version, "orders_big_scruffed.csv");
        assert_eq!(outcome.row_count, 2);
        Ok(())
    }

    #[test]
    fn test_undo_restores_previous_state() -> Result<()> {
        let mut session = session()?;
        assert!(!session.undo()?);

        session.apply_command(&big_orders(), None)?;
        let before = names(&session)?;
        let selected = session.store().selected_version_name().map(str::to_owned);

        session.scruff(&CleaningOptions {
            drop_duplicate_rows: true,
            ..Default::default()
        })?;
        assert!(session.undo()?);

        assert_eq!(names(&session)?, before);
        assert_eq!(session.store().selected_version_name().map(str::to_owned), selected);
        assert_eq!(session.current_frame()?.height(), 2);
        assert_eq!(session.store().active_lineage()?.history().len(), 1);
        Ok(())
    }

    #[test]
    fn test_undo_selects_last_produced_version() -> Result<()> {
        let mut session = session()?;
        let region = |name: &str, value: &str| {
            Command::new(name, "").with_filters(json!({"region": {"op": "==", "value": value}}))
        };
        session.apply_command(&region("a.csv", "north"), Some("orders.csv"))?;
        session.apply_command(&region("b.csv", "south"), Some("orders.csv"))?;
        // Same name again: replaced in place, still the newest output
        session.apply_command(&region("a.csv", "east"), Some("orders.csv"))?;
        session.apply_command(&region("c.csv", "north"), Some("orders.csv"))?;

        assert!(session.undo()?);
        assert_eq!(
            names(&session)?,
            vec!["orders.csv", "orders_a.csv", "orders_b.csv"]
        );
        assert_eq!(session.store().selected_version_name(), Some("orders_a.csv"));
        assert_eq!(session.current_frame()?.height(), 1);
        Ok(())
    }

    #[test]
    fn test_undo_of_only_operation_selects_original() -> Result<()> {
        let mut session = session()?;
        session.apply_command(&big_orders(), None)?;
        assert!(session.undo()?);
        assert_eq!(session.store().selected_version_name(), Some("orders.csv"));
        Ok(())
    }

    #[test]
    fn test_reset_and_remove() -> Result<()> {
        let mut session = session()?;
        session.apply_command(&big_orders(), None)?;
        assert!(matches!(
            session.remove_version("orders.csv"),
            Err(JanitorError::Store(StoreError::CannotRemoveOriginal { .. }))
        ));
        session.reset()?;
        assert_eq!(names(&session)?, vec!["orders.csv"]);
        assert!(matches!(
            session.remove_version("orders.csv"),
            Err(JanitorError::Store(StoreError::CannotRemoveLastVersion { .. }))
        ));
        Ok(())
    }
}
