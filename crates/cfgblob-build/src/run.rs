use crate::{
    config::BuildConfig,
    error::BuildError,
    output::{WriteStatus, render_file, write_if_changed},
    provider::DescriptorProvider,
};
use cfgblob_codegen::record::generate_record;
use cfgblob_schema::prelude::*;
use rayon::prelude::*;
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{error, info};

///
/// RecordOutcome
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordOutcome {
    Written(PathBuf),
    Unchanged(PathBuf),
    Failed(String),
}

impl RecordOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

///
/// RunReport
///
/// One outcome per record, keyed by record path. Partial success is normal.
///

#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub outcomes: BTreeMap<String, RecordOutcome>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.outcomes.values().any(RecordOutcome::is_failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(record, outcome)| match outcome {
            RecordOutcome::Failed(message) => Some((record.as_str(), message.as_str())),
            _ => None,
        })
    }

    #[must_use]
    pub fn outcome(&self, record: &str) -> Option<&RecordOutcome> {
        self.outcomes.get(record)
    }
}

// rendered text for one record, or the reason it failed
struct Rendered {
    record: String,
    file_name: String,
    text: Result<String, String>,
}

fn render_record(set: &DescriptorSet, record: &RecordDescriptor, config: &BuildConfig) -> Rendered {
    let result = config.codegen_options().and_then(|options| {
        generate_record(set, record, &options)
            .map(|generated| (generated.file_name(), render_file(&generated)))
            .map_err(BuildError::from)
    });

    match result {
        Ok((file_name, text)) => Rendered {
            record: record.path(),
            file_name,
            text: Ok(text),
        },
        Err(err) => Rendered {
            record: record.path(),
            file_name: String::new(),
            text: Err(err.to_string()),
        },
    }
}

/// Load descriptors from `provider` and generate every record.
pub fn run(config: &BuildConfig, provider: &dyn DescriptorProvider) -> Result<RunReport, BuildError> {
    let set = provider.load()?;

    Ok(run_set(config, &set))
}

/// Generate every record of `set` into `config.out_dir`.
///
/// Records render independently, on the rayon pool when `parallel` is set;
/// files are then written one at a time in record order.
#[must_use]
pub fn run_set(config: &BuildConfig, set: &DescriptorSet) -> RunReport {
    let records: Vec<&RecordDescriptor> = set.records().collect();

    let rendered: Vec<Rendered> = if config.parallel {
        records
            .into_par_iter()
            .map(|record| render_record(set, record, config))
            .collect()
    } else {
        records
            .into_iter()
            .map(|record| render_record(set, record, config))
            .collect()
    };

    let mut report = RunReport::default();
    for Rendered {
        record,
        file_name,
        text,
    } in rendered
    {
        let outcome = match text {
            Ok(text) => {
                let path = config.out_dir.join(&file_name);

                match write_if_changed(&path, &text) {
                    Ok(WriteStatus::Written) => {
                        info!(target: "cfgblob", record = %record, path = %path.display(), "written");
                        RecordOutcome::Written(path)
                    }
                    Ok(WriteStatus::Unchanged) => {
                        info!(target: "cfgblob", record = %record, path = %path.display(), "unchanged");
                        RecordOutcome::Unchanged(path)
                    }
                    Err(err) => {
                        error!(target: "cfgblob", record = %record, error = %err, "write failed");
                        RecordOutcome::Failed(err.to_string())
                    }
                }
            }
            Err(message) => {
                error!(target: "cfgblob", record = %record, error = %message, "generation failed");
                RecordOutcome::Failed(message)
            }
        };
        report.outcomes.insert(record, outcome);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn descriptors() -> DescriptorSet {
        DescriptorSet::new([
            RecordDescriptor::new("Item")
                .in_namespace("crate::items")
                .with_field(
                    FieldDescriptor::new("key", TypeDescriptor::string())
                        .with_role(FieldRole::Identity),
                )
                .with_field(FieldDescriptor::new(
                    "weight",
                    TypeDescriptor::primitive(Primitive::Float32),
                )),
            RecordDescriptor::new("Monster")
                .in_namespace("crate::items")
                .with_field(FieldDescriptor::new(
                    "drops",
                    TypeDescriptor::list(TypeDescriptor::reference("String", "Item")),
                )),
        ])
        .unwrap()
    }

    fn config(dir: &std::path::Path, parallel: bool) -> BuildConfig {
        BuildConfig {
            out_dir: dir.join("generated"),
            runtime_crate: Some("::cfgblob_runtime".to_string()),
            parallel,
            ..BuildConfig::default()
        }
    }

    #[test]
    fn second_run_reports_everything_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), true);
        let set = descriptors();

        let first = run_set(&config, &set);
        assert!(first.is_success(), "{:?}", first.outcomes);
        let item = config.out_dir.join("crate_items_item.rs");
        assert_eq!(
            first.outcome("crate::items::Item"),
            Some(&RecordOutcome::Written(item.clone()))
        );
        assert!(fs::read_to_string(&item).unwrap().starts_with("// @generated"));

        let second = run_set(&config, &set);
        assert!(
            second
                .outcomes
                .values()
                .all(|outcome| matches!(outcome, RecordOutcome::Unchanged(_))),
            "{:?}",
            second.outcomes
        );
    }

    #[test]
    fn parallel_and_sequential_runs_emit_the_same_bytes() {
        let par = tempfile::tempdir().unwrap();
        let seq = tempfile::tempdir().unwrap();
        let set = descriptors();

        run_set(&config(par.path(), true), &set);
        run_set(&config(seq.path(), false), &set);

        for file in ["crate_items_item.rs", "crate_items_monster.rs"] {
            assert_eq!(
                fs::read(par.path().join("generated").join(file)).unwrap(),
                fs::read(seq.path().join("generated").join(file)).unwrap(),
                "{file}"
            );
        }
    }

    #[test]
    fn failed_record_leaves_others_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), true);
        let mut set = descriptors();
        set.insert(
            RecordDescriptor::new("Broken")
                .in_namespace("crate::items")
                .with_field(FieldDescriptor::new("bare", TypeDescriptor::named("Vec"))),
        )
        .unwrap();

        let report = run_set(&config, &set);

        assert!(!report.is_success());
        let failures: Vec<_> = report.failures().map(|(record, _)| record).collect();
        assert_eq!(failures, ["crate::items::Broken"]);
        assert!(matches!(
            report.outcome("crate::items::Monster"),
            Some(RecordOutcome::Written(_))
        ));
        assert!(!config.out_dir.join("crate_items_broken.rs").exists());
    }

    #[test]
    fn provider_errors_abort_the_run() {
        struct Missing;

        impl DescriptorProvider for Missing {
            fn load(&self) -> Result<DescriptorSet, BuildError> {
                Err(DescriptorError::DuplicateRecord("crate::A".to_string()).into())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let err = run(&config(dir.path(), false), &Missing).unwrap_err();

        assert!(matches!(err, BuildError::Descriptor(_)));
    }

    #[test]
    fn runs_from_an_in_memory_set() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(&config(dir.path(), false), &descriptors()).unwrap();

        assert_eq!(report.outcomes.len(), 2);
    }
}
