use std::collections::HashSet;

use serde::Deserialize;

use crate::error::DulogError;
use crate::model::{ContactTable, Dyad, StationKind};
use crate::window::TimeWindow;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A batch job: which logs to load, which dyads to reconcile, where to write.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub ranges: Vec<RangeJob>,
    #[serde(default)]
    pub contacts: Option<ContactJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for written tables. Relative paths resolve against the job's
    /// base directory; unset means the process working directory.
    #[serde(default)]
    pub dir: Option<String>,
    /// Emit the time index as the leading column.
    #[serde(default = "default_index")]
    pub index: bool,
}

fn default_index() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            index: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RangeJob {
    pub file: String,
    pub station: StationKind,
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactJob {
    pub file: String,
    /// Name for the cleaned, deduplicated contact table.
    #[serde(default)]
    pub output: Option<String>,
    /// Name for the reconciled dyad table.
    #[serde(default)]
    pub reconciled_output: Option<String>,
    /// Dyads in Node1/Node2 order.
    #[serde(default)]
    pub dyads: Vec<(String, String)>,
    /// Reconcile every pair found in the log instead of listing them.
    #[serde(default)]
    pub all_dyads: bool,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowConfig {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl WindowConfig {
    pub fn to_window(&self) -> Result<TimeWindow, DulogError> {
        TimeWindow::parse(self.start.as_deref(), self.end.as_deref())
    }
}

impl ContactJob {
    pub fn wants_reconcile(&self) -> bool {
        self.all_dyads || !self.dyads.is_empty()
    }

    /// The dyads to reconcile against a loaded table.
    pub fn resolve_dyads(&self, table: &ContactTable) -> Vec<Dyad> {
        if self.all_dyads {
            table.dyads()
        } else {
            self.dyads.iter().map(|(a, b)| Dyad::new(a.as_str(), b.as_str())).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, DulogError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| DulogError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DulogError> {
        if self.ranges.is_empty() && self.contacts.is_none() {
            return Err(DulogError::ConfigValidation(
                "job has no [[ranges]] and no [contacts] section".into(),
            ));
        }

        let mut names = HashSet::new();
        let mut claim = |name: &str| -> Result<(), DulogError> {
            if name.trim().is_empty() {
                return Err(DulogError::ConfigValidation("output name is empty".into()));
            }
            if name.contains(['/', '\\']) {
                return Err(DulogError::ConfigValidation(format!(
                    "output name '{name}' must not contain a path separator"
                )));
            }
            if !names.insert(name.to_string()) {
                return Err(DulogError::ConfigValidation(format!(
                    "output name '{name}' is used more than once"
                )));
            }
            Ok(())
        };

        for job in &self.ranges {
            claim(&job.output)?;
        }

        if let Some(ref contacts) = self.contacts {
            if let Some(ref name) = contacts.output {
                claim(name)?;
            }

            if contacts.all_dyads && !contacts.dyads.is_empty() {
                return Err(DulogError::ConfigValidation(
                    "set either `dyads` or `all_dyads`, not both".into(),
                ));
            }

            match (&contacts.reconciled_output, contacts.wants_reconcile()) {
                (Some(name), true) => claim(name)?,
                (Some(name), false) => {
                    return Err(DulogError::ConfigValidation(format!(
                        "reconciled_output '{name}' given but no dyads selected"
                    )));
                }
                (None, true) => {
                    return Err(DulogError::ConfigValidation(
                        "dyads selected but reconciled_output is missing".into(),
                    ));
                }
                (None, false) => {}
            }

            for (a, b) in &contacts.dyads {
                if a.is_empty() || b.is_empty() {
                    return Err(DulogError::ConfigValidation(format!(
                        "dyad ['{a}', '{b}'] has an empty node id"
                    )));
                }
                if a == b {
                    return Err(DulogError::ConfigValidation(format!(
                        "dyad ['{a}', '{b}'] pairs a node with itself"
                    )));
                }
            }

            let window = contacts.window.to_window()?;
            if window.is_inverted() {
                return Err(DulogError::ConfigValidation(format!(
                    "window start '{}' is after end '{}'",
                    contacts.window.start.as_deref().unwrap_or_default(),
                    contacts.window.end.as_deref().unwrap_or_default()
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_JOB: &str = r#"
name = "Spring 2019"

[output]
dir = "out"
index = false

[[ranges]]
file = "RANGE_DS.CSV"
station = "download"
output = "range_ds"

[[ranges]]
file = "RANGE_BS.CSV"
station = "base"
output = "range_bs"

[contacts]
file = "MN_DATA.CSV"
output = "contacts"
reconciled_output = "dyads"
dyads = [["12", "15"], ["15", "7"]]

[contacts.window]
start = "2019-05-01"
end = "2019-05-31 12:00:00"
"#;

    #[test]
    fn parse_full_job() {
        let config = PipelineConfig::from_toml(FULL_JOB).unwrap();
        assert_eq!(config.name, "Spring 2019");
        assert_eq!(config.output.dir.as_deref(), Some("out"));
        assert!(!config.output.index);
        assert_eq!(config.ranges.len(), 2);
        assert_eq!(config.ranges[0].station, StationKind::Download);
        assert_eq!(config.ranges[1].station, StationKind::Base);

        let contacts = config.contacts.unwrap();
        assert_eq!(contacts.dyads[1], ("15".to_string(), "7".to_string()));
        assert!(contacts.wants_reconcile());
        let window = contacts.window.to_window().unwrap();
        assert!(window.start.is_some() && window.end.is_some());
    }

    #[test]
    fn output_defaults_to_index() {
        let config = PipelineConfig::from_toml(
            r#"
name = "Ranges only"
[[ranges]]
file = "r.csv"
station = "base"
output = "r"
"#,
        )
        .unwrap();
        assert!(config.output.index);
        assert!(config.output.dir.is_none());
        assert!(config.contacts.is_none());
    }

    #[test]
    fn resolve_explicit_dyads_keeps_order() {
        let config = PipelineConfig::from_toml(FULL_JOB).unwrap();
        let contacts = config.contacts.unwrap();
        let dyads = contacts.resolve_dyads(&ContactTable::default());
        assert_eq!(dyads[0].label(), "12-15");
        assert_eq!(dyads[1].label(), "15-7");
    }

    #[test]
    fn reject_empty_job() {
        let err = PipelineConfig::from_toml("name = \"nothing\"\n").unwrap_err();
        assert!(err.to_string().contains("no [[ranges]]"));
    }

    #[test]
    fn reject_unknown_station() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[[ranges]]
file = "r.csv"
station = "downlaod"
output = "r"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DulogError::ConfigParse(_)));
    }

    #[test]
    fn reject_duplicate_outputs() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[[ranges]]
file = "a.csv"
station = "base"
output = "same"

[contacts]
file = "c.csv"
output = "same"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn reject_self_dyad() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[contacts]
file = "c.csv"
reconciled_output = "d"
dyads = [["12", "12"]]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("with itself"));
    }

    #[test]
    fn reject_dyads_and_all_dyads() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[contacts]
file = "c.csv"
reconciled_output = "d"
all_dyads = true
dyads = [["1", "2"]]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn reject_reconcile_without_output() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[contacts]
file = "c.csv"
all_dyads = true
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("reconciled_output is missing"));
    }

    #[test]
    fn reject_inverted_window() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[contacts]
file = "c.csv"
reconciled_output = "d"
all_dyads = true
[contacts.window]
start = "2019-06-01"
end = "2019-05-01"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("after end"));
    }

    #[test]
    fn reject_path_in_output_name() {
        let err = PipelineConfig::from_toml(
            r#"
name = "Bad"
[[ranges]]
file = "a.csv"
station = "base"
output = "../escape"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("path separator"));
    }
}
