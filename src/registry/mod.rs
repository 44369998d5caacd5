//! Task and condition registry.
//!
//! The registry enumerates the evaluation tasks the harness recognizes, the
//! input-representation conditions each task is run under, and the prompt
//! template used by the relabel stage. It is built once (either from the
//! built-in tables or from a YAML file) and handed to the orchestrator, so
//! tests can inject their own tasks without touching global state.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::prompts::templates;

/// Placeholder substituted with the molecule representation in task templates.
pub const MOLECULE_PLACEHOLDER: &str = "{molecule}";

/// Placeholder substituted with the original code in the relabel template.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Which representation of the molecule is shown to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Raw SMILES notation.
    #[serde(rename = "smiles")]
    Smiles,
    /// Structured code that constructs the molecule.
    #[serde(rename = "code")]
    Code,
    /// Code passed through an identifier-renaming stage first.
    #[serde(rename = "code+relabel")]
    CodeRelabel,
}

impl Condition {
    /// All conditions, in run order.
    pub const ALL: [Condition; 3] = [Condition::Smiles, Condition::Code, Condition::CodeRelabel];

    /// Canonical name as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Smiles => "smiles",
            Condition::Code => "code",
            Condition::CodeRelabel => "code+relabel",
        }
    }

    /// Filesystem-safe form used in artifact names (`+` becomes `-`).
    pub fn file_stem(&self) -> String {
        self.as_str().replace('+', "-")
    }

    /// Whether rows under this condition go through the relabel stage.
    pub fn needs_relabel(&self) -> bool {
        matches!(self, Condition::CodeRelabel)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| RegistryError::UnknownCondition(s.to_string()))
    }
}

/// A question type posed about every molecule in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task identifier; also names the dataset file and the result artifacts.
    pub id: String,
    /// Prompt template containing [`MOLECULE_PLACEHOLDER`].
    pub template: String,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            template: template.into(),
        }
    }
}

/// On-disk registry format.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    tasks: Vec<TaskSpec>,
    #[serde(default)]
    relabel_template: Option<String>,
    #[serde(default)]
    conditions: Option<Vec<Condition>>,
}

/// Validated set of tasks, conditions and the relabel template.
#[derive(Debug, Clone)]
pub struct Registry {
    tasks: Vec<TaskSpec>,
    conditions: Vec<Condition>,
    relabel_template: String,
}

impl Registry {
    /// Create a registry, validating ids and templates.
    pub fn new(
        tasks: Vec<TaskSpec>,
        relabel_template: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let relabel_template = relabel_template.into();

        if tasks.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for task in &tasks {
            if !is_valid_task_id(&task.id) {
                return Err(RegistryError::InvalidTaskId(task.id.clone()));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(RegistryError::DuplicateTask(task.id.clone()));
            }
            if !task.template.contains(MOLECULE_PLACEHOLDER) {
                return Err(RegistryError::MissingPlaceholder {
                    name: task.id.clone(),
                    placeholder: MOLECULE_PLACEHOLDER.to_string(),
                });
            }
        }

        if !relabel_template.contains(CODE_PLACEHOLDER) {
            return Err(RegistryError::MissingPlaceholder {
                name: "relabel".to_string(),
                placeholder: CODE_PLACEHOLDER.to_string(),
            });
        }

        Ok(Self {
            tasks,
            conditions: Condition::ALL.to_vec(),
            relabel_template,
        })
    }

    /// The four molecule tasks of the study with their fixed templates.
    pub fn builtin() -> Self {
        Self {
            tasks: vec![
                TaskSpec::new("bbbp", templates::BBBP),
                TaskSpec::new("func-group", templates::FUNC_GROUP),
                TaskSpec::new("aromatic-rings", templates::AROMATIC_RINGS),
                TaskSpec::new("hbond", templates::HBOND),
            ],
            conditions: Condition::ALL.to_vec(),
            relabel_template: templates::RELABEL.to_string(),
        }
    }

    /// Parse a registry from YAML.
    ///
    /// ```yaml
    /// tasks:
    ///   - id: aromatic-rings
    ///     template: "How many aromatic rings?\n\n{molecule}\n\nAnswer:"
    /// relabel_template: "Rename the variables.\n\n{code}\n\nAnswer:"  # optional
    /// conditions: [smiles, code]                                    # optional
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        let relabel = file
            .relabel_template
            .unwrap_or_else(|| templates::RELABEL.to_string());
        let registry = Self::new(file.tasks, relabel)?;

        match file.conditions {
            Some(conditions) => registry.with_conditions(conditions),
            None => Ok(registry),
        }
    }

    /// Load a registry from a YAML file.
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml_str(&content)
    }

    /// Restrict the recognized conditions. Order is preserved and duplicates dropped.
    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Result<Self, RegistryError> {
        let mut unique = Vec::with_capacity(conditions.len());
        for condition in conditions {
            if !unique.contains(&condition) {
                unique.push(condition);
            }
        }
        if unique.is_empty() {
            return Err(RegistryError::Empty);
        }
        self.conditions = unique;
        Ok(self)
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn relabel_template(&self) -> &str {
        &self.relabel_template
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Result<&TaskSpec, RegistryError> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RegistryError::UnknownTask(id.to_string()))
    }

    /// Resolve a task selection; `None` selects every registered task.
    pub fn select_tasks(&self, ids: Option<&[String]>) -> Result<Vec<&TaskSpec>, RegistryError> {
        match ids {
            None => Ok(self.tasks.iter().collect()),
            Some(ids) => ids.iter().map(|id| self.task(id)).collect(),
        }
    }

    /// Resolve a condition selection; `None` selects every registered condition.
    pub fn select_conditions(
        &self,
        selected: Option<&[Condition]>,
    ) -> Result<Vec<Condition>, RegistryError> {
        match selected {
            None => Ok(self.conditions.clone()),
            Some(selected) => selected
                .iter()
                .map(|c| {
                    if self.conditions.contains(c) {
                        Ok(*c)
                    } else {
                        Err(RegistryError::UnknownCondition(c.to_string()))
                    }
                })
                .collect(),
        }
    }
}

fn is_valid_task_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_round_trip_names() {
        for condition in Condition::ALL {
            let parsed: Condition = condition.as_str().parse().expect("known condition");
            assert_eq!(parsed, condition);
        }
        assert_eq!(Condition::CodeRelabel.file_stem(), "code-relabel");
        assert_eq!(Condition::Smiles.file_stem(), "smiles");
    }

    #[test]
    fn test_condition_rejects_unknown() {
        let err = "code-relabel".parse::<Condition>().unwrap_err();
        assert!(matches!(err, RegistryError::UnknownCondition(_)));
    }

    #[test]
    fn test_condition_serde_names() {
        let json = serde_json::to_string(&Condition::CodeRelabel).unwrap();
        assert_eq!(json, "\"code+relabel\"");
    }

    #[test]
    fn test_only_code_relabel_needs_relabel() {
        assert!(!Condition::Smiles.needs_relabel());
        assert!(!Condition::Code.needs_relabel());
        assert!(Condition::CodeRelabel.needs_relabel());
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::builtin();
        let ids: Vec<&str> = registry.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["bbbp", "func-group", "aromatic-rings", "hbond"]);
        assert_eq!(registry.conditions(), &Condition::ALL);
        for task in registry.tasks() {
            assert!(task.template.contains(MOLECULE_PLACEHOLDER), "{}", task.id);
        }
        assert!(registry.relabel_template().contains(CODE_PLACEHOLDER));
    }

    #[test]
    fn test_new_rejects_missing_placeholder() {
        let err = Registry::new(vec![TaskSpec::new("t", "no slot")], "{code}").unwrap_err();
        assert!(matches!(err, RegistryError::MissingPlaceholder { .. }));

        let err = Registry::new(vec![TaskSpec::new("t", "{molecule}")], "nothing").unwrap_err();
        assert!(matches!(err, RegistryError::MissingPlaceholder { name, .. } if name == "relabel"));
    }

    #[test]
    fn test_new_rejects_duplicates_and_bad_ids() {
        let err = Registry::new(
            vec![TaskSpec::new("a", "{molecule}"), TaskSpec::new("a", "{molecule}")],
            "{code}",
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTask(_)));

        let err = Registry::new(vec![TaskSpec::new("../x", "{molecule}")], "{code}").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTaskId(_)));

        let err = Registry::new(vec![], "{code}").unwrap_err();
        assert!(matches!(err, RegistryError::Empty));
    }

    #[test]
    fn test_select_tasks() {
        let registry = Registry::builtin();
        assert_eq!(registry.select_tasks(None).unwrap().len(), 4);

        let picked = registry
            .select_tasks(Some(&["hbond".to_string()]))
            .unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "hbond");

        let err = registry
            .select_tasks(Some(&["ring-count".to_string()]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTask(_)));
    }

    #[test]
    fn test_select_conditions_respects_registry() {
        let registry = Registry::builtin()
            .with_conditions(vec![Condition::Code, Condition::Code])
            .unwrap();
        assert_eq!(registry.conditions(), &[Condition::Code]);
        assert!(registry
            .select_conditions(Some(&[Condition::Smiles]))
            .is_err());
        assert_eq!(
            registry.select_conditions(None).unwrap(),
            vec![Condition::Code]
        );
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
tasks:
  - id: ring-count
    template: "Count rings in {molecule}"
conditions: [smiles, "code+relabel"]
"#;
        let registry = Registry::from_yaml_str(yaml).unwrap();
        assert_eq!(registry.tasks().len(), 1);
        assert_eq!(registry.task("ring-count").unwrap().template, "Count rings in {molecule}");
        assert_eq!(
            registry.conditions(),
            &[Condition::Smiles, Condition::CodeRelabel]
        );
        assert_eq!(registry.relabel_template(), templates::RELABEL);
    }

    #[test]
    fn test_from_yaml_str_invalid() {
        assert!(matches!(
            Registry::from_yaml_str("tasks: 3").unwrap_err(),
            RegistryError::Yaml(_)
        ));
    }

    #[tokio::test]
    async fn test_from_yaml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tasks.yaml");
        std::fs::write(
            &path,
            "tasks:\n  - id: ring-count\n    template: \"Rings?\\n\\n{molecule}\"\nconditions: [code]\n",
        )
        .unwrap();

        let registry = Registry::from_yaml_file(&path).await.unwrap();
        assert_eq!(registry.tasks().len(), 1);
        assert_eq!(registry.task("ring-count").unwrap().template, "Rings?\n\n{molecule}");
        assert_eq!(registry.conditions(), &[Condition::Code]);

        let missing = Registry::from_yaml_file(dir.path().join("absent.yaml")).await;
        assert!(matches!(missing, Err(RegistryError::Io(_))));
    }
}
