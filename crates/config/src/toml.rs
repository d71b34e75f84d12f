//! The `toml` module provides TOML deserialization and parsing for geomatch's calibration files.

// Membership functions and decision settings need their own serialization mappings, so TOML deserialization is
// not done directly in the [`geomatch_config`](crate) module's structs.

use {
    crate::ConfigFileError,
    geomatch_decision::{CombinationRule, Criterion},
    geomatch_evidence::{Curve, MembershipBank, MembershipFunction, OutcomeBanks},
    itertools::Itertools,
    serde::{Deserialize, Serialize},
    std::{
        collections::HashSet,
        fs,
        path::{Path, PathBuf},
        str::FromStr,
    },
    tracing::debug,
    validator::Validate,
};

/// The TOML serialization for a Config structure.
#[derive(Serialize, Deserialize, Default)]
struct Config {
    #[serde(default)]
    decision: Decision,
    #[serde(default)]
    runtime: Runtime,
    #[serde(default, rename(serialize = "include", deserialize = "include"))]
    includes: Vec<Include>,
    #[serde(default, rename(serialize = "source", deserialize = "source"))]
    sources: Vec<Source>,
}

/// The TOML serialization for a Decision config structure.
#[derive(Serialize, Deserialize)]
struct Decision {
    #[serde(default = "default_threshold")]
    threshold: f64,
    #[serde(default = "default_max_conflict")]
    max_conflict: f64,
    #[serde(default = "default_tie_margin")]
    tie_margin: f64,
    #[serde(default = "default_criterion")]
    criterion: String,
    #[serde(default = "default_rule")]
    rule: String,
}

/// The default minimum score for a non-ambiguous verdict.
///
/// See [`DEFAULT_THRESHOLD`](geomatch_decision::DEFAULT_THRESHOLD).
fn default_threshold() -> f64 {
    geomatch_decision::DEFAULT_THRESHOLD
}

/// The default maximum conflict.
///
/// See [`DEFAULT_MAX_CONFLICT`](geomatch_decision::DEFAULT_MAX_CONFLICT).
fn default_max_conflict() -> f64 {
    geomatch_decision::DEFAULT_MAX_CONFLICT
}

/// The default margin between the winner and the runner-up.
fn default_tie_margin() -> f64 {
    geomatch_decision::DEFAULT_TIE_MARGIN
}

fn default_criterion() -> String {
    Criterion::default().to_string()
}

fn default_rule() -> String {
    CombinationRule::default().to_string()
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_conflict: default_max_conflict(),
            tie_margin: default_tie_margin(),
            criterion: default_criterion(),
            rule: default_rule(),
        }
    }
}

impl TryFrom<&Decision> for crate::Decision {
    type Error = ConfigFileError;

    fn try_from(decision: &Decision) -> Result<Self, Self::Error> {
        Ok(Self {
            threshold: decision.threshold,
            max_conflict: decision.max_conflict,
            tie_margin: decision.tie_margin,
            criterion: Criterion::from_str(&decision.criterion).map_err(|_| {
                ConfigFileError::InvalidDecisionConfig(format!(
                    "unknown criterion '{}'",
                    decision.criterion
                ))
            })?,
            rule: CombinationRule::from_str(&decision.rule).map_err(|_| {
                ConfigFileError::InvalidDecisionConfig(format!(
                    "unknown combination rule '{}'",
                    decision.rule
                ))
            })?,
        })
    }
}

/// The TOML serialization for a Runtime config structure.
#[derive(Serialize, Deserialize)]
struct Runtime {
    #[serde(default = "default_max_concurrent_features")]
    max_concurrent_features: usize,
    #[serde(default)]
    feature_timeout_ms: Option<u64>,
}

/// The default number of features evaluated at the same time.
///
/// See [`default_max_concurrent_features`](crate::default_max_concurrent_features).
fn default_max_concurrent_features() -> usize {
    crate::default_max_concurrent_features()
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            max_concurrent_features: default_max_concurrent_features(),
            feature_timeout_ms: None,
        }
    }
}

impl From<&Runtime> for crate::Runtime {
    fn from(runtime: &Runtime) -> Self {
        Self {
            max_concurrent_features: runtime.max_concurrent_features,
            feature_timeout_ms: runtime.feature_timeout_ms,
        }
    }
}

/// The TOML serialization for an Include structure.
#[derive(Serialize, Deserialize)]
struct Include {
    path: String,
}

/// The TOML serialization for a Source structure.
#[derive(Serialize, Deserialize, Clone)]
struct Source {
    #[serde(rename(serialize = "ref", deserialize = "ref"))]
    reference: String,
    criterion: SourceKind,
    #[serde(default = "default_source_weight")]
    weight: f64,
    #[serde(default)]
    matched: Vec<Function>,
    #[serde(default)]
    not_matched: Vec<Function>,
    #[serde(default)]
    undecided: Vec<Function>,
}

/// The default weight for a source.
///
/// See [`DEFAULT_SOURCE_WEIGHT`](crate::DEFAULT_SOURCE_WEIGHT).
fn default_source_weight() -> f64 {
    crate::DEFAULT_SOURCE_WEIGHT
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum SourceKind {
    Distance,
    Orientation,
}

impl From<SourceKind> for crate::SourceKind {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Distance => Self::Distance,
            SourceKind::Orientation => Self::Orientation,
        }
    }
}

/// Converts a list of functions into a bank, `None` if the list is empty.
fn bank(functions: &[Function]) -> Result<Option<MembershipBank>, ConfigFileError> {
    if functions.is_empty() {
        return Ok(None);
    }
    let functions = functions
        .iter()
        .map(MembershipFunction::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(MembershipBank::new(functions)))
}

impl TryFrom<&Source> for crate::Source {
    type Error = ConfigFileError;

    fn try_from(source: &Source) -> Result<Self, Self::Error> {
        let banks = OutcomeBanks {
            matched: bank(&source.matched)?,
            not_matched: bank(&source.not_matched)?,
            undecided: bank(&source.undecided)?,
        };
        if banks == OutcomeBanks::default() {
            return Err(ConfigFileError::InvalidSourceConfig(format!(
                "source '{}' has no membership functions",
                source.reference
            )));
        }
        Ok(Self {
            reference: source.reference.clone(),
            kind: source.criterion.into(),
            weight: source.weight,
            banks,
        })
    }
}

/// The TOML serialization for a membership function.
///
/// An omitted bound leaves the interval open-ended on that side.
#[derive(Serialize, Deserialize, Clone)]
struct Function {
    #[serde(default = "default_lower")]
    lower: f64,
    #[serde(default = "default_upper")]
    upper: f64,
    shape: Shape,
}

fn default_lower() -> f64 {
    f64::NEG_INFINITY
}

fn default_upper() -> f64 {
    f64::INFINITY
}

/// The TOML serialization for a membership function's curve.
#[derive(Serialize, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Shape {
    Constant {
        value: f64,
    },
    Linear {
        slope: f64,
        intercept: f64,
    },
    Polynomial {
        coefficients: Vec<f64>,
    },
    Gaussian {
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        mean: f64,
        std_dev: f64,
    },
}

fn default_amplitude() -> f64 {
    1.0
}

impl From<&Shape> for Curve {
    fn from(shape: &Shape) -> Self {
        match shape {
            Shape::Constant { value } => Curve::Constant { value: *value },
            Shape::Linear { slope, intercept } => Curve::Linear {
                slope: *slope,
                intercept: *intercept,
            },
            Shape::Polynomial { coefficients } => Curve::Polynomial {
                coefficients: coefficients.clone(),
            },
            Shape::Gaussian {
                amplitude,
                mean,
                std_dev,
            } => Curve::Gaussian {
                amplitude: *amplitude,
                mean: *mean,
                std_dev: *std_dev,
            },
        }
    }
}

impl TryFrom<&Function> for MembershipFunction {
    type Error = ConfigFileError;

    fn try_from(function: &Function) -> Result<Self, Self::Error> {
        Ok(MembershipFunction::new(
            function.lower,
            function.upper,
            (&function.shape).into(),
        )?)
    }
}

/// Loads a TOML config file into a [`Config`](crate::Config) structure.
///
/// Sources from `[[include]]` files are appended after the including file's own sources. Decision and runtime
/// settings are only read from the root file. The resulting configuration is validated before it is returned.
pub fn load_config<'a, P>(path: &'a P) -> Result<crate::Config, ConfigFileError>
where
    P: 'a + ?Sized + AsRef<Path>,
{
    fn load_config_recursive(
        path: &Path,
        ancestors: &mut HashSet<PathBuf>,
    ) -> Result<Config, ConfigFileError> {
        if !path.exists() {
            return Err(ConfigFileError::NotFound(path.to_path_buf()));
        }
        let canonical = fs::canonicalize(path)?;
        if !ancestors.insert(canonical.clone()) {
            return Err(ConfigFileError::CircularInclude(
                path.display().to_string(),
            ));
        }

        let toml_data = fs::read_to_string(path)?;
        let mut root: Config = toml::from_str(&toml_data)?;
        let base = canonical
            .parent()
            .ok_or_else(|| ConfigFileError::MissingParent(path.display().to_string()))?;

        for include in &root.includes {
            let include_path = base.join(&include.path);
            debug!(
                message = "loading include",
                path = %include_path.display(),
            );
            let include_root = load_config_recursive(&include_path, ancestors)?;
            root.sources.extend(include_root.sources);
        }

        // Strip includes once processed
        root.includes = vec![];
        ancestors.remove(&canonical);

        Ok(root)
    }

    // Load the raw serialization format and resolve includes
    let root = load_config_recursive(path.as_ref(), &mut HashSet::new())?;
    if let Some(reference) = root
        .sources
        .iter()
        .map(|source| source.reference.as_str())
        .duplicates()
        .next()
    {
        return Err(ConfigFileError::Duplicate(reference.to_string()));
    }

    // Transfer to the public config type
    let config = crate::Config {
        decision: (&root.decision).try_into()?,
        runtime: (&root.runtime).into(),
        sources: root
            .sources
            .iter()
            .map(crate::Source::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    };
    config.decision.validate()?;
    config.runtime.validate()?;
    for source in &config.sources {
        source.validate()?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() -> Result<(), Box<dyn std::error::Error>> {
        let root: Config = toml::from_str(
            r#"
        [decision]
        threshold = 0.6
        rule = "murphy"

        [[include]]
        path = "sources.toml"

        [[source]]
        ref = "distance"
        criterion = "distance"

        [[source.matched]]
        upper = 10.0
        shape = { kind = "linear", slope = -0.05, intercept = 0.8 }

        [[source.not_matched]]
        lower = 10.0
        shape = { kind = "constant", value = 0.6 }
    "#,
        )?;

        assert_eq!(root.decision.threshold, 0.6); // non-default
        assert_eq!(
            root.decision.max_conflict,
            geomatch_decision::DEFAULT_MAX_CONFLICT
        );
        assert_eq!(root.decision.criterion, "belief");
        assert_eq!(root.decision.rule, "murphy");
        assert_eq!(root.runtime.feature_timeout_ms, None);

        assert_eq!(root.includes.len(), 1);
        assert_eq!(root.includes[0].path, "sources.toml");

        assert_eq!(root.sources.len(), 1);
        let source = &root.sources[0];
        assert_eq!(source.reference, "distance");
        assert_eq!(source.weight, crate::DEFAULT_SOURCE_WEIGHT);
        assert_eq!(source.matched.len(), 1);
        assert_eq!(source.matched[0].lower, f64::NEG_INFINITY);
        assert_eq!(source.matched[0].upper, 10.0);
        assert_eq!(source.not_matched[0].upper, f64::INFINITY);
        assert!(source.undecided.is_empty());

        Ok(())
    }

    #[test]
    fn test_load_config() -> Result<(), Box<dyn std::error::Error>> {
        let root: crate::Config = load_config("tests/main.toml")?;

        assert_eq!(root.decision.threshold, 0.5);
        assert_eq!(root.decision.max_conflict, 0.3); // non-default
        assert_eq!(root.decision.criterion, Criterion::Pignistic);
        assert_eq!(root.decision.rule, CombinationRule::Dempster);
        assert_eq!(root.runtime.max_concurrent_features, 4);
        assert_eq!(root.runtime.feature_timeout_ms, Some(250));

        assert_eq!(root.sources.len(), 2);
        let distance = root.source("distance").ok_or("missing distance source")?;
        assert_eq!(distance.kind, crate::SourceKind::Distance);
        assert_eq!(distance.function_count(), 4);
        let orientation = root
            .source("orientation")
            .ok_or("missing orientation source")?;
        assert_eq!(orientation.kind, crate::SourceKind::Orientation);
        assert_eq!(orientation.weight, 0.5);
        assert!(orientation.banks.undecided.is_none());
        assert_eq!(root.sources[1].reference, "orientation");

        assert_eq!(
            distance.banks.evaluate(geomatch_evidence::Outcome::Matched, 20.0),
            0.4
        );

        root.matcher()?;
        Ok(())
    }

    #[test]
    fn test_circular_include() {
        assert!(matches!(
            load_config("tests/circular_a.toml"),
            Err(ConfigFileError::CircularInclude(_))
        ));
    }

    #[test]
    fn test_duplicate_source() {
        assert!(matches!(
            load_config("tests/duplicate.toml"),
            Err(ConfigFileError::Duplicate(reference)) if reference == "distance"
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("tests/does_not_exist.toml"),
            Err(ConfigFileError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_settings() -> Result<(), Box<dyn std::error::Error>> {
        let decision = Decision {
            criterion: "median".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            crate::Decision::try_from(&decision),
            Err(ConfigFileError::InvalidDecisionConfig(_))
        ));

        let source: Source = toml::from_str(
            r#"
        ref = "distance"
        criterion = "distance"

        [[matched]]
        lower = 5.0
        upper = 5.0
        shape = { kind = "constant", value = 0.5 }
    "#,
        )?;
        assert!(matches!(
            crate::Source::try_from(&source),
            Err(ConfigFileError::InvalidFunction(_))
        ));

        let empty = Source {
            matched: vec![],
            ..source
        };
        assert!(matches!(
            crate::Source::try_from(&empty),
            Err(ConfigFileError::InvalidSourceConfig(_))
        ));

        let heavy = crate::Source {
            weight: 1.5,
            reference: "Bad-Reference".to_string(),
            ..crate::Source::try_from(&Source {
                matched: vec![Function {
                    lower: 0.0,
                    upper: 1.0,
                    shape: Shape::Constant { value: 0.5 },
                }],
                ..empty
            })?
        };
        let errors = heavy.validate().err().ok_or("expected validation errors")?;
        assert!(errors.field_errors().contains_key("weight"));
        assert!(errors.field_errors().contains_key("reference"));
        Ok(())
    }
}
