use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Supported classification algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    RandomForest,
    Svm,
    SvmPoly,
    SvmRbf,
    LogReg,
}

impl FromStr for Algorithm {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rf" | "randomforest" => Ok(Algorithm::RandomForest),
            "svm" => Ok(Algorithm::Svm),
            "svmpoly" => Ok(Algorithm::SvmPoly),
            "svmrbf" => Ok(Algorithm::SvmRbf),
            "logreg" => Ok(Algorithm::LogReg),
            _ => Err(PipelineError::UnsupportedName {
                kind: "algorithm",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Algorithm::RandomForest => "RF",
            Algorithm::Svm => "SVM",
            Algorithm::SvmPoly => "SVMpoly",
            Algorithm::SvmRbf => "SVMrbf",
            Algorithm::LogReg => "LogReg",
        };
        write!(f, "{}", name)
    }
}

impl Algorithm {
    /// The SVM families share min-max feature scaling before training.
    pub fn needs_scaling(&self) -> bool {
        matches!(self, Algorithm::Svm | Algorithm::SvmPoly | Algorithm::SvmRbf)
    }

    /// Default hyperparameters for this family.
    pub fn default_params(&self, n_jobs: usize) -> AlgorithmParams {
        match self {
            Algorithm::RandomForest => AlgorithmParams::Forest(ForestParams {
                n_jobs,
                ..ForestParams::default()
            }),
            Algorithm::Svm => AlgorithmParams::Svm(SvmSettings {
                kernel: SvmKernel::Linear,
                ..SvmSettings::default()
            }),
            Algorithm::SvmPoly => AlgorithmParams::Svm(SvmSettings {
                kernel: SvmKernel::Poly,
                ..SvmSettings::default()
            }),
            Algorithm::SvmRbf => AlgorithmParams::Svm(SvmSettings {
                kernel: SvmKernel::Rbf,
                ..SvmSettings::default()
            }),
            Algorithm::LogReg => AlgorithmParams::LogReg(LogRegParams::default()),
        }
    }
}

/// Supported feature-selection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    RandomForest,
    Chi2,
    Lasso,
    Fisher,
}

impl FromStr for SelectionMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "randomforest" | "rf" => Ok(SelectionMethod::RandomForest),
            "chi2" | "c2" => Ok(SelectionMethod::Chi2),
            "l1" | "lasso" => Ok(SelectionMethod::Lasso),
            "fisher" | "fet" | "enrich" => Ok(SelectionMethod::Fisher),
            _ => Err(PipelineError::UnsupportedName {
                kind: "feature-selection method",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SelectionMethod::RandomForest => "RandomForest",
            SelectionMethod::Chi2 => "Chi2",
            SelectionMethod::Lasso => "Lasso",
            SelectionMethod::Fisher => "Fisher",
        };
        write!(f, "{}", name)
    }
}

/// Regression vs classification flag for the L1 selection variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Classification,
    Regression,
}

impl FromStr for TaskKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "c" | "classification" => Ok(TaskKind::Classification),
            "r" | "regression" => Ok(TaskKind::Regression),
            _ => Err(PipelineError::UnsupportedName {
                kind: "task type",
                name: s.to_string(),
            }),
        }
    }
}

/// Per-tree feature subsample policy for the forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    Sqrt,
    Fraction(f64),
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().round() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features)
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MaxFeatures::Sqrt => write!(f, "sqrt"),
            MaxFeatures::Fraction(v) => write!(f, "{}", v),
            MaxFeatures::All => write!(f, "all"),
        }
    }
}

/// Random-forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub max_features: MaxFeatures,
    pub n_jobs: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 500,
            max_depth: Some(10),
            max_features: MaxFeatures::Sqrt,
            n_jobs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SvmKernel {
    Linear,
    Poly,
    Rbf,
}

impl fmt::Display for SvmKernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SvmKernel::Linear => "linear",
            SvmKernel::Poly => "poly",
            SvmKernel::Rbf => "rbf",
        };
        write!(f, "{}", name)
    }
}

/// SVM hyperparameters. `gamma` acts as the Gaussian kernel width for the
/// rbf family and as the additive kernel constant for the polynomial family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmSettings {
    pub c: f64,
    pub kernel: SvmKernel,
    pub degree: u32,
    pub gamma: f64,
}

impl Default for SvmSettings {
    fn default() -> Self {
        SvmSettings {
            c: 1.0,
            kernel: SvmKernel::Linear,
            degree: 2,
            gamma: 1.0,
        }
    }
}

/// Logistic-regression hyperparameters. `c` is the inverse regularization
/// strength; the ridge penalty passed to the solver is `1 / c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRegParams {
    pub c: f64,
    pub fit_intercept: bool,
}

impl Default for LogRegParams {
    fn default() -> Self {
        LogRegParams {
            c: 1.0,
            fit_intercept: true,
        }
    }
}

/// Hyperparameters for one algorithm family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlgorithmParams {
    Forest(ForestParams),
    Svm(SvmSettings),
    LogReg(LogRegParams),
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        AlgorithmParams::Forest(ForestParams::default())
    }
}

impl fmt::Display for AlgorithmParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlgorithmParams::Forest(p) => write!(
                f,
                "n_estimators={}, max_depth={}, max_features={}",
                p.n_estimators,
                p.max_depth.map_or("none".to_string(), |d| d.to_string()),
                p.max_features
            ),
            AlgorithmParams::Svm(p) => write!(
                f,
                "kernel={}, C={}, degree={}, gamma={}",
                p.kernel, p.c, p.degree, p.gamma
            ),
            AlgorithmParams::LogReg(p) => write!(
                f,
                "penalty=l2, C={}, intercept={}",
                p.c, p.fit_intercept
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_from_str_accepts_aliases() {
        assert_eq!("rf".parse::<Algorithm>().unwrap(), Algorithm::RandomForest);
        assert_eq!("SVMrbf".parse::<Algorithm>().unwrap(), Algorithm::SvmRbf);
        assert_eq!("logreg".parse::<Algorithm>().unwrap(), Algorithm::LogReg);
    }

    #[test]
    fn algorithm_from_str_rejects_unknown() {
        assert!("gbdt".parse::<Algorithm>().is_err());
    }

    #[test]
    fn selection_method_aliases() {
        assert_eq!("c2".parse::<SelectionMethod>().unwrap(), SelectionMethod::Chi2);
        assert_eq!("fet".parse::<SelectionMethod>().unwrap(), SelectionMethod::Fisher);
        assert!("pca".parse::<SelectionMethod>().is_err());
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(100), 10);
        assert_eq!(MaxFeatures::Fraction(0.25).resolve(8), 2);
        assert_eq!(MaxFeatures::All.resolve(5), 5);
        // Never zero, never above the feature count
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(3), 1);
        assert_eq!(MaxFeatures::Fraction(2.0).resolve(3), 3);
    }

    #[test]
    fn params_round_trip_json() {
        let params = Algorithm::SvmRbf.default_params(1);
        let json = serde_json::to_string(&params).unwrap();
        let back: AlgorithmParams = serde_json::from_str(&json).unwrap();
        match back {
            AlgorithmParams::Svm(p) => assert_eq!(p.kernel, SvmKernel::Rbf),
            _ => panic!("expected SVM params"),
        }
    }
}
