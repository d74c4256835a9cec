use crate::config::AlgorithmParams;
use crate::models::classifier::Classifier;
use crate::models::forest::RandomForestModel;
use crate::models::logistic::LogisticModel;
use crate::models::svm::SvmModel;

/// Build a boxed classifier from algorithm parameters. The match is
/// exhaustive over the closed parameter enum, so an unrecognized family
/// cannot fall through silently.
pub fn build_model(params: &AlgorithmParams) -> Box<dyn Classifier> {
    match params {
        AlgorithmParams::Forest(p) => Box::new(RandomForestModel::new(p.clone())),
        AlgorithmParams::Svm(p) => Box::new(SvmModel::new(p.clone())),
        AlgorithmParams::LogReg(p) => Box::new(LogisticModel::new(p.clone())),
    }
}
