pub mod classify;
pub mod controller;
pub mod state;

pub use classify::{Classifier, RuleClassifier, StepClassification, StepType};
pub use controller::{StepController, StepEvent};
pub use state::{RecipeStep, StepModeState, StepPhase, StepSnapshot};
