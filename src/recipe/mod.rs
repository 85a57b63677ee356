pub mod convert;
pub mod ingredient;
pub mod session;

pub use convert::{Unit, UnitSystem};
pub use ingredient::{build_structured_ingredients, parse_line, StructuredIngredient};
pub use session::{IngredientAnswer, RecipeInit, RecipeStepInput, SessionRegistry};
