use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

use super::{
    convert::{self, UnitSystem},
    ingredient::{build_structured_ingredients, StructuredIngredient},
};

/// One step of an ingested recipe, in the ingestion collaborator's wire
/// shape (field names stay snake_case to match it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeStepInput {
    pub step: u32,
    pub instruction: String,
    #[serde(default)]
    pub estimated_time_min: Option<f64>,
}

/// Recipe payload produced by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInit {
    #[serde(default)]
    pub title: Option<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<RecipeStepInput>,
}

impl RecipeInit {
    /// Deserialize an untyped ingestion payload, mapping shape problems
    /// (missing/mistyped `ingredients` or `steps`) to a validation error.
    pub fn from_json(value: &serde_json::Value) -> CoreResult<RecipeInit> {
        serde_json::from_value(value.clone())
            .map_err(|err| CoreError::validation(format!("malformed recipe payload: {err}")))
    }
}

/// The active recipe for one caller: base payload, parsed ingredients, and
/// the two independently mutable knobs (scale factor and unit system).
#[derive(Debug, Clone)]
pub struct RecipeSession {
    pub created_at: DateTime<Utc>,
    pub base: Option<RecipeInit>,
    pub structured: Option<Vec<StructuredIngredient>>,
    pub scale: f64,
    pub unit_system: UnitSystem,
}

impl Default for RecipeSession {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            base: None,
            structured: None,
            scale: 1.0,
            unit_system: UnitSystem::Imperial,
        }
    }
}

/// Answer to an ingredient quantity query, already scaled and converted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientAnswer {
    pub ingredient: StructuredIngredient,
    pub text: String,
    pub scale: f64,
    pub unit_system: UnitSystem,
}

/// Recipe sessions keyed by caller-supplied id. Every call takes the id
/// explicitly; there is no ambient "current" session, so concurrent callers
/// cannot trample each other's recipe state.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, RecipeSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.inner
            .lock()
            .unwrap()
            .insert(id.clone(), RecipeSession::default());
        id
    }

    pub fn remove_session(&self, session_id: &str) -> bool {
        self.inner.lock().unwrap().remove(session_id).is_some()
    }

    pub fn snapshot(&self, session_id: &str) -> Option<RecipeSession> {
        self.inner.lock().unwrap().get(session_id).cloned()
    }

    /// Replace the session's recipe wholesale: new base payload, freshly
    /// parsed ingredients, scale back to 1, unit system back to imperial.
    pub fn init_recipe(&self, session_id: &str, init: RecipeInit) -> CoreResult<()> {
        if init.ingredients.iter().all(|line| line.trim().is_empty()) {
            return Err(CoreError::validation("recipe has no ingredients"));
        }
        let structured = build_structured_ingredients(&init.ingredients);

        let mut sessions = self.inner.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::not_found(format!("unknown session {session_id}")))?;
        session.base = Some(init);
        session.structured = Some(structured);
        session.scale = 1.0;
        session.unit_system = UnitSystem::Imperial;
        Ok(())
    }

    pub fn apply_scale(&self, session_id: &str, factor: f64) -> CoreResult<f64> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(CoreError::validation(
                "scale factor must be a positive number",
            ));
        }
        let mut sessions = self.inner.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::not_found(format!("unknown session {session_id}")))?;
        session.scale = factor;
        Ok(session.scale)
    }

    pub fn apply_unit_conversion(
        &self,
        session_id: &str,
        target: UnitSystem,
    ) -> CoreResult<UnitSystem> {
        let mut sessions = self.inner.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::not_found(format!("unknown session {session_id}")))?;
        session.unit_system = target;
        Ok(session.unit_system)
    }

    /// First structured ingredient whose name contains the lowercased query,
    /// with the session's current scale and unit system applied. Read-only:
    /// a failed lookup leaves the session untouched.
    pub fn ingredient_query(&self, session_id: &str, query: &str) -> CoreResult<IngredientAnswer> {
        let sessions = self.inner.lock().unwrap();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| CoreError::not_found(format!("unknown session {session_id}")))?;
        let structured = session
            .structured
            .as_ref()
            .filter(|list| !list.is_empty())
            .ok_or_else(|| CoreError::not_found("no active recipe"))?;

        let needle = query.trim().to_lowercase();
        let found = structured
            .iter()
            .find(|ing| ing.name.contains(&needle))
            .ok_or_else(|| CoreError::not_found(format!("no ingredient matching '{query}'")))?;

        let scaled = convert::scale(found, session.scale);
        let converted = convert::convert(&scaled, session.unit_system);
        let text = convert::format_amount(&converted);
        Ok(IngredientAnswer {
            ingredient: converted,
            text,
            scale: session.scale,
            unit_system: session.unit_system,
        })
    }
}
