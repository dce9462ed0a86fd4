//! Utility activities: an arbitrary roll with no attack or damage.

use serde::{Deserialize, Serialize};

use super::{ActivityContext, ActivityOutput};
use crate::error::DomainError;
use crate::formula::{Formula, SimplifyOptions};
use crate::roll_data::RollContext;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityRoll {
    pub formula: Formula,
    pub name: String,
    pub prompt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityActivity {
    pub roll: UtilityRoll,
}

impl UtilityActivity {
    pub fn prepare_final(
        &self,
        ctx: &ActivityContext<'_>,
        output: &mut ActivityOutput,
    ) -> Result<(), DomainError> {
        if self.roll.formula.is_empty() {
            return Ok(());
        }
        let context = RollContext::new(ctx.scope());
        output.labels.roll = ctx.render(self.roll.formula.as_str(), &context, SimplifyOptions::default())?;
        Ok(())
    }
}
