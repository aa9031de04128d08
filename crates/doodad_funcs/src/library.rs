//! Built-in function types
//!
//! Each variant's serde tag is the function type tag used by templates.

use chrono::Duration;
use doodad_core::{FuncError, PhaseTarget};
use doodad_engine::{DoodadFunc, FuncContext, PhaseFunc, TriggerFunc, SKILL_HIT_FUNC_TYPE};
use serde::{Deserialize, Serialize};

/// Functions fired by an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerDef {
    /// Plain interaction; the engine follows `next_phase`
    DoodadFuncUse,
    /// Reacts to the doodad being struck by an effect
    DoodadFuncSkillHit,
    /// Transition, then interact again with the new phase
    DoodadFuncToPhaseAndUse,
    /// Write the opaque data value
    DoodadFuncSetData { value: i32 },
    /// Refuse interactions without an actor
    DoodadFuncRequireActor,
}

impl TriggerDef {
    /// Type tag of the function
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::DoodadFuncUse => "DoodadFuncUse",
            Self::DoodadFuncSkillHit => SKILL_HIT_FUNC_TYPE,
            Self::DoodadFuncToPhaseAndUse => "DoodadFuncToPhaseAndUse",
            Self::DoodadFuncSetData { .. } => "DoodadFuncSetData",
            Self::DoodadFuncRequireActor => "DoodadFuncRequireActor",
        }
    }
}

impl DoodadFunc for TriggerDef {
    fn execute(&self, ctx: &mut FuncContext<'_>) -> Result<(), FuncError> {
        match self {
            Self::DoodadFuncUse | Self::DoodadFuncSkillHit => {}
            Self::DoodadFuncToPhaseAndUse => ctx.doodad.request_use_on_arrival(),
            Self::DoodadFuncSetData { value } => ctx.doodad.set_data(*value)?,
            Self::DoodadFuncRequireActor => {
                if ctx.actor.is_none() {
                    return Err(FuncError::failed(format!(
                        "doodad {} requires an actor",
                        ctx.doodad.object_id()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A trigger function as authored: the function plus its trigger metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEntry {
    /// Skill that fires the function, 0 for any
    #[serde(default)]
    pub skill_id: u32,
    /// Raw destination: 0 none, -1 delete
    #[serde(default)]
    pub next_phase: i32,
    #[serde(flatten)]
    pub func: TriggerDef,
}

impl TriggerEntry {
    /// Build the engine-side function
    pub fn build(self) -> TriggerFunc {
        let (skill_id, next_phase) = (self.skill_id, self.next_phase);
        TriggerFunc::new(self.func.type_tag(), self.func)
            .with_skill(skill_id)
            .with_raw_next_phase(next_phase)
    }
}

/// Functions fired when their phase is entered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PhaseDef {
    /// Weighted branch: adds `ratio` to the cumulative ratio and moves on to
    /// `next_phase` once the roll falls inside it
    DoodadFuncRatioChange { ratio: i32, next_phase: i32 },
    /// Unconditional transition
    DoodadFuncNextPhase { next_phase: i32 },
    /// Delete the doodad
    DoodadFuncFinal,
    /// Start a growth timer
    DoodadFuncGrowth { duration_ms: u32 },
    /// Toggle the quest marker
    DoodadFuncQuestGlow { on: bool },
    /// Write the opaque data value
    DoodadFuncSetData { value: i32 },
}

impl PhaseDef {
    /// Type tag of the function
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::DoodadFuncRatioChange { .. } => "DoodadFuncRatioChange",
            Self::DoodadFuncNextPhase { .. } => "DoodadFuncNextPhase",
            Self::DoodadFuncFinal => "DoodadFuncFinal",
            Self::DoodadFuncGrowth { .. } => "DoodadFuncGrowth",
            Self::DoodadFuncQuestGlow { .. } => "DoodadFuncQuestGlow",
            Self::DoodadFuncSetData { .. } => "DoodadFuncSetData",
        }
    }

    /// Build the engine-side function
    pub fn build(self) -> PhaseFunc {
        PhaseFunc::new(self.type_tag(), self)
    }
}

impl DoodadFunc for PhaseDef {
    fn execute(&self, ctx: &mut FuncContext<'_>) -> Result<(), FuncError> {
        match self {
            Self::DoodadFuncRatioChange { ratio, next_phase } => {
                let cumulative = ctx.doodad.add_cumulative_ratio(*ratio);
                if ctx.doodad.phase_ratio() < cumulative {
                    request(ctx, *next_phase);
                }
            }
            Self::DoodadFuncNextPhase { next_phase } => request(ctx, *next_phase),
            Self::DoodadFuncFinal => ctx.doodad.request_override(PhaseTarget::Delete),
            Self::DoodadFuncGrowth { duration_ms } => {
                ctx.doodad.plant_time = Some(ctx.now);
                ctx.doodad.growth_time =
                    Some(ctx.now + Duration::milliseconds(i64::from(*duration_ms)));
            }
            Self::DoodadFuncQuestGlow { on } => ctx.doodad.quest_glow = u32::from(*on),
            Self::DoodadFuncSetData { value } => ctx.doodad.set_data(*value)?,
        }
        Ok(())
    }
}

fn request(ctx: &mut FuncContext<'_>, raw: i32) {
    match PhaseTarget::from_raw(raw) {
        Some(target) => ctx.doodad.request_override(target),
        None => log::warn!(
            "Doodad {} (template {}) requested a transition to phase 0",
            ctx.doodad.object_id(),
            ctx.doodad.template_id()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use doodad_core::ObjectId;
    use doodad_engine::{Actor, Doodad};

    fn run(def: &dyn DoodadFunc, doodad: &mut Doodad, actor: Option<Actor>) -> Result<(), FuncError> {
        let mut ctx = FuncContext {
            actor,
            doodad,
            skill_id: 0,
            next_phase: None,
            now: DateTime::<Utc>::UNIX_EPOCH,
        };
        def.execute(&mut ctx)
    }

    #[test]
    fn test_trigger_entry_from_json() {
        let entry: TriggerEntry = serde_json::from_str(
            r#"{ "type": "DoodadFuncSkillHit", "skill_id": 12, "next_phase": -1 }"#,
        )
        .unwrap();
        assert_eq!(entry.func, TriggerDef::DoodadFuncSkillHit);

        let func = entry.build();
        assert!(func.is_skill_hit());
        assert_eq!(func.skill_id, 12);
        assert_eq!(func.next_phase, Some(PhaseTarget::Delete));
    }

    #[test]
    fn test_phase_def_from_json() {
        let def: PhaseDef =
            serde_json::from_str(r#"{ "type": "DoodadFuncGrowth", "duration_ms": 5000 }"#).unwrap();
        assert_eq!(def, PhaseDef::DoodadFuncGrowth { duration_ms: 5000 });
        assert_eq!(def.build().func_type, "DoodadFuncGrowth");
    }

    #[test]
    fn test_require_actor() {
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);
        let def = TriggerDef::DoodadFuncRequireActor;
        assert!(run(&def, &mut doodad, None).is_err());
        assert!(run(&def, &mut doodad, Some(Actor::npc(ObjectId::new(2)))).is_ok());
    }

    #[test]
    fn test_growth_stamps_timers() {
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);
        run(&PhaseDef::DoodadFuncGrowth { duration_ms: 2500 }, &mut doodad, None).unwrap();
        let now = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(doodad.plant_time, Some(now));
        assert_eq!(doodad.time_left(now), 2500);
    }

    #[test]
    fn test_ratio_change_accumulates() {
        // Fresh doodad: phase ratio 0, so the first positive slice wins
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);
        run(
            &PhaseDef::DoodadFuncRatioChange {
                ratio: 0,
                next_phase: 4,
            },
            &mut doodad,
            None,
        )
        .unwrap();
        assert_eq!(doodad.override_phase(), None);

        run(
            &PhaseDef::DoodadFuncRatioChange {
                ratio: 3000,
                next_phase: 5,
            },
            &mut doodad,
            None,
        )
        .unwrap();
        assert_eq!(doodad.override_phase(), Some(PhaseTarget::Phase(5)));
        assert_eq!(doodad.cumulative_phase_ratio(), 3000);
    }

    #[test]
    fn test_final_and_quest_glow() {
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);
        run(&PhaseDef::DoodadFuncQuestGlow { on: true }, &mut doodad, None).unwrap();
        assert_eq!(doodad.quest_glow, 1);
        run(&PhaseDef::DoodadFuncFinal, &mut doodad, None).unwrap();
        assert_eq!(doodad.override_phase(), Some(PhaseTarget::Delete));
    }
}
