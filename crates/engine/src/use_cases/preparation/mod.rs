//! Prepare entity graph use case.
//!
//! Runs the three preparation phases over every entity of a graph:
//! base (rebuild typed records from their sources), derived (values that
//! depend on parents), then final (roll formulas and labels, read from one
//! roll data snapshot shared by the whole phase). Parents always go before
//! their children. A failing entity is reported and skipped; the pass
//! carries on with its siblings unless the pipeline runs strict.

mod failure;
mod report;

use std::collections::HashSet;
use std::sync::Arc;

use armory_domain::{
    ActivityContext, AttackMode, EntityGraph, FormulaSimplifier, RollData, StandardSimplifier,
};
use tracing::{debug, info};

pub use failure::{
    EntityKind, EntityRef, FailureSummary, Phase, PreparationError, PreparationFailure,
};
pub use report::{PassReport, PassSummary, PhaseTally};

use crate::infrastructure::ports::{DiagnosticSink, RollDataProvider};
use crate::infrastructure::roll_data::GraphRollData;
use crate::infrastructure::settings::PipelineSettings;

/// Prepare entity graph use case.
pub struct PrepareGraph {
    settings: PipelineSettings,
    simplifier: Arc<dyn FormulaSimplifier>,
    roll_data: Arc<dyn RollDataProvider>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl PrepareGraph {
    pub fn new(
        settings: PipelineSettings,
        simplifier: Arc<dyn FormulaSimplifier>,
        roll_data: Arc<dyn RollDataProvider>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            settings,
            simplifier,
            roll_data,
            diagnostics,
        }
    }

    /// Standard simplifier and roll data built from the graph.
    pub fn standard(settings: PipelineSettings, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self::new(
            settings,
            Arc::new(StandardSimplifier),
            Arc::new(GraphRollData),
            diagnostics,
        )
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one pass with the configured attack mode.
    pub fn execute(&self, graph: &mut EntityGraph) -> PassReport {
        self.execute_with_mode(graph, self.settings.attack_mode)
    }

    /// Run one pass, preparing activity outputs for `attack_mode`.
    pub fn execute_with_mode(&self, graph: &mut EntityGraph, attack_mode: AttackMode) -> PassReport {
        let mut pass = Pass::new(self.settings.strict, self.diagnostics.as_ref());
        debug!(
            actors = graph.actor_ids().len(),
            items = graph.item_ids().len(),
            activities = graph.activity_ids().len(),
            attack_mode = attack_mode.as_str(),
            "Starting preparation pass"
        );

        self.base_phase(graph, &mut pass);
        if !pass.halted() {
            self.derived_phase(graph, &mut pass);
        }
        if !pass.halted() {
            let snapshot = self.roll_data.build(graph);
            self.final_phase(graph, &snapshot, attack_mode, &mut pass);
        }

        let report = pass.report;
        info!(
            prepared = report.tally(Phase::Final).total(),
            failures = report.failures().len(),
            halted = report.halted(),
            "Preparation pass complete"
        );
        report
    }

    fn base_phase(&self, graph: &mut EntityGraph, pass: &mut Pass<'_>) {
        for id in graph.actor_ids() {
            if pass.halted() {
                return;
            }
            if let Some(result) = graph.rebuild_actor(id) {
                pass.record(EntityRef::Actor(id), Phase::Base, result);
            }
        }

        for id in graph.item_ids() {
            if pass.halted() {
                return;
            }
            let entity = EntityRef::Item(id);
            if !graph.item_parent_present(id) {
                if let Some(actor) = graph.item(id).and_then(|item| item.actor) {
                    pass.skip(entity, PreparationError::MissingParent(EntityRef::Actor(actor)));
                }
                continue;
            }
            if let Some(result) = graph.rebuild_item(id) {
                pass.record(entity, Phase::Base, result);
            }
        }

        for id in graph.activity_ids() {
            if pass.halted() {
                return;
            }
            let entity = EntityRef::Activity(id);
            if !graph.activity_parent_present(id) {
                if let Some(item) = graph.activity(id).and_then(|activity| activity.item) {
                    pass.skip(entity, PreparationError::MissingParent(EntityRef::Item(item)));
                }
                continue;
            }
            if let Some(result) = graph.rebuild_activity(id) {
                pass.record(entity, Phase::Base, result);
            }
        }
        debug!(prepared = pass.report.tally(Phase::Base).total(), "Base phase complete");
    }

    fn derived_phase(&self, graph: &mut EntityGraph, pass: &mut Pass<'_>) {
        let rules = &self.settings.rules;
        for id in graph.actor_ids() {
            if let Some(actor) = graph.actor_mut(id) {
                actor.prepare_derived(rules);
                pass.done(EntityRef::Actor(id), Phase::Derived);
            }
        }
        for id in graph.item_ids() {
            let entity = EntityRef::Item(id);
            if pass.is_skipped(entity) {
                continue;
            }
            if let Some((item, actor)) = graph.item_with_actor_mut(id) {
                item.prepare_derived(actor, rules);
                pass.done(entity, Phase::Derived);
            }
        }
        for id in graph.activity_ids() {
            let entity = EntityRef::Activity(id);
            if pass.is_skipped(entity) {
                continue;
            }
            if let Some((activity, item, _)) = graph.activity_with_parents_mut(id) {
                activity.prepare_derived(item);
                pass.done(entity, Phase::Derived);
            }
        }
        debug!(prepared = pass.report.tally(Phase::Derived).total(), "Derived phase complete");
    }

    fn final_phase(
        &self,
        graph: &mut EntityGraph,
        snapshot: &RollData,
        attack_mode: AttackMode,
        pass: &mut Pass<'_>,
    ) {
        for id in graph.item_ids() {
            let entity = EntityRef::Item(id);
            if pass.is_skipped(entity) {
                continue;
            }
            if let Some((item, _)) = graph.item_with_actor_mut(id) {
                item.prepare_final();
                pass.done(entity, Phase::Final);
            }
        }

        for id in graph.activity_ids() {
            if pass.halted() {
                return;
            }
            let entity = EntityRef::Activity(id);
            if pass.is_skipped(entity) {
                continue;
            }
            let Some((activity, item, actor)) = graph.activity_with_parents_mut(id) else {
                continue;
            };
            let ctx = ActivityContext {
                item,
                actor,
                roll_data: snapshot,
                rules: &self.settings.rules,
                simplifier: self.simplifier.as_ref(),
                attack_mode,
            };
            let result = activity.prepare_final(&ctx);
            pass.record(entity, Phase::Final, result);
        }
        debug!(prepared = pass.report.tally(Phase::Final).total(), "Final phase complete");
    }
}

/// Bookkeeping for one pass.
struct Pass<'a> {
    report: PassReport,
    skipped: HashSet<EntityRef>,
    strict: bool,
    diagnostics: &'a dyn DiagnosticSink,
}

impl<'a> Pass<'a> {
    fn new(strict: bool, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self {
            report: PassReport::default(),
            skipped: HashSet::new(),
            strict,
            diagnostics,
        }
    }

    fn halted(&self) -> bool {
        self.report.halted()
    }

    fn is_skipped(&self, entity: EntityRef) -> bool {
        self.skipped.contains(&entity)
    }

    fn done(&mut self, entity: EntityRef, phase: Phase) {
        self.report.prepared(phase, entity.kind());
    }

    fn record<E: Into<PreparationError>>(&mut self, entity: EntityRef, phase: Phase, result: Result<(), E>) {
        match result {
            Ok(()) => self.done(entity, phase),
            Err(err) => self.fail(PreparationFailure::new(entity, phase, err)),
        }
    }

    /// Leave the entity out of the rest of the pass; it keeps its previous
    /// values.
    fn skip(&mut self, entity: EntityRef, error: PreparationError) {
        self.skipped.insert(entity);
        self.fail(PreparationFailure::new(entity, Phase::Base, error));
    }

    fn fail(&mut self, failure: PreparationFailure) {
        self.diagnostics.report(&failure);
        self.report.failed(failure);
        if self.strict {
            self.report.halt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::diagnostics::CollectingSink;
    use crate::infrastructure::ports::{MockDiagnosticSink, MockRollDataProvider};
    use armory_domain::{ActivityId, ActorId, FormulaError, ItemId, SimplifyOptions};
    use serde_json::{json, Value};

    fn fighter() -> Value {
        json!({
            "name": "Fighter",
            "level": 1,
            "abilities": { "str": { "value": 16 }, "dex": { "value": 12 } },
            "bonuses": { "mwak": { "attack": "+1" } },
            "weaponProficiencies": ["mar"]
        })
    }

    fn longsword() -> Value {
        json!({
            "name": "Longsword +1",
            "type": "weapon",
            "weaponType": "martialM",
            "damage": {
                "base": { "number": 1, "denomination": 8, "types": ["slashing"] },
                "versatile": { "denomination": 10 }
            },
            "magicalBonus": 1,
            "properties": ["mgc", "ver"]
        })
    }

    struct World {
        graph: EntityGraph,
        actor: ActorId,
        item: ItemId,
        activity: ActivityId,
    }

    fn world() -> World {
        let mut graph = EntityGraph::new();
        let actor = graph.insert_actor(fighter()).unwrap();
        let item = graph.insert_item(Some(actor), longsword()).unwrap();
        let activity = graph
            .insert_activity(
                Some(item),
                json!({ "type": "attack", "name": "Swing", "attack": { "bonus": "+0" } }),
            )
            .unwrap();
        World {
            graph,
            actor,
            item,
            activity,
        }
    }

    fn pipeline(settings: PipelineSettings) -> (PrepareGraph, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        (PrepareGraph::standard(settings, sink.clone()), sink)
    }

    #[test]
    fn test_pass_produces_attack_labels() {
        let mut world = world();
        let (pipeline, sink) = pipeline(PipelineSettings::default());

        let report = pipeline.execute(&mut world.graph);

        assert!(report.is_clean(), "{:?}", report.failures());
        assert!(sink.failures().is_empty());
        let activity = world.graph.activity(world.activity).unwrap();
        let roll = activity.output.attack.as_ref().unwrap();
        assert_eq!(roll.parts, vec!["@mod", "@prof", "+1", "1"]);
        assert_eq!(activity.output.labels.modifier, "+7");
        assert_eq!(activity.output.labels.to_hit, "+ 7");
        assert_eq!(
            world.graph.item(world.item).unwrap().labels.base_damage.as_deref(),
            Some("1d8")
        );
        assert_eq!(report.tally(Phase::Base).total(), 3);
        assert_eq!(report.tally(Phase::Derived).total(), 3);
        assert_eq!(report.tally(Phase::Final).items, 1);
        assert_eq!(report.tally(Phase::Final).activities, 1);
    }

    #[test]
    fn test_one_snapshot_per_pass_after_derived_phase() {
        let mut world = world();
        let mut roll_data = MockRollDataProvider::new();
        roll_data
            .expect_build()
            .times(2)
            .returning(|graph: &EntityGraph| {
                assert!(graph.actors().all(|actor| actor.derived.proficiency.is_some()));
                graph.roll_data()
            });
        let pipeline = PrepareGraph::new(
            PipelineSettings::default(),
            Arc::new(StandardSimplifier),
            Arc::new(roll_data),
            Arc::new(CollectingSink::new()),
        );

        pipeline.execute(&mut world.graph);
        pipeline.execute(&mut world.graph);
    }

    #[test]
    fn test_repeated_passes_are_idempotent() {
        let mut world = world();
        let (pipeline, _) = pipeline(PipelineSettings::default());
        pipeline.execute(&mut world.graph);
        let first = world.graph.export_activity(world.activity);
        pipeline.execute(&mut world.graph);
        assert_eq!(world.graph.export_activity(world.activity), first);
        assert_eq!(world.graph.export_actor(world.actor).unwrap()["name"], "Fighter");
    }

    #[test]
    fn test_attack_mode_does_not_leak_between_passes() {
        let mut world = world();
        let (pipeline, _) = pipeline(PipelineSettings::default());

        pipeline.execute_with_mode(&mut world.graph, AttackMode::TwoHanded);
        let activity = world.graph.activity(world.activity).unwrap();
        assert!(activity.output.labels.damage[0].formula.starts_with("1d10"));

        pipeline.execute(&mut world.graph);
        let activity = world.graph.activity(world.activity).unwrap();
        assert!(activity.output.labels.damage[0].formula.starts_with("1d8"));
        let item = world.graph.item(world.item).unwrap();
        assert_eq!(item.damage.base.as_ref().unwrap().denomination, Some(8));
    }

    #[test]
    fn test_schema_failure_is_isolated_and_reported() {
        let mut world = world();
        let broken = world
            .graph
            .insert_actor(json!({ "name": "Broken", "level": "high" }))
            .unwrap();
        let mut diagnostics = MockDiagnosticSink::new();
        diagnostics
            .expect_report()
            .withf(move |failure: &PreparationFailure| {
                failure.entity == EntityRef::Actor(broken)
                    && failure.phase == Phase::Base
                    && failure.error.kind() == "schema"
            })
            .times(1)
            .return_const(());
        let pipeline = PrepareGraph::standard(PipelineSettings::default(), Arc::new(diagnostics));

        let report = pipeline.execute(&mut world.graph);

        assert_eq!(report.failures().len(), 1);
        assert!(!report.halted());
        assert_eq!(world.graph.actor(broken).unwrap().level, 1);
        let activity = world.graph.activity(world.activity).unwrap();
        assert_eq!(activity.output.labels.modifier, "+7");
    }

    #[test]
    fn test_missing_parent_skips_entity() {
        let mut world = world();
        let (pipeline, sink) = pipeline(PipelineSettings::default());
        pipeline.execute(&mut world.graph);
        world.graph.remove_actor(world.actor);

        let report = pipeline.execute(&mut world.graph);

        let failures = sink.drain();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].entity, EntityRef::Item(world.item));
        assert_eq!(
            failures[0].error,
            PreparationError::MissingParent(EntityRef::Actor(world.actor))
        );
        assert_eq!(report.tally(Phase::Final).items, 0);
        // The item keeps what the previous pass computed.
        let item = world.graph.item(world.item).unwrap();
        assert_eq!(item.labels.base_damage.as_deref(), Some("1d8"));
        // Its activity still prepares, without actor terms.
        assert_eq!(report.tally(Phase::Final).activities, 1);
        let activity = world.graph.activity(world.activity).unwrap();
        assert_eq!(activity.output.attack.as_ref().unwrap().parts, vec!["1"]);
    }

    #[test]
    fn test_migrated_spell_damage_keeps_ability_modifier() {
        let mut graph = EntityGraph::new();
        let wizard = graph
            .insert_actor(json!({
                "name": "Wizard",
                "abilities": { "int": { "value": 16 } },
                "spellcasting": "int"
            }))
            .unwrap();
        let (_, activity) = graph
            .insert_legacy_item(
                Some(wizard),
                &json!({
                    "name": "Fire Bolt",
                    "type": "spell",
                    "actionType": "rsak",
                    "damage": { "parts": [["1d10 + @mod", "fire"]] }
                }),
            )
            .unwrap();
        let (pipeline, _) = pipeline(PipelineSettings::default());

        let report = pipeline.execute(&mut graph);

        assert!(report.is_clean(), "{:?}", report.failures());
        let output = &graph.activity(activity.unwrap()).unwrap().output;
        assert_eq!(output.labels.damage[0].formula, "1d10 + 3");
    }

    #[test]
    fn test_unowned_item_prepares_without_actor() {
        let mut graph = EntityGraph::new();
        let item = graph.insert_item(None, longsword()).unwrap();
        let activity = graph
            .insert_activity(Some(item), json!({ "type": "attack", "attack": { "bonus": "2" } }))
            .unwrap();
        let (pipeline, sink) = pipeline(PipelineSettings::default());

        let report = pipeline.execute(&mut graph);

        assert!(report.is_clean());
        assert!(sink.failures().is_empty());
        let output = &graph.activity(activity).unwrap().output;
        assert_eq!(output.labels.modifier, "+3");
    }

    #[test]
    fn test_strict_pass_halts_before_snapshot() {
        let mut world = world();
        world
            .graph
            .insert_actor(json!({ "level": "high" }))
            .unwrap();
        let mut roll_data = MockRollDataProvider::new();
        roll_data.expect_build().times(0);
        let sink = Arc::new(CollectingSink::new());
        let settings = PipelineSettings {
            strict: true,
            ..PipelineSettings::default()
        };
        let pipeline = PrepareGraph::new(
            settings,
            Arc::new(StandardSimplifier),
            Arc::new(roll_data),
            sink.clone(),
        );

        let report = pipeline.execute(&mut world.graph);

        assert!(report.halted());
        assert_eq!(sink.failures().len(), 1);
        assert_eq!(report.tally(Phase::Derived).total(), 0);
        assert!(world.graph.activity(world.activity).unwrap().output.attack.is_none());
    }

    struct RejectingSimplifier;

    impl FormulaSimplifier for RejectingSimplifier {
        fn simplify(&self, formula: &str, _: SimplifyOptions) -> Result<String, FormulaError> {
            Err(FormulaError::NotDeterministic(formula.to_string()))
        }
    }

    #[test]
    fn test_final_failure_keeps_previous_output() {
        let mut world = world();
        let (pipeline, _) = pipeline(PipelineSettings::default());
        pipeline.execute(&mut world.graph);
        let prepared = world.graph.activity(world.activity).unwrap().output.clone();

        let sink = Arc::new(CollectingSink::new());
        let rejecting = PrepareGraph::new(
            PipelineSettings::default(),
            Arc::new(RejectingSimplifier),
            Arc::new(GraphRollData),
            sink.clone(),
        );
        let report = rejecting.execute(&mut world.graph);

        assert_eq!(report.failures_in(Phase::Final).count(), 1);
        assert_eq!(sink.failures()[0].error.kind(), "formula");
        assert_eq!(report.tally(Phase::Final).items, 1);
        // Base rebuilt the record, so the output is back to what the
        // derived phase produced, not the previous final output.
        let activity = world.graph.activity(world.activity).unwrap();
        assert!(activity.output.attack.is_none());
        assert_eq!(activity.output.damage_parts, prepared.damage_parts);
    }
}
