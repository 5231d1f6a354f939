//! End-to-end editing scenarios against the sample scene.
//!
//! Each scenario builds a fresh session, drives controls the way a user
//! would and checks the outcome. The CLI `demo` command prints the reports.

use propkit_common::PropertyValue;
use propkit_history::{ChangeConsumer, EditHistory};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

use crate::builders::default_registry;
use crate::handle::{NodeHandle, SharedScene, share};
use crate::scene::sample_scene;

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub summary: &'static str,
    pub passed: bool,
    /// Observations in the order they were made; the failure reason last.
    pub steps: Vec<String>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "ok" } else { "FAILED" };
        writeln!(f, "{} [{verdict}] {}", self.name, self.summary)?;
        for step in &self.steps {
            writeln!(f, "    {step}")?;
        }
        Ok(())
    }
}

struct Run {
    steps: Vec<String>,
}

impl Run {
    fn step(&mut self, line: impl Into<String>) {
        self.steps.push(line.into());
    }

    fn check(&mut self, ok: bool, what: &str) -> Result<(), String> {
        if ok {
            self.step(format!("{what}: yes"));
            Ok(())
        } else {
            Err(format!("expected {what}"))
        }
    }
}

fn run(
    name: &'static str,
    summary: &'static str,
    body: impl FnOnce(&mut Run) -> Result<(), String>,
) -> ScenarioReport {
    let mut run = Run { steps: Vec::new() };
    let outcome = body(&mut run);
    let passed = outcome.is_ok();
    if let Err(reason) = outcome {
        tracing::warn!("scenario {name} failed: {reason}");
        run.step(reason);
    }
    ScenarioReport {
        name,
        summary,
        passed,
        steps: run.steps,
    }
}

fn session() -> (SharedScene, Rc<EditHistory<NodeHandle>>) {
    let scene = share(sample_scene());
    let history = Rc::new(EditHistory::new().with_root(NodeHandle::root(&scene)));
    (scene, history)
}

fn lamp_intensity(lamp: &NodeHandle) -> Option<f32> {
    lamp.read(|node| node.light.as_ref().map(|l| l.intensity))
        .flatten()
}

/// A numeric edit is applied, recorded and undone.
pub fn numeric_edit_and_undo() -> ScenarioReport {
    run("A", "numeric edit, apply, undo", |run| {
        let (scene, history) = session();
        let consumer: Rc<dyn ChangeConsumer<NodeHandle>> = history.clone();
        let lamp = NodeHandle::find(&scene, "Lamp").map_err(|e| e.to_string())?;
        let mut panel = default_registry()
            .build_panel(&lamp, lamp.parent().as_ref(), &consumer)
            .map_err(|e| e.to_string())?;
        let control = panel
            .control_mut("intensity")
            .ok_or("lamp panel has no intensity control")?;

        run.step(format!("bound intensity = {}", control.transient()));
        control
            .edit(PropertyValue::Float(7.0))
            .map_err(|e| e.to_string())?;
        run.check(control.is_dirty(), "dirty after edit")?;
        control.apply().map_err(|e| e.to_string())?;
        let recorded = history.undo_description().unwrap_or_default();
        run.step(format!("recorded `{recorded}`"));
        run.check(recorded == "intensity: 5 -> 7", "operation old=5 new=7")?;

        history.undo().map_err(|e| e.to_string())?;
        run.check(lamp_intensity(&lamp) == Some(5.0), "model reads 5 after undo")?;
        control.reload().map_err(|e| e.to_string())?;
        run.check(
            control.transient() == &PropertyValue::Float(5.0),
            "control shows 5 after reload",
        )
    })
}

/// An object matching several builders gets controls from each, in order.
pub fn multi_builder_dispatch() -> ScenarioReport {
    run("B", "dispatch across matching builders", |run| {
        let (scene, history) = session();
        let consumer: Rc<dyn ChangeConsumer<NodeHandle>> = history;
        let lamp = NodeHandle::find(&scene, "Lamp").map_err(|e| e.to_string())?;
        let registry = default_registry();
        let matching = registry.matching(&lamp);
        run.step(format!("matching builders: {}", matching.join(", ")));
        run.check(
            matching == ["Node", "Transform", "Light"],
            "builders in registration order",
        )?;

        let panel = registry
            .build_panel(&lamp, lamp.parent().as_ref(), &consumer)
            .map_err(|e| e.to_string())?;
        let names = panel.names();
        run.step(format!("controls: {}", names.join(", ")));
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        run.check(unique.len() == names.len(), "property names do not overlap")
    })
}

/// The model rejects a negative intensity; nothing is recorded.
pub fn rejected_apply() -> ScenarioReport {
    run("C", "rejected apply leaves history unchanged", |run| {
        let (scene, history) = session();
        let consumer: Rc<dyn ChangeConsumer<NodeHandle>> = history.clone();
        let lamp = NodeHandle::find(&scene, "Lamp").map_err(|e| e.to_string())?;
        let mut panel = default_registry()
            .build_panel(&lamp, lamp.parent().as_ref(), &consumer)
            .map_err(|e| e.to_string())?;
        let control = panel
            .control_mut("intensity")
            .ok_or("lamp panel has no intensity control")?;

        control
            .edit(PropertyValue::Float(-1.0))
            .map_err(|e| e.to_string())?;
        match control.apply() {
            Ok(_) => return Err("apply of -1 succeeded".into()),
            Err(err) => run.step(format!("apply failed: {err}")),
        }
        run.check(history.undo_count() == 0, "no operation recorded")?;
        control.reload().map_err(|e| e.to_string())?;
        run.check(
            control.transient() == &PropertyValue::Float(5.0),
            "control shows prior value 5",
        )
    })
}

/// Undo with nothing recorded is a quiet no-op.
pub fn empty_undo() -> ScenarioReport {
    run("D", "undo on empty history", |run| {
        let (_scene, history) = session();
        let undone = history.undo().map_err(|e| e.to_string())?;
        run.check(!undone, "nothing undone")?;
        run.check(history.undo_count() == 0 && history.redo_count() == 0, "stacks still empty")
    })
}

pub fn run_all() -> Vec<ScenarioReport> {
    vec![
        numeric_edit_and_undo(),
        multi_builder_dispatch(),
        rejected_apply(),
        empty_undo(),
    ]
}
