//! Scenario files: ghost states over a sequence of ticks.

use codec::{ComponentData, FieldValue, GhostEntity};
use schema::GhostTypeId;
use serde::{Deserialize, Serialize};

/// A recorded run of one ghost type, as seen by one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub ghost_type: GhostTypeId,
    /// Network id of the receiving connection.
    #[serde(default)]
    pub recipient: i32,
    /// Baselines per entity once enough history exists: 0, 1 or 3.
    #[serde(default = "default_baselines")]
    pub baselines: usize,
    pub ticks: Vec<ScenarioTick>,
}

const fn default_baselines() -> usize {
    3
}

/// Ghost states at one tick. Entity `i` keeps its index across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTick {
    pub tick: u32,
    pub entities: Vec<Vec<ScenarioComponent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComponent {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub fields: Vec<ScenarioValue>,
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
}

impl From<ScenarioValue> for FieldValue {
    fn from(value: ScenarioValue) -> Self {
        match value {
            ScenarioValue::Bool(v) => Self::Bool(v),
            ScenarioValue::Int(v) => Self::Int(v),
            ScenarioValue::UInt(v) => Self::UInt(v),
            ScenarioValue::Float(v) => Self::Float(v),
        }
    }
}

impl ScenarioTick {
    /// Converts the tick's entities into codec ghost instances.
    #[must_use]
    pub fn ghosts(&self, ghost_type: GhostTypeId) -> Vec<GhostEntity> {
        self.entities
            .iter()
            .map(|components| {
                GhostEntity::new(
                    ghost_type,
                    components
                        .iter()
                        .map(|c| ComponentData {
                            enabled: c.enabled,
                            fields: c.fields.iter().copied().map(FieldValue::from).collect(),
                        })
                        .collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_json_defaults() {
        let json = r#"{
            "ghost_type": 7,
            "ticks": [
                { "tick": 1, "entities": [
                    [ { "fields": [ { "int": -3 }, { "uint": 4 } ] },
                      { "enabled": false, "fields": [ { "float": 0.5 }, { "bool": true } ] } ]
                ] }
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.recipient, 0);
        assert_eq!(scenario.baselines, 3);

        let ghosts = scenario.ticks[0].ghosts(scenario.ghost_type);
        assert_eq!(ghosts.len(), 1);
        assert_eq!(ghosts[0].ghost_type, GhostTypeId::new(7));
        assert_eq!(
            ghosts[0].components[0],
            ComponentData::new(vec![FieldValue::Int(-3), FieldValue::UInt(4)])
        );
        assert!(!ghosts[0].components[1].enabled);
        assert_eq!(
            ghosts[0].components[1].fields,
            vec![FieldValue::Float(0.5), FieldValue::Bool(true)]
        );
    }
}
