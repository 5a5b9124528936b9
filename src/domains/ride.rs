//! Bike ride planner.

use serde::{Deserialize, Serialize};

use crate::engine::{Interpreter, Node, Result, Value, unexpected, validation};

/// Longest ride the planner accepts, in kilometres.
pub const MAX_RIDE_DISTANCE: f64 = 300.0;

/// Terrain used when a ride does not name one.
pub const DEFAULT_TERRAIN: &str = "flat";

/// Average speed per terrain, km/h.
pub const TERRAIN_SPEEDS: [(&str, f64); 3] = [("flat", 25.0), ("hilly", 18.0), ("mountainous", 12.0)];

/// Average speed for a (lowercase) terrain name.
pub fn terrain_speed(terrain: &str) -> Option<f64> {
    TERRAIN_SPEEDS
        .iter()
        .find(|(name, _)| *name == terrain)
        .map(|(_, speed)| *speed)
}

/// Normalised ride properties, echoed back in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideProperties {
    /// Lowercase terrain name
    pub terrain: String,
    /// Ride length
    pub distance_km: f64,
}

/// Result of planning a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidePlan {
    /// The properties the estimate was computed from
    pub input_properties: RideProperties,
    /// Distance divided by the terrain's average speed
    pub estimated_duration_hours: f64,
}

/// Stateless ride interpreter.
#[derive(Debug, Default)]
pub struct RideInterpreter;

impl RideInterpreter {
    /// Create a ride interpreter.
    pub fn new() -> Self {
        Self
    }

    /// Validate the property list and estimate the duration.
    pub fn ride(&self, properties: Vec<(String, Value)>) -> Result<RidePlan> {
        let mut distance = None;
        let mut terrain = None;
        for (key, value) in properties {
            match key.as_str() {
                "distance_km" => distance = Some(value),
                "terrain" => terrain = Some(value),
                other => tracing::debug!(property = other, "ignoring unknown ride property"),
            }
        }

        let distance_km = match distance {
            None => 0.0,
            Some(Value::Number(km)) => km,
            Some(other) => {
                return Err(validation(format!(
                    "Ride distance must be a number of kilometres, got '{}'.",
                    other
                )));
            }
        };
        let terrain = terrain
            .map(|value| value.to_string().to_lowercase())
            .unwrap_or_else(|| DEFAULT_TERRAIN.to_string());

        if distance_km > MAX_RIDE_DISTANCE {
            return Err(validation(format!(
                "Ride distance of {}km exceeds the maximum of {}km.",
                distance_km, MAX_RIDE_DISTANCE
            )));
        }

        let speed = terrain_speed(&terrain).ok_or_else(|| {
            let valid = TERRAIN_SPEEDS.iter().map(|(name, _)| *name).collect::<Vec<_>>();
            validation(format!(
                "Invalid terrain type '{}'. Must be one of {}.",
                terrain,
                valid.join(", ")
            ))
        })?;

        let estimated_duration_hours = if speed > 0.0 { distance_km / speed } else { 0.0 };

        Ok(RidePlan {
            input_properties: RideProperties { terrain, distance_km },
            estimated_duration_hours,
        })
    }
}

fn prop_line(node: Node) -> Result<(String, Value)> {
    let mut children = node.into_branch("prop_line")?.into_iter();
    match (children.next(), children.next(), children.next()) {
        (Some(key), Some(value), None) => Ok((key.into_text()?, value.into_value()?)),
        _ => Err(unexpected("prop_line with key and value", "malformed prop_line")),
    }
}

impl Interpreter for RideInterpreter {
    type Output = RidePlan;

    fn interpret(&mut self, root: Node) -> Result<RidePlan> {
        let mut properties = Vec::new();
        for child in root.into_branch("ride")? {
            for line in child.into_branch("properties")? {
                properties.push(prop_line(line)?);
            }
        }
        self.ride(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;

    fn props(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn defaults_to_flat_zero_distance() {
        let plan = RideInterpreter::new().ride(Vec::new()).unwrap();
        assert_eq!(plan.input_properties.terrain, "flat");
        assert_eq!(plan.input_properties.distance_km, 0.0);
        assert_eq!(plan.estimated_duration_hours, 0.0);
    }

    #[test]
    fn terrain_is_case_folded() {
        let plan = RideInterpreter::new()
            .ride(props(&[
                ("terrain", Value::Ident("Mountainous".into())),
                ("distance_km", Value::Number(24.0)),
            ]))
            .unwrap();
        assert_eq!(plan.input_properties.terrain, "mountainous");
        assert_eq!(plan.estimated_duration_hours, 2.0);
    }

    #[test]
    fn distance_must_be_numeric() {
        let err = RideInterpreter::new()
            .ride(props(&[("distance_km", Value::Ident("far".into()))]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn later_properties_win() {
        let plan = RideInterpreter::new()
            .ride(props(&[
                ("distance_km", Value::Number(10.0)),
                ("distance_km", Value::Number(50.0)),
            ]))
            .unwrap();
        assert_eq!(plan.input_properties.distance_km, 50.0);
    }
}
