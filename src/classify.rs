//! Ice/flow classification of raw daily observations.
//!
//! A day is ice when its qualifier is exactly the ice sentinel, whatever the
//! value says. Any other qualifier, known or not, is flow. Rows with no value
//! that are not ice (equipment failure, missing record) carry no information
//! about ice and are dropped.

use crate::model::{ClassifiedObservation, Condition, Observation, ICE_QUALIFIER};

/// Returns true if the observation's qualifier marks an ice-affected day.
pub fn is_ice(observation: &Observation) -> bool {
    observation.flow_qualifier_code == ICE_QUALIFIER
}

/// Classifies one observation, or returns `None` if it should be dropped.
pub fn classify(observation: &Observation) -> Option<ClassifiedObservation> {
    let is_ice = is_ice(observation);
    if observation.flow_value.is_none() && !is_ice {
        return None;
    }

    Some(ClassifiedObservation {
        observation: observation.clone(),
        is_ice,
        condition: if is_ice { Condition::Ice } else { Condition::Flow },
    })
}

/// Classifies a batch, preserving input order of the retained rows.
pub fn classify_all(observations: &[Observation]) -> Vec<ClassifiedObservation> {
    observations.iter().filter_map(classify).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(value: Option<f64>, qualifier: &str) -> Observation {
        Observation {
            site_id: "05407000".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 12, 1).unwrap(),
            flow_value: value,
            flow_qualifier_code: qualifier.to_string(),
            state_code: "WI".to_string(),
        }
    }

    #[test]
    fn test_ice_qualifier_is_ice_with_or_without_value() {
        for value in [None, Some(0.0), Some(1520.0)] {
            let c = classify(&obs(value, ICE_QUALIFIER)).expect("ice rows are always kept");
            assert!(c.is_ice);
            assert_eq!(c.condition, Condition::Ice, "value {:?} should not override ice", value);
        }
    }

    #[test]
    fn test_missing_value_without_ice_is_dropped() {
        assert!(classify(&obs(None, "P")).is_none());
        assert!(classify(&obs(None, "P Eqp")).is_none());
        assert!(classify(&obs(None, "")).is_none());
    }

    #[test]
    fn test_value_with_any_other_qualifier_is_flow() {
        for q in ["P", "A", "P e", "A Ice", "Ice", "p ice", "garbage"] {
            let c = classify(&obs(Some(10.0), q)).expect("valued rows are kept");
            assert!(!c.is_ice, "qualifier '{}' should not match the ice sentinel", q);
            assert_eq!(c.condition, Condition::Flow);
        }
    }

    #[test]
    fn test_classified_rows_keep_original_observation() {
        let original = obs(Some(42.0), "A");
        let c = classify(&original).unwrap();
        assert_eq!(c.observation, original);
    }

    #[test]
    fn test_classify_all_every_retained_row_has_value_or_ice() {
        let input = vec![
            obs(Some(1.0), "P"),
            obs(None, "P"),
            obs(None, ICE_QUALIFIER),
            obs(Some(2.0), ICE_QUALIFIER),
            obs(None, "A"),
        ];
        let out = classify_all(&input);
        assert_eq!(out.len(), 3);
        for c in &out {
            assert!(c.observation.flow_value.is_some() || c.is_ice);
        }
    }

    #[test]
    fn test_classify_all_is_idempotent() {
        let input = vec![
            obs(Some(1.0), "P"),
            obs(None, ICE_QUALIFIER),
            obs(None, "P Eqp"),
        ];
        let first = classify_all(&input);
        let second = classify_all(&input);
        assert_eq!(first, second);

        // Reclassifying the survivors changes nothing either.
        let survivors: Vec<Observation> = first.iter().map(|c| c.observation.clone()).collect();
        assert_eq!(classify_all(&survivors), first);
    }
}
