//! Itinerary validation and conflict detection.
//!
//! A plan with an end date must satisfy:
//!
//! 1. `startDate < endDate`
//! 2. every visit time lies in `[startDate, endDate]`, both ends inclusive
//! 3. no two visit times fall on the same second
//!
//! Checks run in destination order and stop at the first violation, so a
//! window error on an early destination hides an overlap further down.
//! Plans without an end date only have their fields parsed.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use super::error::ValidationError;
use super::itinerary::{Destination, DestinationInput, ItineraryPlan, PlanFields, Schedule};
use super::time::{RawInstant, parse_instant, second_key};

/// Validate the schedule of a new plan.
///
/// # Examples
///
/// ```
/// use travel_server::domain::{DestinationInput, GeoPoint, RawInstant, ValidationError, validate_new_plan};
///
/// let stop = |t: &str| DestinationInput {
///     name: "Colosseum".into(),
///     location: GeoPoint::new(41.89, 12.49),
///     visit_time: RawInstant::from(t),
/// };
/// let start = RawInstant::from("2024-08-01");
/// let end = RawInstant::from("2024-08-03");
///
/// let ok = validate_new_plan(&start, Some(&end), &[stop("2024-08-01T10:00"), stop("2024-08-02T10:00")]);
/// assert!(ok.is_ok());
///
/// let clash = validate_new_plan(&start, Some(&end), &[stop("2024-08-01T10:00"), stop("2024-08-01T10:00")]);
/// assert!(matches!(clash, Err(ValidationError::Overlap { index: 1, earlier: 0, .. })));
/// ```
pub fn validate_new_plan(
    start: &RawInstant,
    end: Option<&RawInstant>,
    destinations: &[DestinationInput],
) -> Result<Schedule, ValidationError> {
    let start_date = parse_field("startDate", start)?;
    let end_date = end.map(|raw| parse_field("endDate", raw)).transpose()?;

    let mut ledger = VisitLedger::open(start_date, end_date)?;
    let destinations = destinations
        .iter()
        .enumerate()
        .map(|(index, input)| ledger.admit_input(index, input))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Schedule {
        start_date,
        end_date,
        destinations,
    })
}

/// Merge a patch over a persisted plan and validate the result.
///
/// Text fields and dates take the patch value when it is non-empty.
/// A patch destination list replaces the current one wholesale, even when
/// empty. The owner never changes.
pub fn validate_update(
    current: &ItineraryPlan,
    patch: &PlanFields,
) -> Result<ItineraryPlan, ValidationError> {
    let start_date = match patch.start_date() {
        Some(raw) => parse_field("startDate", raw)?,
        None => current.start_date,
    };
    let end_date = match patch.end_date() {
        Some(raw) => Some(parse_field("endDate", raw)?),
        None => current.end_date,
    };

    let mut ledger = VisitLedger::open(start_date, end_date)?;
    let destinations = match &patch.destinations {
        Some(inputs) => inputs
            .iter()
            .enumerate()
            .map(|(index, input)| ledger.admit_input(index, input))
            .collect::<Result<Vec<_>, _>>()?,
        None => {
            // Dates may have moved under the existing stops
            for (index, destination) in current.destinations.iter().enumerate() {
                ledger.admit(index, destination.visit_time)?;
            }
            current.destinations.clone()
        }
    };

    Ok(ItineraryPlan {
        user_id: current.user_id.clone(),
        title: patch.title().unwrap_or(&current.title).to_string(),
        city: patch.city().unwrap_or(&current.city).to_string(),
        start_date,
        end_date,
        destinations,
    })
}

fn parse_field(field: &str, raw: &RawInstant) -> Result<DateTime<Utc>, ValidationError> {
    parse_instant(raw).map_err(|e| ValidationError::malformed(field, e))
}

/// Per-call record of the window and the visit times admitted so far.
struct VisitLedger {
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Second-granularity key → index of the destination that claimed it
    seen: HashMap<i64, usize>,
}

impl VisitLedger {
    fn open(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, ValidationError> {
        if let Some(end) = end
            && start >= end
        {
            return Err(ValidationError::Ordering { start, end });
        }

        Ok(Self {
            window: end.map(|end| (start, end)),
            seen: HashMap::new(),
        })
    }

    /// Parse and check one submitted destination.
    fn admit_input(
        &mut self,
        index: usize,
        input: &DestinationInput,
    ) -> Result<Destination, ValidationError> {
        let visit_time = parse_instant(&input.visit_time).map_err(|e| {
            ValidationError::malformed(format!("destinations[{index}].visitTime"), e)
        })?;

        if !input.location.is_valid() {
            return Err(ValidationError::malformed(
                format!("destinations[{index}].location"),
                "coordinates out of range",
            ));
        }

        self.admit(index, visit_time)?;

        Ok(Destination {
            name: input.name.clone(),
            location: input.location,
            visit_time,
        })
    }

    fn admit(&mut self, index: usize, visit_time: DateTime<Utc>) -> Result<(), ValidationError> {
        let Some((start, end)) = self.window else {
            return Ok(());
        };

        if visit_time < start || visit_time > end {
            return Err(ValidationError::Window { index, visit_time });
        }

        match self.seen.entry(second_key(&visit_time)) {
            Entry::Occupied(entry) => Err(ValidationError::Overlap {
                index,
                earlier: *entry.get(),
                visit_time,
            }),
            Entry::Vacant(entry) => {
                entry.insert(index);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoPoint;

    fn raw(s: &str) -> RawInstant {
        RawInstant::from(s)
    }

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(&raw(s)).unwrap()
    }

    fn stop(name: &str, visit: &str) -> DestinationInput {
        DestinationInput {
            name: name.to_string(),
            location: GeoPoint::new(41.9, 12.5),
            visit_time: raw(visit),
        }
    }

    fn validate(start: &str, end: &str, stops: &[DestinationInput]) -> Result<Schedule, ValidationError> {
        validate_new_plan(&raw(start), Some(&raw(end)), stops)
    }

    fn persisted(stops: &[(&str, &str)]) -> ItineraryPlan {
        ItineraryPlan {
            user_id: "owner".into(),
            title: "A".into(),
            city: "Rome".into(),
            start_date: at("2024-08-01"),
            end_date: Some(at("2024-08-03")),
            destinations: stops
                .iter()
                .map(|(name, t)| Destination {
                    name: name.to_string(),
                    location: GeoPoint::new(41.9, 12.5),
                    visit_time: at(t),
                })
                .collect(),
        }
    }

    #[test]
    fn duplicate_visit_is_overlap() {
        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[stop("a", "2024-08-01T10:00"), stop("b", "2024-08-01T10:00")],
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::Overlap {
                index: 1,
                earlier: 0,
                visit_time: at("2024-08-01T10:00"),
            }
        );
    }

    #[test]
    fn visit_after_end_is_window_error() {
        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[stop("a", "2024-08-01T10:00"), stop("b", "2024-08-04T10:00")],
        );
        assert_eq!(
            result.unwrap_err(),
            ValidationError::Window {
                index: 1,
                visit_time: at("2024-08-04T10:00"),
            }
        );
    }

    #[test]
    fn distinct_visits_inside_window_accepted() {
        let schedule = validate(
            "2024-08-01",
            "2024-08-03",
            &[stop("a", "2024-08-01T10:00"), stop("b", "2024-08-02T10:00")],
        )
        .unwrap();
        assert_eq!(schedule.start_date, at("2024-08-01"));
        assert_eq!(schedule.end_date, Some(at("2024-08-03")));
        assert_eq!(schedule.destinations.len(), 2);
        assert_eq!(schedule.destinations[1].visit_time, at("2024-08-02T10:00"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[stop("first", "2024-08-01"), stop("last", "2024-08-03T00:00:00Z")],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn just_outside_bounds_rejected() {
        let before = validate("2024-08-01", "2024-08-03", &[stop("a", "2024-07-31T23:59:59")]);
        assert!(matches!(before, Err(ValidationError::Window { index: 0, .. })));

        let after = validate("2024-08-01", "2024-08-03", &[stop("a", "2024-08-03T00:00:01")]);
        assert!(matches!(after, Err(ValidationError::Window { index: 0, .. })));
    }

    #[test]
    fn start_must_precede_end() {
        let equal = validate("2024-08-01", "2024-08-01", &[]);
        assert!(matches!(equal, Err(ValidationError::Ordering { .. })));

        let reversed = validate("2024-08-03", "2024-08-01", &[]);
        assert!(matches!(reversed, Err(ValidationError::Ordering { .. })));
    }

    #[test]
    fn ordering_checked_before_destinations() {
        let result = validate("2024-08-03", "2024-08-01", &[stop("a", "garbage")]);
        assert!(matches!(result, Err(ValidationError::Ordering { .. })));
    }

    #[test]
    fn first_violation_wins() {
        // D1 outside the window, D2 duplicates D3
        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[
                stop("d1", "2024-08-05T10:00"),
                stop("d2", "2024-08-02T10:00"),
                stop("d3", "2024-08-02T10:00"),
            ],
        );
        assert!(matches!(result, Err(ValidationError::Window { index: 0, .. })));
    }

    #[test]
    fn window_error_hides_later_overlap() {
        // A ok, B outside, C duplicates A
        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[
                stop("a", "2024-08-01T10:00"),
                stop("b", "2024-09-01T10:00"),
                stop("c", "2024-08-01T10:00"),
            ],
        );
        assert!(matches!(result, Err(ValidationError::Window { index: 1, .. })));
    }

    #[test]
    fn overlap_compared_to_the_second() {
        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[
                stop("a", "2024-08-01T10:00:00.100Z"),
                stop("b", "2024-08-01T10:00:00.900Z"),
            ],
        );
        assert!(matches!(result, Err(ValidationError::Overlap { index: 1, .. })));

        let result = validate(
            "2024-08-01",
            "2024-08-03",
            &[
                stop("a", "2024-08-01T10:00:00.900Z"),
                stop("b", "2024-08-01T10:00:01.000Z"),
            ],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn preserves_destination_order() {
        let schedule = validate(
            "2024-08-01",
            "2024-08-03",
            &[
                stop("late", "2024-08-02T18:00"),
                stop("early", "2024-08-01T09:00"),
                stop("middle", "2024-08-02T09:00"),
            ],
        )
        .unwrap();
        let names: Vec<_> = schedule.destinations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["late", "early", "middle"]);
    }

    #[test]
    fn empty_destinations_accepted() {
        assert!(validate("2024-08-01", "2024-08-03", &[]).is_ok());
    }

    #[test]
    fn malformed_dates_rejected_with_field() {
        let err = validate_new_plan(&raw("soon"), Some(&raw("2024-08-03")), &[]).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedInput { ref field, .. } if field == "startDate"));

        let err = validate_new_plan(&raw("2024-08-01"), Some(&raw("later")), &[]).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedInput { ref field, .. } if field == "endDate"));

        let err = validate("2024-08-01", "2024-08-03", &[stop("a", "2024-08-02"), stop("b", "??")])
            .unwrap_err();
        assert!(
            matches!(err, ValidationError::MalformedInput { ref field, .. } if field == "destinations[1].visitTime")
        );
    }

    #[test]
    fn bad_coordinates_rejected() {
        let mut bad = stop("a", "2024-08-02");
        bad.location = GeoPoint::new(120.0, 0.0);
        let err = validate("2024-08-01", "2024-08-03", &[bad]).unwrap_err();
        assert!(
            matches!(err, ValidationError::MalformedInput { ref field, .. } if field == "destinations[0].location")
        );
    }

    #[test]
    fn no_end_date_skips_window_and_overlap() {
        let schedule = validate_new_plan(
            &raw("2024-08-01"),
            None,
            &[stop("a", "2020-01-01T10:00"), stop("b", "2020-01-01T10:00")],
        )
        .unwrap();
        assert_eq!(schedule.end_date, None);
        assert_eq!(schedule.destinations.len(), 2);
    }

    #[test]
    fn no_end_date_still_parses_visits() {
        let result = validate_new_plan(&raw("2024-08-01"), None, &[stop("a", "whenever")]);
        assert!(matches!(result, Err(ValidationError::MalformedInput { .. })));
    }

    #[test]
    fn empty_patch_keeps_everything() {
        let current = persisted(&[("a", "2024-08-01T10:00")]);
        let merged = validate_update(&current, &PlanFields::default()).unwrap();
        assert_eq!(merged, current);
    }

    #[test]
    fn empty_strings_in_patch_are_ignored() {
        let current = persisted(&[]);
        let patch = PlanFields {
            title: Some(String::new()),
            city: Some(String::new()),
            start_date: Some(raw("")),
            ..PlanFields::default()
        };
        let merged = validate_update(&current, &patch).unwrap();
        assert_eq!(merged, current);
    }

    #[test]
    fn title_patch_changes_only_title() {
        let current = persisted(&[("a", "2024-08-01T10:00")]);
        let patch = PlanFields {
            title: Some("B".into()),
            ..PlanFields::default()
        };
        let merged = validate_update(&current, &patch).unwrap();
        assert_eq!(merged.title, "B");
        assert_eq!(
            ItineraryPlan {
                title: "A".into(),
                ..merged
            },
            current
        );
    }

    #[test]
    fn patch_destinations_replace_wholesale() {
        let current = persisted(&[("a", "2024-08-01T10:00"), ("b", "2024-08-02T10:00")]);
        let patch = PlanFields {
            destinations: Some(vec![stop("c", "2024-08-01T10:00")]),
            ..PlanFields::default()
        };
        let merged = validate_update(&current, &patch).unwrap();
        assert_eq!(merged.destinations.len(), 1);
        assert_eq!(merged.destinations[0].name, "c");

        let cleared = PlanFields {
            destinations: Some(vec![]),
            ..PlanFields::default()
        };
        assert!(validate_update(&current, &cleared).unwrap().destinations.is_empty());
    }

    #[test]
    fn moving_dates_rechecks_existing_destinations() {
        let current = persisted(&[("a", "2024-08-02T10:00")]);
        let patch = PlanFields {
            end_date: Some(raw("2024-08-02")),
            ..PlanFields::default()
        };
        let err = validate_update(&current, &patch).unwrap_err();
        assert!(matches!(err, ValidationError::Window { index: 0, .. }));
    }

    #[test]
    fn patch_start_after_current_end_is_ordering_error() {
        let current = persisted(&[]);
        let patch = PlanFields {
            start_date: Some(raw("2024-08-10")),
            ..PlanFields::default()
        };
        assert!(matches!(
            validate_update(&current, &patch),
            Err(ValidationError::Ordering { .. })
        ));
    }

    #[test]
    fn patch_overlap_detected() {
        let current = persisted(&[]);
        let patch = PlanFields {
            destinations: Some(vec![
                stop("a", "2024-08-02T08:00"),
                stop("b", "2024-08-02T08:00:00.5Z"),
            ]),
            ..PlanFields::default()
        };
        assert!(matches!(
            validate_update(&current, &patch),
            Err(ValidationError::Overlap { index: 1, earlier: 0, .. })
        ));
    }

    #[test]
    fn update_of_plan_without_end_date() {
        let mut current = persisted(&[("a", "2030-01-01T10:00")]);
        current.end_date = None;
        let patch = PlanFields {
            city: Some("Milan".into()),
            ..PlanFields::default()
        };
        let merged = validate_update(&current, &patch).unwrap();
        assert_eq!(merged.city, "Milan");
        assert_eq!(merged.end_date, None);
    }

    #[test]
    fn owner_is_never_patched() {
        let current = persisted(&[]);
        let merged = validate_update(&current, &PlanFields::default()).unwrap();
        assert_eq!(merged.user_id, "owner");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::GeoPoint;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const BASE: i64 = 1_722_470_400; // 2024-08-01T00:00:00Z

    fn instant(secs: i64) -> RawInstant {
        RawInstant::Millis(secs * 1000)
    }

    fn stops(offsets: &[i64]) -> Vec<DestinationInput> {
        offsets
            .iter()
            .enumerate()
            .map(|(i, off)| DestinationInput {
                name: format!("stop {i}"),
                location: GeoPoint::new(0.0, 0.0),
                visit_time: instant(BASE + off),
            })
            .collect()
    }

    proptest! {
        /// Accepted iff start < end, every visit in the window, and visits distinct
        #[test]
        fn accepts_exactly_consistent_plans(
            start_off in -10i64..10,
            end_off in -10i64..40,
            visit_offs in prop::collection::vec(-20i64..50, 0..8),
        ) {
            let start = BASE + start_off;
            let end = BASE + end_off;
            let result = validate_new_plan(&instant(start), Some(&instant(end)), &stops(&visit_offs));

            let in_window = visit_offs.iter().all(|o| (start..=end).contains(&(BASE + o)));
            let distinct = visit_offs.iter().collect::<HashSet<_>>().len() == visit_offs.len();
            let expected = start < end && in_window && distinct;

            prop_assert_eq!(result.is_ok(), expected);
        }

        /// The reported error belongs to the first offending destination
        #[test]
        fn reports_first_violation(visit_offs in prop::collection::vec(-5i64..15, 1..8)) {
            let start = BASE;
            let end = BASE + 10;
            let result = validate_new_plan(&instant(start), Some(&instant(end)), &stops(&visit_offs));

            let mut seen = HashSet::new();
            let first_bad = visit_offs.iter().position(|o| {
                !(0..=10).contains(o) || !seen.insert(*o)
            });

            match (first_bad, result) {
                (None, Ok(_)) => {}
                (Some(i), Err(ValidationError::Window { index, .. }))
                | (Some(i), Err(ValidationError::Overlap { index, .. })) => prop_assert_eq!(index, i),
                (expected, other) => prop_assert!(false, "expected {:?}, got {:?}", expected, other),
            }
        }

        /// Accepted plans keep their input order and exact instants
        #[test]
        fn normalization_preserves_order(visit_offs in prop::collection::vec(0i64..1000, 0..8)) {
            let unique: Vec<i64> = {
                let mut seen = HashSet::new();
                visit_offs.into_iter().filter(|o| seen.insert(*o)).collect()
            };
            let schedule = validate_new_plan(&instant(BASE), Some(&instant(BASE + 1000)), &stops(&unique)).unwrap();

            for (dest, off) in schedule.destinations.iter().zip(&unique) {
                prop_assert_eq!(dest.visit_time, Utc.timestamp_opt(BASE + off, 0).unwrap());
            }
        }
    }
}
