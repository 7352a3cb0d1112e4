// ABOUTME: Deterministic seeder that fills a synthetic source with plausible health data
// ABOUTME: Uses a ChaCha RNG so a given seed always produces the same samples
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use tracing::info;

use insite_core::time::{local_date, LocalDay};

use crate::core::{
    CategoryMetric, CategorySample, CategoryValue, FlowLevel, QuantityMetric, QuantitySample,
    SleepState,
};
use crate::synthetic::SyntheticHealthSource;

/// Days of data seeded when nothing else is requested
pub const DEFAULT_SEED_DAYS: u32 = 30;

/// Samples produced by one seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Numeric samples stored
    pub quantity_samples: usize,
    /// Category samples stored
    pub category_samples: usize,
}

/// Generates a repeatable history of readings ending at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSeeder {
    seed: u64,
    days: u32,
    tz: Tz,
}

impl SyntheticSeeder {
    /// Seeder for `days` local days in `tz`
    #[must_use]
    pub const fn new(seed: u64, days: u32, tz: Tz) -> Self {
        Self { seed, days, tz }
    }

    /// Generate samples for the `days` local days ending with the day containing `end`.
    ///
    /// Nothing at or after `end` is produced.
    #[must_use]
    pub fn generate(&self, end: DateTime<Utc>) -> (Vec<QuantitySample>, Vec<CategorySample>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut quantities = Vec::new();
        let mut categories = Vec::new();

        let last = local_date(end, self.tz);
        let first = last - Duration::days(i64::from(self.days.saturating_sub(1)));
        let cycle_offset = rng.gen_range(0..28);
        let body_mass_base = rng.gen_range(60.0..90.0);

        let mut date = first;
        let mut index: i64 = 0;
        while date <= last {
            let day = LocalDay::new(date, self.tz);
            self.seed_glucose(&mut rng, &day, &mut quantities);
            self.seed_heart(&mut rng, &day, &mut quantities);
            Self::seed_activity(&mut rng, &day, &mut quantities);
            Self::seed_body(&mut rng, &day, body_mass_base, &mut quantities);
            Self::seed_sleep(&mut rng, &day, &mut categories);
            if (index + cycle_offset).rem_euclid(28) < 5 {
                categories.push(CategorySample {
                    metric: CategoryMetric::MenstrualFlow,
                    start: day.start,
                    end: day.end,
                    value: CategoryValue::Flow(if rng.gen_bool(0.5) {
                        FlowLevel::Medium
                    } else {
                        FlowLevel::Light
                    }),
                });
            }
            index += 1;
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        quantities.retain(|sample| sample.start < end);
        categories.retain(|sample| sample.start < end);
        (quantities, categories)
    }

    /// Generate and store samples in `source`
    pub fn seed_into(&self, source: &SyntheticHealthSource, end: DateTime<Utc>) -> SeedSummary {
        let (quantities, categories) = self.generate(end);
        let summary = SeedSummary {
            quantity_samples: quantities.len(),
            category_samples: categories.len(),
        };
        source.add_quantity_samples(quantities);
        source.add_category_samples(categories);
        info!(
            seed = self.seed,
            days = self.days,
            quantity_samples = summary.quantity_samples,
            category_samples = summary.category_samples,
            "seeded synthetic health source"
        );
        summary
    }

    fn seed_glucose(&self, rng: &mut ChaCha8Rng, day: &LocalDay, out: &mut Vec<QuantitySample>) {
        // Readings every 5 minutes with a daily wave and post-meal bumps
        let mut at = day.start;
        while at < day.end {
            let hour = f64::from(insite_core::time::local_hour(at, self.tz));
            let wave = 30.0 * (2.0 * PI * (hour - 4.0) / 24.0).sin();
            let meal = [7.5, 12.5, 18.5]
                .iter()
                .map(|meal_hour| 60.0 * (-((hour - meal_hour).powi(2)) / 1.5).exp())
                .sum::<f64>();
            let noise = rng.gen_range(-15.0..15.0);
            let value = (125.0 + wave + meal + noise).clamp(45.0, 380.0);
            out.push(QuantitySample::at(QuantityMetric::BloodGlucose, at, value));
            at += Duration::minutes(5);
        }
    }

    fn seed_heart(&self, rng: &mut ChaCha8Rng, day: &LocalDay, out: &mut Vec<QuantitySample>) {
        let mut at = day.start;
        while at < day.end {
            let hour = insite_core::time::local_hour(at, self.tz);
            let base = if (7..22).contains(&hour) { 78.0 } else { 58.0 };
            out.push(QuantitySample::at(
                QuantityMetric::HeartRate,
                at,
                base + rng.gen_range(-8.0..20.0),
            ));
            at += Duration::minutes(10);
        }
        out.push(QuantitySample::at(
            QuantityMetric::RestingHeartRate,
            day.start + Duration::hours(7),
            rng.gen_range(55.0..70.0),
        ));
    }

    fn seed_activity(rng: &mut ChaCha8Rng, day: &LocalDay, out: &mut Vec<QuantitySample>) {
        let mut at = day.start;
        let mut hour = 0;
        while at < day.end {
            let hour_end = at + Duration::hours(1);
            out.push(QuantitySample {
                metric: QuantityMetric::BasalEnergy,
                start: at,
                end: hour_end,
                value: rng.gen_range(55.0..75.0),
            });
            let awake = (7..22).contains(&hour);
            if awake {
                out.push(QuantitySample {
                    metric: QuantityMetric::ActiveEnergy,
                    start: at,
                    end: hour_end,
                    value: rng.gen_range(5.0..90.0),
                });
                out.push(QuantitySample {
                    metric: QuantityMetric::MoveTime,
                    start: at,
                    end: hour_end,
                    value: rng.gen_range(0.0..30.0),
                });
                if rng.gen_bool(0.3) {
                    out.push(QuantitySample {
                        metric: QuantityMetric::ExerciseTime,
                        start: at,
                        end: hour_end,
                        value: rng.gen_range(5.0..45.0),
                    });
                }
            }
            at = hour_end;
            hour += 1;
        }
    }

    fn seed_body(rng: &mut ChaCha8Rng, day: &LocalDay, base: f64, out: &mut Vec<QuantitySample>) {
        out.push(QuantitySample::at(
            QuantityMetric::BodyMass,
            day.start + Duration::minutes(7 * 60 + 30),
            base + rng.gen_range(-0.8..0.8),
        ));
    }

    fn seed_sleep(rng: &mut ChaCha8Rng, day: &LocalDay, out: &mut Vec<CategorySample>) {
        // Night starting at 23:00 local, ending the next morning
        let mut at = day.start + Duration::hours(23);
        let wake = at + Duration::minutes(rng.gen_range(390..510));
        let cycle = [SleepState::Core, SleepState::Deep, SleepState::Core, SleepState::Rem];
        let mut step = 0;
        while at < wake {
            let state = if rng.gen_bool(0.08) {
                SleepState::Awake
            } else {
                cycle[step % cycle.len()]
            };
            let end = (at + Duration::minutes(rng.gen_range(15..60))).min(wake);
            out.push(CategorySample {
                metric: CategoryMetric::SleepAnalysis,
                start: at,
                end,
                value: CategoryValue::Sleep(state),
            });
            at = end;
            step += 1;
        }
    }
}
