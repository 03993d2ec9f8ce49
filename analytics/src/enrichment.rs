//! Per-car derived values. Everything here is pure and total over well-formed
//! cars: divisions by zero, empty groups and bad timestamps resolve to a
//! defined value instead of an error.

use crate::models::{Car, CarStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use upstream::join::round2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PriceClass {
    Economy,
    #[serde(rename = "Mid-range")]
    MidRange,
    Luxury,
    #[serde(rename = "Ultra-luxury")]
    UltraLuxury,
}

pub fn price_class(price: f64) -> PriceClass {
    match price {
        p if p < 150_000.0 => PriceClass::Economy,
        p if p < 300_000.0 => PriceClass::MidRange,
        p if p < 600_000.0 => PriceClass::Luxury,
        _ => PriceClass::UltraLuxury,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PerformanceClass {
    Standard,
    High,
    Extreme,
}

pub fn performance_class(horsepower: f64) -> PerformanceClass {
    match horsepower {
        hp if hp < 600.0 => PerformanceClass::Standard,
        hp if hp < 900.0 => PerformanceClass::High,
        _ => PerformanceClass::Extreme,
    }
}

/// Price per horsepower, `None` for a car with no horsepower.
pub fn value_per_hp(car: &Car) -> Option<f64> {
    if car.horsepower == 0.0 {
        return None;
    }
    Some(round2(car.price / car.horsepower))
}

/// Whole days between `added_at` and `now`.
///
/// Accepts RFC 3339 timestamps and offset-less ISO 8601 timestamps, the
/// latter read as UTC. Missing, malformed and future timestamps give 0.
pub fn days_since(added_at: Option<&str>, now: DateTime<Utc>) -> i64 {
    let Some(raw) = added_at else {
        return 0;
    };

    let added = match DateTime::parse_from_rfc3339(raw) {
        Ok(with_offset) => with_offset.with_timezone(&Utc),
        Err(_) => match raw.parse::<NaiveDateTime>() {
            Ok(naive) => naive.and_utc(),
            Err(_) => return 0,
        },
    };

    (now - added).num_days().max(0)
}

pub fn status_analysis(status: &CarStatus) -> &'static str {
    match status {
        CarStatus::Available => "Ready for use",
        CarStatus::Racing => "Currently in competition",
        CarStatus::Maintenance => "Under maintenance",
        CarStatus::Sold => "No longer in inventory",
        CarStatus::Other(_) => "Unknown status",
    }
}

/// Analytics attached to each car of the complete report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarAnalytics {
    pub price_class: PriceClass,
    pub performance_class: PerformanceClass,
    pub value_per_hp: Option<f64>,
    pub days_in_garage: i64,
    pub status_analysis: &'static str,
}

impl CarAnalytics {
    pub fn for_car(car: &Car, now: DateTime<Utc>) -> Self {
        Self {
            price_class: price_class(car.price),
            performance_class: performance_class(car.horsepower),
            value_per_hp: value_per_hp(car),
            days_in_garage: days_since(car.added_at.as_deref(), now),
            status_analysis: status_analysis(&car.status),
        }
    }
}

/// Sub-scores in [0, 100] and their equal-weight mean.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scores {
    pub acceleration: f64,
    pub speed: f64,
    pub power: f64,
    pub overall: f64,
}

impl Scores {
    pub fn for_car(car: &Car) -> Self {
        let acceleration = clamp_score(100.0 - (car.acceleration - 2.0) * 20.0);
        let speed = clamp_score(car.top_speed / 250.0 * 100.0);
        let power = clamp_score(car.horsepower / 1500.0 * 100.0);

        Self {
            acceleration,
            speed,
            power,
            overall: (acceleration + speed + power) / 3.0,
        }
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// 1-based rank of every car by descending horsepower, aligned with `cars`.
///
/// Equal horsepower keeps input order, so the first occurrence ranks higher.
pub fn ranks(cars: &[Car]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cars.len()).collect();
    order.sort_by(|&a, &b| cars[b].horsepower.total_cmp(&cars[a].horsepower));

    let mut ranks = vec![0; cars.len()];
    for (position, index) in order.into_iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

/// Relative difference from `mean` in percent; 0 when the mean is 0.
pub fn percent_deviation(value: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        return 0.0;
    }
    (value - mean) / mean * 100.0
}

/// Position of a car within its own category.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryComparison {
    pub category: String,
    pub cars_in_category: usize,
    pub hp_deviation: f64,
    pub speed_deviation: f64,
}

impl CategoryComparison {
    pub fn for_car(car: &Car, cars: &[Car]) -> Self {
        let peers: Vec<&Car> = cars.iter().filter(|c| c.category == car.category).collect();

        let (hp_deviation, speed_deviation) = if peers.is_empty() {
            (0.0, 0.0)
        } else {
            let count = peers.len() as f64;
            let mean_hp = peers.iter().map(|c| c.horsepower).sum::<f64>() / count;
            let mean_speed = peers.iter().map(|c| c.top_speed).sum::<f64>() / count;
            (
                percent_deviation(car.horsepower, mean_hp),
                percent_deviation(car.top_speed, mean_speed),
            )
        };

        Self {
            category: car.category.clone(),
            cars_in_category: peers.len(),
            hp_deviation,
            speed_deviation,
        }
    }
}

/// Signed percentage with one decimal, e.g. `+12.3%`.
pub fn signed_percent(value: f64) -> String {
    format!("{value:+.1}%")
}

pub fn recommendations(car: &Car, scores: &Scores) -> Vec<&'static str> {
    let mut out = Vec::new();
    if scores.overall > 90.0 {
        out.push("Excellent overall performance");
    }
    if scores.acceleration > 95.0 {
        out.push("Top acceleration in category");
    }
    if car.price < 200_000.0 && car.horsepower > 600.0 {
        out.push("Outstanding value for money");
    }
    if car.horsepower > 900.0 {
        out.push("Extreme power output");
    }
    if car.status == CarStatus::Available {
        out.push("Ready for immediate deployment");
    }
    out
}
